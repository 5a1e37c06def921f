//! Configuration and constants

pub mod defaults;
pub mod global;
pub mod urls;

pub use global::GlobalConfig;
