//! Infrastructure layer
//!
//! Handles I/O: network, archives, filesystem, serial devices and external
//! processes.

pub mod archive;
pub mod dirs;
pub mod download;
pub mod filesystem;
pub mod install;
pub mod layout;
pub mod process;
pub mod serial;
