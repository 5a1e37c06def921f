//! Index URLs

/// Name under which the default package index is registered
pub const DEFAULT_INDEX_NAME: &str = "arduino";

/// Default package index
pub const PACKAGE_INDEX: &str = "https://downloads.arduino.cc/packages/package_index.json";
