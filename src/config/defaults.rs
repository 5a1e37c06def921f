//! Default configuration values

/// Capacity of each bounded task queue
pub const QUEUE_CAPACITY: usize = 32;

/// Capacity of the state actor's request channel
pub const STATE_CHANNEL_CAPACITY: usize = 64;

/// Interval between remote index freshness checks (in seconds)
pub const INDEX_CHECK_PERIOD: u64 = 3600; // 1 hour

/// Interval between serial port enumerations (in milliseconds)
pub const SERIAL_POLL_INTERVAL_MS: u64 = 1000;

/// Program storage size assumed when the board does not declare one
pub const DEFAULT_MAXIMUM_SIZE: u64 = 253_952;

/// Dynamic memory size assumed when the board does not declare one
pub const DEFAULT_MAXIMUM_DATA_SIZE: u64 = 10_000;

/// Name of the pre-linked library/core archive
pub const CORE_ARCHIVE: &str = "core.a";

/// Name of the last-build record inside a project build directory
pub const LAST_BUILD_FILE: &str = "last_build.toml";

/// Maximum number of `{key}` expansion passes over a recipe
pub const RECIPE_EXPANSION_PASSES: usize = 16;

/// Reported IDE version for `runtime.ide.version`
pub const IDE_VERSION: &str = "10819";

/// Directories skipped while indexing library headers
pub const HEADER_SCAN_EXCLUDES: &[&str] = &["examples", "samples"];
