//! Platform-specific directory management
//!
//! Provides the config directory, the toolchain root (installed packages,
//! staging area, build output) and the sketchbook.
//!
//! Environment variables can override default directories:
//! - `SKETCHFORGE_CONFIG_DIR` - Override config directory
//! - `SKETCHFORGE_DATA_DIR` - Override toolchain root
//! - `SKETCHFORGE_SKETCHBOOK` - Override sketchbook directory

use std::env;
use std::path::PathBuf;

/// Environment variable names for directory overrides
pub const ENV_CONFIG_DIR: &str = "SKETCHFORGE_CONFIG_DIR";
pub const ENV_DATA_DIR: &str = "SKETCHFORGE_DATA_DIR";
pub const ENV_SKETCHBOOK: &str = "SKETCHFORGE_SKETCHBOOK";

/// Application name used in directory paths
const APP_NAME: &str = "sketchforge";

/// Default sketchbook folder name under the documents directory
const SKETCHBOOK_NAME: &str = "Arduino";

/// Platform-specific directory provider for sketchforge
#[derive(Debug, Clone)]
pub struct SketchforgeDirs {
    config_dir: PathBuf,
    data_dir: PathBuf,
    sketchbook_dir: PathBuf,
}

impl SketchforgeDirs {
    /// Create a new `SketchforgeDirs` instance
    ///
    /// Checks environment variables first, then falls back to platform defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_dir: Self::resolve(ENV_CONFIG_DIR, Self::platform_config_dir),
            data_dir: Self::resolve(ENV_DATA_DIR, Self::platform_data_dir),
            sketchbook_dir: Self::resolve(ENV_SKETCHBOOK, Self::platform_sketchbook_dir),
        }
    }

    /// Create an instance with explicit roots
    #[must_use]
    pub fn with_roots(config_dir: PathBuf, data_dir: PathBuf, sketchbook_dir: PathBuf) -> Self {
        Self {
            config_dir,
            data_dir,
            sketchbook_dir,
        }
    }

    /// Get the config directory path
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    /// Default toolchain root
    ///
    /// - Linux: `$XDG_DATA_HOME/sketchforge` or `~/.local/share/sketchforge`
    /// - macOS: `~/Library/Application Support/sketchforge`
    #[must_use]
    pub fn toolchain_root(&self) -> PathBuf {
        self.data_dir.clone()
    }

    /// Default sketchbook directory (`~/Documents/Arduino` where available)
    #[must_use]
    pub fn sketchbook_dir(&self) -> PathBuf {
        self.sketchbook_dir.clone()
    }

    /// Get the global config file path
    #[must_use]
    pub fn global_config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    fn resolve(var: &str, platform_default: fn() -> PathBuf) -> PathBuf {
        if let Ok(path) = env::var(var) {
            return PathBuf::from(path);
        }

        platform_default()
    }

    fn platform_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".config").join(APP_NAME))
                    .unwrap_or_else(|| PathBuf::from(".").join(".config").join(APP_NAME))
            })
    }

    fn platform_data_dir() -> PathBuf {
        dirs::data_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".local").join("share").join(APP_NAME))
                    .unwrap_or_else(|| {
                        PathBuf::from(".")
                            .join(".local")
                            .join("share")
                            .join(APP_NAME)
                    })
            })
    }

    fn platform_sketchbook_dir() -> PathBuf {
        dirs::document_dir()
            .or_else(dirs::home_dir)
            .map(|p| p.join(SKETCHBOOK_NAME))
            .unwrap_or_else(|| PathBuf::from(".").join(SKETCHBOOK_NAME))
    }
}

impl Default for SketchforgeDirs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_new_creates_instance() {
        let dirs = SketchforgeDirs::new();
        assert!(!dirs.config_dir().as_os_str().is_empty());
        assert!(!dirs.toolchain_root().as_os_str().is_empty());
        assert!(!dirs.sketchbook_dir().as_os_str().is_empty());
    }

    #[test]
    fn test_global_config_path_is_under_config_dir() {
        let dirs = SketchforgeDirs::new();
        assert!(dirs.global_config_path().starts_with(dirs.config_dir()));
        assert!(dirs.global_config_path().ends_with("config.toml"));
    }

    #[test]
    fn test_with_roots_uses_given_paths() {
        let dirs = SketchforgeDirs::with_roots(
            PathBuf::from("/c"),
            PathBuf::from("/d"),
            PathBuf::from("/s"),
        );
        assert_eq!(dirs.config_dir(), PathBuf::from("/c"));
        assert_eq!(dirs.toolchain_root(), PathBuf::from("/d"));
        assert_eq!(dirs.sketchbook_dir(), PathBuf::from("/s"));
    }
}
