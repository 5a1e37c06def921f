//! Global configuration management
//!
//! Reads and manages global settings from `config.toml` in the config directory.
//! Global settings include directory locations, build switches, package index
//! URLs and task queue sizing.

use crate::config::{defaults, urls};
use crate::infra::dirs::SketchforgeDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Global configuration error types
#[derive(Error, Debug)]
pub enum GlobalConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    ReadError { path: String, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    ParseError { path: String, error: String },

    /// Failed to write config file
    #[error("Failed to write config file '{path}': {error}")]
    WriteError { path: String, error: String },
}

/// Global configuration for sketchforge
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    /// Directory locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Build switches
    #[serde(default)]
    pub build: BuildConfig,

    /// Package index settings
    #[serde(default)]
    pub index: IndexConfig,

    /// Task queue settings
    #[serde(default)]
    pub queues: QueueConfig,
}

/// Directory locations
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    /// Toolchain root holding `packages/`, `staging/` and `build/`
    pub toolchain_root: Option<PathBuf>,

    /// Sketchbook holding user sketches and `libraries/`
    pub sketchbook: Option<PathBuf>,
}

/// Build switches
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BuildConfig {
    /// Force a full rebuild on the next build
    #[serde(default)]
    pub full_build: bool,

    /// Echo build commands and their stdout
    #[serde(default)]
    pub verbose_build: bool,

    /// Echo upload commands
    #[serde(default)]
    pub verbose_upload: bool,

    /// Extra compiler flags exposed as `{build.extra_flags}`
    #[serde(default)]
    pub extra_build_flag: String,
}

/// Package index settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndexConfig {
    /// Index name -> URL
    #[serde(default)]
    pub urls: BTreeMap<String, String>,

    /// Remote freshness check period in seconds
    pub check_period_secs: Option<u64>,
}

/// Task queue settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueueConfig {
    /// Bounded capacity of each queue
    pub capacity: Option<usize>,
}

impl GlobalConfig {
    /// Load global configuration from the config directory
    ///
    /// If the config file doesn't exist, returns default configuration.
    /// If the config file exists but is invalid, returns an error.
    pub fn load(dirs: &SketchforgeDirs) -> Result<Self, GlobalConfigError> {
        Self::load_from_path(&dirs.global_config_path())
    }

    /// Load global configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, GlobalConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| GlobalConfigError::ReadError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| GlobalConfigError::ParseError {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// Save global configuration to the config directory
    pub fn save(&self, dirs: &SketchforgeDirs) -> Result<(), GlobalConfigError> {
        self.save_to_path(&dirs.global_config_path())
    }

    /// Save global configuration to a specific path
    ///
    /// Creates parent directories if they don't exist.
    pub fn save_to_path(&self, path: &Path) -> Result<(), GlobalConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| GlobalConfigError::WriteError {
                path: parent.display().to_string(),
                error: e.to_string(),
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| GlobalConfigError::ParseError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        fs::write(path, content).map_err(|e| GlobalConfigError::WriteError {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// Configured index URLs, always including the default index
    pub fn index_urls(&self) -> BTreeMap<String, String> {
        let mut urls = self.index.urls.clone();
        urls.entry(urls::DEFAULT_INDEX_NAME.to_string())
            .or_insert_with(|| urls::PACKAGE_INDEX.to_string());
        urls
    }

    /// Remote index check period in seconds
    pub fn check_period_secs(&self) -> u64 {
        self.index
            .check_period_secs
            .unwrap_or(defaults::INDEX_CHECK_PERIOD)
    }

    /// Bounded queue capacity
    pub fn queue_capacity(&self) -> usize {
        self.queues
            .capacity
            .filter(|c| *c > 0)
            .unwrap_or(defaults::QUEUE_CAPACITY)
    }

    /// Read a build setting by its key (`full_build`, `verbose_build`,
    /// `verbose_upload`, `extra_build_flag`)
    pub fn setting(&self, key: &str) -> Option<String> {
        let value = match key {
            "full_build" => self.build.full_build.to_string(),
            "verbose_build" => self.build.verbose_build.to_string(),
            "verbose_upload" => self.build.verbose_upload.to_string(),
            "extra_build_flag" => self.build.extra_build_flag.clone(),
            _ => return None,
        };
        Some(value)
    }

    /// Change a build setting; returns false for unknown keys or bad values
    pub fn set_setting(&mut self, key: &str, value: &str) -> bool {
        let target = match key {
            "full_build" => &mut self.build.full_build,
            "verbose_build" => &mut self.build.verbose_build,
            "verbose_upload" => &mut self.build.verbose_upload,
            "extra_build_flag" => {
                self.build.extra_build_flag = value.to_string();
                return true;
            }
            _ => return false,
        };
        match value.parse() {
            Ok(flag) => {
                *target = flag;
                true
            }
            Err(_) => false,
        }
    }

    /// Resolve the toolchain root
    ///
    /// A configured absolute path is created when missing. Relative paths, or
    /// paths that cannot be created, fall back to the platform default.
    pub fn toolchain_root(&self, dirs: &SketchforgeDirs) -> PathBuf {
        resolve_dir(self.paths.toolchain_root.as_deref(), dirs.toolchain_root())
    }

    /// Resolve the sketchbook directory, with the same fallback rules
    pub fn sketchbook(&self, dirs: &SketchforgeDirs) -> PathBuf {
        resolve_dir(self.paths.sketchbook.as_deref(), dirs.sketchbook_dir())
    }
}

fn resolve_dir(configured: Option<&Path>, fallback: PathBuf) -> PathBuf {
    match configured {
        Some(path) if path.is_absolute() => {
            if path.is_dir() || fs::create_dir_all(path).is_ok() {
                path.to_path_buf()
            } else {
                tracing::warn!(
                    "Cannot create configured directory {}, using {}",
                    path.display(),
                    fallback.display()
                );
                fallback
            }
        }
        Some(path) => {
            tracing::warn!(
                "Ignoring relative directory {} in config, using {}",
                path.display(),
                fallback.display()
            );
            fallback
        }
        None => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_is_default() {
        let temp = TempDir::new().unwrap();
        let config = GlobalConfig::load_from_path(&temp.path().join("config.toml")).unwrap();
        assert_eq!(config, GlobalConfig::default());
        assert!(!config.build.full_build);
    }

    #[test]
    fn test_config_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = GlobalConfig::default();
        config.build.verbose_build = true;
        config.build.extra_build_flag = "-DDEBUG".to_string();
        config
            .index
            .urls
            .insert("esp".to_string(), "https://example.com/esp.json".to_string());
        config.save_to_path(&path).unwrap();

        let loaded = GlobalConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_config_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[build\nfull_build = ").unwrap();

        let result = GlobalConfig::load_from_path(&path);
        assert!(matches!(result, Err(GlobalConfigError::ParseError { .. })));
    }

    #[test]
    fn test_index_urls_include_default() {
        let config = GlobalConfig::default();
        let urls = config.index_urls();
        assert_eq!(
            urls.get(urls::DEFAULT_INDEX_NAME).map(String::as_str),
            Some(urls::PACKAGE_INDEX)
        );
    }

    #[test]
    fn test_configured_default_index_is_kept() {
        let mut config = GlobalConfig::default();
        config.index.urls.insert(
            urls::DEFAULT_INDEX_NAME.to_string(),
            "https://mirror.example.com/index.json".to_string(),
        );
        assert_eq!(
            config.index_urls()[urls::DEFAULT_INDEX_NAME],
            "https://mirror.example.com/index.json"
        );
    }

    #[test]
    fn test_relative_root_falls_back() {
        let mut config = GlobalConfig::default();
        config.paths.toolchain_root = Some(PathBuf::from("relative/root"));
        let dirs = SketchforgeDirs::with_roots(
            PathBuf::from("/tmp/cfg"),
            PathBuf::from("/tmp/data"),
            PathBuf::from("/tmp/sketches"),
        );
        assert_eq!(config.toolchain_root(&dirs), dirs.toolchain_root());
    }

    #[test]
    fn test_absolute_root_is_created() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("toolchains");
        let mut config = GlobalConfig::default();
        config.paths.toolchain_root = Some(root.clone());
        let dirs = SketchforgeDirs::new();

        assert_eq!(config.toolchain_root(&dirs), root);
        assert!(root.is_dir());
    }

    #[test]
    fn test_queue_capacity_rejects_zero() {
        let mut config = GlobalConfig::default();
        config.queues.capacity = Some(0);
        assert_eq!(config.queue_capacity(), defaults::QUEUE_CAPACITY);
    }

    #[test]
    fn test_build_settings_by_key() {
        let mut config = GlobalConfig::default();
        assert!(config.set_setting("full_build", "true"));
        assert!(config.set_setting("extra_build_flag", "-DDEBUG"));
        assert!(!config.set_setting("verbose_build", "maybe"));
        assert!(!config.set_setting("color", "red"));

        assert_eq!(config.setting("full_build").as_deref(), Some("true"));
        assert_eq!(config.setting("verbose_build").as_deref(), Some("false"));
        assert_eq!(config.setting("extra_build_flag").as_deref(), Some("-DDEBUG"));
        assert_eq!(config.setting("color"), None);
    }
}
