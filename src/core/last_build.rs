//! Last-build record
//!
//! Snapshot of the selection and source modification times taken when a
//! build was planned. The planner compares against it to decide between a
//! full and a partial rebuild.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::selection::{self, option_slot, Selection};
use crate::error::FilesystemError;
use crate::infra::filesystem;

/// Selection values a build depends on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSignature {
    /// Package
    pub package: String,
    /// Platform
    pub platform: String,
    /// Platform version
    pub version: String,
    /// Board
    pub board: String,
    /// Board option values keyed by `option_<key>`
    pub options: BTreeMap<String, String>,
}

impl BuildSignature {
    /// Signature of a selection
    ///
    /// Only the options declared by the selected board are included.
    pub fn from_selection(selection: &Selection, option_keys: &[String]) -> Self {
        let get = |slot: &str| selection.get(slot).unwrap_or_default().to_string();
        Self {
            package: get(selection::PACKAGE),
            platform: get(selection::PLATFORM),
            version: get(selection::VERSION),
            board: get(selection::BOARD),
            options: option_keys
                .iter()
                .map(|key| {
                    let slot = option_slot(key);
                    let value = get(&slot);
                    (slot, value)
                })
                .collect(),
        }
    }
}

/// Persisted last-build record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastBuildRecord {
    /// Package
    #[serde(default)]
    pub package: String,
    /// Platform
    #[serde(default)]
    pub platform: String,
    /// Platform version
    #[serde(default)]
    pub version: String,
    /// Board
    #[serde(default)]
    pub board: String,
    /// Board option values keyed by `option_<key>`
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    /// Source modification times in nanoseconds, keyed by path
    #[serde(default)]
    pub sources: BTreeMap<String, i64>,
}

impl LastBuildRecord {
    /// Load a record; missing or unreadable records are empty
    pub fn load(path: &Path) -> Self {
        filesystem::load_toml(path).unwrap_or_else(|e| {
            tracing::warn!("Discarding last build record: {e}");
            Self::default()
        })
    }

    /// Write the record
    pub fn save(&self, path: &Path) -> Result<(), FilesystemError> {
        filesystem::save_toml(path, self)
    }

    /// Whether any non-empty value of `current` differs from this record
    pub fn signature_differs(&self, current: &BuildSignature) -> bool {
        let differs = |now: &str, then: &str| !now.is_empty() && now != then;
        differs(&current.package, &self.package)
            || differs(&current.platform, &self.platform)
            || differs(&current.version, &self.version)
            || differs(&current.board, &self.board)
            || current.options.iter().any(|(slot, value)| {
                differs(value, self.options.get(slot).map_or("", String::as_str))
            })
    }

    /// Whether a source changed since it was recorded
    ///
    /// A file whose time cannot be read counts as unchanged.
    pub fn is_modified(&self, source: &Path, mtime: Option<i64>) -> bool {
        match mtime {
            Some(now) => self.sources.get(&source_key(source)) != Some(&now),
            None => false,
        }
    }

    /// Record of a freshly planned build
    pub fn snapshot(signature: &BuildSignature, sources: &[(String, i64)]) -> Self {
        Self {
            package: signature.package.clone(),
            platform: signature.platform.clone(),
            version: signature.version.clone(),
            board: signature.board.clone(),
            options: signature.options.clone(),
            sources: sources.iter().cloned().collect(),
        }
    }
}

/// Key under which a source's time is stored
pub fn source_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn signature(board: &str) -> BuildSignature {
        BuildSignature {
            package: "arduino".to_string(),
            platform: "Arduino AVR Boards".to_string(),
            version: "1.8.6".to_string(),
            board: board.to_string(),
            options: BTreeMap::new(),
        }
    }

    #[test]
    fn test_board_change_differs() {
        let record = LastBuildRecord::snapshot(&signature("uno"), &[]);
        assert!(record.signature_differs(&signature("mega")));
        assert!(!record.signature_differs(&signature("uno")));
    }

    #[test]
    fn test_empty_current_values_never_differ() {
        let record = LastBuildRecord::snapshot(&signature("uno"), &[]);
        assert!(!record.signature_differs(&BuildSignature::default()));
    }

    #[test]
    fn test_option_change_differs() {
        let mut before = signature("mega");
        before
            .options
            .insert("option_cpu".to_string(), "ATmega2560".to_string());
        let record = LastBuildRecord::snapshot(&before, &[]);

        let mut after = before.clone();
        after
            .options
            .insert("option_cpu".to_string(), "ATmega1280".to_string());
        assert!(record.signature_differs(&after));
    }

    #[test]
    fn test_signature_from_selection_uses_declared_options() {
        let mut sel = Selection::new();
        sel.set(selection::BOARD, "mega");
        sel.set("option_cpu", "ATmega1280");
        sel.set("option_stale", "x");

        let sig = BuildSignature::from_selection(&sel, &["cpu".to_string()]);
        assert_eq!(sig.board, "mega");
        assert_eq!(sig.options.len(), 1);
        assert_eq!(sig.options["option_cpu"], "ATmega1280");
    }

    #[test]
    fn test_is_modified() {
        let record = LastBuildRecord::snapshot(&signature("uno"), &[("/p/a.cpp".to_string(), 10)]);
        assert!(!record.is_modified(Path::new("/p/a.cpp"), Some(10)));
        assert!(record.is_modified(Path::new("/p/a.cpp"), Some(11)));
        assert!(record.is_modified(Path::new("/p/b.cpp"), Some(10)));
        assert!(!record.is_modified(Path::new("/p/b.cpp"), None));
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("build").join("last_build.toml");
        let mut sig = signature("uno");
        sig.options
            .insert("option_cpu".to_string(), "ATmega328P".to_string());
        let record = LastBuildRecord::snapshot(
            &sig,
            &[("C:/sketch/a b.cpp".to_string(), 1_700_000_000_123_456_789)],
        );

        record.save(&path).unwrap();
        assert_eq!(LastBuildRecord::load(&path), record);
    }

    #[test]
    fn test_corrupt_record_loads_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("last_build.toml");
        std::fs::write(&path, "package = [").unwrap();
        assert_eq!(LastBuildRecord::load(&path), LastBuildRecord::default());
    }
}
