//! Filesystem operations
//!
//! Handles file and directory operations.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

use crate::error::FilesystemError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove a directory and all its contents
pub fn remove_dir_all(path: &Path) -> Result<(), FilesystemError> {
    if path.exists() {
        std::fs::remove_dir_all(path).map_err(|e| FilesystemError::Remove {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    }
    Ok(())
}

/// Remove a file if it exists
pub fn remove_file(path: &Path) -> Result<(), FilesystemError> {
    if path.is_file() {
        std::fs::remove_file(path).map_err(|e| FilesystemError::Remove {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    }
    Ok(())
}

/// Write content to a file
pub fn write_file(path: &Path, content: &str) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    std::fs::write(path, content).map_err(|e| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Read content from a file
pub fn read_file(path: &Path) -> Result<String, FilesystemError> {
    std::fs::read_to_string(path).map_err(|e| FilesystemError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Modification time in nanoseconds since the Unix epoch, `None` if unavailable
pub fn modified_nanos(path: &Path) -> Option<i64> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let since_epoch = modified.duration_since(UNIX_EPOCH).ok()?;
    i64::try_from(since_epoch.as_nanos()).ok()
}

/// List sorted immediate subdirectories of a directory
pub fn list_dirs(path: &Path) -> Vec<std::path::PathBuf> {
    let mut dirs: Vec<_> = std::fs::read_dir(path)
        .into_iter()
        .flatten()
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs
}

/// Recursively copy a directory tree
pub fn copy_tree(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    let copy_err = |e: &dyn std::fmt::Display| FilesystemError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        error: e.to_string(),
    };

    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| copy_err(&e))?;
        let relative = entry.path().strip_prefix(from).map_err(|e| copy_err(&e))?;
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target).map_err(|e| copy_err(&e))?;
        }
    }
    Ok(())
}

/// Read a TOML document; a missing file yields the default value
pub fn load_toml<T: DeserializeOwned + Default>(path: &Path) -> Result<T, FilesystemError> {
    if !path.is_file() {
        return Ok(T::default());
    }
    let content = read_file(path)?;
    toml::from_str(&content).map_err(|e| FilesystemError::Parse {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Write a TOML document, replacing the file
pub fn save_toml<T: Serialize>(path: &Path, value: &T) -> Result<(), FilesystemError> {
    let content = toml::to_string_pretty(value).map_err(|e| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    write_file(path, &content)
}
