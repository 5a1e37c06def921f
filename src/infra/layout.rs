//! Toolchain root layout
//!
//! Everything sketchforge keeps on disk lives below one root:
//!
//! ```text
//! <root>/
//! ├── package_index.json            # default index
//! ├── package_<name>_index.json     # additional indexes
//! ├── selected.toml                 # current selection
//! ├── etags.toml                    # remote index ETags
//! ├── packages/<pkg>/hardware/<arch>/<version>/
//! ├── packages/<pkg>/tools/<name>/<version>/
//! ├── staging/packages/<archive>    # downloaded archives
//! ├── staging/extract/<archive>/    # extraction scratch
//! └── build/<project>/              # build output
//! ```

use std::path::{Path, PathBuf};

use crate::config::urls::DEFAULT_INDEX_NAME;

/// Paths below the toolchain root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainLayout {
    root: PathBuf,
}

impl ToolchainLayout {
    /// Create a layout rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Toolchain root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/packages`
    pub fn packages_dir(&self) -> PathBuf {
        self.root.join("packages")
    }

    /// `<root>/packages/<pkg>/hardware`
    pub fn hardware_dir(&self, package: &str) -> PathBuf {
        self.packages_dir().join(package).join("hardware")
    }

    /// `<root>/packages/<pkg>/hardware/<arch>/<version>`
    pub fn platform_dir(&self, package: &str, arch: &str, version: &str) -> PathBuf {
        self.hardware_dir(package).join(arch).join(version)
    }

    /// `<root>/packages/<pkg>/tools`
    pub fn tools_dir(&self, package: &str) -> PathBuf {
        self.packages_dir().join(package).join("tools")
    }

    /// `<root>/packages/<pkg>/tools/<name>/<version>`
    pub fn tool_dir(&self, package: &str, name: &str, version: &str) -> PathBuf {
        self.tools_dir(package).join(name).join(version)
    }

    /// Where downloaded archives are kept
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join("staging").join("packages")
    }

    /// Scratch directory an archive is unpacked into before it is moved
    /// into its version directory
    ///
    /// Kept outside `packages/` so a partial extraction is never scanned as
    /// an installed version.
    pub fn extract_dir(&self, archive_name: &str) -> PathBuf {
        self.root
            .join("staging")
            .join("extract")
            .join(archive_name)
    }

    /// `<root>/build`
    pub fn build_root(&self) -> PathBuf {
        self.root.join("build")
    }

    /// Persisted selection
    pub fn selection_path(&self) -> PathBuf {
        self.root.join("selected.toml")
    }

    /// Persisted remote index ETags
    pub fn etags_path(&self) -> PathBuf {
        self.root.join("etags.toml")
    }

    /// Local copy of a named index
    ///
    /// The default index is stored as `package_index.json`, others as
    /// `package_<name>_index.json`.
    pub fn index_path(&self, name: &str) -> PathBuf {
        if name == DEFAULT_INDEX_NAME {
            self.root.join("package_index.json")
        } else {
            self.root.join(format!("package_{name}_index.json"))
        }
    }
}
