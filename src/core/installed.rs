//! Installed package scan
//!
//! Mirrors what is actually present below `<root>/packages`. Anything on disk
//! shows up here, whether or not a network index still lists it.

use std::path::{Path, PathBuf};

use crate::core::catalog::Catalog;
use crate::core::version::compare_versions;
use crate::infra::filesystem;
use crate::infra::layout::ToolchainLayout;

/// Installed packages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstalledCatalog {
    packages: Vec<InstalledPackage>,
}

/// Installed package
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstalledPackage {
    /// Package name
    pub name: String,
    /// Installed platforms
    pub platforms: Vec<InstalledPlatform>,
    /// Installed tools
    pub tools: Vec<InstalledTool>,
}

/// Installed platform
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstalledPlatform {
    /// Display name from the index, or the architecture directory name
    pub name: String,
    /// Architecture directory name
    pub architecture: String,
    /// Installed versions, oldest first
    pub versions: Vec<InstalledVersion>,
}

/// Installed tool
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstalledTool {
    /// Tool name
    pub name: String,
    /// Installed versions, oldest first
    pub versions: Vec<InstalledVersion>,
}

/// One installed version directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstalledVersion {
    /// Version directory name
    pub version: String,
    /// Full path of the version directory
    pub path: PathBuf,
}

impl InstalledCatalog {
    /// Create an empty installed catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan the packages directory
    ///
    /// Platform display names are looked up in `catalog` by architecture.
    pub fn scan(layout: &ToolchainLayout, catalog: &Catalog) -> Self {
        let mut packages = Vec::new();
        for package_dir in filesystem::list_dirs(&layout.packages_dir()) {
            let Some(package_name) = dir_name(&package_dir) else {
                continue;
            };

            let platforms = filesystem::list_dirs(&package_dir.join("hardware"))
                .into_iter()
                .filter_map(|arch_dir| {
                    let arch = dir_name(&arch_dir)?;
                    let name = catalog
                        .platform_name_by_arch(&package_name, &arch)
                        .map_or_else(|| arch.clone(), str::to_string);
                    Some(InstalledPlatform {
                        name,
                        architecture: arch,
                        versions: scan_versions(&arch_dir),
                    })
                })
                .collect();

            let tools = filesystem::list_dirs(&package_dir.join("tools"))
                .into_iter()
                .filter_map(|tool_dir| {
                    Some(InstalledTool {
                        name: dir_name(&tool_dir)?,
                        versions: scan_versions(&tool_dir),
                    })
                })
                .collect();

            packages.push(InstalledPackage {
                name: package_name,
                platforms,
                tools,
            });
        }

        tracing::debug!("Found {} installed package(s)", packages.len());
        Self { packages }
    }

    /// Build from already structured packages
    pub fn from_packages(packages: Vec<InstalledPackage>) -> Self {
        Self { packages }
    }

    /// Installed packages
    pub fn packages(&self) -> &[InstalledPackage] {
        &self.packages
    }

    /// Installed package names
    pub fn package_names(&self) -> Vec<String> {
        self.packages.iter().map(|p| p.name.clone()).collect()
    }

    /// Look up an installed package
    pub fn package(&self, name: &str) -> Option<&InstalledPackage> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Installed platform names of a package
    pub fn platform_names(&self, package: &str) -> Vec<String> {
        self.package(package)
            .map(|p| p.platforms.iter().map(|pl| pl.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Look up an installed platform by display name
    pub fn platform(&self, package: &str, platform: &str) -> Option<&InstalledPlatform> {
        self.package(package)?
            .platforms
            .iter()
            .find(|p| p.name == platform)
    }

    /// Installed versions of a platform, oldest first
    pub fn versions(&self, package: &str, platform: &str) -> Vec<String> {
        self.platform(package, platform)
            .map(|p| p.versions.iter().map(|v| v.version.clone()).collect())
            .unwrap_or_default()
    }

    /// Directory of an installed platform version
    pub fn platform_path(&self, package: &str, platform: &str, version: &str) -> Option<&Path> {
        self.platform(package, platform)?
            .versions
            .iter()
            .find(|v| v.version == version)
            .map(|v| v.path.as_path())
    }

    /// Directory of an installed tool version
    pub fn tool_path(&self, package: &str, name: &str, version: &str) -> Option<&Path> {
        self.package(package)?
            .tools
            .iter()
            .find(|t| t.name == name)?
            .versions
            .iter()
            .find(|v| v.version == version)
            .map(|v| v.path.as_path())
    }
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
}

fn scan_versions(dir: &Path) -> Vec<InstalledVersion> {
    let mut versions: Vec<InstalledVersion> = filesystem::list_dirs(dir)
        .into_iter()
        .filter_map(|path| {
            Some(InstalledVersion {
                version: dir_name(&path)?,
                path,
            })
        })
        .collect();
    versions.sort_by(|a, b| compare_versions(&a.version, &b.version));
    versions
}
