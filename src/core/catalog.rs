//! Package catalog
//!
//! The catalog is the merged view of every package index document found in
//! the toolchain root (`package*_index.json`). Documents are merged by
//! package name and the first document to define a package owns it.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::version::compare_versions;
use crate::error::CatalogError;
use crate::infra::filesystem;

/// Raw package index document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexDocument {
    /// Packages defined by this document
    #[serde(default)]
    pub packages: Vec<IndexPackage>,
}

/// Package entry of an index document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexPackage {
    /// Vendor namespace
    pub name: String,
    /// Maintainer name
    #[serde(default)]
    pub maintainer: String,
    /// Vendor website
    #[serde(default, rename = "websiteURL")]
    pub website_url: String,
    /// Help links
    #[serde(default)]
    pub help: HelpLinks,
    /// Platform releases
    #[serde(default)]
    pub platforms: Vec<IndexPlatform>,
    /// Tool releases
    #[serde(default)]
    pub tools: Vec<IndexTool>,
}

/// Help links
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HelpLinks {
    /// Online documentation URL
    #[serde(default)]
    pub online: String,
}

/// One platform release as listed in an index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexPlatform {
    /// Display name (e.g., "Arduino AVR Boards")
    pub name: String,
    /// Architecture directory name (e.g., "avr")
    pub architecture: String,
    /// Release version
    pub version: String,
    /// Category
    #[serde(default)]
    pub category: String,
    /// Archive URL
    #[serde(default)]
    pub url: String,
    /// Archive file name
    #[serde(default)]
    pub archive_file_name: String,
    /// Archive checksum (`SHA-256:<hex>`)
    #[serde(default)]
    pub checksum: String,
    /// Archive size in bytes
    #[serde(default)]
    pub size: String,
    /// Help links
    #[serde(default)]
    pub help: HelpLinks,
    /// Boards advertised by the release
    #[serde(default)]
    pub boards: Vec<IndexBoardName>,
    /// Tools this release needs
    #[serde(default)]
    pub tools_dependencies: Vec<ToolRef>,
}

/// Board name listed by a platform release
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndexBoardName {
    /// Board display name
    pub name: String,
}

/// Reference from a platform release to a tool release
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ToolRef {
    /// Package that publishes the tool
    pub packager: String,
    /// Tool name
    pub name: String,
    /// Tool version
    pub version: String,
}

/// One tool release as listed in an index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexTool {
    /// Tool name
    pub name: String,
    /// Release version
    pub version: String,
    /// Per-host downloads
    #[serde(default)]
    pub systems: Vec<HostDownload>,
}

/// Download of a tool release for one host triplet
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HostDownload {
    /// Host triplet (e.g., "x86_64-linux-gnu")
    pub host: String,
    /// Archive URL
    pub url: String,
    /// Archive file name
    #[serde(default)]
    pub archive_file_name: String,
    /// Archive checksum
    #[serde(default)]
    pub checksum: String,
    /// Archive size in bytes
    #[serde(default)]
    pub size: String,
}

/// Merged package catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    packages: Vec<CatalogPackage>,
}

/// Package in the merged catalog
#[derive(Debug, Clone, Default)]
pub struct CatalogPackage {
    /// Package name
    pub name: String,
    /// Package help URL
    pub help_url: String,
    /// Platforms in first-seen order
    pub platforms: Vec<CatalogPlatform>,
    /// Tools in first-seen order
    pub tools: Vec<CatalogTool>,
}

/// Platform with all of its releases
#[derive(Debug, Clone, Default)]
pub struct CatalogPlatform {
    /// Display name
    pub name: String,
    /// Architecture directory name
    pub architecture: String,
    /// Releases, oldest first
    pub releases: Vec<IndexPlatform>,
}

/// Tool with all of its releases
#[derive(Debug, Clone, Default)]
pub struct CatalogTool {
    /// Tool name
    pub name: String,
    /// Releases, oldest first
    pub releases: Vec<IndexTool>,
}

impl IndexDocument {
    /// Parse an index document from JSON text
    pub fn from_json(content: &str, source_name: &str) -> Result<Self, CatalogError> {
        serde_json::from_str(content).map_err(|e| CatalogError::IndexParse {
            source_name: source_name.to_string(),
            error: e.to_string(),
        })
    }
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from documents in order
    pub fn from_documents(documents: impl IntoIterator<Item = IndexDocument>) -> Self {
        let mut catalog = Self::new();
        for document in documents {
            catalog.merge(document);
        }
        catalog
    }

    /// Load every `package*_index.json` file in a directory
    ///
    /// The default `package_index.json` is merged first, the rest in name
    /// order. Unreadable or malformed files are skipped with a warning.
    pub fn load_dir(dir: &Path) -> Self {
        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .into_iter()
            .flatten()
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| is_index_file(p))
            .collect();
        paths.sort_by_key(|p| (!p.ends_with("package_index.json"), p.clone()));

        let mut catalog = Self::new();
        for path in paths {
            let source = path.display().to_string();
            let parsed = filesystem::read_file(&path)
                .map_err(|e| CatalogError::IndexRead {
                    path: path.clone(),
                    error: e.to_string(),
                })
                .and_then(|text| IndexDocument::from_json(&text, &source));
            match parsed {
                Ok(document) => catalog.merge(document),
                Err(e) => tracing::warn!("Skipping index: {e}"),
            }
        }
        tracing::debug!("Loaded {} package(s) from indexes", catalog.packages.len());
        catalog
    }

    /// Merge a document; packages already in the catalog are left untouched
    pub fn merge(&mut self, document: IndexDocument) {
        for package in document.packages {
            if self.package(&package.name).is_some() {
                tracing::debug!("Package '{}' already indexed, skipping", package.name);
                continue;
            }
            self.packages.push(CatalogPackage::from_index(package));
        }
    }

    /// Package names in catalog order
    pub fn package_names(&self) -> Vec<String> {
        self.packages.iter().map(|p| p.name.clone()).collect()
    }

    /// All packages
    pub fn packages(&self) -> &[CatalogPackage] {
        &self.packages
    }

    /// Look up a package
    pub fn package(&self, name: &str) -> Option<&CatalogPackage> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Look up a platform release by display name and version
    pub fn platform_release(
        &self,
        package: &str,
        platform: &str,
        version: &str,
    ) -> Option<&IndexPlatform> {
        self.package(package)?
            .platform(platform)?
            .releases
            .iter()
            .find(|r| r.version == version)
    }

    /// Display name of the platform using an architecture directory
    pub fn platform_name_by_arch(&self, package: &str, arch: &str) -> Option<&str> {
        self.package(package)?
            .platforms
            .iter()
            .find(|p| p.architecture == arch)
            .map(|p| p.name.as_str())
    }

    /// Look up a tool release
    pub fn tool_release(&self, package: &str, name: &str, version: &str) -> Option<&IndexTool> {
        self.package(package)?
            .tools
            .iter()
            .find(|t| t.name == name)?
            .releases
            .iter()
            .find(|r| r.version == version)
    }
}

impl CatalogPackage {
    fn from_index(index: IndexPackage) -> Self {
        let mut package = Self {
            name: index.name,
            help_url: index.help.online,
            platforms: Vec::new(),
            tools: Vec::new(),
        };

        for release in index.platforms {
            match package
                .platforms
                .iter_mut()
                .find(|p| p.name == release.name)
            {
                Some(platform) => platform.releases.push(release),
                None => package.platforms.push(CatalogPlatform {
                    name: release.name.clone(),
                    architecture: release.architecture.clone(),
                    releases: vec![release],
                }),
            }
        }
        for platform in &mut package.platforms {
            platform
                .releases
                .sort_by(|a, b| compare_versions(&a.version, &b.version));
        }

        for release in index.tools {
            match package.tools.iter_mut().find(|t| t.name == release.name) {
                Some(tool) => tool.releases.push(release),
                None => package.tools.push(CatalogTool {
                    name: release.name.clone(),
                    releases: vec![release],
                }),
            }
        }
        for tool in &mut package.tools {
            tool.releases
                .sort_by(|a, b| compare_versions(&a.version, &b.version));
        }

        package
    }

    /// Look up a platform by display name
    pub fn platform(&self, name: &str) -> Option<&CatalogPlatform> {
        self.platforms.iter().find(|p| p.name == name)
    }

    /// Platform display names in first-seen order
    pub fn platform_names(&self) -> Vec<String> {
        self.platforms.iter().map(|p| p.name.clone()).collect()
    }
}

impl CatalogPlatform {
    /// Release versions, oldest first
    pub fn versions(&self) -> Vec<String> {
        self.releases.iter().map(|r| r.version.clone()).collect()
    }
}

fn is_index_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("package") && n.ends_with("_index.json"))
}


#[cfg(test)]
mod tests {
    use super::fixtures::INDEX_JSON;
    use super::*;
    use tempfile::TempDir;

    fn catalog() -> Catalog {
        Catalog::from_documents([IndexDocument::from_json(INDEX_JSON, "test").unwrap()])
    }

    #[test]
    fn test_index_parses_packages_and_tools() {
        let catalog = catalog();
        assert_eq!(catalog.package_names(), vec!["arduino", "esp8266"]);

        let arduino = catalog.package("arduino").unwrap();
        assert_eq!(arduino.help_url, "https://forum.arduino.cc");
        assert_eq!(arduino.platform_names(), vec!["Arduino AVR Boards"]);
        assert_eq!(arduino.tools.len(), 2);
    }

    #[test]
    fn test_platform_releases_sorted_oldest_first() {
        let catalog = catalog();
        let avr = catalog
            .package("arduino")
            .unwrap()
            .platform("Arduino AVR Boards")
            .unwrap();
        assert_eq!(avr.versions(), vec!["1.6.23", "1.8.6"]);
    }

    #[test]
    fn test_platform_release_lookup() {
        let catalog = catalog();
        let release = catalog
            .platform_release("arduino", "Arduino AVR Boards", "1.8.6")
            .unwrap();
        assert_eq!(release.architecture, "avr");
        assert_eq!(release.tools_dependencies.len(), 2);
        assert_eq!(release.help.online, "https://docs.arduino.cc/avr");
        assert!(catalog
            .platform_release("arduino", "Arduino AVR Boards", "9.9.9")
            .is_none());
    }

    #[test]
    fn test_platform_name_by_arch() {
        let catalog = catalog();
        assert_eq!(
            catalog.platform_name_by_arch("arduino", "avr"),
            Some("Arduino AVR Boards")
        );
        assert_eq!(catalog.platform_name_by_arch("arduino", "sam"), None);
    }

    #[test]
    fn test_tool_release_lookup() {
        let catalog = catalog();
        let tool = catalog
            .tool_release("arduino", "avr-gcc", "7.3.0-atmel3.6.1-arduino7")
            .unwrap();
        assert_eq!(tool.systems.len(), 5);
    }

    #[test]
    fn test_later_document_does_not_overwrite_package() {
        let first = IndexDocument::from_json(INDEX_JSON, "first").unwrap();
        let second = IndexDocument::from_json(
            r#"{"packages":[{"name":"arduino","platforms":[],"tools":[]},{"name":"extra"}]}"#,
            "second",
        )
        .unwrap();

        let catalog = Catalog::from_documents([first, second]);
        assert_eq!(catalog.package_names(), vec!["arduino", "esp8266", "extra"]);
        assert_eq!(catalog.package("arduino").unwrap().platforms.len(), 1);
    }

    #[test]
    fn test_malformed_index_is_error() {
        let result = IndexDocument::from_json("{ not json", "broken");
        assert!(matches!(result, Err(CatalogError::IndexParse { .. })));
    }

    #[test]
    fn test_load_dir_skips_broken_and_foreign_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("package_index.json"), INDEX_JSON).unwrap();
        std::fs::write(temp.path().join("package_broken_index.json"), "{").unwrap();
        std::fs::write(temp.path().join("other.json"), "{}").unwrap();

        let catalog = Catalog::load_dir(temp.path());
        assert_eq!(catalog.package_names(), vec!["arduino", "esp8266"]);
    }

    #[test]
    fn test_load_dir_merges_default_index_first() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("package_index.json"), INDEX_JSON).unwrap();
        std::fs::write(
            temp.path().join("package_aaa_index.json"),
            r#"{"packages":[{"name":"arduino"}]}"#,
        )
        .unwrap();

        let catalog = Catalog::load_dir(temp.path());
        assert_eq!(catalog.package("arduino").unwrap().platforms.len(), 1);
    }
}
