//! Tool dependency check
//!
//! A platform release lists the tools it needs. Tools already installed are
//! satisfied; for the rest the download matching the running host is turned
//! into an install request.

use std::path::{Path, PathBuf};

use crate::core::catalog::{Catalog, HostDownload, IndexPlatform};
use crate::core::installed::InstalledCatalog;
use crate::infra::layout::ToolchainLayout;

/// What a download task installs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallKind {
    /// Platform archive, installed under `hardware/<arch>`
    Platform,
    /// Tool archive, installed under `tools/<name>`
    Tool,
}

/// A request to install one platform or tool version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DownloadTask {
    /// Platform or tool
    pub kind: InstallKind,
    /// Owning package
    pub package: String,
    /// Install directory name (architecture for platforms)
    pub name: String,
    /// Version directory name
    pub version: String,
    /// Archive URL
    pub url: String,
    /// Index checksum, if any
    pub checksum: Option<String>,
}

impl DownloadTask {
    /// Install request for a platform release
    pub fn platform(package: &str, release: &IndexPlatform) -> Self {
        Self {
            kind: InstallKind::Platform,
            package: package.to_string(),
            name: release.architecture.clone(),
            version: release.version.clone(),
            url: release.url.clone(),
            checksum: non_empty(&release.checksum),
        }
    }

    /// Install request for a tool download
    pub fn tool(package: &str, name: &str, version: &str, download: &HostDownload) -> Self {
        Self {
            kind: InstallKind::Tool,
            package: package.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            url: download.url.clone(),
            checksum: non_empty(&download.checksum),
        }
    }

    /// Directory whose presence marks this task as installed
    pub fn target_dir(&self, layout: &ToolchainLayout) -> PathBuf {
        match self.kind {
            InstallKind::Platform => layout.platform_dir(&self.package, &self.name, &self.version),
            InstallKind::Tool => layout.tool_dir(&self.package, &self.name, &self.version),
        }
    }

    /// Archive file name taken from the URL
    pub fn archive_name(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Operating system family of the running host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    /// Windows
    Windows,
    /// macOS
    MacOs,
    /// Linux
    Linux,
    /// Anything else; never matches a download
    Other,
}

/// Running host as far as download selection cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    /// OS family
    pub os: HostOs,
    /// CPU architecture (`i686`, `x86_64`, `arm`, `aarch64`, ...)
    pub machine: String,
}

impl HostInfo {
    /// Create host info
    pub fn new(os: HostOs, machine: impl Into<String>) -> Self {
        Self {
            os,
            machine: machine.into(),
        }
    }

    /// Host this binary runs on
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "windows" => HostOs::Windows,
            "macos" => HostOs::MacOs,
            "linux" => HostOs::Linux,
            _ => HostOs::Other,
        };
        let machine = match std::env::consts::ARCH {
            "x86" => "i686",
            other => other,
        };
        Self::new(os, machine)
    }

    /// Whether a download built for `triplet` runs here
    ///
    /// Windows takes `mingw32` builds and macOS takes `apple` builds. Linux
    /// needs a `linux` build whose CPU equals the host's, except that `arm`
    /// builds are accepted on every Linux host.
    pub fn matches(&self, triplet: &str) -> bool {
        let mut parts = triplet.split('-');
        let Some(arch) = parts.next() else {
            return false;
        };
        let rest: Vec<&str> = parts.collect();
        if rest.is_empty() {
            return false;
        }

        match self.os {
            HostOs::Windows => rest.contains(&"mingw32"),
            HostOs::MacOs => rest.contains(&"apple"),
            HostOs::Linux => rest.contains(&"linux") && (arch == self.machine || arch == "arm"),
            HostOs::Other => false,
        }
    }

    /// First download entry usable on this host
    pub fn select<'a>(&self, systems: &'a [HostDownload]) -> Option<&'a HostDownload> {
        systems.iter().find(|s| self.matches(&s.host))
    }
}

/// Result of a tool dependency check
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCheck {
    /// All tools were already installed
    pub ready: bool,
    /// Installs to enqueue
    pub requests: Vec<DownloadTask>,
    /// Tools that could not be requested
    pub warnings: Vec<String>,
}

/// Check the tools a platform release depends on
pub fn check_tool_dependencies(
    catalog: &Catalog,
    installed: &InstalledCatalog,
    release: &IndexPlatform,
    host: &HostInfo,
) -> ToolCheck {
    let mut check = ToolCheck {
        ready: true,
        ..ToolCheck::default()
    };

    for dep in &release.tools_dependencies {
        if installed
            .tool_path(&dep.packager, &dep.name, &dep.version)
            .is_some()
        {
            continue;
        }
        check.ready = false;

        let Some(tool) = catalog.tool_release(&dep.packager, &dep.name, &dep.version) else {
            check.warnings.push(format!(
                "[{}] {} {}: not found in any index",
                dep.packager, dep.name, dep.version
            ));
            continue;
        };

        match host.select(&tool.systems) {
            Some(download) => {
                tracing::debug!("Requesting {} {} from {}", dep.name, dep.version, download.url);
                check.requests.push(DownloadTask::tool(
                    &dep.packager,
                    &dep.name,
                    &dep.version,
                    download,
                ));
            }
            None => check.warnings.push(format!(
                "[{}] {} {}: no download for this host",
                dep.packager, dep.name, dep.version
            )),
        }
    }

    check
}

/// Installed directories of the tools a platform release depends on
pub fn installed_tool_dirs<'a>(
    installed: &'a InstalledCatalog,
    release: &IndexPlatform,
) -> Vec<(String, &'a Path)> {
    release
        .tools_dependencies
        .iter()
        .filter_map(|dep| {
            installed
                .tool_path(&dep.packager, &dep.name, &dep.version)
                .map(|path| (dep.name.clone(), path))
        })
        .collect()
}
