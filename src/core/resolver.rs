//! Include-driven dependency resolution
//!
//! Starting from the project's root directories, every directory is scanned
//! once for headers and compilable sources. Includes that name a header in
//! the [`HeaderIndex`] pull the owning directory in as a new root. Traversal
//! is depth-first over an explicit stack.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::core::headers::{is_header, is_source, list_files, scan_includes, HeaderIndex};

/// Append-only record of what resolution has visited
#[derive(Debug, Clone, Default)]
pub struct Closure {
    dirs: Vec<PathBuf>,
    headers: Vec<String>,
    sources: Vec<PathBuf>,
    seen_dirs: HashSet<PathBuf>,
    seen_headers: HashSet<String>,
    seen_sources: HashSet<PathBuf>,
}

impl Closure {
    /// Create an empty closure
    pub fn new() -> Self {
        Self::default()
    }

    /// Closure with directories that must never be scanned
    pub fn with_visited_dirs(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut closure = Self::new();
        for dir in dirs {
            closure.visit_dir(&dir);
        }
        closure
    }

    /// Visited directories in visit order
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Visited header basenames in visit order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Compilable sources in discovery order
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Whether a directory has been visited
    pub fn is_visited(&self, dir: &Path) -> bool {
        self.seen_dirs.contains(dir)
    }

    fn visit_dir(&mut self, dir: &Path) -> bool {
        if !self.seen_dirs.insert(dir.to_path_buf()) {
            return false;
        }
        self.dirs.push(dir.to_path_buf());
        true
    }

    /// First writer wins: a basename already seen is not claimed again
    fn visit_header(&mut self, name: &str) -> bool {
        if !self.seen_headers.insert(name.to_string()) {
            return false;
        }
        self.headers.push(name.to_string());
        true
    }

    fn visit_source(&mut self, path: &Path) -> bool {
        if !self.seen_sources.insert(path.to_path_buf()) {
            return false;
        }
        self.sources.push(path.to_path_buf());
        true
    }
}

/// Extend `closure` with everything reachable from `roots`
pub fn resolve(roots: &[PathBuf], index: &HeaderIndex, mut closure: Closure) -> Closure {
    let mut stack: Vec<PathBuf> = roots.iter().rev().cloned().collect();

    while let Some(dir) = stack.pop() {
        if !closure.visit_dir(&dir) {
            continue;
        }

        let mut fresh = Vec::new();
        for header in list_files(&dir, is_header) {
            let Some(name) = header.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if closure.visit_header(name) {
                fresh.push(header);
            }
        }
        for source in list_files(&dir, is_source) {
            if closure.visit_source(&source) {
                fresh.push(source);
            }
        }

        let mut children: Vec<PathBuf> = Vec::new();
        for file in &fresh {
            for include in scan_includes(file) {
                let Some(owner) = index.owner(&include) else {
                    continue;
                };
                if !closure.is_visited(owner) && !children.iter().any(|c| c == owner) {
                    children.push(owner.to_path_buf());
                }
            }
        }

        tracing::trace!(
            "{}: {} new file(s), {} child dir(s)",
            dir.display(),
            fresh.len(),
            children.len()
        );
        stack.extend(children.into_iter().rev());
    }

    closure
}
