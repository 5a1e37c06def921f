//! Header lookup
//!
//! Maps a header basename to the one directory that provides it. Library
//! roots are walked recursively; later sources override earlier ones, so a
//! project header beats a core header, which beats platform libraries,
//! which beat sketchbook libraries.

use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

use crate::config::defaults::HEADER_SCAN_EXCLUDES;
use crate::infra::filesystem;

/// Header file extensions
pub const HEADER_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "hxx", "h++"];

/// Compilable source extensions
pub const SOURCE_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "c++", "S", "s"];

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.contains(&e))
}

/// Whether a path names a header
pub fn is_header(path: &Path) -> bool {
    has_extension(path, HEADER_EXTENSIONS)
}

/// Whether a path names a compilable source
pub fn is_source(path: &Path) -> bool {
    has_extension(path, SOURCE_EXTENSIONS)
}

/// Sorted files directly inside `dir` accepted by `filter`
pub fn list_files(dir: &Path, filter: fn(&Path) -> bool) -> Vec<PathBuf> {
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .into_iter()
        .flatten()
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && filter(p))
        .collect();
    files.sort();
    files
}

fn include_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?m)^[ \t]*#[ \t]*include[ \t]*[<"]([^>"\r\n]+)[>"]"#).ok())
        .as_ref()
}

/// Basenames of the headers a source text includes, in order
pub fn include_directives(text: &str) -> Vec<String> {
    let Some(re) = include_regex() else {
        return Vec::new();
    };
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| {
            let name = m.as_str().trim();
            name.rsplit(['/', '\\']).next().unwrap_or(name).to_string()
        })
        .collect()
}

/// Headers included by a file; unreadable files include nothing
pub fn scan_includes(path: &Path) -> Vec<String> {
    match std::fs::read(path) {
        Ok(bytes) => include_directives(&String::from_utf8_lossy(&bytes)),
        Err(e) => {
            tracing::warn!("Cannot scan {}: {e}", path.display());
            Vec::new()
        }
    }
}

/// Source root of a library: `<lib>/src` when present, else `<lib>`
pub fn library_root(lib_dir: &Path) -> PathBuf {
    let src = lib_dir.join("src");
    if src.is_dir() {
        src
    } else {
        lib_dir.to_path_buf()
    }
}

/// Where headers are looked up for one build
#[derive(Debug, Clone, Default)]
pub struct HeaderSources {
    /// Sketchbook (its `libraries/` is searched)
    pub sketchbook: Option<PathBuf>,
    /// Selected platform version (its `libraries/` is searched)
    pub platform_dir: Option<PathBuf>,
    /// Core source directory, for sketch projects
    pub core_dir: Option<PathBuf>,
    /// Project directory
    pub project_dir: PathBuf,
}

/// Header basename to owning directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderIndex {
    owners: HashMap<String, PathBuf>,
}

impl HeaderIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index in override order
    pub fn build(sources: &HeaderSources) -> Self {
        let mut index = Self::new();
        for base in [&sources.sketchbook, &sources.platform_dir]
            .into_iter()
            .flatten()
        {
            for lib in filesystem::list_dirs(&base.join("libraries")) {
                index.add_tree(&library_root(&lib));
            }
        }
        if let Some(core) = &sources.core_dir {
            index.add_tree(core);
        }
        index.add_tree(&sources.project_dir);
        tracing::debug!("Indexed {} header(s)", index.owners.len());
        index
    }

    /// Register every header below `root`, skipping example trees
    pub fn add_tree(&mut self, root: &Path) {
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !e.file_type().is_dir()
                    || !e
                        .file_name()
                        .to_str()
                        .is_some_and(|n| HEADER_SCAN_EXCLUDES.contains(&n))
            });
        for entry in walker.filter_map(Result::ok) {
            let path = entry.path();
            if !entry.file_type().is_file() || !is_header(path) {
                continue;
            }
            if let (Some(name), Some(dir)) = (
                path.file_name().and_then(|n| n.to_str()),
                path.parent(),
            ) {
                self.owners.insert(name.to_string(), dir.to_path_buf());
            }
        }
    }

    /// Register one header
    pub fn insert(&mut self, header: impl Into<String>, dir: impl Into<PathBuf>) {
        self.owners.insert(header.into(), dir.into());
    }

    /// Directory owning a header
    pub fn owner(&self, header: &str) -> Option<&Path> {
        self.owners.get(header).map(PathBuf::as_path)
    }

    /// Number of indexed headers
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// Every directory named `include` below `root`
///
/// The search stops descending at the first `include` directory on a path.
pub fn find_include_dirs(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut walker = WalkDir::new(root).sort_by_file_name().into_iter();
    while let Some(entry) = walker.next() {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_dir() {
            continue;
        }
        if entry.file_name() == "include" {
            found.push(entry.path().to_path_buf());
            walker.skip_current_dir();
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::generators::header_name;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn test_include_directives() {
        let text = r#"
#include <Arduino.h>
  #  include "util/delay.h"
// #include <Commented.h>
int x; #include <Inline.h>
#include<Wire.h>
"#;
        assert_eq!(
            include_directives(text),
            vec!["Arduino.h", "delay.h", "Wire.h"]
        );
    }

    #[test]
    fn test_extension_classes() {
        assert!(is_header(Path::new("a/b.hpp")));
        assert!(is_source(Path::new("start.S")));
        assert!(is_source(Path::new("x.c++")));
        assert!(!is_source(Path::new("sketch.ino")));
        assert!(!is_header(Path::new("README")));
    }

    #[test]
    fn test_library_root_prefers_src() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "Servo/src/Servo.h");
        touch(temp.path(), "Flat/Flat.h");
        assert_eq!(
            library_root(&temp.path().join("Servo")),
            temp.path().join("Servo/src")
        );
        assert_eq!(
            library_root(&temp.path().join("Flat")),
            temp.path().join("Flat")
        );
    }

    #[test]
    fn test_build_override_order_and_excludes() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(root, "book/libraries/Wire/Wire.h");
        touch(root, "book/libraries/Wire/examples/Demo/Demo.h");
        touch(root, "platform/libraries/Wire/src/Wire.h");
        touch(root, "platform/libraries/SPI/SPI.h");
        touch(root, "platform/cores/arduino/Arduino.h");
        touch(root, "project/SPI.h");

        let index = HeaderIndex::build(&HeaderSources {
            sketchbook: Some(root.join("book")),
            platform_dir: Some(root.join("platform")),
            core_dir: Some(root.join("platform/cores/arduino")),
            project_dir: root.join("project"),
        });

        assert_eq!(
            index.owner("Wire.h"),
            Some(root.join("platform/libraries/Wire/src").as_path())
        );
        assert_eq!(index.owner("SPI.h"), Some(root.join("project").as_path()));
        assert_eq!(
            index.owner("Arduino.h"),
            Some(root.join("platform/cores/arduino").as_path())
        );
        assert!(index.owner("Demo.h").is_none());
    }

    #[test]
    fn test_find_include_dirs_stops_at_first_include() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "avr/include/avr/io.h");
        touch(temp.path(), "avr/include/include/odd.h");
        touch(temp.path(), "lib/gcc/avr/7.3.0/include/stddef.h");
        touch(temp.path(), "bin/avr-gcc");

        let dirs = find_include_dirs(temp.path());
        assert_eq!(
            dirs,
            vec![
                temp.path().join("avr/include"),
                temp.path().join("lib/gcc/avr/7.3.0/include"),
            ]
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Quoted, angled and nested includes all yield the basename
        #[test]
        fn prop_include_basename(name in header_name(), dir in "[a-z]{1,6}") {
            let text = format!(
                "#include <{name}>\n  #  include \"{dir}/{name}\"\n#include <{dir}\\{name}>\n"
            );
            prop_assert_eq!(include_directives(&text), vec![name.clone(), name.clone(), name]);
        }
    }
}
