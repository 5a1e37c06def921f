//! Property file handling
//!
//! Platform definitions ship `boards.txt`, `platform.txt` and
//! `programmers.txt` as flat `key=value` files. Keys keep their file order,
//! which decides the order boards and menu values are listed in.

use std::collections::HashMap;
use std::path::Path;

use crate::error::FilesystemError;
use crate::infra::filesystem;

/// Ordered `key=value` property map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl Properties {
    /// Create an empty property map
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse property text
    ///
    /// Blank lines and `#` comments are skipped, as are lines without `=`.
    /// A repeated key keeps its first position and takes the last value.
    pub fn parse(content: &str) -> Self {
        let mut props = Self::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                props.insert(key.trim(), value.trim());
            }
        }
        props
    }

    /// Load a property file; a missing file yields an empty map
    pub fn load(path: &Path) -> Result<Self, FilesystemError> {
        if !path.is_file() {
            return Ok(Self::new());
        }
        Ok(Self::parse(&filesystem::read_file(path)?))
    }

    /// Insert or replace a value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(&pos) = self.index.get(&key) {
            self.entries[pos].1 = value;
        } else {
            self.index.insert(key.clone(), self.entries.len());
            self.entries.push((key, value));
        }
    }

    /// Look up a value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.index.get(key).map(|&pos| self.entries[pos].1.as_str())
    }

    /// Check whether a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Iterate entries in file order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries below `prefix.`, with the prefix stripped
    pub fn subtree(&self, prefix: &str) -> Self {
        let dotted = format!("{prefix}.");
        let mut sub = Self::new();
        for (key, value) in self.iter() {
            if let Some(rest) = key.strip_prefix(&dotted) {
                sub.insert(rest, value);
            }
        }
        sub
    }

    /// Distinct first key segments in file order
    pub fn first_segments(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for (key, _) in self.iter() {
            let head = key.split('.').next().unwrap_or(key);
            if !seen.iter().any(|s: &String| s == head) {
                seen.push(head.to_string());
            }
        }
        seen
    }

    /// Overlay another map; its values win
    pub fn extend(&mut self, other: &Self) {
        for (key, value) in other.iter() {
            self.insert(key, value);
        }
    }
}
