//! Projects and sketches
//!
//! A project directory is a sketch when it holds `<dir-name>.ino` or
//! `<dir-name>.pde`; anything else is built as a plain source tree. Sketch
//! files are combined into one C++ translation unit in the build directory.

use std::path::{Path, PathBuf};

use crate::core::headers::{is_header, list_files};
use crate::error::ProjectError;
use crate::infra::filesystem;

/// Sketch file extensions
pub const SKETCH_EXTENSIONS: &[&str] = &["ino", "pde"];

/// Whether a path names a sketch file
pub fn is_sketch_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SKETCH_EXTENSIONS.contains(&e))
}

/// A project opened for building
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    path: PathBuf,
    name: String,
    build_dir: PathBuf,
    principal: Option<PathBuf>,
}

impl Project {
    /// Open a project directory; output goes to `<build_root>/<name>`
    pub fn open(path: &Path, build_root: &Path) -> Result<Self, ProjectError> {
        if !path.is_dir() {
            return Err(ProjectError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "sketch".to_string());
        let principal = SKETCH_EXTENSIONS
            .iter()
            .map(|ext| path.join(format!("{name}.{ext}")))
            .find(|p| p.is_file());

        Ok(Self {
            path: path.to_path_buf(),
            build_dir: build_root.join(&name),
            name,
            principal,
        })
    }

    /// Project directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Project name (directory name)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build output directory
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Whether this is a sketch project
    pub fn is_sketch(&self) -> bool {
        self.principal.is_some()
    }

    /// File to open for this project
    ///
    /// The existing `.ino`/`.pde` for sketches, otherwise `<name>.ino`.
    pub fn principal_file(&self) -> PathBuf {
        self.principal
            .clone()
            .unwrap_or_else(|| self.path.join(format!("{}.ino", self.name)))
    }

    /// Sketch files, principal first and the rest by name
    pub fn sketch_files(&self) -> Vec<PathBuf> {
        let Some(principal) = &self.principal else {
            return Vec::new();
        };
        let mut files = vec![principal.clone()];
        files.extend(
            list_files(&self.path, is_sketch_file)
                .into_iter()
                .filter(|f| f != principal),
        );
        files
    }

    /// Path of the combined sketch translation unit
    pub fn combined_source_path(&self) -> PathBuf {
        self.build_dir.join(format!("{}.ino.cpp", self.name))
    }

    /// Write the combined sketch source
    ///
    /// The file is only rewritten when its content changes so an unchanged
    /// sketch keeps its modification time. Returns `None` for plain projects.
    pub fn generate_combined_source(&self) -> Result<Option<PathBuf>, ProjectError> {
        if !self.is_sketch() {
            return Ok(None);
        }

        let mut text = String::from("#include <Arduino.h>\n");
        for file in self.sketch_files() {
            let body = filesystem::read_file(&file)?;
            text.push_str(&format!("#line 1 \"{}\"\n", file.display()).replace('\\', "/"));
            text.push_str(&body);
            if !body.ends_with('\n') {
                text.push('\n');
            }
        }

        let target = self.combined_source_path();
        let current = filesystem::read_file(&target).ok();
        if current.as_deref() != Some(text.as_str()) {
            tracing::debug!("Writing {}", target.display());
            filesystem::write_file(&target, &text)?;
        }
        Ok(Some(target))
    }

    /// Directories the resolver starts from
    pub fn source_roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![self.path.clone()];
        if self.is_sketch() {
            roots.push(self.build_dir.clone());
        }
        roots
    }
}

/// Create a new sketch in the sketchbook
///
/// A leading digit gets a `_` prefix. Returns the new principal file.
pub fn new_sketch(sketchbook: &Path, name: &str) -> Result<PathBuf, ProjectError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ProjectError::BlankName);
    }
    let name = if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{name}")
    } else {
        name.to_string()
    };

    let dir = sketchbook.join(&name);
    if dir.exists() {
        return Err(ProjectError::AlreadyExists { name });
    }

    let file = dir.join(format!("{name}.ino"));
    filesystem::write_file(
        &file,
        "void setup()\n{\n\t\n}\n\nvoid loop()\n{\n\t\n}\n\n",
    )?;
    tracing::info!("Created sketch {}", file.display());
    Ok(file)
}

/// `#include` lines for every top-level header of a library
pub fn library_includes(lib_dir: &Path) -> String {
    let root = crate::core::headers::library_root(lib_dir);
    let lines: Vec<String> = list_files(&root, is_header)
        .iter()
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
        .map(|name| format!("#include <{name}>"))
        .collect();
    format!("{}\n\n", lines.join("\n"))
}
