//! CLI implementation for `sketchforge new` and `sketchforge lib-includes`

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::output::{print_detail, print_success};
use crate::config::GlobalConfig;
use crate::core::project::{library_includes, new_sketch};
use crate::infra::dirs::SketchforgeDirs;

/// Create a new sketch in the sketchbook
pub fn new(name: &str) -> Result<()> {
    let dirs = SketchforgeDirs::new();
    let config = GlobalConfig::load(&dirs).context("Failed to load global config")?;
    let file = new_sketch(&config.sketchbook(&dirs), name)
        .with_context(|| format!("Failed to create sketch '{name}'"))?;

    print_success(&format!("Created sketch {}", file.display()));
    print_detail("Build it with `sketchforge build <dir>`");
    Ok(())
}

/// Print the `#include` lines of a library
pub fn lib_includes(lib_dir: &Path) {
    print!("{}", library_includes(lib_dir));
}
