//! Incremental build planning
//!
//! Decides what has to be recompiled and expands recipes into the ordered
//! command list of one build. The first source is the project's root file;
//! every other source is compiled into objects that are collected in the
//! `core.a` archive, which is all-or-nothing: any changed non-root source
//! makes the whole archive stale.

use std::path::{Path, PathBuf};

use crate::config::defaults::{CORE_ARCHIVE, LAST_BUILD_FILE};
use crate::core::last_build::{source_key, BuildSignature, LastBuildRecord};
use crate::core::recipe::{
    RecipeCommands, AR_PATTERN, ASM_PATTERN, COMBINE_PATTERN, CPP_PATTERN, C_PATTERN,
    OBJCOPY_BIN_PATTERN, OBJCOPY_EEP_PATTERN, OBJCOPY_HEX_PATTERN, OUTPUT_SAVE_FILE,
};
use crate::error::PlanError;
use crate::infra::filesystem;

/// Label of the first archive command
pub const ARCHIVE_LABEL: &str = "Creating core.a...";
/// Label of the link command
pub const BINARY_LABEL: &str = "Creating binary file...";

/// Inputs of one planning run
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    /// Expanded command mapping
    pub recipes: &'a RecipeCommands,
    /// Build output directory
    pub build_dir: &'a Path,
    /// Base name of the elf and binary outputs
    pub project_name: &'a str,
    /// Sources, root file first
    pub sources: &'a [PathBuf],
    /// Current selection signature
    pub signature: &'a BuildSignature,
    /// Rebuild everything regardless of the record
    pub force_full: bool,
}

/// One command with its progress label; a blank label continues the
/// previous step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCommand {
    /// Shell command line
    pub command: String,
    /// Progress label, possibly empty
    pub label: String,
}

/// Planned build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    /// Commands in execution order
    pub commands: Vec<PlannedCommand>,
    /// Whether everything is rebuilt
    pub full_rebuild: bool,
    /// Whether archive commands were emitted
    pub archive_rebuilt: bool,
    /// Whether link and conversion commands were emitted
    pub binaries_rebuilt: bool,
    /// Record written for this plan
    pub record: LastBuildRecord,
}

/// Progress message and command of one execution step
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStep<'a> {
    /// `[<pct>%] <label>` for labelled commands
    pub message: Option<String>,
    /// Command line
    pub command: &'a str,
}

impl BuildPlan {
    /// Commands paired with progress messages
    ///
    /// The percentage counts labelled commands only.
    pub fn steps(&self) -> Vec<PlanStep<'_>> {
        let total = self.commands.iter().filter(|c| !c.label.is_empty()).count();
        let mut done = 0usize;
        self.commands
            .iter()
            .map(|c| {
                let message = (!c.label.is_empty()).then(|| {
                    done += 1;
                    #[allow(clippy::cast_precision_loss)]
                    let pct = done as f64 / total as f64 * 100.0;
                    format!("[{pct:.1}%] {}", c.label)
                });
                PlanStep {
                    message,
                    command: &c.command,
                }
            })
            .collect()
    }
}

/// Object file of a source: `<build>/<basename>.o`
pub fn object_path(build_dir: &Path, source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    build_dir.join(format!("{name}.o"))
}

/// Compile recipe key for a source, by extension
pub fn compile_rule(source: &Path) -> Option<&'static str> {
    match source.extension().and_then(|e| e.to_str()) {
        None => Some(CPP_PATTERN),
        Some("cpp" | "cc" | "cxx" | "c++" | "ino" | "pde") => Some(CPP_PATTERN),
        Some("c") => Some(C_PATTERN),
        Some("S" | "s") => Some(ASM_PATTERN),
        Some(_) => None,
    }
}

/// Substitute the per-file placeholders of a recipe
pub fn expand_file_command(pattern: &str, source: &str, object: &str) -> String {
    pattern
        .replace("{source_file}", source)
        .replace("{object_file}", object)
}

fn display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Extension of the flashable binary, taken from `recipe.output.save_file`
fn binary_extension(recipes: &RecipeCommands) -> String {
    match recipes.get(OUTPUT_SAVE_FILE) {
        Some(name) => {
            let chars: Vec<char> = name.chars().collect();
            chars[chars.len().saturating_sub(4)..].iter().collect()
        }
        None => ".bin".to_string(),
    }
}

/// Plan a build and rewrite the last-build record
///
/// The record is rewritten before any command runs, so it describes what
/// was attempted. A stale `core.a` is deleted here.
pub fn plan_build(request: &BuildRequest<'_>) -> Result<BuildPlan, PlanError> {
    let Some(root) = request.sources.first() else {
        return Err(PlanError::NoSources {
            project: request.project_name.to_string(),
        });
    };

    let build_dir = request.build_dir;
    let record_path = build_dir.join(LAST_BUILD_FILE);
    let last = LastBuildRecord::load(&record_path);
    let recipes = request.recipes;

    let full_rebuild = request.force_full || last.signature_differs(request.signature);
    let mtimes: Vec<Option<i64>> = request
        .sources
        .iter()
        .map(|s| filesystem::modified_nanos(s))
        .collect();
    let objects: Vec<PathBuf> = request
        .sources
        .iter()
        .map(|s| object_path(build_dir, s))
        .collect();

    // Sources without a usable compile recipe produce no object at all
    let patterns: Vec<Option<&str>> = request
        .sources
        .iter()
        .map(|source| {
            let pattern = compile_rule(source).and_then(|rule| recipes.get(rule));
            if pattern.is_none() {
                tracing::debug!("No compile recipe for {}", source.display());
            }
            pattern
        })
        .collect();
    let compiled = |i: &usize| patterns[*i].is_some();

    let needs_compile =
        |i: usize| last.is_modified(&request.sources[i], mtimes[i]) || !objects[i].is_file();

    let mut to_compile: Vec<usize> = Vec::new();
    let mut archive_stale = full_rebuild;
    let mut binaries_needed = full_rebuild;
    if full_rebuild {
        to_compile.extend((0..request.sources.len()).filter(compiled));
    } else {
        if compiled(&0) && needs_compile(0) {
            to_compile.push(0);
            binaries_needed = true;
        }
        for i in (1..request.sources.len()).filter(compiled) {
            if needs_compile(i) {
                to_compile.push(i);
                archive_stale = true;
            }
        }
    }

    let archive = build_dir.join(CORE_ARCHIVE);
    if archive_stale {
        binaries_needed = true;
        filesystem::remove_file(&archive)?;
    }

    let mut commands = Vec::new();
    for &i in &to_compile {
        let Some(pattern) = patterns[i] else {
            continue;
        };
        let source = &request.sources[i];
        commands.push(PlannedCommand {
            command: expand_file_command(pattern, &display(source), &display(&objects[i])),
            label: format!("Compile {}...", display(source)),
        });
    }

    let mut archive_rebuilt = false;
    if !archive.is_file() {
        if let Some(pattern) = recipes.get(AR_PATTERN) {
            for object in (1..objects.len()).filter(compiled).map(|i| &objects[i]) {
                commands.push(PlannedCommand {
                    command: pattern.replace("{object_file}", &display(object)),
                    label: if archive_rebuilt {
                        String::new()
                    } else {
                        ARCHIVE_LABEL.to_string()
                    },
                });
                archive_rebuilt = true;
            }
        }
    }

    let elf = build_dir.join(format!("{}.elf", request.project_name));
    let binary = build_dir.join(format!(
        "{}{}",
        request.project_name,
        binary_extension(recipes)
    ));
    if archive_rebuilt || !(elf.is_file() && binary.is_file()) {
        binaries_needed = true;
    }

    let mut binaries_rebuilt = false;
    if binaries_needed {
        if let Some(pattern) = recipes.get(COMBINE_PATTERN) {
            let root_object = format!("\"{}\"", display(&objects[0]));
            commands.push(PlannedCommand {
                command: pattern.replace("{object_files}", &root_object),
                label: BINARY_LABEL.to_string(),
            });
            binaries_rebuilt = true;
        }
        for key in [OBJCOPY_EEP_PATTERN, OBJCOPY_HEX_PATTERN, OBJCOPY_BIN_PATTERN] {
            if let Some(pattern) = recipes.get(key) {
                commands.push(PlannedCommand {
                    command: pattern.to_string(),
                    label: if binaries_rebuilt {
                        String::new()
                    } else {
                        BINARY_LABEL.to_string()
                    },
                });
                binaries_rebuilt = true;
            }
        }
    }

    let snapshot: Vec<(String, i64)> = request
        .sources
        .iter()
        .zip(&mtimes)
        .filter_map(|(s, m)| m.map(|m| (source_key(s), m)))
        .collect();
    let record = LastBuildRecord::snapshot(request.signature, &snapshot);
    record.save(&record_path)?;

    tracing::info!(
        "Planned {} command(s) for {} (full: {full_rebuild})",
        commands.len(),
        root.display()
    );

    Ok(BuildPlan {
        commands,
        full_rebuild,
        archive_rebuilt,
        binaries_rebuilt,
        record,
    })
}
