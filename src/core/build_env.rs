//! Build environment setup
//!
//! Collects what one build of the active toolchain needs: the platform,
//! board and programmer property layers, installed tool directories and the
//! runtime variables recipes refer to (`build.path`, `includes`, ...). Also
//! gathers the project's source set through the dependency resolver.

use std::path::{Path, PathBuf};

use crate::config::defaults::{CORE_ARCHIVE, IDE_VERSION};
use crate::core::headers::{find_include_dirs, HeaderIndex, HeaderSources};
use crate::core::last_build::BuildSignature;
use crate::core::project::Project;
use crate::core::properties::Properties;
use crate::core::recipe::RecipeCommands;
use crate::core::resolver::{resolve, Closure};
use crate::core::selection;
use crate::core::tooldeps::installed_tool_dirs;
use crate::core::workspace::Workspace;
use crate::error::{PlanError, ProjectError};

/// Everything about the active toolchain a build needs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildEnvironment {
    /// Selected platform version directory
    pub platform_dir: PathBuf,
    /// Architecture directory name (e.g., "avr")
    pub arch: String,
    /// `platform.txt`
    pub platform: Properties,
    /// Board properties with selected option values applied
    pub board: Properties,
    /// Selected programmer's properties
    pub programmer: Properties,
    /// Installed tool directories by tool name
    pub tool_dirs: Vec<(String, PathBuf)>,
    /// Selected serial port
    pub serial_port: Option<String>,
    /// Extra compiler flags from the configuration
    pub extra_flags: String,
    /// Ask the uploader for verbose output
    pub verbose_upload: bool,
    /// Identity of the selection, for the last-build record
    pub signature: BuildSignature,
}

impl BuildEnvironment {
    /// Capture the workspace's active toolchain
    pub fn from_workspace(
        ws: &Workspace,
        extra_flags: &str,
        verbose_upload: bool,
    ) -> Result<Self, PlanError> {
        let platform_dir = ws.selected_platform_dir().ok_or(PlanError::NoPlatform)?;
        let arch = platform_dir
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let platform = Properties::load(&platform_dir.join("platform.txt")).unwrap_or_else(|e| {
            tracing::warn!("{e}");
            Properties::new()
        });

        let tool_dirs = match ws.selected_release() {
            Some(release) => installed_tool_dirs(ws.installed(), release)
                .into_iter()
                .map(|(name, path)| (name, path.to_path_buf()))
                .collect(),
            None => package_tool_dirs(ws),
        };

        let option_keys = ws
            .selected_board()
            .map(|b| b.option_keys())
            .unwrap_or_default();

        Ok(Self {
            platform_dir,
            arch,
            platform,
            board: ws.selected_board_properties(),
            programmer: ws
                .selected_programmer()
                .map(|p| p.properties.clone())
                .unwrap_or_default(),
            tool_dirs,
            serial_port: ws.selection().get(selection::SERIAL_PORT).map(str::to_string),
            extra_flags: extra_flags.to_string(),
            verbose_upload,
            signature: BuildSignature::from_selection(ws.selection(), &option_keys),
        })
    }

    /// Core source directory named by `build.core`
    ///
    /// A `vendor:core` reference keeps only the core name.
    pub fn core_dir(&self) -> Option<PathBuf> {
        let core = self.board.get("build.core")?;
        let name = core.rsplit(':').next().unwrap_or(core);
        Some(self.platform_dir.join("cores").join(name))
    }

    /// Variant directory named by `build.variant`
    pub fn variant_dir(&self) -> Option<PathBuf> {
        let variant = self.board.get("build.variant")?;
        Some(self.platform_dir.join("variants").join(variant))
    }

    /// Every `include` directory below the installed tools
    pub fn tool_include_dirs(&self) -> Vec<PathBuf> {
        self.tool_dirs
            .iter()
            .flat_map(|(_, dir)| find_include_dirs(dir))
            .collect()
    }

    /// Runtime variables for one project build
    pub fn runtime_properties(&self, project: &Project, include_dirs: &[PathBuf]) -> Properties {
        let mut props = Properties::new();
        let build_path = slash(project.build_dir());

        props.insert("build.path", build_path.as_str());
        props.insert("build.project_name", project.name());
        props.insert("build.arch", self.arch.to_ascii_uppercase());
        props.insert("build.system.path", slash(&self.platform_dir.join("system")));
        if let Some(core) = self.core_dir() {
            props.insert("build.core.path", slash(&core));
        }
        if let Some(variant) = self.variant_dir() {
            props.insert("build.variant.path", slash(&variant));
        }
        props.insert("runtime.platform.path", slash(&self.platform_dir));
        if let Some(hardware) = self.platform_dir.parent().and_then(Path::parent) {
            props.insert("runtime.hardware.path", slash(hardware));
        }
        props.insert("runtime.ide.version", IDE_VERSION);
        props.insert("software", "ARDUINO");
        for (name, dir) in &self.tool_dirs {
            props.insert(format!("runtime.tools.{name}.path"), slash(dir));
        }

        let includes: Vec<String> = include_dirs
            .iter()
            .map(|d| format!("\"-I{}\"", slash(d)))
            .collect();
        props.insert("includes", includes.join(" "));

        let board_flags = self.board.get("build.extra_flags").unwrap_or_default();
        let extra = [board_flags, self.extra_flags.as_str()]
            .iter()
            .filter(|f| !f.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        props.insert("build.extra_flags", extra);

        props.insert("archive_file", CORE_ARCHIVE);
        props.insert("archive_file_path", format!("{build_path}/{CORE_ARCHIVE}"));

        if let Some(port) = &self.serial_port {
            props.insert("serial.port", port.as_str());
            let file = port.rsplit(['/', '\\']).next().unwrap_or(port);
            props.insert("serial.port.file", file);
        }
        let verbosity = if self.verbose_upload {
            "{upload.params.verbose}"
        } else {
            "{upload.params.quiet}"
        };
        props.insert("upload.verbose", verbosity);

        props
    }

    /// Fully expanded recipe commands for one project build
    pub fn recipes(&self, project: &Project, include_dirs: &[PathBuf]) -> RecipeCommands {
        let runtime = self.runtime_properties(project, include_dirs);
        RecipeCommands::resolve(&[&self.platform, &self.programmer, &self.board, &runtime])
    }
}

fn package_tool_dirs(ws: &Workspace) -> Vec<(String, PathBuf)> {
    let Some(package) = ws
        .selection()
        .get(selection::PACKAGE)
        .and_then(|p| ws.installed().package(p))
    else {
        return Vec::new();
    };
    package
        .tools
        .iter()
        .filter_map(|t| t.versions.last().map(|v| (t.name.clone(), v.path.clone())))
        .collect()
}

fn slash(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

/// Sources and include directories of one build
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceSet {
    /// Compilable sources; the root translation unit comes first
    pub sources: Vec<PathBuf>,
    /// `-I` directories in discovery order
    pub include_dirs: Vec<PathBuf>,
}

/// Resolve the source closure of a project
///
/// Sketches get their combined translation unit written first. Tool
/// `include` directories are marked visited up front so they are passed to
/// the compiler without being scanned; the core and variant directories
/// are appended last.
pub fn collect_sources(
    project: &Project,
    env: &BuildEnvironment,
    sketchbook: Option<&Path>,
) -> Result<SourceSet, ProjectError> {
    let combined = project.generate_combined_source()?;

    let core_dir = env.core_dir();
    let index = HeaderIndex::build(&HeaderSources {
        sketchbook: sketchbook.map(Path::to_path_buf),
        platform_dir: Some(env.platform_dir.clone()),
        core_dir: if project.is_sketch() { core_dir.clone() } else { None },
        project_dir: project.path().to_path_buf(),
    });

    let closure = resolve(
        &project.source_roots(),
        &index,
        Closure::with_visited_dirs(env.tool_include_dirs()),
    );

    let mut sources = closure.sources().to_vec();
    if let Some(root) = combined {
        if let Some(pos) = sources.iter().position(|s| *s == root) {
            let root = sources.remove(pos);
            sources.insert(0, root);
        }
    }

    let mut include_dirs = closure.dirs().to_vec();
    for dir in [core_dir, env.variant_dir()].into_iter().flatten() {
        if !include_dirs.contains(&dir) {
            include_dirs.push(dir);
        }
    }

    tracing::debug!(
        "{} source(s), {} include dir(s)",
        sources.len(),
        include_dirs.len()
    );
    Ok(SourceSet {
        sources,
        include_dirs,
    })
}
