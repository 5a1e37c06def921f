//! Selection state machine
//!
//! [`Workspace`] owns the catalogs, the board and programmer definitions of
//! the selected platform version, and the selection itself. Every operation
//! mutates the selection, runs a full repair pass and returns a
//! [`Transition`] listing what the caller has to do next. Nothing in here
//! talks to the user.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::core::boards::{Board, BoardSet, Programmer, ProgrammerSet};
use crate::core::catalog::{Catalog, IndexPlatform};
use crate::core::installed::InstalledCatalog;
use crate::core::properties::Properties;
use crate::core::selection::{self, option_slot, RepairContext, Selection};
use crate::core::tooldeps::{check_tool_dependencies, HostInfo, ToolCheck};
use crate::infra::layout::ToolchainLayout;

/// Loads board and programmer definitions of a platform version
pub trait BoardSource: Send + Sync {
    /// Definitions found in `platform_dir`
    fn load(&self, platform_dir: &Path) -> (BoardSet, ProgrammerSet);
}

/// Reads `boards.txt` and `programmers.txt` from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformFiles;

impl BoardSource for PlatformFiles {
    fn load(&self, platform_dir: &Path) -> (BoardSet, ProgrammerSet) {
        (
            BoardSet::load(platform_dir),
            ProgrammerSet::load(platform_dir),
        )
    }
}

/// Part of the state view a host redraws
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    /// Installable platforms from the indexes
    InstallMenu,
    /// Installed packages and platforms
    Platforms,
    /// Installed versions of the selected platform
    Versions,
    /// Boards of the selected version
    Boards,
    /// Options of the selected board
    BoardOptions,
    /// Programmers of the selected version
    Programmers,
    /// Serial ports
    SerialPorts,
    /// UI language
    Language,
}

/// Follow-up work produced by a state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Run the tool dependency check for the selected platform version
    CheckToolDependencies,
    /// Redraw a section
    Render(Section),
}

/// Outcome of a workspace operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Effects in the order they must be handled
    pub effects: Vec<Effect>,
}

impl Transition {
    /// Whether a tool dependency check was requested
    pub fn checks_tools(&self) -> bool {
        self.effects.contains(&Effect::CheckToolDependencies)
    }

    /// Sections to redraw
    pub fn sections(&self) -> Vec<Section> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::Render(section) => Some(*section),
                Effect::CheckToolDependencies => None,
            })
            .collect()
    }
}

/// Catalog, definitions and selection of one session
pub struct Workspace {
    layout: ToolchainLayout,
    catalog: Catalog,
    installed: InstalledCatalog,
    boards: BoardSet,
    programmers: ProgrammerSet,
    serial_ports: Vec<String>,
    languages: Vec<String>,
    selection: Selection,
    board_source: Box<dyn BoardSource>,
    loaded_dir: Option<PathBuf>,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("root", &self.layout.root())
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Build a workspace from already loaded state and repair the selection
    pub fn new(
        layout: ToolchainLayout,
        catalog: Catalog,
        installed: InstalledCatalog,
        selection: Selection,
        board_source: Box<dyn BoardSource>,
    ) -> Self {
        let mut workspace = Self::unrepaired(layout, catalog, installed, selection, board_source);
        workspace.repair_all();
        workspace
    }

    fn unrepaired(
        layout: ToolchainLayout,
        catalog: Catalog,
        installed: InstalledCatalog,
        selection: Selection,
        board_source: Box<dyn BoardSource>,
    ) -> Self {
        Self {
            layout,
            catalog,
            installed,
            boards: BoardSet::default(),
            programmers: ProgrammerSet::default(),
            serial_ports: Vec::new(),
            languages: Vec::new(),
            selection,
            board_source,
            loaded_dir: None,
        }
    }

    /// Load indexes, installed packages and the persisted selection
    ///
    /// The serial ports attached at startup are known before the first
    /// correction pass so a saved port survives.
    pub fn load(layout: ToolchainLayout, serial_ports: Vec<String>) -> Self {
        let catalog = Catalog::load_dir(layout.root());
        let installed = InstalledCatalog::scan(&layout, &catalog);
        let selection = Selection::load(&layout.selection_path()).unwrap_or_else(|e| {
            tracing::warn!("Ignoring saved selection: {e}");
            Selection::new()
        });
        let mut workspace = Self::unrepaired(
            layout,
            catalog,
            installed,
            selection,
            Box::new(PlatformFiles),
        );
        workspace.serial_ports = serial_ports;
        workspace.repair_all();
        workspace
    }

    /// Toolchain layout
    pub fn layout(&self) -> &ToolchainLayout {
        &self.layout
    }

    /// Index catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Installed packages
    pub fn installed(&self) -> &InstalledCatalog {
        &self.installed
    }

    /// Boards of the selected platform version
    pub fn boards(&self) -> &BoardSet {
        &self.boards
    }

    /// Programmers of the selected platform version
    pub fn programmers(&self) -> &ProgrammerSet {
        &self.programmers
    }

    /// Known serial ports
    pub fn serial_ports(&self) -> &[String] {
        &self.serial_ports
    }

    /// Current selection
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Persist the selection to `selected.toml`
    pub fn save_selection(&self) -> Result<(), crate::error::FilesystemError> {
        self.selection.save(&self.layout.selection_path())
    }

    /// Directory of the selected platform version
    pub fn selected_platform_dir(&self) -> Option<PathBuf> {
        let package = self.selection.get(selection::PACKAGE)?;
        let platform = self.selection.get(selection::PLATFORM)?;
        let version = self.selection.get(selection::VERSION)?;
        self.installed
            .platform_path(package, platform, version)
            .map(Path::to_path_buf)
    }

    /// Index entry of the selected platform version, if indexed
    pub fn selected_release(&self) -> Option<&IndexPlatform> {
        self.catalog.platform_release(
            self.selection.get(selection::PACKAGE)?,
            self.selection.get(selection::PLATFORM)?,
            self.selection.get(selection::VERSION)?,
        )
    }

    /// Selected board
    pub fn selected_board(&self) -> Option<&Board> {
        self.boards.get(self.selection.get(selection::BOARD)?)
    }

    /// Selected board properties with option values applied
    pub fn selected_board_properties(&self) -> Properties {
        self.selected_board()
            .map(|b| b.resolved_properties(&self.selection.board_options()))
            .unwrap_or_default()
    }

    /// Selected programmer
    pub fn selected_programmer(&self) -> Option<&Programmer> {
        self.programmers.get(self.selection.get(selection::PROGRAMMER)?)
    }

    /// Documentation link of the selected platform
    ///
    /// Falls back to the package help link when the release has none.
    pub fn platform_help_url(&self) -> Option<String> {
        if let Some(release) = self.selected_release() {
            if !release.help.online.is_empty() {
                return Some(release.help.online.clone());
            }
        }
        let package = self.catalog.package(self.selection.get(selection::PACKAGE)?)?;
        (!package.help_url.is_empty()).then(|| package.help_url.clone())
    }

    /// Tool dependency check for the selected platform version
    ///
    /// Platforms missing from the indexes (imported ones) declare no tools.
    pub fn tool_check(&self, host: &HostInfo) -> ToolCheck {
        match self.selected_release() {
            Some(release) => check_tool_dependencies(&self.catalog, &self.installed, release, host),
            None => ToolCheck {
                ready: true,
                ..ToolCheck::default()
            },
        }
    }

    /// Tool dependency check for an arbitrary indexed platform version
    pub fn tool_check_for(
        &self,
        package: &str,
        platform_arch: &str,
        version: &str,
        host: &HostInfo,
    ) -> Option<ToolCheck> {
        let name = self.catalog.platform_name_by_arch(package, platform_arch)?;
        let release = self.catalog.platform_release(package, name, version)?;
        Some(check_tool_dependencies(
            &self.catalog,
            &self.installed,
            release,
            host,
        ))
    }

    // ============================================
    // Operations
    // ============================================

    /// Select a package; its first platform and newest version follow
    pub fn select_package(&mut self, package: &str) -> Transition {
        self.apply(|sel| {
            if sel.get(selection::PACKAGE) != Some(package) {
                sel.set(selection::PACKAGE, package);
                sel.clear(selection::PLATFORM);
                sel.clear(selection::VERSION);
            }
        })
    }

    /// Select a platform of a package; its newest version follows
    pub fn select_platform(&mut self, package: &str, platform: &str) -> Transition {
        self.apply(|sel| {
            if sel.get(selection::PACKAGE) != Some(package)
                || sel.get(selection::PLATFORM) != Some(platform)
            {
                sel.set(selection::PACKAGE, package);
                sel.set(selection::PLATFORM, platform);
                sel.clear(selection::VERSION);
            }
        })
    }

    /// Select a platform version
    pub fn select_version(&mut self, version: &str) -> Transition {
        self.apply(|sel| sel.set(selection::VERSION, version))
    }

    /// Select a board
    pub fn select_board(&mut self, board: &str) -> Transition {
        let mut transition = self.apply(|sel| sel.set(selection::BOARD, board));
        if !transition.checks_tools() {
            transition.effects.insert(0, Effect::CheckToolDependencies);
        }
        transition
    }

    /// Select a value for a board option
    pub fn select_option(&mut self, key: &str, value: &str) -> Transition {
        let slot = option_slot(key);
        self.apply(|sel| sel.set(&slot, value))
    }

    /// Select a programmer
    pub fn select_programmer(&mut self, programmer: &str) -> Transition {
        self.apply(|sel| sel.set(selection::PROGRAMMER, programmer))
    }

    /// Select a serial port
    pub fn select_serial_port(&mut self, port: &str) -> Transition {
        self.apply(|sel| sel.set(selection::SERIAL_PORT, port))
    }

    /// Select the UI language
    pub fn select_language(&mut self, language: &str) -> Transition {
        self.apply(|sel| sel.set(selection::LANGUAGE, language))
    }

    /// Replace the serial port list
    pub fn set_serial_ports(&mut self, ports: Vec<String>) -> Transition {
        self.serial_ports = ports;
        let mut transition = self.apply(|_| {});
        push_section(&mut transition, Section::SerialPorts);
        transition
    }

    /// Replace the language list
    pub fn set_languages(&mut self, languages: Vec<String>) -> Transition {
        self.languages = languages;
        self.apply(|_| {})
    }

    /// Replace the index catalog and rescan installed packages
    pub fn refresh_catalog(&mut self, catalog: Catalog) -> Transition {
        self.catalog = catalog;
        let installed = InstalledCatalog::scan(&self.layout, &self.catalog);
        let mut transition = self.replace_installed(installed);
        transition.effects.insert(0, Effect::Render(Section::InstallMenu));
        transition
    }

    /// Rescan installed packages after an install or import
    pub fn rescan_installed(&mut self) -> Transition {
        let installed = InstalledCatalog::scan(&self.layout, &self.catalog);
        self.replace_installed(installed)
    }

    /// Replace the installed catalog
    pub fn replace_installed(&mut self, installed: InstalledCatalog) -> Transition {
        self.installed = installed;
        let mut transition = self.apply(|_| {});
        push_section(&mut transition, Section::Platforms);
        push_section(&mut transition, Section::Versions);
        transition
    }

    /// Run a correction pass without changing anything else
    pub fn repair(&mut self) -> Transition {
        self.apply(|_| {})
    }

    fn apply(&mut self, mutate: impl FnOnce(&mut Selection)) -> Transition {
        let before = self.selection.clone();
        mutate(&mut self.selection);
        let touched = self.selection.clone();
        let reloaded = self.repair_all();

        let changed = |slot: &str| {
            before.get(slot) != self.selection.get(slot) || touched.get(slot) != before.get(slot)
        };
        let platform_changed = [selection::PACKAGE, selection::PLATFORM, selection::VERSION]
            .iter()
            .any(|slot| changed(slot));

        let mut sections = BTreeSet::new();
        if changed(selection::PACKAGE) || changed(selection::PLATFORM) {
            sections.insert(Section::Platforms);
        }
        if platform_changed {
            sections.insert(Section::Versions);
        }
        if reloaded || changed(selection::BOARD) {
            sections.insert(Section::Boards);
        }
        if reloaded
            || changed(selection::BOARD)
            || before.board_options() != self.selection.board_options()
            || touched.board_options() != before.board_options()
        {
            sections.insert(Section::BoardOptions);
        }
        if reloaded || changed(selection::PROGRAMMER) {
            sections.insert(Section::Programmers);
        }
        if changed(selection::SERIAL_PORT) {
            sections.insert(Section::SerialPorts);
        }
        if changed(selection::LANGUAGE) {
            sections.insert(Section::Language);
        }

        let mut effects = Vec::new();
        if platform_changed || reloaded {
            effects.push(Effect::CheckToolDependencies);
        }
        effects.extend(sections.into_iter().map(Effect::Render));
        Transition { effects }
    }

    /// Full correction pass; returns true when definitions were reloaded
    fn repair_all(&mut self) -> bool {
        self.selection.repair_platform(&self.installed);
        let reloaded = self.reload_definitions();
        let ctx = RepairContext {
            installed: &self.installed,
            boards: &self.boards,
            programmers: &self.programmers,
            serial_ports: &self.serial_ports,
            languages: &self.languages,
        };
        self.selection.repair(&ctx);
        reloaded
    }

    fn reload_definitions(&mut self) -> bool {
        let dir = self.selected_platform_dir();
        if dir == self.loaded_dir {
            return false;
        }
        let (boards, programmers) = match &dir {
            Some(dir) => self.board_source.load(dir),
            None => (BoardSet::default(), ProgrammerSet::default()),
        };
        tracing::debug!(
            "Loaded {} board(s) and {} programmer(s) from {:?}",
            boards.names().len(),
            programmers.names().len(),
            dir
        );
        self.boards = boards;
        self.programmers = programmers;
        self.loaded_dir = dir;
        true
    }
}

fn push_section(transition: &mut Transition, section: Section) {
    let effect = Effect::Render(section);
    if !transition.effects.contains(&effect) {
        transition.effects.push(effect);
    }
}
