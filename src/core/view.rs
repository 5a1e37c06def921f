//! Read-only snapshot of the workspace for display
//!
//! Hosts render sections of a [`StateView`] after each transition; building
//! the view never changes state.

use crate::core::selection::{self, option_slot};
use crate::core::workspace::{Section, Workspace};

/// Installed package with its platforms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageView {
    /// Package name
    pub name: String,
    /// Platforms with their versions
    pub platforms: Vec<(String, Vec<String>)>,
}

/// Board option with its values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    /// Option key
    pub key: String,
    /// Menu label
    pub label: String,
    /// Value names
    pub values: Vec<String>,
    /// Selected value
    pub selected: Option<String>,
}

/// Snapshot of everything a host may display
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateView {
    /// Platforms available from the indexes
    pub installable: Vec<PackageView>,
    /// Installed packages
    pub installed: Vec<PackageView>,
    /// Present selection slots
    pub selection: Vec<(String, String)>,
    /// Board names
    pub boards: Vec<String>,
    /// Options of the selected board
    pub board_options: Vec<OptionView>,
    /// Programmer names
    pub programmers: Vec<String>,
    /// Serial ports
    pub serial_ports: Vec<String>,
}

impl StateView {
    /// Snapshot a workspace
    pub fn from_workspace(ws: &Workspace) -> Self {
        let installable = ws
            .catalog()
            .packages()
            .iter()
            .map(|p| PackageView {
                name: p.name.clone(),
                platforms: p
                    .platforms
                    .iter()
                    .map(|pl| (pl.name.clone(), pl.versions()))
                    .collect(),
            })
            .collect();

        let installed = ws
            .installed()
            .packages()
            .iter()
            .map(|p| PackageView {
                name: p.name.clone(),
                platforms: p
                    .platforms
                    .iter()
                    .map(|pl| {
                        (
                            pl.name.clone(),
                            pl.versions.iter().map(|v| v.version.clone()).collect(),
                        )
                    })
                    .collect(),
            })
            .collect();

        let board_options = ws
            .selected_board()
            .map(|board| {
                board
                    .options
                    .iter()
                    .map(|o| OptionView {
                        key: o.key.clone(),
                        label: o.label.clone(),
                        values: o.value_names(),
                        selected: ws
                            .selection()
                            .get(&option_slot(&o.key))
                            .map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            installable,
            installed,
            selection: ws
                .selection()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            boards: ws.boards().names(),
            board_options,
            programmers: ws.programmers().names(),
            serial_ports: ws.serial_ports().to_vec(),
        }
    }

    /// Selected value of a slot
    pub fn selected(&self, slot: &str) -> Option<&str> {
        self.selection
            .iter()
            .find(|(k, _)| k == slot)
            .map(|(_, v)| v.as_str())
    }

    /// Text lines of one section; the selected entry is marked with `*`
    pub fn render_section(&self, section: Section) -> Vec<String> {
        let mark = |name: &str, slot: &str| {
            let star = if self.selected(slot) == Some(name) { "*" } else { " " };
            format!("{star} {name}")
        };

        match section {
            Section::InstallMenu => self
                .installable
                .iter()
                .flat_map(|p| {
                    p.platforms.iter().map(move |(name, versions)| {
                        format!("[{}] {name} ({})", p.name, versions.join(", "))
                    })
                })
                .collect(),
            Section::Platforms => self
                .installed
                .iter()
                .flat_map(|p| {
                    p.platforms.iter().map(move |(name, _)| {
                        let selected = self.selected(selection::PACKAGE) == Some(p.name.as_str())
                            && self.selected(selection::PLATFORM) == Some(name.as_str());
                        format!("{} [{}] {name}", if selected { "*" } else { " " }, p.name)
                    })
                })
                .collect(),
            Section::Versions => {
                let package = self.selected(selection::PACKAGE);
                let platform = self.selected(selection::PLATFORM);
                self.installed
                    .iter()
                    .filter(|p| Some(p.name.as_str()) == package)
                    .flat_map(|p| p.platforms.iter())
                    .filter(|(name, _)| Some(name.as_str()) == platform)
                    .flat_map(|(_, versions)| versions.iter())
                    .map(|v| mark(v, selection::VERSION))
                    .collect()
            }
            Section::Boards => self
                .boards
                .iter()
                .map(|b| mark(b, selection::BOARD))
                .collect(),
            Section::BoardOptions => self
                .board_options
                .iter()
                .map(|o| {
                    format!(
                        "{}: {}",
                        o.label,
                        o.selected.as_deref().unwrap_or("-")
                    )
                })
                .collect(),
            Section::Programmers => self
                .programmers
                .iter()
                .map(|p| mark(p, selection::PROGRAMMER))
                .collect(),
            Section::SerialPorts => self
                .serial_ports
                .iter()
                .map(|p| mark(p, selection::SERIAL_PORT))
                .collect(),
            Section::Language => self
                .selected(selection::LANGUAGE)
                .map(|l| vec![l.to_string()])
                .unwrap_or_default(),
        }
    }
}

/// Section titles used by text hosts
pub fn section_title(section: Section) -> &'static str {
    match section {
        Section::InstallMenu => "Installable platforms",
        Section::Platforms => "Platforms",
        Section::Versions => "Versions",
        Section::Boards => "Boards",
        Section::BoardOptions => "Board options",
        Section::Programmers => "Programmers",
        Section::SerialPorts => "Serial ports",
        Section::Language => "Language",
    }
}
