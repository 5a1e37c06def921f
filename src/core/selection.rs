//! Selection slots and repair
//!
//! A selection is a flat map of named slots. After every repair pass each
//! present slot names a member of the list it is checked against; a missing
//! slot means nothing is selected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::boards::{BoardSet, ProgrammerSet};
use crate::core::installed::InstalledCatalog;
use crate::error::FilesystemError;
use crate::infra::filesystem;

/// Package slot
pub const PACKAGE: &str = "package";
/// Platform slot
pub const PLATFORM: &str = "platform";
/// Platform version slot
pub const VERSION: &str = "version";
/// Board slot
pub const BOARD: &str = "board";
/// Programmer slot
pub const PROGRAMMER: &str = "programmer";
/// Serial port slot
pub const SERIAL_PORT: &str = "serial_port";
/// UI language slot
pub const LANGUAGE: &str = "language";

const OPTION_PREFIX: &str = "option_";

/// Slot name of a board option
pub fn option_slot(key: &str) -> String {
    format!("{OPTION_PREFIX}{key}")
}

/// Which candidate replaces an invalid value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// First listed name
    First,
    /// Last listed name (versions are listed oldest first)
    Last,
}

/// Everything a full repair pass checks slots against
#[derive(Debug, Clone, Copy)]
pub struct RepairContext<'a> {
    /// Installed packages
    pub installed: &'a InstalledCatalog,
    /// Boards of the selected platform version
    pub boards: &'a BoardSet,
    /// Programmers of the selected platform version
    pub programmers: &'a ProgrammerSet,
    /// Serial ports currently present
    pub serial_ports: &'a [String],
    /// Available UI languages; empty means any value is accepted
    pub languages: &'a [String],
}

/// The user's current choices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection {
    slots: BTreeMap<String, String>,
}

impl Selection {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a persisted selection; a missing file yields an empty one
    pub fn load(path: &Path) -> Result<Self, FilesystemError> {
        filesystem::load_toml(path)
    }

    /// Persist the selection
    pub fn save(&self, path: &Path) -> Result<(), FilesystemError> {
        filesystem::save_toml(path, self)
    }

    /// Read a slot
    pub fn get(&self, slot: &str) -> Option<&str> {
        self.slots.get(slot).map(String::as_str)
    }

    /// Set a slot
    pub fn set(&mut self, slot: &str, value: impl Into<String>) {
        self.slots.insert(slot.to_string(), value.into());
    }

    /// Clear a slot
    pub fn clear(&mut self, slot: &str) {
        self.slots.remove(slot);
    }

    /// All present slots
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Selected board option values keyed by option key
    pub fn board_options(&self) -> BTreeMap<String, String> {
        self.slots
            .iter()
            .filter_map(|(slot, value)| {
                slot.strip_prefix(OPTION_PREFIX)
                    .map(|key| (key.to_string(), value.clone()))
            })
            .collect()
    }

    /// Check one slot against its candidate list
    ///
    /// Returns true when the slot changed.
    pub fn repair_slot(&mut self, slot: &str, names: &[String], fallback: Fallback) -> bool {
        let current = self.get(slot);
        if current.is_some_and(|c| names.iter().any(|n| n == c)) {
            return false;
        }

        let replacement = match fallback {
            Fallback::First => names.first(),
            Fallback::Last => names.last(),
        };
        let changed = current != replacement.map(String::as_str);
        match replacement {
            Some(name) => self.set(slot, name.clone()),
            None => self.clear(slot),
        }
        changed
    }

    /// Repair package, platform and version against the installed catalog
    ///
    /// Returns true when any of the three changed.
    pub fn repair_platform(&mut self, installed: &InstalledCatalog) -> bool {
        let mut changed = self.repair_slot(PACKAGE, &installed.package_names(), Fallback::First);

        let package = self.get(PACKAGE).unwrap_or_default().to_string();
        changed |= self.repair_slot(
            PLATFORM,
            &installed.platform_names(&package),
            Fallback::First,
        );

        let platform = self.get(PLATFORM).unwrap_or_default().to_string();
        changed |= self.repair_slot(
            VERSION,
            &installed.versions(&package, &platform),
            Fallback::Last,
        );
        changed
    }

    /// Repair the board slot and its option slots
    ///
    /// Option slots the selected board does not declare are dropped.
    pub fn repair_board(&mut self, boards: &BoardSet) -> bool {
        let mut changed = self.repair_slot(BOARD, &boards.names(), Fallback::First);
        let board = self.get(BOARD).and_then(|name| boards.get(name));

        let declared: Vec<String> = board
            .map(|b| b.option_keys().iter().map(|k| option_slot(k)).collect())
            .unwrap_or_default();
        let stale: Vec<String> = self
            .slots
            .keys()
            .filter(|slot| slot.starts_with(OPTION_PREFIX) && !declared.contains(*slot))
            .cloned()
            .collect();
        for slot in stale {
            self.clear(&slot);
            changed = true;
        }

        if let Some(board) = board {
            for option in &board.options {
                changed |= self.repair_slot(
                    &option_slot(&option.key),
                    &option.value_names(),
                    Fallback::First,
                );
            }
        }
        changed
    }

    /// Repair the programmer slot
    pub fn repair_programmer(&mut self, programmers: &ProgrammerSet) -> bool {
        self.repair_slot(PROGRAMMER, &programmers.names(), Fallback::First)
    }

    /// Repair the serial port slot
    pub fn repair_serial_port(&mut self, ports: &[String]) -> bool {
        self.repair_slot(SERIAL_PORT, ports, Fallback::First)
    }

    /// Repair the language slot when a language list is known
    pub fn repair_language(&mut self, languages: &[String]) -> bool {
        if languages.is_empty() {
            return false;
        }
        self.repair_slot(LANGUAGE, languages, Fallback::First)
    }

    /// Full correction pass
    ///
    /// `ctx.boards` and `ctx.programmers` must belong to the version this
    /// pass settles on; the workspace reloads them before calling this.
    pub fn repair(&mut self, ctx: &RepairContext<'_>) -> bool {
        let mut changed = self.repair_platform(ctx.installed);
        changed |= self.repair_board(ctx.boards);
        changed |= self.repair_programmer(ctx.programmers);
        changed |= self.repair_serial_port(ctx.serial_ports);
        changed |= self.repair_language(ctx.languages);
        changed
    }
}
