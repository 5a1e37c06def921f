//! Board and programmer definitions
//!
//! Built from a platform version's `boards.txt` and `programmers.txt`.
//! Board options come from `menu.<key>=<label>` declarations; a board
//! offers an option when it defines `<board>.menu.<key>.<value>=<name>`.

use std::collections::BTreeMap;
use std::path::Path;

use crate::core::properties::Properties;

/// A board definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Board {
    /// Key prefix in `boards.txt` (e.g., "uno")
    pub id: String,
    /// Display name
    pub name: String,
    /// Board properties without the `menu.` subtree
    pub properties: Properties,
    /// Options in menu declaration order
    pub options: Vec<BoardOption>,
}

/// A configurable board option (e.g., processor, clock)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardOption {
    /// Menu key (e.g., "cpu")
    pub key: String,
    /// Menu label (e.g., "Processor")
    pub label: String,
    /// Values in file order
    pub values: Vec<OptionValue>,
}

/// One value of a board option
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionValue {
    /// Value id (e.g., "atmega2560")
    pub id: String,
    /// Display name
    pub name: String,
    /// Properties overlaid on the board when this value is selected
    pub properties: Properties,
}

/// Boards of one platform version
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardSet {
    boards: Vec<Board>,
}

/// A programmer definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Programmer {
    /// Key prefix in `programmers.txt`
    pub id: String,
    /// Display name
    pub name: String,
    /// Programmer properties
    pub properties: Properties,
}

/// Programmers of one platform version
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgrammerSet {
    programmers: Vec<Programmer>,
}

impl Board {
    /// Option keys in declaration order
    pub fn option_keys(&self) -> Vec<String> {
        self.options.iter().map(|o| o.key.clone()).collect()
    }

    /// Look up an option by key
    pub fn option(&self, key: &str) -> Option<&BoardOption> {
        self.options.iter().find(|o| o.key == key)
    }

    /// Board properties with the selected option values applied
    ///
    /// `selected` maps option key to value display name; unknown keys and
    /// values are ignored.
    pub fn resolved_properties(&self, selected: &BTreeMap<String, String>) -> Properties {
        let mut props = self.properties.clone();
        for option in &self.options {
            let Some(chosen) = selected.get(&option.key) else {
                continue;
            };
            if let Some(value) = option.values.iter().find(|v| &v.name == chosen) {
                props.extend(&value.properties);
            }
        }
        props
    }
}

impl BoardOption {
    /// Value display names in file order
    pub fn value_names(&self) -> Vec<String> {
        self.values.iter().map(|v| v.name.clone()).collect()
    }
}

impl BoardSet {
    /// Build from parsed `boards.txt` properties
    pub fn from_properties(props: &Properties) -> Self {
        let menus = props.subtree("menu");
        let boards = props
            .first_segments()
            .into_iter()
            .filter(|id| id != "menu")
            .filter_map(|id| {
                let board_props = props.subtree(&id);
                let name = board_props.get("name")?.to_string();
                let options = board_options(&board_props, &menus);

                let mut properties = Properties::new();
                for (key, value) in board_props.iter() {
                    if !key.starts_with("menu.") {
                        properties.insert(key, value);
                    }
                }

                Some(Board {
                    id,
                    name,
                    properties,
                    options,
                })
            })
            .collect();
        Self { boards }
    }

    /// Load `boards.txt` from a platform directory
    pub fn load(platform_dir: &Path) -> Self {
        match Properties::load(&platform_dir.join("boards.txt")) {
            Ok(props) => Self::from_properties(&props),
            Err(e) => {
                tracing::warn!("Failed to read boards: {e}");
                Self::default()
            }
        }
    }

    /// Board display names in file order
    pub fn names(&self) -> Vec<String> {
        self.boards.iter().map(|b| b.name.clone()).collect()
    }

    /// Look up a board by display name
    pub fn get(&self, name: &str) -> Option<&Board> {
        self.boards.iter().find(|b| b.name == name)
    }

    /// All boards
    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    /// Whether there are no boards
    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }
}

impl ProgrammerSet {
    /// Build from parsed `programmers.txt` properties
    pub fn from_properties(props: &Properties) -> Self {
        let programmers = props
            .first_segments()
            .into_iter()
            .filter_map(|id| {
                let properties = props.subtree(&id);
                let name = properties.get("name")?.to_string();
                Some(Programmer {
                    id,
                    name,
                    properties,
                })
            })
            .collect();
        Self { programmers }
    }

    /// Load `programmers.txt` from a platform directory
    pub fn load(platform_dir: &Path) -> Self {
        match Properties::load(&platform_dir.join("programmers.txt")) {
            Ok(props) => Self::from_properties(&props),
            Err(e) => {
                tracing::warn!("Failed to read programmers: {e}");
                Self::default()
            }
        }
    }

    /// Programmer display names in file order
    pub fn names(&self) -> Vec<String> {
        self.programmers.iter().map(|p| p.name.clone()).collect()
    }

    /// Look up a programmer by display name
    pub fn get(&self, name: &str) -> Option<&Programmer> {
        self.programmers.iter().find(|p| p.name == name)
    }
}

fn board_options(board_props: &Properties, menus: &Properties) -> Vec<BoardOption> {
    menus
        .iter()
        .filter(|(key, _)| !key.contains('.'))
        .filter_map(|(key, label)| {
            let menu = board_props.subtree(&format!("menu.{key}"));
            let values: Vec<OptionValue> = menu
                .iter()
                .filter(|(id, _)| !id.contains('.'))
                .map(|(id, name)| OptionValue {
                    id: id.to_string(),
                    name: name.to_string(),
                    properties: menu.subtree(id),
                })
                .collect();
            if values.is_empty() {
                return None;
            }
            Some(BoardOption {
                key: key.to_string(),
                label: label.to_string(),
                values,
            })
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use tempfile::TempDir;

    fn boards() -> BoardSet {
        BoardSet::from_properties(&Properties::parse(BOARDS_TXT))
    }

    #[test]
    fn test_board_names_in_file_order() {
        assert_eq!(boards().names(), vec!["Arduino Uno", "Arduino Mega"]);
    }

    #[test]
    fn test_board_without_menu_has_no_options() {
        let set = boards();
        let uno = set.get("Arduino Uno").unwrap();
        assert!(uno.options.is_empty());
        assert_eq!(uno.properties.get("build.mcu"), Some("atmega328p"));
    }

    #[test]
    fn test_board_options_only_declared_menus_in_use() {
        let set = boards();
        let mega = set.get("Arduino Mega").unwrap();
        assert_eq!(mega.option_keys(), vec!["cpu"]);

        let cpu = mega.option("cpu").unwrap();
        assert_eq!(cpu.label, "Processor");
        assert_eq!(
            cpu.value_names(),
            vec!["ATmega2560 (Mega 2560)", "ATmega1280"]
        );
        assert!(!mega.properties.contains_key("menu.cpu.atmega2560"));
    }

    #[test]
    fn test_resolved_properties_overlay_selected_value() {
        let set = boards();
        let mega = set.get("Arduino Mega").unwrap();
        let selected = BTreeMap::from([("cpu".to_string(), "ATmega1280".to_string())]);

        let props = mega.resolved_properties(&selected);
        assert_eq!(props.get("build.mcu"), Some("atmega1280"));
        assert_eq!(props.get("upload.maximum_size"), Some("126976"));
        assert_eq!(props.get("build.board"), Some("AVR_MEGA2560"));
    }

    #[test]
    fn test_programmers_parse() {
        let set = ProgrammerSet::from_properties(&Properties::parse(PROGRAMMERS_TXT));
        assert_eq!(set.names(), vec!["AVR ISP", "USBasp"]);
        assert_eq!(
            set.get("USBasp").unwrap().properties.get("protocol"),
            Some("usbasp")
        );
    }

    #[test]
    fn test_load_from_platform_dir() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("boards.txt"), BOARDS_TXT).unwrap();

        assert_eq!(BoardSet::load(temp.path()).names().len(), 2);
        assert!(ProgrammerSet::load(temp.path()).names().is_empty());
    }
}
