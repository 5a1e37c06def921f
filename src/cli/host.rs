//! Terminal host
//!
//! Prints task messages and rendered sections to stdout and keeps the build
//! settings in the global config file.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::cli::output::print_block;
use crate::config::GlobalConfig;
use crate::core::view::{section_title, StateView};
use crate::core::workspace::Section;
use crate::runtime::Host;

/// Host backed by the terminal and `config.toml`
pub struct ConsoleHost {
    config: Mutex<GlobalConfig>,
    config_path: PathBuf,
    render_sections: bool,
}

impl ConsoleHost {
    /// Create a host; `render_sections` controls whether state changes are
    /// printed as they happen
    pub fn new(config: GlobalConfig, config_path: PathBuf, render_sections: bool) -> Self {
        Self {
            config: Mutex::new(config),
            config_path,
            render_sections,
        }
    }

    /// Copy of the current settings
    pub fn config(&self) -> GlobalConfig {
        self.config
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl Host for ConsoleHost {
    fn read_setting(&self, key: &str) -> Option<String> {
        self.config.lock().ok()?.setting(key)
    }

    fn write_setting(&self, key: &str, value: &str) {
        let Ok(mut config) = self.config.lock() else {
            return;
        };
        if !config.set_setting(key, value) {
            tracing::warn!("Ignoring setting {key}={value}");
            return;
        }
        if let Err(e) = config.save_to_path(&self.config_path) {
            tracing::warn!("{e}");
        }
    }

    fn display_message(&self, message: &str) {
        println!("{message}");
    }

    fn open_file(&self, path: &Path) {
        println!("{}", path.display());
    }

    fn render(&self, view: &StateView, sections: &[Section]) {
        if !self.render_sections {
            return;
        }
        for section in sections {
            print_block(section_title(*section), &view.render_section(*section));
        }
    }
}
