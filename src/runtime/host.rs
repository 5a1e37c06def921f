//! Host editor surface
//!
//! The fabric never draws anything itself. It reads and writes settings,
//! posts messages, opens files and asks for sections of the state view to
//! be rendered, all through [`Host`].

use std::path::Path;

use crate::core::view::StateView;
use crate::core::workspace::Section;

/// What the fabric needs from its host
pub trait Host: Send + Sync {
    /// Read a build setting (`full_build`, `verbose_build`, ...)
    fn read_setting(&self, key: &str) -> Option<String>;

    /// Change a build setting
    fn write_setting(&self, key: &str, value: &str);

    /// Show one line of output
    fn display_message(&self, message: &str);

    /// Open a file or URL for the user
    fn open_file(&self, path: &Path);

    /// Redraw the given sections
    fn render(&self, view: &StateView, sections: &[Section]);

    /// Boolean setting, false when unset or malformed
    fn flag(&self, key: &str) -> bool {
        self.read_setting(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(false)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Host that records everything it is asked to do
    #[derive(Default)]
    pub struct RecordingHost {
        pub settings: Mutex<BTreeMap<String, String>>,
        pub messages: Mutex<Vec<String>>,
        pub opened: Mutex<Vec<PathBuf>>,
        pub rendered: Mutex<Vec<Section>>,
    }

    impl RecordingHost {
        pub fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl Host for RecordingHost {
        fn read_setting(&self, key: &str) -> Option<String> {
            self.settings.lock().unwrap().get(key).cloned()
        }

        fn write_setting(&self, key: &str, value: &str) {
            self.settings
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
        }

        fn display_message(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }

        fn open_file(&self, path: &Path) {
            self.opened.lock().unwrap().push(path.to_path_buf());
        }

        fn render(&self, _view: &StateView, sections: &[Section]) {
            self.rendered.lock().unwrap().extend_from_slice(sections);
        }
    }
}
