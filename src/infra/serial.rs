//! Serial port discovery

use std::path::{Path, PathBuf};

/// Source of the currently attached serial ports
pub trait PortLister: Send + Sync {
    /// Port names, sorted
    fn list_ports(&self) -> Vec<String>;
}

/// Device node prefixes that identify serial adapters
const PORT_PREFIXES: &[&str] = &["ttyUSB", "ttyACM", "ttyAMA", "cu.", "tty.usb"];

/// Lists serial device nodes under a device directory
#[derive(Debug, Clone)]
pub struct DevicePorts {
    dev_dir: PathBuf,
}

impl DevicePorts {
    /// Scan `/dev`
    pub fn system() -> Self {
        Self::new("/dev")
    }

    /// Scan another directory
    pub fn new(dev_dir: impl Into<PathBuf>) -> Self {
        Self {
            dev_dir: dev_dir.into(),
        }
    }

    /// Directory being scanned
    pub fn dev_dir(&self) -> &Path {
        &self.dev_dir
    }
}

impl PortLister for DevicePorts {
    fn list_ports(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dev_dir) else {
            return Vec::new();
        };
        let mut ports: Vec<String> = entries
            .filter_map(Result::ok)
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                PORT_PREFIXES
                    .iter()
                    .any(|p| name.starts_with(p))
                    .then(|| self.dev_dir.join(name).display().to_string())
            })
            .collect();
        ports.sort();
        ports
    }
}

/// Fixed port list
#[derive(Debug, Clone, Default)]
pub struct StaticPorts(pub Vec<String>);

impl PortLister for StaticPorts {
    fn list_ports(&self) -> Vec<String> {
        self.0.clone()
    }
}
