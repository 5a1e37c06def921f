//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use sketchforge::core::tooldeps::HostInfo;
use sketchforge::core::view::StateView;
use sketchforge::core::workspace::Section;
use sketchforge::runtime::{FabricConfig, Host};
use tempfile::TempDir;

/// Test environment context
///
/// Creates a temporary directory holding a toolchain root, a sketchbook and
/// a config directory.
pub struct TestProject {
    /// Temporary directory for the test environment
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test environment in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the test directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Toolchain root
    pub fn toolchain_root(&self) -> PathBuf {
        self.dir.path().join("toolchain")
    }

    /// Sketchbook directory
    pub fn sketchbook(&self) -> PathBuf {
        self.dir.path().join("sketchbook")
    }

    /// Config directory
    pub fn config_dir(&self) -> PathBuf {
        self.dir.path().join("config")
    }

    /// Create a file below the test directory
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Check if a file exists below the test directory
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file below the test directory
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Install a platform version directly into the toolchain root
    pub fn install_platform(
        &self,
        package: &str,
        arch: &str,
        version: &str,
        files: &[(&str, &str)],
    ) -> PathBuf {
        let dir = format!("toolchain/packages/{package}/hardware/{arch}/{version}");
        for (name, content) in files {
            self.create_file(&format!("{dir}/{name}"), content);
        }
        self.dir.path().join(dir)
    }

    /// Create a sketch in the sketchbook
    pub fn create_sketch(&self, name: &str, body: &str) -> PathBuf {
        self.create_file(&format!("sketchbook/{name}/{name}.ino"), body);
        self.sketchbook().join(name)
    }

    /// Fabric settings pointing at this environment
    pub fn fabric_config(&self) -> FabricConfig {
        FabricConfig {
            capacity: 8,
            index_urls: BTreeMap::new(),
            index_period: Duration::from_secs(3600),
            serial_period: Duration::from_secs(3600),
            sketchbook: self.sketchbook(),
            host_info: HostInfo::current(),
        }
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Host that records what the fabric asks of it
#[derive(Default)]
pub struct RecordingHost {
    pub settings: Mutex<BTreeMap<String, String>>,
    pub messages: Mutex<Vec<String>>,
    pub rendered: Mutex<Vec<Section>>,
}

impl RecordingHost {
    /// Messages displayed so far
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Forget the messages displayed so far
    pub fn clear_messages(&self) {
        self.messages.lock().unwrap().clear();
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

    fn open_file(&self, _path: &Path) {}

    fn render(&self, _view: &StateView, sections: &[Section]) {
        self.rendered.lock().unwrap().extend_from_slice(sections);
    }
}

/// Build a `.tar.gz` archive in memory
pub fn tar_gz(entries: &[(&str, &str)]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_bytes())
            .expect("Failed to append tar entry");
    }
    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .expect("Failed to finish archive")
}

/// Boards definition with one board
pub const BOARDS_TXT: &str = "\
uno.name=Test Uno
uno.build.core=arduino
uno.build.variant=standard
uno.build.mcu=atmega328p
";

/// Platform recipes that only touch their outputs
pub const PLATFORM_TXT: &str = "\
name=Test AVR
recipe.c.o.pattern=touch \"{object_file}\"
recipe.cpp.o.pattern=touch \"{object_file}\"
recipe.ar.pattern=touch \"{archive_file_path}\"
recipe.c.combine.pattern=touch \"{build.path}/{build.project_name}.elf\"
recipe.objcopy.hex.pattern=touch \"{build.path}/{build.project_name}.hex\"
recipe.output.save_file={build.project_name}.{build.mcu}.hex
";

/// Core files of the test platform
pub const CORE_FILES: &[(&str, &str)] = &[
    ("boards.txt", BOARDS_TXT),
    ("platform.txt", PLATFORM_TXT),
    ("cores/arduino/Arduino.h", "#pragma once\n"),
    ("cores/arduino/wiring.c", "#include \"Arduino.h\"\n"),
    ("variants/standard/pins_arduino.h", "#pragma once\n"),
];
