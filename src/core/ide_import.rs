//! Import of a bundled IDE installation
//!
//! An IDE directory carries `examples/`, `libraries/` and one bundled
//! platform under `hardware/<package>/<arch>` described by
//! `hardware/package_index_bundled.json`. Importing copies the first two
//! into the sketchbook and the platform into the toolchain root.

use std::path::Path;

use crate::core::catalog::{IndexDocument, IndexPlatform};
use crate::error::ProjectError;
use crate::infra::filesystem;
use crate::infra::layout::ToolchainLayout;

/// Bundled index inside an IDE's `hardware/` directory
pub const BUNDLED_INDEX: &str = "package_index_bundled.json";

/// What an import did
#[derive(Debug, Clone)]
pub struct ImportReport {
    /// Lines for the user
    pub messages: Vec<String>,
    /// Package of the bundled platform
    pub package: String,
    /// Bundled platform release, for the tool dependency check
    pub release: IndexPlatform,
    /// Whether the platform was copied (false when already present)
    pub platform_copied: bool,
}

/// Import an IDE installation
///
/// The directory is validated before anything is copied. Existing
/// sketchbook entries and platform versions are left alone.
pub fn import_ide(
    ide: &Path,
    layout: &ToolchainLayout,
    sketchbook: &Path,
) -> Result<ImportReport, ProjectError> {
    let not_ide = || ProjectError::NotAnIde {
        path: ide.to_path_buf(),
    };

    let hardware = ide.join("hardware");
    let index_text =
        filesystem::read_file(&hardware.join(BUNDLED_INDEX)).map_err(|_| not_ide())?;
    let document = IndexDocument::from_json(&index_text, BUNDLED_INDEX).map_err(|e| {
        tracing::debug!("{e}");
        not_ide()
    })?;

    let package = document.packages.into_iter().next().ok_or_else(not_ide)?;
    let release = package.platforms.into_iter().next().ok_or_else(not_ide)?;
    let source = hardware.join(&package.name).join(&release.architecture);
    if !source.is_dir() {
        return Err(not_ide());
    }

    for sub in ["examples", "libraries"] {
        copy_missing_children(&ide.join(sub), &sketchbook.join(sub))?;
    }

    let target = layout.platform_dir(&package.name, &release.architecture, &release.version);
    let platform_copied = !target.is_dir();
    let message = if platform_copied {
        filesystem::copy_tree(&source, &target)?;
        tracing::info!("Imported {} into {}", source.display(), target.display());
        "Importing Arduino IDE finished.".to_string()
    } else {
        format!(
            "[{}] {} {} exists.",
            package.name, release.name, release.version
        )
    };

    Ok(ImportReport {
        messages: vec![message],
        package: package.name,
        release,
        platform_copied,
    })
}

fn copy_missing_children(from: &Path, to: &Path) -> Result<(), ProjectError> {
    for dir in filesystem::list_dirs(from) {
        let Some(name) = dir.file_name() else {
            continue;
        };
        let target = to.join(name);
        if !target.exists() {
            filesystem::copy_tree(&dir, &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;
    use predicates::prelude::*;

    const BUNDLED: &str = r#"{
      "packages": [{
        "name": "arduino",
        "maintainer": "Arduino",
        "websiteURL": "",
        "help": {"online": ""},
        "platforms": [{
          "name": "Arduino AVR Boards",
          "architecture": "avr",
          "version": "1.8.6",
          "category": "Arduino",
          "url": "",
          "archiveFileName": "",
          "checksum": "",
          "size": "0",
          "help": {"online": ""},
          "boards": [],
          "toolsDependencies": []
        }],
        "tools": []
      }]
    }"#;

    fn ide(temp: &TempDir) -> std::path::PathBuf {
        let ide = temp.child("ide");
        ide.child("hardware").child(BUNDLED_INDEX).write_str(BUNDLED).unwrap();
        ide.child("hardware/arduino/avr/boards.txt")
            .write_str("uno.name=Arduino Uno\n")
            .unwrap();
        ide.child("examples/01.Basics/Blink/Blink.ino").write_str("").unwrap();
        ide.child("libraries/Servo/src/Servo.h").write_str("").unwrap();
        ide.path().to_path_buf()
    }

    #[test]
    fn test_import_copies_platform_and_sketchbook_entries() {
        let temp = TempDir::new().unwrap();
        let ide = ide(&temp);
        let layout = ToolchainLayout::new(temp.child("root").path());
        let sketchbook = temp.child("sketchbook");

        let report = import_ide(&ide, &layout, sketchbook.path()).unwrap();

        assert!(report.platform_copied);
        assert_eq!(report.messages, vec!["Importing Arduino IDE finished."]);
        assert_eq!(report.release.architecture, "avr");
        temp.child("root/packages/arduino/hardware/avr/1.8.6/boards.txt")
            .assert(predicate::path::is_file());
        sketchbook
            .child("examples/01.Basics/Blink/Blink.ino")
            .assert(predicate::path::is_file());
        sketchbook
            .child("libraries/Servo/src/Servo.h")
            .assert(predicate::path::is_file());
    }

    #[test]
    fn test_second_import_reports_existing() {
        let temp = TempDir::new().unwrap();
        let ide = ide(&temp);
        let layout = ToolchainLayout::new(temp.child("root").path());
        let sketchbook = temp.child("sketchbook");
        sketchbook.child("libraries/Servo/mine.txt").write_str("keep").unwrap();

        import_ide(&ide, &layout, sketchbook.path()).unwrap();
        let report = import_ide(&ide, &layout, sketchbook.path()).unwrap();

        assert!(!report.platform_copied);
        assert_eq!(
            report.messages,
            vec!["[arduino] Arduino AVR Boards 1.8.6 exists."]
        );
        sketchbook
            .child("libraries/Servo/src/Servo.h")
            .assert(predicate::path::missing());
    }

    #[test]
    fn test_rejects_non_ide_without_copying() {
        let temp = TempDir::new().unwrap();
        temp.child("notide/examples/Blink/Blink.ino").write_str("").unwrap();
        let layout = ToolchainLayout::new(temp.child("root").path());
        let sketchbook = temp.child("sketchbook");

        let err =
            import_ide(temp.child("notide").path(), &layout, sketchbook.path()).unwrap_err();
        assert!(err.to_string().ends_with("is not an Arduino IDE."));
        sketchbook.assert(predicate::path::missing());
    }
}
