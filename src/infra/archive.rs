//! Archive extraction
//!
//! Platform and tool archives come as ZIP, gzip'd tar or bzip2'd tar files.
//! Each is unpacked into a scratch directory outside the installed tree and
//! the single top-level entry is then renamed into place, so a version
//! directory only ever appears complete.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::InstallError;
use crate::infra::filesystem;

/// Archive formats understood by the installer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.zip`
    Zip,
    /// `.tar.gz` or `.tgz`
    TarGz,
    /// `.tar.bz2`
    TarBz2,
}

impl ArchiveFormat {
    /// Detect the format from an archive file name
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".tar.bz2") {
            Some(Self::TarBz2)
        } else {
            None
        }
    }
}

/// Unpack an archive into `dest`
pub fn extract(archive: &Path, dest: &Path) -> Result<(), InstallError> {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let format =
        ArchiveFormat::from_name(&name).ok_or(InstallError::UnsupportedArchive { file: name })?;

    let fail = |e: &dyn std::fmt::Display| InstallError::Extraction {
        archive: archive.to_path_buf(),
        error: e.to_string(),
    };

    std::fs::create_dir_all(dest).map_err(|e| fail(&e))?;
    let file = File::open(archive).map_err(|e| fail(&e))?;

    match format {
        ArchiveFormat::Zip => extract_zip(file, dest).map_err(|e| fail(&e)),
        ArchiveFormat::TarGz => {
            unpack_tar(flate2::read::GzDecoder::new(file), dest).map_err(|e| fail(&e))
        }
        ArchiveFormat::TarBz2 => {
            unpack_tar(bzip2::read::BzDecoder::new(file), dest).map_err(|e| fail(&e))
        }
    }
}

fn unpack_tar(reader: impl io::Read, dest: &Path) -> io::Result<()> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.unpack(dest)
}

fn extract_zip(file: File, dest: &Path) -> zip::result::ZipResult<()> {
    let mut archive = zip::ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!("Skipping unsafe archive entry '{}'", entry.name());
            continue;
        };
        let outpath = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath)?;
            continue;
        }
        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&outpath)?;
        io::copy(&mut entry, &mut outfile)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))?;
        }
    }
    Ok(())
}

/// Extract an archive and move its content to `target`
///
/// The archive is unpacked into `scratch` first, which must be on the same
/// filesystem as `target`. When it holds a single top-level directory that
/// directory becomes `target`; otherwise the scratch directory itself does.
/// `scratch` is gone afterwards whether or not the install succeeded.
/// Returns the installed path.
pub fn install_archive(
    archive: &Path,
    target: &Path,
    scratch: &Path,
) -> Result<PathBuf, InstallError> {
    let cleanup = || {
        if let Err(e) = filesystem::remove_dir_all(scratch) {
            tracing::warn!("{e}");
        }
    };

    cleanup();
    let result = unpack_into(archive, target, scratch);
    cleanup();

    let installed = result?;
    tracing::debug!("Installed {} into {}", archive.display(), installed.display());
    Ok(installed)
}

fn unpack_into(archive: &Path, target: &Path, scratch: &Path) -> Result<PathBuf, InstallError> {
    extract(archive, scratch)?;

    let entries: Vec<PathBuf> = std::fs::read_dir(scratch)
        .map_err(|e| InstallError::Extraction {
            archive: archive.to_path_buf(),
            error: e.to_string(),
        })?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .collect();

    let source = match entries.as_slice() {
        [] => {
            return Err(InstallError::EmptyArchive {
                archive: archive.to_path_buf(),
            })
        }
        [single] if single.is_dir() => single.clone(),
        _ => scratch.to_path_buf(),
    };

    std::fs::rename(&source, target).map_err(|e| InstallError::Rename {
        from: source.clone(),
        to: target.to_path_buf(),
        error: e.to_string(),
    })?;
    Ok(target.to_path_buf())
}
