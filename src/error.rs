//! Error types for sketchforge
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Catalog loading errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Index document could not be parsed
    #[error("Failed to parse index '{source_name}': {error}")]
    IndexParse { source_name: String, error: String },

    /// Index document could not be read
    #[error("Failed to read index '{path}': {error}")]
    IndexRead { path: PathBuf, error: String },

    /// Unknown package
    #[error("Package '{name}' not found in catalog")]
    PackageNotFound { name: String },

    /// Unknown platform version
    #[error("Platform '{platform}' version '{version}' not found in package '{package}'")]
    PlatformNotFound {
        package: String,
        platform: String,
        version: String,
    },
}

/// Project and sketch errors
#[derive(Error, Debug)]
pub enum ProjectError {
    /// Sketch name was blank
    #[error("Sketch name must not be blank")]
    BlankName,

    /// Sketch already exists
    #[error("{name} already exists.")]
    AlreadyExists { name: String },

    /// Path is not a directory
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Path is not an IDE installation
    #[error("{path} is not an Arduino IDE.")]
    NotAnIde { path: PathBuf },

    /// Filesystem failure while writing project files
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Build planning and execution errors
#[derive(Error, Debug)]
pub enum PlanError {
    /// No source files to build
    #[error("No source files found for project '{project}'")]
    NoSources { project: String },

    /// No platform selected
    #[error("No platform selected. Install a platform and select it first")]
    NoPlatform,

    /// Command exited with non-zero status
    #[error(
        "Command failed with exit code {}: {command}",
        .code.map_or_else(|| "none".to_string(), |c| c.to_string())
    )]
    CommandFailed { command: String, code: Option<i32> },

    /// Command could not be started
    #[error("Failed to start command '{command}': {error}")]
    Spawn { command: String, error: String },

    /// Invalid size regex in recipe
    #[error("Invalid size pattern '{pattern}': {error}")]
    SizePattern { pattern: String, error: String },

    /// Filesystem failure in the build directory
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Network error
    #[error("Network error downloading '{url}': {error}")]
    NetworkError { url: String, error: String },

    /// Checksum verification failed
    #[error("Checksum verification failed for '{file}'")]
    ChecksumFailed { file: String },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },
}

/// Archive installation errors
#[derive(Error, Debug)]
pub enum InstallError {
    /// Archive format not recognized from the file name
    #[error("Unsupported archive format: {file}")]
    UnsupportedArchive { file: String },

    /// Extraction failed
    #[error("Failed to extract '{archive}': {error}")]
    Extraction { archive: PathBuf, error: String },

    /// Archive had no top-level entry
    #[error("Archive '{archive}' is empty")]
    EmptyArchive { archive: PathBuf },

    /// Moving the extracted directory into place failed
    #[error("Failed to move '{from}' to '{to}': {error}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove file or directory
    #[error("Failed to remove '{path}': {error}")]
    Remove { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },

    /// Failed to parse a persisted document
    #[error("Failed to parse '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    /// Failed to copy a tree
    #[error("Failed to copy '{from}' to '{to}': {error}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },
}

/// Task fabric errors
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The state actor is gone
    #[error("State service has stopped")]
    StateClosed,

    /// A task queue is closed
    #[error("Task queue '{queue}' is closed")]
    QueueClosed { queue: String },

    /// A blocking job panicked or was cancelled
    #[error("Background job failed: {error}")]
    JobFailed { error: String },
}

impl From<tokio::task::JoinError> for RuntimeError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::JobFailed {
            error: e.to_string(),
        }
    }
}

/// Top-level sketchforge error type
#[derive(Error, Debug)]
pub enum SketchforgeError {
    /// Catalog error
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Project error
    #[error("Project error: {0}")]
    Project(#[from] ProjectError),

    /// Build error
    #[error("Build error: {0}")]
    Plan(#[from] PlanError),

    /// Download error
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// Install error
    #[error("Install error: {0}")]
    Install(#[from] InstallError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    /// Runtime error
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}
