//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod import;
pub mod index;
pub mod platform;
pub mod ports;
pub mod select;
pub mod sketch;
pub mod status;

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show installed platforms and the current selection
    Status,

    /// Change the current selection
    Select {
        #[command(subcommand)]
        command: SelectCommands,
    },

    /// Installable platforms
    Platform {
        #[command(subcommand)]
        command: PlatformCommands,
    },

    /// Build a sketch or plain project
    Build {
        /// Project directory (defaults to the current directory)
        path: Option<PathBuf>,

        /// Upload after a successful build
        #[arg(short, long)]
        upload: bool,

        /// Rebuild everything
        #[arg(long)]
        full: bool,
    },

    /// Build and upload a project
    Upload {
        /// Project directory (defaults to the current directory)
        path: Option<PathBuf>,
    },

    /// Create a new sketch in the sketchbook
    New {
        /// Sketch name
        name: String,
    },

    /// Import the toolchain bundled with an Arduino IDE installation
    ImportIde {
        /// IDE installation directory
        path: PathBuf,
    },

    /// Package index management
    Index {
        #[command(subcommand)]
        command: IndexCommands,
    },

    /// Print `#include` lines for a library
    LibIncludes {
        /// Library directory
        path: PathBuf,
    },

    /// List serial ports
    Ports,
}

/// Selection subcommands
#[derive(Subcommand, Debug)]
pub enum SelectCommands {
    /// Select an installed package
    Package {
        /// Package name
        name: String,
    },

    /// Select an installed platform
    Platform {
        /// Package name
        package: String,
        /// Platform display name
        platform: String,
    },

    /// Select an installed platform version
    Version {
        /// Version string
        version: String,
    },

    /// Select a board
    Board {
        /// Board name
        name: String,
    },

    /// Select a board option value
    Option {
        /// Option key (`cpu`, `baud`, ...)
        key: String,
        /// Value name
        value: String,
    },

    /// Select a programmer
    Programmer {
        /// Programmer name
        name: String,
    },

    /// Select a serial port
    Port {
        /// Port path
        port: String,
    },

    /// Select the UI language
    Language {
        /// Language code
        language: String,
    },
}

/// Platform subcommands
#[derive(Subcommand, Debug)]
pub enum PlatformCommands {
    /// List installable platforms
    List,

    /// Install a platform version and its tools
    Install {
        /// Package name
        package: String,
        /// Platform display name
        platform: String,
        /// Version (defaults to the newest)
        #[arg(long)]
        version: Option<String>,
    },

    /// Show the documentation link of the selected platform
    Docs,
}

/// Index subcommands
#[derive(Subcommand, Debug)]
pub enum IndexCommands {
    /// Download every configured index now
    Update,
}

impl Commands {
    /// Execute the command
    pub async fn run(self) -> Result<()> {
        match self {
            Self::Status => status::execute().await,
            Self::Select { command } => select::execute(command).await,
            Self::Platform { command } => match command {
                PlatformCommands::List => platform::list().await,
                PlatformCommands::Install {
                    package,
                    platform,
                    version,
                } => platform::install(&package, &platform, version).await,
                PlatformCommands::Docs => platform::docs().await,
            },
            Self::Build { path, upload, full } => {
                let project = project_dir(path)?;
                build::execute(project, upload, full).await
            }
            Self::Upload { path } => {
                let project = project_dir(path)?;
                build::execute(project, true, false).await
            }
            Self::New { name } => sketch::new(&name),
            Self::ImportIde { path } => import::execute(path).await,
            Self::Index { command } => match command {
                IndexCommands::Update => index::update().await,
            },
            Self::LibIncludes { path } => {
                sketch::lib_includes(&path);
                Ok(())
            }
            Self::Ports => {
                ports::execute();
                Ok(())
            }
        }
    }
}

fn project_dir(path: Option<PathBuf>) -> Result<PathBuf> {
    let path = match path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    Ok(std::fs::canonicalize(&path).unwrap_or(path))
}
