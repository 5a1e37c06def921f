//! Command-line interface module
//!
//! This module handles argument parsing, output formatting and the terminal
//! host. It contains no business logic - that belongs in [`crate::core`] and
//! [`crate::runtime`].

pub mod commands;
pub mod host;
pub mod output;
pub mod session;

use anyhow::Result;
use clap::Parser;

use commands::Commands;

/// Sketchforge - Arduino-style toolchain manager and sketch builder
///
/// Install vendor platforms, pick a board and build sketches incrementally.
#[derive(Parser, Debug)]
#[command(name = "sketchforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors and task messages
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        if let Some(cmd) = self.command {
            cmd.run().await
        } else {
            // No subcommand provided, show help
            use clap::CommandFactory;
            let mut cmd = Self::command();
            cmd.print_help()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commands::{PlatformCommands, SelectCommands};

    #[test]
    fn test_parse_select_option() {
        let cli = Cli::parse_from(["sketchforge", "select", "option", "cpu", "atmega168"]);
        match cli.command {
            Some(Commands::Select {
                command: SelectCommands::Option { key, value },
            }) => {
                assert_eq!(key, "cpu");
                assert_eq!(value, "atmega168");
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn test_parse_build_flags() {
        let cli = Cli::parse_from(["sketchforge", "-vv", "build", "Blink", "--upload", "--full"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Build { path, upload, full }) => {
                assert_eq!(path.unwrap().to_str(), Some("Blink"));
                assert!(upload && full);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn test_parse_platform_install_version() {
        let cli = Cli::parse_from([
            "sketchforge",
            "platform",
            "install",
            "arduino",
            "Arduino AVR Boards",
            "--version",
            "1.8.6",
        ]);
        match cli.command {
            Some(Commands::Platform {
                command: PlatformCommands::Install { version, .. },
            }) => assert_eq!(version.as_deref(), Some("1.8.6")),
            other => panic!("unexpected parse: {other:?}"),
        }
    }
}
