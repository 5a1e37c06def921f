//! CLI implementation for `sketchforge select`

use anyhow::Result;

use crate::cli::commands::SelectCommands;
use crate::cli::output::print_warning;
use crate::cli::session::Session;
use crate::core::selection;
use crate::runtime::SelectCommand;

impl SelectCommands {
    /// Selection slot and requested value
    fn slot(&self) -> (String, &str) {
        match self {
            Self::Package { name } => (selection::PACKAGE.to_string(), name),
            Self::Platform { platform, .. } => (selection::PLATFORM.to_string(), platform),
            Self::Version { version } => (selection::VERSION.to_string(), version),
            Self::Board { name } => (selection::BOARD.to_string(), name),
            Self::Option { key, value } => (selection::option_slot(key), value),
            Self::Programmer { name } => (selection::PROGRAMMER.to_string(), name),
            Self::Port { port } => (selection::SERIAL_PORT.to_string(), port),
            Self::Language { language } => (selection::LANGUAGE.to_string(), language),
        }
    }
}

impl From<SelectCommands> for SelectCommand {
    fn from(command: SelectCommands) -> Self {
        match command {
            SelectCommands::Package { name } => Self::Package(name),
            SelectCommands::Platform { package, platform } => Self::Platform { package, platform },
            SelectCommands::Version { version } => Self::Version(version),
            SelectCommands::Board { name } => Self::Board(name),
            SelectCommands::Option { key, value } => Self::Option { key, value },
            SelectCommands::Programmer { name } => Self::Programmer(name),
            SelectCommands::Port { port } => Self::SerialPort(port),
            SelectCommands::Language { language } => Self::Language(language),
        }
    }
}

/// Execute a select command
///
/// Values that are not available are repaired away by the workspace; the
/// user is told which value was kept instead.
pub async fn execute(command: SelectCommands) -> Result<()> {
    let (slot, requested) = command.slot();
    let requested = requested.to_string();

    let session = Session::open(true)?;
    session.fabric.select(command.into()).await?;
    let view = session.fabric.state().view().await?;
    session.finish().await;

    match view.selected(&slot) {
        Some(value) if value == requested => {}
        Some(value) => print_warning(&format!(
            "'{requested}' is not available for {slot}; kept '{value}'"
        )),
        None => print_warning(&format!("'{requested}' is not available for {slot}")),
    }
    Ok(())
}
