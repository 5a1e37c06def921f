//! CLI implementation for `sketchforge import-ide`

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::session::Session;

/// Import the toolchain bundled with an IDE installation
pub async fn execute(ide: PathBuf) -> Result<()> {
    let session = Session::open(true)?;
    session.fabric.import_ide(ide).await?;
    session.finish().await;
    Ok(())
}
