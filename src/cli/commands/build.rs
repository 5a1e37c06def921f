//! CLI implementation for `sketchforge build` and `sketchforge upload`

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::session::Session;
use crate::runtime::Host;

/// Queue a build, optionally followed by an upload, and wait for it
pub async fn execute(project: PathBuf, upload: bool, full: bool) -> Result<()> {
    let session = Session::open(false)?;
    if full {
        session.host.write_setting("full_build", "true");
    }
    session.fabric.build(project, upload).await?;
    session.finish().await;
    Ok(())
}
