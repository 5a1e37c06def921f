//! CLI implementation for `sketchforge index`

use anyhow::{Context, Result};

use crate::cli::output::{create_spinner, print_info, print_success};
use crate::cli::session::Session;

/// Download every configured index
pub async fn update() -> Result<()> {
    let session = Session::open(false)?;
    let spinner = create_spinner("Updating package indexes...");
    let result = session.fabric.update_indexes(true).await;
    spinner.finish_and_clear();
    let changed = result.context("Failed to update package indexes")?;
    session.finish().await;

    if changed {
        print_success("Package indexes updated");
    } else {
        print_info("No package index could be downloaded");
    }
    Ok(())
}
