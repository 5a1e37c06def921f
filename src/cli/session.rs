//! Running session shared by the commands that touch the workspace

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::host::ConsoleHost;
use crate::config::GlobalConfig;
use crate::core::workspace::Workspace;
use crate::infra::dirs::SketchforgeDirs;
use crate::infra::layout::ToolchainLayout;
use crate::infra::serial::{DevicePorts, PortLister};
use crate::runtime::{Fabric, FabricConfig};

/// Loaded configuration plus a started fabric
pub struct Session {
    /// Resolved sketchbook directory
    pub sketchbook: PathBuf,
    /// Terminal host
    pub host: Arc<ConsoleHost>,
    /// Task fabric
    pub fabric: Fabric,
}

impl Session {
    /// Load config and workspace, then start the fabric
    ///
    /// With `render_sections`, every state change prints the affected
    /// sections.
    pub fn open(render_sections: bool) -> Result<Self> {
        let dirs = SketchforgeDirs::new();
        let config = GlobalConfig::load(&dirs).context("Failed to load global config")?;
        Ok(Self::open_with(&dirs, config, render_sections))
    }

    /// Start a session from already loaded settings
    pub fn open_with(dirs: &SketchforgeDirs, config: GlobalConfig, render_sections: bool) -> Self {
        let layout = ToolchainLayout::new(config.toolchain_root(dirs));
        let sketchbook = config.sketchbook(dirs);
        tracing::debug!(
            "Toolchain root {}, sketchbook {}",
            layout.root().display(),
            sketchbook.display()
        );

        let lister: Arc<dyn PortLister> = Arc::new(DevicePorts::system());
        let workspace = Workspace::load(layout, lister.list_ports());
        let fabric_config = FabricConfig::from_global(&config, sketchbook.clone());
        let host = Arc::new(ConsoleHost::new(
            config,
            dirs.global_config_path(),
            render_sections,
        ));
        let fabric = Fabric::start(workspace, host.clone(), lister, fabric_config);

        Self {
            sketchbook,
            host,
            fabric,
        }
    }

    /// Wait for queued work and stop the fabric
    pub async fn finish(self) {
        self.fabric.drain().await;
        self.fabric.stop();
    }
}
