//! Task execution fabric
//!
//! Wires the state actor, the five task queues (messages, downloads, builds,
//! uploads, imports) and the background pollers together.

pub mod host;
pub mod poller;
pub mod queue;
pub mod services;
pub mod state;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::defaults::SERIAL_POLL_INTERVAL_MS;
use crate::config::GlobalConfig;
use crate::core::tooldeps::{DownloadTask, HostInfo};
use crate::core::workspace::Workspace;
use crate::error::{RuntimeError, SketchforgeError};
use crate::infra::download::DownloadManager;
use crate::infra::install::InstallManager;
use crate::infra::serial::PortLister;

pub use host::Host;
pub use queue::{InFlight, QueueSender, TaskQueue};
pub use services::{BuildTask, Services, UploadTask};
pub use state::{AppState, SelectCommand, StateHandle};

/// Fabric settings
#[derive(Debug, Clone)]
pub struct FabricConfig {
    /// Capacity of each task queue
    pub capacity: usize,
    /// Index name -> URL
    pub index_urls: BTreeMap<String, String>,
    /// Interval of the index poller
    pub index_period: Duration,
    /// Interval of the serial listener
    pub serial_period: Duration,
    /// Sketchbook directory
    pub sketchbook: PathBuf,
    /// Host used for download selection
    pub host_info: HostInfo,
}

impl FabricConfig {
    /// Settings from the global configuration
    pub fn from_global(config: &GlobalConfig, sketchbook: PathBuf) -> Self {
        Self {
            capacity: config.queue_capacity(),
            index_urls: config.index_urls(),
            index_period: Duration::from_secs(config.check_period_secs().max(1)),
            serial_period: Duration::from_millis(SERIAL_POLL_INTERVAL_MS),
            sketchbook,
            host_info: HostInfo::current(),
        }
    }
}

/// Running fabric
pub struct Fabric {
    services: Services,
    in_flight: InFlight,
    messages: TaskQueue<String>,
    downloads: TaskQueue<DownloadTask>,
    builds: TaskQueue<BuildTask>,
    uploads: TaskQueue<UploadTask>,
    imports: TaskQueue<PathBuf>,
    token: CancellationToken,
    background: Vec<JoinHandle<()>>,
}

impl Fabric {
    /// Start the actor, queues and pollers
    pub fn start(
        workspace: Workspace,
        host: Arc<dyn Host>,
        lister: Arc<dyn PortLister>,
        config: FabricConfig,
    ) -> Self {
        let layout = workspace.layout().clone();
        // The actor is not aborted with the rest; it ends with its last handle
        let (state, _actor) = StateHandle::spawn(AppState::new(workspace));
        let in_flight = InFlight::new();
        let capacity = config.capacity;

        let messages = queue::queue::<String>("messages", capacity, &in_flight);
        let downloads = queue::queue::<DownloadTask>("downloads", capacity, &in_flight);
        let builds = queue::queue::<BuildTask>("builds", capacity, &in_flight);
        let uploads = queue::queue::<UploadTask>("uploads", capacity, &in_flight);
        let imports = queue::queue::<PathBuf>("imports", capacity, &in_flight);

        let downloader = DownloadManager::new();
        let services = Services {
            state,
            host: Arc::clone(&host),
            messages: messages.sender(),
            downloads: downloads.sender(),
            uploads: uploads.sender(),
            installer: InstallManager::new(
                layout,
                downloader.clone(),
                Arc::new(messages.sender()),
            ),
            downloader,
            host_info: config.host_info,
            sketchbook: config.sketchbook,
            index_urls: config.index_urls,
        };

        let messages = messages.start(move |message: String| {
            let host = Arc::clone(&host);
            async move { host.display_message(&message) }
        });
        let downloads = {
            let s = services.clone();
            downloads.start(move |task| {
                let s = s.clone();
                async move { s.handle_download(task).await }
            })
        };
        let builds = {
            let s = services.clone();
            builds.start(move |task| {
                let s = s.clone();
                async move { s.handle_build(task).await }
            })
        };
        let uploads = {
            let s = services.clone();
            uploads.start(move |task| {
                let s = s.clone();
                async move { s.handle_upload(task).await }
            })
        };
        let imports = {
            let s = services.clone();
            imports.start(move |path| {
                let s = s.clone();
                async move { s.handle_import(path).await }
            })
        };

        let token = CancellationToken::new();
        let background = vec![
            poller::spawn_index_poller(services.clone(), config.index_period, token.child_token()),
            poller::spawn_serial_listener(
                services.clone(),
                lister,
                config.serial_period,
                token.child_token(),
            ),
        ];

        tracing::debug!("Fabric started with queue capacity {capacity}");
        Self {
            services,
            in_flight,
            messages,
            downloads,
            builds,
            uploads,
            imports,
            token,
            background,
        }
    }

    /// Shared worker context
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// State handle
    pub fn state(&self) -> &StateHandle {
        &self.services.state
    }

    /// Apply a selection change and handle its effects
    pub async fn select(&self, command: SelectCommand) -> Result<(), RuntimeError> {
        let transition = self.services.state.select(command).await?;
        self.services.apply_transition(transition).await
    }

    /// Run a correction pass and handle its effects
    pub async fn refresh(&self) -> Result<(), RuntimeError> {
        let transition = self.services.state.rescan_installed().await?;
        self.services.apply_transition(transition).await
    }

    /// Queue a build
    pub async fn build(&self, project: PathBuf, upload: bool) -> Result<(), RuntimeError> {
        self.builds.put(BuildTask { project, upload }).await
    }

    /// Queue an IDE import
    pub async fn import_ide(&self, ide: PathBuf) -> Result<(), RuntimeError> {
        self.imports.put(ide).await
    }

    /// Queue an install of an indexed platform version
    pub async fn install_platform(
        &self,
        package: &str,
        platform: &str,
        version: &str,
    ) -> Result<(), SketchforgeError> {
        self.services.install_platform(package, platform, version).await
    }

    /// Refresh remote indexes now
    pub async fn update_indexes(&self, force: bool) -> Result<bool, RuntimeError> {
        self.services.check_indexes(force).await
    }

    /// Post a message through the message queue
    pub async fn say(&self, message: impl Into<String>) {
        self.services.say(message).await;
    }

    /// Wait until every queue is empty and idle
    pub async fn drain(&self) {
        self.in_flight.idle().await;
    }

    /// Cancel the pollers and stop every queue
    pub fn stop(&self) {
        self.token.cancel();
        self.messages.stop();
        self.downloads.stop();
        self.builds.stop();
        self.uploads.stop();
        self.imports.stop();
        for task in &self.background {
            task.abort();
        }
    }
}

impl Drop for Fabric {
    fn drop(&mut self) {
        self.stop();
    }
}
