//! State actor
//!
//! One blocking task owns the [`Workspace`] and the stored index `ETag`s.
//! Everything else reaches them through a cloneable [`StateHandle`], whose
//! requests are closures run by the actor in arrival order with the reply
//! sent back over a oneshot channel.

use std::collections::BTreeMap;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::defaults::STATE_CHANNEL_CAPACITY;
use crate::core::build_env::BuildEnvironment;
use crate::core::catalog::Catalog;
use crate::core::tooldeps::{HostInfo, ToolCheck};
use crate::core::view::StateView;
use crate::core::workspace::{Transition, Workspace};
use crate::error::{PlanError, RuntimeError};
use crate::infra::filesystem;
use crate::infra::layout::ToolchainLayout;

/// Stored `ETag` per index name
pub type Etags = BTreeMap<String, String>;

/// Everything the actor owns
#[derive(Debug)]
pub struct AppState {
    /// Catalog, definitions and selection
    pub workspace: Workspace,
    etags: Etags,
}

impl AppState {
    /// Wrap a workspace, loading stored `ETag`s from its toolchain root
    pub fn new(workspace: Workspace) -> Self {
        let etags = filesystem::load_toml(&workspace.layout().etags_path()).unwrap_or_else(|e| {
            tracing::warn!("Ignoring stored ETags: {e}");
            Etags::new()
        });
        Self { workspace, etags }
    }

    /// Stored `ETag` of an index
    pub fn etag(&self, name: &str) -> Option<&str> {
        self.etags.get(name).map(String::as_str)
    }

    /// Store and persist the `ETag` of an index
    pub fn set_etag(&mut self, name: &str, etag: &str) {
        self.etags.insert(name.to_string(), etag.to_string());
        if let Err(e) = filesystem::save_toml(&self.workspace.layout().etags_path(), &self.etags) {
            tracing::warn!("{e}");
        }
    }

    fn persist_selection(&self) {
        if let Err(e) = self.workspace.save_selection() {
            tracing::warn!("{e}");
        }
    }
}

/// A selection change requested by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectCommand {
    /// Package name
    Package(String),
    /// Package and platform name
    Platform {
        /// Package name
        package: String,
        /// Platform display name
        platform: String,
    },
    /// Platform version
    Version(String),
    /// Board name
    Board(String),
    /// Board option value
    Option {
        /// Option key
        key: String,
        /// Value name
        value: String,
    },
    /// Programmer name
    Programmer(String),
    /// Serial port
    SerialPort(String),
    /// UI language
    Language(String),
}

impl SelectCommand {
    fn apply(&self, ws: &mut Workspace) -> Transition {
        match self {
            Self::Package(p) => ws.select_package(p),
            Self::Platform { package, platform } => ws.select_platform(package, platform),
            Self::Version(v) => ws.select_version(v),
            Self::Board(b) => ws.select_board(b),
            Self::Option { key, value } => ws.select_option(key, value),
            Self::Programmer(p) => ws.select_programmer(p),
            Self::SerialPort(p) => ws.select_serial_port(p),
            Self::Language(l) => ws.select_language(l),
        }
    }
}

type Job = Box<dyn FnOnce(&mut AppState) + Send>;

/// Handle to the state actor
#[derive(Debug, Clone)]
pub struct StateHandle {
    tx: mpsc::Sender<Job>,
}

impl StateHandle {
    /// Start the actor
    ///
    /// Jobs rescan directories and parse index files, so the actor runs on
    /// the blocking pool rather than an async worker. It stops once every
    /// handle is dropped.
    pub fn spawn(mut state: AppState) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Job>(STATE_CHANNEL_CAPACITY);
        let actor = tokio::task::spawn_blocking(move || {
            while let Some(job) = rx.blocking_recv() {
                job(&mut state);
            }
            tracing::debug!("State actor finished");
        });
        (Self { tx }, actor)
    }

    /// Run `f` on the actor and return its result
    pub async fn query<R, F>(&self, f: F) -> Result<R, RuntimeError>
    where
        F: FnOnce(&mut AppState) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        let job: Job = Box::new(move |state| {
            let _ = reply.send(f(state));
        });
        self.tx.send(job).await.map_err(|_| RuntimeError::StateClosed)?;
        response.await.map_err(|_| RuntimeError::StateClosed)
    }

    /// Snapshot for rendering
    pub async fn view(&self) -> Result<StateView, RuntimeError> {
        self.query(|s| StateView::from_workspace(&s.workspace)).await
    }

    /// Apply a selection change and persist the selection
    pub async fn select(&self, command: SelectCommand) -> Result<Transition, RuntimeError> {
        self.query(move |s| {
            let transition = command.apply(&mut s.workspace);
            s.persist_selection();
            transition
        })
        .await
    }

    /// Replace the serial port list
    pub async fn set_serial_ports(&self, ports: Vec<String>) -> Result<Transition, RuntimeError> {
        self.query(move |s| {
            let transition = s.workspace.set_serial_ports(ports);
            s.persist_selection();
            transition
        })
        .await
    }

    /// Current serial port list
    pub async fn serial_ports(&self) -> Result<Vec<String>, RuntimeError> {
        self.query(|s| s.workspace.serial_ports().to_vec()).await
    }

    /// Reload index documents from the toolchain root
    pub async fn reload_catalog(&self) -> Result<Transition, RuntimeError> {
        self.query(|s| {
            let catalog = Catalog::load_dir(s.workspace.layout().root());
            let transition = s.workspace.refresh_catalog(catalog);
            s.persist_selection();
            transition
        })
        .await
    }

    /// Rescan installed platforms and tools
    pub async fn rescan_installed(&self) -> Result<Transition, RuntimeError> {
        self.query(|s| {
            let transition = s.workspace.rescan_installed();
            s.persist_selection();
            transition
        })
        .await
    }

    /// Tool check for the selected platform version
    pub async fn tool_check(&self, host: HostInfo) -> Result<ToolCheck, RuntimeError> {
        self.query(move |s| s.workspace.tool_check(&host)).await
    }

    /// Tool check for a specific indexed platform version
    pub async fn tool_check_for(
        &self,
        package: String,
        arch: String,
        version: String,
        host: HostInfo,
    ) -> Result<Option<ToolCheck>, RuntimeError> {
        self.query(move |s| s.workspace.tool_check_for(&package, &arch, &version, &host))
            .await
    }

    /// Build environment of the active toolchain
    pub async fn build_environment(
        &self,
        extra_flags: String,
        verbose_upload: bool,
    ) -> Result<Result<BuildEnvironment, PlanError>, RuntimeError> {
        self.query(move |s| {
            BuildEnvironment::from_workspace(&s.workspace, &extra_flags, verbose_upload)
        })
        .await
    }

    /// Documentation link of the selected platform
    pub async fn platform_help_url(&self) -> Result<Option<String>, RuntimeError> {
        self.query(|s| s.workspace.platform_help_url()).await
    }

    /// Toolchain layout
    pub async fn layout(&self) -> Result<ToolchainLayout, RuntimeError> {
        self.query(|s| s.workspace.layout().clone()).await
    }

    /// Stored `ETag` of an index
    pub async fn etag(&self, name: &str) -> Result<Option<String>, RuntimeError> {
        let name = name.to_string();
        self.query(move |s| s.etag(&name).map(str::to_string)).await
    }

    /// Store the `ETag` of an index
    pub async fn set_etag(&self, name: &str, etag: &str) -> Result<(), RuntimeError> {
        let (name, etag) = (name.to_string(), etag.to_string());
        self.query(move |s| s.set_etag(&name, &etag)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::selection::{self, Selection};
    use crate::core::workspace::testing::workspace_in;
    use crate::core::workspace::Section;
    use tempfile::TempDir;

    fn spawn(temp: &TempDir) -> (StateHandle, JoinHandle<()>) {
        StateHandle::spawn(AppState::new(workspace_in(temp.path(), Selection::new())))
    }

    #[tokio::test]
    async fn test_requests_are_serialized() {
        let temp = TempDir::new().unwrap();
        let (handle, _actor) = spawn(&temp);

        let transition = handle
            .select(SelectCommand::Board("Arduino Mega".to_string()))
            .await
            .unwrap();
        assert!(transition.checks_tools());
        assert!(transition.sections().contains(&Section::BoardOptions));

        let view = handle.view().await.unwrap();
        assert_eq!(view.selected(selection::BOARD), Some("Arduino Mega"));
        let saved = Selection::load(&temp.path().join("selected.toml")).unwrap();
        assert_eq!(saved.get(selection::BOARD), Some("Arduino Mega"));
        assert_eq!(
            view.selected(&selection::option_slot("cpu")),
            Some("ATmega2560 (Mega 2560)")
        );
    }

    #[tokio::test]
    async fn test_serial_ports_repair_selection() {
        let temp = TempDir::new().unwrap();
        let (handle, _actor) = spawn(&temp);

        handle
            .set_serial_ports(vec!["/dev/ttyACM0".to_string(), "/dev/ttyUSB0".to_string()])
            .await
            .unwrap();
        let view = handle.view().await.unwrap();
        assert_eq!(view.selected(selection::SERIAL_PORT), Some("/dev/ttyACM0"));

        handle.set_serial_ports(Vec::new()).await.unwrap();
        let view = handle.view().await.unwrap();
        assert_eq!(view.selected(selection::SERIAL_PORT), None);
    }

    #[tokio::test]
    async fn test_etags_persist() {
        let temp = TempDir::new().unwrap();
        let (handle, _actor) = spawn(&temp);
        handle.set_etag("arduino", "abc").await.unwrap();
        assert_eq!(handle.etag("arduino").await.unwrap().as_deref(), Some("abc"));

        let reloaded = AppState::new(workspace_in(temp.path(), Selection::new()));
        assert_eq!(reloaded.etag("arduino"), Some("abc"));
    }

    #[tokio::test]
    async fn test_panicking_job_closes_actor() {
        let temp = TempDir::new().unwrap();
        let (handle, actor) = spawn(&temp);

        let result = handle.query::<(), _>(|_| panic!("job failed")).await;
        assert!(matches!(result, Err(RuntimeError::StateClosed)));
        assert!(actor.await.is_err());
        assert!(matches!(
            handle.view().await,
            Err(RuntimeError::StateClosed)
        ));
    }

    #[tokio::test]
    async fn test_slow_job_leaves_async_tasks_running() {
        let temp = TempDir::new().unwrap();
        let (handle, _actor) = spawn(&temp);
        let (started, job_running) = oneshot::channel::<()>();
        let (release, wait) = std::sync::mpsc::channel::<()>();

        let other = tokio::spawn(async move {
            job_running.await.unwrap();
            release.send(()).unwrap();
        });
        let finished = handle
            .query(move |_| {
                let _ = started.send(());
                wait.recv_timeout(std::time::Duration::from_secs(5)).is_ok()
            })
            .await
            .unwrap();

        assert!(finished);
        other.await.unwrap();
    }
}
