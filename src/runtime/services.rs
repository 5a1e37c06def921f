//! Task handlers
//!
//! [`Services`] holds what the queue workers share: the state handle, the
//! host, producers of the other queues and the network helpers. Each
//! `handle_*` method is the body of one queue's worker.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::build_env::collect_sources;
use crate::core::ide_import::import_ide;
use crate::core::planner::{plan_build, BuildRequest};
use crate::core::project::Project;
use crate::core::recipe::{RecipeCommands, SIZE_PATTERN, UPLOAD_PATTERN};
use crate::core::size::size_report;
use crate::core::tooldeps::{
    check_tool_dependencies, DownloadTask, HostInfo, InstallKind, ToolCheck,
};
use crate::core::workspace::Transition;
use crate::error::{CatalogError, PlanError, RuntimeError, SketchforgeError};
use crate::infra::download::DownloadManager;
use crate::infra::install::{InstallManager, InstallOutcome};
use crate::infra::process;
use crate::runtime::host::Host;
use crate::runtime::queue::QueueSender;
use crate::runtime::state::StateHandle;

/// Build a project, optionally uploading the result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTask {
    /// Project directory
    pub project: PathBuf,
    /// Enqueue an upload after a successful build
    pub upload: bool,
}

/// Run an expanded upload command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    /// Shell command line
    pub command: String,
}

/// Shared context of the queue workers
#[derive(Clone)]
pub struct Services {
    pub(crate) state: StateHandle,
    pub(crate) host: Arc<dyn Host>,
    pub(crate) messages: QueueSender<String>,
    pub(crate) downloads: QueueSender<DownloadTask>,
    pub(crate) uploads: QueueSender<UploadTask>,
    pub(crate) installer: InstallManager,
    pub(crate) downloader: DownloadManager,
    pub(crate) host_info: HostInfo,
    pub(crate) sketchbook: PathBuf,
    pub(crate) index_urls: BTreeMap<String, String>,
}

impl Services {
    /// State handle
    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    /// Post a message to the host through the message queue
    pub async fn say(&self, message: impl Into<String>) {
        if let Err(e) = self.messages.put(message.into()).await {
            tracing::warn!("{e}");
        }
    }

    /// Handle the effects of a state change
    ///
    /// The tool check comes first, then the affected sections are redrawn.
    pub async fn apply_transition(&self, transition: Transition) -> Result<(), RuntimeError> {
        if transition.checks_tools() {
            self.check_tools().await?;
        }
        let sections = transition.sections();
        if !sections.is_empty() {
            let view = self.state.view().await?;
            self.host.render(&view, &sections);
        }
        Ok(())
    }

    /// Check the selected platform's tools, requesting missing ones
    ///
    /// Returns true when every tool is installed.
    pub async fn check_tools(&self) -> Result<bool, RuntimeError> {
        let check = self.state.tool_check(self.host_info.clone()).await?;
        Ok(self.enqueue_check(check).await)
    }

    /// Requests go through `put_nowait` because this also runs on the
    /// download worker, which must not wait on its own full queue.
    async fn enqueue_check(&self, check: ToolCheck) -> bool {
        for warning in &check.warnings {
            self.say(warning.as_str()).await;
        }
        for request in check.requests {
            self.downloads.put_nowait(request);
        }
        check.ready
    }

    /// Request installation of an indexed platform version
    pub async fn install_platform(
        &self,
        package: &str,
        platform: &str,
        version: &str,
    ) -> Result<(), SketchforgeError> {
        let (p, pl, v) = (package.to_string(), platform.to_string(), version.to_string());
        let task = self
            .state
            .query(move |s| {
                s.workspace
                    .catalog()
                    .platform_release(&p, &pl, &v)
                    .map(|release| DownloadTask::platform(&p, release))
            })
            .await?
            .ok_or_else(|| CatalogError::PlatformNotFound {
                package: package.to_string(),
                platform: platform.to_string(),
                version: version.to_string(),
            })?;
        self.downloads.put(task).await?;
        Ok(())
    }

    // ============================================
    // Downloads
    // ============================================

    /// Install one platform or tool
    ///
    /// A freshly installed platform is picked up by a rescan and its own
    /// tools are then checked.
    pub async fn handle_download(&self, task: DownloadTask) {
        let outcome = self.installer.request_install(&task).await;
        if !matches!(outcome, InstallOutcome::Installed(_)) || task.kind != InstallKind::Platform {
            return;
        }
        if let Err(e) = self.after_platform_install(&task).await {
            tracing::warn!("{e}");
        }
    }

    async fn after_platform_install(&self, task: &DownloadTask) -> Result<(), RuntimeError> {
        let transition = self.state.rescan_installed().await?;
        self.apply_transition(transition).await?;

        let check = self
            .state
            .tool_check_for(
                task.package.clone(),
                task.name.clone(),
                task.version.clone(),
                self.host_info.clone(),
            )
            .await?;
        if let Some(check) = check {
            self.enqueue_check(check).await;
        }
        Ok(())
    }

    // ============================================
    // Builds
    // ============================================

    /// Build a project and report the outcome
    pub async fn handle_build(&self, task: BuildTask) {
        if let Err(e) = self.build(&task).await {
            self.say(format!("[Build] {e}")).await;
        }
    }

    async fn build(&self, task: &BuildTask) -> Result<(), SketchforgeError> {
        self.say(format!("[Build] {}...", task.project.display())).await;
        self.say("[Step 1] Check Toolchain.").await;
        if !self.check_tools().await? {
            self.say("[Build] Missing tools requested. Build again once they are installed.")
                .await;
            return Ok(());
        }

        self.say("[Step 2] Find all source files.").await;
        let extra_flags = self.host.read_setting("extra_build_flag").unwrap_or_default();
        let env = self
            .state
            .build_environment(extra_flags, self.host.flag("verbose_upload"))
            .await??;
        let build_root = self.state.layout().await?.build_root();
        let sketchbook = self.sketchbook.clone();
        let project_dir = task.project.clone();
        let force_full = self.host.flag("full_build");

        let (project, recipes, plan) =
            tokio::task::spawn_blocking(move || -> Result<_, SketchforgeError> {
                let project = Project::open(&project_dir, &build_root)?;
                let set = collect_sources(&project, &env, Some(&sketchbook))?;
                let recipes = env.recipes(&project, &set.include_dirs);
                let plan = plan_build(&BuildRequest {
                    recipes: &recipes,
                    build_dir: project.build_dir(),
                    project_name: project.name(),
                    sources: &set.sources,
                    signature: &env.signature,
                    force_full,
                })?;
                Ok((project, recipes, plan))
            })
            .await
            .map_err(RuntimeError::from)??;

        self.say("[Step 3] Start building.").await;
        let verbose = self.host.flag("verbose_build");
        for step in plan.steps() {
            if let Some(message) = step.message {
                self.say(message).await;
            }
            let output = process::run(step.command, None).await?;
            if verbose {
                self.say(step.command).await;
                if !output.stdout.is_empty() {
                    self.say(output.stdout.replace('\r', "")).await;
                }
            }
            if !output.stderr.is_empty() {
                self.say(output.stderr.replace('\r', "")).await;
            }
            if !output.success() {
                return Err(PlanError::CommandFailed {
                    command: step.command.to_string(),
                    code: output.code,
                }
                .into());
            }
        }

        self.host.write_setting("full_build", "false");
        self.report_size(&recipes, &project).await?;

        if task.upload {
            match recipes.get(UPLOAD_PATTERN) {
                Some(command) => {
                    self.uploads
                        .put(UploadTask {
                            command: command.to_string(),
                        })
                        .await?;
                }
                None => self.say("[Upload] The selected board has no upload command.").await,
            }
        }
        Ok(())
    }

    async fn report_size(
        &self,
        recipes: &RecipeCommands,
        project: &Project,
    ) -> Result<(), SketchforgeError> {
        let Some(command) = recipes.get(SIZE_PATTERN) else {
            return Ok(());
        };
        let output = process::run(command, None).await?;
        if output.stdout.is_empty() {
            return Ok(());
        }
        let board = self
            .state
            .query(|s| s.workspace.selected_board_properties())
            .await?;
        for line in size_report(&output.stdout, recipes, &board)? {
            self.say(line).await;
        }
        tracing::debug!("Size report done for {}", project.name());
        Ok(())
    }

    // ============================================
    // Uploads
    // ============================================

    /// Run an upload command
    pub async fn handle_upload(&self, task: UploadTask) {
        if self.host.flag("verbose_upload") {
            self.say(task.command.as_str()).await;
        }
        let output = match process::run(&task.command, None).await {
            Ok(output) => output,
            Err(e) => {
                self.say(format!("[Upload] {e}")).await;
                return;
            }
        };
        if !output.stdout.is_empty() {
            self.say(output.stdout.replace('\r', "")).await;
        }
        if !output.stderr.is_empty() {
            self.say(output.stderr.replace('\r', "")).await;
        }
        if output.success() {
            self.say("[Upload] Done.").await;
        } else {
            let code = output
                .code
                .map_or_else(|| "none".to_string(), |c| c.to_string());
            self.say(format!("[Upload] Failed with exit code {code}.")).await;
        }
    }

    // ============================================
    // IDE import
    // ============================================

    /// Import a bundled IDE installation
    pub async fn handle_import(&self, ide: PathBuf) {
        if let Err(e) = self.import(ide).await {
            self.say(format!("[Error] {e}")).await;
        }
    }

    async fn import(&self, ide: PathBuf) -> Result<(), SketchforgeError> {
        let layout = self.state.layout().await?;
        let sketchbook = self.sketchbook.clone();
        let report = tokio::task::spawn_blocking(move || import_ide(&ide, &layout, &sketchbook))
            .await
            .map_err(RuntimeError::from)??;

        for message in &report.messages {
            self.say(message.as_str()).await;
        }
        if report.platform_copied {
            let transition = self.state.rescan_installed().await?;
            self.apply_transition(transition).await?;
        }

        let release = report.release;
        let host = self.host_info.clone();
        let check = self
            .state
            .query(move |s| {
                let ws = &s.workspace;
                check_tool_dependencies(ws.catalog(), ws.installed(), &release, &host)
            })
            .await?;
        self.enqueue_check(check).await;
        Ok(())
    }

    // ============================================
    // Index freshness
    // ============================================

    /// Refresh index documents whose remote `ETag` changed
    ///
    /// With `force`, every index is downloaded. Returns true when the
    /// catalog was reloaded.
    pub async fn check_indexes(&self, force: bool) -> Result<bool, RuntimeError> {
        let layout = self.state.layout().await?;
        let mut changed = false;

        for (name, url) in &self.index_urls {
            let remote = self.downloader.remote_etag(url).await;
            if !force {
                let Some(remote) = &remote else {
                    continue;
                };
                if self.state.etag(name).await?.as_deref() == Some(remote.as_str()) {
                    tracing::debug!("Index '{name}' is current");
                    continue;
                }
            }

            let dest = layout.index_path(name);
            if let Err(e) = self.downloader.download(url, &dest, None, None).await {
                self.say(format!("[{url}] {e}")).await;
                continue;
            }
            if let Some(remote) = &remote {
                self.state.set_etag(name, remote).await?;
            }
            tracing::info!("Updated index '{name}' from {url}");
            changed = true;
        }

        if changed {
            let transition = self.state.reload_catalog().await?;
            self.apply_transition(transition).await?;
        }
        Ok(changed)
    }
}
