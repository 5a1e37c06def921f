//! Platform and tool installation
//!
//! An install downloads an archive into the staging directory, unpacks it in
//! a scratch directory below staging and moves the result into the version
//! directory. The version directory's presence is the only record of an
//! install, so asking twice is harmless.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core::tooldeps::{DownloadTask, InstallKind};
use crate::infra::archive;
use crate::infra::download::{DownloadManager, ProgressCallback};
use crate::infra::filesystem;
use crate::infra::layout::ToolchainLayout;

/// Receiver of user-facing progress text
pub trait MessageSink: Send + Sync {
    /// Deliver one message
    fn send(&self, message: String);
}

/// Sink that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MessageSink for LogSink {
    fn send(&self, message: String) {
        tracing::info!("{message}");
    }
}

/// Result of an install request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Version directory already existed; nothing was done
    AlreadyInstalled,
    /// Installed into this directory
    Installed(PathBuf),
    /// Download or extraction failed
    Failed(String),
}

/// Downloads and extracts platform and tool archives
#[derive(Clone)]
pub struct InstallManager {
    layout: ToolchainLayout,
    downloader: DownloadManager,
    messages: Arc<dyn MessageSink>,
}

impl InstallManager {
    /// Create an install manager
    pub fn new(
        layout: ToolchainLayout,
        downloader: DownloadManager,
        messages: Arc<dyn MessageSink>,
    ) -> Self {
        Self {
            layout,
            downloader,
            messages,
        }
    }

    /// Toolchain layout installs go into
    pub fn layout(&self) -> &ToolchainLayout {
        &self.layout
    }

    /// Install a platform or tool unless its version directory exists
    pub async fn request_install(&self, task: &DownloadTask) -> InstallOutcome {
        let target = task.target_dir(&self.layout);
        if target.is_dir() {
            tracing::debug!("{} already installed", target.display());
            return InstallOutcome::AlreadyInstalled;
        }

        self.messages
            .send(format!("[{}] Waiting for download...", task.url));

        let archive_path = self.layout.staging_dir().join(task.archive_name());
        if let Err(e) = self
            .downloader
            .download(
                &task.url,
                &archive_path,
                task.checksum.as_deref(),
                Some(self.progress(task)),
            )
            .await
        {
            let reason = e.to_string();
            self.messages.send(format!("[{}] {reason}", task.url));
            return InstallOutcome::Failed(reason);
        }

        let label = format!("[{}] {} {}:", task.package, task.name, task.version);
        self.messages.send(format!("{label} Installation started."));

        if let Some(parent) = target.parent() {
            if let Err(e) = filesystem::create_dir_all(parent) {
                let reason = e.to_string();
                self.messages.send(reason.clone());
                return InstallOutcome::Failed(reason);
            }
        }

        let extract_target = target.clone();
        let scratch = self.layout.extract_dir(task.archive_name());
        let result = tokio::task::spawn_blocking(move || {
            archive::install_archive(&archive_path, &extract_target, &scratch)
        })
        .await;

        match result {
            Ok(Ok(path)) => {
                self.messages.send(format!("{label} Installation completed."));
                tracing::info!(
                    "Installed {} {} {}",
                    kind_name(task.kind),
                    task.name,
                    task.version
                );
                InstallOutcome::Installed(path)
            }
            Ok(Err(e)) => {
                let reason = e.to_string();
                self.messages.send(format!("{label} {reason}"));
                InstallOutcome::Failed(reason)
            }
            Err(e) => {
                let reason = e.to_string();
                self.messages.send(format!("{label} {reason}"));
                InstallOutcome::Failed(reason)
            }
        }
    }

    /// Progress callback posting a message every 10%
    fn progress(&self, task: &DownloadTask) -> ProgressCallback {
        let messages = Arc::clone(&self.messages);
        let archive = task.archive_name().to_string();
        let last_step = AtomicU64::new(0);

        Box::new(move |downloaded, total| {
            if total == 0 {
                return;
            }
            let step = downloaded * 10 / total;
            if step > last_step.swap(step, Ordering::Relaxed) {
                messages.send(format!("[{archive}] {}%", step * 10));
            }
        })
    }
}

fn kind_name(kind: InstallKind) -> &'static str {
    match kind {
        InstallKind::Platform => "platform",
        InstallKind::Tool => "tool",
    }
}
