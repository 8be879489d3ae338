use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::core::error::InstallerResult;
use crate::core::paths::{self, EnvironmentError};
use crate::core::progress::ProgressEvent;
use crate::core::state::InstallerConfig;

use super::model::{InstallEvent, InstallEventKind, InstallOutcome, InstallRequest};
use super::pipeline::InstallPipeline;

/// Entry point for front ends: resolves paths and starts install runs.
///
/// Starting one run at a time is the caller's responsibility.
#[derive(Clone)]
pub struct Installer {
    pipeline: Arc<InstallPipeline>,
}

impl Installer {
    pub fn new(config: &InstallerConfig) -> InstallerResult<Self> {
        Ok(Self {
            pipeline: Arc::new(InstallPipeline::from_config(config)?),
        })
    }

    pub fn resolve_default_path() -> Result<PathBuf, EnvironmentError> {
        paths::resolve_default_path()
    }

    /// Spawns the pipeline on the current tokio runtime and returns at once.
    pub fn start_install(&self, request: InstallRequest) -> InstallHandle {
        let run_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let (tx, events) = mpsc::unbounded_channel();

        let pipeline = Arc::clone(&self.pipeline);
        let token = cancel.clone();
        let task = tokio::spawn(
            async move {
                info!("Install run started");
                let progress_tx = tx.clone();
                let mut on_event = move |event: ProgressEvent| {
                    // A subscriber that went away does not stop the run.
                    let _ = progress_tx.send(InstallEvent {
                        run_id,
                        kind: InstallEventKind::Progress(event),
                    });
                };

                let outcome = pipeline.run(&request, &token, &mut on_event).await;
                let _ = tx.send(InstallEvent {
                    run_id,
                    kind: InstallEventKind::Finished(outcome.clone()),
                });
                outcome
            }
            .instrument(info_span!("install", %run_id)),
        );

        InstallHandle {
            run_id,
            cancel,
            events,
            task,
        }
    }
}

/// One in-flight install run. Dropping the handle does not stop the run.
pub struct InstallHandle {
    run_id: Uuid,
    cancel: CancellationToken,
    events: mpsc::UnboundedReceiver<InstallEvent>,
    task: JoinHandle<InstallOutcome>,
}

impl InstallHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Requests cancellation. Only honoured while the archive is downloading.
    pub fn cancel(&self) {
        info!(run_id = %self.run_id, "Cancellation requested");
        self.cancel.cancel();
    }

    /// Token that can cancel this run from another task or thread.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next progress or terminal event; `None` once the run is over and
    /// every event was received.
    pub async fn next_event(&mut self) -> Option<InstallEvent> {
        self.events.recv().await
    }

    pub async fn wait(self) -> InstallOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) => InstallOutcome::Failed(format!("install task aborted: {err}")),
        }
    }
}
