use std::io::SeekFrom;
use std::path::Path;

use reqwest::Client;
use tokio::io::AsyncSeekExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::core::archive::extract_archive;
use crate::core::downloader::{ArchiveFetcher, DownloadProgress};
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::http::build_http_client;
use crate::core::options::{ConfigPatcher, PatchStep};
use crate::core::progress::{ProgressEvent, ProgressRange, ProgressReporter};
use crate::core::state::InstallerConfig;

use super::model::{InstallOutcome, InstallRequest, InstallStage};

const CLEANING: ProgressRange = ProgressRange::new(0.0, 10.0);
const DOWNLOADING: ProgressRange = ProgressRange::new(10.0, 80.0);
const EXTRACTING: ProgressRange = ProgressRange::new(80.0, 90.0);
const PATCHING: ProgressRange = ProgressRange::new(90.0, 100.0);

const MODS_DIR: &str = "mods";

/// Clean → download → extract → patch, in that order, once per request.
pub struct InstallPipeline {
    archive_url: String,
    fetcher: ArchiveFetcher,
    patcher: ConfigPatcher,
}

impl InstallPipeline {
    pub fn new(config: &InstallerConfig, client: Client) -> Self {
        Self {
            archive_url: config.archive_url.clone(),
            fetcher: ArchiveFetcher::from_config(client, config),
            patcher: ConfigPatcher::from_config(config),
        }
    }

    pub fn from_config(config: &InstallerConfig) -> InstallerResult<Self> {
        config.validate()?;
        Ok(Self::new(config, build_http_client(config)?))
    }

    /// Runs the whole install and returns its single outcome.
    ///
    /// Events are delivered synchronously from the calling task. On failure
    /// or cancellation the last event is a 0% event carrying the reason.
    #[instrument(skip_all, fields(destination = ?request.destination_path))]
    pub async fn run(
        &self,
        request: &InstallRequest,
        cancel: &CancellationToken,
        on_event: &mut (dyn FnMut(ProgressEvent) + Send),
    ) -> InstallOutcome {
        let mut reporter = ProgressReporter::new(on_event);
        let mut stage = InstallStage::Idle;

        match self.execute(request, cancel, &mut reporter, &mut stage).await {
            Ok(()) => {
                info!("Installation finished");
                reporter.report(
                    InstallStage::Done,
                    100.0,
                    "Modpack download and installation complete!",
                );
                InstallOutcome::Success
            }
            Err(err) if err.is_cancelled() => {
                warn!("Installation cancelled while {}", stage);
                reporter.halt(InstallStage::Cancelled, "Installation cancelled");
                InstallOutcome::Cancelled
            }
            Err(err) => {
                error!("Installation failed while {}: {}", stage, err);
                let reason = err.to_string();
                reporter.halt(InstallStage::Failed, format!("Failed: {reason}"));
                InstallOutcome::Failed(reason)
            }
        }
    }

    async fn execute(
        &self,
        request: &InstallRequest,
        cancel: &CancellationToken,
        reporter: &mut ProgressReporter<'_>,
        stage: &mut InstallStage,
    ) -> InstallerResult<()> {
        let destination = request.destination_path.as_path();
        if destination.as_os_str().is_empty() {
            return Err(InstallerError::Config(
                "no installation directory was selected".into(),
            ));
        }

        *stage = InstallStage::Cleaning;
        reporter.report(*stage, CLEANING.start, "Removing old files...");
        prepare_destination(destination).await?;
        reporter.report(*stage, CLEANING.end, "Old files removed");

        *stage = InstallStage::Downloading;
        reporter.report(*stage, DOWNLOADING.start, "Starting download...");
        let staging = tokio::task::spawn_blocking(tempfile::tempfile)
            .await?
            .map_err(|source| InstallerError::io(std::env::temp_dir(), source))?;
        let mut sink = tokio::fs::File::from_std(staging);
        {
            let mut on_progress = |progress: DownloadProgress| {
                reporter.report(InstallStage::Downloading, progress.percent, progress.message)
            };
            self.fetcher
                .fetch(&self.archive_url, &mut sink, cancel, DOWNLOADING, &mut on_progress)
                .await?;
        }

        *stage = InstallStage::Extracting;
        reporter.report(*stage, EXTRACTING.start, "Extracting files...");
        sink.seek(SeekFrom::Start(0))
            .await
            .map_err(|source| InstallerError::io(std::env::temp_dir(), source))?;
        let staging = sink.into_std().await;
        let target = destination.to_path_buf();
        let summary =
            tokio::task::spawn_blocking(move || extract_archive(staging, &target)).await??;
        reporter.report(
            *stage,
            EXTRACTING.end,
            format!("Extracted {} files", summary.files),
        );

        *stage = InstallStage::Patching;
        for (index, step) in PatchStep::ALL.into_iter().enumerate() {
            let range = PATCHING.part(index, PatchStep::ALL.len());
            reporter.report(*stage, range.start, step.description());
            self.patcher.apply_step(step, destination, request).await?;
        }

        *stage = InstallStage::Done;
        Ok(())
    }
}

/// Drops the old `mods` folder so removed mods do not linger, and makes sure
/// the destination exists.
async fn prepare_destination(destination: &Path) -> InstallerResult<()> {
    let mods_dir = destination.join(MODS_DIR);
    match tokio::fs::remove_dir_all(&mods_dir).await {
        Ok(()) => info!("Removed stale {:?}", mods_dir),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => return Err(InstallerError::io(mods_dir, source)),
    }

    tokio::fs::create_dir_all(destination)
        .await
        .map_err(|source| InstallerError::io(destination, source))
}
