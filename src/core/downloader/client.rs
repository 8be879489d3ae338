use std::time::Instant;

use futures_util::TryStreamExt;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::core::progress::ProgressRange;
use crate::core::state::InstallerConfig;

/// Bytes requested from the body stream per read.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;
const DEFAULT_NOMINAL_SIZE: u64 = 350 * 1024 * 1024;
const MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("download failed: server answered with HTTP status {0}")]
    BadStatus(u16),
    #[error("could not reach the download server: {0}")]
    ConnectionFailed(#[from] reqwest::Error),
    #[error("connection lost while downloading: {0}")]
    Interrupted(#[source] std::io::Error),
    #[error("could not store downloaded data: {0}")]
    Sink(#[source] std::io::Error),
    #[error("download cancelled")]
    Cancelled,
}

/// Snapshot handed to the progress callback after every chunk.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    pub bytes_downloaded: u64,
    pub total_bytes: Option<u64>,
    pub bytes_per_second: f64,
    pub percent: f64,
    pub message: String,
}

/// Streams the modpack archive into a staging sink.
pub struct ArchiveFetcher {
    client: Client,
    chunk_size: usize,
    /// Denominator used when the server does not declare a length.
    nominal_size: u64,
}

impl ArchiveFetcher {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            chunk_size: DEFAULT_CHUNK_SIZE,
            nominal_size: DEFAULT_NOMINAL_SIZE,
        }
    }

    pub fn from_config(client: Client, config: &InstallerConfig) -> Self {
        Self::new(client)
            .with_chunk_size(config.chunk_size)
            .with_nominal_size(config.nominal_size_bytes())
    }

    pub fn with_chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = n.max(1);
        self
    }

    pub fn with_nominal_size(mut self, bytes: u64) -> Self {
        self.nominal_size = bytes;
        self
    }

    /// Download `url` into `sink`, returning the number of bytes written.
    ///
    /// Cancellation is checked after every chunk read and before that chunk is
    /// written. The response is owned by this call, so the connection is
    /// released on every return path.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch<W>(
        &self,
        url: &str,
        sink: &mut W,
        cancel: &CancellationToken,
        range: ProgressRange,
        on_progress: &mut (dyn FnMut(DownloadProgress) + Send),
    ) -> Result<u64, FetchError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            warn!("Archive request answered with {}", status);
            return Err(FetchError::BadStatus(status.as_u16()));
        }
        if response.url().as_str() != url {
            debug!("Followed redirect to {}", response.url());
        }

        let declared = response.content_length().filter(|len| *len > 0);
        info!(
            "Downloading archive ({})",
            declared
                .map(|len| format!("{len} bytes"))
                .unwrap_or_else(|| "unknown size".to_string())
        );

        let reader = StreamReader::new(response.bytes_stream().map_err(std::io::Error::other));
        tokio::pin!(reader);

        let mut buffer = vec![0_u8; self.chunk_size];
        let mut received = 0_u64;
        let started = Instant::now();

        loop {
            let read = reader
                .read(&mut buffer)
                .await
                .map_err(FetchError::Interrupted)?;
            if read == 0 {
                break;
            }

            if cancel.is_cancelled() {
                info!("Download cancelled after {} bytes", received);
                return Err(FetchError::Cancelled);
            }

            sink.write_all(&buffer[..read])
                .await
                .map_err(FetchError::Sink)?;
            received = received.saturating_add(read as u64);

            let elapsed = started.elapsed().as_secs_f64();
            let bytes_per_second = if elapsed > 0.0 {
                received as f64 / elapsed
            } else {
                0.0
            };

            on_progress(DownloadProgress {
                bytes_downloaded: received,
                total_bytes: declared,
                bytes_per_second,
                percent: download_percent(range, received, declared, self.nominal_size),
                message: progress_message(received, declared, bytes_per_second),
            });
        }

        sink.flush().await.map_err(FetchError::Sink)?;
        info!("Downloaded {} bytes in {:.1}s", received, started.elapsed().as_secs_f64());
        Ok(received)
    }
}

/// Position inside `range` after `received` bytes.
///
/// Without a declared length the nominal size is the denominator, grown to
/// the observed size once the download outruns it.
pub fn download_percent(
    range: ProgressRange,
    received: u64,
    declared: Option<u64>,
    nominal_size: u64,
) -> f64 {
    let total = match declared {
        Some(len) if len > 0 => len,
        _ => received.max(nominal_size),
    };
    if total == 0 {
        return range.start;
    }
    range.at(received as f64 / total as f64)
}

fn progress_message(received: u64, declared: Option<u64>, bytes_per_second: f64) -> String {
    let received_mb = received as f64 / MIB;
    let speed_mb = bytes_per_second / MIB;
    match declared {
        Some(total) => format!(
            "Downloading... {:.2} / {:.2} MB | {:.2} MB/s",
            received_mb,
            total as f64 / MIB,
            speed_mb
        ),
        None => format!("Downloading... {:.2} MB | {:.2} MB/s", received_mb, speed_mb),
    }
}
