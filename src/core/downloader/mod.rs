pub mod client;

pub use client::{
    download_percent, ArchiveFetcher, DownloadProgress, FetchError, DEFAULT_CHUNK_SIZE,
};
