use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::downloader::DEFAULT_CHUNK_SIZE;
use crate::core::error::{InstallerError, InstallerResult};

pub const DEFAULT_ARCHIVE_URL: &str =
    "https://codeload.github.com/devleonardoamaral/minecraft_ultimaesperanca_modpack/zip/refs/heads/master";
pub const DEFAULT_SHADER_PACK: &str = "ComplementaryUnbound_r5.3.zip";
const DEFAULT_SERVER_ADDRESS: &str = "ultimaesperanca.mine.srv.br";
const DEFAULT_REFERER: &str = "https://codeload.github.com/";
const DEFAULT_NOMINAL_SIZE_MB: u64 = 350;

/// Everything about an install run that is not chosen by the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InstallerConfig {
    /// Branch snapshot served as a zip.
    pub archive_url: String,
    pub user_agent: String,
    pub referer: Option<String>,
    /// Redirect hops followed before the request is treated as failed.
    pub max_redirects: usize,
    /// Read size for the download body, in bytes.
    pub chunk_size: usize,
    /// Expected payload size used when the server omits Content-Length.
    pub nominal_size_mb: u64,
    /// Written to `lastServer` in options.txt.
    pub server_address: String,
    /// File name of the bundled shader pack under `shaderpacks/`.
    pub shader_pack: String,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            archive_url: DEFAULT_ARCHIVE_URL.to_string(),
            user_agent: concat!("UltimaEsperancaInstaller/", env!("CARGO_PKG_VERSION")).to_string(),
            referer: Some(DEFAULT_REFERER.to_string()),
            max_redirects: 1,
            chunk_size: DEFAULT_CHUNK_SIZE,
            nominal_size_mb: DEFAULT_NOMINAL_SIZE_MB,
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            shader_pack: DEFAULT_SHADER_PACK.to_string(),
        }
    }
}

impl InstallerConfig {
    pub fn load(path: &Path) -> InstallerResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| InstallerError::io(path, source))?;
        let config: InstallerConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        info!("Loaded installer configuration from {:?}", path);
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> InstallerResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                debug!("No configuration file given, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> InstallerResult<()> {
        if self.chunk_size == 0 {
            return Err(InstallerError::Config("chunk_size must be greater than zero".into()));
        }
        if self.archive_url.trim().is_empty() {
            return Err(InstallerError::Config("archive_url is empty".into()));
        }
        if self.shader_pack.trim().is_empty() || self.shader_pack.contains(['/', '\\']) {
            return Err(InstallerError::Config(format!(
                "shader_pack must be a plain file name, got {:?}",
                self.shader_pack
            )));
        }
        Ok(())
    }

    pub fn nominal_size_bytes(&self) -> u64 {
        self.nominal_size_mb.saturating_mul(1024 * 1024)
    }
}
