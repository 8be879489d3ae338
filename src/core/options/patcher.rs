use std::path::{Path, PathBuf};

use regex::{NoExpand, Regex};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::core::install::{InstallRequest, ShaderQuality};
use crate::core::state::InstallerConfig;

pub const OPTIONS_FILE: &str = "options.txt";
pub const SHADER_PROPERTIES_FILE: &str = "config/oculus.properties";
pub const SHADERPACKS_DIR: &str = "shaderpacks";

const LOW_SHADER_SETTINGS: &str = "\
BLOCK_REFLECT_QUALITY=0
CLOUD_QUALITY=1
ENTITY_SHADOWS_DEFINE=-1
LIGHTSHAFT_QUALI_DEFINE=0
SHADOW_QUALITY=0
SSAO_I=0
WATER_REFLECT_QUALITY=0
WAVING_BLOCKS=0
";

const MEDIUM_SHADER_SETTINGS: &str = "\
BLOCK_REFLECT_QUALITY=1
CLOUD_QUALITY=2
LIGHTSHAFT_QUALI_DEFINE=1
SHADOW_QUALITY=1
SSAO_I=50
WATER_REFLECT_QUALITY=1
";

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("expected configuration file is missing: {0:?}")]
    MissingFile(PathBuf),
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid substitution pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// The three files touched after extraction, in the order they are patched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchStep {
    GameOptions,
    ShaderProperties,
    ShaderQuality,
}

impl PatchStep {
    pub const ALL: [PatchStep; 3] = [
        PatchStep::GameOptions,
        PatchStep::ShaderProperties,
        PatchStep::ShaderQuality,
    ];

    pub fn description(self) -> &'static str {
        match self {
            PatchStep::GameOptions => "Applying game options...",
            PatchStep::ShaderProperties => "Configuring shaders...",
            PatchStep::ShaderQuality => "Applying shader quality...",
        }
    }
}

/// Rewrites the modpack's configuration to match an [`InstallRequest`].
#[derive(Debug, Clone)]
pub struct ConfigPatcher {
    server_address: String,
    shader_pack: String,
}

impl ConfigPatcher {
    pub fn new(server_address: impl Into<String>, shader_pack: impl Into<String>) -> Self {
        Self {
            server_address: server_address.into(),
            shader_pack: shader_pack.into(),
        }
    }

    pub fn from_config(config: &InstallerConfig) -> Self {
        Self::new(config.server_address.clone(), config.shader_pack.clone())
    }

    pub fn shader_quality_path(&self, destination: &Path) -> PathBuf {
        destination
            .join(SHADERPACKS_DIR)
            .join(format!("{}.txt", self.shader_pack))
    }

    pub async fn apply_options(
        &self,
        destination: &Path,
        request: &InstallRequest,
    ) -> Result<(), PatchError> {
        for step in PatchStep::ALL {
            self.apply_step(step, destination, request).await?;
        }
        Ok(())
    }

    #[instrument(skip(self, request))]
    pub async fn apply_step(
        &self,
        step: PatchStep,
        destination: &Path,
        request: &InstallRequest,
    ) -> Result<(), PatchError> {
        match step {
            PatchStep::GameOptions => {
                let path = destination.join(OPTIONS_FILE);
                rewrite_file(&path, |content| {
                    game_options(content, request, &self.server_address)
                })
                .await
            }
            PatchStep::ShaderProperties => {
                let path = destination.join(SHADER_PROPERTIES_FILE);
                rewrite_file(&path, |content| shader_properties(content, request)).await
            }
            PatchStep::ShaderQuality => self.write_shader_quality(destination, request).await,
        }
    }

    async fn write_shader_quality(
        &self,
        destination: &Path,
        request: &InstallRequest,
    ) -> Result<(), PatchError> {
        let path = self.shader_quality_path(destination);

        let Some(contents) = shader_quality_settings(request) else {
            return match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    info!("Removed {:?}, the shader pack will use its defaults", path);
                    Ok(())
                }
                Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(PatchError::Io { path, source }),
            };
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| PatchError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        if let Ok(current) = tokio::fs::read_to_string(&path).await {
            if current == contents {
                debug!("{:?} already up to date", path);
                return Ok(());
            }
        }

        tokio::fs::write(&path, contents)
            .await
            .map_err(|source| PatchError::Io { path: path.clone(), source })?;
        info!("Wrote shader quality settings to {:?}", path);
        Ok(())
    }
}

/// Literal settings file for the requested quality, or `None` when the
/// shader pack should fall back to its own defaults.
pub fn shader_quality_settings(request: &InstallRequest) -> Option<&'static str> {
    if !request.shader_enabled {
        return None;
    }
    match request.shader_quality {
        ShaderQuality::Low => Some(LOW_SHADER_SETTINGS),
        ShaderQuality::Medium => Some(MEDIUM_SHADER_SETTINGS),
        ShaderQuality::High => None,
    }
}

pub fn game_options(
    content: &str,
    request: &InstallRequest,
    server_address: &str,
) -> Result<String, PatchError> {
    let distance = request.performance_preset.view_distance().to_string();
    set_entries(
        content,
        ':',
        &[
            ("fullscreen", "false"),
            ("lastServer", server_address),
            ("renderDistance", distance.as_str()),
            ("simulationDistance", distance.as_str()),
        ],
    )
}

pub fn shader_properties(content: &str, request: &InstallRequest) -> Result<String, PatchError> {
    let distance = request.performance_preset.view_distance().to_string();
    let enabled = if request.shader_enabled { "true" } else { "false" };
    set_entries(
        content,
        '=',
        &[
            ("enableShaders", enabled),
            ("maxShadowRenderDistance", distance.as_str()),
        ],
    )
}

/// Sets every `key<sep>value` line, appending keys that are not present.
fn set_entries(content: &str, separator: char, entries: &[(&str, &str)]) -> Result<String, PatchError> {
    let mut output = content.to_string();
    for (key, value) in entries {
        let prefix = format!("{key}{separator}");
        let pattern = Regex::new(&format!(r"(?m)^{}[^\r\n]*", regex::escape(&prefix)))?;
        let line = format!("{prefix}{value}");

        if pattern.is_match(&output) {
            output = pattern.replace_all(&output, NoExpand(&line)).into_owned();
        } else {
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(&line);
            output.push('\n');
        }
    }
    Ok(output)
}

/// Read fully, transform in memory, write back only if something changed.
async fn rewrite_file<F>(path: &Path, transform: F) -> Result<(), PatchError>
where
    F: FnOnce(&str) -> Result<String, PatchError>,
{
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            return Err(PatchError::MissingFile(path.to_path_buf()));
        }
        Err(source) => {
            return Err(PatchError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let updated = transform(&content)?;
    if updated == content {
        debug!("{:?} already up to date", path);
        return Ok(());
    }

    tokio::fs::write(path, updated)
        .await
        .map_err(|source| PatchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    info!("Patched {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::install::PerformancePreset;

    const SERVER: &str = "play.example.net";
    const PACK: &str = "ComplementaryUnbound_r5.3.zip";

    fn request(
        shader_enabled: bool,
        shader_quality: ShaderQuality,
        performance_preset: PerformancePreset,
    ) -> InstallRequest {
        InstallRequest {
            destination_path: PathBuf::new(),
            shader_enabled,
            shader_quality,
            performance_preset,
        }
    }

    fn seed(dir: &Path) {
        std::fs::create_dir_all(dir.join("config")).unwrap();
        std::fs::write(
            dir.join(OPTIONS_FILE),
            "version:3465\nfullscreen:true\nrenderDistance:32\nsimulationDistance:16\nlastServer:\n",
        )
        .unwrap();
        std::fs::write(
            dir.join(SHADER_PROPERTIES_FILE),
            "#This file stores configuration options for Oculus\nenableShaders=false\nmaxShadowRenderDistance=32\nshaderPack=ComplementaryUnbound_r5.3.zip\n",
        )
        .unwrap();
    }

    #[test]
    fn game_options_replace_prior_values() {
        let req = request(true, ShaderQuality::Medium, PerformancePreset::Performance);
        let out = game_options(
            "fullscreen:true\nfullscreenResolution:x\nrenderDistance:32\nsimulationDistance:5\nlastServer:old.host\n",
            &req,
            SERVER,
        )
        .unwrap();
        assert_eq!(
            out,
            "fullscreen:false\nfullscreenResolution:x\nrenderDistance:8\nsimulationDistance:8\nlastServer:play.example.net\n"
        );
    }

    #[test]
    fn missing_keys_are_appended() {
        let req = request(true, ShaderQuality::High, PerformancePreset::Quality);
        let out = shader_properties("shaderPack=x.zip", &req).unwrap();
        assert_eq!(out, "shaderPack=x.zip\nenableShaders=true\nmaxShadowRenderDistance=12\n");
    }

    #[test]
    fn crlf_line_endings_survive() {
        let req = request(false, ShaderQuality::High, PerformancePreset::Quality);
        let out = shader_properties("enableShaders=true\r\nmaxShadowRenderDistance=4\r\n", &req).unwrap();
        assert_eq!(out, "enableShaders=false\r\nmaxShadowRenderDistance=12\r\n");
    }

    #[test]
    fn transforms_are_idempotent() {
        let req = request(true, ShaderQuality::Low, PerformancePreset::Performance);
        let once = game_options("renderDistance:2\n", &req, SERVER).unwrap();
        let twice = game_options(&once, &req, SERVER).unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn applying_twice_gives_identical_files() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let patcher = ConfigPatcher::new(SERVER, PACK);
        let req = request(true, ShaderQuality::Low, PerformancePreset::Quality);

        patcher.apply_options(dir.path(), &req).await.unwrap();
        let first: Vec<Vec<u8>> = [
            dir.path().join(OPTIONS_FILE),
            dir.path().join(SHADER_PROPERTIES_FILE),
            patcher.shader_quality_path(dir.path()),
        ]
        .iter()
        .map(|p| std::fs::read(p).unwrap())
        .collect();

        patcher.apply_options(dir.path(), &req).await.unwrap();
        let second: Vec<Vec<u8>> = [
            dir.path().join(OPTIONS_FILE),
            dir.path().join(SHADER_PROPERTIES_FILE),
            patcher.shader_quality_path(dir.path()),
        ]
        .iter()
        .map(|p| std::fs::read(p).unwrap())
        .collect();

        assert_eq!(first, second);
        assert_eq!(first[2], LOW_SHADER_SETTINGS.as_bytes());
    }

    #[tokio::test]
    async fn medium_performance_with_shaders() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let patcher = ConfigPatcher::new(SERVER, PACK);
        let req = request(true, ShaderQuality::Medium, PerformancePreset::Performance);

        patcher.apply_options(dir.path(), &req).await.unwrap();

        let options = std::fs::read_to_string(dir.path().join(OPTIONS_FILE)).unwrap();
        assert!(options.contains("renderDistance:8\n"));
        assert!(options.contains("simulationDistance:8\n"));
        assert!(options.contains("fullscreen:false\n"));
        assert!(options.contains("lastServer:play.example.net\n"));
        let properties = std::fs::read_to_string(dir.path().join(SHADER_PROPERTIES_FILE)).unwrap();
        assert!(properties.contains("enableShaders=true\n"));
        assert!(properties.contains("maxShadowRenderDistance=8\n"));
        assert!(properties.contains("shaderPack=ComplementaryUnbound_r5.3.zip\n"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("shaderpacks/ComplementaryUnbound_r5.3.zip.txt"))
                .unwrap(),
            MEDIUM_SHADER_SETTINGS
        );
    }

    #[tokio::test]
    async fn disabled_shader_removes_quality_file() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let patcher = ConfigPatcher::new(SERVER, PACK);
        let quality_file = patcher.shader_quality_path(dir.path());
        std::fs::create_dir_all(quality_file.parent().unwrap()).unwrap();
        std::fs::write(&quality_file, "SHADOW_QUALITY=3\n").unwrap();

        let req = request(false, ShaderQuality::Low, PerformancePreset::Quality);
        patcher.apply_options(dir.path(), &req).await.unwrap();

        assert!(!quality_file.exists());
        let properties = std::fs::read_to_string(dir.path().join(SHADER_PROPERTIES_FILE)).unwrap();
        assert!(properties.contains("enableShaders=false\n"));
    }

    #[tokio::test]
    async fn high_quality_without_existing_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let patcher = ConfigPatcher::new(SERVER, PACK);
        let req = request(true, ShaderQuality::High, PerformancePreset::Quality);

        patcher.apply_options(dir.path(), &req).await.unwrap();

        assert!(!patcher.shader_quality_path(dir.path()).exists());
    }

    #[tokio::test]
    async fn missing_options_file_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let patcher = ConfigPatcher::new(SERVER, PACK);
        let req = request(true, ShaderQuality::Medium, PerformancePreset::Quality);

        let err = patcher.apply_options(dir.path(), &req).await.unwrap_err();

        assert!(matches!(err, PatchError::MissingFile(ref p) if p.ends_with(OPTIONS_FILE)));
    }
}
