use std::ffi::OsString;
use std::path::PathBuf;

use thiserror::Error;

const GAME_DIR_NAME: &str = ".minecraft";
const MACOS_GAME_DIR: &str = "Library/Application Support/minecraft";
const WINDOWS_APPDATA_VAR: &str = "APPDATA";

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("environment variable {0} is not set")]
    MissingVariable(&'static str),
    #[error("could not determine the user's home directory")]
    HomeDirUnavailable,
}

/// Host operating system family, as far as the game directory layout cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsKind {
    Windows,
    MacOs,
    Unix,
}

impl OsKind {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            OsKind::Windows
        } else if cfg!(target_os = "macos") {
            OsKind::MacOs
        } else {
            OsKind::Unix
        }
    }
}

/// Conventional game directory for `os`, read from the live environment.
pub fn default_install_path(os: OsKind) -> Result<PathBuf, EnvironmentError> {
    let appdata = match os {
        OsKind::Windows => std::env::var_os(WINDOWS_APPDATA_VAR),
        _ => None,
    };
    let home = match os {
        OsKind::Windows => None,
        _ => dirs::home_dir(),
    };
    install_path_for(os, appdata, home)
}

/// Default game directory for the host this binary runs on.
pub fn resolve_default_path() -> Result<PathBuf, EnvironmentError> {
    default_install_path(OsKind::current())
}

pub fn install_path_for(
    os: OsKind,
    appdata: Option<OsString>,
    home: Option<PathBuf>,
) -> Result<PathBuf, EnvironmentError> {
    match os {
        OsKind::Windows => {
            let appdata = appdata
                .filter(|value| !value.is_empty())
                .ok_or(EnvironmentError::MissingVariable(WINDOWS_APPDATA_VAR))?;
            Ok(PathBuf::from(appdata).join(GAME_DIR_NAME))
        }
        OsKind::MacOs => {
            let home = home.ok_or(EnvironmentError::HomeDirUnavailable)?;
            Ok(home.join(MACOS_GAME_DIR))
        }
        OsKind::Unix => {
            let home = home.ok_or(EnvironmentError::HomeDirUnavailable)?;
            Ok(home.join(GAME_DIR_NAME))
        }
    }
}
