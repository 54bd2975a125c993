use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::PlatformProfile;

const APP_DIR: &str = "hatch";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AppPathsError {
    #[error("Could not determine home directory")]
    HomeDirUnavailable,
    #[error("Could not determine config directory")]
    ConfigDirUnavailable,
    #[error("Could not determine data directory")]
    DataDirUnavailable,
}

pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl AppPaths {
    /// Build launcher paths for the current platform.
    ///
    /// # Errors
    /// Returns an error when a required base directory (for example the user
    /// home, config or data directory) cannot be determined.
    pub fn new() -> Result<Self, AppPathsError> {
        #[cfg(target_os = "macos")]
        {
            let home = dirs::home_dir().ok_or(AppPathsError::HomeDirUnavailable)?;
            Ok(Self {
                config_dir: home.join("Library/Application Support").join(APP_DIR),
                data_dir: home.join("Library/Application Support").join(APP_DIR),
            })
        }

        #[cfg(not(target_os = "macos"))]
        {
            Ok(Self {
                config_dir: dirs::config_dir()
                    .ok_or(AppPathsError::ConfigDirUnavailable)?
                    .join(APP_DIR),
                data_dir: dirs::data_dir()
                    .ok_or(AppPathsError::DataDirUnavailable)?
                    .join(APP_DIR),
            })
        }
    }

    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("launcher.log")
    }

    #[must_use]
    pub fn lock_file(&self) -> PathBuf {
        self.data_dir.join("launcher.lock")
    }
}

/// Local artifact repository: `<run_dir>/<app_id>/repo/<folder>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPaths {
    pub dir: PathBuf,
    pub client_version: PathBuf,
    pub server_version: PathBuf,
    pub artifact: PathBuf,
}

impl RepoPaths {
    #[must_use]
    pub fn new(run_dir: &Path, app_id: &str, profile: &PlatformProfile) -> Self {
        let dir = run_dir
            .join(app_id)
            .join("repo")
            .join(profile.platform.folder());
        Self {
            client_version: dir.join(&profile.client_version_file),
            server_version: dir.join(&profile.server_version_file),
            artifact: dir.join(&profile.artifact_file),
            dir,
        }
    }

    /// Create the repository directory if it does not exist yet.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        log::info!("Repository directory: {}", self.dir.display());
        Ok(())
    }
}
