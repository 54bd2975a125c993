//! The update decision: detect platform, compare versions, fetch or fall
//! back, launch, and only then persist the new version.

use std::path::PathBuf;
use std::time::Duration;

use hatch_platform::{Platform, PlatformProfile, ReleaseEndpoints, RepoPaths, UnsupportedPlatform};
use log::{debug, error, info, warn};
use thiserror::Error;

use crate::bundle::{self, ExtractError, ResourceBundle};
use crate::download::{Downloader, FetchError};
use crate::fs_util;
use crate::probe::{ConnectivityProbe, DEFAULT_CONNECTIVITY_URL};
use crate::supervisor::{LaunchError, LaunchReport, Launcher};
use crate::validate::{is_usable_artifact, validate};
use crate::version_store::{self, VersionRecord};

pub const DEFAULT_APP_ID: &str = "basictrianglerenderer";

#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Host OS identifier fed to platform resolution.
    pub os_name: String,
    /// Names the repository directory and the bundled-asset prefix.
    pub app_id: String,
    /// Root under which `<app_id>/repo/<platform>/` lives.
    pub run_dir: PathBuf,
    pub endpoints: ReleaseEndpoints,
    pub connectivity_url: String,
    pub probe_timeout: Duration,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl FlowConfig {
    #[must_use]
    pub fn new(os_name: impl Into<String>, run_dir: impl Into<PathBuf>) -> Self {
        Self {
            os_name: os_name.into(),
            app_id: DEFAULT_APP_ID.to_string(),
            run_dir: run_dir.into(),
            endpoints: ReleaseEndpoints::default(),
            connectivity_url: DEFAULT_CONNECTIVITY_URL.to_string(),
            probe_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(15),
            read_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Init,
    PlatformDetected,
    LocalVersionLoaded,
    ConnectivityChecked,
    RemoteVersionFetched,
    Offline,
    VersionCompared,
    UpToDate,
    NeedsUpdate,
    ArtifactEnsured,
    Launched,
    VersionPersisted,
    Done,
    Aborted,
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    UnsupportedPlatform(#[from] UnsupportedPlatform),
    #[error("No valid game executable available ({resource}): {source}")]
    ResourceMissing {
        resource: String,
        #[source]
        source: ExtractError,
    },
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    ProcessLaunchFailed(#[from] LaunchError),
}

impl FlowError {
    fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowReport {
    pub platform: Platform,
    pub client_version: String,
    pub remote_version: String,
    pub online: bool,
    /// A new artifact was downloaded and installed this run.
    pub updated: bool,
    pub version_persisted: bool,
    pub launch: LaunchReport,
    pub trail: Vec<FlowState>,
}

#[derive(Debug)]
pub struct FlowFailure {
    pub error: FlowError,
    pub trail: Vec<FlowState>,
}

/// Terminal result handed back to whatever embeds the launcher. Deciding
/// whether to exit the host process is left to the caller.
#[derive(Debug)]
pub enum FlowOutcome {
    Success(FlowReport),
    Fatal(FlowFailure),
}

impl FlowOutcome {
    /// Process exit status for this outcome: 0 on success, 1 when fatal.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Success(_) => 0,
            Self::Fatal(_) => 1,
        }
    }

    #[must_use]
    pub fn trail(&self) -> &[FlowState] {
        match self {
            Self::Success(report) => &report.trail,
            Self::Fatal(failure) => &failure.trail,
        }
    }
}

#[derive(Default)]
struct Trail(Vec<FlowState>);

impl Trail {
    fn enter(&mut self, state: FlowState) {
        debug!("Flow state: {state:?}");
        self.0.push(state);
    }
}

pub struct UpdateOrchestrator<L> {
    config: FlowConfig,
    bundle: Box<dyn ResourceBundle>,
    launcher: L,
    probe: ConnectivityProbe,
    downloader: Downloader,
}

impl<L: Launcher> UpdateOrchestrator<L> {
    /// # Errors
    /// Returns [`FetchError::ClientBuild`] if either HTTP client cannot be
    /// built with the configured timeouts.
    pub fn new(
        config: FlowConfig,
        bundle: Box<dyn ResourceBundle>,
        launcher: L,
    ) -> Result<Self, FetchError> {
        let probe = ConnectivityProbe::new(config.connectivity_url.clone(), config.probe_timeout)?;
        let downloader = Downloader::new(config.connect_timeout, config.read_timeout)?;
        Ok(Self {
            config,
            bundle,
            launcher,
            probe,
            downloader,
        })
    }

    /// Run the whole flow once.
    pub async fn run(&self) -> FlowOutcome {
        let mut trail = Trail::default();
        match self.execute(&mut trail).await {
            Ok(mut report) => {
                trail.enter(FlowState::Done);
                report.trail = trail.0;
                FlowOutcome::Success(report)
            }
            Err(error) => {
                error!("Failed to run game: {error}");
                trail.enter(FlowState::Aborted);
                FlowOutcome::Fatal(FlowFailure {
                    error,
                    trail: trail.0,
                })
            }
        }
    }

    async fn execute(&self, trail: &mut Trail) -> Result<FlowReport, FlowError> {
        trail.enter(FlowState::Init);
        info!("Detected operating system: {}", self.config.os_name);
        let profile = PlatformProfile::resolve(&self.config.os_name, &self.config.endpoints)
            .inspect_err(|_| {
                error!(
                    "Only Windows, Linux, and macOS are supported (current OS: {})",
                    self.config.os_name
                );
            })?;
        info!(
            "{} operating system detected, using {} URLs",
            profile.platform,
            profile.platform.folder()
        );
        trail.enter(FlowState::PlatformDetected);

        let repo = RepoPaths::new(&self.config.run_dir, &self.config.app_id, &profile);
        repo.ensure_dir()
            .map_err(|error| FlowError::io("failed to create repository directory", error))?;

        let seed_resource = profile.bundled_client_version(&self.config.app_id);
        if let Err(error) =
            version_store::ensure_seeded(&repo.client_version, self.bundle.as_ref(), &seed_resource)
        {
            error!("Failed to create initial client version file: {error}");
        }
        let client = version_store::load(&repo.client_version);
        info!("Current client version: {client}");
        trail.enter(FlowState::LocalVersionLoaded);

        let online = self.probe.is_online().await;
        info!(
            "Internet connectivity: {}",
            if online { "ONLINE" } else { "OFFLINE" }
        );
        trail.enter(FlowState::ConnectivityChecked);

        let mut pending_version_update = false;
        let remote = if online {
            let (remote, fetched) = self.refresh_remote_version(&profile, &repo).await;
            info!("Server version: {remote}");
            if fetched {
                trail.enter(FlowState::RemoteVersionFetched);
            }

            trail.enter(FlowState::VersionCompared);
            if remote.version == client.version {
                trail.enter(FlowState::UpToDate);
                info!("Game is up to date ({} bytes)", artifact_len(&repo));
            } else {
                trail.enter(FlowState::NeedsUpdate);
                info!("Version mismatch detected - client: {client}, server: {remote}");
                pending_version_update = self.replace_artifact(&profile, &repo).await;
            }
            remote
        } else {
            trail.enter(FlowState::Offline);
            info!("Operating in offline mode - using existing game files");
            cached_remote_version(&repo)
        };

        self.ensure_artifact(&profile, &repo)?;
        trail.enter(FlowState::ArtifactEnsured);

        let launch = self.launcher.launch(&repo.artifact).await?;
        trail.enter(FlowState::Launched);

        let mut version_persisted = false;
        if online && pending_version_update && !remote.is_placeholder() {
            info!("Updating client version to server version after running game");
            match version_store::save(&repo.client_version, &remote) {
                Ok(()) => {
                    info!("Updated client version to: {remote}");
                    version_persisted = true;
                    trail.enter(FlowState::VersionPersisted);
                }
                Err(error) => error!("Failed to update client version: {error}"),
            }
        }

        Ok(FlowReport {
            platform: profile.platform,
            client_version: client.version,
            remote_version: remote.version,
            online,
            updated: pending_version_update,
            version_persisted,
            launch,
            trail: Vec::new(),
        })
    }

    /// Drop the cached server version and fetch a fresh one. Any failure falls
    /// back to what the cache file holds, which is normally nothing. The flag
    /// says whether the returned record came from the server.
    async fn refresh_remote_version(
        &self,
        profile: &PlatformProfile,
        repo: &RepoPaths,
    ) -> (VersionRecord, bool) {
        if repo.server_version.exists() {
            info!("Deleting existing {}", profile.server_version_file);
            if let Err(error) = std::fs::remove_file(&repo.server_version) {
                warn!("Failed to delete cached server version: {error}");
            }
        }

        info!("Downloading server version from {}", profile.version_url);
        let fetched = match self.downloader.fetch(&profile.version_url).await {
            Ok(result) => version_store::store_remote(&repo.server_version, &result.bytes)
                .map_err(|error| error.to_string()),
            Err(error) => Err(error.to_string()),
        };

        match fetched {
            Ok(record) => (record, true),
            Err(error) => {
                error!("Failed to download or parse server version: {error}");
                (version_store::load(&repo.server_version), false)
            }
        }
    }

    /// Swap in the latest artifact. Returns whether a validated payload was
    /// installed.
    ///
    /// The previous artifact is only replaced by the final rename, so a failed
    /// or rejected download leaves it in place.
    async fn replace_artifact(&self, profile: &PlatformProfile, repo: &RepoPaths) -> bool {
        info!("Downloading game executable from {}", profile.artifact_url);
        let result = match self.downloader.fetch(&profile.artifact_url).await {
            Ok(result) => result,
            Err(error) => {
                error!("Failed to download game executable: {error}");
                return false;
            }
        };
        info!(
            "Game executable content type: {}",
            result.content_type.as_deref().unwrap_or("unknown")
        );

        if let Err(rejection) = validate(&result.bytes) {
            error!("Failed to download game executable: {rejection}");
            return false;
        }

        if repo.artifact.exists() {
            info!("Replacing existing game executable");
        }
        if let Err(error) = fs_util::write_atomic(&repo.artifact, &result.bytes) {
            error!("Failed to write game executable: {error}");
            return false;
        }
        if profile.executable
            && let Err(error) = fs_util::mark_executable(&repo.artifact)
        {
            warn!("Failed to mark game executable as executable: {error}");
        }

        info!(
            "Game executable downloaded successfully: {} bytes",
            result.bytes.len()
        );
        true
    }

    fn ensure_artifact(
        &self,
        profile: &PlatformProfile,
        repo: &RepoPaths,
    ) -> Result<(), FlowError> {
        if is_usable_artifact(&repo.artifact) {
            return Ok(());
        }

        warn!("No valid game executable found, attempting to extract bundled version");
        let resource = profile.bundled_artifact(&self.config.app_id);
        let extracted = bundle::extract(self.bundle.as_ref(), &resource, &repo.dir)
            .map_err(|source| FlowError::ResourceMissing { resource, source })?;
        extracted
            .install(&repo.artifact)
            .map_err(|error| FlowError::io("failed to install bundled executable", error))?;
        info!("Using bundled game executable");
        Ok(())
    }
}

fn cached_remote_version(repo: &RepoPaths) -> VersionRecord {
    if !repo.server_version.exists() {
        return VersionRecord::default();
    }
    let record = version_store::load(&repo.server_version);
    info!("Using cached server version: {record}");
    record
}

fn artifact_len(repo: &RepoPaths) -> u64 {
    std::fs::metadata(&repo.artifact).map_or(0, |metadata| metadata.len())
}
