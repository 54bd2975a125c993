use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_RELEASE_BASE_URL: &str =
    "https://hexodushog.github.io/BasicTriangleRenderer.github.io/files/Builds";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported platform '{os_name}': only Windows, Linux, and macOS are supported")]
pub struct UnsupportedPlatform {
    pub os_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
}

impl Platform {
    /// Match a host-reported OS identifier against the supported platforms.
    ///
    /// Matching is a case-insensitive substring test, checked in the order
    /// `win`, `nix`/`nux`, `mac`.
    ///
    /// # Errors
    /// Returns [`UnsupportedPlatform`] when none of the markers are present.
    pub fn resolve(os_name: &str) -> Result<Self, UnsupportedPlatform> {
        let lowered = os_name.to_lowercase();
        if lowered.contains("win") {
            Ok(Self::Windows)
        } else if lowered.contains("nix") || lowered.contains("nux") {
            Ok(Self::Linux)
        } else if lowered.contains("mac") {
            Ok(Self::MacOs)
        } else {
            Err(UnsupportedPlatform {
                os_name: os_name.to_string(),
            })
        }
    }

    /// Folder name used both remotely and as the local file-name suffix.
    #[must_use]
    pub fn folder(self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::Linux => "Linux",
            Self::MacOs => "MacOS",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::Linux => "Linux",
            Self::MacOs => "macOS",
        }
    }

    #[must_use]
    pub fn exe_extension(self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            Self::Linux | Self::MacOs => "",
        }
    }

    /// Whether the artifact needs an executable permission bit on disk.
    #[must_use]
    pub fn needs_exec_bit(self) -> bool {
        !matches!(self, Self::Windows)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Operating system identifier of the running host.
#[must_use]
pub fn host_os_name() -> &'static str {
    std::env::consts::OS
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseEndpoints {
    base_url: String,
}

impl Default for ReleaseEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_RELEASE_BASE_URL)
    }
}

impl ReleaseEndpoints {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn version_url(&self, platform: Platform) -> String {
        let folder = platform.folder();
        format!("{}/{folder}/serverVersion{folder}.json", self.base_url)
    }

    #[must_use]
    pub fn artifact_url(&self, platform: Platform) -> String {
        format!(
            "{}/{}/game{}",
            self.base_url,
            platform.folder(),
            platform.exe_extension()
        )
    }
}

/// Everything the launcher needs to know about the detected platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    pub platform: Platform,
    pub version_url: String,
    pub artifact_url: String,
    pub client_version_file: String,
    pub server_version_file: String,
    pub artifact_file: String,
    pub executable: bool,
}

impl PlatformProfile {
    /// Resolve the profile for a host OS identifier.
    ///
    /// # Errors
    /// Returns [`UnsupportedPlatform`] for anything other than Windows, Linux,
    /// or macOS.
    pub fn resolve(os_name: &str, endpoints: &ReleaseEndpoints) -> Result<Self, UnsupportedPlatform> {
        let platform = Platform::resolve(os_name)?;
        Ok(Self::for_platform(platform, endpoints))
    }

    #[must_use]
    pub fn for_platform(platform: Platform, endpoints: &ReleaseEndpoints) -> Self {
        let folder = platform.folder();
        Self {
            platform,
            version_url: endpoints.version_url(platform),
            artifact_url: endpoints.artifact_url(platform),
            client_version_file: format!("clientVersion{folder}.json"),
            server_version_file: format!("serverVersion{folder}.json"),
            artifact_file: format!("game{}", platform.exe_extension()),
            executable: platform.needs_exec_bit(),
        }
    }

    /// Bundled resource id of the fallback artifact.
    #[must_use]
    pub fn bundled_artifact(&self, app_id: &str) -> String {
        format!("assets/{app_id}/{}", self.artifact_file)
    }

    /// Bundled resource id of the initial client version record.
    #[must_use]
    pub fn bundled_client_version(&self, app_id: &str) -> String {
        format!(
            "assets/{app_id}/repo/{}/{}",
            self.platform.folder(),
            self.client_version_file
        )
    }
}
