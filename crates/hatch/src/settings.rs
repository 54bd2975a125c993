use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use hatch_core::{DEFAULT_APP_ID, DEFAULT_CONNECTIVITY_URL, FlowConfig};
use hatch_platform::{DEFAULT_RELEASE_BASE_URL, ReleaseEndpoints};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherSettings {
    #[serde(default = "default_app_id")]
    pub app_id: String,

    #[serde(default = "default_release_base_url")]
    pub release_base_url: String,

    #[serde(default = "default_connectivity_url")]
    pub connectivity_url: String,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    #[serde(default)]
    pub run_dir: Option<PathBuf>,

    #[serde(default)]
    pub assets_dir: Option<PathBuf>,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,
}

fn default_app_id() -> String {
    DEFAULT_APP_ID.to_string()
}

fn default_release_base_url() -> String {
    DEFAULT_RELEASE_BASE_URL.to_string()
}

fn default_connectivity_url() -> String {
    DEFAULT_CONNECTIVITY_URL.to_string()
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_connect_timeout() -> u64 {
    15
}

fn default_read_timeout() -> u64 {
    60
}

fn default_settle_delay() -> u64 {
    2000
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            release_base_url: default_release_base_url(),
            connectivity_url: default_connectivity_url(),
            probe_timeout_secs: default_probe_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            settle_delay_ms: default_settle_delay(),
            run_dir: None,
            assets_dir: None,
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
        }
    }
}

impl LauncherSettings {
    /// Read settings from `path`. A missing file means defaults; a file that
    /// does not parse is reported and also yields defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|error| {
                eprintln!(
                    "Ignoring invalid settings file {}: {error}",
                    path.display()
                );
                Self::default()
            }),
            Err(error) => {
                eprintln!("Could not read settings file {}: {error}", path.display());
                Self::default()
            }
        }
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Assemble the flow configuration for a host OS identifier.
    #[must_use]
    pub fn flow_config(&self, os_name: &str, run_dir: PathBuf) -> FlowConfig {
        let mut config = FlowConfig::new(os_name, run_dir);
        config.app_id.clone_from(&self.app_id);
        config.endpoints = ReleaseEndpoints::new(self.release_base_url.clone());
        config.connectivity_url.clone_from(&self.connectivity_url);
        config.probe_timeout = Duration::from_secs(self.probe_timeout_secs);
        config.connect_timeout = Duration::from_secs(self.connect_timeout_secs);
        config.read_timeout = Duration::from_secs(self.read_timeout_secs);
        config
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::LauncherSettings;

    #[test]
    fn defaults_match_expected_timeouts() {
        let settings = LauncherSettings::default();

        assert_eq!(settings.app_id, "basictrianglerenderer");
        assert_eq!(settings.connectivity_url, "https://www.google.com");
        assert_eq!(settings.probe_timeout_secs, 5);
        assert_eq!(settings.connect_timeout_secs, 15);
        assert_eq!(settings.read_timeout_secs, 60);
        assert_eq!(settings.settle_delay(), Duration::from_secs(2));
        assert_eq!(settings.max_log_size_bytes, 5 * 1024 * 1024);
        assert!(settings.run_dir.is_none());
        assert!(!settings.debug_logging);
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let value = json!({
            "release_base_url": "https://mirror.example/Builds",
            "settle_delay_ms": 500
        });

        let settings: LauncherSettings =
            serde_json::from_value(value).expect("settings JSON should deserialize");

        assert_eq!(settings.release_base_url, "https://mirror.example/Builds");
        assert_eq!(settings.settle_delay_ms, 500);
        assert_eq!(settings.read_timeout_secs, 60);
        assert_eq!(settings.app_id, "basictrianglerenderer");
    }

    #[test]
    fn load_from_missing_or_invalid_file_yields_defaults() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let missing = temp.path().join("settings.json");
        assert_eq!(LauncherSettings::load_from(&missing).connect_timeout_secs, 15);

        std::fs::write(&missing, "{ not json").expect("settings should be written");
        assert_eq!(LauncherSettings::load_from(&missing).connect_timeout_secs, 15);
    }

    #[test]
    fn load_from_reads_overrides() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("settings.json");
        std::fs::write(&path, r#"{"app_id":"demo","debug_logging":true}"#)
            .expect("settings should be written");

        let settings = LauncherSettings::load_from(&path);

        assert_eq!(settings.app_id, "demo");
        assert!(settings.debug_logging);
    }

    #[test]
    fn flow_config_carries_settings() {
        let mut settings = LauncherSettings::default();
        settings.app_id = "demo".to_string();
        settings.release_base_url = "https://mirror.example/Builds/".to_string();
        settings.read_timeout_secs = 90;

        let config = settings.flow_config("Linux", "/srv/run".into());

        assert_eq!(config.os_name, "Linux");
        assert_eq!(config.app_id, "demo");
        assert_eq!(config.endpoints.base_url(), "https://mirror.example/Builds");
        assert_eq!(config.read_timeout, Duration::from_secs(90));
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
    }
}
