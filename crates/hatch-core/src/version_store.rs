//! Small JSON version markers kept beside the artifact.
//!
//! Reads are best effort: anything that cannot be read or parsed is treated as
//! [`VersionRecord::DEFAULT_VERSION`]. Writes replace the file atomically.

use std::path::Path;

use log::{debug, info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::bundle::{self, ResourceBundle};
use crate::fs_util;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub version: String,
}

impl VersionRecord {
    pub const DEFAULT_VERSION: &'static str = "0.0.0";

    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    /// True for the "never fetched / unknown" marker.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.version == Self::DEFAULT_VERSION
    }
}

impl Default for VersionRecord {
    fn default() -> Self {
        Self::new(Self::DEFAULT_VERSION)
    }
}

impl std::fmt::Display for VersionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.version)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(version) => Ok(version),
        serde_json::Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a version string, found {other}"
        ))),
    }
}

#[derive(Debug, Error)]
pub enum VersionStoreError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Empty response from server")]
    EmptyDocument,
}

impl VersionStoreError {
    fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }
}

/// How [`ensure_seeded`] left the record file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seeded {
    AlreadyPresent,
    FromBundle,
    WithDefault,
}

/// Parse a version document.
///
/// # Errors
/// Returns an error when the bytes are not a JSON object with a `version`
/// field.
pub fn parse(bytes: &[u8]) -> Result<VersionRecord, VersionStoreError> {
    serde_json::from_slice(bytes)
        .map_err(|error| VersionStoreError::json("invalid version document", error))
}

/// Read a record, reporting why it could not be read.
///
/// # Errors
/// Returns an error when the file is missing, unreadable, or malformed.
pub fn try_load(path: &Path) -> Result<VersionRecord, VersionStoreError> {
    let bytes = std::fs::read(path)
        .map_err(|error| VersionStoreError::io("failed to read version file", error))?;
    parse(&bytes)
}

/// Read a record, falling back to the default record on any failure.
#[must_use]
pub fn load(path: &Path) -> VersionRecord {
    match try_load(path) {
        Ok(record) => record,
        Err(VersionStoreError::Io { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            debug!("No version file at {}", path.display());
            VersionRecord::default()
        }
        Err(error) => {
            warn!("Failed to read version from {}: {error}", path.display());
            VersionRecord::default()
        }
    }
}

/// Overwrite `path` with `record`.
///
/// # Errors
/// Returns an error if the record cannot be serialized or written.
pub fn save(path: &Path, record: &VersionRecord) -> Result<(), VersionStoreError> {
    let content = serde_json::to_vec(record)
        .map_err(|error| VersionStoreError::json("failed to serialize version record", error))?;
    fs_util::write_atomic(path, &content)
        .map_err(|error| VersionStoreError::io("failed to write version file", error))
}

/// Make sure a record file exists, seeding it from the bundle or, failing
/// that, with the default record.
///
/// # Errors
/// Returns an error only if the default record cannot be written either.
pub fn ensure_seeded(
    path: &Path,
    bundle: &dyn ResourceBundle,
    resource: &str,
) -> Result<Seeded, VersionStoreError> {
    if path.exists() {
        return Ok(Seeded::AlreadyPresent);
    }

    info!("Creating initial client version file from resources");
    match bundle::copy_to(bundle, resource, path) {
        Ok(_) => {
            info!("Copied client version file from resources");
            Ok(Seeded::FromBundle)
        }
        Err(error) => {
            debug!("Bundled client version unavailable: {error}");
            save(path, &VersionRecord::default())?;
            info!("Created default client version file");
            Ok(Seeded::WithDefault)
        }
    }
}

/// Cache a freshly fetched version document at `path` and parse it.
///
/// # Errors
/// Returns an error for an empty body, a failed write, or a malformed
/// document.
pub fn store_remote(path: &Path, bytes: &[u8]) -> Result<VersionRecord, VersionStoreError> {
    if bytes.is_empty() {
        return Err(VersionStoreError::EmptyDocument);
    }
    fs_util::write_atomic(path, bytes)
        .map_err(|error| VersionStoreError::io("failed to cache server version", error))?;
    info!(
        "Server version file downloaded successfully ({} bytes)",
        bytes.len()
    );
    parse(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::DirectoryBundle;

    #[test]
    fn load_missing_file_yields_default() {
        let temp = tempfile::tempdir().expect("tempdir should be created");

        let record = load(&temp.path().join("clientVersionLinux.json"));

        assert_eq!(record, VersionRecord::default());
        assert!(record.is_placeholder());
    }

    #[test]
    fn load_corrupt_file_yields_default() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("clientVersionLinux.json");
        std::fs::write(&path, "{\"version\":").expect("file should be written");

        assert_eq!(load(&path), VersionRecord::default());
    }

    #[test]
    fn load_accepts_numeric_versions() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("clientVersionLinux.json");
        std::fs::write(&path, r#"{"version": 3}"#).expect("file should be written");

        assert_eq!(load(&path).version, "3");
    }

    #[test]
    fn save_then_load_preserves_version() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("clientVersionLinux.json");

        save(&path, &VersionRecord::new("1.4.2")).expect("save should succeed");

        assert_eq!(
            std::fs::read_to_string(&path).expect("file should be readable"),
            r#"{"version":"1.4.2"}"#
        );
        assert_eq!(load(&path).version, "1.4.2");
    }

    #[test]
    fn ensure_seeded_prefers_bundled_record() {
        let assets = tempfile::tempdir().expect("assets dir should be created");
        let resource = "assets/demo/repo/Linux/clientVersionLinux.json";
        let bundled = assets.path().join(resource);
        std::fs::create_dir_all(bundled.parent().expect("parent should exist"))
            .expect("bundle dir should be created");
        std::fs::write(&bundled, r#"{"version":"0.9.0"}"#)
            .expect("bundled file should be written");
        let repo = tempfile::tempdir().expect("repo dir should be created");
        let path = repo.path().join("clientVersionLinux.json");

        let seeded = ensure_seeded(&path, &DirectoryBundle::new(assets.path()), resource)
            .expect("seeding should succeed");

        assert_eq!(seeded, Seeded::FromBundle);
        assert_eq!(load(&path).version, "0.9.0");
    }

    #[test]
    fn ensure_seeded_falls_back_to_default_record() {
        let assets = tempfile::tempdir().expect("assets dir should be created");
        let repo = tempfile::tempdir().expect("repo dir should be created");
        let path = repo.path().join("clientVersionLinux.json");

        let bundle = DirectoryBundle::new(assets.path());

        let seeded =
            ensure_seeded(&path, &bundle, "assets/missing.json").expect("seeding should succeed");

        assert_eq!(seeded, Seeded::WithDefault);
        assert_eq!(load(&path), VersionRecord::default());
    }

    #[test]
    fn ensure_seeded_leaves_existing_file_alone() {
        let assets = tempfile::tempdir().expect("assets dir should be created");
        let repo = tempfile::tempdir().expect("repo dir should be created");
        let path = repo.path().join("clientVersionLinux.json");
        std::fs::write(&path, "not json").expect("file should be written");

        let bundle = DirectoryBundle::new(assets.path());

        let seeded =
            ensure_seeded(&path, &bundle, "assets/missing.json").expect("seeding should succeed");

        assert_eq!(seeded, Seeded::AlreadyPresent);
        assert_eq!(
            std::fs::read_to_string(&path).expect("file should be readable"),
            "not json"
        );
    }

    #[test]
    fn store_remote_caches_and_parses_document() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("serverVersionLinux.json");

        let record = store_remote(&path, br#"{"version":"2.0.0"}"#).expect("store should succeed");

        assert_eq!(record.version, "2.0.0");
        assert_eq!(load(&path).version, "2.0.0");
    }

    #[test]
    fn store_remote_rejects_empty_body() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("serverVersionLinux.json");

        let result = store_remote(&path, b"");

        assert!(matches!(result, Err(VersionStoreError::EmptyDocument)));
        assert!(!path.exists());
    }
}
