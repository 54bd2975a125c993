//! Bundled resources shipped next to the launcher, and extraction of the
//! fallback artifact out of them.

use std::io::Read;
use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

use crate::fs_util;

/// Source of packaged resources addressed by `/`-separated ids such as
/// `assets/<app>/game.exe`.
pub trait ResourceBundle: Send + Sync {
    /// Open a resource for reading, or `None` when it is not packaged.
    fn open(&self, resource: &str) -> Option<Box<dyn Read + Send>>;
}

/// Resources laid out as plain files under a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryBundle {
    root: PathBuf,
}

impl DirectoryBundle {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, resource: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for segment in resource.split('/').filter(|segment| !segment.is_empty()) {
            if segment == ".." || segment == "." {
                return None;
            }
            path.push(segment);
        }
        Some(path)
    }
}

impl ResourceBundle for DirectoryBundle {
    fn open(&self, resource: &str) -> Option<Box<dyn Read + Send>> {
        let path = self.resolve(resource)?;
        match std::fs::File::open(&path) {
            Ok(file) => Some(Box::new(file)),
            Err(error) => {
                debug!("Bundled resource {} unavailable: {error}", path.display());
                None
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Resource not found: {resource}")]
    ResourceMissing { resource: String },
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl ExtractError {
    fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }
}

/// A bundled artifact copied into a temporary file. The file is removed when
/// this value is dropped without being installed.
#[derive(Debug)]
pub struct ExtractedArtifact {
    temp: tempfile::TempPath,
    len: u64,
}

impl ExtractedArtifact {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.temp
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Move the extracted file over `dest`.
    ///
    /// # Errors
    /// Returns an error if the rename fails; the temporary file is removed in
    /// that case.
    pub fn install(self, dest: &Path) -> std::io::Result<()> {
        self.temp.persist(dest).map_err(|error| error.error)?;
        info!("Installed bundled executable at {}", dest.display());
        Ok(())
    }
}

/// Copy a bundled resource into a temporary file inside `dest_dir` and mark it
/// executable.
///
/// # Errors
/// Returns [`ExtractError::ResourceMissing`] when the bundle does not contain
/// `resource`, or an I/O error if copying fails.
pub fn extract(
    bundle: &dyn ResourceBundle,
    resource: &str,
    dest_dir: &Path,
) -> Result<ExtractedArtifact, ExtractError> {
    info!("Extracting resource: {resource}");

    let mut reader = bundle
        .open(resource)
        .ok_or_else(|| ExtractError::ResourceMissing {
            resource: resource.to_string(),
        })?;

    let mut temp = tempfile::Builder::new()
        .prefix("game")
        .suffix(".tmp")
        .tempfile_in(dest_dir)
        .map_err(|error| ExtractError::io("failed to create temporary file", error))?;
    let len = std::io::copy(&mut reader, &mut temp)
        .map_err(|error| ExtractError::io("failed to copy bundled resource", error))?;
    temp.as_file()
        .sync_all()
        .map_err(|error| ExtractError::io("failed to flush extracted resource", error))?;

    let temp = temp.into_temp_path();
    fs_util::mark_executable(&temp)
        .map_err(|error| ExtractError::io("failed to mark extracted resource executable", error))?;

    info!(
        "Resource extracted successfully to: {} ({len} bytes)",
        temp.display()
    );
    Ok(ExtractedArtifact { temp, len })
}

/// Copy a bundled resource straight to `dest`, replacing it atomically.
///
/// # Errors
/// Returns [`ExtractError::ResourceMissing`] when the bundle does not contain
/// `resource`, or an I/O error if copying fails.
pub fn copy_to(
    bundle: &dyn ResourceBundle,
    resource: &str,
    dest: &Path,
) -> Result<u64, ExtractError> {
    let mut reader = bundle
        .open(resource)
        .ok_or_else(|| ExtractError::ResourceMissing {
            resource: resource.to_string(),
        })?;
    fs_util::copy_atomic(&mut reader, dest)
        .map_err(|error| ExtractError::io("failed to copy bundled resource", error))
}

#[cfg(test)]
mod tests {
    use std::io::Read as _;

    use super::{DirectoryBundle, ExtractError, ResourceBundle, copy_to, extract};

    fn bundle_with(resource: &str, contents: &[u8]) -> (tempfile::TempDir, DirectoryBundle) {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join(resource);
        std::fs::create_dir_all(path.parent().expect("resource should have a parent"))
            .expect("resource dir should be created");
        std::fs::write(&path, contents).expect("resource should be written");
        let bundle = DirectoryBundle::new(temp.path());
        (temp, bundle)
    }

    #[test]
    fn directory_bundle_opens_nested_resources() {
        let (_temp, bundle) = bundle_with("assets/demo/game", b"payload");

        let mut reader = bundle
            .open("assets/demo/game")
            .expect("resource should be found");
        let mut contents = Vec::new();
        reader
            .read_to_end(&mut contents)
            .expect("resource should be readable");

        assert_eq!(contents, b"payload");
        assert!(bundle.open("assets/demo/missing").is_none());
    }

    #[test]
    fn directory_bundle_refuses_parent_segments() {
        let (_temp, bundle) = bundle_with("assets/demo/game", b"payload");

        assert!(bundle.open("assets/../assets/demo/game").is_none());
    }

    #[test]
    fn extract_copies_into_destination_directory() {
        let (_temp, bundle) = bundle_with("assets/demo/game", &[7_u8; 1500]);
        let dest = tempfile::tempdir().expect("dest dir should be created");

        let extracted =
            extract(&bundle, "assets/demo/game", dest.path()).expect("extract should succeed");

        assert_eq!(extracted.len(), 1500);
        assert!(extracted.path().starts_with(dest.path()));

        let target = dest.path().join("game");
        extracted.install(&target).expect("install should succeed");
        assert_eq!(
            std::fs::read(&target).expect("installed file should be readable"),
            vec![7_u8; 1500]
        );
    }

    #[test]
    fn extract_without_install_leaves_no_file() {
        let (_temp, bundle) = bundle_with("assets/demo/game", b"payload");
        let dest = tempfile::tempdir().expect("dest dir should be created");

        let path = {
            let extracted =
                extract(&bundle, "assets/demo/game", dest.path()).expect("extract should succeed");
            extracted.path().to_path_buf()
        };

        assert!(!path.exists());
    }

    #[test]
    fn extract_reports_missing_resource() {
        let (_temp, bundle) = bundle_with("assets/demo/other", b"payload");
        let dest = tempfile::tempdir().expect("dest dir should be created");

        let result = extract(&bundle, "assets/demo/game", dest.path());

        assert!(matches!(
            result,
            Err(ExtractError::ResourceMissing { ref resource }) if resource == "assets/demo/game"
        ));
    }

    #[test]
    fn copy_to_writes_resource() {
        let (_temp, bundle) = bundle_with("assets/demo/version.json", br#"{"version":"1.0.0"}"#);
        let dest = tempfile::tempdir().expect("dest dir should be created");
        let target = dest.path().join("version.json");

        let copied =
            copy_to(&bundle, "assets/demo/version.json", &target).expect("copy should succeed");

        assert_eq!(copied, 19);
        assert!(target.is_file());
    }
}
