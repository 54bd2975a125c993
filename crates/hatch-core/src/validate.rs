use std::path::Path;

use thiserror::Error;

/// Anything shorter than this cannot be a real build of the artifact.
pub const MIN_ARTIFACT_BYTES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Server returned HTML page instead of executable file ({size} bytes)")]
    ErrorPage { size: usize },
    #[error("Downloaded file is too small ({size} bytes)")]
    TooSmall { size: usize },
}

/// Decide whether downloaded bytes can be trusted as the artifact.
///
/// Only the size threshold is enforced. Payloads below it are sniffed for
/// markup so the rejection says whether the server handed back an error page
/// or a truncated binary. Payloads at or above the threshold are accepted
/// as-is, so a large HTML page passes.
///
/// # Errors
/// Returns the [`Rejection`] reason for payloads under
/// [`MIN_ARTIFACT_BYTES`].
pub fn validate(bytes: &[u8]) -> Result<(), Rejection> {
    let size = bytes.len();
    if size >= MIN_ARTIFACT_BYTES {
        return Ok(());
    }
    if looks_like_error_page(bytes) {
        Err(Rejection::ErrorPage { size })
    } else {
        Err(Rejection::TooSmall { size })
    }
}

fn looks_like_error_page(bytes: &[u8]) -> bool {
    let text = String::from_utf8_lossy(bytes);
    text.starts_with("<!DOCTYPE") || text.starts_with("<html") || text.contains("404 Not Found")
}

/// An artifact on disk is usable when it is a file of at least
/// [`MIN_ARTIFACT_BYTES`].
#[must_use]
pub fn is_usable_artifact(path: &Path) -> bool {
    std::fs::metadata(path)
        .is_ok_and(|metadata| metadata.is_file() && metadata.len() >= MIN_ARTIFACT_BYTES as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_is_exactly_one_thousand_bytes() {
        let payload = vec![0x7f_u8; 1000];

        assert_eq!(
            validate(&payload[..999]),
            Err(Rejection::TooSmall { size: 999 })
        );
        assert_eq!(validate(&payload), Ok(()));
    }

    #[test]
    fn small_markup_is_reported_as_error_page() {
        assert_eq!(
            validate(b"<!DOCTYPE html><title>Oops</title>"),
            Err(Rejection::ErrorPage { size: 34 })
        );
        assert_eq!(
            validate(b"<html><body>gone</body></html>"),
            Err(Rejection::ErrorPage { size: 30 })
        );
        assert_eq!(
            validate(b"HTTP/1.1 404 Not Found"),
            Err(Rejection::ErrorPage { size: 22 })
        );
    }

    #[test]
    fn small_binary_is_reported_as_truncated() {
        let rejection = validate(&[0_u8; 12]).expect_err("tiny payload should be rejected");

        assert_eq!(rejection, Rejection::TooSmall { size: 12 });
        assert_eq!(
            rejection.to_string(),
            "Downloaded file is too small (12 bytes)"
        );
    }

    #[test]
    fn large_markup_is_accepted_without_sniffing() {
        let mut page = b"<!DOCTYPE html><html><body>404 Not Found".to_vec();
        page.resize(4096, b' ');

        assert_eq!(validate(&page), Ok(()));
    }

    #[test]
    fn usable_artifact_requires_threshold_size() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let small = temp.path().join("small");
        let large = temp.path().join("large");
        std::fs::write(&small, vec![1_u8; 999]).expect("small file should be written");
        std::fs::write(&large, vec![1_u8; 1000]).expect("large file should be written");

        assert!(!is_usable_artifact(&small));
        assert!(is_usable_artifact(&large));
        assert!(!is_usable_artifact(&temp.path().join("missing")));
        assert!(!is_usable_artifact(temp.path()));
    }
}
