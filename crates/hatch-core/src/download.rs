use std::time::Duration;

use log::{debug, info};
use thiserror::Error;

pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const ERROR_BODY_LIMIT: usize = 500;

/// One completed fetch. Only lives until the payload has been validated.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub status: u16,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{context}: {source}")]
    Request {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl FetchError {
    fn request(context: &'static str, source: reqwest::Error) -> Self {
        Self::Request { context, source }
    }
}

pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    /// # Errors
    /// Returns [`FetchError::ClientBuild`] if the HTTP client cannot be
    /// initialised (for example when no TLS backend is available).
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(FetchError::ClientBuild)?;
        Ok(Self { client })
    }

    /// GET `url` and collect the whole body.
    ///
    /// # Errors
    /// Returns [`FetchError::Request`] on transport failures and
    /// [`FetchError::Status`] for any non-success status, carrying up to 500
    /// bytes of the error body.
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        use futures_util::StreamExt;

        info!("Opening connection to: {url}");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "*/*")
            .send()
            .await
            .map_err(|error| FetchError::request("request failed", error))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        info!(
            "HTTP Response: {}, Content-Type: {}",
            status.as_u16(),
            content_type.as_deref().unwrap_or("unknown")
        );

        if !status.is_success() {
            let body = response
                .bytes()
                .await
                .map(|bytes| error_snippet(&bytes))
                .unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: if body.is_empty() {
                    "Unknown error".to_string()
                } else {
                    body
                },
            });
        }

        let total = response.content_length();
        let mut bytes = Vec::with_capacity(
            total
                .and_then(|total| usize::try_from(total).ok())
                .unwrap_or_default(),
        );
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|error| FetchError::request("download stream error", error))?;
            bytes.extend_from_slice(&chunk);
            debug!(
                "Downloaded {} of {} bytes",
                bytes.len(),
                total.map_or_else(|| "?".to_string(), |total| total.to_string())
            );
        }

        Ok(FetchResult {
            bytes,
            content_type,
            status: status.as_u16(),
        })
    }
}

/// Lossily decoded error body, cut to at most [`ERROR_BODY_LIMIT`] bytes on a
/// character boundary.
fn error_snippet(bytes: &[u8]) -> String {
    // Every input byte decodes to at least one output byte, so the prefix of
    // the decoded text never depends on more than one extra partial char.
    let window = bytes.len().min(ERROR_BODY_LIMIT + 3);
    let text = String::from_utf8_lossy(&bytes[..window]);
    let mut end = text.len().min(ERROR_BODY_LIMIT);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::error_snippet;

    #[test]
    fn error_snippet_truncates_to_limit() {
        let body = "x".repeat(800);

        assert_eq!(error_snippet(body.as_bytes()).len(), 500);
    }

    #[test]
    fn error_snippet_drops_split_character() {
        let mut body = "a".repeat(499);
        body.push('é');

        assert_eq!(error_snippet(body.as_bytes()), "a".repeat(499));
    }

    #[test]
    fn error_snippet_keeps_binary_body() {
        let snippet = error_snippet(&[0xff_u8; 800]);

        assert!(!snippet.is_empty());
        assert!(snippet.len() <= 500);
        assert!(snippet.chars().all(|c| c == '\u{FFFD}'));
    }

    #[test]
    fn error_snippet_replaces_invalid_bytes_in_place() {
        let snippet = error_snippet(b"bad \xff gateway");

        assert_eq!(snippet, "bad \u{FFFD} gateway");
    }

    #[test]
    fn error_snippet_with_scattered_invalid_bytes_stays_within_limit() {
        let body: Vec<u8> = (0..600)
            .map(|index| if index % 2 == 0 { b'x' } else { 0xfe })
            .collect();

        let snippet = error_snippet(&body);

        assert!(snippet.len() <= 500);
        assert!(snippet.len() >= 497);
        assert!(snippet.starts_with("x\u{FFFD}x"));
    }
}
