use std::time::Duration;

use log::info;

use crate::download::FetchError;

pub const DEFAULT_CONNECTIVITY_URL: &str = "https://www.google.com";

const PROBE_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// HEAD request against a well-known host. Every failure mode reads as
/// offline.
pub struct ConnectivityProbe {
    client: reqwest::Client,
    url: String,
}

impl ConnectivityProbe {
    /// # Errors
    /// Returns [`FetchError::ClientBuild`] if the HTTP client cannot be
    /// initialised.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(PROBE_USER_AGENT)
            .build()
            .map_err(FetchError::ClientBuild)?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub async fn is_online(&self) -> bool {
        info!("Checking internet connectivity...");
        match self.client.head(&self.url).send().await {
            Ok(response) => {
                let status = response.status();
                let online = status.is_success();
                info!(
                    "Internet connectivity check result: {online} (HTTP response: {})",
                    status.as_u16()
                );
                online
            }
            Err(error) => {
                info!("Internet connectivity check failed: {error}");
                false
            }
        }
    }
}
