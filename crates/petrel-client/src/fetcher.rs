use std::time::Duration;

use petrel_core::error::HarvestError;
use petrel_core::traits::Fetcher;
use reqwest::Client;

/// HTTP fetcher using reqwest.
///
/// Issues one GET per call and classifies the outcome into the
/// [`HarvestError`] taxonomy. It does no retrying of its own; wrap it in
/// [`RetryingFetcher`](petrel_core::retry::RetryingFetcher) for the
/// rate-limit and transport backoff discipline.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, HarvestError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, HarvestError> {
        let timeout_secs = timeout.as_secs();
        let client = Client::builder()
            .user_agent("petrel/0.2 (petition harvester)")
            .timeout(timeout)
            .build()
            .map_err(|e| HarvestError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        // Input lines may carry a trailing newline.
        let url = url.trim();

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                HarvestError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                HarvestError::Transport(format!("connection failed: {e}"))
            } else {
                HarvestError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(HarvestError::RateLimited);
        }
        if status != reqwest::StatusCode::OK {
            return Err(HarvestError::HttpStatus(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| HarvestError::Transport(format!("failed to read response body: {e}")))
    }
}
