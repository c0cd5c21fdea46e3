use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::debug;

use crate::error::FetchError;
use crate::settings::Settings;

/// Source of raw page markup.
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Fetcher backed by a shared `reqwest` client with a per-request timeout.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let http_err = |source: reqwest::Error| FetchError::Http {
            url: url.to_string(),
            source,
        };

        let start = Instant::now();
        let response = self.client.get(url).send().await.map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await.map_err(http_err)?;
        debug!(
            "Fetched {} ({} bytes in {} ms)",
            url,
            body.len(),
            start.elapsed().as_millis()
        );
        Ok(body)
    }
}
