//! Remote HTTP source.
//!
//! One blocking GET per candidate URL, no retries. A 404 moves on to the next
//! candidate; when none exists the file is reported missing.

use super::catalog::{FilePeriod, Product};
use super::source::{DownloadError, Payload, PayloadSource};
use crate::config::HttpConfig;
use std::time::Duration;
use tracing::debug;

pub struct HttpSource {
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(config: &HttpConfig) -> Result<Self, DownloadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| DownloadError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> Result<Option<String>, DownloadError> {
        debug!(url, "GET");
        let resp = self.client.get(url).send().map_err(|e| DownloadError::NetworkUnreachable {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == reqwest::StatusCode::GATEWAY_TIMEOUT {
            return Err(DownloadError::GatewayTimeout { url: url.to_string() });
        }
        if !status.is_success() {
            return Err(DownloadError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = resp.text().map_err(|e| DownloadError::NetworkUnreachable {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        // GFZ and LISIRD answer 200 with an HTML timeout page
        if text.contains("Gateway Timeout") {
            return Err(DownloadError::GatewayTimeout { url: url.to_string() });
        }
        Ok(Some(text))
    }
}

impl PayloadSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    fn fetch(&self, product: &Product, period: &FilePeriod) -> Result<Option<Payload>, DownloadError> {
        for url in product.urls(period) {
            if let Some(text) = self.get(&url)? {
                return Ok(Some(Payload { text, origin: url }));
            }
            debug!(%url, "not found, trying next candidate");
        }
        Ok(None)
    }
}
