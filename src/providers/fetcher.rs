//! Single shared HTTP client with bounded retries.
//!
//! Targets include sites that block obvious bots and hosts with broken TLS
//! chains, so the client presents as a desktop browser and skips certificate
//! validation. Everything fetched here is untrusted input.

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::config::FetchConfig;

const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,\
                              image/avif,image/webp,image/apng,*/*;q=0.8";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("giving up on {url} after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: String,
    },
    #[error("unexpected payload from {url}: {reason}")]
    Decode { url: String, reason: String },
}

#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
        if let Ok(value) = HeaderValue::from_str(&config.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, value);
        }
        if let Ok(value) = HeaderValue::from_str(&config.referer) {
            headers.insert(REFERER, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self {
            client,
            max_retries: config.max_retries.max(1),
            retry_delay: config.retry_delay(),
        })
    }

    /// GETs `url` and returns the body of the first `200` response.
    ///
    /// A `403` or any other status or transport error waits `retry_delay`
    /// and tries again, up to `max_retries` attempts in total.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut last = String::new();
        for attempt in 1..=self.max_retries {
            match self.client.get(url).send().await {
                Ok(response) if response.status() == StatusCode::OK => {
                    match response.bytes().await {
                        Ok(body) => {
                            debug!(url, attempt, bytes = body.len(), "Fetched");
                            return Ok(body.to_vec());
                        }
                        Err(e) => {
                            warn!(url, attempt, error = %e, "Failed reading body");
                            last = e.to_string();
                        }
                    }
                }
                Ok(response) if response.status() == StatusCode::FORBIDDEN => {
                    warn!(url, attempt, "403 Forbidden, backing off");
                    last = "403 Forbidden".to_string();
                }
                Ok(response) => {
                    warn!(url, attempt, status = %response.status(), "Unexpected status");
                    last = format!("status {}", response.status());
                }
                Err(e) => {
                    warn!(url, attempt, error = %e, "Request failed");
                    last = e.to_string();
                }
            }
            if attempt < self.max_retries {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        Err(FetchError::Exhausted {
            url: redact(url),
            attempts: self.max_retries,
            last,
        })
    }

    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let body = self.fetch(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let body = self.fetch(url).await?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
            url: redact(url),
            reason: e.to_string(),
        })
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

/// Drops the query string so API keys never reach error messages.
fn redact(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => format!("{base}?..."),
        None => url.to_string(),
    }
}
