//! HTTP page fetcher
//!
//! This module performs exactly one request per page: render the endpoint
//! template for the page index, send it, and hand back the raw payload.
//! There are no retries and no redirect bookkeeping; a page that cannot be
//! fetched simply reports a typed failure and the session moves on.

use crate::config::{HttpMethod, SourceConfig};
use crate::engine::types::PageRequest;
use crate::ConfigError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Browser-like default, overridable via a `user-agent` entry in
/// `[source.headers]`
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:115.0) Gecko/20100101 Firefox/115.0";

/// Fetch-specific errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// Timeout, refused connection, TLS failure, or body read error
    #[error("network error: {message}")]
    Network { message: String },

    /// Endpoint answered with a non-success status
    #[error("HTTP {status}")]
    Protocol { status: u16 },
}

impl FetchError {
    fn from_transport(error: reqwest::Error) -> Self {
        let message = if error.is_timeout() {
            "request timeout".to_string()
        } else if error.is_connect() {
            "connection refused".to_string()
        } else {
            error.to_string()
        };

        Self::Network { message }
    }
}

/// Fetches listing pages for one configured source
pub struct PageFetcher {
    client: Client,
    source: SourceConfig,
}

impl PageFetcher {
    /// Builds a fetcher with a client configured for the source
    pub fn new(source: &SourceConfig) -> crate::Result<Self> {
        Ok(Self {
            client: build_http_client(source)?,
            source: source.clone(),
        })
    }

    /// Fetches one page and returns the raw payload
    ///
    /// # Arguments
    ///
    /// * `request` - The page to fetch
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The response body
    /// * `Err(FetchError)` - Network failure or non-success status
    pub async fn fetch(&self, request: &PageRequest) -> Result<String, FetchError> {
        let url = self.source.page_url(request.index, request.offset);
        tracing::debug!("fetching page {}: {}", request.index, url);

        let builder = match self.source.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => {
                let mut builder = self
                    .client
                    .post(&url)
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
                if let Some(body) = self.source.page_body(request.index, request.offset) {
                    builder = builder.body(body);
                }
                builder
            }
        };

        let response = builder.send().await.map_err(FetchError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Protocol {
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(FetchError::from_transport)
    }
}

/// Builds an HTTP client with timeouts, compression, and the source's
/// default headers
///
/// # Arguments
///
/// * `source` - The source configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(VitrinError)` - Invalid header or client build failure
pub fn build_http_client(source: &SourceConfig) -> crate::Result<Client> {
    let mut headers = HeaderMap::new();
    for (name, value) in &source.headers {
        let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ConfigError::Validation(format!("invalid header name '{}': {}", name, e))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            ConfigError::Validation(format!("invalid value for header '{}': {}", name, e))
        })?;
        headers.insert(header, value);
    }

    let client = Client::builder()
        .user_agent(DEFAULT_USER_AGENT)
        .default_headers(headers)
        .timeout(Duration::from_secs(source.request_timeout))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}
