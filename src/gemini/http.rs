//! HTTP client implementation for the Gemini API
//!
//! This module provides the HTTP client for making requests to the Gemini
//! API. Every request is sent exactly once; non-success statuses map to
//! typed errors and nothing is retried here.

use std::time::Duration;

use reqwest::{Client as ReqwestClient, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};
use url::Url;

use crate::error::{Error, Result};

/// Default timeout for HTTP requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// API version path segment
const API_VERSION: &str = "v1beta";

/// HTTP client for making requests to the Gemini Developer API.
///
/// Handles authentication via the `key` query parameter, request
/// formatting, and response decoding.
#[derive(Clone)]
pub struct HttpClient {
    /// The underlying reqwest client
    client: ReqwestClient,

    /// Base URL for API requests
    base_url: String,

    /// API key for authentication
    api_key: String,
}

#[cfg(test)]
impl HttpClient {
    /// Set the base URL (for testing only)
    pub fn set_base_url(&mut self, url: String) {
        self.base_url = url;
    }
}

impl HttpClient {
    /// Create a new HTTP client with an API key for the Gemini Developer API
    pub fn with_api_key(api_key: String) -> Self {
        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key,
        }
    }

    fn build_url(&self, path: &str) -> Result<Url> {
        let url = format!("{}/{}/{}", self.base_url, API_VERSION, path);
        Url::parse(&url).map_err(|e| Error::InvalidRequest(format!("Invalid URL: {}", e)))
    }

    /// Send a POST request with a JSON body
    #[instrument(skip(self, body), level = "debug")]
    pub async fn post<T: DeserializeOwned, B: Serialize + std::fmt::Debug>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.build_url(path)?;
        let request = self
            .client
            .post(url)
            .json(body)
            .query(&[("key", &self.api_key)]);

        debug!("Sending POST request to {}", path);
        self.execute_request(request).await
    }

    /// Execute an HTTP request and handle the response
    async fn execute_request<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let response_text = response.text().await.map_err(map_transport_error)?;

        if status.is_success() {
            return Ok(serde_json::from_str(&response_text)?);
        }

        error!("API error: {} - {}", status, response_text);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(Error::Auth("Invalid API key or credentials".to_string()))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(Error::RateLimit(response_text)),
            StatusCode::BAD_REQUEST => Err(Error::InvalidRequest(response_text)),
            _ => Err(Error::Api {
                status_code: status.as_u16(),
                message: response_text,
            }),
        }
    }
}

// Timeouts and connection drops get dedicated variants so the failure text
// names the transport problem instead of an opaque reqwest chain.
fn map_transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else if e.is_connect() {
        Error::Network(e.to_string())
    } else {
        Error::Http(e)
    }
}
