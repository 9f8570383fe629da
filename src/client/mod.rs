//! ShipStation API client
//!
//! The transport seam ([`Transport`]) isolates the wire protocol so the
//! rate-limit and pagination logic can be exercised against a scripted
//! server in tests. [`ReqwestTransport`] is the production implementation.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;
use std::sync::Arc;

use crate::config::Config;

pub mod http;
pub mod pagination;

pub use http::ShipStationClient;

/// Endpoint root for the ShipStation REST API
pub const BASE_URL: &str = "https://ssapi.shipstation.com";

/// ShipStation requests must be expressed in Pacific time
pub const API_TIMEZONE: Tz = chrono_tz::America::Los_Angeles;

/// Wire format for outgoing timestamps and persisted bookmarks
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default number of records per page
pub const PAGE_SIZE: u32 = 100;

/// Query parameters for a single API request
pub type Params = Vec<(String, String)>;

/// Convert a timestamp to the API's required timezone and string format
pub fn prepare_datetime<T: TimeZone>(dt: &DateTime<T>) -> String {
    dt.with_timezone(&API_TIMEZONE)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// API client errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Fatal HTTP status (anything other than 200 and 429)
    #[error("HTTP {status}: {reason}")]
    Http {
        /// Response status code
        status: u16,
        /// Response reason phrase
        reason: String,
    },

    /// Network-level failure (connect, timeout, TLS)
    #[error("network error: {0}")]
    Network(String),

    /// Response body is not valid JSON
    #[error("parse error: {0}")]
    Parse(String),

    /// Response body is missing an expected key; indicates an API or
    /// parameter construction defect
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// A raw response as seen by the classification layer
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Reason phrase for the status
    pub reason: String,
    /// `X-Rate-Limit-Remaining` header, if present and numeric
    pub rate_limit_remaining: Option<i64>,
    /// `X-Rate-Limit-Reset` header (seconds), if present and numeric
    pub rate_limit_reset: Option<u64>,
    /// Raw response body
    pub body: String,
}

/// Wire transport for the API
///
/// One call issues exactly one authenticated GET; classification and retry
/// live above this seam in [`ShipStationClient`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a single GET to `endpoint` with the given query parameters
    async fn get(&self, endpoint: &str, params: &[(String, String)]) -> ApiResult<ApiResponse>;
}

/// Production transport over [`reqwest`] with HTTP Basic authentication
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl ReqwestTransport {
    /// Build a transport from tap configuration
    pub fn new(config: &Config) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| BASE_URL.to_string());
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, endpoint: &str, params: &[(String, String)]) -> ApiResult<ApiResponse> {
        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        tracing::debug!(%url, params = params.len(), "making API request");

        let response = self
            .client
            .get(&url)
            .query(params)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let reason = status
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_string();
        let rate_limit_remaining = parse_header(response.headers(), "X-Rate-Limit-Remaining");
        let rate_limit_reset = parse_header(response.headers(), "X-Rate-Limit-Reset");
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(ApiResponse {
            status: status.as_u16(),
            reason,
            rate_limit_remaining,
            rate_limit_reset,
            body,
        })
    }
}

fn parse_header<T: std::str::FromStr>(headers: &reqwest::header::HeaderMap, name: &str) -> Option<T> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Shorthand for a shared transport handle
pub type SharedTransport = Arc<dyn Transport>;

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport for unit tests.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Transport that replays a fixed script of responses and records every
    /// request it receives.
    pub struct ScriptedTransport {
        responses: Mutex<VecDeque<ApiResponse>>,
        calls: Mutex<Vec<(String, Params)>>,
    }

    impl ScriptedTransport {
        pub fn new(responses: Vec<ApiResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<(String, Params)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, endpoint: &str, params: &[(String, String)]) -> ApiResult<ApiResponse> {
            self.calls
                .lock()
                .unwrap()
                .push((endpoint.to_string(), params.to_vec()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ApiError::Network("scripted transport exhausted".to_string()))
        }
    }

    /// A 200 response with ample rate-limit quota
    pub fn ok_response(body: &str) -> ApiResponse {
        ApiResponse {
            status: 200,
            reason: "OK".to_string(),
            rate_limit_remaining: Some(39),
            rate_limit_reset: Some(42),
            body: body.to_string(),
        }
    }

    /// A fatal response with an arbitrary status
    pub fn error_response(status: u16, reason: &str) -> ApiResponse {
        ApiResponse {
            status,
            reason: reason.to_string(),
            rate_limit_remaining: None,
            rate_limit_reset: None,
            body: String::new(),
        }
    }

    /// A 429 throttle response
    pub fn throttled_response() -> ApiResponse {
        ApiResponse {
            status: 429,
            reason: "Too Many Requests".to_string(),
            rate_limit_remaining: Some(0),
            rate_limit_reset: Some(37),
            body: String::new(),
        }
    }
}
