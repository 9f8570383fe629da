//! Rate-limited request execution
//!
//! Implements the API's rate-limit contract:
//! - 200: honor `X-Rate-Limit-Remaining`/`X-Rate-Limit-Reset` before
//!   returning; with no quota left, wait reset + 1 second of buffer
//! - 429: server-side throttle, wait 60 seconds and repeat the identical
//!   request; retried indefinitely since throttling eventually clears
//! - anything else: fatal, carries status code and reason phrase

use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{ApiError, ApiResponse, ApiResult, SharedTransport};

/// Wait applied after a 429 response before repeating the request
const THROTTLE_WAIT: Duration = Duration::from_secs(60);

/// Buffer added to the reset-delay header when quota is exhausted
const RESET_BUFFER: Duration = Duration::from_secs(1);

/// Rate-limited ShipStation API client
pub struct ShipStationClient {
    transport: SharedTransport,
}

impl ShipStationClient {
    /// Create a client over the given transport
    pub fn new(transport: SharedTransport) -> Self {
        Self { transport }
    }

    /// Fetch a single endpoint, absorbing throttling until a terminal
    /// response arrives
    ///
    /// # Errors
    /// Returns [`ApiError::Http`] for any status other than 200 or 429, and
    /// [`ApiError::Parse`] when a 200 body is not valid JSON.
    pub async fn fetch_endpoint(&self, endpoint: &str, params: &[(String, String)]) -> ApiResult<Value> {
        loop {
            if let Some(body) = self.try_fetch(endpoint, params).await? {
                return Ok(body);
            }
            // Throttled; the wait already happened, repeat the same request.
        }
    }

    /// Issue one request and classify the response.
    ///
    /// `Ok(None)` means the request was throttled (429) and should be
    /// repeated with identical parameters.
    async fn try_fetch(&self, endpoint: &str, params: &[(String, String)]) -> ApiResult<Option<Value>> {
        let response = self.transport.get(endpoint, params).await?;

        match response.status {
            200 => {
                // The quota wait must happen before the caller acts on the
                // body: even a terminal page consumes quota.
                self.honor_rate_limit(&response).await;
                let body: Value = serde_json::from_str(&response.body)
                    .map_err(|e| ApiError::Parse(format!("{endpoint}: {e}")))?;
                Ok(Some(body))
            }
            429 => {
                warn!(
                    endpoint,
                    wait_seconds = THROTTLE_WAIT.as_secs(),
                    "request throttled (429), waiting before retry"
                );
                sleep(THROTTLE_WAIT).await;
                Ok(None)
            }
            status => Err(ApiError::Http {
                status,
                reason: response.reason,
            }),
        }
    }

    /// Respect the API's rate-limit headers on a successful response
    async fn honor_rate_limit(&self, response: &ApiResponse) {
        let Some(remaining) = response.rate_limit_remaining else {
            debug!("response carried no rate-limit headers");
            return;
        };
        if remaining >= 1 {
            return;
        }
        let wait = Duration::from_secs(response.rate_limit_reset.unwrap_or(0)) + RESET_BUFFER;
        info!(
            wait_seconds = wait.as_secs(),
            "request quota exhausted, waiting for rate-limit reset"
        );
        sleep(wait).await;
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{ok_response, throttled_response, ScriptedTransport};
    use super::*;
    use std::sync::Arc;
    use tokio::time::Instant;

    fn client_with(responses: Vec<ApiResponse>) -> (ShipStationClient, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new(responses));
        (ShipStationClient::new(transport.clone()), transport)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_endpoint_returns_parsed_body() {
        let (client, transport) = client_with(vec![ok_response(r#"{"total": 3}"#)]);
        let body = client.fetch_endpoint("stores", &[]).await.unwrap();
        assert_eq!(body["total"], 3);
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_429_waits_and_repeats_identical_request() {
        let (client, transport) = client_with(vec![
            throttled_response(),
            ok_response(r#"{"total": 1}"#),
        ]);
        let params = vec![("modifyDateStart".to_string(), "2023-01-01 00:00:00".to_string())];

        let before = Instant::now();
        let body = client.fetch_endpoint("orders", &params).await.unwrap();
        let elapsed = before.elapsed();

        assert_eq!(body["total"], 1);
        assert!(elapsed >= Duration::from_secs(60), "should wait 60s, waited {elapsed:?}");
        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], calls[1], "retry must reuse identical parameters");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_quota_waits_reset_plus_buffer() {
        let mut response = ok_response(r#"{"total": 0}"#);
        response.rate_limit_remaining = Some(0);
        response.rate_limit_reset = Some(5);
        let (client, _) = client_with(vec![response]);

        let before = Instant::now();
        client.fetch_endpoint("orders", &[]).await.unwrap();
        let elapsed = before.elapsed();

        assert!(
            elapsed >= Duration::from_secs(6),
            "should wait reset + 1s, waited {elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_healthy_quota_does_not_wait() {
        let (client, _) = client_with(vec![ok_response(r#"{"total": 0}"#)]);

        let before = Instant::now();
        client.fetch_endpoint("orders", &[]).await.unwrap();

        assert!(before.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_status_propagates_status_and_reason() {
        let response = ApiResponse {
            status: 500,
            reason: "Internal Server Error".to_string(),
            rate_limit_remaining: None,
            rate_limit_reset: None,
            body: String::new(),
        };
        let (client, _) = client_with(vec![response]);

        let err = client.fetch_endpoint("orders", &[]).await.unwrap_err();
        match err {
            ApiError::Http { status, reason } => {
                assert_eq!(status, 500);
                assert_eq!(reason, "Internal Server Error");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_json_body_is_parse_error() {
        let (client, _) = client_with(vec![ok_response("not json")]);
        let err = client.fetch_endpoint("orders", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }
}
