use governor::{Quota, RateLimiter};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{BotError, Result};

const MAX_RETRIES: u32 = 3;

// Type alias for the rate limiter to simplify signatures
type DirectRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// HTTP client with a per-request timeout, rate limiting and retry on
/// transient failures (429, 5xx, network errors)
///
/// Cloneable; all clones share the same rate limiter.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    rate_limiter: Arc<DirectRateLimiter>,
    service: &'static str,
    retry_base: Duration,
}

impl HttpClient {
    pub fn new(service: &'static str, timeout: Duration, requests_per_minute: u32) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        let rpm = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(rpm)));

        Ok(Self {
            client,
            rate_limiter,
            service,
            retry_base: Duration::from_secs(1),
        })
    }

    /// Base delay for retry backoff (doubles per attempt)
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Send a request once, after waiting for the rate limiter
    ///
    /// Used for non-idempotent calls such as order placement.
    pub async fn send_once(&self, request: RequestBuilder) -> Result<Response> {
        self.rate_limiter.until_ready().await;
        let response = request.send().await?;
        self.check_status(response).await
    }

    /// Send a request built by `build`, retrying transient failures
    ///
    /// `build` runs again for every attempt, so anything time-sensitive in
    /// the request (timestamps, signatures) is fresh on each retry.
    pub async fn send_with_retry<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> Result<RequestBuilder>,
    {
        for attempt in 1..=MAX_RETRIES {
            // Wait for rate limiter
            self.rate_limiter.until_ready().await;

            let backoff = self.retry_base * 2u32.pow(attempt - 1);

            match build()?.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    if (status.as_u16() == 429 || status.is_server_error()) && attempt < MAX_RETRIES
                    {
                        tracing::warn!(
                            "{} returned {}, retrying in {:?} (attempt {}/{})",
                            self.service,
                            status,
                            backoff,
                            attempt,
                            MAX_RETRIES
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }

                    // Other errors (4xx) - don't retry
                    return self.check_status(response).await;
                }
                Err(e) if attempt < MAX_RETRIES => {
                    tracing::warn!(
                        "Network error from {}: {}, retrying in {:?} (attempt {}/{})",
                        self.service,
                        e,
                        backoff,
                        attempt,
                        MAX_RETRIES
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(BotError::Http(e)),
            }
        }

        Err(BotError::Api {
            service: self.service,
            status: 0,
            message: format!("failed after {} retries", MAX_RETRIES),
        })
    }

    /// GET with retry and decode the JSON body
    pub async fn get_json<T, F>(&self, build: F, what: &'static str) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        self.try_get_json(|| Ok(build()), what).await
    }

    /// Like [`get_json`](Self::get_json) for requests whose construction can fail
    pub async fn try_get_json<T, F>(&self, build: F, what: &'static str) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> Result<RequestBuilder>,
    {
        let response = self.send_with_retry(build).await?;
        decode_json(response, what).await
    }

    async fn check_status(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(BotError::Api {
            service: self.service,
            status: status.as_u16(),
            message: extract_error_message(&body),
        })
    }
}

/// Decode a JSON response body into `T`
pub async fn decode_json<T: DeserializeOwned>(response: Response, what: &'static str) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| BotError::Parse {
        what,
        detail: e.to_string(),
    })
}

/// Pull a human-readable message out of an error body
///
/// Understands `{"code": .., "msg": ..}` and `{"error": ..}`; otherwise
/// returns the raw body.
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(msg) = value.get("msg").and_then(|m| m.as_str()) {
            return match value.get("code").and_then(|c| c.as_i64()) {
                Some(code) => format!("{} (code {})", msg, code),
                None => msg.to_string(),
            };
        }
        if let Some(err) = value.get("error") {
            return match err.as_str() {
                Some(s) => s.to_string(),
                None => err.to_string(),
            };
        }
    }
    body.to_string()
}
