//! Core HTTP operations with rate limiting and retry logic
//!
//! Every request to the remote store goes through [`HttpHandler::send`], which
//! applies the rate limiter, retries 429/503 answers and transport errors with
//! exponential backoff, and turns any non-success response into a
//! [`RemoteError`]. Retries only ever happen before a response body is read.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::constants::{http, limits};
use crate::errors::{RemoteError, RemoteResult};

/// How a request carries its JSON argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgStyle {
    /// JSON request body (RPC endpoints)
    Body,
    /// Header-safe JSON in the API argument header, empty body (content endpoints)
    Header,
}

/// HTTP operations handler with resilience patterns
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    access_token: String,
    request_timeout: Duration,
    rate_limiter: RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client and rate limiting
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::InvalidConfig` if the rate limit is zero
    pub fn new(
        client: Client,
        access_token: String,
        request_timeout: Duration,
        rate_limit_rps: u32,
    ) -> RemoteResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            access_token,
            request_timeout,
            rate_limiter,
        })
    }

    /// Builds the rate limiter with the specified rate limit
    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> RemoteResult<RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>> {
        let quota = Quota::per_second(NonZeroU32::new(rate_limit_rps).ok_or_else(|| {
            RemoteError::InvalidConfig {
                reason: "Rate limit must be non-zero".to_string(),
            }
        })?);
        Ok(RateLimiter::direct(quota))
    }

    /// POST `arg` to `url` and return the successful response
    ///
    /// `bounded` applies the request timeout, which covers reading the body;
    /// streaming downloads pass `false`.
    ///
    /// # Errors
    ///
    /// Returns a normalized `RemoteError` for error statuses, or after the
    /// retry budget is exhausted.
    pub async fn send<A: Serialize>(
        &self,
        url: &Url,
        arg: &A,
        style: ArgStyle,
        bounded: bool,
    ) -> RemoteResult<Response> {
        let arg = serde_json::to_value(arg).map_err(|e| RemoteError::InvalidConfig {
            reason: format!("request argument is not valid JSON: {}", e),
        })?;

        let build = || {
            let mut request = self
                .client
                .post(url.as_str())
                .bearer_auth(&self.access_token);
            request = match style {
                ArgStyle::Body => request.json(&arg),
                ArgStyle::Header => request.header(http::API_ARG_HEADER, header_safe_json(&arg)),
            };
            if bounded {
                request = request.timeout(self.request_timeout);
            }
            request
        };

        let response = self.send_with_retry(url, build).await?;
        if response.status().is_success() {
            tracing::debug!("Successfully fetched response: {}", url);
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(normalize_error(status, &body, &arg))
    }

    async fn send_with_retry<F>(&self, url: &Url, build: F) -> RemoteResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        // Apply rate limiting with jitter to avoid thundering herd
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;

        // Retry logic with exponential backoff
        let mut retries = 0;
        loop {
            match build().send().await {
                Ok(response) => {
                    let status = response.status();
                    if status != StatusCode::TOO_MANY_REQUESTS
                        && status != StatusCode::SERVICE_UNAVAILABLE
                    {
                        return Ok(response);
                    }

                    if retries >= limits::MAX_RETRIES {
                        return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                            RemoteError::RateLimitExceeded
                        } else {
                            RemoteError::ServerOverloaded
                        });
                    }

                    retries += 1;
                    let delay = backoff_delay(retries);
                    tracing::warn!(
                        "Remote store answered {} for {}. Backing off for {}ms",
                        status.as_u16(),
                        url,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if retries < limits::MAX_RETRIES => {
                    retries += 1;
                    let delay = backoff_delay(retries);
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {}ms",
                        retries,
                        limits::MAX_RETRIES,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        "Request failed after {} retries: {}",
                        limits::MAX_RETRIES,
                        e
                    );
                    return Err(RemoteError::MaxRetriesExceeded {
                        max_retries: limits::MAX_RETRIES,
                    });
                }
            }
        }
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(limits::RETRY_BASE_DELAY_MS * 2_u64.pow(attempt))
}

/// Serialize JSON so it can travel in an HTTP header
///
/// Header values must be ASCII, so every code point from U+007F up is
/// written as a `\uXXXX` escape (astral characters as surrogate pairs).
pub fn header_safe_json(value: &Value) -> String {
    let json = value.to_string();
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if (c as u32) < 0x7f {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}

/// Reduce an error response to a single `RemoteError`
///
/// The store reports failures either as a JSON object (`error_summary`,
/// `error`) or as plain text; both end up as one message.
pub fn normalize_error(status: StatusCode, body: &str, arg: &Value) -> RemoteError {
    let message = error_message(body);

    if status == StatusCode::CONFLICT && message.contains("not_found") {
        let path = arg
            .get("path")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return RemoteError::NotFound { path };
    }

    RemoteError::Status {
        status: status.as_u16(),
        message,
    }
}

fn error_message(body: &str) -> String {
    let body = body.trim();

    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(summary) = json.get("error_summary").and_then(Value::as_str) {
            return summary.to_string();
        }
        match json.get("error") {
            Some(Value::String(message)) => return message.clone(),
            Some(error) => {
                if let Some(tag) = error.get(".tag").and_then(Value::as_str) {
                    return tag.to_string();
                }
            }
            None => {}
        }
    }

    if body.is_empty() {
        "remote store returned an error without details".to_string()
    } else {
        body.to_string()
    }
}
