//! HTTP client configuration and building logic
//!
//! This module handles the configuration and construction of the HTTP client
//! used to talk to the remote content store.

use std::fmt;
use std::time::Duration;

use reqwest::Client;

use crate::constants::{http, limits, remote};
use crate::errors::{RemoteError, RemoteResult};

/// Configuration for the remote store client
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the RPC endpoints (metadata)
    pub api_base_url: String,
    /// Base URL of the content endpoints (downloads and thumbnails)
    pub content_base_url: String,
    /// Bearer token; falls back to the environment when `None`
    pub access_token: Option<String>,
    /// TCP keep-alive settings
    pub tcp_keepalive: Option<Duration>,
    /// TCP nodelay (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout
    pub pool_idle_timeout: Option<Duration>,
    /// Maximum number of idle connections per host
    pub pool_max_per_host: usize,
    /// Timeout for metadata and thumbnail requests
    ///
    /// Streaming downloads are only bounded by `connect_timeout`, since a
    /// large video can legitimately take longer than any fixed limit.
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: remote::API_BASE_URL.to_string(),
            content_base_url: remote::CONTENT_BASE_URL.to_string(),
            access_token: None,
            tcp_keepalive: Some(http::TCP_KEEPALIVE),
            tcp_nodelay: true,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field("content_base_url", &self.content_base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("tcp_keepalive", &self.tcp_keepalive)
            .field("tcp_nodelay", &self.tcp_nodelay)
            .field("pool_idle_timeout", &self.pool_idle_timeout)
            .field("pool_max_per_host", &self.pool_max_per_host)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("rate_limit_rps", &self.rate_limit_rps)
            .finish()
    }
}

impl ClientConfig {
    /// Set the access token
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Set the rate limit
    pub fn with_rate_limit(mut self, rps: u32) -> Self {
        self.rate_limit_rps = rps;
        self
    }

    /// Builds the HTTP client with the specified configuration
    pub fn build_http_client(&self) -> RemoteResult<Client> {
        let mut client_builder = Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(http::USER_AGENT)
            .tcp_nodelay(self.tcp_nodelay)
            .pool_max_idle_per_host(self.pool_max_per_host);

        // Configure TCP keep-alive if specified
        if let Some(keepalive) = self.tcp_keepalive {
            client_builder = client_builder.tcp_keepalive(keepalive);
        }

        // Configure connection pool idle timeout
        if let Some(idle_timeout) = self.pool_idle_timeout {
            client_builder = client_builder.pool_idle_timeout(idle_timeout);
        }

        client_builder.build().map_err(RemoteError::Http)
    }
}
