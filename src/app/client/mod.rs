//! Remote content store client
//!
//! The cache only depends on the [`RemoteStore`] trait: metadata lookup, a
//! streaming download and a whole-buffer thumbnail call. [`DropboxClient`] is
//! the HTTP implementation of that trait.
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: Core HTTP operations with rate limiting, retries and error normalization

use std::env;
use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{CONTENT_LENGTH, ETAG};
use serde_json::json;
use url::Url;

use crate::app::models::RemoteMetadata;
use crate::constants::{env as env_constants, remote};
use crate::errors::{RemoteError, RemoteResult};

pub mod config;
pub mod http;

pub use config::ClientConfig;

use http::{ArgStyle, HttpHandler};

/// Byte stream of a remote download
pub type RemoteByteStream = BoxStream<'static, RemoteResult<Bytes>>;

/// A download in progress
///
/// Dropping `stream` before it ends releases the underlying connection.
pub struct RemoteDownload {
    /// Body chunks as they arrive
    pub stream: RemoteByteStream,
    /// Value of the `Content-Length` response header
    pub content_length: Option<u64>,
    /// Value of the `ETag` response header
    pub etag: Option<String>,
}

impl fmt::Debug for RemoteDownload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteDownload")
            .field("content_length", &self.content_length)
            .field("etag", &self.etag)
            .finish_non_exhaustive()
    }
}

/// Operations the cache needs from the remote content store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Metadata of the entry at `path`
    async fn get_metadata(&self, path: &str) -> RemoteResult<RemoteMetadata>;

    /// Start streaming the content of `remote_id`
    ///
    /// Resolves once the response headers are in; the body arrives through
    /// the returned stream.
    async fn download(&self, remote_id: &str) -> RemoteResult<RemoteDownload>;

    /// Whole thumbnail of `remote_id` at the remote size selector `size_spec`
    async fn get_thumbnail(&self, remote_id: &str, size_spec: &str) -> RemoteResult<Bytes>;
}

/// HTTP client for the Dropbox content API
#[derive(Debug)]
pub struct DropboxClient {
    http_handler: HttpHandler,
    metadata_url: Url,
    download_url: Url,
    thumbnail_url: Url,
}

impl DropboxClient {
    /// Creates a client, taking the token from the config or the environment
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::MissingCredentials` when no token is available,
    /// `RemoteError::InvalidUrl` for unusable base URLs, and
    /// `RemoteError::InvalidConfig` for a zero rate limit.
    pub fn new(config: ClientConfig) -> RemoteResult<Self> {
        let access_token = resolve_token(
            config.access_token.as_deref(),
            env::var(env_constants::ACCESS_TOKEN).ok(),
        )?;

        let client = config.build_http_client()?;
        let http_handler = HttpHandler::new(
            client,
            access_token,
            config.request_timeout,
            config.rate_limit_rps,
        )?;

        let client = Self {
            http_handler,
            metadata_url: endpoint(&config.api_base_url, remote::METADATA_PATH)?,
            download_url: endpoint(&config.content_base_url, remote::DOWNLOAD_PATH)?,
            thumbnail_url: endpoint(&config.content_base_url, remote::THUMBNAIL_PATH)?,
        };

        tracing::info!("Created remote store client for {}", config.api_base_url);
        Ok(client)
    }
}

#[async_trait]
impl RemoteStore for DropboxClient {
    async fn get_metadata(&self, path: &str) -> RemoteResult<RemoteMetadata> {
        let response = self
            .http_handler
            .send(&self.metadata_url, &json!({ "path": path }), ArgStyle::Body, true)
            .await?;

        response
            .json::<RemoteMetadata>()
            .await
            .map_err(|e| RemoteError::InvalidMetadata {
                reason: e.to_string(),
            })
    }

    async fn download(&self, remote_id: &str) -> RemoteResult<RemoteDownload> {
        let response = self
            .http_handler
            .send(
                &self.download_url,
                &json!({ "path": remote_id }),
                ArgStyle::Header,
                false,
            )
            .await?;

        // Only these two headers are passed on to callers
        let headers = response.headers();
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        let etag = headers
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        tracing::debug!(
            "Streaming download of {} ({:?} bytes)",
            remote_id,
            content_length
        );

        let stream = response
            .bytes_stream()
            .map_err(|e| RemoteError::Interrupted {
                reason: e.to_string(),
            })
            .boxed();

        Ok(RemoteDownload {
            stream,
            content_length,
            etag,
        })
    }

    async fn get_thumbnail(&self, remote_id: &str, size_spec: &str) -> RemoteResult<Bytes> {
        let arg = json!({
            "path": remote_id,
            "size": size_spec,
            "format": remote::THUMBNAIL_FORMAT,
        });
        let response = self
            .http_handler
            .send(&self.thumbnail_url, &arg, ArgStyle::Header, true)
            .await?;

        response.bytes().await.map_err(|e| RemoteError::Interrupted {
            reason: e.to_string(),
        })
    }
}

/// Pick the configured token, falling back to the environment
fn resolve_token(configured: Option<&str>, from_env: Option<String>) -> RemoteResult<String> {
    configured
        .map(str::to_string)
        .or(from_env)
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or(RemoteError::MissingCredentials)
}

fn endpoint(base: &str, path: &str) -> RemoteResult<Url> {
    let invalid = |error: String| RemoteError::InvalidUrl {
        url: base.to_string(),
        error,
    };
    Url::parse(base)
        .and_then(|url| url.join(path))
        .map_err(|e| invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_resolution() {
        assert_eq!(
            resolve_token(Some("configured"), Some("env".to_string())).unwrap(),
            "configured"
        );
        assert_eq!(
            resolve_token(None, Some(" env \n".to_string())).unwrap(),
            "env"
        );
        assert!(matches!(
            resolve_token(None, None),
            Err(RemoteError::MissingCredentials)
        ));
        assert!(matches!(
            resolve_token(Some("  "), None),
            Err(RemoteError::MissingCredentials)
        ));
    }

    #[test]
    fn test_endpoint_urls() {
        let url = endpoint(remote::CONTENT_BASE_URL, remote::DOWNLOAD_PATH).unwrap();
        assert_eq!(url.as_str(), "https://content.dropboxapi.com/2/files/download");

        let url = endpoint("http://127.0.0.1:8080/", remote::METADATA_PATH).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/2/files/get_metadata");

        assert!(matches!(
            endpoint("not a url", remote::METADATA_PATH),
            Err(RemoteError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_client_creation_with_token() {
        let config = ClientConfig::default().with_access_token("token");
        let client = DropboxClient::new(config).unwrap();
        assert_eq!(
            client.thumbnail_url.as_str(),
            "https://content.dropboxapi.com/2/files/get_thumbnail"
        );
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let config = ClientConfig::default()
            .with_access_token("token")
            .with_rate_limit(0);
        assert!(matches!(
            DropboxClient::new(config),
            Err(RemoteError::InvalidConfig { .. })
        ));
    }
}
