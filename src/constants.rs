//! Application constants for the media cache
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names
pub mod env {
    /// Environment variable holding the remote store bearer token
    pub const ACCESS_TOKEN: &str = "MEDIA_CACHE_ACCESS_TOKEN";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("media-cache/", env!("CARGO_PKG_VERSION"));

    /// Default HTTP request timeout (applies to metadata and thumbnail calls)
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 16;

    /// Header carrying the JSON argument of content endpoints
    pub const API_ARG_HEADER: &str = "Dropbox-API-Arg";

    /// TCP keep-alive interval
    pub const TCP_KEEPALIVE: Duration = Duration::from_secs(30);
}

/// Remote store endpoints
pub mod remote {
    /// RPC endpoint base URL (metadata)
    pub const API_BASE_URL: &str = "https://api.dropboxapi.com";

    /// Content endpoint base URL (downloads and thumbnails)
    pub const CONTENT_BASE_URL: &str = "https://content.dropboxapi.com";

    /// Metadata RPC path
    pub const METADATA_PATH: &str = "/2/files/get_metadata";

    /// Streaming download path
    pub const DOWNLOAD_PATH: &str = "/2/files/download";

    /// Thumbnail path
    pub const THUMBNAIL_PATH: &str = "/2/files/get_thumbnail";

    /// Image format requested for thumbnails
    pub const THUMBNAIL_FORMAT: &str = "jpeg";
}

/// Rate limiting and retry configuration
pub mod limits {
    /// Default rate limit for remote requests (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 20;

    /// Maximum retry attempts for failed requests
    pub const MAX_RETRIES: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 500;
}

/// Cache file naming and layout
pub mod files {
    use super::Duration;

    /// Suffix marking an in-flight population attempt
    pub const TEMP_FILE_SUFFIX: &str = "_tmp";

    /// Separator between stable id and revision in cache file names
    pub const REVISION_SEPARATOR: &str = "_";

    /// Prefix of thumbnail cache directories (`pic-<label>`)
    pub const THUMBNAIL_DIR_PREFIX: &str = "pic-";

    /// Application directory name under the OS cache/config directories
    pub const APP_DIR_NAME: &str = "media-cache";

    /// Temp files older than this are considered abandoned by a crashed writer
    pub const STALE_TEMP_AGE: Duration = Duration::from_secs(60 * 60);
}

/// Streaming relay tuning
pub mod relay {
    /// Number of chunks buffered between the remote stream and the caller
    pub const CHANNEL_CAPACITY: usize = 16;

    /// Chunk size used when streaming cache hits from disk
    pub const READ_CHUNK_SIZE: usize = 64 * 1024;
}

// Re-export commonly used constants for convenience
pub use env::ACCESS_TOKEN as ENV_ACCESS_TOKEN;
pub use files::TEMP_FILE_SUFFIX;
pub use http::USER_AGENT;
pub use limits::{DEFAULT_RATE_LIMIT_RPS, MAX_RETRIES, RETRY_BASE_DELAY_MS};
