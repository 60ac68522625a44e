//! Error types for the media cache
//!
//! Errors are split by concern: the remote store boundary, the cache engine,
//! and configuration. Population problems (a losing exclusive create, a failed
//! temp-file write) are deliberately absent here: they are absorbed inside the
//! cache and only logged and counted, never returned to a caller.

use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by the remote content store
///
/// Every failure of the remote collaborator is normalized into this type at the
/// client boundary, whether the store answered with a structured error body or
/// a plain message.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// No access token configured
    #[error("Missing access token. Set MEDIA_CACHE_ACCESS_TOKEN or add it to a .env file")]
    MissingCredentials,

    /// HTTP transport error
    #[error("HTTP request to remote store failed")]
    Http(#[from] reqwest::Error),

    /// Remote object does not exist
    #[error("Remote object not found: {path}")]
    NotFound { path: String },

    /// Remote store answered with an error status
    #[error("Remote store error (HTTP {status}): {message}")]
    Status { status: u16, message: String },

    /// Rate limit exceeded after retries
    #[error("Rate limit exceeded. Remote store responded with HTTP 429")]
    RateLimitExceeded,

    /// Remote store overloaded after retries
    #[error("Remote store overloaded. Responded with HTTP 503")]
    ServerOverloaded,

    /// Maximum retries exceeded on transport errors
    #[error("Maximum retry attempts ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

    /// Metadata response could not be understood
    #[error("Invalid remote metadata: {reason}")]
    InvalidMetadata { reason: String },

    /// The byte stream ended with an error part way through
    #[error("Remote stream interrupted: {reason}")]
    Interrupted { reason: String },

    /// Invalid endpoint URL
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Client settings cannot be used
    #[error("Invalid client configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Cache engine errors visible to callers
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache directory could not be created or accessed
    #[error("Cache directory not accessible: {path}")]
    DirectoryNotAccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Thumbnail size label is not registered
    #[error("Unknown thumbnail size: {label}")]
    UnknownSize { label: String },

    /// Media kind has no registered cache directory
    #[error("Unknown media kind: {kind}")]
    UnknownKind { kind: String },

    /// Registry definitions are inconsistent
    #[error("Invalid media registry: {reason}")]
    InvalidRegistry { reason: String },

    /// Reading a cached file failed
    #[error("Failed to read cached file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Upstream fetch failed
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// No usable default directory on this platform
    #[error("Could not determine the {what} directory for this platform")]
    NoPlatformDirectory { what: &'static str },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Remote store error
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Cache error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Remote(remote) | AppError::Cache(CacheError::Remote(remote)) => {
                remote.is_transient()
            }
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Remote(_) | AppError::Cache(CacheError::Remote(_)) => "upstream",
            AppError::Cache(CacheError::UnknownSize { .. })
            | AppError::Cache(CacheError::UnknownKind { .. }) => "invalid-argument",
            AppError::Cache(CacheError::DirectoryNotAccessible { .. })
            | AppError::Cache(CacheError::InvalidRegistry { .. }) => "initialization",
            AppError::Cache(_) => "cache",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

impl RemoteError {
    /// Whether retrying the same request later could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Http(e) => e.is_timeout() || e.is_connect(),
            RemoteError::RateLimitExceeded
            | RemoteError::ServerOverloaded
            | RemoteError::MaxRetriesExceeded { .. }
            | RemoteError::Interrupted { .. } => true,
            RemoteError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Remote store result type alias
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let unknown = AppError::from(CacheError::UnknownSize {
            label: "xl".to_string(),
        });
        assert_eq!(unknown.category(), "invalid-argument");
        assert!(!unknown.is_recoverable());

        let upstream = AppError::from(CacheError::from(RemoteError::RateLimitExceeded));
        assert_eq!(upstream.category(), "upstream");
        assert!(upstream.is_recoverable());

        let init = AppError::from(CacheError::DirectoryNotAccessible {
            path: PathBuf::from("/nope"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });
        assert_eq!(init.category(), "initialization");
    }

    #[test]
    fn test_remote_status_transience() {
        let server = RemoteError::Status {
            status: 502,
            message: "bad gateway".to_string(),
        };
        let client = RemoteError::Status {
            status: 409,
            message: "path/not_found/".to_string(),
        };
        assert!(server.is_transient());
        assert!(!client.is_transient());
        assert!(!RemoteError::MissingCredentials.is_transient());
    }

    #[test]
    fn test_cache_error_messages() {
        let err = CacheError::UnknownSize {
            label: "xl".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown thumbnail size: xl");

        let err = CacheError::from(RemoteError::NotFound {
            path: "/Pictures/x.jpg".to_string(),
        });
        assert_eq!(err.to_string(), "Remote object not found: /Pictures/x.jpg");
    }
}
