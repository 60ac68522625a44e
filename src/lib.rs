//! Media Cache Library
//!
//! A read-through disk cache for media files and thumbnails held in a remote
//! store. Misses are relayed to the caller while being written to the cache,
//! and concurrent writers of one entry are resolved by exclusive creation and
//! an atomic rename.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use constants::*;

    #[test]
    fn test_constants_accessible() {
        assert_eq!(ENV_ACCESS_TOKEN, "MEDIA_CACHE_ACCESS_TOKEN");
        assert_eq!(TEMP_FILE_SUFFIX, "_tmp");
        assert!(USER_AGENT.contains("media-cache"));
    }

    #[test]
    fn test_error_types() {
        let cache_error = errors::CacheError::UnknownSize {
            label: "xl".to_string(),
        };
        let app_error = AppError::Cache(cache_error);

        assert_eq!(app_error.category(), "invalid-argument");
        assert!(!app_error.is_recoverable());
    }
}
