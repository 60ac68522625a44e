//! Prelude module for the Media Cache Library
//!
//! Re-exports the items most integrations need, so that
//! `use media_cache::prelude::*;` is enough to put a cache in front of a
//! remote store.
//!
//! # Usage
//!
//! ```rust,no_run
//! use media_cache::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let layout = CacheLayout::initialize("/var/cache/media", MediaRegistry::default()).await?;
//!     let client = DropboxClient::new(ClientConfig::default())?;
//!     let cache = CacheManager::new(Arc::new(layout), Arc::new(client));
//!
//!     let identity = ObjectIdentity::new("AB1-3", "015f1c3a");
//!     let thumb = cache.fetch_thumbnail(&identity, "md", "id:a4ayc_80_OEAAAAAAAAAXw").await?;
//!     println!("{} bytes", thumb.len());
//!     cache.drain().await;
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, CacheError, RemoteError, Result};

// Cache engine
pub use crate::app::cache::{
    CacheLayout, CacheManager, CacheSource, ObjectStream, PopulationSnapshot,
};

// Remote store
pub use crate::app::client::{
    ClientConfig, DropboxClient, RemoteByteStream, RemoteDownload, RemoteStore,
};

// Data types
pub use crate::app::{
    parse_file_name, MediaKind, MediaObject, MediaRegistry, ObjectIdentity, RemoteMetadata,
};

pub use crate::config::AppConfig;

// Commonly used constants
pub use crate::constants::{DEFAULT_RATE_LIMIT_RPS, ENV_ACCESS_TOKEN, USER_AGENT};

pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

pub use tokio;
