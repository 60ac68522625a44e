//! Core application logic for the media cache
//!
//! This module contains the read-through cache engine, the remote store client,
//! the media type registry and the naming convention that yields stable object
//! identifiers.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use media_cache::app::{CacheLayout, CacheManager, DropboxClient, ClientConfig, MediaRegistry};
//! use media_cache::app::{ObjectIdentity, MediaKind};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let layout = CacheLayout::initialize("/var/cache/media", MediaRegistry::default()).await?;
//! let client = DropboxClient::new(ClientConfig::default())?;
//! let cache = CacheManager::new(Arc::new(layout), Arc::new(client));
//!
//! let identity = ObjectIdentity::new("ABC12-5", "015f1c3a");
//! let thumb = cache.fetch_thumbnail(&identity, "sm", "id:a4ayc_80_OEAAAAAAAAAXw").await?;
//! let stream = cache
//!     .open_stream(&identity, MediaKind::Picture, "id:a4ayc_80_OEAAAAAAAAAXw")
//!     .await?;
//! println!("{} thumbnail bytes, full size {:?}", thumb.len(), stream.content_length());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod models;
pub mod naming;
pub mod registry;

// Re-export main public API
pub use cache::{
    CacheLayout, CacheManager, CacheSource, CacheUsage, ObjectStream, PopulationSnapshot,
};
pub use client::{ClientConfig, DropboxClient, RemoteDownload, RemoteStore};
pub use models::{MediaObject, ObjectIdentity, ObjectSummary, RemoteMetadata};
pub use naming::{parse_file_name, FileNameParts};
pub use registry::{MediaFormat, MediaKind, MediaRegistry, SizeInfo, TypeInfo};
