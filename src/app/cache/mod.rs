//! Read-through disk cache for media objects and thumbnails
//!
//! Full-resolution objects are streamed: a miss relays the remote download to
//! the caller while teeing it into the cache. Thumbnails are buffered: a miss
//! returns the remote buffer and writes it in the background.
//!
//! # Key Features
//!
//! - **No locks**: exclusive file creation of `<entry>_tmp` decides which of
//!   several concurrent populators writes an entry, across processes too
//! - **Atomic commit**: a canonical entry only ever appears through rename
//! - **Never blocked on the cache**: callers get their bytes from the remote
//!   stream, whatever happens to the cache write
//! - **Freshness signal**: hits bump the file times for an external janitor
//!
//! # Module Organization
//!
//! - [`layout`] - Directory resolution and creation for a registry
//! - [`path`] - Cache file naming
//! - [`population`] - Exclusive-create, write and rename protocol
//! - [`stream`] - Streaming read-through (tee)
//! - [`buffered`] - Buffered read-through (thumbnails)
//! - [`background`] - Tracked background writes
//! - [`freshness`] - Access-time bookkeeping
//! - [`stats`] - Population counters and disk usage
//! - [`manager`] - The [`CacheManager`] entry point
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use media_cache::app::cache::{CacheLayout, CacheManager};
//! use media_cache::app::client::{ClientConfig, DropboxClient, RemoteStore};
//! use media_cache::app::models::MediaObject;
//! use media_cache::app::registry::MediaRegistry;
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let layout = CacheLayout::initialize("/var/cache/media", MediaRegistry::default()).await?;
//! let remote = Arc::new(DropboxClient::new(ClientConfig::default())?);
//!
//! let meta = remote.get_metadata("/Pictures/AB1/AB1-3 beach.jpg").await?;
//! let object = MediaObject::from_metadata(&meta, layout.registry()).ok_or("not media")?;
//!
//! let cache = CacheManager::new(Arc::new(layout), remote);
//! let mut stream = cache.open(&object).await?;
//! while let Some(chunk) = stream.next().await {
//!     let _bytes = chunk?;
//! }
//!
//! let thumb = cache.thumbnail(&object, "md").await?;
//! println!("thumbnail: {} bytes", thumb.len());
//!
//! cache.drain().await;
//! # Ok(())
//! # }
//! ```

pub mod background;
pub mod buffered;
pub mod freshness;
pub mod layout;
pub mod manager;
pub mod path;
pub mod population;
pub mod stats;
pub mod stream;

pub use background::BackgroundWrites;
pub use layout::{CacheLayout, ResolvedSize};
pub use manager::CacheManager;
pub use population::{Claim, PopulationOutcome, TempWriter};
pub use stats::{format_bytes, CacheUsage, DirectoryScanner, PopulationSnapshot, PopulationStats};
pub use stream::{CacheSource, ObjectStream};
