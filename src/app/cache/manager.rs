//! Read-through cache manager
//!
//! This module contains the [`CacheManager`], the entry point the rest of the
//! application uses to get object streams and thumbnails. It owns nothing but
//! shared handles: the immutable layout, the remote store, the background
//! write tracker and the population counters.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::app::client::RemoteStore;
use crate::app::models::{MediaObject, ObjectIdentity};
use crate::app::registry::MediaKind;
use crate::errors::CacheResult;

use super::background::BackgroundWrites;
use super::buffered::{populate_in_background, read_hit};
use super::layout::CacheLayout;
use super::path::cache_path;
use super::stats::{PopulationSnapshot, PopulationStats};
use super::stream::{open_hit, tee_download, ObjectStream};

/// Read-through disk cache in front of a remote store
#[derive(Clone)]
pub struct CacheManager {
    layout: Arc<CacheLayout>,
    remote: Arc<dyn RemoteStore>,
    background: BackgroundWrites,
    stats: Arc<PopulationStats>,
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("root", &self.layout.root())
            .field("pending_writes", &self.background.pending())
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

impl CacheManager {
    /// Create a cache manager over an initialized layout
    pub fn new(layout: Arc<CacheLayout>, remote: Arc<dyn RemoteStore>) -> Self {
        info!(
            "Initialized cache manager with root: {}",
            layout.root().display()
        );
        Self {
            layout,
            remote,
            background: BackgroundWrites::new(),
            stats: Arc::new(PopulationStats::default()),
        }
    }

    /// Cache layout in use
    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    /// Cache root directory
    pub fn cache_root(&self) -> &Path {
        self.layout.root()
    }

    /// Open a full-resolution object as a byte stream
    ///
    /// A hit streams the cached file and never contacts the remote store. A
    /// miss starts a fresh download (downloads are not shared between
    /// callers) and returns as soon as the response headers are in; the
    /// cache write happens alongside the relay.
    ///
    /// # Errors
    ///
    /// `CacheError::UnknownKind` when `kind` has no directory, `CacheError::Read`
    /// when a cached file exists but cannot be opened, and `CacheError::Remote`
    /// when the download cannot be started. Errors after the stream is returned
    /// arrive as its final item.
    pub async fn open_stream(
        &self,
        identity: &ObjectIdentity,
        kind: MediaKind,
        remote_id: &str,
    ) -> CacheResult<ObjectStream> {
        let path = cache_path(self.layout.kind_dir(kind)?, identity);

        if let Some(hit) = open_hit(&path).await? {
            debug!("Cache hit for {} ({})", identity, kind);
            self.stats.record_hit();
            return Ok(hit);
        }

        debug!("Cache miss for {} ({}), downloading", identity, kind);
        self.stats.record_miss();
        let download = self.remote.download(remote_id).await.map_err(|e| {
            warn!("Failed to start download of {}: {}", identity, e);
            e
        })?;

        Ok(tee_download(
            download,
            path,
            Arc::clone(&self.stats),
            &self.background,
        ))
    }

    /// Open a media object as a byte stream
    pub async fn open(&self, object: &MediaObject) -> CacheResult<ObjectStream> {
        self.open_stream(object.identity(), object.kind(), object.remote_id())
            .await
    }

    /// Fetch a thumbnail buffer at the size registered as `label`
    ///
    /// An unknown label fails before any filesystem or remote access. On a miss
    /// the remote buffer is returned straight away and written to the cache by
    /// a tracked background task.
    pub async fn fetch_thumbnail(
        &self,
        identity: &ObjectIdentity,
        label: &str,
        remote_id: &str,
    ) -> CacheResult<Bytes> {
        let size = self.layout.size(label)?;
        let path = cache_path(&size.cache_dir, identity);

        if let Some(content) = read_hit(&path).await? {
            debug!("Thumbnail hit for {} at {}", identity, label);
            self.stats.record_hit();
            return Ok(content);
        }

        debug!("Thumbnail miss for {} at {}", identity, label);
        self.stats.record_miss();
        let content = self
            .remote
            .get_thumbnail(remote_id, &size.remote_size)
            .await
            .map_err(|e| {
                warn!("Failed to fetch thumbnail of {}: {}", identity, e);
                e
            })?;

        populate_in_background(
            path,
            content.clone(),
            Arc::clone(&self.stats),
            &self.background,
        );
        Ok(content)
    }

    /// Fetch a thumbnail of a media object
    pub async fn thumbnail(&self, object: &MediaObject, label: &str) -> CacheResult<Bytes> {
        self.fetch_thumbnail(object.identity(), label, object.remote_id())
            .await
    }

    /// Population counters since this manager was created
    pub fn stats(&self) -> PopulationSnapshot {
        self.stats.snapshot()
    }

    /// Number of population tasks still running
    pub fn pending_writes(&self) -> usize {
        self.background.pending()
    }

    /// Wait for every pending cache write to finish
    pub async fn drain(&self) {
        self.background.drain().await;
    }
}
