//! Buffered read-through for thumbnails
//!
//! Thumbnails are small, so both directions work on whole buffers: a hit reads
//! the entire file, a miss hands the remote buffer back at once and writes it
//! to the cache in the background.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tokio::fs;

use crate::errors::{CacheError, CacheResult};

use super::background::BackgroundWrites;
use super::freshness::touch;
use super::population::populate_from_buffer;
use super::stats::PopulationStats;

/// Read the cached buffer at `path`, `Ok(None)` on a miss
pub(crate) async fn read_hit(path: &Path) -> CacheResult<Option<Bytes>> {
    match fs::read(path).await {
        Ok(content) => {
            touch(path).await;
            Ok(Some(Bytes::from(content)))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CacheError::Read {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Schedule a tracked, fire-and-forget write of `content` to `final_path`
pub(crate) fn populate_in_background(
    final_path: PathBuf,
    content: Bytes,
    stats: Arc<PopulationStats>,
    background: &BackgroundWrites,
) {
    background.spawn(async move {
        populate_from_buffer(&final_path, content, &stats).await;
    });
}
