//! Streaming read-through for full-resolution objects
//!
//! A hit streams the canonical file from disk. A miss tees the remote download:
//! a pump task forwards each chunk to the caller through a bounded channel and
//! appends the same chunk to a claimed temp file, so memory stays bounded by
//! the channel capacity whatever the object size.
//!
//! ```text
//!   remote ──► pump ──► channel ──► caller
//!               │
//!               └──► <id>_<rev>_tmp ──rename──► <id>_<rev>
//! ```

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use tokio::fs::File;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::app::client::{RemoteByteStream, RemoteDownload};
use crate::constants::relay;
use crate::errors::{CacheError, CacheResult};

use super::background::BackgroundWrites;
use super::freshness::touch;
use super::population::{finish, Claim, PopulationOutcome, TempWriter};
use super::stats::PopulationStats;

/// Where the bytes of an [`ObjectStream`] come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    /// Served from the canonical cache file
    Hit,
    /// Relayed from the remote store
    Miss,
}

/// Byte stream of a cached or relayed object
pub struct ObjectStream {
    source: CacheSource,
    content_length: Option<u64>,
    etag: Option<String>,
    inner: BoxStream<'static, CacheResult<Bytes>>,
}

impl ObjectStream {
    /// Whether this stream is a hit or a miss
    pub fn source(&self) -> CacheSource {
        self.source
    }

    /// Total length if known (file size on a hit, `Content-Length` on a miss)
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Remote content validator, only known on a miss
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    /// Read the whole stream into memory
    pub async fn collect_bytes(mut self) -> CacheResult<Vec<u8>> {
        let mut content = Vec::new();
        while let Some(chunk) = self.next().await {
            content.extend_from_slice(&chunk?);
        }
        Ok(content)
    }
}

impl Stream for ObjectStream {
    type Item = CacheResult<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl fmt::Debug for ObjectStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStream")
            .field("source", &self.source)
            .field("content_length", &self.content_length)
            .field("etag", &self.etag)
            .finish_non_exhaustive()
    }
}

/// Open the canonical file at `path` as a stream
///
/// Returns `Ok(None)` when the file does not exist. Any other open error, and
/// any later read error, is returned to the caller as is: a broken hit never
/// falls back to the remote store.
pub(crate) async fn open_hit(path: &Path) -> CacheResult<Option<ObjectStream>> {
    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(CacheError::Read {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let content_length = file.metadata().await.ok().map(|meta| meta.len());
    touch(path).await;

    let read_path = path.to_path_buf();
    let inner = ReaderStream::with_capacity(file, relay::READ_CHUNK_SIZE)
        .map(move |chunk| {
            chunk.map_err(|e| CacheError::Read {
                path: read_path.clone(),
                source: e,
            })
        })
        .boxed();

    Ok(Some(ObjectStream {
        source: CacheSource::Hit,
        content_length,
        etag: None,
        inner,
    }))
}

/// Relay `download` to the caller while populating `final_path`
///
/// Returns immediately; the claim, the tee and the commit run in a tracked
/// background task.
pub(crate) fn tee_download(
    download: RemoteDownload,
    final_path: PathBuf,
    stats: Arc<PopulationStats>,
    background: &BackgroundWrites,
) -> ObjectStream {
    let RemoteDownload {
        stream: remote,
        content_length,
        etag,
    } = download;

    let (tx, rx) = mpsc::channel(relay::CHANNEL_CAPACITY);
    background.spawn(pump(remote, final_path, tx, stats));

    let inner = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    })
    .boxed();

    ObjectStream {
        source: CacheSource::Miss,
        content_length,
        etag,
        inner,
    }
}

/// Drive one miss: forward remote chunks to `tx` and into the temp file
async fn pump(
    mut remote: RemoteByteStream,
    final_path: PathBuf,
    tx: mpsc::Sender<CacheResult<Bytes>>,
    stats: Arc<PopulationStats>,
) {
    let mut writer = match TempWriter::claim(&final_path).await {
        Claim::Acquired(writer) => Some(writer),
        Claim::Collision => {
            debug!(
                "Population of {} already in flight, relaying only",
                final_path.display()
            );
            stats.record(PopulationOutcome::Collision);
            None
        }
        Claim::Failed(e) => {
            warn!(
                "Failed to create temp file for {}: {}",
                final_path.display(),
                e
            );
            stats.record(PopulationOutcome::WriteFailed);
            None
        }
    };

    loop {
        let next = tokio::select! {
            biased;
            _ = tx.closed() => {
                debug!("Consumer of {} stopped reading", final_path.display());
                abandon(writer.take(), &stats).await;
                return;
            }
            next = remote.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                if let Some(active) = writer.as_mut() {
                    if let Err(e) = active.write(&chunk).await {
                        warn!(
                            "Failed to write temp file {}: {}",
                            active.temp_path().display(),
                            e
                        );
                        if let Some(failed) = writer.take() {
                            failed.discard().await;
                        }
                        stats.record(PopulationOutcome::WriteFailed);
                    }
                }
                if tx.send(Ok(chunk)).await.is_err() {
                    debug!("Consumer of {} stopped reading", final_path.display());
                    abandon(writer.take(), &stats).await;
                    return;
                }
            }
            Some(Err(e)) => {
                warn!("Download of {} failed: {}", final_path.display(), e);
                abandon(writer.take(), &stats).await;
                // The consumer may already be gone
                let _ = tx.send(Err(CacheError::Remote(e))).await;
                return;
            }
            None => break,
        }
    }

    // Release the consumer before the commit
    drop(tx);

    if let Some(writer) = writer {
        let outcome = finish(writer).await;
        stats.record(outcome);
    }
}

async fn abandon(writer: Option<TempWriter>, stats: &PopulationStats) {
    if let Some(writer) = writer {
        debug!(
            "Discarding partial temp file {}",
            writer.temp_path().display()
        );
        writer.discard().await;
        stats.record(PopulationOutcome::Abandoned);
    }
}
