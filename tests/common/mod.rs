//! Shared fixtures for the integration tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tempfile::TempDir;
use tokio::sync::Barrier;

use media_cache::app::client::RemoteByteStream;
use media_cache::app::{
    CacheLayout, CacheManager, MediaObject, MediaRegistry, RemoteDownload, RemoteMetadata,
    RemoteStore,
};
use media_cache::errors::{RemoteError, RemoteResult};

pub const PICTURE_PATH: &str = "/Pictures/AB1/AB1-3 beach.jpg";
pub const PICTURE_ID: &str = "id:pic0000000000000000003";
pub const VIDEO_PATH: &str = "/Videos/AB1/AB1-V2 party.mp4";
pub const VIDEO_ID: &str = "id:vid0000000000000000002";
pub const REVISION: &str = "015f1c3a";

/// How download bodies misbehave
#[derive(Debug, Clone, Copy, Default)]
pub enum BodyMode {
    /// Yield every chunk then end
    #[default]
    Complete,
    /// Yield this many chunks then a transport error
    FailAfter(usize),
    /// Yield every chunk then never end
    Stall,
}

/// In-memory remote store that counts the calls it receives
#[derive(Default)]
pub struct FixtureRemote {
    entries: HashMap<String, RemoteMetadata>,
    contents: HashMap<String, Vec<Bytes>>,
    thumbnails: HashMap<(String, String), Bytes>,
    gate: Option<Arc<Barrier>>,
    body_mode: BodyMode,
    metadata_calls: AtomicUsize,
    download_calls: AtomicUsize,
    thumbnail_calls: AtomicUsize,
}

impl FixtureRemote {
    /// A store holding one picture and one video
    pub fn new() -> Self {
        Self::default()
            .with_file(PICTURE_PATH, PICTURE_ID, picture_chunks())
            .with_file(VIDEO_PATH, VIDEO_ID, video_chunks())
            .with_thumbnail(PICTURE_ID, "w640h480", Bytes::from_static(b"md jpeg"))
            .with_thumbnail(PICTURE_ID, "w128h128", Bytes::from_static(b"sm jpeg"))
    }

    pub fn with_file(mut self, path: &str, remote_id: &str, chunks: Vec<Bytes>) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        self.entries.insert(
            path.to_string(),
            RemoteMetadata {
                tag: Some("file".to_string()),
                id: remote_id.to_string(),
                name,
                rev: Some(REVISION.to_string()),
                size: Some(chunks.iter().map(|chunk| chunk.len() as u64).sum()),
                path_display: Some(path.to_string()),
            },
        );
        self.contents.insert(remote_id.to_string(), chunks);
        self
    }

    pub fn with_thumbnail(mut self, remote_id: &str, size_spec: &str, content: Bytes) -> Self {
        self.thumbnails
            .insert((remote_id.to_string(), size_spec.to_string()), content);
        self
    }

    /// Hold every download's first chunk until `parties` downloads are waiting
    pub fn gated(mut self, parties: usize) -> Self {
        self.gate = Some(Arc::new(Barrier::new(parties)));
        self
    }

    pub fn with_body_mode(mut self, body_mode: BodyMode) -> Self {
        self.body_mode = body_mode;
        self
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn thumbnail_calls(&self) -> usize {
        self.thumbnail_calls.load(Ordering::SeqCst)
    }

    pub fn remote_calls(&self) -> usize {
        self.metadata_calls() + self.download_calls() + self.thumbnail_calls()
    }
}

#[async_trait]
impl RemoteStore for FixtureRemote {
    async fn get_metadata(&self, path: &str) -> RemoteResult<RemoteMetadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.entries
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound {
                path: path.to_string(),
            })
    }

    async fn download(&self, remote_id: &str) -> RemoteResult<RemoteDownload> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        let chunks = self
            .contents
            .get(remote_id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound {
                path: remote_id.to_string(),
            })?;
        let content_length = Some(chunks.iter().map(|chunk| chunk.len() as u64).sum());

        let mut items: Vec<RemoteResult<Bytes>> = chunks.into_iter().map(Ok).collect();
        if let BodyMode::FailAfter(count) = self.body_mode {
            items.truncate(count);
            items.push(Err(RemoteError::Interrupted {
                reason: "connection reset by peer".to_string(),
            }));
        }
        let mut body: RemoteByteStream = stream::iter(items).boxed();

        if let BodyMode::Stall = self.body_mode {
            body = body.chain(stream::pending()).boxed();
        }
        if let Some(gate) = self.gate.clone() {
            body = stream::once(async move {
                gate.wait().await;
            })
            .filter_map(|()| async { None::<RemoteResult<Bytes>> })
            .chain(body)
            .boxed();
        }

        Ok(RemoteDownload {
            stream: body,
            content_length,
            etag: Some(format!("\"{}\"", REVISION)),
        })
    }

    async fn get_thumbnail(&self, remote_id: &str, size_spec: &str) -> RemoteResult<Bytes> {
        self.thumbnail_calls.fetch_add(1, Ordering::SeqCst);
        self.thumbnails
            .get(&(remote_id.to_string(), size_spec.to_string()))
            .cloned()
            .ok_or_else(|| RemoteError::Status {
                status: 409,
                message: "unsupported_file".to_string(),
            })
    }
}

/// Picture body: three chunks
pub fn picture_chunks() -> Vec<Bytes> {
    vec![
        Bytes::from_static(b"\xff\xd8\xff\xe0"),
        Bytes::from_static(b"beach at dusk"),
        Bytes::from_static(b"\xff\xd9"),
    ]
}

/// Video body: enough chunks to fill the relay channel several times over
pub fn video_chunks() -> Vec<Bytes> {
    (0..64u8)
        .map(|i| Bytes::from(vec![i; 1024]))
        .collect()
}

pub fn concat(chunks: &[Bytes]) -> Vec<u8> {
    chunks.iter().flat_map(|chunk| chunk.iter().copied()).collect()
}

/// Cache manager over a fresh temporary root
pub struct TestCache {
    pub temp_dir: TempDir,
    pub remote: Arc<FixtureRemote>,
    pub cache: CacheManager,
}

impl TestCache {
    pub async fn new(remote: FixtureRemote) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let layout = CacheLayout::initialize(temp_dir.path(), MediaRegistry::default())
            .await
            .unwrap();
        let remote = Arc::new(remote);
        let cache = CacheManager::new(Arc::new(layout), remote.clone());
        Self {
            temp_dir,
            remote,
            cache,
        }
    }

    /// Resolve a fixture path the way a caller would
    pub async fn object(&self, path: &str) -> MediaObject {
        let meta = self.remote.get_metadata(path).await.unwrap();
        MediaObject::from_metadata(&meta, self.cache.layout().registry()).unwrap()
    }

    /// Names of every file under `dir` relative to the cache root
    pub fn files_in(&self, dir: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.temp_dir.path().join(dir))
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}
