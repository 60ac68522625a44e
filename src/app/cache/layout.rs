//! Cache directory layout
//!
//! [`CacheLayout::initialize`] resolves every registered media kind and
//! thumbnail size to a directory under the cache root and creates it. The
//! resulting layout is immutable and is shared by reference with every cache
//! operation; nothing may read or write the cache before it exists.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::app::registry::{MediaKind, MediaRegistry};
use crate::errors::{CacheError, CacheResult};

use super::freshness::age_of;
use super::path::is_temp_file;
use super::stats::{CacheUsage, DirectoryScanner};

/// A thumbnail size resolved against the cache root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSize {
    /// Label clients ask for
    pub label: String,
    /// Size selector passed to the remote store
    pub remote_size: String,
    /// Directory holding thumbnails of this size
    pub cache_dir: PathBuf,
}

/// Resolved, created cache directories for a registry
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
    registry: MediaRegistry,
    kind_dirs: BTreeMap<MediaKind, PathBuf>,
    sizes: Vec<ResolvedSize>,
}

impl CacheLayout {
    /// Validate the registry and create every cache directory under `root`
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidRegistry` for an inconsistent registry and
    /// `CacheError::DirectoryNotAccessible` when a directory cannot be created
    /// for any reason other than it already existing.
    pub async fn initialize(root: impl Into<PathBuf>, registry: MediaRegistry) -> CacheResult<Self> {
        let root = root.into();
        registry.validate()?;

        fs::create_dir_all(&root).await.map_err(|e| {
            error!("Failed to create cache root {}: {}", root.display(), e);
            CacheError::DirectoryNotAccessible {
                path: root.clone(),
                source: e,
            }
        })?;

        let mut kind_dirs = BTreeMap::new();
        for tinfo in &registry.types {
            let dir = root.join(&tinfo.cache_dir_name);
            ensure_directory(&dir).await?;
            kind_dirs.insert(tinfo.kind, dir);
        }

        let mut sizes = Vec::with_capacity(registry.sizes.len());
        for size in &registry.sizes {
            let dir = root.join(size.dir_name());
            ensure_directory(&dir).await?;
            sizes.push(ResolvedSize {
                label: size.label.clone(),
                remote_size: size.remote_size.clone(),
                cache_dir: dir,
            });
        }

        info!(
            "Initialized cache at {} ({} media kinds, {} thumbnail sizes)",
            root.display(),
            kind_dirs.len(),
            sizes.len()
        );

        Ok(Self {
            root,
            registry,
            kind_dirs,
            sizes,
        })
    }

    /// Cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Registry this layout was built from
    pub fn registry(&self) -> &MediaRegistry {
        &self.registry
    }

    /// Directory holding full-resolution objects of `kind`
    pub fn kind_dir(&self, kind: MediaKind) -> CacheResult<&Path> {
        self.kind_dirs
            .get(&kind)
            .map(PathBuf::as_path)
            .ok_or_else(|| CacheError::UnknownKind {
                kind: kind.to_string(),
            })
    }

    /// Resolve a thumbnail size label
    ///
    /// Pure lookup, no filesystem access.
    pub fn size(&self, label: &str) -> CacheResult<&ResolvedSize> {
        self.sizes
            .iter()
            .find(|size| size.label == label)
            .ok_or_else(|| CacheError::UnknownSize {
                label: label.to_string(),
            })
    }

    /// Every managed directory, media kinds first
    pub fn directories(&self) -> Vec<&Path> {
        self.kind_dirs
            .values()
            .map(PathBuf::as_path)
            .chain(self.sizes.iter().map(|size| size.cache_dir.as_path()))
            .collect()
    }

    /// Scan every managed directory for usage figures
    pub async fn scan(&self) -> Vec<CacheUsage> {
        let mut usage = Vec::new();
        for dir in self.directories() {
            usage.push(DirectoryScanner::scan_cache_directory(dir).await);
        }
        usage
    }

    /// Remove temp files older than `max_age` from every managed directory
    ///
    /// A temp file only outlives its writer when that writer's process died;
    /// until removed it blocks population of that entry. Committed entries are
    /// never touched. Returns the number of files removed.
    pub async fn sweep_stale_temp(&self, max_age: Duration) -> usize {
        let mut removed = 0;
        for dir in self.directories() {
            match sweep_directory(dir, max_age).await {
                Ok(count) => removed += count,
                Err(e) => warn!("Failed to sweep {}: {}", dir.display(), e),
            }
        }
        if removed > 0 {
            info!("Removed {} stale temp files", removed);
        }
        removed
    }
}

/// Create a single cache directory, accepting one that already exists
async fn ensure_directory(path: &Path) -> CacheResult<()> {
    match fs::create_dir(path).await {
        Ok(()) => {
            debug!("Created cache directory: {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            let is_dir = fs::metadata(path)
                .await
                .map(|meta| meta.is_dir())
                .unwrap_or(false);
            if is_dir {
                Ok(())
            } else {
                error!("Cache path exists but is not a directory: {}", path.display());
                Err(CacheError::DirectoryNotAccessible {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        }
        Err(e) => {
            error!("Failed to create cache directory {}: {}", path.display(), e);
            Err(CacheError::DirectoryNotAccessible {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }
}

async fn sweep_directory(dir: &Path, max_age: Duration) -> io::Result<usize> {
    let mut removed = 0;
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !is_temp_file(&path) {
            continue;
        }
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        if age_of(modified) < max_age {
            continue;
        }

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed stale temp file {}", path.display());
                removed += 1;
            }
            // Its owner finished or another sweeper got there first
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::registry::SizeInfo;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_initialize_creates_all_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("cache");
        let layout = CacheLayout::initialize(&root, MediaRegistry::default())
            .await
            .unwrap();

        for name in ["pictures", "videos", "pic-sm", "pic-md", "pic-lg"] {
            assert!(root.join(name).is_dir(), "{} missing", name);
        }
        assert_eq!(layout.directories().len(), 5);
        assert_eq!(
            layout.kind_dir(MediaKind::Video).unwrap(),
            root.join("videos")
        );
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("keep"), b"x").unwrap();
        CacheLayout::initialize(temp_dir.path(), MediaRegistry::default())
            .await
            .unwrap();
        std::fs::write(temp_dir.path().join("pictures").join("ABC123_5"), b"data").unwrap();

        CacheLayout::initialize(temp_dir.path(), MediaRegistry::default())
            .await
            .unwrap();
        assert!(temp_dir.path().join("pictures").join("ABC123_5").exists());
    }

    #[tokio::test]
    async fn test_initialize_fails_when_path_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("pictures"), b"not a dir").unwrap();

        let result = CacheLayout::initialize(temp_dir.path(), MediaRegistry::default()).await;
        assert!(matches!(
            result,
            Err(CacheError::DirectoryNotAccessible { .. })
        ));
    }

    #[tokio::test]
    async fn test_initialize_rejects_invalid_registry() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = MediaRegistry::default();
        registry.sizes.push(SizeInfo::new("md", "w1h1"));

        let result = CacheLayout::initialize(temp_dir.path().join("cache"), registry).await;
        assert!(matches!(result, Err(CacheError::InvalidRegistry { .. })));
        assert!(!temp_dir.path().join("cache").exists());
    }

    #[tokio::test]
    async fn test_size_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let layout = CacheLayout::initialize(temp_dir.path(), MediaRegistry::default())
            .await
            .unwrap();

        let md = layout.size("md").unwrap();
        assert_eq!(md.remote_size, "w640h480");
        assert_eq!(md.cache_dir, temp_dir.path().join("pic-md"));
        assert!(matches!(
            layout.size("xl"),
            Err(CacheError::UnknownSize { .. })
        ));
    }

    #[tokio::test]
    async fn test_sweep_removes_only_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let layout = CacheLayout::initialize(temp_dir.path(), MediaRegistry::default())
            .await
            .unwrap();
        let pictures = temp_dir.path().join("pictures");
        std::fs::write(pictures.join("ABC123_5"), b"done").unwrap();
        std::fs::write(pictures.join("ABC124_1_tmp"), b"partial").unwrap();

        // Fresh temp files are presumed in flight
        assert_eq!(layout.sweep_stale_temp(Duration::from_secs(3600)).await, 0);
        assert!(pictures.join("ABC124_1_tmp").exists());

        assert_eq!(layout.sweep_stale_temp(Duration::ZERO).await, 1);
        assert!(!pictures.join("ABC124_1_tmp").exists());
        assert!(pictures.join("ABC123_5").exists());
    }

    #[tokio::test]
    async fn test_scan_reports_every_directory() {
        let temp_dir = TempDir::new().unwrap();
        let layout = CacheLayout::initialize(temp_dir.path(), MediaRegistry::default())
            .await
            .unwrap();
        std::fs::write(temp_dir.path().join("pic-sm").join("ABC123_5"), b"jpeg").unwrap();

        let usage = layout.scan().await;
        assert_eq!(usage.len(), 5);
        let thumbs = usage
            .iter()
            .find(|u| u.directory == temp_dir.path().join("pic-sm"))
            .unwrap();
        assert_eq!(thumbs.entries, 1);
        assert_eq!(thumbs.total_bytes, 4);
    }
}
