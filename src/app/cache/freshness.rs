//! Access-time bookkeeping for cache entries
//!
//! Every hit bumps the entry's access and modification times. An external
//! janitor can then evict by age; nothing here depends on the result.

use std::fs::{FileTimes, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::debug;

/// Set the access and modification time of `path` to now
///
/// Best effort: failures are logged at debug level and otherwise ignored, and
/// concurrent touches simply race (last writer wins).
pub async fn touch(path: &Path) {
    let path: PathBuf = path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || {
        let now = SystemTime::now();
        let file = OpenOptions::new().write(true).open(&path)?;
        file.set_times(FileTimes::new().set_accessed(now).set_modified(now))
            .map(|_| path)
    })
    .await;

    match result {
        Ok(Ok(path)) => debug!("Touched cache entry {}", path.display()),
        Ok(Err(e)) => debug!("Failed to touch cache entry: {}", e),
        Err(e) => debug!("Touch task failed: {}", e),
    }
}

/// Time since `modified`, zero if the clock went backwards
pub fn age_of(modified: SystemTime) -> Duration {
    SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO)
}
