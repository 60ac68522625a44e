//! Cache statistics and disk usage monitoring
//!
//! Two kinds of numbers live here: process-local population counters updated by
//! the read-through paths, and on-disk usage figures gathered by scanning the
//! cache directories. Neither influences cache behavior.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use super::freshness::age_of;
use super::path::is_temp_file;
use super::population::PopulationOutcome;

/// Population counters shared by every read-through operation
#[derive(Debug, Default)]
pub struct PopulationStats {
    hits: AtomicU64,
    misses: AtomicU64,
    populated: AtomicU64,
    collisions: AtomicU64,
    write_failures: AtomicU64,
    abandoned: AtomicU64,
}

/// Point-in-time copy of [`PopulationStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PopulationSnapshot {
    /// Requests served from disk
    pub hits: u64,
    /// Requests that went to the remote store
    pub misses: u64,
    /// Entries committed to the cache
    pub populated: u64,
    /// Attempts that lost the exclusive create
    pub collisions: u64,
    /// Attempts whose temp file could not be written or committed
    pub write_failures: u64,
    /// Attempts cut short by the consumer or the upstream stream
    pub abandoned: u64,
}

impl PopulationStats {
    /// Count a cache hit
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a cache miss
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Count the outcome of a population attempt
    pub fn record(&self, outcome: PopulationOutcome) {
        let counter = match outcome {
            PopulationOutcome::Populated(_) => &self.populated,
            PopulationOutcome::Collision => &self.collisions,
            PopulationOutcome::WriteFailed => &self.write_failures,
            PopulationOutcome::Abandoned => &self.abandoned,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters
    pub fn snapshot(&self) -> PopulationSnapshot {
        PopulationSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            populated: self.populated.load(Ordering::Relaxed),
            collisions: self.collisions.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
        }
    }
}

/// Disk usage of one cache directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheUsage {
    /// Directory that was scanned
    pub directory: PathBuf,
    /// Number of committed entries
    pub entries: usize,
    /// Total size of committed entries in bytes
    pub total_bytes: u64,
    /// Number of in-flight (or abandoned) temp files
    pub temp_files: usize,
    /// Age of the least recently used entry
    pub oldest_entry_age: Option<Duration>,
}

impl CacheUsage {
    fn empty(directory: PathBuf) -> Self {
        Self {
            directory,
            entries: 0,
            total_bytes: 0,
            temp_files: 0,
            oldest_entry_age: None,
        }
    }

    /// Format total size in human-readable format
    pub fn format_size(&self) -> String {
        format_bytes(self.total_bytes)
    }
}

/// Directory scanner for cache usage
pub struct DirectoryScanner;

impl DirectoryScanner {
    /// Scan one cache directory without blocking the async runtime
    pub async fn scan_cache_directory(dir: &Path) -> CacheUsage {
        let dir = dir.to_path_buf();
        let fallback = CacheUsage::empty(dir.clone());

        tokio::task::spawn_blocking(move || Self::scan_directory_sync(&dir))
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to scan cache directory: {}", e);
                fallback
            })
    }

    /// Scan one cache directory (blocking)
    ///
    /// Cache directories are flat, so subdirectories are ignored.
    pub fn scan_directory_sync(dir: &Path) -> CacheUsage {
        let mut usage = CacheUsage::empty(dir.to_path_buf());

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read cache directory {}: {}", dir.display(), e);
                return usage;
            }
        };

        for entry in entries.flatten() {
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }

            if is_temp_file(&entry.path()) {
                usage.temp_files += 1;
                continue;
            }

            usage.entries += 1;
            usage.total_bytes += metadata.len();
            if let Ok(modified) = metadata.modified() {
                let age = age_of(modified);
                if usage.oldest_entry_age.map_or(true, |oldest| age > oldest) {
                    usage.oldest_entry_age = Some(age);
                }
            }
        }

        usage
    }
}

/// Format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: u64 = 1024;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD as f64 && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD as f64;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}
