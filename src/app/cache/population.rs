//! Exclusive-create population protocol
//!
//! A population attempt claims `<final>_tmp` with `create_new`, writes into it,
//! and renames it onto `<final>`. The exclusive create is the only coordination
//! between concurrent populators (in this process or any other sharing the
//! cache directory); the rename is the only way a canonical file ever appears.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::path::temp_path;
use super::stats::PopulationStats;

/// Outcome of trying to claim the temp file of a cache entry
#[derive(Debug)]
pub enum Claim {
    /// This attempt owns the temp file
    Acquired(TempWriter),
    /// Another populator owns the temp file
    Collision,
    /// The temp file could not be created for another reason
    Failed(io::Error),
}

/// Final result of a population attempt, used for logging and counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulationOutcome {
    /// The entry was committed with this many bytes
    Populated(u64),
    /// Another populator owned the temp file
    Collision,
    /// Writing or committing failed and the temp file was removed
    WriteFailed,
    /// The attempt was abandoned before completion
    Abandoned,
}

/// Owner of an in-flight temp file
///
/// Only ever constructed by a successful exclusive create, so it never refers
/// to a temp file created by somebody else. Dropping it without committing
/// removes the temp file.
#[derive(Debug)]
pub struct TempWriter {
    file: Option<File>,
    temp_path: PathBuf,
    final_path: PathBuf,
    bytes_written: u64,
    committed: bool,
}

impl TempWriter {
    /// Try to claim the temp file for `final_path`
    pub async fn claim(final_path: &Path) -> Claim {
        let temp_path = temp_path(final_path);
        let opened = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .await;

        match opened {
            Ok(file) => {
                debug!("Claimed temp file {}", temp_path.display());
                Claim::Acquired(Self {
                    file: Some(file),
                    temp_path,
                    final_path: final_path.to_path_buf(),
                    bytes_written: 0,
                    committed: false,
                })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Claim::Collision,
            Err(e) => Claim::Failed(e),
        }
    }

    /// Path of the temp file
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Canonical path the temp file is promoted to
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Number of bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Append a chunk to the temp file
    pub async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "temp file already closed"))?;
        #[cfg(test)]
        if self.bytes_written > 0 && fault::should_fail(&self.temp_path) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "no space left on device",
            ));
        }
        file.write_all(chunk).await?;
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    /// Close the temp file and atomically rename it onto the canonical path
    ///
    /// On failure the temp file is removed when `self` is dropped.
    pub async fn commit(mut self) -> io::Result<u64> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        fs::rename(&self.temp_path, &self.final_path).await?;
        self.committed = true;
        Ok(self.bytes_written)
    }

    /// Close and remove the temp file
    pub async fn discard(mut self) {
        self.file.take();
        if let Err(e) = fs::remove_file(&self.temp_path).await {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove temp file {}: {}",
                    self.temp_path.display(),
                    e
                );
            }
        }
        // Already removed, nothing left for Drop to do
        self.committed = true;
    }
}

impl Drop for TempWriter {
    fn drop(&mut self) {
        if !self.committed {
            self.file.take();
            // Blocking unlink on purpose: Drop cannot await, and this only runs
            // when an attempt is cancelled or its commit failed
            let _ = std::fs::remove_file(&self.temp_path);
        }
    }
}


/// Write a whole buffer into the cache entry at `final_path`
///
/// Runs the same claim, write and commit sequence as a streamed population.
/// Never returns an error: every outcome is logged and counted in `stats`.
pub async fn populate_from_buffer(
    final_path: &Path,
    content: Bytes,
    stats: &PopulationStats,
) -> PopulationOutcome {
    let mut writer = match TempWriter::claim(final_path).await {
        Claim::Acquired(writer) => writer,
        Claim::Collision => {
            debug!(
                "Population of {} already in flight, skipping",
                final_path.display()
            );
            stats.record(PopulationOutcome::Collision);
            return PopulationOutcome::Collision;
        }
        Claim::Failed(e) => {
            warn!(
                "Failed to create temp file for {}: {}",
                final_path.display(),
                e
            );
            stats.record(PopulationOutcome::WriteFailed);
            return PopulationOutcome::WriteFailed;
        }
    };

    if let Err(e) = writer.write(&content).await {
        warn!(
            "Failed to write temp file {}: {}",
            writer.temp_path().display(),
            e
        );
        writer.discard().await;
        stats.record(PopulationOutcome::WriteFailed);
        return PopulationOutcome::WriteFailed;
    }

    let outcome = finish(writer).await;
    stats.record(outcome);
    outcome
}

/// Commit a fully written temp file, logging the result
pub(crate) async fn finish(writer: TempWriter) -> PopulationOutcome {
    let final_path = writer.final_path().to_path_buf();
    match writer.commit().await {
        Ok(bytes) => {
            debug!("Cached {} ({} bytes)", final_path.display(), bytes);
            PopulationOutcome::Populated(bytes)
        }
        Err(e) => {
            warn!("Failed to commit cache entry {}: {}", final_path.display(), e);
            PopulationOutcome::WriteFailed
        }
    }
}
