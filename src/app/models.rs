//! Core data structures for cached media objects
//!
//! [`ObjectIdentity`] is the cache key, [`RemoteMetadata`] is what the remote
//! store reports about a path, and [`MediaObject`] ties the two together with
//! the registry so callers can ask the cache for bytes.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app::cache::path::cache_path;
use crate::app::naming::parse_file_name;
use crate::app::registry::{MediaFormat, MediaKind, MediaRegistry};

/// Stable identifier plus revision of a remote object
///
/// A new revision of the same logical object is a different key, so the cache
/// file of an older revision is left orphaned rather than overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectIdentity {
    id: String,
    revision: String,
}

impl ObjectIdentity {
    /// Create an identity from its parts
    pub fn new(id: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            revision: revision.into(),
        }
    }

    /// Derive the identity of a remote file from its metadata
    ///
    /// Returns `None` for folders, for entries without a revision, and for
    /// names outside the naming convention.
    pub fn from_metadata(meta: &RemoteMetadata) -> Option<Self> {
        if !meta.is_file() {
            return None;
        }
        let revision = meta.rev.as_deref()?;
        let parts = parse_file_name(&meta.name)?;
        Some(Self::new(parts.id, revision))
    }

    /// Stable identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Remote revision
    pub fn revision(&self) -> &str {
        &self.revision
    }
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.revision)
    }
}

/// Metadata reported by the remote store for a path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMetadata {
    /// Entry type (`file`, `folder`, `deleted`)
    #[serde(rename = ".tag", default)]
    pub tag: Option<String>,
    /// Remote identifier used for downloads (`id:...`)
    #[serde(default)]
    pub id: String,
    /// Display name of the entry
    pub name: String,
    /// Content revision, present for files only
    #[serde(default)]
    pub rev: Option<String>,
    /// Size in bytes, present for files only
    #[serde(default)]
    pub size: Option<u64>,
    /// Full path with original casing
    #[serde(default)]
    pub path_display: Option<String>,
}

impl RemoteMetadata {
    /// Whether the entry is a file
    pub fn is_file(&self) -> bool {
        match self.tag.as_deref() {
            Some(tag) => tag == "file",
            None => self.rev.is_some(),
        }
    }
}

/// A cacheable media file
///
/// Lightweight descriptor: it owns no stream or buffer, it only knows how to
/// name its cache files and which remote id to fetch on a miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaObject {
    identity: ObjectIdentity,
    remote_id: String,
    display_name: String,
    sequence_number: u64,
    format: MediaFormat,
}

impl MediaObject {
    /// Create a media object from already-resolved parts
    pub fn new(
        identity: ObjectIdentity,
        remote_id: impl Into<String>,
        display_name: impl Into<String>,
        sequence_number: u64,
        format: MediaFormat,
    ) -> Self {
        Self {
            identity,
            remote_id: remote_id.into(),
            display_name: display_name.into(),
            sequence_number,
            format,
        }
    }

    /// Build a media object from remote metadata
    ///
    /// Returns `None` when the entry is not a file, its name does not follow
    /// the naming convention, or its type/extension is not registered.
    pub fn from_metadata(meta: &RemoteMetadata, registry: &MediaRegistry) -> Option<Self> {
        if meta.id.is_empty() {
            return None;
        }
        let identity = ObjectIdentity::from_metadata(meta)?;
        let parts = parse_file_name(&meta.name)?;
        let format = registry.format_for(&parts.type_code, &parts.extension)?;

        Some(Self {
            identity,
            remote_id: meta.id.clone(),
            display_name: meta.name.clone(),
            sequence_number: parts.number,
            format,
        })
    }

    /// Cache key of this object
    pub fn identity(&self) -> &ObjectIdentity {
        &self.identity
    }

    /// Identifier passed to the remote store
    pub fn remote_id(&self) -> &str {
        &self.remote_id
    }

    /// Original file name
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Sequence number within its parent, for ordering
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// Resolved format
    pub fn format(&self) -> &MediaFormat {
        &self.format
    }

    /// Media kind, selecting the full-resolution cache directory
    pub fn kind(&self) -> MediaKind {
        self.format.kind
    }

    /// Cache file path of this object under `cache_dir`
    pub fn cache_path(&self, cache_dir: &Path) -> PathBuf {
        cache_path(cache_dir, &self.identity)
    }

    /// Client-facing summary
    pub fn summary(&self) -> ObjectSummary {
        ObjectSummary {
            name: self.display_name.clone(),
            id: self.identity.id().to_string(),
        }
    }
}

/// Minimal representation handed to clients listing a folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSummary {
    /// Display name
    pub name: String,
    /// Stable identifier
    pub id: String,
}
