//! Media type and thumbnail size registry
//!
//! The registry is a plain configuration value: it is built once at startup
//! (from defaults or from the `[registry]` section of the config file),
//! validated, and then handed to [`CacheLayout::initialize`](crate::app::cache::CacheLayout::initialize)
//! which resolves its directory names against the cache root.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{CacheError, CacheResult};

/// Kind of full-resolution media object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still images
    Picture,
    /// Video clips
    Video,
}

impl MediaKind {
    /// Singular name of the kind
    pub fn name(&self) -> &'static str {
        match self {
            MediaKind::Picture => "picture",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Registration of one media kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Media kind served from this registration
    pub kind: MediaKind,
    /// Type letter(s) used in file names (`""` for pictures, `"V"` for videos)
    pub type_code: String,
    /// Name of the collection this kind is listed under
    pub container_name: String,
    /// Cache subdirectory name, relative to the cache root
    pub cache_dir_name: String,
    /// Lowercase extension (with leading dot) to MIME type
    pub extensions: BTreeMap<String, String>,
}

/// Registration of one thumbnail size
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeInfo {
    /// Label clients ask for (`sm`, `md`, ...)
    pub label: String,
    /// Size selector understood by the remote store (`w128h128`, ...)
    pub remote_size: String,
}

impl SizeInfo {
    /// Create a size registration
    pub fn new(label: impl Into<String>, remote_size: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            remote_size: remote_size.into(),
        }
    }
}

/// Format descriptor resolved from a file extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFormat {
    /// Lowercase extension including the dot
    pub extension: String,
    /// MIME type reported to clients
    pub mime: String,
    /// Kind owning this format
    pub kind: MediaKind,
}

/// Immutable set of media type and thumbnail size registrations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaRegistry {
    /// Media kinds
    pub types: Vec<TypeInfo>,
    /// Thumbnail sizes
    pub sizes: Vec<SizeInfo>,
}

impl Default for MediaRegistry {
    fn default() -> Self {
        Self {
            types: vec![
                TypeInfo {
                    kind: MediaKind::Picture,
                    type_code: String::new(),
                    container_name: "pictures".to_string(),
                    cache_dir_name: "pictures".to_string(),
                    extensions: extension_map(&[
                        (".jpg", "image/jpeg"),
                        (".jpeg", "image/jpeg"),
                        (".gif", "image/gif"),
                        (".png", "image/png"),
                    ]),
                },
                TypeInfo {
                    kind: MediaKind::Video,
                    type_code: "V".to_string(),
                    container_name: "videos".to_string(),
                    cache_dir_name: "videos".to_string(),
                    extensions: extension_map(&[
                        (".mp4", "video/mp4"),
                        (".mov", "video/quicktime"),
                        (".avi", "video/x-msvideo"),
                        (".wmv", "video/x-ms-wmv"),
                        (".3gp", "video/3gpp"),
                    ]),
                },
            ],
            sizes: vec![
                SizeInfo::new("sm", "w128h128"),
                SizeInfo::new("md", "w640h480"),
                SizeInfo::new("lg", "w1024h768"),
            ],
        }
    }
}

fn extension_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(ext, mime)| (ext.to_string(), mime.to_string()))
        .collect()
}

impl MediaRegistry {
    /// Check that labels, type codes and directory names are unambiguous
    ///
    /// Directory names must be single path components so every registration
    /// lands directly under the cache root.
    pub fn validate(&self) -> CacheResult<()> {
        let invalid = |reason: String| Err(CacheError::InvalidRegistry { reason });

        if self.types.is_empty() {
            return invalid("no media types registered".to_string());
        }

        let mut kinds = HashSet::new();
        let mut codes = HashSet::new();
        let mut dirs = HashSet::new();

        for tinfo in &self.types {
            if !kinds.insert(tinfo.kind) {
                return invalid(format!("media kind '{}' registered twice", tinfo.kind));
            }
            if !codes.insert(tinfo.type_code.to_uppercase()) {
                return invalid(format!("type code '{}' registered twice", tinfo.type_code));
            }
            if !is_plain_dir_name(&tinfo.cache_dir_name) {
                return invalid(format!(
                    "cache directory '{}' must be a single path component",
                    tinfo.cache_dir_name
                ));
            }
            if !dirs.insert(tinfo.cache_dir_name.clone()) {
                return invalid(format!(
                    "cache directory '{}' used twice",
                    tinfo.cache_dir_name
                ));
            }
            if let Some(ext) = tinfo.extensions.keys().find(|ext| !ext.starts_with('.')) {
                return invalid(format!("extension '{}' must start with a dot", ext));
            }
        }

        let mut labels = HashSet::new();
        for size in &self.sizes {
            if size.label.is_empty() || !is_plain_dir_name(&size.label) {
                return invalid(format!("invalid thumbnail size label '{}'", size.label));
            }
            if !labels.insert(size.label.as_str()) {
                return invalid(format!("thumbnail size '{}' registered twice", size.label));
            }
            if !dirs.insert(size.dir_name()) {
                return invalid(format!(
                    "thumbnail directory '{}' collides with another directory",
                    size.dir_name()
                ));
            }
        }

        Ok(())
    }

    /// Registration for a media kind
    pub fn type_for_kind(&self, kind: MediaKind) -> Option<&TypeInfo> {
        self.types.iter().find(|tinfo| tinfo.kind == kind)
    }

    /// Registration matching a file-name type code (case-insensitive)
    pub fn type_for_code(&self, type_code: &str) -> Option<&TypeInfo> {
        self.types
            .iter()
            .find(|tinfo| tinfo.type_code.eq_ignore_ascii_case(type_code))
    }

    /// Resolve the format of a file from its type code and extension
    pub fn format_for(&self, type_code: &str, extension: &str) -> Option<MediaFormat> {
        let tinfo = self.type_for_code(type_code)?;
        let extension = extension.to_lowercase();
        tinfo.extensions.get(&extension).map(|mime| MediaFormat {
            extension,
            mime: mime.clone(),
            kind: tinfo.kind,
        })
    }

    /// Registration for a thumbnail size label
    pub fn size(&self, label: &str) -> Option<&SizeInfo> {
        self.sizes.iter().find(|size| size.label == label)
    }
}

impl SizeInfo {
    /// Cache subdirectory name for this size
    pub fn dir_name(&self) -> String {
        format!(
            "{}{}",
            crate::constants::files::THUMBNAIL_DIR_PREFIX,
            self.label
        )
    }
}

fn is_plain_dir_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c| c == '/' || c == '\\')
}
