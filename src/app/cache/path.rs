//! Cache file naming
//!
//! A materialized entry lives at `<dir>/<id>_<revision>`; an in-flight
//! population attempt writes to the same path with a `_tmp` suffix. Both are
//! pure functions of their inputs so a restarted process finds the same files.

use std::path::{Path, PathBuf};

use crate::app::models::ObjectIdentity;
use crate::constants::files;

/// Canonical cache path of an identity under `base_dir`
pub fn cache_path(base_dir: &Path, identity: &ObjectIdentity) -> PathBuf {
    base_dir.join(format!(
        "{}{}{}",
        identity.id(),
        files::REVISION_SEPARATOR,
        identity.revision()
    ))
}

/// Temporary path used while populating `canonical`
pub fn temp_path(canonical: &Path) -> PathBuf {
    let mut name = canonical.as_os_str().to_owned();
    name.push(files::TEMP_FILE_SUFFIX);
    PathBuf::from(name)
}

/// Whether a cache directory entry is an in-flight population file
pub fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(files::TEMP_FILE_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_path_layout() {
        let identity = ObjectIdentity::new("ABC123", "5");
        let path = cache_path(Path::new("/cache/pictures"), &identity);
        assert_eq!(path, PathBuf::from("/cache/pictures/ABC123_5"));
    }

    #[test]
    fn test_cache_path_is_deterministic() {
        let dir = Path::new("/cache/videos");
        let a = ObjectIdentity::new("AB1-V3", "0a1b");
        let b = ObjectIdentity::new("AB1-V3", "0a1b");
        assert_eq!(cache_path(dir, &a), cache_path(dir, &b));
    }

    #[test]
    fn test_revisions_never_collide() {
        let dir = Path::new("/cache/pictures");
        let old = ObjectIdentity::new("ABC123", "5");
        let new = ObjectIdentity::new("ABC123", "6");
        assert_ne!(cache_path(dir, &old), cache_path(dir, &new));
    }

    #[test]
    fn test_temp_path_suffix() {
        let canonical = PathBuf::from("/cache/pictures/ABC123_5");
        let temp = temp_path(&canonical);
        assert_eq!(temp, PathBuf::from("/cache/pictures/ABC123_5_tmp"));
        assert!(is_temp_file(&temp));
        assert!(!is_temp_file(&canonical));
    }
}
