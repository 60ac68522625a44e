//! Buffered read-through of thumbnails

use media_cache::app::ObjectIdentity;
use media_cache::errors::{CacheError, RemoteError};

use crate::common::{FixtureRemote, TestCache, PICTURE_ID, PICTURE_PATH, REVISION, VIDEO_PATH};

#[tokio::test]
async fn test_thumbnail_miss_then_hit() {
    let test = TestCache::new(FixtureRemote::new()).await;
    let object = test.object(PICTURE_PATH).await;

    let first = test.cache.thumbnail(&object, "md").await.unwrap();
    assert_eq!(&first[..], b"md jpeg");

    test.cache.drain().await;
    assert_eq!(test.files_in("pic-md"), vec![format!("AB1-3_{}", REVISION)]);
    assert!(test.files_in("pic-sm").is_empty());

    let second = test.cache.thumbnail(&object, "md").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(test.remote.thumbnail_calls(), 1);

    let stats = test.cache.stats();
    assert_eq!((stats.hits, stats.misses, stats.populated), (1, 1, 1));
}

#[tokio::test]
async fn test_sizes_are_cached_separately() {
    let test = TestCache::new(FixtureRemote::new()).await;
    let object = test.object(PICTURE_PATH).await;

    let small = test.cache.thumbnail(&object, "sm").await.unwrap();
    let medium = test.cache.thumbnail(&object, "md").await.unwrap();
    assert_ne!(small, medium);

    test.cache.drain().await;
    assert_eq!(test.files_in("pic-sm").len(), 1);
    assert_eq!(test.files_in("pic-md").len(), 1);
    assert_eq!(test.remote.thumbnail_calls(), 2);
}

#[tokio::test]
async fn test_unknown_size_fails_without_io() {
    let test = TestCache::new(FixtureRemote::new()).await;
    let identity = ObjectIdentity::new("AB1-3", REVISION);

    let result = test.cache.fetch_thumbnail(&identity, "xl", PICTURE_ID).await;

    assert!(matches!(result, Err(CacheError::UnknownSize { label }) if label == "xl"));
    assert_eq!(test.remote.remote_calls(), 0);
    assert_eq!(test.cache.pending_writes(), 0);
}

#[tokio::test]
async fn test_remote_failure_is_returned_and_nothing_cached() {
    let test = TestCache::new(FixtureRemote::new()).await;
    let object = test.object(VIDEO_PATH).await;

    let result = test.cache.thumbnail(&object, "lg").await;

    assert!(matches!(
        result,
        Err(CacheError::Remote(RemoteError::Status { status: 409, .. }))
    ));
    test.cache.drain().await;
    assert!(test.files_in("pic-lg").is_empty());
    assert_eq!(test.cache.stats().populated, 0);
}

#[tokio::test]
async fn test_existing_temp_file_blocks_population() {
    let test = TestCache::new(FixtureRemote::new()).await;
    let object = test.object(PICTURE_PATH).await;
    let temp = test
        .temp_dir
        .path()
        .join("pic-md")
        .join(format!("AB1-3_{}_tmp", REVISION));
    std::fs::write(&temp, b"another writer").unwrap();

    let content = test.cache.thumbnail(&object, "md").await.unwrap();
    assert_eq!(&content[..], b"md jpeg");

    test.cache.drain().await;
    // The other writer's file is left untouched
    assert_eq!(std::fs::read(&temp).unwrap(), b"another writer");
    assert_eq!(test.files_in("pic-md"), vec![format!("AB1-3_{}_tmp", REVISION)]);
    assert_eq!(test.cache.stats().collisions, 1);
}
