//! Streaming read-through of full-resolution objects

use futures::StreamExt;

use media_cache::app::{CacheSource, MediaKind, MediaObject, ObjectIdentity};
use media_cache::errors::{CacheError, RemoteError};

use crate::common::{
    concat, picture_chunks, video_chunks, BodyMode, FixtureRemote, TestCache, PICTURE_ID,
    PICTURE_PATH, REVISION, VIDEO_PATH,
};

async fn read_all(test: &TestCache, object: &MediaObject) -> Vec<u8> {
    test.cache
        .open(object)
        .await
        .unwrap()
        .collect_bytes()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_miss_relays_and_populates() {
    let test = TestCache::new(FixtureRemote::new()).await;
    let object = test.object(PICTURE_PATH).await;

    let stream = test.cache.open(&object).await.unwrap();
    assert_eq!(stream.source(), CacheSource::Miss);
    assert_eq!(stream.content_length(), Some(19));
    assert!(stream.etag().is_some());

    let content = stream.collect_bytes().await.unwrap();
    assert_eq!(content, concat(&picture_chunks()));

    test.cache.drain().await;
    assert_eq!(test.files_in("pictures"), vec![format!("AB1-3_{}", REVISION)]);
    let cached_path = test
        .temp_dir
        .path()
        .join("pictures")
        .join(format!("AB1-3_{}", REVISION));
    let cached = std::fs::read(cached_path).unwrap();
    assert_eq!(cached, content);

    let stats = test.cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.populated, 1);
    assert_eq!(test.remote.download_calls(), 1);
}

#[tokio::test]
async fn test_second_open_is_served_from_disk() {
    let test = TestCache::new(FixtureRemote::new()).await;
    let object = test.object(VIDEO_PATH).await;

    let first = read_all(&test, &object).await;
    test.cache.drain().await;

    let stream = test.cache.open(&object).await.unwrap();
    assert_eq!(stream.source(), CacheSource::Hit);
    assert_eq!(stream.content_length(), Some(64 * 1024));
    let second = stream.collect_bytes().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second, concat(&video_chunks()));
    assert_eq!(test.remote.download_calls(), 1);

    let stats = test.cache.stats();
    assert_eq!((stats.hits, stats.misses), (1, 1));
}

#[tokio::test]
async fn test_hit_never_contacts_remote() {
    let test = TestCache::new(FixtureRemote::new()).await;
    let identity = ObjectIdentity::new("AB1-3", REVISION);
    let path = test
        .temp_dir
        .path()
        .join("pictures")
        .join(format!("AB1-3_{}", REVISION));
    std::fs::write(&path, b"already cached").unwrap();

    let content = test
        .cache
        .open_stream(&identity, MediaKind::Picture, PICTURE_ID)
        .await
        .unwrap()
        .collect_bytes()
        .await
        .unwrap();

    assert_eq!(content, b"already cached");
    assert_eq!(test.remote.remote_calls(), 0);
}

#[tokio::test]
async fn test_new_revision_is_a_miss() {
    let test = TestCache::new(FixtureRemote::new()).await;
    let stale = test.temp_dir.path().join("pictures").join("AB1-3_0000aaaa");
    std::fs::write(&stale, b"old revision").unwrap();
    let object = test.object(PICTURE_PATH).await;

    let stream = test.cache.open(&object).await.unwrap();
    assert_eq!(stream.source(), CacheSource::Miss);
    stream.collect_bytes().await.unwrap();
    test.cache.drain().await;

    // Older revisions are left alone
    assert_eq!(
        test.files_in("pictures"),
        vec!["AB1-3_0000aaaa".to_string(), format!("AB1-3_{}", REVISION)]
    );
}

#[tokio::test]
async fn test_concurrent_misses_populate_once() {
    let test = TestCache::new(FixtureRemote::new().gated(2)).await;
    let object = test.object(VIDEO_PATH).await;

    let (first, second) = tokio::join!(read_all(&test, &object), read_all(&test, &object));

    let expected = concat(&video_chunks());
    assert_eq!(first, expected);
    assert_eq!(second, expected);

    test.cache.drain().await;
    let stats = test.cache.stats();
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.populated, 1);
    assert_eq!(stats.collisions, 1);
    assert_eq!(test.files_in("videos"), vec![format!("AB1-V2_{}", REVISION)]);
}

#[tokio::test]
async fn test_write_failure_still_serves_caller() {
    let test = TestCache::new(FixtureRemote::new()).await;
    let object = test.object(PICTURE_PATH).await;
    std::fs::remove_dir(test.temp_dir.path().join("pictures")).unwrap();

    let content = read_all(&test, &object).await;
    assert_eq!(content, concat(&picture_chunks()));

    test.cache.drain().await;
    let stats = test.cache.stats();
    assert_eq!(stats.write_failures, 1);
    assert_eq!(stats.populated, 0);
    assert!(!test.temp_dir.path().join("pictures").exists());
}

#[tokio::test]
async fn test_upstream_error_reaches_caller_and_leaves_no_files() {
    let test =
        TestCache::new(FixtureRemote::new().with_body_mode(BodyMode::FailAfter(10))).await;
    let object = test.object(VIDEO_PATH).await;

    let mut stream = test.cache.open(&object).await.unwrap();
    let mut received = 0;
    let mut failure = None;
    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => received += chunk.len(),
            Err(e) => failure = Some(e),
        }
    }

    assert_eq!(received, 10 * 1024);
    assert!(matches!(
        failure,
        Some(CacheError::Remote(RemoteError::Interrupted { .. }))
    ));

    test.cache.drain().await;
    assert!(test.files_in("videos").is_empty());
    assert_eq!(test.cache.stats().abandoned, 1);
}

#[tokio::test]
async fn test_consumer_that_stops_reading_abandons_population() {
    let test = TestCache::new(FixtureRemote::new().with_body_mode(BodyMode::Stall)).await;
    let object = test.object(VIDEO_PATH).await;

    let mut stream = test.cache.open(&object).await.unwrap();
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.len(), 1024);
    drop(stream);

    test.cache.drain().await;
    assert_eq!(test.cache.pending_writes(), 0);
    assert!(test.files_in("videos").is_empty());

    let stats = test.cache.stats();
    assert_eq!(stats.abandoned, 1);
    assert_eq!(stats.populated, 0);
}

#[tokio::test]
async fn test_missing_remote_object_is_an_error() {
    let test = TestCache::new(FixtureRemote::new()).await;
    let identity = ObjectIdentity::new("ZZ9-1", REVISION);

    let result = test
        .cache
        .open_stream(&identity, MediaKind::Picture, "id:does-not-exist")
        .await;

    assert!(matches!(
        result,
        Err(CacheError::Remote(RemoteError::NotFound { .. }))
    ));
    assert!(test.files_in("pictures").is_empty());
}

#[tokio::test]
async fn test_unreadable_hit_does_not_fall_back_to_remote() {
    let test = TestCache::new(FixtureRemote::new()).await;
    let object = test.object(PICTURE_PATH).await;
    // A directory squatting on the cache path opens but cannot be read
    std::fs::create_dir(
        test.temp_dir
            .path()
            .join("pictures")
            .join(format!("AB1-3_{}", REVISION)),
    )
    .unwrap();

    let result = match test.cache.open(&object).await {
        Ok(stream) => stream.collect_bytes().await,
        Err(e) => Err(e),
    };

    assert!(matches!(result, Err(CacheError::Read { .. })));
    assert_eq!(test.remote.download_calls(), 0);
}
