//! Refresh cycle behaviour against a scripted upstream.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use common::*;
use tuberss::app::{Result, TubeError};
use tuberss::domain::{FeedKey, FeedRecord, Part};
use tuberss::fetcher::YouTubeApi;
use tuberss::store::{SqliteStore, Store};
use tuberss::sync::{SyncSettings, Synchronizer};

const CHANNEL: &str = "UCchannel";
const UPLOADS: &str = "UUchannel";

fn channel_key() -> FeedKey {
    FeedKey::channel(CHANNEL).unwrap()
}

fn script_full_channel(fetcher: &ScriptedFetcher) {
    fetcher.push(Part::Channel, CHANNEL, Reply::Body(channel_body("c1", "Rust Talks", UPLOADS)));
    fetcher.push(Part::Playlist, UPLOADS, Reply::Body(playlist_body("p1", &["v2", "v1"])));
    fetcher.push(Part::Videos, "v2,v1", Reply::Body(videos_body("v1", &["v2", "v1"])));
}

#[tokio::test]
async fn test_first_refresh_fetches_parts_in_order() {
    let fetcher = ScriptedFetcher::new();
    script_full_channel(&fetcher);
    let sync = synchronizer(fetcher.clone(), SyncSettings::default());

    let refreshed = sync.refresh(&channel_key()).await.unwrap();

    assert!(refreshed.fetched);
    assert!(refreshed.changed);
    assert_eq!(fetcher.parts(), vec![Part::Channel, Part::Playlist, Part::Videos]);
    assert!(fetcher.calls().iter().all(|c| c.etag.is_none()));

    let record = &refreshed.record;
    assert_eq!(record.title(), "Rust Talks");
    assert_eq!(record.playlist.video_ids, vec!["v2", "v1"]);
    assert_eq!(record.videos.items.len(), 2);
    assert_eq!(record.videos.items[0].tags, vec!["rust", "tutorial"]);
    assert_eq!(record.videos.items[0].duration_seconds, 253);
    assert!(record.updated_at.is_some());

    let stored = sync.store().get(&channel_key()).unwrap().unwrap();
    assert_eq!(&stored, record);
    assert!(sync.store().checked_at(&channel_key()).unwrap().is_some());
}

#[tokio::test]
async fn test_unchanged_refresh_is_idempotent() {
    let fetcher = ScriptedFetcher::new();
    script_full_channel(&fetcher);
    let sync = synchronizer(fetcher.clone(), SyncSettings::default());
    let key = channel_key();

    sync.refresh(&key).await.unwrap();
    let before = serde_json::to_string(&sync.store().get(&key).unwrap().unwrap()).unwrap();

    fetcher.push(Part::Channel, CHANNEL, Reply::NotModified);
    fetcher.push(Part::Playlist, UPLOADS, Reply::NotModified);
    fetcher.push(Part::Videos, "v2,v1", Reply::NotModified);

    let refreshed = sync.force_refresh(&key).await.unwrap();
    assert!(refreshed.fetched);
    assert!(!refreshed.changed);

    let after = serde_json::to_string(&sync.store().get(&key).unwrap().unwrap()).unwrap();
    assert_eq!(before, after);

    let calls = fetcher.calls();
    let etags: Vec<Option<String>> = calls[3..].iter().map(|c| c.etag.clone()).collect();
    assert_eq!(
        etags,
        vec![Some("c1".into()), Some("p1".into()), Some("v1".into())]
    );
}

#[tokio::test]
async fn test_fresh_feed_is_served_without_upstream_calls() {
    let fetcher = ScriptedFetcher::new();
    script_full_channel(&fetcher);
    let sync = synchronizer(fetcher.clone(), SyncSettings::default());

    let first = sync.refresh(&channel_key()).await.unwrap();
    let second = sync.refresh(&channel_key()).await.unwrap();

    assert!(!second.fetched);
    assert!(!second.changed);
    assert_eq!(second.record, first.record);
    assert_eq!(fetcher.calls().len(), 3);
}

#[tokio::test]
async fn test_video_failure_keeps_earlier_parts() {
    let fetcher = ScriptedFetcher::new();
    fetcher.push(Part::Channel, CHANNEL, Reply::Body(channel_body("c1", "Rust Talks", UPLOADS)));
    fetcher.push(Part::Playlist, UPLOADS, Reply::Body(playlist_body("p1", &["v1"])));
    fetcher.push(Part::Videos, "v1", Reply::Status(503));
    let sync = synchronizer(fetcher.clone(), SyncSettings::default());

    let err = sync.refresh(&channel_key()).await.unwrap_err();
    assert!(err.is_transport());

    let stored = sync.store().get(&channel_key()).unwrap().unwrap();
    assert_eq!(stored.channel.as_ref().unwrap().etag, "c1");
    assert_eq!(stored.playlist.etag.as_deref(), Some("p1"));
    assert!(stored.videos.etag.is_none());
    assert!(stored.videos.items.is_empty());

    // A failed cycle does not count as a check.
    assert!(sync.store().checked_at(&channel_key()).unwrap().is_none());
}

#[tokio::test]
async fn test_invalid_playlist_keeps_channel_and_drops_playlist() {
    let fetcher = ScriptedFetcher::new();
    fetcher.push(Part::Channel, CHANNEL, Reply::Body(channel_body("c1", "Rust Talks", UPLOADS)));
    let mut playlist = playlist_body("p1", &["v1"]);
    playlist.as_object_mut().unwrap().remove("etag");
    fetcher.push(Part::Playlist, UPLOADS, Reply::Body(playlist));
    let sync = synchronizer(fetcher.clone(), SyncSettings::default());

    let err = sync.refresh(&channel_key()).await.unwrap_err();
    assert!(matches!(err, TubeError::Validation { part: Part::Playlist, .. }));
    assert!(err.is_terminal());
    assert_eq!(fetcher.parts(), vec![Part::Channel, Part::Playlist]);

    let stored = sync.store().get(&channel_key()).unwrap().unwrap();
    assert_eq!(stored.channel.as_ref().unwrap().etag, "c1");
    assert!(stored.playlist.etag.is_none());
    assert!(stored.playlist.video_ids.is_empty());
    assert!(sync.store().checked_at(&channel_key()).unwrap().is_none());
}

#[tokio::test]
async fn test_invalid_video_duration_keeps_earlier_parts() {
    let fetcher = ScriptedFetcher::new();
    fetcher.push(Part::Channel, CHANNEL, Reply::Body(channel_body("c1", "Rust Talks", UPLOADS)));
    fetcher.push(Part::Playlist, UPLOADS, Reply::Body(playlist_body("p1", &["v1"])));
    let mut videos = videos_body("v1", &["v1"]);
    videos["items"][0]["contentDetails"]["duration"] = "four minutes".into();
    fetcher.push(Part::Videos, "v1", Reply::Body(videos));
    let sync = synchronizer(fetcher.clone(), SyncSettings::default());

    let err = sync.refresh(&channel_key()).await.unwrap_err();
    assert!(matches!(err, TubeError::Validation { part: Part::Videos, .. }));

    let stored = sync.store().get(&channel_key()).unwrap().unwrap();
    assert_eq!(stored.channel.as_ref().unwrap().etag, "c1");
    assert_eq!(stored.playlist.etag.as_deref(), Some("p1"));
    assert!(stored.videos.etag.is_none());
    assert!(stored.videos.items.is_empty());
}

/// Store that cannot write records.
struct ReadOnlyStore(SqliteStore);

impl Store for ReadOnlyStore {
    fn get(&self, key: &FeedKey) -> Result<Option<FeedRecord>> {
        self.0.get(key)
    }

    fn put(&self, _key: &FeedKey, _record: &FeedRecord) -> Result<()> {
        Err(TubeError::Io(std::io::Error::other("disk full")))
    }

    fn delete(&self, key: &FeedKey) -> Result<bool> {
        self.0.delete(key)
    }

    fn list_keys(&self) -> Result<Vec<FeedKey>> {
        self.0.list_keys()
    }

    fn checked_at(&self, key: &FeedKey) -> Result<Option<DateTime<Utc>>> {
        self.0.checked_at(key)
    }

    fn mark_checked(&self, key: &FeedKey, at: DateTime<Utc>) -> Result<()> {
        self.0.mark_checked(key, at)
    }
}

#[tokio::test]
async fn test_stage_error_survives_failed_persist() {
    let fetcher = ScriptedFetcher::new();
    fetcher.push(Part::Channel, CHANNEL, Reply::Body(channel_body("c1", "Rust Talks", UPLOADS)));
    fetcher.push(Part::Playlist, UPLOADS, Reply::Status(503));

    let api = YouTubeApi::new(fetcher.clone(), &api_config(), 15).unwrap();
    let store = Arc::new(ReadOnlyStore(SqliteStore::in_memory().unwrap()));
    let sync = Synchronizer::new(api, store, SyncSettings::default());

    let err = sync.refresh(&channel_key()).await.unwrap_err();
    assert!(matches!(err, TubeError::Status { part: Part::Playlist, status: 503 }));
}

#[tokio::test]
async fn test_missing_channel_stops_the_cycle() {
    let fetcher = ScriptedFetcher::new();
    fetcher.push(Part::Channel, CHANNEL, Reply::Body(empty_body("c0")));
    let sync = synchronizer(fetcher.clone(), SyncSettings::default());

    let err = sync.refresh(&channel_key()).await.unwrap_err();
    assert!(matches!(err, TubeError::NotFound { part: Part::Channel, .. }));
    assert_eq!(fetcher.parts(), vec![Part::Channel]);
    assert!(sync.store().get(&channel_key()).unwrap().is_none());
}

#[tokio::test]
async fn test_channel_failure_skips_later_stages() {
    let fetcher = ScriptedFetcher::new();
    fetcher.push(Part::Channel, CHANNEL, Reply::Status(500));
    let sync = synchronizer(fetcher.clone(), SyncSettings::default());

    assert!(sync.refresh(&channel_key()).await.is_err());
    assert_eq!(fetcher.parts(), vec![Part::Channel]);
}

#[tokio::test]
async fn test_unknown_uploads_playlist_skips_videos() {
    let fetcher = ScriptedFetcher::new();
    fetcher.push(Part::Channel, CHANNEL, Reply::Body(channel_body("c1", "No Uploads", "")));
    let sync = synchronizer(fetcher.clone(), SyncSettings::default());

    let refreshed = sync.refresh(&channel_key()).await.unwrap();
    assert_eq!(fetcher.parts(), vec![Part::Channel]);
    assert!(refreshed.record.channel.is_some());
    assert!(refreshed.record.videos.items.is_empty());
}

#[tokio::test]
async fn test_playlist_change_refetches_videos_without_etag() {
    let fetcher = ScriptedFetcher::new();
    script_full_channel(&fetcher);
    let sync = synchronizer(fetcher.clone(), SyncSettings::default());
    let key = channel_key();
    sync.refresh(&key).await.unwrap();

    fetcher.push(Part::Channel, CHANNEL, Reply::NotModified);
    fetcher.push(Part::Playlist, UPLOADS, Reply::Body(playlist_body("p2", &["v3", "v2", "v1"])));
    fetcher.push(Part::Videos, "v3,v2,v1", Reply::Body(videos_body("v2", &["v3", "v2", "v1"])));

    let refreshed = sync.force_refresh(&key).await.unwrap();
    assert!(refreshed.changed);

    let videos_call = fetcher.calls().into_iter().last().unwrap();
    assert_eq!(videos_call.part, Part::Videos);
    assert!(videos_call.etag.is_none());

    let record = refreshed.record;
    assert_eq!(record.channel.as_ref().unwrap().etag, "c1");
    assert_eq!(record.playlist.etag.as_deref(), Some("p2"));
    assert_eq!(record.videos.etag.as_deref(), Some("v2"));
    assert_eq!(record.videos.items[0].id, "v3");
}

#[tokio::test]
async fn test_video_list_is_bounded_to_newest() {
    let fetcher = ScriptedFetcher::new();
    let settings = SyncSettings {
        results_limit: 2,
        ..SyncSettings::default()
    };
    let key = FeedKey::playlist("PLlong").unwrap();
    fetcher.push(Part::Playlist, "PLlong", Reply::Body(playlist_body("p1", &["d", "c", "b", "a"])));
    fetcher.push(Part::Videos, "d,c", Reply::Body(videos_body("v1", &["d", "c"])));
    let sync = synchronizer(fetcher.clone(), settings);

    let record = sync.refresh(&key).await.unwrap().record;

    assert_eq!(record.playlist.video_ids, vec!["d", "c"]);
    let ids: Vec<&str> = record.videos.items.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["d", "c"]);

    let calls = fetcher.calls();
    let playlist_call = &calls[0];
    assert!(playlist_call
        .url
        .query_pairs()
        .any(|(k, v)| k == "maxResults" && v == "2"));
}

#[tokio::test]
async fn test_playlist_feed_never_asks_for_channel() {
    let fetcher = ScriptedFetcher::new();
    let key = FeedKey::playlist("PLmix").unwrap();
    fetcher.push(Part::Playlist, "PLmix", Reply::Body(playlist_body("p1", &["a"])));
    fetcher.push(Part::Videos, "a", Reply::Body(videos_body("v1", &["a"])));
    let sync = synchronizer(fetcher.clone(), SyncSettings::default());

    let record = sync.refresh(&key).await.unwrap().record;
    assert_eq!(fetcher.parts(), vec![Part::Playlist, Part::Videos]);
    assert!(record.channel.is_none());
    assert_eq!(record.title(), "Playlist PLmix");
}

#[tokio::test]
async fn test_empty_playlist_makes_no_video_call() {
    let fetcher = ScriptedFetcher::new();
    let key = FeedKey::playlist("PLempty").unwrap();
    fetcher.push(Part::Playlist, "PLempty", Reply::Body(empty_body("p0")));
    let sync = synchronizer(fetcher.clone(), SyncSettings::default());

    let refreshed = sync.refresh(&key).await.unwrap();
    assert_eq!(fetcher.parts(), vec![Part::Playlist]);
    assert!(refreshed.changed);
    assert!(refreshed.record.videos.items.is_empty());
}

#[tokio::test]
async fn test_call_timeout_is_a_transport_failure() {
    let fetcher = ScriptedFetcher::new();
    fetcher.push(Part::Channel, CHANNEL, Reply::Hang);
    let settings = SyncSettings {
        call_timeout: Duration::from_millis(50),
        ..SyncSettings::default()
    };
    let sync = synchronizer(fetcher.clone(), settings);

    let err = sync.refresh(&channel_key()).await.unwrap_err();
    assert!(matches!(err, TubeError::Timeout(_)));
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_cancellation_persists_merged_parts() {
    let fetcher = ScriptedFetcher::new();
    fetcher.push(Part::Channel, CHANNEL, Reply::Body(channel_body("c1", "Rust Talks", UPLOADS)));
    fetcher.push(Part::Playlist, UPLOADS, Reply::Body(playlist_body("p1", &["v1"])));
    fetcher.push(Part::Videos, "v1", Reply::Hang);
    let sync = synchronizer(fetcher.clone(), SyncSettings::default());

    let cancel = tokio::time::sleep(Duration::from_millis(100));
    let err = sync
        .refresh_until(&channel_key(), false, cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, TubeError::Cancelled));

    let stored = sync.store().get(&channel_key()).unwrap().unwrap();
    assert_eq!(stored.playlist.video_ids, vec!["v1"]);
    assert!(stored.videos.items.is_empty());
}

#[tokio::test]
async fn test_cancel_while_waiting_for_key_returns_promptly() {
    let fetcher = ScriptedFetcher::new();
    fetcher.push(Part::Channel, CHANNEL, Reply::Hang);
    let settings = SyncSettings {
        call_timeout: Duration::from_secs(2),
        ..SyncSettings::default()
    };
    let sync = synchronizer(fetcher.clone(), settings);

    let holder = {
        let sync = sync.clone();
        tokio::spawn(async move { sync.refresh(&channel_key()).await })
    };
    // Let the first cycle take the key.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    let key = channel_key();
    let err = sync
        .refresh_until(&key, false, tokio::time::sleep(Duration::from_millis(100)))
        .await
        .unwrap_err();

    assert!(matches!(err, TubeError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(fetcher.parts(), vec![Part::Channel]);

    holder.abort();
    assert!(sync.store().get(&key).unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_refreshes_of_one_key_do_not_interleave() {
    let fetcher = ScriptedFetcher::new();
    script_full_channel(&fetcher);
    let sync = synchronizer(fetcher.clone(), SyncSettings::default());
    let key = channel_key();

    let (a, b) = tokio::join!(sync.refresh(&key), sync.refresh(&key));
    let (a, b) = (a.unwrap(), b.unwrap());

    // The second cycle finds the first one's fresh record.
    assert_eq!(fetcher.calls().len(), 3);
    assert!(a.fetched != b.fetched);
    assert_eq!(a.record, b.record);
}

#[tokio::test]
async fn test_refresh_all_reports_each_feed() {
    let fetcher = ScriptedFetcher::new();
    fetcher.push(Part::Playlist, "PLone", Reply::Body(playlist_body("p1", &["a"])));
    fetcher.push(Part::Videos, "a", Reply::Body(videos_body("v1", &["a"])));
    fetcher.push(Part::Playlist, "PLtwo", Reply::Status(500));
    let sync = synchronizer(fetcher.clone(), SyncSettings::default());

    let keys = vec![
        FeedKey::playlist("PLone").unwrap(),
        FeedKey::playlist("PLtwo").unwrap(),
    ];
    let results = sync.refresh_all(keys.clone()).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, keys[0]);
    assert!(results[0].1.as_ref().unwrap().changed);
    assert_eq!(results[1].0, keys[1]);
    assert!(results[1].1.is_err());
}
