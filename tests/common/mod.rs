//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use url::Url;

use tuberss::app::{Result, TubeError};
use tuberss::config::ApiConfig;
use tuberss::domain::Part;
use tuberss::fetcher::{FetchResult, Fetcher, YouTubeApi};
use tuberss::store::SqliteStore;
use tuberss::sync::{SyncSettings, Synchronizer};

pub enum Reply {
    Body(Value),
    NotModified,
    Status(u16),
    Hang,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub part: Part,
    pub target: String,
    pub etag: Option<String>,
    pub url: Url,
}

/// In-process upstream: replies are scripted per part and target id and
/// consumed in order. Every call is recorded.
#[derive(Default)]
pub struct ScriptedFetcher {
    replies: Mutex<HashMap<(Part, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, part: Part, target: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry((part, target.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn parts(&self) -> Vec<Part> {
        self.calls().into_iter().map(|c| c.part).collect()
    }
}

fn target(url: &Url) -> String {
    let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();
    pairs
        .get("playlistId")
        .or_else(|| pairs.get("id"))
        .cloned()
        .unwrap_or_default()
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, part: Part, url: &Url, etag: Option<&str>) -> Result<FetchResult> {
        let target = target(url);
        self.calls.lock().unwrap().push(Call {
            part,
            target: target.clone(),
            etag: etag.map(String::from),
            url: url.clone(),
        });

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&(part, target.clone()))
            .and_then(|queue| queue.pop_front());

        match reply {
            Some(Reply::Body(value)) => Ok(FetchResult::Content {
                body: serde_json::to_vec(&value).unwrap(),
                etag: None,
            }),
            Some(Reply::NotModified) => Ok(FetchResult::NotModified),
            Some(Reply::Status(status)) => Err(TubeError::Status { part, status }),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(TubeError::Status { part, status: 504 })
            }
            None => panic!("unscripted {} call for {:?}", part, target),
        }
    }
}

pub fn api_config() -> ApiConfig {
    ApiConfig {
        key: "test-key".into(),
        ..ApiConfig::default()
    }
}

pub fn synchronizer(
    fetcher: Arc<ScriptedFetcher>,
    settings: SyncSettings,
) -> Arc<Synchronizer<SqliteStore>> {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let api = YouTubeApi::new(fetcher, &api_config(), settings.results_limit).unwrap();
    Arc::new(Synchronizer::new(api, store, settings))
}

pub fn channel_body(etag: &str, title: &str, uploads: &str) -> Value {
    json!({
        "etag": etag,
        "items": [{
            "snippet": {
                "title": title,
                "description": "Videos about things",
                "publishedAt": "2015-03-01T10:00:00Z",
                "thumbnails": { "default": { "url": "https://yt3.ggpht.com/avatar.jpg" } }
            },
            "contentDetails": { "relatedPlaylists": { "uploads": uploads } }
        }]
    })
}

pub fn empty_body(etag: &str) -> Value {
    json!({ "etag": etag, "items": [] })
}

pub fn playlist_body(etag: &str, ids: &[&str]) -> Value {
    let items: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "contentDetails": { "videoId": id } }))
        .collect();
    json!({ "etag": etag, "items": items })
}

pub fn video(id: &str) -> Value {
    json!({
        "id": id,
        "snippet": {
            "title": format!("Video {}", id),
            "description": format!("About {}\nMore at https://example.com/{}", id, id),
            "publishedAt": "2024-05-01T12:00:00Z",
            "tags": ["rust", "tutorial", "rust"],
            "liveBroadcastContent": "none",
            "thumbnails": {
                "standard": { "url": format!("https://i.ytimg.com/vi/{}/sddefault.jpg", id) }
            }
        },
        "contentDetails": { "duration": "PT4M13S" }
    })
}

pub fn videos_body(etag: &str, ids: &[&str]) -> Value {
    let items: Vec<Value> = ids.iter().map(|id| video(id)).collect();
    json!({ "etag": etag, "items": items })
}
