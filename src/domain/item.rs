use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::format_duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoItem {
    pub id: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub duration_seconds: u64,
    pub thumbnail_url: String,
    pub live_stream: Option<LiveStream>,
}

/// Broadcast details; only present for videos upstream marks as broadcasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveStream {
    pub scheduled_at: DateTime<Utc>,
    pub is_live: bool,
    pub is_premiere: bool,
}

impl VideoItem {
    pub fn watch_url(id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}", id)
    }

    pub fn fallback_thumbnail(id: &str) -> String {
        format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id)
    }

    pub fn duration(&self) -> String {
        format_duration(self.duration_seconds)
    }

    pub fn has_duration(&self) -> bool {
        self.duration_seconds > 0
    }
}
