use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::{Result, TubeError};
use crate::domain::VideoItem;

const MAX_ID_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    Channel,
    Playlist,
}

impl FeedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedType::Channel => "channel",
            FeedType::Playlist => "playlist",
        }
    }
}

impl fmt::Display for FeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedType {
    type Err = TubeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "channel" => Ok(FeedType::Channel),
            "playlist" => Ok(FeedType::Playlist),
            other => Err(TubeError::InvalidFeedType(other.to_string())),
        }
    }
}

/// One of the independently cached upstream resources of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Part {
    Channel,
    Playlist,
    Videos,
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Part::Channel => "channel",
            Part::Playlist => "playlist",
            Part::Videos => "videos",
        };
        f.write_str(name)
    }
}

impl From<FeedType> for Part {
    fn from(feed_type: FeedType) -> Self {
        match feed_type {
            FeedType::Channel => Part::Channel,
            FeedType::Playlist => Part::Playlist,
        }
    }
}

/// Identifies a feed: what kind of upstream resource it follows and its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedKey {
    feed_type: FeedType,
    id: String,
}

impl FeedKey {
    pub fn new(feed_type: FeedType, id: impl Into<String>) -> Result<Self> {
        let id = id.into().trim().to_string();

        let valid_chars = id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if id.is_empty() || id.len() > MAX_ID_LEN || !valid_chars {
            return Err(TubeError::InvalidFeedId(id));
        }

        Ok(Self { feed_type, id })
    }

    pub fn channel(id: impl Into<String>) -> Result<Self> {
        Self::new(FeedType::Channel, id)
    }

    pub fn playlist(id: impl Into<String>) -> Result<Self> {
        Self::new(FeedType::Playlist, id)
    }

    /// Parse the `type:id` form produced by [`FeedKey::storage_key`].
    pub fn parse_storage_key(value: &str) -> Result<Self> {
        let (feed_type, id) = value
            .split_once(':')
            .ok_or_else(|| TubeError::InvalidFeedId(value.to_string()))?;
        Self::new(feed_type.parse()?, id)
    }

    pub fn feed_type(&self) -> FeedType {
        self.feed_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.feed_type, self.id)
    }

    /// Public page of the channel or playlist.
    pub fn url(&self) -> String {
        match self.feed_type {
            FeedType::Channel => format!("https://www.youtube.com/channel/{}", self.id),
            FeedType::Playlist => format!("https://www.youtube.com/playlist?list={}", self.id),
        }
    }
}

impl fmt::Display for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.feed_type, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub uploads_playlist_id: String,
    pub thumbnail_url: String,
    pub etag: String,
}

impl ChannelInfo {
    pub fn url(&self) -> String {
        format!("https://www.youtube.com/channel/{}", self.id)
    }
}

/// Video ids of the polled playlist, newest first as upstream orders them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaylistState {
    pub etag: Option<String>,
    pub video_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoSet {
    pub etag: Option<String>,
    pub items: Vec<VideoItem>,
}

/// Accumulated state of one feed; the unit of persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRecord {
    key: FeedKey,
    pub channel: Option<ChannelInfo>,
    pub playlist: PlaylistState,
    pub videos: VideoSet,
    pub updated_at: Option<DateTime<Utc>>,
}

impl FeedRecord {
    pub fn new(key: FeedKey) -> Self {
        Self {
            key,
            channel: None,
            playlist: PlaylistState::default(),
            videos: VideoSet::default(),
            updated_at: None,
        }
    }

    pub fn key(&self) -> &FeedKey {
        &self.key
    }

    /// Playlist to poll for videos, if it is known yet.
    ///
    /// Channel feeds only learn it from the channel part, so this is `None`
    /// until a channel payload has been merged.
    pub fn playlist_source(&self) -> Option<&str> {
        match self.key.feed_type() {
            FeedType::Playlist => Some(self.key.id()),
            FeedType::Channel => self
                .channel
                .as_ref()
                .map(|c| c.uploads_playlist_id.as_str())
                .filter(|id| !id.is_empty()),
        }
    }

    pub fn etag(&self, part: Part) -> Option<&str> {
        match part {
            Part::Channel => self.channel.as_ref().map(|c| c.etag.as_str()),
            Part::Playlist => self.playlist.etag.as_deref(),
            Part::Videos => self.videos.etag.as_deref(),
        }
    }

    /// Whether a payload for `part` has ever been merged.
    pub fn has_part(&self, part: Part) -> bool {
        self.etag(part).is_some()
    }

    pub fn title(&self) -> String {
        match &self.channel {
            Some(channel) => channel.title.clone(),
            None => match self.key.feed_type() {
                FeedType::Channel => format!("Channel {}", self.key.id()),
                FeedType::Playlist => format!("Playlist {}", self.key.id()),
            },
        }
    }

    pub fn description(&self) -> &str {
        self.channel
            .as_ref()
            .map(|c| c.description.as_str())
            .unwrap_or("")
    }

    pub fn link(&self) -> String {
        match &self.channel {
            Some(channel) => channel.url(),
            None => self.key.url(),
        }
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        self.channel
            .as_ref()
            .map(|c| c.thumbnail_url.as_str())
            .filter(|url| !url.is_empty())
    }
}
