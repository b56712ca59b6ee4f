//! Validating decode of upstream responses.
//!
//! Upstream JSON is loosely typed; every required field is checked here and a
//! missing one is reported as [`TubeError::Validation`] instead of being
//! carried into the record as an empty value.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::app::{Result, TubeError};
use crate::domain::{ChannelInfo, LiveStream, Part, VideoItem};
use crate::fetcher::PartRequest;
use crate::time::parse_duration;

/// A decoded, successful part response. Each variant carries the etag that
/// came with exactly this data.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Channel {
        etag: String,
        channels: Vec<ChannelInfo>,
    },
    Playlist {
        etag: String,
        video_ids: Vec<String>,
    },
    Videos {
        etag: String,
        items: Vec<VideoItem>,
    },
}

impl Payload {
    pub fn part(&self) -> Part {
        match self {
            Payload::Channel { .. } => Part::Channel,
            Payload::Playlist { .. } => Part::Playlist,
            Payload::Videos { .. } => Part::Videos,
        }
    }

    pub fn etag(&self) -> &str {
        match self {
            Payload::Channel { etag, .. }
            | Payload::Playlist { etag, .. }
            | Payload::Videos { etag, .. } => etag,
        }
    }
}

#[derive(Deserialize)]
struct ListResponse<T> {
    etag: Option<String>,
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Deserialize, Default)]
struct Thumbnails {
    default: Option<Thumbnail>,
    standard: Option<Thumbnail>,
    maxres: Option<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelResource {
    snippet: Option<ChannelSnippet>,
    content_details: Option<ChannelContentDetails>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelSnippet {
    title: Option<String>,
    description: Option<String>,
    published_at: Option<DateTime<Utc>>,
    thumbnails: Option<Thumbnails>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: Option<RelatedPlaylists>,
}

#[derive(Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemResource {
    content_details: Option<PlaylistItemDetails>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemDetails {
    video_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResource {
    id: Option<String>,
    snippet: Option<VideoSnippet>,
    content_details: Option<VideoContentDetails>,
    live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    title: Option<String>,
    description: Option<String>,
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    tags: Vec<String>,
    live_broadcast_content: Option<String>,
    thumbnails: Option<Thumbnails>,
}

#[derive(Deserialize)]
struct VideoContentDetails {
    duration: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveStreamingDetails {
    scheduled_start_time: Option<DateTime<Utc>>,
    actual_start_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    domain: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

/// Decode a successful response for `request`. `header_etag` is used when the
/// body carries no etag of its own.
pub fn decode(request: &PartRequest<'_>, body: &[u8], header_etag: Option<&str>) -> Result<Payload> {
    match *request {
        PartRequest::Channel(id) => decode_channel(id, body, header_etag),
        PartRequest::Playlist(_) => decode_playlist(body, header_etag),
        PartRequest::Videos(_) => decode_videos(body, header_etag),
    }
}

fn parse_list<T: for<'de> Deserialize<'de>>(part: Part, body: &[u8]) -> Result<ListResponse<T>> {
    serde_json::from_slice(body).map_err(|e| TubeError::validation(part, e.to_string()))
}

fn payload_etag(part: Part, body_etag: Option<String>, header_etag: Option<&str>) -> Result<String> {
    body_etag
        .or_else(|| header_etag.map(String::from))
        .filter(|etag| !etag.is_empty())
        .ok_or_else(|| TubeError::validation(part, "response carries no etag"))
}

fn required<T>(part: Part, value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| TubeError::validation(part, format!("missing {}", field)))
}

fn decode_channel(channel_id: &str, body: &[u8], header_etag: Option<&str>) -> Result<Payload> {
    let part = Part::Channel;
    let response: ListResponse<ChannelResource> = parse_list(part, body)?;
    let etag = payload_etag(part, response.etag, header_etag)?;

    let channels = response
        .items
        .into_iter()
        .map(|item| {
            let snippet = required(part, item.snippet, "snippet")?;
            let uploads = item
                .content_details
                .and_then(|d| d.related_playlists)
                .and_then(|p| p.uploads);

            Ok(ChannelInfo {
                id: channel_id.to_string(),
                title: required(part, snippet.title, "snippet.title")?,
                description: snippet.description.unwrap_or_default(),
                published_at: required(part, snippet.published_at, "snippet.publishedAt")?,
                uploads_playlist_id: required(
                    part,
                    uploads,
                    "contentDetails.relatedPlaylists.uploads",
                )?,
                thumbnail_url: snippet
                    .thumbnails
                    .and_then(|t| t.default)
                    .map(|t| t.url)
                    .unwrap_or_default(),
                etag: etag.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Payload::Channel { etag, channels })
}

fn decode_playlist(body: &[u8], header_etag: Option<&str>) -> Result<Payload> {
    let part = Part::Playlist;
    let response: ListResponse<PlaylistItemResource> = parse_list(part, body)?;
    let etag = payload_etag(part, response.etag, header_etag)?;

    let video_ids = response
        .items
        .into_iter()
        .map(|item| {
            let id = item.content_details.and_then(|d| d.video_id);
            required(part, id, "contentDetails.videoId")
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Payload::Playlist { etag, video_ids })
}

fn decode_videos(body: &[u8], header_etag: Option<&str>) -> Result<Payload> {
    let part = Part::Videos;
    let response: ListResponse<VideoResource> = parse_list(part, body)?;
    let etag = payload_etag(part, response.etag, header_etag)?;

    let items = response
        .items
        .into_iter()
        .map(decode_video)
        .collect::<Result<Vec<_>>>()?;

    Ok(Payload::Videos { etag, items })
}

fn decode_video(item: VideoResource) -> Result<VideoItem> {
    let part = Part::Videos;
    let id = required(part, item.id, "id")?;
    let snippet = required(part, item.snippet, "snippet")?;
    let raw_duration = required(
        part,
        item.content_details.and_then(|d| d.duration),
        "contentDetails.duration",
    )?;
    let duration_seconds = parse_duration(&raw_duration).ok_or_else(|| {
        TubeError::validation(part, format!("unparseable duration {:?} for {}", raw_duration, id))
    })?;
    let published_at = required(part, snippet.published_at, "snippet.publishedAt")?;

    let live_stream = item.live_streaming_details.map(|details| {
        let state = snippet.live_broadcast_content.as_deref().unwrap_or("none");
        LiveStream {
            scheduled_at: details
                .scheduled_start_time
                .or(details.actual_start_time)
                .unwrap_or(published_at),
            is_live: state == "live",
            is_premiere: state == "upcoming" && duration_seconds > 0,
        }
    });

    let thumbnails = snippet.thumbnails.unwrap_or_default();
    let thumbnail_url = thumbnails
        .maxres
        .or(thumbnails.standard)
        .map(|t| t.url)
        .unwrap_or_else(|| VideoItem::fallback_thumbnail(&id));

    let mut tags: Vec<String> = Vec::with_capacity(snippet.tags.len());
    for tag in snippet.tags {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    Ok(VideoItem {
        url: VideoItem::watch_url(&id),
        title: required(part, snippet.title, "snippet.title")?,
        description: snippet.description.unwrap_or_default(),
        published_at,
        tags,
        duration_seconds,
        thumbnail_url,
        live_stream,
        id,
    })
}

/// Map a non-success response to an error, keeping the upstream
/// domain/reason/message when the body has them.
pub fn decode_error(part: Part, status: u16, body: &[u8], raw: bool) -> TubeError {
    let value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) => return TubeError::Status { part, status },
    };

    let envelope: ErrorEnvelope = match serde_json::from_value(value.clone()) {
        Ok(envelope) => envelope,
        Err(_) => return TubeError::Status { part, status },
    };

    let first = envelope.error.errors.into_iter().next();
    let (domain, reason, mut message) = match first {
        Some(detail) => (detail.domain, detail.reason, detail.message),
        None => (String::new(), String::new(), String::new()),
    };

    if message.is_empty() {
        message = envelope.error.message.unwrap_or_default();
    }

    if raw {
        if let Some(error) = value.get("error") {
            message = serde_json::to_string_pretty(error).unwrap_or(message);
        }
    }

    TubeError::Api {
        part,
        domain,
        reason,
        message,
    }
}
