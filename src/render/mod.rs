//! Rendering a [`FeedRecord`] as RSS, HTML or JSON Feed.
//!
//! Rendering is a pure projection of the record: it performs no I/O and
//! never triggers a refresh. An empty record renders as a feed without items.

pub mod content;
mod html;
mod json;
mod rss;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use url::Url;

use crate::app::{Result, TubeError};
use crate::config::FormatConfig;
use crate::domain::{FeedKey, FeedRecord, VideoItem};
use crate::time::http_date;

pub use content::Linkifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedFormat {
    #[default]
    Rss,
    Html,
    Json,
}

impl FeedFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedFormat::Rss => "rss",
            FeedFormat::Html => "html",
            FeedFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FeedFormat::Rss => "text/xml; charset=UTF-8",
            FeedFormat::Html => "text/html; charset=UTF-8",
            FeedFormat::Json => "application/json; charset=UTF-8",
        }
    }
}

impl fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedFormat {
    type Err = TubeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rss" | "xml" => Ok(FeedFormat::Rss),
            "html" => Ok(FeedFormat::Html),
            "json" => Ok(FeedFormat::Json),
            other => Err(TubeError::Config(format!("Unknown feed format: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub embed_videos: bool,
    /// Reference time for broadcast state in item titles
    pub now: DateTime<Utc>,
}

impl RenderOptions {
    pub fn new(embed_videos: bool) -> Self {
        Self {
            embed_videos,
            now: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rendered {
    pub body: Vec<u8>,
    pub content_type: &'static str,
    /// `Last-Modified` value; `None` until the record has been merged once
    pub last_modified: Option<String>,
}

pub struct Renderer {
    config: FormatConfig,
    linkifier: Linkifier,
}

impl Renderer {
    pub fn new(config: FormatConfig) -> Result<Self> {
        Ok(Self {
            config,
            linkifier: Linkifier::new()?,
        })
    }

    pub fn render(
        &self,
        format: FeedFormat,
        record: &FeedRecord,
        options: &RenderOptions,
    ) -> Result<Rendered> {
        let body = match format {
            FeedFormat::Rss => rss::build(self, record, options).into_bytes(),
            FeedFormat::Html => html::build(self, record, options).into_bytes(),
            FeedFormat::Json => json::build(self, record, options)?,
        };

        Ok(Rendered {
            body,
            content_type: format.content_type(),
            last_modified: record.updated_at.as_ref().map(http_date),
        })
    }

    pub(crate) fn item_title(&self, video: &VideoItem, options: &RenderOptions) -> String {
        let pattern = format!("{} {}", self.config.date_format, self.config.time_format);
        content::title(video, options.now, &pattern)
    }

    pub(crate) fn item_body(&self, video: &VideoItem, options: &RenderOptions) -> String {
        content::body(
            video,
            &self.linkifier,
            &self.config.date_format,
            options.embed_videos,
            self.config.embed_privacy,
        )
    }

    /// Link back to this service for `key`, optionally in another format.
    ///
    /// `None` when no usable `self_url` is configured.
    pub fn feed_link(&self, key: &FeedKey, format: Option<FeedFormat>, embed: bool) -> Option<String> {
        let mut url = Url::parse(self.config.self_url.trim()).ok()?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair(&format!("{}_id", key.feed_type()), key.id());
            if embed {
                query.append_pair("embed_videos", "true");
            }
            if let Some(format) = format {
                query.append_pair("format", format.as_str());
            }
        }

        Some(url.to_string())
    }
}
