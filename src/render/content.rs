//! Title and body construction shared by every output format.

use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};
use regex::Regex;

use crate::app::{Result, TubeError};
use crate::domain::VideoItem;
use crate::time::format_timestamp;

const URL_PATTERN: &str = r#"https?://(?:www\.)?[a-zA-Z0-9.\-]{2,256}\.[a-z]{2,20}(?::[0-9]{2,4})?(?:/[a-zA-Z0-9@:%_+.,~#"!?&/=*\-]+|/)?"#;

const EMBED_HOST: &str = "https://www.youtube.com";
const EMBED_HOST_NO_COOKIE: &str = "https://www.youtube-nocookie.com";

/// Item title, reflecting broadcast state at `now`.
///
/// `scheduled_pattern` formats the start time of upcoming broadcasts.
pub fn title(video: &VideoItem, now: DateTime<Utc>, scheduled_pattern: &str) -> String {
    if let Some(live) = &video.live_stream {
        let scheduled = format_timestamp(&live.scheduled_at, scheduled_pattern);

        if live.scheduled_at > now {
            if video.has_duration() {
                return format!("[Premiere {}] {} ({})", scheduled, video.title, video.duration());
            }
            return format!("[Live Stream {}] {}", scheduled, video.title);
        }

        if !video.has_duration() {
            return format!("[Live] {}", video.title);
        }
    }

    format!("{} ({})", video.title, video.duration())
}

pub fn embed_url(video_id: &str, privacy: bool) -> String {
    let host = if privacy { EMBED_HOST_NO_COOKIE } else { EMBED_HOST };
    format!("{}/embed/{}", host, video_id)
}

/// Turns the first URL of each description line into a link.
#[derive(Debug, Clone)]
pub struct Linkifier {
    urls: Regex,
}

impl Linkifier {
    pub fn new() -> Result<Self> {
        let urls = Regex::new(URL_PATTERN)
            .map_err(|e| TubeError::Config(format!("Invalid URL pattern: {}", e)))?;
        Ok(Self { urls })
    }

    /// Escape `text` for HTML, ending every line with `<br/>`.
    pub fn linkify(&self, text: &str) -> String {
        if text.is_empty() {
            return " ".to_string();
        }

        let mut out = String::with_capacity(text.len() * 2);

        for line in text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);

            match self.urls.find(line) {
                Some(found) => {
                    let url = found.as_str();
                    let link = format!(
                        r#"<a target="_blank" href="{}">{}</a>"#,
                        encode_double_quoted_attribute(url),
                        encode_text(url)
                    );

                    let mut segments = line.split(url);
                    if let Some(first) = segments.next() {
                        out.push_str(&encode_text(first));
                    }
                    for segment in segments {
                        out.push_str(&link);
                        out.push_str(&encode_text(segment));
                    }
                }
                None => out.push_str(&encode_text(line)),
            }

            out.push_str("<br/>");
        }

        out
    }
}

/// HTML body of one item: player or thumbnail, publication line, description.
pub fn body(
    video: &VideoItem,
    linkifier: &Linkifier,
    date_pattern: &str,
    embed: bool,
    privacy: bool,
) -> String {
    let media = if embed {
        format!(
            r#"<iframe width="100%" height="410" src="{}" frameborder="0" allow="encrypted-media;" loading="lazy" allowfullscreen></iframe>"#,
            encode_double_quoted_attribute(&embed_url(&video.id, privacy))
        )
    } else {
        format!(
            r#"<a target="_blank" title="Watch on YouTube" href="{}"><img title="video thumbnail" src="{}" loading="lazy"/></a>"#,
            encode_double_quoted_attribute(&video.url),
            encode_double_quoted_attribute(&video.thumbnail_url)
        )
    };

    format!(
        r#"{}<hr/>Published: <time datetime="{}">{}</time> - Duration: <span class="duration">{}</span><hr/><p>{}</p>"#,
        media,
        video.published_at.to_rfc3339(),
        encode_text(&format_timestamp(&video.published_at, date_pattern)),
        video.duration(),
        linkifier.linkify(&video.description)
    )
}
