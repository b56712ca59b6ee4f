use serde::Serialize;

use crate::app::Result;
use crate::domain::FeedRecord;
use crate::render::{FeedFormat, RenderOptions, Renderer};

const JSON_FEED_VERSION: &str = "https://jsonfeed.org/version/1.1";

#[derive(Serialize)]
struct JsonFeed<'a> {
    version: &'static str,
    title: String,
    home_page_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    feed_url: Option<String>,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<&'a str>,
    authors: Vec<Author>,
    items: Vec<Item<'a>>,
}

#[derive(Serialize)]
struct Author {
    name: String,
    url: String,
}

#[derive(Serialize)]
struct Item<'a> {
    id: &'a str,
    url: &'a str,
    title: String,
    content_html: String,
    image: &'a str,
    date_published: String,
    tags: &'a [String],
}

pub(super) fn build(renderer: &Renderer, record: &FeedRecord, options: &RenderOptions) -> Result<Vec<u8>> {
    let items = record
        .videos
        .items
        .iter()
        .map(|video| Item {
            id: &video.id,
            url: &video.url,
            title: renderer.item_title(video, options),
            content_html: renderer.item_body(video, options),
            image: &video.thumbnail_url,
            date_published: video.published_at.to_rfc3339(),
            tags: &video.tags,
        })
        .collect();

    let feed = JsonFeed {
        version: JSON_FEED_VERSION,
        title: record.title(),
        home_page_url: record.link(),
        feed_url: renderer.feed_link(record.key(), Some(FeedFormat::Json), options.embed_videos),
        description: record.description(),
        icon: record.thumbnail_url(),
        authors: vec![Author {
            name: record.title(),
            url: record.link(),
        }],
        items,
    };

    Ok(serde_json::to_vec_pretty(&feed)?)
}
