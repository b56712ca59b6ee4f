use rss::extension::atom::{AtomExtension, Link};
use rss::{
    Category, ChannelBuilder, EnclosureBuilder, Guid, ImageBuilder, Item, ItemBuilder,
};

use crate::domain::{FeedRecord, VideoItem};
use crate::render::{FeedFormat, RenderOptions, Renderer};

pub(super) fn build(renderer: &Renderer, record: &FeedRecord, options: &RenderOptions) -> String {
    let title = record.title();
    let link = record.link();

    let items: Vec<Item> = record
        .videos
        .items
        .iter()
        .map(|video| build_item(renderer, video, &title, options))
        .collect();

    let image = record.thumbnail_url().map(|url| {
        ImageBuilder::default()
            .url(url)
            .title(title.as_str())
            .link(link.as_str())
            .build()
    });

    let atom_ext = renderer
        .feed_link(record.key(), Some(FeedFormat::Rss), options.embed_videos)
        .map(|href| AtomExtension {
            links: vec![Link {
                href,
                rel: "self".into(),
                mime_type: Some("application/rss+xml".into()),
                ..Default::default()
            }],
        });

    let channel = ChannelBuilder::default()
        .title(title.as_str())
        .link(link.as_str())
        .description(record.description())
        .last_build_date(record.updated_at.map(|t| t.to_rfc2822()))
        .image(image)
        .atom_ext(atom_ext)
        .items(items)
        .build();

    channel.to_string()
}

fn build_item(renderer: &Renderer, video: &VideoItem, author: &str, options: &RenderOptions) -> Item {
    let categories: Vec<Category> = video
        .tags
        .iter()
        .map(|tag| Category {
            name: tag.clone(),
            domain: None,
        })
        .collect();

    let enclosure = EnclosureBuilder::default()
        .url(video.thumbnail_url.as_str())
        .length("0")
        .mime_type("image/jpeg")
        .build();

    ItemBuilder::default()
        .title(Some(renderer.item_title(video, options)))
        .link(Some(video.url.clone()))
        .description(Some(renderer.item_body(video, options)))
        .enclosure(Some(enclosure))
        .guid(Some(Guid {
            value: video.url.clone(),
            permalink: true,
        }))
        .pub_date(Some(video.published_at.to_rfc2822()))
        .author(Some(author.to_string()))
        .categories(categories)
        .build()
}
