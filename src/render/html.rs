use std::fmt::Write;

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use crate::domain::FeedRecord;
use crate::render::{FeedFormat, RenderOptions, Renderer};

pub(super) fn build(renderer: &Renderer, record: &FeedRecord, options: &RenderOptions) -> String {
    let title = record.title();
    let key = record.key();
    let embed = options.embed_videos;

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    let _ = writeln!(out, "\t<title>{}</title>", text(&title));
    out.push_str("\t<meta charset=\"UTF-8\">\n");
    out.push_str("\t<meta name=\"robots\" content=\"noindex, follow\">\n");
    out.push_str("\t<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n");
    let _ = writeln!(
        out,
        "\t<meta name=\"description\" content=\"{}\">",
        attr(record.description())
    );
    if let Some(rss) = renderer.feed_link(key, Some(FeedFormat::Rss), embed) {
        let _ = writeln!(
            out,
            "\t<link rel=\"alternate\" type=\"application/rss+xml\" title=\"{}\" href=\"{}\">",
            attr(&title),
            attr(&rss)
        );
    }
    out.push_str("</head>\n<body>\n");

    let _ = writeln!(
        out,
        "\t<div id=\"header\" class=\"center\">\n\t\t<a href=\"{}\">{}</a>\n\t</div>",
        attr(&record.link()),
        text(&title)
    );
    out.push_str("\t<div id=\"main\">\n\t\t<div id=\"items\">\n");

    let switches: Vec<String> = [FeedFormat::Rss, FeedFormat::Html, FeedFormat::Json]
        .into_iter()
        .filter_map(|format| {
            renderer.feed_link(key, Some(format), embed).map(|href| {
                format!(
                    "<a href=\"{}\"><button>{}</button></a>",
                    attr(&href),
                    format.as_str().to_uppercase()
                )
            })
        })
        .collect();
    if !switches.is_empty() {
        let _ = writeln!(
            out,
            "\t\t\t<div class=\"item\">\n\t\t\t\tFeed format: {}\n\t\t\t</div>",
            switches.join(" ")
        );
    }

    for video in &record.videos.items {
        out.push_str("\t\t\t<div class=\"item\">\n");
        let _ = writeln!(
            out,
            "\t\t\t\t<div class=\"title\">\n\t\t\t\t\t<h2><a href=\"{}\">{}</a></h2>\n\t\t\t\t</div>",
            attr(&video.url),
            text(&renderer.item_title(video, options))
        );
        let _ = writeln!(out, "\t\t\t\t{}", renderer.item_body(video, options));

        out.push_str("\t\t\t\t<strong>Categories:</strong> <ul>");
        for tag in &video.tags {
            let _ = write!(out, "<li>{}</li>", text(tag));
        }
        out.push_str("</ul>\n\t\t\t</div>\n");
    }

    out.push_str("\t\t</div>\n\t</div>\n</body>\n</html>\n");
    out
}
