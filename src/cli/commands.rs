use std::io::Write;
use std::path::Path;

use crate::app::{AppContext, Result, TubeError};
use crate::domain::{FeedKey, FeedRecord};
use crate::render::{FeedFormat, RenderOptions};
use crate::store::Store;

pub async fn refresh_feed(ctx: &AppContext, key: &FeedKey, force: bool) -> Result<()> {
    let refreshed = if force {
        ctx.sync.force_refresh(key).await?
    } else {
        ctx.sync.refresh(key).await?
    };

    let record = &refreshed.record;
    if !refreshed.fetched {
        println!("{} is fresh ({} videos)", record.title(), record.videos.items.len());
    } else if refreshed.changed {
        println!("Updated {} ({} videos)", record.title(), record.videos.items.len());
    } else {
        println!("{} not modified", record.title());
    }

    Ok(())
}

pub async fn render_feed(
    ctx: &AppContext,
    key: &FeedKey,
    format: FeedFormat,
    embed: bool,
    output: Option<&Path>,
    offline: bool,
) -> Result<()> {
    let record = if offline {
        ctx.store
            .get(key)?
            .unwrap_or_else(|| FeedRecord::new(key.clone()))
    } else {
        ctx.sync.refresh(key).await?.record
    };

    let rendered = ctx
        .renderer
        .render(format, &record, &RenderOptions::new(embed))?;

    tracing::info!(
        "Rendered {} as {} (Content-Type: {}, Last-Modified: {})",
        key,
        format,
        rendered.content_type,
        rendered.last_modified.as_deref().unwrap_or("-")
    );

    match output {
        Some(path) => {
            std::fs::write(path, &rendered.body)?;
            println!("Wrote {} bytes to {}", rendered.body.len(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&rendered.body)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

pub async fn update_feeds(ctx: &AppContext) -> Result<()> {
    let keys = ctx.store.list_keys()?;

    if keys.is_empty() {
        println!("No feeds to update");
        return Ok(());
    }

    println!("Updating {} feeds...", keys.len());

    let results = ctx.sync.refresh_all(keys).await;

    let mut changed = 0;
    let mut errors = 0;

    for (key, result) in results {
        match result {
            Ok(refreshed) => {
                if refreshed.changed {
                    changed += 1;
                    println!("  Updated {}", refreshed.record.title());
                }
            }
            Err(e) => {
                errors += 1;
                eprintln!("  Error updating {}: {}", key, e);
            }
        }
    }

    println!("Update complete: {} changed, {} errors", changed, errors);
    Ok(())
}

pub fn list_feeds(ctx: &AppContext) -> Result<()> {
    let keys = ctx.store.list_keys()?;

    if keys.is_empty() {
        println!("No feeds");
        return Ok(());
    }

    for key in keys {
        let Some(record) = ctx.store.get(&key)? else {
            continue;
        };

        let updated = record
            .updated_at
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());

        println!(
            "{} ({} videos, updated {})\n  {}",
            record.title(),
            record.videos.items.len(),
            updated,
            key
        );
    }

    Ok(())
}

pub fn remove_feed(ctx: &AppContext, key: &FeedKey) -> Result<()> {
    if !ctx.store.delete(key)? {
        return Err(TubeError::NotFound {
            part: key.feed_type().into(),
            id: key.id().to_string(),
        });
    }

    println!("Removed feed: {}", key);
    Ok(())
}
