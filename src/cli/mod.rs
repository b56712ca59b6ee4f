pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::FeedType;
use crate::render::FeedFormat;

#[derive(Parser)]
#[command(name = "tuberss")]
#[command(about = "RSS, HTML and JSON feeds for YouTube channels and playlists", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/tuberss/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Number of feeds refreshed in parallel by `update`
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Refresh a feed from upstream
    Refresh {
        /// channel or playlist
        kind: FeedType,
        /// Channel or playlist id
        id: String,

        /// Ignore the age policy and check every part
        #[arg(short, long)]
        force: bool,
    },
    /// Refresh a feed and write it out
    Render {
        /// channel or playlist
        kind: FeedType,
        /// Channel or playlist id
        id: String,

        /// Output format: rss, html or json
        #[arg(short, long, default_value = "rss")]
        format: FeedFormat,

        /// Embed players instead of thumbnails
        #[arg(long)]
        embed: bool,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Render the stored record without contacting upstream
        #[arg(long)]
        offline: bool,
    },
    /// Refresh every stored feed
    Update,
    /// List stored feeds
    List,
    /// Forget a stored feed
    Remove {
        /// channel or playlist
        kind: FeedType,
        /// Channel or playlist id
        id: String,
    },
}
