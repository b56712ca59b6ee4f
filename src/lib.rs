//! # tuberss
//!
//! RSS, HTML and JSON feeds for YouTube channels and playlists, kept in sync
//! with the YouTube Data API through conditional (ETag) requests.
//!
//! ## Architecture
//!
//! A refresh cycle flows through a small pipeline:
//!
//! ```text
//! Store → Synchronizer → YouTubeApi/Fetcher → Normalizer → Merge → Store
//!                                                         Store → Renderer
//! ```
//!
//! - [`sync`]: decides which parts are stale and drives the cycle
//! - [`fetcher`]: one conditional GET per part, "not modified" aware
//! - [`merge`]: folds a part response into the stored record
//! - [`render`]: projects a record into RSS, HTML or JSON Feed
//!
//! ## Quick Start
//!
//! ```bash
//! # Fetch a channel and print its RSS feed
//! TUBERSS_API_KEY=... tuberss render channel UCBa659QWEk1AI4Tg--mrJ2A
//!
//! # Same feed as HTML with embedded players
//! tuberss render channel UCBa659QWEk1AI4Tg--mrJ2A --format html --embed -o feed.html
//!
//! # Refresh everything stored so far
//! tuberss update
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// config, store, synchronizer, renderer.
pub mod app;

/// Command-line interface using clap.
///
/// - `refresh <type> <id>` - Refresh one feed
/// - `render <type> <id>` - Refresh and write a feed
/// - `update` - Refresh all stored feeds
/// - `list` - List stored feeds
/// - `remove <type> <id>` - Forget a feed
pub mod cli;

/// Configuration loaded from `~/.config/tuberss/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`FeedKey`](domain::FeedKey): feed type and id
/// - [`FeedRecord`](domain::FeedRecord): accumulated channel, playlist and video state
/// - [`VideoItem`](domain::VideoItem): one video with optional broadcast details
pub mod domain;

/// Conditional fetching of channel, playlist and video parts.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for a single conditional GET
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`YouTubeApi`](fetcher::api::YouTubeApi): builds part requests and decodes replies
pub mod fetcher;

/// Merging part responses into a feed record.
pub mod merge;

/// Validating decode of upstream JSON into domain types.
pub mod normalizer;

/// Output formats.
pub mod render;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
/// - [`KeyLocks`](store::KeyLocks): per-feed serialization of refresh cycles
pub mod store;

/// Refresh orchestration.
pub mod sync;

/// Duration parsing and timestamp formatting.
pub mod time;
