pub mod api;
pub mod http_fetcher;

use async_trait::async_trait;
use url::Url;

use crate::app::Result;
use crate::domain::Part;
use crate::normalizer::Payload;

pub use api::YouTubeApi;
pub use http_fetcher::HttpFetcher;

#[derive(Debug)]
pub enum FetchResult {
    /// New content fetched successfully
    Content { body: Vec<u8>, etag: Option<String> },
    /// Upstream reports no change since the etag we sent (HTTP 304 or 412)
    NotModified,
}

/// Issues a single conditional GET.
///
/// Implementations never retry; a failure is returned to the caller as is.
#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, part: Part, url: &Url, etag: Option<&str>) -> Result<FetchResult>;
}

/// What to ask upstream for, one variant per part.
#[derive(Debug, Clone, Copy)]
pub enum PartRequest<'a> {
    Channel(&'a str),
    Playlist(&'a str),
    Videos(&'a [String]),
}

impl PartRequest<'_> {
    pub fn part(&self) -> Part {
        match self {
            PartRequest::Channel(_) => Part::Channel,
            PartRequest::Playlist(_) => Part::Playlist,
            PartRequest::Videos(_) => Part::Videos,
        }
    }
}

/// Result of a conditional fetch that reached upstream successfully.
#[derive(Debug, Clone, PartialEq)]
pub enum PartOutcome {
    Unchanged,
    Updated(Payload),
}
