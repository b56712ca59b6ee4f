use std::sync::Arc;

use url::Url;

use crate::app::{Result, TubeError};
use crate::config::ApiConfig;
use crate::domain::Part;
use crate::fetcher::{FetchResult, Fetcher, PartOutcome, PartRequest};
use crate::normalizer;

const CHANNEL_FIELDS: &str = "etag,items(snippet(title,description,publishedAt,thumbnails(default(url))),contentDetails(relatedPlaylists(uploads)))";
const PLAYLIST_FIELDS: &str = "etag,items(contentDetails(videoId))";
const VIDEO_FIELDS: &str = "etag,items(id,snippet(title,description,tags,publishedAt,liveBroadcastContent,thumbnails(standard(url),maxres(url))),contentDetails(duration),liveStreamingDetails(scheduledStartTime,actualStartTime))";

/// Conditional fetcher for the three read operations a feed depends on.
///
/// Builds exactly one request per call and decodes the reply into a typed
/// [`Payload`](crate::normalizer::Payload).
#[derive(Clone)]
pub struct YouTubeApi {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    endpoint: Url,
    key: String,
    results_limit: usize,
}

impl YouTubeApi {
    pub fn new(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        config: &ApiConfig,
        results_limit: usize,
    ) -> Result<Self> {
        let mut endpoint = config.endpoint.trim().to_string();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }

        let endpoint = Url::parse(&endpoint)
            .map_err(|e| TubeError::Config(format!("Invalid API endpoint {}: {}", endpoint, e)))?;

        Ok(Self {
            fetcher,
            endpoint,
            key: config.key.clone(),
            results_limit,
        })
    }

    pub fn request_url(&self, request: &PartRequest<'_>) -> Result<Url> {
        let part = request.part();

        if self.key.is_empty() {
            return Err(TubeError::Config("No YouTube API key configured".into()));
        }

        let limit = self.results_limit.to_string();
        let joined;
        let (resource, params): (&str, Vec<(&str, &str)>) = match *request {
            PartRequest::Channel(id) => {
                require_target(part, id)?;
                (
                    "channels",
                    vec![
                        ("part", "snippet,contentDetails"),
                        ("id", id),
                        ("fields", CHANNEL_FIELDS),
                    ],
                )
            }
            PartRequest::Playlist(id) => {
                require_target(part, id)?;
                (
                    "playlistItems",
                    vec![
                        ("part", "contentDetails"),
                        ("maxResults", limit.as_str()),
                        ("playlistId", id),
                        ("fields", PLAYLIST_FIELDS),
                    ],
                )
            }
            PartRequest::Videos(ids) => {
                if ids.is_empty() || ids.iter().any(|id| id.is_empty()) {
                    return Err(TubeError::validation(part, "no video ids to look up"));
                }
                joined = ids.join(",");
                (
                    "videos",
                    vec![
                        ("part", "id,snippet,contentDetails,liveStreamingDetails"),
                        ("id", joined.as_str()),
                        ("fields", VIDEO_FIELDS),
                    ],
                )
            }
        };

        self.build_url(resource, &params)
    }

    fn build_url(&self, resource: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .endpoint
            .join(resource)
            .map_err(|e| TubeError::Config(format!("Invalid API endpoint: {}", e)))?;

        url.query_pairs_mut()
            .extend_pairs(params)
            .append_pair("prettyPrint", "false")
            .append_pair("key", &self.key);

        Ok(url)
    }

    /// Fetch one part, sending `etag` as the precondition when non-empty.
    pub async fn fetch(&self, request: PartRequest<'_>, etag: Option<&str>) -> Result<PartOutcome> {
        let part = request.part();
        let url = self.request_url(&request)?;
        let etag = etag.filter(|e| !e.is_empty());

        tracing::debug!("Fetching {} part (etag: {:?})", part, etag);

        match self.fetcher.fetch(part, &url, etag).await? {
            FetchResult::NotModified => {
                tracing::debug!("{} part not modified", part);
                Ok(PartOutcome::Unchanged)
            }
            FetchResult::Content { body, etag } => {
                let payload = normalizer::decode(&request, &body, etag.as_deref())?;
                Ok(PartOutcome::Updated(payload))
            }
        }
    }
}

fn require_target(part: Part, id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(TubeError::validation(part, "empty id"));
    }
    Ok(())
}
