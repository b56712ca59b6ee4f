use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ETAG, IF_NONE_MATCH};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::app::Result;
use crate::domain::Part;
use crate::fetcher::{FetchResult, Fetcher};
use crate::normalizer;

pub struct HttpFetcher {
    client: Client,
    raw_errors: bool,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_options(timeout, false)
    }

    /// `raw_errors` keeps the upstream error JSON verbatim in API error messages.
    pub fn with_options(timeout: Duration, raw_errors: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("tuberss/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, raw_errors })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, part: Part, url: &Url, etag: Option<&str>) -> Result<FetchResult> {
        let mut headers = HeaderMap::new();

        if let Some(etag) = etag {
            match HeaderValue::from_str(etag) {
                Ok(value) => {
                    headers.insert(IF_NONE_MATCH, value);
                }
                Err(_) => {
                    tracing::warn!("Stored {} etag {:?} is not a valid header, fetching unconditionally", part, etag);
                }
            }
        }

        let response = self.client.get(url.clone()).headers(headers).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED || status == StatusCode::PRECONDITION_FAILED {
            return Ok(FetchResult::NotModified);
        }

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = response.bytes().await?.to_vec();

        if !status.is_success() {
            return Err(normalizer::decode_error(
                part,
                status.as_u16(),
                &body,
                self.raw_errors,
            ));
        }

        Ok(FetchResult::Content { body, etag })
    }
}
