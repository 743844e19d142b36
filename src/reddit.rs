use std::time::Duration;

use backoff::backoff::Backoff;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use reqwest::{Client, StatusCode, header::USER_AGENT};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::classifier::{ArticleClassifier, normalized_domain};
use crate::models::TrendingTopic;
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::sources::SourceConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetching {url} failed after {attempts} attempt(s): {cause}")]
    Exhausted {
        url: Url,
        attempts: u32,
        #[source]
        cause: TransportError,
    },

    #[error("listing from {url} is malformed: {reason}")]
    Payload { url: Url, reason: String },

    #[error("invalid endpoint for source `{source_name}`: {reason}")]
    Endpoint { source_name: String, reason: String },
}

/// The one network call a fetch needs. Swapped for canned bodies in tests.
pub trait Transport {
    async fn get_listing(&self, url: &Url, limit: u32, client_id: &str) -> Result<String, TransportError>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    async fn get_listing(&self, url: &Url, limit: u32, client_id: &str) -> Result<String, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .query(&[("limit", limit)])
            .header(USER_AGENT, client_id)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status));
        }

        Ok(response.text().await?)
    }
}

#[derive(Debug, Deserialize)]
struct RawListing {
    data: Option<RawListingData>,
}

#[derive(Debug, Deserialize)]
struct RawListingData {
    children: Option<Vec<serde_json::Value>>,
}

/// A post as the listing API sends it. Every field is optional on the wire.
#[derive(Debug, Default, Deserialize)]
pub struct RawPost {
    pub id: Option<String>,
    pub title: Option<String>,
    pub score: Option<i64>,
    pub num_comments: Option<i64>,
    pub url: Option<String>,
    pub permalink: Option<String>,
    pub subreddit: Option<String>,
    pub author: Option<String>,
}

impl RawPost {
    fn score(&self) -> i64 {
        self.score.unwrap_or(0)
    }

    fn link(&self) -> &str {
        self.url.as_deref().unwrap_or_default().trim()
    }
}

/// Fetches one source, filters it and ranks it.
pub struct ContentFetcher<T, S = TokioSleeper> {
    transport: T,
    sleeper: S,
    retry: RetryPolicy,
    classifier: ArticleClassifier,
    article_filter_enabled: bool,
}

impl ContentFetcher<HttpTransport, TokioSleeper> {
    pub fn http(classifier: ArticleClassifier, article_filter_enabled: bool) -> Result<Self, reqwest::Error> {
        Ok(ContentFetcher::new(
            HttpTransport::new()?,
            TokioSleeper,
            RetryPolicy::default(),
            classifier,
            article_filter_enabled,
        ))
    }
}

impl<T: Transport, S: Sleeper> ContentFetcher<T, S> {
    pub fn new(
        transport: T,
        sleeper: S,
        retry: RetryPolicy,
        classifier: ArticleClassifier,
        article_filter_enabled: bool,
    ) -> Self {
        debug!(
            "Up to {} attempt(s) per source, pausing {:?} between them",
            retry.max_attempts,
            retry.schedule()
        );
        ContentFetcher {
            transport,
            sleeper,
            retry,
            classifier,
            article_filter_enabled,
        }
    }

    pub async fn fetch(&self, config: &SourceConfig) -> Result<Vec<TrendingTopic>, FetchError> {
        let endpoint = config.endpoint_url().map_err(|e| FetchError::Endpoint {
            source_name: config.name().to_string(),
            reason: e.to_string(),
        })?;

        debug!("Source `{}` covers r/{}", config.name(), config.sources().join("+"));
        let body = self.get_with_retry(&endpoint, config).await?;
        let topics = self.topics_from_listing(&endpoint, &body, config, Utc::now())?;

        info!(
            "Source `{}` yielded {} topic(s) at or above score {}",
            config.name(),
            topics.len(),
            config.minimum_score()
        );
        Ok(topics)
    }

    async fn get_with_retry(&self, endpoint: &Url, config: &SourceConfig) -> Result<String, FetchError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut backoff = self.retry.backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("GET {} (attempt {}/{})", endpoint, attempt, max_attempts);

            match self
                .transport
                .get_listing(endpoint, config.limit(), config.client_id())
                .await
            {
                Ok(body) => return Ok(body),
                Err(cause) if attempt >= max_attempts => {
                    return Err(FetchError::Exhausted {
                        url: endpoint.clone(),
                        attempts: attempt,
                        cause,
                    });
                }
                Err(cause) => {
                    let delay = backoff.next_backoff().unwrap_or(self.retry.max_delay);
                    warn!(
                        "Attempt {} for `{}` failed ({}), retrying in {:?}",
                        attempt,
                        config.name(),
                        cause,
                        delay
                    );
                    self.sleeper.sleep(delay).await;
                }
            }
        }
    }

    /// Decode a listing body and turn the surviving posts into ranked topics.
    pub fn topics_from_listing(
        &self,
        endpoint: &Url,
        body: &str,
        config: &SourceConfig,
        retrieved_at: DateTime<Utc>,
    ) -> Result<Vec<TrendingTopic>, FetchError> {
        let payload_error = |reason: String| FetchError::Payload {
            url: endpoint.clone(),
            reason,
        };

        let listing: RawListing =
            serde_json::from_str(body).map_err(|e| payload_error(e.to_string()))?;
        let children = listing
            .data
            .ok_or_else(|| payload_error("missing `data`".to_string()))?
            .children
            .ok_or_else(|| payload_error("missing `data.children`".to_string()))?;

        let discussion_host = config.discussion_host();
        let mut topics = Vec::new();

        for (index, child) in children.into_iter().enumerate() {
            let Some(value) = child.get("data").cloned() else {
                debug!("Skipping child {} without `data`", index);
                continue;
            };
            let post: RawPost = match serde_json::from_value(value) {
                Ok(post) => post,
                Err(e) => {
                    debug!("Skipping malformed child {}: {}", index, e);
                    continue;
                }
            };

            if post.score() < 0 || (post.score() as u64) < config.minimum_score() {
                continue;
            }

            if is_self_post(post.link(), &discussion_host) {
                continue;
            }

            if let Some(topic) = self.build_topic(post, config, retrieved_at) {
                topics.push(topic);
            }
        }

        // stable: equal scores keep listing order
        topics.sort_by(|a, b| b.score.cmp(&a.score));
        Ok(topics)
    }

    fn build_topic(
        &self,
        post: RawPost,
        config: &SourceConfig,
        retrieved_at: DateTime<Utc>,
    ) -> Option<TrendingTopic> {
        let link = Url::parse(post.link()).ok()?;

        let (discussion_url, external_article_url, external_article_source) =
            if self.article_filter_enabled {
                let source = self.classifier.classify(link.as_str())?;
                let permalink = post.permalink.as_deref().unwrap_or_default();
                if permalink.is_empty() {
                    debug!("Dropping {:?}: no permalink", post.id);
                    return None;
                }
                let discussion = config.base().join(permalink).ok()?;
                (discussion, Some(link), Some(source))
            } else {
                (link, None, None)
            };

        Some(TrendingTopic {
            id: post.id.unwrap_or_default(),
            title: post
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "Untitled".to_string()),
            discussion_url,
            score: post.score.unwrap_or(0).max(0) as u64,
            comment_count: post.num_comments.unwrap_or(0).max(0) as u64,
            retrieved_at,
            origin_channel: post.subreddit.unwrap_or_default(),
            author: post.author.unwrap_or_default(),
            external_article_url,
            external_article_source,
        })
    }
}

/// No outward link: empty, unparseable, or pointing back at the discussion site.
pub fn is_self_post(url: &str, discussion_host: &str) -> bool {
    if url.is_empty() {
        return true;
    }
    match normalized_domain(url) {
        Some(domain) => {
            domain == discussion_host || domain.ends_with(&format!(".{}", discussion_host))
        }
        None => true,
    }
}
