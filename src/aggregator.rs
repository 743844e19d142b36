use std::collections::HashSet;

use futures::future::join_all;
use log::{debug, info, warn};
use url::Url;

use crate::models::TrendingTopic;
use crate::reddit::{ContentFetcher, FetchError, Transport};
use crate::retry::Sleeper;
use crate::sources::SourceConfig;

/// What to do when one source in a batch can't be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// The first failure (in config order) aborts the whole batch.
    #[default]
    Propagate,
    /// Log and skip failing sources; only fail when none succeeded.
    Isolate,
}

/// Fetch every config concurrently and merge into one ranked, URL-unique list.
///
/// Merging walks the results in config order, so when two sources return the same
/// article URL the earlier config's entry is kept.
pub async fn aggregate<T: Transport, S: Sleeper>(
    fetcher: &ContentFetcher<T, S>,
    configs: &[SourceConfig],
    policy: FailurePolicy,
) -> Result<Vec<TrendingTopic>, FetchError> {
    debug!("Fetching {} source(s) concurrently", configs.len());

    let results = join_all(configs.iter().map(|config| fetcher.fetch(config))).await;

    let mut batches = Vec::with_capacity(results.len());
    let mut first_error = None;

    for (config, result) in configs.iter().zip(results) {
        match result {
            Ok(topics) => batches.push(topics),
            Err(e) if policy == FailurePolicy::Propagate => return Err(e),
            Err(e) => {
                warn!("Skipping source `{}`: {}", config.name(), e);
                first_error.get_or_insert(e);
            }
        }
    }

    if batches.is_empty() {
        if let Some(e) = first_error {
            return Err(e);
        }
    }

    let merged = merge_ranked(batches);
    info!("Aggregated {} unique topic(s) from {} source(s)", merged.len(), configs.len());
    Ok(merged)
}

/// First-seen-wins dedup by `article_url()`, then a stable sort by score.
///
/// Without the article filter that is the outbound link itself; with it, cross-posts of
/// the same publisher article collapse even though their permalinks differ.
pub fn merge_ranked(batches: Vec<Vec<TrendingTopic>>) -> Vec<TrendingTopic> {
    let mut seen: HashSet<Url> = HashSet::new();
    let mut merged = Vec::new();

    for topic in batches.into_iter().flatten() {
        if seen.insert(topic.article_url().clone()) {
            merged.push(topic);
        } else {
            debug!("Dropping duplicate {}", topic.article_url());
        }
    }

    merged.sort_by(|a, b| b.score.cmp(&a.score));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reddit::TransportError;
    use crate::reddit::tests::{FakeTransport, config, fetcher, listing, post};
    use reqwest::StatusCode;

    fn endpoint(cfg: &SourceConfig) -> String {
        cfg.endpoint_url().unwrap().to_string()
    }

    fn fail_three_times(transport: &FakeTransport, cfg: &SourceConfig) {
        for _ in 0..3 {
            transport.push(&endpoint(cfg), Err(TransportError::Status(StatusCode::BAD_GATEWAY)));
        }
    }

    #[tokio::test]
    async fn shared_url_appears_once_from_first_config() {
        let first = config(&["news"], 0);
        let second = config(&["worldnews"], 0);
        let transport = FakeTransport::default();
        transport.push(
            &endpoint(&first),
            Ok(listing(vec![post("from-first", 10, "https://bbc.com/x")])),
        );
        transport.push(
            &endpoint(&second),
            Ok(listing(vec![
                post("from-second", 9_999, "https://bbc.com/x"),
                post("other", 50, "https://example.com/other"),
            ])),
        );

        let f = fetcher(transport, false);
        let topics = aggregate(&f, &[first, second], FailurePolicy::Propagate)
            .await
            .unwrap();

        let bbc: Vec<_> = topics
            .iter()
            .filter(|t| t.discussion_url.as_str() == "https://bbc.com/x")
            .collect();
        assert_eq!(bbc.len(), 1);
        assert_eq!(bbc[0].id, "from-first");
        assert_eq!(bbc[0].score, 10);

        let ids: Vec<&str> = topics.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["other", "from-first"]);
    }

    #[tokio::test]
    async fn cross_posted_article_appears_once_with_article_filter() {
        let first = config(&["news"], 0);
        let second = config(&["worldnews"], 0);
        let transport = FakeTransport::default();
        transport.push(
            &endpoint(&first),
            Ok(listing(vec![post("p1", 300, "https://bbc.com/x")])),
        );
        transport.push(
            &endpoint(&second),
            Ok(listing(vec![post("p2", 900, "https://bbc.com/x")])),
        );

        let f = fetcher(transport, true);
        let topics = aggregate(&f, &[first, second], FailurePolicy::Propagate)
            .await
            .unwrap();

        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].id, "p1");
        assert_eq!(topics[0].article_url().as_str(), "https://bbc.com/x");
        assert_eq!(
            topics[0].discussion_url.as_str(),
            "https://www.reddit.com/r/news/comments/p1/post/"
        );
    }

    #[tokio::test]
    async fn failure_propagates_by_default() {
        let good = config(&["news"], 0);
        let bad = config(&["worldnews"], 0);
        let transport = FakeTransport::default();
        transport.push(&endpoint(&good), Ok(listing(vec![post("a", 1, "https://example.com/a")])));
        fail_three_times(&transport, &bad);

        let f = fetcher(transport, false);
        let result = aggregate(&f, &[good, bad], FailurePolicy::Propagate).await;

        assert!(matches!(result, Err(FetchError::Exhausted { .. })));
    }

    #[tokio::test]
    async fn isolate_keeps_healthy_sources() {
        let good = config(&["news"], 0);
        let bad = config(&["worldnews"], 0);
        let transport = FakeTransport::default();
        transport.push(&endpoint(&good), Ok(listing(vec![post("a", 1, "https://example.com/a")])));
        fail_three_times(&transport, &bad);

        let f = fetcher(transport, false);
        let topics = aggregate(&f, &[bad, good], FailurePolicy::Isolate).await.unwrap();

        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].id, "a");
    }

    #[tokio::test]
    async fn isolate_still_fails_when_every_source_fails() {
        let bad = config(&["worldnews"], 0);
        let transport = FakeTransport::default();
        fail_three_times(&transport, &bad);

        let f = fetcher(transport, false);
        let result = aggregate(&f, &[bad], FailurePolicy::Isolate).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn no_configs_means_no_topics() {
        let f = fetcher(FakeTransport::default(), false);
        let topics = aggregate(&f, &[], FailurePolicy::Propagate).await.unwrap();
        assert!(topics.is_empty());
    }

    #[test]
    fn merged_output_is_sorted() {
        let cfg = config(&["news"], 0);
        let f = fetcher(FakeTransport::default(), false);
        let ep = cfg.endpoint_url().unwrap();
        let now = chrono::Utc::now();
        let a = f
            .topics_from_listing(&ep, &listing(vec![post("a", 5, "https://example.com/a")]), &cfg, now)
            .unwrap();
        let b = f
            .topics_from_listing(
                &ep,
                &listing(vec![
                    post("b", 50, "https://example.com/b"),
                    post("c", 7, "https://example.com/c"),
                ]),
                &cfg,
                now,
            )
            .unwrap();

        let merged = merge_ranked(vec![a, b]);
        assert!(merged.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(merged.len(), 3);
    }
}
