use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

pub const MANUAL_ORIGIN: &str = "manual";

/// A ranked item that survived filtering, ready to be shown to the operator.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendingTopic {
    pub id: String,
    pub title: String,
    pub discussion_url: Url,
    pub score: u64,
    pub comment_count: u64,
    pub retrieved_at: DateTime<Utc>,
    pub origin_channel: String,
    pub author: String,
    pub external_article_url: Option<Url>,
    pub external_article_source: Option<String>,
}

impl TrendingTopic {
    /// Topic typed in by the operator instead of picked from the list.
    pub fn manual(url: Url, title: Option<String>) -> Self {
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| url.to_string());

        TrendingTopic {
            id: MANUAL_ORIGIN.to_string(),
            title,
            discussion_url: url,
            score: 0,
            comment_count: 0,
            retrieved_at: Utc::now(),
            origin_channel: MANUAL_ORIGIN.to_string(),
            author: String::new(),
            external_article_url: None,
            external_article_source: None,
        }
    }

    /// The link worth reading: the publisher article when there is one.
    pub fn article_url(&self) -> &Url {
        self.external_article_url
            .as_ref()
            .unwrap_or(&self.discussion_url)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoPackage {
    pub video_prompt: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// Readable text pulled from the chosen link.
#[derive(Debug, Clone)]
pub struct ArticleContent {
    pub url: Url,
    pub title: Option<String>,
    pub description: Option<String>,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_topic_has_zero_counts_and_falls_back_to_url_title() {
        let url = Url::parse("https://example.com/story").unwrap();
        let topic = TrendingTopic::manual(url.clone(), Some("   ".into()));

        assert_eq!(topic.score, 0);
        assert_eq!(topic.comment_count, 0);
        assert_eq!(topic.title, "https://example.com/story");
        assert_eq!(topic.article_url(), &url);
    }

    #[test]
    fn article_url_prefers_external_link() {
        let mut topic = TrendingTopic::manual(
            Url::parse("https://www.reddit.com/r/news/comments/abc/x/").unwrap(),
            Some("x".into()),
        );
        let article = Url::parse("https://bbc.com/news/x").unwrap();
        topic.external_article_url = Some(article.clone());

        assert_eq!(topic.article_url(), &article);
    }
}
