use std::collections::HashMap;
use url::Url;

use crate::utils::title_case;

const DEFAULT_PUBLISHERS: &[(&str, &str)] = &[
    ("apnews.com", "AP News"),
    ("reuters.com", "Reuters"),
    ("bbc.com", "BBC"),
    ("bbc.co.uk", "BBC"),
    ("cnn.com", "CNN"),
    ("nytimes.com", "The New York Times"),
    ("washingtonpost.com", "The Washington Post"),
    ("theguardian.com", "The Guardian"),
    ("npr.org", "NPR"),
    ("nbcnews.com", "NBC News"),
    ("cbsnews.com", "CBS News"),
    ("abcnews.go.com", "ABC News"),
    ("usatoday.com", "USA Today"),
    ("wsj.com", "The Wall Street Journal"),
    ("bloomberg.com", "Bloomberg"),
    ("aljazeera.com", "Al Jazeera"),
    ("independent.co.uk", "The Independent"),
    ("time.com", "TIME"),
    ("theverge.com", "The Verge"),
    ("arstechnica.com", "Ars Technica"),
    ("wired.com", "WIRED"),
    ("techcrunch.com", "TechCrunch"),
    ("engadget.com", "Engadget"),
    ("variety.com", "Variety"),
    ("hollywoodreporter.com", "The Hollywood Reporter"),
    ("rollingstone.com", "Rolling Stone"),
    ("espn.com", "ESPN"),
    ("theatlantic.com", "The Atlantic"),
    ("axios.com", "Axios"),
    ("nature.com", "Nature"),
    ("sciencealert.com", "ScienceAlert"),
    ("smithsonianmag.com", "Smithsonian Magazine"),
    ("nationalgeographic.com", "National Geographic"),
    ("vice.com", "VICE"),
    ("businessinsider.com", "Business Insider"),
];

/// Decides whether a link points at a known publisher and how to name it.
///
/// Matching is substring containment against the allow-list, so `time.com` also
/// accepts `sometime.com`. The looseness is intentional and relied upon.
#[derive(Debug, Clone)]
pub struct ArticleClassifier {
    allow_list: Vec<String>,
    display_names: HashMap<String, String>,
}

impl ArticleClassifier {
    pub fn new<I, S>(allow_list: I, display_names: HashMap<String, String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ArticleClassifier {
            allow_list: allow_list
                .into_iter()
                .map(|d| d.into().to_ascii_lowercase())
                .collect(),
            display_names: display_names
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect(),
        }
    }

    pub fn is_known_publisher(&self, url: &str) -> bool {
        match normalized_domain(url) {
            Some(domain) => self.allow_list.iter().any(|entry| domain.contains(entry.as_str())),
            None => false,
        }
    }

    /// Publisher name for a link, or an empty string when the URL has no host.
    pub fn display_name(&self, url: &str) -> String {
        let Some(domain) = normalized_domain(url) else {
            return String::new();
        };

        if let Some(name) = self.display_names.get(&domain) {
            return name.clone();
        }

        // longest key wins so "bbc.co.uk" beats "co.uk"-style short entries
        let contained = self
            .display_names
            .iter()
            .filter(|(key, _)| domain.contains(key.as_str()))
            .max_by_key(|(key, _)| key.len());
        if let Some((_, name)) = contained {
            return name.clone();
        }

        let first_label = domain.split('.').next().unwrap_or_default();
        title_case(first_label)
    }

    /// `Some(name)` when the link passes the allow-list.
    pub fn classify(&self, url: &str) -> Option<String> {
        if self.is_known_publisher(url) {
            Some(self.display_name(url))
        } else {
            None
        }
    }
}

impl Default for ArticleClassifier {
    fn default() -> Self {
        ArticleClassifier::new(
            DEFAULT_PUBLISHERS.iter().map(|(domain, _)| *domain),
            DEFAULT_PUBLISHERS
                .iter()
                .map(|(domain, name)| (domain.to_string(), name.to_string()))
                .collect(),
        )
    }
}

/// Lowercased host without a leading `www.`; `None` for anything unparseable.
pub fn normalized_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    if host.is_empty() {
        return None;
    }
    Some(match host.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => host,
    })
}
