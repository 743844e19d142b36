use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use reqwest::Client;
use scraper::{Html, Selector};
use tiktoken_rs::{CoreBPE, o200k_base};
use url::Url;

use crate::models::ArticleContent;
use crate::utils::clean_html_text;

const BROWSER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13.5; rv:116.0) Gecko/20100101 Firefox/116.0";
const MAX_BODY_TOKENS: usize = 6_000;
const MIN_PARAGRAPH_CHARS: usize = 40;

pub fn article_client() -> Result<Client> {
    Ok(Client::builder()
        .redirect(reqwest::redirect::Policy::limited(10))
        .user_agent(BROWSER_AGENT)
        .timeout(std::time::Duration::from_secs(20))
        .build()?)
}

pub async fn fetch_article(client: &Client, url: &Url) -> Result<ArticleContent> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("{} answered with {}", url, status));
    }

    let final_url = response.url().clone();
    let html = response.text().await?;
    let article = parse_article(&final_url, &html)?;
    info!(
        "Extracted {} characters of text from {}",
        article.text.len(),
        final_url
    );
    Ok(article)
}

/// Pull title, description and readable paragraphs out of a page.
pub fn parse_article(url: &Url, html: &str) -> Result<ArticleContent> {
    let document = Html::parse_document(html);

    let meta_selector = Selector::parse("head meta").map_err(|e| anyhow!("{e}"))?;
    let title_selector = Selector::parse("head title").map_err(|e| anyhow!("{e}"))?;
    let body_selector = Selector::parse("article p, main p").map_err(|e| anyhow!("{e}"))?;
    let fallback_selector = Selector::parse("p").map_err(|e| anyhow!("{e}"))?;

    let mut og_title = None;
    let mut description = None;

    for tag in document.select(&meta_selector) {
        let content = tag.value().attr("content").unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let key = tag
            .value()
            .attr("property")
            .or_else(|| tag.value().attr("name"))
            .unwrap_or_default();

        match key {
            "og:title" => og_title = Some(clean_html_text(content)),
            "og:description" => description = Some(clean_html_text(content)),
            "description" if description.is_none() => {
                description = Some(clean_html_text(content))
            }
            _ => {}
        }
    }

    let title = og_title.or_else(|| {
        document
            .select(&title_selector)
            .next()
            .map(|t| clean_html_text(&t.text().collect::<String>()))
            .filter(|t| !t.is_empty())
    });

    let mut paragraphs = collect_paragraphs(&document, &body_selector);
    if paragraphs.is_empty() {
        debug!("No <article>/<main> paragraphs in {}, falling back to every <p>", url);
        paragraphs = collect_paragraphs(&document, &fallback_selector);
    }

    Ok(ArticleContent {
        url: url.clone(),
        title,
        description,
        text: paragraphs.join("\n\n"),
    })
}

fn collect_paragraphs(document: &Html, selector: &Selector) -> Vec<String> {
    document
        .select(selector)
        .map(|p| clean_html_text(&p.text().collect::<Vec<_>>().join(" ")))
        .filter(|text| text.chars().count() >= MIN_PARAGRAPH_CHARS)
        .collect()
}

/// Keep the first `MAX_BODY_TOKENS` tokens of the body so the analysis prompt stays small.
pub fn truncate_for_prompt(text: &str) -> Result<String> {
    let bpe = o200k_base()?;
    Ok(decode_first_n_tokens(&bpe, text, MAX_BODY_TOKENS))
}

fn decode_first_n_tokens(bpe: &CoreBPE, s: &str, n: usize) -> String {
    if n == 0 || s.is_empty() {
        return String::new();
    }
    let ids = bpe.encode_with_special_tokens(s);
    if ids.len() <= n {
        return s.to_string();
    }
    debug!("Trimming article body from {} to {} tokens", ids.len(), n);
    bpe.decode(ids[..n].to_vec()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
          <head>
            <title>Fallback title</title>
            <meta property="og:title" content="Dog adopts family of ducklings" />
            <meta name="description" content="A plain description." />
            <meta property="og:description" content="A golden retriever &amp; six ducklings." />
          </head>
          <body>
            <nav><p>Subscribe to our newsletter for the best stories every week</p></nav>
            <article>
              <p>Short.</p>
              <p>The retriever, named Max, has been escorting the ducklings to the pond every morning.</p>
              <p>Neighbours say the <a href="/x">video</a> has been shared more than a million times online.</p>
            </article>
          </body>
        </html>"#;

    fn url() -> Url {
        Url::parse("https://example.com/story").unwrap()
    }

    #[test]
    fn extracts_meta_and_article_paragraphs() {
        let article = parse_article(&url(), PAGE).unwrap();

        assert_eq!(article.title.as_deref(), Some("Dog adopts family of ducklings"));
        assert_eq!(
            article.description.as_deref(),
            Some("A golden retriever & six ducklings.")
        );
        let paragraphs: Vec<&str> = article.text.split("\n\n").collect();
        assert_eq!(paragraphs.len(), 2);
        assert!(paragraphs[0].starts_with("The retriever, named Max"));
        assert!(paragraphs[1].contains("video has been shared"));
    }

    #[test]
    fn falls_back_to_title_tag_and_any_paragraph() {
        let html = r#"<html><head><title>Just a title</title></head>
            <body><div><p>This paragraph lives outside any article element but is long enough.</p></div></body></html>"#;
        let article = parse_article(&url(), html).unwrap();

        assert_eq!(article.title.as_deref(), Some("Just a title"));
        assert_eq!(article.description, None);
        assert!(article.text.starts_with("This paragraph lives outside"));
    }

    #[test]
    fn short_text_is_not_truncated() {
        let text = "A short body that fits easily.";
        assert_eq!(truncate_for_prompt(text).unwrap(), text);
    }
}
