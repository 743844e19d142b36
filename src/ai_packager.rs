use anyhow::{Context, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse, ResponseFormat,
        ResponseFormatJsonSchema,
    },
};
use chrono::Local;
use log::{debug, warn};
use serde_json::json;
use tokio::time::Duration;

use crate::config::Config;
use crate::models::{ArticleContent, TrendingTopic, VideoPackage};

const CALL_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_TITLE_CHARS: usize = 60;

fn client(cfg: &Config) -> Client<OpenAIConfig> {
    let mut openai_config = OpenAIConfig::default().with_api_key(&cfg.api_key);
    if let Some(base) = &cfg.api_base {
        openai_config = openai_config.with_api_base(base);
    }
    Client::with_config(openai_config)
}

/// Ask for the key viral points of the chosen topic.
///
/// `article` is whatever could be downloaded from the link; without it the model only
/// sees the title and URL.
pub async fn analyze_topic(
    cfg: &Config,
    topic: &TrendingTopic,
    article: Option<&ArticleContent>,
) -> Result<String> {
    let system_prompt = format!(
        r#"
        You research viral stories for a YouTube channel. Today's date is {}.

        Summarize the key points of the story you are given. Extract the main viral content,
        trends, surprising facts and human details that would be useful for creating a
        YouTube video. If the article text is missing, work from the title and say clearly
        which details are uncertain. Answer in plain text, no more than 300 words.
        "#,
        Local::now().date_naive().format("%B %d, %Y")
    );

    let user_prompt = analysis_input(topic, article);

    let request = CreateChatCompletionRequestArgs::default()
        .model(&cfg.model)
        .messages([
            ChatCompletionRequestSystemMessage::from(system_prompt).into(),
            ChatCompletionRequestUserMessage::from(user_prompt).into(),
        ])
        .max_tokens(2000u32)
        .build()
        .context("Failed to build analysis request")?;

    let response = call(cfg, request).await?;
    first_content(response).context("No analysis in model response")
}

pub async fn generate_video_package(
    cfg: &Config,
    topic: &TrendingTopic,
    analysis: &str,
) -> Result<VideoPackage> {
    let system_prompt = r#"
        You produce ready-to-paste YouTube video packages from viral stories.

        Return only a JSON object with this structure:
        {
          "video_prompt": string,
          "title": string,
          "description": string,
          "tags": [string, ...]
        }

        "video_prompt" is a detailed AI text-to-video prompt with: a hook in the first 5 seconds,
        visual storyboard suggestions, key explanations and facts to include, a call-to-action,
        and tone direction for both a long-form video and a Shorts cut.

        "title" is an SEO-optimized YouTube title of 60 characters or less.

        "description" is a YouTube description with an engaging intro, key points with emojis,
        a call-to-action, the source link, and relevant hashtags.

        "tags" holds 20 to 25 YouTube tags for discoverability.
        "#;

    let user_prompt = format!(
        "Viral story: {}\nURL: {}\n\nSummary:\n{}",
        topic.title,
        topic.article_url(),
        analysis
    );

    let schema = json!({
      "type": "object",
      "properties": {
        "video_prompt": { "type": "string" },
        "title": { "type": "string" },
        "description": { "type": "string" },
        "tags": {
          "type": "array",
          "items": { "type": "string" }
        }
      },
      "required": ["video_prompt", "title", "description", "tags"],
      "additionalProperties": false
    });

    let response_format = ResponseFormat::JsonSchema {
        json_schema: ResponseFormatJsonSchema {
            description: None,
            name: "video_package".to_string(),
            schema: Some(schema),
            strict: Some(true),
        },
    };

    let request = CreateChatCompletionRequestArgs::default()
        .model(&cfg.model)
        .messages([
            ChatCompletionRequestSystemMessage::from(system_prompt).into(),
            ChatCompletionRequestUserMessage::from(user_prompt).into(),
        ])
        .response_format(response_format)
        .max_tokens(8000u32)
        .build()
        .context("Failed to build video package request")?;

    let response = call(cfg, request).await?;
    let content = first_content(response).context("No video package in model response")?;
    parse_package(&content)
}

async fn call(
    cfg: &Config,
    request: async_openai::types::CreateChatCompletionRequest,
) -> Result<CreateChatCompletionResponse> {
    debug!("Calling model {} with {:?} timeout", cfg.model, CALL_TIMEOUT);
    let start_time = std::time::Instant::now();

    match tokio::time::timeout(CALL_TIMEOUT, client(cfg).chat().create(request)).await {
        Ok(Ok(response)) => {
            debug!("Model call completed in {:?}", start_time.elapsed());
            Ok(response)
        }
        Ok(Err(api_error)) => Err(anyhow::anyhow!("Model API error: {}", api_error)),
        Err(_) => Err(anyhow::anyhow!(
            "Model call timed out after {} seconds",
            CALL_TIMEOUT.as_secs()
        )),
    }
}

fn first_content(response: CreateChatCompletionResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .find_map(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
}

fn analysis_input(topic: &TrendingTopic, article: Option<&ArticleContent>) -> String {
    let mut input = format!("Title: {}\nURL: {}\n", topic.title, topic.article_url());

    if let Some(source) = &topic.external_article_source {
        input.push_str(&format!("Publisher: {}\n", source));
    }
    if topic.score > 0 {
        input.push_str(&format!(
            "Community traction: {} upvotes, {} comments in r/{}\n",
            topic.score, topic.comment_count, topic.origin_channel
        ));
    }

    match article {
        Some(article) => {
            if &article.url != topic.article_url() {
                input.push_str(&format!("Redirected to: {}\n", article.url));
            }
            if let Some(title) = &article.title {
                input.push_str(&format!("Headline: {}\n", title));
            }
            if let Some(description) = &article.description {
                input.push_str(&format!("Standfirst: {}\n", description));
            }
            input.push_str("\nArticle text:\n");
            input.push_str(&article.text);
        }
        None => input.push_str("\nArticle text: unavailable\n"),
    }

    input
}

/// Decode the model's JSON reply. Over-long titles are kept but flagged.
pub fn parse_package(content: &str) -> Result<VideoPackage> {
    let mut package: VideoPackage =
        serde_json::from_str(content).context("Failed to parse video package JSON")?;

    package.tags = package
        .tags
        .into_iter()
        .map(|t| t.trim().trim_start_matches('#').to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let title_chars = package.title.chars().count();
    if title_chars > MAX_TITLE_CHARS {
        warn!(
            "Generated title is {} characters, above the {} YouTube sweet spot",
            title_chars, MAX_TITLE_CHARS
        );
    }
    if !(20..=25).contains(&package.tags.len()) {
        warn!("Generated {} tags, asked for 20 to 25", package.tags.len());
    }

    Ok(package)
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn package_json_is_decoded_and_tags_cleaned() {
        let content = r##"{
            "video_prompt": "Open on the duck parade...",
            "title": "Dog Adopts 6 Ducklings",
            "description": "🐶 Meet Max!",
            "tags": ["#dogs", " ducklings ", "", "viral"]
        }"##;

        let package = parse_package(content).unwrap();

        assert_eq!(package.title, "Dog Adopts 6 Ducklings");
        assert_eq!(package.tags, vec!["dogs", "ducklings", "viral"]);
    }

    #[test]
    fn malformed_package_is_an_error() {
        assert!(parse_package(r#"{"title": "missing the rest"}"#).is_err());
        assert!(parse_package("not json").is_err());
    }

    #[test]
    fn analysis_input_mentions_missing_article() {
        let topic = TrendingTopic::manual(
            Url::parse("https://example.com/a").unwrap(),
            Some("Manual pick".into()),
        );
        let input = analysis_input(&topic, None);

        assert!(input.starts_with("Title: Manual pick\nURL: https://example.com/a\n"));
        assert!(input.contains("Article text: unavailable"));
        assert!(!input.contains("Community traction"));
    }

    #[test]
    fn analysis_input_includes_article_text() {
        let url = Url::parse("https://bbc.com/news/1").unwrap();
        let mut topic = TrendingTopic::manual(url.clone(), Some("Big story".into()));
        topic.score = 4_200;
        topic.comment_count = 310;
        topic.origin_channel = "news".into();
        topic.external_article_source = Some("BBC".into());

        let article = ArticleContent {
            url,
            title: Some("Big story, explained".into()),
            description: None,
            text: "Paragraph one.\n\nParagraph two.".into(),
        };
        let input = analysis_input(&topic, Some(&article));

        assert!(input.contains("Publisher: BBC"));
        assert!(input.contains("4200 upvotes, 310 comments in r/news"));
        assert!(input.contains("Headline: Big story, explained"));
        assert!(!input.contains("Redirected to"));
        assert!(input.ends_with("Paragraph one.\n\nParagraph two."));
    }
}
