use std::io::{self, Write};

use anyhow::Result;
use chrono::Local;
use log::{debug, error, info, warn};

use crate::aggregator::{FailurePolicy, aggregate};
use crate::ai_packager::{analyze_topic, generate_video_package};
use crate::article::{article_client, fetch_article, truncate_for_prompt};
use crate::classifier::ArticleClassifier;
use crate::config::{Config, EnsureOutcome};
use crate::logger::init_logger;
use crate::models::{ArticleContent, TrendingTopic};
use crate::reddit::ContentFetcher;
use crate::report::save_report;
use crate::selector::{Selection, choose_topic, confirm, render_topics};
use crate::sources::resolve_sources;

const RULE: &str = "============================================================";

pub struct RunOptions {
    pub sources: Vec<String>,
    pub news: bool,
    pub min_score: Option<u64>,
    pub tolerate_failures: bool,
    pub no_ai: bool,
    pub verbose: bool,
}

pub async fn run(opts: RunOptions) -> Result<()> {
    // 0) Logger
    init_logger(opts.verbose)?;
    debug!("Logger initialized");

    // 1) Config
    let config_outcome: EnsureOutcome = Config::ensure_user_config()?;
    if config_outcome.created {
        println!(
            "Config file created at {}. Please edit it and restart the app.",
            config_outcome.path.display()
        );
        return Ok(());
    }

    let cfg = Config::get_user_config()?;
    if !opts.no_ai {
        cfg.validate()?;
    }
    debug!("User config loaded");

    // 2) Sources
    let article_filter = opts.news || cfg.article_filter.unwrap_or(false);
    let names = if opts.sources.is_empty() {
        vec![if article_filter { "news" } else { "all" }.to_string()]
    } else {
        opts.sources.clone()
    };
    let configs = resolve_sources(&names, &cfg.custom_sources, cfg.user_agent(), opts.min_score)?;
    let policy = if opts.tolerate_failures {
        FailurePolicy::Isolate
    } else {
        FailurePolicy::Propagate
    };
    info!(
        "Using sources [{}], article filter {}, {:?} on failure",
        names.join(", "),
        if article_filter { "on" } else { "off" },
        policy
    );

    let fetcher = ContentFetcher::http(ArticleClassifier::default(), article_filter)?;

    println!("{RULE}\nVIRAL CONTENT AUTOMATION\n{RULE}");

    // 3) Fetch, show, pick
    let topic = loop {
        println!("\nSearching for viral content...\n");

        let topics = match aggregate(&fetcher, &configs, policy).await {
            Ok(topics) => topics,
            Err(e) => {
                error!("Fetching trending topics failed: {}", e);
                println!("Could not fetch trending topics: {}", e);
                Vec::new()
            }
        };
        print!("{}", render_topics(&topics, cfg.display_limit()));

        let selection = {
            let mut input = io::stdin().lock();
            let mut output = io::stdout().lock();
            choose_topic(&mut input, &mut output, &topics, cfg.display_limit())?
        };

        match selection {
            Selection::Topic(topic) => break topic,
            Selection::Refresh => continue,
            Selection::Quit => {
                println!("Bye.");
                return Ok(());
            }
        }
    };

    // 4) Confirm
    let confirmed = {
        let mut input = io::stdin().lock();
        let mut output = io::stdout().lock();
        confirm(&mut input, &mut output, &topic)?
    };
    if !confirmed {
        println!("Operation cancelled. Run again to pick another topic.");
        return Ok(());
    }
    info!("Selected `{}` ({})", topic.title, topic.article_url());

    if opts.no_ai {
        info!("--no-ai flag set, skipping analysis and package generation");
        println!("\n{}\n{}", topic.title, topic.article_url());
        return Ok(());
    }

    // 5) Analyze
    println!("\nAnalyzing article: {}\n", topic.article_url());
    let article = download_article(&topic).await;
    let analysis = analyze_topic(&cfg, &topic, article.as_ref()).await?;
    println!("{}", analysis);

    // 6) Package
    println!("\nGenerating video creation materials...\n");
    let package = generate_video_package(&cfg, &topic, &analysis).await?;

    let generated_at = Local::now();
    let path = save_report(&cfg.output_dir(), &topic, &package, &generated_at)?;

    println!("{RULE}\nYOUR YOUTUBE VIDEO PACKAGE IS READY\n{RULE}");
    println!("{}\n", package.title);
    println!("{}\n", package.description);
    println!("Saved to: {}", path.display());
    io::stdout().flush()?;

    Ok(())
}

/// Best effort: a page that can't be fetched still leaves the title to work from.
async fn download_article(topic: &TrendingTopic) -> Option<ArticleContent> {
    let client = match article_client() {
        Ok(client) => client,
        Err(e) => {
            warn!("Could not build article client: {:?}", e);
            return None;
        }
    };

    match fetch_article(&client, topic.article_url()).await {
        Ok(mut article) => {
            match truncate_for_prompt(&article.text) {
                Ok(text) => article.text = text,
                Err(e) => warn!("Token truncation unavailable, sending full text: {:?}", e),
            }
            Some(article)
        }
        Err(e) => {
            warn!("Could not read {}: {:?}", topic.article_url(), e);
            None
        }
    }
}
