mod aggregator;
mod ai_packager;
mod app;
mod article;
mod classifier;
mod config;
mod logger;
mod models;
mod reddit;
mod report;
mod retry;
mod selector;
mod sources;
mod utils;

use anyhow::Result;
use clap::Parser;

#[derive(Parser)]
#[command(name = "viral")]
#[command(about = "Turn trending Reddit links into YouTube video packages")]
struct Cli {
    /// Source preset or custom source name (repeatable)
    #[arg(short = 'p', long = "preset")]
    presets: Vec<String>,

    /// Only keep links to known news publishers
    #[arg(long)]
    news: bool,

    /// Override the minimum score of every selected source
    #[arg(long)]
    min_score: Option<u64>,

    /// Keep going when some sources fail to load
    #[arg(long)]
    tolerate_failures: bool,

    /// Stop after picking a topic (for debugging)
    #[arg(long)]
    no_ai: bool,

    /// Write debug output to the log file
    #[arg(short, long)]
    verbose: bool,

    /// Print the built-in presets and exit
    #[arg(long)]
    list_presets: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if cli.list_presets {
        println!("{}", sources::describe_presets());
        return Ok(());
    }

    app::run(app::RunOptions {
        sources: cli.presets,
        news: cli.news,
        min_score: cli.min_score,
        tolerate_failures: cli.tolerate_failures,
        no_ai: cli.no_ai,
        verbose: cli.verbose,
    })
    .await
}
