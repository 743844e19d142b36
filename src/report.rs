use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::info;

use crate::models::{TrendingTopic, VideoPackage};

const RULE: &str = "============================================================";

pub fn package_filename(at: &DateTime<Local>) -> String {
    format!("video_package_{}.txt", at.format("%Y%m%d_%H%M%S"))
}

pub fn render_report(topic: &TrendingTopic, package: &VideoPackage, generated_at: &DateTime<Local>) -> String {
    let mut out = String::new();

    out.push_str(&format!("{RULE}\nYOUTUBE VIDEO CREATION PACKAGE\n"));
    out.push_str(&format!(
        "Generated: {}\n",
        generated_at.format("%B %d, %Y at %I:%M %p")
    ));
    out.push_str(&format!("Article URL: {}\n", topic.article_url()));
    out.push_str(&format!("Topic: {}\n", topic.title));
    if topic.external_article_url.is_some() {
        out.push_str(&format!("Discussion: {}\n", topic.discussion_url));
    }
    out.push_str(&format!("{RULE}\n\n"));

    out.push_str("1. AI TEXT-TO-VIDEO PROMPT\n\n");
    out.push_str(package.video_prompt.trim());
    out.push_str("\n\n2. YOUTUBE TITLE\n\n");
    out.push_str(package.title.trim());
    out.push_str("\n\n3. YOUTUBE DESCRIPTION\n\n");
    out.push_str(package.description.trim());
    out.push_str("\n\n4. YOUTUBE TAGS\n\n");
    out.push_str(&package.tags.join(", "));
    out.push('\n');

    out
}

/// Write the report into `dir`, creating it if needed, and return the file path.
pub fn save_report(
    dir: &Path,
    topic: &TrendingTopic,
    package: &VideoPackage,
    generated_at: &DateTime<Local>,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Could not create output dir {}", dir.display()))?;

    let path = dir.join(package_filename(generated_at));
    fs::write(&path, render_report(topic, package, generated_at))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Saved video package to {}", path.display());
    Ok(path)
}
