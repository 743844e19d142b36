use std::io::{BufRead, Write};

use anyhow::Result;
use url::Url;

use crate::models::TrendingTopic;
use crate::utils::{format_count, truncate_chars};

const TITLE_WIDTH: usize = 90;

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Topic(TrendingTopic),
    Refresh,
    Quit,
}

/// Numbered list of the top `display_limit` topics.
pub fn render_topics(topics: &[TrendingTopic], display_limit: usize) -> String {
    if topics.is_empty() {
        return "No topics passed the filters. Try `r` to refetch or `u` to enter a URL.\n"
            .to_string();
    }

    let mut output = String::new();
    for (i, topic) in topics.iter().take(display_limit).enumerate() {
        output.push_str(&format!(
            "{:>2}. {}\n    Score: {} | Comments: {} | r/{}",
            i + 1,
            truncate_chars(&topic.title, TITLE_WIDTH),
            format_count(topic.score),
            format_count(topic.comment_count),
            topic.origin_channel
        ));
        if let Some(source) = &topic.external_article_source {
            output.push_str(&format!(" | {}", source));
        }
        output.push_str(&format!("\n    {}\n", topic.article_url()));
    }

    if topics.len() > display_limit {
        output.push_str(&format!(
            "    ({} more not shown)\n",
            topics.len() - display_limit
        ));
    }
    output
}

/// Menu loop: a number picks a listed topic, `u` takes a URL, `r` refetches, `q` quits.
/// End of input counts as quitting.
pub fn choose_topic<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    topics: &[TrendingTopic],
    display_limit: usize,
) -> Result<Selection> {
    let shown = topics.len().min(display_limit);

    loop {
        writeln!(output, "\nOPTIONS:")?;
        if shown > 0 {
            writeln!(output, "  1-{}  use one of the topics above", shown)?;
        }
        writeln!(output, "  u     provide your own article URL")?;
        writeln!(output, "  r     fetch trending topics again")?;
        writeln!(output, "  q     quit")?;

        let Some(choice) = prompt(input, output, "\nEnter your choice: ")? else {
            return Ok(Selection::Quit);
        };

        match choice.to_ascii_lowercase().as_str() {
            "q" | "quit" => return Ok(Selection::Quit),
            "r" | "refresh" => return Ok(Selection::Refresh),
            "u" | "url" => match read_manual_topic(input, output)? {
                Some(topic) => return Ok(Selection::Topic(topic)),
                None => return Ok(Selection::Quit),
            },
            other => match other.parse::<usize>() {
                Ok(n) if (1..=shown).contains(&n) => {
                    return Ok(Selection::Topic(topics[n - 1].clone()));
                }
                _ => writeln!(output, "Invalid choice `{}`.", choice)?,
            },
        }
    }
}

fn read_manual_topic<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<Option<TrendingTopic>> {
    loop {
        let Some(raw) = prompt(input, output, "Paste the article URL: ")? else {
            return Ok(None);
        };

        match Url::parse(&raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                let title = prompt(input, output, "Title (leave empty to use the URL): ")?;
                return Ok(Some(TrendingTopic::manual(url, title)));
            }
            _ => writeln!(output, "`{}` is not an http(s) URL.", raw)?,
        }
    }
}

/// `yes`/`y` confirms; anything else, including end of input, declines.
pub fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, topic: &TrendingTopic) -> Result<bool> {
    writeln!(output, "\nSelected: {}\n          {}", topic.title, topic.article_url())?;
    let answer = prompt(input, output, "Is this correct? (yes/no): ")?;
    Ok(matches!(
        answer.map(|a| a.to_ascii_lowercase()).as_deref(),
        Some("yes" | "y")
    ))
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, text: &str) -> Result<Option<String>> {
    write!(output, "{}", text)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn topics() -> Vec<TrendingTopic> {
        ["first", "second", "third"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut t = TrendingTopic::manual(
                    Url::parse(&format!("https://example.com/{}", name)).unwrap(),
                    Some(name.to_string()),
                );
                t.score = 3_000 - i as u64 * 1_000;
                t.origin_channel = "videos".into();
                t
            })
            .collect()
    }

    fn run(script: &str, display_limit: usize) -> (Selection, String) {
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut output = Vec::new();
        let selection = choose_topic(&mut input, &mut output, &topics(), display_limit).unwrap();
        (selection, String::from_utf8(output).unwrap())
    }

    #[test]
    fn picks_numbered_topic_after_invalid_input() {
        let (selection, output) = run("banana\n9\n2\n", 10);

        assert!(output.contains("Invalid choice `banana`."));
        assert!(output.contains("Invalid choice `9`."));
        match selection {
            Selection::Topic(t) => assert_eq!(t.title, "second"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn numbers_beyond_display_limit_are_rejected() {
        let (selection, output) = run("3\nq\n", 2);
        assert!(output.contains("Invalid choice `3`."));
        assert_eq!(selection, Selection::Quit);
    }

    #[test]
    fn manual_url_builds_zero_score_topic() {
        let (selection, output) = run("u\nnot-a-url\nhttps://news.example.org/x\nMy story\n", 10);

        assert!(output.contains("`not-a-url` is not an http(s) URL."));
        match selection {
            Selection::Topic(t) => {
                assert_eq!(t.title, "My story");
                assert_eq!(t.discussion_url.as_str(), "https://news.example.org/x");
                assert_eq!(t.score, 0);
                assert_eq!(t.comment_count, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn refresh_and_eof() {
        assert_eq!(run("R\n", 10).0, Selection::Refresh);
        assert_eq!(run("", 10).0, Selection::Quit);
    }

    #[test]
    fn confirm_accepts_yes_variants_only() {
        let topic = &topics()[0];
        for (answer, expected) in [("yes\n", true), ("Y\n", true), ("no\n", false), ("", false)] {
            let mut input = Cursor::new(answer.as_bytes().to_vec());
            let mut output = Vec::new();
            assert_eq!(confirm(&mut input, &mut output, topic).unwrap(), expected, "{answer:?}");
        }
    }

    #[test]
    fn render_lists_scores_with_separators() {
        let rendered = render_topics(&topics(), 2);

        assert!(rendered.contains(" 1. first\n    Score: 3,000 | Comments: 0 | r/videos\n"));
        assert!(rendered.contains(" 2. second"));
        assert!(!rendered.contains("third"));
        assert!(rendered.contains("(1 more not shown)"));
        assert!(render_topics(&[], 5).starts_with("No topics passed the filters"));
    }
}
