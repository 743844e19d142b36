use std::sync::LazyLock;

use regex::Regex;

static INCOMPLETE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*$").unwrap());
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?[^>]*>").unwrap());
static SHORTCODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[/?[^\]]*\]").unwrap());
static NUMERIC_ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&#(\d+);").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#039;", "'"),
    ("&apos;", "'"),
    ("&rsquo;", "'"),
    ("&lsquo;", "'"),
    ("&rdquo;", "\""),
    ("&ldquo;", "\""),
    ("&mdash;", "-"),
    ("&ndash;", "-"),
    ("&hellip;", "..."),
    // last so "&amp;lt;" and "&amp;#60;" stay literal
    ("&amp;", "&"),
];

/// Strip markup left over in scraped text and collapse it into one line of prose.
///
/// Handles complete and dangling tags, CMS shortcodes like `[caption]`, named
/// entities and decimal numeric entities.
///
/// ```ignore
/// let clean = clean_html_text("<p>It&rsquo;s <b>viral</b></p>");
/// assert_eq!(clean, "It's viral");
/// ```
pub fn clean_html_text(text: &str) -> String {
    let cleaned = INCOMPLETE_TAG.replace_all(text, "");
    let cleaned = HTML_TAG.replace_all(&cleaned, " ");
    let cleaned = SHORTCODE.replace_all(&cleaned, "");

    let cleaned = NUMERIC_ENTITY.replace_all(&cleaned, |caps: &regex::Captures| {
        caps[1]
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });

    let mut cleaned = cleaned.into_owned();
    for &(entity, replacement) in NAMED_ENTITIES {
        cleaned = cleaned.replace(entity, replacement);
    }

    WHITESPACE.replace_all(&cleaned, " ").trim().to_string()
}

/// `1234567` -> `1,234,567`
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Cut to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}
