//! Markdown text measurements shared by the SEO rules.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref MARKUP: Regex = Regex::new(r"[#*_`\[\]()!|>-]").unwrap();
    static ref HEADING_MARKER: Regex = Regex::new(r"(?m)^(#{1,6})\s").unwrap();
    static ref HEADING_TEXT: Regex = Regex::new(r"(?m)^#{1,6}\s+(.+)$").unwrap();
    static ref BULLET_LIST: Regex = Regex::new(r"(?m)^\s*[-*+]\s").unwrap();
    static ref NUMBERED_LIST: Regex = Regex::new(r"(?m)^\s*\d+\.\s").unwrap();
    static ref EXTERNAL_LINK: Regex = Regex::new(r"\[.*?\]\(https?://.*?\)").unwrap();
    static ref H1: Regex = Regex::new(r"(?m)^#[ \t]+(.+?)[ \t]*$").unwrap();
}

/// Body text with markdown punctuation removed.
pub fn strip_markup(body: &str) -> String {
    MARKUP.replace_all(body, "").into_owned()
}

/// Character count ignoring spaces and newlines.
pub fn compact_len(text: &str) -> usize {
    text.chars().filter(|c| *c != ' ' && *c != '\n').count()
}

/// Non-overlapping occurrences of `needle`. An empty needle never matches.
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// Substring test where an empty keyword counts as absent.
pub fn contains_keyword(text: &str, keyword: &str) -> bool {
    !keyword.is_empty() && text.contains(keyword)
}

/// Levels (number of `#`) of every heading marker in the body.
pub fn heading_levels(body: &str) -> Vec<usize> {
    HEADING_MARKER
        .captures_iter(body)
        .map(|caps| caps[1].len())
        .collect()
}

/// Text of every heading line.
pub fn heading_texts(body: &str) -> Vec<&str> {
    HEADING_TEXT
        .captures_iter(body)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Paragraphs split on blank lines, trimmed, skipping empty ones and headings.
pub fn paragraphs(body: &str) -> Vec<&str> {
    body.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty() && !p.starts_with('#'))
        .collect()
}

/// Text of the first level-one heading, if any.
pub fn first_h1(body: &str) -> Option<&str> {
    H1.captures(body).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

pub fn first_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

pub fn has_list(body: &str) -> bool {
    BULLET_LIST.is_match(body) || NUMBERED_LIST.is_match(body)
}

pub fn has_table(body: &str) -> bool {
    body.contains('|') && body.contains("---")
}

pub fn external_link_count(body: &str) -> usize {
    EXTERNAL_LINK.find_iter(body).count()
}
