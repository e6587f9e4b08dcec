//! The thirteen scoring rules. Each returns exactly one [`SeoCheckItem`].
//!
//! `keyword` is expected lowercased by the caller. An empty keyword never
//! matches, so empty input always lands on a rule's fail path.

use pb_core::{CheckStatus, SeoCheckItem};

use crate::text;

pub const CATEGORY_TITLE: &str = "Title";
pub const CATEGORY_META: &str = "Meta description";
pub const CATEGORY_HEADING: &str = "Headings";
pub const CATEGORY_BODY: &str = "Body";
pub const CATEGORY_STRUCTURE: &str = "Structure";

struct Check {
    category: &'static str,
    name: &'static str,
    max_score: u32,
}

impl Check {
    const fn new(category: &'static str, name: &'static str, max_score: u32) -> Self {
        Self { category, name, max_score }
    }

    fn item(&self, status: CheckStatus, score: u32, message: String, suggestion: Option<&str>) -> SeoCheckItem {
        SeoCheckItem {
            category: self.category.to_string(),
            name: self.name.to_string(),
            status,
            score: score.min(self.max_score),
            max_score: self.max_score,
            message,
            suggestion: suggestion.map(str::to_string),
        }
    }

    fn pass(&self, message: impl Into<String>) -> SeoCheckItem {
        self.item(CheckStatus::Pass, self.max_score, message.into(), None)
    }

    fn warn(&self, score: u32, message: impl Into<String>, suggestion: &str) -> SeoCheckItem {
        self.item(CheckStatus::Warn, score, message.into(), Some(suggestion))
    }

    fn fail(&self, message: impl Into<String>, suggestion: &str) -> SeoCheckItem {
        self.item(CheckStatus::Fail, 0, message.into(), Some(suggestion))
    }

    /// Partial credit is a warning, zero is a failure.
    fn graded(&self, score: u32, message: impl Into<String>, suggestion: &str) -> SeoCheckItem {
        if score == 0 {
            self.fail(message, suggestion)
        } else {
            self.warn(score, message, suggestion)
        }
    }
}

const TITLE_KEYWORD: Check = Check::new(CATEGORY_TITLE, "Keyword", 15);
const TITLE_LENGTH: Check = Check::new(CATEGORY_TITLE, "Length", 5);
const META_EXISTS: Check = Check::new(CATEGORY_META, "Present", 5);
const META_LENGTH: Check = Check::new(CATEGORY_META, "Length", 5);
const META_KEYWORD: Check = Check::new(CATEGORY_META, "Keyword", 5);
const HEADING_HIERARCHY: Check = Check::new(CATEGORY_HEADING, "Hierarchy", 10);
const HEADING_KEYWORD: Check = Check::new(CATEGORY_HEADING, "Keyword", 5);
const BODY_DENSITY: Check = Check::new(CATEGORY_BODY, "Keyword density", 10);
const BODY_LENGTH: Check = Check::new(CATEGORY_BODY, "Length", 10);
const BODY_OPENING: Check = Check::new(CATEGORY_BODY, "Opening keyword", 5);
const BODY_PARAGRAPHS: Check = Check::new(CATEGORY_BODY, "Paragraph length", 5);
const STRUCTURE_LISTS: Check = Check::new(CATEGORY_STRUCTURE, "Lists and tables", 5);
const STRUCTURE_LINKS: Check = Check::new(CATEGORY_STRUCTURE, "External links", 5);

/// Sum of every rule's maximum score.
pub const MAX_TOTAL: u32 = TITLE_KEYWORD.max_score
    + TITLE_LENGTH.max_score
    + META_EXISTS.max_score
    + META_LENGTH.max_score
    + META_KEYWORD.max_score
    + HEADING_HIERARCHY.max_score
    + HEADING_KEYWORD.max_score
    + BODY_DENSITY.max_score
    + BODY_LENGTH.max_score
    + BODY_OPENING.max_score
    + BODY_PARAGRAPHS.max_score
    + STRUCTURE_LISTS.max_score
    + STRUCTURE_LINKS.max_score;

const OPENING_CHARS: usize = 100;
const MAX_SENTENCES_PER_PARAGRAPH: usize = 5;
const SENTENCE_END: char = '。';

pub fn check_title_keyword(title: &str, keyword: &str) -> SeoCheckItem {
    if text::contains_keyword(&title.to_lowercase(), keyword) {
        return TITLE_KEYWORD.pass("The title contains the target keyword.");
    }
    TITLE_KEYWORD.fail(
        "The title does not contain the target keyword.",
        "Add the target keyword to the title.",
    )
}

pub fn check_title_length(title: &str) -> SeoCheckItem {
    let length = title.chars().count();
    if (30..=60).contains(&length) {
        return TITLE_LENGTH.pass(format!("The title length is good ({} chars).", length));
    }
    let score = if (20..=70).contains(&length) { 3 } else { 0 };
    TITLE_LENGTH.graded(
        score,
        format!("The title is {} chars (recommended: 30-60).", length),
        "Adjust the title to 30-60 characters.",
    )
}

pub fn check_meta_exists(meta: &str) -> SeoCheckItem {
    if !meta.trim().is_empty() {
        return META_EXISTS.pass("A meta description is set.");
    }
    META_EXISTS.fail(
        "No meta description is set.",
        "Write a meta description of 120-160 characters.",
    )
}

pub fn check_meta_length(meta: &str) -> SeoCheckItem {
    let length = meta.trim().chars().count();
    if length == 0 {
        return META_LENGTH.fail(
            "There is no meta description to measure.",
            "Write a meta description of 120-160 characters.",
        );
    }
    if (120..=160).contains(&length) {
        return META_LENGTH.pass(format!("The meta description length is good ({} chars).", length));
    }
    let score = if (80..=200).contains(&length) { 3 } else { 0 };
    META_LENGTH.graded(
        score,
        format!("The meta description is {} chars (recommended: 120-160).", length),
        "Adjust the meta description to 120-160 characters.",
    )
}

pub fn check_meta_keyword(meta: &str, keyword: &str) -> SeoCheckItem {
    if meta.trim().is_empty() {
        return META_KEYWORD.fail(
            "There is no meta description to check.",
            "Include the keyword in the meta description.",
        );
    }
    if text::contains_keyword(&meta.to_lowercase(), keyword) {
        return META_KEYWORD.pass("The meta description contains the target keyword.");
    }
    META_KEYWORD.fail(
        "The meta description does not contain the target keyword.",
        "Include the target keyword in the meta description.",
    )
}

pub fn check_heading_hierarchy(body: &str) -> SeoCheckItem {
    let levels = text::heading_levels(body);
    if levels.is_empty() {
        return HEADING_HIERARCHY.fail(
            "No headings are used.",
            "Structure the article with H2 and H3 headings.",
        );
    }
    let has_h2 = levels.contains(&2);
    let has_h3 = levels.contains(&3);
    if has_h2 && has_h3 {
        return HEADING_HIERARCHY.pass("H2 and H3 headings are used.");
    }
    if has_h2 {
        return HEADING_HIERARCHY.warn(
            7,
            "H2 headings are used but there are no H3 headings.",
            "Consider adding H3 subheadings.",
        );
    }
    HEADING_HIERARCHY.warn(
        3,
        "The heading structure is insufficient.",
        "Structure the article with H2 and H3 headings.",
    )
}

pub fn check_heading_keyword(body: &str, keyword: &str) -> SeoCheckItem {
    let headings = text::heading_texts(body);
    if headings.is_empty() {
        return HEADING_KEYWORD.fail(
            "There are no headings to check.",
            "Include the keyword in a heading.",
        );
    }
    if headings
        .iter()
        .any(|h| text::contains_keyword(&h.to_lowercase(), keyword))
    {
        return HEADING_KEYWORD.pass("A heading contains the target keyword.");
    }
    HEADING_KEYWORD.fail(
        "No heading contains the target keyword.",
        "Include the keyword in at least one heading.",
    )
}

/// Share of the markup-free body taken up by keyword occurrences, in percent.
pub fn keyword_density(body: &str, keyword: &str) -> Option<f64> {
    let plain = text::strip_markup(body).to_lowercase();
    let total_chars = text::compact_len(&plain);
    if total_chars == 0 {
        return None;
    }
    let keyword_chars = keyword.chars().count() * text::count_occurrences(&plain, keyword);
    Some((keyword_chars as f64 * 100.0) / total_chars as f64)
}

pub fn check_keyword_density(body: &str, keyword: &str) -> SeoCheckItem {
    let Some(density) = keyword_density(body, keyword) else {
        return BODY_DENSITY.fail(
            "The body is empty.",
            "Use the keyword naturally in the body.",
        );
    };
    if (2.0..=5.0).contains(&density) {
        return BODY_DENSITY.pass(format!("The keyword density is good ({:.1}%).", density));
    }
    let message = format!("The keyword density is {:.1}% (recommended: 2-5%).", density);
    if (1.0..2.0).contains(&density) || (density > 5.0 && density <= 7.0) {
        return BODY_DENSITY.warn(5, message, "Adjust the keyword density to 2-5%.");
    }
    BODY_DENSITY.fail(message, "Add or remove keyword occurrences in the body.")
}

pub fn check_body_length(body: &str) -> SeoCheckItem {
    let length = text::compact_len(&text::strip_markup(body));
    if length >= 1500 {
        return BODY_LENGTH.pass(format!("The body is long enough ({} chars).", length));
    }
    let message = format!("The body is {} chars (recommended: 1500 or more).", length);
    if length >= 1000 {
        return BODY_LENGTH.warn(5, message, "Flesh out the content a little more (1500+ chars).");
    }
    BODY_LENGTH.fail(message, "Expand the body to at least 1500 characters.")
}

pub fn check_opening_keyword(body: &str, keyword: &str) -> SeoCheckItem {
    let opening = text::first_chars(body, OPENING_CHARS).to_lowercase();
    if text::contains_keyword(&opening, keyword) {
        return BODY_OPENING.pass("The opening contains the target keyword.");
    }
    BODY_OPENING.fail(
        "The first 100 characters do not contain the target keyword.",
        "Mention the keyword at the start of the article.",
    )
}

pub fn check_paragraph_length(body: &str) -> SeoCheckItem {
    let paragraphs = text::paragraphs(body);
    if paragraphs.is_empty() {
        return BODY_PARAGRAPHS.warn(
            3,
            "No paragraphs were detected.",
            "Split the body into paragraphs.",
        );
    }
    let long_paragraphs = paragraphs
        .iter()
        .filter(|p| p.matches(SENTENCE_END).count() > MAX_SENTENCES_PER_PARAGRAPH)
        .count();
    if long_paragraphs == 0 {
        return BODY_PARAGRAPHS.pass("Paragraph lengths are good.");
    }
    BODY_PARAGRAPHS.warn(
        3,
        format!("{} paragraph(s) are too long.", long_paragraphs),
        "Break long paragraphs into 3-4 sentences.",
    )
}

pub fn check_lists_tables(body: &str) -> SeoCheckItem {
    if text::has_list(body) || text::has_table(body) {
        return STRUCTURE_LISTS.pass("Lists or tables are used.");
    }
    STRUCTURE_LISTS.fail(
        "No lists or tables are used.",
        "Use bullet lists or tables where they help.",
    )
}

pub fn check_external_links(body: &str) -> SeoCheckItem {
    let links = text::external_link_count(body);
    if links > 0 {
        return STRUCTURE_LINKS.pass(format!("There are {} external link(s).", links));
    }
    STRUCTURE_LINKS.fail(
        "There are no external links.",
        "Link to reliable external sources.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(n: usize) -> String {
        "a".repeat(n)
    }

    #[test]
    fn test_title_length_boundaries() {
        assert_eq!(check_title_length(&chars(30)).status, CheckStatus::Pass);
        assert_eq!(check_title_length(&chars(60)).status, CheckStatus::Pass);
        assert_eq!(check_title_length(&chars(29)).status, CheckStatus::Warn);
        assert_eq!(check_title_length(&chars(29)).score, 3);
        assert_eq!(check_title_length(&chars(61)).status, CheckStatus::Warn);
        assert_eq!(check_title_length(&chars(19)).status, CheckStatus::Fail);
        assert_eq!(check_title_length(&chars(71)).score, 0);
    }

    #[test]
    fn test_title_length_counts_characters_not_bytes() {
        let title = "あ".repeat(30);
        assert_eq!(check_title_length(&title).status, CheckStatus::Pass);
    }

    #[test]
    fn test_meta_length_grades() {
        assert_eq!(check_meta_length("   ").score, 0);
        assert_eq!(check_meta_length("   ").status, CheckStatus::Fail);
        assert_eq!(check_meta_length(&chars(120)).score, 5);
        assert_eq!(check_meta_length(&chars(100)).score, 3);
        assert_eq!(check_meta_length(&chars(200)).score, 3);
        let long = check_meta_length(&chars(201));
        assert_eq!(long.score, 0);
        assert!(long.suggestion.is_some());
    }

    #[test]
    fn test_meta_keyword() {
        assert_eq!(check_meta_keyword("", "rust").status, CheckStatus::Fail);
        assert_eq!(check_meta_keyword("Learn RUST today", "rust").score, 5);
        assert_eq!(check_meta_keyword("Learn Go today", "rust").score, 0);
    }

    #[test]
    fn test_heading_hierarchy_levels() {
        assert_eq!(check_heading_hierarchy("## A\n### B").score, 10);
        assert_eq!(check_heading_hierarchy("## A\n## B").score, 7);
        let only_h1 = check_heading_hierarchy("# Title\n#### Deep");
        assert_eq!(only_h1.status, CheckStatus::Warn);
        assert_eq!(only_h1.score, 3);
        assert_eq!(check_heading_hierarchy("plain text").score, 0);
    }

    #[test]
    fn test_heading_keyword() {
        assert_eq!(check_heading_keyword("no headings", "rust").score, 0);
        assert_eq!(check_heading_keyword("## Why Rust", "rust").score, 5);
        assert_eq!(check_heading_keyword("## Why Go", "rust").status, CheckStatus::Fail);
    }

    #[test]
    fn test_density_boundaries_are_inclusive() {
        // "ab" once in 100 chars: exactly 2%.
        let two = format!("ab{}", "x".repeat(98));
        assert_eq!(keyword_density(&two, "ab"), Some(2.0));
        assert_eq!(check_keyword_density(&two, "ab").status, CheckStatus::Pass);

        // "ab" five times in 200 chars: exactly 5%.
        let five = format!("{}{}", "ab".repeat(5), "x".repeat(190));
        assert_eq!(keyword_density(&five, "ab"), Some(5.0));
        assert_eq!(check_keyword_density(&five, "ab").status, CheckStatus::Pass);
    }

    #[test]
    fn test_density_warn_and_fail() {
        let low = format!("ab{}", "x".repeat(148));
        assert_eq!(check_keyword_density(&low, "ab").score, 5);
        let high = format!("{}{}", "ab".repeat(7), "x".repeat(86));
        assert_eq!(check_keyword_density(&high, "ab").score, 0);
        assert_eq!(check_keyword_density("", "ab").status, CheckStatus::Fail);
        assert_eq!(check_keyword_density("### \n", "ab").message, "The body is empty.");
    }

    #[test]
    fn test_density_ignores_markup_and_whitespace() {
        // 4 visible chars after stripping, keyword "ab" once: 50%.
        assert_eq!(keyword_density("**ab** cd\n", "ab"), Some(50.0));
    }

    #[test]
    fn test_body_length_grades() {
        assert_eq!(check_body_length(&chars(1500)).score, 10);
        assert_eq!(check_body_length(&chars(1499)).score, 5);
        assert_eq!(check_body_length(&chars(1000)).score, 5);
        assert_eq!(check_body_length(&chars(999)).score, 0);
        assert_eq!(check_body_length(&"- ".repeat(2000)).score, 0);
    }

    #[test]
    fn test_opening_keyword_window() {
        let early = format!("rust {}", chars(200));
        assert_eq!(check_opening_keyword(&early, "rust").score, 5);
        let late = format!("{}rust", chars(100));
        assert_eq!(check_opening_keyword(&late, "rust").score, 0);
    }

    #[test]
    fn test_paragraph_length() {
        assert_eq!(check_paragraph_length("").score, 3);
        assert_eq!(check_paragraph_length("## only heading").score, 3);
        assert_eq!(check_paragraph_length("一。二。三。\n\n四。").score, 5);
        let long = check_paragraph_length("一。二。三。四。五。六。");
        assert_eq!(long.status, CheckStatus::Warn);
        assert_eq!(long.score, 3);
    }

    #[test]
    fn test_structure_checks() {
        assert_eq!(check_lists_tables("- item").score, 5);
        assert_eq!(check_lists_tables("prose").status, CheckStatus::Fail);
        assert_eq!(check_external_links("[a](https://example.com)").score, 5);
        assert_eq!(check_external_links("[a](/local)").score, 0);
    }

    #[test]
    fn test_zero_scores_are_failures() {
        for item in [
            check_meta_length(&chars(79)),
            check_meta_length(&chars(201)),
            check_lists_tables("prose only"),
            check_external_links("no links here"),
        ] {
            assert_eq!(item.score, 0, "{}", item.name);
            assert_eq!(item.status, CheckStatus::Fail, "{}", item.name);
        }
    }
}
