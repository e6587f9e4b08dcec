//! Rule-based SEO scoring for markdown articles.
//!
//! [`analyze_seo`] runs thirteen independent rules and returns one
//! [`SeoCheckItem`](pb_core::SeoCheckItem) per rule, always in the same
//! order. The maximum scores add up to [`MAX_SCORE`] (90). No rule can
//! fail on any input; empty strings simply take each rule's fail path.

pub mod rules;
pub mod text;

use pb_core::{SeoAnalysisResult, SeoCheckItem};
use tracing::debug;

/// Number of items every analysis returns.
pub const RULE_COUNT: usize = 13;

/// Highest total score an article can reach.
pub const MAX_SCORE: u32 = rules::MAX_TOTAL;

/// Score an article against the target keyword.
///
/// Keyword matching is case-insensitive.
pub fn analyze_seo(title: &str, body: &str, keyword: &str, meta_description: &str) -> SeoAnalysisResult {
    let keyword = keyword.to_lowercase();

    let items: Vec<SeoCheckItem> = vec![
        rules::check_title_keyword(title, &keyword),
        rules::check_title_length(title),
        rules::check_meta_exists(meta_description),
        rules::check_meta_length(meta_description),
        rules::check_meta_keyword(meta_description, &keyword),
        rules::check_heading_hierarchy(body),
        rules::check_heading_keyword(body, &keyword),
        rules::check_keyword_density(body, &keyword),
        rules::check_body_length(body),
        rules::check_opening_keyword(body, &keyword),
        rules::check_paragraph_length(body),
        rules::check_lists_tables(body),
        rules::check_external_links(body),
    ];

    let result = SeoAnalysisResult::from_items(items);
    debug!(score = result.score, suggestions = result.suggestions.len(), "SEO analysis finished");
    result
}
