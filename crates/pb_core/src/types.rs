use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Number of body characters kept in a history entry.
pub const BODY_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoMetadata {
    pub keyword: String,
    pub target_audience: String,
    pub search_intent: String,
}

/// The article being edited. Persisted as a [`Draft`] on save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub blog_type_id: String,
    pub seo: SeoMetadata,
    pub meta_description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            title: title.into(),
            body: body.into(),
            tags: Vec::new(),
            blog_type_id: String::new(),
            seo: SeoMetadata::default(),
            meta_description: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Immutable snapshot handed to every publish target.
    pub fn to_publish_request(&self, status: PublishStatus) -> PublishRequest {
        PublishRequest {
            title: self.title.clone(),
            body: self.body.clone(),
            tags: self.tags.clone(),
            status,
            blog_type_id: self.blog_type_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    #[default]
    Publish,
    Draft,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::Publish => "publish",
            PublishStatus::Draft => "draft",
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, PublishStatus::Draft)
    }
}

impl fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublishStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "publish" => Ok(PublishStatus::Publish),
            "draft" => Ok(PublishStatus::Draft),
            other => Err(Error::Validation(format!("unknown publish status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub status: PublishStatus,
    pub blog_type_id: String,
}

/// Outcome of one publish target. `article_url` is set only on success,
/// `error_message` only on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub success: bool,
    pub service_name: String,
    pub article_url: Option<String>,
    pub error_message: Option<String>,
}

impl PublishResult {
    pub fn success(service_name: impl Into<String>, article_url: impl Into<String>) -> Self {
        Self {
            success: true,
            service_name: service_name.into(),
            article_url: Some(article_url.into()),
            error_message: None,
        }
    }

    pub fn failure(service_name: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            service_name: service_name.into(),
            article_url: None,
            error_message: Some(error_message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scored SEO rule outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoCheckItem {
    pub category: String,
    pub name: String,
    pub status: CheckStatus,
    pub score: u32,
    pub max_score: u32,
    pub message: String,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoAnalysisResult {
    pub score: u32,
    pub items: Vec<SeoCheckItem>,
    pub suggestions: Vec<String>,
}

impl SeoAnalysisResult {
    /// Totals the item scores and collects suggestions in item order.
    pub fn from_items(items: Vec<SeoCheckItem>) -> Self {
        let score = items.iter().map(|item| item.score).sum();
        let suggestions = items
            .iter()
            .filter_map(|item| item.suggestion.clone())
            .filter(|s| !s.is_empty())
            .collect();
        Self {
            score,
            items,
            suggestions,
        }
    }
}

/// One explained SEO measure that came with a generated article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeoAdviceItem {
    pub category: String,
    pub point: String,
    pub reason: String,
    pub edit_tip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeoAdvice {
    pub items: Vec<SeoAdviceItem>,
    pub summary: String,
    pub target_keyword: String,
    pub generated_at: String,
}

impl SeoAdvice {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.summary.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub id: Option<i64>,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub blog_type_id: String,
    pub hearing_data: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Draft {
    pub fn from_article(article: &Article) -> Self {
        Self {
            id: None,
            title: article.title.clone(),
            body: article.body.clone(),
            tags: article.tags.clone(),
            blog_type_id: article.blog_type_id.clone(),
            hearing_data: String::new(),
            created_at: article.created_at,
            updated_at: article.updated_at,
        }
    }

    pub fn to_article(&self) -> Article {
        Article {
            title: self.title.clone(),
            body: self.body.clone(),
            tags: self.tags.clone(),
            blog_type_id: self.blog_type_id.clone(),
            seo: SeoMetadata::default(),
            meta_description: String::new(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStatus {
    Published,
    Draft,
    Failed,
}

impl HistoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryStatus::Published => "published",
            HistoryStatus::Draft => "draft",
            HistoryStatus::Failed => "failed",
        }
    }
}

impl FromStr for HistoryStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "published" => Ok(HistoryStatus::Published),
            "draft" => Ok(HistoryStatus::Draft),
            "failed" => Ok(HistoryStatus::Failed),
            other => Err(Error::Storage(format!("unknown history status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Option<i64>,
    pub title: String,
    pub body_preview: String,
    pub blog_type_id: String,
    pub service_name: String,
    pub article_url: Option<String>,
    pub status: HistoryStatus,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// Builds the history entry for one publish result.
    pub fn from_result(article: &Article, result: &PublishResult, at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            title: article.title.clone(),
            body_preview: article.body.chars().take(BODY_PREVIEW_CHARS).collect(),
            blog_type_id: article.blog_type_id.clone(),
            service_name: result.service_name.clone(),
            article_url: result.article_url.clone(),
            status: if result.success {
                HistoryStatus::Published
            } else {
                HistoryStatus::Failed
            },
            published_at: at,
            created_at: at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(score: u32, suggestion: Option<&str>) -> SeoCheckItem {
        SeoCheckItem {
            category: "本文".to_string(),
            name: "test".to_string(),
            status: if suggestion.is_some() { CheckStatus::Warn } else { CheckStatus::Pass },
            score,
            max_score: 10,
            message: String::new(),
            suggestion: suggestion.map(str::to_string),
        }
    }

    #[test]
    fn test_publish_result_constructors() {
        let ok = PublishResult::success("qiita", "https://qiita.com/items/1");
        assert!(ok.success);
        assert!(ok.error_message.is_none());

        let err = PublishResult::failure("zenn", "push rejected");
        assert!(!err.success);
        assert!(err.article_url.is_none());
        assert_eq!(err.error_message.as_deref(), Some("push rejected"));
    }

    #[test]
    fn test_publish_status_parsing() {
        assert_eq!("draft".parse::<PublishStatus>().unwrap(), PublishStatus::Draft);
        assert_eq!("publish".parse::<PublishStatus>().unwrap(), PublishStatus::Publish);
        assert!("private".parse::<PublishStatus>().is_err());
    }

    #[test]
    fn test_analysis_result_totals() {
        let result = SeoAnalysisResult::from_items(vec![
            item(10, None),
            item(5, Some("見出しを追加してください。")),
            item(0, Some("")),
        ]);
        assert_eq!(result.score, 15);
        assert_eq!(result.suggestions, vec!["見出しを追加してください。".to_string()]);
    }

    #[test]
    fn test_history_record_from_result() {
        let body = "あ".repeat(300);
        let article = Article::new("タイトル", body);
        let failed = PublishResult::failure("hatena", "401 Unauthorized");
        let record = HistoryRecord::from_result(&article, &failed, Utc::now());
        assert_eq!(record.status, HistoryStatus::Failed);
        assert_eq!(record.body_preview.chars().count(), BODY_PREVIEW_CHARS);
        assert!(record.article_url.is_none());
    }

    #[test]
    fn test_article_snapshot() {
        let mut article = Article::new("Rust入門", "本文").with_tags(["rust", "tutorial"]);
        article.blog_type_id = "tech".to_string();
        let request = article.to_publish_request(PublishStatus::Draft);
        assert_eq!(request.tags, vec!["rust", "tutorial"]);
        assert!(request.status.is_draft());
        assert_eq!(request.blog_type_id, "tech");
    }
}
