//! Article generation: one chat completion turns a brief into a markdown
//! article followed by a JSON block of SEO advice.

use std::sync::Arc;

use chrono::Utc;
use pb_core::{Article, ChatMessage, ChatModel, Result, SeoAdvice, SeoMetadata};
use tracing::{info, warn};

pub const SEO_ADVICE_START: &str = "---SEO_ADVICE_START---";
pub const SEO_ADVICE_END: &str = "---SEO_ADVICE_END---";

const SYSTEM_PROMPT: &str = "You are a professional blog writer who knows SEO well.";

/// What the interview produced: a summary of the requested article and its
/// SEO targets.
#[derive(Debug, Clone, Default)]
pub struct ArticleBrief {
    pub blog_type_id: String,
    pub summary: String,
    pub seo: SeoMetadata,
}

impl ArticleBrief {
    fn prompt(&self) -> String {
        format!(
            "Write an SEO-optimised blog article based on the interview below.\n\
             \n\
             ## Interview summary\n\
             {summary}\n\
             \n\
             ## SEO\n\
             - Target keyword: {keyword}\n\
             - Target audience: {audience}\n\
             - Search intent: {intent}\n\
             \n\
             ## Requirements\n\
             1. Output markdown with one `# ` title line.\n\
             2. Put the keyword in the title.\n\
             3. Structure the body with H2 and H3 headings.\n\
             4. Aim for a keyword density of 2-5%.\n\
             5. Open with a meta description of 120-160 characters.\n\
             6. Write at least 1500 characters.\n\
             \n\
             After the article, explain the SEO measures as JSON between the markers:\n\
             {start}\n\
             {{\"items\": [{{\"category\": \"\", \"point\": \"\", \"reason\": \"\", \"edit_tip\": \"\"}}], \
             \"summary\": \"\", \"target_keyword\": \"{keyword}\", \"generated_at\": \"\"}}\n\
             {end}\n",
            summary = self.summary,
            keyword = self.seo.keyword,
            audience = self.seo.target_audience,
            intent = self.seo.search_intent,
            start = SEO_ADVICE_START,
            end = SEO_ADVICE_END,
        )
    }
}

pub struct ArticleGenerator {
    model: Arc<dyn ChatModel>,
}

impl ArticleGenerator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Asks the model for an article. Chat errors propagate; a reply without
    /// a usable advice block still yields the article.
    pub async fn generate(&self, brief: &ArticleBrief) -> Result<(Article, SeoAdvice)> {
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(brief.prompt())];
        let reply = self.model.chat(&messages).await?;
        let (body, advice) = parse_article_response(&reply);

        let mut article = Article::new(extract_title(&body), body);
        article.blog_type_id = brief.blog_type_id.clone();
        article.seo = brief.seo.clone();
        info!("📝 Generated article \"{}\" with {}", article.title, self.model.name());
        Ok((article, advice))
    }
}

/// Splits a reply into the article body and the advice between the markers.
/// Without both markers the whole reply is the body.
pub fn parse_article_response(response: &str) -> (String, SeoAdvice) {
    let (Some(start), Some(end)) = (response.find(SEO_ADVICE_START), response.find(SEO_ADVICE_END)) else {
        return (response.trim().to_string(), SeoAdvice::default());
    };
    let body = response[..start].trim().to_string();
    let json = response
        .get(start + SEO_ADVICE_START.len()..end)
        .unwrap_or_default()
        .trim();
    (body, parse_seo_advice(json))
}

fn parse_seo_advice(json: &str) -> SeoAdvice {
    let json = json
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    match serde_json::from_str::<SeoAdvice>(json) {
        Ok(mut advice) => {
            if advice.generated_at.is_empty() {
                advice.generated_at = Utc::now().to_rfc3339();
            }
            advice
        }
        Err(e) => {
            warn!("Failed to parse SEO advice: {}", e);
            SeoAdvice::default()
        }
    }
}

/// The first `# ` line, or empty when the body has no H1.
pub fn extract_title(body: &str) -> String {
    body.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DummyModel;
    use async_trait::async_trait;
    use pb_core::Error;

    struct CannedModel(&'static str);

    #[async_trait]
    impl ChatModel for CannedModel {
        fn name(&self) -> &str {
            "canned"
        }

        async fn chat(&self, _messages: &[ChatMessage]) -> Result<String> {
            Ok(self.0.to_string())
        }

        async fn test_connection(&self) -> Result<bool> {
            Ok(true)
        }
    }

    struct DownModel;

    #[async_trait]
    impl ChatModel for DownModel {
        fn name(&self) -> &str {
            "down"
        }

        async fn chat(&self, _messages: &[ChatMessage]) -> Result<String> {
            Err(Error::Inference("503 Service Unavailable".to_string()))
        }

        async fn test_connection(&self) -> Result<bool> {
            Ok(false)
        }
    }

    const REPLY: &str = "# Rust入門ガイド\n\n## 所有権\n\n本文です。\n\n\
        ---SEO_ADVICE_START---\n\
        {\"items\": [{\"category\": \"タイトル\", \"point\": \"キーワードを先頭に\", \
        \"reason\": \"CTR向上\", \"edit_tip\": \"語順を崩さない\"}], \
        \"summary\": \"基本を押さえた構成\", \"target_keyword\": \"Rust\", \
        \"generated_at\": \"2026-10-19T10:00:00+09:00\"}\n\
        ---SEO_ADVICE_END---\n";

    fn brief() -> ArticleBrief {
        ArticleBrief {
            blog_type_id: "tech".to_string(),
            summary: "Rust beginners guide".to_string(),
            seo: SeoMetadata {
                keyword: "Rust".to_string(),
                target_audience: "beginners".to_string(),
                search_intent: "learn".to_string(),
            },
        }
    }

    #[test]
    fn test_parse_splits_body_and_advice() {
        let (body, advice) = parse_article_response(REPLY);
        assert_eq!(body, "# Rust入門ガイド\n\n## 所有権\n\n本文です。");
        assert_eq!(advice.items.len(), 1);
        assert_eq!(advice.items[0].category, "タイトル");
        assert_eq!(advice.items[0].edit_tip, "語順を崩さない");
        assert_eq!(advice.target_keyword, "Rust");
        assert_eq!(advice.generated_at, "2026-10-19T10:00:00+09:00");
    }

    #[test]
    fn test_parse_without_markers_keeps_everything() {
        let (body, advice) = parse_article_response("  # Title\n\nbody\n");
        assert_eq!(body, "# Title\n\nbody");
        assert!(advice.is_empty());

        let (body, _) = parse_article_response("# T\n---SEO_ADVICE_START---\n{}");
        assert!(body.contains(SEO_ADVICE_START));
    }

    #[test]
    fn test_bad_advice_json_is_dropped() {
        let reply = "# T\n\nbody\n---SEO_ADVICE_START---\nnot json\n---SEO_ADVICE_END---";
        let (body, advice) = parse_article_response(reply);
        assert_eq!(body, "# T\n\nbody");
        assert!(advice.is_empty());

        let fenced = "# T\n---SEO_ADVICE_START---\n```json\n{\"summary\": \"ok\"}\n```\n---SEO_ADVICE_END---";
        let (_, advice) = parse_article_response(fenced);
        assert_eq!(advice.summary, "ok");
        assert!(!advice.generated_at.is_empty());
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(extract_title("intro\n## Sub\n#  Real title \nmore"), "Real title");
        assert_eq!(extract_title("## Only h2\n#hashtag"), "");
        assert_eq!(extract_title(""), "");
    }

    #[tokio::test]
    async fn test_generate_builds_article_from_reply() {
        let generator = ArticleGenerator::new(Arc::new(CannedModel(REPLY)));
        let (article, advice) = generator.generate(&brief()).await.unwrap();

        assert_eq!(article.title, "Rust入門ガイド");
        assert!(article.body.ends_with("本文です。"));
        assert_eq!(article.blog_type_id, "tech");
        assert_eq!(article.seo.keyword, "Rust");
        assert_eq!(advice.summary, "基本を押さえた構成");
    }

    #[tokio::test]
    async fn test_generate_sends_the_brief() {
        // The dummy model echoes the prompt back.
        let generator = ArticleGenerator::new(Arc::new(DummyModel::new()));
        let (article, advice) = generator.generate(&brief()).await.unwrap();

        assert!(article.body.contains("Rust beginners guide"));
        assert!(article.body.contains("Target keyword: Rust"));
        assert!(article.body.contains("Search intent: learn"));
        assert!(article.title.is_empty());
        assert_eq!(advice.target_keyword, "Rust");
    }

    #[tokio::test]
    async fn test_chat_error_propagates() {
        let generator = ArticleGenerator::new(Arc::new(DownModel));
        let err = generator.generate(&brief()).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
