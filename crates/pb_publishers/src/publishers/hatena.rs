use std::fmt;

use async_trait::async_trait;
use pb_core::{Error, PublishRequest, PublishResult, Publisher, Result};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use tracing::{error, info};

use super::{http_client, CHECK_TIMEOUT};

const HATENA_BLOG_BASE: &str = "https://blog.hatena.ne.jp";

/// Hatena Blog AtomPub client. Authenticates with the Hatena ID and the
/// blog's AtomPub API key over basic auth.
pub struct HatenaPublisher {
    client: reqwest::Client,
    hatena_id: String,
    blog_id: String,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for HatenaPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HatenaPublisher")
            .field("hatena_id", &self.hatena_id)
            .field("blog_id", &self.blog_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl HatenaPublisher {
    pub fn new(hatena_id: String, blog_id: String, api_key: String) -> Result<Self> {
        if hatena_id.trim().is_empty() || blog_id.trim().is_empty() {
            return Err(Error::Config("Hatena ID and blog ID are required".to_string()));
        }
        Ok(Self {
            client: http_client()?,
            hatena_id,
            blog_id,
            api_key,
            base_url: HATENA_BLOG_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn collection_url(&self) -> String {
        format!("{}/{}/{}/atom/entry", self.base_url, self.hatena_id, self.blog_id)
    }

    async fn post_entry(&self, request: &PublishRequest) -> Result<String> {
        let collection = self.collection_url();
        let response = self
            .client
            .post(&collection)
            .basic_auth(&self.hatena_id, Some(&self.api_key))
            .header(reqwest::header::CONTENT_TYPE, "application/atom+xml; charset=utf-8")
            .body(entry_xml(request))
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        Ok(alternate_link(&body).unwrap_or(collection))
    }
}

/// AtomPub entry document for one request.
pub(crate) fn entry_xml(request: &PublishRequest) -> String {
    let categories: String = request
        .tags
        .iter()
        .map(|tag| format!("  <category term=\"{}\" />\n", escape(tag.as_str())))
        .collect();
    let draft = if request.status.is_draft() { "yes" } else { "no" };

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<entry xmlns="http://www.w3.org/2005/Atom" xmlns:app="http://www.w3.org/2007/app">
  <title>{title}</title>
  <content type="text/x-markdown">{body}</content>
{categories}  <app:control>
    <app:draft>{draft}</app:draft>
  </app:control>
</entry>
"#,
        title = escape(request.title.as_str()),
        body = escape(request.body.as_str()),
        categories = categories,
        draft = draft,
    )
}

/// `href` of the first `<link rel="alternate">` in an Atom document.
pub(crate) fn alternate_link(xml: &str) -> Option<String> {
    let mut reader = quick_xml::Reader::from_reader(xml.as_bytes());
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"link" => {
                let mut rel = None;
                let mut href = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"rel" => rel = attr.unescape_value().ok().map(|v| v.into_owned()),
                        b"href" => href = attr.unescape_value().ok().map(|v| v.into_owned()),
                        _ => {}
                    }
                }
                if rel.as_deref() == Some("alternate") && href.is_some() {
                    return href;
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

#[async_trait]
impl Publisher for HatenaPublisher {
    fn service_name(&self) -> &str {
        "hatena"
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishResult> {
        match self.post_entry(request).await {
            Ok(url) => {
                info!("Posted to Hatena Blog: {}", url);
                Ok(PublishResult::success(self.service_name(), url))
            }
            Err(e) => {
                error!("Hatena Blog post failed: {}", e);
                Ok(PublishResult::failure(self.service_name(), e.to_string()))
            }
        }
    }

    async fn test_connection(&self) -> bool {
        let response = self
            .client
            .get(self.collection_url())
            .basic_auth(&self.hatena_id, Some(&self.api_key))
            .timeout(CHECK_TIMEOUT)
            .send()
            .await;
        match response {
            Ok(r) => r.status() == reqwest::StatusCode::OK,
            Err(e) => {
                error!("Hatena Blog connection test failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pb_core::PublishStatus;

    fn request() -> PublishRequest {
        PublishRequest {
            title: "Tips & <Tricks>".to_string(),
            body: "a < b && c".to_string(),
            tags: vec!["rust".to_string(), "\"quoted\"".to_string()],
            status: PublishStatus::Draft,
            blog_type_id: String::new(),
        }
    }

    #[test]
    fn test_entry_xml_escapes_content() {
        let xml = entry_xml(&request());
        assert!(xml.contains("<title>Tips &amp; &lt;Tricks&gt;</title>"));
        assert!(xml.contains("a &lt; b &amp;&amp; c"));
        assert!(xml.contains("<category term=\"rust\" />"));
        assert!(xml.contains("<category term=\"&quot;quoted&quot;\" />"));
        assert!(xml.contains("<app:draft>yes</app:draft>"));
    }

    #[test]
    fn test_alternate_link() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<entry xmlns="http://www.w3.org/2005/Atom">
  <link rel="edit" href="https://blog.hatena.ne.jp/me/me.hatenablog.com/atom/entry/1"/>
  <link rel="alternate" type="text/html" href="https://me.hatenablog.com/entry/2024/01/01/000000"/>
  <title>t</title>
</entry>"#;
        assert_eq!(
            alternate_link(xml).as_deref(),
            Some("https://me.hatenablog.com/entry/2024/01/01/000000")
        );
        assert_eq!(alternate_link("<entry><title>t</title></entry>"), None);
        assert_eq!(alternate_link("not xml <<<"), None);
    }

    #[tokio::test]
    async fn test_unreachable_host_becomes_failed_result() {
        let publisher = HatenaPublisher::new("me".to_string(), "me.hatenablog.com".to_string(), "key".to_string())
            .unwrap()
            .with_base_url("http://127.0.0.1:1".to_string());

        let result = publisher.publish(&request()).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.service_name, "hatena");
        assert!(!publisher.test_connection().await);
    }
}
