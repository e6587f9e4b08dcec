use std::fmt;

use async_trait::async_trait;
use pb_core::{Error, PublishRequest, PublishResult, Publisher, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use url::Url;

use super::{http_client, require_url, CHECK_TIMEOUT};

#[derive(Debug, Serialize)]
struct WordPressPost<'a> {
    title: &'a str,
    content: &'a str,
    status: &'static str,
}

#[derive(Debug, Deserialize)]
struct WordPressPostResponse {
    link: Option<String>,
}

/// WordPress REST API client using an application password.
///
/// The markdown body is sent as-is; WordPress sites with a markdown block or
/// plugin render it, others show the source.
pub struct WordPressPublisher {
    client: reqwest::Client,
    site_url: String,
    username: String,
    password: String,
}

impl fmt::Debug for WordPressPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordPressPublisher")
            .field("site_url", &self.site_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl WordPressPublisher {
    pub fn new(site_url: String, username: String, password: String) -> Result<Self> {
        let site_url = site_url.trim();
        if site_url.is_empty() {
            return Err(Error::Config("WordPress site URL is required".to_string()));
        }
        let parsed = Url::parse(site_url)
            .map_err(|e| Error::Config(format!("invalid WordPress site URL {}: {}", site_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "WordPress site URL must be http or https: {}",
                site_url
            )));
        }
        Ok(Self {
            client: http_client()?,
            site_url: site_url.trim_end_matches('/').to_string(),
            username,
            password,
        })
    }

    fn posts_endpoint(&self) -> String {
        format!("{}/wp-json/wp/v2/posts", self.site_url)
    }

    async fn create_post(&self, request: &PublishRequest) -> Result<String> {
        let post = WordPressPost {
            title: &request.title,
            content: &request.body,
            status: request.status.as_str(),
        };
        let response = self
            .client
            .post(self.posts_endpoint())
            .basic_auth(&self.username, Some(&self.password))
            .json(&post)
            .send()
            .await?
            .error_for_status()?;
        let created: WordPressPostResponse = response.json().await?;
        require_url("WordPress", created.link)
    }
}

#[async_trait]
impl Publisher for WordPressPublisher {
    fn service_name(&self) -> &str {
        "wordpress"
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishResult> {
        match self.create_post(request).await {
            Ok(url) => {
                info!("Posted to WordPress: {}", url);
                Ok(PublishResult::success(self.service_name(), url))
            }
            Err(e) => {
                error!("WordPress post failed: {}", e);
                Ok(PublishResult::failure(self.service_name(), e.to_string()))
            }
        }
    }

    async fn test_connection(&self) -> bool {
        let response = self
            .client
            .get(format!("{}/wp-json/wp/v2/users/me", self.site_url))
            .basic_auth(&self.username, Some(&self.password))
            .timeout(CHECK_TIMEOUT)
            .send()
            .await;
        match response {
            Ok(r) => r.status() == reqwest::StatusCode::OK,
            Err(e) => {
                error!("WordPress connection test failed: {}", e);
                false
            }
        }
    }
}
