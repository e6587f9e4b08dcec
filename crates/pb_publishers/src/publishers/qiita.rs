use std::fmt;

use async_trait::async_trait;
use pb_core::{Error, PublishRequest, PublishResult, Publisher, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{http_client, require_url, CHECK_TIMEOUT};

pub const QIITA_API_BASE: &str = "https://qiita.com/api/v2";
const MAX_TAGS: usize = 5;

#[derive(Debug, Serialize)]
struct QiitaTag<'a> {
    name: &'a str,
    versions: Vec<String>,
}

#[derive(Debug, Serialize)]
struct QiitaItem<'a> {
    title: &'a str,
    body: &'a str,
    tags: Vec<QiitaTag<'a>>,
    private: bool,
}

impl<'a> QiitaItem<'a> {
    fn from_request(request: &'a PublishRequest) -> Self {
        Self {
            title: &request.title,
            body: &request.body,
            tags: request
                .tags
                .iter()
                .take(MAX_TAGS)
                .map(|name| QiitaTag { name, versions: Vec::new() })
                .collect(),
            private: request.status.is_draft(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct QiitaItemResponse {
    url: Option<String>,
}

/// Qiita API v2 client authenticated with a personal access token.
pub struct QiitaPublisher {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl fmt::Debug for QiitaPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QiitaPublisher")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl QiitaPublisher {
    pub fn new(token: String) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(Error::Config("Qiita access token is required".to_string()));
        }
        Ok(Self {
            client: http_client()?,
            token,
            base_url: QIITA_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn create_item(&self, request: &PublishRequest) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/items", self.base_url))
            .bearer_auth(&self.token)
            .json(&QiitaItem::from_request(request))
            .send()
            .await?
            .error_for_status()?;
        let item: QiitaItemResponse = response.json().await?;
        require_url("Qiita", item.url)
    }
}

#[async_trait]
impl Publisher for QiitaPublisher {
    fn service_name(&self) -> &str {
        "qiita"
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishResult> {
        match self.create_item(request).await {
            Ok(url) => {
                info!("Posted to Qiita: {}", url);
                Ok(PublishResult::success(self.service_name(), url))
            }
            Err(e) => {
                error!("Qiita post failed: {}", e);
                Ok(PublishResult::failure(self.service_name(), e.to_string()))
            }
        }
    }

    async fn test_connection(&self) -> bool {
        let response = self
            .client
            .get(format!("{}/authenticated_user", self.base_url))
            .bearer_auth(&self.token)
            .timeout(CHECK_TIMEOUT)
            .send()
            .await;
        match response {
            Ok(r) => r.status() == reqwest::StatusCode::OK,
            Err(e) => {
                error!("Qiita connection test failed: {}", e);
                false
            }
        }
    }
}
