use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use pb_core::{ChatMessage, ChatModel, Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Config;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const CHECK_MAX_TOKENS: u32 = 5;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completions client for OpenAI-compatible endpoints.
pub struct OpenAiModel {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f64,
}

impl fmt::Debug for OpenAiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiModel {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("OpenAI API key is required".to_string()))?;
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            model: config.model_name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
        })
    }

    async fn complete(&self, messages: &[ChatMessage], max_tokens: Option<u32>) -> Result<ChatResponse> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens,
        };
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication("OpenAI rejected the API key".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!("OpenAI returned {}: {}", status, body)));
        }
        Ok(response.json::<ChatResponse>().await?)
    }
}

#[async_trait]
impl ChatModel for OpenAiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        debug!("OpenAI chat request: model={}, messages={}", self.model, messages.len());
        let response = self.complete(messages, None).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        debug!("OpenAI chat response: {} chars", content.chars().count());
        Ok(content)
    }

    async fn test_connection(&self) -> Result<bool> {
        let response = self
            .complete(&[ChatMessage::user("hello")], Some(CHECK_MAX_TOKENS))
            .await?;
        Ok(!response.choices.is_empty())
    }
}
