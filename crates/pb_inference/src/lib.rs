use std::fmt;

use serde::{Deserialize, Serialize};

pub mod article;
pub mod models;

pub use article::{ArticleBrief, ArticleGenerator};
pub use models::create_model;

pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Chat model settings, the `[openai]` section of the config file.
/// The API key is never written back to disk.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: String,
    pub model_name: String,
    pub base_url: String,
    pub temperature: f64,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            model_name: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            api_key: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("provider", &self.provider)
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .finish()
    }
}

pub mod prelude {
    pub use super::article::{ArticleBrief, ArticleGenerator};
    pub use super::models::create_model;
    pub use super::Config;
    pub use pb_core::{ChatMessage, ChatModel, Error, Result, Role};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_and_redaction() {
        let mut config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.model_name, DEFAULT_MODEL);
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);

        config.api_key = Some("sk-secret".to_string());
        assert!(!format!("{:?}", config).contains("sk-secret"));
        assert!(!serde_json::to_string(&config).unwrap().contains("sk-secret"));
    }
}
