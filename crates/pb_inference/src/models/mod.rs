use std::sync::Arc;

use pb_core::{ChatModel, Error, Result};
use tracing::info;

use crate::Config;

pub mod dummy;
pub mod openai;

pub use dummy::DummyModel;
pub use openai::OpenAiModel;

/// Builds the chat model named by `config.provider`.
pub fn create_model(config: &Config) -> Result<Arc<dyn ChatModel>> {
    let model: Arc<dyn ChatModel> = match config.provider.to_ascii_lowercase().as_str() {
        "openai" => Arc::new(OpenAiModel::new(config)?),
        "dummy" => Arc::new(DummyModel::new()),
        other => {
            return Err(Error::Config(format!("unknown chat model provider: {}", other)));
        }
    };
    info!("Using chat model: {}", model.name());
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_model_by_provider() {
        let config = Config {
            provider: "dummy".to_string(),
            ..Default::default()
        };
        assert_eq!(create_model(&config).unwrap().name(), "dummy");

        let config = Config {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert_eq!(create_model(&config).unwrap().name(), "gpt-4o");

        let config = Config {
            provider: "llama".to_string(),
            ..Default::default()
        };
        assert!(create_model(&config).is_err());
    }

    #[test]
    fn test_openai_requires_api_key() {
        let err = create_model(&Config::default()).err().unwrap();
        assert!(err.to_string().contains("API key"));
    }
}
