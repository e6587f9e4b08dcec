use async_trait::async_trait;
use pb_core::{ChatMessage, ChatModel, Result, Role};

/// Offline stand-in that echoes the last user message.
#[derive(Debug, Default)]
pub struct DummyModel;

impl DummyModel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChatModel for DummyModel {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        Ok(messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default())
    }

    async fn test_connection(&self) -> Result<bool> {
        Ok(true)
    }
}
