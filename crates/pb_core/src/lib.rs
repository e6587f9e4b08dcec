pub mod error;
pub mod models;
pub mod publisher;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::{ChatMessage, ChatModel, Role};
pub use publisher::Publisher;
pub use storage::{DraftStorage, HistoryStorage};
pub use types::*;
