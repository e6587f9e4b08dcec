pub mod manager;
pub mod publishers;
pub mod summary;

pub use manager::PublishManager;
pub use publishers::{create_publishers, ServicesConfig};
pub use summary::{summarize, PublishFailure, PublishSuccess, PublishSummary};

pub mod prelude {
    pub use super::manager::PublishManager;
    pub use super::summary::{summarize, PublishSummary};
    pub use pb_core::{Error, PublishRequest, PublishResult, PublishStatus, Publisher, Result};
}
