use async_trait::async_trait;

use crate::types::{Draft, HistoryRecord};
use crate::Result;

#[async_trait]
pub trait DraftStorage: Send + Sync {
    /// Insert when `draft.id` is `None`, update otherwise. Returns the stored draft.
    async fn save_draft(&self, draft: &Draft) -> Result<Draft>;

    async fn find_draft(&self, id: i64) -> Result<Option<Draft>>;

    /// All drafts, most recently updated first.
    async fn find_all_drafts(&self) -> Result<Vec<Draft>>;

    async fn delete_draft(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait HistoryStorage: Send + Sync {
    /// Append a record and return it with its assigned id.
    async fn save_history(&self, record: &HistoryRecord) -> Result<HistoryRecord>;

    async fn find_history(&self, id: i64) -> Result<Option<HistoryRecord>>;

    /// All records, newest `published_at` first.
    async fn find_all_history(&self) -> Result<Vec<HistoryRecord>>;

    async fn delete_history(&self, id: i64) -> Result<bool>;
}
