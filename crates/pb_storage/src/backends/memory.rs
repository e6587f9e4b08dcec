use std::sync::Arc;

use async_trait::async_trait;
use pb_core::{Draft, DraftStorage, Error, HistoryRecord, HistoryStorage, Result};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryStore {
    drafts: Vec<Draft>,
    history: Vec<HistoryRecord>,
    next_draft_id: i64,
    next_history_id: i64,
}

impl MemoryStore {
    fn allocate_draft_id(&mut self) -> i64 {
        self.next_draft_id += 1;
        self.next_draft_id
    }

    fn allocate_history_id(&mut self) -> i64 {
        self.next_history_id += 1;
        self.next_history_id
    }
}

/// Process-local storage. Ids start at 1 and are never reused.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DraftStorage for MemoryStorage {
    async fn save_draft(&self, draft: &Draft) -> Result<Draft> {
        let mut store = self.store.write().await;
        match draft.id {
            None => {
                let mut saved = draft.clone();
                saved.id = Some(store.allocate_draft_id());
                store.drafts.push(saved.clone());
                Ok(saved)
            }
            Some(id) => {
                let existing = store
                    .drafts
                    .iter_mut()
                    .find(|d| d.id == Some(id))
                    .ok_or_else(|| Error::Storage(format!("draft {} not found", id)))?;
                *existing = draft.clone();
                Ok(draft.clone())
            }
        }
    }

    async fn find_draft(&self, id: i64) -> Result<Option<Draft>> {
        let store = self.store.read().await;
        Ok(store.drafts.iter().find(|d| d.id == Some(id)).cloned())
    }

    async fn find_all_drafts(&self) -> Result<Vec<Draft>> {
        let store = self.store.read().await;
        let mut drafts = store.drafts.clone();
        drafts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(drafts)
    }

    async fn delete_draft(&self, id: i64) -> Result<bool> {
        let mut store = self.store.write().await;
        let before = store.drafts.len();
        store.drafts.retain(|d| d.id != Some(id));
        Ok(store.drafts.len() != before)
    }
}

#[async_trait]
impl HistoryStorage for MemoryStorage {
    async fn save_history(&self, record: &HistoryRecord) -> Result<HistoryRecord> {
        let mut store = self.store.write().await;
        let mut saved = record.clone();
        saved.id = Some(store.allocate_history_id());
        store.history.push(saved.clone());
        Ok(saved)
    }

    async fn find_history(&self, id: i64) -> Result<Option<HistoryRecord>> {
        let store = self.store.read().await;
        Ok(store.history.iter().find(|r| r.id == Some(id)).cloned())
    }

    async fn find_all_history(&self) -> Result<Vec<HistoryRecord>> {
        let store = self.store.read().await;
        let mut records = store.history.clone();
        records.sort_by(|a, b| b.published_at.cmp(&a.published_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn delete_history(&self, id: i64) -> Result<bool> {
        let mut store = self.store.write().await;
        let before = store.history.len();
        store.history.retain(|r| r.id != Some(id));
        Ok(store.history.len() != before)
    }
}
