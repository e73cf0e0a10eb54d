use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::models::profile::TryOnRecord;

/// Best-effort sink for completed try-ons. Write failures are tolerated
/// and never escalated to the job outcome.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn record_try_on(&self, user_id: &str, record: TryOnRecord) -> Result<(), HistoryError>;
}

pub struct MemoryHistoryStore {
    records: Mutex<Vec<(String, TryOnRecord)>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(String, TryOnRecord)>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn for_user(&self, user_id: &str) -> Vec<TryOnRecord> {
        self.lock()
            .iter()
            .filter(|(id, _)| id == user_id)
            .map(|(_, record)| record.clone())
            .collect()
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn record_try_on(&self, user_id: &str, record: TryOnRecord) -> Result<(), HistoryError> {
        self.lock().push((user_id.to_string(), record));
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history write failed: {0}")]
    Write(String),
}
