use super::{EventLog, EventRecord};
use crate::error::HistoryError;
use crate::events::BowlEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// In-process event history. Clones share the same entries.
#[derive(Clone, Default)]
pub struct MemoryEventLog {
    records: Arc<RwLock<Vec<EventRecord>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent appends fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn append(&self, event: BowlEvent, timestamp: DateTime<Utc>) -> Result<(), HistoryError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(HistoryError::Write {
                details: "memory event log set to fail".to_string(),
            });
        }

        self.records
            .write()
            .insert(0, EventRecord::new(event, timestamp));
        Ok(())
    }

    async fn list(&self) -> Result<Vec<EventRecord>, HistoryError> {
        Ok(self.records.read().clone())
    }
}
