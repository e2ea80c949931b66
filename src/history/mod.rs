mod json;
mod memory;

use crate::error::HistoryError;
use crate::events::BowlEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use json::JsonEventLog;
pub use memory::MemoryEventLog;

/// One entry of the event history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    pub event: BowlEvent,
    #[serde(default)]
    pub description: String,
}

impl EventRecord {
    pub fn new(event: BowlEvent, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            event,
            description: event.description().to_string(),
        }
    }
}

/// Append-only record of fired events, read back most-recent-first
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn append(&self, event: BowlEvent, timestamp: DateTime<Utc>) -> Result<(), HistoryError>;

    /// All entries, newest first
    async fn list(&self) -> Result<Vec<EventRecord>, HistoryError>;
}
