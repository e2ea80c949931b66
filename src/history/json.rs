use super::{EventLog, EventRecord};
use crate::error::HistoryError;
use crate::events::BowlEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Event history stored as a pretty-printed JSON array, newest entry first.
///
/// A missing or unreadable file is treated as an empty history. Before the next
/// append, an unreadable file is moved aside to `<path>.corrupt`. Writes go to
/// a sibling temp file which is then renamed over the log.
pub struct JsonEventLog {
    path: PathBuf,
    max_entries: usize,
    write_lock: Mutex<()>,
}

impl JsonEventLog {
    pub fn new<P: AsRef<Path>>(path: P, max_entries: usize) -> Self {
        let path = path.as_ref().to_path_buf();
        info!(
            "Event log at {} (keeping {} entries)",
            path.display(),
            max_entries
        );

        Self {
            path,
            max_entries: max_entries.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    /// Where an unreadable log is kept instead of being overwritten
    pub fn corrupt_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    async fn read_records(
        &self,
        preserve_corrupt: bool,
    ) -> Result<Vec<EventRecord>, HistoryError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Vec<EventRecord>>(&contents) {
            Ok(records) => Ok(records),
            Err(e) if preserve_corrupt => {
                let corrupt_path = self.corrupt_path();
                warn!(
                    "Event log {} is not valid JSON ({}), moving it to {} and starting fresh",
                    self.path.display(),
                    e,
                    corrupt_path.display()
                );
                fs::rename(&self.path, &corrupt_path)
                    .await
                    .map_err(|e| self.io_error(e))?;
                Ok(Vec::new())
            }
            Err(e) => {
                warn!(
                    "Event log {} is not valid JSON ({}), reading as empty",
                    self.path.display(),
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    async fn write_records(&self, records: &[EventRecord]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(records)?;
        let tmp_path = self.path.with_extension("json.tmp");

        fs::write(&tmp_path, json)
            .await
            .map_err(|e| self.io_error(e))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        Ok(())
    }
}

#[async_trait]
impl EventLog for JsonEventLog {
    async fn append(&self, event: BowlEvent, timestamp: DateTime<Utc>) -> Result<(), HistoryError> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.read_records(true).await?;
        records.insert(0, EventRecord::new(event, timestamp));

        if records.len() > self.max_entries {
            let dropped = records.len() - self.max_entries;
            records.truncate(self.max_entries);
            debug!("Trimmed {} old entries from event log", dropped);
        }

        self.write_records(&records).await?;
        debug!(
            "Logged {} at {} ({} entries)",
            event.event_type(),
            timestamp.to_rfc3339(),
            records.len()
        );
        Ok(())
    }

    async fn list(&self) -> Result<Vec<EventRecord>, HistoryError> {
        self.read_records(false).await
    }
}
