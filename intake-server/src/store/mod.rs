//! Append-only record storage, partitioned by calendar day.
//!
//! `RecordRepository` is the seam between the services and the storage
//! backend. Records are only ever appended; there is no update or delete.

mod file;
mod memory;

pub use file::FileRecordStore;
pub use memory::InMemoryRecordStore;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use intake_core::{ApplicationRecord, DayKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// No partition exists for the day.
    #[error("no applications stored for {0}")]
    NotFound(DayKey),

    /// The partition exists but is not a JSON array of records.
    #[error("partition for {day} is unreadable: {source}")]
    Decode {
        day: DayKey,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode partition for {day}: {source}")]
    Encode {
        day: DayKey,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Append a record to the day's partition, creating it if needed.
    ///
    /// A partition that cannot be decoded is treated as empty.
    async fn append(&self, day: DayKey, record: ApplicationRecord) -> Result<(), StoreError>;

    /// The day's records in submission order.
    async fn read_day(&self, day: DayKey) -> Result<Vec<ApplicationRecord>, StoreError>;

    /// Days that have a partition, ascending.
    async fn days(&self) -> Result<Vec<DayKey>, StoreError>;

    /// Every record, partitions concatenated in ascending day order.
    async fn read_all(&self) -> Result<Vec<ApplicationRecord>, StoreError> {
        let mut all = Vec::new();
        for day in self.days().await? {
            match self.read_day(day).await {
                Ok(records) => all.extend(records),
                // Removed from under us since it was listed.
                Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(all)
    }
}
