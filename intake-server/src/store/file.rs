//! Record store backed by one JSON file per day.
//!
//! Each partition lives at `<data_dir>/application_<YYYY-MM-DD>.txt` and holds
//! a pretty-printed JSON array of records in submission order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use intake_core::{ApplicationRecord, DayKey};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::{RecordRepository, StoreError};

pub const PARTITION_PREFIX: &str = "application_";
pub const PARTITION_SUFFIX: &str = ".txt";

/// Scratch file used by the startup writability check.
const WRITE_CHECK_FILE: &str = ".write-check";

/// File-backed record store.
///
/// # Concurrency
///
/// An append is a read-modify-write of the whole partition. Appends to the
/// same day are serialized by a per-partition lock so that two concurrent
/// submissions cannot both read the old sequence and drop one another.
/// Appends to different days do not contend.
///
/// Partitions are replaced by renaming a fully written temporary file, so a
/// reader sees either the old or the new sequence and never a torn write.
/// Reads therefore take no lock.
pub struct FileRecordStore {
    data_dir: PathBuf,
    /// Per-day locks serializing appends.
    partition_locks: RwLock<HashMap<DayKey, Arc<Mutex<()>>>>,
}

impl FileRecordStore {
    /// Open the store rooted at `data_dir`, creating the directory if needed.
    pub async fn new(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self {
            data_dir: data_dir.into(),
            partition_locks: RwLock::new(HashMap::new()),
        };
        store.ensure_data_dir().await?;
        info!("Using data directory: {}", store.data_dir.display());
        Ok(store)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn partition_path(&self, day: DayKey) -> PathBuf {
        self.data_dir
            .join(format!("{}{}{}", PARTITION_PREFIX, day, PARTITION_SUFFIX))
    }

    /// Write, read back and delete a scratch file in the data directory.
    pub async fn check_writable(&self) -> Result<(), StoreError> {
        self.ensure_data_dir().await?;
        let scratch = self.data_dir.join(WRITE_CHECK_FILE);
        let expected = format!("write check {}\n", Utc::now().timestamp_millis());

        fs::write(&scratch, &expected)
            .await
            .map_err(|e| StoreError::io("write", &scratch, e))?;
        let read_back = fs::read_to_string(&scratch)
            .await
            .map_err(|e| StoreError::io("read", &scratch, e))?;
        fs::remove_file(&scratch)
            .await
            .map_err(|e| StoreError::io("remove", &scratch, e))?;

        if read_back != expected {
            return Err(StoreError::io(
                "verify",
                &scratch,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "content read back differs from content written",
                ),
            ));
        }
        Ok(())
    }

    async fn ensure_data_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| StoreError::io("create data directory", &self.data_dir, e))
    }

    /// Get or create the lock for a partition.
    async fn partition_lock(&self, day: DayKey) -> Arc<Mutex<()>> {
        // Fast path: lock already exists
        {
            let locks = self.partition_locks.read().await;
            if let Some(lock) = locks.get(&day) {
                return lock.clone();
            }
        }

        // Slow path: double-check under the write lock
        let mut locks = self.partition_locks.write().await;
        locks
            .entry(day)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Read a partition. `Ok(None)` means it does not exist.
    async fn read_partition(
        &self,
        day: DayKey,
    ) -> Result<Option<Vec<ApplicationRecord>>, StoreError> {
        let path = self.partition_path(day);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io("read", &path, e)),
        };

        if content.trim().is_empty() {
            return Ok(Some(Vec::new()));
        }

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StoreError::Decode { day, source })
    }

    async fn write_partition(
        &self,
        day: DayKey,
        records: &[ApplicationRecord],
    ) -> Result<(), StoreError> {
        let path = self.partition_path(day);
        let staging = self
            .data_dir
            .join(format!(".{}{}{}.tmp", PARTITION_PREFIX, day, PARTITION_SUFFIX));

        let content = serde_json::to_string_pretty(records)
            .map_err(|source| StoreError::Encode { day, source })?;

        fs::write(&staging, content)
            .await
            .map_err(|e| StoreError::io("write", &staging, e))?;
        fs::rename(&staging, &path)
            .await
            .map_err(|e| StoreError::io("replace", &path, e))
    }

    /// Copy an undecodable partition aside so the next write does not
    /// destroy it. The partition itself stays in place until that write
    /// renames over it.
    async fn quarantine(&self, day: DayKey) -> Result<PathBuf, StoreError> {
        let path = self.partition_path(day);
        let mut aside = path.clone().into_os_string();
        aside.push(format!(".corrupt-{}", Utc::now().timestamp_millis()));
        let aside = PathBuf::from(aside);

        fs::copy(&path, &aside)
            .await
            .map_err(|e| StoreError::io("copy aside", &path, e))?;
        Ok(aside)
    }
}

/// Extract the day from a partition file name, ignoring anything else in the directory.
pub fn parse_partition_name(file_name: &str) -> Option<DayKey> {
    file_name
        .strip_prefix(PARTITION_PREFIX)?
        .strip_suffix(PARTITION_SUFFIX)?
        .parse()
        .ok()
}

#[async_trait]
impl RecordRepository for FileRecordStore {
    async fn append(&self, day: DayKey, record: ApplicationRecord) -> Result<(), StoreError> {
        let lock = self.partition_lock(day).await;
        let _guard = lock.lock().await;

        // The directory may have been removed since startup.
        self.ensure_data_dir().await?;

        let mut records = match self.read_partition(day).await {
            Ok(Some(records)) => records,
            Ok(None) => {
                info!("Creating partition for {}", day);
                Vec::new()
            }
            Err(StoreError::Decode { source, .. }) => {
                let aside = self.quarantine(day).await?;
                warn!(
                    "Partition for {} was unreadable ({}); copied it to {} and starting a new one",
                    day,
                    source,
                    aside.display()
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        records.push(record);
        self.write_partition(day, &records).await?;
        debug!("Partition for {} now holds {} records", day, records.len());
        Ok(())
    }

    async fn read_day(&self, day: DayKey) -> Result<Vec<ApplicationRecord>, StoreError> {
        self.read_partition(day)
            .await?
            .ok_or(StoreError::NotFound(day))
    }

    async fn days(&self) -> Result<Vec<DayKey>, StoreError> {
        let mut entries = match fs::read_dir(&self.data_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io("list", &self.data_dir, e)),
        };

        let mut days = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io("list", &self.data_dir, e))?
        {
            if let Some(day) = entry.file_name().to_str().and_then(parse_partition_name) {
                days.push(day);
            }
        }
        days.sort();
        Ok(days)
    }
}
