//! In-memory implementation of `RecordRepository`.
//!
//! All records are lost on restart. Used by tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use intake_core::{ApplicationRecord, DayKey};
use tokio::sync::RwLock;

use super::{RecordRepository, StoreError};

#[derive(Default)]
pub struct InMemoryRecordStore {
    partitions: RwLock<BTreeMap<DayKey, Vec<ApplicationRecord>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecordStore {
    async fn append(&self, day: DayKey, record: ApplicationRecord) -> Result<(), StoreError> {
        let mut partitions = self.partitions.write().await;
        partitions.entry(day).or_default().push(record);
        Ok(())
    }

    async fn read_day(&self, day: DayKey) -> Result<Vec<ApplicationRecord>, StoreError> {
        let partitions = self.partitions.read().await;
        partitions
            .get(&day)
            .cloned()
            .ok_or(StoreError::NotFound(day))
    }

    async fn days(&self) -> Result<Vec<DayKey>, StoreError> {
        let partitions = self.partitions.read().await;
        Ok(partitions.keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_core::ApplicationFields;

    fn record(timestamp: &str, name: &str) -> ApplicationRecord {
        ApplicationRecord::new(timestamp, ApplicationFields::new(name, "大二", "intro"))
    }

    #[tokio::test]
    async fn test_missing_day_is_not_found() {
        let store = InMemoryRecordStore::new();
        let day: DayKey = "2025-06-01".parse().unwrap();
        assert!(matches!(
            store.read_day(day).await,
            Err(StoreError::NotFound(d)) if d == day
        ));
    }

    #[tokio::test]
    async fn test_read_all_concatenates_in_day_order() {
        let store = InMemoryRecordStore::new();
        let later: DayKey = "2025-06-02".parse().unwrap();
        let earlier: DayKey = "2025-06-01".parse().unwrap();

        store
            .append(later, record("2025-06-02T01:00:00.000Z", "b"))
            .await
            .unwrap();
        store
            .append(earlier, record("2025-06-01T01:00:00.000Z", "a"))
            .await
            .unwrap();

        let names: Vec<_> = store
            .read_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(store.days().await.unwrap(), vec![earlier, later]);
    }
}
