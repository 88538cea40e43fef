//! Application intake: validate, stamp and persist submissions, and read
//! them back.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use intake_core::{
    format_timestamp, ApplicationRecord, DayKey, Grade, SubmissionInput, SubmitResponse,
};
use tracing::info;

use crate::error::ServiceError;
use crate::store::RecordRepository;

pub const SUBMIT_SUCCESS_MESSAGE: &str = "Application saved";

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Clone)]
pub struct IntakeService {
    store: Arc<dyn RecordRepository>,
    clock: Arc<dyn Clock>,
    strict_grades: bool,
}

impl IntakeService {
    pub fn new(store: Arc<dyn RecordRepository>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            strict_grades: false,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Reject grades other than the four class-year labels.
    pub fn with_strict_grades(mut self, strict: bool) -> Self {
        self.strict_grades = strict;
        self
    }

    /// Validate and persist a submission into today's partition.
    ///
    /// Nothing is written unless every field is present.
    pub async fn submit(&self, input: SubmissionInput) -> Result<SubmitResponse, ServiceError> {
        let fields = input.into_fields().map_err(ServiceError::MissingField)?;

        if self.strict_grades {
            fields.grade.parse::<Grade>()?;
        }

        let now = self.clock.now();
        let day = DayKey::from(now);
        let timestamp = format_timestamp(now);
        let record = ApplicationRecord::new(timestamp.clone(), fields);

        self.store.append(day, record).await?;
        info!("Stored application in partition {}", day);

        Ok(SubmitResponse {
            message: SUBMIT_SUCCESS_MESSAGE.to_string(),
            timestamp,
        })
    }

    /// Records for one day, in submission order.
    ///
    /// A date that is not a valid `YYYY-MM-DD` is reported as not found.
    pub async fn get_by_day(&self, date: &str) -> Result<Vec<ApplicationRecord>, ServiceError> {
        let day: DayKey = date
            .parse()
            .map_err(|_| ServiceError::NotFound(date.to_string()))?;
        Ok(self.store.read_day(day).await?)
    }

    /// Every record, newest first.
    ///
    /// Records with equal or unparseable timestamps keep a fixed relative
    /// order so repeated calls return the same sequence.
    pub async fn get_all(&self) -> Result<Vec<ApplicationRecord>, ServiceError> {
        let mut records = self.store.read_all().await?;
        records.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));
        Ok(records)
    }
}

fn sort_key(record: &ApplicationRecord) -> (Option<DateTime<Utc>>, &str) {
    (record.instant(), record.timestamp.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryRecordStore, StoreError};
    use chrono::TimeZone;
    use intake_core::{ApplicationFields, FormField};

    fn alice() -> SubmissionInput {
        SubmissionInput {
            name: Some("Alice".to_string()),
            grade: Some("大一".to_string()),
            introduction: Some("Hello".to_string()),
        }
    }

    fn service_at(instant: DateTime<Utc>) -> (IntakeService, Arc<InMemoryRecordStore>) {
        let store = Arc::new(InMemoryRecordStore::new());
        let service =
            IntakeService::new(store.clone()).with_clock(Arc::new(FixedClock(instant)));
        (service, store)
    }

    #[tokio::test]
    async fn test_submit_stores_record_in_todays_partition() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).unwrap();
        let (service, store) = service_at(now);

        let response = service.submit(alice()).await.unwrap();
        assert_eq!(response.message, SUBMIT_SUCCESS_MESSAGE);
        assert_eq!(response.timestamp, "2025-06-01T08:30:00.000Z");

        let stored = store.read_day("2025-06-01".parse().unwrap()).await.unwrap();
        assert_eq!(
            stored,
            vec![ApplicationRecord::new(
                "2025-06-01T08:30:00.000Z",
                ApplicationFields::new("Alice", "大一", "Hello"),
            )]
        );

        let fetched = service.get_by_day("2025-06-01").await.unwrap();
        assert_eq!(fetched, stored);
    }

    #[tokio::test]
    async fn test_submit_missing_grade_persists_nothing() {
        let (service, store) = service_at(Utc::now());
        let mut input = alice();
        input.grade = None;

        let err = service.submit(input).await.unwrap_err();
        assert!(matches!(err, ServiceError::MissingField(FormField::Grade)));
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_strict_grades() {
        let (service, _store) = service_at(Utc::now());
        let mut input = alice();
        input.grade = Some("graduate".to_string());

        service.submit(input.clone()).await.unwrap();

        let strict = service.with_strict_grades(true);
        assert!(matches!(
            strict.submit(input).await,
            Err(ServiceError::UnknownGrade(_))
        ));
        strict.submit(alice()).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_by_day_invalid_date_is_not_found() {
        let (service, _store) = service_at(Utc::now());
        for date in ["not-a-date", "2025-6-1", "2025-02-30"] {
            assert!(matches!(
                service.get_by_day(date).await,
                Err(ServiceError::NotFound(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_get_by_day_missing_partition() {
        let (service, _store) = service_at(Utc::now());
        assert!(matches!(
            service.get_by_day("2025-06-01").await,
            Err(ServiceError::Storage(StoreError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_get_all_newest_first_and_stable() {
        let store = Arc::new(InMemoryRecordStore::new());
        let entries = [
            ("2025-06-01", "2025-06-01T09:00:00.000Z", "a"),
            ("2025-06-02", "2025-06-02T08:00:00.000Z", "b"),
            ("2025-06-01", "2025-06-01T10:00:00.000Z", "c"),
            ("2025-06-01", "garbage", "d"),
            ("2025-06-02", "2025-06-02T08:00:00.000Z", "e"),
        ];
        for (day, timestamp, name) in entries {
            store
                .append(
                    day.parse().unwrap(),
                    ApplicationRecord::new(timestamp, ApplicationFields::new(name, "大三", "x")),
                )
                .await
                .unwrap();
        }
        let service = IntakeService::new(store);

        let names = |records: Vec<ApplicationRecord>| -> Vec<String> {
            records.into_iter().map(|r| r.name).collect()
        };
        let first = names(service.get_all().await.unwrap());
        assert_eq!(first, vec!["b", "e", "c", "a", "d"]);
        assert_eq!(names(service.get_all().await.unwrap()), first);
    }

    #[tokio::test]
    async fn test_get_all_empty() {
        let (service, _store) = service_at(Utc::now());
        assert!(service.get_all().await.unwrap().is_empty());
    }
}
