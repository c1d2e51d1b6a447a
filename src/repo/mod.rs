pub mod cache;
pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{AttendanceRecord, Device, Employee, PolicyWithShift, RecognitionEvent};

/// Employee lookups used by ingestion and policy evaluation.
#[async_trait]
pub trait EmployeeRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Employee>, StoreError>;
    async fn find_by_code(&self, code: &str) -> Result<Option<Employee>, StoreError>;
}

#[async_trait]
pub trait DeviceRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Device>, StoreError>;
    /// Heartbeat; returns false when the device is unknown.
    async fn touch_last_seen(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError>;
}

/// Registry of attendance policies. Read-mostly; within one ingress the
/// registry is treated as immutable.
#[async_trait]
pub trait PolicyRepo: Send + Sync {
    async fn find_active_for_shift(
        &self,
        shift_id: Uuid,
    ) -> Result<Option<PolicyWithShift>, StoreError>;
    async fn find_active_default(&self) -> Result<Option<PolicyWithShift>, StoreError>;
}

/// Persistent recognition events keyed (among other things) by dedup hash.
///
/// The unique index on non-null `dedup_hash` is the definitive deduplication
/// authority; `exists_by_fingerprint` is an optimization in front of it.
#[async_trait]
pub trait EventRepo: Send + Sync {
    async fn exists_by_fingerprint(&self, hash: &str) -> Result<bool, StoreError>;
    /// Fails with `StoreError::DuplicateFingerprint` when losing a race on
    /// the hash index.
    async fn insert(&self, event: &RecognitionEvent) -> Result<(), StoreError>;
    async fn recent_for(
        &self,
        employee_id: Uuid,
        device_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<RecognitionEvent>, StoreError>;
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Ordered attendance ledger per employee.
#[async_trait]
pub trait RecordRepo: Send + Sync {
    /// Most recent record overall, by event time.
    async fn last_for(&self, employee_id: Uuid) -> Result<Option<AttendanceRecord>, StoreError>;
    /// Most recent IN within a business date.
    async fn last_in_for(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;
    /// Fails with `StoreError::DuplicateRecordEvent` when a record for the
    /// same recognition event already exists.
    async fn append(&self, record: &AttendanceRecord) -> Result<(), StoreError>;
}

/// Holiday source for the attendance-allowed predicate. Injectable; the
/// default knows no holidays.
pub trait HolidayCalendar: Send + Sync {
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoHolidays;

impl HolidayCalendar for NoHolidays {
    fn is_holiday(&self, _date: NaiveDate) -> bool {
        false
    }
}
