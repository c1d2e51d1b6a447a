use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::MySqlPool;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{
    AttendancePolicy, AttendanceRecord, Device, Employee, PolicyWithShift, RecognitionEvent, Shift,
};
use crate::repo::{DeviceRepo, EmployeeRepo, EventRepo, PolicyRepo, RecordRepo};

// MySQL signals unique-index violations with SQLSTATE 23000.
const SQLSTATE_DUPLICATE: &str = "23000";

fn map_unique(e: sqlx::Error, dup: StoreError) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some(SQLSTATE_DUPLICATE) {
            return dup;
        }
    }
    e.into()
}

#[derive(Clone)]
pub struct MySqlEmployeeRepo {
    pool: MySqlPool,
}

impl MySqlEmployeeRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployeeRepo for MySqlEmployeeRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Employee>, StoreError> {
        let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(employee)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Employee>, StoreError> {
        let employee =
            sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE employee_code = ?")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;
        Ok(employee)
    }
}

#[derive(Clone)]
pub struct MySqlDeviceRepo {
    pool: MySqlPool,
}

impl MySqlDeviceRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceRepo for MySqlDeviceRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Device>, StoreError> {
        let device = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(device)
    }

    async fn touch_last_seen(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE devices SET last_seen_at = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct MySqlPolicyRepo {
    pool: MySqlPool,
}

impl MySqlPolicyRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn load_shift(&self, shift_id: Uuid) -> Result<Option<Shift>, StoreError> {
        let shift = sqlx::query_as::<_, Shift>("SELECT * FROM shifts WHERE id = ?")
            .bind(shift_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(shift)
    }

    async fn with_shift(
        &self,
        policy: Option<AttendancePolicy>,
    ) -> Result<Option<PolicyWithShift>, StoreError> {
        let Some(policy) = policy else { return Ok(None) };
        let Some(shift) = self.load_shift(policy.shift_id).await? else {
            return Err(StoreError::Fatal(format!(
                "policy {} references missing shift {}",
                policy.id, policy.shift_id
            )));
        };
        Ok(Some(PolicyWithShift { policy, shift }))
    }
}

#[async_trait]
impl PolicyRepo for MySqlPolicyRepo {
    async fn find_active_for_shift(
        &self,
        shift_id: Uuid,
    ) -> Result<Option<PolicyWithShift>, StoreError> {
        let policy = sqlx::query_as::<_, AttendancePolicy>(
            "SELECT * FROM attendance_policies WHERE shift_id = ? AND is_active = TRUE",
        )
        .bind(shift_id)
        .fetch_optional(&self.pool)
        .await?;
        self.with_shift(policy).await
    }

    async fn find_active_default(&self) -> Result<Option<PolicyWithShift>, StoreError> {
        let policy = sqlx::query_as::<_, AttendancePolicy>(
            "SELECT * FROM attendance_policies WHERE is_default = TRUE AND is_active = TRUE",
        )
        .fetch_optional(&self.pool)
        .await?;
        self.with_shift(policy).await
    }
}

#[derive(Clone)]
pub struct MySqlEventRepo {
    pool: MySqlPool,
}

impl MySqlEventRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepo for MySqlEventRepo {
    async fn exists_by_fingerprint(&self, hash: &str) -> Result<bool, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM recognition_events WHERE dedup_hash = ? AND status <> 'DUPLICATE'",
        )
        .bind(hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn insert(&self, event: &RecognitionEvent) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO recognition_events
                (id, device_id, employee_id, captured_at, embedding,
                 similarity_score, liveness_score, liveness_passed,
                 face_box_x, face_box_y, face_box_width, face_box_height,
                 snapshot_url, processing_duration_ms, dedup_hash, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.id)
        .bind(event.device_id)
        .bind(event.employee_id)
        .bind(event.captured_at)
        .bind(&event.embedding)
        .bind(event.similarity_score)
        .bind(event.liveness_score)
        .bind(event.liveness_passed)
        .bind(event.face_box_x)
        .bind(event.face_box_y)
        .bind(event.face_box_width)
        .bind(event.face_box_height)
        .bind(&event.snapshot_url)
        .bind(event.processing_duration_ms)
        .bind(&event.dedup_hash)
        .bind(event.status)
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, StoreError::DuplicateFingerprint))?;
        Ok(())
    }

    async fn recent_for(
        &self,
        employee_id: Uuid,
        device_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<RecognitionEvent>, StoreError> {
        let events = sqlx::query_as::<_, RecognitionEvent>(
            r#"
            SELECT * FROM recognition_events
            WHERE employee_id = ? AND device_id = ? AND captured_at >= ?
              AND status <> 'DUPLICATE'
            ORDER BY captured_at DESC
            "#,
        )
        .bind(employee_id)
        .bind(device_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM recognition_events WHERE captured_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        let purged = result.rows_affected();
        debug!(purged, %cutoff, "purged old recognition events");
        Ok(purged)
    }
}

#[derive(Clone)]
pub struct MySqlRecordRepo {
    pool: MySqlPool,
}

impl MySqlRecordRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordRepo for MySqlRecordRepo {
    async fn last_for(&self, employee_id: Uuid) -> Result<Option<AttendanceRecord>, StoreError> {
        let record = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT * FROM attendance_records
            WHERE employee_id = ?
            ORDER BY event_time DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn last_in_for(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let record = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT * FROM attendance_records
            WHERE employee_id = ? AND attendance_date = ? AND event_type = 'IN'
            ORDER BY event_time DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn append(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO attendance_records
                (id, employee_id, device_id, recognition_event_id, attendance_date,
                 event_time, event_type, shift_id, is_late, is_early_leave,
                 is_overtime, duration_minutes, notes, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id)
        .bind(record.employee_id)
        .bind(record.device_id)
        .bind(record.recognition_event_id)
        .bind(record.attendance_date)
        .bind(record.event_time)
        .bind(record.event_type)
        .bind(record.shift_id)
        .bind(record.is_late)
        .bind(record.is_early_leave)
        .bind(record.is_overtime)
        .bind(record.duration_minutes)
        .bind(&record.notes)
        .bind(record.status)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, StoreError::DuplicateRecordEvent))?;
        Ok(())
    }
}
