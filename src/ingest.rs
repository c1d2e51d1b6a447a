use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{Config, CooldownSerialization};
use crate::error::{IngestError, StoreError};
use crate::evaluator::{Evaluation, PolicyEvaluator};
use crate::fingerprint::Fingerprinter;
use crate::model::recognition_event::EMBEDDING_DIM;
use crate::model::{
    AttendanceRecord, Device, Employee, EventType, FaceBox, RecognitionEvent, RecognitionStatus,
    RecordStatus,
};
use crate::zone::{duration_minutes, Clock};
use crate::repo::{DeviceRepo, EmployeeRepo, EventRepo, RecordRepo};

const LOCK_SHARDS: usize = 64;
const MAX_ATTEMPTS: u32 = 3;

/// Employee code used in the fingerprint when no candidate resolves.
const UNKNOWN_EMPLOYEE: &str = "unknown";

/// One recognition pushed by an edge device.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecognitionIngress {
    pub device_id: Uuid,

    #[schema(value_type = String, format = "date-time")]
    pub captured_at: DateTime<Utc>,

    /// Face embedding; length must be exactly 512.
    #[schema(value_type = Vec<f32>)]
    pub embedding: Vec<f32>,

    pub top_candidate_employee_id: Option<Uuid>,

    #[schema(example = 0.92, nullable = true)]
    pub similarity_score: Option<f64>,

    #[schema(nullable = true)]
    pub liveness_score: Option<f64>,

    #[schema(nullable = true)]
    pub liveness_passed: Option<bool>,

    #[schema(nullable = true)]
    pub face_box: Option<FaceBox>,

    #[schema(example = "https://cdn.example.com/snap/42.jpg", nullable = true)]
    pub snapshot_url: Option<String>,

    #[schema(example = 150, nullable = true)]
    pub processing_duration_ms: Option<i32>,
}

impl RecognitionIngress {
    /// Structural/range validation; nothing is persisted on failure.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.embedding.len() != EMBEDDING_DIM {
            return Err(IngestError::BadInput(format!(
                "embedding must have {} elements, got {}",
                EMBEDDING_DIM,
                self.embedding.len()
            )));
        }
        if let Some(s) = self.similarity_score {
            if !(0.0..=1.0).contains(&s) {
                return Err(IngestError::BadInput(format!(
                    "similarity_score {s} outside [0, 1]"
                )));
            }
        }
        if let Some(s) = self.liveness_score {
            if !(0.0..=1.0).contains(&s) {
                return Err(IngestError::BadInput(format!(
                    "liveness_score {s} outside [0, 1]"
                )));
            }
        }
        if let Some(b) = &self.face_box {
            if b.x < 0 || b.y < 0 || b.w < 1 || b.h < 1 {
                return Err(IngestError::BadInput(format!(
                    "invalid face box {}",
                    b.to_compact_string()
                )));
            }
        }
        if let Some(raw) = self.snapshot_url.as_deref() {
            let parsed = url::Url::parse(raw)
                .map_err(|e| IngestError::BadInput(format!("snapshot_url: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(IngestError::BadInput(format!(
                    "snapshot_url must be http(s), got {}",
                    parsed.scheme()
                )));
            }
        }
        if let Some(ms) = self.processing_duration_ms {
            if ms < 0 {
                return Err(IngestError::BadInput(format!(
                    "processing_duration_ms {ms} is negative"
                )));
            }
        }
        Ok(())
    }
}

/// What one ingestion did. Rejections and duplicates are outcomes, not
/// errors; the HTTP edge maps them to response codes.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Fingerprint already seen; an audit event was written, the ledger was
    /// not touched.
    Duplicate { event: RecognitionEvent },
    /// Event stored but not a valid match; no attendance processing.
    Stored { event: RecognitionEvent },
    /// Approved and appended to the ledger.
    Recorded {
        event: RecognitionEvent,
        record: AttendanceRecord,
    },
    /// The policy evaluator rejected the event.
    Rejected {
        event: RecognitionEvent,
        reason: String,
    },
    /// Evaluator failed; the event is retained, no record was appended.
    EvaluationError {
        event: RecognitionEvent,
        error: String,
    },
    /// Deadline elapsed or retries were exhausted.
    Timeout,
}

pub struct IngestionService {
    employees: Arc<dyn EmployeeRepo>,
    devices: Arc<dyn DeviceRepo>,
    events: Arc<dyn EventRepo>,
    records: Arc<dyn RecordRepo>,
    evaluator: Arc<PolicyEvaluator>,
    fingerprinter: Fingerprinter,
    clock: Arc<dyn Clock>,

    min_similarity: f64,
    cooldown_serialization: CooldownSerialization,
    deadline: Duration,

    employee_locks: Vec<Mutex<()>>,
}

impl IngestionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        employees: Arc<dyn EmployeeRepo>,
        devices: Arc<dyn DeviceRepo>,
        events: Arc<dyn EventRepo>,
        records: Arc<dyn RecordRepo>,
        evaluator: Arc<PolicyEvaluator>,
        fingerprinter: Fingerprinter,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        Self {
            employees,
            devices,
            events,
            records,
            evaluator,
            fingerprinter,
            clock,
            min_similarity: config.min_similarity,
            cooldown_serialization: config.cooldown_serialization,
            deadline: Duration::from_millis(config.ingest_deadline_ms),
            employee_locks: (0..LOCK_SHARDS).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Run one recognition through dedup, policy evaluation, and the ledger.
    pub async fn ingest(&self, ingress: RecognitionIngress) -> Result<Outcome, IngestError> {
        ingress.validate()?;

        // Resolution and fingerprinting are side-effect-free and stay outside
        // the deadline.
        let device = self.devices.find_by_id(ingress.device_id).await?;
        if device.is_none() {
            warn!(device_id = %ingress.device_id, "unknown device, recording event anyway");
        }

        let employee = match ingress.top_candidate_employee_id {
            Some(id) => {
                let found = self.employees.find_by_id(id).await?;
                if found.is_none() {
                    debug!(candidate_id = %id, "top candidate did not resolve, treating as unknown");
                }
                found
            }
            None => None,
        };

        let employee_code = employee
            .as_ref()
            .map(|e| e.employee_code.as_str())
            .unwrap_or(UNKNOWN_EMPLOYEE);

        let hash = self
            .fingerprinter
            .fingerprint(
                ingress.snapshot_url.as_deref(),
                employee_code,
                &ingress.device_id.to_string(),
                ingress.captured_at,
            )
            .await;

        match tokio::time::timeout(
            self.deadline,
            self.process(&ingress, device.as_ref(), employee.as_ref(), &hash),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(device_id = %ingress.device_id, "ingest deadline elapsed");
                Ok(Outcome::Timeout)
            }
        }
    }

    /// Transactional section with transient-failure retries.
    async fn process(
        &self,
        ingress: &RecognitionIngress,
        device: Option<&Device>,
        employee: Option<&Employee>,
        hash: &str,
    ) -> Result<Outcome, IngestError> {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.attempt(ingress, device, employee, hash).await {
                Err(IngestError::Store(e)) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    let backoff = 25 * u64::from(attempt)
                        + rand::thread_rng().gen_range(5..50);
                    warn!(attempt, error = %e, backoff_ms = backoff, "transient store failure, retrying");
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                Err(IngestError::Store(e)) if e.is_transient() => {
                    warn!(error = %e, "transient store failure, retries exhausted");
                    return Ok(Outcome::Timeout);
                }
                other => return other,
            }
        }
        unreachable!("retry loop always returns")
    }

    async fn attempt(
        &self,
        ingress: &RecognitionIngress,
        device: Option<&Device>,
        employee: Option<&Employee>,
        hash: &str,
    ) -> Result<Outcome, IngestError> {
        if self.events.exists_by_fingerprint(hash).await? {
            return Ok(Outcome::Duplicate {
                event: self
                    .persist_duplicate(ingress, device, employee, hash)
                    .await?,
            });
        }

        let event = self.build_event(ingress, device, employee, hash, RecognitionStatus::Processed);
        let event = match self.events.insert(&event).await {
            Ok(()) => event,
            // Lost the uniqueness race to a concurrent ingestion of the same
            // fingerprint; fall back to the duplicate path.
            Err(StoreError::DuplicateFingerprint) => {
                info!(dedup_hash = %hash, "dedup race lost, persisting duplicate event");
                return Ok(Outcome::Duplicate {
                    event: self
                        .persist_duplicate(ingress, device, employee, hash)
                        .await?,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let Some(employee) = employee else {
            debug!(dedup_hash = %hash, "no resolved employee, event stored only");
            return Ok(Outcome::Stored { event });
        };
        if !event.is_valid_match(self.min_similarity) {
            debug!(
                employee_code = %employee.employee_code,
                similarity = ?event.similarity_score,
                "not a valid match, event stored only"
            );
            return Ok(Outcome::Stored { event });
        }

        match self.cooldown_serialization {
            CooldownSerialization::PerEmployeeLock => {
                let _guard = self.employee_locks[shard_index(employee.id)].lock().await;
                self.evaluate_and_append(ingress, device, employee, event, false)
                    .await
            }
            CooldownSerialization::InTransactionRecheck => {
                self.evaluate_and_append(ingress, device, employee, event, true)
                    .await
            }
        }
    }

    async fn evaluate_and_append(
        &self,
        ingress: &RecognitionIngress,
        device: Option<&Device>,
        employee: &Employee,
        event: RecognitionEvent,
        recheck: bool,
    ) -> Result<Outcome, IngestError> {
        let last = self.records.last_for(employee.id).await?;

        let evaluation = match self
            .evaluator
            .evaluate(employee, ingress.captured_at, last.as_ref())
            .await
        {
            Ok(evaluation) => evaluation,
            Err(e) => {
                error!(
                    employee_code = %employee.employee_code,
                    error = %e,
                    "policy evaluation failed, event retained without record"
                );
                return Ok(Outcome::EvaluationError {
                    event,
                    error: e.to_string(),
                });
            }
        };

        let (event_type, status, compliance, shift_id) = match evaluation {
            Evaluation::Rejected { reason } => {
                info!(employee_code = %employee.employee_code, %reason, "attendance rejected");
                return Ok(Outcome::Rejected { event, reason });
            }
            Evaluation::Approved {
                event_type,
                status,
                compliance,
                shift_id,
            } => (event_type, status, compliance, shift_id),
        };

        if recheck {
            // A concurrent ingestion may have appended since our read; the
            // cooldown decision must hold against the committed state.
            if let Some(fresh) = self.records.last_for(employee.id).await? {
                let moved = last.as_ref().map_or(true, |l| l.id != fresh.id);
                if moved {
                    match self
                        .evaluator
                        .recheck_cooldown(employee, ingress.captured_at, event_type, &fresh)
                        .await
                    {
                        Ok(None) => {}
                        Ok(Some(reason)) => {
                            info!(employee_code = %employee.employee_code, %reason, "cooldown re-check rejected");
                            return Ok(Outcome::Rejected { event, reason });
                        }
                        Err(e) => {
                            return Ok(Outcome::EvaluationError {
                                event,
                                error: e.to_string(),
                            })
                        }
                    }
                }
            }
        }

        let zone = self.evaluator.zone();
        let attendance_date = zone.business_date(ingress.captured_at);

        // Work duration only for an OUT that closes an IN of the same
        // business date.
        let duration = if event_type == EventType::Out {
            self.records
                .last_in_for(employee.id, attendance_date)
                .await?
                .map(|r| duration_minutes(r.event_time, ingress.captured_at))
        } else {
            None
        };

        let now = self.clock.now_utc();
        let record = AttendanceRecord {
            id: Uuid::new_v4(),
            employee_id: employee.id,
            device_id: device.map(|d| d.id),
            recognition_event_id: Some(event.id),
            attendance_date,
            event_time: ingress.captured_at,
            event_type,
            shift_id: Some(shift_id),
            is_late: compliance.is_late_arrival,
            is_early_leave: compliance.is_early_departure,
            is_overtime: compliance.is_overtime,
            duration_minutes: duration,
            notes: None,
            status: RecordStatus::Valid,
            created_at: now,
            updated_at: now,
        };

        match self.records.append(&record).await {
            Ok(()) => {}
            // A record for this recognition event already exists (retry after
            // a partially acknowledged append); the ledger state is correct.
            Err(StoreError::DuplicateRecordEvent) => {
                warn!(event_id = %event.id, "record for event already appended");
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            employee_code = %employee.employee_code,
            event_type = %event_type,
            status = %status,
            at = %zone.format_business_datetime(ingress.captured_at),
            "attendance recorded"
        );

        Ok(Outcome::Recorded { event, record })
    }

    async fn persist_duplicate(
        &self,
        ingress: &RecognitionIngress,
        device: Option<&Device>,
        employee: Option<&Employee>,
        hash: &str,
    ) -> Result<RecognitionEvent, IngestError> {
        let event = self.build_event(ingress, device, employee, hash, RecognitionStatus::Duplicate);
        info!(
            dedup_hash = %hash,
            device_id = %ingress.device_id,
            "duplicate recognition event detected"
        );
        self.events.insert(&event).await?;
        Ok(event)
    }

    fn build_event(
        &self,
        ingress: &RecognitionIngress,
        device: Option<&Device>,
        employee: Option<&Employee>,
        hash: &str,
        status: RecognitionStatus,
    ) -> RecognitionEvent {
        let face_box = ingress.face_box;
        RecognitionEvent {
            id: Uuid::new_v4(),
            device_id: device.map(|d| d.id),
            employee_id: employee.map(|e| e.id),
            captured_at: ingress.captured_at,
            embedding: sqlx::types::Json(ingress.embedding.clone()),
            similarity_score: ingress.similarity_score,
            liveness_score: ingress.liveness_score,
            liveness_passed: ingress.liveness_passed,
            face_box_x: face_box.map(|b| b.x),
            face_box_y: face_box.map(|b| b.y),
            face_box_width: face_box.map(|b| b.w),
            face_box_height: face_box.map(|b| b.h),
            snapshot_url: ingress.snapshot_url.clone(),
            processing_duration_ms: ingress.processing_duration_ms,
            dedup_hash: Some(hash.to_string()),
            status,
            created_at: self.clock.now_utc(),
        }
    }
}

fn shard_index(employee_id: Uuid) -> usize {
    let mut hasher = DefaultHasher::new();
    employee_id.hash(&mut hasher);
    (hasher.finish() as usize) % LOCK_SHARDS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingress() -> RecognitionIngress {
        RecognitionIngress {
            device_id: Uuid::new_v4(),
            captured_at: Utc::now(),
            embedding: vec![0.0; EMBEDDING_DIM],
            top_candidate_employee_id: None,
            similarity_score: Some(0.9),
            liveness_score: Some(0.95),
            liveness_passed: Some(true),
            face_box: Some(FaceBox { x: 10, y: 10, w: 64, h: 64 }),
            snapshot_url: Some("https://cdn.example.com/snap/1.jpg".into()),
            processing_duration_ms: Some(120),
        }
    }

    #[test]
    fn valid_ingress_passes_validation() {
        assert!(ingress().validate().is_ok());
    }

    #[test]
    fn embedding_length_is_enforced() {
        let mut i = ingress();
        i.embedding = vec![0.0; 128];
        let err = i.validate().unwrap_err();
        assert!(err.to_string().contains("512"));
    }

    #[test]
    fn score_ranges_are_enforced() {
        let mut i = ingress();
        i.similarity_score = Some(1.2);
        assert!(i.validate().is_err());

        let mut i = ingress();
        i.liveness_score = Some(-0.1);
        assert!(i.validate().is_err());
    }

    #[test]
    fn face_box_must_have_positive_size() {
        let mut i = ingress();
        i.face_box = Some(FaceBox { x: 0, y: 0, w: 0, h: 10 });
        assert!(i.validate().is_err());

        let mut i = ingress();
        i.face_box = Some(FaceBox { x: -1, y: 0, w: 10, h: 10 });
        assert!(i.validate().is_err());
    }

    #[test]
    fn snapshot_url_must_be_http() {
        let mut i = ingress();
        i.snapshot_url = Some("ftp://host/file".into());
        assert!(i.validate().is_err());

        let mut i = ingress();
        i.snapshot_url = Some("not a url".into());
        assert!(i.validate().is_err());
    }

    #[test]
    fn processing_duration_cannot_be_negative() {
        let mut i = ingress();
        i.processing_duration_ms = Some(-5);
        assert!(i.validate().is_err());
    }

    #[test]
    fn shard_index_is_stable_per_employee() {
        let id = Uuid::new_v4();
        assert_eq!(shard_index(id), shard_index(id));
        assert!(shard_index(id) < LOCK_SHARDS);
    }
}
