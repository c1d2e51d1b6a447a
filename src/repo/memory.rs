//! In-memory port implementations backing the test suites and local
//! development. They enforce the same uniqueness invariants as the schema.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{
    AttendanceRecord, Device, Employee, EventType, PolicyWithShift, RecognitionEvent,
};
use crate::repo::{DeviceRepo, EmployeeRepo, EventRepo, PolicyRepo, RecordRepo};

#[derive(Default)]
pub struct InMemoryEmployeeRepo {
    employees: RwLock<HashMap<Uuid, Employee>>,
}

impl InMemoryEmployeeRepo {
    pub async fn put(&self, employee: Employee) {
        self.employees.write().await.insert(employee.id, employee);
    }
}

#[async_trait]
impl EmployeeRepo for InMemoryEmployeeRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Employee>, StoreError> {
        Ok(self.employees.read().await.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Employee>, StoreError> {
        Ok(self
            .employees
            .read()
            .await
            .values()
            .find(|e| e.employee_code == code)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryDeviceRepo {
    devices: RwLock<HashMap<Uuid, Device>>,
}

impl InMemoryDeviceRepo {
    pub async fn put(&self, device: Device) {
        self.devices.write().await.insert(device.id, device);
    }
}

#[async_trait]
impl DeviceRepo for InMemoryDeviceRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Device>, StoreError> {
        Ok(self.devices.read().await.get(&id).cloned())
    }

    async fn touch_last_seen(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut devices = self.devices.write().await;
        match devices.get_mut(&id) {
            Some(device) => {
                device.last_seen_at = Some(at);
                device.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct InMemoryPolicyRepo {
    policies: RwLock<Vec<PolicyWithShift>>,
}

impl InMemoryPolicyRepo {
    pub async fn put(&self, entry: PolicyWithShift) {
        self.policies.write().await.push(entry);
    }

    pub async fn clear(&self) {
        self.policies.write().await.clear();
    }
}

#[async_trait]
impl PolicyRepo for InMemoryPolicyRepo {
    async fn find_active_for_shift(
        &self,
        shift_id: Uuid,
    ) -> Result<Option<PolicyWithShift>, StoreError> {
        Ok(self
            .policies
            .read()
            .await
            .iter()
            .find(|p| p.policy.shift_id == shift_id && p.policy.is_active)
            .cloned())
    }

    async fn find_active_default(&self) -> Result<Option<PolicyWithShift>, StoreError> {
        Ok(self
            .policies
            .read()
            .await
            .iter()
            .find(|p| p.policy.is_default && p.policy.is_active)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryEventRepo {
    events: RwLock<Vec<RecognitionEvent>>,
}

impl InMemoryEventRepo {
    pub async fn all(&self) -> Vec<RecognitionEvent> {
        self.events.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl EventRepo for InMemoryEventRepo {
    async fn exists_by_fingerprint(&self, hash: &str) -> Result<bool, StoreError> {
        Ok(self.events.read().await.iter().any(|e| {
            e.status != crate::model::RecognitionStatus::Duplicate
                && e.dedup_hash.as_deref() == Some(hash)
        }))
    }

    async fn insert(&self, event: &RecognitionEvent) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        // Hash uniqueness is scoped to non-duplicate rows; DUPLICATE audit
        // rows carry the colliding hash on purpose.
        if event.status != crate::model::RecognitionStatus::Duplicate {
            if let Some(hash) = event.dedup_hash.as_deref() {
                if events.iter().any(|e| {
                    e.status != crate::model::RecognitionStatus::Duplicate
                        && e.dedup_hash.as_deref() == Some(hash)
                }) {
                    return Err(StoreError::DuplicateFingerprint);
                }
            }
        }
        events.push(event.clone());
        Ok(())
    }

    async fn recent_for(
        &self,
        employee_id: Uuid,
        device_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<RecognitionEvent>, StoreError> {
        let mut matched: Vec<RecognitionEvent> = self
            .events
            .read()
            .await
            .iter()
            .filter(|e| {
                e.employee_id == Some(employee_id)
                    && e.device_id == Some(device_id)
                    && e.captured_at >= since
                    && e.status != crate::model::RecognitionStatus::Duplicate
            })
            .cloned()
            .collect();
        matched.sort_by_key(|e| std::cmp::Reverse(e.captured_at));
        Ok(matched)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|e| e.captured_at >= cutoff);
        Ok((before - events.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryRecordRepo {
    records: RwLock<Vec<AttendanceRecord>>,
}

impl InMemoryRecordRepo {
    pub async fn all(&self) -> Vec<AttendanceRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl RecordRepo for InMemoryRecordRepo {
    async fn last_for(&self, employee_id: Uuid) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.employee_id == employee_id)
            .max_by_key(|r| (r.event_time, r.created_at))
            .cloned())
    }

    async fn last_in_for(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| {
                r.employee_id == employee_id
                    && r.attendance_date == date
                    && r.event_type == EventType::In
            })
            .max_by_key(|r| (r.event_time, r.created_at))
            .cloned())
    }

    async fn append(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if let Some(event_id) = record.recognition_event_id {
            if records
                .iter()
                .any(|r| r.recognition_event_id == Some(event_id))
            {
                return Err(StoreError::DuplicateRecordEvent);
            }
        }
        records.push(record.clone());
        Ok(())
    }
}
