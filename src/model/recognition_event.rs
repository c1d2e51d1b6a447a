use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use utoipa::ToSchema;
use uuid::Uuid;

/// Dimensionality every embedding must have.
pub const EMBEDDING_DIM: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum RecognitionStatus {
    Pending,
    Processed,
    Failed,
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl FaceBox {
    /// Compact "x,y,w,h" form used in logs.
    pub fn to_compact_string(&self) -> String {
        format!("{},{},{},{}", self.x, self.y, self.w, self.h)
    }
}

/// One detected face pushed by an edge device, with its embedding and match
/// information. Immutable once written; the audit trail keeps duplicates too.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct RecognitionEvent {
    pub id: Uuid,

    /// Null when the ingress named a device the registry does not know; the
    /// event is still recorded for audit.
    #[schema(nullable = true)]
    pub device_id: Option<Uuid>,

    /// Null when no candidate matched.
    #[schema(nullable = true)]
    pub employee_id: Option<Uuid>,

    #[schema(value_type = String, format = "date-time")]
    pub captured_at: DateTime<Utc>,

    #[schema(value_type = Vec<f32>)]
    pub embedding: Json<Vec<f32>>,

    #[schema(example = 0.92, nullable = true)]
    pub similarity_score: Option<f64>,

    #[schema(nullable = true)]
    pub liveness_score: Option<f64>,

    #[schema(nullable = true)]
    pub liveness_passed: Option<bool>,

    pub face_box_x: Option<i32>,
    pub face_box_y: Option<i32>,
    pub face_box_width: Option<i32>,
    pub face_box_height: Option<i32>,

    #[schema(nullable = true)]
    pub snapshot_url: Option<String>,

    #[schema(nullable = true)]
    pub processing_duration_ms: Option<i32>,

    /// 64 lowercase hex chars; unique over non-null values.
    #[schema(nullable = true)]
    pub dedup_hash: Option<String>,

    pub status: RecognitionStatus,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl RecognitionEvent {
    /// Valid-match predicate gating ledger writes: a resolved employee, a
    /// similarity at or above the threshold, and liveness not failed.
    pub fn is_valid_match(&self, min_similarity: f64) -> bool {
        self.employee_id.is_some()
            && self.similarity_score.is_some_and(|s| s >= min_similarity)
            && self.liveness_passed.unwrap_or(true)
    }

    pub fn face_box(&self) -> Option<FaceBox> {
        match (
            self.face_box_x,
            self.face_box_y,
            self.face_box_width,
            self.face_box_height,
        ) {
            (Some(x), Some(y), Some(w), Some(h)) => Some(FaceBox { x, y, w, h }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(
        employee: Option<Uuid>,
        similarity: Option<f64>,
        liveness_passed: Option<bool>,
    ) -> RecognitionEvent {
        let now = Utc::now();
        RecognitionEvent {
            id: Uuid::new_v4(),
            device_id: Some(Uuid::new_v4()),
            employee_id: employee,
            captured_at: now,
            embedding: Json(vec![0.0; EMBEDDING_DIM]),
            similarity_score: similarity,
            liveness_score: None,
            liveness_passed,
            face_box_x: None,
            face_box_y: None,
            face_box_width: None,
            face_box_height: None,
            snapshot_url: None,
            processing_duration_ms: None,
            dedup_hash: None,
            status: RecognitionStatus::Processed,
            created_at: now,
        }
    }

    #[test]
    fn valid_match_requires_employee_and_similarity() {
        let e = Uuid::new_v4();
        assert!(event(Some(e), Some(0.85), Some(true)).is_valid_match(0.6));
        assert!(event(Some(e), Some(0.6), None).is_valid_match(0.6));
        assert!(!event(None, Some(0.9), Some(true)).is_valid_match(0.6));
        assert!(!event(Some(e), Some(0.3), Some(true)).is_valid_match(0.6));
        assert!(!event(Some(e), None, Some(true)).is_valid_match(0.6));
    }

    #[test]
    fn failed_liveness_invalidates_match() {
        let e = Uuid::new_v4();
        assert!(!event(Some(e), Some(0.9), Some(false)).is_valid_match(0.6));
    }

    #[test]
    fn face_box_needs_all_four_coordinates() {
        let mut e = event(None, None, None);
        assert!(e.face_box().is_none());
        e.face_box_x = Some(10);
        e.face_box_y = Some(20);
        e.face_box_width = Some(64);
        e.face_box_height = Some(64);
        let b = e.face_box().unwrap();
        assert_eq!(b.to_compact_string(), "10,20,64,64");
    }
}
