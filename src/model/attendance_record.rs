use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    In,
    Out,
}

impl EventType {
    pub fn toggled(self) -> Self {
        match self {
            EventType::In => EventType::Out,
            EventType::Out => EventType::In,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::In => write!(f, "IN"),
            EventType::Out => write!(f, "OUT"),
        }
    }
}

/// Timing classification the evaluator assigns to an admitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    EarlyIn,
    OnTimeIn,
    LateIn,
    EarlyOut,
    OnTimeOut,
    OvertimeOut,
}

impl AttendanceStatus {
    pub fn is_clock_in(self) -> bool {
        matches!(
            self,
            AttendanceStatus::EarlyIn | AttendanceStatus::OnTimeIn | AttendanceStatus::LateIn
        )
    }

    pub fn is_clock_out(self) -> bool {
        !self.is_clock_in()
    }

    pub fn is_compliant(self) -> bool {
        matches!(self, AttendanceStatus::OnTimeIn | AttendanceStatus::OnTimeOut)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttendanceStatus::EarlyIn => "EARLY_IN",
            AttendanceStatus::OnTimeIn => "ON_TIME_IN",
            AttendanceStatus::LateIn => "LATE_IN",
            AttendanceStatus::EarlyOut => "EARLY_OUT",
            AttendanceStatus::OnTimeOut => "ON_TIME_OUT",
            AttendanceStatus::OvertimeOut => "OVERTIME_OUT",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordStatus {
    Valid,
    Invalid,
    Adjusted,
    Disputed,
}

/// Processed attendance event, one row per admitted recognition.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: Uuid,

    pub employee_id: Uuid,

    #[schema(nullable = true)]
    pub device_id: Option<Uuid>,

    /// At most one record references a given recognition event.
    #[schema(nullable = true)]
    pub recognition_event_id: Option<Uuid>,

    #[schema(example = "2024-01-15", value_type = String, format = "date")]
    pub attendance_date: NaiveDate,

    #[schema(value_type = String, format = "date-time")]
    pub event_time: DateTime<Utc>,

    pub event_type: EventType,

    #[schema(nullable = true)]
    pub shift_id: Option<Uuid>,

    pub is_late: bool,
    pub is_early_leave: bool,
    pub is_overtime: bool,

    /// Minutes since the matching IN of the same business date; set on OUT.
    #[schema(nullable = true)]
    pub duration_minutes: Option<i64>,

    #[schema(nullable = true)]
    pub notes: Option<String>,

    pub status: RecordStatus,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,

    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn is_entry(&self) -> bool {
        self.event_type == EventType::In
    }

    pub fn is_exit(&self) -> bool {
        self.event_type == EventType::Out
    }

    pub fn has_compliance_issues(&self) -> bool {
        self.is_late || self.is_early_leave || self.status != RecordStatus::Valid
    }

    /// "HH:MM" form of the work duration, when known.
    pub fn formatted_duration(&self) -> Option<String> {
        self.duration_minutes
            .map(|m| format!("{:02}:{:02}", m / 60, m % 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_helpers_partition_variants() {
        assert!(AttendanceStatus::LateIn.is_clock_in());
        assert!(AttendanceStatus::OvertimeOut.is_clock_out());
        assert!(AttendanceStatus::OnTimeIn.is_compliant());
        assert!(!AttendanceStatus::EarlyOut.is_compliant());
    }

    #[test]
    fn event_type_toggles_and_displays() {
        assert_eq!(EventType::In.toggled(), EventType::Out);
        assert_eq!(EventType::Out.toggled(), EventType::In);
        assert_eq!(EventType::In.to_string(), "IN");
        assert_eq!(EventType::Out.to_string(), "OUT");
    }

    #[test]
    fn duration_formats_as_hours_minutes() {
        let now = Utc::now();
        let mut record = AttendanceRecord {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            device_id: None,
            recognition_event_id: None,
            attendance_date: now.date_naive(),
            event_time: now,
            event_type: EventType::Out,
            shift_id: None,
            is_late: false,
            is_early_leave: false,
            is_overtime: false,
            duration_minutes: Some(565),
            notes: None,
            status: RecordStatus::Valid,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(record.formatted_duration().as_deref(), Some("09:25"));
        record.duration_minutes = None;
        assert_eq!(record.formatted_duration(), None);
    }
}
