use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::EvalError;
use crate::model::{AttendanceRecord, AttendanceStatus, Employee, EventType, PolicyWithShift};
use crate::repo::{HolidayCalendar, PolicyRepo};
use crate::zone::{
    duration_minutes, duration_minutes_of_day, format_time_of_day, BusinessZone,
};

/// Compliance flags and metrics for an admitted event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compliance {
    pub is_on_time: bool,
    pub is_early_arrival: bool,
    pub is_late_arrival: bool,
    pub is_early_departure: bool,
    pub is_overtime: bool,
    pub within_break: bool,
    pub late_minutes: i64,
    pub overtime_minutes: i64,
    pub early_departure_minutes: i64,
}

/// Result of evaluating one recognition against the applicable policy.
///
/// Rejections are ordinary data; the reason strings are part of the API
/// surface and end up in operator-facing logs.
#[derive(Debug, Clone)]
pub enum Evaluation {
    Approved {
        event_type: EventType,
        status: AttendanceStatus,
        compliance: Compliance,
        shift_id: Uuid,
    },
    Rejected {
        reason: String,
    },
}

impl Evaluation {
    pub fn is_approved(&self) -> bool {
        matches!(self, Evaluation::Approved { .. })
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            Evaluation::Rejected { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Evaluates time-window admission, cooldowns, and timing classification for
/// recognition events, in the business zone.
pub struct PolicyEvaluator {
    policies: Arc<dyn PolicyRepo>,
    holidays: Arc<dyn HolidayCalendar>,
    zone: BusinessZone,
}

impl PolicyEvaluator {
    pub fn new(
        policies: Arc<dyn PolicyRepo>,
        holidays: Arc<dyn HolidayCalendar>,
        zone: BusinessZone,
    ) -> Self {
        Self { policies, holidays, zone }
    }

    pub fn zone(&self) -> BusinessZone {
        self.zone
    }

    /// Decide whether a recognition for `employee` at `captured_at` becomes an
    /// attendance event, and classify it.
    pub async fn evaluate(
        &self,
        employee: &Employee,
        captured_at: DateTime<Utc>,
        last_record: Option<&AttendanceRecord>,
    ) -> Result<Evaluation, EvalError> {
        debug!(
            employee_code = %employee.employee_code,
            at = %self.zone.format_business_datetime(captured_at),
            "evaluating recognition event"
        );

        let Some(applicable) = self.applicable_policy(employee).await? else {
            warn!(employee_code = %employee.employee_code, "no attendance policy found");
            return Ok(Evaluation::Rejected {
                reason: "No attendance policy configured".to_string(),
            });
        };

        let business_time = self.zone.business_time(captured_at);
        let expected = expected_event_type(last_record);

        if !self.is_within_window(&applicable, business_time, expected) {
            return Ok(Evaluation::Rejected {
                reason: format!(
                    "Outside {} window. Expected window: {}",
                    expected,
                    window_description(&applicable, expected)
                ),
            });
        }

        if let Some(last) = last_record {
            let elapsed = duration_minutes(last.event_time, captured_at);
            if let Some(reason) =
                cooldown_violation(&applicable, last.event_type, expected, elapsed)
            {
                return Ok(Evaluation::Rejected { reason });
            }
        }

        let status = classify(&applicable, business_time, expected);
        let compliance = compute_compliance(&applicable, business_time, expected, status);

        Ok(Evaluation::Approved {
            event_type: expected,
            status,
            compliance,
            shift_id: applicable.shift.id,
        })
    }

    /// Re-run only the cooldown stage against a freshly read last record.
    ///
    /// Used by the in-transaction re-check serialization mode: the admission
    /// window already passed at evaluation time; only the inter-event spacing
    /// can have been invalidated by a concurrent append.
    pub async fn recheck_cooldown(
        &self,
        employee: &Employee,
        captured_at: DateTime<Utc>,
        event_type: EventType,
        last_record: &AttendanceRecord,
    ) -> Result<Option<String>, EvalError> {
        let Some(applicable) = self.applicable_policy(employee).await? else {
            return Ok(Some("No attendance policy configured".to_string()));
        };
        let elapsed = duration_minutes(last_record.event_time, captured_at);
        Ok(cooldown_violation(
            &applicable,
            last_record.event_type,
            event_type,
            elapsed,
        ))
    }

    /// Weekend/holiday gate. Separately callable; ingestion does not enforce
    /// it.
    pub async fn attendance_allowed(
        &self,
        employee: &Employee,
        business_date: NaiveDate,
    ) -> Result<bool, EvalError> {
        let Some(applicable) = self.applicable_policy(employee).await? else {
            return Ok(false);
        };

        let weekend = matches!(business_date.weekday(), Weekday::Sat | Weekday::Sun);
        if weekend && !applicable.policy.allow_weekend_attendance {
            return Ok(false);
        }

        if self.holidays.is_holiday(business_date) && !applicable.policy.allow_holiday_attendance {
            return Ok(false);
        }

        Ok(true)
    }

    pub async fn auto_clock_out_time(
        &self,
        employee: &Employee,
    ) -> Result<Option<NaiveTime>, EvalError> {
        let Some(applicable) = self.applicable_policy(employee).await? else {
            return Ok(None);
        };
        if !applicable.policy.auto_clock_out_enabled {
            return Ok(None);
        }
        Ok(applicable.policy.auto_clock_out_time)
    }

    pub async fn eligible_for_auto_clock_out(
        &self,
        employee: &Employee,
        now: DateTime<Utc>,
    ) -> Result<bool, EvalError> {
        let Some(cutoff) = self.auto_clock_out_time(employee).await? else {
            return Ok(false);
        };
        Ok(self.zone.business_time(now) >= cutoff)
    }

    /// Shift policy first, then the active default.
    async fn applicable_policy(
        &self,
        employee: &Employee,
    ) -> Result<Option<PolicyWithShift>, EvalError> {
        if let Some(shift_id) = employee.shift_id {
            if let Some(found) = self.policies.find_active_for_shift(shift_id).await? {
                return Ok(Some(found));
            }
        }
        Ok(self.policies.find_active_default().await?)
    }

    fn is_within_window(
        &self,
        applicable: &PolicyWithShift,
        t: NaiveTime,
        event_type: EventType,
    ) -> bool {
        match event_type {
            EventType::In => applicable.is_within_entry_window(t),
            EventType::Out => applicable.is_within_exit_window(t),
        }
    }
}

/// No history or a trailing OUT expects an IN; a trailing IN expects an OUT.
fn expected_event_type(last_record: Option<&AttendanceRecord>) -> EventType {
    match last_record {
        None => EventType::In,
        Some(r) => r.event_type.toggled(),
    }
}

fn window_description(applicable: &PolicyWithShift, event_type: EventType) -> String {
    let (start, end) = match event_type {
        EventType::In => applicable.entry_window(),
        EventType::Out => applicable.exit_window(),
    };
    format!("{} to {}", format_time_of_day(start), format_time_of_day(end))
}

fn cooldown_violation(
    applicable: &PolicyWithShift,
    last_type: EventType,
    current_type: EventType,
    elapsed_minutes: i64,
) -> Option<String> {
    let in_to_out = i64::from(applicable.policy.in_to_out_cooldown_minutes);
    let out_to_in = i64::from(applicable.policy.out_to_in_cooldown_minutes);

    let (required, label) = match (last_type, current_type) {
        (EventType::In, EventType::Out) => (in_to_out, "IN to OUT".to_string()),
        (EventType::Out, EventType::In) => (out_to_in, "OUT to IN".to_string()),
        // Same type twice always requires the stricter cooldown.
        _ => (in_to_out.max(out_to_in), format!("duplicate {current_type}")),
    };

    if elapsed_minutes < required {
        Some(format!(
            "{label} cooldown violation. Required: {required} minutes, Actual: {elapsed_minutes} minutes"
        ))
    } else {
        None
    }
}

/// Grace boundaries are inclusive on the on-time side.
fn classify(
    applicable: &PolicyWithShift,
    t: NaiveTime,
    event_type: EventType,
) -> AttendanceStatus {
    let shift = &applicable.shift;
    let policy = &applicable.policy;

    match event_type {
        EventType::In => {
            let m = duration_minutes_of_day(shift.start_time, t, shift.is_overnight);
            if m < -i64::from(policy.early_arrival_grace_minutes) {
                AttendanceStatus::EarlyIn
            } else if m > i64::from(policy.late_arrival_grace_minutes) {
                AttendanceStatus::LateIn
            } else {
                AttendanceStatus::OnTimeIn
            }
        }
        EventType::Out => {
            let m = duration_minutes_of_day(shift.end_time, t, shift.is_overnight);
            if m < -i64::from(policy.early_departure_grace_minutes) {
                AttendanceStatus::EarlyOut
            } else if m > i64::from(policy.overtime_threshold_minutes) {
                AttendanceStatus::OvertimeOut
            } else {
                AttendanceStatus::OnTimeOut
            }
        }
    }
}

fn compute_compliance(
    applicable: &PolicyWithShift,
    t: NaiveTime,
    event_type: EventType,
    status: AttendanceStatus,
) -> Compliance {
    let shift = &applicable.shift;
    let mut compliance = Compliance {
        is_on_time: status.is_compliant(),
        within_break: applicable.is_within_break_window(t),
        ..Compliance::default()
    };

    match event_type {
        EventType::In => {
            let m = duration_minutes_of_day(shift.start_time, t, shift.is_overnight);
            compliance.is_early_arrival = status == AttendanceStatus::EarlyIn;
            compliance.is_late_arrival = status == AttendanceStatus::LateIn;
            compliance.late_minutes = m.max(0);
        }
        EventType::Out => {
            let m = duration_minutes_of_day(shift.end_time, t, shift.is_overnight);
            compliance.is_early_departure = status == AttendanceStatus::EarlyOut;
            compliance.is_overtime = status == AttendanceStatus::OvertimeOut;
            compliance.overtime_minutes = m.max(0);
            compliance.early_departure_minutes = (-m).max(0);
        }
    }

    compliance
}
