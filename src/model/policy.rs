use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::shift::Shift;
use crate::zone::{in_time_range, wrapping_add_minutes};

/// Configurable attendance rules, one active policy per shift plus a single
/// active default.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendancePolicy {
    pub id: Uuid,

    #[schema(example = "Regular Policy")]
    pub name: String,

    #[schema(nullable = true)]
    pub description: Option<String>,

    pub shift_id: Uuid,

    /// Entry window opens this many minutes before shift start.
    #[schema(example = 30)]
    pub entry_window_start_minutes: i32,
    /// Entry window closes this many minutes after shift start.
    #[schema(example = 120)]
    pub entry_window_end_minutes: i32,

    #[schema(example = 30)]
    pub exit_window_start_minutes: i32,
    #[schema(example = 120)]
    pub exit_window_end_minutes: i32,

    #[schema(example = 15)]
    pub early_arrival_grace_minutes: i32,
    #[schema(example = 10)]
    pub late_arrival_grace_minutes: i32,
    #[schema(example = 15)]
    pub early_departure_grace_minutes: i32,
    #[schema(example = 30)]
    pub overtime_threshold_minutes: i32,

    #[schema(example = 30)]
    pub in_to_out_cooldown_minutes: i32,
    #[schema(example = 15)]
    pub out_to_in_cooldown_minutes: i32,

    #[schema(value_type = Option<String>, format = "time", nullable = true)]
    pub break_start_time: Option<NaiveTime>,
    #[schema(value_type = Option<String>, format = "time", nullable = true)]
    pub break_end_time: Option<NaiveTime>,

    pub allow_weekend_attendance: bool,
    pub allow_holiday_attendance: bool,

    pub auto_clock_out_enabled: bool,
    #[schema(value_type = Option<String>, format = "time", nullable = true)]
    pub auto_clock_out_time: Option<NaiveTime>,

    pub is_active: bool,
    pub is_default: bool,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,

    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

/// Policy joined with its shift; window arithmetic needs both.
#[derive(Debug, Clone)]
pub struct PolicyWithShift {
    pub policy: AttendancePolicy,
    pub shift: Shift,
}

impl PolicyWithShift {
    /// `[shift.start - entry_start, shift.start + entry_end]`, wrapped at
    /// midnight when necessary.
    pub fn entry_window(&self) -> (NaiveTime, NaiveTime) {
        (
            wrapping_add_minutes(
                self.shift.start_time,
                -i64::from(self.policy.entry_window_start_minutes),
            ),
            wrapping_add_minutes(
                self.shift.start_time,
                i64::from(self.policy.entry_window_end_minutes),
            ),
        )
    }

    /// `[shift.end - exit_start, shift.end + exit_end]`.
    pub fn exit_window(&self) -> (NaiveTime, NaiveTime) {
        (
            wrapping_add_minutes(
                self.shift.end_time,
                -i64::from(self.policy.exit_window_start_minutes),
            ),
            wrapping_add_minutes(
                self.shift.end_time,
                i64::from(self.policy.exit_window_end_minutes),
            ),
        )
    }

    pub fn is_within_entry_window(&self, t: NaiveTime) -> bool {
        let (start, end) = self.entry_window();
        in_time_range(t, start, end, self.window_wraps(start, end))
    }

    pub fn is_within_exit_window(&self, t: NaiveTime) -> bool {
        let (start, end) = self.exit_window();
        in_time_range(t, start, end, self.window_wraps(start, end))
    }

    pub fn is_within_break_window(&self, t: NaiveTime) -> bool {
        match (self.policy.break_start_time, self.policy.break_end_time) {
            (Some(start), Some(end)) => in_time_range(t, start, end, self.window_wraps(start, end)),
            _ => false,
        }
    }

    // A window is a union across midnight when the shift is overnight or the
    // offsets pushed it past a day boundary.
    fn window_wraps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.shift.is_overnight || start > end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn shift(start: NaiveTime, end: NaiveTime, overnight: bool) -> Shift {
        let now = Utc::now();
        Shift {
            id: Uuid::new_v4(),
            name: "test shift".into(),
            start_time: start,
            end_time: end,
            grace_period_minutes: 15,
            is_overnight: overnight,
            timezone: "Asia/Dhaka".into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn policy(shift_id: Uuid) -> AttendancePolicy {
        let now = Utc::now();
        AttendancePolicy {
            id: Uuid::new_v4(),
            name: "test policy".into(),
            description: None,
            shift_id,
            entry_window_start_minutes: 30,
            entry_window_end_minutes: 120,
            exit_window_start_minutes: 30,
            exit_window_end_minutes: 120,
            early_arrival_grace_minutes: 15,
            late_arrival_grace_minutes: 10,
            early_departure_grace_minutes: 15,
            overtime_threshold_minutes: 30,
            in_to_out_cooldown_minutes: 30,
            out_to_in_cooldown_minutes: 15,
            break_start_time: None,
            break_end_time: None,
            allow_weekend_attendance: false,
            allow_holiday_attendance: false,
            auto_clock_out_enabled: false,
            auto_clock_out_time: None,
            is_active: true,
            is_default: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn day_policy() -> PolicyWithShift {
        let s = shift(t(9, 0), t(17, 0), false);
        let p = policy(s.id);
        PolicyWithShift { policy: p, shift: s }
    }

    #[test]
    fn entry_window_offsets_from_shift_start() {
        let p = day_policy();
        assert_eq!(p.entry_window(), (t(8, 30), t(11, 0)));
        assert_eq!(p.exit_window(), (t(16, 30), t(19, 0)));
    }

    #[test]
    fn window_endpoints_admit() {
        let p = day_policy();
        assert!(p.is_within_entry_window(t(8, 30)));
        assert!(p.is_within_entry_window(t(11, 0)));
        assert!(!p.is_within_entry_window(t(11, 1)));
        assert!(!p.is_within_entry_window(t(8, 29)));
    }

    #[test]
    fn overnight_windows_wrap_midnight() {
        let s = shift(t(22, 0), t(6, 0), true);
        let p = PolicyWithShift { policy: policy(s.id), shift: s };
        // Entry 21:30..00:00; exit 05:30..08:00.
        assert!(p.is_within_entry_window(t(23, 59)));
        assert!(p.is_within_entry_window(t(21, 30)));
        assert!(p.is_within_entry_window(t(0, 0)));
        assert!(!p.is_within_entry_window(t(12, 0)));
        assert!(p.is_within_exit_window(t(6, 30)));
    }

    #[test]
    fn early_shift_entry_window_wraps_even_without_overnight_flag() {
        // Shift starts 00:15; a 30-minute lead pushes the window across
        // midnight although the shift itself is a day shift.
        let s = shift(t(0, 15), t(8, 15), false);
        let p = PolicyWithShift { policy: policy(s.id), shift: s };
        let (start, end) = p.entry_window();
        assert_eq!(start, t(23, 45));
        assert_eq!(end, t(2, 15));
        assert!(p.is_within_entry_window(t(23, 50)));
        assert!(p.is_within_entry_window(t(0, 10)));
        assert!(!p.is_within_entry_window(t(12, 0)));
    }

    #[test]
    fn overnight_flag_matches_midnight_span() {
        assert!(shift(t(22, 0), t(6, 0), true).spans_midnight());
        assert!(!shift(t(9, 0), t(17, 0), false).spans_midnight());
    }

    #[test]
    fn break_window_requires_both_bounds() {
        let mut p = day_policy();
        assert!(!p.is_within_break_window(t(13, 0)));
        p.policy.break_start_time = Some(t(13, 0));
        p.policy.break_end_time = Some(t(14, 0));
        assert!(p.is_within_break_window(t(13, 30)));
        assert!(!p.is_within_break_window(t(14, 1)));
    }
}
