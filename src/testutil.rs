//! Fixture builders shared by the unit-test modules.

use chrono::{NaiveTime, Utc};
use uuid::Uuid;

use crate::model::{AttendancePolicy, Employee, EmployeeStatus, PolicyWithShift, Shift};

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn shift(start: NaiveTime, end: NaiveTime, overnight: bool) -> Shift {
    let now = Utc::now();
    Shift {
        id: Uuid::new_v4(),
        name: "Regular Day Shift".into(),
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

/// Policy with the regular defaults: entry 30/120, exit 30/120, grace
/// 15/10/15, overtime threshold 30, cooldowns 30/15.
pub fn policy(shift_id: Uuid) -> AttendancePolicy {
    let now = Utc::now();
    AttendancePolicy {
        id: Uuid::new_v4(),
        name: "Regular Policy".into(),
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

pub fn policy_with_shift(shift: Shift) -> PolicyWithShift {
    let policy = policy(shift.id);
    PolicyWithShift { policy, shift }
}

pub fn employee(code: &str, shift_id: Option<Uuid>) -> Employee {
    let now = Utc::now();
    Employee {
        id: Uuid::new_v4(),
        employee_code: code.into(),
        first_name: "John".into(),
        last_name: "Doe".into(),
        email: None,
        department: None,
        position: None,
        hire_date: None,
        status: EmployeeStatus::Active,
        shift_id,
        created_at: now,
        updated_at: now,
    }
}
