use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Work schedule. `is_overnight` is stored and must hold exactly when
/// `end_time <= start_time`; all window arithmetic consults it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Shift {
    pub id: Uuid,

    #[schema(example = "Regular Day Shift")]
    pub name: String,

    #[schema(example = "09:00:00", value_type = String, format = "time")]
    pub start_time: NaiveTime,

    #[schema(example = "17:00:00", value_type = String, format = "time")]
    pub end_time: NaiveTime,

    #[schema(example = 15)]
    pub grace_period_minutes: i32,

    pub is_overnight: bool,

    /// IANA zone id; informational, the service-wide business zone governs.
    #[schema(example = "Asia/Dhaka")]
    pub timezone: String,

    pub is_active: bool,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,

    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl Shift {
    /// The stored-flag invariant: overnight iff the end does not follow the
    /// start within one civil day.
    pub fn spans_midnight(&self) -> bool {
        self.end_time <= self.start_time
    }
}
