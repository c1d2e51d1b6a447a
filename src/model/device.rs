use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A device is considered online if it reported a heartbeat within this many
/// seconds.
const ONLINE_WINDOW_SECONDS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceStatus {
    Active,
    Inactive,
    Maintenance,
}

/// Camera or edge node pushing recognition events.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Device {
    pub id: Uuid,

    #[schema(example = "CAM-LOBBY-01")]
    pub device_code: String,

    #[schema(example = "Lobby entrance camera")]
    pub name: String,

    #[schema(nullable = true)]
    pub location: Option<String>,

    pub status: DeviceStatus,

    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub last_seen_at: Option<DateTime<Utc>>,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,

    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl Device {
    pub fn is_online(&self, now: DateTime<Utc>) -> bool {
        match self.last_seen_at {
            Some(seen) => (now - seen).num_seconds() < ONLINE_WINDOW_SECONDS,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn device(last_seen: Option<DateTime<Utc>>) -> Device {
        let now = Utc::now();
        Device {
            id: Uuid::new_v4(),
            device_code: "CAM-1".into(),
            name: "cam".into(),
            location: None,
            status: DeviceStatus::Active,
            last_seen_at: last_seen,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn online_tracks_heartbeat_recency() {
        let now = Utc::now();
        assert!(device(Some(now - Duration::seconds(60))).is_online(now));
        assert!(!device(Some(now - Duration::seconds(600))).is_online(now));
        assert!(!device(None).is_online(now));
    }
}
