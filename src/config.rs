use std::env;

use chrono_tz::Tz;
use dotenvy::dotenv;

/// How concurrent ingestions for the same employee are serialized.
///
/// `PerEmployeeLock` shards async mutexes by employee id;
/// `InTransactionRecheck` re-reads the employee's last record right before the
/// ledger append and re-runs the cooldown check against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownSerialization {
    PerEmployeeLock,
    InTransactionRecheck,
}

impl CooldownSerialization {
    fn parse(s: &str) -> Self {
        match s {
            "in_transaction_recheck" => Self::InTransactionRecheck,
            _ => Self::PerEmployeeLock,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,
    pub api_prefix: String,

    /// IANA zone all civil date/time computations happen in.
    pub business_zone: Tz,
    /// Quantization width W of the fingerprint time bucket, in seconds.
    pub dedup_window_seconds: u64,
    /// Minimum similarity score for a recognition to count as a valid match.
    pub min_similarity: f64,
    pub cooldown_serialization: CooldownSerialization,
    /// Deadline for one ingest invocation; past it the outcome is Timeout.
    pub ingest_deadline_ms: u64,

    pub rate_ingest_per_min: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),

            business_zone: env::var("BUSINESS_ZONE")
                .unwrap_or_else(|_| "Asia/Dhaka".to_string())
                .parse()
                .expect("BUSINESS_ZONE must be a valid IANA zone id"),
            dedup_window_seconds: env::var("DEDUP_WINDOW_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .expect("DEDUP_WINDOW_SECONDS must be an integer"),
            min_similarity: env::var("MIN_SIMILARITY")
                .unwrap_or_else(|_| "0.60".to_string())
                .parse()
                .expect("MIN_SIMILARITY must be a float"),
            cooldown_serialization: CooldownSerialization::parse(
                &env::var("COOLDOWN_SERIALIZATION")
                    .unwrap_or_else(|_| "per_employee_lock".to_string()),
            ),
            ingest_deadline_ms: env::var("INGEST_DEADLINE_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .expect("INGEST_DEADLINE_MS must be an integer"),

            rate_ingest_per_min: env::var("RATE_INGEST_PER_MIN")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .expect("RATE_INGEST_PER_MIN must be an integer"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_serialization_parses_known_values() {
        assert_eq!(
            CooldownSerialization::parse("per_employee_lock"),
            CooldownSerialization::PerEmployeeLock
        );
        assert_eq!(
            CooldownSerialization::parse("in_transaction_recheck"),
            CooldownSerialization::InTransactionRecheck
        );
    }

    #[test]
    fn cooldown_serialization_falls_back_to_lock() {
        assert_eq!(
            CooldownSerialization::parse("nonsense"),
            CooldownSerialization::PerEmployeeLock
        );
    }
}
