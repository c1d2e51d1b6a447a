use thiserror::Error;

/// Errors surfaced by the persistence ports.
///
/// `DuplicateFingerprint` and `DuplicateRecordEvent` carry uniqueness-race
/// information the ingestion pipeline recovers from; everything else aborts
/// the current ingestion.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Insert lost the race on the `dedup_hash` unique index.
    #[error("recognition event with this dedup hash already exists")]
    DuplicateFingerprint,

    /// A record for the same recognition event was already appended.
    #[error("attendance record for this recognition event already exists")]
    DuplicateRecordEvent,

    /// Timeouts, lock contention, deadlocks; worth retrying.
    #[error("transient store failure: {0}")]
    Transient(String),

    /// Schema or invariant violations; never retried.
    #[error("store failure: {0}")]
    Fatal(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => StoreError::Transient(e.to_string()),
            sqlx::Error::Database(db) => {
                // MySQL 1213 = deadlock, 1205 = lock wait timeout.
                match db.code().as_deref() {
                    Some("1213") | Some("1205") | Some("40001") => {
                        StoreError::Transient(e.to_string())
                    }
                    _ => StoreError::Fatal(e.to_string()),
                }
            }
            _ => StoreError::Fatal(e.to_string()),
        }
    }
}

/// Errors the ingest operation can propagate to its caller.
///
/// Policy rejections are *not* errors — they come back as
/// `Outcome::Rejected`; this type covers validation and infrastructure
/// failures only.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Ingress failed structural/range validation; nothing was persisted.
    #[error("bad ingress: {0}")]
    BadInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure inside the policy evaluator that is not a rejection.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("policy lookup failed: {0}")]
    Store(#[from] StoreError),
}
