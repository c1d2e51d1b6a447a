use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Snapshot payloads larger than this are not hashed; the locator string is
/// used instead.
const MAX_SNAPSHOT_BYTES: u64 = 16 * 1024 * 1024;

/// Resolves a snapshot locator to local bytes when possible.
///
/// The default implementation reads the filesystem; deployments that keep
/// snapshots in object storage supply their own reader or simply let the
/// locator string stand in for the content.
#[async_trait]
pub trait SnapshotReader: Send + Sync {
    async fn read_if_local(&self, locator: &str) -> Option<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSnapshotReader;

#[async_trait]
impl SnapshotReader for LocalSnapshotReader {
    async fn read_if_local(&self, locator: &str) -> Option<Vec<u8>> {
        let path = Path::new(locator);
        let meta = tokio::fs::metadata(path).await.ok()?;
        if !meta.is_file() {
            return None;
        }
        if meta.len() > MAX_SNAPSHOT_BYTES {
            warn!(locator, len = meta.len(), "snapshot too large to hash, using locator");
            return None;
        }
        match tokio::fs::read(path).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(locator, error = %e, "failed to read snapshot, using locator");
                None
            }
        }
    }
}

/// A reader that never resolves anything; for ingress paths where snapshots
/// are known to be remote.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocalSnapshots;

#[async_trait]
impl SnapshotReader for NoLocalSnapshots {
    async fn read_if_local(&self, _locator: &str) -> Option<Vec<u8>> {
        None
    }
}

/// Content-derived fingerprint for recognition event deduplication.
///
/// Two recognitions of the same person, from the same device, with the same
/// snapshot, inside the same time bucket collapse to one hash. Absent
/// components contribute no bytes.
pub struct Fingerprinter {
    window_seconds: u64,
    reader: Arc<dyn SnapshotReader>,
}

impl Fingerprinter {
    pub fn new(window_seconds: u64, reader: Arc<dyn SnapshotReader>) -> Self {
        assert!(window_seconds > 0, "dedup window must be positive");
        Self { window_seconds, reader }
    }

    pub fn window_seconds(&self) -> u64 {
        self.window_seconds
    }

    /// Compute the dedup hash for one recognition ingress.
    ///
    /// The digest covers, in order: the content seed (hex SHA-256 of the
    /// snapshot bytes when the locator resolves locally, the locator string
    /// otherwise), the employee code (`"unknown"` when unresolved), the
    /// device identifier, and the decimal time bucket
    /// `floor(captured_at / window_seconds)`.
    pub async fn fingerprint(
        &self,
        snapshot_locator: Option<&str>,
        employee_code: &str,
        device_id: &str,
        captured_at: DateTime<Utc>,
    ) -> String {
        let mut hasher = Sha256::new();

        if let Some(seed) = self.content_seed(snapshot_locator).await {
            hasher.update(seed.as_bytes());
        }
        hasher.update(employee_code.as_bytes());
        hasher.update(device_id.as_bytes());

        let bucket = captured_at.timestamp().div_euclid(self.window_seconds as i64);
        hasher.update(bucket.to_string().as_bytes());

        hex::encode(hasher.finalize())
    }

    async fn content_seed(&self, locator: Option<&str>) -> Option<String> {
        let locator = locator?.trim();
        if locator.is_empty() {
            return None;
        }
        match self.reader.read_if_local(locator).await {
            Some(bytes) => Some(hex::encode(Sha256::digest(&bytes))),
            None => Some(locator.to_string()),
        }
    }

    /// True when two instants fall close enough to be dedup candidates.
    pub fn within_dedup_window(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        (a.timestamp() - b.timestamp()).unsigned_abs() <= self.window_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    fn fp() -> Fingerprinter {
        Fingerprinter::new(300, Arc::new(NoLocalSnapshots))
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn deterministic_for_identical_inputs() {
        let f = fp();
        let a = f
            .fingerprint(Some("https://cdn/snap.jpg"), "E001", "dev-1", at(1_700_000_000))
            .await;
        let b = f
            .fingerprint(Some("https://cdn/snap.jpg"), "E001", "dev-1", at(1_700_000_000))
            .await;
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[tokio::test]
    async fn sensitive_to_each_component() {
        let f = fp();
        let now = at(1_700_000_000);
        let base = f.fingerprint(Some("u"), "E001", "dev-1", now).await;

        assert_ne!(base, f.fingerprint(Some("u"), "E002", "dev-1", now).await);
        assert_ne!(base, f.fingerprint(Some("u"), "E001", "dev-2", now).await);
        assert_ne!(base, f.fingerprint(Some("v"), "E001", "dev-1", now).await);
    }

    #[tokio::test]
    async fn same_bucket_collides_across_buckets_differs() {
        let f = fp();
        // 1_700_000_100 and 1_700_000_250 share floor(t/300); 1_700_000_400 does not.
        let a = f.fingerprint(None, "E001", "dev-1", at(1_700_000_100)).await;
        let b = f.fingerprint(None, "E001", "dev-1", at(1_700_000_250)).await;
        let c = f.fingerprint(None, "E001", "dev-1", at(1_700_000_400)).await;
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn absent_and_empty_locator_contribute_nothing() {
        let f = fp();
        let now = at(1_700_000_000);
        let none = f.fingerprint(None, "E001", "dev-1", now).await;
        let empty = f.fingerprint(Some(""), "E001", "dev-1", now).await;
        let blank = f.fingerprint(Some("   "), "E001", "dev-1", now).await;
        assert_eq!(none, empty);
        assert_eq!(none, blank);
    }

    #[tokio::test]
    async fn local_file_content_feeds_the_seed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"snapshot-bytes").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let f = Fingerprinter::new(300, Arc::new(LocalSnapshotReader));
        let now = at(1_700_000_000);
        let from_file = f.fingerprint(Some(&path), "E001", "dev-1", now).await;

        // Same path, different bytes -> different hash.
        file.as_file_mut().set_len(0).unwrap();
        file.write_all(b"other-bytes").unwrap();
        file.flush().unwrap();
        let from_changed = f.fingerprint(Some(&path), "E001", "dev-1", now).await;
        assert_ne!(from_file, from_changed);
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_locator_string() {
        let f = Fingerprinter::new(300, Arc::new(LocalSnapshotReader));
        let now = at(1_700_000_000);
        let a = f
            .fingerprint(Some("/no/such/file.jpg"), "E001", "dev-1", now)
            .await;
        // A plain fingerprinter treating the locator verbatim agrees.
        let b = fp()
            .fingerprint(Some("/no/such/file.jpg"), "E001", "dev-1", now)
            .await;
        assert_eq!(a, b);
    }

    #[test]
    fn dedup_window_predicate_is_symmetric_and_inclusive() {
        let f = fp();
        assert_eq!(f.window_seconds(), 300);
        assert!(f.within_dedup_window(at(1000), at(1300)));
        assert!(f.within_dedup_window(at(1300), at(1000)));
        assert!(!f.within_dedup_window(at(1000), at(1301)));
    }
}
