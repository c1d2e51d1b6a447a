use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::PolicyWithShift;
use crate::repo::PolicyRepo;

const CACHE_CAPACITY: u64 = 1_000;

// Sentinel key for the default-policy slot.
const DEFAULT_KEY: Uuid = Uuid::nil();

/// TTL read-through cache over a [`PolicyRepo`].
///
/// The registry is read-mostly and consulted on every ingress; a short TTL
/// bounds staleness without any invalidation plumbing. Lookup errors are never
/// cached.
pub struct CachedPolicyRepo {
    inner: Arc<dyn PolicyRepo>,
    entries: Cache<Uuid, Option<PolicyWithShift>>,
}

impl CachedPolicyRepo {
    pub fn new(inner: Arc<dyn PolicyRepo>, ttl: Duration) -> Self {
        Self {
            inner,
            entries: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(ttl)
                .build(),
        }
    }
}

#[async_trait]
impl PolicyRepo for CachedPolicyRepo {
    async fn find_active_for_shift(
        &self,
        shift_id: Uuid,
    ) -> Result<Option<PolicyWithShift>, StoreError> {
        if let Some(hit) = self.entries.get(&shift_id).await {
            return Ok(hit);
        }
        let loaded = self.inner.find_active_for_shift(shift_id).await?;
        self.entries.insert(shift_id, loaded.clone()).await;
        Ok(loaded)
    }

    async fn find_active_default(&self) -> Result<Option<PolicyWithShift>, StoreError> {
        if let Some(hit) = self.entries.get(&DEFAULT_KEY).await {
            return Ok(hit);
        }
        let loaded = self.inner.find_active_default().await?;
        self.entries.insert(DEFAULT_KEY, loaded.clone()).await;
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{policy_with_shift, shift, time};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPolicyRepo {
        entry: PolicyWithShift,
        loads: AtomicUsize,
    }

    #[async_trait]
    impl PolicyRepo for CountingPolicyRepo {
        async fn find_active_for_shift(
            &self,
            shift_id: Uuid,
        ) -> Result<Option<PolicyWithShift>, StoreError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok((self.entry.shift.id == shift_id).then(|| self.entry.clone()))
        }

        async fn find_active_default(&self) -> Result<Option<PolicyWithShift>, StoreError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    #[tokio::test]
    async fn repeated_lookups_hit_the_cache() {
        let entry = policy_with_shift(shift(time(9, 0), time(17, 0), false));
        let shift_id = entry.shift.id;
        let inner = Arc::new(CountingPolicyRepo { entry, loads: AtomicUsize::new(0) });
        let cached = CachedPolicyRepo::new(inner.clone(), Duration::from_secs(60));

        for _ in 0..5 {
            assert!(cached.find_active_for_shift(shift_id).await.unwrap().is_some());
        }
        assert_eq!(inner.loads.load(Ordering::SeqCst), 1);

        // Negative results are cached too.
        for _ in 0..5 {
            assert!(cached.find_active_default().await.unwrap().is_none());
        }
        assert_eq!(inner.loads.load(Ordering::SeqCst), 2);
    }
}
