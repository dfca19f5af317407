//! Replay ledger for OAuth state tokens
//!
//! Each consumed token is cached for its own TTL (the state freshness
//! window). Insertion goes through moka's `entry` API, so among concurrent
//! callbacks carrying the same token exactly one observes a fresh entry.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use postbridge_core::StateLedger;
use postbridge_domain::Result;
use tracing::warn;

/// Default upper bound on remembered tokens
pub const DEFAULT_LEDGER_CAPACITY: u64 = 100_000;

/// Expires each entry after the TTL stored as its value.
struct TtlExpiry;

impl Expiry<String, Duration> for TtlExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        ttl: &Duration,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(*ttl)
    }
}

/// [`StateLedger`] backed by a `moka` cache.
#[derive(Clone)]
pub struct MokaStateLedger {
    consumed: Cache<String, Duration>,
}

impl Default for MokaStateLedger {
    fn default() -> Self {
        Self::new(DEFAULT_LEDGER_CAPACITY)
    }
}

impl MokaStateLedger {
    pub fn new(max_capacity: u64) -> Self {
        let consumed = Cache::builder().max_capacity(max_capacity).expire_after(TtlExpiry).build();
        Self { consumed }
    }
}

#[async_trait]
impl StateLedger for MokaStateLedger {
    async fn consume(&self, state: &str, ttl: Duration) -> Result<bool> {
        let entry = self.consumed.entry(state.to_string()).or_insert(ttl).await;
        if !entry.is_fresh() {
            warn!("State token replayed");
        }
        Ok(entry.is_fresh())
    }
}
