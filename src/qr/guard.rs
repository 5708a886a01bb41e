//! Replay and rate-limit guards.
//!
//! Two independent bounded-lifetime marker spaces, split into distinct
//! capability traits even though they can share a backing store: their
//! lifetimes and ceilings differ and each must stay independently swappable.
//! Both operations are atomic per key, so two concurrent verifications for
//! the same ticket cannot both slip past a check before either commits.
//!
//! The in-memory implementations are process-local; a multi-node gate
//! deployment plugs a distributed store into the same traits.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::stores::StoreError;

/// Window-consumption marker space, keyed by (ticket id, window timestamp).
pub trait ReplayGuard: Send + Sync {
    /// Atomic check-if-absent-then-set. Returns `false` when the marker was
    /// already present, i.e. this window has already been spent.
    fn mark_if_absent(
        &self,
        ticket_id: &str,
        window_ts: i64,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Remove a marker set by a commit that subsequently failed to persist,
    /// so the caller's retry of the same token is not mis-rejected.
    fn release(
        &self,
        ticket_id: &str,
        window_ts: i64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Attempt counter space, keyed by (ticket id, origin).
pub trait RateLimiter: Send + Sync {
    /// Atomically count this attempt against `key`. Returns `false` when the
    /// ceiling was already reached within the current throttle interval.
    fn check_and_record(
        &self,
        key: &str,
        ceiling: u32,
        interval: Duration,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

fn lock_poisoned() -> StoreError {
    StoreError::Unavailable("marker store lock poisoned".to_string())
}

/// In-memory replay guard. Expired markers are pruned on access.
#[derive(Debug, Clone, Default)]
pub struct MemoryReplayGuard {
    markers: Arc<Mutex<HashMap<(String, i64), Instant>>>,
}

impl MemoryReplayGuard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReplayGuard for MemoryReplayGuard {
    async fn mark_if_absent(
        &self,
        ticket_id: &str,
        window_ts: i64,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut markers = self.markers.lock().map_err(|_| lock_poisoned())?;
        let now = Instant::now();
        markers.retain(|_, expires| *expires > now);

        let key = (ticket_id.to_string(), window_ts);
        if markers.contains_key(&key) {
            return Ok(false);
        }
        markers.insert(key, now + ttl);
        Ok(true)
    }

    async fn release(&self, ticket_id: &str, window_ts: i64) -> Result<(), StoreError> {
        let mut markers = self.markers.lock().map_err(|_| lock_poisoned())?;
        markers.remove(&(ticket_id.to_string(), window_ts));
        Ok(())
    }
}

/// In-memory sliding-window rate limiter. Old attempts age out of the window
/// on access.
#[derive(Debug, Clone, Default)]
pub struct MemoryRateLimiter {
    attempts: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
}

impl MemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimiter for MemoryRateLimiter {
    async fn check_and_record(
        &self,
        key: &str,
        ceiling: u32,
        interval: Duration,
    ) -> Result<bool, StoreError> {
        let mut attempts = self.attempts.lock().map_err(|_| lock_poisoned())?;
        let now = Instant::now();
        let window_start = now.checked_sub(interval);

        let entry = attempts.entry(key.to_string()).or_default();
        entry.retain(|at| window_start.map_or(true, |start| *at > start));

        if entry.len() >= ceiling as usize {
            return Ok(false);
        }
        entry.push(now);
        Ok(true)
    }
}
