//! Per-client nonce cache for replay protection.
//!
//! Each client owns a bounded, time-expiring set of nonces. Expired entries
//! are collected lazily when that client is next checked, and clients left
//! with nothing live are dropped by a periodic sweep riding on
//! [`NonceCache::check_and_store`]; there is no background task.
//!
//! Memory only: a restart forgets every nonce, so replay protection across
//! restarts relies on the skew window alone.

use crate::clock::{Clock, SystemClock};
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default nonce retention window in seconds.
pub const DEFAULT_NONCE_TTL_SECONDS: u64 = 600;

/// Default cap on live nonces per client.
pub const DEFAULT_MAX_NONCES_PER_CLIENT: usize = 2048;

/// Every this many checks, clients with no live nonces are dropped.
pub const SWEEP_INTERVAL: u64 = 1024;

/// Insertion key: (inserted at ms, insertion sequence). Orders oldest first,
/// ties broken by arrival.
type Slot = (i64, u64);

#[derive(Debug, Default)]
struct ClientNonces {
    by_nonce: HashMap<String, Slot>,
    by_age: BTreeMap<Slot, String>,
    next_seq: u64,
}

impl ClientNonces {
    fn len(&self) -> usize {
        self.by_nonce.len()
    }

    fn is_empty(&self) -> bool {
        self.by_nonce.is_empty()
    }

    fn collect_expired(&mut self, now_ms: i64, ttl_ms: i64) {
        while let Some((&(inserted_at, _), _)) = self.by_age.first_key_value() {
            if now_ms.saturating_sub(inserted_at) <= ttl_ms {
                break;
            }
            self.evict_oldest();
        }
    }

    fn evict_oldest(&mut self) {
        if let Some((_, nonce)) = self.by_age.pop_first() {
            self.by_nonce.remove(&nonce);
        }
    }

    fn insert(&mut self, nonce: &str, now_ms: i64) {
        let slot = (now_ms, self.next_seq);
        self.next_seq += 1;
        self.by_nonce.insert(nonce.to_string(), slot);
        self.by_age.insert(slot, nonce.to_string());
    }
}

/// At-most-once acceptance of `(client, nonce)` pairs within a TTL.
///
/// Safe to share across threads. The check-and-store for one client runs
/// under that client's shard lock, so two concurrent calls can never both see
/// the same nonce as unseen.
pub struct NonceCache {
    clients: DashMap<String, ClientNonces>,
    ttl: Duration,
    max_per_client: usize,
    clock: Arc<dyn Clock>,
    checks: AtomicU64,
}

impl NonceCache {
    /// Create a cache on the system clock.
    pub fn new(ttl: Duration, max_per_client: usize) -> Self {
        Self::with_clock(ttl, max_per_client, Arc::new(SystemClock))
    }

    /// Create a cache on a custom clock.
    ///
    /// A `max_per_client` of zero is raised to one so a fresh nonce can
    /// always be recorded.
    pub fn with_clock(ttl: Duration, max_per_client: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            clients: DashMap::new(),
            ttl,
            max_per_client: max_per_client.max(1),
            clock,
            checks: AtomicU64::new(0),
        }
    }

    /// Record `nonce` for `client_id` if it is not live.
    ///
    /// Returns `true` when the nonce was unseen (or had expired) and is now
    /// consumed, `false` when it is a replay. Expired entries for this client
    /// are collected first; if the client is at capacity, its oldest entries
    /// are evicted to make room.
    pub fn check_and_store(&self, client_id: &str, nonce: &str) -> bool {
        // Sweep before taking the client's shard lock; `retain` locks every shard.
        let seq = self.checks.fetch_add(1, Ordering::Relaxed);
        if seq % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            self.purge_expired();
        }

        let now_ms = self.clock.now_millis();
        let ttl_ms = self.ttl_ms();

        let mut entry = self.clients.entry(client_id.to_string()).or_default();
        let client = entry.value_mut();

        client.collect_expired(now_ms, ttl_ms);

        if client.by_nonce.contains_key(nonce) {
            return false;
        }

        while client.len() >= self.max_per_client {
            client.evict_oldest();
        }

        client.insert(nonce, now_ms);
        true
    }

    /// Collect expired nonces for every client and drop clients left empty.
    pub fn purge_expired(&self) {
        let now_ms = self.clock.now_millis();
        let ttl_ms = self.ttl_ms();
        let before = self.clients.len();

        self.clients.retain(|_, client| {
            client.collect_expired(now_ms, ttl_ms);
            !client.is_empty()
        });

        let dropped = before.saturating_sub(self.clients.len());
        if dropped > 0 {
            tracing::debug!(dropped, remaining = self.clients.len(), "idle nonce clients dropped");
        }
    }

    /// Number of clients currently tracked, live or not yet swept.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    fn ttl_ms(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX)
    }

    /// Number of nonces currently held for `client_id`.
    ///
    /// Entries past their TTL are counted until the client's next check.
    pub fn live_count(&self, client_id: &str) -> usize {
        self.clients.get(client_id).map_or(0, |c| c.len())
    }

    /// Configured retention window.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Configured per-client cap.
    pub fn max_per_client(&self) -> usize {
        self.max_per_client
    }
}

impl Default for NonceCache {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_NONCE_TTL_SECONDS),
            DEFAULT_MAX_NONCES_PER_CLIENT,
        )
    }
}

impl std::fmt::Debug for NonceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceCache")
            .field("clients", &self.clients.len())
            .field("ttl", &self.ttl)
            .field("max_per_client", &self.max_per_client)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use proptest::prelude::*;

    fn cache_with(max: usize) -> (NonceCache, Arc<MockClock>) {
        let clock = Arc::new(MockClock::from_unix(1_736_942_400));
        let cache = NonceCache::with_clock(Duration::from_secs(600), max, clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_first_use_accepted_then_replay_rejected() {
        let (cache, _) = cache_with(16);
        assert!(cache.check_and_store("alice", "n1"));
        assert!(!cache.check_and_store("alice", "n1"));
        assert!(!cache.check_and_store("alice", "n1"));
    }

    #[test]
    fn test_clients_are_partitioned() {
        let (cache, _) = cache_with(16);
        assert!(cache.check_and_store("alice", "n1"));
        assert!(cache.check_and_store("bob", "n1"));
        assert_eq!(cache.live_count("alice"), 1);
        assert_eq!(cache.live_count("bob"), 1);
        assert_eq!(cache.live_count("carol"), 0);
    }

    #[test]
    fn test_nonce_reusable_after_ttl() {
        let (cache, clock) = cache_with(16);
        assert!(cache.check_and_store("alice", "n1"));

        clock.advance(chrono::Duration::seconds(600));
        assert!(!cache.check_and_store("alice", "n1"), "still live at exactly TTL");

        clock.advance(chrono::Duration::milliseconds(1));
        assert!(cache.check_and_store("alice", "n1"));
    }

    #[test]
    fn test_expired_entries_collected_lazily() {
        let (cache, clock) = cache_with(16);
        for i in 0..5 {
            assert!(cache.check_and_store("alice", &format!("n{i}")));
        }
        clock.advance(chrono::Duration::seconds(601));
        assert_eq!(cache.live_count("alice"), 5);

        assert!(cache.check_and_store("alice", "fresh"));
        assert_eq!(cache.live_count("alice"), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let (cache, clock) = cache_with(3);
        for nonce in ["a", "b", "c"] {
            assert!(cache.check_and_store("alice", nonce));
            clock.advance(chrono::Duration::seconds(1));
        }

        assert!(cache.check_and_store("alice", "d"));
        assert_eq!(cache.live_count("alice"), 3);

        // "a" was evicted, so it is accepted again; "c" and "d" are still live.
        assert!(!cache.check_and_store("alice", "c"));
        assert!(!cache.check_and_store("alice", "d"));
        assert!(cache.check_and_store("alice", "a"));
    }

    #[test]
    fn test_equal_timestamps_evict_in_arrival_order() {
        let (cache, _) = cache_with(2);
        assert!(cache.check_and_store("alice", "first"));
        assert!(cache.check_and_store("alice", "second"));
        assert!(cache.check_and_store("alice", "third"));

        assert!(!cache.check_and_store("alice", "second"));
        assert!(!cache.check_and_store("alice", "third"));
        assert!(cache.check_and_store("alice", "first"));
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let (cache, _) = cache_with(0);
        assert_eq!(cache.max_per_client(), 1);
        assert!(cache.check_and_store("alice", "n1"));
        assert!(!cache.check_and_store("alice", "n1"));
    }

    #[test]
    fn test_concurrent_checks_accept_exactly_once() {
        let (cache, _) = cache_with(4096);
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    (0..200)
                        .filter(|i| cache.check_and_store("alice", &format!("n{i}")))
                        .count()
                })
            })
            .collect();

        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(accepted, 200);
    }

    #[test]
    fn test_purge_drops_idle_clients() {
        let (cache, clock) = cache_with(16);
        for i in 0..100 {
            assert!(cache.check_and_store(&format!("forged-{i}"), "n1"));
        }
        assert!(cache.check_and_store("alice", "n1"));
        assert_eq!(cache.client_count(), 101);

        clock.advance(chrono::Duration::seconds(300));
        assert!(cache.check_and_store("alice", "n2"));
        cache.purge_expired();
        assert_eq!(cache.client_count(), 101, "nothing expired yet");

        clock.advance(chrono::Duration::seconds(301));
        cache.purge_expired();
        assert_eq!(cache.client_count(), 1);
        assert_eq!(cache.live_count("alice"), 1);
        assert!(!cache.check_and_store("alice", "n2"));
    }

    #[test]
    fn test_idle_clients_swept_during_checks() {
        let (cache, clock) = cache_with(16);
        for i in 0..500 {
            assert!(cache.check_and_store(&format!("forged-{i}"), "n1"));
        }
        clock.advance(chrono::Duration::seconds(3600));

        for i in 0..SWEEP_INTERVAL {
            assert!(cache.check_and_store("alice", &format!("n{i}")));
        }
        assert_eq!(cache.client_count(), 1);
    }

    proptest! {
        #[test]
        fn live_entries_never_exceed_cap(max in 1usize..32, extra in 0usize..64) {
            let (cache, _) = cache_with(max);
            for i in 0..(max + extra) {
                let nonce = format!("n{i}");
                prop_assert!(cache.check_and_store("alice", &nonce));
                prop_assert!(cache.live_count("alice") <= max);
            }
            prop_assert_eq!(cache.live_count("alice"), max);
        }
    }
}
