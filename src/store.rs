//! Profile store: TTL cache, single-flight deduplication and the rate-limited
//! drain queue in front of a [`ProfileSource`].
//!
//! A lookup is served from the cache while the entry is fresh. Otherwise the
//! caller joins the waiters for that key; the first waiter also enqueues the
//! key and, if no drain loop is running, starts one. The drain loop takes
//! groups off the queue according to its [`DrainPolicy`], fetches them, writes
//! the result (positive or negative) into the cache and releases every waiter.
//!
//! Every queued request carries the store epoch it was issued under. `reset`
//! bumps the epoch, so a fetch that completes after a reset is dropped instead
//! of repopulating the cache for an abandoned page.

use crate::cache::{Clock, SystemClock, TtlCache};
use crate::error::FailureKind;
use crate::profile::PlayerProfile;
use crate::rate_limit::DrainPolicy;
use crate::sources::ProfileSource;
use futures::future::join_all;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

type Waiter = oneshot::Sender<Option<PlayerProfile>>;

#[derive(Debug)]
struct QueuedRequest {
    key: String,
    epoch: u64,
}

struct StoreState {
    cache: TtlCache<PlayerProfile>,
    // waiters per key, in arrival order
    pending: HashMap<String, Vec<Waiter>>,
    queue: VecDeque<QueuedRequest>,
    draining: bool,
    epoch: u64,
}

impl StoreState {
    fn release(&mut self, key: &str, value: Option<PlayerProfile>) {
        if let Some(waiters) = self.pending.remove(key) {
            for waiter in waiters {
                // a waiter that gave up is fine
                let _ = waiter.send(value.clone());
            }
        }
    }
}

struct Inner {
    source: Arc<dyn ProfileSource>,
    policy: DrainPolicy,
    clock: Arc<dyn Clock>,
    state: Mutex<StoreState>,
}

/// Snapshot of store bookkeeping, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub cached: usize,
    pub fresh: usize,
    pub pending_keys: usize,
    pub queued: usize,
    pub draining: bool,
    pub epoch: u64,
}

#[derive(Clone)]
pub struct ProfileStore {
    inner: Arc<Inner>,
}

impl ProfileStore {
    pub fn new(source: Arc<dyn ProfileSource>, policy: DrainPolicy, ttl: Duration) -> Self {
        Self::with_clock(source, policy, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: Arc<dyn ProfileSource>,
        policy: DrainPolicy,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::minutes(30));
        ProfileStore {
            inner: Arc::new(Inner {
                source,
                policy,
                clock,
                state: Mutex::new(StoreState {
                    cache: TtlCache::new(ttl),
                    pending: HashMap::new(),
                    queue: VecDeque::new(),
                    draining: false,
                    epoch: 0,
                }),
            }),
        }
    }

    /// Returns the profile for `id`, or `None` when it is unknown or could
    /// not be fetched. Failures are cached for a full TTL window.
    pub async fn fetch_profile(&self, id: &str) -> Option<PlayerProfile> {
        let rx = {
            let mut state = self.inner.state.lock().await;
            let now = self.inner.clock.now();

            if let Some(entry) = state.cache.get_fresh(id, now) {
                debug!(player = %id, negative = entry.value.is_none(), "profile cache hit");
                return entry.value.clone();
            }

            let (tx, rx) = oneshot::channel();
            match state.pending.get_mut(id) {
                Some(waiters) => {
                    debug!(player = %id, "joining in-flight request");
                    waiters.push(tx);
                }
                None => {
                    state.pending.insert(id.to_string(), vec![tx]);
                    let epoch = state.epoch;
                    state.queue.push_back(QueuedRequest {
                        key: id.to_string(),
                        epoch,
                    });
                    if !state.draining {
                        state.draining = true;
                        tokio::spawn(drain(Arc::clone(&self.inner)));
                    }
                }
            }
            rx
        };

        // the sender is dropped when a reset abandons this request
        rx.await.ok().flatten()
    }

    /// Fetches `id` right away, skipping the queue. Still single-flight: a
    /// fresh cache entry short-circuits, a request already pending for `id`
    /// is joined, and callers arriving while this fetch runs share it.
    pub async fn fetch_now(&self, id: &str) -> Option<PlayerProfile> {
        let rx = {
            let mut state = self.inner.state.lock().await;
            if let Some(entry) = state.cache.get_fresh(id, self.inner.clock.now()) {
                return entry.value.clone();
            }

            let (tx, rx) = oneshot::channel();
            match state.pending.get_mut(id) {
                Some(waiters) => {
                    debug!(player = %id, "joining in-flight request");
                    waiters.push(tx);
                }
                None => {
                    state.pending.insert(id.to_string(), vec![tx]);
                    let request = QueuedRequest {
                        key: id.to_string(),
                        epoch: state.epoch,
                    };
                    // detached so the waiters are released even if this caller goes away
                    let inner = Arc::clone(&self.inner);
                    tokio::spawn(async move {
                        let result = inner.fetch(&request.key).await;
                        inner.complete(&request, result).await;
                    });
                }
            }
            rx
        };

        rx.await.ok().flatten()
    }

    /// Drops cached profiles, queued requests and waiters. Fetches already
    /// on the wire still complete but their results are discarded.
    pub async fn reset(&self) {
        let mut state = self.inner.state.lock().await;
        state.epoch += 1;
        state.cache.clear();
        state.queue.clear();
        // dropping the senders wakes every waiter with `None`
        state.pending.clear();
        info!(source = self.inner.source.name(), epoch = state.epoch, "profile store reset");
    }

    pub async fn stats(&self) -> StoreStats {
        let state = self.inner.state.lock().await;
        let now = self.inner.clock.now();
        StoreStats {
            cached: state.cache.entry_count(),
            fresh: state.cache.fresh_count(now),
            pending_keys: state.pending.len(),
            queued: state.queue.len(),
            draining: state.draining,
            epoch: state.epoch,
        }
    }
}

impl Inner {
    async fn fetch(&self, id: &str) -> Option<PlayerProfile> {
        match self.source.fetch_profile(id).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                // not-found, rate-limited and transient failures all become
                // a negative entry; callers cannot tell them apart
                match e.kind() {
                    FailureKind::NotFound => debug!(player = %id, error = %e, "caching negative result"),
                    FailureKind::RateLimited => warn!(player = %id, "rate limited, caching negative result"),
                    FailureKind::TransientNetworkFailure => {
                        warn!(player = %id, error = %e, "fetch failed, caching negative result")
                    }
                }
                None
            }
        }
    }

    async fn process(&self, request: QueuedRequest) {
        {
            let mut state = self.state.lock().await;
            if state.epoch != request.epoch {
                return;
            }
            let now = self.clock.now();
            if let Some(entry) = state.cache.get_fresh(&request.key, now) {
                let value = entry.value.clone();
                state.release(&request.key, value);
                return;
            }
        }

        let result = self.fetch(&request.key).await;
        self.complete(&request, result).await;
    }

    /// Caches the result and wakes the waiters, unless a reset happened
    /// since the request was issued.
    async fn complete(&self, request: &QueuedRequest, result: Option<PlayerProfile>) {
        let mut state = self.state.lock().await;
        if state.epoch != request.epoch {
            debug!(player = %request.key, epoch = request.epoch, "discarding result from before reset");
            return;
        }
        let now = self.clock.now();
        state.cache.insert(request.key.clone(), result.clone(), now);
        state.release(&request.key, result);
    }
}

/// The one drain loop for a store. Exits, clearing the `draining` flag under
/// the lock, once the queue is empty.
async fn drain(inner: Arc<Inner>) {
    let group_size = inner.policy.group_size();
    loop {
        let group: Vec<QueuedRequest> = {
            let mut state = inner.state.lock().await;
            if state.queue.is_empty() {
                state.draining = false;
                break;
            }
            let take = group_size.min(state.queue.len());
            state.queue.drain(..take).collect()
        };

        debug!(source = inner.source.name(), size = group.len(), "draining group");
        join_all(group.into_iter().map(|request| inner.process(request))).await;

        let more = !inner.state.lock().await.queue.is_empty();
        if more {
            tokio::time::sleep(inner.policy.delay()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::error::AppError;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    const TTL: Duration = Duration::from_secs(30 * 60);

    /// Source that answers after a delay and counts calls per id. Ids
    /// starting with "missing" are not found, "flaky" ids fail in transit.
    struct CountingSource {
        delay: Duration,
        calls: StdMutex<HashMap<String, usize>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl CountingSource {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(CountingSource {
                delay,
                calls: StdMutex::new(HashMap::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            })
        }

        fn calls(&self, id: &str) -> usize {
            self.calls.lock().unwrap().get(id).copied().unwrap_or(0)
        }

        fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().values().sum()
        }
    }

    #[async_trait]
    impl ProfileSource for CountingSource {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn fetch_profile(&self, id: &str) -> Result<PlayerProfile, AppError> {
            *self.calls.lock().unwrap().entry(id.to_string()).or_insert(0) += 1;
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if id.starts_with("missing") {
                return Err(AppError::PlayerNotFound(id.to_string()));
            }
            if id.starts_with("flaky") {
                return Err(AppError::HttpError("connection reset".to_string()));
            }
            Ok(PlayerProfile {
                player_id: Some(id.to_string()),
                nickname: format!("nick-{}", id),
                faceit_elo: Some(2000.0),
                ..Default::default()
            })
        }
    }

    fn batch(size: usize) -> DrainPolicy {
        DrainPolicy::Batch {
            size,
            delay: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let source = CountingSource::new(Duration::from_millis(30));
        let store = ProfileStore::new(source.clone(), batch(10), TTL);

        let lookups = (0..8).map(|_| store.fetch_profile("p1"));
        let results = join_all(lookups).await;

        assert_eq!(source.calls("p1"), 1);
        let first = results[0].clone().unwrap();
        assert!(results.iter().all(|r| r.as_ref() == Some(&first)));
        assert_eq!(first.nickname, "nick-p1");
    }

    #[tokio::test]
    async fn test_cache_hit_skips_source() {
        let source = CountingSource::new(Duration::from_millis(1));
        let store = ProfileStore::new(source.clone(), batch(10), TTL);

        assert!(store.fetch_profile("p1").await.is_some());
        assert!(store.fetch_profile("p1").await.is_some());
        assert_eq!(source.calls("p1"), 1);

        let stats = store.stats().await;
        assert_eq!(stats.cached, 1);
        assert_eq!(stats.pending_keys, 0);
    }

    #[tokio::test]
    async fn test_negative_result_is_cached() {
        let source = CountingSource::new(Duration::from_millis(1));
        let store = ProfileStore::new(source.clone(), batch(10), TTL);

        assert!(store.fetch_profile("missing-1").await.is_none());
        assert!(store.fetch_profile("missing-1").await.is_none());
        assert_eq!(source.calls("missing-1"), 1);

        // transient failures are sticky in the same way
        assert!(store.fetch_profile("flaky-1").await.is_none());
        assert!(store.fetch_profile("flaky-1").await.is_none());
        assert_eq!(source.calls("flaky-1"), 1);
    }

    #[tokio::test]
    async fn test_entry_refetched_after_ttl() {
        let source = CountingSource::new(Duration::from_millis(1));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = ProfileStore::with_clock(source.clone(), batch(10), TTL, clock.clone());

        store.fetch_profile("p1").await;
        clock.advance(chrono::Duration::minutes(29));
        store.fetch_profile("p1").await;
        assert_eq!(source.calls("p1"), 1);

        clock.advance(chrono::Duration::minutes(1));
        store.fetch_profile("p1").await;
        assert_eq!(source.calls("p1"), 2);
    }

    #[tokio::test]
    async fn test_batch_size_bounds_concurrency() {
        let source = CountingSource::new(Duration::from_millis(20));
        let store = ProfileStore::new(source.clone(), batch(3), TTL);

        let ids: Vec<String> = (0..7).map(|i| format!("p{}", i)).collect();
        let results = join_all(ids.iter().map(|id| store.fetch_profile(id))).await;

        assert!(results.iter().all(|r| r.is_some()));
        assert_eq!(source.total_calls(), 7);
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 3);
        assert!(!store.stats().await.draining);
    }

    #[tokio::test]
    async fn test_serial_policy_runs_one_at_a_time() {
        let source = CountingSource::new(Duration::from_millis(5));
        let policy = DrainPolicy::Serial {
            delay: Duration::from_millis(2),
        };
        let store = ProfileStore::new(source.clone(), policy, TTL);

        let ids = ["a", "b", "c", "d"];
        join_all(ids.iter().map(|id| store.fetch_profile(id))).await;

        assert_eq!(source.total_calls(), 4);
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reset_discards_in_flight_result() {
        let source = CountingSource::new(Duration::from_millis(50));
        let store = ProfileStore::new(source.clone(), batch(10), TTL);

        let waiting = {
            let store = store.clone();
            tokio::spawn(async move { store.fetch_profile("p1").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.reset().await;

        // the abandoned caller resolves to absent
        assert!(waiting.await.unwrap().is_none());

        // let the old fetch land; it must not populate the cache
        tokio::time::sleep(Duration::from_millis(80)).await;
        let stats = store.stats().await;
        assert_eq!(stats.cached, 0);
        assert_eq!(stats.epoch, 1);

        assert!(store.fetch_profile("p1").await.is_some());
        assert_eq!(source.calls("p1"), 2);
    }

    #[tokio::test]
    async fn test_fetch_now_shares_in_flight_request() {
        let source = CountingSource::new(Duration::from_millis(30));
        let store = ProfileStore::new(source.clone(), batch(10), TTL);

        let (queued, now_a, now_b) = tokio::join!(
            store.fetch_profile("k"),
            store.fetch_now("k"),
            store.fetch_now("k"),
        );
        assert_eq!(source.calls("k"), 1);
        assert!(queued.is_some());
        assert_eq!(queued, now_a);
        assert_eq!(now_a, now_b);

        // the direct fetch owns the key; a queued lookup joins it
        let (now_c, queued_c) = tokio::join!(store.fetch_now("j"), store.fetch_profile("j"));
        assert_eq!(source.calls("j"), 1);
        assert_eq!(now_c, queued_c);
        assert_eq!(store.stats().await.pending_keys, 0);
    }

    #[tokio::test]
    async fn test_enqueue_during_drain_extends_the_loop() {
        let source = CountingSource::new(Duration::from_millis(30));
        let store = ProfileStore::new(source.clone(), batch(2), TTL);

        let first: Vec<_> = ["a", "b"]
            .into_iter()
            .map(|id| {
                let store = store.clone();
                tokio::spawn(async move { store.fetch_profile(id).await })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(10)).await;

        // first group is on the wire; these two wait behind it
        let late: Vec<_> = ["c", "d"]
            .into_iter()
            .map(|id| {
                let store = store.clone();
                tokio::spawn(async move { store.fetch_profile(id).await })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let stats = store.stats().await;
        assert!(stats.draining);
        assert_eq!(stats.queued, 2);

        for handle in first.into_iter().chain(late) {
            assert!(handle.await.unwrap().is_some());
        }
        assert_eq!(source.total_calls(), 4);
        // a second loop would have run c and d alongside a and b
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 2);
        assert!(!store.stats().await.draining);
    }

    #[tokio::test]
    async fn test_queued_key_fresh_at_drain_time_skips_source() {
        let source = CountingSource::new(Duration::from_millis(30));
        let policy = DrainPolicy::Serial {
            delay: Duration::from_millis(5),
        };
        let store = ProfileStore::new(source.clone(), policy, TTL);

        let (slow, waiting) = {
            let (s1, s2) = (store.clone(), store.clone());
            (
                tokio::spawn(async move { s1.fetch_profile("a").await }),
                tokio::spawn(async move { s2.fetch_profile("b").await }),
            )
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.stats().await.queued, 1);

        let seeded = PlayerProfile {
            nickname: "seeded".to_string(),
            ..Default::default()
        };
        {
            let mut state = store.inner.state.lock().await;
            let now = store.inner.clock.now();
            state.cache.insert("b".to_string(), Some(seeded.clone()), now);
        }

        assert!(slow.await.unwrap().is_some());
        assert_eq!(waiting.await.unwrap(), Some(seeded));
        assert_eq!(source.calls("b"), 0);
        assert_eq!(source.calls("a"), 1);
    }

    #[tokio::test]
    async fn test_fetch_now_bypasses_queue_but_caches() {
        let source = CountingSource::new(Duration::from_millis(1));
        let store = ProfileStore::new(source.clone(), batch(10), TTL);

        assert!(store.fetch_now("pro").await.is_some());
        assert!(store.fetch_profile("pro").await.is_some());
        assert_eq!(source.calls("pro"), 1);
        assert_eq!(store.stats().await.queued, 0);
    }
}
