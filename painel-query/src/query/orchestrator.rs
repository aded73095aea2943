//! Query cache and orchestrator.
//!
//! Owns one entry per [`QueryKey`]. Each entry holds the last payload, the
//! last error and the fetch status, and broadcasts every change through a
//! `watch` channel to its subscribers. The orchestrator:
//!
//! - serves fresh entries without touching the gateway,
//! - runs at most one fetch per generation and lets concurrent callers join it,
//! - retries failed fetches with capped exponential backoff,
//! - refetches on a timer while an entry has subscribers,
//! - evicts entries that stayed unobserved for their `cache_time`.
//!
//! The entry map sits behind a `std::sync::Mutex` that is never held across
//! an `.await`.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::key::{KeyPattern, QueryKey};
use super::policy::{Backoff, FreshnessPolicy, PolicyTable};
use crate::gateway::{GatewayError, GatewayResult};

type AnyData = Arc<dyn Any + Send + Sync>;
type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, GatewayResult<AnyData>> + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, ()>>;

// ============================================================================
// Query State
// ============================================================================

/// Fetch status flags of one query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStatus {
    /// First load: a fetch is running and no data has arrived yet
    pub is_loading: bool,
    /// Any fetch is running, including background refetches
    pub is_fetching: bool,
    /// The last completed fetch failed after its retries
    pub is_error: bool,
}

impl FetchStatus {
    pub fn is_success(&self) -> bool {
        !self.is_error && !self.is_loading
    }
}

/// Typed view of a cache entry.
pub struct QueryState<T> {
    pub data: Option<Arc<T>>,
    pub error: Option<Arc<GatewayError>>,
    pub status: FetchStatus,
    /// Wall-clock time of the last successful update
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> QueryState<T> {
    /// State of a query that has not run.
    pub fn idle() -> Self {
        Self {
            data: None,
            error: None,
            status: FetchStatus::default(),
            updated_at: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status.is_loading
    }

    pub fn is_fetching(&self) -> bool {
        self.status.is_fetching
    }

    pub fn is_error(&self) -> bool {
        self.status.is_error
    }
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            status: self.status,
            updated_at: self.updated_at,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for QueryState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryState")
            .field("data", &self.data)
            .field("error", &self.error)
            .field("status", &self.status)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Untyped state carried on the broadcast channel.
#[derive(Clone, Default)]
struct RawState {
    data: Option<AnyData>,
    error: Option<Arc<GatewayError>>,
    status: FetchStatus,
    updated_at: Option<DateTime<Utc>>,
}

impl RawState {
    fn typed<T: Send + Sync + 'static>(&self) -> QueryState<T> {
        QueryState {
            data: self.data.clone().and_then(|d| d.downcast::<T>().ok()),
            error: self.error.clone(),
            status: self.status,
            updated_at: self.updated_at,
        }
    }
}

// ============================================================================
// Cache Entry
// ============================================================================

struct InFlight {
    generation: u64,
    done: SharedFetch,
}

struct Entry {
    /// Current state; the sender doubles as its storage
    tx: watch::Sender<RawState>,
    policy: FreshnessPolicy,
    fetcher: Option<Fetcher>,
    /// Monotonic time of the last successful fetch or direct write
    last_fetched_at: Option<Instant>,
    invalidated: bool,
    /// Last generation handed out
    generation: u64,
    /// Newest generation whose result has been applied
    applied_generation: u64,
    in_flight: Option<InFlight>,
    subscribers: usize,
    /// Callers blocked in `fetch`
    waiters: usize,
    timer: Option<JoinHandle<()>>,
    /// Pending eviction while nobody observes the entry
    eviction: Option<JoinHandle<()>>,
    /// Bumped whenever the entry becomes idle; stale eviction timers compare against it
    idle_epoch: u64,
}

impl Entry {
    fn new(policy: FreshnessPolicy) -> Self {
        let (tx, _rx) = watch::channel(RawState::default());
        Self {
            tx,
            policy,
            fetcher: None,
            last_fetched_at: None,
            invalidated: false,
            generation: 0,
            applied_generation: 0,
            in_flight: None,
            subscribers: 0,
            waiters: 0,
            timer: None,
            eviction: None,
            idle_epoch: 0,
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        if self.invalidated {
            return false;
        }
        self.last_fetched_at
            .map_or(false, |at| now.duration_since(at) < self.policy.stale_time)
    }

    fn is_observed(&self) -> bool {
        self.subscribers > 0 || self.waiters > 0
    }

    fn snapshot(&self) -> RawState {
        self.tx.borrow().clone()
    }

    fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn cancel_eviction(&mut self) {
        if let Some(eviction) = self.eviction.take() {
            eviction.abort();
        }
    }

    fn has_pending_eviction(&self) -> bool {
        self.eviction.as_ref().map_or(false, |h| !h.is_finished())
    }
}

impl Drop for Entry {
    fn drop(&mut self) {
        self.stop_timer();
        self.cancel_eviction();
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub subscribed_entries: usize,
    pub fetching_entries: usize,
    /// Entries waiting out their `cache_time` before eviction
    pub pending_evictions: usize,
}

// ============================================================================
// Orchestrator
// ============================================================================

struct Inner {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    policies: PolicyTable,
}

/// Cloneable handle to a query cache.
///
/// Construct one at the application root and pass clones to consumers.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(policies: PolicyTable) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                policies,
            }),
        }
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.inner.policies
    }

    /// Return the state for `key`, fetching first when it is stale or absent.
    ///
    /// Concurrent callers for the same key share one fetcher invocation.
    /// Failures are reported in the returned state, never as an error.
    pub async fn fetch<T, F, Fut>(
        &self,
        key: QueryKey,
        policy: FreshnessPolicy,
        fetcher: F,
    ) -> QueryState<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<T>> + Send + 'static,
    {
        let fetcher = erase(fetcher);

        let joined = {
            let mut entries = self.inner.lock();
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(policy));
            entry.policy = policy;
            entry.fetcher = Some(fetcher);

            if entry.is_fresh(Instant::now()) {
                debug!(key = %key, "Query cache hit");
                let state = entry.snapshot().typed();
                if !entry.is_observed() {
                    self.inner.schedule_eviction(&key, entry);
                }
                return state;
            }

            let joined = entry
                .in_flight
                .as_ref()
                .map(|f| (f.generation, f.done.clone()));
            let joined = match joined {
                Some((generation, done)) => {
                    debug!(key = %key, generation, "Joining in-flight fetch");
                    (generation, done)
                }
                None => {
                    debug!(key = %key, "Query cache miss");
                    match self.inner.start_fetch(&key, entry) {
                        Some(done) => (entry.generation, done),
                        None => return entry.snapshot().typed(),
                    }
                }
            };
            entry.waiters += 1;
            entry.cancel_eviction();
            joined
        };

        let guard = WaiterGuard {
            inner: Arc::clone(&self.inner),
            key: key.clone(),
        };
        let (mut generation, mut done) = joined;
        loop {
            done.await;
            // A newer generation started while waiting (invalidate, refetch).
            match self.inner.in_flight_after(&key, generation) {
                Some((next, next_done)) => {
                    generation = next;
                    done = next_done;
                }
                None => break,
            }
        }
        let state = self.state::<T>(&key).unwrap_or_else(QueryState::idle);
        drop(guard);
        state
    }

    /// Attach a subscriber to `key`.
    ///
    /// Starts a fetch when the entry is stale or absent and starts the
    /// background refetch timer when this is the first subscriber. Dropping
    /// the returned handle detaches it.
    pub fn subscribe<T, F, Fut>(
        &self,
        key: QueryKey,
        policy: FreshnessPolicy,
        fetcher: F,
    ) -> Subscription<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<T>> + Send + 'static,
    {
        let fetcher = erase(fetcher);
        let mut entries = self.inner.lock();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(policy));
        entry.policy = policy;
        entry.fetcher = Some(fetcher);
        entry.subscribers += 1;
        entry.cancel_eviction();

        if entry.subscribers == 1 {
            if let Some(period) = policy.refetch_interval {
                entry.timer = self.inner.spawn_refetch_timer(key.clone(), period);
            }
        }

        if !entry.is_fresh(Instant::now()) && entry.in_flight.is_none() {
            self.inner.start_fetch(&key, entry);
        }

        let rx = entry.tx.subscribe();
        debug!(key = %key, subscribers = entry.subscribers, "Subscribed");

        Subscription {
            inner: Arc::clone(&self.inner),
            key,
            rx,
            _marker: PhantomData,
        }
    }

    /// Mark matching entries stale: refetch the observed ones, drop the rest.
    ///
    /// An entry counts as observed while it has a subscriber or a caller
    /// blocked in [`fetch`](Self::fetch).
    ///
    /// Returns the number of entries touched.
    pub fn invalidate(&self, pattern: &KeyPattern) -> usize {
        let mut entries = self.inner.lock();
        let keys: Vec<QueryKey> = entries
            .keys()
            .filter(|k| pattern.matches(k))
            .cloned()
            .collect();

        for key in &keys {
            let observed = entries.get(key).map_or(false, Entry::is_observed);
            if observed {
                if let Some(entry) = entries.get_mut(key) {
                    entry.invalidated = true;
                    self.inner.start_fetch(key, entry);
                }
            } else {
                entries.remove(key);
            }
        }

        debug!(matched = keys.len(), "Invalidated queries");
        keys.len()
    }

    /// Write `value` directly into the cache without a network call.
    ///
    /// Clears any error, ends loading and supersedes a fetch in flight.
    pub fn set_data<T: Send + Sync + 'static>(&self, key: QueryKey, value: T) {
        let mut entries = self.inner.lock();
        let policy = self.inner.policies.default_policy();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(policy));

        entry.generation += 1;
        entry.applied_generation = entry.generation;
        entry.in_flight = None;
        entry.last_fetched_at = Some(Instant::now());
        entry.invalidated = false;

        let data: AnyData = Arc::new(value);
        entry.tx.send_replace(RawState {
            data: Some(data),
            error: None,
            status: FetchStatus::default(),
            updated_at: Some(Utc::now()),
        });

        debug!(key = %key, generation = entry.generation, "Query data set");
        if !entry.is_observed() {
            self.inner.schedule_eviction(&key, entry);
        }
    }

    /// Start a new fetch generation for an existing entry, even while one is
    /// in flight. Returns `false` when the key is unknown or has no fetcher.
    pub fn refetch(&self, key: &QueryKey) -> bool {
        let mut entries = self.inner.lock();
        match entries.get_mut(key) {
            Some(entry) => self.inner.start_fetch(key, entry).is_some(),
            None => false,
        }
    }

    /// Refetch stale, subscribed entries whose policy asks for it on focus.
    pub fn on_focus(&self) -> usize {
        self.refetch_stale_where(|entry| entry.policy.refetch_on_focus)
    }

    /// Refetch every stale, subscribed entry after connectivity returns.
    pub fn on_reconnect(&self) -> usize {
        self.refetch_stale_where(|_| true)
    }

    fn refetch_stale_where<P>(&self, predicate: P) -> usize
    where
        P: Fn(&Entry) -> bool,
    {
        let now = Instant::now();
        let mut entries = self.inner.lock();
        let mut started = 0;
        for (key, entry) in entries.iter_mut() {
            if entry.subscribers > 0
                && entry.in_flight.is_none()
                && !entry.is_fresh(now)
                && predicate(entry)
                && self.inner.start_fetch(key, entry).is_some()
            {
                started += 1;
            }
        }
        started
    }

    /// Cached payload for `key`, if any and of type `T`.
    pub fn get_data<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        self.state::<T>(key).and_then(|s| s.data)
    }

    pub fn state<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<QueryState<T>> {
        let entries = self.inner.lock();
        entries.get(key).map(|e| e.snapshot().typed())
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.inner.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.inner.lock();
        CacheStats {
            total_entries: entries.len(),
            subscribed_entries: entries.values().filter(|e| e.subscribers > 0).count(),
            fetching_entries: entries.values().filter(|e| e.in_flight.is_some()).count(),
            pending_evictions: entries.values().filter(|e| e.has_pending_eviction()).count(),
        }
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("stats", &self.stats())
            .finish()
    }
}

fn erase<T, F, Fut>(fetcher: F) -> Fetcher
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = GatewayResult<T>> + Send + 'static,
{
    Arc::new(move || {
        let fut = fetcher();
        async move { fut.await.map(|value| Arc::new(value) as AnyData) }.boxed()
    })
}

fn spawn_detached<F>(fut: F) -> Option<JoinHandle<()>>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::runtime::Handle::try_current()
        .ok()
        .map(|handle| handle.spawn(fut))
}

// ============================================================================
// Fetch lifecycle
// ============================================================================

impl Inner {
    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Open a new generation and spawn its fetch task.
    fn start_fetch(self: &Arc<Self>, key: &QueryKey, entry: &mut Entry) -> Option<SharedFetch> {
        let fetcher = entry.fetcher.clone()?;
        let generation = entry.generation + 1;

        // The task cannot observe the entry before the map lock is released.
        let task = run_fetch(
            Arc::downgrade(self),
            key.clone(),
            generation,
            fetcher,
            entry.policy.retry,
            self.policies.backoff(),
        );
        let handle = spawn_detached(task)?;

        entry.generation = generation;
        entry.tx.send_modify(|state| {
            state.status.is_fetching = true;
            state.status.is_loading = state.data.is_none();
        });

        let done = async move {
            let _ = handle.await;
        }
        .boxed()
        .shared();

        entry.in_flight = Some(InFlight {
            generation,
            done: done.clone(),
        });
        Some(done)
    }

    /// Generation in flight for `key` if it is newer than `generation`.
    fn in_flight_after(&self, key: &QueryKey, generation: u64) -> Option<(u64, SharedFetch)> {
        let entries = self.lock();
        entries
            .get(key)
            .and_then(|e| e.in_flight.as_ref())
            .filter(|f| f.generation > generation)
            .map(|f| (f.generation, f.done.clone()))
    }

    /// Whether a failed attempt of `generation` may be retried.
    fn may_retry(&self, key: &QueryKey, generation: u64) -> bool {
        let entries = self.lock();
        entries
            .get(key)
            .map_or(false, |e| e.generation == generation && e.is_observed())
    }

    fn apply(&self, key: &QueryKey, generation: u64, result: GatewayResult<AnyData>) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(key) else {
            debug!(key = %key, generation, "Result for evicted query dropped");
            return;
        };

        if generation <= entry.applied_generation {
            debug!(
                key = %key,
                generation,
                applied = entry.applied_generation,
                "Superseded result discarded"
            );
            return;
        }
        entry.applied_generation = generation;

        let still_fetching = generation < entry.generation && entry.in_flight.is_some();
        if !still_fetching {
            entry.in_flight = None;
        }

        match result {
            Ok(data) => {
                entry.last_fetched_at = Some(Instant::now());
                entry.invalidated = false;
                entry.tx.send_modify(|state| {
                    state.data = Some(data);
                    state.error = None;
                    state.status = FetchStatus {
                        is_loading: false,
                        is_fetching: still_fetching,
                        is_error: false,
                    };
                    state.updated_at = Some(Utc::now());
                });
            }
            Err(err) => {
                entry.tx.send_modify(|state| {
                    state.error = Some(Arc::new(err));
                    state.status = FetchStatus {
                        is_loading: still_fetching && state.data.is_none(),
                        is_fetching: still_fetching,
                        is_error: true,
                    };
                });
            }
        }
    }

    /// Spawn the periodic refetch loop for a subscribed entry.
    fn spawn_refetch_timer(
        self: &Arc<Self>,
        key: QueryKey,
        period: std::time::Duration,
    ) -> Option<JoinHandle<()>> {
        let weak = Arc::downgrade(self);
        spawn_detached(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let mut entries = inner.lock();
                let Some(entry) = entries.get_mut(&key) else {
                    break;
                };
                if entry.subscribers == 0 {
                    break;
                }
                if entry.in_flight.is_none() {
                    debug!(key = %key, "Background refetch");
                    inner.start_fetch(&key, entry);
                }
            }
        })
    }

    /// Arm the eviction timer for an entry nobody observes, replacing any
    /// timer armed earlier.
    fn schedule_eviction(self: &Arc<Self>, key: &QueryKey, entry: &mut Entry) {
        entry.cancel_eviction();
        entry.idle_epoch += 1;
        let epoch = entry.idle_epoch;
        let cache_time = entry.policy.cache_time;
        let weak = Arc::downgrade(self);
        let key = key.clone();

        entry.eviction = spawn_detached(async move {
            tokio::time::sleep(cache_time).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut entries = inner.lock();
            let evict = entries
                .get(&key)
                .map_or(false, |e| !e.is_observed() && e.idle_epoch == epoch);
            if evict {
                if let Some(mut entry) = entries.remove(&key) {
                    // Dropping the entry would abort this very task.
                    entry.eviction = None;
                }
                debug!(key = %key, "Evicted idle query");
            }
        });
    }

    fn release_waiter(self: &Arc<Self>, key: &QueryKey) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(key) {
            entry.waiters = entry.waiters.saturating_sub(1);
            if !entry.is_observed() {
                self.schedule_eviction(key, entry);
            }
        }
    }

    fn release_subscriber(self: &Arc<Self>, key: &QueryKey) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            debug!(key = %key, subscribers = entry.subscribers, "Unsubscribed");
            if entry.subscribers == 0 {
                entry.stop_timer();
                if entry.waiters == 0 {
                    self.schedule_eviction(key, entry);
                }
            }
        }
    }
}

/// Run one generation: call the fetcher, retry with backoff, apply the result.
async fn run_fetch(
    inner: Weak<Inner>,
    key: QueryKey,
    generation: u64,
    fetcher: Fetcher,
    max_retries: u32,
    backoff: Backoff,
) {
    let mut attempt = 0;
    loop {
        let result = fetcher().await;

        let Some(strong) = inner.upgrade() else {
            return;
        };

        match result {
            Ok(data) => {
                strong.apply(&key, generation, Ok(data));
                return;
            }
            Err(err) => {
                if attempt >= max_retries || !strong.may_retry(&key, generation) {
                    warn!(
                        key = %key,
                        generation,
                        attempts = attempt + 1,
                        kind = err.kind().as_str(),
                        error = %err,
                        "Query failed"
                    );
                    strong.apply(&key, generation, Err(err));
                    return;
                }

                let delay = backoff.delay(attempt);
                warn!(
                    key = %key,
                    attempt = attempt + 1,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Query failed, retrying..."
                );
                drop(strong);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

struct WaiterGuard {
    inner: Arc<Inner>,
    key: QueryKey,
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        self.inner.release_waiter(&self.key);
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Live handle on one query. Dropping it detaches the subscriber.
pub struct Subscription<T> {
    inner: Arc<Inner>,
    key: QueryKey,
    rx: watch::Receiver<RawState>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Subscription<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current state of the query.
    pub fn state(&self) -> QueryState<T> {
        self.rx.borrow().typed()
    }

    /// Wait for the next broadcast. Returns `false` once the entry is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until `predicate` holds for the current state and return it.
    pub async fn wait_for<P>(&mut self, predicate: P) -> QueryState<T>
    where
        P: Fn(&QueryState<T>) -> bool,
    {
        loop {
            let state = self.state();
            if predicate(&state) {
                return state;
            }
            if !self.changed().await {
                return self.state();
            }
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.inner.release_subscriber(&self.key);
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("key", &self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn key(name: &str) -> QueryKey {
        QueryKey::new(["test", name])
    }

    fn counting_fetcher(
        calls: Arc<AtomicU32>,
    ) -> impl Fn() -> BoxFuture<'static, GatewayResult<u32>> + Send + Sync + 'static {
        move || {
            let calls = Arc::clone(&calls);
            async move { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) }.boxed()
        }
    }

    fn policy(stale_secs: u64) -> FreshnessPolicy {
        FreshnessPolicy::new(
            None,
            Duration::from_secs(stale_secs),
            Duration::from_secs(300),
            0,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_caches_until_stale() {
        let orch = Orchestrator::new(PolicyTable::default());
        let calls = Arc::new(AtomicU32::new(0));

        let first = orch
            .fetch(key("a"), policy(10), counting_fetcher(calls.clone()))
            .await;
        assert_eq!(first.data.as_deref(), Some(&1));
        assert!(!first.is_loading());

        let second = orch
            .fetch(key("a"), policy(10), counting_fetcher(calls.clone()))
            .await;
        assert_eq!(second.data.as_deref(), Some(&1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(11)).await;
        let third = orch
            .fetch(key("a"), policy(10), counting_fetcher(calls.clone()))
            .await;
        assert_eq!(third.data.as_deref(), Some(&2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_error() {
        let orch = Orchestrator::new(PolicyTable::default());
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let retrying = FreshnessPolicy::new(None, Duration::ZERO, Duration::from_secs(300), 2);

        let state = orch
            .fetch(key("fail"), retrying, move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>(GatewayError::Http {
                        status: 503,
                        detail: None,
                    })
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(state.is_error());
        assert!(!state.is_loading());
        assert!(!state.is_fetching());
        assert_eq!(
            state.error.as_deref(),
            Some(&GatewayError::Http {
                status: 503,
                detail: None
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_data_without_entry() {
        let orch = Orchestrator::new(PolicyTable::default());
        orch.set_data(key("direct"), 42u32);

        let state = orch.state::<u32>(&key("direct")).unwrap();
        assert_eq!(state.data.as_deref(), Some(&42));
        assert!(!state.is_loading());
        assert!(state.error.is_none());
        assert!(!orch.refetch(&key("direct")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_drops_unsubscribed() {
        let orch = Orchestrator::new(PolicyTable::default());
        let calls = Arc::new(AtomicU32::new(0));
        orch.fetch(key("x"), policy(60), counting_fetcher(calls.clone()))
            .await;
        orch.fetch(key("y"), policy(60), counting_fetcher(calls.clone()))
            .await;
        assert_eq!(orch.len(), 2);

        let touched = orch.invalidate(&KeyPattern::prefix(["test", "x"]));
        assert_eq!(touched, 1);
        assert!(!orch.contains(&key("x")));
        assert!(orch.contains(&key("y")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_refetches_subscribed() {
        let orch = Orchestrator::new(PolicyTable::default());
        let calls = Arc::new(AtomicU32::new(0));
        let mut sub = orch.subscribe(key("s"), policy(60), counting_fetcher(calls.clone()));
        let state = sub.wait_for(|s| s.data.is_some()).await;
        assert_eq!(state.data.as_deref(), Some(&1));

        orch.invalidate(&KeyPattern::prefix(["test"]));
        let state = sub.wait_for(|s| s.data.as_deref() == Some(&2)).await;
        assert!(!state.is_fetching());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_type_mismatch_reads_as_empty() {
        let orch = Orchestrator::new(PolicyTable::default());
        orch.set_data(key("typed"), String::from("hello"));
        assert!(orch.get_data::<u32>(&key("typed")).is_none());
        assert_eq!(
            orch.get_data::<String>(&key("typed")).as_deref().map(String::as_str),
            Some("hello")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats() {
        let orch = Orchestrator::new(PolicyTable::default());
        let calls = Arc::new(AtomicU32::new(0));
        let mut sub = orch.subscribe(key("s"), policy(60), counting_fetcher(calls));
        sub.wait_for(|s| s.data.is_some()).await;
        orch.set_data(key("other"), 1u32);

        let stats = orch.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.subscribed_entries, 1);
        assert_eq!(stats.fetching_entries, 0);
        assert_eq!(stats.pending_evictions, 1);
    }

    #[test]
    fn test_subscribe_outside_runtime_stays_idle() {
        let orch = Orchestrator::new(PolicyTable::default());
        let calls = Arc::new(AtomicU32::new(0));
        let every_second = policy(10).with_refetch_interval(Some(Duration::from_secs(1)));

        let sub = orch.subscribe(key("offline"), every_second, counting_fetcher(calls.clone()));
        let state = sub.state();
        assert!(!state.is_loading());
        assert!(!state.is_fetching());
        assert!(state.data.is_none());

        drop(sub);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(orch.stats().pending_evictions, 0);
    }
}
