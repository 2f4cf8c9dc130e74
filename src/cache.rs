//! Request cache with tag invalidation and optimistic mutations
//!
//! Wraps a remote-resource accessor with an LRU-bounded entry table. Entries
//! move through `Empty -> Fresh -> Stale -> Fresh...`: a fresh entry is
//! returned without loading, a stale one stays visible until a refetch
//! replaces it. Invalidation is tag-based set membership: a mutation that
//! invalidates `["Channel"]` marks every entry carrying that tag stale,
//! without touching untagged entries.
//!
//! Optimistic mutations apply a speculative patch to the cached value before
//! the request is issued, keeping a snapshot of the exact pre-patch value.
//! On failure the snapshot is restored, so rollback is correct regardless of
//! what the forward patch did. Two safeguards keep concurrent I/O honest:
//!
//! - At most one mutation may be in flight per key; an overlapping `mutate`
//!   is rejected with [`RequestError::MutationInFlight`] rather than risking
//!   a rollback to the wrong intermediate value.
//! - Each issued load carries a per-key generation; a response that arrives
//!   after a newer request was issued for the same key is discarded instead
//!   of overwriting fresher data.

use crate::error::RequestError;
use lru::LruCache;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::num::NonZeroUsize;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Lifecycle state of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// No entry for this key
    Empty,
    /// Cached data is current
    Fresh,
    /// Cached data may be outdated but is still returned until refetched
    Stale,
}

/// One cached resource value
#[derive(Debug, Clone)]
struct CacheEntry {
    data: Value,
    tags: Vec<String>,
    fetched_at: Instant,
    stale: bool,
}

/// Cache performance counters
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub invalidations: usize,
    pub rollbacks: usize,
    pub superseded: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheInner {
    entries: LruCache<String, CacheEntry>,
    /// Last issued request generation per key
    generations: HashMap<String, u64>,
    /// Keys with a mutation currently in flight
    pending: HashSet<String>,
    stats: CacheStats,
}

impl CacheInner {
    fn mark_stale(&mut self, tags: &[&str]) -> usize {
        let mut count = 0;
        for (key, entry) in self.entries.iter_mut() {
            if !entry.stale && entry.tags.iter().any(|t| tags.contains(&t.as_str())) {
                crate::trace_log!("marking '{}' stale", key);
                entry.stale = true;
                count += 1;
            }
        }
        self.stats.invalidations += count;
        count
    }

    fn bump_generation(&mut self, key: &str) -> u64 {
        let generation = self.generations.entry(key.to_string()).or_insert(0);
        *generation += 1;
        *generation
    }

    fn current_generation(&self, key: &str) -> u64 {
        self.generations.get(key).copied().unwrap_or(0)
    }
}

/// Request cache with LRU eviction
///
/// Cheap to clone; clones share the entry table. Single-threaded cooperative
/// model: the only suspension points are the awaited loader/request
/// callbacks, so entry bookkeeping never observes a half-applied update.
///
/// Default capacity: 1000 entries.
#[derive(Clone)]
pub struct RequestCache {
    inner: Rc<RefCell<CacheInner>>,
}

impl RequestCache {
    const DEFAULT_CAPACITY: usize = 1000;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).expect("Cache capacity must be non-zero");
        Self {
            inner: Rc::new(RefCell::new(CacheInner {
                entries: LruCache::new(cap),
                generations: HashMap::new(),
                pending: HashSet::new(),
                stats: CacheStats::default(),
            })),
        }
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Return cached data if fresh, otherwise load and store it
    ///
    /// A successful load is stored under `key`, tagged with `tags`, and the
    /// entry becomes fresh. A response superseded by a newer request for the
    /// same key is returned to its caller but not stored.
    pub async fn fetch<F, Fut>(
        &self,
        key: &str,
        tags: &[&str],
        loader: F,
    ) -> Result<Value, RequestError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, RequestError>>,
    {
        let generation = {
            let mut inner = self.inner.borrow_mut();
            let hit = inner
                .entries
                .get(key)
                .filter(|entry| !entry.stale)
                .map(|entry| entry.data.clone());
            if let Some(data) = hit {
                inner.stats.hits += 1;
                crate::trace_log!("cache hit for key: '{}'", key);
                return Ok(data);
            }
            inner.stats.misses += 1;
            crate::trace_log!("cache miss for key: '{}'", key);
            inner.bump_generation(key)
        };

        let result = loader().await;

        let mut inner = self.inner.borrow_mut();
        match result {
            Ok(data) => {
                if inner.current_generation(key) == generation {
                    inner.entries.push(
                        key.to_string(),
                        CacheEntry {
                            data: data.clone(),
                            tags: tags.iter().map(|t| (*t).to_string()).collect(),
                            fetched_at: Instant::now(),
                            stale: false,
                        },
                    );
                } else {
                    inner.stats.superseded += 1;
                    crate::debug_log!("discarding superseded response for key: '{}'", key);
                }
                Ok(data)
            }
            Err(e) => {
                crate::debug_log!("load failed for key '{}': {}", key, e);
                Err(e)
            }
        }
    }

    /// Best-effort cache warm-up
    ///
    /// Loads only if the entry is absent, stale, or older than
    /// `if_older_than`. Errors are logged, never surfaced: a failed prefetch
    /// just means the next `fetch` pays for the load.
    pub async fn prefetch<F, Fut>(&self, key: &str, tags: &[&str], if_older_than: Duration, loader: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, RequestError>>,
    {
        let generation = {
            let mut inner = self.inner.borrow_mut();
            let fresh_enough = inner
                .entries
                .peek(key)
                .is_some_and(|entry| !entry.stale && entry.fetched_at.elapsed() < if_older_than);
            if fresh_enough {
                crate::trace_log!("skipping prefetch for key: '{}'", key);
                return;
            }
            inner.bump_generation(key)
        };

        match loader().await {
            Ok(data) => {
                let mut inner = self.inner.borrow_mut();
                if inner.current_generation(key) == generation {
                    inner.entries.push(
                        key.to_string(),
                        CacheEntry {
                            data,
                            tags: tags.iter().map(|t| (*t).to_string()).collect(),
                            fetched_at: Instant::now(),
                            stale: false,
                        },
                    );
                } else {
                    inner.stats.superseded += 1;
                }
            }
            Err(e) => {
                crate::debug_log!("prefetch failed for key '{}': {}", key, e);
            }
        }
    }

    /// Optimistically patch the cached value, then run the request
    ///
    /// `forward` is applied to the cached entry synchronously, before the
    /// request is issued; the exact pre-patch value is kept for rollback. On
    /// success the confirmed value is returned and every entry whose tags
    /// intersect `invalidates` is marked stale. On failure the pre-patch
    /// value is restored and the error is returned.
    ///
    /// At most one mutation may be in flight per key; overlapping calls get
    /// [`RequestError::MutationInFlight`].
    pub async fn mutate<M, F, Fut>(
        &self,
        key: &str,
        forward: M,
        request: F,
        invalidates: &[&str],
    ) -> Result<Value, RequestError>
    where
        M: FnOnce(&mut Value),
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, RequestError>>,
    {
        let snapshot = {
            let mut inner = self.inner.borrow_mut();
            if inner.pending.contains(key) {
                return Err(RequestError::MutationInFlight(key.to_string()));
            }
            inner.pending.insert(key.to_string());

            match inner.entries.get_mut(key) {
                Some(entry) => {
                    let snapshot = entry.data.clone();
                    forward(&mut entry.data);
                    crate::trace_log!("applied optimistic patch for key: '{}'", key);
                    Some(snapshot)
                }
                // Nothing cached to patch; the request still runs
                None => None,
            }
        };

        let result = request().await;

        let mut inner = self.inner.borrow_mut();
        inner.pending.remove(key);

        match result {
            Ok(confirmed) => {
                let count = inner.mark_stale(invalidates);
                crate::debug_log!(
                    "mutation for key '{}' confirmed, {} entries invalidated",
                    key,
                    count
                );
                Ok(confirmed)
            }
            Err(e) => {
                if let Some(snapshot) = snapshot {
                    if let Some(entry) = inner.entries.get_mut(key) {
                        entry.data = snapshot;
                    }
                    inner.stats.rollbacks += 1;
                    crate::warn_log!("rolled back optimistic patch for key '{}': {}", key, e);
                }
                Err(e)
            }
        }
    }

    /// Mark every entry carrying any of `tags` stale; returns how many
    ///
    /// Stale entries keep their data and remain visible until refetched.
    /// Untagged entries are never invalidated implicitly.
    pub fn invalidate(&self, tags: &[&str]) -> usize {
        self.inner.borrow_mut().mark_stale(tags)
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Lifecycle state of the entry under `key`
    pub fn entry_state(&self, key: &str) -> EntryState {
        match self.inner.borrow().entries.peek(key) {
            None => EntryState::Empty,
            Some(entry) if entry.stale => EntryState::Stale,
            Some(_) => EntryState::Fresh,
        }
    }

    /// Cached data under `key`, fresh or stale, without counting a hit
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.inner
            .borrow()
            .entries
            .peek(key)
            .map(|entry| entry.data.clone())
    }

    /// Cache performance counters
    pub fn stats(&self) -> CacheStats {
        self.inner.borrow().stats.clone()
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    /// Drop every entry and reset generations
    pub fn clear(&self) {
        crate::trace_log!("clearing request cache");
        let mut inner = self.inner.borrow_mut();
        inner.entries.clear();
        inner.generations.clear();
    }
}

impl Default for RequestCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;
    use futures::executor::LocalPool;
    use futures::task::LocalSpawnExt;
    use pollster::block_on;
    use serde_json::json;

    async fn ok(value: Value) -> Result<Value, RequestError> {
        Ok(value)
    }

    #[test]
    fn test_fetch_loads_then_hits() {
        let cache = RequestCache::new();

        let first = block_on(cache.fetch("channels", &["Channel"], || ok(json!(["a"])))).unwrap();
        assert_eq!(first, json!(["a"]));
        assert_eq!(cache.entry_state("channels"), EntryState::Fresh);

        // Second fetch must not call the loader
        let second = block_on(cache.fetch("channels", &["Channel"], || async {
            panic!("loader must not run on a fresh entry")
        }))
        .unwrap();
        assert_eq!(second, json!(["a"]));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_fetch_error_is_typed_and_leaves_cache_empty() {
        let cache = RequestCache::new();

        let err = block_on(cache.fetch("channels", &[], || async {
            Err(RequestError::Loader("timeout".to_string()))
        }))
        .unwrap_err();

        assert_eq!(err, RequestError::Loader("timeout".to_string()));
        assert_eq!(cache.entry_state("channels"), EntryState::Empty);
    }

    #[test]
    fn test_stale_entry_refetches() {
        let cache = RequestCache::new();
        block_on(cache.fetch("channels", &["Channel"], || ok(json!(["old"])))).unwrap();

        cache.invalidate(&["Channel"]);
        assert_eq!(cache.entry_state("channels"), EntryState::Stale);
        // Stale data stays visible
        assert_eq!(cache.peek("channels"), Some(json!(["old"])));

        let refreshed =
            block_on(cache.fetch("channels", &["Channel"], || ok(json!(["new"])))).unwrap();
        assert_eq!(refreshed, json!(["new"]));
        assert_eq!(cache.entry_state("channels"), EntryState::Fresh);
    }

    #[test]
    fn test_tag_invalidation_scope() {
        let cache = RequestCache::new();
        block_on(cache.fetch("channels", &["Channel"], || ok(json!(["c"])))).unwrap();
        block_on(cache.fetch("playlists", &["Playlist"], || ok(json!(["p"])))).unwrap();
        block_on(cache.fetch("untagged", &[], || ok(json!(["u"])))).unwrap();

        let count = cache.invalidate(&["Channel"]);
        assert_eq!(count, 1);

        assert_eq!(cache.entry_state("channels"), EntryState::Stale);
        assert_eq!(cache.entry_state("playlists"), EntryState::Fresh);
        // Untagged entries are never invalidated implicitly
        assert_eq!(cache.entry_state("untagged"), EntryState::Fresh);
    }

    #[test]
    fn test_mutate_applies_patch_before_request() {
        let cache = RequestCache::new();
        block_on(cache.fetch("channels/5", &["Channel"], || {
            ok(json!({"id": 5, "name": "A"}))
        }))
        .unwrap();

        let cache_in_request = cache.clone();
        block_on(cache.mutate(
            "channels/5",
            |value| value["name"] = json!("B"),
            move || async move {
                // The optimistic patch is visible while the request runs
                assert_eq!(cache_in_request.peek("channels/5").unwrap()["name"], "B");
                Ok(json!({"id": 5, "name": "B"}))
            },
            &[],
        ))
        .unwrap();

        assert_eq!(cache.peek("channels/5").unwrap()["name"], "B");
    }

    #[test]
    fn test_optimistic_rollback_restores_pre_patch_value() {
        let cache = RequestCache::new();
        block_on(cache.fetch("channels/5", &["Channel"], || {
            ok(json!({"id": 5, "name": "A"}))
        }))
        .unwrap();

        let err = block_on(cache.mutate(
            "channels/5",
            |value| value["name"] = json!("B"),
            || async { Err(RequestError::Request("500".to_string())) },
            &["Channel"],
        ))
        .unwrap_err();

        assert_eq!(err, RequestError::Request("500".to_string()));
        // Exact pre-patch value restored
        assert_eq!(cache.peek("channels/5"), Some(json!({"id": 5, "name": "A"})));
        // Failed mutation invalidates nothing
        assert_eq!(cache.entry_state("channels/5"), EntryState::Fresh);
        assert_eq!(cache.stats().rollbacks, 1);
    }

    #[test]
    fn test_mutate_invalidates_on_success() {
        let cache = RequestCache::new();
        block_on(cache.fetch("channels", &["Channel"], || ok(json!(["list"])))).unwrap();
        block_on(cache.fetch("channels/5", &["Channel"], || {
            ok(json!({"id": 5, "name": "A"}))
        }))
        .unwrap();

        block_on(cache.mutate(
            "channels/5",
            |value| value["name"] = json!("B"),
            || ok(json!({"id": 5, "name": "B"})),
            &["Channel"],
        ))
        .unwrap();

        // Every Channel-tagged entry is stale, data still visible
        assert_eq!(cache.entry_state("channels"), EntryState::Stale);
        assert_eq!(cache.entry_state("channels/5"), EntryState::Stale);
        assert_eq!(cache.peek("channels/5").unwrap()["name"], "B");
    }

    #[test]
    fn test_mutate_without_cached_entry_still_requests() {
        let cache = RequestCache::new();

        let confirmed = block_on(cache.mutate(
            "channels/9",
            |value| value["name"] = json!("B"),
            || ok(json!({"id": 9, "name": "B"})),
            &[],
        ))
        .unwrap();

        assert_eq!(confirmed["name"], "B");
        assert_eq!(cache.entry_state("channels/9"), EntryState::Empty);
    }

    #[test]
    fn test_overlapping_mutations_on_same_key_rejected() {
        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        let cache = RequestCache::new();

        block_on(cache.fetch("channels/5", &[], || ok(json!({"id": 5, "name": "A"})))).unwrap();

        let (tx, rx) = oneshot::channel::<Result<Value, RequestError>>();
        let first = cache.clone();
        spawner
            .spawn_local(async move {
                let result = first
                    .mutate(
                        "channels/5",
                        |value| value["name"] = json!("B"),
                        move || async move {
                            rx.await
                                .unwrap_or_else(|_| Err(RequestError::Loader("canceled".into())))
                        },
                        &[],
                    )
                    .await;
                assert!(result.is_ok());
            })
            .unwrap();
        pool.run_until_stalled();

        // Second mutation on the same key while the first is in flight
        let err = block_on(cache.mutate(
            "channels/5",
            |value| value["name"] = json!("C"),
            || ok(json!({})),
            &[],
        ))
        .unwrap_err();
        assert_eq!(err, RequestError::MutationInFlight("channels/5".to_string()));

        tx.send(Ok(json!({"id": 5, "name": "B"}))).unwrap();
        pool.run();

        // A different key was never blocked
        block_on(cache.mutate(
            "channels/6",
            |_| {},
            || ok(json!({})),
            &[],
        ))
        .unwrap();
    }

    #[test]
    fn test_stale_response_rejection() {
        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        let cache = RequestCache::new();

        let (tx1, rx1) = oneshot::channel::<Value>();
        let (tx2, rx2) = oneshot::channel::<Value>();

        let generation_one = cache.clone();
        spawner
            .spawn_local(async move {
                let _ = generation_one
                    .fetch("items", &[], move || async move {
                        rx1.await.map_err(|_| RequestError::Loader("canceled".into()))
                    })
                    .await;
            })
            .unwrap();
        pool.run_until_stalled();

        let generation_two = cache.clone();
        spawner
            .spawn_local(async move {
                let _ = generation_two
                    .fetch("items", &[], move || async move {
                        rx2.await.map_err(|_| RequestError::Loader("canceled".into()))
                    })
                    .await;
            })
            .unwrap();
        pool.run_until_stalled();

        // Newer request resolves first, older one arrives late
        tx2.send(json!("two")).unwrap();
        pool.run_until_stalled();
        tx1.send(json!("one")).unwrap();
        pool.run();

        // The late response must not overwrite the newer result
        assert_eq!(cache.peek("items"), Some(json!("two")));
        assert_eq!(cache.stats().superseded, 1);
    }

    #[test]
    fn test_prefetch_skips_recent_entry() {
        let cache = RequestCache::new();
        block_on(cache.fetch("channels", &[], || ok(json!(["seed"])))).unwrap();

        block_on(cache.prefetch("channels", &[], Duration::from_secs(60), || async {
            panic!("prefetch must skip an entry newer than the threshold")
        }));

        assert_eq!(cache.peek("channels"), Some(json!(["seed"])));
    }

    #[test]
    fn test_prefetch_loads_absent_entry() {
        let cache = RequestCache::new();

        block_on(cache.prefetch("channels", &["Channel"], Duration::from_secs(60), || {
            ok(json!(["warm"]))
        }));

        assert_eq!(cache.entry_state("channels"), EntryState::Fresh);
        assert_eq!(cache.peek("channels"), Some(json!(["warm"])));
    }

    #[test]
    fn test_prefetch_reloads_aged_entry() {
        let cache = RequestCache::new();
        block_on(cache.fetch("channels", &[], || ok(json!(["seed"])))).unwrap();

        // Zero threshold: any existing entry counts as too old
        block_on(cache.prefetch("channels", &[], Duration::ZERO, || ok(json!(["warmed"]))));

        assert_eq!(cache.peek("channels"), Some(json!(["warmed"])));
    }

    #[test]
    fn test_prefetch_swallows_errors() {
        let cache = RequestCache::new();

        block_on(cache.prefetch("channels", &[], Duration::ZERO, || async {
            Err(RequestError::Loader("offline".to_string()))
        }));

        assert_eq!(cache.entry_state("channels"), EntryState::Empty);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = RequestCache::with_capacity(2);
        block_on(cache.fetch("a", &[], || ok(json!(1)))).unwrap();
        block_on(cache.fetch("b", &[], || ok(json!(2)))).unwrap();
        block_on(cache.fetch("c", &[], || ok(json!(3)))).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.entry_state("a"), EntryState::Empty);
    }

    #[test]
    fn test_clear() {
        let cache = RequestCache::new();
        block_on(cache.fetch("a", &[], || ok(json!(1)))).unwrap();

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.entry_state("a"), EntryState::Empty);
    }

    #[test]
    fn test_hit_rate() {
        let cache = RequestCache::new();
        block_on(cache.fetch("a", &[], || ok(json!(1)))).unwrap();
        block_on(cache.fetch("a", &[], || ok(json!(1)))).unwrap();

        let stats = cache.stats();
        assert!((stats.hit_rate() - 0.5).abs() < 0.001);
    }
}
