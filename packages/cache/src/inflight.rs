//! Memoizing cache with per-key in-flight request de-duplication.
//!
//! Lookups resolve in three tiers:
//!
//! 1. a settled value for the key is returned immediately;
//! 2. otherwise, if a fetch for the key is already running, the caller
//!    joins it and receives the same result;
//! 3. otherwise a new fetch is spawned and registered as pending.
//!
//! Fetches run as detached `tokio` tasks, so they complete and populate
//! the cache even if every caller stops waiting. Successful results are
//! kept for the lifetime of the cache; failures are handed to every
//! joined caller and then forgotten, so the next lookup retries.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use hotspot_map_api::ApiError;

use crate::CacheError;

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, CacheError>>>;

struct Pending<V> {
    id: u64,
    future: SharedFetch<V>,
}

struct State<K, V> {
    resolved: HashMap<K, V>,
    pending: HashMap<K, Pending<V>>,
    next_id: u64,
}

impl<K: Eq + Hash, V> State<K, V> {
    fn settle(&mut self, key: &K, id: u64, result: &Result<V, CacheError>)
    where
        V: Clone,
        K: Clone,
    {
        // A forced refresh may have replaced this fetch; only the fetch
        // that is still registered may touch the entry.
        if self.pending.get(key).is_none_or(|p| p.id != id) {
            return;
        }
        self.pending.remove(key);
        if let Ok(value) = result {
            self.resolved.insert(key.clone(), value.clone());
        }
    }
}

/// A cache of `V` keyed by `K` that issues at most one concurrent fetch
/// per key.
///
/// Cloning is cheap and yields a handle to the same cache.
pub struct InFlightCache<K, V> {
    name: &'static str,
    state: Arc<Mutex<State<K, V>>>,
}

impl<K, V> Clone for InFlightCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            state: Arc::clone(&self.state),
        }
    }
}

impl<K, V> InFlightCache<K, V>
where
    K: Eq + Hash + Clone + Display + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates an empty cache. `name` is used in log messages.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Arc::new(Mutex::new(State {
                resolved: HashMap::new(),
                pending: HashMap::new(),
                next_id: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<K, V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached value for `key`, joining or starting a fetch
    /// as needed.
    ///
    /// `fetch` is only called when neither a settled value nor a pending
    /// fetch exists. Must be called from within a `tokio` runtime.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the fetch this call resolved through
    /// failed. The failure is not cached.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> Result<V, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        let future = {
            let mut state = self.lock();
            if let Some(value) = state.resolved.get(&key) {
                log::debug!("{}: cache hit for {key}", self.name);
                return Ok(value.clone());
            }
            self.pending_or_spawn(&mut state, key, fetch)
        };
        future.await
    }

    /// Fetches `key` again even if a value is cached, replacing it on
    /// success. Joins a fetch that is already pending instead of
    /// starting a second one. On failure the previous value is kept.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the fetch failed.
    pub async fn refresh<F, Fut>(&self, key: K, fetch: F) -> Result<V, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        let future = {
            let mut state = self.lock();
            self.pending_or_spawn(&mut state, key, fetch)
        };
        future.await
    }

    fn pending_or_spawn<F, Fut>(
        &self,
        state: &mut State<K, V>,
        key: K,
        fetch: F,
    ) -> SharedFetch<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        if let Some(pending) = state.pending.get(&key) {
            log::debug!("{}: joining in-flight fetch for {key}", self.name);
            return pending.future.clone();
        }

        log::debug!("{}: fetching {key}", self.name);
        let id = state.next_id;
        state.next_id += 1;

        let request = fetch();
        let task_state = Arc::clone(&self.state);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let result = request.await.map_err(|e| CacheError::Fetch(Arc::new(e)));
            task_state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .settle(&task_key, id, &result);
            result
        });

        let join_state = Arc::clone(&self.state);
        let join_key = key.clone();
        let name = self.name;
        let future = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    log::error!("{name}: fetch task for {join_key} did not complete: {e}");
                    let result = Err(CacheError::Task {
                        message: e.to_string(),
                    });
                    join_state
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .settle(&join_key, id, &result);
                    result
                }
            }
        }
        .boxed()
        .shared();

        state.pending.insert(
            key,
            Pending {
                id,
                future: future.clone(),
            },
        );
        future
    }

    /// Stores `value` unless `key` already has a settled value.
    ///
    /// Returns whether the value was stored. Used to populate the cache
    /// opportunistically from responses that carry the data as a side
    /// payload.
    pub fn insert_if_absent(&self, key: K, value: V) -> bool {
        let mut state = self.lock();
        if state.resolved.contains_key(&key) {
            return false;
        }
        log::debug!("{}: stored {key} from side payload", self.name);
        state.resolved.insert(key, value);
        true
    }

    /// The settled value for `key`, without fetching.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.lock().resolved.get(key).cloned()
    }

    /// Whether a fetch for `key` is currently running.
    #[must_use]
    pub fn is_pending(&self, key: &K) -> bool {
        self.lock().pending.contains_key(key)
    }

    /// Number of settled entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().resolved.len()
    }

    /// Whether there are no settled entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().resolved.is_empty()
    }
}
