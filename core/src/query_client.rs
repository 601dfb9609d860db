//! Query cache and its default policy.
//!
//! # Design
//! `QueryClient` caches the JSON produced by a `QueryFn`, keyed by the full
//! `QueryKey`. An entry is served from cache while it is fresh: not
//! invalidated and younger than `stale_time`. With the default options it
//! never goes stale by age, is never refetched on focus or on an interval,
//! and failed reads or writes are attempted exactly once.
//!
//! There is no global instance. Build one at startup and hand out
//! references. The cache lock is never held across a fetch, so two callers
//! racing on the same stale key both go to the network.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::query::{QueryFn, QueryKey, UnauthorizedBehavior};

/// How long fetched data counts as fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleTime {
    /// Fresh until explicitly invalidated.
    #[default]
    Infinite,
    Millis(u64),
}

impl StaleTime {
    pub fn is_fresh(&self, age: Duration) -> bool {
        match self {
            StaleTime::Infinite => true,
            StaleTime::Millis(ms) => age < Duration::from_millis(*ms),
        }
    }
}

impl From<Duration> for StaleTime {
    fn from(d: Duration) -> Self {
        StaleTime::Millis(d.as_millis().try_into().unwrap_or(u64::MAX))
    }
}

/// Defaults applied to every query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Age after which `refetch_on_interval` refetches an entry.
    pub refetch_interval_ms: Option<u64>,
    pub refetch_on_window_focus: bool,
    pub stale_time: StaleTime,
    /// Extra attempts after a failed fetch.
    pub retry: u32,
}

impl QueryOptions {
    pub fn refetch_interval(&self) -> Option<Duration> {
        self.refetch_interval_ms.map(Duration::from_millis)
    }
}

/// Defaults applied to every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationOptions {
    pub retry: u32,
}

/// Query and mutation defaults. `Default` gives the application policy: no
/// interval or focus refetch, infinite freshness, no retries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultOptions {
    pub queries: QueryOptions,
    pub mutations: MutationOptions,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Value,
    updated_at: Instant,
    invalidated: bool,
}

impl CacheEntry {
    fn new(data: Value) -> Self {
        Self {
            data,
            updated_at: Instant::now(),
            invalidated: false,
        }
    }

    fn is_fresh(&self, stale_time: StaleTime) -> bool {
        !self.invalidated && stale_time.is_fresh(self.updated_at.elapsed())
    }
}

pub struct QueryClient {
    query_fn: Arc<dyn QueryFn>,
    options: DefaultOptions,
    cache: RwLock<HashMap<QueryKey, CacheEntry>>,
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("options", &self.options)
            .field("entries", &self.read().len())
            .finish_non_exhaustive()
    }
}

impl QueryClient {
    pub fn new(query_fn: Arc<dyn QueryFn>) -> Self {
        Self::with_options(query_fn, DefaultOptions::default())
    }

    pub fn with_options(query_fn: Arc<dyn QueryFn>, options: DefaultOptions) -> Self {
        Self {
            query_fn,
            options,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Client whose default query function GETs through `api` and treats
    /// 401 as an error.
    pub fn for_api(api: &ApiClient) -> Self {
        Self::new(Arc::new(api.query_fn(UnauthorizedBehavior::Throw)))
    }

    pub fn options(&self) -> &DefaultOptions {
        &self.options
    }

    /// Cached data when fresh, otherwise fetched through the query function.
    pub fn fetch_query<T>(&self, key: impl Into<QueryKey>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let key = key.into();
        let cached = self
            .read()
            .get(&key)
            .filter(|entry| entry.is_fresh(self.options.queries.stale_time))
            .map(|entry| entry.data.clone());

        let data = match cached {
            Some(data) => {
                debug!(%key, "query cache hit");
                data
            }
            None => {
                debug!(%key, "query cache miss");
                self.refetch(&key)?
            }
        };
        Ok(serde_json::from_value(data)?)
    }

    /// Cached data regardless of freshness.
    pub fn get_query_data<T>(&self, key: impl Into<QueryKey>) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        let key: QueryKey = key.into();
        let data = self.read().get(&key).map(|entry| entry.data.clone());
        data.map(serde_json::from_value)
            .transpose()
            .map_err(ApiError::from)
    }

    /// Seed or overwrite an entry; it counts as freshly fetched.
    pub fn set_query_data<T>(&self, key: impl Into<QueryKey>, value: &T) -> Result<(), ApiError>
    where
        T: Serialize + ?Sized,
    {
        let data = serde_json::to_value(value)?;
        self.write().insert(key.into(), CacheEntry::new(data));
        Ok(())
    }

    pub fn is_fresh(&self, key: impl Into<QueryKey>) -> bool {
        let key: QueryKey = key.into();
        self.read()
            .get(&key)
            .is_some_and(|entry| entry.is_fresh(self.options.queries.stale_time))
    }

    /// Mark every entry under `prefix` stale. Returns how many were marked.
    pub fn invalidate_queries(&self, prefix: impl Into<QueryKey>) -> usize {
        let prefix = prefix.into();
        let mut cache = self.write();
        let mut count = 0;
        for (_, entry) in cache.iter_mut().filter(|(key, _)| key.starts_with(&prefix)) {
            entry.invalidated = true;
            count += 1;
        }
        trace!(%prefix, count, "invalidated queries");
        count
    }

    /// Drop every entry under `prefix`. Returns how many were dropped.
    pub fn remove_queries(&self, prefix: impl Into<QueryKey>) -> usize {
        let prefix = prefix.into();
        let mut cache = self.write();
        let before = cache.len();
        cache.retain(|key, _| !key.starts_with(&prefix));
        before - cache.len()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Host hook for a regained focus. Refetches stale entries when
    /// `refetch_on_window_focus` is set, otherwise does nothing. A failed
    /// key does not stop the others.
    pub fn on_window_focus(&self) -> Result<usize, ApiError> {
        if !self.options.queries.refetch_on_window_focus {
            return Ok(0);
        }
        let stale_time = self.options.queries.stale_time;
        let keys = self.keys_where(|entry| !entry.is_fresh(stale_time));
        self.refetch_all(&keys)
    }

    /// Host hook for a timer tick. Refetches entries older than
    /// `refetch_interval_ms` when it is set, otherwise does nothing.
    pub fn refetch_on_interval(&self) -> Result<usize, ApiError> {
        let Some(interval) = self.options.queries.refetch_interval() else {
            return Ok(0);
        };
        let keys = self.keys_where(|entry| entry.updated_at.elapsed() >= interval);
        self.refetch_all(&keys)
    }

    /// Run a write, attempting it `1 + mutations.retry` times.
    pub fn mutate<R, F>(&self, f: F) -> Result<R, ApiError>
    where
        F: FnMut() -> Result<R, ApiError>,
    {
        with_retries(self.options.mutations.retry, f)
    }

    fn refetch(&self, key: &QueryKey) -> Result<Value, ApiError> {
        let data = with_retries(self.options.queries.retry, || self.query_fn.fetch(key))?;
        self.write().insert(key.clone(), CacheEntry::new(data.clone()));
        Ok(data)
    }

    /// Every key is attempted even after a failure; the first error is
    /// returned once all have run. Failed keys keep their old data.
    fn refetch_all(&self, keys: &[QueryKey]) -> Result<usize, ApiError> {
        let mut first_error = None;
        for key in keys {
            if let Err(err) = self.refetch(key) {
                warn!(%key, error = %err, "refetch failed");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(keys.len()),
        }
    }

    fn keys_where(&self, pred: impl Fn(&CacheEntry) -> bool) -> Vec<QueryKey> {
        self.read()
            .iter()
            .filter(|(_, entry)| pred(entry))
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn with_retries<R, F>(retry: u32, mut f: F) -> Result<R, ApiError>
where
    F: FnMut() -> Result<R, ApiError>,
{
    let mut attempt = 0;
    loop {
        match f() {
            Ok(value) => return Ok(value),
            Err(err) if attempt < retry => {
                attempt += 1;
                debug!(attempt, error = %err, "retrying");
            }
            Err(err) => return Err(err),
        }
    }
}
