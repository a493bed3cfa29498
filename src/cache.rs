//! Keyed async cache.
//!
//! Memoizes an async loader per key by caching the in-flight future itself,
//! not its resolved value. All callers that arrive before the first load
//! resolves share the same future, so the loader runs at most once per key
//! regardless of concurrency. Rejections are cached the same way and replay
//! until [`CacheService::clear`] is called; there is no per-key eviction.

use crate::error::FsError;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

type SharedLoad<T> = Shared<BoxFuture<'static, Result<T, FsError>>>;
type Loader<T> = Arc<dyn Fn(String) -> BoxFuture<'static, Result<T, FsError>> + Send + Sync>;

/// Optional key normalization applied before lookup and storage.
pub type KeyNormalizer = fn(&str) -> String;

/// Generic memoizing cache of async computations, keyed by string.
pub struct CacheService<T: Clone> {
    label: &'static str,
    loader: Loader<T>,
    normalize: Option<KeyNormalizer>,
    entries: Mutex<HashMap<String, SharedLoad<T>>>,
}

impl<T: Clone + Send + Sync + 'static> CacheService<T> {
    pub fn new<F>(label: &'static str, loader: F) -> Self
    where
        F: Fn(String) -> BoxFuture<'static, Result<T, FsError>> + Send + Sync + 'static,
    {
        CacheService {
            label,
            loader: Arc::new(loader),
            normalize: None,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_normalizer<F>(label: &'static str, loader: F, normalize: KeyNormalizer) -> Self
    where
        F: Fn(String) -> BoxFuture<'static, Result<T, FsError>> + Send + Sync + 'static,
    {
        CacheService {
            normalize: Some(normalize),
            ..Self::new(label, loader)
        }
    }

    /// Resolve the entry for `key`, invoking the loader on first access.
    ///
    /// The entries lock is only held to look up or insert the shared future,
    /// never across an await.
    pub async fn get(&self, key: &str) -> Result<T, FsError> {
        let key = match self.normalize {
            Some(normalize) => normalize(key),
            None => key.to_string(),
        };

        let load = {
            let mut entries = self.entries.lock();
            entries
                .entry(key.clone())
                .or_insert_with(|| {
                    debug!(cache = self.label, key = %key, "loading entry");
                    (self.loader)(key.clone()).shared()
                })
                .clone()
        };

        load.await
    }

    /// Discard every stored entry; subsequent `get` calls rebuild from scratch.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        debug!(cache = self.label, entries = entries.len(), "clearing cache");
        entries.clear();
    }

    /// Number of cached entries, resolved or in flight.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
