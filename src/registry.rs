//! Per-root row service registry.
//!
//! One authenticated [`RowService`] handle per connected root, memoized
//! behind the keyed async cache so concurrent callers bootstrap a connection
//! at most once. Registries are plain instances owned by whatever represents
//! one provider; there is no process-wide state.

use crate::cache::CacheService;
use crate::error::FsError;
use crate::path::ensure_trailing_slash;
use crate::remote::RowService;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Shared handle to one root's row service.
pub type SharedRowService = Arc<dyn RowService>;

/// Keyed registry of row service handles.
///
/// Keys are root identifiers; a trailing-slash normalizer makes
/// `https://h:1` and `https://h:1/` resolve to the same connection.
pub struct ServiceRegistry {
    services: CacheService<SharedRowService>,
}

impl ServiceRegistry {
    /// Build a registry from an async connector. The connector receives the
    /// normalized root identifier and yields an authenticated handle; its
    /// failures are cached like any loader rejection until [`clear`] runs.
    ///
    /// [`clear`]: ServiceRegistry::clear
    pub fn new<C>(connect: C) -> Self
    where
        C: Fn(String) -> BoxFuture<'static, Result<SharedRowService, FsError>>
            + Send
            + Sync
            + 'static,
    {
        ServiceRegistry {
            services: CacheService::with_normalizer("row-service", connect, ensure_trailing_slash),
        }
    }

    pub async fn get(&self, root: &str) -> Result<SharedRowService, FsError> {
        self.services.get(root).await
    }

    /// Drop every cached handle; the next access per root reconnects.
    pub fn clear(&self) {
        self.services.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRowService;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn one_connection_per_normalized_root() {
        let connects = Arc::new(AtomicUsize::new(0));
        let counter = connects.clone();
        let registry = ServiceRegistry::new(move |_root| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(Arc::new(MemoryRowService::new()) as SharedRowService) }.boxed()
        });

        registry.get("https://h:1").await.unwrap();
        registry.get("https://h:1/").await.unwrap();
        assert_eq!(connects.load(Ordering::SeqCst), 1);

        registry.get("https://other:2/").await.unwrap();
        assert_eq!(connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_connect_replays_until_clear() {
        let connects = Arc::new(AtomicUsize::new(0));
        let counter = connects.clone();
        let registry = ServiceRegistry::new(move |root| {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(FsError::Remote(crate::error::RemoteError::Connect(root)))
                } else {
                    Ok(Arc::new(MemoryRowService::new()) as SharedRowService)
                }
            }
            .boxed()
        });

        assert!(registry.get("https://h:1/").await.is_err());
        assert!(registry.get("https://h:1/").await.is_err());
        assert_eq!(connects.load(Ordering::SeqCst), 1);

        registry.clear();
        assert!(registry.get("https://h:1/").await.is_ok());
    }
}
