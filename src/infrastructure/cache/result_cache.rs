//! Best-effort cache of ranked search results

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::cache::{Cache, CacheBackendInfo, CacheExt, SearchCacheKey};
use crate::domain::search::SearchHit;
use crate::domain::DomainError;

pub const DEFAULT_TTL_SECS: u64 = 300;
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(250);

/// Whether a cache backend is available to this process
#[derive(Debug, Clone)]
pub enum CacheBackend {
    Disabled,
    Active(Arc<dyn Cache>),
}

/// Validated lifetime of a cached result list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl(Duration);

impl CacheTtl {
    /// Rejects zero and negative lifetimes
    pub fn from_secs(secs: i64) -> Result<Self, DomainError> {
        if secs <= 0 {
            return Err(DomainError::configuration(format!(
                "Cache TTL must be positive, got {} seconds",
                secs
            )));
        }

        Ok(Self(Duration::from_secs(secs as u64)))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self(Duration::from_secs(DEFAULT_TTL_SECS))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Connected,
    Disabled,
    /// Backend configured but not answering
    Degraded,
}

/// Point-in-time cache diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub status: CacheStatus,
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<CacheBackendInfo>,
}

/// Search-result cache over an optional backend.
///
/// Never fails a search: backend errors, timeouts and undecodable payloads
/// are logged and reported as misses or skipped writes.
#[derive(Debug)]
pub struct ResultCache {
    backend: CacheBackend,
    timeout: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

impl ResultCache {
    pub fn new(backend: CacheBackend) -> Self {
        Self {
            backend,
            timeout: DEFAULT_CACHE_TIMEOUT,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    pub fn disabled() -> Self {
        Self::new(CacheBackend::Disabled)
    }

    /// Bound on every backend call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn key(query: &str, latitude: f64, longitude: f64, radius_km: u32) -> SearchCacheKey {
        SearchCacheKey::new(query, latitude, longitude, radius_km)
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, DomainError>>,
    ) -> Result<T, DomainError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| DomainError::cache(format!("Cache call timed out after {:?}", self.timeout)))?
    }

    fn record_error(&self, operation: &str, key: &str, error: &DomainError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        warn!(cache_key = %key, operation, error = %error, "Cache operation failed");
    }

    pub async fn get(&self, key: &SearchCacheKey) -> Option<Vec<SearchHit>> {
        let CacheBackend::Active(cache) = &self.backend else {
            return None;
        };

        match self.bounded(cache.get::<Vec<SearchHit>>(key.as_str())).await {
            Ok(Some(hits)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(cache_key = %key, hits = hits.len(), "Cache hit");
                Some(hits)
            }
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(cache_key = %key, "Cache miss");
                None
            }
            Err(e) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.record_error("get", key.as_str(), &e);
                None
            }
        }
    }

    /// Stores the full ranked list; returns whether it was written
    pub async fn put(&self, key: &SearchCacheKey, hits: &[SearchHit], ttl: CacheTtl) -> bool {
        let CacheBackend::Active(cache) = &self.backend else {
            return false;
        };

        match self.bounded(cache.set(key.as_str(), hits, ttl.as_duration())).await {
            Ok(()) => {
                debug!(cache_key = %key, hits = hits.len(), ttl_secs = ttl.as_duration().as_secs(), "Cached search results");
                true
            }
            Err(e) => {
                self.record_error("put", key.as_str(), &e);
                false
            }
        }
    }

    /// Deletes entries matching a glob pattern; 0 when unavailable
    pub async fn invalidate(&self, pattern: &str) -> usize {
        let CacheBackend::Active(cache) = &self.backend else {
            return 0;
        };

        match self.bounded(cache.delete_pattern(pattern)).await {
            Ok(count) => {
                debug!(pattern, count, "Invalidated cached searches");
                count
            }
            Err(e) => {
                self.record_error("invalidate", pattern, &e);
                0
            }
        }
    }

    pub async fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);

        let CacheBackend::Active(cache) = &self.backend else {
            return CacheStats {
                status: CacheStatus::Disabled,
                size: 0,
                hits,
                misses,
                errors: self.errors.load(Ordering::Relaxed),
                backend: None,
            };
        };

        let (status, size, backend) = match self.bounded(cache.info()).await {
            Ok(info) => (CacheStatus::Connected, info.total_keys, Some(info)),
            Err(e) => {
                self.record_error("stats", "*", &e);
                (CacheStatus::Degraded, 0, None)
            }
        };

        CacheStats {
            status,
            size,
            hits,
            misses,
            errors: self.errors.load(Ordering::Relaxed),
            backend,
        }
    }
}
