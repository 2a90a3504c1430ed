//! TTL cache of `EffectiveAuth` documents with single-flight refresh

use crate::error::{AuthzError, Result};
use crate::mapper::EffectiveAuthMapper;
use crate::singleflight::{FlightError, SingleFlight};
use dashmap::DashMap;
use dirgate_core::traits::{DirectoryError, DirectoryFetcher};
use dirgate_core::types::{EffectiveAuth, Source};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Cache behavior knobs
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime of a cache entry after a successful fetch
    pub ttl: Duration,

    /// How long past expiry an entry may still be served when a refresh
    /// fails. Zero disables stale serving: once the TTL passes, a failed
    /// refresh fails the request.
    pub stale_grace: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            stale_grace: Duration::ZERO,
        }
    }
}

/// Cached document plus its expiry; never leaves the store
#[derive(Clone)]
struct CacheEntry {
    auth: EffectiveAuth,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    fn within_grace(&self, now: Instant, grace: Duration) -> bool {
        now < self.expires_at + grace
    }
}

/// Key/value store of `EffectiveAuth` documents keyed by principal
///
/// Guarantees at most one concurrent upstream refresh per key: concurrent
/// callers during an in-flight refresh wait on that refresh's result. Both
/// the entry map and the flight table are sharded, so a slow key never stalls
/// unrelated keys.
pub struct CacheStore {
    entries: Arc<DashMap<String, CacheEntry>>,
    flight: SingleFlight<EffectiveAuth, AuthzError>,
    fetcher: Arc<dyn DirectoryFetcher>,
    mapper: Arc<EffectiveAuthMapper>,
    config: CacheConfig,
}

impl CacheStore {
    pub fn new(
        config: CacheConfig,
        fetcher: Arc<dyn DirectoryFetcher>,
        mapper: Arc<EffectiveAuthMapper>,
    ) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            flight: SingleFlight::new(),
            fetcher,
            mapper,
            config,
        }
    }

    /// Return a live entry, or refresh from the directory (single-flight)
    ///
    /// Expired entries are never returned as live. A failed refresh either
    /// serves an entry still inside the configured grace window or fails the
    /// whole request — a partial document is never returned.
    pub async fn get_or_refresh(&self, key: &str) -> Result<(EffectiveAuth, Source)> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(Instant::now()) {
                debug!(%key, "EffectiveAuth served from cache");
                return Ok((entry.auth.clone(), Source::Cache));
            }
        }

        let fetcher = Arc::clone(&self.fetcher);
        let mapper = Arc::clone(&self.mapper);
        let entries = Arc::clone(&self.entries);
        let ttl = self.config.ttl;
        let owned = key.to_string();

        let outcome = self
            .flight
            .run(key, async move {
                let record = fetch_with_retry(fetcher.as_ref(), &owned).await?;
                let auth = mapper.map(&record);
                entries.insert(
                    owned.clone(),
                    CacheEntry {
                        auth: auth.clone(),
                        expires_at: Instant::now() + ttl,
                    },
                );
                debug!(key = %owned, "EffectiveAuth refreshed from directory");
                Ok(auth)
            })
            .await;

        match outcome {
            Ok(auth) => Ok((auth, Source::Refreshed)),
            Err(FlightError::Work(err)) => {
                if let Some(stale) = self.stale_within_grace(key) {
                    warn!(%key, error = %err, "Refresh failed; serving entry within grace window");
                    return Ok((stale, Source::Cache));
                }
                // The entry that forced this refresh is dead; drop it now
                self.entries
                    .remove_if(key, |_, entry| entry.is_expired(Instant::now()));
                Err(err)
            }
            Err(FlightError::Aborted) => {
                Err(AuthzError::Internal("refresh flight aborted".to_string()))
            }
        }
    }

    fn stale_within_grace(&self, key: &str) -> Option<EffectiveAuth> {
        if self.config.stale_grace.is_zero() {
            return None;
        }
        let entry = self.entries.get(key)?;
        entry
            .within_grace(Instant::now(), self.config.stale_grace)
            .then(|| entry.auth.clone())
    }

    /// Evict one principal (logout, admin invalidation)
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Low-priority sweep of entries past TTL and grace; returns how many
    /// were dropped
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let grace = self.config.stale_grace;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.is_expired(now) || entry.within_grace(now, grace));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One retry on transient failures; fatal failures propagate immediately
async fn fetch_with_retry(
    fetcher: &dyn DirectoryFetcher,
    key: &str,
) -> Result<dirgate_core::types::DirectoryRecord> {
    match fetcher.fetch(key).await {
        Ok(record) => Ok(record),
        Err(err @ DirectoryError::Transient(_)) => {
            warn!(%key, error = %err, "Directory fetch failed; retrying once");
            fetcher
                .fetch(key)
                .await
                .map_err(|e| AuthzError::UpstreamUnavailable(e.to_string()))
        }
        Err(err) => Err(AuthzError::UpstreamUnavailable(err.to_string())),
    }
}
