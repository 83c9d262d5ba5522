use crate::domain::BackendKind;
use crate::keys;
use crate::ports::{CacheStore, StorageFactory};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{Error, TtlSecs};
use shared::config::CacheSettings;
use std::fmt::{Debug, Display};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Application-facing cache facade
///
/// Wraps one backend for its whole lifetime. Every operation is fail-soft:
/// backend, connection and serialization errors are logged and turned into
/// `None` / `false`, so callers can always proceed as if the cache were empty.
#[derive(Clone)]
pub struct CacheService {
    store: Arc<dyn CacheStore>,
}

impl CacheService {
    /// Wrap an already constructed store
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Select and build the backend once from settings.
    ///
    /// A production deployment with a configured host gets the distributed
    /// store; anything else, including a failure to build the distributed
    /// store, gets the local one.
    pub async fn from_settings(settings: &CacheSettings, factory: &dyn StorageFactory) -> Self {
        let store = match settings.distributed_target() {
            Some(redis) => match factory.create_distributed(redis, settings.reconnect).await {
                Ok(store) => {
                    info!(
                        backend = %store.kind(),
                        host = %redis.host,
                        port = redis.port,
                        "Distributed cache backend initialized"
                    );
                    store
                }
                Err(e) => {
                    error!(
                        error = %e,
                        host = %redis.host,
                        "Failed to initialize distributed cache, falling back to local store"
                    );
                    factory.create_local()
                }
            },
            None => {
                info!(
                    production = settings.production,
                    redis_configured = settings.redis.is_some(),
                    "Using local in-process cache"
                );
                factory.create_local()
            }
        };

        Self::new(store)
    }

    /// Fetch and deserialize a value. `None` on miss, expiry or any failure.
    pub async fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %key, backend = %self.store.kind(), "Cache MISS");
                return None;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache get failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw).map_err(|e| Error::Serialization(e.to_string())) {
            Ok(value) => {
                debug!(key = %key, backend = %self.store.kind(), "Cache HIT");
                Some(value)
            }
            Err(e) => {
                warn!(
                    key = %key,
                    error = %e,
                    "Cached payload could not be deserialized, treating as miss"
                );
                None
            }
        }
    }

    /// Store `value` under `key` for `ttl` (default [`TtlSecs::DEFAULT`]).
    ///
    /// Overwriting re-arms the expiration window. A non-positive TTL expires
    /// the key immediately.
    pub async fn set<T>(&self, key: &str, value: &T, ttl: Option<TtlSecs>) -> bool
    where
        T: Serialize + ?Sized,
    {
        let ttl = ttl.unwrap_or_default();
        let Some(duration) = ttl.as_duration() else {
            debug!(key = %key, ttl_seconds = ttl.0, "Non-positive TTL, expiring key immediately");
            return self.delete(key).await;
        };

        let serialized =
            serde_json::to_string(value).map_err(|e| Error::Serialization(e.to_string()));
        let payload = match serialized {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache value could not be serialized");
                return false;
            }
        };

        match self.store.set(key, payload, duration).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache set failed");
                false
            }
        }
    }

    /// Remove `key`. Removing an absent key succeeds.
    pub async fn delete(&self, key: &str) -> bool {
        match self.store.delete(key).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache delete failed");
                false
            }
        }
    }

    /// Remove every entry the backend can reach.
    ///
    /// On the distributed backend this clears the *whole* remote store, not a
    /// namespace. Reserve it for administrative and test use.
    pub async fn flush(&self) -> bool {
        warn!(backend = %self.store.kind(), "Flushing cache");
        match self.store.flush().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Cache flush failed");
                false
            }
        }
    }

    pub async fn health_check(&self) -> bool {
        match self.store.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!(error = %e, "Cache health check failed");
                false
            }
        }
    }

    /// Stop background work owned by the backend. The service stays usable:
    /// reads still hide expired values, and the local store drops expired
    /// entries on the next write instead of in the background.
    pub async fn shutdown(&self) {
        info!(backend = %self.store.kind(), "Shutting down cache backend");
        self.store.shutdown().await;
    }

    /// See [`keys::generate_key`].
    pub fn generate_key<I>(parts: I) -> String
    where
        I: IntoIterator,
        I::Item: Display,
    {
        keys::generate_key(parts)
    }

    pub fn backend(&self) -> BackendKind {
        self.store.kind()
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.kind().name()
    }

    pub fn is_distributed(&self) -> bool {
        self.store.kind().is_distributed()
    }
}

impl Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("backend", &self.store.kind())
            .finish()
    }
}
