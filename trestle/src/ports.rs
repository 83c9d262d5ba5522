#![deny(clippy::all)]

use crate::domain::BackendKind;
use async_trait::async_trait;
use shared::Result;
use shared::config::{ReconnectPolicy, RedisSettings};
use std::sync::Arc;
use std::time::Duration;

// Ports are the pluggable extension points for underlying cache implementations

/// Port for creating cache stores
///
/// The facade decides *which* store to build; the factory knows *how*.
#[async_trait]
pub trait StorageFactory: Send + Sync {
    /// Create an in-process store. Must be called inside a tokio runtime,
    /// since the store spawns its expiry task.
    fn create_local(&self) -> Arc<dyn CacheStore>;

    /// Create a store backed by a remote Redis-protocol server
    async fn create_distributed(
        &self,
        settings: &RedisSettings,
        reconnect: ReconnectPolicy,
    ) -> Result<Arc<dyn CacheStore>>;
}

/// Port for cache operations on serialized payloads
///
/// `ttl` is always positive; the facade handles "expire immediately".
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
    /// Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
    /// Remove every entry the backend can reach.
    async fn flush(&self) -> Result<()>;
    async fn health_check(&self) -> Result<bool>;

    /// Release background work (sweepers, reconnect loops).
    async fn shutdown(&self) {}

    fn kind(&self) -> BackendKind;
}
