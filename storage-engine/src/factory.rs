use crate::local_store::LocalStore;
use crate::redis_store::RedisStore;
use async_trait::async_trait;
use shared::Result;
use shared::config::{ReconnectPolicy, RedisSettings};
use std::sync::Arc;
use trestle::{CacheStore, StorageFactory};

/// Builds the stores shipped with this crate
#[derive(Clone, Copy, Debug, Default)]
pub struct EngineFactory;

impl EngineFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StorageFactory for EngineFactory {
    fn create_local(&self) -> Arc<dyn CacheStore> {
        Arc::new(LocalStore::new())
    }

    async fn create_distributed(
        &self,
        settings: &RedisSettings,
        reconnect: ReconnectPolicy,
    ) -> Result<Arc<dyn CacheStore>> {
        let store = RedisStore::connect(settings, reconnect).await?;
        Ok(Arc::new(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Error;
    use trestle::BackendKind;

    #[tokio::test]
    async fn test_create_local() {
        let store = EngineFactory::new().create_local();
        assert_eq!(store.kind(), BackendKind::Local);
        assert!(store.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_create_distributed_rejects_malformed_settings() {
        let settings = RedisSettings::new("", 6379);
        let result = EngineFactory::new()
            .create_distributed(&settings, ReconnectPolicy::default())
            .await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
