//! Concrete cache stores: [`LocalStore`] for single-instance deployments and
//! [`RedisStore`] for shared, multi-instance ones.

pub mod factory;
pub mod local_store;
pub mod redis_store;

pub use factory::EngineFactory;
pub use local_store::LocalStore;
pub use redis_store::RedisStore;
