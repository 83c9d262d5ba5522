//! Backend-agnostic cache layer.
//!
//! [`CacheService`] is the facade application code talks to. It owns exactly
//! one [`CacheStore`] chosen at construction and never lets a backend error
//! escape: failures degrade to a miss (`None`) or `false`.

pub mod domain;
pub mod keys;
pub mod ports;
pub mod service;

pub use domain::BackendKind;
pub use keys::{KEY_SEPARATOR, generate_key};
pub use ports::{CacheStore, StorageFactory};
pub use service::CacheService;
