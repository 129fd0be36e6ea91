// Shared infrastructure: configuration, logging, key-value storage and the
// response cache.

pub mod cache;
pub mod config;
pub mod db;
pub mod logging;
pub mod store;

pub use cache::{daily_key, CacheEntry, ResponseCache, DEFAULT_TTL};
pub use config::{load_config, load_config_from, Config, ConfigError};
pub use db::Database;
pub use store::{KeyValueStore, MemoryStore, StoreError};
