pub mod file;
pub mod redis;
pub mod store;

use std::sync::Arc;

pub use file::FileStore;
pub use self::redis::{create_redis_client, RedisStore};
pub use store::{load_or_default, save_best_effort, KeyValueStore, MemoryStore, StoreKey};

use crate::config::{Config, StorageBackend};

/// Opens the backend selected by `STORAGE_BACKEND`
pub fn open_store(config: &Config) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config.storage_backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => Arc::new(FileStore::open(&config.storage_path)?),
        StorageBackend::Redis => Arc::new(RedisStore::new(create_redis_client(&config.redis_url)?)),
    };

    tracing::info!(backend = ?config.storage_backend, "Opened history store");
    Ok(store)
}
