use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Mutex;

use crate::error::{AppError, AppResult};

/// Named records kept in client-local storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    UserHistory,
    Interactions,
    KnownItems,
}

impl Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKey::UserHistory => write!(f, "blog_user_history"),
            StoreKey::Interactions => write!(f, "blog_interactions"),
            StoreKey::KnownItems => write!(f, "blog_knn_items"),
        }
    }
}

/// Best-effort string store behind the history and item caches
///
/// Backends report failures; callers go through [`load_or_default`] and
/// [`save_best_effort`], which swallow them.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &StoreKey) -> AppResult<Option<String>>;

    fn set(&self, key: &StoreKey, value: &str) -> AppResult<()>;
}

/// Reads and parses a record, falling back to `T::default()` on any failure
pub fn load_or_default<T>(store: &dyn KeyValueStore, key: &StoreKey) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Could not read from storage");
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Discarding malformed stored record");
            T::default()
        }
    }
}

/// Serializes and writes a record, logging instead of failing
pub fn save_best_effort<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &StoreKey, value: &T) {
    let json = match serde_json::to_string(value) {
        Ok(j) => j,
        Err(e) => {
            tracing::error!(key = %key, error = %e, "Storage serialization error");
            return;
        }
    };

    if let Err(e) = store.set(key, &json) {
        tracing::warn!(key = %key, error = %e, "Could not save to storage");
    }
}

/// Process-local store, lost on restart
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &StoreKey) -> AppResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| AppError::Storage("memory store lock poisoned".to_string()))?;
        Ok(entries.get(&key.to_string()).cloned())
    }

    fn set(&self, key: &StoreKey, value: &str) -> AppResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::Storage("memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
