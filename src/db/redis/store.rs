use std::sync::Mutex;
use std::time::Duration;

use redis::{Client, Commands, Connection, RedisResult};

use crate::db::store::{KeyValueStore, StoreKey};
use crate::error::{AppError, AppResult};

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const IO_TIMEOUT: Duration = Duration::from_millis(500);

/// Creates a Redis client for the shared store
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Keeps the records in Redis under an optional namespace
///
/// One connection is reused across calls and reopened after any failure.
/// Connecting, reading and writing are bounded by short timeouts, so an
/// unreachable server degrades to the storage fallbacks quickly.
pub struct RedisStore {
    redis_client: Client,
    namespace: String,
    connection: Mutex<Option<Connection>>,
}

impl RedisStore {
    pub fn new(redis_client: Client) -> Self {
        Self::with_namespace(redis_client, "")
    }

    pub fn with_namespace(redis_client: Client, namespace: impl Into<String>) -> Self {
        Self {
            redis_client,
            namespace: namespace.into(),
            connection: Mutex::new(None),
        }
    }

    fn redis_key(&self, key: &StoreKey) -> String {
        if self.namespace.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.namespace, key)
        }
    }

    fn connect(&self) -> RedisResult<Connection> {
        let conn = self.redis_client.get_connection_with_timeout(CONNECT_TIMEOUT)?;
        conn.set_read_timeout(Some(IO_TIMEOUT))?;
        conn.set_write_timeout(Some(IO_TIMEOUT))?;
        Ok(conn)
    }

    fn with_connection<T>(&self, op: impl FnOnce(&mut Connection) -> RedisResult<T>) -> AppResult<T> {
        let mut slot = self
            .connection
            .lock()
            .map_err(|_| AppError::Storage("Redis connection lock poisoned".to_string()))?;

        let conn = match &mut *slot {
            Some(conn) => conn,
            empty => empty.insert(self.connect()?),
        };

        let result = op(conn);
        if result.is_err() {
            *slot = None;
        }
        Ok(result?)
    }
}

impl KeyValueStore for RedisStore {
    fn get(&self, key: &StoreKey) -> AppResult<Option<String>> {
        let redis_key = self.redis_key(key);
        self.with_connection(|conn| conn.get(&redis_key))
    }

    fn set(&self, key: &StoreKey, value: &str) -> AppResult<()> {
        let redis_key = self.redis_key(key);
        self.with_connection(|conn| conn.set::<_, _, ()>(&redis_key, value))?;
        tracing::debug!(key = %key, bytes = value.len(), "Stored record in Redis");
        Ok(())
    }
}
