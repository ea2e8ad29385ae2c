//! Key-value cache capability backed by Redis.
//!
//! All bot state that survives a restart lives here: the operator override
//! flag and the per-user conversation histories. Everything else is
//! recomputed per message.

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::fmt;

/// Legacy activation flag kept for compatibility with older deployments.
/// Initialized to "1" when absent, never read.
pub const LEGACY_ACTIVE_KEY: &str = "chatbot:active";

/// Cache unavailability or a backend-level failure.
///
/// Read paths treat this as "no data" and fall back to safe defaults; it
/// must never take down message handling.
#[derive(Debug)]
pub enum StoreError {
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(e) => write!(f, "cache backend error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        Self::Backend(e.to_string())
    }
}

/// The key-value operations the bot needs from its cache.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
    /// Set with a time-to-live in seconds.
    fn set_ex(
        &self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
    fn del(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Redis-backed store. Cheap to clone; the connection manager multiplexes
/// and reconnects internally.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Open a connection to the given Redis URI. Fails fast when the cache
    /// is unreachable, which is fatal at startup.
    pub async fn connect(uri: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(uri)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }

    /// Initialize the legacy `chatbot:active` flag if it is absent.
    pub async fn init_legacy_flag(&self) -> Result<(), StoreError> {
        if self.get(LEGACY_ACTIVE_KEY).await?.is_none() {
            self.set(LEGACY_ACTIVE_KEY, "1").await?;
        }
        Ok(())
    }
}

impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}
