//! Correlation cache on Redis
//!
//! Bridges an outbound verification request to the provider's later
//! asynchronous callback: session id → internal user id, with a bounded
//! lifetime. The cache is a best-effort optimization; the provider echoes
//! the internal user id back in `vendor_data`, which stays the
//! authoritative correlation key when an entry is missing or Redis is down.

use std::time::Duration;

use chrono::Utc;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

const REDIS_TIMEOUT: Duration = Duration::from_secs(3);

/// Session entries outlive the provider's verification flow
pub const SESSION_TTL_SECS: u64 = 60 * 60;
/// Phone codes are short-lived by design
pub const PHONE_CODE_TTL_SECS: u64 = 5 * 60;

/// Thin wrapper around a shared Redis connection manager
#[derive(Clone)]
pub struct RedisClient {
    connection_manager: ConnectionManager,
}

impl RedisClient {
    /// Create a new Redis client with connection manager
    ///
    /// # Errors
    /// Returns an error if:
    /// - The Redis URL is invalid
    /// - Connection to Redis server fails
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let client = Client::open(url)?;
        let connection_manager = ConnectionManager::new(client).await?;

        Ok(Self { connection_manager })
    }

    /// Get a clone of the connection manager
    #[must_use]
    pub fn conn(&self) -> ConnectionManager {
        self.connection_manager.clone()
    }
}

/// A cached mapping from a provider-side identifier to the internal user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorrelationEntry {
    /// Internal user id
    pub user_id: String,
    /// Correlation id minted when the outbound request was made
    pub correlation_id: String,
    /// Epoch seconds at entry creation
    pub created_at: i64,
}

impl CorrelationEntry {
    /// Creates an entry stamped with the current time
    #[must_use]
    pub fn new(user_id: String, correlation_id: String) -> Self {
        Self {
            user_id,
            correlation_id,
            created_at: Utc::now().timestamp(),
        }
    }
}

/// Correlation cache client.
///
/// Every operation carries an explicit timeout so a slow or unreachable
/// Redis can never stall a request handler; callers treat failures as
/// non-fatal and log them.
#[derive(Clone)]
pub struct CorrelationCache {
    redis_client: RedisClient,
}

impl CorrelationCache {
    #[must_use]
    pub const fn new(redis_client: RedisClient) -> Self {
        Self { redis_client }
    }

    /// Connects to Redis and wraps the connection in a cache client
    ///
    /// # Errors
    /// Returns an error if the connection cannot be established
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        Ok(Self::new(RedisClient::new(url).await?))
    }

    fn session_key(session_id: &str) -> String {
        format!("verification:session:{session_id}")
    }

    fn phone_key(request_id: &str) -> String {
        format!("verification:phone:{request_id}")
    }

    /// Stores the session → user mapping with the session TTL
    ///
    /// # Errors
    /// Returns an error if Redis times out or fails
    pub async fn store_session(
        &self,
        session_id: &str,
        entry: &CorrelationEntry,
    ) -> anyhow::Result<()> {
        self.set_with_ttl(&Self::session_key(session_id), entry, SESSION_TTL_SECS)
            .await
    }

    /// Stores the phone request → user mapping with the phone-code TTL
    ///
    /// # Errors
    /// Returns an error if Redis times out or fails
    pub async fn store_phone_request(
        &self,
        request_id: &str,
        entry: &CorrelationEntry,
    ) -> anyhow::Result<()> {
        self.set_with_ttl(&Self::phone_key(request_id), entry, PHONE_CODE_TTL_SECS)
            .await
    }

    /// Looks up the entry for a session id
    ///
    /// # Errors
    /// Returns an error if Redis times out or fails
    pub async fn get_session(&self, session_id: &str) -> anyhow::Result<Option<CorrelationEntry>> {
        let mut conn = self.redis_client.conn();
        let raw: Option<String> = timeout(
            REDIS_TIMEOUT,
            conn.get(Self::session_key(session_id)),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis timeout"))?
        .map_err(|e| anyhow::anyhow!("Redis error: {e}"))?;

        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(|e| anyhow::anyhow!("Corrupt correlation entry: {e}"))
    }

    /// Deletes the entry for a session id
    ///
    /// # Errors
    /// Returns an error if Redis times out or fails
    pub async fn delete_session(&self, session_id: &str) -> anyhow::Result<()> {
        let mut conn = self.redis_client.conn();
        timeout(
            REDIS_TIMEOUT,
            conn.del::<_, ()>(Self::session_key(session_id)),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis timeout"))?
        .map_err(|e| anyhow::anyhow!("Redis error: {e}"))?;
        Ok(())
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        entry: &CorrelationEntry,
        ttl_secs: u64,
    ) -> anyhow::Result<()> {
        let json = serde_json::to_string(entry)?;
        let mut conn = self.redis_client.conn();
        timeout(REDIS_TIMEOUT, conn.set_ex::<_, _, ()>(key, json, ttl_secs))
            .await
            .map_err(|_| anyhow::anyhow!("Redis timeout"))?
            .map_err(|e| anyhow::anyhow!("Redis error: {e}"))?;
        Ok(())
    }
}
