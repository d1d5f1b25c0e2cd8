use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::domain::{ReadinessScoreResult, SessionId};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Backend(String),
    #[error("cached payload could not be decoded: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// String key-value store with per-entry expiry (Redis or similar).
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Process-local cache used by the demo service and tests.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KeyValueCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Read-through score cache. Every backend or decoding failure is logged and
/// absorbed; callers never fail because the cache is unavailable.
pub struct ScoreCacheGateway<C> {
    backend: Arc<C>,
    ttl: Duration,
}

impl<C> ScoreCacheGateway<C>
where
    C: KeyValueCache,
{
    pub fn new(backend: Arc<C>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    pub fn key(session_id: &SessionId) -> String {
        format!("score:{session_id}")
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, session_id: &SessionId) -> Option<ReadinessScoreResult> {
        let key = Self::key(session_id);
        let payload = match self.backend.get(&key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!(session_id = %session_id, "score cache miss");
                return None;
            }
            Err(error) => {
                warn!(session_id = %session_id, %error, "failed to read cached score");
                return None;
            }
        };

        match serde_json::from_str(&payload).map_err(CacheError::from) {
            Ok(result) => Some(result),
            Err(error) => {
                warn!(session_id = %session_id, %error, "discarding unreadable cached score");
                None
            }
        }
    }

    pub async fn put(&self, result: &ReadinessScoreResult) {
        let payload = match serde_json::to_string(result) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(session_id = %result.session_id, %error, "failed to encode score for cache");
                return;
            }
        };

        let key = Self::key(&result.session_id);
        if let Err(error) = self.backend.set(&key, payload, self.ttl).await {
            warn!(session_id = %result.session_id, %error, "failed to cache score");
        }
    }

    pub async fn invalidate(&self, session_id: &SessionId) {
        let key = Self::key(session_id);
        if let Err(error) = self.backend.delete(&key).await {
            warn!(session_id = %session_id, %error, "failed to invalidate score cache");
        }
    }
}
