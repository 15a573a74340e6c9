//! Session tokens: opaque random strings bound to a user id

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::RngCore;
use redis::{AsyncCommands, Client};
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};

/// Number of random bytes behind a session token
const TOKEN_BYTES: usize = 32;

/// Where live sessions are kept
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, token: &str, user_id: i32, ttl: Duration) -> AppResult<()>;

    async fn get(&self, token: &str) -> AppResult<Option<i32>>;

    /// False if the token was not live
    async fn remove(&self, token: &str) -> AppResult<bool>;
}

/// Process-local session store
#[derive(Debug, Default, Clone)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, (i32, Instant)>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, token: &str, user_id: i32, ttl: Duration) -> AppResult<()> {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        sessions.retain(|_, (_, expires)| *expires > now);
        let expires = now
            .checked_add(ttl)
            .ok_or_else(|| AppError::Session("session lifetime out of range".to_string()))?;
        sessions.insert(token.to_string(), (user_id, expires));
        Ok(())
    }

    async fn get(&self, token: &str) -> AppResult<Option<i32>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(token)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(user_id, _)| *user_id))
    }

    async fn remove(&self, token: &str) -> AppResult<bool> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions
            .remove(token)
            .map_or(false, |(_, expires)| expires > Instant::now()))
    }
}

/// Redis-backed session store, sessions expire through key TTLs
#[derive(Clone)]
pub struct RedisSessionStore {
    client: Client,
}

impl RedisSessionStore {
    /// Create a new Redis session store
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Session(format!("Failed to create Redis client: {}", e)))?;

        // Test connection
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Session(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Session(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client })
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Session(format!("Failed to get Redis connection: {}", e)))
    }

    fn key(token: &str) -> String {
        format!("session:{}", token)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn insert(&self, token: &str, user_id: i32, ttl: Duration) -> AppResult<()> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(Self::key(token), user_id, ttl.as_secs().max(1))
            .await
            .map_err(|e| AppError::Session(format!("Failed to store session in Redis: {}", e)))
    }

    async fn get(&self, token: &str) -> AppResult<Option<i32>> {
        let mut conn = self.connection().await?;
        conn.get(Self::key(token))
            .await
            .map_err(|e| AppError::Session(format!("Failed to read session from Redis: {}", e)))
    }

    async fn remove(&self, token: &str) -> AppResult<bool> {
        let mut conn = self.connection().await?;
        let removed: i64 = conn
            .del(Self::key(token))
            .await
            .map_err(|e| AppError::Session(format!("Failed to delete session from Redis: {}", e)))?;
        Ok(removed > 0)
    }
}

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Bind a fresh token to `user_id`.
    ///
    /// `current` is the token the caller already presented, if any; a live
    /// one means the caller is already logged in.
    pub async fn begin_session(&self, current: Option<&str>, user_id: i32) -> AppResult<String> {
        if self.current_identity(current).await?.is_some() {
            return Err(AppError::AlreadyActive);
        }

        let token = generate_token();
        self.store.insert(&token, user_id, self.ttl).await?;
        Ok(token)
    }

    pub async fn end_session(&self, token: Option<&str>) -> AppResult<()> {
        let token = token.ok_or(AppError::NoActiveSession)?;
        if !self.store.remove(token).await? {
            return Err(AppError::NoActiveSession);
        }
        Ok(())
    }

    /// The user id bound to `token`, if the session is live
    pub async fn current_identity(&self, token: Option<&str>) -> AppResult<Option<i32>> {
        match token {
            Some(token) if !token.is_empty() => self.store.get(token).await,
            _ => Ok(None),
        }
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> SessionService {
        SessionService::new(Arc::new(MemorySessionStore::new()), Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let sessions = service();
        let token = sessions.begin_session(None, 7).await.unwrap();
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert_eq!(sessions.current_identity(Some(&token)).await.unwrap(), Some(7));

        sessions.end_session(Some(&token)).await.unwrap();
        assert_eq!(sessions.current_identity(Some(&token)).await.unwrap(), None);
        assert!(matches!(
            sessions.end_session(Some(&token)).await,
            Err(AppError::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn test_already_active() {
        let sessions = service();
        let token = sessions.begin_session(None, 1).await.unwrap();
        assert!(matches!(
            sessions.begin_session(Some(&token), 1).await,
            Err(AppError::AlreadyActive)
        ));
        // a stale token does not block a new login
        assert!(sessions.begin_session(Some("stale"), 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let sessions = service();
        let a = sessions.begin_session(None, 1).await.unwrap();
        let b = sessions.begin_session(None, 1).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_end_without_token() {
        let sessions = service();
        assert!(matches!(sessions.end_session(None).await, Err(AppError::NoActiveSession)));
    }

    #[tokio::test]
    async fn test_unrepresentable_lifetime_is_an_error() {
        let sessions = SessionService::new(Arc::new(MemorySessionStore::new()), Duration::MAX);
        assert!(matches!(
            sessions.begin_session(None, 1).await,
            Err(AppError::Session(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_session_is_gone() {
        let sessions =
            SessionService::new(Arc::new(MemorySessionStore::new()), Duration::from_millis(10));
        let token = sessions.begin_session(None, 3).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(sessions.current_identity(Some(&token)).await.unwrap(), None);
    }
}
