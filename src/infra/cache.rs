//! Redis cache implementation.
//!
//! Holds a denormalized projection of user records keyed by email, in
//! front of the authoritative SQL store. Entries may be stale or absent;
//! absence never means the user does not exist.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};
use serde::{Deserialize, Serialize};

use crate::config::{Config, CACHE_PREFIX_USER};
use crate::domain::User;
use crate::errors::{AppError, AppResult};

#[cfg(test)]
use mockall::automock;

/// Read/write access to the cached user projection.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserCache: Send + Sync {
    /// Look up a cached user. `Ok(None)` is a miss, not an error.
    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Store a user projection under its email key.
    async fn save_user_by_email(&self, user: &User) -> AppResult<()>;

    /// Round-trip connectivity check.
    async fn ping(&self) -> AppResult<()>;
}

/// Redis-backed cache with a multiplexed connection manager.
#[derive(Clone)]
pub struct Cache {
    connection: ConnectionManager,
    ttl_seconds: Option<u64>,
}

impl Cache {
    /// Create a cache instance and connect to Redis.
    ///
    /// # Panics
    /// Panics if the Redis connection fails.
    pub async fn connect(config: &Config) -> Self {
        Self::try_connect(config)
            .await
            .expect("Failed to connect to Redis")
    }

    /// Try to connect to Redis, returning an error instead of panicking.
    pub async fn try_connect(config: &Config) -> Result<Self, RedisError> {
        let client = Client::open(config.redis_url.as_str())?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!("Redis cache connected");

        Ok(Self {
            connection,
            ttl_seconds: config.cache_ttl_seconds,
        })
    }
}

#[async_trait]
impl UserCache for Cache {
    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let mut conn = self.connection.clone();

        let value: Option<String> = conn.get(user_key(email)).await.map_err(AppError::Cache)?;

        match value {
            Some(json) => {
                let entry: CachedUser = serde_json::from_str(&json).map_err(|e| {
                    AppError::internal(format!("cache deserialization error: {e}"))
                })?;
                Ok(Some(entry.into_user(email)))
            }
            None => Ok(None),
        }
    }

    async fn save_user_by_email(&self, user: &User) -> AppResult<()> {
        let mut conn = self.connection.clone();

        let json = serde_json::to_string(&CachedUser::from(user)).map_err(|e| {
            AppError::internal(format!("cache serialization error: {e}"))
        })?;

        let key = user_key(&user.email);
        match self.ttl_seconds {
            Some(ttl) => {
                let _: () = conn
                    .set_ex(key, json, ttl)
                    .await
                    .map_err(AppError::Cache)?;
            }
            None => {
                let _: () = conn
                    .set(key, json)
                    .await
                    .map_err(AppError::Cache)?;
            }
        }

        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(AppError::Cache)?;
        Ok(())
    }
}

fn user_key(email: &str) -> String {
    format!("{CACHE_PREFIX_USER}{email}")
}

/// Cached projection of a user record. The email is the lookup key and is
/// not stored in the value.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
struct CachedUser {
    id: i64,
    name: String,
    password_hash: Vec<u8>,
    salt: Vec<u8>,
}

impl From<&User> for CachedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            password_hash: user.password_hash.clone(),
            salt: user.salt.clone(),
        }
    }
}

impl CachedUser {
    fn into_user(self, email: &str) -> User {
        User {
            id: self.id,
            name: self.name,
            email: email.to_string(),
            salt: self.salt,
            password_hash: self.password_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 42,
            name: "ann".to_string(),
            email: "ann@x.com".to_string(),
            salt: vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10],
            password_hash: vec![0xAA; 32],
        }
    }

    #[test]
    fn user_keys_are_prefixed_by_email() {
        assert_eq!(user_key("ann@x.com"), "user:ann@x.com");
    }

    #[test]
    fn cached_projection_round_trips() {
        let user = sample_user();

        let json = serde_json::to_string(&CachedUser::from(&user)).unwrap();
        let entry: CachedUser = serde_json::from_str(&json).unwrap();
        let restored = entry.into_user(&user.email);

        assert_eq!(restored, user);
    }

    #[test]
    fn projection_does_not_store_the_email() {
        let json = serde_json::to_string(&CachedUser::from(&sample_user())).unwrap();
        assert!(!json.contains("ann@x.com"));
    }
}
