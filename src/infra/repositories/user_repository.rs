//! User repository contract.
//!
//! The concrete implementation lives with the unit of work, because every
//! operation runs inside the unit of work's transaction. Services depend
//! on this trait only.

use async_trait::async_trait;

use crate::domain::{User, UserId};
use crate::errors::AppResult;

#[cfg(test)]
use mockall::automock;

/// Transactional user data access.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user and return it with its store-assigned identifier.
    /// A unique-email violation surfaces as `AppError::DuplicateEmail`.
    async fn add_user(&self, user: User) -> AppResult<User>;

    /// Load a user by email. Missing rows surface as `AppError::UserNotFound`.
    async fn get_by_email(&self, email: &str) -> AppResult<User>;

    /// Delete a user row by identifier.
    async fn delete_by_id(&self, id: UserId) -> AppResult<()>;
}
