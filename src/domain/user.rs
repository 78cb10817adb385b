//! User domain entity and related types.

use serde::Serialize;

use crate::domain::Password;

/// Store-assigned user identifier. Zero until the record is persisted.
pub type UserId = i64;

/// User domain entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub salt: Vec<u8>,
    pub password_hash: Vec<u8>,
}

impl User {
    /// Create a not-yet-persisted user from a hashed password.
    /// The store assigns the identifier on insert.
    pub fn new(name: String, email: String, password: Password) -> Self {
        let (password_hash, salt) = password.into_parts();
        Self {
            id: 0,
            name,
            email,
            salt,
            password_hash,
        }
    }

    /// Whether the record has been persisted (store-assigned identifier).
    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }

    /// View of the stored credential material.
    pub fn password(&self) -> Password {
        Password::from_parts(self.password_hash.clone(), self.salt.clone())
    }
}

/// User response (safe to return to clients; carries no credential material)
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}
