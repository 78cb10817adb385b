//! User registration and authentication API.
//!
//! Per inbound request the service builds exactly one unit of work and
//! one user service, coordinates the transaction's isolation level and
//! commit/rollback boundary, and resolves credentials through a
//! cache-aside read path with salted Argon2id verification.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Core business entities and logic
//! - **services**: Application use cases and the request scope
//! - **infra**: Infrastructure concerns (database, cache, unit of work)
//! - **api**: HTTP handlers, middleware, and routes
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Start the server
//! cargo run -- serve
//!
//! # Run migrations
//! cargo run -- migrate up
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod services;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use domain::{Password, User, UserId};
pub use errors::{AppError, AppResult};
pub use infra::{Cache, TxIsolation};
