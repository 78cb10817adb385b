//! API middleware.

mod auth;
mod scope;

pub use auth::CurrentUser;
pub use scope::scope_middleware;
