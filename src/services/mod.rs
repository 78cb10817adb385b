//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain logic and infrastructure to fulfill
//! application use cases, depending on abstractions (traits) for
//! dependency inversion. All data access goes through the Unit of Work.

mod scope;
mod user_service;

pub use scope::{RequestScope, ScopeFactory};
pub use user_service::{UserManager, UserService};
