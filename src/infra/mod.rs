//! Infrastructure layer - External systems integration
//!
//! - Database connection, migrations and repositories
//! - Redis cache
//! - Unit of Work for transaction management

pub mod cache;
pub mod db;
pub mod repositories;
pub mod unit_of_work;

pub use cache::{Cache, UserCache};
pub use db::{Database, Migrator};
pub use repositories::UserRepository;
pub use unit_of_work::{SqlUnitOfWork, TxIsolation, UnitOfWork, UnitOfWorkFactory};

#[cfg(test)]
pub use cache::MockUserCache;
#[cfg(test)]
pub use repositories::MockUserRepository;
