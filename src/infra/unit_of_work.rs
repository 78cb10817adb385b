//! Unit of Work pattern implementation.
//!
//! SOLID (SRP): Manages transaction lifecycle and repository access.
//! DDD: Coordinates repository operations atomically.
//!
//! One unit of work exists per request scope. It owns at most one database
//! transaction, begun lazily at the requested isolation level on the first
//! repository operation. `save_changes` commits, `rollback_changes` rolls
//! back, and `close` rolls back anything still in flight before the pooled
//! connection goes back to the pool. Whatever commit or rollback return,
//! the transaction slot is cleared, so the unit of work is never left in an
//! ambiguous state.

use async_trait::async_trait;
use sea_orm::{
    DatabaseConnection, DatabaseTransaction, DbErr, IsolationLevel, SqlErr, TransactionTrait,
};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use super::repositories::UserRepository;
use crate::domain::{User, UserId};
use crate::errors::{AppError, AppResult};

/// Transaction isolation level requested for a unit of work.
///
/// Routes pick a level per request; everything else defaults to
/// read-committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxIsolation {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl From<TxIsolation> for IsolationLevel {
    fn from(isolation: TxIsolation) -> Self {
        match isolation {
            TxIsolation::ReadUncommitted => IsolationLevel::ReadUncommitted,
            TxIsolation::ReadCommitted => IsolationLevel::ReadCommitted,
            TxIsolation::RepeatableRead => IsolationLevel::RepeatableRead,
            TxIsolation::Serializable => IsolationLevel::Serializable,
        }
    }
}

/// Unit of Work contract for dependency injection.
///
/// Repository operations issued through `users()` all observe the same
/// transaction, so a write followed by a read sees the uncommitted write.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Get the user repository bound to this unit of work.
    fn users(&self) -> Arc<dyn UserRepository>;

    /// Commit the active transaction. No-op when none was begun.
    async fn save_changes(&self) -> AppResult<()>;

    /// Roll back the active transaction. No-op when none was begun.
    async fn rollback_changes(&self) -> AppResult<()>;

    /// Roll back anything still active and release the connection.
    /// Idempotent; valid from any state.
    async fn close(&self) -> AppResult<()>;
}

/// Produces one unit of work per request scope.
///
/// The pooled connection is drawn when the unit of work begins its
/// transaction, never shared across units of work.
#[derive(Clone)]
pub struct UnitOfWorkFactory {
    db: DatabaseConnection,
}

impl UnitOfWorkFactory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a unit of work at the default (read-committed) level.
    pub fn create(&self) -> SqlUnitOfWork {
        self.create_with_isolation_level(TxIsolation::default())
    }

    /// Create a unit of work at the requested isolation level.
    pub fn create_with_isolation_level(&self, isolation: TxIsolation) -> SqlUnitOfWork {
        SqlUnitOfWork::new(self.db.clone(), isolation)
    }
}

/// Shared state between a unit of work and its repository view.
struct UowInner {
    db: DatabaseConnection,
    isolation: TxIsolation,
    txn: Mutex<Option<DatabaseTransaction>>,
}

impl UowInner {
    /// Get the active transaction, beginning one on first use.
    async fn transaction<'g>(
        &self,
        guard: &'g mut MutexGuard<'_, Option<DatabaseTransaction>>,
    ) -> AppResult<&'g DatabaseTransaction> {
        if guard.is_none() {
            let txn = self
                .db
                .begin_with_config(Some(self.isolation.into()), None)
                .await
                .map_err(begin_error)?;
            **guard = Some(txn);
        }

        (**guard)
            .as_ref()
            .ok_or_else(|| AppError::internal("transaction slot empty after begin"))
    }
}

impl Drop for UowInner {
    fn drop(&mut self) {
        // The owning request future was dropped before close ran. Hand the
        // rollback to the runtime so cancellation cannot suppress cleanup.
        if let Some(txn) = self.txn.get_mut().take() {
            tokio::spawn(async move {
                if let Err(err) = txn.rollback().await {
                    tracing::warn!(error = %err, "failed to roll back abandoned transaction");
                }
            });
        }
    }
}

/// Concrete unit of work over a SQL store.
pub struct SqlUnitOfWork {
    inner: Arc<UowInner>,
    users: Arc<TxUserRepository>,
}

impl SqlUnitOfWork {
    fn new(db: DatabaseConnection, isolation: TxIsolation) -> Self {
        let inner = Arc::new(UowInner {
            db,
            isolation,
            txn: Mutex::new(None),
        });
        let users = Arc::new(TxUserRepository {
            uow: inner.clone(),
        });

        Self { inner, users }
    }

    pub fn isolation_level(&self) -> TxIsolation {
        self.inner.isolation
    }
}

#[async_trait]
impl UnitOfWork for SqlUnitOfWork {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.users.clone()
    }

    async fn save_changes(&self) -> AppResult<()> {
        let txn = self.inner.txn.lock().await.take();
        match txn {
            Some(txn) => txn.commit().await.map_err(AppError::Commit),
            None => Ok(()),
        }
    }

    async fn rollback_changes(&self) -> AppResult<()> {
        let txn = self.inner.txn.lock().await.take();
        match txn {
            Some(txn) => txn.rollback().await.map_err(AppError::Rollback),
            None => Ok(()),
        }
    }

    async fn close(&self) -> AppResult<()> {
        if let Some(txn) = self.inner.txn.lock().await.take() {
            if let Err(err) = txn.rollback().await {
                tracing::warn!(error = %err, "failed to roll back transaction while closing unit of work");
            }
        }

        Ok(())
    }
}

/// Transaction-bound user repository.
///
/// Every operation runs inside its unit of work's transaction, beginning
/// it lazily on first use.
pub struct TxUserRepository {
    uow: Arc<UowInner>,
}

#[async_trait]
impl UserRepository for TxUserRepository {
    async fn add_user(&self, user: User) -> AppResult<User> {
        use super::repositories::entities::user::ActiveModel;
        use sea_orm::{ActiveModelTrait, Set};

        let mut guard = self.uow.txn.lock().await;
        let txn = self.uow.transaction(&mut guard).await?;

        let active = ActiveModel {
            name: Set(user.name),
            email: Set(user.email),
            password_hash: Set(user.password_hash),
            salt: Set(user.salt),
            ..Default::default()
        };

        let model = active.insert(txn).await.map_err(insert_error)?;
        Ok(model.into())
    }

    async fn get_by_email(&self, email: &str) -> AppResult<User> {
        use super::repositories::entities::user::{Column, Entity as UserEntity};
        use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

        let mut guard = self.uow.txn.lock().await;
        let txn = self.uow.transaction(&mut guard).await?;

        let model = UserEntity::find()
            .filter(Column::Email.eq(email))
            .one(txn)
            .await
            .map_err(AppError::Database)?;

        model.map(Into::into).ok_or(AppError::UserNotFound)
    }

    async fn delete_by_id(&self, id: UserId) -> AppResult<()> {
        use super::repositories::entities::user::Entity as UserEntity;
        use sea_orm::EntityTrait;

        let mut guard = self.uow.txn.lock().await;
        let txn = self.uow.transaction(&mut guard).await?;

        let result = UserEntity::delete_by_id(id)
            .exec(txn)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected == 0 {
            return Err(AppError::UserNotFound);
        }

        Ok(())
    }
}

/// Classify a transaction-begin failure: pool exhaustion and acquire
/// timeouts are acquisition errors, anything else failed the begin itself.
fn begin_error(err: DbErr) -> AppError {
    if matches!(err, DbErr::ConnectionAcquire(_)) {
        AppError::ConnectionAcquisition(err)
    } else {
        AppError::TransactionBegin(err)
    }
}

/// Classify an insert failure, translating the store's unique-constraint
/// violation on the email column.
fn insert_error(err: DbErr) -> AppError {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        AppError::DuplicateEmail(err)
    } else {
        AppError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::ConnAcquireErr;

    fn factory() -> UnitOfWorkFactory {
        UnitOfWorkFactory::new(DatabaseConnection::default())
    }

    #[test]
    fn factory_applies_requested_isolation() {
        assert_eq!(factory().create().isolation_level(), TxIsolation::ReadCommitted);
        assert_eq!(
            factory()
                .create_with_isolation_level(TxIsolation::Serializable)
                .isolation_level(),
            TxIsolation::Serializable
        );
    }

    #[test]
    fn isolation_maps_onto_store_levels() {
        assert!(matches!(
            IsolationLevel::from(TxIsolation::ReadCommitted),
            IsolationLevel::ReadCommitted
        ));
        assert!(matches!(
            IsolationLevel::from(TxIsolation::Serializable),
            IsolationLevel::Serializable
        ));
    }

    #[tokio::test]
    async fn save_changes_without_transaction_is_noop() {
        let uow = factory().create();
        assert!(uow.save_changes().await.is_ok());
    }

    #[tokio::test]
    async fn rollback_changes_without_transaction_is_noop() {
        let uow = factory().create();
        assert!(uow.rollback_changes().await.is_ok());
    }

    #[tokio::test]
    async fn close_is_idempotent_without_transaction() {
        let uow = factory().create();
        assert!(uow.close().await.is_ok());
        assert!(uow.close().await.is_ok());
    }

    #[test]
    fn acquire_failures_classify_as_connection_acquisition() {
        let err = begin_error(DbErr::ConnectionAcquire(ConnAcquireErr::Timeout));
        assert!(matches!(err, AppError::ConnectionAcquisition(_)));

        let err = begin_error(DbErr::Custom("boom".into()));
        assert!(matches!(err, AppError::TransactionBegin(_)));
    }

    #[test]
    fn plain_insert_failures_stay_database_errors() {
        let err = insert_error(DbErr::Custom("boom".into()));
        assert!(matches!(err, AppError::Database(_)));
    }
}
