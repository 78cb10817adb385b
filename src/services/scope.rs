//! Request scope - per-request dependency container.
//!
//! SOLID (DIP): Handlers receive their collaborators through the scope
//! instead of reaching into globals.
//!
//! A scope is created for every inbound request with the isolation level
//! the route asked for. The unit of work and the user service are built
//! lazily, at most once per scope, even when middleware and handler race
//! on first access. Closing the scope closes the unit of work, which
//! rolls back any open transaction and releases the pooled connection.

use std::sync::{Arc, OnceLock};

use super::user_service::UserManager;
use crate::errors::AppResult;
use crate::infra::{SqlUnitOfWork, TxIsolation, UnitOfWork, UnitOfWorkFactory, UserCache};

/// Builds request scopes around the shared infrastructure handles.
#[derive(Clone)]
pub struct ScopeFactory {
    uow_factory: UnitOfWorkFactory,
    cache: Arc<dyn UserCache>,
    salt_length: usize,
}

impl ScopeFactory {
    pub fn new(
        uow_factory: UnitOfWorkFactory,
        cache: Arc<dyn UserCache>,
        salt_length: usize,
    ) -> Self {
        Self {
            uow_factory,
            cache,
            salt_length,
        }
    }

    /// Create a scope at the default (read-committed) isolation level.
    pub fn create_scope(&self) -> RequestScope {
        self.create_scope_with_isolation_level(TxIsolation::default())
    }

    /// Create a scope bound to the requested isolation level.
    pub fn create_scope_with_isolation_level(&self, isolation: TxIsolation) -> RequestScope {
        RequestScope {
            factory: self.clone(),
            isolation,
            uow: OnceLock::new(),
            user_service: OnceLock::new(),
        }
    }
}

/// Container for the objects whose lifetime is bound to one request.
pub struct RequestScope {
    factory: ScopeFactory,
    isolation: TxIsolation,
    uow: OnceLock<Arc<SqlUnitOfWork>>,
    user_service: OnceLock<Arc<UserManager<SqlUnitOfWork>>>,
}

impl RequestScope {
    /// The unit of work for this request, built on first access.
    pub fn unit_of_work(&self) -> Arc<SqlUnitOfWork> {
        self.uow
            .get_or_init(|| {
                Arc::new(
                    self.factory
                        .uow_factory
                        .create_with_isolation_level(self.isolation),
                )
            })
            .clone()
    }

    /// The user service for this request, built on first access and bound
    /// to this scope's unit of work.
    pub fn user_service(&self) -> Arc<UserManager<SqlUnitOfWork>> {
        self.user_service
            .get_or_init(|| {
                Arc::new(UserManager::new(
                    self.unit_of_work(),
                    self.factory.cache.clone(),
                    self.factory.salt_length,
                ))
            })
            .clone()
    }

    pub fn isolation_level(&self) -> TxIsolation {
        self.isolation
    }

    /// Close the scope. A scope whose unit of work was never touched has
    /// nothing to release.
    pub async fn close(&self) -> AppResult<()> {
        if let Some(uow) = self.uow.get() {
            uow.close().await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::DatabaseConnection;

    use crate::infra::MockUserCache;

    fn scope_factory() -> ScopeFactory {
        ScopeFactory::new(
            UnitOfWorkFactory::new(DatabaseConnection::default()),
            Arc::new(MockUserCache::new()),
            10,
        )
    }

    #[test]
    fn unit_of_work_is_built_exactly_once() {
        let scope = scope_factory().create_scope();

        let first = scope.unit_of_work();
        let second = scope.unit_of_work();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn user_service_is_built_exactly_once() {
        let scope = scope_factory().create_scope();

        let first = scope.user_service();
        let second = scope.user_service();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn scope_carries_requested_isolation_into_the_unit_of_work() {
        let scope = scope_factory().create_scope_with_isolation_level(TxIsolation::Serializable);

        assert_eq!(scope.isolation_level(), TxIsolation::Serializable);
        assert_eq!(
            scope.unit_of_work().isolation_level(),
            TxIsolation::Serializable
        );
    }

    #[tokio::test]
    async fn closing_an_untouched_scope_is_a_noop() {
        let scope = scope_factory().create_scope();
        assert!(scope.close().await.is_ok());
    }

    #[tokio::test]
    async fn closing_without_a_transaction_releases_cleanly() {
        let scope = scope_factory().create_scope();
        let _ = scope.unit_of_work();

        assert!(scope.close().await.is_ok());
        assert!(scope.close().await.is_ok());
    }
}
