//! User service - registration and credential verification.
//!
//! SOLID (SRP): Identity use cases only.
//! DDD: Uses the domain Password value object for hashing and the Unit of
//! Work for repository access.
//!
//! The service owns the transaction outcome on both paths: a failed
//! registration rolls back immediately, a successful one commits.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{Password, User, UserId};
use crate::errors::{AppError, AppResult};
use crate::infra::{UnitOfWork, UserCache};

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Register a new user: generate a salt, hash the password and persist
    /// the record inside the unit of work's transaction.
    async fn register_user(&self, name: String, email: String, password: String)
        -> AppResult<User>;

    /// Resolve a user by email and verify the password against the stored
    /// salted hash. The cache is consulted first; the store stays
    /// authoritative on a miss or a cache failure.
    async fn verify_credentials(&self, email: &str, password: &str) -> AppResult<User>;

    /// Delete a user by identifier.
    async fn delete_user(&self, id: UserId) -> AppResult<()>;
}

/// Concrete implementation of UserService using Unit of Work.
pub struct UserManager<U: UnitOfWork> {
    uow: Arc<U>,
    cache: Arc<dyn UserCache>,
    salt_length: usize,
}

impl<U: UnitOfWork> UserManager<U> {
    pub fn new(uow: Arc<U>, cache: Arc<dyn UserCache>, salt_length: usize) -> Self {
        Self {
            uow,
            cache,
            salt_length,
        }
    }
}

#[async_trait]
impl<U: UnitOfWork> UserService for UserManager<U> {
    async fn register_user(
        &self,
        name: String,
        email: String,
        password: String,
    ) -> AppResult<User> {
        let password = Password::generate(&password, self.salt_length)?;
        let user = User::new(name, email, password);

        match self.uow.users().add_user(user).await {
            Ok(created) => {
                self.uow.save_changes().await?;
                Ok(created)
            }
            Err(err) => {
                // The failed write must not linger in the open transaction.
                // If the rollback fails too, surface both.
                match self.uow.rollback_changes().await {
                    Ok(()) => Err(err),
                    Err(rollback_err) => Err(AppError::joined(err, rollback_err)),
                }
            }
        }
    }

    async fn verify_credentials(&self, email: &str, password: &str) -> AppResult<User> {
        let cached = match self.cache.get_user_by_email(email).await {
            Ok(hit) => hit,
            Err(err) => {
                tracing::warn!(error = %err, "failed to fetch user from cache");
                None
            }
        };

        let user = match cached {
            Some(user) => user,
            None => {
                let user = self.uow.users().get_by_email(email).await?;

                // Best effort: the cache is an optimization, not a
                // consistency boundary.
                if let Err(err) = self.cache.save_user_by_email(&user).await {
                    tracing::warn!(error = %err, "failed to repopulate user cache");
                }

                user
            }
        };

        if !user.password().verify(password) {
            return Err(AppError::WrongCredentials);
        }

        Ok(user)
    }

    async fn delete_user(&self, _id: UserId) -> AppResult<()> {
        // TODO: wire up repository delete once account deletion ships
        Err(AppError::internal("user deletion is not implemented"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use sea_orm::DbErr;

    use crate::infra::{MockUserCache, MockUserRepository, UserRepository};

    const SALT_LENGTH: usize = 10;

    fn test_user(email: &str, password: &str) -> User {
        let password = Password::generate(password, SALT_LENGTH).unwrap();
        let mut user = User::new("ann".to_string(), email.to_string(), password);
        user.id = 1;
        user
    }

    /// Unit-of-work stub wrapping a mock repository, recording outcomes.
    struct TestUnitOfWork {
        repo: Arc<MockUserRepository>,
        saves: AtomicUsize,
        rollbacks: AtomicUsize,
        fail_rollback: bool,
    }

    impl TestUnitOfWork {
        fn new(repo: MockUserRepository) -> Self {
            Self {
                repo: Arc::new(repo),
                saves: AtomicUsize::new(0),
                rollbacks: AtomicUsize::new(0),
                fail_rollback: false,
            }
        }

        fn with_failing_rollback(repo: MockUserRepository) -> Self {
            Self {
                fail_rollback: true,
                ..Self::new(repo)
            }
        }
    }

    #[async_trait]
    impl UnitOfWork for TestUnitOfWork {
        fn users(&self) -> Arc<dyn UserRepository> {
            self.repo.clone()
        }

        async fn save_changes(&self) -> AppResult<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn rollback_changes(&self) -> AppResult<()> {
            self.rollbacks.fetch_add(1, Ordering::SeqCst);
            if self.fail_rollback {
                Err(AppError::Rollback(DbErr::Custom("rollback failed".into())))
            } else {
                Ok(())
            }
        }

        async fn close(&self) -> AppResult<()> {
            Ok(())
        }
    }

    fn service(
        uow: TestUnitOfWork,
        cache: MockUserCache,
    ) -> (Arc<TestUnitOfWork>, UserManager<TestUnitOfWork>) {
        let uow = Arc::new(uow);
        let manager = UserManager::new(uow.clone(), Arc::new(cache), SALT_LENGTH);
        (uow, manager)
    }

    #[tokio::test]
    async fn register_commits_on_success() {
        let mut repo = MockUserRepository::new();
        repo.expect_add_user().returning(|mut user| {
            user.id = 1;
            Ok(user)
        });

        // No cache expectations: registration must not touch the cache.
        let (uow, manager) = service(TestUnitOfWork::new(repo), MockUserCache::new());

        let user = manager
            .register_user("ann".into(), "ann@x.com".into(), "secret".into())
            .await
            .unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(user.salt.len(), SALT_LENGTH);
        assert!(user.password().verify("secret"));
        assert_eq!(uow.saves.load(Ordering::SeqCst), 1);
        assert_eq!(uow.rollbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn register_rolls_back_on_duplicate_email() {
        let mut repo = MockUserRepository::new();
        repo.expect_add_user()
            .returning(|_| Err(AppError::DuplicateEmail(DbErr::Custom("unique".into()))));

        let (uow, manager) = service(TestUnitOfWork::new(repo), MockUserCache::new());

        let err = manager
            .register_user("ann".into(), "ann@x.com".into(), "secret".into())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::DuplicateEmail(_)));
        assert_eq!(uow.saves.load(Ordering::SeqCst), 0);
        assert_eq!(uow.rollbacks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn register_joins_rollback_failure_with_the_cause() {
        let mut repo = MockUserRepository::new();
        repo.expect_add_user()
            .returning(|_| Err(AppError::DuplicateEmail(DbErr::Custom("unique".into()))));

        let (_, manager) = service(
            TestUnitOfWork::with_failing_rollback(repo),
            MockUserCache::new(),
        );

        let err = manager
            .register_user("ann".into(), "ann@x.com".into(), "secret".into())
            .await
            .unwrap_err();

        match err {
            AppError::Joined(failure, rollback) => {
                assert!(matches!(*failure, AppError::DuplicateEmail(_)));
                assert!(matches!(*rollback, AppError::Rollback(_)));
            }
            other => panic!("expected joined error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn verify_uses_cache_hit_without_touching_the_store() {
        let user = test_user("ann@x.com", "secret");

        // No repository expectations: the store must stay untouched.
        let repo = MockUserRepository::new();

        let mut cache = MockUserCache::new();
        let cached = user.clone();
        cache
            .expect_get_user_by_email()
            .returning(move |_| Ok(Some(cached.clone())));

        let (_, manager) = service(TestUnitOfWork::new(repo), cache);

        let resolved = manager.verify_credentials("ann@x.com", "secret").await.unwrap();
        assert_eq!(resolved, user);
    }

    #[tokio::test]
    async fn verify_falls_back_to_store_when_cache_is_unreachable() {
        let user = test_user("ann@x.com", "secret");

        let mut repo = MockUserRepository::new();
        let stored = user.clone();
        repo.expect_get_by_email()
            .returning(move |_| Ok(stored.clone()));

        let mut cache = MockUserCache::new();
        cache
            .expect_get_user_by_email()
            .returning(|_| Err(AppError::internal("cache down")));
        cache
            .expect_save_user_by_email()
            .returning(|_| Err(AppError::internal("cache down")));

        let (_, manager) = service(TestUnitOfWork::new(repo), cache);

        // Neither the read nor the write-back failure may surface.
        let resolved = manager.verify_credentials("ann@x.com", "secret").await.unwrap();
        assert_eq!(resolved, user);
    }

    #[tokio::test]
    async fn verify_repopulates_cache_after_store_load() {
        let user = test_user("ann@x.com", "secret");

        let mut repo = MockUserRepository::new();
        let stored = user.clone();
        repo.expect_get_by_email()
            .returning(move |_| Ok(stored.clone()));

        let mut cache = MockUserCache::new();
        cache.expect_get_user_by_email().returning(|_| Ok(None));
        cache
            .expect_save_user_by_email()
            .times(1)
            .returning(|_| Ok(()));

        let (_, manager) = service(TestUnitOfWork::new(repo), cache);

        manager.verify_credentials("ann@x.com", "secret").await.unwrap();
    }

    #[tokio::test]
    async fn verify_rejects_wrong_password() {
        let user = test_user("ann@x.com", "secret");

        let repo = MockUserRepository::new();

        let mut cache = MockUserCache::new();
        cache
            .expect_get_user_by_email()
            .returning(move |_| Ok(Some(user.clone())));

        let (_, manager) = service(TestUnitOfWork::new(repo), cache);

        let err = manager
            .verify_credentials("ann@x.com", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::WrongCredentials));
    }

    #[tokio::test]
    async fn verify_unknown_email_is_not_found() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_by_email()
            .returning(|_| Err(AppError::UserNotFound));

        let mut cache = MockUserCache::new();
        cache.expect_get_user_by_email().returning(|_| Ok(None));

        let (_, manager) = service(TestUnitOfWork::new(repo), cache);

        let err = manager
            .verify_credentials("ghost@x.com", "secret")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UserNotFound));
    }

    #[tokio::test]
    async fn delete_user_is_not_implemented() {
        let (_, manager) = service(
            TestUnitOfWork::new(MockUserRepository::new()),
            MockUserCache::new(),
        );

        let err = manager.delete_user(1).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
