//! Application state - shared infrastructure handles.

use std::sync::Arc;

use crate::config::Config;
use crate::infra::{Database, UnitOfWorkFactory, UserCache};
use crate::services::ScopeFactory;

/// State shared across handlers. Request-scoped objects are not kept
/// here; they are built per request by the scope factory.
#[derive(Clone)]
pub struct AppState {
    pub scope_factory: ScopeFactory,
    pub database: Arc<Database>,
    pub cache: Arc<dyn UserCache>,
}

impl AppState {
    pub fn from_config(
        database: Arc<Database>,
        cache: Arc<dyn UserCache>,
        config: &Config,
    ) -> Self {
        let uow_factory = UnitOfWorkFactory::new(database.get_connection());
        let scope_factory = ScopeFactory::new(uow_factory, cache.clone(), config.salt_length);

        Self {
            scope_factory,
            database,
            cache,
        }
    }
}
