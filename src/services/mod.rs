//! Business logic services

pub mod auth;
pub mod catalog;
pub mod lending;
pub mod sessions;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::LibraryConfig,
    models::record::LendingPolicy,
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub lending: lending::LendingService,
    repository: Repository,
}

impl Services {
    /// Wire every service on top of the given stores
    pub fn new(
        repository: Repository,
        session_store: Arc<dyn sessions::SessionStore>,
        session_ttl: Duration,
        library_config: &LibraryConfig,
    ) -> Self {
        let users = users::UsersService::new(repository.users.clone());
        let catalog = catalog::CatalogService::new(repository.books.clone());
        let sessions = sessions::SessionService::new(session_store, session_ttl);

        Self {
            auth: auth::AuthService::new(sessions, users.clone()),
            lending: lending::LendingService::new(
                repository.records.clone(),
                catalog.clone(),
                LendingPolicy::new(library_config),
            ),
            users,
            catalog,
            repository,
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }
}
