//! Repository layer for persistence
//!
//! Each entity has a store trait with a PostgreSQL implementation and an
//! in-memory one. Services only ever see the traits.

pub mod books;
pub mod memory;
pub mod records;
pub mod users;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::error::AppResult;

pub use books::BooksStore;
pub use records::RecordsStore;
pub use users::UsersStore;

/// Handles to every store, cheap to clone
#[derive(Clone)]
pub struct Repository {
    pub pool: Option<Pool<Postgres>>,
    pub users: Arc<dyn UsersStore>,
    pub books: Arc<dyn BooksStore>,
    pub records: Arc<dyn RecordsStore>,
}

impl Repository {
    /// Create a repository backed by the given database pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            users: Arc::new(users::PgUsersRepository::new(pool.clone())),
            books: Arc::new(books::PgBooksRepository::new(pool.clone())),
            records: Arc::new(records::PgRecordsRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Create a repository that keeps everything in process memory
    pub fn in_memory() -> Self {
        Self {
            pool: None,
            users: Arc::new(memory::MemoryUsersStore::new()),
            books: Arc::new(memory::MemoryBooksStore::new()),
            records: Arc::new(memory::MemoryRecordsStore::new()),
        }
    }

    /// Check that the backing database answers
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    const SCHEMA: &str = include_str!("../../migrations/20240101000000_initial.sql");

    #[test]
    fn test_records_are_not_removed_with_books_or_users() {
        let records = SCHEMA
            .split("CREATE TABLE IF NOT EXISTS records")
            .nth(1)
            .and_then(|rest| rest.split(");").next())
            .unwrap();
        assert!(!records.contains("REFERENCES"));
        assert!(!SCHEMA.contains("ON DELETE CASCADE"));
    }
}
