//! In-memory store implementations (development and testing)

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, CreateBook},
        record::{sort_by_return_date, BorrowRecord, LendingPolicy, NewRecord, RecordState},
        user::{NewUser, PrivilegeLevel, User},
    },
};

use super::{BooksStore, RecordsStore, UsersStore};

/// Rows keyed by id plus the next id to hand out
#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<i32, T>,
    next_id: i32,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryUsersStore {
    table: Arc<RwLock<Table<User>>>,
}

impl MemoryUsersStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsersStore for MemoryUsersStore {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        let mut table = self.table.write().await;

        if table.rows.values().any(|u| u.username == user.username) {
            return Err(AppError::DuplicateUsername);
        }

        let created = User {
            id: table.allocate_id(),
            username: user.username,
            password: user.password_hash,
            level: user.level,
        };
        table.rows.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<User>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.values().find(|u| u.username == username).cloned())
    }

    async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let table = self.table.read().await;
        Ok(table.rows.values().any(|u| u.username == username))
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn update(
        &self,
        id: i32,
        password_hash: Option<String>,
        level: Option<PrivilegeLevel>,
    ) -> AppResult<Option<User>> {
        let mut table = self.table.write().await;
        let Some(user) = table.rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(hash) = password_hash {
            user.password = hash;
        }
        if let Some(level) = level {
            user.level = level;
        }
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryBooksStore {
    table: Arc<RwLock<Table<Book>>>,
}

impl MemoryBooksStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BooksStore for MemoryBooksStore {
    async fn create(&self, book: CreateBook) -> AppResult<Book> {
        let mut table = self.table.write().await;
        let created = Book {
            id: table.allocate_id(),
            title: book.title,
            author: book.author,
            publisher: book.publisher,
            isbn: book.isbn,
        };
        table.rows.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn exists(&self, id: i32) -> AppResult<bool> {
        Ok(self.table.read().await.rows.contains_key(&id))
    }

    async fn find(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|b| query.matches(b))
            .cloned()
            .collect())
    }

    async fn save(&self, book: &Book) -> AppResult<Option<Book>> {
        let mut table = self.table.write().await;
        match table.rows.get_mut(&book.id) {
            Some(stored) => {
                *stored = book.clone();
                Ok(Some(book.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryRecordsStore {
    table: Arc<RwLock<Table<BorrowRecord>>>,
}

impl MemoryRecordsStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn collect<F>(&self, keep: F) -> Vec<BorrowRecord>
    where
        F: Fn(&BorrowRecord) -> bool,
    {
        let table = self.table.read().await;
        let mut records: Vec<BorrowRecord> =
            table.rows.values().filter(|r| keep(r)).cloned().collect();
        sort_by_return_date(&mut records);
        records
    }
}

fn active_id(table: &Table<BorrowRecord>, user_id: i32, book_id: i32) -> Option<i32> {
    table
        .rows
        .values()
        .find(|r| r.user_id == user_id && r.book_id == book_id && r.is_active())
        .map(|r| r.id)
}

#[async_trait]
impl RecordsStore for MemoryRecordsStore {
    async fn count_overdue(&self, user_id: i32, now: DateTime<Utc>) -> AppResult<u64> {
        let table = self.table.read().await;
        let count = table
            .rows
            .values()
            .filter(|r| r.user_id == user_id && r.is_overdue(now))
            .count();
        Ok(count as u64)
    }

    async fn get_active(&self, user_id: i32, book_id: i32) -> AppResult<Option<BorrowRecord>> {
        let table = self.table.read().await;
        Ok(active_id(&table, user_id, book_id).and_then(|id| table.rows.get(&id).cloned()))
    }

    async fn create(&self, record: NewRecord) -> AppResult<BorrowRecord> {
        // Check and insert under one write lock
        let mut table = self.table.write().await;
        if active_id(&table, record.user_id, record.book_id).is_some() {
            return Err(AppError::AlreadyBorrowed);
        }

        let created = BorrowRecord {
            id: table.allocate_id(),
            user_id: record.user_id,
            book_id: record.book_id,
            borrow_date: record.borrow_date,
            return_date: record.return_date,
            extend_times: 0,
            state: RecordState::Active,
        };
        table.rows.insert(created.id, created.clone());
        Ok(created)
    }

    async fn extend_active(
        &self,
        user_id: i32,
        book_id: i32,
        policy: &LendingPolicy,
    ) -> AppResult<BorrowRecord> {
        let mut table = self.table.write().await;
        let id = active_id(&table, user_id, book_id).ok_or(AppError::RecordNotFound)?;
        let stored = table.rows.get_mut(&id).ok_or(AppError::RecordNotFound)?;
        let extended = stored.extended(policy)?;
        *stored = extended.clone();
        Ok(extended)
    }

    async fn close_active(
        &self,
        user_id: i32,
        book_id: i32,
        at: DateTime<Utc>,
    ) -> AppResult<BorrowRecord> {
        let mut table = self.table.write().await;
        let id = active_id(&table, user_id, book_id).ok_or(AppError::RecordNotFound)?;
        let stored = table.rows.get_mut(&id).ok_or(AppError::RecordNotFound)?;
        let closed = stored.closed(at)?;
        *stored = closed.clone();
        Ok(closed)
    }

    async fn list_active(&self, user_id: i32) -> AppResult<Vec<BorrowRecord>> {
        Ok(self
            .collect(|r| r.user_id == user_id && r.is_active())
            .await)
    }

    async fn list_overdue(&self, user_id: i32, now: DateTime<Utc>) -> AppResult<Vec<BorrowRecord>> {
        Ok(self
            .collect(|r| r.user_id == user_id && r.is_overdue(now))
            .await)
    }

    async fn list_history(&self, user_id: i32) -> AppResult<Vec<BorrowRecord>> {
        Ok(self.collect(|r| r.user_id == user_id).await)
    }
}
