//! Borrow records repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{is_unique_violation, AppError, AppResult},
    models::record::{BorrowRecord, LendingPolicy, NewRecord, RecordRow},
};

/// Persistence for borrow records.
///
/// Implementations must keep at most one active record per (user, book),
/// and must apply extension and closing atomically for that pair.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordsStore: Send + Sync {
    /// Number of the user's active records whose deadline is before `now`
    async fn count_overdue(&self, user_id: i32, now: DateTime<Utc>) -> AppResult<u64>;

    async fn get_active(&self, user_id: i32, book_id: i32) -> AppResult<Option<BorrowRecord>>;

    /// Insert an active record; an existing active one yields `AlreadyBorrowed`
    async fn create(&self, record: NewRecord) -> AppResult<BorrowRecord>;

    /// Apply one extension to the active record under `policy`
    async fn extend_active(
        &self,
        user_id: i32,
        book_id: i32,
        policy: &LendingPolicy,
    ) -> AppResult<BorrowRecord>;

    /// Soft-close the active record, stamping `at` as the real return date
    async fn close_active(
        &self,
        user_id: i32,
        book_id: i32,
        at: DateTime<Utc>,
    ) -> AppResult<BorrowRecord>;

    async fn list_active(&self, user_id: i32) -> AppResult<Vec<BorrowRecord>>;

    async fn list_overdue(&self, user_id: i32, now: DateTime<Utc>) -> AppResult<Vec<BorrowRecord>>;

    /// Every record ever created for the user, closed ones included
    async fn list_history(&self, user_id: i32) -> AppResult<Vec<BorrowRecord>>;
}

#[derive(Clone)]
pub struct PgRecordsRepository {
    pool: Pool<Postgres>,
}

impl PgRecordsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_all(
        &self,
        sql: &str,
        user_id: i32,
        now: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<BorrowRecord>> {
        let mut query = sqlx::query_as::<_, RecordRow>(sql).bind(user_id);
        if let Some(now) = now {
            query = query.bind(now);
        }
        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(BorrowRecord::try_from)
            .collect()
    }
}

#[async_trait]
impl RecordsStore for PgRecordsRepository {
    async fn count_overdue(&self, user_id: i32, now: DateTime<Utc>) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM records
            WHERE user_id = $1 AND returned_at IS NULL AND return_date < $2
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn get_active(&self, user_id: i32, book_id: i32) -> AppResult<Option<BorrowRecord>> {
        sqlx::query_as::<_, RecordRow>(
            "SELECT * FROM records WHERE user_id = $1 AND book_id = $2 AND returned_at IS NULL",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?
        .map(BorrowRecord::try_from)
        .transpose()
    }

    async fn create(&self, record: NewRecord) -> AppResult<BorrowRecord> {
        // The partial unique index on open loans settles concurrent borrows
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            INSERT INTO records (user_id, book_id, borrow_date, return_date, extend_times)
            VALUES ($1, $2, $3, $4, 0)
            RETURNING *
            "#,
        )
        .bind(record.user_id)
        .bind(record.book_id)
        .bind(record.borrow_date)
        .bind(record.return_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::AlreadyBorrowed
            } else {
                AppError::Database(e)
            }
        })?;

        row.try_into()
    }

    async fn extend_active(
        &self,
        user_id: i32,
        book_id: i32,
        policy: &LendingPolicy,
    ) -> AppResult<BorrowRecord> {
        let mut tx = self.pool.begin().await?;

        let current: BorrowRecord = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT * FROM records
            WHERE user_id = $1 AND book_id = $2 AND returned_at IS NULL
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::RecordNotFound)?
        .try_into()?;

        let extended = current.extended(policy)?;
        let extend_times = i32::try_from(extended.extend_times)
            .map_err(|_| AppError::Internal("extension count overflow".to_string()))?;

        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            UPDATE records SET return_date = $2, extend_times = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(extended.id)
        .bind(extended.return_date)
        .bind(extend_times)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        row.try_into()
    }

    async fn close_active(
        &self,
        user_id: i32,
        book_id: i32,
        at: DateTime<Utc>,
    ) -> AppResult<BorrowRecord> {
        sqlx::query_as::<_, RecordRow>(
            r#"
            UPDATE records SET returned_at = $3
            WHERE user_id = $1 AND book_id = $2 AND returned_at IS NULL
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::RecordNotFound)?
        .try_into()
    }

    async fn list_active(&self, user_id: i32) -> AppResult<Vec<BorrowRecord>> {
        self.fetch_all(
            r#"
            SELECT * FROM records
            WHERE user_id = $1 AND returned_at IS NULL
            ORDER BY return_date, id
            "#,
            user_id,
            None,
        )
        .await
    }

    async fn list_overdue(&self, user_id: i32, now: DateTime<Utc>) -> AppResult<Vec<BorrowRecord>> {
        self.fetch_all(
            r#"
            SELECT * FROM records
            WHERE user_id = $1 AND returned_at IS NULL AND return_date < $2
            ORDER BY return_date, id
            "#,
            user_id,
            Some(now),
        )
        .await
    }

    async fn list_history(&self, user_id: i32) -> AppResult<Vec<BorrowRecord>> {
        self.fetch_all(
            "SELECT * FROM records WHERE user_id = $1 ORDER BY return_date, id",
            user_id,
            None,
        )
        .await
    }
}
