//! Users repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{is_unique_violation, AppError, AppResult},
    models::user::{NewUser, PrivilegeLevel, User, UserRow},
};

/// Persistence for user accounts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsersStore: Send + Sync {
    /// Insert a user; a taken username yields `DuplicateUsername`
    async fn create(&self, user: NewUser) -> AppResult<User>;

    async fn get_by_id(&self, id: i32) -> AppResult<Option<User>>;

    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn username_exists(&self, username: &str) -> AppResult<bool>;

    /// All users ordered by id
    async fn list(&self) -> AppResult<Vec<User>>;

    /// Change credential and/or level; `None` if the user does not exist
    async fn update(
        &self,
        id: i32,
        password_hash: Option<String>,
        level: Option<PrivilegeLevel>,
    ) -> AppResult<Option<User>>;

    /// Hard delete; false if nothing was removed
    async fn delete(&self, id: i32) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct PgUsersRepository {
    pool: Pool<Postgres>,
}

impl PgUsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsersStore for PgUsersRepository {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, password, level)
            VALUES ($1, $2, $3)
            RETURNING id, username, password, level
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(i16::from(user.level))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateUsername
            } else {
                AppError::Database(e)
            }
        })?;

        row.try_into()
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT id, username, password, level FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password, level FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, UserRow>("SELECT id, username, password, level FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn update(
        &self,
        id: i32,
        password_hash: Option<String>,
        level: Option<PrivilegeLevel>,
    ) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET password = COALESCE($2, password),
                level = COALESCE($3, level)
            WHERE id = $1
            RETURNING id, username, password, level
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .bind(level.map(i16::from))
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
