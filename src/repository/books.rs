//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::AppResult,
    models::book::{Book, BookQuery, CreateBook},
};

/// Persistence for the catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BooksStore: Send + Sync {
    async fn create(&self, book: CreateBook) -> AppResult<Book>;

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>>;

    async fn exists(&self, id: i32) -> AppResult<bool>;

    /// Books matching every supplied filter, ordered by id
    async fn find(&self, query: &BookQuery) -> AppResult<Vec<Book>>;

    /// Overwrite all fields of an existing book
    async fn save(&self, book: &Book) -> AppResult<Option<Book>>;

    async fn delete(&self, id: i32) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct PgBooksRepository {
    pool: Pool<Postgres>,
}

impl PgBooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Escape LIKE metacharacters so the title filter is a literal substring
fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl BooksStore for PgBooksRepository {
    async fn create(&self, book: CreateBook) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, publisher, isbn)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.publisher)
        .bind(&book.isbn)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn find(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM books WHERE TRUE");

        // LIKE is case-sensitive in PostgreSQL
        if let Some(title) = query.title() {
            builder.push(" AND title LIKE ").push_bind(like_pattern(title));
        }
        if let Some(author) = query.author() {
            builder.push(" AND author = ").push_bind(author.to_string());
        }
        if let Some(isbn) = query.isbn() {
            builder.push(" AND isbn = ").push_bind(isbn.to_string());
        }
        builder.push(" ORDER BY id");

        let books = builder
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn save(&self, book: &Book) -> AppResult<Option<Book>> {
        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = $2, author = $3, publisher = $4, isbn = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.publisher)
        .bind(&book.isbn)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes() {
        assert_eq!(like_pattern("Dune"), "%Dune%");
        assert_eq!(like_pattern("100%_off"), "%100\\%\\_off%");
    }
}
