//! Catalog management service

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
    repository::BooksStore,
};

#[derive(Clone)]
pub struct CatalogService {
    books: Arc<dyn BooksStore>,
}

impl CatalogService {
    pub fn new(books: Arc<dyn BooksStore>) -> Self {
        Self { books }
    }

    /// Add a book to the library
    pub async fn add_book(&self, mut input: CreateBook) -> AppResult<Book> {
        input.title = input.title.trim().to_string();
        if input.title.is_empty() {
            return Err(AppError::InvalidInput("title required".to_string()));
        }

        let book = self.books.create(input).await?;
        tracing::info!(book_id = book.id, title = %book.title, "Added book");
        Ok(book)
    }

    /// Update the supplied fields of a book
    pub async fn update_book(&self, id: i32, patch: UpdateBook) -> AppResult<Book> {
        let mut book = self.get_book(id).await?;
        patch.apply(&mut book);

        let book = self
            .books
            .save(&book)
            .await?
            .ok_or(AppError::BookNotFound)?;
        tracing::info!(book_id = id, "Updated book");
        Ok(book)
    }

    /// Remove a book; `message` is an optional explanation kept in the log
    pub async fn remove_book(&self, id: i32, message: Option<&str>) -> AppResult<()> {
        if !self.books.delete(id).await? {
            return Err(AppError::BookNotFound);
        }

        match message.filter(|m| !m.is_empty()) {
            Some(message) => tracing::info!(book_id = id, %message, "Removed book with explanation"),
            None => tracing::info!(book_id = id, "Removed book"),
        }
        Ok(())
    }

    /// Get book by ID
    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.books.get_by_id(id).await?.ok_or(AppError::BookNotFound)
    }

    pub async fn book_exists(&self, id: i32) -> AppResult<bool> {
        self.books.exists(id).await
    }

    /// The whole catalog
    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.books.find(&BookQuery::default()).await
    }

    /// Search by title substring, exact author and exact ISBN
    pub async fn find(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.books.find(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::MemoryBooksStore;

    fn book(title: &str, author: &str, isbn: &str) -> CreateBook {
        CreateBook {
            title: title.to_string(),
            author: author.to_string(),
            publisher: String::new(),
            isbn: isbn.to_string(),
        }
    }

    async fn seeded() -> CatalogService {
        let catalog = CatalogService::new(Arc::new(MemoryBooksStore::new()));
        catalog.add_book(book("Dune", "Frank Herbert", "111")).await.unwrap();
        catalog.add_book(book("Dune Messiah", "Frank Herbert", "222")).await.unwrap();
        catalog.add_book(book("Neuromancer", "William Gibson", "333")).await.unwrap();
        catalog
    }

    #[tokio::test]
    async fn test_find_without_filters_is_show_all() {
        let catalog = seeded().await;
        let all = catalog.find(&BookQuery::default()).await.unwrap();
        assert_eq!(all, catalog.list_books().await.unwrap());
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_find_combines_filters() {
        let catalog = seeded().await;

        let by_title = catalog
            .find(&BookQuery { title: Some("Dune".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(by_title.len(), 2);

        let both = catalog
            .find(&BookQuery {
                title: Some("Dune".into()),
                isbn: Some("222".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].title, "Dune Messiah");

        let case_sensitive = catalog
            .find(&BookQuery { title: Some("dune".into()), ..Default::default() })
            .await
            .unwrap();
        assert!(case_sensitive.is_empty());

        let author = catalog
            .find(&BookQuery { author: Some("William Gibson".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(author.len(), 1);
    }

    #[tokio::test]
    async fn test_find_is_stable() {
        let catalog = seeded().await;
        let query = BookQuery { author: Some("Frank Herbert".into()), ..Default::default() };
        assert_eq!(catalog.find(&query).await.unwrap(), catalog.find(&query).await.unwrap());
    }

    #[tokio::test]
    async fn test_title_required() {
        let catalog = seeded().await;
        assert!(matches!(
            catalog.add_book(book("  ", "", "")).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let catalog = seeded().await;
        let updated = catalog
            .update_book(3, UpdateBook { publisher: Some("Ace".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.publisher, "Ace");
        assert_eq!(updated.title, "Neuromancer");

        catalog.remove_book(3, Some("damaged")).await.unwrap();
        assert!(matches!(catalog.get_book(3).await, Err(AppError::BookNotFound)));
        assert!(matches!(catalog.remove_book(3, None).await, Err(AppError::BookNotFound)));
        assert!(matches!(
            catalog.update_book(3, UpdateBook::default()).await,
            Err(AppError::BookNotFound)
        ));
        assert!(!catalog.book_exists(3).await.unwrap());
    }
}
