//! Book (catalog entry) model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Book as stored in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub publisher: String,
    #[serde(rename = "ISBN")]
    pub isbn: String,
}

/// Create book request
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct CreateBook {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub isbn: String,
}

/// Update book request; absent or empty fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub isbn: Option<String>,
}

impl UpdateBook {
    /// Apply the non-empty fields of this patch onto a book
    pub fn apply(&self, book: &mut Book) {
        fn set(target: &mut String, value: &Option<String>) {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                *target = v.to_string();
            }
        }
        set(&mut book.title, &self.title);
        set(&mut book.author, &self.author);
        set(&mut book.publisher, &self.publisher);
        set(&mut book.isbn, &self.isbn);
    }
}

/// Remove book request, with an optional explanation for the log
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct RemoveBook {
    pub message: Option<String>,
}

/// Catalog search filters, combined with AND
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct BookQuery {
    /// Case-sensitive substring of the title
    pub title: Option<String>,
    /// Exact author
    pub author: Option<String>,
    /// Exact ISBN
    pub isbn: Option<String>,
}

impl BookQuery {
    fn non_empty(value: &Option<String>) -> Option<&str> {
        value.as_deref().filter(|v| !v.is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        Self::non_empty(&self.title)
    }

    pub fn author(&self) -> Option<&str> {
        Self::non_empty(&self.author)
    }

    pub fn isbn(&self) -> Option<&str> {
        Self::non_empty(&self.isbn)
    }

    pub fn matches(&self, book: &Book) -> bool {
        self.title().map_or(true, |t| book.title.contains(t))
            && self.author().map_or(true, |a| book.author == a)
            && self.isbn().map_or(true, |i| book.isbn == i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dune() -> Book {
        Book {
            id: 1,
            title: "Dune Messiah".into(),
            author: "Frank Herbert".into(),
            publisher: "Putnam".into(),
            isbn: "978-0399101472".into(),
        }
    }

    #[test]
    fn test_query_matches() {
        let book = dune();
        assert!(BookQuery::default().matches(&book));
        assert!(BookQuery { title: Some("Messiah".into()), ..Default::default() }.matches(&book));
        assert!(!BookQuery { title: Some("messiah".into()), ..Default::default() }.matches(&book));
        assert!(!BookQuery { author: Some("Frank".into()), ..Default::default() }.matches(&book));
        assert!(BookQuery {
            title: Some("Dune".into()),
            author: Some("Frank Herbert".into()),
            isbn: Some("978-0399101472".into()),
        }
        .matches(&book));
        assert!(BookQuery { isbn: Some(String::new()), ..Default::default() }.matches(&book));
    }

    #[test]
    fn test_update_skips_empty_fields() {
        let mut book = dune();
        UpdateBook {
            title: Some(String::new()),
            publisher: Some("Ace".into()),
            ..Default::default()
        }
        .apply(&mut book);
        assert_eq!(book.title, "Dune Messiah");
        assert_eq!(book.publisher, "Ace");
    }

    #[test]
    fn test_isbn_wire_name() {
        let json = serde_json::to_value(dune()).unwrap();
        assert_eq!(json["ISBN"], "978-0399101472");
    }
}
