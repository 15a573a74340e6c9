//! Typed HTTP client for the REALMS API
//!
//! Every response is decoded exactly once into an [`Envelope`] and turned
//! into a `Result`; callers never look at raw JSON maps.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::{
    api::auth::LoginRequest,
    models::{
        book::{Book, BookQuery, CreateBook, RemoveBook, UpdateBook},
        record::{BorrowRecord, BorrowRequest},
        user::{CreateUser, Identity, UpdateUser},
    },
};

/// Body of every server response
#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Envelope<T> {
    Data { data: T },
    Error { error: String },
}

impl<T> Envelope<T> {
    pub fn into_result(self, status: u16) -> Result<T, ClientError> {
        match self {
            Envelope::Data { data } => Ok(data),
            Envelope::Error { error } => Err(ClientError::Server {
                status,
                message: error,
            }),
        }
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    /// The server answered with an error envelope
    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid server url: {0}")]
    InvalidUrl(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Session-aware client; the session cookie is kept between calls
#[derive(Clone)]
pub struct RealmsClient {
    http: reqwest::Client,
    base_url: String,
}

impl RealmsClient {
    /// `server` is the server root, e.g. `http://localhost:7274`
    pub fn new(server: &str) -> ClientResult<Self> {
        let server = server.trim_end_matches('/');
        if !(server.starts_with("http://") || server.starts_with("https://")) {
            return Err(ClientError::InvalidUrl(server.to_string()));
        }

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("realms/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: format!("{}/api/v1", server),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let envelope: Envelope<T> = response.json().await?;
        envelope.into_result(status)
    }

    // Sessions

    pub async fn login(&self, username: &str, password: &str) -> ClientResult<Identity> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.send(self.request(Method::POST, "/login").json(&body)).await
    }

    pub async fn logout(&self) -> ClientResult<bool> {
        self.send(self.request(Method::GET, "/logout")).await
    }

    pub async fn status(&self) -> ClientResult<bool> {
        self.send(self.request(Method::GET, "/status")).await
    }

    pub async fn me(&self) -> ClientResult<Identity> {
        self.send(self.request(Method::GET, "/user/me")).await
    }

    // Catalog

    pub async fn list_books(&self) -> ClientResult<Vec<Book>> {
        self.send(self.request(Method::GET, "/books")).await
    }

    pub async fn get_book(&self, id: u32) -> ClientResult<Book> {
        self.send(self.request(Method::GET, &format!("/books/{}", id))).await
    }

    pub async fn find_books(&self, query: &BookQuery) -> ClientResult<Vec<Book>> {
        self.send(self.request(Method::POST, "/books/find").json(query)).await
    }

    pub async fn add_book(&self, book: &CreateBook) -> ClientResult<Book> {
        self.send(self.request(Method::POST, "/admin/books").json(book)).await
    }

    pub async fn update_book(&self, id: u32, patch: &UpdateBook) -> ClientResult<Book> {
        self.send(
            self.request(Method::PATCH, &format!("/admin/books/{}", id))
                .json(patch),
        )
        .await
    }

    pub async fn remove_book(&self, id: u32, message: Option<String>) -> ClientResult<bool> {
        self.send(
            self.request(Method::DELETE, &format!("/admin/books/{}", id))
                .json(&RemoveBook { message }),
        )
        .await
    }

    // Users

    pub async fn list_users(&self) -> ClientResult<Vec<Identity>> {
        self.send(self.request(Method::GET, "/admin/users")).await
    }

    pub async fn get_user(&self, id: u32) -> ClientResult<Identity> {
        self.send(self.request(Method::GET, &format!("/admin/users/{}", id)))
            .await
    }

    pub async fn add_user(&self, user: &CreateUser) -> ClientResult<Identity> {
        self.send(self.request(Method::POST, "/admin/users").json(user)).await
    }

    pub async fn update_user(&self, id: u32, patch: &UpdateUser) -> ClientResult<Identity> {
        self.send(
            self.request(Method::PATCH, &format!("/admin/users/{}", id))
                .json(patch),
        )
        .await
    }

    pub async fn remove_user(&self, id: u32) -> ClientResult<bool> {
        self.send(self.request(Method::DELETE, &format!("/admin/users/{}", id)))
            .await
    }

    // Records

    pub async fn borrow_book(
        &self,
        id: u32,
        borrow_date: Option<DateTime<Utc>>,
    ) -> ClientResult<BorrowRecord> {
        self.send(
            self.request(Method::POST, &format!("/user/books/{}", id))
                .json(&BorrowRequest { borrow_date }),
        )
        .await
    }

    pub async fn return_book(&self, id: u32) -> ClientResult<BorrowRecord> {
        self.send(self.request(Method::DELETE, &format!("/user/books/{}", id)))
            .await
    }

    /// Active record of a borrowed book, carries its deadline
    pub async fn check_deadline(&self, id: u32) -> ClientResult<BorrowRecord> {
        self.send(self.request(Method::GET, &format!("/user/books/{}", id)))
            .await
    }

    pub async fn extend_deadline(&self, id: u32) -> ClientResult<BorrowRecord> {
        self.send(self.request(Method::PATCH, &format!("/user/books/{}", id)))
            .await
    }

    pub async fn list_borrowed(&self) -> ClientResult<Vec<BorrowRecord>> {
        self.send(self.request(Method::GET, "/user/books")).await
    }

    pub async fn list_overdue(&self) -> ClientResult<Vec<BorrowRecord>> {
        self.send(self.request(Method::GET, "/user/overdue")).await
    }

    pub async fn list_history(&self) -> ClientResult<Vec<BorrowRecord>> {
        self.send(self.request(Method::GET, "/user/history")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_envelope() {
        let envelope: Envelope<Vec<Book>> = serde_json::from_str(
            r#"{"data":[{"id":1,"title":"Dune","author":"","publisher":"","ISBN":"111"}]}"#,
        )
        .unwrap();
        let books = envelope.into_result(200).unwrap();
        assert_eq!(books[0].isbn, "111");
    }

    #[test]
    fn test_decode_error_envelope() {
        let envelope: Envelope<Book> =
            serde_json::from_str(r#"{"error":"database: book not found"}"#).unwrap();
        match envelope.into_result(404) {
            Err(ClientError::Server { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "database: book not found");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_decode_bool_envelope() {
        let envelope: Envelope<bool> = serde_json::from_str(r#"{"data":false}"#).unwrap();
        assert_eq!(envelope, Envelope::Data { data: false });
    }

    #[test]
    fn test_decode_record_envelope() {
        let envelope: Envelope<BorrowRecord> = serde_json::from_str(
            r#"{"data":{"id":3,"user_id":1,"book_id":2,
                "borrow_date":"2024-01-01T00:00:00Z","return_date":"2024-01-15T00:00:00Z",
                "extend_times":0,"real_return_date":"2024-01-10T00:00:00Z"}}"#,
        )
        .unwrap();
        let record = envelope.into_result(200).unwrap();
        assert!(!record.is_active());
        assert!(record.real_return_date().is_some());
    }

    #[test]
    fn test_rejects_url_without_scheme() {
        assert!(matches!(
            RealmsClient::new("localhost:7274"),
            Err(ClientError::InvalidUrl(_))
        ));
        assert!(RealmsClient::new("http://localhost:7274/").is_ok());
    }
}
