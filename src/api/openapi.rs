//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, records, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "REALMS API",
        version = "0.2.0",
        description = "Library management REST API. Successful bodies are wrapped as `{\"data\": ...}`, failures as `{\"error\": \"...\"}`."
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::logout,
        auth::status,
        auth::me,
        // Books
        books::list_books,
        books::get_book,
        books::find_books,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Records
        records::list_borrowed,
        records::get_borrowed,
        records::borrow_book,
        records::extend_deadline,
        records::return_book,
        records::list_overdue,
        records::list_history,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
    ),
    components(
        schemas(
            auth::LoginRequest,
            crate::models::user::Identity,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            crate::models::book::Book,
            crate::models::book::BookQuery,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::book::RemoveBook,
            crate::models::record::RecordResponse,
            crate::models::record::BorrowRequest,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Session endpoints"),
        (name = "books", description = "Catalog"),
        (name = "records", description = "Borrowing, extension and returns"),
        (name = "users", description = "User management")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_lending_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/user/books/{id}"));
        assert!(doc.paths.paths.contains_key("/admin/users"));
        assert!(doc.paths.paths.contains_key("/books/find"));
    }
}
