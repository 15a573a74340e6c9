//! Catalog endpoints

use axum::{extract::State, Json};
use axum_extra::extract::WithRejection;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, RemoveBook, UpdateBook},
    AppState,
};

use super::{AdminUser, ApiJson, ApiResponse, IdParam, OptionalJson};

/// List every book
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    responses(
        (status = 200, description = "All books ordered by id", body = Vec<Book>)
    )
)]
pub async fn list_books(State(state): State<AppState>) -> AppResult<ApiJson<Vec<Book>>> {
    let books = state.services.catalog.list_books().await?;
    Ok(ApiResponse::new(books))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = u32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    IdParam(id): IdParam,
) -> AppResult<ApiJson<Book>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(ApiResponse::new(book))
}

/// Search by title substring, exact author and exact ISBN
#[utoipa::path(
    post,
    path = "/books/find",
    tag = "books",
    request_body = BookQuery,
    responses(
        (status = 200, description = "Matching books ordered by id", body = Vec<Book>)
    )
)]
pub async fn find_books(
    State(state): State<AppState>,
    WithRejection(Json(query), _): WithRejection<Json<BookQuery>, AppError>,
) -> AppResult<ApiJson<Vec<Book>>> {
    let books = state.services.catalog.find(&query).await?;
    Ok(ApiResponse::new(books))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/admin/books",
    tag = "books",
    request_body = CreateBook,
    responses(
        (status = 200, description = "Book created", body = Book),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not an admin")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    WithRejection(Json(book), _): WithRejection<Json<CreateBook>, AppError>,
) -> AppResult<ApiJson<Book>> {
    let created = state.services.catalog.add_book(book).await?;
    Ok(ApiResponse::new(created))
}

/// Update the supplied fields of a book
#[utoipa::path(
    patch,
    path = "/admin/books/{id}",
    tag = "books",
    params(
        ("id" = u32, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 401, description = "Not an admin"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    IdParam(id): IdParam,
    WithRejection(Json(patch), _): WithRejection<Json<UpdateBook>, AppError>,
) -> AppResult<ApiJson<Book>> {
    let book = state.services.catalog.update_book(id, patch).await?;
    Ok(ApiResponse::new(book))
}

/// Remove a book, optionally explaining why
#[utoipa::path(
    delete,
    path = "/admin/books/{id}",
    tag = "books",
    params(
        ("id" = u32, Path, description = "Book ID")
    ),
    request_body = RemoveBook,
    responses(
        (status = 200, description = "Book removed", body = bool),
        (status = 401, description = "Not an admin"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    IdParam(id): IdParam,
    OptionalJson(body): OptionalJson<RemoveBook>,
) -> AppResult<ApiJson<bool>> {
    let message = body.and_then(|body| body.message);
    state
        .services
        .catalog
        .remove_book(id, message.as_deref())
        .await?;
    Ok(ApiResponse::new(true))
}
