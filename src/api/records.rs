//! Borrowing endpoints, always scoped to the logged-in user

use axum::extract::State;

use crate::{
    error::AppResult,
    models::record::{BorrowRecord, BorrowRequest, RecordResponse},
    AppState,
};

use super::{ApiJson, ApiResponse, CurrentUser, IdParam, OptionalJson};

/// Books currently borrowed by the caller
#[utoipa::path(
    get,
    path = "/user/books",
    tag = "records",
    responses(
        (status = 200, description = "Active records, earliest deadline first", body = Vec<RecordResponse>),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn list_borrowed(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<ApiJson<Vec<BorrowRecord>>> {
    let records = state.services.lending.list_active(user.id).await?;
    Ok(ApiResponse::new(records))
}

/// Active record of one book, used to check its deadline
#[utoipa::path(
    get,
    path = "/user/books/{id}",
    tag = "records",
    params(
        ("id" = u32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Active record", body = RecordResponse),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "Book not borrowed")
    )
)]
pub async fn get_borrowed(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    IdParam(book_id): IdParam,
) -> AppResult<ApiJson<BorrowRecord>> {
    let record = state.services.lending.get_active(user.id, book_id).await?;
    Ok(ApiResponse::new(record))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/user/books/{id}",
    tag = "records",
    params(
        ("id" = u32, Path, description = "Book ID")
    ),
    request_body = BorrowRequest,
    responses(
        (status = 200, description = "Book borrowed", body = RecordResponse),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book already borrowed"),
        (status = 422, description = "Too many overdue books")
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    IdParam(book_id): IdParam,
    OptionalJson(body): OptionalJson<BorrowRequest>,
) -> AppResult<ApiJson<BorrowRecord>> {
    let borrow_date = body.and_then(|body| body.borrow_date);
    let record = state
        .services
        .lending
        .borrow(user.id, book_id, borrow_date)
        .await?;
    Ok(ApiResponse::new(record))
}

/// Extend the deadline of a borrowed book
#[utoipa::path(
    patch,
    path = "/user/books/{id}",
    tag = "records",
    params(
        ("id" = u32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Deadline extended", body = RecordResponse),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "Record not found"),
        (status = 422, description = "Extended too many times")
    )
)]
pub async fn extend_deadline(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    IdParam(book_id): IdParam,
) -> AppResult<ApiJson<BorrowRecord>> {
    let record = state
        .services
        .lending
        .extend_deadline(user.id, book_id)
        .await?;
    Ok(ApiResponse::new(record))
}

/// Return a borrowed book
#[utoipa::path(
    delete,
    path = "/user/books/{id}",
    tag = "records",
    params(
        ("id" = u32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = RecordResponse),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    IdParam(book_id): IdParam,
) -> AppResult<ApiJson<BorrowRecord>> {
    let record = state.services.lending.return_book(user.id, book_id).await?;
    Ok(ApiResponse::new(record))
}

/// Borrowed books past their deadline
#[utoipa::path(
    get,
    path = "/user/overdue",
    tag = "records",
    responses(
        (status = 200, description = "Overdue records, earliest deadline first", body = Vec<RecordResponse>),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn list_overdue(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<ApiJson<Vec<BorrowRecord>>> {
    let records = state.services.lending.list_overdue(user.id).await?;
    Ok(ApiResponse::new(records))
}

/// Every record of the caller, returned books included
#[utoipa::path(
    get,
    path = "/user/history",
    tag = "records",
    responses(
        (status = 200, description = "All records ordered by deadline", body = Vec<RecordResponse>),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn list_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<ApiJson<Vec<BorrowRecord>>> {
    let records = state.services.lending.list_history(user.id).await?;
    Ok(ApiResponse::new(records))
}
