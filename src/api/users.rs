//! User management endpoints

use axum::{extract::State, Json};
use axum_extra::extract::WithRejection;

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, Identity, UpdateUser},
    AppState,
};

use super::{AdminUser, ApiJson, ApiResponse, IdParam};

/// List users
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "users",
    responses(
        (status = 200, description = "All users ordered by id", body = Vec<Identity>),
        (status = 401, description = "Not an admin")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<ApiJson<Vec<Identity>>> {
    let users = state.services.users.list_users().await?;
    Ok(ApiResponse::new(users))
}

/// Get user details by ID
#[utoipa::path(
    get,
    path = "/admin/users/{id}",
    tag = "users",
    params(
        ("id" = u32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = Identity),
        (status = 401, description = "Not an admin"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    IdParam(id): IdParam,
) -> AppResult<ApiJson<Identity>> {
    let user = state.services.users.get_user(id).await?;
    Ok(ApiResponse::new(user))
}

/// Create a new user
#[utoipa::path(
    post,
    path = "/admin/users",
    tag = "users",
    request_body = CreateUser,
    responses(
        (status = 200, description = "User created", body = Identity),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not an admin"),
        (status = 409, description = "Username already exists")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    WithRejection(Json(user), _): WithRejection<Json<CreateUser>, AppError>,
) -> AppResult<ApiJson<Identity>> {
    let created = state.services.users.create_user(user).await?;
    tracing::debug!(admin_id = admin.id, user_id = created.id, "User created by admin");
    Ok(ApiResponse::new(created))
}

/// Reset the password and/or change the level of a user
#[utoipa::path(
    patch,
    path = "/admin/users/{id}",
    tag = "users",
    params(
        ("id" = u32, Path, description = "User ID")
    ),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = Identity),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not an admin"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    IdParam(id): IdParam,
    WithRejection(Json(user), _): WithRejection<Json<UpdateUser>, AppError>,
) -> AppResult<ApiJson<Identity>> {
    let updated = state.services.users.update_user(id, user).await?;
    Ok(ApiResponse::new(updated))
}

/// Delete a user along with their records
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    tag = "users",
    params(
        ("id" = u32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deleted", body = bool),
        (status = 401, description = "Not an admin"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    IdParam(id): IdParam,
) -> AppResult<ApiJson<bool>> {
    state.services.users.remove_user(id).await?;
    Ok(ApiResponse::new(true))
}
