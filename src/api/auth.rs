//! Authentication endpoints

use axum::{extract::State, Json};
use axum_extra::extract::{
    cookie::{Cookie, CookieJar, SameSite},
    WithRejection,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::{AppError, AppResult}, models::user::Identity, AppState};

use super::{session_token, ApiJson, ApiResponse, CurrentUser, SESSION_COOKIE};

/// Login request
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Authenticate and receive a session cookie
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, `realms_session` cookie set", body = Identity),
        (status = 401, description = "Incorrect password"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Already logged in")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, AppError>,
) -> AppResult<(CookieJar, ApiJson<Identity>)> {
    let (token, identity) = state
        .services
        .auth
        .login(session_token(&jar), &request.username, &request.password)
        .await?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.session.secure_cookie);

    Ok((jar.add(cookie), ApiResponse::new(identity)))
}

/// End the current session
#[utoipa::path(
    get,
    path = "/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out", body = bool),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, ApiJson<bool>)> {
    state.services.auth.logout(session_token(&jar)).await?;
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, ApiResponse::new(true)))
}

/// Whether the caller holds a live session
#[utoipa::path(
    get,
    path = "/status",
    tag = "auth",
    responses(
        (status = 200, description = "Login status", body = bool)
    )
)]
pub async fn status(State(state): State<AppState>, jar: CookieJar) -> AppResult<ApiJson<bool>> {
    let logged_in = state.services.auth.is_logged_in(session_token(&jar)).await?;
    Ok(ApiResponse::new(logged_in))
}

/// Identity of the logged-in user
#[utoipa::path(
    get,
    path = "/user/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = Identity),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn me(CurrentUser(identity): CurrentUser) -> ApiJson<Identity> {
    ApiResponse::new(identity)
}
