//! API handlers for REALMS REST endpoints

pub mod auth;
pub mod books;
pub mod health;
pub mod openapi;
pub mod records;
pub mod users;

use axum::{
    async_trait,
    body::Bytes,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{error::AppError, models::user::Identity, AppState};

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "realms_session";

/// Success envelope, every successful body is `{"data": ...}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Json<Self> {
        Json(Self { data })
    }
}

pub type ApiJson<T> = Json<ApiResponse<T>>;

/// Session token presented by the caller, if any
pub fn session_token(jar: &CookieJar) -> Option<&str> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value())
        .filter(|token| !token.is_empty())
}

/// Caller holding a live session on an existing account
pub struct CurrentUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let identity = state
            .services
            .auth
            .require_user(session_token(&jar))
            .await?;
        Ok(CurrentUser(identity))
    }
}

/// Caller holding a live session on an admin account
pub struct AdminUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let identity = state
            .services
            .auth
            .require_admin(session_token(&jar))
            .await?;
        Ok(AdminUser(identity))
    }
}

/// Numeric id taken from the `:id` path segment.
///
/// Ids are unsigned on the wire; anything else is rejected as invalid
/// input rather than with axum's plain-text rejection.
#[derive(Debug, Clone, Copy)]
pub struct IdParam(pub i32);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for IdParam {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::InvalidInput("missing id".to_string()))?;
        parse_id(&raw).map(IdParam)
    }
}

pub fn parse_id(raw: &str) -> Result<i32, AppError> {
    raw.parse::<u32>()
        .ok()
        .and_then(|id| i32::try_from(id).ok())
        .ok_or_else(|| AppError::InvalidInput(format!("invalid id: {}", raw)))
}

/// JSON body that may be left out entirely.
///
/// An empty body yields `None`; anything else must decode as `T`.
#[derive(Debug)]
pub struct OptionalJson<T>(pub Option<T>);

#[async_trait]
impl<T, S> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::InvalidInput(e.body_text()))?;
        decode_optional(&bytes).map(OptionalJson)
    }
}

fn decode_optional<T: DeserializeOwned>(bytes: &[u8]) -> Result<Option<T>, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let Json(value) = Json::<T>::from_bytes(bytes)?;
    Ok(Some(value))
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}
