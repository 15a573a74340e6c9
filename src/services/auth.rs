//! Login, logout and the authorization gate

use crate::{
    error::{AppError, AppResult},
    models::user::Identity,
    services::{sessions::SessionService, users::UsersService},
};

#[derive(Clone)]
pub struct AuthService {
    sessions: SessionService,
    users: UsersService,
}

impl AuthService {
    pub fn new(sessions: SessionService, users: UsersService) -> Self {
        Self { sessions, users }
    }

    /// Authenticate and open a session, returning the new token
    pub async fn login(
        &self,
        current: Option<&str>,
        username: &str,
        password: &str,
    ) -> AppResult<(String, Identity)> {
        if self.sessions.current_identity(current).await?.is_some() {
            return Err(AppError::AlreadyActive);
        }

        let identity = self.users.verify_credential(username, password).await?;
        let token = self.sessions.begin_session(current, identity.id).await?;

        tracing::info!(user_id = identity.id, username = %identity.username, "User logged in");
        Ok((token, identity))
    }

    pub async fn logout(&self, token: Option<&str>) -> AppResult<()> {
        self.sessions.end_session(token).await?;
        tracing::info!("User logged out");
        Ok(())
    }

    /// Whether `token` designates a live session
    pub async fn is_logged_in(&self, token: Option<&str>) -> AppResult<bool> {
        Ok(self.sessions.current_identity(token).await?.is_some())
    }

    /// Resolve the caller, any failure collapses into `Unauthorized`
    pub async fn require_user(&self, token: Option<&str>) -> AppResult<Identity> {
        let user_id = match self.sessions.current_identity(token).await {
            Ok(Some(id)) => id,
            Ok(None) => return Err(AppError::Unauthorized),
            Err(e) => {
                tracing::warn!("Session lookup failed: {}", e);
                return Err(AppError::Unauthorized);
            }
        };

        match self.users.find(user_id).await {
            Ok(Some(user)) => Ok(user.identity()),
            Ok(None) => Err(AppError::Unauthorized),
            Err(e) => {
                tracing::warn!(user_id, "User lookup failed: {}", e);
                Err(AppError::Unauthorized)
            }
        }
    }

    /// Like `require_user`, and the caller must be an admin
    pub async fn require_admin(&self, token: Option<&str>) -> AppResult<Identity> {
        let identity = self.require_user(token).await?;
        if !identity.is_admin() {
            return Err(AppError::Unauthorized);
        }
        Ok(identity)
    }
}
