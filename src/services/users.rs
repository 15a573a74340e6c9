//! Identity and credential service

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::user::{trim_username, CreateUser, Identity, NewUser, UpdateUser, User},
    repository::UsersStore,
};

#[derive(Clone)]
pub struct UsersService {
    users: Arc<dyn UsersStore>,
}

impl UsersService {
    pub fn new(users: Arc<dyn UsersStore>) -> Self {
        Self { users }
    }

    /// Create a new user; the credential is stored hashed
    pub async fn create_user(&self, input: CreateUser) -> AppResult<Identity> {
        let username = trim_username(&input.username);
        if username.is_empty() {
            return Err(AppError::InvalidInput("username required".to_string()));
        }
        input.validate()?;
        if !input.level.is_assignable_on_creation() {
            return Err(AppError::InvalidInput(
                "level must be between 1 and 3".to_string(),
            ));
        }

        if self.users.username_exists(username).await? {
            return Err(AppError::DuplicateUsername);
        }

        let user = self
            .users
            .create(NewUser {
                username: username.to_string(),
                password_hash: self.hash_password(&input.password)?,
                level: input.level,
            })
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, level = %user.level, "Added user");
        Ok(user.identity())
    }

    /// Check a username/password pair and return the matching identity
    pub async fn verify_credential(&self, username: &str, password: &str) -> AppResult<Identity> {
        let user = self
            .users
            .get_by_username(trim_username(username))
            .await?
            .ok_or(AppError::UserNotFound)?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::CredentialMismatch);
        }

        Ok(user.identity())
    }

    /// Look a user up without failing when it is gone
    pub async fn find(&self, id: i32) -> AppResult<Option<User>> {
        self.users.get_by_id(id).await
    }

    /// Get user by ID
    pub async fn get_user(&self, id: i32) -> AppResult<Identity> {
        self.users
            .get_by_id(id)
            .await?
            .map(|u| u.identity())
            .ok_or(AppError::UserNotFound)
    }

    /// All users
    pub async fn list_users(&self) -> AppResult<Vec<Identity>> {
        Ok(self
            .users
            .list()
            .await?
            .into_iter()
            .map(Identity::from)
            .collect())
    }

    /// Reset the credential and/or change the level of a user
    pub async fn update_user(&self, id: i32, input: UpdateUser) -> AppResult<Identity> {
        let password_hash = match input.password.as_deref() {
            Some("") => return Err(AppError::InvalidInput("password required".to_string())),
            Some(password) => Some(self.hash_password(password)?),
            None => None,
        };

        let user = self
            .users
            .update(id, password_hash, input.level)
            .await?
            .ok_or(AppError::UserNotFound)?;

        tracing::info!(user_id = user.id, level = %user.level, "Updated user");
        Ok(user.identity())
    }

    /// Delete a user
    pub async fn remove_user(&self, id: i32) -> AppResult<()> {
        if !self.users.delete(id).await? {
            return Err(AppError::UserNotFound);
        }
        tracing::info!(user_id = id, "Removed user");
        Ok(())
    }

    /// Verify user password
    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }
}
