//! Authentication service
//!
//! Provides password hashing with Argon2, account management and
//! email-based password resets.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{PasswordResetRepository, UserRepository};
use crate::models::{RegisterRequest, ResetPasswordRequest, UpdateProfileRequest, User, UserRole};

const RESET_TOKEN_LEN: usize = 48;

/// Reasons an account cannot be created
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Username already exists")]
    UsernameTaken,
    #[error("Email already exists")]
    EmailTaken,
    #[error("ID number already registered")]
    IdNumberTaken,
    #[error("Account not found")]
    NotFound,
    #[error("Invalid or expired reset code")]
    InvalidResetToken,
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Authentication service for user management
pub struct AuthService {
    pool: SqlitePool,
    password_min_length: usize,
}

impl AuthService {
    pub fn new(pool: SqlitePool, password_min_length: usize) -> Self {
        Self {
            pool,
            password_min_length,
        }
    }

    /// Hash a password using Argon2id
    pub fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();
        Ok(password_hash)
    }

    /// Verify a password against a hash
    pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Authenticate a user by username and password
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        let user = UserRepository::new(&self.pool)
            .get_by_username(username)
            .await?;

        match user {
            Some(user) => {
                if Self::verify_password(password, &user.password_hash)? {
                    Ok(Some(user))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    /// Self-service registration; the role is always `student`
    pub async fn register(&self, req: &RegisterRequest) -> Result<User, AccountError> {
        let mut user = self
            .new_account(&req.username, &req.email, &req.password, UserRole::Student)
            .await?;
        user.full_name = req.full_name.trim().to_string();
        user.id_number = req.id_number.clone().filter(|s| !s.trim().is_empty());
        user.faculty = req.faculty.clone().filter(|s| !s.trim().is_empty());
        user.phone = req.phone.clone().filter(|s| !s.trim().is_empty());

        UserRepository::new(&self.pool).insert(&user).await?;
        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Operator-created administrator
    pub async fn create_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AccountError> {
        let user = self
            .new_account(username, email, password, UserRole::Admin)
            .await?;
        UserRepository::new(&self.pool).insert(&user).await?;
        info!(user_id = %user.id, username = %user.username, "Administrator created");
        Ok(user)
    }

    /// Apply a self-service profile edit
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        req: &UpdateProfileRequest,
    ) -> Result<User, AccountError> {
        let repo = UserRepository::new(&self.pool);
        let mut user = repo.get_by_id(user_id).await?.ok_or(AccountError::NotFound)?;
        req.apply(&mut user);

        if let Some(other) = repo.get_by_email(&user.email).await? {
            if other.id != user.id {
                return Err(AccountError::EmailTaken);
            }
        }
        if let Some(ref id_number) = user.id_number {
            if let Some(other) = repo.get_by_id_number(id_number).await? {
                if other.id != user.id {
                    return Err(AccountError::IdNumberTaken);
                }
            }
        }

        user.updated_at = Utc::now();
        repo.update_profile(&user).await?;
        info!(user_id = %user.id, "Profile updated");
        Ok(user)
    }

    /// Issue a reset code for the account matching `identifier`
    ///
    /// Returns `None` for unknown accounts; callers must answer the same
    /// way in both cases.
    pub async fn request_password_reset(
        &self,
        identifier: &str,
        valid_for: Duration,
    ) -> Result<Option<(User, String, DateTime<Utc>)>> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(None);
        }

        let Some(user) = UserRepository::new(&self.pool)
            .find_by_email_or_id_number(identifier)
            .await?
        else {
            info!("Password reset requested for an unknown account");
            return Ok(None);
        };

        let token = generate_reset_token();
        let expires_at = Utc::now() + valid_for;
        PasswordResetRepository::new(&self.pool)
            .issue(user.id, &token, expires_at)
            .await
            .context("Failed to issue reset code")?;

        info!(user_id = %user.id, "Password reset code issued");
        Ok(Some((user, token, expires_at)))
    }

    /// Set a new password with a reset code; the code is spent on success
    pub async fn reset_password(&self, req: &ResetPasswordRequest) -> Result<Uuid, AccountError> {
        let token = req.token.trim();
        if token.is_empty() {
            return Err(AccountError::InvalidResetToken);
        }
        if req.new_password.chars().count() < self.password_min_length {
            return Err(AccountError::Invalid(format!(
                "new_password: must be at least {} characters",
                self.password_min_length
            )));
        }
        if req.new_password != req.confirm_password {
            return Err(AccountError::Invalid(
                "confirm_password: passwords do not match".to_string(),
            ));
        }

        let password_hash = Self::hash_password(&req.new_password)?;
        match PasswordResetRepository::new(&self.pool)
            .redeem(token, &password_hash, Utc::now())
            .await?
        {
            Some(user_id) => {
                info!(user_id = %user_id, "Password reset");
                Ok(user_id)
            }
            None => {
                warn!("Password reset attempted with an invalid code");
                Err(AccountError::InvalidResetToken)
            }
        }
    }

    async fn new_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> Result<User, AccountError> {
        let username = username.trim();
        let email = email.trim();

        if !crate::utils::validation::validate_username(username) {
            return Err(AccountError::Invalid(
                "username must start with a letter and contain only letters, digits, '.', '_' or '-'"
                    .to_string(),
            ));
        }
        if password.chars().count() < self.password_min_length {
            return Err(AccountError::Invalid(format!(
                "password must be at least {} characters",
                self.password_min_length
            )));
        }

        let repo = UserRepository::new(&self.pool);
        if repo.get_by_username(username).await?.is_some() {
            return Err(AccountError::UsernameTaken);
        }
        if repo.get_by_email(email).await?.is_some() {
            return Err(AccountError::EmailTaken);
        }

        let password_hash = Self::hash_password(password)?;
        Ok(User::new(
            username.to_string(),
            email.to_string(),
            String::new(),
            password_hash,
            role,
        ))
    }
}

fn generate_reset_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LEN)
        .map(char::from)
        .collect()
}
