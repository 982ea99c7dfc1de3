//! Authentication abstractions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
    #[error("Password must be at least {} characters", MIN_PASSWORD_LEN)]
    WeakPassword,
    #[error("An account already exists for {0}")]
    EmailInUse(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Not signed in")]
    NotSignedIn,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Creates an account and signs it in.
    async fn register(&self, email: &str, password: &str) -> AuthResult<User>;

    async fn login(&self, email: &str, password: &str) -> AuthResult<User>;

    async fn current_user(&self) -> AuthResult<Option<User>>;

    async fn sign_out(&self) -> AuthResult<()>;

    /// The signed-in user or [`AuthError::NotSignedIn`].
    async fn require_user(&self) -> AuthResult<User> {
        self.current_user().await?.ok_or(AuthError::NotSignedIn)
    }
}

/// Basic shape check: one `@` with a non-empty local part and a dotted domain.
pub fn validate_email(email: &str) -> AuthResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(AuthError::InvalidEmail(email))
    }
}
