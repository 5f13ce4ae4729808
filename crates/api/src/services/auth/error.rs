//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

use super::token::TokenError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("{0}")]
    InvalidEmail(#[from] larder_core::EmailError),

    /// Name missing or blank.
    #[error("Name is required")]
    NameRequired,

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    /// No account has this email.
    #[error("User not found. Please create account!")]
    UserNotFound,

    /// Wrong password for an existing account.
    #[error("Email and password don't match")]
    InvalidCredentials,

    /// User already exists.
    #[error("Email already exists")]
    UserAlreadyExists,

    /// Session token could not be issued or verified.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
