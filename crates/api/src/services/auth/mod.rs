//! Authentication service.
//!
//! Password accounts with Argon2id hashes and signed session tokens.

mod error;
pub mod token;

pub use error::AuthError;
pub use token::{TokenError, TokenKeys};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use larder_core::{Email, Role, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Authentication service.
///
/// Handles registration, login and profile credential updates.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: &'a TokenKeys,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tokens: &'a TokenKeys) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens,
        }
    }

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NameRequired` if the name is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError> {
        let name = validate_name(name)?;
        let email = Email::parse(email)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        self.users
            .create(name, &email, &password_hash, Role::Customer)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Log in with email and password, issuing a session token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account has the email.
    /// Returns `AuthError::InvalidCredentials` if the password is wrong.
    pub async fn signin(&self, email: &str, password: &str) -> Result<(String, User), AuthError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        verify_password(password, &password_hash)?;

        let token = self.tokens.issue(user.id)?;
        Ok((token, user))
    }

    /// Update a user's name and optionally their password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NameRequired` if the name is blank.
    /// Returns `AuthError::WeakPassword` if a new password is too short.
    /// Returns `AuthError::Repository` if the user doesn't exist or the update fails.
    pub async fn update_profile(
        &self,
        id: UserId,
        name: &str,
        password: Option<&str>,
    ) -> Result<User, AuthError> {
        let name = validate_name(name)?;

        let password_hash = match password.filter(|p| !p.is_empty()) {
            Some(password) => {
                if password.chars().count() < MIN_PASSWORD_LENGTH {
                    return Err(AuthError::WeakPassword(
                        "Password should be min 6 characters long".to_string(),
                    ));
                }
                Some(hash_password(password)?)
            }
            None => None,
        };

        Ok(self
            .users
            .update(id, name, password_hash.as_deref())
            .await?)
    }
}

fn validate_name(name: &str) -> Result<&str, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::NameRequired);
    }
    Ok(name)
}

/// Validate password meets signup requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must contain at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AuthError::WeakPassword(
            "Password must contain a number".to_string(),
        ));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_rules() {
        assert!(validate_password("abc12").is_err());
        assert_eq!(
            validate_password("abcdef").unwrap_err().to_string(),
            "Password must contain a number"
        );
        assert!(validate_password("abcde1").is_ok());
    }

    #[test]
    fn test_name_is_trimmed_and_required() {
        assert_eq!(validate_name("  Ada ").unwrap(), "Ada");
        assert!(matches!(validate_name("  "), Err(AuthError::NameRequired)));
    }

    #[test]
    fn test_hash_is_salted_and_verifies() {
        let first = hash_password("secret1").unwrap();
        let second = hash_password("secret1").unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with("$argon2id$"));
        assert!(verify_password("secret1", &first).is_ok());
        assert!(matches!(
            verify_password("secret2", &first),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
