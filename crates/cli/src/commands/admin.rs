//! Admin account commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a new admin account
//! larder-cli admin create -e admin@example.com -n "Admin Name" -p 's3cret-pass'
//!
//! # Grant admin to an existing customer
//! larder-cli admin promote -e customer@example.com
//! ```

use larder_api::db::{RepositoryError, UserRepository};
use larder_api::services::auth::{MIN_PASSWORD_LENGTH, hash_password};
use larder_core::{Email, Role, UserId};

use super::{CommandError, connect};

/// Create a new admin account.
///
/// # Errors
///
/// Returns an error if the input is invalid, the email is taken, or the
/// database is unreachable.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<UserId, CommandError> {
    let email = Email::parse(email).map_err(|e| CommandError::Account(e.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CommandError::Account("Name is required".to_owned()));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(CommandError::Account(format!(
            "Password must contain at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    let password_hash = hash_password(password).map_err(|e| CommandError::Account(e.to_string()))?;

    let pool = connect().await?;
    tracing::info!("Creating admin user: {}", email);

    let user = UserRepository::new(&pool)
        .create(name, &email, &password_hash, Role::Admin)
        .await
        .map_err(account_error)?;

    tracing::info!("Admin user created successfully! ID: {}, Email: {}", user.id, user.email);
    Ok(user.id)
}

/// Grant the admin role to an existing account.
///
/// # Errors
///
/// Returns an error if no account has the email or the database is
/// unreachable.
pub async fn promote(email: &str) -> Result<UserId, CommandError> {
    let email = Email::parse(email).map_err(|e| CommandError::Account(e.to_string()))?;

    let pool = connect().await?;
    let user = UserRepository::new(&pool)
        .set_role(&email, Role::Admin)
        .await
        .map_err(account_error)?;

    tracing::info!("Promoted {} (ID: {}) to admin", user.email, user.id);
    Ok(user.id)
}

fn account_error(e: RepositoryError) -> CommandError {
    match e {
        RepositoryError::Database(db) => CommandError::Database(db),
        RepositoryError::NotFound => CommandError::Account("No account with that email".to_owned()),
        other => CommandError::Account(other.to_string()),
    }
}
