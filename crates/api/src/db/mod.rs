//! Database operations for the Larder `PostgreSQL` store.
//!
//! ## Tables (schema `larder`)
//!
//! - `user` - Accounts, password hashes, roles and purchase history (JSONB)
//! - `category` - Product categories (unique names)
//! - `product` - Catalog entries with an optional inline image blob
//! - `customer_order` - Placed orders
//! - `order_item` - Line item snapshots belonging to an order
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p larder-cli -- migrate
//! ```

pub mod categories;
pub mod orders;
pub mod products;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use categories::CategoryRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("{0}")]
    Conflict(String),

    /// A referenced row does not exist (e.g., unknown category).
    #[error("{0}")]
    InvalidReference(String),
}

impl RepositoryError {
    /// Classify a write error, turning constraint violations into
    /// client-facing messages such as `"Email already exists"`.
    pub(crate) fn from_write(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                let field = db_err
                    .constraint()
                    .and_then(field_from_constraint)
                    .unwrap_or("value");
                return Self::Conflict(format!("{} already exists", capitalize(field)));
            }
            if db_err.is_foreign_key_violation() {
                let field = db_err
                    .constraint()
                    .and_then(field_from_constraint)
                    .unwrap_or("reference");
                return Self::InvalidReference(format!("Unknown {field}"));
            }
        }
        Self::Database(e)
    }
}

/// Column name from a `<table>_<column>_key` / `<table>_<column>_fkey`
/// constraint name.
fn field_from_constraint(constraint: &str) -> Option<&str> {
    let base = constraint
        .strip_suffix("_fkey")
        .or_else(|| constraint.strip_suffix("_key"))?;
    let base = base.strip_suffix("_id").unwrap_or(base);
    let (_, column) = base.rsplit_once('_')?;
    (!column.is_empty()).then_some(column)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_from_unique_constraint() {
        assert_eq!(field_from_constraint("user_email_key"), Some("email"));
        assert_eq!(field_from_constraint("category_name_key"), Some("name"));
    }

    #[test]
    fn test_field_from_foreign_key_constraint() {
        assert_eq!(
            field_from_constraint("product_category_id_fkey"),
            Some("category")
        );
    }

    #[test]
    fn test_field_from_unrecognized_constraint() {
        assert_eq!(field_from_constraint("some_check"), None);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("email"), "Email");
        assert_eq!(capitalize(""), "");
    }
}
