//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`,
//! and every error body has the shape `{"error": "<message>"}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use larder_core::search::FilterError;

use crate::db::RepositoryError;
use crate::models::product::ProductInputError;
use crate::services::auth::{AuthError, TokenError};
use crate::services::checkout::CheckoutError;
use crate::services::payment::PaymentError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Payment processor operation failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Order placement failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Listing or search query was invalid.
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    /// Product form failed validation.
    #[error("Product input error: {0}")]
    Product(#[from] ProductInputError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error is the server's fault and should reach Sentry.
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Database(err) | Self::Auth(AuthError::Repository(err)) => matches!(
                err,
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_)
            ),
            Self::Auth(AuthError::PasswordHash | AuthError::Token(TokenError::Signing(_)))
            | Self::Payment(
                PaymentError::Http(_) | PaymentError::Api { .. } | PaymentError::Parse(_),
            )
            | Self::Checkout(
                CheckoutError::OrderNotStored { .. }
                | CheckoutError::InventoryNotAdjusted { .. }
                | CheckoutError::Saga(_),
            )
            | Self::Internal(_) => true,
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) | Self::Auth(AuthError::Repository(err)) => repository_status(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::Token(TokenError::Invalid(_)) => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::PasswordHash | AuthError::Token(TokenError::Signing(_)) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Payment(PaymentError::Rejected(_)) => StatusCode::PAYMENT_REQUIRED,
            Self::Payment(_) => StatusCode::BAD_GATEWAY,
            Self::Checkout(CheckoutError::Saga(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Checkout(_) | Self::Filter(_) | Self::Product(_) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Message safe to show the client. Never contains driver or upstream
    /// error text.
    fn client_message(&self) -> String {
        match self {
            Self::Database(err) | Self::Auth(AuthError::Repository(err)) => match err {
                RepositoryError::Conflict(msg) | RepositoryError::InvalidReference(msg) => {
                    msg.clone()
                }
                RepositoryError::NotFound => "Not found".to_string(),
                _ => "Internal server error".to_string(),
            },
            Self::Auth(AuthError::PasswordHash | AuthError::Token(TokenError::Signing(_)))
            | Self::Internal(_)
            | Self::Checkout(CheckoutError::Saga(_)) => "Internal server error".to_string(),
            Self::Auth(err) => err.to_string(),
            Self::Payment(PaymentError::Rejected(msg)) => msg.clone(),
            Self::Payment(_) => "Payment processor error".to_string(),
            Self::Checkout(err) => err.to_string(),
            Self::Filter(err) => err.to_string(),
            Self::Product(err) => err.to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg) => msg.clone(),
        }
    }
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) | RepositoryError::InvalidReference(_) => {
            StatusCode::BAD_REQUEST
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = serde_json::json!({ "error": self.client_message() });
        (self.status(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Order placed", Some(&[("order_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_error_statuses() {
        assert_eq!(
            get_status(AppError::Auth(AuthError::UserNotFound)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::UserAlreadyExists)),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_conflict_is_client_error_with_message() {
        let err = AppError::Database(RepositoryError::Conflict(
            "Name already exists".to_string(),
        ));
        assert!(!err.is_server_error());
        assert_eq!(err.client_message(), "Name already exists");
        assert_eq!(get_status(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_database_details_hidden() {
        let err = AppError::Database(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        assert!(err.is_server_error());
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_checkout_inventory_message() {
        let err = AppError::Checkout(CheckoutError::InventoryNotAdjusted {
            order_id: larder_core::OrderId::new(1),
            source: RepositoryError::NotFound,
        });
        assert_eq!(err.client_message(), "Could not update product");
        assert_eq!(get_status(err), StatusCode::BAD_REQUEST);
    }
}
