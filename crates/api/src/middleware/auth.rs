//! Authentication and authorization extractors.
//!
//! Routes that act on a user's resources carry the owner's id as a
//! `{user_id}` path parameter. The extractors here verify the bearer token,
//! load that owner, and apply [`authorize`].
//!
//! # Example
//!
//! ```rust,ignore
//! async fn handler(RequireAdmin(admin): RequireAdmin) -> impl IntoResponse {
//!     format!("Hello, {}!", admin.name)
//! }
//! ```

use std::collections::HashMap;

use axum::{
    extract::{FromRequestParts, Path},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use larder_core::UserId;
use larder_core::authz::{Access, Decision, DenyReason, Identity, ResourceOwner, authorize};

use crate::db::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::state::AppState;

/// Path parameter naming the resource owner.
const USER_ID_PARAM: &str = "user_id";

/// Extractor that requires a valid session token.
pub struct RequireSignin(pub Identity);

impl FromRequestParts<AppState> for RequireSignin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            AppError::Unauthorized(DenyReason::Unauthenticated.message().to_string())
        })?;

        let identity = state
            .tokens()
            .verify(token)
            .map_err(|e| AppError::Unauthorized(e.to_string()))?;

        Ok(Self(identity))
    }
}

/// Extractor that requires the caller to be the `{user_id}` owner.
///
/// Yields the owner's profile.
pub struct RequireOwner(pub User);

impl FromRequestParts<AppState> for RequireOwner {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authorized_owner(parts, state, Access::Owner).await.map(Self)
    }
}

/// Extractor that requires the caller to be the `{user_id}` owner and the
/// owner to be an admin.
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authorized_owner(parts, state, Access::Admin).await.map(Self)
    }
}

async fn authorized_owner(
    parts: &mut Parts,
    state: &AppState,
    access: Access,
) -> Result<User, AppError> {
    let RequireSignin(identity) = RequireSignin::from_request_parts(parts, state).await?;

    let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
        .await
        .map_err(|_| AppError::BadRequest("User not found".to_string()))?;
    let owner_id: UserId = params
        .get(USER_ID_PARAM)
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| AppError::BadRequest("User not found".to_string()))?;

    let owner = UserRepository::new(state.pool())
        .get_by_id(owner_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("User not found".to_string()))?;

    let resource = ResourceOwner {
        id: owner.id,
        role: owner.role,
    };
    match authorize(Some(&identity), &resource, access) {
        Decision::Allow => {
            set_sentry_user(&owner.id, Some(owner.email.as_str()));
            Ok(owner)
        }
        Decision::Deny(reason) => Err(AppError::Forbidden(reason.message().to_string())),
    }
}

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
    }

    #[test]
    fn test_bearer_token_missing_or_malformed() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
    }
}
