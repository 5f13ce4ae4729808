//! Account registration and session routes.
//!
//! Sign-in returns the token in the body and also sets it as cookie `t`.
//! API calls authenticate with `Authorization: Bearer <token>`; the cookie is
//! for browser clients that want to persist the session.

use axum::{
    Json,
    extract::State,
    http::{HeaderValue, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::cookie::{Cookie, SameSite, time};

use crate::error::{Result, add_breadcrumb, clear_sentry_user};
use crate::models::User;
use crate::services::auth::AuthService;
use crate::state::AppState;

use super::{JsonBody, MessageResponse};

/// Name of the cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "t";

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SigninResponse {
    pub token: String,
    pub user: User,
}

/// Register a customer account.
///
/// POST /signup
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> Result<Json<UserResponse>> {
    let auth = AuthService::new(state.pool(), state.tokens());
    let user = auth.signup(&req.name, &req.email, &req.password).await?;

    tracing::info!(user_id = %user.id, "Account created");
    Ok(Json(UserResponse { user }))
}

/// Exchange credentials for a session token.
///
/// POST /signin
pub async fn signin(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SigninRequest>,
) -> Result<Response> {
    let auth = AuthService::new(state.pool(), state.tokens());
    let (token, user) = auth.signin(&req.email, &req.password).await?;

    let user_id = user.id.to_string();
    add_breadcrumb("auth", "Signed in", Some(&[("user_id", user_id.as_str())]));

    let max_age = i64::try_from(state.tokens().ttl().as_secs()).unwrap_or(i64::MAX);
    let cookie = Cookie::build((TOKEN_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age))
        .build();

    Ok(with_cookie(Json(SigninResponse { token, user }), &cookie))
}

/// Clear the session cookie.
///
/// GET /signout
pub async fn signout() -> Response {
    clear_sentry_user();

    let cookie = Cookie::build((TOKEN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::ZERO)
        .build();

    with_cookie(
        Json(MessageResponse {
            message: "Signout success",
        }),
        &cookie,
    )
}

fn with_cookie(body: impl IntoResponse, cookie: &Cookie<'_>) -> Response {
    let mut response = body.into_response();
    if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}
