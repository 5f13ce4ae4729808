//! Profile routes. Every route here requires the caller to own `{user_id}`.

use axum::{Json, extract::State};
use serde::Deserialize;

use crate::db::OrderRepository;
use crate::error::Result;
use crate::middleware::RequireOwner;
use crate::models::{Order, User};
use crate::services::auth::AuthService;
use crate::state::AppState;

use super::JsonBody;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: String,
    /// Leave out (or send empty) to keep the current password.
    pub password: Option<String>,
}

/// GET /user/{user_id}
pub async fn read(RequireOwner(user): RequireOwner) -> Json<User> {
    Json(user)
}

/// PUT /user/{user_id}
pub async fn update(
    State(state): State<AppState>,
    RequireOwner(user): RequireOwner,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> Result<Json<User>> {
    let auth = AuthService::new(state.pool(), state.tokens());
    let updated = auth
        .update_profile(user.id, &req.name, req.password.as_deref())
        .await?;
    Ok(Json(updated))
}

/// Orders placed by the user, newest first.
///
/// GET /orders/by/user/{user_id}
pub async fn purchase_history(
    State(state): State<AppState>,
    RequireOwner(user): RequireOwner,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list_by_user(user.id)
        .await?;
    Ok(Json(orders))
}
