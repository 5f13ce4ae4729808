//! Category routes. Writes require an admin `{user_id}`.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use larder_core::CategoryId;

use crate::db::{CategoryRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Category;
use crate::models::category::MAX_CATEGORY_NAME;
use crate::state::AppState;

use super::{JsonBody, MessageResponse, parse_id};

const CATEGORY_MISSING: &str = "Category does not exist";

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub data: Category,
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    if name.chars().count() > MAX_CATEGORY_NAME {
        return Err(AppError::BadRequest(format!(
            "Name must be at most {MAX_CATEGORY_NAME} characters"
        )));
    }
    Ok(name)
}

fn missing_as_bad_request(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::BadRequest(CATEGORY_MISSING.to_string()),
        other => other.into(),
    }
}

/// POST /category/create/{user_id}
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    JsonBody(req): JsonBody<CategoryRequest>,
) -> Result<Json<CategoryResponse>> {
    let name = validate_name(&req.name)?;
    let category = CategoryRepository::new(state.pool()).create(name).await?;

    tracing::info!(category_id = %category.id, admin_id = %admin.id, "Category created");
    Ok(Json(CategoryResponse { data: category }))
}

/// GET /category/{category_id}
pub async fn read(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
) -> Result<Json<Category>> {
    let id: CategoryId = parse_id(&category_id, CATEGORY_MISSING)?;
    CategoryRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::BadRequest(CATEGORY_MISSING.to_string()))
}

/// PUT /category/{category_id}/{user_id}
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path((category_id, _)): Path<(String, String)>,
    JsonBody(req): JsonBody<CategoryRequest>,
) -> Result<Json<Category>> {
    let id: CategoryId = parse_id(&category_id, CATEGORY_MISSING)?;
    let name = validate_name(&req.name)?;
    let category = CategoryRepository::new(state.pool())
        .update(id, name)
        .await
        .map_err(missing_as_bad_request)?;
    Ok(Json(category))
}

/// Delete a category with no products.
///
/// DELETE /category/{category_id}/{user_id}
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path((category_id, _)): Path<(String, String)>,
) -> Result<Json<MessageResponse>> {
    let id: CategoryId = parse_id(&category_id, CATEGORY_MISSING)?;
    let category = CategoryRepository::new(state.pool())
        .remove(id)
        .await
        .map_err(missing_as_bad_request)?;

    tracing::info!(category_id = %category.id, admin_id = %admin.id, "Category deleted");
    Ok(Json(MessageResponse {
        message: "Category deleted",
    }))
}

/// GET /categories
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(CategoryRepository::new(state.pool()).list().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_rules() {
        assert!(validate_name("   ").is_err());
        assert_eq!(validate_name(" Tea ").ok(), Some("Tea"));
        assert!(validate_name(&"x".repeat(MAX_CATEGORY_NAME)).is_ok());
        assert!(validate_name(&"x".repeat(MAX_CATEGORY_NAME + 1)).is_err());
    }

    #[test]
    fn test_missing_category_is_bad_request() {
        let err = missing_as_bad_request(RepositoryError::NotFound);
        assert!(matches!(err, AppError::BadRequest(msg) if msg == CATEGORY_MISSING));
    }
}
