//! Product catalog routes.
//!
//! Creates and updates arrive as `multipart/form-data` so the optional image
//! can travel with the text fields. Product JSON never includes the image;
//! clients fetch it from `/product/photo/{product_id}`.

use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use larder_core::search::{
    ListRequest, NameSearch, ProductListing, ProductSearch, RelatedRequest, SearchRequest,
    TextSearchRequest,
};
use larder_core::{CategoryId, ProductId, ProductImage};

use crate::db::{ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::product::{ProductForm, ProductInputError};
use crate::models::{NewProduct, Product, ProductPatch};
use crate::state::AppState;

use super::{JsonBody, MessageResponse, QueryParams, parse_id};

const PRODUCT_MISSING: &str = "Product not found";

/// Upper bound on a product form body. Larger than the image limit so an
/// oversized image is reported as such rather than as a generic 413.
pub const PRODUCT_FORM_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    /// Matches before pagination.
    pub size: i64,
    pub data: Vec<Product>,
}

fn missing_as_bad_request(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::BadRequest(PRODUCT_MISSING.to_string()),
        other => other.into(),
    }
}

fn malformed(err: &MultipartError) -> AppError {
    AppError::BadRequest(format!("Malformed form data: {}", err.body_text()))
}

/// Collect a product form from multipart fields.
///
/// Unknown fields are ignored. An image part with no bytes counts as "no
/// image", which is what browsers send for an untouched file input.
async fn read_form(mut multipart: Multipart) -> Result<ProductForm> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| malformed(&e))? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if name == "image" || name == "photo" {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_owned();
            let data = field.bytes().await.map_err(|e| {
                if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    AppError::Product(ProductInputError::ImageTooLarge)
                } else {
                    malformed(&e)
                }
            })?;
            if data.is_empty() {
                continue;
            }
            let image = ProductImage::new(data.to_vec(), content_type)
                .map_err(ProductInputError::from)?;
            form.image = Some(image);
            continue;
        }

        let value = field.text().await.map_err(|e| malformed(&e))?;
        match name.as_str() {
            "name" => form.name = Some(value),
            "description" => form.description = Some(value),
            "price" => form.price = Some(value),
            "category" => form.category = Some(value),
            "quantity" => form.quantity = Some(value),
            "shipping" => form.shipping = Some(value),
            _ => {}
        }
    }

    Ok(form)
}

/// POST /product/create/{user_id}
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    multipart: Multipart,
) -> Result<Json<Product>> {
    let new = NewProduct::try_from(read_form(multipart).await?)?;
    let product = ProductRepository::new(state.pool()).create(new).await?;

    tracing::info!(product_id = %product.id, admin_id = %admin.id, "Product created");
    Ok(Json(product))
}

/// Merge the submitted fields into an existing product.
///
/// PUT /product/{product_id}/{user_id}
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path((product_id, _)): Path<(String, String)>,
    multipart: Multipart,
) -> Result<Json<Product>> {
    let id: ProductId = parse_id(&product_id, PRODUCT_MISSING)?;
    let patch = ProductPatch::try_from(read_form(multipart).await?)?;
    let product = ProductRepository::new(state.pool())
        .update(id, patch)
        .await
        .map_err(missing_as_bad_request)?;

    tracing::info!(product_id = %product.id, admin_id = %admin.id, "Product updated");
    Ok(Json(product))
}

/// DELETE /product/{product_id}/{user_id}
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path((product_id, _)): Path<(String, String)>,
) -> Result<Json<MessageResponse>> {
    let id: ProductId = parse_id(&product_id, PRODUCT_MISSING)?;
    ProductRepository::new(state.pool())
        .remove(id)
        .await
        .map_err(missing_as_bad_request)?;

    tracing::info!(product_id = %id, admin_id = %admin.id, "Product deleted");
    Ok(Json(MessageResponse {
        message: "Product deleted successfully",
    }))
}

/// GET /product/{product_id}
pub async fn read(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<Product>> {
    let id: ProductId = parse_id(&product_id, PRODUCT_MISSING)?;
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::BadRequest(PRODUCT_MISSING.to_string()))
}

/// GET /products?sortBy=&order=&limit=
pub async fn list(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListRequest>,
) -> Result<Json<Vec<Product>>> {
    let listing = ProductListing::try_from(query)?;
    Ok(Json(ProductRepository::new(state.pool()).list(listing).await?))
}

/// Filtered, sorted, paginated search.
///
/// POST /products/by/search
pub async fn list_by_search(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    let search = ProductSearch::try_from(req)?;
    let (size, data) = ProductRepository::new(state.pool()).search(&search).await?;
    Ok(Json(SearchResponse { size, data }))
}

/// Case-insensitive name search. No term returns no products.
///
/// GET /products/search?search=&category=
pub async fn list_search(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<TextSearchRequest>,
) -> Result<Json<Vec<Product>>> {
    let Some(search) = NameSearch::from_request(query)? else {
        return Ok(Json(Vec::new()));
    };
    Ok(Json(
        ProductRepository::new(state.pool())
            .search_by_name(&search)
            .await?,
    ))
}

/// GET /products/related/{product_id}?limit=
pub async fn list_related(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    QueryParams(query): QueryParams<RelatedRequest>,
) -> Result<Json<Vec<Product>>> {
    let id: ProductId = parse_id(&product_id, PRODUCT_MISSING)?;
    let limit = query.limit()?;
    let products = ProductRepository::new(state.pool())
        .related(id, limit)
        .await
        .map_err(missing_as_bad_request)?;
    Ok(Json(products))
}

/// GET /products/categories
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryId>>> {
    Ok(Json(
        ProductRepository::new(state.pool())
            .categories_in_use()
            .await?,
    ))
}

/// Raw image bytes with their stored content type.
///
/// GET /product/photo/{product_id}
pub async fn photo(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Response> {
    let id: ProductId = parse_id(&product_id, PRODUCT_MISSING)?;
    let image = ProductRepository::new(state.pool())
        .image(id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(PRODUCT_MISSING.to_string()),
            other => other.into(),
        })?
        .ok_or_else(|| AppError::NotFound("Product has no image".to_string()))?;

    let (data, content_type) = image.into_parts();
    let content_type = HeaderValue::from_str(&content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    Ok(([(CONTENT_TYPE, content_type)], data).into_response())
}
