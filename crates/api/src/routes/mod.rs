//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness
//! GET  /health/ready                        - Readiness (database ping)
//!
//! # Auth (rate limited)
//! POST /signup                              - Create account
//! POST /signin                              - Token + cookie `t`
//! GET  /signout                             - Clear cookie `t`
//!
//! # Users (owner)
//! GET  /user/{user_id}                      - Profile
//! PUT  /user/{user_id}                      - Update name/password
//! GET  /orders/by/user/{user_id}            - Purchase history
//!
//! # Categories
//! POST   /category/create/{user_id}         - Create (admin)
//! GET    /category/{category_id}            - Read
//! PUT    /category/{category_id}/{user_id}  - Rename (admin)
//! DELETE /category/{category_id}/{user_id}  - Delete if unused (admin)
//! GET    /categories                        - List
//!
//! # Products
//! POST   /product/create/{user_id}          - Create, multipart (admin)
//! GET    /product/{product_id}              - Read
//! PUT    /product/{product_id}/{user_id}    - Partial update, multipart (admin)
//! DELETE /product/{product_id}/{user_id}    - Delete (admin)
//! GET    /product/photo/{product_id}        - Image bytes
//! GET    /products                          - Sorted listing
//! POST   /products/by/search                - Filtered search `{size, data}`
//! GET    /products/search                   - Name search
//! GET    /products/related/{product_id}     - Same category
//! GET    /products/categories               - Category ids in use
//!
//! # Orders
//! POST /order/create/{user_id}              - Place order (owner)
//! GET  /order/list/{user_id}                - All orders (admin)
//! GET  /order/status-values/{user_id}       - Allowed statuses (admin)
//! PUT  /order/{order_id}/status/{user_id}   - Change status (admin)
//!
//! # Payments (owner)
//! POST /braintree/getToken/{user_id}        - Drop-in client token
//! POST /braintree/payment/{user_id}         - Charge a nonce
//! ```

pub mod auth;
pub mod categories;
pub mod orders;
pub mod payments;
pub mod products;
pub mod users;

use std::str::FromStr;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRequest, FromRequestParts, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Body of responses that only confirm an action.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// JSON request body. Malformed or mistyped bodies are rejected with
/// 400 `{"error": ...}` instead of axum's plain-text rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Query string, rejected the same way as [`JsonBody`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);

/// Parse a path segment into an ID. Malformed IDs are reported the same way
/// as missing rows.
fn parse_id<T: FromStr>(raw: &str, missing: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(missing.to_string()))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/signin", post(auth::signin))
        .layer(auth_rate_limiter())
        .route("/signout", get(auth::signout))
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/{user_id}", get(users::read).put(users::update))
        .route("/orders/by/user/{user_id}", get(users::purchase_history))
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/category/create/{user_id}", post(categories::create))
        .route("/category/{category_id}", get(categories::read))
        .route(
            "/category/{category_id}/{user_id}",
            put(categories::update).delete(categories::remove),
        )
        .route("/categories", get(categories::list))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    let writes = Router::new()
        .route("/product/create/{user_id}", post(products::create))
        .route(
            "/product/{product_id}/{user_id}",
            put(products::update).delete(products::remove),
        )
        .layer(DefaultBodyLimit::max(products::PRODUCT_FORM_LIMIT));

    Router::new()
        .merge(writes)
        .route("/product/{product_id}", get(products::read))
        .route("/product/photo/{product_id}", get(products::photo))
        .route("/products", get(products::list))
        .route("/products/by/search", post(products::list_by_search))
        .route("/products/search", get(products::list_search))
        .route("/products/related/{product_id}", get(products::list_related))
        .route("/products/categories", get(products::list_categories))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/order/create/{user_id}", post(orders::create))
        .route("/order/list/{user_id}", get(orders::list))
        .route("/order/status-values/{user_id}", get(orders::status_values))
        .route("/order/{order_id}/status/{user_id}", put(orders::update_status))
}

/// Create the payment routes router.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/braintree/getToken/{user_id}", post(payments::client_token))
        .route("/braintree/payment/{user_id}", post(payments::process_payment))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(auth_routes())
        .merge(user_routes())
        .merge(category_routes())
        .merge(product_routes())
        .merge(order_routes())
        .merge(payment_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, header};
    use axum::response::Response;
    use tower::ServiceExt;

    use larder_core::UserId;

    use super::*;
    use crate::state::test_support::lazy_state;

    fn app() -> Router {
        routes().with_state(lazy_state())
    }

    async fn send(request: Request<Body>) -> Response {
        app().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = send(get_request("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let response = send(get_request("/user/1")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "Token required");
    }

    #[tokio::test]
    async fn test_invalid_token_is_unauthorized() {
        let request = Request::builder()
            .uri("/orders/by/user/1")
            .header(header::AUTHORIZATION, "Bearer not.a.token")
            .body(Body::empty())
            .unwrap();
        let response = send(request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "Invalid token");
    }

    #[tokio::test]
    async fn test_token_from_other_key_is_unauthorized() {
        let other = crate::services::auth::TokenKeys::new(
            &secrecy::SecretString::from("another-signing-key-0123456789abcdef"),
            std::time::Duration::from_secs(60),
        );
        let token = other.issue(UserId::new(1)).unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/braintree/getToken/1")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = send(request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_inverted_price_range_rejected() {
        let body = serde_json::json!({ "filters": { "price": [50, 10] } });
        let response = send(post_json("/products/by/search", &body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_filter_key_is_json_bad_request() {
        let body = serde_json::json!({ "filters": { "$where": "1" } });
        let response = send(post_json("/products/by/search", &body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error = json_body(response).await["error"].as_str().unwrap().to_owned();
        assert!(error.contains("unknown field"), "{error}");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/signin")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "10.0.0.1")
            .body(Body::from("{not json"))
            .unwrap();
        let response = send(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_mistyped_query_is_json_bad_request() {
        let response = send(get_request("/products?limit=many")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_signin_is_rate_limited_per_client() {
        let app = app();
        let attempt = || {
            Request::builder()
                .method("POST")
                .uri("/signin")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-forwarded-for", "10.9.9.9")
                .body(Body::from("{}"))
                .unwrap()
        };

        // Burst of 5; the bodies fail validation before any database access
        for _ in 0..5 {
            let response = app.clone().oneshot(attempt()).await.unwrap();
            assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        }
        let response = app.clone().oneshot(attempt()).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_unknown_sort_field_rejected() {
        let response = send(get_request("/products?sortBy=password")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_name_search_without_term_is_empty() {
        let response = send(get_request("/products/search?category=All")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_related_rejects_zero_limit() {
        let response = send(get_request("/products/related/1?limit=0")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_ids_are_bad_requests() {
        let response = send(get_request("/category/abc")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Category does not exist");

        let response = send(get_request("/product/abc")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Product not found");
    }

    #[tokio::test]
    async fn test_signout_clears_cookie() {
        let response = send(get_request("/signout")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_owned();
        assert!(cookie.starts_with("t="));
        assert!(cookie.contains("Max-Age=0"));
        assert_eq!(json_body(response).await["message"], "Signout success");
    }
}
