//! End-to-end tests for Larder.
//!
//! # Running Tests
//!
//! ```bash
//! # Apply migrations and start the server
//! cargo run -p larder-cli -- migrate
//! cargo run -p larder-api
//!
//! # Run the ignored end-to-end tests
//! cargo test -p larder-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `LARDER_BASE_URL` - Server under test (default `http://localhost:8000`)
//! - `LARDER_DATABASE_URL` / `DATABASE_URL` - Same database the server uses
//!
//! Every helper creates uniquely named rows so tests can run in parallel
//! against a shared database.

use larder_api::db::UserRepository;
use larder_core::{Email, Role};
use reqwest::{Client, StatusCode, multipart};
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

/// Password that satisfies signup rules.
pub const TEST_PASSWORD: &str = "passw0rd";

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("LARDER_BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

/// A signed-in account.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub token: String,
}

/// Shared client, database handle and helpers.
#[derive(Debug, Clone)]
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub pool: PgPool,
}

impl TestContext {
    /// Connect to the server's database.
    ///
    /// # Panics
    ///
    /// Panics if no database URL is configured or the database is unreachable.
    pub async fn new() -> Self {
        let database_url = std::env::var("LARDER_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .expect("LARDER_DATABASE_URL or DATABASE_URL must be set");
        let pool = PgPool::connect(&database_url)
            .await
            .expect("Failed to connect to database");

        Self {
            client: Client::new(),
            base_url: base_url(),
            pool,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A unique suffix for names that must not collide between runs.
    #[must_use]
    pub fn unique(prefix: &str) -> String {
        let id = Uuid::new_v4().simple().to_string();
        format!("{prefix}-{}", id.get(..8).unwrap_or(&id))
    }

    /// Sign up and sign in a fresh customer.
    ///
    /// # Panics
    ///
    /// Panics if either request fails.
    pub async fn customer(&self) -> Account {
        let email = format!("{}@example.com", Self::unique("customer"));
        let resp = self
            .client
            .post(self.url("/signup"))
            .header("x-forwarded-for", client_ip())
            .json(&json!({ "name": "Test Customer", "email": email, "password": TEST_PASSWORD }))
            .send()
            .await
            .expect("signup request failed");
        assert_eq!(resp.status(), StatusCode::OK, "signup failed");

        self.signin(&email).await
    }

    /// A fresh customer promoted to admin directly in the database.
    ///
    /// # Panics
    ///
    /// Panics if signup or promotion fails.
    pub async fn admin(&self) -> Account {
        let account = self.customer().await;
        let email = Email::parse(&account.email).expect("valid email");
        UserRepository::new(&self.pool)
            .set_role(&email, Role::Admin)
            .await
            .expect("Failed to promote admin");
        account
    }

    /// Sign in with [`TEST_PASSWORD`].
    ///
    /// # Panics
    ///
    /// Panics if sign-in fails.
    pub async fn signin(&self, email: &str) -> Account {
        let resp = self
            .client
            .post(self.url("/signin"))
            .header("x-forwarded-for", client_ip())
            .json(&json!({ "email": email, "password": TEST_PASSWORD }))
            .send()
            .await
            .expect("signin request failed");
        assert_eq!(resp.status(), StatusCode::OK, "signin failed");

        let body: Value = resp.json().await.expect("signin body");
        Account {
            id: body["user"]["id"].as_i64().expect("user id"),
            email: email.to_string(),
            token: body["token"].as_str().expect("token").to_string(),
        }
    }

    /// Create a uniquely named category.
    ///
    /// # Panics
    ///
    /// Panics if creation fails.
    pub async fn category(&self, admin: &Account) -> i64 {
        let resp = self
            .client
            .post(self.url(&format!("/category/create/{}", admin.id)))
            .bearer_auth(&admin.token)
            .json(&json!({ "name": Self::unique("cat") }))
            .send()
            .await
            .expect("category request failed");
        assert_eq!(resp.status(), StatusCode::OK, "category create failed");

        let body: Value = resp.json().await.expect("category body");
        body["data"]["id"].as_i64().expect("category id")
    }

    /// Create a product in `category` with the given price and stock.
    ///
    /// # Panics
    ///
    /// Panics if creation fails.
    pub async fn product(&self, admin: &Account, category: i64, price: &str, quantity: i32) -> Value {
        let form = product_form(category, price, quantity);
        let resp = self
            .client
            .post(self.url(&format!("/product/create/{}", admin.id)))
            .bearer_auth(&admin.token)
            .multipart(form)
            .send()
            .await
            .expect("product request failed");
        assert_eq!(resp.status(), StatusCode::OK, "product create failed");
        resp.json().await.expect("product body")
    }
}

/// A random private address, so each helper call lands in its own
/// `/signin`/`/signup` rate-limit bucket.
#[must_use]
pub fn client_ip() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    format!("10.{}.{}.{}", bytes[0], bytes[1], bytes[2])
}

/// A complete product form without an image.
#[must_use]
pub fn product_form(category: i64, price: &str, quantity: i32) -> multipart::Form {
    multipart::Form::new()
        .text("name", TestContext::unique("prod"))
        .text("description", "Loose leaf")
        .text("price", price.to_string())
        .text("category", category.to_string())
        .text("quantity", quantity.to_string())
        .text("shipping", "true")
}
