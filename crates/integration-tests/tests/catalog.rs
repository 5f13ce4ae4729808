//! Category and product store tests.
//!
//! These tests require a running `larder-api` server and its database.
//!
//! Run with: cargo test -p larder-integration-tests -- --ignored

use larder_api::db::{ProductRepository, RepositoryError};
use larder_core::ProductId;
use larder_integration_tests::{TestContext, product_form};
use reqwest::{StatusCode, multipart};
use serde_json::{Value, json};

fn product_id(product: &Value) -> i64 {
    product["id"].as_i64().expect("product id")
}

#[tokio::test]
#[ignore = "Requires running larder-api server and database"]
async fn test_category_with_products_cannot_be_deleted() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let category = ctx.category(&admin).await;
    let product = ctx.product(&admin, category, "4.50", 3).await;

    let resp = ctx
        .client
        .delete(ctx.url(&format!("/category/{category}/{}", admin.id)))
        .bearer_auth(&admin.token)
        .send()
        .await
        .expect("delete");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("body");
    let message = body["error"].as_str().unwrap_or_default();
    assert!(message.starts_with("Sorry. You can't delete"));
    assert!(message.ends_with("It has 1 associated products."));

    // Still there
    let resp = ctx
        .client
        .get(ctx.url(&format!("/category/{category}")))
        .send()
        .await
        .expect("read");
    assert_eq!(resp.status(), StatusCode::OK);

    // Empty it, then delete succeeds
    let resp = ctx
        .client
        .delete(ctx.url(&format!("/product/{}/{}", product_id(&product), admin.id)))
        .bearer_auth(&admin.token)
        .send()
        .await
        .expect("delete product");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ctx
        .client
        .delete(ctx.url(&format!("/category/{category}/{}", admin.id)))
        .bearer_auth(&admin.token)
        .send()
        .await
        .expect("delete");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("body");
    assert_eq!(body["message"], "Category deleted");

    let resp = ctx
        .client
        .get(ctx.url(&format!("/category/{category}")))
        .send()
        .await
        .expect("read");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running larder-api server and database"]
async fn test_duplicate_category_name_rejected() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let name = TestContext::unique("dup");

    for expected in [StatusCode::OK, StatusCode::BAD_REQUEST] {
        let resp = ctx
            .client
            .post(ctx.url(&format!("/category/create/{}", admin.id)))
            .bearer_auth(&admin.token)
            .json(&json!({ "name": name }))
            .send()
            .await
            .expect("create");
        assert_eq!(resp.status(), expected);
        if expected == StatusCode::BAD_REQUEST {
            let body: Value = resp.json().await.expect("body");
            assert_eq!(body["error"], "Name already exists");
        }
    }
}

#[tokio::test]
#[ignore = "Requires running larder-api server and database"]
async fn test_product_round_trip() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let category = ctx.category(&admin).await;
    let created = ctx.product(&admin, category, "12.00", 7).await;
    let id = product_id(&created);

    let resp = ctx
        .client
        .get(ctx.url(&format!("/product/{id}")))
        .send()
        .await
        .expect("read");
    assert_eq!(resp.status(), StatusCode::OK);
    let read: Value = resp.json().await.expect("body");
    assert_eq!(read["name"], created["name"]);
    assert_eq!(read["quantity"], 7);
    assert_eq!(read["sold"], 0);
    assert_eq!(read["category"], category);
    assert!(read.get("image").is_none());

    // Partial update keeps untouched fields
    let form = multipart::Form::new().text("quantity", "9");
    let resp = ctx
        .client
        .put(ctx.url(&format!("/product/{id}/{}", admin.id)))
        .bearer_auth(&admin.token)
        .multipart(form)
        .send()
        .await
        .expect("update");
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.expect("body");
    assert_eq!(updated["quantity"], 9);
    assert_eq!(updated["name"], created["name"]);
}

#[tokio::test]
#[ignore = "Requires running larder-api server and database"]
async fn test_missing_fields_rejected() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;

    let form = multipart::Form::new().text("name", "Half a product");
    let resp = ctx
        .client
        .post(ctx.url(&format!("/product/create/{}", admin.id)))
        .bearer_auth(&admin.token)
        .multipart(form)
        .send()
        .await
        .expect("create");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("body");
    assert_eq!(body["error"], "All fields are required");
}

#[tokio::test]
#[ignore = "Requires running larder-api server and database"]
async fn test_image_size_boundary() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let category = ctx.category(&admin).await;

    let image = |len: usize| {
        multipart::Part::bytes(vec![0x89; len])
            .file_name("photo.png")
            .mime_str("image/png")
            .expect("mime")
    };

    let resp = ctx
        .client
        .post(ctx.url(&format!("/product/create/{}", admin.id)))
        .bearer_auth(&admin.token)
        .multipart(product_form(category, "3.00", 1).part("image", image(1_000_000)))
        .send()
        .await
        .expect("create");
    assert_eq!(resp.status(), StatusCode::OK);
    let product: Value = resp.json().await.expect("body");

    let resp = ctx
        .client
        .get(ctx.url(&format!("/product/photo/{}", product_id(&product))))
        .send()
        .await
        .expect("photo");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").and_then(|v| v.to_str().ok()),
        Some("image/png")
    );
    assert_eq!(resp.bytes().await.expect("bytes").len(), 1_000_000);

    let resp = ctx
        .client
        .post(ctx.url(&format!("/product/create/{}", admin.id)))
        .bearer_auth(&admin.token)
        .multipart(product_form(category, "3.00", 1).part("image", image(1_000_001)))
        .send()
        .await
        .expect("create");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("body");
    assert_eq!(body["error"], "Image should be less than 1mb in size");
}

#[tokio::test]
#[ignore = "Requires running larder-api server and database"]
async fn test_price_range_search() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let category = ctx.category(&admin).await;
    for price in ["5.00", "10.00", "30.00", "50.00", "75.00"] {
        ctx.product(&admin, category, price, 1).await;
    }

    let resp = ctx
        .client
        .post(ctx.url("/products/by/search"))
        .json(&json!({
            "sortBy": "price",
            "order": "asc",
            "limit": 2,
            "filters": { "category": [category], "price": [10, 50] }
        }))
        .send()
        .await
        .expect("search");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("body");
    // size counts every match, data is one page
    assert_eq!(body["size"], 3);
    let prices: Vec<&str> = body["data"]
        .as_array()
        .expect("data")
        .iter()
        .filter_map(|p| p["price"].as_str())
        .collect();
    assert_eq!(prices, ["10.00", "30.00"]);
}

#[tokio::test]
#[ignore = "Requires running larder-api server and database"]
async fn test_double_decrement_is_not_idempotent() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let category = ctx.category(&admin).await;
    let product = ctx.product(&admin, category, "2.00", 10).await;
    let id = ProductId::new(i32::try_from(product_id(&product)).expect("id fits"));

    let products = ProductRepository::new(&ctx.pool);
    // Duplicate lines are summed
    products
        .decrease_quantity(&[(id, 1), (id, 2)])
        .await
        .expect("first decrement");
    products
        .decrease_quantity(&[(id, 3)])
        .await
        .expect("second decrement");

    let stored = products.get(id).await.expect("get").expect("exists");
    assert_eq!(stored.quantity, 4);
    assert_eq!(stored.sold, 6);

    // A missing product fails the whole batch
    let missing = ProductId::new(i32::MAX);
    let result = products.decrease_quantity(&[(id, 1), (missing, 1)]).await;
    assert!(matches!(result, Err(RepositoryError::NotFound)));
    let stored = products.get(id).await.expect("get").expect("exists");
    assert_eq!(stored.quantity, 4);
}
