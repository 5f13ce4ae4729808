//! Product domain types and form validation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use larder_core::{CategoryId, ImageError, ProductId, ProductImage, check_money};

/// Maximum length of a product name.
pub const MAX_PRODUCT_NAME: usize = 32;
/// Maximum length of a product description.
pub const MAX_PRODUCT_DESCRIPTION: usize = 2000;

/// A catalog product.
///
/// `image` is only loaded by single-product reads and is never serialized;
/// clients fetch it from `/product/photo/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: CategoryId,
    pub quantity: i32,
    pub sold: i32,
    pub shipping: bool,
    #[serde(skip)]
    pub image: Option<ProductImage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Errors validating a product form.
#[derive(Debug, Error)]
pub enum ProductInputError {
    #[error("All fields are required")]
    MissingFields,
    #[error("Invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
    #[error("Image should be less than 1mb in size")]
    ImageTooLarge,
    #[error("Image must be an image file")]
    ImageType,
}

impl From<ImageError> for ProductInputError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::TooLarge { .. } => Self::ImageTooLarge,
            ImageError::Empty | ImageError::UnsupportedType(_) => Self::ImageType,
        }
    }
}

/// Raw multipart fields of a product create/update request.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<String>,
    pub shipping: Option<String>,
    pub image: Option<ProductImage>,
}

/// A validated product ready to insert.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: CategoryId,
    pub quantity: i32,
    pub shipping: bool,
    pub image: Option<ProductImage>,
}

/// A validated partial update. `None` fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<CategoryId>,
    pub quantity: Option<i32>,
    pub shipping: Option<bool>,
    pub image: Option<ProductImage>,
}

impl TryFrom<ProductForm> for NewProduct {
    type Error = ProductInputError;

    fn try_from(form: ProductForm) -> Result<Self, Self::Error> {
        let (
            Some(name),
            Some(description),
            Some(price),
            Some(category),
            Some(quantity),
            Some(shipping),
        ) = (
            present(form.name),
            present(form.description),
            present(form.price),
            present(form.category),
            present(form.quantity),
            present(form.shipping),
        )
        else {
            return Err(ProductInputError::MissingFields);
        };

        Ok(Self {
            name: parse_name(name)?,
            description: parse_description(description)?,
            price: parse_price(&price)?,
            category: parse_category(&category)?,
            quantity: parse_quantity(&quantity)?,
            shipping: parse_shipping(&shipping)?,
            image: form.image,
        })
    }
}

impl TryFrom<ProductForm> for ProductPatch {
    type Error = ProductInputError;

    fn try_from(form: ProductForm) -> Result<Self, Self::Error> {
        Ok(Self {
            name: present(form.name).map(parse_name).transpose()?,
            description: present(form.description)
                .map(parse_description)
                .transpose()?,
            price: present(form.price).as_deref().map(parse_price).transpose()?,
            category: present(form.category)
                .as_deref()
                .map(parse_category)
                .transpose()?,
            quantity: present(form.quantity)
                .as_deref()
                .map(parse_quantity)
                .transpose()?,
            shipping: present(form.shipping)
                .as_deref()
                .map(parse_shipping)
                .transpose()?,
            image: form.image,
        })
    }
}

/// Treat blank form fields as absent.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ProductInputError {
    ProductInputError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn parse_name(name: String) -> Result<String, ProductInputError> {
    if name.chars().count() > MAX_PRODUCT_NAME {
        return Err(invalid(
            "name",
            format!("must be at most {MAX_PRODUCT_NAME} characters"),
        ));
    }
    Ok(name)
}

fn parse_description(description: String) -> Result<String, ProductInputError> {
    if description.chars().count() > MAX_PRODUCT_DESCRIPTION {
        return Err(invalid(
            "description",
            format!("must be at most {MAX_PRODUCT_DESCRIPTION} characters"),
        ));
    }
    Ok(description)
}

fn parse_price(raw: &str) -> Result<Decimal, ProductInputError> {
    let price: Decimal = raw
        .parse()
        .map_err(|_| invalid("price", "must be a number"))?;
    check_money(price).map_err(|e| invalid("price", e.to_string()))
}

fn parse_category(raw: &str) -> Result<CategoryId, ProductInputError> {
    raw.parse()
        .map_err(|_| invalid("category", "must be a category id"))
}

fn parse_quantity(raw: &str) -> Result<i32, ProductInputError> {
    let quantity: i32 = raw
        .parse()
        .map_err(|_| invalid("quantity", "must be a whole number"))?;
    if quantity < 0 {
        return Err(invalid("quantity", "must not be negative"));
    }
    Ok(quantity)
}

fn parse_shipping(raw: &str) -> Result<bool, ProductInputError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(invalid("shipping", "must be true or false")),
    }
}
