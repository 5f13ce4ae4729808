//! Core types for Larder.
//!
//! Type-safe wrappers for the storefront's domain concepts.

pub mod email;
pub mod id;
pub mod image;
pub mod price;
pub mod role;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use image::{ImageError, MAX_IMAGE_BYTES, ProductImage};
pub use price::{MoneyError, PriceRange, PriceRangeError, check_money};
pub use role::Role;
pub use status::{OrderStatus, UnknownStatus};
