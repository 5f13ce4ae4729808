//! Domain models for the storefront API.
//!
//! These are validated domain objects, separate from the row types in
//! [`crate::db`]. They serialize to the JSON shapes clients receive.

pub mod category;
pub mod order;
pub mod product;
pub mod user;

pub use category::Category;
pub use order::{LineItem, NewOrder, Order, OrderUser};
pub use product::{NewProduct, Product, ProductPatch};
pub use user::{PurchaseRecord, User};
