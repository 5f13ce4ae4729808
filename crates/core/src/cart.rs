//! Client-side shopping cart.
//!
//! The cart never lives on the server. It is a list of product snapshots kept
//! in the client's persistent key/value storage (browser `localStorage` for a
//! WASM front-end, a file or memory for other clients) under the key
//! [`CART_KEY`]. Every operation reads the stored list, changes it, and writes
//! it back, so two stores over the same storage always agree.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, ProductId};

/// Storage key the cart is persisted under.
pub const CART_KEY: &str = "cart";

/// Errors from cart operations.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    /// The backing storage failed.
    #[error("cart storage error: {0}")]
    Storage(String),
    /// The stored value is not a valid cart.
    #[error("stored cart is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Persistent key/value storage for client state.
pub trait CartStorage {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if the storage cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, CartError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if the storage cannot be written.
    fn save(&mut self, key: &str, value: String) -> Result<(), CartError>;

    /// Delete the value under `key`. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if the storage cannot be written.
    fn remove(&mut self, key: &str) -> Result<(), CartError>;
}

/// In-memory [`CartStorage`], for tests and non-persistent clients.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, CartError> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: String) -> Result<(), CartError> {
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), CartError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// The product fields a cart keeps, as the catalog returned them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartProduct {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: CategoryId,
    pub price: Decimal,
}

/// A product snapshot plus the quantity wanted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(flatten)]
    pub product: CartProduct,
    pub count: u32,
}

impl CartItem {
    /// `price × count` for this line.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.product.price * Decimal::from(self.count)
    }
}

/// Cart operations over a [`CartStorage`].
#[derive(Debug)]
pub struct CartStore<S> {
    storage: S,
}

impl<S: CartStorage> CartStore<S> {
    pub const fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Give back the underlying storage.
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Current cart contents, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] if storage fails or holds an invalid cart.
    pub fn items(&self) -> Result<Vec<CartItem>, CartError> {
        match self.storage.load(CART_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn write(&mut self, items: &[CartItem]) -> Result<(), CartError> {
        let raw = serde_json::to_string(items)?;
        self.storage.save(CART_KEY, raw)
    }

    /// Add a product with a count of 1.
    ///
    /// A product already in the cart is left as it is; adding does not bump
    /// its count.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] if storage fails.
    pub fn add(&mut self, product: CartProduct) -> Result<(), CartError> {
        let mut items = self.items()?;
        if items.iter().any(|item| item.product.id == product.id) {
            return Ok(());
        }
        items.push(CartItem { product, count: 1 });
        self.write(&items)
    }

    /// Remove a product. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] if storage fails.
    pub fn remove(&mut self, id: ProductId) -> Result<(), CartError> {
        let mut items = self.items()?;
        items.retain(|item| item.product.id != id);
        self.write(&items)
    }

    /// Set the count of a product already in the cart; `0` removes it.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] if storage fails.
    pub fn update_count(&mut self, id: ProductId, count: u32) -> Result<(), CartError> {
        if count == 0 {
            return self.remove(id);
        }
        let mut items = self.items()?;
        if let Some(item) = items.iter_mut().find(|item| item.product.id == id) {
            item.count = count;
        }
        self.write(&items)
    }

    /// Empty the cart, typically after a successful order.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] if storage fails.
    pub fn clear(&mut self) -> Result<(), CartError> {
        self.storage.remove(CART_KEY)
    }

    /// Number of distinct products in the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] if storage fails.
    pub fn item_count(&self) -> Result<usize, CartError> {
        Ok(self.items()?.len())
    }

    /// Sum of `price × count` over the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] if storage fails.
    pub fn total(&self) -> Result<Decimal, CartError> {
        Ok(self.items()?.iter().map(CartItem::subtotal).sum())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: i32, price: i64) -> CartProduct {
        CartProduct {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            category: CategoryId::new(1),
            price: Decimal::from(price),
        }
    }

    fn cart() -> CartStore<MemoryStorage> {
        CartStore::new(MemoryStorage::new())
    }

    #[test]
    fn test_empty_cart() {
        let cart = cart();
        assert!(cart.items().unwrap().is_empty());
        assert_eq!(cart.total().unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_add_deduplicates_by_product() {
        let mut cart = cart();
        cart.add(product(1, 10)).unwrap();
        cart.update_count(ProductId::new(1), 3).unwrap();
        cart.add(product(1, 10)).unwrap();

        let items = cart.items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].count, 3);
    }

    #[test]
    fn test_total_and_item_count() {
        let mut cart = cart();
        cart.add(product(1, 10)).unwrap();
        cart.add(product(2, 5)).unwrap();
        cart.update_count(ProductId::new(2), 4).unwrap();

        assert_eq!(cart.item_count().unwrap(), 2);
        assert_eq!(cart.total().unwrap(), Decimal::from(30));
    }

    #[test]
    fn test_update_count_zero_removes() {
        let mut cart = cart();
        cart.add(product(1, 10)).unwrap();
        cart.update_count(ProductId::new(1), 0).unwrap();
        assert!(cart.items().unwrap().is_empty());
    }

    #[test]
    fn test_update_count_ignores_unknown_product() {
        let mut cart = cart();
        cart.add(product(1, 10)).unwrap();
        cart.update_count(ProductId::new(9), 5).unwrap();
        assert_eq!(cart.items().unwrap()[0].count, 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = cart();
        cart.add(product(1, 10)).unwrap();
        cart.add(product(2, 10)).unwrap();
        cart.remove(ProductId::new(1)).unwrap();
        assert_eq!(cart.item_count().unwrap(), 1);

        cart.clear().unwrap();
        assert!(cart.items().unwrap().is_empty());
    }

    #[test]
    fn test_persists_through_storage() {
        let mut cart = cart();
        cart.add(product(7, 2)).unwrap();

        let storage = cart.into_storage();
        let raw = storage.load(CART_KEY).unwrap().unwrap();
        assert!(raw.contains("\"count\":1"));

        let reopened = CartStore::new(storage);
        assert_eq!(reopened.items().unwrap()[0].product.id, ProductId::new(7));
    }

    #[test]
    fn test_corrupt_storage_is_reported() {
        let mut storage = MemoryStorage::new();
        storage.save(CART_KEY, "not json".into()).unwrap();
        let cart = CartStore::new(storage);
        assert!(matches!(cart.items(), Err(CartError::Corrupt(_))));
    }
}
