//! Order domain types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use larder_core::{CategoryId, OrderId, OrderStatus, ProductId, UserId, check_money};

/// A product snapshot captured when an order is placed.
///
/// Later catalog edits do not change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product that was ordered.
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: CategoryId,
    pub price: Decimal,
    /// Units ordered.
    pub count: i32,
}

/// The account an order belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderUser {
    pub id: UserId,
    pub name: String,
}

/// A placed order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user: OrderUser,
    pub products: Vec<LineItem>,
    pub transaction_id: String,
    pub amount: Decimal,
    pub address: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order details submitted at checkout, after the payment succeeded.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub products: Vec<LineItem>,
    pub transaction_id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub address: String,
}

impl NewOrder {
    /// Check the order is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns a client-facing message for the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.products.is_empty() {
            return Err("Order must contain at least one product".to_string());
        }
        // Duplicate lines for one product are summed when stock is adjusted,
        // so the total must fit as well as each line.
        let mut totals: BTreeMap<ProductId, i32> = BTreeMap::new();
        for item in &self.products {
            let invalid_count = || format!("Invalid count for product {}", item.id);
            if item.count < 1 {
                return Err(invalid_count());
            }
            let total = totals.entry(item.id).or_insert(0);
            *total = total.checked_add(item.count).ok_or_else(invalid_count)?;
            check_money(item.price)
                .map_err(|e| format!("Invalid price for product {}: {e}", item.id))?;
        }
        if self.transaction_id.trim().is_empty() {
            return Err("Transaction id is required".to_string());
        }
        check_money(self.amount).map_err(|e| format!("Invalid amount: {e}"))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order_json(count: i32) -> serde_json::Value {
        serde_json::json!({
            "products": [{
                "id": 4,
                "name": "Green Tea",
                "category": 1,
                "price": "12.50",
                "count": count
            }],
            "transaction_id": "txn_1",
            "amount": "25.00",
            "address": "1 Main St"
        })
    }

    #[test]
    fn test_new_order_parses_and_validates() {
        let order: NewOrder = serde_json::from_value(order_json(2)).unwrap();
        assert_eq!(order.products[0].count, 2);
        assert_eq!(order.products[0].description, "");
        assert!(order.validate().is_ok());
    }

    #[test]
    fn test_zero_count_rejected() {
        let order: NewOrder = serde_json::from_value(order_json(0)).unwrap();
        assert_eq!(
            order.validate().unwrap_err(),
            "Invalid count for product 4"
        );
    }

    #[test]
    fn test_duplicate_lines_must_not_overflow_count() {
        let mut order: NewOrder = serde_json::from_value(order_json(i32::MAX)).unwrap();
        assert!(order.validate().is_ok());

        let mut extra = order.products[0].clone();
        extra.count = 1;
        order.products.push(extra);
        assert_eq!(
            order.validate().unwrap_err(),
            "Invalid count for product 4"
        );
    }

    #[test]
    fn test_money_must_fit_columns() {
        let mut order: NewOrder = serde_json::from_value(order_json(1)).unwrap();
        order.amount = Decimal::from(10_000_000_000_i64);
        assert!(order.validate().unwrap_err().starts_with("Invalid amount"));

        let mut order: NewOrder = serde_json::from_value(order_json(1)).unwrap();
        order.products[0].price = Decimal::new(12_345, 3);
        assert_eq!(
            order.validate().unwrap_err(),
            "Invalid price for product 4: must have at most 2 decimal places"
        );

        let mut order: NewOrder = serde_json::from_value(order_json(1)).unwrap();
        order.amount = Decimal::NEGATIVE_ONE;
        assert!(order.validate().is_err());
    }

    #[test]
    fn test_empty_order_rejected() {
        let mut order: NewOrder = serde_json::from_value(order_json(1)).unwrap();
        order.products.clear();
        assert!(order.validate().is_err());
    }
}
