//! Order placement.
//!
//! Runs the [`CheckoutSaga`] after the client has charged the customer:
//! store the order, adjust inventory, then record purchase history. Each
//! failure gets the compensation the saga names for its stage.

use sqlx::PgPool;
use thiserror::Error;

use larder_core::checkout::{CheckoutSaga, CheckoutStage, Compensation, SagaError};
use larder_core::{OrderId, ProductId, UserId};

use crate::db::{OrderRepository, ProductRepository, RepositoryError, UserRepository};
use crate::models::{NewOrder, Order, PurchaseRecord};
use crate::services::payment::BraintreeClient;

/// Warning attached to an order whose history append failed.
pub const HISTORY_WARNING: &str = "Could not update user purchase history";

/// Errors placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The submitted order is malformed.
    #[error("{0}")]
    Invalid(String),

    /// Nothing was stored. `reversed` tells whether the charge was refunded.
    #[error("Could not save order")]
    OrderNotStored {
        #[source]
        source: RepositoryError,
        reversed: bool,
    },

    /// The order is stored but stock was not adjusted.
    #[error("Could not update product")]
    InventoryNotAdjusted {
        order_id: OrderId,
        #[source]
        source: RepositoryError,
    },

    /// Steps ran out of sequence.
    #[error(transparent)]
    Saga(#[from] SagaError),
}

/// A stored order plus any non-fatal problems.
#[derive(Debug)]
pub struct PlacedOrder {
    pub order: Order,
    pub warnings: Vec<String>,
}

/// Checkout service.
pub struct CheckoutService<'a> {
    orders: OrderRepository<'a>,
    products: ProductRepository<'a>,
    users: UserRepository<'a>,
    payments: &'a BraintreeClient,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, payments: &'a BraintreeClient) -> Self {
        Self {
            orders: OrderRepository::new(pool),
            products: ProductRepository::new(pool),
            users: UserRepository::new(pool),
            payments,
        }
    }

    /// Place an order whose payment has already been charged.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Invalid` for a malformed order.
    /// Returns `CheckoutError::OrderNotStored` if the order could not be saved;
    /// the charge is reversed on a best-effort basis.
    /// Returns `CheckoutError::InventoryNotAdjusted` if stock could not be
    /// decremented; the order remains stored.
    pub async fn place(&self, user_id: UserId, new: NewOrder) -> Result<PlacedOrder, CheckoutError> {
        new.validate().map_err(CheckoutError::Invalid)?;

        let mut saga = CheckoutSaga::new();

        let order = match self.orders.create(user_id, &new).await {
            Ok(order) => order,
            Err(source) => {
                let reversed = self.compensate(&saga, &new.transaction_id).await;
                return Err(CheckoutError::OrderNotStored { source, reversed });
            }
        };
        saga.advance(CheckoutStage::OrderPersisted)?;

        let lines: Vec<(ProductId, i32)> =
            new.products.iter().map(|item| (item.id, item.count)).collect();
        if let Err(source) = self.products.decrease_quantity(&lines).await {
            self.compensate(&saga, &new.transaction_id).await;
            return Err(CheckoutError::InventoryNotAdjusted {
                order_id: order.id,
                source,
            });
        }
        saga.advance(CheckoutStage::InventoryAdjusted)?;

        let history = purchase_records(&new);
        match self.users.append_history(user_id, &history).await {
            Ok(()) => saga.advance(CheckoutStage::HistoryRecorded)?,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    order_id = %order.id,
                    user_id = %user_id,
                    "Purchase history not recorded"
                );
                sentry::capture_message(
                    &format!("Purchase history not recorded for order {}: {e}", order.id),
                    sentry::Level::Warning,
                );
                if saga.compensation() == Compensation::Warn {
                    saga.warn(HISTORY_WARNING);
                }
            }
        }

        tracing::info!(order_id = %order.id, user_id = %user_id, "Order placed");

        Ok(PlacedOrder {
            order,
            warnings: saga.into_warnings(),
        })
    }

    /// Apply the compensation for a failure at the saga's current stage.
    ///
    /// Returns whether the payment was reversed.
    async fn compensate(&self, saga: &CheckoutSaga, transaction_id: &str) -> bool {
        match saga.compensation() {
            Compensation::ReversePayment => {
                match self.payments.reverse_transaction(transaction_id).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            transaction_id,
                            "Payment reversal failed after order was not stored"
                        );
                        sentry::capture_message(
                            &format!("Payment reversal failed for {transaction_id}: {e}"),
                            sentry::Level::Error,
                        );
                        false
                    }
                }
            }
            Compensation::KeepOrder => {
                tracing::error!(
                    transaction_id,
                    "Order stored but inventory not adjusted; needs reconciliation"
                );
                sentry::capture_message(
                    &format!("Inventory not adjusted for transaction {transaction_id}"),
                    sentry::Level::Error,
                );
                false
            }
            Compensation::Warn | Compensation::None => false,
        }
    }
}

/// One history record per line item.
fn purchase_records(order: &NewOrder) -> Vec<PurchaseRecord> {
    order
        .products
        .iter()
        .map(|item| PurchaseRecord {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            category: item.category,
            quantity: item.count,
            transaction_id: order.transaction_id.clone(),
            amount: order.amount,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use larder_core::CategoryId;

    use super::*;
    use crate::models::LineItem;

    #[test]
    fn test_purchase_records_one_per_line_item() {
        let order = NewOrder {
            products: vec![
                LineItem {
                    id: ProductId::new(1),
                    name: "Tea".into(),
                    description: "Leaf".into(),
                    category: CategoryId::new(2),
                    price: Decimal::from(5),
                    count: 2,
                },
                LineItem {
                    id: ProductId::new(3),
                    name: "Cup".into(),
                    description: String::new(),
                    category: CategoryId::new(4),
                    price: Decimal::from(8),
                    count: 1,
                },
            ],
            transaction_id: "txn_9".into(),
            amount: Decimal::from(18),
            address: "1 Main St".into(),
        };

        let records = purchase_records(&order);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].quantity, 2);
        assert_eq!(records[1].id, ProductId::new(3));
        assert!(records.iter().all(|r| r.transaction_id == "txn_9"));
        assert!(records.iter().all(|r| r.amount == Decimal::from(18)));
    }
}
