//! Order repository.
//!
//! An order and its line items are written in one transaction, so a stored
//! order is never missing items.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use larder_core::{CategoryId, OrderId, OrderStatus, ProductId, UserId};

use super::RepositoryError;
use crate::models::{LineItem, NewOrder, Order, OrderUser};

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    user_name: String,
    transaction_id: String,
    amount: Decimal,
    address: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    order_id: i32,
    product_id: i32,
    name: String,
    description: String,
    category_id: i32,
    price: Decimal,
    count: i32,
}

impl From<ItemRow> for LineItem {
    fn from(row: ItemRow) -> Self {
        Self {
            id: ProductId::new(row.product_id),
            name: row.name,
            description: row.description,
            category: CategoryId::new(row.category_id),
            price: row.price,
            count: row.count,
        }
    }
}

fn into_order(row: OrderRow, products: Vec<LineItem>) -> Result<Order, RepositoryError> {
    let status: OrderStatus = row.status.parse().map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid order status in database: {e}"))
    })?;

    Ok(Order {
        id: OrderId::new(row.id),
        user: OrderUser {
            id: UserId::new(row.user_id),
            name: row.user_name,
        },
        products,
        transaction_id: row.transaction_id,
        amount: row.amount,
        address: row.address,
        status,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store an order and its line items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` if either insert fails; nothing is
    /// stored in that case.
    pub async fn create(&self, user_id: UserId, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            WITH inserted AS (
                INSERT INTO larder.customer_order (user_id, transaction_id, amount, address)
                SELECT id, $2, $3, $4 FROM larder.user WHERE id = $1
                RETURNING *
            )
            SELECT o.id, o.user_id, u.name AS user_name, o.transaction_id, o.amount,
                   o.address, o.status, o.created_at, o.updated_at
            FROM inserted o
            JOIN larder.user u ON u.id = o.user_id
            ",
        )
        .bind(user_id)
        .bind(&order.transaction_id)
        .bind(order.amount)
        .bind(&order.address)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let product_ids: Vec<i32> = order.products.iter().map(|i| i.id.as_i32()).collect();
        let names: Vec<&str> = order.products.iter().map(|i| i.name.as_str()).collect();
        let descriptions: Vec<&str> = order
            .products
            .iter()
            .map(|i| i.description.as_str())
            .collect();
        let categories: Vec<i32> = order
            .products
            .iter()
            .map(|i| i.category.as_i32())
            .collect();
        let prices: Vec<Decimal> = order.products.iter().map(|i| i.price).collect();
        let counts: Vec<i32> = order.products.iter().map(|i| i.count).collect();

        sqlx::query(
            r"
            INSERT INTO larder.order_item
                (order_id, product_id, name, description, category_id, price, count)
            SELECT $1::int4, * FROM UNNEST($2::int4[], $3::text[], $4::text[], $5::int4[], $6::numeric[], $7::int4[])
            ",
        )
        .bind(row.id)
        .bind(&product_ids)
        .bind(&names)
        .bind(&descriptions)
        .bind(&categories)
        .bind(&prices)
        .bind(&counts)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        into_order(row, order.products.clone())
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT o.id, o.user_id, u.name AS user_name, o.transaction_id, o.amount,
                   o.address, o.status, o.created_at, o.updated_at
            FROM larder.customer_order o
            JOIN larder.user u ON u.id = o.user_id
            WHERE o.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.with_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT o.id, o.user_id, u.name AS user_name, o.transaction_id, o.amount,
                   o.address, o.status, o.created_at, o.updated_at
            FROM larder.customer_order o
            JOIN larder.user u ON u.id = o.user_id
            ORDER BY o.created_at DESC, o.id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        self.with_items(rows).await
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT o.id, o.user_id, u.name AS user_name, o.transaction_id, o.amount,
                   o.address, o.status, o.created_at, o.updated_at
            FROM larder.customer_order o
            JOIN larder.user u ON u.id = o.user_id
            WHERE o.user_id = $1
            ORDER BY o.created_at DESC, o.id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        self.with_items(rows).await
    }

    /// Change an order's fulfilment status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE larder.customer_order
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(status)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Load line items for a batch of orders, preserving order.
    async fn with_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let items = sqlx::query_as::<_, ItemRow>(
            r"
            SELECT order_id, product_id, name, description, category_id, price, count
            FROM larder.order_item
            WHERE order_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<i32, Vec<LineItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item.into());
        }

        rows.into_iter()
            .map(|row| {
                let products = by_order.remove(&row.id).unwrap_or_default();
                into_order(row, products)
            })
            .collect()
    }
}
