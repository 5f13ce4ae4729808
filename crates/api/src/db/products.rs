//! Product repository.
//!
//! Listing queries never select the image blob; only [`ProductRepository::get`]
//! and [`ProductRepository::image`] read it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use larder_core::search::{NameSearch, ProductFilters, ProductListing, ProductSearch, Sort};
use larder_core::{CategoryId, ProductId, ProductImage};

use super::RepositoryError;
use crate::models::{NewProduct, Product, ProductPatch};

/// Columns of a product row, without the image.
const PRODUCT_COLUMNS: &str =
    "id, name, description, price, category_id, quantity, sold, shipping, created_at, updated_at";

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: String,
    price: Decimal,
    category_id: i32,
    quantity: i32,
    sold: i32,
    shipping: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ProductWithImageRow {
    #[sqlx(flatten)]
    product: ProductRow,
    image: Option<Vec<u8>>,
    image_content_type: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ImageRow {
    image: Option<Vec<u8>>,
    image_content_type: Option<String>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            category: CategoryId::new(row.category_id),
            quantity: row.quantity,
            sold: row.sold,
            shipping: row.shipping,
            image: None,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn stored_image(data: Option<Vec<u8>>, content_type: Option<String>) -> Option<ProductImage> {
    match (data, content_type) {
        (Some(data), Some(content_type)) => Some(ProductImage::from_stored(data, content_type)),
        _ => None,
    }
}

impl From<ProductWithImageRow> for Product {
    fn from(row: ProductWithImageRow) -> Self {
        let mut product = Self::from(row.product);
        product.image = stored_image(row.image, row.image_content_type);
        product
    }
}

/// Sum the counts of duplicate products in a batch of line items.
///
/// Returns parallel `(ids, counts)` arrays ready to bind to `UNNEST`, or
/// `RepositoryError::Conflict` if a product's total does not fit an `int4`.
fn aggregate_line_counts(
    lines: &[(ProductId, i32)],
) -> Result<(Vec<i32>, Vec<i32>), RepositoryError> {
    let mut totals: BTreeMap<ProductId, i32> = BTreeMap::new();
    for &(id, count) in lines {
        let total = totals.entry(id).or_insert(0);
        *total = total
            .checked_add(count)
            .ok_or_else(|| RepositoryError::Conflict(format!("Invalid count for product {id}")))?;
    }
    Ok(totals
        .into_iter()
        .map(|(id, count)| (id.as_i32(), count))
        .unzip())
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &ProductFilters) {
    builder.push(" WHERE TRUE");
    if let Some(categories) = &filters.categories {
        let ids: Vec<i32> = categories.iter().map(CategoryId::as_i32).collect();
        builder.push(" AND category_id = ANY(");
        builder.push_bind(ids);
        builder.push(")");
    }
    if let Some(range) = filters.price_range {
        builder.push(" AND price BETWEEN ");
        builder.push_bind(range.min());
        builder.push(" AND ");
        builder.push_bind(range.max());
    }
}

/// `ORDER BY` clause from a whitelisted sort. `id` breaks ties so pages are
/// stable.
fn order_clause(sort: Sort) -> String {
    let column = sort.field.column();
    let direction = sort.order.keyword();
    if column == "id" {
        format!(" ORDER BY id {direction}")
    } else {
        format!(" ORDER BY {column} {direction}, id {direction}")
    }
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` if the category doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: NewProduct) -> Result<Product, RepositoryError> {
        let (image, image_content_type) = new.image.map(ProductImage::into_parts).unzip();

        let row = sqlx::query_as::<_, ProductWithImageRow>(
            r"
            INSERT INTO larder.product
                (name, description, price, category_id, quantity, shipping, image, image_content_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, name, description, price, category_id, quantity, sold, shipping,
                      created_at, updated_at, image, image_content_type
            ",
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.category)
        .bind(new.quantity)
        .bind(new.shipping)
        .bind(image)
        .bind(image_content_type)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        Ok(row.into())
    }

    /// Get a product by ID, including its image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductWithImageRow>(
            r"
            SELECT id, name, description, price, category_id, quantity, sold, shipping,
                   created_at, updated_at, image, image_content_type
            FROM larder.product
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Merge a partial update into a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::InvalidReference` if the new category doesn't exist.
    pub async fn update(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product, RepositoryError> {
        let (image, image_content_type) = patch.image.map(ProductImage::into_parts).unzip();

        let row = sqlx::query_as::<_, ProductWithImageRow>(
            r"
            UPDATE larder.product
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                category_id = COALESCE($5, category_id),
                quantity = COALESCE($6, quantity),
                shipping = COALESCE($7, shipping),
                image = COALESCE($8, image),
                image_content_type = COALESCE($9, image_content_type),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, price, category_id, quantity, sold, shipping,
                      created_at, updated_at, image, image_content_type
            ",
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.description)
        .bind(patch.price)
        .bind(patch.category)
        .bind(patch.quantity)
        .bind(patch.shipping)
        .bind(image)
        .bind(image_content_type)
        .fetch_optional(self.pool)
        .await
        .map_err(RepositoryError::from_write)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn remove(&self, id: ProductId) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            DELETE FROM larder.product
            WHERE id = $1
            RETURNING id, name, description, price, category_id, quantity, sold, shipping,
                      created_at, updated_at
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Unfiltered listing, e.g. best sellers or new arrivals.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, listing: ProductListing) -> Result<Vec<Product>, RepositoryError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        builder.push(PRODUCT_COLUMNS);
        builder.push(" FROM larder.product");
        builder.push(order_clause(listing.sort));
        builder.push(" LIMIT ");
        builder.push_bind(listing.limit);

        let rows = builder
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Filtered, sorted, paginated search.
    ///
    /// Returns the total number of matches before pagination alongside the
    /// requested page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(
        &self,
        search: &ProductSearch,
    ) -> Result<(i64, Vec<Product>), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM larder.product");
        push_filters(&mut count, &search.filters);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;

        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        builder.push(PRODUCT_COLUMNS);
        builder.push(" FROM larder.product");
        push_filters(&mut builder, &search.filters);
        builder.push(order_clause(search.sort));
        builder.push(" LIMIT ");
        builder.push_bind(search.page.limit);
        builder.push(" OFFSET ");
        builder.push_bind(search.page.skip);

        let rows = builder
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool)
            .await?;

        Ok((total, rows.into_iter().map(Product::from).collect()))
    }

    /// Case-insensitive name substring search, optionally within a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search_by_name(&self, search: &NameSearch) -> Result<Vec<Product>, RepositoryError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        builder.push(PRODUCT_COLUMNS);
        builder.push(" FROM larder.product WHERE name ILIKE ");
        builder.push_bind(search.like_pattern());
        builder.push(r" ESCAPE '\'");
        if let Some(category) = search.category {
            builder.push(" AND category_id = ");
            builder.push_bind(category);
        }
        builder.push(" ORDER BY name, id");

        let rows = builder
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Other products in the same category as `id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn related(&self, id: ProductId, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let category: Option<(i32,)> =
            sqlx::query_as("SELECT category_id FROM larder.product WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        let (category,) = category.ok_or(RepositoryError::NotFound)?;

        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, description, price, category_id, quantity, sold, shipping,
                   created_at, updated_at
            FROM larder.product
            WHERE category_id = $1 AND id <> $2
            ORDER BY id
            LIMIT $3
            ",
        )
        .bind(category)
        .bind(id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Distinct category IDs referenced by at least one product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories_in_use(&self) -> Result<Vec<CategoryId>, RepositoryError> {
        let ids: Vec<i32> = sqlx::query_scalar(
            "SELECT DISTINCT category_id FROM larder.product ORDER BY category_id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(ids.into_iter().map(CategoryId::new).collect())
    }

    /// A product's image, if it has one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn image(&self, id: ProductId) -> Result<Option<ProductImage>, RepositoryError> {
        let row = sqlx::query_as::<_, ImageRow>(
            "SELECT image, image_content_type FROM larder.product WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(stored_image(row.image, row.image_content_type))
    }

    /// Take ordered units out of stock and count them as sold.
    ///
    /// Duplicate products in `lines` are summed first. All rows change in one
    /// statement; if any product is missing the whole step is rolled back.
    /// Calling this twice decrements twice.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if any product doesn't exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn decrease_quantity(&self, lines: &[(ProductId, i32)]) -> Result<(), RepositoryError> {
        let (ids, counts) = aggregate_line_counts(lines)?;
        if ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            UPDATE larder.product AS p
            SET quantity = p.quantity - d.count,
                sold = p.sold + d.count,
                updated_at = NOW()
            FROM UNNEST($1::int4[], $2::int4[]) AS d(id, count)
            WHERE p.id = d.id
            ",
        )
        .bind(&ids)
        .bind(&counts)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() != ids.len() as u64 {
            tx.rollback().await?;
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use larder_core::PriceRange;
    use larder_core::search::{SortField, SortOrder};

    use super::*;

    #[test]
    fn test_aggregate_sums_duplicates() {
        let lines = [
            (ProductId::new(2), 1),
            (ProductId::new(1), 3),
            (ProductId::new(2), 4),
        ];
        let (ids, counts) = aggregate_line_counts(&lines).unwrap();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(counts, vec![3, 5]);
    }

    #[test]
    fn test_aggregate_rejects_count_overflow() {
        let lines = [(ProductId::new(1), i32::MAX), (ProductId::new(1), 1)];
        assert!(matches!(
            aggregate_line_counts(&lines),
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[test]
    fn test_order_clause_breaks_ties_by_id() {
        let sort = Sort {
            field: SortField::Sold,
            order: SortOrder::Desc,
        };
        assert_eq!(order_clause(sort), " ORDER BY sold DESC, id DESC");

        let sort = Sort {
            field: SortField::Id,
            order: SortOrder::Asc,
        };
        assert_eq!(order_clause(sort), " ORDER BY id ASC");
    }

    #[test]
    fn test_filters_bind_values() {
        let filters = ProductFilters {
            categories: Some(vec![CategoryId::new(1)]),
            price_range: Some(PriceRange::new(Decimal::from(10), Decimal::from(50)).unwrap()),
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM larder.product");
        push_filters(&mut builder, &filters);
        assert_eq!(
            builder.sql(),
            "SELECT 1 FROM larder.product WHERE TRUE AND category_id = ANY($1) AND price BETWEEN $2 AND $3"
        );
    }
}
