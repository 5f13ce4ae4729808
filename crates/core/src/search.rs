//! Product listing and search queries.
//!
//! Clients send loosely-typed query parameters and JSON bodies; everything in
//! this module turns those into explicit, validated values before a store
//! query is built. Filter keys are a closed set (`category`, `price`), and sort
//! fields come from a whitelist, so no client input reaches the query text.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::{CategoryId, PriceRange, PriceRangeError};

/// Default page size for `POST /products/by/search`.
pub const DEFAULT_SEARCH_LIMIT: i64 = 100;
/// Default page size for `GET /products`.
pub const DEFAULT_LIST_LIMIT: i64 = 6;
/// Default number of related products.
pub const DEFAULT_RELATED_LIMIT: i64 = 6;
/// Upper bound for any page size.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Errors turning client input into a query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("invalid sort field: {0}")]
    SortField(String),
    #[error("invalid sort order: {0}")]
    SortOrder(String),
    #[error("skip must not be negative")]
    NegativeSkip,
    #[error("limit must be positive")]
    NonPositiveLimit,
    #[error("invalid category: {0}")]
    Category(String),
    #[error(transparent)]
    Price(#[from] PriceRangeError),
}

// =============================================================================
// Sorting
// =============================================================================

/// Product columns a listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Id,
    Name,
    Price,
    Quantity,
    Sold,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    /// Column name in the `product` table.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Price => "price",
            Self::Quantity => "quantity",
            Self::Sold => "sold",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" | "_id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "price" => Ok(Self::Price),
            "quantity" => Ok(Self::Quantity),
            "sold" => Ok(Self::Sold),
            "createdAt" | "created_at" => Ok(Self::CreatedAt),
            "updatedAt" | "updated_at" => Ok(Self::UpdatedAt),
            other => Err(FilterError::SortField(other.to_owned())),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// SQL keyword for this direction.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" | "1" => Ok(Self::Asc),
            "desc" | "descending" | "-1" => Ok(Self::Desc),
            _ => Err(FilterError::SortOrder(s.to_owned())),
        }
    }
}

/// A sort column plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub order: SortOrder,
}

impl Sort {
    fn parse(
        sort_by: Option<&str>,
        order: Option<&str>,
        default_order: SortOrder,
    ) -> Result<Self, FilterError> {
        let field = sort_by.map_or(Ok(SortField::Id), str::parse)?;
        let order = order.map_or(Ok(default_order), str::parse)?;
        Ok(Self { field, order })
    }
}

// =============================================================================
// Paging
// =============================================================================

/// An offset page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    fn parse(skip: Option<i64>, limit: Option<i64>, default_limit: i64) -> Result<Self, FilterError> {
        let skip = skip.unwrap_or(0);
        if skip < 0 {
            return Err(FilterError::NegativeSkip);
        }
        Ok(Self {
            skip,
            limit: parse_limit(limit, default_limit)?,
        })
    }
}

fn parse_limit(limit: Option<i64>, default_limit: i64) -> Result<i64, FilterError> {
    match limit {
        None => Ok(default_limit),
        Some(n) if n <= 0 => Err(FilterError::NonPositiveLimit),
        Some(n) => Ok(n.min(MAX_PAGE_LIMIT)),
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Filter section of a search body. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterRequest {
    #[serde(default)]
    pub category: Vec<CategoryId>,
    #[serde(default)]
    pub price: Vec<Decimal>,
}

/// Validated product filters. `None` means "no constraint".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductFilters {
    pub categories: Option<Vec<CategoryId>>,
    pub price_range: Option<PriceRange>,
}

impl ProductFilters {
    /// Whether a product with this category and price passes the filters.
    #[must_use]
    pub fn matches(&self, category: CategoryId, price: Decimal) -> bool {
        let category_ok = self
            .categories
            .as_ref()
            .is_none_or(|ids| ids.contains(&category));
        let price_ok = self.price_range.is_none_or(|range| range.contains(price));
        category_ok && price_ok
    }
}

impl TryFrom<FilterRequest> for ProductFilters {
    type Error = FilterError;

    fn try_from(raw: FilterRequest) -> Result<Self, Self::Error> {
        let categories = (!raw.category.is_empty()).then_some(raw.category);
        let price_range = if raw.price.is_empty() {
            None
        } else {
            Some(PriceRange::from_bounds(&raw.price)?)
        };
        Ok(Self {
            categories,
            price_range,
        })
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /products/by/search`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    #[serde(default)]
    pub filters: FilterRequest,
}

/// A validated filtered, sorted, paginated product search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSearch {
    pub filters: ProductFilters,
    pub sort: Sort,
    pub page: Page,
}

impl TryFrom<SearchRequest> for ProductSearch {
    type Error = FilterError;

    fn try_from(raw: SearchRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            sort: Sort::parse(raw.sort_by.as_deref(), raw.order.as_deref(), SortOrder::Desc)?,
            page: Page::parse(raw.skip, raw.limit, DEFAULT_SEARCH_LIMIT)?,
            filters: raw.filters.try_into()?,
        })
    }
}

/// Query string of `GET /products`.
///
/// `?sortBy=sold&order=desc&limit=4` lists best sellers,
/// `?sortBy=createdAt&order=desc&limit=4` new arrivals.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub limit: Option<i64>,
}

/// A validated unfiltered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductListing {
    pub sort: Sort,
    pub limit: i64,
}

impl TryFrom<ListRequest> for ProductListing {
    type Error = FilterError;

    fn try_from(raw: ListRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            sort: Sort::parse(raw.sort_by.as_deref(), raw.order.as_deref(), SortOrder::Asc)?,
            limit: parse_limit(raw.limit, DEFAULT_LIST_LIMIT)?,
        })
    }
}

/// Query string of `GET /products/related/{id}`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RelatedRequest {
    pub limit: Option<i64>,
}

impl RelatedRequest {
    /// Validated page size.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::NonPositiveLimit`] for a zero or negative limit.
    pub fn limit(self) -> Result<i64, FilterError> {
        parse_limit(self.limit, DEFAULT_RELATED_LIMIT)
    }
}

/// Query string of `GET /products/search`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextSearchRequest {
    pub search: Option<String>,
    pub category: Option<String>,
}

/// A validated case-insensitive name search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameSearch {
    pub term: String,
    pub category: Option<CategoryId>,
}

impl NameSearch {
    /// Build a search from the query string.
    ///
    /// Returns `Ok(None)` when no search term was given. A `category` of
    /// `All` (or none) searches every category.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Category`] if the category is not a valid id.
    pub fn from_request(raw: TextSearchRequest) -> Result<Option<Self>, FilterError> {
        let Some(term) = raw.search.map(|t| t.trim().to_owned()).filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let category = match raw.category.as_deref().map(str::trim) {
            None | Some("" | "All") => None,
            Some(id) => Some(
                id.parse::<CategoryId>()
                    .map_err(|_| FilterError::Category(id.to_owned()))?,
            ),
        };
        Ok(Some(Self { term, category }))
    }

    /// `ILIKE` pattern matching the term anywhere in a name.
    ///
    /// Wildcard characters in the term are escaped so they match literally.
    #[must_use]
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.term.len() + 2);
        pattern.push('%');
        for c in self.term.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn search(json: &str) -> Result<ProductSearch, FilterError> {
        let raw: SearchRequest = serde_json::from_str(json).unwrap();
        raw.try_into()
    }

    #[test]
    fn test_search_defaults() {
        let query = search("{}").unwrap();
        assert_eq!(query.sort.field, SortField::Id);
        assert_eq!(query.sort.order, SortOrder::Desc);
        assert_eq!(query.page, Page { skip: 0, limit: 100 });
        assert_eq!(query.filters, ProductFilters::default());
    }

    #[test]
    fn test_price_filter_becomes_closed_range() {
        let query = search(r#"{"filters": {"price": [10, 50]}}"#).unwrap();
        let range = query.filters.price_range.unwrap();
        assert_eq!(range.min(), Decimal::from(10));
        assert_eq!(range.max(), Decimal::from(50));
        assert!(query.filters.matches(CategoryId::new(1), Decimal::from(50)));
        assert!(!query.filters.matches(CategoryId::new(1), Decimal::from(51)));
    }

    #[test]
    fn test_empty_arrays_mean_no_filter() {
        let query = search(r#"{"filters": {"category": [], "price": []}}"#).unwrap();
        assert!(query.filters.categories.is_none());
        assert!(query.filters.price_range.is_none());
    }

    #[test]
    fn test_category_filter_is_exact_membership() {
        let query = search(r#"{"filters": {"category": [2, 3]}}"#).unwrap();
        assert!(query.filters.matches(CategoryId::new(3), Decimal::ONE));
        assert!(!query.filters.matches(CategoryId::new(4), Decimal::ONE));
    }

    #[test]
    fn test_unknown_filter_keys_are_rejected() {
        let raw = serde_json::from_str::<SearchRequest>(r#"{"filters": {"$where": "1"}}"#);
        assert!(raw.is_err());
    }

    #[test]
    fn test_bad_price_arity_is_rejected() {
        assert!(matches!(
            search(r#"{"filters": {"price": [10]}}"#),
            Err(FilterError::Price(PriceRangeError::Arity))
        ));
    }

    #[test]
    fn test_sort_field_whitelist() {
        let query = search(r#"{"sortBy": "sold", "order": "asc"}"#).unwrap();
        assert_eq!(query.sort.field.column(), "sold");
        assert_eq!(query.sort.order, SortOrder::Asc);
        assert!(matches!(
            search(r#"{"sortBy": "price; DROP TABLE product"}"#),
            Err(FilterError::SortField(_))
        ));
    }

    #[test]
    fn test_limit_is_clamped_and_validated() {
        assert_eq!(search(r#"{"limit": 500}"#).unwrap().page.limit, MAX_PAGE_LIMIT);
        assert_eq!(
            search(r#"{"limit": 0}"#),
            Err(FilterError::NonPositiveLimit)
        );
        assert_eq!(search(r#"{"skip": -1}"#), Err(FilterError::NegativeSkip));
    }

    #[test]
    fn test_listing_defaults() {
        let listing = ProductListing::try_from(ListRequest::default()).unwrap();
        assert_eq!(listing.sort.field, SortField::Id);
        assert_eq!(listing.sort.order, SortOrder::Asc);
        assert_eq!(listing.limit, DEFAULT_LIST_LIMIT);
    }

    #[test]
    fn test_listing_accepts_created_at_alias() {
        let listing = ProductListing::try_from(ListRequest {
            sort_by: Some("createdAt".into()),
            order: Some("desc".into()),
            limit: Some(4),
        })
        .unwrap();
        assert_eq!(listing.sort.field, SortField::CreatedAt);
        assert_eq!(listing.limit, 4);
    }

    #[test]
    fn test_name_search_requires_term() {
        let none = NameSearch::from_request(TextSearchRequest::default()).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_name_search_all_category() {
        let found = NameSearch::from_request(TextSearchRequest {
            search: Some("tea".into()),
            category: Some("All".into()),
        })
        .unwrap()
        .unwrap();
        assert_eq!(found.category, None);
        assert_eq!(found.like_pattern(), "%tea%");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        let found = NameSearch::from_request(TextSearchRequest {
            search: Some("100%_off".into()),
            category: Some("4".into()),
        })
        .unwrap()
        .unwrap();
        assert_eq!(found.category, Some(CategoryId::new(4)));
        assert_eq!(found.like_pattern(), "%100\\%\\_off%");
    }
}
