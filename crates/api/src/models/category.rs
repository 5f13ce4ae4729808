//! Category domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use larder_core::CategoryId;

/// Maximum length of a category name.
pub const MAX_CATEGORY_NAME: usize = 32;

/// A product category.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
