//! User domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

use larder_core::{CategoryId, Email, ProductId, Role, UserId};

/// A storefront account as clients see it.
///
/// Never carries the password hash; credentials stay inside
/// [`crate::db::users`].
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    /// Serialized as the integer flag (`0` customer, `1` admin).
    #[serde(serialize_with = "role_flag")]
    pub role: Role,
    pub history: Vec<PurchaseRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn role_flag<S: Serializer>(role: &Role, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i16(role.as_flag())
}

/// One purchased line item, appended to a user's history when an order is
/// placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// Product that was bought.
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub category: CategoryId,
    /// Units bought.
    pub quantity: i32,
    pub transaction_id: String,
    /// Total amount charged for the whole order.
    pub amount: Decimal,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_json_has_no_credentials_and_numeric_role() {
        let user = User {
            id: UserId::new(1),
            name: "Ada".to_string(),
            email: Email::parse("ada@example.com").unwrap(),
            role: Role::Admin,
            history: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["role"], 1);
        assert_eq!(json["email"], "ada@example.com");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("salt").is_none());
    }
}
