//! Account roles.
//!
//! Accounts are stored with an integer role flag (`0` customer, `1` admin).
//! [`Role`] is the typed view of that flag; anything other than `1` is
//! treated as a customer so an unexpected value never grants admin access.

use serde::{Deserialize, Serialize};

/// Capability level of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular shopper. Can manage only their own profile and orders.
    #[default]
    Customer,
    /// Store administrator. Can manage the catalog and all orders.
    Admin,
}

impl Role {
    /// Integer flag used in storage and in the public profile.
    #[must_use]
    pub const fn as_flag(self) -> i16 {
        match self {
            Self::Customer => 0,
            Self::Admin => 1,
        }
    }

    /// Build a role from its stored flag.
    #[must_use]
    pub const fn from_flag(flag: i16) -> Self {
        match flag {
            1 => Self::Admin,
            _ => Self::Customer,
        }
    }

    /// Whether this role may manage the catalog and orders.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" | "0" => Ok(Self::Customer),
            "admin" | "1" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i16 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let flag = <i16 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::from_flag(flag))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Role {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_flag(), buf)
    }
}
