//! Authorization decisions.
//!
//! Routes that act on a user's resources carry the owner's id in the path
//! (`/user/{user_id}`, `/category/create/{user_id}`, ...). A request is allowed
//! when the token's identity *is* that owner and, for admin routes, when the
//! owner holds the [`Role::Admin`] role.
//!
//! [`authorize`] is transport independent: the HTTP layer resolves the
//! identity and the owner, then maps the [`Decision`] to a status code.

use serde::{Deserialize, Serialize};

use crate::{Role, UserId};

/// The authenticated caller, decoded from a verified session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
}

/// The account that owns the resource a route acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceOwner {
    pub id: UserId,
    pub role: Role,
}

/// What a route demands of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The caller must be the owner.
    Owner,
    /// The caller must be the owner, and the owner must be an admin.
    Admin,
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No verified identity was presented.
    Unauthenticated,
    /// The identity does not match the resource owner.
    NotOwner,
    /// The owner lacks the admin role.
    NotAdmin,
}

impl DenyReason {
    /// Client-facing explanation.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Unauthenticated => "Token required",
            Self::NotOwner => "Access denied",
            Self::NotAdmin => "Admin resource! Access denied",
        }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Decide whether `identity` may act on a resource owned by `owner`.
#[must_use]
pub fn authorize(identity: Option<&Identity>, owner: &ResourceOwner, access: Access) -> Decision {
    let Some(identity) = identity else {
        return Decision::Deny(DenyReason::Unauthenticated);
    };

    if identity.user_id != owner.id {
        return Decision::Deny(DenyReason::NotOwner);
    }

    match access {
        Access::Owner => Decision::Allow,
        Access::Admin if owner.role.is_admin() => Decision::Allow,
        Access::Admin => Decision::Deny(DenyReason::NotAdmin),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn owner(id: i32, role: Role) -> ResourceOwner {
        ResourceOwner {
            id: UserId::new(id),
            role,
        }
    }

    const fn identity(id: i32) -> Identity {
        Identity {
            user_id: UserId::new(id),
        }
    }

    #[test]
    fn test_missing_identity_is_unauthenticated() {
        let decision = authorize(None, &owner(1, Role::Admin), Access::Owner);
        assert_eq!(decision, Decision::Deny(DenyReason::Unauthenticated));
    }

    #[test]
    fn test_owner_access_requires_matching_id() {
        let me = identity(1);
        assert!(authorize(Some(&me), &owner(1, Role::Customer), Access::Owner).is_allowed());
        assert_eq!(
            authorize(Some(&me), &owner(2, Role::Customer), Access::Owner),
            Decision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn test_admin_access_requires_admin_owner() {
        let me = identity(5);
        assert!(authorize(Some(&me), &owner(5, Role::Admin), Access::Admin).is_allowed());
        assert_eq!(
            authorize(Some(&me), &owner(5, Role::Customer), Access::Admin),
            Decision::Deny(DenyReason::NotAdmin)
        );
    }

    #[test]
    fn test_admin_cannot_act_through_another_users_path() {
        // Ownership is checked before role: an admin id in the token does not
        // unlock another account's routes.
        let admin = identity(1);
        assert_eq!(
            authorize(Some(&admin), &owner(2, Role::Admin), Access::Admin),
            Decision::Deny(DenyReason::NotOwner)
        );
    }
}
