//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password accounts and signed session tokens
//! - `checkout` - Order placement saga (order, inventory, history)
//! - `payment` - Braintree payment processor client

pub mod auth;
pub mod checkout;
pub mod payment;
