//! Larder Core - Shared types and domain rules.
//!
//! This crate provides the types and pure decision logic used across all
//! Larder components:
//! - `api` - JSON REST server for the storefront
//! - `cli` - Command-line tools for migrations and account management
//! - client code that keeps a shopping cart in local storage
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no database access,
//! no HTTP clients. Persistence seams (such as cart storage) are traits that
//! callers implement.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, roles, order statuses, product images
//! - [`authz`] - Authorization decisions as a function of identity and resource
//! - [`search`] - Validated product listing and search queries
//! - [`cart`] - Client-side cart store
//! - [`checkout`] - Order placement saga stages and compensations

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod authz;
pub mod cart;
pub mod checkout;
pub mod search;
pub mod types;

pub use types::*;
