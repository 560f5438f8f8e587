//! TechShop Core - Shared types library.
//!
//! This crate provides the domain types used across all TechShop components:
//! - `storefront` - Cart/favorites synchronization, catalog, checkout, admin
//! - `cli` - Command-line tools for seeding and operating a local data file
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no store access, no clocks
//! beyond what callers pass in. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, emails, statuses and the persisted
//!   catalog, user and order records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
