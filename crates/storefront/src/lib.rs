//! TechShop Storefront library.
//!
//! Client-side state for the TechShop storefront: the signed-in user's cart
//! and favorites kept in step with a remote document store, plus the
//! catalog, checkout, profile and management flows built on the same store.
//!
//! # Modules
//!
//! - [`store`] - `DocumentStore` trait with in-memory and JSON-file bindings
//! - [`session`] - Per-user cart and favorites managers
//! - [`navigation`] - Screen stack for the application shell
//! - [`catalog`] - Cached product, category and brand reads
//! - [`checkout`] - Order placement
//! - [`profile`] - Profile and delivery address edits
//! - [`admin`] - Product, order and user management
//! - [`services`] - Authentication and notifications

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod admin;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod navigation;
pub mod profile;
pub mod services;
pub mod session;
pub mod state;
pub mod store;

pub use error::{Result, StorefrontError};
pub use state::AppState;
