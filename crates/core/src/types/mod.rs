//! Core types for TechShop.
//!
//! This module provides type-safe wrappers for common domain concepts and the
//! document shapes persisted in the remote store.

pub mod catalog;
pub mod email;
pub mod id;
pub mod order;
pub mod price;
pub mod status;
pub mod user;

pub use catalog::{
    Brand, Category, LOW_STOCK_THRESHOLD, Product, ProductAttribute, discount_percent,
};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{Order, OrderItem};
pub use price::{CurrencyCode, Price};
pub use status::*;
pub use user::{DeliveryAddress, FAVORITES_FIELD, UserRecord};
