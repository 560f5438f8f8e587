//! Services shared by the storefront screens.
//!
//! # Services
//!
//! - `auth` - Account creation, password sign-in and the current-user channel
//! - `notifications` - Transient toasts and the notification inbox

pub mod auth;
pub mod notifications;
