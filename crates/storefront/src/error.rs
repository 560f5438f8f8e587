//! Unified error handling.
//!
//! Provides a unified `StorefrontError` type for callers that drive several
//! services at once (the CLI, integration tests). Each subsystem keeps its
//! own error enum; this type wraps them and decides what a customer gets to
//! see.

use thiserror::Error;

use crate::admin::AdminError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::profile::ProfileError;
use crate::services::auth::AuthError;
use crate::store::StoreError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Document store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order placement failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Profile update failed.
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Management operation failed.
    #[error("Admin error: {0}")]
    Admin(#[from] AdminError),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not signed in.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Invalid input.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl StorefrontError {
    /// Whether the failure lies with the backend rather than the input.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Store(_)
                | Self::Config(_)
                | Self::Auth(AuthError::Store(_) | AuthError::PasswordHash)
                | Self::Checkout(CheckoutError::Store(_))
                | Self::Profile(ProfileError::Store(_))
                | Self::Admin(AdminError::Store(_))
        )
    }

    /// Message safe to show a customer. Internal details are not exposed.
    #[must_use]
    pub fn user_message(&self) -> String {
        if self.is_internal() {
            return "Сервис временно недоступен".to_string();
        }
        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => {
                    "Неверный email или пароль".to_string()
                }
                AuthError::UserAlreadyExists => {
                    "Пользователь с таким email уже существует".to_string()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Некорректный email".to_string(),
                AuthError::EmptyName => "Введите имя".to_string(),
                _ => "Ошибка авторизации".to_string(),
            },
            Self::Checkout(err) => err.toast_title().to_string(),
            Self::Profile(err) => match err {
                ProfileError::EmptyName => "Введите имя".to_string(),
                ProfileError::InvalidEmail(_) => "Некорректный email".to_string(),
                ProfileError::AddressNotFound(_) => "Адрес не найден".to_string(),
                ProfileError::EmailTaken(_) => {
                    "Пользователь с таким email уже существует".to_string()
                }
                _ => "Профиль не найден".to_string(),
            },
            Self::Admin(err) => match err {
                AdminError::Forbidden { .. } => "Недостаточно прав".to_string(),
                AdminError::ProductInOrders { .. } => {
                    "Нельзя удалить товар, который есть в заказах".to_string()
                }
                AdminError::UserHasOrders { .. } => {
                    "Нельзя удалить пользователя с заказами".to_string()
                }
                AdminError::Validation(msg) => msg.clone(),
                _ => "Ошибка сохранения".to_string(),
            },
            _ => self.to_string(),
        }
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;
