//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `TECHSHOP_DATA_PATH` - JSON data file used by the file store (default: techshop-data.json)
//! - `TECHSHOP_SYNC_POLICY` - `optimistic` or `revert` (default: optimistic)
//! - `TECHSHOP_CATALOG_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `TECHSHOP_FREE_DELIVERY_THRESHOLD` - Cart total above which delivery is free (default: 50000)
//! - `TECHSHOP_STANDARD_DELIVERY_FEE` - Cart-screen delivery quote (default: 500)
//! - `TECHSHOP_EXPRESS_DELIVERY_FEE` - Checkout surcharge for express delivery (default: 500)
//! - `TECHSHOP_ADMIN_EMAIL` / `TECHSHOP_ADMIN_PASSWORD` - Administrator created by `techshop seed`

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::services::auth::MIN_PASSWORD_LENGTH;
use crate::session::SyncPolicy;

const DEFAULT_DATA_PATH: &str = "techshop-data.json";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Location of the JSON data file
    pub data_path: PathBuf,
    /// What to do with local state when a remote write fails
    pub sync_policy: SyncPolicy,
    /// How long fetched catalog collections stay cached
    pub catalog_cache_ttl: Duration,
    /// Delivery pricing
    pub delivery: DeliveryRates,
    /// Administrator account created when seeding, if configured
    pub seed_admin: Option<SeedAccount>,
}

/// Delivery pricing in roubles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryRates {
    /// Cart totals strictly above this ship for free
    pub free_threshold: Decimal,
    /// Delivery quote on the cart screen below the threshold
    pub standard_fee: Decimal,
    /// Fee for express delivery at checkout
    pub express_fee: Decimal,
}

impl Default for DeliveryRates {
    fn default() -> Self {
        Self {
            free_threshold: Decimal::from(50_000),
            standard_fee: Decimal::from(500),
            express_fee: Decimal::from(500),
        }
    }
}

impl DeliveryRates {
    /// Delivery quote for a cart with the given total.
    ///
    /// Free strictly above `free_threshold`, otherwise `standard_fee`. An
    /// empty cart (total zero) is deliberately quoted zero rather than the
    /// flat fee, since there is nothing to deliver.
    #[must_use]
    pub fn cart_fee(&self, total: Decimal) -> Decimal {
        if total.is_zero() || total > self.free_threshold {
            Decimal::ZERO
        } else {
            self.standard_fee
        }
    }
}

/// Credentials for an account created by the seed command.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SeedAccount {
    pub email: String,
    pub password: SecretString,
}

impl std::fmt::Debug for SeedAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedAccount")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            sync_policy: SyncPolicy::default(),
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            delivery: DeliveryRates::default(),
            seed_admin: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let data_path = get("TECHSHOP_DATA_PATH").map_or(defaults.data_path, PathBuf::from);
        let sync_policy = parse_or(&get, "TECHSHOP_SYNC_POLICY", defaults.sync_policy)?;
        let cache_secs = parse_or(&get, "TECHSHOP_CATALOG_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?;

        let delivery = DeliveryRates {
            free_threshold: parse_amount(
                &get,
                "TECHSHOP_FREE_DELIVERY_THRESHOLD",
                defaults.delivery.free_threshold,
            )?,
            standard_fee: parse_amount(
                &get,
                "TECHSHOP_STANDARD_DELIVERY_FEE",
                defaults.delivery.standard_fee,
            )?,
            express_fee: parse_amount(
                &get,
                "TECHSHOP_EXPRESS_DELIVERY_FEE",
                defaults.delivery.express_fee,
            )?,
        };

        let seed_admin = match (get("TECHSHOP_ADMIN_EMAIL"), get("TECHSHOP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => {
                let password = SecretString::from(password);
                validate_seed_password(&password, "TECHSHOP_ADMIN_PASSWORD")?;
                Some(SeedAccount { email, password })
            }
            (Some(_), None) => {
                return Err(ConfigError::MissingEnvVar(
                    "TECHSHOP_ADMIN_PASSWORD".to_string(),
                ));
            }
            (None, _) => None,
        };

        Ok(Self {
            data_path,
            sync_policy,
            catalog_cache_ttl: Duration::from_secs(cache_secs),
            delivery,
            seed_admin,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a variable, falling back to `default` when it is unset.
fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse a non-negative money amount.
fn parse_amount(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Decimal,
) -> Result<Decimal, ConfigError> {
    let amount = parse_or(get, key, default)?;
    if amount.is_sign_negative() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(amount)
}

/// Seed passwords go through the same length rule as sign-up.
fn validate_seed_password(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let length = secret.expose_secret().chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_PASSWORD_LENGTH} characters (got {length})"),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.data_path, PathBuf::from("techshop-data.json"));
        assert_eq!(config.sync_policy, SyncPolicy::Optimistic);
        assert_eq!(config.catalog_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.delivery, DeliveryRates::default());
        assert!(config.seed_admin.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("TECHSHOP_DATA_PATH", "/tmp/shop.json"),
            ("TECHSHOP_SYNC_POLICY", "revert"),
            ("TECHSHOP_CATALOG_CACHE_TTL_SECS", "60"),
            ("TECHSHOP_EXPRESS_DELIVERY_FEE", "990.50"),
        ])
        .unwrap();
        assert_eq!(config.data_path, PathBuf::from("/tmp/shop.json"));
        assert_eq!(config.sync_policy, SyncPolicy::RevertOnFailure);
        assert_eq!(config.catalog_cache_ttl, Duration::from_secs(60));
        assert_eq!(config.delivery.express_fee, Decimal::new(99050, 2));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("TECHSHOP_SYNC_POLICY", "eventually")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            load(&[("TECHSHOP_STANDARD_DELIVERY_FEE", "-1")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            load(&[("TECHSHOP_CATALOG_CACHE_TTL_SECS", "soon")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_seed_admin() {
        let config = load(&[
            ("TECHSHOP_ADMIN_EMAIL", "admin@techshop.ru"),
            ("TECHSHOP_ADMIN_PASSWORD", "admin123"),
        ])
        .unwrap();
        let admin = config.seed_admin.unwrap();
        assert_eq!(admin.password.expose_secret(), "admin123");
        assert!(!format!("{admin:?}").contains("admin123"));

        assert!(matches!(
            load(&[("TECHSHOP_ADMIN_EMAIL", "admin@techshop.ru")]),
            Err(ConfigError::MissingEnvVar(_))
        ));
        assert!(matches!(
            load(&[
                ("TECHSHOP_ADMIN_EMAIL", "admin@techshop.ru"),
                ("TECHSHOP_ADMIN_PASSWORD", "123"),
            ]),
            Err(ConfigError::InsecureSecret(_, _))
        ));
    }

    #[test]
    fn test_cart_fee() {
        let rates = DeliveryRates::default();
        assert_eq!(rates.cart_fee(Decimal::ZERO), Decimal::ZERO);
        assert_eq!(rates.cart_fee(Decimal::from(1000)), Decimal::from(500));
        assert_eq!(rates.cart_fee(Decimal::from(50_000)), Decimal::from(500));
        assert_eq!(rates.cart_fee(Decimal::from(50_001)), Decimal::ZERO);
    }
}
