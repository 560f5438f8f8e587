//! Profile and delivery address management.
//!
//! Every operation reads `users/{uid}`, edits the record locally and merges
//! the changed fields back. Addresses are stored as a single array, so each
//! address change rewrites the whole list.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use techshop_core::{AddressId, DeliveryAddress, Email, EmailError, UserId, UserRecord};

use crate::services::auth;
use crate::store::{DocumentStore, SetOptions, StoreError, WriteBatch, encode, paths};

/// Errors from profile operations.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    #[error("address not found: {0}")]
    AddressNotFound(AddressId),

    #[error("name cannot be empty")]
    EmptyName,

    /// Another account already signs in with this email.
    #[error("email already in use: {0}")]
    EmailTaken(String),

    #[error(transparent)]
    InvalidEmail(#[from] EmailError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Editable profile fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// A delivery address as entered in the form, before it has an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressInput {
    pub name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub phone: String,
    pub is_default: bool,
}

impl AddressInput {
    fn into_address(self, id: AddressId) -> DeliveryAddress {
        DeliveryAddress {
            id,
            name: self.name,
            address: self.address,
            city: self.city,
            postal_code: self.postal_code,
            phone: self.phone,
            is_default: self.is_default,
        }
    }
}

#[derive(Serialize)]
struct ProfilePatch<'a> {
    name: &'a str,
    email: &'a str,
    phone: Option<&'a str>,
}

#[derive(Serialize)]
struct AddressesPatch<'a> {
    addresses: &'a [DeliveryAddress],
}

/// Reads and edits user profiles.
#[derive(Debug, Clone)]
pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
}

impl ProfileService {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Fetch a user's profile.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::UserNotFound` if there is no record.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn load(&self, user_id: &UserId) -> Result<UserRecord, ProfileError> {
        self.store
            .get(&paths::user(user_id)?)
            .await?
            .ok_or_else(|| ProfileError::UserNotFound(user_id.clone()))?
            .decode()
            .map_err(ProfileError::from)
    }

    /// Replace name, email and phone.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank, the email is malformed or used
    /// by another account, or the store call fails. A changed email moves the
    /// sign-in account with it.
    #[instrument(skip(self, update), fields(user_id = %user_id))]
    pub async fn update_profile(
        &self,
        user_id: &UserId,
        update: ProfileUpdate,
    ) -> Result<UserRecord, ProfileError> {
        let name = update.name.trim();
        if name.is_empty() {
            return Err(ProfileError::EmptyName);
        }
        let email = Email::parse(&update.email)?;
        let phone = update
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty());

        let mut record = self.load(user_id).await?;
        let mut batch = WriteBatch::new();
        if !auth::stage_email_change(self.store.as_ref(), user_id, &email, &mut batch).await? {
            return Err(ProfileError::EmailTaken(email.as_str().to_owned()));
        }
        let patch = ProfilePatch {
            name,
            email: email.as_str(),
            phone,
        };
        batch.set(paths::user(user_id)?, encode(&patch)?, SetOptions::MERGE);
        self.store.commit(batch).await?;

        record.name = name.to_owned();
        record.email = email.as_str().to_owned();
        record.phone = phone.map(str::to_owned);
        tracing::info!("Profile updated");
        Ok(record)
    }

    /// Save a new address. A new default address clears the flag on the
    /// others.
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist or the store call fails.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn add_address(
        &self,
        user_id: &UserId,
        input: AddressInput,
    ) -> Result<DeliveryAddress, ProfileError> {
        let mut record = self.load(user_id).await?;
        let address = input.into_address(AddressId::generate());
        if address.is_default {
            clear_defaults(&mut record.addresses);
        }
        record.addresses.push(address.clone());
        self.save_addresses(user_id, &record.addresses).await?;
        tracing::info!(address_id = %address.id, "Address added");
        Ok(address)
    }

    /// Overwrite an existing address, keeping its id.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::AddressNotFound` for an unknown id.
    #[instrument(skip(self, input), fields(user_id = %user_id, address_id = %address_id))]
    pub async fn update_address(
        &self,
        user_id: &UserId,
        address_id: &AddressId,
        input: AddressInput,
    ) -> Result<DeliveryAddress, ProfileError> {
        let mut record = self.load(user_id).await?;
        let index = record
            .addresses
            .iter()
            .position(|a| &a.id == address_id)
            .ok_or_else(|| ProfileError::AddressNotFound(address_id.clone()))?;

        let address = input.into_address(address_id.clone());
        if address.is_default {
            clear_defaults(&mut record.addresses);
        }
        if let Some(slot) = record.addresses.get_mut(index) {
            *slot = address.clone();
        }
        self.save_addresses(user_id, &record.addresses).await?;
        Ok(address)
    }

    /// Delete an address. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist or the store call fails.
    #[instrument(skip(self), fields(user_id = %user_id, address_id = %address_id))]
    pub async fn remove_address(
        &self,
        user_id: &UserId,
        address_id: &AddressId,
    ) -> Result<Vec<DeliveryAddress>, ProfileError> {
        let mut record = self.load(user_id).await?;
        record.addresses.retain(|a| &a.id != address_id);
        self.save_addresses(user_id, &record.addresses).await?;
        Ok(record.addresses)
    }

    /// Make `address_id` the only default address.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::AddressNotFound` for an unknown id.
    #[instrument(skip(self), fields(user_id = %user_id, address_id = %address_id))]
    pub async fn set_default_address(
        &self,
        user_id: &UserId,
        address_id: &AddressId,
    ) -> Result<Vec<DeliveryAddress>, ProfileError> {
        let mut record = self.load(user_id).await?;
        if record.address(address_id).is_none() {
            return Err(ProfileError::AddressNotFound(address_id.clone()));
        }
        for address in &mut record.addresses {
            address.is_default = &address.id == address_id;
        }
        self.save_addresses(user_id, &record.addresses).await?;
        Ok(record.addresses)
    }

    async fn save_addresses(
        &self,
        user_id: &UserId,
        addresses: &[DeliveryAddress],
    ) -> Result<(), ProfileError> {
        self.store
            .set(
                &paths::user(user_id)?,
                encode(&AddressesPatch { addresses })?,
                SetOptions::MERGE,
            )
            .await?;
        Ok(())
    }
}

fn clear_defaults(addresses: &mut [DeliveryAddress]) {
    for address in addresses {
        address.is_default = false;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use techshop_core::{ProductId, UserRole};

    use super::*;
    use crate::services::auth::AuthService;
    use crate::store::MemoryStore;

    fn input(name: &str, is_default: bool) -> AddressInput {
        AddressInput {
            name: name.to_string(),
            address: "ул. Ленина, 1".to_string(),
            city: "Москва".to_string(),
            postal_code: "101000".to_string(),
            phone: "+7 900 000-00-00".to_string(),
            is_default,
        }
    }

    async fn service_with_user() -> (ProfileService, Arc<MemoryStore>, UserId) {
        let store = Arc::new(MemoryStore::new());
        let mut user = UserRecord::new(
            UserId::new("u1"),
            "Анна",
            "anna@example.com",
            UserRole::User,
            Utc::now(),
        );
        user.favorite_products = vec![ProductId::new("p1")];
        store
            .set(
                &paths::user(&user.id).unwrap(),
                encode(&user).unwrap(),
                SetOptions::REPLACE,
            )
            .await
            .unwrap();
        (ProfileService::new(store.clone()), store, user.id)
    }

    #[tokio::test]
    async fn test_new_default_clears_others() {
        let (profile, _store, user_id) = service_with_user().await;
        let home = profile.add_address(&user_id, input("Дом", true)).await.unwrap();
        let work = profile.add_address(&user_id, input("Работа", true)).await.unwrap();

        let record = profile.load(&user_id).await.unwrap();
        assert_eq!(record.addresses.len(), 2);
        assert!(!record.address(&home.id).unwrap().is_default);
        assert_eq!(record.default_address().unwrap().id, work.id);
    }

    #[tokio::test]
    async fn test_set_default_and_remove() {
        let (profile, _store, user_id) = service_with_user().await;
        let home = profile.add_address(&user_id, input("Дом", true)).await.unwrap();
        let work = profile.add_address(&user_id, input("Работа", false)).await.unwrap();

        let addresses = profile.set_default_address(&user_id, &work.id).await.unwrap();
        assert_eq!(addresses.iter().filter(|a| a.is_default).count(), 1);

        let addresses = profile.remove_address(&user_id, &home.id).await.unwrap();
        assert_eq!(addresses.len(), 1);
        assert_eq!(profile.load(&user_id).await.unwrap().addresses, addresses);

        assert!(matches!(
            profile.set_default_address(&user_id, &home.id).await,
            Err(ProfileError::AddressNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_address_keeps_id() {
        let (profile, _store, user_id) = service_with_user().await;
        let home = profile.add_address(&user_id, input("Дом", false)).await.unwrap();
        let updated = profile
            .update_address(&user_id, &home.id, input("Дача", false))
            .await
            .unwrap();
        assert_eq!(updated.id, home.id);
        assert_eq!(
            profile.load(&user_id).await.unwrap().addresses[0].name,
            "Дача"
        );
    }

    #[tokio::test]
    async fn test_update_profile_merges_fields() {
        let (profile, _store, user_id) = service_with_user().await;
        let record = profile
            .update_profile(
                &user_id,
                ProfileUpdate {
                    name: " Анна Петрова ".to_string(),
                    email: "anna.p@example.com".to_string(),
                    phone: Some("+7 901 111-11-11".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(record.name, "Анна Петрова");

        let stored = profile.load(&user_id).await.unwrap();
        assert_eq!(stored.email, "anna.p@example.com");
        assert_eq!(stored.phone.as_deref(), Some("+7 901 111-11-11"));
        assert_eq!(stored.favorite_products, vec![ProductId::new("p1")]);
    }

    #[tokio::test]
    async fn test_email_change_follows_sign_in() {
        let store = Arc::new(MemoryStore::new());
        let auth = AuthService::new(store.clone());
        let profile = ProfileService::new(store.clone());
        let anna = auth
            .sign_up("Анна", "anna@example.com", "secret1")
            .await
            .unwrap();
        auth.sign_up("Борис", "boris@example.com", "secret2")
            .await
            .unwrap();

        let to_boris = ProfileUpdate {
            name: "Анна".to_string(),
            email: "Boris@example.com".to_string(),
            phone: None,
        };
        assert!(matches!(
            profile.update_profile(&anna.id, to_boris).await,
            Err(ProfileError::EmailTaken(email)) if email == "boris@example.com"
        ));
        assert_eq!(profile.load(&anna.id).await.unwrap().email, "anna@example.com");

        let renamed = ProfileUpdate {
            name: "Анна".to_string(),
            email: "anna.k@example.com".to_string(),
            phone: None,
        };
        profile.update_profile(&anna.id, renamed).await.unwrap();
        assert_eq!(
            auth.sign_in("anna.k@example.com", "secret1").await.unwrap().id,
            anna.id
        );
        assert!(auth.sign_in("anna@example.com", "secret1").await.is_err());
    }

    #[tokio::test]
    async fn test_update_profile_validation() {
        let (profile, _store, user_id) = service_with_user().await;
        let blank = ProfileUpdate {
            name: "  ".to_string(),
            email: "anna@example.com".to_string(),
            phone: None,
        };
        assert!(matches!(
            profile.update_profile(&user_id, blank).await,
            Err(ProfileError::EmptyName)
        ));

        let missing = profile.load(&UserId::new("ghost")).await;
        assert!(matches!(missing, Err(ProfileError::UserNotFound(_))));
    }
}
