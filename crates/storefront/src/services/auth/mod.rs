//! Authentication service.
//!
//! Password accounts live in `auth_accounts/{email}` next to the profile in
//! `users/{uid}`. The currently signed-in user is published on a
//! [`tokio::sync::watch`] channel; sessions subscribe to it and reload
//! their cart and favorites whenever it changes.
//!
//! The account key follows the profile email: changing the email moves the
//! account document, so an address always belongs to at most one user.

mod error;

pub use error::AuthError;

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::instrument;

use techshop_core::{Email, UserId, UserRecord, UserRole};

use crate::store::{DocumentPath, DocumentStore, SetOptions, StoreError, WriteBatch, encode, paths};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Sign-in credentials stored under `auth_accounts/{email}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRecord {
    user_id: UserId,
    email: String,
    password_hash: String,
}

/// Authentication service.
///
/// Handles account creation and password sign-in, and tracks who is
/// currently signed in.
pub struct AuthService {
    store: Arc<dyn DocumentStore>,
    current: watch::Sender<Option<UserId>>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("current", &*self.current.borrow())
            .finish_non_exhaustive()
    }
}

impl AuthService {
    /// Create a service with nobody signed in.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let (current, _) = watch::channel(None);
        Self { store, current }
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Register a customer account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserRecord, AuthError> {
        let user = self
            .create_account(name, email, password, UserRole::User)
            .await?;
        self.set_current(Some(user.id.clone()));
        Ok(user)
    }

    /// Register an account with the given role without touching the
    /// current session.
    ///
    /// The credentials and the profile are written in one batch.
    ///
    /// # Errors
    ///
    /// Same as [`AuthService::sign_up`].
    #[instrument(skip(self, name, password), fields(email = %email, role = %role))]
    pub async fn create_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> Result<UserRecord, AuthError> {
        let email = Email::parse(email)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::EmptyName);
        }
        validate_password(password)?;

        let account_path = paths::auth_accounts().doc(email.as_str())?;
        if self.store.get(&account_path).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(password)?;
        let user = UserRecord::new(UserId::generate(), name, email.as_str(), role, Utc::now());
        let account = AccountRecord {
            user_id: user.id.clone(),
            email: email.as_str().to_owned(),
            password_hash,
        };

        let mut batch = WriteBatch::new();
        batch
            .set(account_path, encode(&account)?, SetOptions::REPLACE)
            .set(paths::user(&user.id)?, encode(&user)?, SetOptions::REPLACE);
        self.store.commit(batch).await?;

        tracing::info!(user_id = %user.id, "Account created");
        Ok(user)
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::UserNotFound` if the profile has been deleted.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserRecord, AuthError> {
        let email = Email::parse(email)?;

        let account: AccountRecord = self
            .store
            .get(&paths::auth_accounts().doc(email.as_str())?)
            .await?
            .ok_or(AuthError::InvalidCredentials)?
            .decode()?;

        verify_password(password, &account.password_hash)?;

        let user: UserRecord = self
            .store
            .get(&paths::user(&account.user_id)?)
            .await?
            .ok_or(AuthError::UserNotFound)?
            .decode()?;

        self.set_current(Some(user.id.clone()));
        tracing::info!(user_id = %user.id, "Signed in");
        Ok(user)
    }

    /// Sign the current user out. Signing out twice is harmless.
    pub fn sign_out(&self) {
        if let Some(user_id) = self.current_user() {
            tracing::info!(user_id = %user_id, "Signed out");
        }
        self.set_current(None);
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<UserId> {
        self.current.borrow().clone()
    }

    /// Subscribe to sign-in and sign-out events.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<UserId>> {
        self.current.subscribe()
    }

    fn set_current(&self, user_id: Option<UserId>) {
        self.current.send_if_modified(|current| {
            if *current == user_id {
                return false;
            }
            *current = user_id;
            true
        });
    }
}

// =============================================================================
// Account keys
// =============================================================================

/// Find the sign-in account owned by `user_id`.
///
/// Looks the account up by owner, so it does not matter which email the
/// profile currently shows.
pub(crate) async fn account_of(
    store: &dyn DocumentStore,
    user_id: &UserId,
) -> Result<Option<DocumentPath>, StoreError> {
    Ok(find_account(store, user_id).await?.map(|(path, _)| path))
}

/// Stage moving `user_id`'s sign-in account to `email` onto `batch`.
///
/// Returns `false` and stages nothing if `email` belongs to another
/// account. Users without an account, or whose account already uses
/// `email`, stage nothing and return `true`.
pub(crate) async fn stage_email_change(
    store: &dyn DocumentStore,
    user_id: &UserId,
    email: &Email,
    batch: &mut WriteBatch,
) -> Result<bool, StoreError> {
    let target = paths::auth_accounts().doc(email.as_str())?;
    if let Some(existing) = store.get(&target).await? {
        let existing: AccountRecord = existing.decode()?;
        return Ok(&existing.user_id == user_id);
    }

    let Some((current, mut account)) = find_account(store, user_id).await? else {
        return Ok(true);
    };
    email.as_str().clone_into(&mut account.email);
    batch
        .set(target, encode(&account)?, SetOptions::REPLACE)
        .delete(current);
    tracing::debug!(user_id = %user_id, "Sign-in account moved");
    Ok(true)
}

async fn find_account(
    store: &dyn DocumentStore,
    user_id: &UserId,
) -> Result<Option<(DocumentPath, AccountRecord)>, StoreError> {
    let collection = paths::auth_accounts();
    for doc in store.list(&collection).await? {
        let account: AccountRecord = doc.decode()?;
        if &account.user_id == user_id {
            return Ok(Some((collection.doc(&doc.id)?, account)));
        }
    }
    Ok(None)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> AuthService {
        AuthService::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("secret1").unwrap();
        assert!(verify_password("secret1", &hash).is_ok());
        assert!(matches!(
            verify_password("secret2", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("12345"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("123456").is_ok());
    }

    #[tokio::test]
    async fn test_sign_up_signs_in_and_notifies() {
        let auth = service();
        let mut events = auth.subscribe();

        let user = auth
            .sign_up("Анна", "Anna@Example.com", "secret1")
            .await
            .unwrap();

        assert_eq!(user.email, "anna@example.com");
        assert_eq!(user.role, UserRole::User);
        assert!(events.has_changed().unwrap());
        assert_eq!(*events.borrow_and_update(), Some(user.id.clone()));
        assert_eq!(auth.current_user(), Some(user.id));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let auth = service();
        auth.sign_up("Анна", "anna@example.com", "secret1")
            .await
            .unwrap();
        let err = auth
            .sign_up("Другая Анна", "ANNA@example.com", "secret2")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_sign_in_checks_password() {
        let auth = service();
        let created = auth
            .create_account("Админ", "admin@techshop.ru", "admin123", UserRole::Admin)
            .await
            .unwrap();
        assert_eq!(auth.current_user(), None);

        assert!(matches!(
            auth.sign_in("admin@techshop.ru", "wrong-password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.sign_in("nobody@techshop.ru", "admin123").await,
            Err(AuthError::InvalidCredentials)
        ));

        let user = auth.sign_in("admin@techshop.ru", "admin123").await.unwrap();
        assert_eq!(user.id, created.id);
        assert_eq!(user.role, UserRole::Admin);

        auth.sign_out();
        assert_eq!(auth.current_user(), None);
    }

    #[tokio::test]
    async fn test_email_change_moves_account() {
        let store = Arc::new(MemoryStore::new());
        let auth = AuthService::new(store.clone());
        let anna = auth
            .sign_up("Анна", "anna@example.com", "secret1")
            .await
            .unwrap();
        let new_email = Email::parse("anna.k@example.com").unwrap();

        let mut batch = WriteBatch::new();
        assert!(
            stage_email_change(&*store, &anna.id, &new_email, &mut batch)
                .await
                .unwrap()
        );
        assert_eq!(batch.len(), 2);
        store.commit(batch).await.unwrap();

        assert!(matches!(
            auth.sign_in("anna@example.com", "secret1").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert_eq!(
            auth.sign_in("anna.k@example.com", "secret1").await.unwrap().id,
            anna.id
        );
        assert_eq!(
            account_of(&*store, &anna.id).await.unwrap(),
            Some(paths::auth_accounts().doc("anna.k@example.com").unwrap())
        );

        // The old address is free again.
        auth.sign_up("Анна Новая", "anna@example.com", "secret2")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_email_change_refuses_taken_address() {
        let store = Arc::new(MemoryStore::new());
        let auth = AuthService::new(store.clone());
        let anna = auth
            .sign_up("Анна", "anna@example.com", "secret1")
            .await
            .unwrap();
        auth.sign_up("Борис", "boris@example.com", "secret2")
            .await
            .unwrap();

        let mut batch = WriteBatch::new();
        let boris_email = Email::parse("boris@example.com").unwrap();
        assert!(
            !stage_email_change(&*store, &anna.id, &boris_email, &mut batch)
                .await
                .unwrap()
        );
        assert!(batch.is_empty());

        let own_email = Email::parse("anna@example.com").unwrap();
        assert!(
            stage_email_change(&*store, &anna.id, &own_email, &mut batch)
                .await
                .unwrap()
        );
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_sign_up_validates_input() {
        let auth = service();
        assert!(matches!(
            auth.sign_up("Анна", "not-an-email", "secret1").await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            auth.sign_up("   ", "anna@example.com", "secret1").await,
            Err(AuthError::EmptyName)
        ));
        assert!(matches!(
            auth.sign_up("Анна", "anna@example.com", "123").await,
            Err(AuthError::WeakPassword(_))
        ));
    }
}
