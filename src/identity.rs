//! User directory with Argon2-hashed secrets.
//!
//! Names are trimmed and upper-cased before storage, so registration and login
//! are case-insensitive. Secrets are stored only as Argon2id PHC strings.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{GatewayError, Result};
use crate::store::{self, KeyValueStore};

const USERS_KEY: &str = "users";

/// Access role attached to a registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Administration,
    SeniorDataManager,
    JuniorDataManager,
    #[default]
    Contributor,
    MasterGuest,
    VipGuest,
}

impl UserRole {
    pub const ALL: [UserRole; 6] = [
        UserRole::Administration,
        UserRole::SeniorDataManager,
        UserRole::JuniorDataManager,
        UserRole::Contributor,
        UserRole::MasterGuest,
        UserRole::VipGuest,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Administration => "Administration",
            Self::SeniorDataManager => "Senior Data Manager",
            Self::JuniorDataManager => "Junior Data Manager",
            Self::Contributor => "Contributor",
            Self::MasterGuest => "Master Guest",
            Self::VipGuest => "VIP Guest",
        }
    }

    /// Whether this role may provision and list identities.
    pub fn can_administer(&self) -> bool {
        matches!(self, Self::Administration)
    }
}

impl std::str::FromStr for UserRole {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        Self::ALL
            .into_iter()
            .find(|role| {
                role.label()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .collect::<String>()
                    .to_lowercase()
                    == normalized
            })
            .ok_or_else(|| GatewayError::Identity(format!("unknown role '{}'", s)))
    }
}

/// Stored user record. `secret_hash` is an Argon2 PHC string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    pub secret_hash: String,
    pub role: UserRole,
    pub provisioned_at: DateTime<Utc>,
}

/// The subject of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub role: Option<UserRole>,
    pub guest: bool,
}

impl Identity {
    pub fn guest() -> Self {
        Self {
            name: "guest".to_string(),
            role: None,
            guest: true,
        }
    }

    pub fn display_role(&self) -> &'static str {
        match self.role {
            Some(role) => role.label(),
            None => "Guest Access",
        }
    }
}

/// Capability check against provisioned users.
pub trait UserDirectory: Send + Sync {
    /// Provision a new user. Fails when the name is taken.
    fn register(&self, name: &str, secret: &str, role: UserRole) -> Result<UserRecord>;

    /// `Some(identity)` when `secret` matches the stored hash for `name`.
    fn verify(&self, name: &str, secret: &str) -> Result<Option<Identity>>;

    fn list(&self) -> Result<Vec<UserRecord>>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.list()?.is_empty())
    }
}

/// Gate for provisioning a new identity with `role`.
///
/// An empty directory may be bootstrapped without credentials, but only with
/// an administrator so someone can provision the rest. Afterwards `actor` must
/// be a verified identity whose role can administer.
pub fn authorize_provisioning(
    directory: &dyn UserDirectory,
    actor: Option<&Identity>,
    role: UserRole,
) -> Result<()> {
    if directory.is_empty()? {
        if !role.can_administer() {
            return Err(GatewayError::Identity(format!(
                "the first identity must have the {} role",
                UserRole::Administration.label()
            )));
        }
        return Ok(());
    }
    require_administrator(actor)
}

/// Fails unless `actor` is a verified identity with an administrative role.
pub fn require_administrator(actor: Option<&Identity>) -> Result<()> {
    match actor.and_then(|a| a.role) {
        Some(role) if role.can_administer() => Ok(()),
        Some(role) => Err(GatewayError::Identity(format!(
            "{} identities cannot manage the directory",
            role.label()
        ))),
        None => Err(GatewayError::Identity(
            "managing the directory requires a verified administrator".into(),
        )),
    }
}

/// [`UserDirectory`] persisted in a [`KeyValueStore`].
pub struct StoreUserDirectory {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl StoreUserDirectory {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn normalize_name(name: &str) -> String {
        name.trim().to_uppercase()
    }

    fn load_users(&self) -> Result<Vec<UserRecord>> {
        Ok(store::load(self.store.as_ref(), USERS_KEY)?.unwrap_or_default())
    }

    fn hash_secret(secret: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| GatewayError::Identity(format!("failed to hash secret: {}", e)))
    }

    fn secret_matches(secret: &str, stored: &str) -> Result<bool> {
        let parsed = PasswordHash::new(stored)
            .map_err(|e| GatewayError::Identity(format!("stored hash is invalid: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok())
    }
}

impl UserDirectory for StoreUserDirectory {
    fn register(&self, name: &str, secret: &str, role: UserRole) -> Result<UserRecord> {
        let name = Self::normalize_name(name);
        let secret = secret.trim();
        if name.is_empty() || secret.is_empty() {
            return Err(GatewayError::Identity(
                "name and secret must not be empty".into(),
            ));
        }

        let mut users = self.load_users()?;
        if users.iter().any(|u| u.name == name) {
            return Err(GatewayError::Identity(format!(
                "identity '{}' is already registered",
                name
            )));
        }

        let record = UserRecord {
            name,
            secret_hash: Self::hash_secret(secret)?,
            role,
            provisioned_at: self.clock.now(),
        };
        users.push(record.clone());
        store::save(self.store.as_ref(), USERS_KEY, &users)?;
        info!(user = %record.name, role = record.role.label(), "Identity provisioned");
        Ok(record)
    }

    fn verify(&self, name: &str, secret: &str) -> Result<Option<Identity>> {
        let name = Self::normalize_name(name);
        let users = self.load_users()?;
        let Some(user) = users.iter().find(|u| u.name == name) else {
            debug!(user = %name, "Unknown identity");
            return Ok(None);
        };
        if !Self::secret_matches(secret.trim(), &user.secret_hash)? {
            debug!(user = %name, "Secret mismatch");
            return Ok(None);
        }
        Ok(Some(Identity {
            name: user.name.clone(),
            role: Some(user.role),
            guest: false,
        }))
    }

    fn list(&self) -> Result<Vec<UserRecord>> {
        self.load_users()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::store::MemoryStore;

    fn directory() -> (StoreUserDirectory, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (
            StoreUserDirectory::new(store.clone(), Arc::new(SystemClock)),
            store,
        )
    }

    #[test]
    fn test_register_and_verify() {
        let (dir, _) = directory();
        let record = dir
            .register(" alice ", "s3cret", UserRole::SeniorDataManager)
            .unwrap();
        assert_eq!(record.name, "ALICE");

        let identity = dir.verify("Alice", "s3cret").unwrap().unwrap();
        assert_eq!(identity.name, "ALICE");
        assert_eq!(identity.role, Some(UserRole::SeniorDataManager));
        assert!(!identity.guest);
    }

    #[test]
    fn test_wrong_secret_or_unknown_user() {
        let (dir, _) = directory();
        dir.register("bob", "right", UserRole::Contributor).unwrap();
        assert!(dir.verify("bob", "wrong").unwrap().is_none());
        assert!(dir.verify("carol", "right").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_names_rejected_case_insensitively() {
        let (dir, _) = directory();
        dir.register("Dave", "one", UserRole::Contributor).unwrap();
        let err = dir.register("DAVE ", "two", UserRole::VipGuest).unwrap_err();
        assert!(matches!(err, GatewayError::Identity(_)));
        assert_eq!(dir.list().unwrap().len(), 1);
    }

    #[test]
    fn test_bootstrap_requires_administrator_role() {
        let (dir, _) = directory();
        assert!(authorize_provisioning(&dir, None, UserRole::Administration).is_ok());
        let err = authorize_provisioning(&dir, None, UserRole::Contributor).unwrap_err();
        assert!(matches!(err, GatewayError::Identity(_)));
    }

    #[test]
    fn test_provisioning_denied_once_directory_has_users() {
        let (dir, _) = directory();
        dir.register("root", "pw", UserRole::Administration).unwrap();

        let err = authorize_provisioning(&dir, None, UserRole::Administration).unwrap_err();
        assert!(matches!(err, GatewayError::Identity(_)));
        assert!(authorize_provisioning(&dir, Some(&Identity::guest()), UserRole::Contributor)
            .is_err());

        dir.register("bob", "pw", UserRole::SeniorDataManager).unwrap();
        let bob = dir.verify("bob", "pw").unwrap();
        assert!(authorize_provisioning(&dir, bob.as_ref(), UserRole::Contributor).is_err());
    }

    #[test]
    fn test_administrator_may_provision() {
        let (dir, _) = directory();
        dir.register("root", "pw", UserRole::Administration).unwrap();
        let root = dir.verify("ROOT", "pw").unwrap();
        assert!(authorize_provisioning(&dir, root.as_ref(), UserRole::Administration).is_ok());
        assert!(require_administrator(root.as_ref()).is_ok());
    }

    #[test]
    fn test_empty_fields_rejected() {
        let (dir, _) = directory();
        assert!(dir.register("  ", "x", UserRole::Contributor).is_err());
        assert!(dir.register("erin", " ", UserRole::Contributor).is_err());
    }

    #[test]
    fn test_plaintext_secret_never_stored() {
        let (dir, store) = directory();
        dir.register("frank", "hunter2", UserRole::Administration)
            .unwrap();
        let raw = store.get(USERS_KEY).unwrap().unwrap().to_string();
        assert!(!raw.contains("hunter2"));
        assert!(raw.contains("$argon2"));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!(
            "senior-data-manager".parse::<UserRole>().unwrap(),
            UserRole::SeniorDataManager
        );
        assert_eq!("VIP Guest".parse::<UserRole>().unwrap(), UserRole::VipGuest);
        assert!("owner".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_guest_identity() {
        let guest = Identity::guest();
        assert!(guest.guest);
        assert_eq!(guest.display_role(), "Guest Access");
    }
}
