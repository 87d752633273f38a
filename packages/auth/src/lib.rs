#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Credential verification and login session state.
//!
//! The rest of the incident map only needs a yes/no answer to "may this
//! user delete incidents or change their status". [`Authenticator`] is
//! that seam; [`CredentialStore`] is the bundled implementation, a JSON
//! file of salted SHA-256 hashes. [`Session`] remembers the answer and the
//! message shown next to the login box.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Message shown after a successful login.
pub const LOGGED_IN_MESSAGE: &str = "Logged in";

/// Message shown after a rejected login.
pub const REJECTED_MESSAGE: &str = "Incorrect password";

/// Message shown after logging out.
pub const LOGGED_OUT_MESSAGE: &str = "Logged out";

/// Errors from credential storage.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The credential file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The credential file is not a valid credential list.
    #[error("Corrupt credential store: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Decides whether a candidate secret is acceptable.
pub trait Authenticator {
    /// Returns `true` if `secret` matches a stored credential.
    fn verify(&self, secret: &str) -> bool;
}

/// A salted SHA-256 password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashedCredential {
    /// Random per-credential salt.
    pub salt: String,
    /// Hex-encoded `sha256(salt ":" secret)`.
    pub hash: String,
}

impl HashedCredential {
    /// Hashes `secret` with a fresh random salt.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self::with_salt(secret, &uuid::Uuid::new_v4().simple().to_string())
    }

    /// Hashes `secret` with the given salt.
    #[must_use]
    pub fn with_salt(secret: &str, salt: &str) -> Self {
        Self {
            salt: salt.to_string(),
            hash: digest(salt, secret),
        }
    }

    /// Whether `secret` hashes to this credential.
    #[must_use]
    pub fn matches(&self, secret: &str) -> bool {
        digest(&self.salt, secret) == self.hash
    }
}

fn digest(salt: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// A set of hashed credentials, optionally backed by a JSON file.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    credentials: Vec<HashedCredential>,
    path: Option<PathBuf>,
}

impl CredentialStore {
    /// Creates an in-memory store.
    #[must_use]
    pub const fn from_credentials(credentials: Vec<HashedCredential>) -> Self {
        Self {
            credentials,
            path: None,
        }
    }

    /// Loads the store from `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let credentials = match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!(
                    "No credential store at {}; nobody can log in",
                    path.display()
                );
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            credentials,
            path: Some(path.to_path_buf()),
        })
    }

    /// Writes the store back to the file it was loaded from. In-memory
    /// stores are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the file cannot be written.
    pub fn save(&self) -> Result<(), AuthError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self.credentials)?)?;
        Ok(())
    }

    /// Adds `secret`. Returns `false` if it is already accepted.
    pub fn add(&mut self, secret: &str) -> bool {
        if self.verify(secret) {
            return false;
        }
        self.credentials.push(HashedCredential::new(secret));
        true
    }

    /// Removes every credential matching `secret`. Returns `false` if none
    /// did.
    pub fn remove(&mut self, secret: &str) -> bool {
        let before = self.credentials.len();
        self.credentials.retain(|c| !c.matches(secret));
        self.credentials.len() != before
    }

    /// Number of stored credentials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Whether no credentials are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

impl Authenticator for CredentialStore {
    fn verify(&self, secret: &str) -> bool {
        self.credentials.iter().any(|c| c.matches(secret))
    }
}

/// Login state of the current user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    authenticated: bool,
    message: String,
}

impl Session {
    /// A logged-out session with no message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that is already authenticated.
    #[must_use]
    pub fn authenticated() -> Self {
        Self {
            authenticated: true,
            message: LOGGED_IN_MESSAGE.to_string(),
        }
    }

    /// Checks `secret` with `authenticator` and updates the session.
    ///
    /// A rejected attempt logs the session out.
    pub fn log_in(&mut self, authenticator: &dyn Authenticator, secret: &str) -> bool {
        self.authenticated = authenticator.verify(secret);
        self.message = if self.authenticated {
            log::info!("Login succeeded");
            LOGGED_IN_MESSAGE.to_string()
        } else {
            log::warn!("Login rejected");
            REJECTED_MESSAGE.to_string()
        };
        self.authenticated
    }

    /// Ends the session.
    pub fn log_out(&mut self) {
        self.authenticated = false;
        self.message = LOGGED_OUT_MESSAGE.to_string();
    }

    /// Whether the user may mutate incidents.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Status message for the login box.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salted_hash_matches_only_its_secret() {
        let credential = HashedCredential::with_salt("hunter2", "abc");
        assert!(credential.matches("hunter2"));
        assert!(!credential.matches("hunter3"));
        assert_ne!(
            credential.hash,
            HashedCredential::with_salt("hunter2", "abd").hash
        );
    }

    #[test]
    fn fresh_salts_differ() {
        assert_ne!(HashedCredential::new("pw").salt, HashedCredential::new("pw").salt);
    }

    #[test]
    fn add_and_remove() {
        let mut store = CredentialStore::default();
        assert!(store.add("secret"));
        assert!(!store.add("secret"));
        assert!(store.verify("secret"));
        assert!(store.remove("secret"));
        assert!(!store.remove("secret"));
        assert!(store.is_empty());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("password_store.json");

        let mut store = CredentialStore::load(&path).unwrap();
        assert!(store.is_empty());
        store.add("dispatcher");
        store.save().unwrap();

        let reloaded = CredentialStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.verify("dispatcher"));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("password_store.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            CredentialStore::load(&path),
            Err(AuthError::Corrupt(_))
        ));
    }

    #[test]
    fn session_tracks_login_result() {
        let store = CredentialStore::from_credentials(vec![HashedCredential::new("open sesame")]);
        let mut session = Session::new();
        assert!(!session.is_authenticated());

        assert!(!session.log_in(&store, "wrong"));
        assert_eq!(session.message(), REJECTED_MESSAGE);

        assert!(session.log_in(&store, "open sesame"));
        assert!(session.is_authenticated());
        assert_eq!(session.message(), LOGGED_IN_MESSAGE);

        session.log_out();
        assert!(!session.is_authenticated());
        assert_eq!(session.message(), LOGGED_OUT_MESSAGE);
    }
}
