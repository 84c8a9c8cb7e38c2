//! Credential storage.
//!
//! The auth and response plugins never reach for a global store; they are
//! handed a `CredentialStore` (or a token getter built from one) when they
//! are constructed. The store owns its own synchronization.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::ApiError;

/// Key the session token is stored under.
pub const TOKEN_KEY: &str = "token";

/// Key-value access to the stored session token.
pub trait CredentialStore: Send + Sync {
    fn token(&self) -> Result<Option<String>, ApiError>;

    fn set_token(&self, token: &str) -> Result<(), ApiError>;

    fn delete_token(&self) -> Result<(), ApiError>;
}

/// In-memory key-value store, the stand-in for the device's persistent store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        let store = Self::new();
        store.entries.write().insert(TOKEN_KEY.to_string(), token.to_string());
        store
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: &str) {
        self.entries.write().insert(key.to_string(), value.to_string());
    }

    pub fn delete(&self, key: &str) {
        self.entries.write().remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn clear_all(&self) {
        self.entries.write().clear();
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn token(&self) -> Result<Option<String>, ApiError> {
        Ok(self.get(TOKEN_KEY))
    }

    fn set_token(&self, token: &str) -> Result<(), ApiError> {
        self.set(TOKEN_KEY, token);
        Ok(())
    }

    fn delete_token(&self) -> Result<(), ApiError> {
        self.delete(TOKEN_KEY);
        Ok(())
    }
}
