//! Bearer token lifecycle.
//!
//! # Design
//! The token lives in a `CredentialHolder` that is injected into the client
//! rather than in global state, so several clients (or tests) can hold
//! independent credentials. A holder may be backed by a `TokenStore`, the
//! persistent key-value slot the token is loaded from at construction and
//! written through to on every change.
//!
//! There is no expiry tracking or refresh: the server rejects stale tokens
//! and the caller reacts to the resulting `Api` error.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use crate::error::StoreError;

/// Persistent key-value storage for the token slot.
pub trait TokenStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save(&self, key: &str, token: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(key: &str, token: &str) -> Self {
        let store = Self::new();
        store
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), token.to_string());
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(slots.get(key).cloned())
    }

    fn save(&self, key: &str, token: &str) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        slots.insert(key.to_string(), token.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        slots.remove(key);
        Ok(())
    }
}

/// A JSON object file mapping slot names to tokens. A missing file reads as
/// an empty store.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_slots(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_slots(&self, slots: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(slots)?)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_slots()?.remove(key))
    }

    fn save(&self, key: &str, token: &str) -> Result<(), StoreError> {
        let mut slots = self.read_slots()?;
        slots.insert(key.to_string(), token.to_string());
        self.write_slots(&slots)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut slots = self.read_slots()?;
        if slots.remove(key).is_some() {
            self.write_slots(&slots)?;
        }
        Ok(())
    }
}

/// Holds at most one bearer token.
///
/// Reads return a snapshot: a request built before `set` or `clear` keeps
/// the token it was built with.
#[derive(Default)]
pub struct CredentialHolder {
    token: RwLock<Option<String>>,
    store: Option<(Arc<dyn TokenStore>, String)>,
}

impl std::fmt::Debug for CredentialHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHolder")
            .field("has_token", &self.get().is_some())
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl CredentialHolder {
    /// An empty holder with no persistence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the token from `key` in `store` once, and keep the store for
    /// write-through on later changes.
    pub fn load(store: Arc<dyn TokenStore>, key: &str) -> Result<Self, StoreError> {
        let token = store.load(key)?;
        debug!(key, loaded = token.is_some(), "loaded persisted credential");
        Ok(Self {
            token: RwLock::new(token),
            store: Some((store, key.to_string())),
        })
    }

    pub fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Overwrite the held token. The in-memory value changes even if
    /// persisting it fails.
    pub fn set(&self, token: &str) -> Result<(), StoreError> {
        *self.token.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token.to_string());
        match &self.store {
            Some((store, key)) => store.save(key, token),
            None => Ok(()),
        }
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        *self.token.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        match &self.store {
            Some((store, key)) => store.remove(key),
            None => Ok(()),
        }
    }
}
