// crates/fides-consent-core/src/runtime/store.rs
// ============================================================================
// Module: Consent Store Runtime
// Description: In-memory consent store and cookie (de)serialization helpers.
// Purpose: Persist the consent cookie through the store port.
// Dependencies: serde_json, crate::{interfaces, resolver}
// ============================================================================

//! ## Overview
//! The consent cookie is stored as one JSON document under [`COOKIE_KEY`].
//! [`InMemoryConsentStore`] backs tests and offline tooling.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::interfaces::ConsentStore;
use crate::interfaces::StoreError;
use crate::resolver::ConsentCookie;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Key under which the consent cookie is stored.
pub const COOKIE_KEY: &str = "fides_consent";

// ============================================================================
// SECTION: Cookie Helpers
// ============================================================================

/// Reads and parses the consent cookie.
///
/// # Errors
///
/// Returns [`StoreError::Io`] when the store fails and
/// [`StoreError::Invalid`] when the stored JSON does not parse.
pub fn load_cookie(store: &impl ConsentStore) -> Result<Option<ConsentCookie>, StoreError> {
    let Some(raw) = store.get(COOKIE_KEY)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw).map(Some).map_err(|err| StoreError::Invalid(err.to_string()))
}

/// Serializes and writes the consent cookie.
///
/// # Errors
///
/// Returns [`StoreError`] when serialization or the write fails.
pub fn save_cookie(store: &impl ConsentStore, cookie: &ConsentCookie) -> Result<(), StoreError> {
    let payload =
        serde_json::to_string(cookie).map_err(|err| StoreError::Invalid(err.to_string()))?;
    store.set(COOKIE_KEY, &payload)
}

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory consent store.
#[derive(Debug, Default)]
pub struct InMemoryConsentStore {
    /// Stored values by key.
    values: Mutex<BTreeMap<String, String>>,
}

impl InMemoryConsentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding one consent cookie.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the cookie cannot be serialized.
    pub fn with_cookie(cookie: &ConsentCookie) -> Result<Self, StoreError> {
        let store = Self::new();
        save_cookie(&store, cookie)?;
        Ok(store)
    }
}

impl ConsentStore for InMemoryConsentStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self
            .values
            .lock()
            .map_err(|_| StoreError::Io("consent store lock poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .lock()
            .map_err(|_| StoreError::Io("consent store lock poisoned".to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
