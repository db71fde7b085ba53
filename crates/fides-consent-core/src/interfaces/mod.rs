// crates/fides-consent-core/src/interfaces/mod.rs
// ============================================================================
// Module: Fides Consent Interfaces
// Description: Ports for consent persistence, preferences, and page events.
// Purpose: Keep browser storage and network access out of the engine.
// Dependencies: thiserror, crate::{cmp, core, resolver}
// ============================================================================

//! ## Overview
//! The engine reaches the outside world only through these ports. A
//! [`ConsentStore`] persists the consent cookie, a [`PreferencesProvider`]
//! supplies server-side preferences, and a [`PageEventListener`] receives
//! the `Fides*` page events.
//!
//! Port failures never abort a decision: the engine audits them and keeps
//! going with what it has.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::cmp::events::PageEvent;
use crate::core::experience::Experience;
use crate::resolver::SavedPreferences;

// ============================================================================
// SECTION: Consent Store
// ============================================================================

/// Consent store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("consent store io error: {0}")]
    Io(String),
    /// Stored value is not valid.
    #[error("consent store invalid data: {0}")]
    Invalid(String),
}

/// Key-value persistence for consent state.
pub trait ConsentStore {
    /// Reads a value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Preferences Provider
// ============================================================================

/// Preferences provider errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreferencesError {
    /// The provider could not be reached.
    #[error("preferences provider unavailable: {0}")]
    Unavailable(String),
    /// The provider returned data that could not be used.
    #[error("preferences provider returned invalid data: {0}")]
    Invalid(String),
}

/// Supplies tier-2 saved preferences for an experience.
pub trait PreferencesProvider {
    /// Fetches saved preferences, if the user has any.
    ///
    /// # Errors
    ///
    /// Returns [`PreferencesError`] when preferences cannot be fetched.
    fn fetch(&self, experience: &Experience) -> Result<Option<SavedPreferences>, PreferencesError>;
}

// ============================================================================
// SECTION: Page Events
// ============================================================================

/// Receives `Fides*` page events.
pub trait PageEventListener {
    /// Receives one event.
    fn on_page_event(&mut self, event: &PageEvent);
}

impl<F> PageEventListener for F
where
    F: FnMut(&PageEvent),
{
    fn on_page_event(&mut self, event: &PageEvent) {
        self(event);
    }
}
