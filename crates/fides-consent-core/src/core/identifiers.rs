// crates/fides-consent-core/src/core/identifiers.rs
// ============================================================================
// Module: Fides Consent Identifiers
// Description: Canonical opaque identifiers for experiences, vendors, and notices.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the string-based identifiers used throughout the consent
//! engine. Identifiers are opaque and serialize as plain strings. Vendor
//! identifiers additionally expose the numeric Global Vendor List id when they
//! follow the `gvl.<n>` convention.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix used by vendors registered in the IAB Global Vendor List.
pub const GVL_VENDOR_PREFIX: &str = "gvl.";

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Experience identifier assigned by the experience service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExperienceId(String);

impl ExperienceId {
    /// Creates a new experience identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExperienceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ExperienceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Vendor or system identifier.
///
/// # Invariants
/// - TCF vendors use `gvl.<n>`; systems use an opaque identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorId(String);

impl VendorId {
    /// Creates a new vendor identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Builds the identifier for a Global Vendor List entry.
    #[must_use]
    pub fn gvl(id: u32) -> Self {
        Self(format!("{GVL_VENDOR_PREFIX}{id}"))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the numeric GVL id when the identifier uses the `gvl.<n>` form.
    #[must_use]
    pub fn gvl_id(&self) -> Option<u64> {
        self.0.strip_prefix(GVL_VENDOR_PREFIX).and_then(|raw| raw.parse::<u64>().ok())
    }
}

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for VendorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for VendorId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Privacy notice key, unique within an experience.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoticeKey(String);

impl NoticeKey {
    /// Creates a new notice key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoticeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for NoticeKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NoticeKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Listener identifier handed out by the CMP registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(u32);

impl ListenerId {
    /// Creates a listener identifier from its raw value.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw listener id.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
