// crates/fides-consent-core/src/core/time.rs
// ============================================================================
// Module: Fides Consent Time Model
// Description: Caller-supplied timestamps for consent records and TC strings.
// Purpose: Keep encoding deterministic by never reading the wall clock in core.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The engine never reads wall-clock time directly; hosts supply timestamps
//! for resolution (cookie expiry) and encoding (TC string created/updated
//! fields). TC strings store deciseconds since the Unix epoch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Unix epoch timestamp in milliseconds.
///
/// # Invariants
/// - Values are explicitly provided by callers.
/// - No validation is performed; monotonicity is a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from Unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Creates a timestamp from Unix epoch deciseconds.
    #[must_use]
    pub const fn from_deciseconds(deciseconds: i64) -> Self {
        Self(deciseconds.saturating_mul(100))
    }

    /// Returns the timestamp as Unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the timestamp as Unix epoch deciseconds, truncated.
    #[must_use]
    pub const fn as_deciseconds(self) -> i64 {
        self.0.div_euclid(100)
    }
}
