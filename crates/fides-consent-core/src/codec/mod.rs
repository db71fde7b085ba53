// crates/fides-consent-core/src/codec/mod.rs
// ============================================================================
// Module: Consent String Codecs
// Description: IAB TC string, GPP string, and combined fides string codecs.
// Purpose: Encode and decode consent decisions into their wire formats.
// Dependencies: base64, serde, thiserror
// ============================================================================

//! ## Overview
//! Codecs convert between [`crate::ConsentDecision`] values and the strings
//! third-party scripts read: the TCF v2 TC string, the GPP envelope, and the
//! combined `<tc>,<gpp>` fides string. Decoding never panics; malformed
//! input surfaces as a typed [`DecodeError`]. Values that cannot be
//! represented raise [`EncodeError::EncodingOverflow`] instead of being
//! truncated.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod base64url;
pub mod bits;
pub mod fides_string;
pub mod gpp;
pub mod tcf;
pub mod us_sections;
pub mod vendor_encoding;

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while encoding consent strings.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// A value exceeds the width of its bit field.
    #[error("encoding overflow: {field} value {value} exceeds maximum {max}")]
    EncodingOverflow {
        /// Field being encoded.
        field: &'static str,
        /// Offending value.
        value: u64,
        /// Largest representable value.
        max: u64,
    },
    /// An identifier is outside the valid range.
    #[error("invalid identifier for {field}: {value}")]
    InvalidIdentifier {
        /// Field being encoded.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// A timestamp predates the Unix epoch.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(i64),
    /// A language or country code is not two ASCII letters.
    #[error("invalid two-letter code for {field}: {value}")]
    InvalidLetterCode {
        /// Field being encoded.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// The experience does not carry TCF metadata.
    #[error("experience is not a tcf experience")]
    NotTcf,
    /// A GPP section payload does not match its section.
    #[error("invalid gpp section payload: {0}")]
    InvalidSection(String),
}

/// Errors raised while decoding consent strings.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input was empty.
    #[error("empty consent string")]
    Empty,
    /// Input contained characters outside the base64url alphabet.
    #[error("invalid base64url: {0}")]
    InvalidBase64(String),
    /// Segment structure was invalid.
    #[error("invalid segment: {0}")]
    InvalidSegment(String),
    /// Input ended before a field could be read.
    #[error("truncated input while reading {field}")]
    Truncated {
        /// Field being read.
        field: &'static str,
    },
    /// Unsupported TC string version.
    #[error("unsupported tc string version {found}")]
    UnsupportedVersion {
        /// Version found in the input.
        found: u64,
    },
    /// A range entry was malformed.
    #[error("invalid range: {0}")]
    InvalidRange(String),
    /// A field held an invalid value.
    #[error("invalid field: {0}")]
    InvalidField(String),
    /// The GPP header was malformed.
    #[error("invalid gpp header: {0}")]
    InvalidHeader(String),
    /// The GPP header names a section the engine does not support.
    #[error("unsupported gpp section id {0}")]
    UnsupportedSection(u64),
    /// Header section count and section payload count differ.
    #[error("gpp section count mismatch: header lists {header}, found {found}")]
    SectionCountMismatch {
        /// Sections named by the header.
        header: usize,
        /// Section payloads present.
        found: usize,
    },
}
