// crates/fides-consent-core/src/codec/fides_string.rs
// ============================================================================
// Module: Fides String
// Description: Combined `<tc>,<gpp>` consent string.
// Purpose: Carry both IAB strings in one cookie field or override parameter.
// Dependencies: serde, crate::codec::{tcf, gpp}
// ============================================================================

//! ## Overview
//! The fides string joins the TC string and the GPP string with a comma.
//! When only TCF is active the comma and GPP half are omitted; when both
//! are active the comma is always present, even if one half is empty.
//! Parsing validates each non-empty half with its own codec.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::codec::DecodeError;
use crate::codec::gpp::GppString;
use crate::codec::gpp::decode_gpp;
use crate::codec::tcf;
use crate::codec::tcf::TcModel;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Separator between the TC half and the GPP half.
pub const FIDES_STRING_SEPARATOR: char = ',';

// ============================================================================
// SECTION: Fides String
// ============================================================================

/// Parsed fides string.
///
/// # Invariants
/// - At least one half is non-empty after [`FidesString::parse`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FidesString {
    /// TC string half; empty when absent.
    pub tc_string: String,
    /// GPP string half; `None` when the GPP API is not active.
    pub gpp_string: Option<String>,
}

impl FidesString {
    /// Creates a fides string from its halves.
    #[must_use]
    pub fn new(tc_string: impl Into<String>, gpp_string: Option<String>) -> Self {
        Self {
            tc_string: tc_string.into(),
            gpp_string,
        }
    }

    /// Parses and validates a fides string.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when both halves are empty, a half is
    /// malformed, or more than one separator is present.
    pub fn parse(raw: &str) -> Result<Self, DecodeError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DecodeError::Empty);
        }
        let (tc, gpp) = match raw.split_once(FIDES_STRING_SEPARATOR) {
            Some((tc, gpp)) => (tc, Some(gpp)),
            None => (raw, None),
        };
        if gpp.is_some_and(|gpp| gpp.contains(FIDES_STRING_SEPARATOR)) {
            return Err(DecodeError::InvalidSegment("more than one ',' separator".to_string()));
        }
        if tc.is_empty() && gpp.is_none_or(str::is_empty) {
            return Err(DecodeError::Empty);
        }
        if !tc.is_empty() {
            tcf::decode(tc)?;
        }
        if let Some(gpp) = gpp.filter(|gpp| !gpp.is_empty()) {
            decode_gpp(gpp)?;
        }
        Ok(Self {
            tc_string: tc.to_string(),
            gpp_string: gpp.map(str::to_string),
        })
    }

    /// Decodes the TC half, if present.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the TC half is malformed.
    pub fn tc_model(&self) -> Result<Option<TcModel>, DecodeError> {
        if self.tc_string.is_empty() {
            return Ok(None);
        }
        tcf::decode(&self.tc_string).map(Some)
    }

    /// Decodes the GPP half, if present.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the GPP half is malformed.
    pub fn gpp(&self) -> Result<Option<GppString>, DecodeError> {
        match self.gpp_string.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => decode_gpp(raw).map(Some),
        }
    }
}

impl fmt::Display for FidesString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tc_string)?;
        if let Some(gpp) = &self.gpp_string {
            write!(f, "{FIDES_STRING_SEPARATOR}{gpp}")?;
        }
        Ok(())
    }
}
