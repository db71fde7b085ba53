// crates/fides-consent-core/src/core/hashing.rs
// ============================================================================
// Module: Experience Version Hashing
// Description: RFC 8785 canonical hashing of the TCF-relevant experience content.
// Purpose: Detect stale stored consent when the vendor/purpose set changes.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Stored consent is only valid for the vendor and purpose configuration it
//! was collected against. The version hash is SHA-256 over the RFC 8785
//! canonical JSON of that configuration, truncated to
//! [`VERSION_HASH_LENGTH`] lowercase hex characters. A hash supplied by the
//! experience service always takes precedence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

use crate::core::experience::Experience;
use crate::core::experience::LegalBasis;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of hex characters kept from the digest.
pub const VERSION_HASH_LENGTH: usize = 12;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing version hashes.
#[derive(Debug, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Hash Input
// ============================================================================

/// Canonical hash input for a single vendor.
#[derive(Serialize)]
struct VendorHashInput<'a> {
    /// Vendor identifier.
    id: &'a str,
    /// Consent purposes.
    purpose_consents: &'a BTreeSet<u16>,
    /// Legitimate-interest purposes.
    purpose_legitimate_interests: &'a BTreeSet<u16>,
}

/// Canonical hash input for an experience.
#[derive(Serialize)]
struct VersionHashInput<'a> {
    /// Consent-basis purpose ids.
    purpose_consents: BTreeSet<u16>,
    /// Legitimate-interest purpose ids.
    purpose_legitimate_interests: BTreeSet<u16>,
    /// Special feature ids.
    special_features: BTreeSet<u16>,
    /// Vendors sorted by id.
    vendors: Vec<VendorHashInput<'a>>,
}

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Returns the experience version hash.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn experience_version_hash(experience: &Experience) -> Result<String, HashError> {
    if let Some(hash) = &experience.version_hash {
        return Ok(hash.clone());
    }
    let purposes_for = |basis: LegalBasis| -> BTreeSet<u16> {
        experience.purposes.iter().filter(|p| p.legal_basis == basis).map(|p| p.id).collect()
    };
    let mut vendors: Vec<VendorHashInput<'_>> = experience
        .vendors
        .iter()
        .map(|vendor| VendorHashInput {
            id: vendor.id.as_str(),
            purpose_consents: &vendor.purpose_consents,
            purpose_legitimate_interests: &vendor.purpose_legitimate_interests,
        })
        .collect();
    vendors.sort_by(|a, b| a.id.cmp(b.id));
    let input = VersionHashInput {
        purpose_consents: purposes_for(LegalBasis::Consent),
        purpose_legitimate_interests: purposes_for(LegalBasis::LegitimateInterest),
        special_features: experience.special_features.iter().map(|f| f.id).collect(),
        vendors,
    };
    let bytes =
        serde_jcs::to_vec(&input).map_err(|err| HashError::Canonicalization(err.to_string()))?;
    let digest = Sha256::digest(&bytes);
    let mut hex = hex_encode(&digest);
    hex.truncate(VERSION_HASH_LENGTH);
    Ok(hex)
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
