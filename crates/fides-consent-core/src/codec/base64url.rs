// crates/fides-consent-core/src/codec/base64url.rs
// ============================================================================
// Module: Base64url Segments
// Description: Unpadded URL-safe base64 for TC and GPP segments.
// Purpose: Convert bit buffers to and from their printable segment form.
// Dependencies: base64, crate::codec::bits
// ============================================================================

//! ## Overview
//! IAB segments use the URL-safe alphabet without `=` padding. TC string
//! segments pad their bits to a 24-bit boundary; GPP segments pad to a byte
//! and let the final character carry the zero fill. Decoding accepts
//! trailing fill bits produced by either convention.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::GeneralPurpose;
use base64::engine::GeneralPurposeConfig;

use crate::codec::DecodeError;
use crate::codec::bits::BitReader;
use crate::codec::bits::BitWriter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Bit alignment for TC string segments.
pub const TC_SEGMENT_ALIGN_BITS: usize = 24;
/// Bit alignment for GPP segments.
pub const GPP_SEGMENT_ALIGN_BITS: usize = 8;

/// URL-safe engine that never writes padding and tolerates fill bits on decode.
const SEGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Encodes a bit buffer as a base64url segment.
#[must_use]
pub fn encode_segment(writer: &BitWriter, align_bits: usize) -> String {
    SEGMENT_ENGINE.encode(writer.to_padded_bytes(align_bits))
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Decodes a base64url segment into a bit reader.
///
/// # Errors
///
/// Returns [`DecodeError::InvalidBase64`] for characters outside the URL-safe
/// alphabet or impossible segment lengths.
pub fn decode_segment(segment: &str) -> Result<BitReader, DecodeError> {
    if segment.is_empty() {
        return Err(DecodeError::InvalidSegment("empty segment".to_string()));
    }
    if let Some(bad) = segment.chars().find(|c| !is_url_safe(*c)) {
        return Err(DecodeError::InvalidBase64(format!("unexpected character '{bad}'")));
    }
    let bytes =
        SEGMENT_ENGINE.decode(segment).map_err(|err| DecodeError::InvalidBase64(err.to_string()))?;
    Ok(BitReader::new(bytes))
}

/// Returns true for characters in the URL-safe base64 alphabet.
const fn is_url_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}
