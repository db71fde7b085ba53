// crates/fides-consent-core/src/codec/vendor_encoding.rs
// ============================================================================
// Module: Vendor Section Encoding
// Description: Bitfield and range-list encodings of TCF vendor id sets.
// Purpose: Pick the shorter vendor encoding and read either form back.
// Dependencies: crate::codec::bits
// ============================================================================

//! ## Overview
//! A vendor section is `MaxVendorId(16) IsRangeEncoding(1)` followed by
//! either one bit per vendor id up to the maximum, or a range list of
//! `NumEntries(12)` entries of `IsARange(1) StartId(16) [EndId(16)]`.
//! [`choose_encoding`] returns the range list only when it is strictly
//! shorter; ties keep the bitfield.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::codec::DecodeError;
use crate::codec::EncodeError;
use crate::codec::bits::BitReader;
use crate::codec::bits::BitWriter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Width of vendor id fields.
pub const VENDOR_ID_BITS: u32 = 16;
/// Width of range list entry counts.
pub const NUM_ENTRIES_BITS: u32 = 12;
/// Largest encodable vendor id.
pub const MAX_VENDOR_ID: u32 = 65_535;

// ============================================================================
// SECTION: Encoding Choice
// ============================================================================

/// Encoding used for a vendor section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorEncoding {
    /// One bit per vendor id from 1 to the maximum id.
    Bitfield,
    /// List of single ids and inclusive ranges.
    RangeList,
}

/// Returns the shorter encoding for a vendor id set.
#[must_use]
pub fn choose_encoding(vendor_ids: &BTreeSet<u32>) -> VendorEncoding {
    if range_list_bits(vendor_ids) < bitfield_bits(vendor_ids) {
        VendorEncoding::RangeList
    } else {
        VendorEncoding::Bitfield
    }
}

/// Returns the bitfield body length in bits.
#[must_use]
pub fn bitfield_bits(vendor_ids: &BTreeSet<u32>) -> usize {
    vendor_ids.last().map_or(0, |max| *max as usize)
}

/// Returns the range list body length in bits.
#[must_use]
pub fn range_list_bits(vendor_ids: &BTreeSet<u32>) -> usize {
    NUM_ENTRIES_BITS as usize
        + range_groups(vendor_ids)
            .iter()
            .map(|(start, end)| {
                if start == end {
                    1 + VENDOR_ID_BITS as usize
                } else {
                    1 + 2 * VENDOR_ID_BITS as usize
                }
            })
            .sum::<usize>()
}

/// Groups sorted vendor ids into inclusive runs of consecutive ids.
#[must_use]
pub fn range_groups(vendor_ids: &BTreeSet<u32>) -> Vec<(u32, u32)> {
    let mut groups: Vec<(u32, u32)> = Vec::new();
    for id in vendor_ids {
        match groups.last_mut() {
            Some((_, end)) if end.checked_add(1) == Some(*id) => *end = *id,
            _ => groups.push((*id, *id)),
        }
    }
    groups
}

// ============================================================================
// SECTION: Writing
// ============================================================================

/// Writes a vendor section using the shorter encoding.
///
/// # Errors
///
/// Returns [`EncodeError`] when an id is zero or exceeds [`MAX_VENDOR_ID`].
pub fn write_vendor_section(
    writer: &mut BitWriter,
    vendor_ids: &BTreeSet<u32>,
    field: &'static str,
) -> Result<(), EncodeError> {
    validate_ids(vendor_ids, field)?;
    let max_id = vendor_ids.last().copied().unwrap_or(0);
    writer.push_int(u64::from(max_id), VENDOR_ID_BITS, field)?;
    match choose_encoding(vendor_ids) {
        VendorEncoding::Bitfield => {
            writer.push_bool(false);
            for id in 1 ..= max_id {
                writer.push_bool(vendor_ids.contains(&id));
            }
            Ok(())
        }
        VendorEncoding::RangeList => {
            writer.push_bool(true);
            write_range_entries(writer, vendor_ids, field)
        }
    }
}

/// Writes `NumEntries` followed by range entries.
///
/// # Errors
///
/// Returns [`EncodeError`] when an id is invalid or there are too many entries.
pub fn write_range_entries(
    writer: &mut BitWriter,
    vendor_ids: &BTreeSet<u32>,
    field: &'static str,
) -> Result<(), EncodeError> {
    validate_ids(vendor_ids, field)?;
    let groups = range_groups(vendor_ids);
    writer.push_int(u64::try_from(groups.len()).unwrap_or(u64::MAX), NUM_ENTRIES_BITS, field)?;
    for (start, end) in groups {
        let is_range = start != end;
        writer.push_bool(is_range);
        writer.push_int(u64::from(start), VENDOR_ID_BITS, field)?;
        if is_range {
            writer.push_int(u64::from(end), VENDOR_ID_BITS, field)?;
        }
    }
    Ok(())
}

/// Rejects zero and oversized vendor ids.
fn validate_ids(vendor_ids: &BTreeSet<u32>, field: &'static str) -> Result<(), EncodeError> {
    if vendor_ids.contains(&0) {
        return Err(EncodeError::InvalidIdentifier {
            field,
            value: "0".to_string(),
        });
    }
    if let Some(max) = vendor_ids.last().filter(|max| **max > MAX_VENDOR_ID) {
        return Err(EncodeError::EncodingOverflow {
            field,
            value: u64::from(*max),
            max: u64::from(MAX_VENDOR_ID),
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Reading
// ============================================================================

/// Reads a vendor section in either encoding.
///
/// # Errors
///
/// Returns [`DecodeError`] on truncation or malformed ranges.
pub fn read_vendor_section(
    reader: &mut BitReader,
    field: &'static str,
) -> Result<BTreeSet<u32>, DecodeError> {
    let max_id = reader.read_u32(VENDOR_ID_BITS, field)?;
    let is_range = reader.read_bool(field)?;
    if is_range {
        return read_range_entries(reader, field, max_id);
    }
    let mut ids = BTreeSet::new();
    for id in 1 ..= max_id {
        if reader.read_bool(field)? {
            ids.insert(id);
        }
    }
    Ok(ids)
}

/// Reads `NumEntries` followed by range entries.
///
/// Entries must be ascending and disjoint and may not exceed `max_id`;
/// every entry is checked before it is expanded.
///
/// # Errors
///
/// Returns [`DecodeError`] on truncation, zero ids, inverted, overlapping,
/// or out-of-order ranges, or ids above `max_id`.
pub fn read_range_entries(
    reader: &mut BitReader,
    field: &'static str,
    max_id: u32,
) -> Result<BTreeSet<u32>, DecodeError> {
    let entries = reader.read_u16(NUM_ENTRIES_BITS, field)?;
    let mut ids = BTreeSet::new();
    let mut previous_end = 0_u32;
    for _ in 0 .. entries {
        let is_range = reader.read_bool(field)?;
        let start = reader.read_u32(VENDOR_ID_BITS, field)?;
        let end = if is_range { reader.read_u32(VENDOR_ID_BITS, field)? } else { start };
        if start == 0 {
            return Err(DecodeError::InvalidRange(format!("{field}: vendor id 0")));
        }
        if end < start {
            return Err(DecodeError::InvalidRange(format!("{field}: range {start}-{end} is inverted")));
        }
        if start <= previous_end {
            return Err(DecodeError::InvalidRange(format!(
                "{field}: range {start}-{end} overlaps or precedes id {previous_end}"
            )));
        }
        if end > max_id {
            return Err(DecodeError::InvalidRange(format!(
                "{field}: vendor {end} exceeds max vendor id {max_id}"
            )));
        }
        ids.extend(start ..= end);
        previous_end = end;
    }
    Ok(ids)
}
