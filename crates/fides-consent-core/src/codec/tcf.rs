// crates/fides-consent-core/src/codec/tcf.rs
// ============================================================================
// Module: TC String Codec
// Description: IAB TCF v2.2 transparency and consent string encoding.
// Purpose: Serialize TCF consent slots to the TC string and parse them back.
// Dependencies: serde, crate::codec::{bits, base64url, vendor_encoding}
// ============================================================================

//! ## Overview
//! A TC string is a `.`-separated list of base64url segments. The first is
//! the core segment; an optional disclosed-vendors segment (segment type 1)
//! follows. Only TCF slots are carried: purposes, special features, and
//! vendors with numeric GVL ids. Systems and notices never appear.
//!
//! Encoding normalizes the decision against the experience first, so every
//! slot is written and ids the experience does not declare are dropped.
//! Decoding is strict: bad characters, truncation, inverted ranges, and
//! versions other than 2 are rejected with a typed [`DecodeError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::codec::DecodeError;
use crate::codec::EncodeError;
use crate::codec::base64url::TC_SEGMENT_ALIGN_BITS;
use crate::codec::base64url::decode_segment;
use crate::codec::base64url::encode_segment;
use crate::codec::bits::BitReader;
use crate::codec::bits::BitWriter;
use crate::codec::vendor_encoding::MAX_VENDOR_ID;
use crate::codec::vendor_encoding::read_range_entries;
use crate::codec::vendor_encoding::read_vendor_section;
use crate::codec::vendor_encoding::write_range_entries;
use crate::codec::vendor_encoding::write_vendor_section;
use crate::core::decision::ConsentDecision;
use crate::core::decision::Fallback;
use crate::core::decision::FieldRef;
use crate::core::experience::Experience;
use crate::core::identifiers::VendorId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// TC string format version written and accepted.
pub const TC_STRING_VERSION: u8 = 2;
/// Number of purpose bits in the core segment.
pub const PURPOSE_COUNT: u16 = 24;
/// Number of special feature bits in the core segment.
pub const SPECIAL_FEATURE_COUNT: u16 = 12;
/// IAB-registered CMP id used when none is configured.
pub const DEFAULT_CMP_ID: u16 = 407;

/// Segment type of the disclosed-vendors segment.
const SEGMENT_DISCLOSED_VENDORS: u64 = 1;
/// Segment type of the allowed-vendors segment.
const SEGMENT_ALLOWED_VENDORS: u64 = 2;
/// Segment type of the publisher TC segment.
const SEGMENT_PUBLISHER_TC: u64 = 3;
/// Characters that separate other consent formats and never appear in a TC string.
const FOREIGN_SEPARATORS: [char; 5] = [',', '~', ';', '|', ' '];

// ============================================================================
// SECTION: Model
// ============================================================================

/// Publisher restriction entry of the core segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherRestriction {
    /// Restricted purpose.
    pub purpose_id: u8,
    /// Restriction type (0 not allowed, 1 require consent, 2 require LI).
    pub restriction_type: u8,
    /// Vendors the restriction applies to.
    pub vendor_ids: BTreeSet<u32>,
}

/// Decoded TC string.
///
/// # Invariants
/// - Purpose ids are in `1..=24`; special feature ids are in `1..=12`.
/// - Vendor ids are in `1..=65535`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcModel {
    /// Format version.
    pub version: u8,
    /// Creation time (decisecond precision).
    pub created: Timestamp,
    /// Last update time (decisecond precision).
    pub last_updated: Timestamp,
    /// CMP id.
    pub cmp_id: u16,
    /// CMP version.
    pub cmp_version: u16,
    /// Screen number where consent was given.
    pub consent_screen: u8,
    /// Two-letter consent language.
    pub consent_language: String,
    /// Vendor list version.
    pub vendor_list_version: u16,
    /// TCF policy version.
    pub tcf_policy_version: u8,
    /// Whether the consent is service-specific.
    pub is_service_specific: bool,
    /// Whether non-standard texts were used.
    pub use_non_standard_texts: bool,
    /// Opted-in special features.
    pub special_feature_opt_ins: BTreeSet<u16>,
    /// Consented purposes.
    pub purpose_consents: BTreeSet<u16>,
    /// Purposes with legitimate-interest transparency established.
    pub purpose_legitimate_interests: BTreeSet<u16>,
    /// Purpose one treatment flag.
    pub purpose_one_treatment: bool,
    /// Two-letter publisher country code.
    pub publisher_country_code: String,
    /// Consented vendors.
    pub vendor_consents: BTreeSet<u32>,
    /// Vendors with legitimate interest established.
    pub vendor_legitimate_interests: BTreeSet<u32>,
    /// Publisher restrictions.
    pub publisher_restrictions: Vec<PublisherRestriction>,
    /// Disclosed vendors, when the segment is present.
    pub disclosed_vendors: Option<BTreeSet<u32>>,
}

/// CMP metadata written alongside consent values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcEncodeOptions {
    /// CMP id.
    pub cmp_id: u16,
    /// CMP version.
    pub cmp_version: u16,
    /// Screen number where consent was given.
    pub consent_screen: u8,
    /// Two-letter consent language.
    pub consent_language: String,
    /// Two-letter publisher country code.
    pub publisher_country_code: String,
    /// Whether the consent is service-specific.
    pub is_service_specific: bool,
    /// Whether to append the disclosed-vendors segment (omitted by default).
    pub include_disclosed_vendors: bool,
}

impl Default for TcEncodeOptions {
    fn default() -> Self {
        Self {
            cmp_id: DEFAULT_CMP_ID,
            cmp_version: 1,
            consent_screen: 1,
            consent_language: "EN".to_string(),
            publisher_country_code: "AA".to_string(),
            is_service_specific: true,
            include_disclosed_vendors: false,
        }
    }
}

// ============================================================================
// SECTION: Public Entry Points
// ============================================================================

/// Encodes the TCF slots of a decision as a TC string.
///
/// # Errors
///
/// Returns [`EncodeError`] when the experience is not TCF or a value cannot be represented.
pub fn encode(
    decision: &ConsentDecision,
    experience: &Experience,
    timestamp: Timestamp,
    options: &TcEncodeOptions,
) -> Result<String, EncodeError> {
    TcModel::from_decision(decision, experience, timestamp, options)?.encode()
}

/// Decodes a TC string.
///
/// # Errors
///
/// Returns [`DecodeError`] for malformed or unsupported input.
pub fn decode(raw: &str) -> Result<TcModel, DecodeError> {
    TcModel::decode(raw)
}

/// Decodes a TC string into the TCF slots of an experience.
///
/// # Errors
///
/// Returns [`DecodeError`] for malformed or unsupported input.
pub fn decode_decision(raw: &str, experience: &Experience) -> Result<ConsentDecision, DecodeError> {
    Ok(TcModel::decode(raw)?.to_decision(experience))
}

// ============================================================================
// SECTION: Decision Conversion
// ============================================================================

impl TcModel {
    /// Builds a model from a decision normalized against the experience.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] when the experience is not TCF or an id is out of range.
    pub fn from_decision(
        decision: &ConsentDecision,
        experience: &Experience,
        timestamp: Timestamp,
        options: &TcEncodeOptions,
    ) -> Result<Self, EncodeError> {
        let gvl = experience.gvl.ok_or(EncodeError::NotTcf)?;
        let normalized = decision.normalized(experience, Fallback::OptOut);
        let disclosed_vendors = if options.include_disclosed_vendors {
            let mut ids = BTreeSet::new();
            for vendor in &experience.vendors {
                if let Some(id) = gvl_vendor_id(&vendor.id)? {
                    ids.insert(id);
                }
            }
            Some(ids)
        } else {
            None
        };
        Ok(Self {
            version: TC_STRING_VERSION,
            created: timestamp,
            last_updated: timestamp,
            cmp_id: options.cmp_id,
            cmp_version: options.cmp_version,
            consent_screen: options.consent_screen,
            consent_language: options.consent_language.to_ascii_uppercase(),
            vendor_list_version: gvl.vendor_list_version,
            tcf_policy_version: gvl.tcf_policy_version,
            is_service_specific: options.is_service_specific,
            use_non_standard_texts: false,
            special_feature_opt_ins: checked_ids(
                &normalized.special_feature_opt_in,
                SPECIAL_FEATURE_COUNT,
                "special_feature_opt_ins",
            )?,
            purpose_consents: checked_ids(
                &normalized.purpose_consent,
                PURPOSE_COUNT,
                "purpose_consents",
            )?,
            purpose_legitimate_interests: checked_ids(
                &normalized.purpose_legitimate_interest,
                PURPOSE_COUNT,
                "purpose_legitimate_interests",
            )?,
            purpose_one_treatment: false,
            publisher_country_code: options.publisher_country_code.to_ascii_uppercase(),
            vendor_consents: granted_vendor_ids(&normalized.vendor_consent)?,
            vendor_legitimate_interests: granted_vendor_ids(
                &normalized.vendor_legitimate_interest,
            )?,
            publisher_restrictions: Vec::new(),
            disclosed_vendors,
        })
    }

    /// Projects the model onto the TCF slots an experience declares.
    ///
    /// Vendors without a numeric GVL id are left unset.
    #[must_use]
    pub fn to_decision(&self, experience: &Experience) -> ConsentDecision {
        let mut decision = ConsentDecision::default();
        for field in experience.fields().into_iter().filter(FieldRef::is_tcf) {
            let value = match &field {
                FieldRef::PurposeConsent(id) => Some(self.purpose_consents.contains(id)),
                FieldRef::PurposeLegitimateInterest(id) => {
                    Some(self.purpose_legitimate_interests.contains(id))
                }
                FieldRef::SpecialFeatureOptIn(id) => Some(self.special_feature_opt_ins.contains(id)),
                FieldRef::VendorConsent(id) => {
                    vendor_number(id).map(|n| self.vendor_consents.contains(&n))
                }
                FieldRef::VendorLegitimateInterest(id) => {
                    vendor_number(id).map(|n| self.vendor_legitimate_interests.contains(&n))
                }
                FieldRef::SystemConsent(_)
                | FieldRef::SystemLegitimateInterest(_)
                | FieldRef::Notice(_) => None,
            };
            if let Some(value) = value {
                decision.set(field, value);
            }
        }
        decision
    }
}

/// Returns the granted ids, rejecting ids outside `1..=max`.
fn checked_ids(
    values: &std::collections::BTreeMap<u16, bool>,
    max: u16,
    field: &'static str,
) -> Result<BTreeSet<u16>, EncodeError> {
    let mut ids = BTreeSet::new();
    for (id, granted) in values {
        if *id == 0 {
            return Err(EncodeError::InvalidIdentifier {
                field,
                value: id.to_string(),
            });
        }
        if *id > max {
            return Err(EncodeError::EncodingOverflow {
                field,
                value: u64::from(*id),
                max: u64::from(max),
            });
        }
        if *granted {
            ids.insert(*id);
        }
    }
    Ok(ids)
}

/// Returns the numeric GVL ids of granted vendors.
fn granted_vendor_ids(
    values: &std::collections::BTreeMap<VendorId, bool>,
) -> Result<BTreeSet<u32>, EncodeError> {
    let mut ids = BTreeSet::new();
    for (vendor, granted) in values {
        if *granted && let Some(id) = gvl_vendor_id(vendor)? {
            ids.insert(id);
        }
    }
    Ok(ids)
}

/// Converts a vendor id to its numeric GVL id, if it has one.
fn gvl_vendor_id(vendor: &VendorId) -> Result<Option<u32>, EncodeError> {
    vendor
        .gvl_id()
        .map(|id| {
            u32::try_from(id).map_err(|_| EncodeError::EncodingOverflow {
                field: "vendor_id",
                value: id,
                max: u64::from(u32::MAX),
            })
        })
        .transpose()
}

/// Returns the numeric GVL id of a vendor when it fits the wire format.
fn vendor_number(vendor: &VendorId) -> Option<u32> {
    vendor.gvl_id().and_then(|id| u32::try_from(id).ok())
}

// ============================================================================
// SECTION: Encoding
// ============================================================================

impl TcModel {
    /// Serializes the model as a TC string.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] when a value does not fit its field.
    pub fn encode(&self) -> Result<String, EncodeError> {
        let mut core = BitWriter::new();
        core.push_int(u64::from(self.version), 6, "version")?;
        core.push_int(deciseconds(self.created)?, 36, "created")?;
        core.push_int(deciseconds(self.last_updated)?, 36, "last_updated")?;
        core.push_int(u64::from(self.cmp_id), 12, "cmp_id")?;
        core.push_int(u64::from(self.cmp_version), 12, "cmp_version")?;
        core.push_int(u64::from(self.consent_screen), 6, "consent_screen")?;
        push_letters(&mut core, &self.consent_language, "consent_language")?;
        core.push_int(u64::from(self.vendor_list_version), 12, "vendor_list_version")?;
        core.push_int(u64::from(self.tcf_policy_version), 6, "tcf_policy_version")?;
        core.push_bool(self.is_service_specific);
        core.push_bool(self.use_non_standard_texts);
        push_id_bits(&mut core, &self.special_feature_opt_ins, SPECIAL_FEATURE_COUNT, "special_feature_opt_ins")?;
        push_id_bits(&mut core, &self.purpose_consents, PURPOSE_COUNT, "purpose_consents")?;
        push_id_bits(
            &mut core,
            &self.purpose_legitimate_interests,
            PURPOSE_COUNT,
            "purpose_legitimate_interests",
        )?;
        core.push_bool(self.purpose_one_treatment);
        push_letters(&mut core, &self.publisher_country_code, "publisher_country_code")?;
        write_vendor_section(&mut core, &self.vendor_consents, "vendor_consents")?;
        write_vendor_section(
            &mut core,
            &self.vendor_legitimate_interests,
            "vendor_legitimate_interests",
        )?;
        let count = u64::try_from(self.publisher_restrictions.len()).unwrap_or(u64::MAX);
        core.push_int(count, 12, "num_pub_restrictions")?;
        for restriction in &self.publisher_restrictions {
            core.push_int(u64::from(restriction.purpose_id), 6, "restriction_purpose_id")?;
            core.push_int(u64::from(restriction.restriction_type), 2, "restriction_type")?;
            write_range_entries(&mut core, &restriction.vendor_ids, "restriction_vendors")?;
        }

        let mut out = encode_segment(&core, TC_SEGMENT_ALIGN_BITS);
        if let Some(disclosed) = &self.disclosed_vendors {
            let mut segment = BitWriter::new();
            segment.push_int(SEGMENT_DISCLOSED_VENDORS, 3, "segment_type")?;
            write_vendor_section(&mut segment, disclosed, "disclosed_vendors")?;
            out.push('.');
            out.push_str(&encode_segment(&segment, TC_SEGMENT_ALIGN_BITS));
        }
        Ok(out)
    }
}

/// Converts a timestamp to unsigned deciseconds.
fn deciseconds(timestamp: Timestamp) -> Result<u64, EncodeError> {
    let value = timestamp.as_deciseconds();
    u64::try_from(value).map_err(|_| EncodeError::InvalidTimestamp(timestamp.as_unix_millis()))
}

/// Writes a fixed-length bitfield where bit `i - 1` marks id `i`.
fn push_id_bits(
    writer: &mut BitWriter,
    ids: &BTreeSet<u16>,
    count: u16,
    field: &'static str,
) -> Result<(), EncodeError> {
    if let Some(max) = ids.last().filter(|max| **max > count) {
        return Err(EncodeError::EncodingOverflow {
            field,
            value: u64::from(*max),
            max: u64::from(count),
        });
    }
    for id in 1 ..= count {
        writer.push_bool(ids.contains(&id));
    }
    Ok(())
}

/// Writes a two-letter code as two 6-bit offsets from `A`.
fn push_letters(writer: &mut BitWriter, code: &str, field: &'static str) -> Result<(), EncodeError> {
    let bytes = code.as_bytes();
    if bytes.len() != 2 || !bytes.iter().all(u8::is_ascii_alphabetic) {
        return Err(EncodeError::InvalidLetterCode {
            field,
            value: code.to_string(),
        });
    }
    for byte in bytes {
        writer.push_int(u64::from(byte.to_ascii_uppercase() - b'A'), 6, field)?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

impl TcModel {
    /// Parses a TC string.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] for malformed or unsupported input.
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DecodeError::Empty);
        }
        if let Some(separator) = raw.chars().find(|c| FOREIGN_SEPARATORS.contains(c)) {
            return Err(DecodeError::InvalidSegment(format!(
                "unexpected separator '{separator}'"
            )));
        }
        let mut segments = raw.split('.');
        let core = segments.next().ok_or(DecodeError::Empty)?;
        let mut model = decode_core(decode_segment(core)?)?;
        for segment in segments {
            let mut reader = decode_segment(segment)?;
            match reader.read_int(3, "segment_type")? {
                SEGMENT_DISCLOSED_VENDORS => {
                    model.disclosed_vendors =
                        Some(read_vendor_section(&mut reader, "disclosed_vendors")?);
                }
                SEGMENT_ALLOWED_VENDORS | SEGMENT_PUBLISHER_TC => {}
                other => {
                    return Err(DecodeError::InvalidSegment(format!("unknown segment type {other}")));
                }
            }
        }
        Ok(model)
    }
}

/// Parses the core segment.
fn decode_core(mut reader: BitReader) -> Result<TcModel, DecodeError> {
    let version = reader.read_int(6, "version")?;
    if version != u64::from(TC_STRING_VERSION) {
        return Err(DecodeError::UnsupportedVersion {
            found: version,
        });
    }
    let created = read_timestamp(&mut reader, "created")?;
    let last_updated = read_timestamp(&mut reader, "last_updated")?;
    let cmp_id = reader.read_u16(12, "cmp_id")?;
    let cmp_version = reader.read_u16(12, "cmp_version")?;
    let consent_screen = reader.read_u8(6, "consent_screen")?;
    let consent_language = read_letters(&mut reader, "consent_language")?;
    let vendor_list_version = reader.read_u16(12, "vendor_list_version")?;
    let tcf_policy_version = reader.read_u8(6, "tcf_policy_version")?;
    let is_service_specific = reader.read_bool("is_service_specific")?;
    let use_non_standard_texts = reader.read_bool("use_non_standard_texts")?;
    let special_feature_opt_ins =
        read_id_bits(&mut reader, SPECIAL_FEATURE_COUNT, "special_feature_opt_ins")?;
    let purpose_consents = read_id_bits(&mut reader, PURPOSE_COUNT, "purpose_consents")?;
    let purpose_legitimate_interests =
        read_id_bits(&mut reader, PURPOSE_COUNT, "purpose_legitimate_interests")?;
    let purpose_one_treatment = reader.read_bool("purpose_one_treatment")?;
    let publisher_country_code = read_letters(&mut reader, "publisher_country_code")?;
    let vendor_consents = read_vendor_section(&mut reader, "vendor_consents")?;
    let vendor_legitimate_interests =
        read_vendor_section(&mut reader, "vendor_legitimate_interests")?;
    let restriction_count = reader.read_u16(12, "num_pub_restrictions")?;
    let mut publisher_restrictions = Vec::with_capacity(usize::from(restriction_count));
    for _ in 0 .. restriction_count {
        publisher_restrictions.push(PublisherRestriction {
            purpose_id: reader.read_u8(6, "restriction_purpose_id")?,
            restriction_type: reader.read_u8(2, "restriction_type")?,
            vendor_ids: read_range_entries(&mut reader, "restriction_vendors", MAX_VENDOR_ID)?,
        });
    }
    Ok(TcModel {
        version: TC_STRING_VERSION,
        created,
        last_updated,
        cmp_id,
        cmp_version,
        consent_screen,
        consent_language,
        vendor_list_version,
        tcf_policy_version,
        is_service_specific,
        use_non_standard_texts,
        special_feature_opt_ins,
        purpose_consents,
        purpose_legitimate_interests,
        purpose_one_treatment,
        publisher_country_code,
        vendor_consents,
        vendor_legitimate_interests,
        publisher_restrictions,
        disclosed_vendors: None,
    })
}

/// Reads a 36-bit decisecond timestamp.
fn read_timestamp(reader: &mut BitReader, field: &'static str) -> Result<Timestamp, DecodeError> {
    let value = reader.read_int(36, field)?;
    let value = i64::try_from(value).map_err(|_| DecodeError::InvalidField(field.to_string()))?;
    Ok(Timestamp::from_deciseconds(value))
}

/// Reads a fixed-length id bitfield.
fn read_id_bits(
    reader: &mut BitReader,
    count: u16,
    field: &'static str,
) -> Result<BTreeSet<u16>, DecodeError> {
    let mut ids = BTreeSet::new();
    for id in 1 ..= count {
        if reader.read_bool(field)? {
            ids.insert(id);
        }
    }
    Ok(ids)
}

/// Reads a two-letter code.
fn read_letters(reader: &mut BitReader, field: &'static str) -> Result<String, DecodeError> {
    let mut out = String::with_capacity(2);
    for _ in 0 .. 2 {
        let offset = reader.read_u8(6, field)?;
        if offset > 25 {
            return Err(DecodeError::InvalidField(format!("{field}: letter offset {offset}")));
        }
        out.push(char::from(b'A' + offset));
    }
    Ok(out)
}
