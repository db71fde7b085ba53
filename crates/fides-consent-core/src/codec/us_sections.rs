// crates/fides-consent-core/src/codec/us_sections.rs
// ============================================================================
// Module: US GPP Sections
// Description: Field layouts and bit codecs for the US national and state sections.
// Purpose: Encode notice choices into usnat, usca, usva, and usco payloads.
// Dependencies: serde, crate::codec::{bits, base64url}
// ============================================================================

//! ## Overview
//! Every US section starts with a 6-bit version followed by 2-bit fields in
//! a fixed order. Field values are `0` (not applicable), `1`, or `2`; list
//! fields repeat the 2-bit value once per category. Sections with a GPC
//! subsection append `.` and a segment holding `SubsectionType(2) = 1` and
//! a single `Gpc` bit.
//!
//! Security posture: decoded payloads come from cookies and query strings;
//! every read is bounds-checked and unknown subsections are rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::codec::DecodeError;
use crate::codec::EncodeError;
use crate::codec::base64url::GPP_SEGMENT_ALIGN_BITS;
use crate::codec::base64url::decode_segment;
use crate::codec::base64url::encode_segment;
use crate::codec::bits::BitWriter;
use crate::core::sections::GppSectionId;
use crate::core::sections::UsField;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Width of each US field value.
const FIELD_BITS: u32 = 2;
/// Largest US field value.
const MAX_FIELD_VALUE: u8 = 3;
/// Subsection type of the GPC subsection.
const GPC_SUBSECTION_TYPE: u64 = 1;

/// Field value meaning "not applicable".
pub const VALUE_NOT_APPLICABLE: u8 = 0;
/// Field value meaning "yes", "provided", or "opted out" depending on the field.
pub const VALUE_ONE: u8 = 1;
/// Field value meaning "no", "not provided", or "did not opt out".
pub const VALUE_TWO: u8 = 2;

// ============================================================================
// SECTION: Schemas
// ============================================================================

/// Shape of a US field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// A single 2-bit value.
    Single,
    /// A fixed-length list of 2-bit values.
    List(usize),
}

/// One field of a US section layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsFieldSpec {
    /// Field name.
    pub field: UsField,
    /// Field shape.
    pub shape: FieldShape,
}

/// Bit layout of one US section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsSectionSchema {
    /// Section the layout belongs to.
    pub section: GppSectionId,
    /// Section version written in the first 6 bits.
    pub version: u8,
    /// Fields in wire order.
    pub fields: &'static [UsFieldSpec],
    /// Whether the section carries a GPC subsection.
    pub has_gpc: bool,
}

impl UsSectionSchema {
    /// Returns the shape of a field, if the section has it.
    #[must_use]
    pub fn shape_of(&self, field: UsField) -> Option<FieldShape> {
        self.fields.iter().find(|spec| spec.field == field).map(|spec| spec.shape)
    }
}

/// Builds a single-value field spec.
const fn single(field: UsField) -> UsFieldSpec {
    UsFieldSpec {
        field,
        shape: FieldShape::Single,
    }
}

/// Builds a list field spec.
const fn list(field: UsField, len: usize) -> UsFieldSpec {
    UsFieldSpec {
        field,
        shape: FieldShape::List(len),
    }
}

/// National section layout.
static USNAT: UsSectionSchema = UsSectionSchema {
    section: GppSectionId::UsNat,
    version: 1,
    fields: &[
        single(UsField::SharingNotice),
        single(UsField::SaleOptOutNotice),
        single(UsField::SharingOptOutNotice),
        single(UsField::TargetedAdvertisingOptOutNotice),
        single(UsField::SensitiveDataProcessingOptOutNotice),
        single(UsField::SensitiveDataLimitUseNotice),
        single(UsField::SaleOptOut),
        single(UsField::SharingOptOut),
        single(UsField::TargetedAdvertisingOptOut),
        list(UsField::SensitiveDataProcessing, 12),
        list(UsField::KnownChildSensitiveDataConsents, 2),
        single(UsField::PersonalDataConsents),
        single(UsField::MspaCoveredTransaction),
        single(UsField::MspaOptOutOptionMode),
        single(UsField::MspaServiceProviderMode),
    ],
    has_gpc: true,
};

/// California section layout.
static USCA: UsSectionSchema = UsSectionSchema {
    section: GppSectionId::UsCa,
    version: 1,
    fields: &[
        single(UsField::SaleOptOutNotice),
        single(UsField::SharingOptOutNotice),
        single(UsField::SensitiveDataLimitUseNotice),
        single(UsField::SaleOptOut),
        single(UsField::SharingOptOut),
        list(UsField::SensitiveDataProcessing, 9),
        list(UsField::KnownChildSensitiveDataConsents, 2),
        single(UsField::PersonalDataConsents),
        single(UsField::MspaCoveredTransaction),
        single(UsField::MspaOptOutOptionMode),
        single(UsField::MspaServiceProviderMode),
    ],
    has_gpc: true,
};

/// Virginia section layout.
static USVA: UsSectionSchema = UsSectionSchema {
    section: GppSectionId::UsVa,
    version: 1,
    fields: &[
        single(UsField::SharingNotice),
        single(UsField::SaleOptOutNotice),
        single(UsField::TargetedAdvertisingOptOutNotice),
        single(UsField::SaleOptOut),
        single(UsField::TargetedAdvertisingOptOut),
        list(UsField::SensitiveDataProcessing, 8),
        single(UsField::KnownChildSensitiveDataConsents),
        single(UsField::MspaCoveredTransaction),
        single(UsField::MspaOptOutOptionMode),
        single(UsField::MspaServiceProviderMode),
    ],
    has_gpc: false,
};

/// Colorado section layout.
static USCO: UsSectionSchema = UsSectionSchema {
    section: GppSectionId::UsCo,
    version: 1,
    fields: &[
        single(UsField::SharingNotice),
        single(UsField::SaleOptOutNotice),
        single(UsField::TargetedAdvertisingOptOutNotice),
        single(UsField::SaleOptOut),
        single(UsField::TargetedAdvertisingOptOut),
        list(UsField::SensitiveDataProcessing, 7),
        single(UsField::KnownChildSensitiveDataConsents),
        single(UsField::MspaCoveredTransaction),
        single(UsField::MspaOptOutOptionMode),
        single(UsField::MspaServiceProviderMode),
    ],
    has_gpc: true,
};

/// Returns the layout of a US section; `None` for non-US sections.
#[must_use]
pub fn schema(section: GppSectionId) -> Option<&'static UsSectionSchema> {
    match section {
        GppSectionId::TcfEuV2 => None,
        GppSectionId::UsNat => Some(&USNAT),
        GppSectionId::UsCa => Some(&USCA),
        GppSectionId::UsVa => Some(&USVA),
        GppSectionId::UsCo => Some(&USCO),
    }
}

// ============================================================================
// SECTION: Section Values
// ============================================================================

/// Value of one US field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UsFieldValue {
    /// Single 2-bit value.
    Single(u8),
    /// List of 2-bit values.
    List(Vec<u8>),
}

/// Decoded or composed US section.
///
/// # Invariants
/// - `fields` holds exactly the fields of the section layout.
/// - `gpc` is `Some` only for sections with a GPC subsection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsSection {
    /// Section identifier.
    pub section: GppSectionId,
    /// Section version.
    pub version: u8,
    /// Field values.
    pub fields: BTreeMap<UsField, UsFieldValue>,
    /// GPC subsection value.
    pub gpc: Option<bool>,
}

impl UsSection {
    /// Creates a section with every field not applicable.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::InvalidSection`] for non-US sections.
    pub fn new(section: GppSectionId) -> Result<Self, EncodeError> {
        let layout = layout_for(section)?;
        let fields = layout
            .fields
            .iter()
            .map(|spec| {
                let value = match spec.shape {
                    FieldShape::Single => UsFieldValue::Single(VALUE_NOT_APPLICABLE),
                    FieldShape::List(len) => UsFieldValue::List(vec![VALUE_NOT_APPLICABLE; len]),
                };
                (spec.field, value)
            })
            .collect();
        Ok(Self {
            section,
            version: layout.version,
            fields,
            gpc: layout.has_gpc.then_some(false),
        })
    }

    /// Sets a field; list fields receive `value` in every position.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] when the section lacks the field or the value exceeds 2 bits.
    pub fn set(&mut self, field: UsField, value: u8) -> Result<(), EncodeError> {
        if value > MAX_FIELD_VALUE {
            return Err(EncodeError::EncodingOverflow {
                field: field.as_str(),
                value: u64::from(value),
                max: u64::from(MAX_FIELD_VALUE),
            });
        }
        let shape = layout_for(self.section)?.shape_of(field).ok_or_else(|| {
            EncodeError::InvalidSection(format!("{} has no field {field}", self.section))
        })?;
        let entry = match shape {
            FieldShape::Single => UsFieldValue::Single(value),
            FieldShape::List(len) => UsFieldValue::List(vec![value; len]),
        };
        self.fields.insert(field, entry);
        Ok(())
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, field: UsField) -> Option<&UsFieldValue> {
        self.fields.get(&field)
    }

    /// Serializes the section payload.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] when a value does not match the layout.
    pub fn encode(&self) -> Result<String, EncodeError> {
        let layout = layout_for(self.section)?;
        let mut core = BitWriter::new();
        core.push_int(u64::from(self.version), 6, "version")?;
        for spec in layout.fields {
            let name = spec.field.as_str();
            match (spec.shape, self.fields.get(&spec.field)) {
                (FieldShape::Single, None) => core.push_int(0, FIELD_BITS, name)?,
                (FieldShape::Single, Some(UsFieldValue::Single(value))) => {
                    core.push_int(u64::from(*value), FIELD_BITS, name)?;
                }
                (FieldShape::List(len), None) => {
                    for _ in 0 .. len {
                        core.push_int(0, FIELD_BITS, name)?;
                    }
                }
                (FieldShape::List(len), Some(UsFieldValue::List(values))) if values.len() == len => {
                    for value in values {
                        core.push_int(u64::from(*value), FIELD_BITS, name)?;
                    }
                }
                _ => {
                    return Err(EncodeError::InvalidSection(format!(
                        "{}: value for {name} does not match its shape",
                        self.section
                    )));
                }
            }
        }
        let mut out = encode_segment(&core, GPP_SEGMENT_ALIGN_BITS);
        if layout.has_gpc {
            let mut gpc = BitWriter::new();
            gpc.push_int(GPC_SUBSECTION_TYPE, 2, "subsection_type")?;
            gpc.push_bool(self.gpc.unwrap_or(false));
            out.push('.');
            out.push_str(&encode_segment(&gpc, GPP_SEGMENT_ALIGN_BITS));
        }
        Ok(out)
    }

    /// Parses a section payload.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] for malformed payloads.
    pub fn decode(section: GppSectionId, raw: &str) -> Result<Self, DecodeError> {
        let layout =
            schema(section).ok_or(DecodeError::UnsupportedSection(u64::from(section.id())))?;
        let mut segments = raw.split('.');
        let core = segments.next().ok_or(DecodeError::Empty)?;
        let mut reader = decode_segment(core)?;
        let version = reader.read_u8(6, "version")?;
        if version != layout.version {
            return Err(DecodeError::InvalidField(format!(
                "{section}: unsupported version {version}"
            )));
        }
        let mut fields = BTreeMap::new();
        for spec in layout.fields {
            let name = spec.field.as_str();
            let value = match spec.shape {
                FieldShape::Single => UsFieldValue::Single(reader.read_u8(FIELD_BITS, name)?),
                FieldShape::List(len) => {
                    let mut values = Vec::with_capacity(len);
                    for _ in 0 .. len {
                        values.push(reader.read_u8(FIELD_BITS, name)?);
                    }
                    UsFieldValue::List(values)
                }
            };
            fields.insert(spec.field, value);
        }
        let mut gpc = None;
        for segment in segments {
            let mut reader = decode_segment(segment)?;
            let subsection = reader.read_int(2, "subsection_type")?;
            if subsection != GPC_SUBSECTION_TYPE || !layout.has_gpc {
                return Err(DecodeError::InvalidSegment(format!(
                    "{section}: unexpected subsection type {subsection}"
                )));
            }
            gpc = Some(reader.read_bool("gpc")?);
        }
        Ok(Self {
            section,
            version,
            fields,
            gpc,
        })
    }
}

/// Returns the layout for a section or an encode error for non-US sections.
fn layout_for(section: GppSectionId) -> Result<&'static UsSectionSchema, EncodeError> {
    schema(section)
        .ok_or_else(|| EncodeError::InvalidSection(format!("{section} is not a us section")))
}
