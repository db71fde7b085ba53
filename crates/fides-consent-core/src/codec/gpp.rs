// crates/fides-consent-core/src/codec/gpp.rs
// ============================================================================
// Module: GPP String Codec
// Description: Global Privacy Platform header, sections, and composition.
// Purpose: Build and parse the `~`-separated GPP envelope.
// Dependencies: serde, crate::codec::{bits, base64url, tcf, us_sections}
// ============================================================================

//! ## Overview
//! A GPP string is `<header>~<section>~<section>...`. The header carries
//! `Type(6) = 3`, `Version(6) = 1`, and a Fibonacci-coded range of section
//! ids; payloads follow in ascending id order. The TCF EU section embeds the
//! TC string verbatim; US sections are encoded by [`crate::codec::us_sections`].
//!
//! Which sections apply depends on the experience region and the configured
//! [`UsApproach`]. Composition is deterministic: the same inputs always
//! produce the same string.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::codec::DecodeError;
use crate::codec::EncodeError;
use crate::codec::base64url::GPP_SEGMENT_ALIGN_BITS;
use crate::codec::base64url::decode_segment;
use crate::codec::base64url::encode_segment;
use crate::codec::bits::BitWriter;
use crate::codec::tcf;
use crate::codec::us_sections::UsFieldValue;
use crate::codec::us_sections::UsSection;
use crate::codec::us_sections::VALUE_NOT_APPLICABLE;
use crate::codec::us_sections::VALUE_ONE;
use crate::codec::us_sections::VALUE_TWO;
use crate::codec::vendor_encoding::range_groups;
use crate::core::decision::ConsentDecision;
use crate::core::experience::Experience;
use crate::core::identifiers::NoticeKey;
use crate::core::sections::GppSectionId;
use crate::core::sections::UsField;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header type field value.
pub const GPP_HEADER_TYPE: u64 = 3;
/// Header version written and accepted.
pub const GPP_VERSION: u64 = 1;
/// Separator between header and section payloads.
pub const SECTION_SEPARATOR: char = '~';

// ============================================================================
// SECTION: Settings
// ============================================================================

/// How US regions map onto GPP sections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsApproach {
    /// Always use the national section.
    #[default]
    National,
    /// Use the state section; states without one get no section.
    State,
    /// Use the state section where one exists, otherwise the national one.
    All,
}

/// GPP composition settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GppSettings {
    /// Whether the GPP API is active.
    pub enabled: bool,
    /// US region mapping.
    pub us_approach: UsApproach,
    /// Whether transactions are covered by the MSPA.
    pub mspa_covered_transactions: bool,
    /// MSPA opt-out option mode.
    pub mspa_opt_out_option_mode: bool,
    /// MSPA service provider mode.
    pub mspa_service_provider_mode: bool,
    /// Whether TCF experiences embed the TC string as the `tcfeuv2` section.
    pub enable_tcfeu_string: bool,
}

/// Returns the sections that apply to an experience.
#[must_use]
pub fn applicable_sections(experience: &Experience, settings: &GppSettings) -> BTreeSet<GppSectionId> {
    let mut sections = BTreeSet::new();
    if !settings.enabled {
        return sections;
    }
    if experience.is_tcf() {
        if settings.enable_tcfeu_string {
            sections.insert(GppSectionId::TcfEuV2);
        }
        return sections;
    }
    if experience.region.starts_with("us") {
        let state = GppSectionId::for_us_state(&experience.region);
        let section = match settings.us_approach {
            UsApproach::National => Some(GppSectionId::UsNat),
            UsApproach::State => state,
            UsApproach::All => state.or(Some(GppSectionId::UsNat)),
        };
        sections.extend(section);
    }
    sections
}

// ============================================================================
// SECTION: Model
// ============================================================================

/// Payload of one GPP section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum SectionPayload {
    /// TC string carried verbatim.
    TcfEuV2(String),
    /// US section values.
    Us(UsSection),
}

/// Decoded or composed GPP string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GppString {
    /// Section payloads by section id.
    pub sections: BTreeMap<GppSectionId, SectionPayload>,
}

impl GppString {
    /// Returns the section ids present.
    #[must_use]
    pub fn section_ids(&self) -> BTreeSet<GppSectionId> {
        self.sections.keys().copied().collect()
    }

    /// Returns each section's encoded payload.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] when a payload cannot be encoded.
    pub fn section_strings(&self) -> Result<BTreeMap<GppSectionId, String>, EncodeError> {
        self.sections
            .iter()
            .map(|(section, payload)| Ok((*section, build_section(*section, payload)?)))
            .collect()
    }

    /// Serializes the full GPP string.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] when the header or a payload cannot be encoded.
    pub fn encode(&self) -> Result<String, EncodeError> {
        let header = build_header(&self.section_ids())?;
        Ok(compose(&header, &self.section_strings()?))
    }
}

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Encodes the GPP header for a set of sections.
///
/// # Errors
///
/// Returns [`EncodeError`] when the range cannot be encoded.
pub fn build_header(sections: &BTreeSet<GppSectionId>) -> Result<String, EncodeError> {
    let mut header = BitWriter::new();
    header.push_int(GPP_HEADER_TYPE, 6, "gpp_type")?;
    header.push_int(GPP_VERSION, 6, "gpp_version")?;
    let ids: BTreeSet<u32> = sections.iter().map(|section| u32::from(section.id())).collect();
    let groups = range_groups(&ids);
    header.push_int(u64::try_from(groups.len()).unwrap_or(u64::MAX), 12, "section_count")?;
    let mut last = 0_u32;
    for (start, end) in groups {
        let is_range = start != end;
        header.push_bool(is_range);
        header.push_fibonacci(u64::from(start - last), "section_id")?;
        if is_range {
            header.push_fibonacci(u64::from(end - start), "section_id")?;
        }
        last = end;
    }
    Ok(encode_segment(&header, GPP_SEGMENT_ALIGN_BITS))
}

/// Encodes one section payload.
///
/// # Errors
///
/// Returns [`EncodeError::InvalidSection`] when the payload does not belong to the section.
pub fn build_section(section: GppSectionId, payload: &SectionPayload) -> Result<String, EncodeError> {
    match (section, payload) {
        (GppSectionId::TcfEuV2, SectionPayload::TcfEuV2(tc_string)) => {
            tcf::decode(tc_string)
                .map_err(|err| EncodeError::InvalidSection(format!("tcfeuv2: {err}")))?;
            Ok(tc_string.clone())
        }
        (section, SectionPayload::Us(us)) if us.section == section => us.encode(),
        (section, _) => {
            Err(EncodeError::InvalidSection(format!("payload does not belong to {section}")))
        }
    }
}

/// Joins a header and section payloads in ascending section id order.
#[must_use]
pub fn compose(header: &str, sections: &BTreeMap<GppSectionId, String>) -> String {
    let mut out = header.to_string();
    for payload in sections.values() {
        out.push(SECTION_SEPARATOR);
        out.push_str(payload);
    }
    out
}

// ============================================================================
// SECTION: Decision Mapping
// ============================================================================

/// Builds the section payloads for a decision.
///
/// The `tcfeuv2` section is included only when `tc_string` is supplied.
///
/// # Errors
///
/// Returns [`EncodeError`] when a notice mapping names a field the section lacks.
pub fn sections_for_decision(
    decision: &ConsentDecision,
    experience: &Experience,
    settings: &GppSettings,
    tc_string: Option<&str>,
    gpc_enabled: bool,
) -> Result<GppString, EncodeError> {
    let mut gpp = GppString::default();
    for section in applicable_sections(experience, settings) {
        if section == GppSectionId::TcfEuV2 {
            if let Some(tc_string) = tc_string {
                gpp.sections.insert(section, SectionPayload::TcfEuV2(tc_string.to_string()));
            }
            continue;
        }
        let us = us_section_for_decision(section, decision, experience, settings, gpc_enabled)?;
        gpp.sections.insert(section, SectionPayload::Us(us));
    }
    Ok(gpp)
}

/// Builds one US section from notice values and MSPA settings.
///
/// # Errors
///
/// Returns [`EncodeError`] when a mapping names a field the section lacks.
pub fn us_section_for_decision(
    section: GppSectionId,
    decision: &ConsentDecision,
    experience: &Experience,
    settings: &GppSettings,
    gpc_enabled: bool,
) -> Result<UsSection, EncodeError> {
    let mut us = UsSection::new(section)?;
    for notice in experience.notices_flat() {
        let consented = decision
            .notice_consent
            .get(&notice.notice_key)
            .copied()
            .unwrap_or_else(|| notice.default_value());
        for mapping in notice.gpp_mappings.iter().filter(|m| m.section == section) {
            for field in &mapping.notice_fields {
                us.set(*field, VALUE_ONE)?;
            }
            let value = if consented { VALUE_TWO } else { VALUE_ONE };
            for field in &mapping.mechanism_fields {
                us.set(*field, value)?;
            }
        }
    }
    let covered = settings.mspa_covered_transactions;
    let mode = |enabled: bool| match (covered, enabled) {
        (false, _) => VALUE_NOT_APPLICABLE,
        (true, true) => VALUE_ONE,
        (true, false) => VALUE_TWO,
    };
    us.set(UsField::MspaCoveredTransaction, if covered { VALUE_ONE } else { VALUE_TWO })?;
    us.set(UsField::MspaOptOutOptionMode, mode(settings.mspa_opt_out_option_mode))?;
    us.set(UsField::MspaServiceProviderMode, mode(settings.mspa_service_provider_mode))?;
    if us.gpc.is_some() {
        us.gpc = Some(gpc_enabled);
    }
    Ok(us)
}

/// Reads notice values back from the US sections of a GPP string.
///
/// A notice takes the value of its first mapped mechanism field: `1`
/// (opted out) is `false`, `2` is `true`, and `0` leaves the notice unset.
/// Notice-only notices are always `true`.
#[must_use]
pub fn notices_from_gpp(gpp: &GppString, experience: &Experience) -> BTreeMap<NoticeKey, bool> {
    let mut notices = BTreeMap::new();
    for notice in experience.notices_flat() {
        if notice.is_notice_only() {
            notices.insert(notice.notice_key.clone(), true);
            continue;
        }
        let value = notice.gpp_mappings.iter().find_map(|mapping| {
            let Some(SectionPayload::Us(us)) = gpp.sections.get(&mapping.section) else {
                return None;
            };
            let field = mapping.mechanism_fields.first()?;
            let raw = match us.get(*field)? {
                UsFieldValue::Single(value) => *value,
                UsFieldValue::List(values) => *values.first()?,
            };
            match raw {
                VALUE_ONE => Some(false),
                VALUE_TWO => Some(true),
                _ => None,
            }
        });
        if let Some(value) = value {
            notices.insert(notice.notice_key.clone(), value);
        }
    }
    notices
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Parses a GPP string.
///
/// # Errors
///
/// Returns [`DecodeError`] for malformed headers, unsupported sections, or bad payloads.
pub fn decode_gpp(raw: &str) -> Result<GppString, DecodeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DecodeError::Empty);
    }
    let mut parts = raw.split(SECTION_SEPARATOR);
    let header = parts.next().ok_or(DecodeError::Empty)?;
    let ids = decode_header(header)?;
    let payloads: Vec<&str> = parts.collect();
    if payloads.len() != ids.len() {
        return Err(DecodeError::SectionCountMismatch {
            header: ids.len(),
            found: payloads.len(),
        });
    }
    let mut gpp = GppString::default();
    for (section, payload) in ids.into_iter().zip(payloads) {
        let decoded = if section == GppSectionId::TcfEuV2 {
            tcf::decode(payload)?;
            SectionPayload::TcfEuV2(payload.to_string())
        } else {
            SectionPayload::Us(UsSection::decode(section, payload)?)
        };
        gpp.sections.insert(section, decoded);
    }
    Ok(gpp)
}

/// Parses the header into section ids in wire order.
fn decode_header(header: &str) -> Result<Vec<GppSectionId>, DecodeError> {
    let mut reader = decode_segment(header)?;
    let header_type = reader.read_int(6, "gpp_type")?;
    if header_type != GPP_HEADER_TYPE {
        return Err(DecodeError::InvalidHeader(format!("type {header_type}")));
    }
    let version = reader.read_int(6, "gpp_version")?;
    if version != GPP_VERSION {
        return Err(DecodeError::InvalidHeader(format!("version {version}")));
    }
    let entries = reader.read_u16(12, "section_count")?;
    let mut ids = Vec::new();
    let mut last = 0_u64;
    for _ in 0 .. entries {
        let is_range = reader.read_bool("section_id")?;
        let start = last.saturating_add(reader.read_fibonacci("section_id")?);
        let end =
            if is_range { start.saturating_add(reader.read_fibonacci("section_id")?) } else { start };
        for id in start ..= end {
            let section = u16::try_from(id)
                .ok()
                .and_then(GppSectionId::from_id)
                .ok_or(DecodeError::UnsupportedSection(id))?;
            if ids.contains(&section) {
                return Err(DecodeError::InvalidHeader(format!("duplicate section {id}")));
            }
            ids.push(section);
        }
        last = end;
    }
    Ok(ids)
}
