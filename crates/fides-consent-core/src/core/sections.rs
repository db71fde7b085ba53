// crates/fides-consent-core/src/core/sections.rs
// ============================================================================
// Module: GPP Section Vocabulary
// Description: Section identifiers and US privacy field names for GPP.
// Purpose: Share one closed vocabulary between the model and the codecs.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! GPP multiplexes regional sub-protocols ("sections") inside one string.
//! This module names the sections the engine can produce and the fields of
//! the US sections that privacy notices map onto.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Section Identifiers
// ============================================================================

/// GPP section identifiers supported by the engine.
///
/// # Invariants
/// - Ordering follows the numeric section id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GppSectionId {
    /// IAB TCF v2 (EU).
    #[serde(rename = "tcfeuv2")]
    TcfEuV2,
    /// US national privacy.
    #[serde(rename = "usnatv1")]
    UsNat,
    /// US California.
    #[serde(rename = "uscav1")]
    UsCa,
    /// US Virginia.
    #[serde(rename = "usvav1")]
    UsVa,
    /// US Colorado.
    #[serde(rename = "uscov1")]
    UsCo,
}

impl GppSectionId {
    /// All supported sections in ascending id order.
    pub const ALL: [Self; 5] = [Self::TcfEuV2, Self::UsNat, Self::UsCa, Self::UsVa, Self::UsCo];

    /// Returns the numeric GPP section id.
    #[must_use]
    pub const fn id(self) -> u16 {
        match self {
            Self::TcfEuV2 => 2,
            Self::UsNat => 7,
            Self::UsCa => 8,
            Self::UsVa => 9,
            Self::UsCo => 10,
        }
    }

    /// Returns the GPP API prefix used in events and `getGPPData`.
    #[must_use]
    pub const fn api_prefix(self) -> &'static str {
        match self {
            Self::TcfEuV2 => "tcfeuv2",
            Self::UsNat => "usnatv1",
            Self::UsCa => "uscav1",
            Self::UsVa => "usvav1",
            Self::UsCo => "uscov1",
        }
    }

    /// Looks up a section by numeric id.
    #[must_use]
    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|section| section.id() == id)
    }

    /// Looks up a section by API prefix.
    #[must_use]
    pub fn from_api_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|section| section.api_prefix() == prefix)
    }

    /// Returns the US state section for an experience region, if one exists.
    #[must_use]
    pub fn for_us_state(region: &str) -> Option<Self> {
        match region {
            "us_ca" => Some(Self::UsCa),
            "us_va" => Some(Self::UsVa),
            "us_co" => Some(Self::UsCo),
            _ => None,
        }
    }

    /// Returns true for US sections (everything except TCF).
    #[must_use]
    pub const fn is_us(self) -> bool {
        !matches!(self, Self::TcfEuV2)
    }
}

impl fmt::Display for GppSectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_prefix())
    }
}

// ============================================================================
// SECTION: US Fields
// ============================================================================

/// Named fields of the US GPP sections.
///
/// Variant names match the field names published for the GPP US sections so
/// notice mappings read the same in JSON as in the IAB documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UsField {
    /// Notice of sharing personal data.
    SharingNotice,
    /// Notice of the right to opt out of sale.
    SaleOptOutNotice,
    /// Notice of the right to opt out of sharing.
    SharingOptOutNotice,
    /// Notice of the right to opt out of targeted advertising.
    TargetedAdvertisingOptOutNotice,
    /// Notice of the right to opt out of sensitive data processing.
    SensitiveDataProcessingOptOutNotice,
    /// Notice of the right to limit use of sensitive data.
    SensitiveDataLimitUseNotice,
    /// Opt out of sale.
    SaleOptOut,
    /// Opt out of sharing.
    SharingOptOut,
    /// Opt out of targeted advertising.
    TargetedAdvertisingOptOut,
    /// Per-category sensitive data processing choices.
    SensitiveDataProcessing,
    /// Consents for processing known child sensitive data.
    KnownChildSensitiveDataConsents,
    /// Consent to collection of personal data.
    PersonalDataConsents,
    /// Whether the transaction is covered by the MSPA.
    MspaCoveredTransaction,
    /// MSPA opt-out option mode.
    MspaOptOutOptionMode,
    /// MSPA service provider mode.
    MspaServiceProviderMode,
}

impl UsField {
    /// Returns the published field name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SharingNotice => "SharingNotice",
            Self::SaleOptOutNotice => "SaleOptOutNotice",
            Self::SharingOptOutNotice => "SharingOptOutNotice",
            Self::TargetedAdvertisingOptOutNotice => "TargetedAdvertisingOptOutNotice",
            Self::SensitiveDataProcessingOptOutNotice => "SensitiveDataProcessingOptOutNotice",
            Self::SensitiveDataLimitUseNotice => "SensitiveDataLimitUseNotice",
            Self::SaleOptOut => "SaleOptOut",
            Self::SharingOptOut => "SharingOptOut",
            Self::TargetedAdvertisingOptOut => "TargetedAdvertisingOptOut",
            Self::SensitiveDataProcessing => "SensitiveDataProcessing",
            Self::KnownChildSensitiveDataConsents => "KnownChildSensitiveDataConsents",
            Self::PersonalDataConsents => "PersonalDataConsents",
            Self::MspaCoveredTransaction => "MspaCoveredTransaction",
            Self::MspaOptOutOptionMode => "MspaOptOutOptionMode",
            Self::MspaServiceProviderMode => "MspaServiceProviderMode",
        }
    }
}

impl fmt::Display for UsField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
