// crates/fides-consent-core/src/core/experience.rs
// ============================================================================
// Module: Experience Model
// Description: Purposes, features, vendors, systems, and notices served to a user.
// Purpose: Define the immutable data the resolver and codecs operate on.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An [`Experience`] is the configuration fetched for one page view: TCF
//! purposes and features, TCF vendors (numeric GVL ids), non-IAB systems,
//! and jurisdiction-specific notices arranged as a tree. The engine treats it
//! as read-only once loaded.
//!
//! Default preferences follow the legal basis unless an entry overrides them:
//! consent-basis slots default to opt-out, legitimate-interest slots default
//! to opt-in, and notice-only notices are always acknowledged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::decision::FieldRef;
use crate::core::identifiers::ExperienceId;
use crate::core::identifiers::NoticeKey;
use crate::core::identifiers::VendorId;
use crate::core::sections::GppSectionId;
use crate::core::sections::UsField;

// ============================================================================
// SECTION: Enumerations
// ============================================================================

/// Legal basis justifying a data use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalBasis {
    /// Processing requires explicit consent.
    Consent,
    /// Processing is justified by legitimate interest.
    LegitimateInterest,
}

impl LegalBasis {
    /// Returns the default preference for slots on this basis.
    #[must_use]
    pub const fn default_preference(self) -> Preference {
        match self {
            Self::Consent => Preference::OptOut,
            Self::LegitimateInterest => Preference::OptIn,
        }
    }
}

/// User preference value for a consent slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preference {
    /// Opted in.
    OptIn,
    /// Opted out.
    OptOut,
    /// Acknowledged (notice-only).
    Acknowledge,
}

impl Preference {
    /// Returns the boolean consent value for this preference.
    #[must_use]
    pub const fn as_bool(self) -> bool {
        matches!(self, Self::OptIn | Self::Acknowledge)
    }
}

/// Consent mechanism of a privacy notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentMechanism {
    /// Off until the user opts in.
    OptIn,
    /// On until the user opts out.
    OptOut,
    /// Informational only; cannot be declined.
    NoticeOnly,
}

/// UI component serving an experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    /// Banner with an optional modal.
    Banner,
    /// Modal only, opened by a link.
    Modal,
    /// TCF banner and overlay.
    TcfOverlay,
    /// No UI; consent is applied by script.
    Headless,
}

// ============================================================================
// SECTION: TCF Entries
// ============================================================================

/// TCF purpose, special purpose, feature, or special feature.
///
/// # Invariants
/// - Identity is `(id, legal_basis)`; a purpose may appear once per basis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TcfItem {
    /// IAB numeric identifier.
    pub id: u16,
    /// Display name.
    pub name: String,
    /// Legal basis for this entry.
    #[serde(default = "default_legal_basis")]
    pub legal_basis: LegalBasis,
    /// Optional override of the basis default preference.
    #[serde(default)]
    pub default_preference: Option<Preference>,
}

impl TcfItem {
    /// Returns the effective default preference.
    #[must_use]
    pub fn effective_default(&self) -> Preference {
        self.default_preference.unwrap_or_else(|| self.legal_basis.default_preference())
    }
}

/// TCF purpose.
pub type Purpose = TcfItem;
/// TCF special purpose (disclosure only).
pub type SpecialPurpose = TcfItem;
/// TCF feature (disclosure only).
pub type Feature = TcfItem;
/// TCF special feature (opt-in).
pub type SpecialFeature = TcfItem;

/// Returns the legal basis used when none is declared.
const fn default_legal_basis() -> LegalBasis {
    LegalBasis::Consent
}

/// Vendor or non-IAB system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Vendor {
    /// Vendor identifier (`gvl.<n>` or opaque system id).
    pub id: VendorId,
    /// Display name.
    pub name: String,
    /// Purposes the vendor processes under consent.
    #[serde(default)]
    pub purpose_consents: BTreeSet<u16>,
    /// Purposes the vendor processes under legitimate interest.
    #[serde(default)]
    pub purpose_legitimate_interests: BTreeSet<u16>,
    /// Whether the vendor also relies on non-TCF legal bases.
    #[serde(default)]
    pub uses_non_tcf_legal_basis: bool,
}

impl Vendor {
    /// Returns true when the vendor declares consent-basis purposes.
    #[must_use]
    pub fn has_consent_basis(&self) -> bool {
        !self.purpose_consents.is_empty()
    }

    /// Returns true when the vendor declares legitimate-interest purposes.
    #[must_use]
    pub fn has_legitimate_interest_basis(&self) -> bool {
        !self.purpose_legitimate_interests.is_empty()
    }
}

/// Global Vendor List metadata carried by TCF experiences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GvlMetadata {
    /// Vendor list version.
    pub vendor_list_version: u16,
    /// TCF policy version.
    #[serde(default = "default_tcf_policy_version")]
    pub tcf_policy_version: u8,
}

/// TCF policy version 5 corresponds to TCF v2.2.
const fn default_tcf_policy_version() -> u8 {
    5
}

// ============================================================================
// SECTION: Notices
// ============================================================================

/// Mapping from a notice onto US GPP section fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GppFieldMapping {
    /// Section the mapping applies to.
    pub section: GppSectionId,
    /// Notice fields set to "provided" whenever the notice is served.
    #[serde(default)]
    pub notice_fields: Vec<UsField>,
    /// Opt-out or consent fields driven by the notice's consent value.
    #[serde(default)]
    pub mechanism_fields: Vec<UsField>,
}

/// Privacy notice, possibly with child notices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Notice {
    /// Notice record identifier.
    pub id: String,
    /// Notice key used in decisions and cookies.
    pub notice_key: NoticeKey,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Consent mechanism.
    pub consent_mechanism: ConsentMechanism,
    /// Default preference for new users.
    pub default_preference: Preference,
    /// Whether Global Privacy Control opts the user out of this notice.
    #[serde(default)]
    pub has_gpc_flag: bool,
    /// GPP field mappings.
    #[serde(default)]
    pub gpp_mappings: Vec<GppFieldMapping>,
    /// Child notices.
    #[serde(default)]
    pub children: Vec<Notice>,
}

impl Notice {
    /// Returns the default consent value for this notice.
    #[must_use]
    pub fn default_value(&self) -> bool {
        match self.consent_mechanism {
            ConsentMechanism::NoticeOnly => true,
            ConsentMechanism::OptIn | ConsentMechanism::OptOut => {
                self.default_preference.as_bool()
            }
        }
    }

    /// Returns true when the notice cannot be declined.
    #[must_use]
    pub const fn is_notice_only(&self) -> bool {
        matches!(self.consent_mechanism, ConsentMechanism::NoticeOnly)
    }
}

// ============================================================================
// SECTION: Experience
// ============================================================================

/// Privacy experience served for one region and page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Experience {
    /// Experience identifier.
    pub id: ExperienceId,
    /// Region code (for example `eea` or `us_ca`).
    pub region: String,
    /// Serving component.
    pub component: ComponentType,
    /// Server-supplied version hash; computed when absent.
    #[serde(default)]
    pub version_hash: Option<String>,
    /// GVL metadata; present only for TCF experiences.
    #[serde(default)]
    pub gvl: Option<GvlMetadata>,
    /// TCF purposes (one entry per id and legal basis).
    #[serde(default)]
    pub purposes: Vec<Purpose>,
    /// TCF special purposes.
    #[serde(default)]
    pub special_purposes: Vec<SpecialPurpose>,
    /// TCF features.
    #[serde(default)]
    pub features: Vec<Feature>,
    /// TCF special features.
    #[serde(default)]
    pub special_features: Vec<SpecialFeature>,
    /// TCF vendors.
    #[serde(default)]
    pub vendors: Vec<Vendor>,
    /// Non-IAB systems.
    #[serde(default)]
    pub systems: Vec<Vendor>,
    /// Privacy notices.
    #[serde(default)]
    pub notices: Vec<Notice>,
}

impl Experience {
    /// Returns true when the experience is governed by TCF.
    #[must_use]
    pub const fn is_tcf(&self) -> bool {
        self.gvl.is_some()
    }

    /// Enumerates every decision slot this experience requires.
    #[must_use]
    pub fn fields(&self) -> BTreeSet<FieldRef> {
        let mut fields = BTreeSet::new();
        for purpose in &self.purposes {
            fields.insert(match purpose.legal_basis {
                LegalBasis::Consent => FieldRef::PurposeConsent(purpose.id),
                LegalBasis::LegitimateInterest => FieldRef::PurposeLegitimateInterest(purpose.id),
            });
        }
        for feature in &self.special_features {
            fields.insert(FieldRef::SpecialFeatureOptIn(feature.id));
        }
        for vendor in &self.vendors {
            if vendor.has_consent_basis() {
                fields.insert(FieldRef::VendorConsent(vendor.id.clone()));
            }
            if vendor.has_legitimate_interest_basis() {
                fields.insert(FieldRef::VendorLegitimateInterest(vendor.id.clone()));
            }
        }
        for system in &self.systems {
            if system.has_consent_basis() {
                fields.insert(FieldRef::SystemConsent(system.id.clone()));
            }
            if system.has_legitimate_interest_basis() {
                fields.insert(FieldRef::SystemLegitimateInterest(system.id.clone()));
            }
        }
        for notice in self.notices_flat() {
            fields.insert(FieldRef::Notice(notice.notice_key.clone()));
        }
        fields
    }

    /// Returns the experience default for a slot, or `None` if the slot is unknown.
    #[must_use]
    pub fn default_for(&self, field: &FieldRef) -> Option<bool> {
        match field {
            FieldRef::PurposeConsent(id) => self
                .purposes
                .iter()
                .find(|p| p.id == *id && p.legal_basis == LegalBasis::Consent)
                .map(|p| p.effective_default().as_bool()),
            FieldRef::PurposeLegitimateInterest(id) => self
                .purposes
                .iter()
                .find(|p| p.id == *id && p.legal_basis == LegalBasis::LegitimateInterest)
                .map(|p| p.effective_default().as_bool()),
            FieldRef::SpecialFeatureOptIn(id) => self
                .special_features
                .iter()
                .find(|f| f.id == *id)
                .map(|f| f.default_preference.unwrap_or(Preference::OptOut).as_bool()),
            FieldRef::VendorConsent(id) => self
                .vendors
                .iter()
                .find(|v| v.id == *id && v.has_consent_basis())
                .map(|_| LegalBasis::Consent.default_preference().as_bool()),
            FieldRef::VendorLegitimateInterest(id) => self
                .vendors
                .iter()
                .find(|v| v.id == *id && v.has_legitimate_interest_basis())
                .map(|_| LegalBasis::LegitimateInterest.default_preference().as_bool()),
            FieldRef::SystemConsent(id) => self
                .systems
                .iter()
                .find(|s| s.id == *id && s.has_consent_basis())
                .map(|_| LegalBasis::Consent.default_preference().as_bool()),
            FieldRef::SystemLegitimateInterest(id) => self
                .systems
                .iter()
                .find(|s| s.id == *id && s.has_legitimate_interest_basis())
                .map(|_| LegalBasis::LegitimateInterest.default_preference().as_bool()),
            FieldRef::Notice(key) => self.find_notice(key).map(Notice::default_value),
        }
    }

    /// Finds a notice anywhere in the notice tree.
    #[must_use]
    pub fn find_notice(&self, key: &NoticeKey) -> Option<&Notice> {
        self.notices_flat().into_iter().find(|notice| notice.notice_key == *key)
    }

    /// Returns every notice in the tree in pre-order.
    #[must_use]
    pub fn notices_flat(&self) -> Vec<&Notice> {
        let mut out = Vec::new();
        let mut stack: Vec<&Notice> = self.notices.iter().rev().collect();
        while let Some(notice) = stack.pop() {
            out.push(notice);
            stack.extend(notice.children.iter().rev());
        }
        out
    }

    /// Returns the TCF vendor with the given GVL id.
    #[must_use]
    pub fn vendor_by_gvl_id(&self, gvl_id: u64) -> Option<&Vendor> {
        self.vendors.iter().find(|vendor| vendor.id.gvl_id() == Some(gvl_id))
    }
}
