// crates/fides-consent-core/src/core/decision.rs
// ============================================================================
// Module: Consent Decision
// Description: Authoritative per-slot consent values and typed slot references.
// Purpose: Provide the single state object resolved, encoded, and persisted.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`ConsentDecision`] holds one boolean per consent slot. Slots are
//! addressed by [`FieldRef`], a closed enum resolved by exhaustive match so
//! no lookup ever goes through a string field name.
//!
//! Invariants:
//! - A decision is normalized against its experience before encoding: every
//!   slot the experience declares has an entry and no other slot does.
//! - Notice-only notices are always `true`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::experience::Experience;
use crate::core::identifiers::NoticeKey;
use crate::core::identifiers::VendorId;

// ============================================================================
// SECTION: Field References
// ============================================================================

/// Typed reference to one consent slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum FieldRef {
    /// Purpose consent.
    PurposeConsent(u16),
    /// Purpose legitimate interest.
    PurposeLegitimateInterest(u16),
    /// Special feature opt-in.
    SpecialFeatureOptIn(u16),
    /// TCF vendor consent.
    VendorConsent(VendorId),
    /// TCF vendor legitimate interest.
    VendorLegitimateInterest(VendorId),
    /// Non-IAB system consent.
    SystemConsent(VendorId),
    /// Non-IAB system legitimate interest.
    SystemLegitimateInterest(VendorId),
    /// Privacy notice consent.
    Notice(NoticeKey),
}

impl FieldRef {
    /// Returns true when the slot is carried in the TC string.
    #[must_use]
    pub const fn is_tcf(&self) -> bool {
        matches!(
            self,
            Self::PurposeConsent(_)
                | Self::PurposeLegitimateInterest(_)
                | Self::SpecialFeatureOptIn(_)
                | Self::VendorConsent(_)
                | Self::VendorLegitimateInterest(_)
        )
    }

    /// Returns true when the slot is justified by legitimate interest.
    #[must_use]
    pub const fn is_legitimate_interest(&self) -> bool {
        matches!(
            self,
            Self::PurposeLegitimateInterest(_)
                | Self::VendorLegitimateInterest(_)
                | Self::SystemLegitimateInterest(_)
        )
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PurposeConsent(id) => write!(f, "purpose_consent:{id}"),
            Self::PurposeLegitimateInterest(id) => write!(f, "purpose_legitimate_interest:{id}"),
            Self::SpecialFeatureOptIn(id) => write!(f, "special_feature_opt_in:{id}"),
            Self::VendorConsent(id) => write!(f, "vendor_consent:{id}"),
            Self::VendorLegitimateInterest(id) => write!(f, "vendor_legitimate_interest:{id}"),
            Self::SystemConsent(id) => write!(f, "system_consent:{id}"),
            Self::SystemLegitimateInterest(id) => write!(f, "system_legitimate_interest:{id}"),
            Self::Notice(key) => write!(f, "notice:{key}"),
        }
    }
}

// ============================================================================
// SECTION: Consent Method
// ============================================================================

/// How a decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentMethod {
    /// User accepted all.
    Accept,
    /// User rejected all.
    Reject,
    /// User saved custom choices.
    Save,
    /// User dismissed the UI.
    Dismiss,
    /// Applied automatically from host configuration.
    Script,
}

impl ConsentMethod {
    /// Returns a stable label for the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Save => "save",
            Self::Dismiss => "dismiss",
            Self::Script => "script",
        }
    }

    /// Returns true when a user interaction produced the decision.
    #[must_use]
    pub const fn is_user_action(self) -> bool {
        !matches!(self, Self::Script)
    }
}

/// Value used for slots missing from a winning source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Missing slots are opted out.
    OptOut,
    /// Missing slots take the experience default.
    ExperienceDefault,
}

// ============================================================================
// SECTION: Consent Decision
// ============================================================================

/// Authoritative consent state for one user and experience.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentDecision {
    /// Purpose consent by purpose id.
    pub purpose_consent: BTreeMap<u16, bool>,
    /// Purpose legitimate interest by purpose id.
    pub purpose_legitimate_interest: BTreeMap<u16, bool>,
    /// Special feature opt-in by feature id.
    pub special_feature_opt_in: BTreeMap<u16, bool>,
    /// TCF vendor consent.
    pub vendor_consent: BTreeMap<VendorId, bool>,
    /// TCF vendor legitimate interest.
    pub vendor_legitimate_interest: BTreeMap<VendorId, bool>,
    /// System consent.
    pub system_consent: BTreeMap<VendorId, bool>,
    /// System legitimate interest.
    pub system_legitimate_interest: BTreeMap<VendorId, bool>,
    /// Notice consent by notice key.
    pub notice_consent: BTreeMap<NoticeKey, bool>,
}

impl ConsentDecision {
    /// Returns the value of a slot, if present.
    #[must_use]
    pub fn get(&self, field: &FieldRef) -> Option<bool> {
        match field {
            FieldRef::PurposeConsent(id) => self.purpose_consent.get(id).copied(),
            FieldRef::PurposeLegitimateInterest(id) => {
                self.purpose_legitimate_interest.get(id).copied()
            }
            FieldRef::SpecialFeatureOptIn(id) => self.special_feature_opt_in.get(id).copied(),
            FieldRef::VendorConsent(id) => self.vendor_consent.get(id).copied(),
            FieldRef::VendorLegitimateInterest(id) => {
                self.vendor_legitimate_interest.get(id).copied()
            }
            FieldRef::SystemConsent(id) => self.system_consent.get(id).copied(),
            FieldRef::SystemLegitimateInterest(id) => {
                self.system_legitimate_interest.get(id).copied()
            }
            FieldRef::Notice(key) => self.notice_consent.get(key).copied(),
        }
    }

    /// Sets the value of a slot.
    pub fn set(&mut self, field: FieldRef, value: bool) {
        match field {
            FieldRef::PurposeConsent(id) => {
                self.purpose_consent.insert(id, value);
            }
            FieldRef::PurposeLegitimateInterest(id) => {
                self.purpose_legitimate_interest.insert(id, value);
            }
            FieldRef::SpecialFeatureOptIn(id) => {
                self.special_feature_opt_in.insert(id, value);
            }
            FieldRef::VendorConsent(id) => {
                self.vendor_consent.insert(id, value);
            }
            FieldRef::VendorLegitimateInterest(id) => {
                self.vendor_legitimate_interest.insert(id, value);
            }
            FieldRef::SystemConsent(id) => {
                self.system_consent.insert(id, value);
            }
            FieldRef::SystemLegitimateInterest(id) => {
                self.system_legitimate_interest.insert(id, value);
            }
            FieldRef::Notice(key) => {
                self.notice_consent.insert(key, value);
            }
        }
    }

    /// Returns every populated slot with its value.
    #[must_use]
    pub fn entries(&self) -> Vec<(FieldRef, bool)> {
        let mut out = Vec::new();
        out.extend(self.purpose_consent.iter().map(|(k, v)| (FieldRef::PurposeConsent(*k), *v)));
        out.extend(
            self.purpose_legitimate_interest
                .iter()
                .map(|(k, v)| (FieldRef::PurposeLegitimateInterest(*k), *v)),
        );
        out.extend(
            self.special_feature_opt_in
                .iter()
                .map(|(k, v)| (FieldRef::SpecialFeatureOptIn(*k), *v)),
        );
        out.extend(
            self.vendor_consent.iter().map(|(k, v)| (FieldRef::VendorConsent(k.clone()), *v)),
        );
        out.extend(
            self.vendor_legitimate_interest
                .iter()
                .map(|(k, v)| (FieldRef::VendorLegitimateInterest(k.clone()), *v)),
        );
        out.extend(
            self.system_consent.iter().map(|(k, v)| (FieldRef::SystemConsent(k.clone()), *v)),
        );
        out.extend(
            self.system_legitimate_interest
                .iter()
                .map(|(k, v)| (FieldRef::SystemLegitimateInterest(k.clone()), *v)),
        );
        out.extend(self.notice_consent.iter().map(|(k, v)| (FieldRef::Notice(k.clone()), *v)));
        out
    }

    /// Returns true when any TCF slot is populated.
    #[must_use]
    pub fn has_tcf_entries(&self) -> bool {
        !(self.purpose_consent.is_empty()
            && self.purpose_legitimate_interest.is_empty()
            && self.special_feature_opt_in.is_empty()
            && self.vendor_consent.is_empty()
            && self.vendor_legitimate_interest.is_empty())
    }

    /// Returns only the slots carried in the TC string.
    #[must_use]
    pub fn tcf_slots(&self) -> Self {
        Self {
            purpose_consent: self.purpose_consent.clone(),
            purpose_legitimate_interest: self.purpose_legitimate_interest.clone(),
            special_feature_opt_in: self.special_feature_opt_in.clone(),
            vendor_consent: self.vendor_consent.clone(),
            vendor_legitimate_interest: self.vendor_legitimate_interest.clone(),
            ..Self::default()
        }
    }

    /// Returns populated slots the experience does not declare.
    #[must_use]
    pub fn unknown_fields(&self, experience: &Experience) -> Vec<FieldRef> {
        let known = experience.fields();
        self.entries().into_iter().map(|(field, _)| field).filter(|f| !known.contains(f)).collect()
    }

    /// Returns a decision with exactly the experience's slots populated.
    ///
    /// Present values are kept, missing slots use `fallback`, unknown slots
    /// are dropped, and notice-only notices are forced to `true`.
    #[must_use]
    pub fn normalized(&self, experience: &Experience, fallback: Fallback) -> Self {
        let mut out = Self::default();
        for field in experience.fields() {
            let value = match &field {
                FieldRef::Notice(key)
                    if experience.find_notice(key).is_some_and(|n| n.is_notice_only()) =>
                {
                    true
                }
                _ => self.get(&field).unwrap_or_else(|| match fallback {
                    Fallback::OptOut => false,
                    Fallback::ExperienceDefault => {
                        experience.default_for(&field).unwrap_or(false)
                    }
                }),
            };
            out.set(field, value);
        }
        out
    }

    /// Returns the experience defaults for every slot.
    #[must_use]
    pub fn experience_defaults(experience: &Experience) -> Self {
        Self::default().normalized(experience, Fallback::ExperienceDefault)
    }

    /// Accepts every slot.
    ///
    /// Consent-basis slots and notices become `true`; legitimate-interest
    /// slots follow the experience's default for that basis.
    #[must_use]
    pub fn accept_all(experience: &Experience) -> Self {
        let mut out = Self::default();
        for field in experience.fields() {
            let value = if field.is_legitimate_interest() {
                experience.default_for(&field).unwrap_or(true)
            } else {
                true
            };
            out.set(field, value);
        }
        out
    }

    /// Rejects every slot except notice-only notices.
    #[must_use]
    pub fn reject_all(experience: &Experience) -> Self {
        Self::default().normalized(experience, Fallback::OptOut).with_all(false, experience)
    }

    /// Sets every declinable slot to `value`.
    fn with_all(mut self, value: bool, experience: &Experience) -> Self {
        for (field, _) in self.entries() {
            let notice_only = match &field {
                FieldRef::Notice(key) => experience.find_notice(key).is_some_and(|n| n.is_notice_only()),
                _ => false,
            };
            if !notice_only {
                self.set(field, value);
            }
        }
        self
    }

    /// Overlays every populated slot of `other` onto this decision.
    pub fn overlay(&mut self, other: &Self) {
        for (field, value) in other.entries() {
            self.set(field, value);
        }
    }

    /// Returns the notice values as a flat map.
    #[must_use]
    pub const fn notices(&self) -> &BTreeMap<NoticeKey, bool> {
        &self.notice_consent
    }
}
