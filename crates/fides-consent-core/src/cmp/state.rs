// crates/fides-consent-core/src/cmp/state.rs
// ============================================================================
// Module: CMP State
// Description: Signal, display, and load status plus the published strings.
// Purpose: Hold the page-session CMP state and render its API snapshots.
// Dependencies: serde, crate::{codec, core}
// ============================================================================

//! ## Overview
//! [`CmpState`] is created in `Loading`/`NotReady`/`Hidden` and lives for the
//! page session. Snapshots handed to listeners ([`PingData`], [`TcData`])
//! are owned copies, so listeners never observe partial updates.
//!
//! Snapshot structs serialize with the camelCase field names the IAB APIs
//! publish to page scripts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::codec::tcf::PURPOSE_COUNT;
use crate::codec::tcf::SPECIAL_FEATURE_COUNT;
use crate::codec::tcf::TcModel;
use crate::core::experience::GvlMetadata;
use crate::core::identifiers::ListenerId;
use crate::core::sections::GppSectionId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// GPP API version reported in ping data.
pub const GPP_API_VERSION: &str = "1.1";
/// TCF API version reported in ping data.
pub const TCF_API_VERSION: &str = "2.2";

// ============================================================================
// SECTION: Status Enums
// ============================================================================

/// Whether the published strings are final.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SignalStatus {
    /// Strings may still change.
    #[default]
    #[serde(rename = "not ready")]
    NotReady,
    /// Strings are final for now.
    #[serde(rename = "ready")]
    Ready,
}

/// Whether the consent UI is on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    /// UI hidden.
    #[default]
    Hidden,
    /// UI visible.
    Visible,
}

/// Whether the CMP has its experience data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CmpStatus {
    /// Waiting for the experience.
    #[default]
    Loading,
    /// Experience loaded.
    Loaded,
}

// ============================================================================
// SECTION: CMP State
// ============================================================================

/// Page-session CMP state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmpState {
    /// Signal status.
    pub signal_status: SignalStatus,
    /// Display status.
    pub display_status: DisplayStatus,
    /// Load status.
    pub cmp_status: CmpStatus,
    /// Current TC string.
    pub tc_string: String,
    /// Current GPP string.
    pub gpp_string: String,
    /// Sections that apply to the loaded experience.
    pub applied_sections: BTreeSet<GppSectionId>,
    /// Last encoded payload of each section.
    pub section_strings: BTreeMap<GppSectionId, String>,
    /// Whether a decision has been established this session.
    pub consent_established: bool,
}

// ============================================================================
// SECTION: GPP Snapshots
// ============================================================================

/// `__gpp` ping data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PingData {
    /// GPP API version.
    pub gpp_version: String,
    /// Supported APIs as `<id>:<prefix>`.
    #[serde(rename = "supportedAPIs")]
    pub supported_apis: Vec<String>,
    /// CMP id.
    pub cmp_id: u16,
    /// CMP version.
    pub cmp_version: u16,
    /// Load status.
    pub cmp_status: CmpStatus,
    /// Display status.
    pub cmp_display_status: DisplayStatus,
    /// Signal status.
    pub signal_status: SignalStatus,
    /// Applicable section ids.
    pub applicable_sections: Vec<u16>,
    /// Section ids present in the GPP string.
    pub section_list: Vec<u16>,
    /// Current GPP string.
    pub gpp_string: String,
}

impl CmpState {
    /// Builds the `__gpp` ping snapshot.
    #[must_use]
    pub fn ping_data(&self, cmp_id: u16, cmp_version: u16) -> PingData {
        PingData {
            gpp_version: GPP_API_VERSION.to_string(),
            supported_apis: GppSectionId::ALL
                .iter()
                .map(|section| format!("{}:{}", section.id(), section.api_prefix()))
                .collect(),
            cmp_id,
            cmp_version,
            cmp_status: self.cmp_status,
            cmp_display_status: self.display_status,
            signal_status: self.signal_status,
            applicable_sections: self.applied_sections.iter().map(|s| s.id()).collect(),
            section_list: self.section_strings.keys().map(|s| s.id()).collect(),
            gpp_string: self.gpp_string.clone(),
        }
    }
}

/// `__gpp` `getGPPData` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GppData {
    /// Current GPP string.
    pub gpp_string: String,
    /// Applicable section ids.
    pub applicable_sections: Vec<u16>,
    /// Section ids present in the GPP string.
    pub section_list: Vec<u16>,
    /// Ping snapshot.
    pub ping_data: PingData,
}

// ============================================================================
// SECTION: TCF Snapshots
// ============================================================================

/// `__tcfapi` ping data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TcfPingData {
    /// Whether GDPR applies; `None` until loaded.
    pub gdpr_applies: Option<bool>,
    /// Whether the CMP finished loading.
    pub cmp_loaded: bool,
    /// `loaded` or `loading`.
    pub cmp_status: CmpStatus,
    /// Display status.
    pub display_status: DisplayStatus,
    /// TCF API version.
    pub api_version: String,
    /// CMP version.
    pub cmp_version: u16,
    /// CMP id.
    pub cmp_id: u16,
    /// Vendor list version, once loaded.
    pub gvl_version: Option<u16>,
    /// TCF policy version, once loaded.
    pub tcf_policy_version: Option<u8>,
}

/// Event status delivered to `__tcfapi` listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TcfEventStatus {
    /// A TC string is available on load.
    TcLoaded,
    /// The consent UI was shown.
    CmpUiShown,
    /// The user completed a consent action.
    UserActionComplete,
}

/// Consent and legitimate-interest maps keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentVector<K: Ord> {
    /// Consent by id.
    pub consents: BTreeMap<K, bool>,
    /// Legitimate interest by id.
    pub legitimate_interests: BTreeMap<K, bool>,
}

/// `__tcfapi` TC data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TcData {
    /// Current TC string; empty before the first decision.
    pub tc_string: String,
    /// TCF policy version.
    pub tcf_policy_version: Option<u8>,
    /// CMP id.
    pub cmp_id: u16,
    /// CMP version.
    pub cmp_version: u16,
    /// Whether GDPR applies.
    pub gdpr_applies: bool,
    /// Event status, for listener callbacks.
    pub event_status: Option<TcfEventStatus>,
    /// Load status.
    pub cmp_status: CmpStatus,
    /// Listener id, for listener callbacks.
    pub listener_id: Option<ListenerId>,
    /// Whether the consent is service-specific.
    pub is_service_specific: bool,
    /// Whether non-standard texts were used.
    pub use_non_standard_texts: bool,
    /// Publisher country code.
    pub publisher_cc: String,
    /// Purpose one treatment flag.
    pub purpose_one_treatment: bool,
    /// Purpose consents and legitimate interests.
    pub purpose: ConsentVector<u16>,
    /// Vendor consents and legitimate interests.
    pub vendor: ConsentVector<u32>,
    /// Special feature opt-ins.
    pub special_feature_optins: BTreeMap<u16, bool>,
}

impl TcData {
    /// Builds TC data from the current model, if any.
    ///
    /// When `vendor_ids` is given the vendor maps list exactly those ids.
    /// `cmp_status`, `event_status`, and `listener_id` are left for the
    /// registry to fill in.
    #[must_use]
    pub fn new(
        model: Option<&TcModel>,
        tc_string: &str,
        cmp_id: u16,
        cmp_version: u16,
        gvl: Option<GvlMetadata>,
        vendor_ids: Option<&[u32]>,
    ) -> Self {
        let mut purpose = ConsentVector::default();
        let mut vendor = ConsentVector::default();
        let mut special_feature_optins = BTreeMap::new();
        if let Some(model) = model {
            for id in 1 ..= PURPOSE_COUNT {
                purpose.consents.insert(id, model.purpose_consents.contains(&id));
                purpose
                    .legitimate_interests
                    .insert(id, model.purpose_legitimate_interests.contains(&id));
            }
            for id in 1 ..= SPECIAL_FEATURE_COUNT {
                special_feature_optins.insert(id, model.special_feature_opt_ins.contains(&id));
            }
            let ids: BTreeSet<u32> = match vendor_ids {
                Some(ids) => ids.iter().copied().collect(),
                None => model
                    .vendor_consents
                    .iter()
                    .chain(&model.vendor_legitimate_interests)
                    .chain(model.disclosed_vendors.iter().flatten())
                    .copied()
                    .collect(),
            };
            for id in ids {
                vendor.consents.insert(id, model.vendor_consents.contains(&id));
                vendor
                    .legitimate_interests
                    .insert(id, model.vendor_legitimate_interests.contains(&id));
            }
        }
        Self {
            tc_string: tc_string.to_string(),
            tcf_policy_version: gvl.map(|gvl| gvl.tcf_policy_version),
            cmp_id,
            cmp_version,
            gdpr_applies: gvl.is_some(),
            event_status: None,
            cmp_status: CmpStatus::default(),
            listener_id: None,
            is_service_specific: model.is_none_or(|model| model.is_service_specific),
            use_non_standard_texts: model.is_some_and(|model| model.use_non_standard_texts),
            publisher_cc: model
                .map_or_else(String::new, |model| model.publisher_country_code.clone()),
            purpose_one_treatment: model.is_some_and(|model| model.purpose_one_treatment),
            purpose,
            vendor,
            special_feature_optins,
        }
    }
}
