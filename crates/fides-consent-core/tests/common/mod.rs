// crates/fides-consent-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared experiences, recorders, and helpers for core tests.
// Purpose: Provide reusable deterministic fixtures across test files.
// Dependencies: fides-consent-core, serde_json
// ============================================================================

//! ## Overview
//! Fixtures cover a TCF experience (purposes 4, 6, 7, 9 on consent and
//! purpose 2 on legitimate interest) and a California experience with a
//! GPC-aware sale/sharing notice and a two-child marketing hierarchy.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use fides_consent_core::ConsentDecision;
use fides_consent_core::Experience;
use fides_consent_core::NoticeKey;
use fides_consent_core::Timestamp;
use fides_consent_core::cmp::GppEvent;
use fides_consent_core::cmp::GppEventData;
use fides_consent_core::cmp::GppEventName;
use fides_consent_core::cmp::GppListener;
use fides_consent_core::cmp::PageEvent;
use fides_consent_core::interfaces::PageEventListener;
use fides_consent_core::runtime::ConsentAuditEvent;
use fides_consent_core::runtime::ConsentAuditSink;
use serde_json::json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fixed clock used by codec tests (2024-01-01T00:00:00Z).
pub const NOW_MS: i64 = 1_704_067_200_000;

/// Returns the fixed test clock.
pub const fn now() -> Timestamp {
    Timestamp::from_unix_millis(NOW_MS)
}

// ============================================================================
// SECTION: Experiences
// ============================================================================

/// TCF experience served in the EEA.
pub fn tcf_experience() -> Experience {
    serde_json::from_value(json!({
        "id": "pri_tcf",
        "region": "eea",
        "component": "tcf_overlay",
        "gvl": { "vendor_list_version": 48, "tcf_policy_version": 5 },
        "purposes": [
            { "id": 2, "name": "Basic ads", "legal_basis": "legitimate_interest" },
            { "id": 4, "name": "Personalised ads", "legal_basis": "consent" },
            { "id": 6, "name": "Personalised content", "legal_basis": "consent" },
            { "id": 7, "name": "Measure ads", "legal_basis": "consent" },
            { "id": 9, "name": "Market research", "legal_basis": "consent" }
        ],
        "special_purposes": [
            { "id": 1, "name": "Security" }
        ],
        "special_features": [
            { "id": 1, "name": "Geolocation" }
        ],
        "vendors": [
            {
                "id": "gvl.2",
                "name": "Captify",
                "purpose_consents": [4, 7],
                "purpose_legitimate_interests": [2]
            },
            {
                "id": "gvl.8",
                "name": "Emerse",
                "purpose_consents": [9]
            }
        ],
        "systems": [
            {
                "id": "ctl_analytics",
                "name": "Analytics",
                "purpose_consents": [7]
            }
        ]
    }))
    .expect("tcf experience fixture")
}

/// California experience with GPP mappings and a notice hierarchy.
pub fn us_experience() -> Experience {
    serde_json::from_value(json!({
        "id": "pri_us_ca",
        "region": "us_ca",
        "component": "banner",
        "notices": [
            {
                "id": "pri_notice_sales",
                "notice_key": "data_sales_and_sharing",
                "name": "Data sales and sharing",
                "consent_mechanism": "opt_out",
                "default_preference": "opt_in",
                "has_gpc_flag": true,
                "gpp_mappings": [
                    {
                        "section": "uscav1",
                        "notice_fields": ["SaleOptOutNotice", "SharingOptOutNotice"],
                        "mechanism_fields": ["SaleOptOut", "SharingOptOut"]
                    },
                    {
                        "section": "usnatv1",
                        "notice_fields": ["SaleOptOutNotice", "SharingOptOutNotice"],
                        "mechanism_fields": ["SaleOptOut", "SharingOptOut"]
                    }
                ]
            },
            {
                "id": "pri_notice_essential",
                "notice_key": "essential",
                "name": "Essential",
                "consent_mechanism": "notice_only",
                "default_preference": "acknowledge"
            },
            {
                "id": "pri_notice_marketing",
                "notice_key": "marketing",
                "name": "Marketing",
                "consent_mechanism": "opt_in",
                "default_preference": "opt_out",
                "children": [
                    {
                        "id": "pri_notice_email",
                        "notice_key": "email_marketing",
                        "name": "Email",
                        "consent_mechanism": "opt_in",
                        "default_preference": "opt_out"
                    },
                    {
                        "id": "pri_notice_push",
                        "notice_key": "push_marketing",
                        "name": "Push",
                        "consent_mechanism": "opt_in",
                        "default_preference": "opt_out"
                    }
                ]
            }
        ]
    }))
    .expect("us experience fixture")
}

/// Builds a decision with the given purpose consents.
pub fn purpose_decision(pairs: &[(u16, bool)]) -> ConsentDecision {
    let mut decision = ConsentDecision::default();
    decision.purpose_consent.extend(pairs.iter().copied());
    decision
}

/// Returns a notice key.
pub fn key(raw: &str) -> NoticeKey {
    NoticeKey::new(raw)
}

// ============================================================================
// SECTION: Recorders
// ============================================================================

/// Audit sink that keeps events in memory.
#[derive(Default)]
pub struct RecordingAuditSink {
    /// Recorded events.
    events: Mutex<Vec<ConsentAuditEvent>>,
}

impl RecordingAuditSink {
    /// Returns a shared recorder.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns the recorded events.
    pub fn events(&self) -> Vec<ConsentAuditEvent> {
        self.events.lock().expect("audit lock").clone()
    }

    /// Returns the recorded event labels.
    pub fn labels(&self) -> Vec<&'static str> {
        self.events().iter().map(ConsentAuditEvent::event).collect()
    }
}

impl ConsentAuditSink for RecordingAuditSink {
    fn record(&self, event: &ConsentAuditEvent) {
        self.events.lock().expect("audit lock").push(event.clone());
    }
}

/// Compact label for a GPP event.
pub fn gpp_label(event: &GppEvent) -> String {
    let name = match event.event_name {
        GppEventName::ListenerRegistered => "listenerRegistered",
        GppEventName::SignalStatus => "signalStatus",
        GppEventName::CmpDisplayStatus => "cmpDisplayStatus",
        GppEventName::SectionChange => "sectionChange",
        GppEventName::CmpStatus => "cmpStatus",
    };
    let data = serde_json::to_value(&event.data).expect("event data");
    match (&event.data, data) {
        (GppEventData::Registered(_), _) => name.to_string(),
        (_, serde_json::Value::String(value)) => format!("{name}={value}"),
        (_, other) => format!("{name}={other}"),
    }
}

/// Shared log of GPP event labels.
pub type GppLog = Arc<Mutex<Vec<String>>>;

/// Returns a GPP listener that appends labels to a shared log.
pub fn gpp_recorder() -> (GppLog, Box<dyn GppListener>) {
    let log: GppLog = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let listener: Box<dyn GppListener> = Box::new(move |event: &GppEvent, success: bool| {
        assert!(success);
        sink.lock().expect("gpp log").push(gpp_label(event));
    });
    (log, listener)
}

/// Shared log of page event names.
pub type PageLog = Arc<Mutex<Vec<&'static str>>>;

/// Returns a page listener that appends event names to a shared log.
pub fn page_recorder() -> (PageLog, Box<dyn PageEventListener>) {
    let log: PageLog = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let listener: Box<dyn PageEventListener> = Box::new(move |event: &PageEvent| {
        sink.lock().expect("page log").push(event.event_type.as_str());
    });
    (log, listener)
}

/// Returns true when `needle` appears in `haystack` in order.
pub fn is_subsequence(haystack: &[String], needle: &[&str]) -> bool {
    let mut remaining = needle.iter().peekable();
    for item in haystack {
        if remaining.peek().is_some_and(|want| item == *want) {
            remaining.next();
        }
    }
    remaining.peek().is_none()
}
