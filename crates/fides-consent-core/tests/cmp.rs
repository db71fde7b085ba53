// crates/fides-consent-core/tests/cmp.rs
// ============================================================================
// Module: CMP Registry Tests
// Description: `__gpp` and `__tcfapi` command handling and event ordering.
// ============================================================================
//! ## Overview
//! Drives the registry directly through its lifecycle transitions and checks
//! the events and snapshots observed by page scripts.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;

use fides_consent_core::ConsentDecision;
use fides_consent_core::ConsentMethod;
use fides_consent_core::GppSectionId;
use fides_consent_core::ListenerId;
use fides_consent_core::TcEncodeOptions;
use fides_consent_core::cmp::CmpRegistry;
use fides_consent_core::cmp::CmpStatus;
use fides_consent_core::cmp::ConsentSignals;
use fides_consent_core::cmp::GppCommand;
use fides_consent_core::cmp::GppResponse;
use fides_consent_core::cmp::SignalStatus;
use fides_consent_core::cmp::TcData;
use fides_consent_core::cmp::TcfCommand;
use fides_consent_core::cmp::TcfEventStatus;
use fides_consent_core::cmp::TcfListener;
use fides_consent_core::cmp::TcfResponse;
use fides_consent_core::codec::tcf;

use crate::common::gpp_recorder;
use crate::common::now;
use crate::common::tcf_experience;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Shared log of TCF event statuses.
type TcfLog = Arc<Mutex<Vec<Option<TcfEventStatus>>>>;

/// Returns a TCF listener that appends event statuses to a shared log.
fn tcf_recorder() -> (TcfLog, Box<dyn TcfListener>) {
    let log: TcfLog = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let listener: Box<dyn TcfListener> = Box::new(move |data: &TcData, success: bool| {
        assert!(success);
        sink.lock().expect("tcf log").push(data.event_status);
    });
    (log, listener)
}

/// Signals carrying a single California payload.
fn california_signals(payload: &str) -> ConsentSignals {
    ConsentSignals {
        gpp_string: format!("DBABBg~{payload}"),
        section_strings: BTreeMap::from([(GppSectionId::UsCa, payload.to_string())]),
        ..ConsentSignals::default()
    }
}

/// Signals carrying an accept-all TC string for the TCF fixture.
fn tcf_signals() -> ConsentSignals {
    let experience = tcf_experience();
    let tc_string = tcf::encode(
        &ConsentDecision::accept_all(&experience),
        &experience,
        now(),
        &TcEncodeOptions::default(),
    )
    .unwrap();
    ConsentSignals {
        tc_model: Some(tcf::decode(&tc_string).unwrap()),
        tc_string,
        ..ConsentSignals::default()
    }
}

// ============================================================================
// SECTION: GPP Events
// ============================================================================

#[test]
fn first_decision_emits_events_in_order() {
    let mut registry = CmpRegistry::new(407, 1);
    let (log, listener) = gpp_recorder();
    registry.handle_gpp(GppCommand::AddEventListener(listener));

    registry.mark_loaded(BTreeSet::from([GppSectionId::UsCa]), None);
    registry.ui_shown();
    let changed = registry.decision_applied(ConsentMethod::Accept, california_signals("BVVVkg"));

    assert_eq!(changed, vec![GppSectionId::UsCa]);
    assert_eq!(*log.lock().unwrap(), vec![
        "listenerRegistered",
        "cmpStatus=loaded",
        "signalStatus=not ready",
        "cmpDisplayStatus=visible",
        "cmpDisplayStatus=hidden",
        "sectionChange=uscav1",
        "signalStatus=ready",
    ]);
}

#[test]
fn unchanged_sections_do_not_emit_section_change() {
    let mut registry = CmpRegistry::new(407, 1);
    registry.mark_loaded(BTreeSet::from([GppSectionId::UsCa]), None);
    registry.decision_applied(ConsentMethod::Script, california_signals("BVVVkg"));

    let (log, listener) = gpp_recorder();
    registry.handle_gpp(GppCommand::AddEventListener(listener));
    let changed = registry.decision_applied(ConsentMethod::Script, california_signals("BVVVkg"));

    assert!(changed.is_empty());
    assert_eq!(*log.lock().unwrap(), vec!["listenerRegistered", "signalStatus=ready"]);
}

#[test]
fn load_status_is_emitted_once() {
    let mut registry = CmpRegistry::new(407, 1);
    let (log, listener) = gpp_recorder();
    registry.handle_gpp(GppCommand::AddEventListener(listener));
    registry.mark_loaded(BTreeSet::new(), None);
    registry.mark_loaded(BTreeSet::from([GppSectionId::UsNat]), None);

    assert_eq!(*log.lock().unwrap(), vec!["listenerRegistered", "cmpStatus=loaded"]);
    assert_eq!(registry.ping_data().applicable_sections, vec![7]);
}

#[test]
fn closing_ui_before_any_decision_stays_not_ready() {
    let mut registry = CmpRegistry::new(407, 1);
    registry.mark_loaded(BTreeSet::new(), None);
    registry.ui_shown();
    registry.ui_closed();
    assert_eq!(registry.state().signal_status, SignalStatus::NotReady);
}

// ============================================================================
// SECTION: Commands
// ============================================================================

#[test]
fn ping_reflects_loaded_state() {
    let mut registry = CmpRegistry::new(407, 3);
    let (GppResponse::Ping(before), true) = registry.handle_gpp(GppCommand::Ping) else {
        panic!("expected ping data");
    };
    assert_eq!(before.cmp_status, CmpStatus::Loading);
    assert!(before.applicable_sections.is_empty());
    assert!(before.supported_apis.contains(&"8:uscav1".to_string()));

    registry.mark_loaded(BTreeSet::from([GppSectionId::UsCa]), None);
    registry.decision_applied(ConsentMethod::Accept, california_signals("BVVVkg"));
    let (GppResponse::GppData(data), true) = registry.handle_gpp(GppCommand::GetGppData) else {
        panic!("expected gpp data");
    };
    assert_eq!(data.gpp_string, "DBABBg~BVVVkg");
    assert_eq!(data.applicable_sections, vec![8]);
    assert_eq!(data.section_list, vec![8]);
    assert_eq!(data.ping_data.cmp_version, 3);
    assert_eq!(data.ping_data.signal_status, SignalStatus::Ready);
}

#[test]
fn listeners_can_be_removed_once() {
    let mut registry = CmpRegistry::new(407, 1);
    let (_, first) = gpp_recorder();
    let (_, second) = gpp_recorder();
    let (GppResponse::Registered(first_id), true) =
        registry.handle_gpp(GppCommand::AddEventListener(first))
    else {
        panic!("expected registration");
    };
    let (GppResponse::Registered(second_id), true) =
        registry.handle_gpp(GppCommand::AddEventListener(second))
    else {
        panic!("expected registration");
    };
    assert_eq!(first_id, ListenerId::new(0));
    assert_ne!(first_id, second_id);

    assert_eq!(
        registry.handle_gpp(GppCommand::RemoveEventListener(first_id)),
        (GppResponse::Removed(true), true)
    );
    assert_eq!(
        registry.handle_gpp(GppCommand::RemoveEventListener(first_id)),
        (GppResponse::Removed(false), false)
    );
}

// ============================================================================
// SECTION: TCF API
// ============================================================================

#[test]
fn tc_data_is_unavailable_before_a_tc_string_exists() {
    let mut registry = CmpRegistry::new(407, 1);
    assert_eq!(
        registry.handle_tcfapi(TcfCommand::GetTcData(None)),
        (TcfResponse::TcData(None), false)
    );

    registry.mark_loaded(BTreeSet::new(), tcf_experience().gvl);
    let signals = tcf_signals();
    let tc_string = signals.tc_string.clone();
    registry.restore_consent(signals);

    let (TcfResponse::TcData(Some(data)), true) =
        registry.handle_tcfapi(TcfCommand::GetTcData(Some(vec![2, 3])))
    else {
        panic!("expected tc data");
    };
    assert_eq!(data.tc_string, tc_string);
    assert_eq!(data.cmp_status, CmpStatus::Loaded);
    assert_eq!(data.purpose.consents.get(&4), Some(&true));
    assert_eq!(data.purpose.consents.get(&1), Some(&false));
    assert_eq!(data.vendor.consents, BTreeMap::from([(2, true), (3, false)]));
}

#[test]
fn tcf_listeners_receive_status_transitions() {
    let mut registry = CmpRegistry::new(407, 1);
    registry.mark_loaded(BTreeSet::new(), tcf_experience().gvl);
    registry.restore_consent(tcf_signals());

    let (log, listener) = tcf_recorder();
    registry.handle_tcfapi(TcfCommand::AddEventListener(listener));
    registry.ui_shown();
    registry.decision_applied(ConsentMethod::Reject, tcf_signals());

    assert_eq!(*log.lock().unwrap(), vec![
        Some(TcfEventStatus::TcLoaded),
        Some(TcfEventStatus::CmpUiShown),
        Some(TcfEventStatus::UserActionComplete),
    ]);
}

#[test]
fn tcf_ping_reports_gdpr_after_load() {
    let mut registry = CmpRegistry::new(407, 1);
    let (TcfResponse::Ping(before), true) = registry.handle_tcfapi(TcfCommand::Ping) else {
        panic!("expected ping");
    };
    assert_eq!(before.gdpr_applies, None);
    assert!(!before.cmp_loaded);

    registry.mark_loaded(BTreeSet::new(), tcf_experience().gvl);
    let (TcfResponse::Ping(after), true) = registry.handle_tcfapi(TcfCommand::Ping) else {
        panic!("expected ping");
    };
    assert_eq!(after.gdpr_applies, Some(true));
    assert_eq!(after.gvl_version, Some(48));
    assert_eq!(after.api_version, "2.2");
}
