// crates/fides-consent-core/tests/gpp.rs
// ============================================================================
// Module: GPP Codec Tests
// Description: Header encoding, section composition, and decoding.
// ============================================================================
//! ## Overview
//! Validates GPP header bits, US section mapping, and section selection.

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

use std::collections::BTreeSet;

use fides_consent_core::ConsentDecision;
use fides_consent_core::DecodeError;
use fides_consent_core::GppSectionId;
use fides_consent_core::GppSettings;
use fides_consent_core::TcEncodeOptions;
use fides_consent_core::UsApproach;
use fides_consent_core::UsField;
use fides_consent_core::codec::gpp;
use fides_consent_core::codec::gpp::SectionPayload;
use fides_consent_core::codec::tcf;
use fides_consent_core::codec::us_sections::UsFieldValue;

use crate::common::key;
use crate::common::now;
use crate::common::tcf_experience;
use crate::common::us_experience;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Enabled GPP settings with the given US approach.
fn settings(us_approach: UsApproach) -> GppSettings {
    GppSettings {
        enabled: true,
        us_approach,
        ..GppSettings::default()
    }
}

/// Decision with the sale/sharing notice set to `value`.
fn sales(value: bool) -> ConsentDecision {
    let mut decision = ConsentDecision::default();
    decision.notice_consent.insert(key("data_sales_and_sharing"), value);
    decision
}

// ============================================================================
// SECTION: Header
// ============================================================================

#[test]
fn header_encodes_known_section_sets() {
    assert_eq!(gpp::build_header(&BTreeSet::from([GppSectionId::TcfEuV2])).unwrap(), "DBABMA");
    assert_eq!(gpp::build_header(&BTreeSet::from([GppSectionId::UsCa])).unwrap(), "DBABBg");
}

#[test]
fn header_without_payloads_is_a_count_mismatch() {
    assert_eq!(gpp::decode_gpp("DBABBg").unwrap_err(), DecodeError::SectionCountMismatch {
        header: 1,
        found: 0,
    });
    assert_eq!(gpp::decode_gpp("").unwrap_err(), DecodeError::Empty);
}

// ============================================================================
// SECTION: Composition
// ============================================================================

#[test]
fn california_section_round_trips() {
    let experience = us_experience();
    let composed = gpp::sections_for_decision(
        &sales(false),
        &experience,
        &settings(UsApproach::State),
        None,
        false,
    )
    .unwrap();
    let encoded = composed.encode().unwrap();

    assert!(encoded.starts_with("DBABBg~"));
    assert!(encoded.ends_with(".QA"));
    assert_eq!(gpp::decode_gpp(&encoded).unwrap(), composed);
}

#[test]
fn notice_change_alters_payload_but_not_header() {
    let experience = us_experience();
    let config = settings(UsApproach::State);
    let opted_in =
        gpp::sections_for_decision(&sales(true), &experience, &config, None, false).unwrap();
    let opted_out =
        gpp::sections_for_decision(&sales(false), &experience, &config, None, false).unwrap();

    let opted_in = opted_in.encode().unwrap();
    let opted_out = opted_out.encode().unwrap();
    assert_ne!(opted_in, opted_out);
    assert_eq!(opted_in.split('~').next(), opted_out.split('~').next());
}

#[test]
fn composition_is_deterministic() {
    let experience = us_experience();
    let config = settings(UsApproach::All);
    let first = gpp::sections_for_decision(&sales(true), &experience, &config, None, true)
        .unwrap()
        .encode()
        .unwrap();
    let second = gpp::sections_for_decision(&sales(true), &experience, &config, None, true)
        .unwrap()
        .encode()
        .unwrap();
    assert_eq!(first, second);
    assert!(first.ends_with(".YA"));
}

#[test]
fn mechanism_and_mspa_fields_follow_settings() {
    let experience = us_experience();
    let config = GppSettings {
        mspa_covered_transactions: true,
        mspa_opt_out_option_mode: true,
        ..settings(UsApproach::State)
    };
    let composed =
        gpp::sections_for_decision(&sales(false), &experience, &config, None, false).unwrap();
    let Some(SectionPayload::Us(us)) = composed.sections.get(&GppSectionId::UsCa) else {
        panic!("expected uscav1 section");
    };

    assert_eq!(us.get(UsField::SaleOptOutNotice), Some(&UsFieldValue::Single(1)));
    assert_eq!(us.get(UsField::SaleOptOut), Some(&UsFieldValue::Single(1)));
    assert_eq!(us.get(UsField::MspaCoveredTransaction), Some(&UsFieldValue::Single(1)));
    assert_eq!(us.get(UsField::MspaOptOutOptionMode), Some(&UsFieldValue::Single(1)));
    assert_eq!(us.get(UsField::MspaServiceProviderMode), Some(&UsFieldValue::Single(2)));
}

#[test]
fn tcf_section_embeds_tc_string() {
    let experience = tcf_experience();
    let tc = tcf::encode(
        &ConsentDecision::accept_all(&experience),
        &experience,
        now(),
        &TcEncodeOptions::default(),
    )
    .unwrap();
    let config = GppSettings {
        enable_tcfeu_string: true,
        ..settings(UsApproach::National)
    };
    let encoded = gpp::sections_for_decision(
        &ConsentDecision::default(),
        &experience,
        &config,
        Some(&tc),
        false,
    )
    .unwrap()
    .encode()
    .unwrap();

    assert_eq!(encoded, format!("DBABMA~{tc}"));
    let decoded = gpp::decode_gpp(&encoded).unwrap();
    assert_eq!(
        decoded.sections.get(&GppSectionId::TcfEuV2),
        Some(&SectionPayload::TcfEuV2(tc))
    );
}

// ============================================================================
// SECTION: Section Selection
// ============================================================================

#[test]
fn us_approach_selects_sections() {
    let california = us_experience();
    assert_eq!(
        gpp::applicable_sections(&california, &settings(UsApproach::National)),
        BTreeSet::from([GppSectionId::UsNat])
    );
    assert_eq!(
        gpp::applicable_sections(&california, &settings(UsApproach::State)),
        BTreeSet::from([GppSectionId::UsCa])
    );

    let mut texas = us_experience();
    texas.region = "us_tx".to_string();
    assert!(gpp::applicable_sections(&texas, &settings(UsApproach::State)).is_empty());
    assert_eq!(
        gpp::applicable_sections(&texas, &settings(UsApproach::All)),
        BTreeSet::from([GppSectionId::UsNat])
    );
}

#[test]
fn disabled_gpp_selects_nothing() {
    let experience = us_experience();
    let composed = gpp::sections_for_decision(
        &sales(true),
        &experience,
        &GppSettings::default(),
        None,
        false,
    )
    .unwrap();
    assert!(composed.sections.is_empty());
    assert!(gpp::applicable_sections(&tcf_experience(), &settings(UsApproach::All)).is_empty());
}
