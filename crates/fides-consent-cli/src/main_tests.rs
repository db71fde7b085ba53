// crates/fides-consent-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for bounded reads, time, and decision helpers.
// Purpose: Ensure CLI helpers fail closed on oversized or inconsistent inputs.
// Dependencies: fides-consent-cli main helpers
// ============================================================================

//! ## Overview
//! Validates the helper functions behind the `fides-consent` commands.

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use fides_consent_core::ConsentDecision;
use fides_consent_core::Experience;
use fides_consent_core::NoticeKey;
use fides_consent_core::Timestamp;
use serde_json::json;

use super::MAX_STRING_ARG_BYTES;
use super::ReadLimitError;
use super::checked_decision;
use super::ensure_string_limit;
use super::format_timestamp;
use super::now_timestamp;
use super::read_bytes_with_limit;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn temp_file(label: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).expect("clock drift").as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("fides-consent-cli-{label}-{nanos}.bin"));
    path
}

fn cleanup(path: &PathBuf) {
    let _ = fs::remove_file(path);
}

fn notice_experience() -> Experience {
    serde_json::from_value(json!({
        "id": "pri_us_ca",
        "region": "us_ca",
        "component": "banner",
        "notices": [
            {
                "id": "pri_notice_analytics",
                "notice_key": "analytics",
                "name": "Analytics",
                "consent_mechanism": "opt_in",
                "default_preference": "opt_out"
            },
            {
                "id": "pri_notice_essential",
                "notice_key": "essential",
                "name": "Essential",
                "consent_mechanism": "notice_only",
                "default_preference": "acknowledge"
            }
        ]
    }))
    .expect("experience fixture")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn read_bytes_with_limit_rejects_oversized_files() {
    let path = temp_file("oversized");
    fs::write(&path, vec![b'a'; 32]).expect("write file");
    match read_bytes_with_limit(&path, 16) {
        Err(ReadLimitError::TooLarge {
            size,
            limit,
        }) => {
            assert_eq!(size, 32);
            assert_eq!(limit, 16);
        }
        other => panic!("expected size limit error, got {other:?}"),
    }
    cleanup(&path);
}

#[test]
fn read_bytes_with_limit_accepts_files_at_limit() {
    let path = temp_file("at-limit");
    fs::write(&path, vec![b'a'; 16]).expect("write file");
    let bytes = read_bytes_with_limit(&path, 16).expect("read file");
    assert_eq!(bytes.len(), 16);
    cleanup(&path);
}

#[test]
fn read_bytes_with_limit_reports_missing_files() {
    let path = temp_file("missing");
    assert!(matches!(read_bytes_with_limit(&path, 16), Err(ReadLimitError::Io(_))));
}

#[test]
fn format_timestamp_renders_rfc3339() {
    let rendered = format_timestamp(Timestamp::from_unix_millis(1_704_067_200_000)).unwrap();
    assert_eq!(rendered, "2024-01-01T00:00:00Z");
}

#[test]
fn now_timestamp_honors_override() {
    let now = now_timestamp(Some(1_704_067_200_000)).unwrap();
    assert_eq!(now.as_unix_millis(), 1_704_067_200_000);
    assert!(now_timestamp(None).unwrap().as_unix_millis() > 1_704_067_200_000);
}

#[test]
fn ensure_string_limit_rejects_long_arguments() {
    assert!(ensure_string_limit("CPx", "TC string").is_ok());
    let long = "a".repeat(MAX_STRING_ARG_BYTES + 1);
    assert!(ensure_string_limit(&long, "TC string").is_err());
}

#[test]
fn checked_decision_fills_defaults_and_forces_notice_only() {
    let experience = notice_experience();
    let decision = checked_decision(&ConsentDecision::default(), &experience).unwrap();
    assert_eq!(decision.notice_consent.get(&NoticeKey::new("analytics")), Some(&false));
    assert_eq!(decision.notice_consent.get(&NoticeKey::new("essential")), Some(&true));
}

#[test]
fn checked_decision_rejects_unknown_slots() {
    let experience = notice_experience();
    let mut decision = ConsentDecision::default();
    decision.notice_consent.insert(NoticeKey::new("unknown_notice"), true);
    let err = checked_decision(&decision, &experience).unwrap_err();
    assert!(err.to_string().contains("unknown_notice"));
}
