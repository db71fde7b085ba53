// crates/fides-consent-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests for the `fides-consent` subcommands.
// Purpose: Drive the built binary over JSON fixtures and check its output.
// Dependencies: fides-consent-cli binary, serde_json
// ============================================================================
//! ## Overview
//! Runs each subcommand against temporary experience, decision, cookie, and
//! config files. Successful commands print canonical JSON on stdout; failures
//! print a message on stderr and exit non-zero.

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
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Fixed clock used for encoding (2024-01-01T00:00:00Z).
const NOW_MS: &str = "1704067200000";

fn fides_consent_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_fides-consent"))
}

fn temp_root(label: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).expect("clock drift").as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("fides-consent-cli-{label}-{nanos}"));
    fs::create_dir_all(&path).expect("create temp dir");
    path
}

fn cleanup(path: &PathBuf) {
    let _ = fs::remove_dir_all(path);
}

fn write_json(root: &Path, name: &str, value: &Value) -> String {
    let path = root.join(name);
    fs::write(&path, serde_json::to_vec(value).expect("serialize fixture")).expect("write fixture");
    path.to_string_lossy().into_owned()
}

fn write_text(root: &Path, name: &str, contents: &str) -> String {
    let path = root.join(name);
    fs::write(&path, contents).expect("write fixture");
    path.to_string_lossy().into_owned()
}

fn run(args: &[&str]) -> Output {
    Command::new(fides_consent_bin())
        .env_remove("FIDES_CONSENT_CONFIG")
        .args(args)
        .output()
        .expect("run fides-consent")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout json")
}

fn stderr_text(output: &Output) -> String {
    assert!(!output.status.success(), "command unexpectedly succeeded");
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn tcf_experience() -> Value {
    json!({
        "id": "pri_tcf",
        "region": "eea",
        "component": "tcf_overlay",
        "gvl": { "vendor_list_version": 48, "tcf_policy_version": 5 },
        "purposes": [
            { "id": 2, "name": "Basic ads", "legal_basis": "legitimate_interest" },
            { "id": 4, "name": "Personalised ads", "legal_basis": "consent" },
            { "id": 7, "name": "Measure ads", "legal_basis": "consent" }
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
                "purpose_consents": [7]
            }
        ]
    })
}

fn us_experience() -> Value {
    json!({
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
                "id": "pri_notice_marketing",
                "notice_key": "marketing",
                "name": "Marketing",
                "consent_mechanism": "opt_in",
                "default_preference": "opt_out"
            }
        ]
    })
}

fn accept_tcf_decision() -> Value {
    json!({
        "purpose_consent": { "4": true, "7": true },
        "purpose_legitimate_interest": { "2": true },
        "vendor_consent": { "gvl.2": true, "gvl.8": false },
        "vendor_legitimate_interest": { "gvl.2": true }
    })
}

// ============================================================================
// SECTION: Version and Config
// ============================================================================

#[test]
fn version_flag_prints_binary_name() {
    let output = run(&["--version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("fides-consent "));
}

#[test]
fn config_validate_accepts_valid_file() {
    let root = temp_root("config-ok");
    let config = write_text(&root, "fides-consent.toml", "[cmp]\ncmp_id = 12\n");
    let output = run(&["config", "validate", "--config", &config]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Config valid.");
    cleanup(&root);
}

#[test]
fn config_validate_reports_invalid_fields() {
    let root = temp_root("config-bad");
    let config = write_text(&root, "fides-consent.toml", "[cmp]\ncmp_id = 0\n");
    let stderr = stderr_text(&run(&["config", "validate", "--config", &config]));
    assert!(stderr.contains("Failed to load config"));
    assert!(stderr.contains("cmp.cmp_id"));
    cleanup(&root);
}

// ============================================================================
// SECTION: TC Strings
// ============================================================================

#[test]
fn tc_encode_then_decode_reports_fields() {
    let root = temp_root("tc-round-trip");
    let experience = write_json(&root, "experience.json", &tcf_experience());
    let decision = write_json(&root, "decision.json", &accept_tcf_decision());

    let encoded = stdout_json(&run(&[
        "tc",
        "encode",
        "--experience",
        &experience,
        "--decision",
        &decision,
        "--timestamp-ms",
        NOW_MS,
    ]));
    let tc_string = encoded["tc_string"].as_str().expect("tc string").to_string();
    assert!(tc_string.starts_with('C'));

    let decoded = stdout_json(&run(&["tc", "decode", &tc_string]));
    assert_eq!(decoded["created_at"], "2024-01-01T00:00:00Z");
    assert_eq!(decoded["last_updated_at"], "2024-01-01T00:00:00Z");
    assert_eq!(decoded["model"]["cmp_id"], 407);
    assert_eq!(decoded["model"]["vendor_list_version"], 48);
    assert_eq!(decoded["model"]["purpose_consents"], json!([4, 7]));
    assert_eq!(decoded["model"]["purpose_legitimate_interests"], json!([2]));
    assert_eq!(decoded["model"]["vendor_consents"], json!([2]));
    assert_eq!(decoded["model"]["disclosed_vendors"], Value::Null);
    cleanup(&root);
}

#[test]
fn tc_encode_honors_config_and_disclosed_vendors() {
    let root = temp_root("tc-config");
    let experience = write_json(&root, "experience.json", &tcf_experience());
    let decision = write_json(&root, "decision.json", &accept_tcf_decision());
    let config = write_text(&root, "fides-consent.toml", "[cmp]\ncmp_id = 12\n");

    let encoded = stdout_json(&run(&[
        "tc",
        "encode",
        "--experience",
        &experience,
        "--decision",
        &decision,
        "--config",
        &config,
        "--timestamp-ms",
        NOW_MS,
        "--disclosed-vendors",
    ]));
    let tc_string = encoded["tc_string"].as_str().expect("tc string").to_string();
    let decoded = stdout_json(&run(&["tc", "decode", &tc_string]));
    assert_eq!(decoded["model"]["cmp_id"], 12);
    assert_eq!(decoded["model"]["disclosed_vendors"], json!([2, 8]));
    cleanup(&root);
}

#[test]
fn tc_decode_rejects_malformed_strings() {
    let stderr = stderr_text(&run(&["tc", "decode", "invalid-string"]));
    assert!(stderr.contains("Failed to decode TC string"));
}

#[test]
fn tc_encode_rejects_non_tcf_experiences() {
    let root = temp_root("tc-not-tcf");
    let experience = write_json(&root, "experience.json", &us_experience());
    let decision = write_json(&root, "decision.json", &json!({}));
    let stderr = stderr_text(&run(&[
        "tc",
        "encode",
        "--experience",
        &experience,
        "--decision",
        &decision,
    ]));
    assert!(stderr.contains("Failed to encode TC string"));
    cleanup(&root);
}

#[test]
fn tc_encode_rejects_unknown_slots() {
    let root = temp_root("tc-unknown");
    let experience = write_json(&root, "experience.json", &tcf_experience());
    let decision = write_json(&root, "decision.json", &json!({ "purpose_consent": { "3": true } }));
    let stderr = stderr_text(&run(&[
        "tc",
        "encode",
        "--experience",
        &experience,
        "--decision",
        &decision,
    ]));
    assert!(stderr.contains("purpose_consent:3"));
    cleanup(&root);
}

#[test]
fn missing_input_files_are_reported() {
    let root = temp_root("tc-missing");
    let missing = root.join("missing.json").to_string_lossy().into_owned();
    let stderr = stderr_text(&run(&[
        "tc",
        "encode",
        "--experience",
        &missing,
        "--decision",
        &missing,
    ]));
    assert!(stderr.contains("Failed to read experience"));
    cleanup(&root);
}

// ============================================================================
// SECTION: GPP Strings
// ============================================================================

#[test]
fn gpp_compose_uses_state_sections_and_gpc() {
    let root = temp_root("gpp-compose");
    let experience = write_json(&root, "experience.json", &us_experience());
    let decision = write_json(&root, "decision.json", &json!({}));
    let config = write_text(&root, "fides-consent.toml", "[gpp]\nus_approach = \"state\"\n");

    let composed = stdout_json(&run(&[
        "gpp",
        "compose",
        "--experience",
        &experience,
        "--decision",
        &decision,
        "--config",
        &config,
    ]));
    assert_eq!(composed["section_ids"], json!(["uscav1"]));
    let gpp_string = composed["gpp_string"].as_str().expect("gpp string").to_string();
    assert!(gpp_string.starts_with("DBABBg~"));
    assert!(gpp_string.ends_with(".QA"));

    let with_gpc = stdout_json(&run(&[
        "gpp",
        "compose",
        "--experience",
        &experience,
        "--decision",
        &decision,
        "--config",
        &config,
        "--gpc",
    ]));
    assert!(with_gpc["gpp_string"].as_str().expect("gpp string").ends_with(".YA"));

    let decoded = stdout_json(&run(&["gpp", "decode", &gpp_string]));
    assert_eq!(decoded["section_ids"], json!(["uscav1"]));
    cleanup(&root);
}

#[test]
fn gpp_compose_defaults_to_national_section() {
    let root = temp_root("gpp-national");
    let experience = write_json(&root, "experience.json", &us_experience());
    let decision = write_json(&root, "decision.json", &json!({}));
    let composed = stdout_json(&run(&[
        "gpp",
        "compose",
        "--experience",
        &experience,
        "--decision",
        &decision,
    ]));
    assert_eq!(composed["section_ids"], json!(["usnatv1"]));
    assert!(composed["gpp_string"].is_string());
    cleanup(&root);
}

#[test]
fn gpp_compose_omits_string_without_sections() {
    let root = temp_root("gpp-empty");
    let experience = write_json(&root, "experience.json", &tcf_experience());
    let decision = write_json(&root, "decision.json", &json!({}));
    let composed = stdout_json(&run(&[
        "gpp",
        "compose",
        "--experience",
        &experience,
        "--decision",
        &decision,
    ]));
    assert_eq!(composed["section_ids"], json!([]));
    assert_eq!(composed["gpp_string"], Value::Null);
    cleanup(&root);
}

#[test]
fn gpp_decode_rejects_section_count_mismatch() {
    let stderr = stderr_text(&run(&["gpp", "decode", "DBABBg"]));
    assert!(stderr.contains("Failed to decode GPP string"));
}

// ============================================================================
// SECTION: Resolve
// ============================================================================

#[test]
fn resolve_falls_back_to_experience_defaults() {
    let root = temp_root("resolve-defaults");
    let experience = write_json(&root, "experience.json", &us_experience());
    let resolution = stdout_json(&run(&["resolve", "--experience", &experience]));
    assert_eq!(resolution["source"], "experience_defaults");
    assert_eq!(resolution["decision"]["notice_consent"]["data_sales_and_sharing"], true);
    assert_eq!(resolution["decision"]["notice_consent"]["marketing"], false);
    assert_eq!(resolution["issues"], json!([]));
    cleanup(&root);
}

#[test]
fn resolve_applies_gpc_to_defaults() {
    let root = temp_root("resolve-gpc");
    let experience = write_json(&root, "experience.json", &us_experience());
    let resolution = stdout_json(&run(&["resolve", "--experience", &experience, "--gpc"]));
    assert_eq!(resolution["source"], "experience_defaults");
    assert_eq!(resolution["decision"]["notice_consent"]["data_sales_and_sharing"], false);
    cleanup(&root);
}

#[test]
fn resolve_prefers_cookie_and_opts_out_missing_slots() {
    let root = temp_root("resolve-cookie");
    let experience = write_json(&root, "experience.json", &us_experience());
    let cookie = write_json(
        &root,
        "cookie.json",
        &json!({ "decision": { "notice_consent": { "marketing": true } } }),
    );
    let resolution =
        stdout_json(&run(&["resolve", "--experience", &experience, "--cookie", &cookie]));
    assert_eq!(resolution["source"], "cookie");
    assert_eq!(resolution["decision"]["notice_consent"]["marketing"], true);
    assert_eq!(resolution["decision"]["notice_consent"]["data_sales_and_sharing"], false);
    cleanup(&root);
}

#[test]
fn resolve_prefers_preferences_over_cookie() {
    let root = temp_root("resolve-preferences");
    let experience = write_json(&root, "experience.json", &us_experience());
    let cookie = write_json(
        &root,
        "cookie.json",
        &json!({ "decision": { "notice_consent": { "marketing": true } } }),
    );
    let preferences = write_json(
        &root,
        "preferences.json",
        &json!({ "decision": { "notice_consent": { "marketing": false } } }),
    );
    let resolution = stdout_json(&run(&[
        "resolve",
        "--experience",
        &experience,
        "--cookie",
        &cookie,
        "--preferences",
        &preferences,
    ]));
    assert_eq!(resolution["source"], "preferences");
    assert_eq!(resolution["decision"]["notice_consent"]["marketing"], false);
    cleanup(&root);
}

#[test]
fn resolve_reports_invalid_override_and_continues() {
    let root = temp_root("resolve-override");
    let experience = write_json(&root, "experience.json", &us_experience());
    let resolution = stdout_json(&run(&[
        "resolve",
        "--experience",
        &experience,
        "--override",
        "invalid-string",
    ]));
    assert_eq!(resolution["source"], "experience_defaults");
    assert_eq!(resolution["issues"][0]["kind"], "invalid_override_string");
    assert_eq!(resolution["issues"][0]["raw"], "invalid-string");
    cleanup(&root);
}

#[test]
fn resolve_writes_audit_records_to_configured_file() {
    let root = temp_root("resolve-audit");
    let experience = write_json(&root, "experience.json", &us_experience());
    let audit_path = root.join("audit.jsonl");
    let config = write_text(
        &root,
        "fides-consent.toml",
        &format!("[audit]\nsink = \"file\"\npath = '{}'\n", audit_path.display()),
    );
    let resolution = stdout_json(&run(&[
        "resolve",
        "--experience",
        &experience,
        "--config",
        &config,
        "--timestamp-ms",
        NOW_MS,
    ]));
    assert_eq!(resolution["source"], "experience_defaults");

    let audit = fs::read_to_string(&audit_path).expect("read audit log");
    let record: Value = serde_json::from_str(audit.lines().next().expect("audit line"))
        .expect("audit json");
    assert_eq!(record["event"], "resolution");
    assert_eq!(record["experience_id"], "pri_us_ca");
    assert_eq!(record["source"], "experience_defaults");
    assert_eq!(record["timestamp_ms"], 1_704_067_200_000_i64);
    cleanup(&root);
}

#[test]
fn resolve_rejects_malformed_cookie_json() {
    let root = temp_root("resolve-bad-cookie");
    let experience = write_json(&root, "experience.json", &us_experience());
    let cookie = write_text(&root, "cookie.json", "{ not json");
    let stderr =
        stderr_text(&run(&["resolve", "--experience", &experience, "--cookie", &cookie]));
    assert!(stderr.contains("Failed to parse consent cookie JSON"));
    cleanup(&root);
}
