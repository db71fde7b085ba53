// crates/fides-consent-cli/tests/messages.rs
// ============================================================================
// Module: CLI Message Catalog Tests
// Description: Exercises the message catalog and placeholder substitution.
// Purpose: Ensure CLI user-facing strings route through stable catalog helpers.
// Dependencies: fides-consent-cli messages module and the `t!` macro.
// ============================================================================

//! ## Overview
//! Validates the `fides-consent` CLI message catalog behavior:
//! - Message arguments capture key/value substitutions.
//! - Formatting falls back to keys on misses.
//! - The [`t!`](fides_consent_cli::t) macro formats placeholders correctly.

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

use std::collections::BTreeSet;

use fides_consent_cli::messages::CATALOG;
use fides_consent_cli::messages::MessageArg;
use fides_consent_cli::messages::translate;
use fides_consent_cli::t;

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Confirms message arguments capture key/value pairs.
#[test]
fn message_arg_new_captures_key_and_value() {
    let arg = MessageArg::new("path", "/tmp/experience.json");
    assert_eq!(arg.key, "path");
    assert_eq!(arg.value, "/tmp/experience.json");
}

/// Confirms catalog entries resolve and replace placeholders.
#[test]
fn translate_substitutes_placeholders() {
    let args = vec![MessageArg::new("error", "bad header")];
    assert_eq!(translate("gpp.decode.failed", args), "Failed to decode GPP string: bad header");
}

/// Confirms missing keys fall back to the key string.
#[test]
fn translate_falls_back_to_key() {
    assert_eq!(translate("missing.key", Vec::new()), "missing.key");
}

/// Confirms the t! macro formats named arguments.
#[test]
fn t_macro_formats_message() {
    assert_eq!(t!("main.version", version = "0.1.0"), "fides-consent 0.1.0");
    assert_eq!(
        t!("input.string_too_large", kind = "TC string", limit = 16),
        "TC string exceeds the 16 byte limit"
    );
}

/// Confirms catalog keys are unique.
#[test]
fn catalog_keys_are_unique() {
    let keys: BTreeSet<&str> = CATALOG.iter().map(|(key, _)| *key).collect();
    assert_eq!(keys.len(), CATALOG.len());
}
