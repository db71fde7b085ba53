// crates/fides-consent-cli/src/messages.rs
// ============================================================================
// Module: CLI Message Catalog
// Description: Provides the message catalog and formatting utilities for the CLI.
// Purpose: Centralize user-facing strings so messages stay consistent.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! The `fides-consent` CLI keeps user-facing strings in a small catalog keyed
//! by stable message ids. All runtime output should be routed through the
//! [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to the key itself.
//! - Placeholder substitutions preserve deterministic order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// Placeholder name without braces (for example `path`).
    pub key: &'static str,
    /// Preformatted substitution value.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Message catalog entries.
pub const CATALOG: &[(&str, &str)] = &[
    ("main.version", "fides-consent {version}"),
    ("input.kind.experience", "experience"),
    ("input.kind.decision", "decision"),
    ("input.kind.cookie", "consent cookie"),
    ("input.kind.preferences", "saved preferences"),
    ("input.kind.tc_string", "TC string"),
    ("input.kind.gpp_string", "GPP string"),
    ("input.kind.override", "override string"),
    ("input.read_failed", "Failed to read {kind} at {path}: {error}"),
    (
        "input.read_too_large",
        "Refusing to read {kind} at {path}: {size} bytes exceeds the {limit} byte limit",
    ),
    ("input.parse_failed", "Failed to parse {kind} JSON at {path}: {error}"),
    ("input.string_too_large", "{kind} exceeds the {limit} byte limit"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config valid."),
    ("config.audit_failed", "Failed to open audit sink: {error}"),
    ("tc.decode.failed", "Failed to decode TC string: {error}"),
    ("tc.encode.failed", "Failed to encode TC string: {error}"),
    ("gpp.decode.failed", "Failed to decode GPP string: {error}"),
    ("gpp.compose.failed", "Failed to compose GPP string: {error}"),
    ("decision.unknown_fields", "Decision references slots absent from the experience: {fields}"),
    ("resolve.failed", "No decision could be resolved."),
    ("time.clock_failed", "System clock is out of range."),
    ("time.format_failed", "Failed to format timestamp {value}: {error}"),
    ("output.json_failed", "Failed to serialize output: {error}"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "unknown stream"),
];

/// Returns the message catalog as a lookup map.
fn catalog() -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    CATALOG_MAP.get_or_init(|| CATALOG.iter().copied().collect())
}

// ============================================================================
// SECTION: Formatting
// ============================================================================

/// Formats the message for `key` while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).copied().unwrap_or(key);
    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a catalog message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::messages::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::messages::translate($key, args)
    }};
}
