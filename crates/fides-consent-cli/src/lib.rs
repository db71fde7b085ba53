// crates/fides-consent-cli/src/lib.rs
// ============================================================================
// Module: Fides Consent CLI Library
// Description: Shared helpers for the `fides-consent` binary.
// Purpose: Expose the message catalog to the binary and its tests.
// Dependencies: crate::messages
// ============================================================================

//! ## Overview
//! Library half of the `fides-consent` CLI. User-facing strings live in the
//! [`messages`] catalog and are rendered through the [`t!`] macro.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod messages;
