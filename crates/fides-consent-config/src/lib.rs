// crates/fides-consent-config/src/lib.rs
// ============================================================================
// Module: Fides Consent Config Library
// Description: Canonical config model and validation for the consent engine.
// Purpose: Single source of truth for fides-consent.toml semantics.
// Dependencies: fides-consent-core, serde, toml
// ============================================================================

//! ## Overview
//! `fides-consent-config` defines the TOML configuration read by host
//! tooling. Loading is strict and fail-closed; a validated config converts
//! into the core [`fides_consent_core::EngineConfig`] and an audit sink.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
