// crates/fides-consent-core/src/lib.rs
// ============================================================================
// Module: Fides Consent Core Library
// Description: Public API surface for the Fides consent engine.
// Purpose: Expose the experience model, codecs, resolver, CMP, and runtime.
// Dependencies: crate::{cmp, codec, core, hierarchy, interfaces, resolver, runtime}
// ============================================================================

//! ## Overview
//! Fides consent core decides which consent values are authoritative for a
//! page view, encodes them as IAB TCF v2.2 TC strings and GPP strings, and
//! signals them to third-party scripts through the `__tcfapi` and `__gpp`
//! surfaces. Storage, preferences, and page events are reached through
//! explicit ports.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cmp;
pub mod codec;
pub mod core;
pub mod hierarchy;
pub mod interfaces;
pub mod resolver;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use cmp::CmpRegistry;
pub use codec::DecodeError;
pub use codec::EncodeError;
pub use codec::fides_string::FidesString;
pub use codec::gpp::GppSettings;
pub use codec::gpp::GppString;
pub use codec::gpp::UsApproach;
pub use codec::tcf::TcEncodeOptions;
pub use codec::tcf::TcModel;
pub use hierarchy::HierarchyError;
pub use interfaces::ConsentStore;
pub use interfaces::PageEventListener;
pub use interfaces::PreferencesError;
pub use interfaces::PreferencesProvider;
pub use interfaces::StoreError;
pub use resolver::ConsentCookie;
pub use resolver::ConsentSource;
pub use resolver::ConsentSources;
pub use resolver::Resolution;
pub use resolver::ResolveIssue;
pub use resolver::SavedPreferences;
pub use resolver::resolve;
pub use runtime::ConsentEngine;
pub use runtime::EngineConfig;
pub use runtime::EngineError;
pub use runtime::InMemoryConsentStore;
