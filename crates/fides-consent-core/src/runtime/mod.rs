// crates/fides-consent-core/src/runtime/mod.rs
// ============================================================================
// Module: Fides Consent Runtime
// Description: Consent engine, consent store, and audit sinks.
// Purpose: Run the consent lifecycle of one page session.
// Dependencies: crate::{cmp, codec, core, hierarchy, interfaces, resolver}
// ============================================================================

//! ## Overview
//! Runtime modules own the mutable side of the engine: the single decision,
//! persistence through the store port, and audit output. Resolution and
//! encoding logic stay in their pure modules.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod engine;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::ConsentAuditEvent;
pub use audit::ConsentAuditRecord;
pub use audit::ConsentAuditSink;
pub use audit::JsonlAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use engine::AppliedDecision;
pub use engine::DEFAULT_COOKIE_MAX_AGE_DAYS;
pub use engine::ConsentEngine;
pub use engine::EngineConfig;
pub use engine::EngineError;
pub use engine::LoadOutcome;
pub use engine::LoadTicket;
pub use store::COOKIE_KEY;
pub use store::InMemoryConsentStore;
pub use store::load_cookie;
pub use store::save_cookie;
