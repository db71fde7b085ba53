// crates/fides-consent-core/src/cmp/mod.rs
// ============================================================================
// Module: CMP Signaling
// Description: CMP state machine, IAB API registry, and event payloads.
// Purpose: Expose consent status to third-party scripts on the page.
// Dependencies: serde, crate::{codec, core}
// ============================================================================

//! ## Overview
//! The CMP layer publishes consent to other scripts through the IAB
//! `__tcfapi` and `__gpp` surfaces and emits the ordered status events
//! those scripts listen for.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod events;
pub mod registry;
pub mod state;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use events::FidesEventDetail;
pub use events::FidesEventType;
pub use events::GppEvent;
pub use events::GppEventData;
pub use events::GppEventName;
pub use events::GppListener;
pub use events::PageEvent;
pub use events::TcfListener;
pub use registry::CmpRegistry;
pub use registry::ConsentSignals;
pub use registry::GppCommand;
pub use registry::GppResponse;
pub use registry::TcfCommand;
pub use registry::TcfResponse;
pub use state::CmpState;
pub use state::CmpStatus;
pub use state::DisplayStatus;
pub use state::GppData;
pub use state::PingData;
pub use state::SignalStatus;
pub use state::TcData;
pub use state::TcfEventStatus;
pub use state::TcfPingData;
