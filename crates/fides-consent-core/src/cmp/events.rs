// crates/fides-consent-core/src/cmp/events.rs
// ============================================================================
// Module: CMP Events
// Description: GPP listener events, TCF listeners, and Fides page events.
// Purpose: Define the event payloads third-party scripts and the page observe.
// Dependencies: serde, crate::{cmp::state, core}
// ============================================================================

//! ## Overview
//! GPP listeners receive [`GppEvent`]s with an owned [`PingData`] snapshot.
//! TCF listeners receive [`TcData`] with an event status. The page event
//! bus receives [`PageEvent`]s named after the `Fides*` DOM events.
//!
//! Listeners are plain callbacks; any `FnMut` with the right signature
//! implements the listener traits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::cmp::state::CmpStatus;
use crate::cmp::state::DisplayStatus;
use crate::cmp::state::PingData;
use crate::cmp::state::SignalStatus;
use crate::cmp::state::TcData;
use crate::core::decision::ConsentMethod;
use crate::core::experience::ComponentType;
use crate::core::identifiers::ListenerId;
use crate::core::sections::GppSectionId;

// ============================================================================
// SECTION: GPP Events
// ============================================================================

/// GPP event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GppEventName {
    /// A listener was registered.
    ListenerRegistered,
    /// Signal status changed.
    SignalStatus,
    /// Display status changed.
    CmpDisplayStatus,
    /// A section's encoded payload changed.
    SectionChange,
    /// Load status changed.
    CmpStatus,
}

/// GPP event data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GppEventData {
    /// Registration acknowledgement.
    Registered(bool),
    /// New signal status.
    SignalStatus(SignalStatus),
    /// New display status.
    DisplayStatus(DisplayStatus),
    /// New load status.
    CmpStatus(CmpStatus),
    /// Changed section.
    Section(GppSectionId),
}

/// Event delivered to GPP listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GppEvent {
    /// Event name.
    pub event_name: GppEventName,
    /// Receiving listener.
    pub listener_id: ListenerId,
    /// Event data.
    pub data: GppEventData,
    /// CMP snapshot taken when the event was emitted.
    pub ping_data: PingData,
}

/// Callback registered through `__gpp('addEventListener')`.
pub trait GppListener {
    /// Receives one event.
    fn on_event(&mut self, event: &GppEvent, success: bool);
}

impl<F> GppListener for F
where
    F: FnMut(&GppEvent, bool),
{
    fn on_event(&mut self, event: &GppEvent, success: bool) {
        self(event, success);
    }
}

// ============================================================================
// SECTION: TCF Listeners
// ============================================================================

/// Callback registered through `__tcfapi('addEventListener')`.
pub trait TcfListener {
    /// Receives TC data with an event status.
    fn on_tc_data(&mut self, data: &TcData, success: bool);
}

impl<F> TcfListener for F
where
    F: FnMut(&TcData, bool),
{
    fn on_tc_data(&mut self, data: &TcData, success: bool) {
        self(data, success);
    }
}

// ============================================================================
// SECTION: Page Events
// ============================================================================

/// Fides page event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FidesEventType {
    /// Initialization started.
    #[serde(rename = "FidesInitializing")]
    Initializing,
    /// Initialization finished.
    #[serde(rename = "FidesInitialized")]
    Initialized,
    /// Consent UI shown.
    #[serde(rename = "FidesUIShown")]
    UiShown,
    /// A toggle changed in the consent UI.
    #[serde(rename = "FidesUIChanged")]
    UiChanged,
    /// A decision is about to be applied.
    #[serde(rename = "FidesUpdating")]
    Updating,
    /// A decision was applied.
    #[serde(rename = "FidesUpdated")]
    Updated,
    /// The modal closed.
    #[serde(rename = "FidesModalClosed")]
    ModalClosed,
}

impl FidesEventType {
    /// Returns the DOM event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "FidesInitializing",
            Self::Initialized => "FidesInitialized",
            Self::UiShown => "FidesUIShown",
            Self::UiChanged => "FidesUIChanged",
            Self::Updating => "FidesUpdating",
            Self::Updated => "FidesUpdated",
            Self::ModalClosed => "FidesModalClosed",
        }
    }
}

/// Extra details carried by page events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FidesEventDetail {
    /// How the decision was reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent_method: Option<ConsentMethod>,
    /// Component serving the experience.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serving_component: Option<ComponentType>,
}

/// Event dispatched on the page event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEvent {
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: FidesEventType,
    /// Extra details.
    pub extra_details: FidesEventDetail,
    /// Current fides string, when one exists.
    pub fides_string: Option<String>,
}
