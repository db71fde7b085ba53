// crates/fides-consent-core/src/cmp/registry.rs
// ============================================================================
// Module: CMP Registry
// Description: `__tcfapi` and `__gpp` command handling and event dispatch.
// Purpose: Own the CMP state machine and every registered listener.
// Dependencies: crate::{cmp, codec, core}
// ============================================================================

//! ## Overview
//! The registry stands in for the page-global `__tcfapi` and `__gpp`
//! functions. The engine owns one instance and drives its transitions; page
//! scripts reach it through [`CmpRegistry::handle_gpp`] and
//! [`CmpRegistry::handle_tcfapi`].
//!
//! Event order is part of the contract:
//! - registration: `listenerRegistered` to the new listener only,
//! - UI shown: `signalStatus=not ready`, then `cmpDisplayStatus=visible`,
//! - decision: `cmpDisplayStatus=hidden`, one `sectionChange` per changed
//!   section in ascending id order, then `signalStatus=ready`.
//!
//! Every listener sees every event, in registration order, and each event
//! carries a snapshot taken once before dispatch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::cmp::events::GppEvent;
use crate::cmp::events::GppEventData;
use crate::cmp::events::GppEventName;
use crate::cmp::events::GppListener;
use crate::cmp::events::TcfListener;
use crate::cmp::state::CmpState;
use crate::cmp::state::CmpStatus;
use crate::cmp::state::DisplayStatus;
use crate::cmp::state::GppData;
use crate::cmp::state::PingData;
use crate::cmp::state::SignalStatus;
use crate::cmp::state::TCF_API_VERSION;
use crate::cmp::state::TcData;
use crate::cmp::state::TcfEventStatus;
use crate::cmp::state::TcfPingData;
use crate::codec::tcf::TcModel;
use crate::core::decision::ConsentMethod;
use crate::core::experience::GvlMetadata;
use crate::core::identifiers::ListenerId;
use crate::core::sections::GppSectionId;

// ============================================================================
// SECTION: Commands
// ============================================================================

/// `__gpp` command.
pub enum GppCommand {
    /// Returns ping data.
    Ping,
    /// Registers a listener.
    AddEventListener(Box<dyn GppListener>),
    /// Removes a listener.
    RemoveEventListener(ListenerId),
    /// Returns the current GPP data.
    GetGppData,
}

/// `__gpp` command response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GppResponse {
    /// Ping data.
    Ping(PingData),
    /// Registered listener id.
    Registered(ListenerId),
    /// Whether a listener was removed.
    Removed(bool),
    /// Current GPP data.
    GppData(GppData),
}

/// `__tcfapi` command.
pub enum TcfCommand {
    /// Returns ping data.
    Ping,
    /// Registers a listener.
    AddEventListener(Box<dyn TcfListener>),
    /// Removes a listener.
    RemoveEventListener(ListenerId),
    /// Returns TC data, optionally for specific vendors.
    GetTcData(Option<Vec<u32>>),
}

/// `__tcfapi` command response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TcfResponse {
    /// Ping data.
    Ping(TcfPingData),
    /// Registered listener id.
    Registered(ListenerId),
    /// Whether a listener was removed.
    Removed(bool),
    /// TC data; `None` before a TC string exists.
    TcData(Option<TcData>),
}

/// Strings published after a decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsentSignals {
    /// Decoded TC model, when a TC string exists.
    pub tc_model: Option<TcModel>,
    /// TC string; empty when TCF is inactive.
    pub tc_string: String,
    /// GPP string; empty when GPP is inactive.
    pub gpp_string: String,
    /// Encoded payload of each GPP section.
    pub section_strings: BTreeMap<GppSectionId, String>,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Page-session CMP registry.
///
/// # Invariants
/// - `cmp_status` only moves from `Loading` to `Loaded`.
/// - Listener ids are unique for the session.
pub struct CmpRegistry {
    /// CMP id.
    cmp_id: u16,
    /// CMP version.
    cmp_version: u16,
    /// Current state.
    state: CmpState,
    /// GVL metadata of the loaded TCF experience.
    gvl: Option<GvlMetadata>,
    /// Decoded TC model of the current TC string.
    tc_model: Option<TcModel>,
    /// GPP listeners in registration order.
    gpp_listeners: Vec<(ListenerId, Box<dyn GppListener>)>,
    /// TCF listeners in registration order.
    tcf_listeners: Vec<(ListenerId, Box<dyn TcfListener>)>,
    /// Next listener id.
    next_listener_id: u32,
}

impl CmpRegistry {
    /// Creates a registry in `Loading`/`NotReady`/`Hidden`.
    #[must_use]
    pub fn new(cmp_id: u16, cmp_version: u16) -> Self {
        Self {
            cmp_id,
            cmp_version,
            state: CmpState::default(),
            gvl: None,
            tc_model: None,
            gpp_listeners: Vec::new(),
            tcf_listeners: Vec::new(),
            next_listener_id: 0,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> &CmpState {
        &self.state
    }

    /// Returns the `__gpp` ping snapshot.
    #[must_use]
    pub fn ping_data(&self) -> PingData {
        self.state.ping_data(self.cmp_id, self.cmp_version)
    }

    // ------------------------------------------------------------------------
    // Page-facing API
    // ------------------------------------------------------------------------

    /// Handles a `__gpp` command and returns the callback arguments.
    pub fn handle_gpp(&mut self, command: GppCommand) -> (GppResponse, bool) {
        match command {
            GppCommand::Ping => (GppResponse::Ping(self.ping_data()), true),
            GppCommand::AddEventListener(listener) => {
                (GppResponse::Registered(self.add_gpp_listener(listener)), true)
            }
            GppCommand::RemoveEventListener(id) => {
                let before = self.gpp_listeners.len();
                self.gpp_listeners.retain(|(listener_id, _)| *listener_id != id);
                let removed = self.gpp_listeners.len() != before;
                (GppResponse::Removed(removed), removed)
            }
            GppCommand::GetGppData => {
                let ping_data = self.ping_data();
                (
                    GppResponse::GppData(GppData {
                        gpp_string: ping_data.gpp_string.clone(),
                        applicable_sections: ping_data.applicable_sections.clone(),
                        section_list: ping_data.section_list.clone(),
                        ping_data,
                    }),
                    true,
                )
            }
        }
    }

    /// Handles a `__tcfapi` command and returns the callback arguments.
    pub fn handle_tcfapi(&mut self, command: TcfCommand) -> (TcfResponse, bool) {
        match command {
            TcfCommand::Ping => (TcfResponse::Ping(self.tcf_ping()), true),
            TcfCommand::AddEventListener(listener) => {
                (TcfResponse::Registered(self.add_tcf_listener(listener)), true)
            }
            TcfCommand::RemoveEventListener(id) => {
                let before = self.tcf_listeners.len();
                self.tcf_listeners.retain(|(listener_id, _)| *listener_id != id);
                let removed = self.tcf_listeners.len() != before;
                (TcfResponse::Removed(removed), removed)
            }
            TcfCommand::GetTcData(vendor_ids) => {
                if self.tc_model.is_none() {
                    return (TcfResponse::TcData(None), false);
                }
                let data = self.tc_data(None, None, vendor_ids.as_deref());
                (TcfResponse::TcData(Some(data)), true)
            }
        }
    }

    /// Registers a GPP listener and sends it `listenerRegistered`.
    fn add_gpp_listener(&mut self, mut listener: Box<dyn GppListener>) -> ListenerId {
        let id = self.allocate_listener_id();
        let event = GppEvent {
            event_name: GppEventName::ListenerRegistered,
            listener_id: id,
            data: GppEventData::Registered(true),
            ping_data: self.ping_data(),
        };
        listener.on_event(&event, true);
        self.gpp_listeners.push((id, listener));
        id
    }

    /// Registers a TCF listener, sending `tcloaded` when consent already exists.
    fn add_tcf_listener(&mut self, mut listener: Box<dyn TcfListener>) -> ListenerId {
        let id = self.allocate_listener_id();
        if self.tc_model.is_some() && self.state.signal_status == SignalStatus::Ready {
            let data = self.tc_data(Some(TcfEventStatus::TcLoaded), Some(id), None);
            listener.on_tc_data(&data, true);
        }
        self.tcf_listeners.push((id, listener));
        id
    }

    /// Returns a fresh listener id.
    fn allocate_listener_id(&mut self) -> ListenerId {
        let id = ListenerId::new(self.next_listener_id);
        self.next_listener_id = self.next_listener_id.saturating_add(1);
        id
    }

    /// Builds the `__tcfapi` ping snapshot.
    fn tcf_ping(&self) -> TcfPingData {
        let loaded = self.state.cmp_status == CmpStatus::Loaded;
        TcfPingData {
            gdpr_applies: loaded.then_some(self.gvl.is_some()),
            cmp_loaded: loaded,
            cmp_status: self.state.cmp_status,
            display_status: self.state.display_status,
            api_version: TCF_API_VERSION.to_string(),
            cmp_version: self.cmp_version,
            cmp_id: self.cmp_id,
            gvl_version: self.gvl.map(|gvl| gvl.vendor_list_version),
            tcf_policy_version: self.gvl.map(|gvl| gvl.tcf_policy_version),
        }
    }

    /// Builds TC data for a listener or `getTCData`.
    fn tc_data(
        &self,
        event_status: Option<TcfEventStatus>,
        listener_id: Option<ListenerId>,
        vendor_ids: Option<&[u32]>,
    ) -> TcData {
        let mut data = TcData::new(
            self.tc_model.as_ref(),
            &self.state.tc_string,
            self.cmp_id,
            self.cmp_version,
            self.gvl,
            vendor_ids,
        );
        data.cmp_status = self.state.cmp_status;
        data.event_status = event_status;
        data.listener_id = listener_id;
        data
    }

    // ------------------------------------------------------------------------
    // Engine-facing transitions
    // ------------------------------------------------------------------------

    /// Moves `Loading` to `Loaded` for an experience.
    pub fn mark_loaded(&mut self, applicable: BTreeSet<GppSectionId>, gvl: Option<GvlMetadata>) {
        self.state.applied_sections = applicable;
        self.gvl = gvl;
        if self.state.cmp_status == CmpStatus::Loaded {
            return;
        }
        self.state.cmp_status = CmpStatus::Loaded;
        self.emit_gpp(GppEventName::CmpStatus, &GppEventData::CmpStatus(CmpStatus::Loaded));
    }

    /// Publishes previously saved consent and signals ready.
    pub fn restore_consent(&mut self, signals: ConsentSignals) {
        self.publish(signals);
        self.set_signal_status(SignalStatus::Ready);
        self.emit_tcf(TcfEventStatus::TcLoaded);
    }

    /// Records that the consent UI was shown.
    pub fn ui_shown(&mut self) {
        self.set_signal_status(SignalStatus::NotReady);
        self.set_display_status(DisplayStatus::Visible);
        self.emit_tcf(TcfEventStatus::CmpUiShown);
    }

    /// Records that the consent UI closed without a decision.
    pub fn ui_closed(&mut self) {
        self.set_display_status(DisplayStatus::Hidden);
        if self.state.consent_established {
            self.set_signal_status(SignalStatus::Ready);
        }
    }

    /// Publishes the strings of a new decision.
    ///
    /// Returns the sections whose payload changed.
    pub fn decision_applied(
        &mut self,
        method: ConsentMethod,
        signals: ConsentSignals,
    ) -> Vec<GppSectionId> {
        if method.is_user_action() || self.state.display_status == DisplayStatus::Visible {
            self.set_display_status(DisplayStatus::Hidden);
        }
        let changed: Vec<GppSectionId> = signals
            .section_strings
            .iter()
            .filter(|(section, payload)| self.state.section_strings.get(*section) != Some(*payload))
            .map(|(section, _)| *section)
            .collect();
        self.publish(signals);
        for section in &changed {
            self.emit_gpp(GppEventName::SectionChange, &GppEventData::Section(*section));
        }
        self.set_signal_status(SignalStatus::Ready);
        let status = if method.is_user_action() {
            TcfEventStatus::UserActionComplete
        } else {
            TcfEventStatus::TcLoaded
        };
        self.emit_tcf(status);
        changed
    }

    /// Stores published strings without emitting events.
    fn publish(&mut self, signals: ConsentSignals) {
        self.tc_model = signals.tc_model;
        self.state.tc_string = signals.tc_string;
        self.state.gpp_string = signals.gpp_string;
        self.state.section_strings = signals.section_strings;
        self.state.consent_established = true;
    }

    /// Sets the signal status and emits `signalStatus`.
    fn set_signal_status(&mut self, status: SignalStatus) {
        self.state.signal_status = status;
        self.emit_gpp(GppEventName::SignalStatus, &GppEventData::SignalStatus(status));
    }

    /// Sets the display status and emits `cmpDisplayStatus`.
    fn set_display_status(&mut self, status: DisplayStatus) {
        self.state.display_status = status;
        self.emit_gpp(GppEventName::CmpDisplayStatus, &GppEventData::DisplayStatus(status));
    }

    /// Sends one GPP event to every listener.
    fn emit_gpp(&mut self, name: GppEventName, data: &GppEventData) {
        let ping_data = self.ping_data();
        for (id, listener) in &mut self.gpp_listeners {
            let event = GppEvent {
                event_name: name,
                listener_id: *id,
                data: data.clone(),
                ping_data: ping_data.clone(),
            };
            listener.on_event(&event, true);
        }
    }

    /// Sends TC data to every TCF listener while a TCF experience is loaded.
    fn emit_tcf(&mut self, status: TcfEventStatus) {
        if self.gvl.is_none() {
            return;
        }
        let snapshots: Vec<TcData> = self
            .tcf_listeners
            .iter()
            .map(|(id, _)| self.tc_data(Some(status), Some(*id), None))
            .collect();
        for ((_, listener), data) in self.tcf_listeners.iter_mut().zip(snapshots) {
            listener.on_tc_data(&data, true);
        }
    }
}
