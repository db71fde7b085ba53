// crates/fides-consent-core/src/runtime/engine.rs
// ============================================================================
// Module: Consent Engine
// Description: Orchestrates resolution, encoding, persistence, and signaling.
// Purpose: Own the single consent decision and CMP state of a page session.
// Dependencies: serde, thiserror, crate::{cmp, codec, core, hierarchy, interfaces, resolver}
// ============================================================================

//! ## Overview
//! [`ConsentEngine`] is the only writer of the session's decision. It
//! loads experiences behind a generation counter, resolves the initial
//! decision, drives the CMP state machine through UI and decision
//! transitions, and persists every applied decision as a consent cookie.
//!
//! Each applied decision runs the same pipeline: validate against the
//! experience, merge and normalize, encode TC and GPP, write the cookie,
//! publish through the registry, then emit page events. Encode failures
//! abort the decision; store and audit failures do not.
//!
//! Security posture: override strings, cookies, and preferences are
//! untrusted inputs and are validated by the resolver and codecs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::cmp::events::FidesEventDetail;
use crate::cmp::events::FidesEventType;
use crate::cmp::events::PageEvent;
use crate::cmp::registry::CmpRegistry;
use crate::cmp::registry::ConsentSignals;
use crate::codec::EncodeError;
use crate::codec::fides_string::FidesString;
use crate::codec::gpp::GppSettings;
use crate::codec::gpp::applicable_sections;
use crate::codec::gpp::sections_for_decision;
use crate::codec::tcf::TcEncodeOptions;
use crate::codec::tcf::TcModel;
use crate::core::decision::ConsentDecision;
use crate::core::decision::ConsentMethod;
use crate::core::decision::Fallback;
use crate::core::decision::FieldRef;
use crate::core::experience::ComponentType;
use crate::core::experience::Experience;
use crate::core::hashing::experience_version_hash;
use crate::core::identifiers::NoticeKey;
use crate::core::sections::GppSectionId;
use crate::core::time::Timestamp;
use crate::hierarchy::HierarchyError;
use crate::hierarchy::collapse_on_change;
use crate::interfaces::ConsentStore;
use crate::interfaces::PageEventListener;
use crate::interfaces::PreferencesProvider;
use crate::resolver::ConsentCookie;
use crate::resolver::ConsentSource;
use crate::resolver::ConsentSources;
use crate::resolver::Resolution;
use crate::resolver::ResolveIssue;
use crate::resolver::SavedPreferences;
use crate::resolver::resolve;
use crate::runtime::audit::ConsentAuditEvent;
use crate::runtime::audit::ConsentAuditRecord;
use crate::runtime::audit::ConsentAuditSink;
use crate::runtime::store::load_cookie;
use crate::runtime::store::save_cookie;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default lifetime of consent cookies in days.
pub const DEFAULT_COOKIE_MAX_AGE_DAYS: u32 = 365;

/// Milliseconds in one day.
const MILLIS_PER_DAY: i64 = 86_400_000;

/// Engine configuration supplied by the host page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// CMP metadata written into TC strings.
    pub tcf: TcEncodeOptions,
    /// Whether the TCF API is active for TCF experiences.
    pub tcf_enabled: bool,
    /// GPP composition settings.
    pub gpp: GppSettings,
    /// Tier-1 override fides string.
    pub override_string: Option<String>,
    /// Whether the browser signals Global Privacy Control.
    pub gpc_enabled: bool,
    /// Lifetime of written consent cookies in days; `None` writes cookies
    /// without an expiry and leaves it to the host.
    pub cookie_max_age_days: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tcf: TcEncodeOptions::default(),
            tcf_enabled: true,
            gpp: GppSettings::default(),
            override_string: None,
            gpc_enabled: false,
            cookie_max_age_days: Some(DEFAULT_COOKIE_MAX_AGE_DAYS),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Engine errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// No experience is loaded.
    #[error("no experience loaded")]
    MissingExperience,
    /// A decision references a slot the experience does not declare.
    #[error("decision references unknown field: {0}")]
    UnknownField(FieldRef),
    /// The decision could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// A notice toggle failed.
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Handle for one experience load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    /// Generation the load was started in.
    generation: u64,
}

impl LoadTicket {
    /// Returns the load generation.
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.generation
    }
}

/// Result of completing an experience load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The load was current and its resolution was applied.
    Applied(Resolution),
    /// A newer load started first; nothing changed.
    Stale,
}

/// Result of applying a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedDecision {
    /// Cookie written for the decision.
    pub cookie: ConsentCookie,
    /// Published TC string; empty when TCF is inactive.
    pub tc_string: String,
    /// Published GPP string; empty when GPP is inactive.
    pub gpp_string: String,
    /// GPP sections whose payload changed.
    pub changed_sections: Vec<GppSectionId>,
}

/// Encoded strings for one decision.
struct EncodedConsent {
    /// Signals handed to the registry.
    signals: ConsentSignals,
    /// Combined fides string.
    fides_string: String,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Consent engine for one page session.
///
/// # Invariants
/// - At most one experience and one decision are current.
/// - Loads finishing with an older generation never change state.
pub struct ConsentEngine<S: ConsentStore> {
    /// Host configuration.
    config: EngineConfig,
    /// Consent persistence port.
    store: S,
    /// Audit sink.
    audit: Arc<dyn ConsentAuditSink>,
    /// Tier-2 preferences port.
    preferences: Option<Box<dyn PreferencesProvider>>,
    /// IAB API registry.
    registry: CmpRegistry,
    /// Page event listeners.
    page_listeners: Vec<Box<dyn PageEventListener>>,
    /// Current load generation.
    generation: u64,
    /// Loaded experience.
    experience: Option<Experience>,
    /// Current decision.
    decision: Option<ConsentDecision>,
    /// Tier the current decision came from.
    source: Option<ConsentSource>,
    /// Unsaved toggles while the UI is open.
    draft: Option<ConsentDecision>,
    /// Current fides string.
    fides_string: Option<String>,
    /// Whether the consent UI is on screen.
    ui_visible: bool,
}

impl<S: ConsentStore> ConsentEngine<S> {
    /// Creates an engine with no experience loaded.
    #[must_use]
    pub fn new(config: EngineConfig, store: S, audit: Arc<dyn ConsentAuditSink>) -> Self {
        let registry = CmpRegistry::new(config.tcf.cmp_id, config.tcf.cmp_version);
        Self {
            config,
            store,
            audit,
            preferences: None,
            registry,
            page_listeners: Vec::new(),
            generation: 0,
            experience: None,
            decision: None,
            source: None,
            draft: None,
            fides_string: None,
            ui_visible: false,
        }
    }

    /// Attaches a tier-2 preferences provider.
    #[must_use]
    pub fn with_preferences_provider(mut self, provider: Box<dyn PreferencesProvider>) -> Self {
        self.preferences = Some(provider);
        self
    }

    /// Registers a page event listener.
    pub fn add_page_listener(&mut self, listener: Box<dyn PageEventListener>) {
        self.page_listeners.push(listener);
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Returns the IAB API registry.
    #[must_use]
    pub const fn registry(&self) -> &CmpRegistry {
        &self.registry
    }

    /// Returns the IAB API registry for page commands.
    pub const fn registry_mut(&mut self) -> &mut CmpRegistry {
        &mut self.registry
    }

    /// Returns the consent store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the loaded experience.
    #[must_use]
    pub const fn experience(&self) -> Option<&Experience> {
        self.experience.as_ref()
    }

    /// Returns the current decision.
    #[must_use]
    pub const fn decision(&self) -> Option<&ConsentDecision> {
        self.decision.as_ref()
    }

    /// Returns the unsaved UI draft.
    #[must_use]
    pub const fn draft(&self) -> Option<&ConsentDecision> {
        self.draft.as_ref()
    }

    /// Returns the tier the current decision came from.
    #[must_use]
    pub const fn source(&self) -> Option<ConsentSource> {
        self.source
    }

    /// Returns the current fides string.
    #[must_use]
    pub fn fides_string(&self) -> Option<&str> {
        self.fides_string.as_deref()
    }

    /// Returns true while the consent UI is on screen.
    #[must_use]
    pub const fn is_ui_visible(&self) -> bool {
        self.ui_visible
    }

    /// Returns true when the user has not decided for the loaded experience.
    #[must_use]
    pub fn needs_consent(&self) -> bool {
        let Some(experience) = &self.experience else {
            return false;
        };
        experience.component != ComponentType::Headless
            && self.source == Some(ConsentSource::ExperienceDefaults)
            && experience.fields().iter().any(|field| match field {
                FieldRef::Notice(key) => {
                    experience.find_notice(key).is_some_and(|notice| !notice.is_notice_only())
                }
                _ => true,
            })
    }

    // ------------------------------------------------------------------------
    // Experience loading
    // ------------------------------------------------------------------------

    /// Starts an experience load, superseding any load in flight.
    pub fn begin_experience_load(&mut self) -> LoadTicket {
        self.generation = self.generation.saturating_add(1);
        self.emit_page(FidesEventType::Initializing, FidesEventDetail::default());
        LoadTicket {
            generation: self.generation,
        }
    }

    /// Completes an experience load and resolves the initial decision.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingExperience`] when the load produced no
    /// experience; the CMP then stays `loading`/`not ready`.
    pub fn complete_experience_load(
        &mut self,
        ticket: LoadTicket,
        experience: Option<Experience>,
        now: Timestamp,
    ) -> Result<LoadOutcome, EngineError> {
        if ticket.generation != self.generation {
            self.audit(now, ConsentAuditRecord::StaleLoadIgnored {
                load_generation: ticket.generation,
                current_generation: self.generation,
            });
            return Ok(LoadOutcome::Stale);
        }
        let experience = experience.ok_or(EngineError::MissingExperience)?;
        self.registry.mark_loaded(applicable_sections(&experience, &self.config.gpp), experience.gvl);

        let mut provider_issues = Vec::new();
        let preferences = self.fetch_preferences(&experience, &mut provider_issues);
        let cookie = self.read_cookie(now);
        let sources = ConsentSources {
            override_string: self.config.override_string.as_deref(),
            preferences: preferences.as_ref(),
            cookie: cookie.as_ref(),
            experience: Some(&experience),
            now,
            gpc_enabled: self.config.gpc_enabled,
        };
        let mut resolution = resolve(&sources).ok_or(EngineError::MissingExperience)?;
        provider_issues.append(&mut resolution.issues);
        resolution.issues = provider_issues;

        for issue in &resolution.issues {
            match issue {
                ResolveIssue::InvalidOverrideString {
                    raw,
                    error,
                } => self.audit_decode_failure(now, "override_string", raw, error),
                ResolveIssue::InvalidCookieString {
                    raw,
                    error,
                } => self.audit_decode_failure(now, "cookie", raw, error),
                _ => {}
            }
        }
        self.audit(now, ConsentAuditRecord::Resolution {
            experience_id: experience.id.as_str().to_string(),
            source: resolution.source,
            issues: resolution.issues.clone(),
        });

        if resolution.source != ConsentSource::ExperienceDefaults {
            let stored = match resolution.source {
                ConsentSource::OverrideString => self.config.override_string.as_deref(),
                ConsentSource::Cookie => {
                    cookie.as_ref().and_then(|cookie| cookie.fides_string.as_deref())
                }
                ConsentSource::Preferences | ConsentSource::ExperienceDefaults => None,
            };
            match self.restore(stored, &resolution.decision, &experience, now) {
                Ok(encoded) => {
                    self.fides_string = Some(encoded.fides_string);
                    self.registry.restore_consent(encoded.signals);
                }
                Err(err) => self.audit(now, ConsentAuditRecord::EncodeFailed {
                    error: err.to_string(),
                }),
            }
        }

        let detail = FidesEventDetail {
            consent_method: cookie
                .as_ref()
                .filter(|_| resolution.source == ConsentSource::Cookie)
                .and_then(|cookie| cookie.consent_method),
            serving_component: Some(experience.component),
        };
        self.decision = Some(resolution.decision.clone());
        self.source = Some(resolution.source);
        self.experience = Some(experience);
        self.draft = None;
        self.emit_page(FidesEventType::Initialized, detail);
        Ok(LoadOutcome::Applied(resolution))
    }

    /// Fetches tier-2 preferences, recording provider failures.
    fn fetch_preferences(
        &self,
        experience: &Experience,
        issues: &mut Vec<ResolveIssue>,
    ) -> Option<SavedPreferences> {
        let provider = self.preferences.as_ref()?;
        match provider.fetch(experience) {
            Ok(preferences) => preferences,
            Err(err) => {
                issues.push(ResolveIssue::PreferencesUnavailable {
                    error: err.to_string(),
                });
                None
            }
        }
    }

    /// Reads the consent cookie, treating unreadable cookies as absent.
    fn read_cookie(&self, now: Timestamp) -> Option<ConsentCookie> {
        match load_cookie(&self.store) {
            Ok(cookie) => cookie,
            Err(err) => {
                self.audit(now, ConsentAuditRecord::StoreFailed {
                    error: err.to_string(),
                });
                None
            }
        }
    }

    // ------------------------------------------------------------------------
    // UI transitions
    // ------------------------------------------------------------------------

    /// Shows the consent UI.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingExperience`] when no experience is loaded.
    pub fn show_ui(&mut self) -> Result<(), EngineError> {
        let component = self.experience.as_ref().ok_or(EngineError::MissingExperience)?.component;
        self.ui_visible = true;
        self.draft = self.decision.clone();
        self.registry.ui_shown();
        self.emit_page(FidesEventType::UiShown, FidesEventDetail {
            consent_method: None,
            serving_component: Some(component),
        });
        Ok(())
    }

    /// Closes the consent UI without a decision.
    pub fn close_ui(&mut self) {
        if !self.ui_visible {
            return;
        }
        self.ui_visible = false;
        self.draft = None;
        self.registry.ui_closed();
        self.emit_page(FidesEventType::ModalClosed, FidesEventDetail::default());
    }

    /// Toggles a notice in the UI draft and returns every value it set.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when no experience is loaded or the notice is unknown.
    pub fn toggle_notice(
        &mut self,
        key: &NoticeKey,
        value: bool,
    ) -> Result<BTreeMap<NoticeKey, bool>, EngineError> {
        let experience = self.experience.as_ref().ok_or(EngineError::MissingExperience)?;
        let mut draft = match self.draft.take() {
            Some(draft) => draft,
            None => self
                .decision
                .clone()
                .unwrap_or_else(|| ConsentDecision::experience_defaults(experience)),
        };
        let changes = match collapse_on_change(&experience.notices, key, value, draft.notices()) {
            Ok(changes) => changes,
            Err(err) => {
                self.draft = Some(draft);
                return Err(err.into());
            }
        };
        draft.notice_consent.extend(changes.iter().map(|(key, value)| (key.clone(), *value)));
        self.draft = Some(draft);
        self.emit_page(FidesEventType::UiChanged, FidesEventDetail::default());
        Ok(changes)
    }

    // ------------------------------------------------------------------------
    // Decisions
    // ------------------------------------------------------------------------

    /// Accepts every slot of the loaded experience.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when no experience is loaded or encoding fails.
    pub fn accept_all(&mut self, now: Timestamp) -> Result<AppliedDecision, EngineError> {
        let experience = self.experience.as_ref().ok_or(EngineError::MissingExperience)?;
        let decision = ConsentDecision::accept_all(experience);
        self.apply_decision(ConsentMethod::Accept, &decision, now)
    }

    /// Rejects every declinable slot of the loaded experience.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when no experience is loaded or encoding fails.
    pub fn reject_all(&mut self, now: Timestamp) -> Result<AppliedDecision, EngineError> {
        let experience = self.experience.as_ref().ok_or(EngineError::MissingExperience)?;
        let decision = ConsentDecision::reject_all(experience);
        self.apply_decision(ConsentMethod::Reject, &decision, now)
    }

    /// Saves custom choices; slots absent from `decision` keep their value.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when no experience is loaded, the decision
    /// names an unknown slot, or encoding fails.
    pub fn save(
        &mut self,
        decision: &ConsentDecision,
        now: Timestamp,
    ) -> Result<AppliedDecision, EngineError> {
        self.apply_decision(ConsentMethod::Save, decision, now)
    }

    /// Saves the current UI draft.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when no experience is loaded or encoding fails.
    pub fn save_draft(&mut self, now: Timestamp) -> Result<AppliedDecision, EngineError> {
        let draft = self.draft.clone().or_else(|| self.decision.clone()).unwrap_or_default();
        self.apply_decision(ConsentMethod::Save, &draft, now)
    }

    /// Dismisses the UI, recording the current decision as the user's.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when no experience is loaded or encoding fails.
    pub fn dismiss(&mut self, now: Timestamp) -> Result<AppliedDecision, EngineError> {
        let current = self.decision.clone().unwrap_or_default();
        self.apply_decision(ConsentMethod::Dismiss, &current, now)
    }

    /// Applies a host-configured decision without user interaction.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when no experience is loaded, the decision
    /// names an unknown slot, or encoding fails.
    pub fn apply_script_default(
        &mut self,
        decision: &ConsentDecision,
        now: Timestamp,
    ) -> Result<AppliedDecision, EngineError> {
        self.apply_decision(ConsentMethod::Script, decision, now)
    }

    /// Runs the decision pipeline.
    fn apply_decision(
        &mut self,
        method: ConsentMethod,
        decision: &ConsentDecision,
        now: Timestamp,
    ) -> Result<AppliedDecision, EngineError> {
        let experience = self.experience.clone().ok_or(EngineError::MissingExperience)?;
        if let Some(field) = decision.unknown_fields(&experience).into_iter().next() {
            return Err(EngineError::UnknownField(field));
        }
        let mut merged = self.decision.clone().unwrap_or_default();
        merged.overlay(decision);
        let merged = merged.normalized(&experience, Fallback::ExperienceDefault);

        self.emit_page(FidesEventType::Updating, FidesEventDetail {
            consent_method: Some(method),
            serving_component: Some(experience.component),
        });

        let encoded = match self.encode(&merged, &experience, now) {
            Ok(encoded) => encoded,
            Err(err) => {
                self.audit(now, ConsentAuditRecord::EncodeFailed {
                    error: err.to_string(),
                });
                return Err(err.into());
            }
        };

        let cookie = ConsentCookie {
            decision: merged.clone(),
            fides_string: Some(encoded.fides_string.clone()),
            tcf_version_hash: if experience.is_tcf() {
                experience_version_hash(&experience).ok()
            } else {
                None
            },
            consent_method: Some(method),
            updated_at: Some(now),
            expires_at: self.cookie_expiry(now),
        };
        if let Err(err) = save_cookie(&self.store, &cookie) {
            self.audit(now, ConsentAuditRecord::StoreFailed {
                error: err.to_string(),
            });
        }

        let tc_string = encoded.signals.tc_string.clone();
        let gpp_string = encoded.signals.gpp_string.clone();
        let changed_sections = self.registry.decision_applied(method, encoded.signals);
        self.audit(now, ConsentAuditRecord::ConsentSaved {
            consent_method: method,
            tc_string: tc_string.clone(),
            gpp_string: gpp_string.clone(),
            fides_string: encoded.fides_string.clone(),
        });

        let was_visible = self.ui_visible;
        self.ui_visible = false;
        self.draft = None;
        self.decision = Some(merged);
        self.fides_string = Some(encoded.fides_string);
        let detail = FidesEventDetail {
            consent_method: Some(method),
            serving_component: Some(experience.component),
        };
        self.emit_page(FidesEventType::Updated, detail);
        if was_visible {
            self.emit_page(FidesEventType::ModalClosed, detail);
        }
        Ok(AppliedDecision {
            cookie,
            tc_string,
            gpp_string,
            changed_sections,
        })
    }

    /// Returns the expiry for a cookie written at `now`.
    fn cookie_expiry(&self, now: Timestamp) -> Option<Timestamp> {
        let days = i64::from(self.config.cookie_max_age_days?);
        let millis = now.as_unix_millis().saturating_add(days.saturating_mul(MILLIS_PER_DAY));
        Some(Timestamp::from_unix_millis(millis))
    }

    /// Encodes TC, GPP, and fides strings for a decision.
    fn encode(
        &self,
        decision: &ConsentDecision,
        experience: &Experience,
        now: Timestamp,
    ) -> Result<EncodedConsent, EncodeError> {
        let (tc_model, tc_string) = self.encode_tc(decision, experience, now)?;
        let (gpp_string, section_strings) = self.compose_gpp(decision, experience, &tc_string)?;
        Ok(self.assemble(tc_model, tc_string, gpp_string, section_strings))
    }

    /// Rebuilds the published signals from a stored fides string.
    ///
    /// Halves that decode and still match the experience are published
    /// verbatim, keeping their original timestamps and CMP metadata. Only
    /// the missing or unusable halves are encoded from `decision`.
    fn restore(
        &self,
        stored: Option<&str>,
        decision: &ConsentDecision,
        experience: &Experience,
        now: Timestamp,
    ) -> Result<EncodedConsent, EncodeError> {
        let Some(stored) = stored.and_then(|raw| FidesString::parse(raw).ok()) else {
            return self.encode(decision, experience, now);
        };
        let tcf_active = self.config.tcf_enabled && experience.is_tcf();
        let (tc_model, tc_string) = match stored.tc_model() {
            Ok(Some(model)) if tcf_active => (Some(model), stored.tc_string.clone()),
            _ => self.encode_tc(decision, experience, now)?,
        };
        let expected = applicable_sections(experience, &self.config.gpp);
        let stored_gpp = stored
            .gpp()
            .ok()
            .flatten()
            .filter(|gpp| self.config.gpp.enabled && gpp.section_ids() == expected);
        let (gpp_string, section_strings) = match (stored_gpp, stored.gpp_string) {
            (Some(gpp), Some(raw)) => (raw, gpp.section_strings()?),
            _ => self.compose_gpp(decision, experience, &tc_string)?,
        };
        Ok(self.assemble(tc_model, tc_string, gpp_string, section_strings))
    }

    /// Encodes the TC half; empty when TCF is inactive for the experience.
    fn encode_tc(
        &self,
        decision: &ConsentDecision,
        experience: &Experience,
        now: Timestamp,
    ) -> Result<(Option<TcModel>, String), EncodeError> {
        if !(self.config.tcf_enabled && experience.is_tcf()) {
            return Ok((None, String::new()));
        }
        let model = TcModel::from_decision(decision, experience, now, &self.config.tcf)?;
        let tc_string = model.encode()?;
        Ok((Some(model), tc_string))
    }

    /// Composes the GPP string and its section payloads.
    fn compose_gpp(
        &self,
        decision: &ConsentDecision,
        experience: &Experience,
        tc_string: &str,
    ) -> Result<(String, BTreeMap<GppSectionId, String>), EncodeError> {
        let tc_half = (!tc_string.is_empty()).then_some(tc_string);
        let gpp = sections_for_decision(
            decision,
            experience,
            &self.config.gpp,
            tc_half,
            self.config.gpc_enabled,
        )?;
        if gpp.sections.is_empty() {
            return Ok((String::new(), BTreeMap::new()));
        }
        Ok((gpp.encode()?, gpp.section_strings()?))
    }

    /// Joins encoded halves into signals and the combined fides string.
    fn assemble(
        &self,
        tc_model: Option<TcModel>,
        tc_string: String,
        gpp_string: String,
        section_strings: BTreeMap<GppSectionId, String>,
    ) -> EncodedConsent {
        let gpp_half = self.config.gpp.enabled.then(|| gpp_string.clone());
        let fides_string = FidesString::new(tc_string.clone(), gpp_half).to_string();
        EncodedConsent {
            signals: ConsentSignals {
                tc_model,
                tc_string,
                gpp_string,
                section_strings,
            },
            fides_string,
        }
    }

    // ------------------------------------------------------------------------
    // Event helpers
    // ------------------------------------------------------------------------

    /// Emits a page event to every page listener.
    fn emit_page(&mut self, event_type: FidesEventType, extra_details: FidesEventDetail) {
        let event = PageEvent {
            event_type,
            extra_details,
            fides_string: self.fides_string.clone(),
        };
        for listener in &mut self.page_listeners {
            listener.on_page_event(&event);
        }
    }

    /// Records an audit event.
    fn audit(&self, now: Timestamp, record: ConsentAuditRecord) {
        self.audit.record(&ConsentAuditEvent::new(now, record));
    }

    /// Records a decode failure with the offending raw string.
    fn audit_decode_failure(&self, now: Timestamp, source: &str, raw: &str, error: &str) {
        self.audit(now, ConsentAuditRecord::DecodeFailed {
            source: source.to_string(),
            raw: raw.to_string(),
            error: error.to_string(),
        });
    }
}
