// crates/fides-consent-core/src/resolver.rs
// ============================================================================
// Module: Source Resolver
// Description: Tiered precedence over override, preferences, cookie, and defaults.
// Purpose: Pick exactly one authoritative consent source per page view.
// Dependencies: serde, thiserror, crate::{codec, core}
// ============================================================================

//! ## Overview
//! Resolution walks four tiers in strict order and the first usable tier
//! wins outright; values are never merged across tiers:
//! 1. the host-supplied override fides string,
//! 2. preferences returned by the injected preferences provider,
//! 3. the persisted consent cookie, when its version hash still matches,
//! 4. the experience's own defaults.
//!
//! Without an experience there is nothing to resolve and [`resolve`]
//! returns `None`. Tier failures are recovered here and reported as
//! [`ResolveIssue`] values on the [`Resolution`].
//!
//! Slots missing from a tier 1-3 payload are opted out rather than taking
//! the experience default; only tier 4 uses experience defaults.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::codec::DecodeError;
use crate::codec::fides_string::FidesString;
use crate::codec::gpp::SectionPayload;
use crate::codec::gpp::notices_from_gpp;
use crate::codec::tcf;
use crate::core::decision::ConsentDecision;
use crate::core::decision::ConsentMethod;
use crate::core::decision::Fallback;
use crate::core::experience::ConsentMechanism;
use crate::core::experience::Experience;
use crate::core::hashing::experience_version_hash;
use crate::core::sections::GppSectionId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Stored Inputs
// ============================================================================

/// Consent state persisted between page views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsentCookie {
    /// Stored decision.
    #[serde(default)]
    pub decision: ConsentDecision,
    /// Stored fides string (`<tc>,<gpp>`).
    #[serde(default)]
    pub fides_string: Option<String>,
    /// Experience version hash the decision was collected against.
    #[serde(default)]
    pub tcf_version_hash: Option<String>,
    /// How the decision was reached.
    #[serde(default)]
    pub consent_method: Option<ConsentMethod>,
    /// Time of the last update.
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
    /// Expiry time; expired cookies are ignored.
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
}

/// Preferences returned by the preferences provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SavedPreferences {
    /// Saved decision.
    #[serde(default)]
    pub decision: ConsentDecision,
    /// Experience version hash the preferences were saved against.
    #[serde(default)]
    pub version_hash: Option<String>,
}

/// Candidate sources for one resolution.
#[derive(Debug, Clone, Copy)]
pub struct ConsentSources<'a> {
    /// Tier 1: override fides string from host configuration.
    pub override_string: Option<&'a str>,
    /// Tier 2: preferences from the preferences provider.
    pub preferences: Option<&'a SavedPreferences>,
    /// Tier 3: persisted cookie.
    pub cookie: Option<&'a ConsentCookie>,
    /// Experience in effect; `None` means nothing can be resolved.
    pub experience: Option<&'a Experience>,
    /// Current time, used for cookie expiry.
    pub now: Timestamp,
    /// Whether the browser signals Global Privacy Control.
    pub gpc_enabled: bool,
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Tier that produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentSource {
    /// Host-supplied override string.
    OverrideString,
    /// Preferences provider.
    Preferences,
    /// Persisted cookie.
    Cookie,
    /// Experience defaults.
    ExperienceDefaults,
}

impl ConsentSource {
    /// Returns a stable label for the tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OverrideString => "override_string",
            Self::Preferences => "preferences",
            Self::Cookie => "cookie",
            Self::ExperienceDefaults => "experience_defaults",
        }
    }
}

impl fmt::Display for ConsentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recovered problem encountered while resolving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolveIssue {
    /// The override string did not decode.
    #[error("invalid override string: {error}")]
    InvalidOverrideString {
        /// Offending raw string.
        raw: String,
        /// Decode error.
        error: String,
    },
    /// A stored version hash no longer matches the experience.
    #[error("stale version hash from {source_tier}: stored {stored}, current {current}")]
    StaleVersionHash {
        /// Tier that carried the stale hash.
        source_tier: ConsentSource,
        /// Stored hash (empty when missing).
        stored: String,
        /// Current experience hash.
        current: String,
    },
    /// The cookie expired.
    #[error("cookie expired at {expired_at}")]
    ExpiredCookie {
        /// Expiry time in unix milliseconds.
        expired_at: i64,
    },
    /// The cookie's stored fides string did not decode.
    #[error("invalid cookie fides string: {error}")]
    InvalidCookieString {
        /// Offending raw string.
        raw: String,
        /// Decode error.
        error: String,
    },
    /// The preferences provider failed.
    #[error("preferences unavailable: {error}")]
    PreferencesUnavailable {
        /// Provider error.
        error: String,
    },
    /// The experience version hash could not be computed.
    #[error("version hash unavailable: {error}")]
    HashUnavailable {
        /// Hashing error.
        error: String,
    },
}

/// Outcome of a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Decision normalized against the experience.
    pub decision: ConsentDecision,
    /// Winning tier.
    pub source: ConsentSource,
    /// Problems recovered along the way.
    pub issues: Vec<ResolveIssue>,
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Resolves the authoritative decision from the candidate sources.
///
/// Returns `None` when no experience is available.
#[must_use]
pub fn resolve(sources: &ConsentSources<'_>) -> Option<Resolution> {
    let experience = sources.experience?;
    let mut issues = Vec::new();
    let current_hash = if experience.is_tcf() {
        match experience_version_hash(experience) {
            Ok(hash) => Some(hash),
            Err(err) => {
                issues.push(ResolveIssue::HashUnavailable {
                    error: err.to_string(),
                });
                None
            }
        }
    } else {
        None
    };

    if let Some(raw) = sources.override_string {
        match decode_override(raw, experience) {
            Ok(decision) => {
                return Some(finish(decision, experience, ConsentSource::OverrideString, issues));
            }
            Err(err) => issues.push(ResolveIssue::InvalidOverrideString {
                raw: raw.to_string(),
                error: err.to_string(),
            }),
        }
    }

    if let Some(preferences) = sources.preferences {
        match (&preferences.version_hash, &current_hash) {
            (Some(stored), Some(current)) if stored != current => {
                issues.push(ResolveIssue::StaleVersionHash {
                    source_tier: ConsentSource::Preferences,
                    stored: stored.clone(),
                    current: current.clone(),
                });
            }
            _ => {
                return Some(finish(
                    preferences.decision.clone(),
                    experience,
                    ConsentSource::Preferences,
                    issues,
                ));
            }
        }
    }

    if let Some(cookie) = sources.cookie {
        let rejection = cookie_rejection(cookie, experience, current_hash.as_deref(), sources.now);
        if let Some(issue) = rejection {
            issues.push(issue);
        } else {
            let decision = cookie_decision(cookie, experience, &mut issues);
            return Some(finish(decision, experience, ConsentSource::Cookie, issues));
        }
    }

    let mut decision = ConsentDecision::experience_defaults(experience);
    if sources.gpc_enabled {
        apply_gpc(&mut decision, experience);
    }
    Some(Resolution {
        decision,
        source: ConsentSource::ExperienceDefaults,
        issues,
    })
}

/// Decodes an override fides string into decision slots.
///
/// The TC half fills TCF slots; US sections of the GPP half fill notices
/// through their GPP mappings. An embedded `tcfeuv2` section is used when
/// the TC half is empty.
///
/// # Errors
///
/// Returns [`DecodeError`] when either half is malformed.
pub fn decode_override(raw: &str, experience: &Experience) -> Result<ConsentDecision, DecodeError> {
    let fides = FidesString::parse(raw)?;
    let gpp = fides.gpp()?;
    let mut decision = ConsentDecision::default();
    let tc_model = match fides.tc_model()? {
        Some(model) => Some(model),
        None => match gpp.as_ref().and_then(|gpp| gpp.sections.get(&GppSectionId::TcfEuV2)) {
            Some(SectionPayload::TcfEuV2(tc_string)) => Some(tcf::decode(tc_string)?),
            _ => None,
        },
    };
    if let Some(model) = tc_model {
        decision.overlay(&model.to_decision(experience));
    }
    if let Some(gpp) = gpp {
        decision.notice_consent.extend(notices_from_gpp(&gpp, experience));
    }
    Ok(decision)
}

/// Returns the issue that disqualifies a cookie, if any.
fn cookie_rejection(
    cookie: &ConsentCookie,
    experience: &Experience,
    current_hash: Option<&str>,
    now: Timestamp,
) -> Option<ResolveIssue> {
    if let Some(expires_at) = cookie.expires_at.filter(|expires_at| *expires_at <= now) {
        return Some(ResolveIssue::ExpiredCookie {
            expired_at: expires_at.as_unix_millis(),
        });
    }
    if !experience.is_tcf() {
        return None;
    }
    let stored = cookie.tcf_version_hash.as_deref().unwrap_or_default();
    match current_hash {
        Some(current) if stored == current => None,
        current => Some(ResolveIssue::StaleVersionHash {
            source_tier: ConsentSource::Cookie,
            stored: stored.to_string(),
            current: current.unwrap_or_default().to_string(),
        }),
    }
}

/// Returns the cookie decision, filling TCF slots from its TC string when needed.
fn cookie_decision(
    cookie: &ConsentCookie,
    experience: &Experience,
    issues: &mut Vec<ResolveIssue>,
) -> ConsentDecision {
    let mut decision = cookie.decision.clone();
    if decision.has_tcf_entries() || !experience.is_tcf() {
        return decision;
    }
    let Some(raw) = cookie.fides_string.as_deref() else {
        return decision;
    };
    match FidesString::parse(raw).and_then(|fides| fides.tc_model()) {
        Ok(Some(model)) => decision.overlay(&model.to_decision(experience)),
        Ok(None) => {}
        Err(err) => issues.push(ResolveIssue::InvalidCookieString {
            raw: raw.to_string(),
            error: err.to_string(),
        }),
    }
    decision
}

/// Normalizes a tier 1-3 decision, opting out of missing slots.
fn finish(
    decision: ConsentDecision,
    experience: &Experience,
    source: ConsentSource,
    issues: Vec<ResolveIssue>,
) -> Resolution {
    Resolution {
        decision: decision.normalized(experience, Fallback::OptOut),
        source,
        issues,
    }
}

/// Opts out of every opt-out notice that honours Global Privacy Control.
fn apply_gpc(decision: &mut ConsentDecision, experience: &Experience) {
    for notice in experience.notices_flat() {
        if notice.has_gpc_flag && notice.consent_mechanism == ConsentMechanism::OptOut {
            decision.notice_consent.insert(notice.notice_key.clone(), false);
        }
    }
}

// ============================================================================
// SECTION: Bulk Decisions
// ============================================================================

/// Accepts every slot of the experience.
#[must_use]
pub fn accept_all(experience: &Experience) -> ConsentDecision {
    ConsentDecision::accept_all(experience)
}

/// Rejects every declinable slot of the experience.
#[must_use]
pub fn reject_all(experience: &Experience) -> ConsentDecision {
    ConsentDecision::reject_all(experience)
}
