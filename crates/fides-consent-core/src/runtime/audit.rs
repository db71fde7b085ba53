// crates/fides-consent-core/src/runtime/audit.rs
// ============================================================================
// Module: Consent Audit Logging
// Description: Structured audit records for resolution, codec, and store events.
// Purpose: Emit JSON-lines diagnostics without a logging framework.
// Dependencies: serde, serde_json, crate::{core, resolver}
// ============================================================================

//! ## Overview
//! The engine reports everything worth diagnosing as a
//! [`ConsentAuditEvent`]: which tier won a resolution, every string that
//! failed to decode (with the raw string), encode failures, saved consent,
//! ignored stale loads, and store failures.
//!
//! Sinks serialize one JSON object per line. A sink that cannot write drops
//! the record; auditing never fails the engine.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;

use crate::core::decision::ConsentMethod;
use crate::core::time::Timestamp;
use crate::resolver::ConsentSource;
use crate::resolver::ResolveIssue;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsentAuditEvent {
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: i64,
    /// Event record.
    #[serde(flatten)]
    pub record: ConsentAuditRecord,
}

impl ConsentAuditEvent {
    /// Creates an event stamped with the engine clock.
    #[must_use]
    pub const fn new(now: Timestamp, record: ConsentAuditRecord) -> Self {
        Self {
            timestamp_ms: now.as_unix_millis(),
            record,
        }
    }

    /// Returns the event label.
    #[must_use]
    pub const fn event(&self) -> &'static str {
        self.record.event()
    }
}

/// Audit record body, tagged by `event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ConsentAuditRecord {
    /// An experience load resolved a decision.
    Resolution {
        /// Experience identifier.
        experience_id: String,
        /// Winning tier.
        source: ConsentSource,
        /// Problems recovered during resolution.
        issues: Vec<ResolveIssue>,
    },
    /// A stored or supplied string failed to decode.
    DecodeFailed {
        /// Where the string came from.
        source: String,
        /// Offending raw string.
        raw: String,
        /// Decode error.
        error: String,
    },
    /// A decision could not be encoded.
    EncodeFailed {
        /// Encode error.
        error: String,
    },
    /// A decision was applied and persisted.
    ConsentSaved {
        /// How the decision was reached.
        consent_method: ConsentMethod,
        /// Published TC string.
        tc_string: String,
        /// Published GPP string.
        gpp_string: String,
        /// Persisted fides string.
        fides_string: String,
    },
    /// An experience load finished after a newer one started.
    StaleLoadIgnored {
        /// Generation of the finished load.
        load_generation: u64,
        /// Current generation.
        current_generation: u64,
    },
    /// The consent store failed.
    StoreFailed {
        /// Store error.
        error: String,
    },
}

impl ConsentAuditRecord {
    /// Returns the event label.
    #[must_use]
    pub const fn event(&self) -> &'static str {
        match self {
            Self::Resolution {
                ..
            } => "resolution",
            Self::DecodeFailed {
                ..
            } => "decode_failed",
            Self::EncodeFailed {
                ..
            } => "encode_failed",
            Self::ConsentSaved {
                ..
            } => "consent_saved",
            Self::StaleLoadIgnored {
                ..
            } => "stale_load_ignored",
            Self::StoreFailed {
                ..
            } => "store_failed",
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for consent events.
pub trait ConsentAuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &ConsentAuditEvent);
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink that drops every event.
pub struct NoopAuditSink;

impl ConsentAuditSink for NoopAuditSink {
    fn record(&self, _event: &ConsentAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl ConsentAuditSink for StderrAuditSink {
    fn record(&self, event: &ConsentAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that writes JSON lines to any writer.
pub struct JsonlAuditSink<W: Write + Send> {
    /// Guarded output writer.
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonlAuditSink<W> {
    /// Wraps a writer.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the writer, or `None` when a writer panicked mid-record.
    #[must_use]
    pub fn into_inner(self) -> Option<W> {
        self.writer.into_inner().ok()
    }
}

impl JsonlAuditSink<File> {
    /// Opens a file sink in append mode.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the file cannot be opened.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write + Send> ConsentAuditSink for JsonlAuditSink<W> {
    fn record(&self, event: &ConsentAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut writer) = self.writer.lock()
        {
            let _ = writeln!(writer, "{payload}");
            let _ = writer.flush();
        }
    }
}
