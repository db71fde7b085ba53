// crates/fides-consent-config/src/config.rs
// ============================================================================
// Module: Fides Consent Configuration
// Description: Configuration loading and validation for the consent engine.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: fides-consent-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Unknown keys and out-of-range values fail closed. A validated config
//! converts into the core [`EngineConfig`] and an audit sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use fides_consent_core::EngineConfig;
use fides_consent_core::FidesString;
use fides_consent_core::GppSettings;
use fides_consent_core::TcEncodeOptions;
use fides_consent_core::UsApproach;
use fides_consent_core::codec::tcf::DEFAULT_CMP_ID;
use fides_consent_core::runtime::ConsentAuditSink;
use fides_consent_core::runtime::DEFAULT_COOKIE_MAX_AGE_DAYS;
use fides_consent_core::runtime::JsonlAuditSink;
use fides_consent_core::runtime::NoopAuditSink;
use fides_consent_core::runtime::StderrAuditSink;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "fides-consent.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "FIDES_CONSENT_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Largest value of a 12-bit TC string field.
pub(crate) const MAX_TWELVE_BIT_VALUE: u16 = 4095;
/// Largest value of a 6-bit TC string field.
pub(crate) const MAX_SIX_BIT_VALUE: u8 = 63;
/// Maximum length of an override fides string.
pub(crate) const MAX_OVERRIDE_STRING_LENGTH: usize = 16 * 1024;
/// Maximum consent cookie lifetime in days.
pub(crate) const MAX_COOKIE_MAX_AGE_DAYS: u32 = 3650;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Fides consent engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FidesConsentConfig {
    /// CMP metadata.
    #[serde(default)]
    pub cmp: CmpConfig,
    /// TCF API settings.
    #[serde(default)]
    pub tcf: TcfConfig,
    /// GPP API settings.
    #[serde(default)]
    pub gpp: GppConfig,
    /// Host-supplied overrides.
    #[serde(default)]
    pub overrides: OverridesConfig,
    /// Consent cookie settings.
    #[serde(default)]
    pub cookie: CookieConfig,
    /// Audit sink selection.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl FidesConsentConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path comes from `path`, then `FIDES_CONSENT_CONFIG`, then
    /// `fides-consent.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path, env::var(CONFIG_ENV_VAR).ok())?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cmp.validate()?;
        self.overrides.validate()?;
        self.cookie.validate()?;
        self.audit.validate()?;
        if self.gpp.enable_tcfeu_string && !self.tcf.enabled {
            return Err(ConfigError::Invalid(
                "gpp.enable_tcfeu_string requires tcf.enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the core engine configuration.
    #[must_use]
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            tcf: TcEncodeOptions {
                cmp_id: self.cmp.cmp_id,
                cmp_version: self.cmp.cmp_version,
                consent_screen: self.cmp.consent_screen,
                consent_language: self.cmp.consent_language.to_ascii_uppercase(),
                publisher_country_code: self.cmp.publisher_country_code.to_ascii_uppercase(),
                is_service_specific: self.tcf.is_service_specific,
                include_disclosed_vendors: self.tcf.include_disclosed_vendors,
            },
            tcf_enabled: self.tcf.enabled,
            gpp: GppSettings {
                enabled: self.gpp.enabled,
                us_approach: self.gpp.us_approach,
                mspa_covered_transactions: self.gpp.mspa_covered_transactions,
                mspa_opt_out_option_mode: self.gpp.mspa_opt_out_option_mode,
                mspa_service_provider_mode: self.gpp.mspa_service_provider_mode,
                enable_tcfeu_string: self.gpp.enable_tcfeu_string,
            },
            override_string: self.overrides.fides_string.clone(),
            gpc_enabled: self.overrides.gpc_enabled,
            cookie_max_age_days: (self.cookie.max_age_days > 0).then_some(self.cookie.max_age_days),
        }
    }
}

/// CMP metadata written into TC strings and API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CmpConfig {
    /// IAB-registered CMP id.
    #[serde(default = "default_cmp_id")]
    pub cmp_id: u16,
    /// CMP version.
    #[serde(default = "default_one_u16")]
    pub cmp_version: u16,
    /// Screen number where consent is collected.
    #[serde(default = "default_one_u8")]
    pub consent_screen: u8,
    /// Two-letter consent language.
    #[serde(default = "default_consent_language")]
    pub consent_language: String,
    /// Two-letter publisher country code.
    #[serde(default = "default_publisher_country_code")]
    pub publisher_country_code: String,
}

impl Default for CmpConfig {
    fn default() -> Self {
        Self {
            cmp_id: default_cmp_id(),
            cmp_version: default_one_u16(),
            consent_screen: default_one_u8(),
            consent_language: default_consent_language(),
            publisher_country_code: default_publisher_country_code(),
        }
    }
}

impl CmpConfig {
    /// Validates CMP field widths and letter codes.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.cmp_id == 0 || self.cmp_id > MAX_TWELVE_BIT_VALUE {
            return Err(ConfigError::Invalid(format!(
                "cmp.cmp_id must be between 1 and {MAX_TWELVE_BIT_VALUE}"
            )));
        }
        if self.cmp_version > MAX_TWELVE_BIT_VALUE {
            return Err(ConfigError::Invalid(format!(
                "cmp.cmp_version must be at most {MAX_TWELVE_BIT_VALUE}"
            )));
        }
        if self.consent_screen > MAX_SIX_BIT_VALUE {
            return Err(ConfigError::Invalid(format!(
                "cmp.consent_screen must be at most {MAX_SIX_BIT_VALUE}"
            )));
        }
        validate_letter_code("cmp.consent_language", &self.consent_language)?;
        validate_letter_code("cmp.publisher_country_code", &self.publisher_country_code)
    }
}

/// TCF API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TcfConfig {
    /// Whether TCF experiences produce TC strings.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Whether TC strings carry the disclosed-vendors segment.
    #[serde(default)]
    pub include_disclosed_vendors: bool,
    /// Whether consent is service-specific.
    #[serde(default = "default_true")]
    pub is_service_specific: bool,
}

impl Default for TcfConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            include_disclosed_vendors: false,
            is_service_specific: true,
        }
    }
}

/// GPP API settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GppConfig {
    /// Whether the GPP API is active.
    #[serde(default)]
    pub enabled: bool,
    /// US region to section mapping.
    #[serde(default)]
    pub us_approach: UsApproach,
    /// Whether transactions are covered by the MSPA.
    #[serde(default)]
    pub mspa_covered_transactions: bool,
    /// MSPA opt-out option mode.
    #[serde(default)]
    pub mspa_opt_out_option_mode: bool,
    /// MSPA service provider mode.
    #[serde(default)]
    pub mspa_service_provider_mode: bool,
    /// Whether TCF experiences embed the TC string as `tcfeuv2`.
    #[serde(default)]
    pub enable_tcfeu_string: bool,
}

/// Host-supplied overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverridesConfig {
    /// Override fides string (`<tc>,<gpp>`), applied ahead of saved consent.
    #[serde(default)]
    pub fides_string: Option<String>,
    /// Whether Global Privacy Control is asserted.
    #[serde(default)]
    pub gpc_enabled: bool,
}

impl OverridesConfig {
    /// Validates the override fides string shape.
    fn validate(&self) -> Result<(), ConfigError> {
        let Some(raw) = &self.fides_string else {
            return Ok(());
        };
        if raw.len() > MAX_OVERRIDE_STRING_LENGTH {
            return Err(ConfigError::Invalid(
                "overrides.fides_string exceeds max length".to_string(),
            ));
        }
        FidesString::parse(raw)
            .map_err(|err| ConfigError::Invalid(format!("overrides.fides_string: {err}")))?;
        Ok(())
    }
}

/// Consent cookie settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CookieConfig {
    /// Cookie lifetime in days; `0` leaves expiry to the host.
    #[serde(default = "default_cookie_max_age_days")]
    pub max_age_days: u32,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_cookie_max_age_days(),
        }
    }
}

impl CookieConfig {
    /// Validates the cookie lifetime.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_age_days > MAX_COOKIE_MAX_AGE_DAYS {
            return Err(ConfigError::Invalid(format!(
                "cookie.max_age_days must be at most {MAX_COOKIE_MAX_AGE_DAYS}"
            )));
        }
        Ok(())
    }
}

/// Audit sink kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Drop audit events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to `path`.
    File,
}

/// Audit sink selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Output path for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates that `path` is present exactly for the file sink.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path requires sink = \"file\"".to_string()))
            }
            (_, None) => Ok(()),
        }
    }

    /// Builds the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit file cannot be opened.
    pub fn build_sink(&self) -> Result<Arc<dyn ConsentAuditSink>, ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
            (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
            (AuditSinkKind::File, Some(path)) => {
                let sink = JsonlAuditSink::open(Path::new(path))
                    .map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI, environment, or the default name.
fn resolve_path(path: Option<&Path>, env_path: Option<String>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Some(env_path) = env_path {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a two-letter ASCII code.
fn validate_letter_code(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.len() == 2 && value.bytes().all(|byte| byte.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{field} must be two ascii letters")))
    }
}

/// Default CMP id.
const fn default_cmp_id() -> u16 {
    DEFAULT_CMP_ID
}

/// Default `1` for 12-bit fields.
const fn default_one_u16() -> u16 {
    1
}

/// Default `1` for 6-bit fields.
const fn default_one_u8() -> u8 {
    1
}

/// Default consent cookie lifetime.
const fn default_cookie_max_age_days() -> u32 {
    DEFAULT_COOKIE_MAX_AGE_DAYS
}

/// Default consent language.
fn default_consent_language() -> String {
    "EN".to_string()
}

/// Default publisher country code.
fn default_publisher_country_code() -> String {
    "AA".to_string()
}

/// Serde default for `true` flags.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Tests
// ============================================================================
