// crates/fides-consent-cli/src/main.rs
// ============================================================================
// Module: Fides Consent CLI Entry Point
// Description: Command dispatcher for offline consent string tooling.
// Purpose: Decode and encode TC and GPP strings, resolve decisions, validate config.
// Dependencies: clap, fides-consent-config, fides-consent-core, serde, thiserror, time.
// ============================================================================

//! ## Overview
//! The `fides-consent` CLI exposes the consent engine's codecs and resolver
//! for offline use. Experiences, decisions, cookies, and preferences are read
//! from bounded JSON files; results are written to stdout as canonical JSON.
//! Errors go to stderr with a failure exit code. User-facing strings are
//! routed through the message catalog.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use fides_consent_cli::t;
use fides_consent_config::FidesConsentConfig;
use fides_consent_core::ConsentCookie;
use fides_consent_core::ConsentDecision;
use fides_consent_core::ConsentSources;
use fides_consent_core::Experience;
use fides_consent_core::Fallback;
use fides_consent_core::GppSectionId;
use fides_consent_core::GppString;
use fides_consent_core::SavedPreferences;
use fides_consent_core::TcModel;
use fides_consent_core::Timestamp;
use fides_consent_core::codec::gpp;
use fides_consent_core::codec::tcf;
use fides_consent_core::resolve;
use fides_consent_core::runtime::ConsentAuditEvent;
use fides_consent_core::runtime::ConsentAuditRecord;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of an experience JSON input.
const MAX_EXPERIENCE_BYTES: usize = 4 * 1024 * 1024;
/// Maximum size of a decision JSON input.
const MAX_DECISION_BYTES: usize = 1024 * 1024;
/// Maximum size of a consent cookie JSON input.
const MAX_COOKIE_BYTES: usize = 64 * 1024;
/// Maximum size of a saved preferences JSON input.
const MAX_PREFERENCES_BYTES: usize = 1024 * 1024;
/// Maximum size of a TC, GPP, or fides string argument.
const MAX_STRING_ARG_BYTES: usize = 16 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "fides-consent", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// TC string utilities.
    Tc {
        /// Selected TC subcommand.
        #[command(subcommand)]
        command: TcCommand,
    },
    /// GPP string utilities.
    Gpp {
        /// Selected GPP subcommand.
        #[command(subcommand)]
        command: GppCommand,
    },
    /// Resolve the authoritative decision for an experience.
    Resolve(ResolveCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// TC string subcommands.
#[derive(Subcommand, Debug)]
enum TcCommand {
    /// Decode a TC string into its fields.
    Decode(TcDecodeCommand),
    /// Encode a decision as a TC string.
    Encode(TcEncodeCommand),
}

/// GPP string subcommands.
#[derive(Subcommand, Debug)]
enum GppCommand {
    /// Decode a GPP string into its sections.
    Decode(GppDecodeCommand),
    /// Compose a GPP string from a decision.
    Compose(GppComposeCommand),
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a config file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `tc decode`.
#[derive(Args, Debug)]
struct TcDecodeCommand {
    /// TC string to decode.
    #[arg(value_name = "STRING")]
    tc_string: String,
}

/// Arguments for `tc encode`.
#[derive(Args, Debug)]
struct TcEncodeCommand {
    /// Path to the experience JSON file.
    #[arg(long, value_name = "PATH")]
    experience: PathBuf,
    /// Path to the decision JSON file.
    #[arg(long, value_name = "PATH")]
    decision: PathBuf,
    /// Optional config file supplying CMP metadata (defaults apply when omitted).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the encoding time (unix milliseconds).
    #[arg(long, value_name = "UNIX_MS")]
    timestamp_ms: Option<i64>,
    /// Append the disclosed-vendors segment.
    #[arg(long, action = ArgAction::SetTrue)]
    disclosed_vendors: bool,
}

/// Arguments for `gpp decode`.
#[derive(Args, Debug)]
struct GppDecodeCommand {
    /// GPP string to decode.
    #[arg(value_name = "STRING")]
    gpp_string: String,
}

/// Arguments for `gpp compose`.
#[derive(Args, Debug)]
struct GppComposeCommand {
    /// Path to the experience JSON file.
    #[arg(long, value_name = "PATH")]
    experience: PathBuf,
    /// Path to the decision JSON file.
    #[arg(long, value_name = "PATH")]
    decision: PathBuf,
    /// Optional config file supplying GPP settings (defaults apply when omitted).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the encoding time for an embedded TC string (unix milliseconds).
    #[arg(long, value_name = "UNIX_MS")]
    timestamp_ms: Option<i64>,
    /// Assert Global Privacy Control in sections that carry it.
    #[arg(long, action = ArgAction::SetTrue)]
    gpc: bool,
}

/// Arguments for `resolve`.
#[derive(Args, Debug)]
struct ResolveCommand {
    /// Path to the experience JSON file.
    #[arg(long, value_name = "PATH")]
    experience: PathBuf,
    /// Path to a consent cookie JSON file.
    #[arg(long, value_name = "PATH")]
    cookie: Option<PathBuf>,
    /// Path to a saved preferences JSON file.
    #[arg(long, value_name = "PATH")]
    preferences: Option<PathBuf>,
    /// Override fides string (`<tc>,<gpp>`).
    #[arg(long = "override", value_name = "STRING")]
    override_string: Option<String>,
    /// Assert Global Privacy Control.
    #[arg(long, action = ArgAction::SetTrue)]
    gpc: bool,
    /// Optional config file supplying overrides and the audit sink.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the resolution time (unix milliseconds).
    #[arg(long, value_name = "UNIX_MS")]
    timestamp_ms: Option<i64>,
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to fides-consent.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Output Types
// ============================================================================

/// Output of `tc decode`.
#[derive(Serialize)]
struct TcDecodeReport {
    /// Decoded model.
    model: TcModel,
    /// Creation time rendered as RFC 3339.
    created_at: String,
    /// Last update time rendered as RFC 3339.
    last_updated_at: String,
}

/// Output of `tc encode`.
#[derive(Serialize)]
struct TcEncodeReport {
    /// Encoded TC string.
    tc_string: String,
}

/// Output of `gpp decode`.
#[derive(Serialize)]
struct GppDecodeReport {
    /// Section ids listed in the header.
    section_ids: BTreeSet<GppSectionId>,
    /// Decoded section payloads.
    gpp: GppString,
}

/// Output of `gpp compose`.
#[derive(Serialize)]
struct GppComposeReport {
    /// Sections applicable to the experience.
    section_ids: BTreeSet<GppSectionId>,
    /// Composed GPP string; absent when no section applies.
    gpp_string: Option<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Errors returned by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Tc {
            command,
        } => match command {
            TcCommand::Decode(command) => command_tc_decode(&command),
            TcCommand::Encode(command) => command_tc_encode(&command),
        },
        Commands::Gpp {
            command,
        } => match command {
            GppCommand::Decode(command) => command_gpp_decode(&command),
            GppCommand::Compose(command) => command_gpp_compose(&command),
        },
        Commands::Resolve(command) => command_resolve(&command),
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate(command) => command_config_validate(&command),
        },
    }
}

/// Prints the top-level help text.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: TC Commands
// ============================================================================

/// Executes `tc decode`.
fn command_tc_decode(command: &TcDecodeCommand) -> CliResult<ExitCode> {
    ensure_string_limit(&command.tc_string, &t!("input.kind.tc_string"))?;
    let model = tcf::decode(&command.tc_string)
        .map_err(|err| CliError::new(t!("tc.decode.failed", error = err)))?;
    let report = TcDecodeReport {
        created_at: format_timestamp(model.created)?,
        last_updated_at: format_timestamp(model.last_updated)?,
        model,
    };
    write_json(&report)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `tc encode`.
fn command_tc_encode(command: &TcEncodeCommand) -> CliResult<ExitCode> {
    let experience: Experience =
        read_json_file(&command.experience, &t!("input.kind.experience"), MAX_EXPERIENCE_BYTES)?;
    let decision: ConsentDecision =
        read_json_file(&command.decision, &t!("input.kind.decision"), MAX_DECISION_BYTES)?;
    let config = load_optional_config(command.config.as_deref())?;
    let decision = checked_decision(&decision, &experience)?;

    let mut options = config.to_engine_config().tcf;
    if command.disclosed_vendors {
        options.include_disclosed_vendors = true;
    }
    let now = now_timestamp(command.timestamp_ms)?;
    let tc_string = tcf::encode(&decision, &experience, now, &options)
        .map_err(|err| CliError::new(t!("tc.encode.failed", error = err)))?;
    write_json(&TcEncodeReport {
        tc_string,
    })?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: GPP Commands
// ============================================================================

/// Executes `gpp decode`.
fn command_gpp_decode(command: &GppDecodeCommand) -> CliResult<ExitCode> {
    ensure_string_limit(&command.gpp_string, &t!("input.kind.gpp_string"))?;
    let gpp = gpp::decode_gpp(&command.gpp_string)
        .map_err(|err| CliError::new(t!("gpp.decode.failed", error = err)))?;
    write_json(&GppDecodeReport {
        section_ids: gpp.section_ids(),
        gpp,
    })?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `gpp compose`.
///
/// GPP is always enabled for this command; the config only tunes section
/// selection and MSPA fields.
fn command_gpp_compose(command: &GppComposeCommand) -> CliResult<ExitCode> {
    let experience: Experience =
        read_json_file(&command.experience, &t!("input.kind.experience"), MAX_EXPERIENCE_BYTES)?;
    let decision: ConsentDecision =
        read_json_file(&command.decision, &t!("input.kind.decision"), MAX_DECISION_BYTES)?;
    let config = load_optional_config(command.config.as_deref())?;
    let decision = checked_decision(&decision, &experience)?;

    let engine = config.to_engine_config();
    let mut settings = engine.gpp;
    settings.enabled = true;
    let tc_string = if settings.enable_tcfeu_string && engine.tcf_enabled && experience.is_tcf()
    {
        let now = now_timestamp(command.timestamp_ms)?;
        let tc = tcf::encode(&decision, &experience, now, &engine.tcf)
            .map_err(|err| CliError::new(t!("tc.encode.failed", error = err)))?;
        Some(tc)
    } else {
        None
    };
    let gpc = command.gpc || engine.gpc_enabled;
    let composed =
        gpp::sections_for_decision(&decision, &experience, &settings, tc_string.as_deref(), gpc)
            .map_err(|err| CliError::new(t!("gpp.compose.failed", error = err)))?;
    let gpp_string = if composed.sections.is_empty() {
        None
    } else {
        let encoded = composed
            .encode()
            .map_err(|err| CliError::new(t!("gpp.compose.failed", error = err)))?;
        Some(encoded)
    };
    write_json(&GppComposeReport {
        section_ids: composed.section_ids(),
        gpp_string,
    })?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Resolve Command
// ============================================================================

/// Executes `resolve`.
fn command_resolve(command: &ResolveCommand) -> CliResult<ExitCode> {
    let experience: Experience =
        read_json_file(&command.experience, &t!("input.kind.experience"), MAX_EXPERIENCE_BYTES)?;
    let cookie: Option<ConsentCookie> = command
        .cookie
        .as_deref()
        .map(|path| read_json_file(path, &t!("input.kind.cookie"), MAX_COOKIE_BYTES))
        .transpose()?;
    let preferences: Option<SavedPreferences> = command
        .preferences
        .as_deref()
        .map(|path| read_json_file(path, &t!("input.kind.preferences"), MAX_PREFERENCES_BYTES))
        .transpose()?;
    let config = load_optional_config(command.config.as_deref())?;
    let engine = config.to_engine_config();

    let override_string = command.override_string.clone().or(engine.override_string);
    if let Some(raw) = &override_string {
        ensure_string_limit(raw, &t!("input.kind.override"))?;
    }
    let now = now_timestamp(command.timestamp_ms)?;
    let sources = ConsentSources {
        override_string: override_string.as_deref(),
        preferences: preferences.as_ref(),
        cookie: cookie.as_ref(),
        experience: Some(&experience),
        now,
        gpc_enabled: command.gpc || engine.gpc_enabled,
    };
    let resolution = resolve(&sources).ok_or_else(|| CliError::new(t!("resolve.failed")))?;

    let sink = config
        .audit
        .build_sink()
        .map_err(|err| CliError::new(t!("config.audit_failed", error = err)))?;
    sink.record(&ConsentAuditEvent::new(now, ConsentAuditRecord::Resolution {
        experience_id: experience.id.to_string(),
        source: resolution.source,
        issues: resolution.issues.clone(),
    }));
    write_json(&resolution)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = FidesConsentConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    write_stdout_line(&t!("config.validate.ok"))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Loads the config when a path is given; otherwise returns defaults.
fn load_optional_config(path: Option<&Path>) -> CliResult<FidesConsentConfig> {
    match path {
        Some(path) => FidesConsentConfig::load(Some(path))
            .map_err(|err| CliError::new(t!("config.load_failed", error = err))),
        None => Ok(FidesConsentConfig::default()),
    }
}

// ============================================================================
// SECTION: Decision Helpers
// ============================================================================

/// Rejects decisions naming slots the experience lacks, then fills gaps
/// with experience defaults.
fn checked_decision(
    decision: &ConsentDecision,
    experience: &Experience,
) -> CliResult<ConsentDecision> {
    let unknown = decision.unknown_fields(experience);
    if !unknown.is_empty() {
        let fields = unknown.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        return Err(CliError::new(t!("decision.unknown_fields", fields = fields)));
    }
    Ok(decision.normalized(experience, Fallback::ExperienceDefault))
}

// ============================================================================
// SECTION: Time Helpers
// ============================================================================

/// Returns the override timestamp or the current wall clock.
fn now_timestamp(override_ms: Option<i64>) -> CliResult<Timestamp> {
    if let Some(millis) = override_ms {
        return Ok(Timestamp::from_unix_millis(millis));
    }
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    let millis =
        i64::try_from(nanos / 1_000_000).map_err(|_| CliError::new(t!("time.clock_failed")))?;
    Ok(Timestamp::from_unix_millis(millis))
}

/// Renders a timestamp as RFC 3339.
fn format_timestamp(timestamp: Timestamp) -> CliResult<String> {
    let millis = timestamp.as_unix_millis();
    let nanos = i128::from(millis) * 1_000_000;
    let datetime = OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|err| CliError::new(t!("time.format_failed", value = millis, error = err)))?;
    datetime
        .format(&Rfc3339)
        .map_err(|err| CliError::new(t!("time.format_failed", value = millis, error = err)))
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Rejects command-line strings above the argument size limit.
fn ensure_string_limit(value: &str, kind: &str) -> CliResult<()> {
    if value.len() > MAX_STRING_ARG_BYTES {
        return Err(CliError::new(t!(
            "input.string_too_large",
            kind = kind,
            limit = MAX_STRING_ARG_BYTES
        )));
    }
    Ok(())
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let metadata = file.metadata().map_err(ReadLimitError::Io)?;
    let size = metadata.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        return Err(ReadLimitError::TooLarge {
            size: actual,
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Reads and parses a bounded JSON input file.
fn read_json_file<T: DeserializeOwned>(path: &Path, kind: &str, max_bytes: usize) -> CliResult<T> {
    let bytes = read_bytes_with_limit(path, max_bytes).map_err(|err| match err {
        ReadLimitError::Io(err) => CliError::new(t!(
            "input.read_failed",
            kind = kind,
            path = path.display(),
            error = err
        )),
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(t!(
            "input.read_too_large",
            kind = kind,
            path = path.display(),
            size = size,
            limit = limit
        )),
    })?;
    serde_json::from_slice(&bytes).map_err(|err| {
        CliError::new(t!("input.parse_failed", kind = kind, path = path.display(), error = err))
    })
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a value to stdout as canonical JSON followed by a newline.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let value = serde_json::to_value(value)
        .map_err(|err| CliError::new(t!("output.json_failed", error = err)))?;
    let mut bytes = serde_jcs::to_vec(&value)
        .map_err(|err| CliError::new(t!("output.json_failed", error = err)))?;
    bytes.push(b'\n');
    let mut stdout = std::io::stdout();
    stdout.write_all(&bytes).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
