// crates/budget-enforcer-cli/src/main.rs
// ============================================================================
// Module: Budget Enforcer CLI Entry Point
// Description: Command dispatcher for synthesis, validation, and enforcement.
// Purpose: Render the stack template and run sweeps outside the function.
// Dependencies: budget-enforcer-{aws,config,core,stack}, clap, thiserror, tokio
// ============================================================================

//! ## Overview
//! `synth` renders the CloudFormation template from the environment and an
//! optional TOML file. `config validate` checks the same inputs without
//! rendering. `policy` prints the deny-all document. `enforce` replays an SNS
//! event through the sweep, either against the live account or, with
//! `--dry-run`, against an in-memory directory seeded from the command line.
//!
//! Exit codes: 0 on success, 1 on error, 2 when an enforcement sweep
//! completed but left principals unlocked.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use budget_enforcer_aws::AwsClientOptions;
use budget_enforcer_aws::AwsIdentityDirectory;
use budget_enforcer_config::DEFAULT_DOTENV_NAME;
use budget_enforcer_config::EnforcerConfig;
use budget_enforcer_config::EnvSource;
use budget_enforcer_config::StackConfig;
use budget_enforcer_core::AccountId;
use budget_enforcer_core::DenyAllPolicy;
use budget_enforcer_core::EnforcementAuditSink;
use budget_enforcer_core::EnforcementEvent;
use budget_enforcer_core::EnforcementOutcome;
use budget_enforcer_core::Enforcer;
use budget_enforcer_core::FileAuditSink;
use budget_enforcer_core::IdentityDirectory;
use budget_enforcer_core::InMemoryIdentityDirectory;
use budget_enforcer_core::StderrAuditSink;
use budget_enforcer_core::is_valid_policy_name;
use budget_enforcer_stack::synthesize;
use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of an event payload file; matches the SNS message limit.
const MAX_EVENT_BYTES: usize = 256 * 1024;
/// Account used by dry runs when neither the flag nor the event names one.
const DRY_RUN_ACCOUNT: &str = "000000000000";
/// Exit code for a sweep that completed with principal failures.
const EXIT_PARTIAL: u8 = 2;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "budget-enforcer", disable_help_subcommand = true, disable_version_flag = true)]
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
    /// Render the CloudFormation template.
    Synth(SynthCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Print the deny-all policy document.
    Policy(PolicyCommand),
    /// Run an enforcement sweep for an SNS event payload.
    Enforce(EnforceCommand),
}

/// Arguments for `synth`.
#[derive(Args, Debug)]
struct SynthCommand {
    /// Optional config file path (defaults to budget-enforcer.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Write the template to this file instead of stdout.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate stack configuration without rendering.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to budget-enforcer.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `policy`.
#[derive(Args, Debug)]
struct PolicyCommand {
    /// Managed policy name to report alongside the document.
    #[arg(long, value_name = "NAME")]
    name: Option<String>,
}

/// Arguments for `enforce`.
#[derive(Args, Debug)]
struct EnforceCommand {
    /// Path to the SNS event JSON.
    #[arg(long, value_name = "PATH")]
    event: PathBuf,
    /// Run against an in-memory directory instead of the live account.
    #[arg(long, action = ArgAction::SetTrue)]
    dry_run: bool,
    /// Dry-run user to seed (repeatable).
    #[arg(long = "user", value_name = "NAME", requires = "dry_run")]
    users: Vec<String>,
    /// Dry-run group to seed (repeatable).
    #[arg(long = "group", value_name = "NAME", requires = "dry_run")]
    groups: Vec<String>,
    /// Dry-run account id (defaults to the event's account).
    #[arg(long, value_name = "ID", requires = "dry_run")]
    account: Option<String>,
    /// Region override for the live account.
    #[arg(long, value_name = "REGION", conflicts_with = "dry_run")]
    region: Option<String>,
    /// Endpoint override for the live account.
    #[arg(long, value_name = "URL", conflicts_with = "dry_run")]
    endpoint: Option<String>,
    /// Append audit events to this file instead of stderr.
    #[arg(long, value_name = "PATH")]
    audit_log: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Bounded read failures.
#[derive(Debug, Error)]
enum ReadLimitError {
    /// The file could not be read.
    #[error("{0}")]
    Io(std::io::Error),
    /// The file exceeds the size limit.
    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Limit in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        write_stdout_line(&format!("budget-enforcer {}", env!("CARGO_PKG_VERSION")))
            .map_err(|err| CliError::new(output_error(&err)))?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };
    match command {
        Commands::Synth(command) => command_synth(&command),
        Commands::Config {
            command,
        } => command_config(&command),
        Commands::Policy(command) => command_policy(&command),
        Commands::Enforce(command) => command_enforce(command).await,
    }
}

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let help = Cli::command().render_help().to_string();
    write_stdout_line(help.trim_end()).map_err(|err| CliError::new(output_error(&err)))
}

// ============================================================================
// SECTION: Stack Commands
// ============================================================================

/// Executes `synth`.
fn command_synth(command: &SynthCommand) -> CliResult<ExitCode> {
    let config = load_stack_config(command.config.as_deref())?;
    let template = synthesize(&config)
        .map_err(|err| CliError::new(format!("synthesis failed: {err}")))?;
    match &command.output {
        Some(path) => {
            template
                .write(path)
                .map_err(|err| CliError::new(format!("synthesis failed: {err}")))?;
            write_stdout_line(&format!("wrote {}", path.display()))
                .map_err(|err| CliError::new(output_error(&err)))?;
        }
        None => {
            let rendered = template
                .to_json_pretty()
                .map_err(|err| CliError::new(format!("synthesis failed: {err}")))?;
            write_stdout_bytes(rendered.as_bytes())
                .map_err(|err| CliError::new(output_error(&err)))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Dispatches config subcommands.
fn command_config(command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(command),
    }
}

/// Executes `config validate`.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = load_stack_config(command.config.as_deref())?;
    let target = config.account.as_ref().map_or_else(
        || format!("region {}", config.region),
        |account| format!("account {account} in region {}", config.region),
    );
    write_stdout_line(&format!(
        "config ok: budget {} notifies {} ({target})",
        config.budget_name(),
        config.notification_email
    ))
    .map_err(|err| CliError::new(output_error(&err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Loads stack config from the process environment over `./.env`.
fn load_stack_config(path: Option<&Path>) -> CliResult<StackConfig> {
    StackConfig::load(path, &cli_env()?)
        .map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// Returns the process environment with `./.env` filling unset keys.
fn cli_env() -> CliResult<EnvSource> {
    EnvSource::process()
        .with_dotenv(Path::new(DEFAULT_DOTENV_NAME))
        .map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// Executes `policy`.
fn command_policy(command: &PolicyCommand) -> CliResult<ExitCode> {
    let policy = match &command.name {
        Some(name) if !is_valid_policy_name(name) => {
            return Err(CliError::new(format!("'{name}' is not a valid IAM policy name")));
        }
        Some(name) => DenyAllPolicy::named(name.clone()),
        None => DenyAllPolicy::default(),
    };
    let value = serde_json::json!({
        "PolicyName": policy.name,
        "Description": policy.description,
        "PolicyDocument": policy.document,
    });
    write_json_value(&value)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Enforcement Command
// ============================================================================

/// Executes `enforce`.
async fn command_enforce(command: EnforceCommand) -> CliResult<ExitCode> {
    let bytes = read_bytes_with_limit(&command.event, MAX_EVENT_BYTES).map_err(|err| {
        CliError::new(format!("failed to read event {}: {err}", command.event.display()))
    })?;
    let payload: Value = serde_json::from_slice(&bytes)
        .map_err(|err| CliError::new(format!("event is not valid json: {err}")))?;
    let config = EnforcerConfig::from_env(&cli_env()?)
        .map_err(|err| CliError::new(format!("config load failed: {err}")))?;
    let audit: Arc<dyn EnforcementAuditSink> = match &command.audit_log {
        Some(path) => Arc::new(FileAuditSink::new(path).map_err(|err| {
            CliError::new(format!("failed to open audit log {}: {err}", path.display()))
        })?),
        None => Arc::new(StderrAuditSink),
    };
    let directory: Arc<dyn IdentityDirectory> = if command.dry_run {
        Arc::new(dry_run_directory(&command, &payload)?)
    } else {
        Arc::new(
            AwsIdentityDirectory::load(AwsClientOptions {
                region: command.region,
                endpoint: command.endpoint,
            })
            .await,
        )
    };
    let enforcer = Enforcer::new(directory, config.to_settings(), audit);
    let outcome = enforcer
        .enforce(&payload)
        .await
        .map_err(|err| CliError::new(format!("enforcement failed: {err}")))?;
    let value = serde_json::to_value(&outcome)
        .map_err(|err| CliError::new(format!("failed to render outcome: {err}")))?;
    write_json_value(&value)?;
    Ok(ExitCode::from(exit_status_for(&outcome)))
}

/// Seeds an in-memory directory for a dry run.
fn dry_run_directory(
    command: &EnforceCommand,
    payload: &Value,
) -> CliResult<InMemoryIdentityDirectory> {
    let account = match &command.account {
        Some(raw) => AccountId::parse(raw)
            .ok_or_else(|| CliError::new(format!("'{raw}' is not a 12-digit account id")))?,
        None => EnforcementEvent::from_value(payload)
            .ok()
            .and_then(|event| event.origin_account().cloned())
            .unwrap_or_else(|| AccountId::new(DRY_RUN_ACCOUNT)),
    };
    Ok(InMemoryIdentityDirectory::new(account)
        .with_users(command.users.iter().cloned())
        .with_groups(command.groups.iter().cloned()))
}

/// Maps an outcome to the process exit status.
fn exit_status_for(outcome: &EnforcementOutcome) -> u8 {
    match outcome.summary() {
        Some(summary) if !summary.is_clean() => EXIT_PARTIAL,
        _ => 0,
    }
}

// ============================================================================
// SECTION: I/O Helpers
// ============================================================================

/// Reads a file, refusing anything larger than `max_bytes`.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
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
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Writes pretty JSON and a trailing newline to stdout.
fn write_json_value(value: &Value) -> CliResult<()> {
    let mut bytes = serde_json::to_vec_pretty(value)
        .map_err(|err| CliError::new(format!("failed to render json: {err}")))?;
    bytes.push(b'\n');
    write_stdout_bytes(&bytes).map_err(|err| CliError::new(output_error(&err)))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output failure.
fn output_error(err: &std::io::Error) -> String {
    format!("failed to write output: {err}")
}

/// Prints an error and returns the failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
