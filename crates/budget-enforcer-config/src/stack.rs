// crates/budget-enforcer-config/src/stack.rs
// ============================================================================
// Module: Stack Configuration
// Description: Provisioning settings for the budget enforcer stack.
// Purpose: Resolve email, limit, and deployment target before rendering.
// Dependencies: budget-enforcer-core, serde, toml
// ============================================================================

//! ## Overview
//! [`StackConfig`] is assembled from an optional TOML file and the
//! environment, with environment values taking precedence. The notification
//! email is mandatory; a missing email fails before anything is rendered. The
//! budget limit tolerates bad input by falling back to
//! [`DEFAULT_BUDGET_LIMIT_USD`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use budget_enforcer_core::AccountId;
use serde::Deserialize;
use serde::Serialize;

use crate::enforcer::EnforcerConfig;
use crate::env::EnvSource;
use crate::error::ConfigError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "budget-enforcer.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "BUDGET_ENFORCER_CONFIG";
/// Notification email address.
pub const NOTIFICATION_EMAIL_VAR: &str = "NOTIFICATION_EMAIL";
/// Monthly budget limit in USD.
pub const BUDGET_LIMIT_VAR: &str = "BUDGET_LIMIT_USD";
/// Deployment account.
pub const ACCOUNT_VAR: &str = "CDK_DEFAULT_ACCOUNT";
/// Deployment region.
pub const REGION_VAR: &str = "CDK_DEFAULT_REGION";

/// Budget limit used when none is configured or the value is unusable.
pub const DEFAULT_BUDGET_LIMIT_USD: f64 = 50.0;
/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";
/// Stack name used when none is configured.
pub const DEFAULT_STACK_NAME: &str = "BudgetEnforcerStack";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 64 * 1024;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum email address length.
const MAX_EMAIL_LENGTH: usize = 254;
/// Maximum CloudFormation stack name length.
const MAX_STACK_NAME_LENGTH: usize = 128;

// ============================================================================
// SECTION: File Model
// ============================================================================

/// Raw TOML file contents; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StackFile {
    /// Stack name.
    stack_name: Option<String>,
    /// Notification email address.
    notification_email: Option<String>,
    /// Monthly limit in USD.
    budget_limit_usd: Option<f64>,
    /// Deployment account.
    account: Option<String>,
    /// Deployment region.
    region: Option<String>,
    /// Enforcer runtime settings.
    #[serde(default)]
    enforcer: EnforcerConfig,
}

// ============================================================================
// SECTION: Config
// ============================================================================

/// Provisioning settings for the stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackConfig {
    /// CloudFormation stack name.
    pub stack_name: String,
    /// Address that receives every threshold email.
    pub notification_email: String,
    /// Monthly limit in USD; always finite and positive.
    pub budget_limit_usd: f64,
    /// Deployment account, when pinned.
    pub account: Option<AccountId>,
    /// Deployment region.
    pub region: String,
    /// Settings baked into the enforcement function environment.
    pub enforcer: EnforcerConfig,
}

impl StackConfig {
    /// Builds the config from the environment alone.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when no notification email is set,
    /// or another [`ConfigError`] when a value is invalid.
    pub fn from_env(env: &EnvSource) -> Result<Self, ConfigError> {
        Self::merge(StackFile::default(), env)
    }

    /// Loads the config file (if any) and overlays the environment.
    ///
    /// The file is `path` when given, else `BUDGET_ENFORCER_CONFIG`, else
    /// `budget-enforcer.toml` when it exists in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed, or the
    /// merged settings are invalid.
    pub fn load(path: Option<&Path>, env: &EnvSource) -> Result<Self, ConfigError> {
        let file = match resolve_path(path, env)? {
            Some(resolved) => read_file(&resolved)?,
            None => StackFile::default(),
        };
        Self::merge(file, env)
    }

    /// Parses TOML text and overlays the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str, env: &EnvSource) -> Result<Self, ConfigError> {
        let file: StackFile =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        Self::merge(file, env)
    }

    /// Returns the budget name derived from the limit.
    #[must_use]
    pub fn budget_name(&self) -> String {
        format!("Monthly-{}USD-Limit", self.budget_limit_usd)
    }

    /// Validates the merged settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a setting is malformed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_email(&self.notification_email)?;
        validate_stack_name(&self.stack_name)?;
        validate_region(&self.region)?;
        if !self.budget_limit_usd.is_finite() || self.budget_limit_usd <= 0.0 {
            return Err(ConfigError::Invalid("budget limit must be positive".to_string()));
        }
        self.enforcer.validate()
    }

    /// Applies environment precedence over file values and validates.
    fn merge(file: StackFile, env: &EnvSource) -> Result<Self, ConfigError> {
        let notification_email = env
            .get(NOTIFICATION_EMAIL_VAR)?
            .or_else(|| file.notification_email.map(|email| email.trim().to_string()))
            .filter(|email| !email.is_empty())
            .ok_or(ConfigError::Missing(NOTIFICATION_EMAIL_VAR))?;
        let budget_limit_usd = match env.get(BUDGET_LIMIT_VAR)? {
            Some(raw) => parse_budget_limit(Some(&raw)),
            None => sanitize_budget_limit(file.budget_limit_usd),
        };
        let account = match env.get(ACCOUNT_VAR)?.or(file.account) {
            Some(raw) => Some(AccountId::parse(&raw).ok_or_else(|| {
                ConfigError::Invalid(format!("{ACCOUNT_VAR} must be a 12-digit account id"))
            })?),
            None => None,
        };
        let region = env
            .get(REGION_VAR)?
            .or(file.region)
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let mut enforcer = file.enforcer;
        enforcer.apply_env(env)?;
        let config = Self {
            stack_name: file.stack_name.unwrap_or_else(|| DEFAULT_STACK_NAME.to_string()),
            notification_email,
            budget_limit_usd,
            account,
            region,
            enforcer,
        };
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// SECTION: Budget Limit
// ============================================================================

/// Parses a raw budget limit, falling back to the default.
///
/// Unset, blank, non-numeric, zero, negative, and non-finite values all yield
/// [`DEFAULT_BUDGET_LIMIT_USD`].
#[must_use]
pub fn parse_budget_limit(raw: Option<&str>) -> f64 {
    sanitize_budget_limit(raw.and_then(|value| value.trim().parse::<f64>().ok()))
}

/// Replaces unusable limits with the default.
fn sanitize_budget_limit(value: Option<f64>) -> f64 {
    value.filter(|limit| limit.is_finite() && *limit > 0.0).unwrap_or(DEFAULT_BUDGET_LIMIT_USD)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves which config file to read, if any.
fn resolve_path(path: Option<&Path>, env: &EnvSource) -> Result<Option<PathBuf>, ConfigError> {
    let resolved = if let Some(path) = path {
        path.to_path_buf()
    } else if let Some(env_path) = env.get(CONFIG_ENV_VAR)? {
        PathBuf::from(env_path)
    } else {
        let default = PathBuf::from(DEFAULT_CONFIG_NAME);
        if !default.is_file() {
            return Ok(None);
        }
        default
    };
    if resolved.to_string_lossy().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    Ok(Some(resolved))
}

/// Reads and parses a config file with size limits.
fn read_file(path: &Path) -> Result<StackFile, ConfigError> {
    let bytes = fs::read(path)
        .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
    if bytes.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
    }
    let content = std::str::from_utf8(&bytes)
        .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
    toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
}

/// Checks an email address has a local part, a dotted domain, and no spaces.
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let invalid = || {
        ConfigError::Invalid(format!("{NOTIFICATION_EMAIL_VAR} '{email}' is not an email address"))
    };
    if email.len() > MAX_EMAIL_LENGTH || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(invalid());
    }
    if domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid());
    }
    Ok(())
}

/// Checks a CloudFormation stack name.
fn validate_stack_name(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_STACK_NAME_LENGTH
        && name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("stack name '{name}' is not valid")))
    }
}

/// Checks a region code such as `us-east-1`.
fn validate_region(region: &str) -> Result<(), ConfigError> {
    let valid = !region.is_empty()
        && region.contains('-')
        && region.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{REGION_VAR} '{region}' is not a region code")))
    }
}
