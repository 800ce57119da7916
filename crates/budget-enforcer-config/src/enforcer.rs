// crates/budget-enforcer-config/src/enforcer.rs
// ============================================================================
// Module: Enforcer Configuration
// Description: Runtime settings for the enforcement function.
// Purpose: Parse and bound sweep settings before any IAM call is made.
// Dependencies: budget-enforcer-core, serde
// ============================================================================

//! ## Overview
//! [`EnforcerConfig`] is read from the function environment (or the
//! `[enforcer]` table of the stack file) and converted into
//! [`EnforcerSettings`]. The stack renderer writes the same keys back into the
//! function environment, so the two directions share one list of names.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use budget_enforcer_core::AccountId;
use budget_enforcer_core::DenyAllPolicy;
use budget_enforcer_core::EnforcerSettings;
use budget_enforcer_core::RetryPolicy;
use budget_enforcer_core::core::policy::DEFAULT_DENY_POLICY_NAME;
use budget_enforcer_core::is_valid_policy_name;
use budget_enforcer_core::runtime::engine::DEFAULT_PAGE_SIZE;
use budget_enforcer_core::runtime::engine::MAX_PAGE_SIZE;
use budget_enforcer_core::runtime::retry::DEFAULT_BASE_DELAY;
use budget_enforcer_core::runtime::retry::DEFAULT_MAX_ATTEMPTS;
use budget_enforcer_core::runtime::retry::DEFAULT_MAX_DELAY;
use serde::Deserialize;
use serde::Serialize;

use crate::env::EnvSource;
use crate::error::ConfigError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Deny-all policy name.
pub const DENY_POLICY_NAME_VAR: &str = "DENY_POLICY_NAME";
/// Listing page size.
pub const PAGE_SIZE_VAR: &str = "ENFORCER_PAGE_SIZE";
/// Maximum attempts per call.
pub const MAX_ATTEMPTS_VAR: &str = "ENFORCER_MAX_ATTEMPTS";
/// First retry delay.
pub const BASE_DELAY_MS_VAR: &str = "ENFORCER_BASE_DELAY_MS";
/// Retry delay cap.
pub const MAX_DELAY_MS_VAR: &str = "ENFORCER_MAX_DELAY_MS";
/// Sweep deadline.
pub const TIMEOUT_SECS_VAR: &str = "ENFORCER_TIMEOUT_SECS";
/// Account guard.
pub const EXPECTED_ACCOUNT_VAR: &str = "ENFORCER_EXPECTED_ACCOUNT";

/// Upper bound on attempts per call.
pub const MAX_ATTEMPTS_LIMIT: u32 = 10;
/// Upper bound on a single retry delay in milliseconds.
pub const MAX_DELAY_LIMIT_MS: u64 = 60_000;
/// Default sweep deadline in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 50;
/// Lambda hard limit on function duration.
pub const MAX_FUNCTION_TIMEOUT_SECS: u64 = 900;
/// Headroom between the sweep deadline and the function timeout, so a timed
/// out sweep still records its abort and returns an error.
pub const FUNCTION_TIMEOUT_MARGIN_SECS: u64 = 10;
/// Upper bound on the sweep deadline.
pub const MAX_TIMEOUT_SECS: u64 = MAX_FUNCTION_TIMEOUT_SECS - FUNCTION_TIMEOUT_MARGIN_SECS;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Enforcement function settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnforcerConfig {
    /// Deny-all policy name.
    pub policy_name: String,
    /// Page size for IAM listings.
    pub page_size: u16,
    /// Maximum attempts per identity API call.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Cap on a single retry delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Sweep deadline in seconds.
    pub timeout_secs: u64,
    /// Account events must originate from.
    pub expected_account: Option<String>,
}

impl Default for EnforcerConfig {
    fn default() -> Self {
        Self {
            policy_name: DEFAULT_DENY_POLICY_NAME.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: duration_ms(DEFAULT_BASE_DELAY),
            max_delay_ms: duration_ms(DEFAULT_MAX_DELAY),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            expected_account: None,
        }
    }
}

impl EnforcerConfig {
    /// Builds the config from defaults overlaid with environment values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value does not parse or is out of range.
    pub fn from_env(env: &EnvSource) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlays environment values onto the current settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value does not parse.
    pub fn apply_env(&mut self, env: &EnvSource) -> Result<(), ConfigError> {
        if let Some(name) = env.get(DENY_POLICY_NAME_VAR)? {
            self.policy_name = name;
        }
        if let Some(page_size) = env.parse(PAGE_SIZE_VAR)? {
            self.page_size = page_size;
        }
        if let Some(max_attempts) = env.parse(MAX_ATTEMPTS_VAR)? {
            self.max_attempts = max_attempts;
        }
        if let Some(base_delay_ms) = env.parse(BASE_DELAY_MS_VAR)? {
            self.base_delay_ms = base_delay_ms;
        }
        if let Some(max_delay_ms) = env.parse(MAX_DELAY_MS_VAR)? {
            self.max_delay_ms = max_delay_ms;
        }
        if let Some(timeout_secs) = env.parse(TIMEOUT_SECS_VAR)? {
            self.timeout_secs = timeout_secs;
        }
        if let Some(account) = env.get(EXPECTED_ACCOUNT_VAR)? {
            self.expected_account = Some(account);
        }
        Ok(())
    }

    /// Validates ranges and identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a setting is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_policy_name(&self.policy_name) {
            return Err(ConfigError::Invalid(format!(
                "{DENY_POLICY_NAME_VAR} '{}' is not a valid IAM policy name",
                self.policy_name
            )));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "{PAGE_SIZE_VAR} must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if self.max_attempts == 0 || self.max_attempts > MAX_ATTEMPTS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "{MAX_ATTEMPTS_VAR} must be between 1 and {MAX_ATTEMPTS_LIMIT}"
            )));
        }
        if self.max_delay_ms > MAX_DELAY_LIMIT_MS {
            return Err(ConfigError::Invalid(format!(
                "{MAX_DELAY_MS_VAR} must not exceed {MAX_DELAY_LIMIT_MS}"
            )));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "{BASE_DELAY_MS_VAR} must not exceed {MAX_DELAY_MS_VAR}"
            )));
        }
        if self.timeout_secs == 0 || self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::Invalid(format!(
                "{TIMEOUT_SECS_VAR} must be between 1 and {MAX_TIMEOUT_SECS}"
            )));
        }
        if let Some(account) = &self.expected_account
            && AccountId::parse(account).is_none()
        {
            return Err(ConfigError::Invalid(format!(
                "{EXPECTED_ACCOUNT_VAR} must be a 12-digit account id"
            )));
        }
        Ok(())
    }

    /// Returns the function timeout that leaves the sweep deadline room to
    /// fire first.
    #[must_use]
    pub const fn function_timeout_secs(&self) -> u64 {
        self.timeout_secs.saturating_add(FUNCTION_TIMEOUT_MARGIN_SECS)
    }

    /// Converts the config into sweep settings.
    #[must_use]
    pub fn to_settings(&self) -> EnforcerSettings {
        EnforcerSettings {
            policy: DenyAllPolicy::named(self.policy_name.clone()),
            page_size: self.page_size,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                base_delay: Duration::from_millis(self.base_delay_ms),
                max_delay: Duration::from_millis(self.max_delay_ms),
                jitter: true,
            },
            timeout: Duration::from_secs(self.timeout_secs),
            expected_account: self.expected_account.as_deref().and_then(AccountId::parse),
        }
    }

    /// Returns the settings as function environment variables.
    #[must_use]
    pub fn to_env_vars(&self) -> BTreeMap<&'static str, String> {
        let mut vars = BTreeMap::from([
            (DENY_POLICY_NAME_VAR, self.policy_name.clone()),
            (PAGE_SIZE_VAR, self.page_size.to_string()),
            (MAX_ATTEMPTS_VAR, self.max_attempts.to_string()),
            (BASE_DELAY_MS_VAR, self.base_delay_ms.to_string()),
            (MAX_DELAY_MS_VAR, self.max_delay_ms.to_string()),
            (TIMEOUT_SECS_VAR, self.timeout_secs.to_string()),
        ]);
        if let Some(account) = &self.expected_account {
            vars.insert(EXPECTED_ACCOUNT_VAR, account.clone());
        }
        vars
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns a duration in whole milliseconds, saturating.
fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
