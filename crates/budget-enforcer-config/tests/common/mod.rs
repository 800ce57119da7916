// crates/budget-enforcer-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for budget-enforcer-config.
// =============================================================================

//! ## Overview
//! Environment builders and an error-message assertion for config tests.

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use budget_enforcer_config::ConfigError;
use budget_enforcer_config::EnvSource;

/// Environment with only the required notification email.
pub fn minimal_env() -> EnvSource {
    EnvSource::from_pairs([("NOTIFICATION_EMAIL", "ops@example.com")])
}

/// Environment built from the given pairs.
pub fn env(pairs: &[(&str, &str)]) -> EnvSource {
    EnvSource::from_pairs(pairs.iter().copied())
}

/// Asserts that a result is an error whose message contains `needle`.
pub fn assert_invalid<T: std::fmt::Debug>(
    result: Result<T, ConfigError>,
    needle: &str,
) -> Result<(), String> {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(value) => Err(format!("expected invalid config, got {value:?}")),
    }
}
