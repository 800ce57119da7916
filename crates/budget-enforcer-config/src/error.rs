// crates/budget-enforcer-config/src/error.rs
// ============================================================================
// Module: Config Errors
// Description: Error type for configuration loading and validation.
// Purpose: Give callers stable variants to report and exit on.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`ConfigError`] is the single failure type for stack and enforcer config.
//! Every variant renders an operator-readable message.

use thiserror::Error;

/// Configuration loading or validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// A required setting is absent.
    #[error("{0} is required")]
    Missing(&'static str),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}
