// crates/budget-enforcer-lambda/src/lib.rs
// ============================================================================
// Module: Budget Enforcer Lambda Handler
// Description: Invocation handler shared by the bootstrap binary and tests.
// Purpose: Turn one SNS delivery into one enforcement sweep result.
// Dependencies: budget-enforcer-config, budget-enforcer-core, serde_json
// ============================================================================

//! ## Overview
//! [`EnforcementHandler`] is built once per execution environment and reused
//! across invocations. Each invocation binds the request id to the audit
//! trail, runs [`Enforcer::enforce`], and returns the outcome as JSON.
//! Skipped events and partial principal failures are successful results;
//! only fatal sweep errors fail the invocation so they surface in the
//! function's error metrics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use budget_enforcer_config::ConfigError;
use budget_enforcer_config::EnforcerConfig;
use budget_enforcer_config::EnvSource;
use budget_enforcer_core::EnforcementAuditSink;
use budget_enforcer_core::EnforcementError;
use budget_enforcer_core::Enforcer;
use budget_enforcer_core::IdentityDirectory;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Invocation failures.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Function environment is misconfigured.
    #[error("invalid function configuration: {0}")]
    Config(#[from] ConfigError),
    /// The sweep failed fatally.
    #[error(transparent)]
    Enforcement(#[from] EnforcementError),
    /// The outcome could not be serialized.
    #[error("failed to serialize outcome: {0}")]
    Serialization(String),
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Long-lived invocation handler.
#[derive(Clone)]
pub struct EnforcementHandler {
    /// Configured enforcer.
    enforcer: Enforcer,
}

impl EnforcementHandler {
    /// Wraps an existing enforcer.
    #[must_use]
    pub const fn new(enforcer: Enforcer) -> Self {
        Self {
            enforcer,
        }
    }

    /// Builds a handler from the function environment.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Config`] when an enforcer setting is invalid.
    pub fn from_env(
        env: &EnvSource,
        directory: Arc<dyn IdentityDirectory>,
        audit: Arc<dyn EnforcementAuditSink>,
    ) -> Result<Self, HandlerError> {
        let config = EnforcerConfig::from_env(env)?;
        Ok(Self::new(Enforcer::new(directory, config.to_settings(), audit)))
    }

    /// Returns the wrapped enforcer.
    #[must_use]
    pub const fn enforcer(&self) -> &Enforcer {
        &self.enforcer
    }

    /// Handles one invocation payload.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when the sweep fails fatally.
    pub async fn handle(&self, request_id: &str, payload: &Value) -> Result<Value, HandlerError> {
        let outcome = self.enforcer.with_invocation_id(request_id).enforce(payload).await?;
        serde_json::to_value(&outcome).map_err(|err| HandlerError::Serialization(err.to_string()))
    }
}
