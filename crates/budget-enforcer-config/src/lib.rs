// crates/budget-enforcer-config/src/lib.rs
// ============================================================================
// Module: Budget Enforcer Config Library
// Description: Stack provisioning and enforcer runtime configuration.
// Purpose: Single source of truth for environment and TOML settings.
// Dependencies: budget-enforcer-core, dotenvy, serde, toml
// ============================================================================

//! ## Overview
//! `budget-enforcer-config` builds configuration once at startup and hands
//! explicit values to the stack renderer and the enforcement function.
//! [`StackConfig`] drives provisioning; [`EnforcerConfig`] drives the sweep.
//! Both read the environment through [`EnvSource`], which accepts an override
//! map so tests never touch process state, and can layer a `.env` file
//! beneath the process environment. Validation fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod enforcer;
pub mod env;
pub mod error;
pub mod stack;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use enforcer::EnforcerConfig;
pub use enforcer::FUNCTION_TIMEOUT_MARGIN_SECS;
pub use enforcer::MAX_TIMEOUT_SECS;
pub use env::DEFAULT_DOTENV_NAME;
pub use env::EnvSource;
pub use error::ConfigError;
pub use stack::DEFAULT_BUDGET_LIMIT_USD;
pub use stack::DEFAULT_REGION;
pub use stack::StackConfig;
pub use stack::parse_budget_limit;
