// crates/budget-enforcer-core/src/runtime/mod.rs
// ============================================================================
// Module: Budget Enforcer Runtime
// Description: Enforcement engine, retry policy, and in-memory directory.
// Purpose: Execute deny-all sweeps against an identity directory.
// Dependencies: crate::{audit, core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime drives the sweep. It is stateless between invocations; all
//! state lives behind the [`crate::IdentityDirectory`] interface.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod engine;
pub mod memory;
pub mod retry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use engine::DEFAULT_PAGE_SIZE;
pub use engine::DEFAULT_SWEEP_TIMEOUT;
pub use engine::EnforcementError;
pub use engine::Enforcer;
pub use engine::EnforcerSettings;
pub use engine::MAX_PAGE_SIZE;
pub use memory::InMemoryIdentityDirectory;
pub use retry::RetryContext;
pub use retry::RetryPolicy;
pub use retry::retry_transient;
