// crates/budget-enforcer-core/src/lib.rs
// ============================================================================
// Module: Budget Enforcer Core Library
// Description: Public API surface for the budget enforcement sweep.
// Purpose: Expose core types, interfaces, audit sinks, and runtime helpers.
// Dependencies: crate::{audit, core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Budget Enforcer core implements the remediation step of a monthly cost
//! budget: when spend crosses 100% of the limit, every IAM user and group in
//! the account receives a deny-all managed policy. The core is
//! backend-agnostic and reaches IAM only through [`IdentityDirectory`], so the
//! same sweep runs in Lambda, in the CLI, and in tests.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use audit::AuditLevel;
pub use audit::EnforcementAuditEvent;
pub use audit::EnforcementAuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::RecordingAuditSink;
pub use audit::StderrAuditSink;
pub use interfaces::CallerIdentity;
pub use interfaces::DirectoryError;
pub use interfaces::IdentityDirectory;
pub use interfaces::Page;
pub use interfaces::operations;
pub use runtime::EnforcementError;
pub use runtime::Enforcer;
pub use runtime::EnforcerSettings;
pub use runtime::InMemoryIdentityDirectory;
pub use runtime::RetryPolicy;

#[cfg(test)]
mod tests;
