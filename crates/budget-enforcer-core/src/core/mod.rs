// crates/budget-enforcer-core/src/core/mod.rs
// ============================================================================
// Module: Budget Enforcer Core Types
// Description: Identifiers, principals, policy documents, events, summaries.
// Purpose: Group the data model shared by the sweep and its adapters.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Core types are plain data with serde support. They carry no I/O and are
//! safe to construct in tests.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod event;
pub mod identifiers;
pub mod policy;
pub mod principal;
pub mod summary;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use event::BudgetNotification;
pub use event::EnforcementEvent;
pub use event::EventError;
pub use identifiers::AccountId;
pub use identifiers::ArnParts;
pub use identifiers::Partition;
pub use identifiers::PolicyArn;
pub use identifiers::parse_arn;
pub use policy::DenyAllPolicy;
pub use policy::Effect;
pub use policy::OneOrMany;
pub use policy::PolicyDocument;
pub use policy::PolicyStatement;
pub use policy::is_valid_policy_name;
pub use principal::Principal;
pub use principal::PrincipalKind;
pub use summary::EnforcementOutcome;
pub use summary::PrincipalFailure;
pub use summary::SweepCounts;
pub use summary::SweepSummary;
