// crates/budget-enforcer-aws/src/lib.rs
// ============================================================================
// Module: Budget Enforcer AWS Adapter
// Description: IdentityDirectory implementation over IAM and STS.
// Purpose: Let the enforcement sweep run against a real AWS account.
// Dependencies: aws-config, aws-sdk-iam, aws-sdk-sts, budget-enforcer-core
// ============================================================================

//! ## Overview
//! [`AwsIdentityDirectory`] maps each [`IdentityDirectory`] call onto one SDK
//! request and classifies SDK failures into [`DirectoryError`] variants so
//! the sweep's retry and fatal-error rules apply uniformly. SDK-level retries
//! are disabled; the sweep's own retry policy owns backoff and logs each
//! attempt.
//!
//! [`IdentityDirectory`]: budget_enforcer_core::IdentityDirectory
//! [`DirectoryError`]: budget_enforcer_core::DirectoryError

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod directory;
pub mod errors;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use directory::AwsClientOptions;
pub use directory::AwsIdentityDirectory;
pub use errors::classify_code;
pub use errors::classify_sdk_error;

#[cfg(test)]
mod tests;
