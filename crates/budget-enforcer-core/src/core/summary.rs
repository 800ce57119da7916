// crates/budget-enforcer-core/src/core/summary.rs
// ============================================================================
// Module: Sweep Summary
// Description: Result records for an enforcement sweep.
// Purpose: Report attached, compliant, and failed principals in one payload.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The summary is the invocation result returned to the Lambda runtime and
//! printed by the CLI. Per-principal failures are reported here rather than
//! failing the invocation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::PolicyArn;
use crate::core::principal::Principal;
use crate::core::principal::PrincipalKind;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Failure recorded for a single principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalFailure {
    /// Principal that could not be locked down.
    pub principal: Principal,
    /// Stable error classification.
    pub error_kind: String,
    /// Error message from the identity API.
    pub message: String,
}

/// Result of one complete pass over all principals.
///
/// # Invariants
/// - Every enumerated principal appears in exactly one of `attached`,
///   `already_compliant`, or `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SweepSummary {
    /// Deny-all policy ARN used for the sweep.
    pub policy_arn: Option<PolicyArn>,
    /// Whether this sweep created the policy.
    pub policy_created: bool,
    /// Principals that received the policy during this sweep.
    pub attached: Vec<Principal>,
    /// Principals that already had the policy attached.
    pub already_compliant: Vec<Principal>,
    /// Principals whose attachment failed.
    pub failed: Vec<PrincipalFailure>,
}

impl SweepSummary {
    /// Total number of principals processed.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.attached.len() + self.already_compliant.len() + self.failed.len()
    }

    /// Returns true when no principal failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns the counts for the summary.
    #[must_use]
    pub fn counts(&self) -> SweepCounts {
        SweepCounts {
            processed: self.processed(),
            attached: self.attached.len(),
            already_compliant: self.already_compliant.len(),
            failed: self.failed.len(),
            users: self.count_kind(PrincipalKind::User),
            groups: self.count_kind(PrincipalKind::Group),
        }
    }

    /// Counts principals of one kind across all buckets.
    fn count_kind(&self, kind: PrincipalKind) -> usize {
        let attached = self.attached.iter().filter(|p| p.kind == kind).count();
        let compliant = self.already_compliant.iter().filter(|p| p.kind == kind).count();
        let failed = self.failed.iter().filter(|f| f.principal.kind == kind).count();
        attached + compliant + failed
    }
}

/// Aggregate counts for a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SweepCounts {
    /// Principals processed.
    pub processed: usize,
    /// Principals newly attached.
    pub attached: usize,
    /// Principals already compliant.
    pub already_compliant: usize,
    /// Principals failed.
    pub failed: usize,
    /// Users processed.
    pub users: usize,
    /// Groups processed.
    pub groups: usize,
}

/// Outcome of an enforcement invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnforcementOutcome {
    /// The sweep ran to completion.
    Completed {
        /// Sweep summary.
        summary: SweepSummary,
        /// Aggregate counts.
        counts: SweepCounts,
    },
    /// The event was not actionable and nothing was mutated.
    Skipped {
        /// Stable skip classification.
        reason: String,
        /// Human-readable detail.
        detail: String,
    },
}

impl EnforcementOutcome {
    /// Builds a completed outcome from a summary.
    #[must_use]
    pub fn completed(summary: SweepSummary) -> Self {
        let counts = summary.counts();
        Self::Completed {
            summary,
            counts,
        }
    }

    /// Returns the summary when the sweep completed.
    #[must_use]
    pub const fn summary(&self) -> Option<&SweepSummary> {
        match self {
            Self::Completed {
                summary, ..
            } => Some(summary),
            Self::Skipped {
                ..
            } => None,
        }
    }
}
