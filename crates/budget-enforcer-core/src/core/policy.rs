// crates/budget-enforcer-core/src/core/policy.rs
// ============================================================================
// Module: Deny-All Policy
// Description: The IAM policy document attached when the budget is exceeded.
// Purpose: Keep the kill-switch document and its naming in one place.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The deny-all policy is a single customer-managed policy that denies every
//! action on every resource. It is created once per account and attached by
//! reference; it is never duplicated per principal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::AccountId;
use crate::core::identifiers::Partition;
use crate::core::identifiers::PolicyArn;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default name of the deny-all managed policy.
pub const DEFAULT_DENY_POLICY_NAME: &str = "BudgetExceeded-DenyAll";
/// IAM policy language version.
pub const POLICY_VERSION: &str = "2012-10-17";
/// Statement id used for the deny-all statement.
pub const DENY_ALL_SID: &str = "DenyAllWhenBudgetExceeded";
/// Description stored on the managed policy.
pub const DENY_POLICY_DESCRIPTION: &str =
    "Denies all actions; attached automatically when the monthly budget is exceeded";
/// Maximum IAM managed policy name length.
pub const MAX_POLICY_NAME_LENGTH: usize = 128;

// ============================================================================
// SECTION: Policy Document
// ============================================================================

/// IAM statement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Grants the listed actions.
    Allow,
    /// Denies the listed actions.
    Deny,
}

/// Single IAM policy statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    /// Statement identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    /// Statement effect.
    pub effect: Effect,
    /// Action pattern(s).
    pub action: OneOrMany,
    /// Resource pattern(s).
    pub resource: OneOrMany,
}

/// IAM fields that accept either a string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    /// Single pattern.
    One(String),
    /// List of patterns.
    Many(Vec<String>),
}

impl OneOrMany {
    /// Returns true when the field matches every value (`*`).
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        match self {
            Self::One(value) => value == "*",
            Self::Many(values) => values.iter().any(|value| value == "*"),
        }
    }
}

/// IAM policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    /// Policy language version.
    pub version: String,
    /// Statements in evaluation order.
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    /// Builds the deny-all document.
    #[must_use]
    pub fn deny_all() -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement: vec![PolicyStatement {
                sid: Some(DENY_ALL_SID.to_string()),
                effect: Effect::Deny,
                action: OneOrMany::One("*".to_string()),
                resource: OneOrMany::One("*".to_string()),
            }],
        }
    }

    /// Returns true when some statement denies every action on every resource.
    #[must_use]
    pub fn denies_everything(&self) -> bool {
        self.statement.iter().any(|statement| {
            statement.effect == Effect::Deny
                && statement.action.is_wildcard()
                && statement.resource.is_wildcard()
        })
    }

    /// Serializes the document to the compact JSON IAM expects.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ============================================================================
// SECTION: Managed Policy
// ============================================================================

/// Named deny-all managed policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenyAllPolicy {
    /// Managed policy name.
    pub name: String,
    /// Policy description.
    pub description: String,
    /// Policy document.
    pub document: PolicyDocument,
}

impl DenyAllPolicy {
    /// Creates the deny-all policy with the given name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: DENY_POLICY_DESCRIPTION.to_string(),
            document: PolicyDocument::deny_all(),
        }
    }

    /// Returns the ARN this policy has in the given account.
    #[must_use]
    pub fn arn(&self, partition: &Partition, account: &AccountId) -> PolicyArn {
        PolicyArn::customer_managed(partition, account, &self.name)
    }
}

impl Default for DenyAllPolicy {
    fn default() -> Self {
        Self::named(DEFAULT_DENY_POLICY_NAME)
    }
}

/// Returns true when the name is a valid IAM managed policy name.
///
/// IAM accepts alphanumerics plus `+=,.@-_` up to 128 characters.
#[must_use]
pub fn is_valid_policy_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_POLICY_NAME_LENGTH
        && name.chars().all(|ch| ch.is_ascii_alphanumeric() || "+=,.@-_".contains(ch))
}
