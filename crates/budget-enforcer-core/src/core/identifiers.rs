// crates/budget-enforcer-core/src/core/identifiers.rs
// ============================================================================
// Module: Budget Enforcer Identifiers
// Description: Canonical opaque identifiers for accounts and IAM policies.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers wrap the raw strings returned by AWS so that account ids,
//! partitions, and policy ARNs cannot be swapped by accident. Validation of
//! account ids lives here because both the event parser and the config layer
//! rely on the same 12-digit rule.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of digits in an AWS account id.
pub const ACCOUNT_ID_LENGTH: usize = 12;
/// Partition used when none can be derived from an ARN.
pub const DEFAULT_PARTITION: &str = "aws";

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// AWS account identifier (12 decimal digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Creates a new account identifier without validation.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parses an account identifier, rejecting anything but 12 digits.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if is_account_id(trimmed) { Some(Self::new(trimmed)) } else { None }
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// AWS partition name (`aws`, `aws-cn`, `aws-us-gov`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Partition(String);

impl Partition {
    /// Creates a new partition name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the partition as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Partition {
    fn default() -> Self {
        Self::new(DEFAULT_PARTITION)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// ARN of a customer-managed IAM policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyArn(String);

impl PolicyArn {
    /// Creates a policy ARN from its string form.
    #[must_use]
    pub fn new(arn: impl Into<String>) -> Self {
        Self(arn.into())
    }

    /// Builds the ARN of a customer-managed policy in the given account.
    #[must_use]
    pub fn customer_managed(partition: &Partition, account: &AccountId, name: &str) -> Self {
        Self(format!("arn:{partition}:iam::{account}:policy/{name}"))
    }

    /// Returns the ARN as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolicyArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PolicyArn {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: ARN Helpers
// ============================================================================

/// Components of an ARN that the enforcer cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArnParts {
    /// Partition segment.
    pub partition: Partition,
    /// Service segment (for example `sns`).
    pub service: String,
    /// Region segment (empty for global services).
    pub region: String,
    /// Account segment, when it is a valid account id.
    pub account: Option<AccountId>,
    /// Resource segment (everything after the account).
    pub resource: String,
}

/// Splits an ARN into its components.
///
/// Returns `None` when the value does not start with `arn:` or has fewer than
/// six colon-separated segments.
#[must_use]
pub fn parse_arn(value: &str) -> Option<ArnParts> {
    let mut segments = value.splitn(6, ':');
    if segments.next()? != "arn" {
        return None;
    }
    let partition = segments.next()?;
    let service = segments.next()?;
    let region = segments.next()?;
    let account = segments.next()?;
    let resource = segments.next()?;
    if partition.is_empty() || service.is_empty() || resource.is_empty() {
        return None;
    }
    Some(ArnParts {
        partition: Partition::new(partition),
        service: service.to_string(),
        region: region.to_string(),
        account: AccountId::parse(account),
        resource: resource.to_string(),
    })
}

/// Returns true when the value is a 12-digit account id.
fn is_account_id(value: &str) -> bool {
    value.len() == ACCOUNT_ID_LENGTH && value.bytes().all(|byte| byte.is_ascii_digit())
}
