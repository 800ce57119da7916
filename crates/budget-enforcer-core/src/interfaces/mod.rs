// crates/budget-enforcer-core/src/interfaces/mod.rs
// ============================================================================
// Module: Budget Enforcer Interfaces
// Description: Backend-agnostic interface to the identity-management API.
// Purpose: Define the contract surface the enforcement sweep depends on.
// Dependencies: async-trait, crate::core, thiserror
// ============================================================================

//! ## Overview
//! The sweep talks to IAM only through [`IdentityDirectory`]. The AWS adapter
//! implements it over the SDK; tests and dry runs use the in-memory directory
//! in [`crate::runtime::memory`]. Implementations classify failures into
//! [`DirectoryError`] so the sweep can tell transient errors from fatal ones.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use thiserror::Error;

use crate::core::identifiers::AccountId;
use crate::core::identifiers::Partition;
use crate::core::identifiers::PolicyArn;
use crate::core::policy::DenyAllPolicy;
use crate::core::principal::Principal;
use crate::core::principal::PrincipalKind;

// ============================================================================
// SECTION: Operation Labels
// ============================================================================

/// Stable labels for identity API operations, used in audit logs and fault
/// injection.
pub mod operations {
    use crate::core::principal::PrincipalKind;

    /// `sts:GetCallerIdentity`.
    pub const GET_CALLER_IDENTITY: &str = "get_caller_identity";
    /// `iam:GetPolicy`.
    pub const GET_POLICY: &str = "get_policy";
    /// `iam:CreatePolicy`.
    pub const CREATE_POLICY: &str = "create_policy";
    /// `iam:ListUsers`.
    pub const LIST_USERS: &str = "list_users";
    /// `iam:ListGroups`.
    pub const LIST_GROUPS: &str = "list_groups";
    /// `iam:ListAttachedUserPolicies`.
    pub const LIST_ATTACHED_USER_POLICIES: &str = "list_attached_user_policies";
    /// `iam:ListAttachedGroupPolicies`.
    pub const LIST_ATTACHED_GROUP_POLICIES: &str = "list_attached_group_policies";
    /// `iam:AttachUserPolicy`.
    pub const ATTACH_USER_POLICY: &str = "attach_user_policy";
    /// `iam:AttachGroupPolicy`.
    pub const ATTACH_GROUP_POLICY: &str = "attach_group_policy";

    /// Returns the listing operation for a principal kind.
    #[must_use]
    pub const fn list(kind: PrincipalKind) -> &'static str {
        match kind {
            PrincipalKind::User => LIST_USERS,
            PrincipalKind::Group => LIST_GROUPS,
        }
    }

    /// Returns the attached-policy listing operation for a principal kind.
    #[must_use]
    pub const fn list_attached(kind: PrincipalKind) -> &'static str {
        match kind {
            PrincipalKind::User => LIST_ATTACHED_USER_POLICIES,
            PrincipalKind::Group => LIST_ATTACHED_GROUP_POLICIES,
        }
    }

    /// Returns the attach operation for a principal kind.
    #[must_use]
    pub const fn attach(kind: PrincipalKind) -> &'static str {
        match kind {
            PrincipalKind::User => ATTACH_USER_POLICY,
            PrincipalKind::Group => ATTACH_GROUP_POLICY,
        }
    }
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Identity of the caller executing the sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Account the caller belongs to.
    pub account: AccountId,
    /// Partition the caller runs in.
    pub partition: Partition,
}

/// One page of a truncated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Continuation marker; `None` when the listing is exhausted.
    pub next_marker: Option<String>,
}

impl<T> Page<T> {
    /// Creates a final page.
    #[must_use]
    pub const fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_marker: None,
        }
    }
}

/// Identity API errors.
///
/// # Invariants
/// - Variants are stable for retry and audit classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// Caller lacks permission for the operation.
    #[error("identity api access denied: {0}")]
    AccessDenied(String),
    /// Request was rate limited.
    #[error("identity api throttled: {0}")]
    Throttled(String),
    /// Service or network was momentarily unavailable.
    #[error("identity api unavailable: {0}")]
    Unavailable(String),
    /// Referenced entity does not exist.
    #[error("identity entity not found: {0}")]
    NotFound(String),
    /// Entity already exists.
    #[error("identity entity already exists: {0}")]
    AlreadyExists(String),
    /// An account or principal quota was hit.
    #[error("identity api limit exceeded: {0}")]
    LimitExceeded(String),
    /// Request was rejected for another reason.
    #[error("identity api rejected request: {0}")]
    Rejected(String),
}

impl DirectoryError {
    /// Returns true when the error should be retried with backoff.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Throttled(_) | Self::Unavailable(_))
    }

    /// Returns a stable label for audit logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AccessDenied(_) => "access_denied",
            Self::Throttled(_) => "throttled",
            Self::Unavailable(_) => "unavailable",
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::LimitExceeded(_) => "limit_exceeded",
            Self::Rejected(_) => "rejected",
        }
    }
}

// ============================================================================
// SECTION: Identity Directory
// ============================================================================

/// Identity-management API used by the enforcement sweep.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Resolves the account and partition of the caller.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the identity cannot be resolved.
    async fn caller_identity(&self) -> Result<CallerIdentity, DirectoryError>;

    /// Returns true when the managed policy exists.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] for anything other than a missing policy.
    async fn policy_exists(&self, arn: &PolicyArn) -> Result<bool, DirectoryError>;

    /// Creates the managed policy and returns its ARN.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::AlreadyExists`] when the name is taken.
    async fn create_policy(&self, policy: &DenyAllPolicy) -> Result<PolicyArn, DirectoryError>;

    /// Lists one page of users or groups.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the listing fails.
    async fn list_principals(
        &self,
        kind: PrincipalKind,
        marker: Option<&str>,
        page_size: u16,
    ) -> Result<Page<Principal>, DirectoryError>;

    /// Lists one page of managed policies attached to a principal.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the listing fails.
    async fn list_attached_policies(
        &self,
        principal: &Principal,
        marker: Option<&str>,
        page_size: u16,
    ) -> Result<Page<PolicyArn>, DirectoryError>;

    /// Attaches a managed policy to a principal; attaching twice succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the attachment fails.
    async fn attach_policy(
        &self,
        principal: &Principal,
        policy: &PolicyArn,
    ) -> Result<(), DirectoryError>;
}
