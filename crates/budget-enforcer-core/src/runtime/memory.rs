// crates/budget-enforcer-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Identity Directory
// Description: IAM stand-in with pagination and fault injection.
// Purpose: Exercise sweeps without AWS and support offline dry runs.
// Dependencies: async-trait, crate::{core, interfaces}, tokio
// ============================================================================

//! ## Overview
//! [`InMemoryIdentityDirectory`] models the parts of IAM the sweep touches:
//! users, groups, managed policies, and attachments. Listings are paginated
//! with opaque offset markers, attachment is idempotent, and the per-principal
//! managed-policy quota is enforced. Faults can be injected per operation
//! (transient throttling or permanent errors) and per principal.
//!
//! Every call yields to the scheduler first so concurrent sweeps interleave
//! the way real network calls do.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;

use crate::core::identifiers::AccountId;
use crate::core::identifiers::Partition;
use crate::core::identifiers::PolicyArn;
use crate::core::policy::DenyAllPolicy;
use crate::core::policy::PolicyDocument;
use crate::core::principal::Principal;
use crate::core::principal::PrincipalKind;
use crate::interfaces::CallerIdentity;
use crate::interfaces::DirectoryError;
use crate::interfaces::IdentityDirectory;
use crate::interfaces::Page;
use crate::interfaces::operations;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default IAM quota of managed policies per user or group.
pub const DEFAULT_ATTACHMENT_LIMIT: usize = 10;

// ============================================================================
// SECTION: State
// ============================================================================

/// Mutable directory state.
#[derive(Default)]
struct DirectoryState {
    /// User names in listing order.
    users: Vec<String>,
    /// Group names in listing order.
    groups: Vec<String>,
    /// Managed policies keyed by ARN.
    policies: BTreeMap<PolicyArn, PolicyDocument>,
    /// Attached policy ARNs per principal.
    attachments: BTreeMap<Principal, Vec<PolicyArn>>,
    /// Calls made per operation.
    calls: BTreeMap<&'static str, usize>,
    /// Remaining transient failures per operation.
    throttles: BTreeMap<&'static str, u32>,
    /// Permanent failures per operation.
    failures: BTreeMap<&'static str, DirectoryError>,
    /// Permanent attach failures per principal.
    principal_failures: BTreeMap<Principal, DirectoryError>,
}

// ============================================================================
// SECTION: Directory
// ============================================================================

/// In-memory identity directory.
pub struct InMemoryIdentityDirectory {
    /// Caller account.
    account: AccountId,
    /// Caller partition.
    partition: Partition,
    /// Managed-policy quota per principal.
    attachment_limit: usize,
    /// Guarded state.
    state: Mutex<DirectoryState>,
}

impl InMemoryIdentityDirectory {
    /// Creates an empty directory for the given account.
    #[must_use]
    pub fn new(account: AccountId) -> Self {
        Self {
            account,
            partition: Partition::default(),
            attachment_limit: DEFAULT_ATTACHMENT_LIMIT,
            state: Mutex::new(DirectoryState::default()),
        }
    }

    /// Adds users in listing order.
    #[must_use]
    pub fn with_users<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.add_user(name);
        }
        self
    }

    /// Adds groups in listing order.
    #[must_use]
    pub fn with_groups<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.add_group(name);
        }
        self
    }

    /// Overrides the per-principal managed-policy quota.
    #[must_use]
    pub fn with_attachment_limit(mut self, limit: usize) -> Self {
        self.attachment_limit = limit;
        self
    }

    /// Adds a user.
    pub fn add_user(&self, name: impl Into<String>) {
        self.lock_state().users.push(name.into());
    }

    /// Adds a group.
    pub fn add_group(&self, name: impl Into<String>) {
        self.lock_state().groups.push(name.into());
    }

    /// Pre-attaches a policy ARN to a principal.
    pub fn attach_existing(&self, principal: &Principal, arn: &PolicyArn) {
        self.lock_state().attachments.entry(principal.clone()).or_default().push(arn.clone());
    }

    /// Makes the next `times` calls to `operation` fail with throttling.
    pub fn throttle(&self, operation: &'static str, times: u32) {
        self.lock_state().throttles.insert(operation, times);
    }

    /// Makes every call to `operation` fail with `error`.
    pub fn fail_operation(&self, operation: &'static str, error: DirectoryError) {
        self.lock_state().failures.insert(operation, error);
    }

    /// Makes attaching to `principal` fail with `error`.
    pub fn fail_principal(&self, principal: &Principal, error: DirectoryError) {
        self.lock_state().principal_failures.insert(principal.clone(), error);
    }

    /// Returns the policies attached to a principal.
    #[must_use]
    pub fn attachments(&self, principal: &Principal) -> Vec<PolicyArn> {
        self.lock_state().attachments.get(principal).cloned().unwrap_or_default()
    }

    /// Returns every principal in the directory.
    #[must_use]
    pub fn principals(&self) -> Vec<Principal> {
        let state = self.lock_state();
        state
            .users
            .iter()
            .map(Principal::user)
            .chain(state.groups.iter().map(Principal::group))
            .collect()
    }

    /// Returns the number of managed policies in the account.
    #[must_use]
    pub fn policy_count(&self) -> usize {
        self.lock_state().policies.len()
    }

    /// Returns the stored document for a policy.
    #[must_use]
    pub fn policy_document(&self, arn: &PolicyArn) -> Option<PolicyDocument> {
        self.lock_state().policies.get(arn).cloned()
    }

    /// Returns how many times an operation was called.
    #[must_use]
    pub fn call_count(&self, operation: &'static str) -> usize {
        self.lock_state().calls.get(operation).copied().unwrap_or(0)
    }

    /// Locks the state, recovering from poisoning.
    fn lock_state(&self) -> MutexGuard<'_, DirectoryState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Records a call and applies injected operation faults.
    async fn begin(&self, operation: &'static str) -> Result<(), DirectoryError> {
        tokio::task::yield_now().await;
        let mut state = self.lock_state();
        *state.calls.entry(operation).or_insert(0) += 1;
        if let Some(remaining) = state.throttles.get_mut(operation)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(DirectoryError::Throttled(format!("{operation}: rate exceeded")));
        }
        if let Some(error) = state.failures.get(operation) {
            return Err(error.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryIdentityDirectory {
    async fn caller_identity(&self) -> Result<CallerIdentity, DirectoryError> {
        self.begin(operations::GET_CALLER_IDENTITY).await?;
        Ok(CallerIdentity {
            account: self.account.clone(),
            partition: self.partition.clone(),
        })
    }

    async fn policy_exists(&self, arn: &PolicyArn) -> Result<bool, DirectoryError> {
        self.begin(operations::GET_POLICY).await?;
        Ok(self.lock_state().policies.contains_key(arn))
    }

    async fn create_policy(&self, policy: &DenyAllPolicy) -> Result<PolicyArn, DirectoryError> {
        self.begin(operations::CREATE_POLICY).await?;
        let arn = policy.arn(&self.partition, &self.account);
        let mut state = self.lock_state();
        if state.policies.contains_key(&arn) {
            return Err(DirectoryError::AlreadyExists(format!(
                "a policy called {} already exists",
                policy.name
            )));
        }
        state.policies.insert(arn.clone(), policy.document.clone());
        Ok(arn)
    }

    async fn list_principals(
        &self,
        kind: PrincipalKind,
        marker: Option<&str>,
        page_size: u16,
    ) -> Result<Page<Principal>, DirectoryError> {
        self.begin(operations::list(kind)).await?;
        let state = self.lock_state();
        let names = match kind {
            PrincipalKind::User => &state.users,
            PrincipalKind::Group => &state.groups,
        };
        let page = paginate(names, marker, page_size)?;
        Ok(Page {
            items: page
                .items
                .into_iter()
                .map(|name| Principal {
                    kind,
                    name,
                })
                .collect(),
            next_marker: page.next_marker,
        })
    }

    async fn list_attached_policies(
        &self,
        principal: &Principal,
        marker: Option<&str>,
        page_size: u16,
    ) -> Result<Page<PolicyArn>, DirectoryError> {
        self.begin(operations::list_attached(principal.kind)).await?;
        let state = self.lock_state();
        if !exists(&state, principal) {
            return Err(DirectoryError::NotFound(format!("{principal} cannot be found")));
        }
        let attached = state.attachments.get(principal).cloned().unwrap_or_default();
        paginate(&attached, marker, page_size)
    }

    async fn attach_policy(
        &self,
        principal: &Principal,
        policy: &PolicyArn,
    ) -> Result<(), DirectoryError> {
        self.begin(operations::attach(principal.kind)).await?;
        let limit = self.attachment_limit;
        let mut state = self.lock_state();
        if let Some(error) = state.principal_failures.get(principal) {
            return Err(error.clone());
        }
        if !exists(&state, principal) {
            return Err(DirectoryError::NotFound(format!("{principal} cannot be found")));
        }
        if !state.policies.contains_key(policy) {
            return Err(DirectoryError::NotFound(format!("policy {policy} does not exist")));
        }
        let attached = state.attachments.entry(principal.clone()).or_default();
        if attached.contains(policy) {
            return Ok(());
        }
        if attached.len() >= limit {
            return Err(DirectoryError::LimitExceeded(format!(
                "cannot exceed quota for policies attached to {principal}: {limit}"
            )));
        }
        attached.push(policy.clone());
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when the principal is present in the directory.
fn exists(state: &DirectoryState, principal: &Principal) -> bool {
    match principal.kind {
        PrincipalKind::User => state.users.contains(&principal.name),
        PrincipalKind::Group => state.groups.contains(&principal.name),
    }
}

/// Slices a listing into a page using a numeric offset marker.
fn paginate<T: Clone>(
    items: &[T],
    marker: Option<&str>,
    page_size: u16,
) -> Result<Page<T>, DirectoryError> {
    let start = match marker {
        Some(marker) => marker
            .parse::<usize>()
            .map_err(|_| DirectoryError::Rejected(format!("invalid marker {marker}")))?,
        None => 0,
    };
    let size = usize::from(page_size.max(1));
    let end = start.saturating_add(size).min(items.len());
    let page = items.get(start .. end).map(<[T]>::to_vec).unwrap_or_default();
    let next_marker = (end < items.len()).then(|| end.to_string());
    Ok(Page {
        items: page,
        next_marker,
    })
}

/// Returns the distinct principals that hold a given policy.
#[must_use]
pub fn holders(directory: &InMemoryIdentityDirectory, arn: &PolicyArn) -> BTreeSet<Principal> {
    directory
        .principals()
        .into_iter()
        .filter(|principal| directory.attachments(principal).contains(arn))
        .collect()
}
