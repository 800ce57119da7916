// crates/budget-enforcer-core/src/runtime/engine.rs
// ============================================================================
// Module: Enforcement Engine
// Description: The deny-all sweep over every IAM user and group.
// Purpose: Lock down an account idempotently when the budget is exceeded.
// Dependencies: crate::{audit, core, interfaces}, tokio
// ============================================================================

//! ## Overview
//! [`Enforcer::enforce`] validates the triggering event, then runs a sweep:
//! resolve or create the deny-all policy, enumerate every user and group page
//! by page, and attach the policy to each principal that lacks it.
//!
//! Invariants:
//! - Re-running converges; attaching an attached policy is never an error.
//! - A per-principal failure never aborts the sweep; it is reported.
//! - A failed compliance read never blocks the attach that follows it.
//! - Authorization failures outside per-principal steps abort the sweep.
//! - The whole sweep is bounded by [`EnforcerSettings::timeout`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::audit::AuditLevel;
use crate::audit::EnforcementAuditEvent;
use crate::audit::EnforcementAuditSink;
use crate::core::event::EnforcementEvent;
use crate::core::identifiers::AccountId;
use crate::core::identifiers::PolicyArn;
use crate::core::policy::DenyAllPolicy;
use crate::core::principal::Principal;
use crate::core::principal::PrincipalKind;
use crate::core::summary::EnforcementOutcome;
use crate::core::summary::PrincipalFailure;
use crate::core::summary::SweepSummary;
use crate::interfaces::DirectoryError;
use crate::interfaces::IdentityDirectory;
use crate::interfaces::operations;
use crate::runtime::retry::RetryContext;
use crate::runtime::retry::RetryPolicy;
use crate::runtime::retry::retry_transient;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default page size for IAM listings.
pub const DEFAULT_PAGE_SIZE: u16 = 100;
/// Largest page size IAM accepts.
pub const MAX_PAGE_SIZE: u16 = 1000;
/// Default sweep deadline, kept below the 60 second function timeout.
pub const DEFAULT_SWEEP_TIMEOUT: Duration = Duration::from_secs(50);

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Runtime settings for the enforcement sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnforcerSettings {
    /// Deny-all policy to resolve and attach.
    pub policy: DenyAllPolicy,
    /// Page size for IAM listings.
    pub page_size: u16,
    /// Retry policy for transient errors.
    pub retry: RetryPolicy,
    /// Overall sweep deadline.
    pub timeout: Duration,
    /// Account events must originate from, when set.
    pub expected_account: Option<AccountId>,
}

impl Default for EnforcerSettings {
    fn default() -> Self {
        Self {
            policy: DenyAllPolicy::default(),
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryPolicy::default(),
            timeout: DEFAULT_SWEEP_TIMEOUT,
            expected_account: None,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal enforcement errors.
///
/// # Invariants
/// - Any variant means the sweep did not complete and must be alerted on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnforcementError {
    /// An identity API call failed outside a per-principal step.
    #[error("{operation} failed: {source}")]
    Directory {
        /// Operation label.
        operation: &'static str,
        /// Classified identity API error.
        #[source]
        source: DirectoryError,
    },
    /// Pagination did not advance.
    #[error("{operation} returned a repeated continuation marker")]
    StalledPagination {
        /// Operation label.
        operation: &'static str,
    },
    /// The sweep exceeded its deadline.
    #[error("enforcement sweep timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),
}

impl EnforcementError {
    /// Returns true when the caller lacks permission.
    #[must_use]
    pub const fn is_authorization(&self) -> bool {
        matches!(
            self,
            Self::Directory {
                source: DirectoryError::AccessDenied(_),
                ..
            }
        )
    }

    /// Returns a stable label for audit logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Directory {
                source, ..
            } => source.kind(),
            Self::StalledPagination {
                ..
            } => "stalled_pagination",
            Self::TimedOut(_) => "timed_out",
        }
    }
}

/// Per-principal result.
enum PrincipalOutcome {
    /// Policy attached during this sweep.
    Attached,
    /// Policy was already attached.
    AlreadyCompliant,
}

// ============================================================================
// SECTION: Enforcer
// ============================================================================

/// Runs deny-all sweeps against an identity directory.
#[derive(Clone)]
pub struct Enforcer {
    /// Identity API.
    directory: Arc<dyn IdentityDirectory>,
    /// Sweep settings.
    settings: EnforcerSettings,
    /// Audit sink.
    audit: Arc<dyn EnforcementAuditSink>,
    /// Invocation identifier attached to audit events.
    invocation_id: Option<String>,
}

impl Enforcer {
    /// Creates a new enforcer.
    #[must_use]
    pub fn new(
        directory: Arc<dyn IdentityDirectory>,
        settings: EnforcerSettings,
        audit: Arc<dyn EnforcementAuditSink>,
    ) -> Self {
        Self {
            directory,
            settings,
            audit,
            invocation_id: None,
        }
    }

    /// Returns a copy bound to an invocation identifier.
    #[must_use]
    pub fn with_invocation_id(&self, invocation_id: impl Into<String>) -> Self {
        let mut enforcer = self.clone();
        enforcer.invocation_id = Some(invocation_id.into());
        enforcer
    }

    /// Returns the sweep settings.
    #[must_use]
    pub const fn settings(&self) -> &EnforcerSettings {
        &self.settings
    }

    /// Handles one invocation payload.
    ///
    /// Malformed or foreign-account events are logged and skipped without
    /// touching IAM.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcementError`] when the sweep fails fatally.
    pub async fn enforce(&self, payload: &Value) -> Result<EnforcementOutcome, EnforcementError> {
        let event = match EnforcementEvent::from_value(payload) {
            Ok(event) => event,
            Err(err) => {
                self.record(
                    EnforcementAuditEvent::new("event_rejected", AuditLevel::Warn)
                        .error(err.kind(), err.to_string()),
                );
                return Ok(EnforcementOutcome::Skipped {
                    reason: err.kind().to_string(),
                    detail: err.to_string(),
                });
            }
        };
        if let Some(expected) = &self.settings.expected_account
            && !event.is_from_account(expected)
        {
            let origin = event.origin_account().map(ToString::to_string).unwrap_or_default();
            let detail = format!("event from account {origin} does not match {expected}");
            self.record(
                EnforcementAuditEvent::new("event_rejected", AuditLevel::Warn)
                    .error("foreign_account", detail.clone()),
            );
            return Ok(EnforcementOutcome::Skipped {
                reason: "foreign_account".to_string(),
                detail,
            });
        }
        let budget = event.primary().and_then(|notification| notification.budget_name.clone());
        let started = EnforcementAuditEvent::new("sweep_started", AuditLevel::Info);
        self.record(match budget {
            Some(name) => started.message(format!("budget {name} exceeded")),
            None => started,
        });
        let summary = self.sweep_with_deadline().await?;
        Ok(EnforcementOutcome::completed(summary))
    }

    /// Runs a sweep bounded by the configured deadline.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcementError`] when the sweep fails or times out.
    pub async fn sweep_with_deadline(&self) -> Result<SweepSummary, EnforcementError> {
        let result = match tokio::time::timeout(self.settings.timeout, self.sweep()).await {
            Ok(result) => result,
            Err(_) => Err(EnforcementError::TimedOut(self.settings.timeout)),
        };
        match &result {
            Ok(summary) => {
                let level = if summary.is_clean() { AuditLevel::Info } else { AuditLevel::Error };
                let mut event =
                    EnforcementAuditEvent::new("sweep_completed", level).counts(summary.counts());
                if let Some(arn) = &summary.policy_arn {
                    event = event.policy(arn);
                }
                self.record(event);
            }
            Err(err) => {
                self.record(
                    EnforcementAuditEvent::new("sweep_aborted", AuditLevel::Error)
                        .error(err.kind(), err.to_string()),
                );
            }
        }
        result
    }

    /// Runs one sweep without a deadline.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcementError`] when policy resolution or enumeration fails.
    pub async fn sweep(&self) -> Result<SweepSummary, EnforcementError> {
        let (policy_arn, policy_created) = self.resolve_policy().await?;
        let mut principals = self.list_all(PrincipalKind::User).await?;
        principals.extend(self.list_all(PrincipalKind::Group).await?);

        let mut summary = SweepSummary {
            policy_arn: Some(policy_arn.clone()),
            policy_created,
            ..SweepSummary::default()
        };
        for principal in principals {
            match self.lock_principal(&principal, &policy_arn).await {
                Ok(PrincipalOutcome::Attached) => {
                    self.record(
                        EnforcementAuditEvent::new("principal_attached", AuditLevel::Info)
                            .principal(&principal)
                            .policy(&policy_arn),
                    );
                    summary.attached.push(principal);
                }
                Ok(PrincipalOutcome::AlreadyCompliant) => {
                    self.record(
                        EnforcementAuditEvent::new("principal_compliant", AuditLevel::Info)
                            .principal(&principal),
                    );
                    summary.already_compliant.push(principal);
                }
                Err(err) => {
                    self.record(
                        EnforcementAuditEvent::new("principal_failed", AuditLevel::Error)
                            .principal(&principal)
                            .error(err.kind(), err.to_string()),
                    );
                    summary.failed.push(PrincipalFailure {
                        principal,
                        error_kind: err.kind().to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(summary)
    }

    /// Resolves the deny-all policy ARN, creating the policy when absent.
    async fn resolve_policy(&self) -> Result<(PolicyArn, bool), EnforcementError> {
        let ctx = self.retry_context();
        let retry = &self.settings.retry;
        let directory = self.directory.as_ref();
        let identity =
            retry_transient(retry, &ctx, operations::GET_CALLER_IDENTITY, || {
                directory.caller_identity()
            })
            .await
            .map_err(|source| directory_error(operations::GET_CALLER_IDENTITY, source))?;
        let policy = &self.settings.policy;
        let arn = policy.arn(&identity.partition, &identity.account);

        let exists = retry_transient(retry, &ctx, operations::GET_POLICY, || {
            directory.policy_exists(&arn)
        })
        .await
        .map_err(|source| directory_error(operations::GET_POLICY, source))?;

        let (arn, created) = if exists {
            (arn, false)
        } else {
            match retry_transient(retry, &ctx, operations::CREATE_POLICY, || {
                directory.create_policy(policy)
            })
            .await
            {
                Ok(created_arn) => (created_arn, true),
                Err(DirectoryError::AlreadyExists(_)) => (arn, false),
                Err(source) => return Err(directory_error(operations::CREATE_POLICY, source)),
            }
        };
        self.record(
            EnforcementAuditEvent::new("policy_resolved", AuditLevel::Info)
                .policy(&arn)
                .message(if created { "created" } else { "existing" }),
        );
        Ok((arn, created))
    }

    /// Lists every principal of one kind, following continuation markers.
    async fn list_all(&self, kind: PrincipalKind) -> Result<Vec<Principal>, EnforcementError> {
        let ctx = self.retry_context();
        let operation = operations::list(kind);
        let directory = self.directory.as_ref();
        let page_size = self.settings.page_size;
        let mut principals = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let current = marker.clone();
            let page = retry_transient(&self.settings.retry, &ctx, operation, || {
                directory.list_principals(kind, current.as_deref(), page_size)
            })
            .await
            .map_err(|source| directory_error(operation, source))?;
            principals.extend(page.items);
            match page.next_marker {
                Some(next) if marker.as_deref() == Some(next.as_str()) => {
                    return Err(EnforcementError::StalledPagination {
                        operation,
                    });
                }
                Some(next) => marker = Some(next),
                None => return Ok(principals),
            }
        }
    }

    /// Attaches the policy to one principal unless already attached.
    ///
    /// A failed compliance read falls through to the attach, which is
    /// idempotent; only a failed attach fails the principal.
    async fn lock_principal(
        &self,
        principal: &Principal,
        policy_arn: &PolicyArn,
    ) -> Result<PrincipalOutcome, DirectoryError> {
        match self.has_policy(principal, policy_arn).await {
            Ok(true) => return Ok(PrincipalOutcome::AlreadyCompliant),
            Ok(false) => {}
            Err(err) => {
                self.record(
                    EnforcementAuditEvent::new("compliance_check_failed", AuditLevel::Warn)
                        .operation(operations::list_attached(principal.kind))
                        .principal(principal)
                        .error(err.kind(), err.to_string()),
                );
            }
        }
        let ctx = self.retry_context();
        let directory = self.directory.as_ref();
        retry_transient(&self.settings.retry, &ctx, operations::attach(principal.kind), || {
            directory.attach_policy(principal, policy_arn)
        })
        .await?;
        Ok(PrincipalOutcome::Attached)
    }

    /// Returns true when the principal already has the policy attached.
    async fn has_policy(
        &self,
        principal: &Principal,
        policy_arn: &PolicyArn,
    ) -> Result<bool, DirectoryError> {
        let ctx = self.retry_context();
        let operation = operations::list_attached(principal.kind);
        let directory = self.directory.as_ref();
        let page_size = self.settings.page_size;
        let mut marker: Option<String> = None;
        loop {
            let current = marker.clone();
            let page = retry_transient(&self.settings.retry, &ctx, operation, || {
                directory.list_attached_policies(principal, current.as_deref(), page_size)
            })
            .await?;
            if page.items.iter().any(|arn| arn == policy_arn) {
                return Ok(true);
            }
            match page.next_marker {
                Some(next) if marker.as_deref() == Some(next.as_str()) => {
                    return Err(DirectoryError::Rejected(format!(
                        "{operation} returned a repeated continuation marker"
                    )));
                }
                Some(next) => marker = Some(next),
                None => return Ok(false),
            }
        }
    }

    /// Builds the retry context for this invocation.
    fn retry_context(&self) -> RetryContext<'_> {
        RetryContext {
            audit: self.audit.as_ref(),
            invocation_id: self.invocation_id.as_deref(),
        }
    }

    /// Records an audit event tagged with the invocation identifier.
    fn record(&self, event: EnforcementAuditEvent) {
        self.audit.record(&event.invocation(self.invocation_id.as_deref()));
    }
}

/// Wraps a directory error with its operation label.
fn directory_error(operation: &'static str, source: DirectoryError) -> EnforcementError {
    EnforcementError::Directory {
        operation,
        source,
    }
}
