// crates/budget-enforcer-aws/src/directory.rs
// ============================================================================
// Module: AWS Identity Directory
// Description: IAM and STS backed implementation of IdentityDirectory.
// Purpose: Run enforcement sweeps against a live account.
// Dependencies: async-trait, aws-config, aws-sdk-iam, aws-sdk-sts
// ============================================================================

//! ## Overview
//! Each trait method issues exactly one SDK request. The shared SDK config is
//! loaded the standard way (environment, profile, instance role) with an
//! optional region and endpoint override. SDK retries are turned off so every
//! retry goes through the sweep's retry policy and shows up in the audit log.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_config::retry::RetryConfig;
use budget_enforcer_core::AccountId;
use budget_enforcer_core::CallerIdentity;
use budget_enforcer_core::DenyAllPolicy;
use budget_enforcer_core::DirectoryError;
use budget_enforcer_core::IdentityDirectory;
use budget_enforcer_core::Page;
use budget_enforcer_core::PolicyArn;
use budget_enforcer_core::Principal;
use budget_enforcer_core::PrincipalKind;
use budget_enforcer_core::parse_arn;

use crate::errors::classify_sdk_error;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Overrides applied when loading the shared SDK config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsClientOptions {
    /// Region override; the default provider chain applies when unset.
    pub region: Option<String>,
    /// Endpoint override, for local emulators.
    pub endpoint: Option<String>,
}

// ============================================================================
// SECTION: Directory
// ============================================================================

/// Identity directory backed by IAM and STS.
#[derive(Clone)]
pub struct AwsIdentityDirectory {
    /// IAM client.
    iam: aws_sdk_iam::Client,
    /// STS client.
    sts: aws_sdk_sts::Client,
}

impl AwsIdentityDirectory {
    /// Loads credentials and region from the environment and builds clients.
    pub async fn load(options: AwsClientOptions) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).retry_config(RetryConfig::disabled());
        if let Some(region) = options.region {
            loader = loader.region(Region::new(region));
        }
        if let Some(endpoint) = options.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared_config = loader.load().await;
        let iam = aws_sdk_iam::Client::from_conf(
            aws_sdk_iam::config::Builder::from(&shared_config).build(),
        );
        let sts = aws_sdk_sts::Client::from_conf(
            aws_sdk_sts::config::Builder::from(&shared_config).build(),
        );
        Self::from_clients(iam, sts)
    }

    /// Wraps pre-built clients.
    #[must_use]
    pub const fn from_clients(iam: aws_sdk_iam::Client, sts: aws_sdk_sts::Client) -> Self {
        Self {
            iam,
            sts,
        }
    }

    /// Lists attached policy ARNs for a user.
    async fn attached_user_policies(
        &self,
        user: &str,
        marker: Option<&str>,
        page_size: u16,
    ) -> Result<Page<PolicyArn>, DirectoryError> {
        let output = self
            .iam
            .list_attached_user_policies()
            .user_name(user)
            .set_marker(marker.map(ToString::to_string))
            .max_items(i32::from(page_size))
            .send()
            .await
            .map_err(|err| classify_sdk_error(&err))?;
        next_page(
            attached_arns(output.attached_policies()),
            output.is_truncated(),
            output.marker(),
        )
    }

    /// Lists attached policy ARNs for a group.
    async fn attached_group_policies(
        &self,
        group: &str,
        marker: Option<&str>,
        page_size: u16,
    ) -> Result<Page<PolicyArn>, DirectoryError> {
        let output = self
            .iam
            .list_attached_group_policies()
            .group_name(group)
            .set_marker(marker.map(ToString::to_string))
            .max_items(i32::from(page_size))
            .send()
            .await
            .map_err(|err| classify_sdk_error(&err))?;
        next_page(
            attached_arns(output.attached_policies()),
            output.is_truncated(),
            output.marker(),
        )
    }
}

#[async_trait]
impl IdentityDirectory for AwsIdentityDirectory {
    async fn caller_identity(&self) -> Result<CallerIdentity, DirectoryError> {
        let output = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|err| classify_sdk_error(&err))?;
        caller_from_parts(output.account(), output.arn())
    }

    async fn policy_exists(&self, arn: &PolicyArn) -> Result<bool, DirectoryError> {
        match self.iam.get_policy().policy_arn(arn.as_str()).send().await {
            Ok(_) => Ok(true),
            Err(err) => match classify_sdk_error(&err) {
                DirectoryError::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn create_policy(&self, policy: &DenyAllPolicy) -> Result<PolicyArn, DirectoryError> {
        let document = policy
            .document
            .to_json()
            .map_err(|err| DirectoryError::Rejected(format!("policy document: {err}")))?;
        let output = self
            .iam
            .create_policy()
            .policy_name(&policy.name)
            .policy_document(document)
            .description(&policy.description)
            .send()
            .await
            .map_err(|err| classify_sdk_error(&err))?;
        output
            .policy()
            .and_then(|created| created.arn())
            .map(PolicyArn::new)
            .ok_or_else(|| DirectoryError::Rejected("create_policy returned no arn".to_string()))
    }

    async fn list_principals(
        &self,
        kind: PrincipalKind,
        marker: Option<&str>,
        page_size: u16,
    ) -> Result<Page<Principal>, DirectoryError> {
        let marker = marker.map(ToString::to_string);
        let max_items = i32::from(page_size);
        match kind {
            PrincipalKind::User => {
                let output = self
                    .iam
                    .list_users()
                    .set_marker(marker)
                    .max_items(max_items)
                    .send()
                    .await
                    .map_err(|err| classify_sdk_error(&err))?;
                let users =
                    output.users().iter().map(|user| Principal::user(user.user_name())).collect();
                next_page(users, output.is_truncated(), output.marker())
            }
            PrincipalKind::Group => {
                let output = self
                    .iam
                    .list_groups()
                    .set_marker(marker)
                    .max_items(max_items)
                    .send()
                    .await
                    .map_err(|err| classify_sdk_error(&err))?;
                let groups = output
                    .groups()
                    .iter()
                    .map(|group| Principal::group(group.group_name()))
                    .collect();
                next_page(groups, output.is_truncated(), output.marker())
            }
        }
    }

    async fn list_attached_policies(
        &self,
        principal: &Principal,
        marker: Option<&str>,
        page_size: u16,
    ) -> Result<Page<PolicyArn>, DirectoryError> {
        match principal.kind {
            PrincipalKind::User => {
                self.attached_user_policies(&principal.name, marker, page_size).await
            }
            PrincipalKind::Group => {
                self.attached_group_policies(&principal.name, marker, page_size).await
            }
        }
    }

    async fn attach_policy(
        &self,
        principal: &Principal,
        policy: &PolicyArn,
    ) -> Result<(), DirectoryError> {
        match principal.kind {
            PrincipalKind::User => self
                .iam
                .attach_user_policy()
                .user_name(&principal.name)
                .policy_arn(policy.as_str())
                .send()
                .await
                .map(|_| ())
                .map_err(|err| classify_sdk_error(&err)),
            PrincipalKind::Group => self
                .iam
                .attach_group_policy()
                .group_name(&principal.name)
                .policy_arn(policy.as_str())
                .send()
                .await
                .map(|_| ())
                .map_err(|err| classify_sdk_error(&err)),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a page from a truncated IAM listing.
///
/// # Errors
///
/// Returns [`DirectoryError::Rejected`] when the listing claims truncation but
/// carries no marker to continue from.
pub(crate) fn next_page<T>(
    items: Vec<T>,
    is_truncated: bool,
    marker: Option<&str>,
) -> Result<Page<T>, DirectoryError> {
    if !is_truncated {
        return Ok(Page::last(items));
    }
    match marker.filter(|marker| !marker.is_empty()) {
        Some(marker) => Ok(Page {
            items,
            next_marker: Some(marker.to_string()),
        }),
        None => Err(DirectoryError::Rejected(
            "truncated listing returned no continuation marker".to_string(),
        )),
    }
}

/// Collects the ARNs of attached managed policies.
fn attached_arns(policies: &[aws_sdk_iam::types::AttachedPolicy]) -> Vec<PolicyArn> {
    policies.iter().filter_map(|policy| policy.policy_arn()).map(PolicyArn::new).collect()
}

/// Builds the caller identity from `GetCallerIdentity` fields.
///
/// The partition comes from the caller ARN and defaults to `aws`.
pub(crate) fn caller_from_parts(
    account: Option<&str>,
    arn: Option<&str>,
) -> Result<CallerIdentity, DirectoryError> {
    let account = account.and_then(AccountId::parse).ok_or_else(|| {
        DirectoryError::Rejected("caller identity returned no valid account".to_string())
    })?;
    let partition =
        arn.and_then(parse_arn).map(|parts| parts.partition).unwrap_or_default();
    Ok(CallerIdentity {
        account,
        partition,
    })
}
