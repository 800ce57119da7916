// crates/budget-enforcer-core/tests/common/mod.rs
// ============================================================================
// Module: Sweep Test Fixtures
// Description: Shared builders for enforcement sweep tests.
// ============================================================================
//! ## Overview
//! Budget notification payloads and enforcer wiring over the in-memory
//! directory.

#![allow(dead_code, reason = "Each test binary uses a subset of the fixtures.")]

use std::sync::Arc;

use budget_enforcer_core::AccountId;
use budget_enforcer_core::Enforcer;
use budget_enforcer_core::EnforcerSettings;
use budget_enforcer_core::IdentityDirectory;
use budget_enforcer_core::InMemoryIdentityDirectory;
use budget_enforcer_core::RecordingAuditSink;
use budget_enforcer_core::RetryPolicy;
use serde_json::Value;
use serde_json::json;

/// Account the directory belongs to.
pub const ACCOUNT: &str = "123456789012";
/// Unrelated account.
pub const OTHER_ACCOUNT: &str = "210987654321";

/// Builds an SNS-wrapped budget notification from the given account.
pub fn budget_event(account: &str) -> Value {
    let topic_arn = format!("arn:aws:sns:us-east-1:{account}:BudgetAlarm-DenyAll");
    let message = "Budget Name: Monthly-50USD-Limit\nBudget Type: Cost\nAlert Type: ACTUAL\n";
    json!({
        "Records": [{
            "EventSource": "aws:sns",
            "EventVersion": "1.0",
            "EventSubscriptionArn": format!("{topic_arn}:1c2f"),
            "Sns": {
                "Type": "Notification",
                "MessageId": "6f3a2d4e-0000-4000-8000-000000000001",
                "TopicArn": topic_arn,
                "Subject": "AWS Budgets: Monthly-50USD-Limit has exceeded your alert threshold",
                "Message": message,
                "Timestamp": "2026-10-01T00:00:00.000Z"
            }
        }]
    })
}

/// Settings that retry immediately so tests never sleep.
pub fn fast_settings() -> EnforcerSettings {
    EnforcerSettings {
        retry: RetryPolicy::immediate(5),
        ..EnforcerSettings::default()
    }
}

/// Builds a directory with the given users and groups.
pub fn directory(users: &[&str], groups: &[&str]) -> Arc<InMemoryIdentityDirectory> {
    Arc::new(
        InMemoryIdentityDirectory::new(AccountId::new(ACCOUNT))
            .with_users(users.iter().copied())
            .with_groups(groups.iter().copied()),
    )
}

/// Wires an enforcer over the directory with a recording audit sink.
pub fn enforcer(
    directory: &Arc<InMemoryIdentityDirectory>,
    settings: EnforcerSettings,
) -> (Enforcer, Arc<RecordingAuditSink>) {
    let audit = Arc::new(RecordingAuditSink::new());
    let backend: Arc<dyn IdentityDirectory> = directory.clone();
    (Enforcer::new(backend, settings, audit.clone()), audit)
}
