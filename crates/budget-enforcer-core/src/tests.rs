// crates/budget-enforcer-core/src/tests.rs
// ============================================================================
// Module: Budget Enforcer Core Unit Tests
// Description: Unit tests for identifiers, events, policy documents, retry.
// Purpose: Validate parsing and helper behavior below the sweep level.
// Dependencies: budget-enforcer-core, serde_json
// ============================================================================

//! ## Overview
//! Exercises ARN parsing, SNS event validation, deny-all document shape, and
//! retry backoff bounds.

#![allow(
    clippy::use_debug,
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::time::Duration;

use serde_json::json;

use crate::audit::AuditLevel;
use crate::audit::EnforcementAuditEvent;
use crate::audit::EnforcementAuditSink;
use crate::audit::FileAuditSink;
use crate::core::event::EnforcementEvent;
use crate::core::event::EventError;
use crate::core::event::extract_budget_name;
use crate::core::identifiers::AccountId;
use crate::core::identifiers::Partition;
use crate::core::identifiers::PolicyArn;
use crate::core::identifiers::parse_arn;
use crate::core::policy::DenyAllPolicy;
use crate::core::policy::PolicyDocument;
use crate::core::policy::is_valid_policy_name;
use crate::runtime::retry::RetryPolicy;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn sns_event(topic_arn: &str, message: &str) -> serde_json::Value {
    json!({
        "Records": [{
            "EventSource": "aws:sns",
            "EventVersion": "1.0",
            "Sns": {
                "Type": "Notification",
                "MessageId": "95df01b4-ee98-5cb9-9903-4c221d41eb5e",
                "TopicArn": topic_arn,
                "Subject": "AWS Budgets: Monthly-50USD-Limit has exceeded your alert threshold",
                "Message": message,
                "Timestamp": "2026-10-01T00:00:00.000Z"
            }
        }]
    })
}

const BUDGET_MESSAGE: &str = "AWS Budget Notification October 01, 2026\n\
AWS Account 123456789012\n\
\n\
Dear AWS Customer,\n\
\n\
You requested that we alert you when the ACTUAL Cost associated with your \
Monthly-50USD-Limit budget is greater than $50.00 for the current month.\n\
\n\
Budget Name: Monthly-50USD-Limit\n\
Budget Type: Cost\n\
Budgeted Amount: $50.00\n\
Alert Type: ACTUAL\n\
Alert Threshold: > $50.00\n";

// ============================================================================
// SECTION: Identifiers
// ============================================================================

#[test]
fn account_id_requires_twelve_digits() {
    assert!(AccountId::parse("123456789012").is_some());
    assert!(AccountId::parse(" 123456789012 ").is_some());
    assert!(AccountId::parse("12345678901").is_none());
    assert!(AccountId::parse("12345678901a").is_none());
    assert!(AccountId::parse("").is_none());
}

#[test]
fn parse_arn_extracts_partition_and_account() {
    let parts = parse_arn("arn:aws-us-gov:sns:us-gov-west-1:123456789012:BudgetAlarm-DenyAll")
        .expect("valid arn");
    assert_eq!(parts.partition, Partition::new("aws-us-gov"));
    assert_eq!(parts.service, "sns");
    assert_eq!(parts.region, "us-gov-west-1");
    assert_eq!(parts.account, AccountId::parse("123456789012"));
    assert_eq!(parts.resource, "BudgetAlarm-DenyAll");
}

#[test]
fn parse_arn_rejects_short_values() {
    assert!(parse_arn("arn:aws:sns").is_none());
    assert!(parse_arn("urn:aws:sns:us-east-1:123456789012:topic").is_none());
}

#[test]
fn customer_managed_arn_has_iam_shape() {
    let arn = PolicyArn::customer_managed(
        &Partition::default(),
        &AccountId::new("123456789012"),
        "BudgetExceeded-DenyAll",
    );
    assert_eq!(arn.as_str(), "arn:aws:iam::123456789012:policy/BudgetExceeded-DenyAll");
}

// ============================================================================
// SECTION: Policy Document
// ============================================================================

#[test]
fn deny_all_document_serializes_in_iam_shape() {
    let json = PolicyDocument::deny_all().to_json().expect("serialize");
    let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
    assert_eq!(
        value,
        json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Sid": "DenyAllWhenBudgetExceeded",
                "Effect": "Deny",
                "Action": "*",
                "Resource": "*"
            }]
        })
    );
}

#[test]
fn deny_all_document_denies_everything() {
    assert!(PolicyDocument::deny_all().denies_everything());
    let parsed: PolicyDocument = serde_json::from_value(json!({
        "Version": "2012-10-17",
        "Statement": [{"Effect": "Deny", "Action": ["s3:*"], "Resource": "*"}]
    }))
    .expect("parse");
    assert!(!parsed.denies_everything());
}

#[test]
fn default_policy_name_is_valid() {
    assert!(is_valid_policy_name(&DenyAllPolicy::default().name));
    assert!(!is_valid_policy_name("has spaces"));
    assert!(!is_valid_policy_name(""));
    assert!(!is_valid_policy_name(&"x".repeat(129)));
}

// ============================================================================
// SECTION: Events
// ============================================================================

#[test]
fn budget_event_parses_origin_and_budget_name() {
    let event = EnforcementEvent::from_value(&sns_event(
        "arn:aws:sns:us-east-1:123456789012:BudgetAlarm-DenyAll",
        BUDGET_MESSAGE,
    ))
    .expect("valid event");
    let notification = event.primary().expect("notification");
    assert_eq!(notification.origin_account.as_str(), "123456789012");
    assert_eq!(notification.partition.as_str(), "aws");
    assert_eq!(notification.budget_name.as_deref(), Some("Monthly-50USD-Limit"));
    assert!(event.is_from_account(&AccountId::new("123456789012")));
    assert!(!event.is_from_account(&AccountId::new("210987654321")));
}

#[test]
fn event_without_records_is_rejected() {
    assert_eq!(EnforcementEvent::from_value(&json!({})), Err(EventError::MissingRecords));
    assert_eq!(
        EnforcementEvent::from_value(&json!({"Records": []})),
        Err(EventError::MissingRecords)
    );
    assert_eq!(EnforcementEvent::from_value(&json!("hello")), Err(EventError::NotAnObject));
}

#[test]
fn event_missing_topic_or_message_is_rejected() {
    let no_topic = json!({"Records": [{"EventSource": "aws:sns", "Sns": {"Message": "x"}}]});
    assert_eq!(
        EnforcementEvent::from_value(&no_topic),
        Err(EventError::MissingField("Sns.TopicArn"))
    );
    let blank_message = sns_event("arn:aws:sns:us-east-1:123456789012:t", "  ");
    assert_eq!(
        EnforcementEvent::from_value(&blank_message),
        Err(EventError::MissingField("Sns.Message"))
    );
}

#[test]
fn event_from_other_source_is_rejected() {
    let value = json!({"Records": [{"EventSource": "aws:sqs", "Sns": {}}]});
    assert_eq!(
        EnforcementEvent::from_value(&value),
        Err(EventError::UnexpectedSource("aws:sqs".to_string()))
    );
}

#[test]
fn event_with_non_sns_topic_is_rejected() {
    let value = sns_event("arn:aws:sqs:us-east-1:123456789012:queue", "x");
    assert!(matches!(EnforcementEvent::from_value(&value), Err(EventError::InvalidTopicArn(_))));
}

#[test]
fn budget_name_extraction_ignores_missing_line() {
    assert_eq!(extract_budget_name("no budget here"), None);
    assert_eq!(extract_budget_name("Budget Name:   \n"), None);
    assert_eq!(extract_budget_name("  Budget Name: Ops \n"), Some("Ops".to_string()));
}

// ============================================================================
// SECTION: Retry Policy
// ============================================================================

#[test]
fn retry_delay_grows_and_caps_without_jitter() {
    let policy = RetryPolicy {
        max_attempts: 6,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(500),
        jitter: false,
    };
    assert_eq!(policy.delay_for(1), Duration::from_millis(100));
    assert_eq!(policy.delay_for(2), Duration::from_millis(200));
    assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    assert_eq!(policy.delay_for(4), Duration::from_millis(500));
    assert_eq!(policy.delay_for(60), Duration::from_millis(500));
}

#[test]
fn retry_delay_jitter_stays_within_half_to_full() {
    let policy = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(400),
        max_delay: Duration::from_secs(5),
        jitter: true,
    };
    for _ in 0 .. 64 {
        let delay = policy.delay_for(1);
        assert!(delay >= Duration::from_millis(200), "delay {delay:?} too short");
        assert!(delay <= Duration::from_millis(400), "delay {delay:?} too long");
    }
}

#[test]
fn retry_allowance_counts_first_attempt() {
    let policy = RetryPolicy::immediate(3);
    assert!(policy.allows_retry(1));
    assert!(policy.allows_retry(2));
    assert!(!policy.allows_retry(3));
    assert!(!RetryPolicy::no_retry().allows_retry(1));
}

// ============================================================================
// SECTION: Audit
// ============================================================================

#[test]
fn file_audit_sink_appends_json_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("audit.log");
    let sink = FileAuditSink::new(&path).expect("open sink");
    sink.record(&EnforcementAuditEvent::new("sweep_started", AuditLevel::Info));
    sink.record(
        &EnforcementAuditEvent::new("sweep_aborted", AuditLevel::Error)
            .error("access_denied", "nope"),
    );
    let content = std::fs::read_to_string(&path).expect("read log");
    let lines: Vec<serde_json::Value> =
        content.lines().map(|line| serde_json::from_str(line).expect("json line")).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["event"], "sweep_started");
    assert!(lines[0].get("error_kind").is_none());
    assert_eq!(lines[1]["level"], "error");
    assert_eq!(lines[1]["error_kind"], "access_denied");
}
