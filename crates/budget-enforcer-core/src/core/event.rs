// crates/budget-enforcer-core/src/core/event.rs
// ============================================================================
// Module: Enforcement Events
// Description: Parsing and minimal validation of SNS budget notifications.
// Purpose: Turn an untrusted invocation payload into a typed trigger.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The enforcement function is invoked by SNS with a `Records` envelope. Only
//! the fields needed to confirm a threshold crossing are required: each record
//! must carry a topic ARN and a message body. Everything else is optional
//! metadata kept for audit logging.
//!
//! Delivery is at-least-once, so parsing is pure and has no side effects.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::AccountId;
use crate::core::identifiers::Partition;
use crate::core::identifiers::parse_arn;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Event source label set by SNS on Lambda deliveries.
pub const SNS_EVENT_SOURCE: &str = "aws:sns";
/// Message prefix AWS Budgets uses for the budget name line.
const BUDGET_NAME_PREFIX: &str = "Budget Name:";
/// Maximum records accepted in a single invocation.
pub const MAX_RECORDS: usize = 10;

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Raw SNS invocation envelope.
#[derive(Debug, Clone, Deserialize)]
struct RawEnvelope {
    /// Delivered records.
    #[serde(rename = "Records", default)]
    records: Option<Vec<RawRecord>>,
}

/// Raw SNS record.
#[derive(Debug, Clone, Deserialize)]
struct RawRecord {
    /// Event source label.
    #[serde(rename = "EventSource", default)]
    event_source: Option<String>,
    /// SNS payload.
    #[serde(rename = "Sns", default)]
    sns: Option<RawSnsMessage>,
}

/// Raw SNS message body.
#[derive(Debug, Clone, Deserialize)]
struct RawSnsMessage {
    /// Message identifier.
    #[serde(rename = "MessageId", default)]
    message_id: Option<String>,
    /// Source topic ARN.
    #[serde(rename = "TopicArn", default)]
    topic_arn: Option<String>,
    /// Message subject.
    #[serde(rename = "Subject", default)]
    subject: Option<String>,
    /// Message body.
    #[serde(rename = "Message", default)]
    message: Option<String>,
    /// Publish timestamp.
    #[serde(rename = "Timestamp", default)]
    timestamp: Option<String>,
}

// ============================================================================
// SECTION: Typed Event
// ============================================================================

/// Validated threshold notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetNotification {
    /// SNS message identifier, when present.
    pub message_id: Option<String>,
    /// Topic the notification was published to.
    pub topic_arn: String,
    /// Account that owns the topic.
    pub origin_account: AccountId,
    /// Partition of the topic.
    pub partition: Partition,
    /// Notification subject, when present.
    pub subject: Option<String>,
    /// Budget name extracted from the message body, when present.
    pub budget_name: Option<String>,
    /// Publish timestamp, when present.
    pub timestamp: Option<String>,
}

/// Enforcement event delivered to the function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnforcementEvent {
    /// Validated notifications (at least one).
    pub notifications: Vec<BudgetNotification>,
}

impl EnforcementEvent {
    /// Parses and validates an invocation payload.
    ///
    /// # Errors
    ///
    /// Returns [`EventError`] when required fields are missing or malformed.
    pub fn from_value(value: &Value) -> Result<Self, EventError> {
        if !value.is_object() {
            return Err(EventError::NotAnObject);
        }
        let envelope: RawEnvelope = serde_json::from_value(value.clone())
            .map_err(|err| EventError::Decode(err.to_string()))?;
        let records = envelope.records.ok_or(EventError::MissingRecords)?;
        if records.is_empty() {
            return Err(EventError::MissingRecords);
        }
        if records.len() > MAX_RECORDS {
            return Err(EventError::TooManyRecords(records.len()));
        }
        let notifications =
            records.into_iter().map(parse_record).collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            notifications,
        })
    }

    /// Returns the first notification (always present after validation).
    #[must_use]
    pub fn primary(&self) -> Option<&BudgetNotification> {
        self.notifications.first()
    }

    /// Returns the account that published the event.
    #[must_use]
    pub fn origin_account(&self) -> Option<&AccountId> {
        self.primary().map(|notification| &notification.origin_account)
    }

    /// Returns true when every notification originates from `account`.
    #[must_use]
    pub fn is_from_account(&self, account: &AccountId) -> bool {
        self.notifications.iter().all(|notification| &notification.origin_account == account)
    }
}

/// Event validation errors.
///
/// # Invariants
/// - Variants are stable for audit classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// Payload is not a JSON object.
    #[error("event payload must be a json object")]
    NotAnObject,
    /// Payload could not be decoded.
    #[error("event payload decode failed: {0}")]
    Decode(String),
    /// Payload has no records.
    #[error("event payload has no records")]
    MissingRecords,
    /// Payload has more records than accepted.
    #[error("event payload has too many records: {0}")]
    TooManyRecords(usize),
    /// Record is not an SNS delivery.
    #[error("event record source is not sns: {0}")]
    UnexpectedSource(String),
    /// A required field is missing.
    #[error("event record missing field: {0}")]
    MissingField(&'static str),
    /// Topic ARN is malformed.
    #[error("event topic arn is invalid: {0}")]
    InvalidTopicArn(String),
}

impl EventError {
    /// Returns a stable label for audit logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotAnObject => "not_an_object",
            Self::Decode(_) => "decode",
            Self::MissingRecords => "missing_records",
            Self::TooManyRecords(_) => "too_many_records",
            Self::UnexpectedSource(_) => "unexpected_source",
            Self::MissingField(_) => "missing_field",
            Self::InvalidTopicArn(_) => "invalid_topic_arn",
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates a single SNS record.
fn parse_record(record: RawRecord) -> Result<BudgetNotification, EventError> {
    if let Some(source) = record.event_source
        && source != SNS_EVENT_SOURCE
    {
        return Err(EventError::UnexpectedSource(source));
    }
    let sns = record.sns.ok_or(EventError::MissingField("Sns"))?;
    let topic_arn = non_empty(sns.topic_arn).ok_or(EventError::MissingField("Sns.TopicArn"))?;
    let message = non_empty(sns.message).ok_or(EventError::MissingField("Sns.Message"))?;
    let parts =
        parse_arn(&topic_arn).ok_or_else(|| EventError::InvalidTopicArn(topic_arn.clone()))?;
    if parts.service != "sns" {
        return Err(EventError::InvalidTopicArn(topic_arn));
    }
    let origin_account =
        parts.account.ok_or_else(|| EventError::InvalidTopicArn(topic_arn.clone()))?;
    Ok(BudgetNotification {
        message_id: non_empty(sns.message_id),
        origin_account,
        partition: parts.partition,
        subject: non_empty(sns.subject),
        budget_name: extract_budget_name(&message),
        timestamp: non_empty(sns.timestamp),
        topic_arn,
    })
}

/// Drops blank strings.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Extracts the `Budget Name:` line from an AWS Budgets message body.
#[must_use]
pub fn extract_budget_name(message: &str) -> Option<String> {
    message.lines().find_map(|line| {
        let name = line.trim().strip_prefix(BUDGET_NAME_PREFIX)?.trim();
        if name.is_empty() { None } else { Some(name.to_string()) }
    })
}
