// crates/budget-enforcer-core/src/audit.rs
// ============================================================================
// Module: Enforcement Audit Logging
// Description: Structured audit events for enforcement sweeps.
// Purpose: Emit JSON-line logs that operators can alert on.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every decision the sweep makes is recorded as a JSON line: rejected events,
//! policy resolution, each principal outcome, scheduled retries, and the final
//! result. Sinks are pluggable so deployments can route records to stderr
//! (CloudWatch for Lambda), to a file, or nowhere.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::identifiers::PolicyArn;
use crate::core::principal::Principal;
use crate::core::summary::SweepCounts;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Audit event severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditLevel {
    /// Routine progress.
    Info,
    /// Recoverable problem.
    Warn,
    /// Operator attention required.
    Error,
}

/// Enforcement audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct EnforcementAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Severity.
    pub level: AuditLevel,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Invocation identifier when provided by the runtime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation_id: Option<String>,
    /// Identity API operation the event refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<&'static str>,
    /// Principal the event refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    /// Deny-all policy ARN.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_arn: Option<PolicyArn>,
    /// Retry attempt number (1-based).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    /// Scheduled retry delay in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    /// Normalized error kind label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    /// Free-form detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Sweep counts (completion events only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<SweepCounts>,
}

impl EnforcementAuditEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(event: &'static str, level: AuditLevel) -> Self {
        Self {
            event,
            level,
            timestamp_ms: now_ms(),
            invocation_id: None,
            operation: None,
            principal: None,
            policy_arn: None,
            attempt: None,
            delay_ms: None,
            error_kind: None,
            message: None,
            counts: None,
        }
    }

    /// Sets the invocation identifier.
    #[must_use]
    pub fn invocation(mut self, invocation_id: Option<&str>) -> Self {
        self.invocation_id = invocation_id.map(ToString::to_string);
        self
    }

    /// Sets the identity API operation.
    #[must_use]
    pub const fn operation(mut self, operation: &'static str) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Sets the principal.
    #[must_use]
    pub fn principal(mut self, principal: &Principal) -> Self {
        self.principal = Some(principal.clone());
        self
    }

    /// Sets the policy ARN.
    #[must_use]
    pub fn policy(mut self, policy_arn: &PolicyArn) -> Self {
        self.policy_arn = Some(policy_arn.clone());
        self
    }

    /// Sets the retry attempt and delay.
    #[must_use]
    pub const fn retry(mut self, attempt: u32, delay_ms: u64) -> Self {
        self.attempt = Some(attempt);
        self.delay_ms = Some(delay_ms);
        self
    }

    /// Sets the error classification and message.
    #[must_use]
    pub fn error(mut self, kind: &'static str, message: impl Into<String>) -> Self {
        self.error_kind = Some(kind);
        self.message = Some(message.into());
        self
    }

    /// Sets a detail message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the sweep counts.
    #[must_use]
    pub const fn counts(mut self, counts: SweepCounts) -> Self {
        self.counts = Some(counts);
        self
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for enforcement events.
pub trait EnforcementAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &EnforcementAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl EnforcementAuditSink for StderrAuditSink {
    fn record(&self, event: &EnforcementAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl EnforcementAuditSink for FileAuditSink {
    fn record(&self, event: &EnforcementAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl EnforcementAuditSink for NoopAuditSink {
    fn record(&self, _event: &EnforcementAuditEvent) {}
}

/// Audit sink that keeps events in memory for inspection.
#[derive(Default)]
pub struct RecordingAuditSink {
    /// Recorded events in emission order.
    events: Mutex<Vec<EnforcementAuditEvent>>,
}

impl RecordingAuditSink {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<EnforcementAuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the names of recorded events.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(|event| event.event).collect()
    }
}

impl EnforcementAuditSink for RecordingAuditSink {
    fn record(&self, event: &EnforcementAuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current time in milliseconds since the Unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|elapsed| elapsed.as_millis()).unwrap_or(0)
}
