// crates/budget-enforcer-core/src/runtime/retry.rs
// ============================================================================
// Module: Retry Policy
// Description: Bounded exponential backoff for transient identity API errors.
// Purpose: Absorb throttling without surfacing it as an invocation failure.
// Dependencies: rand, tokio
// ============================================================================

//! ## Overview
//! Only errors that [`DirectoryError::is_transient`] reports are retried.
//! Delays grow exponentially from `base_delay`, are capped at `max_delay`,
//! and optionally scaled by a random factor in `[0.5, 1.0]` so concurrent
//! invocations do not retry in lockstep.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::audit::AuditLevel;
use crate::audit::EnforcementAuditEvent;
use crate::audit::EnforcementAuditSink;
use crate::interfaces::DirectoryError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum attempts (including the first).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(200);
/// Default cap on a single retry delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);
/// Largest exponent applied to the base delay.
const MAX_BACKOFF_SHIFT: u32 = 16;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Retry policy for transient identity API errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts including the first call.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Cap on any single delay.
    pub max_delay: Duration,
    /// Whether delays are randomized.
    pub jitter: bool,
}

impl RetryPolicy {
    /// Policy that never retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// Policy that retries immediately; used by tests and dry runs.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// Returns the delay to wait after the given failed attempt (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        let base = self.base_delay.saturating_mul(1u32 << shift).min(self.max_delay);
        if !self.jitter || base.is_zero() {
            return base;
        }
        let factor: f64 = rand::thread_rng().gen_range(0.5..=1.0);
        base.mul_f64(factor)
    }

    /// Returns true when another attempt is allowed after `attempt` failures.
    #[must_use]
    pub const fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: true,
        }
    }
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Context used to log scheduled retries.
pub struct RetryContext<'a> {
    /// Audit sink for retry events.
    pub audit: &'a dyn EnforcementAuditSink,
    /// Invocation identifier when known.
    pub invocation_id: Option<&'a str>,
}

/// Runs `call` until it succeeds, fails permanently, or attempts run out.
///
/// # Errors
///
/// Returns the last [`DirectoryError`] when the call fails permanently or
/// retries are exhausted.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    ctx: &RetryContext<'_>,
    operation: &'static str,
    mut call: F,
) -> Result<T, DirectoryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DirectoryError>>,
{
    let mut attempt = 1u32;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && policy.allows_retry(attempt) => {
                let delay = policy.delay_for(attempt);
                let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                ctx.audit.record(
                    &EnforcementAuditEvent::new("retry_scheduled", AuditLevel::Warn)
                        .invocation(ctx.invocation_id)
                        .operation(operation)
                        .retry(attempt, delay_ms)
                        .error(err.kind(), err.to_string()),
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
