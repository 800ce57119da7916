// crates/budget-enforcer-aws/src/errors.rs
// ============================================================================
// Module: SDK Error Classification
// Description: Maps SDK failures onto directory error variants.
// Purpose: Separate transient, authorization, and permanent failures.
// Dependencies: aws-sdk-iam, budget-enforcer-core
// ============================================================================

//! ## Overview
//! Transport failures (timeouts, dispatch failures, unparseable responses)
//! are transient. Service errors are classified by their error code; unknown
//! codes are permanent rejections.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::error::Error as StdError;
use std::fmt::Debug;

use aws_sdk_iam::error::DisplayErrorContext;
use aws_sdk_iam::error::ProvideErrorMetadata;
use aws_sdk_iam::error::SdkError;
use budget_enforcer_core::DirectoryError;

// ============================================================================
// SECTION: Error Codes
// ============================================================================

/// Codes returned when a request is rate limited.
const THROTTLING_CODES: [&str; 5] = [
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
    "RequestThrottled",
];
/// Codes returned when the caller lacks permission or credentials.
const ACCESS_DENIED_CODES: [&str; 6] = [
    "AccessDenied",
    "AccessDeniedException",
    "UnauthorizedOperation",
    "InvalidClientTokenId",
    "ExpiredToken",
    "SignatureDoesNotMatch",
];
/// Codes returned when the service fails internally.
const UNAVAILABLE_CODES: [&str; 4] =
    ["ServiceFailure", "ServiceUnavailable", "InternalFailure", "InternalError"];

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Classifies a service error code.
#[must_use]
pub fn classify_code(code: Option<&str>, message: String) -> DirectoryError {
    match code {
        Some(code) if THROTTLING_CODES.contains(&code) => DirectoryError::Throttled(message),
        Some(code) if ACCESS_DENIED_CODES.contains(&code) => DirectoryError::AccessDenied(message),
        Some(code) if UNAVAILABLE_CODES.contains(&code) => DirectoryError::Unavailable(message),
        Some("NoSuchEntity") => DirectoryError::NotFound(message),
        Some("EntityAlreadyExists") => DirectoryError::AlreadyExists(message),
        Some("LimitExceeded") => DirectoryError::LimitExceeded(message),
        _ => DirectoryError::Rejected(message),
    }
}

/// Classifies an SDK error from any IAM or STS operation.
#[must_use]
pub fn classify_sdk_error<E, R>(err: &SdkError<E, R>) -> DirectoryError
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    let message = DisplayErrorContext(err).to_string();
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            DirectoryError::Unavailable(message)
        }
        _ => classify_code(err.code(), message),
    }
}
