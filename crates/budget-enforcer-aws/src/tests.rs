// crates/budget-enforcer-aws/src/tests.rs
// ============================================================================
// Module: AWS Adapter Unit Tests
// Description: Unit tests for error classification and page handling.
// Purpose: Pin the mapping from SDK failures to directory errors.
// Dependencies: aws-sdk-iam, budget-enforcer-core
// ============================================================================

//! ## Overview
//! Classification decides whether the sweep retries, aborts, or records a
//! per-principal failure, so every code family is covered here.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use aws_sdk_iam::error::ErrorMetadata;
use aws_sdk_iam::error::SdkError;
use aws_sdk_iam::operation::get_policy::GetPolicyError;
use budget_enforcer_core::DirectoryError;

use crate::directory::caller_from_parts;
use crate::directory::next_page;
use crate::errors::classify_code;
use crate::errors::classify_sdk_error;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn service_error(code: &str) -> SdkError<GetPolicyError, ()> {
    let metadata = ErrorMetadata::builder().code(code).message("from service").build();
    SdkError::<GetPolicyError, ()>::service_error(GetPolicyError::generic(metadata), ())
}

// ============================================================================
// SECTION: Classification
// ============================================================================

#[test]
fn throttling_codes_are_transient() {
    for code in ["Throttling", "ThrottlingException", "RequestLimitExceeded"] {
        let err = classify_code(Some(code), "slow down".to_string());
        assert_eq!(err, DirectoryError::Throttled("slow down".to_string()), "code {code}");
        assert!(err.is_transient());
    }
}

#[test]
fn authorization_codes_are_access_denied() {
    for code in ["AccessDenied", "AccessDeniedException", "ExpiredToken", "InvalidClientTokenId"] {
        let err = classify_code(Some(code), "no".to_string());
        assert_eq!(err.kind(), "access_denied", "code {code}");
        assert!(!err.is_transient());
    }
}

#[test]
fn entity_codes_map_to_specific_variants() {
    assert_eq!(classify_code(Some("NoSuchEntity"), String::new()).kind(), "not_found");
    assert_eq!(classify_code(Some("EntityAlreadyExists"), String::new()).kind(), "already_exists");
    assert_eq!(classify_code(Some("LimitExceeded"), String::new()).kind(), "limit_exceeded");
    assert_eq!(classify_code(Some("ServiceFailure"), String::new()).kind(), "unavailable");
}

#[test]
fn unknown_or_missing_codes_are_rejected() {
    assert_eq!(classify_code(Some("MalformedPolicyDocument"), String::new()).kind(), "rejected");
    assert_eq!(classify_code(None, String::new()).kind(), "rejected");
}

#[test]
fn sdk_service_errors_use_their_code() {
    assert_eq!(classify_sdk_error(&service_error("NoSuchEntity")).kind(), "not_found");
    assert_eq!(classify_sdk_error(&service_error("Throttling")).kind(), "throttled");
    assert_eq!(classify_sdk_error(&service_error("AccessDenied")).kind(), "access_denied");
}

#[test]
fn sdk_timeouts_are_unavailable() {
    let err = SdkError::<GetPolicyError, ()>::timeout_error("deadline elapsed");
    let classified = classify_sdk_error(&err);
    assert_eq!(classified.kind(), "unavailable");
    assert!(classified.is_transient());
}

// ============================================================================
// SECTION: Paging
// ============================================================================

#[test]
fn untruncated_listing_is_last_page() {
    let page = next_page(vec![1, 2], false, Some("ignored")).expect("page");
    assert_eq!(page.items, vec![1, 2]);
    assert_eq!(page.next_marker, None);
}

#[test]
fn truncated_listing_carries_marker() {
    let page = next_page(vec![1], true, Some("abc")).expect("page");
    assert_eq!(page.next_marker.as_deref(), Some("abc"));
}

#[test]
fn truncated_listing_without_marker_is_rejected() {
    assert_eq!(next_page(vec![1], true, None).expect_err("no marker").kind(), "rejected");
    assert_eq!(next_page(vec![1], true, Some("")).expect_err("empty marker").kind(), "rejected");
}

// ============================================================================
// SECTION: Caller Identity
// ============================================================================

#[test]
fn caller_identity_takes_partition_from_arn() {
    let identity = caller_from_parts(
        Some("123456789012"),
        Some("arn:aws-cn:sts::123456789012:assumed-role/enforcer/session"),
    )
    .expect("identity");
    assert_eq!(identity.account.as_str(), "123456789012");
    assert_eq!(identity.partition.as_str(), "aws-cn");
}

#[test]
fn caller_identity_defaults_partition_and_requires_account() {
    let identity = caller_from_parts(Some("123456789012"), None).expect("identity");
    assert_eq!(identity.partition.as_str(), "aws");
    assert_eq!(caller_from_parts(None, None).expect_err("no account").kind(), "rejected");
    assert_eq!(caller_from_parts(Some("abc"), None).expect_err("bad account").kind(), "rejected");
}
