// crates/budget-enforcer-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and bounded reads.
// Purpose: Ensure flags combine correctly and oversized inputs fail closed.
// Dependencies: clap, tempfile
// ============================================================================

//! ## Overview
//! Checks dry-run flag constraints, exit code mapping, and
//! `read_bytes_with_limit`.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use budget_enforcer_core::EnforcementOutcome;
use budget_enforcer_core::Principal;
use budget_enforcer_core::PrincipalFailure;
use budget_enforcer_core::SweepSummary;
use clap::Parser;

use super::Cli;
use super::Commands;
use super::ReadLimitError;
use super::exit_status_for;
use super::read_bytes_with_limit;

// ============================================================================
// SECTION: Parsing
// ============================================================================

#[test]
fn enforce_accepts_repeated_seed_flags_with_dry_run() {
    let cli = Cli::try_parse_from([
        "budget-enforcer",
        "enforce",
        "--event",
        "event.json",
        "--dry-run",
        "--user",
        "alice",
        "--user",
        "bob",
        "--group",
        "admins",
    ])
    .expect("parse");
    let Some(Commands::Enforce(command)) = cli.command else {
        panic!("expected enforce command");
    };
    assert!(command.dry_run);
    assert_eq!(command.users, vec!["alice", "bob"]);
    assert_eq!(command.groups, vec!["admins"]);
}

#[test]
fn seed_flags_require_dry_run() {
    let result =
        Cli::try_parse_from(["budget-enforcer", "enforce", "--event", "e.json", "--user", "a"]);
    assert!(result.is_err());
}

#[test]
fn region_conflicts_with_dry_run() {
    let result = Cli::try_parse_from([
        "budget-enforcer",
        "enforce",
        "--event",
        "e.json",
        "--dry-run",
        "--region",
        "us-west-2",
    ]);
    assert!(result.is_err());
}

// ============================================================================
// SECTION: Exit Codes
// ============================================================================

#[test]
fn partial_failures_exit_with_code_two() {
    let clean = EnforcementOutcome::completed(SweepSummary::default());
    assert_eq!(exit_status_for(&clean), 0);
    let partial = EnforcementOutcome::completed(SweepSummary {
        failed: vec![PrincipalFailure {
            principal: Principal::user("alice"),
            error_kind: "limit_exceeded".to_string(),
            message: "quota".to_string(),
        }],
        ..SweepSummary::default()
    });
    assert_eq!(exit_status_for(&partial), 2);
    let skipped = EnforcementOutcome::Skipped {
        reason: "missing_records".to_string(),
        detail: String::new(),
    };
    assert_eq!(exit_status_for(&skipped), 0);
}

// ============================================================================
// SECTION: Bounded Reads
// ============================================================================

#[test]
fn read_bytes_with_limit_allows_small_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("event.json");
    std::fs::write(&path, b"{}").expect("write");
    assert_eq!(read_bytes_with_limit(&path, 16).expect("read"), b"{}");
}

#[test]
fn read_bytes_with_limit_rejects_large_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("event.json");
    std::fs::write(&path, vec![b'a'; 32]).expect("write");
    match read_bytes_with_limit(&path, 16) {
        Err(ReadLimitError::TooLarge {
            size,
            limit,
        }) => {
            assert_eq!(size, 32);
            assert_eq!(limit, 16);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn read_bytes_with_limit_reports_missing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = read_bytes_with_limit(&dir.path().join("absent.json"), 16);
    assert!(matches!(result, Err(ReadLimitError::Io(_))));
}
