// crates/budget-enforcer-lambda/src/main.rs
// ============================================================================
// Module: Bootstrap Entry Point
// Description: Custom runtime binary for the enforcement function.
// Purpose: Wire the AWS directory and stderr audit sink into the handler.
// Dependencies: budget-enforcer-aws, budget-enforcer-lambda, lambda_runtime, tokio
// ============================================================================

//! ## Overview
//! Configuration is read once at cold start; an invalid environment fails
//! initialization before any event is accepted. Audit events go to stderr,
//! which the runtime forwards to `CloudWatch` Logs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use budget_enforcer_aws::AwsClientOptions;
use budget_enforcer_aws::AwsIdentityDirectory;
use budget_enforcer_config::EnvSource;
use budget_enforcer_core::StderrAuditSink;
use budget_enforcer_lambda::EnforcementHandler;
use lambda_runtime::Error;
use lambda_runtime::LambdaEvent;
use lambda_runtime::service_fn;
use serde_json::Value;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Runtime entry point.
#[tokio::main]
async fn main() -> Result<(), Error> {
    let directory = Arc::new(AwsIdentityDirectory::load(AwsClientOptions::default()).await);
    let handler =
        EnforcementHandler::from_env(&EnvSource::process(), directory, Arc::new(StderrAuditSink))?;
    let handler = &handler;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handler.handle(&event.context.request_id, &event.payload).await.map_err(Error::from)
    }))
    .await
}
