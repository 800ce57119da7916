// crates/budget-enforcer-stack/tests/template.rs
// =============================================================================
// Module: Template Synthesis Tests
// Description: Budget rules, resource wiring, and deterministic rendering.
// Purpose: Pin the observable contract of the provisioned stack.
// =============================================================================

//! ## Overview
//! Stack template synthesis tests for budget-enforcer-stack.

#![allow(
    clippy::use_debug,
    reason = "Test failure messages print the values they compared."
)]

use budget_enforcer_config::EnvSource;
use budget_enforcer_config::StackConfig;
use budget_enforcer_stack::NotificationType;
use budget_enforcer_stack::SubscriberAddress;
use budget_enforcer_stack::SubscriptionType;
use budget_enforcer_stack::Template;
use budget_enforcer_stack::monthly_budget;
use budget_enforcer_stack::resources::ENFORCER_ACTIONS;
use budget_enforcer_stack::resources::logical_ids;
use budget_enforcer_stack::synthesize;
use serde_json::Value;
use serde_json::json;

type TestResult = Result<(), String>;

fn config(pairs: &[(&str, &str)]) -> Result<StackConfig, String> {
    let mut all = vec![("NOTIFICATION_EMAIL", "ops@example.com")];
    all.extend_from_slice(pairs);
    StackConfig::from_env(&EnvSource::from_pairs(all)).map_err(|err| err.to_string())
}

fn rendered(template: &Template) -> Result<Value, String> {
    let text = template.to_json_pretty().map_err(|err| err.to_string())?;
    serde_json::from_str(&text).map_err(|err| err.to_string())
}

fn properties<'a>(document: &'a Value, logical_id: &str) -> Result<&'a Value, String> {
    document
        .get("Resources")
        .and_then(|resources| resources.get(logical_id))
        .and_then(|resource| resource.get("Properties"))
        .ok_or_else(|| format!("missing resource {logical_id}"))
}

#[test]
fn default_budget_has_four_escalating_rules() -> TestResult {
    let config = config(&[])?;
    let budget = monthly_budget(&config, logical_ids::TOPIC);

    if budget.name != "Monthly-50USD-Limit" || (budget.limit_amount - 50.0).abs() > f64::EPSILON {
        return Err(format!("unexpected budget {} / {}", budget.name, budget.limit_amount));
    }
    let thresholds: Vec<f64> =
        budget.notifications.iter().map(|rule| rule.notification.threshold).collect();
    if thresholds != vec![50.0, 80.0, 100.0, 80.0] {
        return Err(format!("unexpected thresholds {thresholds:?}"));
    }
    let types: Vec<NotificationType> =
        budget.notifications.iter().map(|rule| rule.notification.notification_type).collect();
    let expected = vec![
        NotificationType::Actual,
        NotificationType::Actual,
        NotificationType::Actual,
        NotificationType::Forecasted,
    ];
    if types != expected {
        return Err(format!("unexpected notification types {types:?}"));
    }
    for rule in &budget.notifications {
        let emails = rule
            .subscribers
            .iter()
            .filter(|s| s.address == SubscriberAddress::Email("ops@example.com".to_string()))
            .count();
        if emails != 1 {
            return Err("every rule must email the notification address".to_string());
        }
    }
    let topic_rules: Vec<f64> = budget
        .notifications
        .iter()
        .filter(|rule| rule.notifies_topic())
        .map(|rule| rule.notification.threshold)
        .collect();
    if topic_rules != vec![100.0] {
        return Err(format!("only the 100% rule may notify the topic, got {topic_rules:?}"));
    }
    let actionable = &budget.notifications[2];
    if actionable.notification.notification_type != NotificationType::Actual
        || !actionable.subscribers.iter().any(|s| {
            s.subscription_type == SubscriptionType::Sns
                && s.address == SubscriberAddress::TopicRef(logical_ids::TOPIC.to_string())
        })
    {
        return Err("100% ACTUAL rule must reference the alarm topic".to_string());
    }
    Ok(())
}

#[test]
fn budget_renders_in_cloudformation_shape() -> TestResult {
    let template = synthesize(&config(&[("BUDGET_LIMIT_USD", "120")])?)
        .map_err(|err| err.to_string())?;
    let document = rendered(&template)?;
    let budget = properties(&document, logical_ids::BUDGET)?;

    if budget["Budget"]
        != json!({
            "BudgetName": "Monthly-120USD-Limit",
            "BudgetLimit": { "Amount": 120.0, "Unit": "USD" },
            "BudgetType": "COST",
            "TimeUnit": "MONTHLY"
        })
    {
        return Err(format!("unexpected budget block {}", budget["Budget"]));
    }
    let actionable = &budget["NotificationsWithSubscribers"][2];
    let expected = json!({
        "Notification": {
            "NotificationType": "ACTUAL",
            "ComparisonOperator": "GREATER_THAN",
            "Threshold": 100.0,
            "ThresholdType": "PERCENTAGE"
        },
        "Subscribers": [
            { "SubscriptionType": "EMAIL", "Address": "ops@example.com" },
            { "SubscriptionType": "SNS", "Address": { "Ref": "BudgetAlarmTopic" } }
        ]
    });
    if *actionable != expected {
        return Err(format!("unexpected actionable rule {actionable}"));
    }
    Ok(())
}

#[test]
fn template_contains_every_resource_and_output() -> TestResult {
    let template = synthesize(&config(&[])?).map_err(|err| err.to_string())?;
    let expected = [
        (logical_ids::TOPIC, "AWS::SNS::Topic"),
        (logical_ids::EMAIL_SUBSCRIPTION, "AWS::SNS::Subscription"),
        (logical_ids::TOPIC_POLICY, "AWS::SNS::TopicPolicy"),
        (logical_ids::ROLE, "AWS::IAM::Role"),
        (logical_ids::FUNCTION, "AWS::Lambda::Function"),
        (logical_ids::FUNCTION_SUBSCRIPTION, "AWS::SNS::Subscription"),
        (logical_ids::INVOKE_PERMISSION, "AWS::Lambda::Permission"),
        (logical_ids::BUDGET, "AWS::Budgets::Budget"),
    ];
    if template.resources.len() != expected.len() {
        return Err(format!("unexpected resource count {}", template.resources.len()));
    }
    for (logical_id, resource_type) in expected {
        let resource =
            template.resource(logical_id).ok_or_else(|| format!("missing {logical_id}"))?;
        if resource.resource_type != resource_type {
            return Err(format!("{logical_id} has type {}", resource.resource_type));
        }
    }
    let outputs: Vec<&str> = template.outputs.keys().map(String::as_str).collect();
    if outputs != vec!["LambdaFunctionArn", "TopicArn"] {
        return Err(format!("unexpected outputs {outputs:?}"));
    }
    if template.parameters.keys().map(String::as_str).collect::<Vec<_>>()
        != vec!["CodeBucket", "CodeKey"]
    {
        return Err("expected code parameters".to_string());
    }
    Ok(())
}

#[test]
fn function_runs_bootstrap_with_enforcer_environment() -> TestResult {
    let template = synthesize(&config(&[("ENFORCER_PAGE_SIZE", "250")])?)
        .map_err(|err| err.to_string())?;
    let document = rendered(&template)?;
    let function = properties(&document, logical_ids::FUNCTION)?;

    if function["FunctionName"] != "BudgetEnforcer-DenyAll"
        || function["Runtime"] != "provided.al2023"
        || function["Handler"] != "bootstrap"
        || function["Timeout"] != 60
    {
        return Err(format!("unexpected function properties {function}"));
    }
    let variables = &function["Environment"]["Variables"];
    if variables["ENFORCER_PAGE_SIZE"] != "250"
        || variables["DENY_POLICY_NAME"] != "BudgetExceeded-DenyAll"
        || variables["ENFORCER_EXPECTED_ACCOUNT"] != json!({ "Ref": "AWS::AccountId" })
    {
        return Err(format!("unexpected environment {variables}"));
    }
    if function["Code"]["S3Bucket"] != json!({ "Ref": "CodeBucket" }) {
        return Err("function code must come from the CodeBucket parameter".to_string());
    }
    Ok(())
}


#[test]
fn function_timeout_tracks_the_sweep_deadline() -> TestResult {
    let template = synthesize(&config(&[("ENFORCER_TIMEOUT_SECS", "300")])?)
        .map_err(|err| err.to_string())?;
    let document = rendered(&template)?;
    let function = properties(&document, logical_ids::FUNCTION)?;

    if function["Timeout"] != 310 {
        return Err(format!("unexpected function timeout {}", function["Timeout"]));
    }
    if function["Environment"]["Variables"]["ENFORCER_TIMEOUT_SECS"] != "300" {
        return Err("sweep deadline must reach the function environment".to_string());
    }
    Ok(())
}
#[test]
fn role_grants_exactly_the_enforcement_actions() -> TestResult {
    let template = synthesize(&config(&[])?).map_err(|err| err.to_string())?;
    let document = rendered(&template)?;
    let role = properties(&document, logical_ids::ROLE)?;
    let statement = &role["Policies"][0]["PolicyDocument"]["Statement"][0];
    if statement["Action"] != json!(ENFORCER_ACTIONS) || statement["Resource"] != "*" {
        return Err(format!("unexpected role statement {statement}"));
    }
    if role["AssumeRolePolicyDocument"]["Statement"][0]["Principal"]["Service"]
        != "lambda.amazonaws.com"
    {
        return Err("role must be assumable by lambda".to_string());
    }
    Ok(())
}

#[test]
fn topic_policy_is_scoped_to_the_budget_service_and_account() -> TestResult {
    let unpinned = rendered(&synthesize(&config(&[])?).map_err(|err| err.to_string())?)?;
    let statement = &properties(&unpinned, logical_ids::TOPIC_POLICY)?["PolicyDocument"]
        ["Statement"][0];
    if statement["Principal"]["Service"] != "budgets.amazonaws.com"
        || statement["Action"] != "SNS:Publish"
        || statement["Condition"]["StringEquals"]["aws:SourceAccount"]
            != json!({ "Ref": "AWS::AccountId" })
    {
        return Err(format!("unexpected topic policy {statement}"));
    }

    let pinned = rendered(
        &synthesize(&config(&[("CDK_DEFAULT_ACCOUNT", "123456789012")])?)
            .map_err(|err| err.to_string())?,
    )?;
    let condition = &properties(&pinned, logical_ids::TOPIC_POLICY)?["PolicyDocument"]
        ["Statement"][0]["Condition"];
    if condition["StringEquals"]["aws:SourceAccount"] != "123456789012" {
        return Err(format!("pinned account not applied: {condition}"));
    }
    Ok(())
}

#[test]
fn topic_invokes_function_through_subscription_and_permission() -> TestResult {
    let document = rendered(&synthesize(&config(&[])?).map_err(|err| err.to_string())?)?;
    let subscription = properties(&document, logical_ids::FUNCTION_SUBSCRIPTION)?;
    let permission = properties(&document, logical_ids::INVOKE_PERMISSION)?;
    let email = properties(&document, logical_ids::EMAIL_SUBSCRIPTION)?;
    let function_arn = json!({ "Fn::GetAtt": ["BudgetEnforcerFn", "Arn"] });
    if subscription["Protocol"] != "lambda" || subscription["Endpoint"] != function_arn {
        return Err(format!("unexpected function subscription {subscription}"));
    }
    if permission["Principal"] != "sns.amazonaws.com"
        || permission["SourceArn"] != json!({ "Ref": "BudgetAlarmTopic" })
    {
        return Err(format!("unexpected invoke permission {permission}"));
    }
    if email["Protocol"] != "email" || email["Endpoint"] != "ops@example.com" {
        return Err(format!("unexpected email subscription {email}"));
    }
    if document["Outputs"]["LambdaFunctionArn"]["Value"] != function_arn {
        return Err("function output must reference the function".to_string());
    }
    Ok(())
}

#[test]
fn rendering_is_deterministic_and_writable() -> TestResult {
    let config = config(&[])?;
    let first = synthesize(&config).map_err(|err| err.to_string())?;
    let second = synthesize(&config).map_err(|err| err.to_string())?;
    let first_text = first.to_json_pretty().map_err(|err| err.to_string())?;
    let second_text = second.to_json_pretty().map_err(|err| err.to_string())?;
    if first_text != second_text {
        return Err("rendering must be deterministic".to_string());
    }

    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("out").join("template.json");
    first.write(&path).map_err(|err| err.to_string())?;
    let written = std::fs::read_to_string(&path).map_err(|err| err.to_string())?;
    if written != first_text {
        return Err("written template differs from rendered text".to_string());
    }
    Ok(())
}

#[test]
fn invalid_config_is_rejected_before_rendering() -> TestResult {
    let mut config = config(&[])?;
    config.notification_email = "not-an-email".to_string();
    match synthesize(&config) {
        Err(err) if err.to_string().contains("not an email address") => Ok(()),
        Err(err) => Err(format!("unexpected error {err}")),
        Ok(_) => Err("expected invalid config".to_string()),
    }
}
