// crates/budget-enforcer-stack/src/resources.rs
// ============================================================================
// Module: Stack Resources
// Description: Builders for each CloudFormation resource in the stack.
// Purpose: Wire the budget, alarm topic, and enforcement function together.
// Dependencies: budget-enforcer-config, budget-enforcer-core, serde_json
// ============================================================================

//! ## Overview
//! Each builder returns a [`Resource`] with the properties CloudFormation
//! expects. Cross-references use `Ref` and `Fn::GetAtt` on the logical ids
//! defined here, so the builders can be assembled in any order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use budget_enforcer_config::StackConfig;
use budget_enforcer_config::enforcer::EXPECTED_ACCOUNT_VAR;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::budget::monthly_budget;
use crate::template::Resource;

// ============================================================================
// SECTION: Names
// ============================================================================

/// Alarm topic name.
pub const TOPIC_NAME: &str = "BudgetAlarm-DenyAll";
/// Enforcement function name.
pub const FUNCTION_NAME: &str = "BudgetEnforcer-DenyAll";
/// Function runtime for a native `bootstrap` executable.
pub const FUNCTION_RUNTIME: &str = "provided.al2023";
/// Handler name required by the custom runtime.
pub const FUNCTION_HANDLER: &str = "bootstrap";
/// Function description.
pub const FUNCTION_DESCRIPTION: &str =
    "Attaches a deny-all IAM policy to all users/groups when budget is exceeded";

/// Logical ids of the stack resources.
pub mod logical_ids {
    /// Alarm topic.
    pub const TOPIC: &str = "BudgetAlarmTopic";
    /// Email subscription on the topic.
    pub const EMAIL_SUBSCRIPTION: &str = "BudgetAlarmEmailSubscription";
    /// Topic resource policy.
    pub const TOPIC_POLICY: &str = "BudgetAlarmTopicPolicy";
    /// Function execution role.
    pub const ROLE: &str = "BudgetEnforcerRole";
    /// Enforcement function.
    pub const FUNCTION: &str = "BudgetEnforcerFn";
    /// Function subscription on the topic.
    pub const FUNCTION_SUBSCRIPTION: &str = "BudgetEnforcerSubscription";
    /// Permission for the topic to invoke the function.
    pub const INVOKE_PERMISSION: &str = "BudgetEnforcerInvokePermission";
    /// Monthly budget.
    pub const BUDGET: &str = "MonthlyBudget";
}

/// Template parameter naming the bucket holding the function package.
pub const CODE_BUCKET_PARAMETER: &str = "CodeBucket";
/// Template parameter naming the function package key.
pub const CODE_KEY_PARAMETER: &str = "CodeKey";

/// Identity API actions the function needs.
pub const ENFORCER_ACTIONS: [&str; 9] = [
    "iam:ListUsers",
    "iam:ListGroups",
    "iam:ListAttachedUserPolicies",
    "iam:ListAttachedGroupPolicies",
    "iam:AttachUserPolicy",
    "iam:AttachGroupPolicy",
    "iam:CreatePolicy",
    "iam:GetPolicy",
    "sts:GetCallerIdentity",
];

// ============================================================================
// SECTION: Intrinsics
// ============================================================================

/// `{"Ref": id}`.
#[must_use]
pub fn reference(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

/// `{"Fn::GetAtt": [id, attribute]}`.
#[must_use]
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// Literal account when pinned, otherwise the deploying account.
fn account_value(config: &StackConfig) -> Value {
    config
        .account
        .as_ref()
        .map_or_else(|| reference("AWS::AccountId"), |account| json!(account.as_str()))
}

// ============================================================================
// SECTION: Topic
// ============================================================================

/// Alarm topic that fans budget events out.
#[must_use]
pub fn alarm_topic() -> Resource {
    Resource::new("AWS::SNS::Topic", json!({ "TopicName": TOPIC_NAME }))
}

/// Email subscription for every threshold notification.
#[must_use]
pub fn email_subscription(config: &StackConfig) -> Resource {
    Resource::new(
        "AWS::SNS::Subscription",
        json!({
            "Protocol": "email",
            "Endpoint": config.notification_email,
            "TopicArn": reference(logical_ids::TOPIC),
        }),
    )
}

/// Topic policy letting the budget service publish for this account only.
#[must_use]
pub fn topic_policy(config: &StackConfig) -> Resource {
    Resource::new(
        "AWS::SNS::TopicPolicy",
        json!({
            "Topics": [reference(logical_ids::TOPIC)],
            "PolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": { "Service": "budgets.amazonaws.com" },
                    "Action": "SNS:Publish",
                    "Resource": reference(logical_ids::TOPIC),
                    "Condition": {
                        "StringEquals": { "aws:SourceAccount": account_value(config) }
                    }
                }]
            }
        }),
    )
}

// ============================================================================
// SECTION: Function
// ============================================================================

/// Execution role with basic logging and the enforcement actions.
#[must_use]
pub fn execution_role() -> Resource {
    Resource::new(
        "AWS::IAM::Role",
        json!({
            "AssumeRolePolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": { "Service": "lambda.amazonaws.com" },
                    "Action": "sts:AssumeRole"
                }]
            },
            "ManagedPolicyArns": [{
                "Fn::Sub":
                    "arn:${AWS::Partition}:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole"
            }],
            "Policies": [{
                "PolicyName": "BudgetEnforcerIdentityAccess",
                "PolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Action": ENFORCER_ACTIONS,
                        "Resource": "*"
                    }]
                }
            }]
        }),
    )
}

/// Enforcement function running the `bootstrap` executable.
///
/// The account guard defaults to the deploying account unless the enforcer
/// settings pin one.
#[must_use]
pub fn enforcement_function(config: &StackConfig) -> Resource {
    let mut variables: Map<String, Value> = config
        .enforcer
        .to_env_vars()
        .into_iter()
        .map(|(key, value)| (key.to_string(), Value::String(value)))
        .collect();
    variables
        .entry(EXPECTED_ACCOUNT_VAR.to_string())
        .or_insert_with(|| reference("AWS::AccountId"));
    Resource::new(
        "AWS::Lambda::Function",
        json!({
            "FunctionName": FUNCTION_NAME,
            "Description": FUNCTION_DESCRIPTION,
            "Runtime": FUNCTION_RUNTIME,
            "Handler": FUNCTION_HANDLER,
            "Timeout": config.enforcer.function_timeout_secs(),
            "Role": get_att(logical_ids::ROLE, "Arn"),
            "Code": {
                "S3Bucket": reference(CODE_BUCKET_PARAMETER),
                "S3Key": reference(CODE_KEY_PARAMETER),
            },
            "Environment": { "Variables": variables },
        }),
    )
    .depends_on(logical_ids::ROLE)
}

/// Topic subscription delivering budget events to the function.
#[must_use]
pub fn function_subscription() -> Resource {
    Resource::new(
        "AWS::SNS::Subscription",
        json!({
            "Protocol": "lambda",
            "Endpoint": get_att(logical_ids::FUNCTION, "Arn"),
            "TopicArn": reference(logical_ids::TOPIC),
        }),
    )
}

/// Permission for the topic to invoke the function.
#[must_use]
pub fn invoke_permission() -> Resource {
    Resource::new(
        "AWS::Lambda::Permission",
        json!({
            "Action": "lambda:InvokeFunction",
            "FunctionName": get_att(logical_ids::FUNCTION, "Arn"),
            "Principal": "sns.amazonaws.com",
            "SourceArn": reference(logical_ids::TOPIC),
        }),
    )
}

// ============================================================================
// SECTION: Budget
// ============================================================================

/// Monthly budget whose 100% ACTUAL rule notifies the alarm topic.
///
/// Depends on the topic policy so the budget service can publish as soon as
/// the budget exists.
#[must_use]
pub fn budget(config: &StackConfig) -> Resource {
    let budget = monthly_budget(config, logical_ids::TOPIC);
    Resource::new("AWS::Budgets::Budget", budget.properties()).depends_on(logical_ids::TOPIC_POLICY)
}
