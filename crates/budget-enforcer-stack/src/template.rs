// crates/budget-enforcer-stack/src/template.rs
// ============================================================================
// Module: Template Assembly
// Description: CloudFormation template model and stack synthesis.
// Purpose: Render the stack as deterministic, human-readable JSON.
// Dependencies: budget-enforcer-config, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`synthesize`] validates the [`StackConfig`] and assembles every resource
//! into a [`Template`]. Maps are ordered, so rendering the same config always
//! yields byte-identical output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use budget_enforcer_config::StackConfig;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::resources;
use crate::resources::CODE_BUCKET_PARAMETER;
use crate::resources::CODE_KEY_PARAMETER;
use crate::resources::logical_ids;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// CloudFormation template format version.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when synthesizing or writing templates.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Stack configuration was rejected.
    #[error("invalid stack config: {0}")]
    Config(#[from] budget_enforcer_config::ConfigError),
    /// Serialization failure while rendering the template.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// IO failure while writing the template.
    #[error("io error: {0}")]
    Io(String),
}

// ============================================================================
// SECTION: Model
// ============================================================================

/// CloudFormation resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    /// Resource type, e.g. `AWS::SNS::Topic`.
    #[serde(rename = "Type")]
    pub resource_type: String,
    /// Resource properties.
    pub properties: Value,
    /// Explicit creation dependencies.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl Resource {
    /// Creates a resource without explicit dependencies.
    #[must_use]
    pub fn new(resource_type: &str, properties: Value) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            properties,
            depends_on: Vec::new(),
        }
    }

    /// Adds an explicit dependency.
    #[must_use]
    pub fn depends_on(mut self, logical_id: &str) -> Self {
        self.depends_on.push(logical_id.to_string());
        self
    }
}

/// Template output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    /// Human-readable description.
    pub description: String,
    /// Output value expression.
    pub value: Value,
}

/// CloudFormation template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    /// Template format version.
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    /// Template description.
    pub description: String,
    /// Deploy-time parameters.
    pub parameters: BTreeMap<String, Value>,
    /// Resources keyed by logical id.
    pub resources: BTreeMap<String, Resource>,
    /// Outputs keyed by name.
    pub outputs: BTreeMap<String, Output>,
}

impl Template {
    /// Returns the resource with the given logical id.
    #[must_use]
    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    /// Returns logical ids of every resource of the given type.
    #[must_use]
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<&str> {
        self.resources
            .iter()
            .filter(|(_, resource)| resource.resource_type == resource_type)
            .map(|(logical_id, _)| logical_id.as_str())
            .collect()
    }

    /// Renders the template as pretty-printed JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Serialization`] when rendering fails.
    pub fn to_json_pretty(&self) -> Result<String, TemplateError> {
        let mut rendered = serde_json::to_string_pretty(self)
            .map_err(|err| TemplateError::Serialization(err.to_string()))?;
        rendered.push('\n');
        Ok(rendered)
    }

    /// Writes the rendered template to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] when rendering or writing fails.
    pub fn write(&self, path: &Path) -> Result<(), TemplateError> {
        let rendered = self.to_json_pretty()?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|err| TemplateError::Io(err.to_string()))?;
        }
        fs::write(path, rendered).map_err(|err| TemplateError::Io(err.to_string()))
    }
}

// ============================================================================
// SECTION: Synthesis
// ============================================================================

/// Builds the full stack template for a configuration.
///
/// # Errors
///
/// Returns [`TemplateError::Config`] when the configuration is invalid.
pub fn synthesize(config: &StackConfig) -> Result<Template, TemplateError> {
    config.validate()?;
    let resources = BTreeMap::from([
        (logical_ids::TOPIC.to_string(), resources::alarm_topic()),
        (logical_ids::EMAIL_SUBSCRIPTION.to_string(), resources::email_subscription(config)),
        (logical_ids::TOPIC_POLICY.to_string(), resources::topic_policy(config)),
        (logical_ids::ROLE.to_string(), resources::execution_role()),
        (logical_ids::FUNCTION.to_string(), resources::enforcement_function(config)),
        (logical_ids::FUNCTION_SUBSCRIPTION.to_string(), resources::function_subscription()),
        (logical_ids::INVOKE_PERMISSION.to_string(), resources::invoke_permission()),
        (logical_ids::BUDGET.to_string(), resources::budget(config)),
    ]);
    let parameters = BTreeMap::from([
        (
            CODE_BUCKET_PARAMETER.to_string(),
            json!({
                "Type": "String",
                "Description": "S3 bucket holding the enforcement function package."
            }),
        ),
        (
            CODE_KEY_PARAMETER.to_string(),
            json!({
                "Type": "String",
                "Description": "S3 key of the zipped bootstrap executable."
            }),
        ),
    ]);
    let outputs = BTreeMap::from([
        (
            "TopicArn".to_string(),
            Output {
                description: "SNS topic ARN for budget alerts".to_string(),
                value: resources::reference(logical_ids::TOPIC),
            },
        ),
        (
            "LambdaFunctionArn".to_string(),
            Output {
                description: "Budget enforcer Lambda function ARN".to_string(),
                value: resources::get_att(logical_ids::FUNCTION, "Arn"),
            },
        ),
    ]);
    Ok(Template {
        format_version: TEMPLATE_FORMAT_VERSION.to_string(),
        description: format!(
            "{}: {} monthly budget with deny-all enforcement at 100%",
            config.stack_name,
            config.budget_name()
        ),
        parameters,
        resources,
        outputs,
    })
}
