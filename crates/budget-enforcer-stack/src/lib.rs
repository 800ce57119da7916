// crates/budget-enforcer-stack/src/lib.rs
// ============================================================================
// Module: Budget Enforcer Stack Library
// Description: Resource builders for the budget enforcer deployment.
// Purpose: Render the monthly budget, alarm topic, and function as a template.
// Dependencies: budget-enforcer-config, budget-enforcer-core, serde_json
// ============================================================================

//! ## Overview
//! The stack is produced by flat builder functions that return data. The
//! [`budget`] module models the monthly budget and its threshold rules;
//! [`resources`] builds each CloudFormation resource; [`template`] assembles
//! them into a deterministic JSON document.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod budget;
pub mod resources;
pub mod template;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use budget::Budget;
pub use budget::ComparisonOperator;
pub use budget::Notification;
pub use budget::NotificationType;
pub use budget::NotificationWithSubscribers;
pub use budget::Subscriber;
pub use budget::SubscriberAddress;
pub use budget::SubscriptionType;
pub use budget::ThresholdType;
pub use budget::monthly_budget;
pub use template::Output;
pub use template::Resource;
pub use template::Template;
pub use template::TemplateError;
pub use template::synthesize;
