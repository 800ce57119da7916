// crates/budget-enforcer-stack/src/budget.rs
// ============================================================================
// Module: Budget Model
// Description: Monthly cost budget and its threshold notification rules.
// Purpose: Describe escalating alerts with a single actionable 100% rule.
// Dependencies: budget-enforcer-config, serde, serde_json
// ============================================================================

//! ## Overview
//! [`monthly_budget`] produces the budget the stack provisions: email alerts
//! at 50% and 80% of actual spend, an email plus topic notification at 100%
//! of actual spend, and an email at 80% of forecasted spend. Only the 100%
//! ACTUAL rule reaches the enforcement topic. Types serialize in the property
//! shape of `AWS::Budgets::Budget`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use budget_enforcer_config::StackConfig;
use serde::Serialize;
use serde::Serializer;
use serde::ser::SerializeMap;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Currency unit for the budget limit.
pub const LIMIT_UNIT: &str = "USD";
/// Percentage at which the enforcement topic is notified.
pub const ENFORCEMENT_THRESHOLD: f64 = 100.0;

// ============================================================================
// SECTION: Enumerations
// ============================================================================

/// Spend series a notification watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    /// Spend already incurred.
    Actual,
    /// Projected spend for the period.
    Forecasted,
}

/// Comparison between spend and threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonOperator {
    /// Spend strictly above the threshold.
    GreaterThan,
    /// Spend strictly below the threshold.
    LessThan,
    /// Spend equal to the threshold.
    EqualTo,
}

/// Unit of a notification threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThresholdType {
    /// Percentage of the budget limit.
    Percentage,
    /// Absolute currency amount.
    AbsoluteValue,
}

/// Delivery channel of a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionType {
    /// Email address.
    Email,
    /// Notification topic.
    Sns,
}

/// Budget measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetType {
    /// Unblended cost.
    Cost,
}

/// Budget period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    /// Calendar month.
    Monthly,
}

// ============================================================================
// SECTION: Notifications
// ============================================================================

/// Where a subscriber is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriberAddress {
    /// Literal email address.
    Email(String),
    /// Logical id of a topic in the same template; renders as `{"Ref": id}`.
    TopicRef(String),
}

impl Serialize for SubscriberAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Email(address) => serializer.serialize_str(address),
            Self::TopicRef(logical_id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", logical_id)?;
                map.end()
            }
        }
    }
}

/// Recipient of a threshold notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Subscriber {
    /// Delivery channel.
    pub subscription_type: SubscriptionType,
    /// Delivery address.
    pub address: SubscriberAddress,
}

impl Subscriber {
    /// Email subscriber.
    #[must_use]
    pub fn email(address: impl Into<String>) -> Self {
        Self {
            subscription_type: SubscriptionType::Email,
            address: SubscriberAddress::Email(address.into()),
        }
    }

    /// Topic subscriber referencing a template resource.
    #[must_use]
    pub fn topic(logical_id: impl Into<String>) -> Self {
        Self {
            subscription_type: SubscriptionType::Sns,
            address: SubscriberAddress::TopicRef(logical_id.into()),
        }
    }
}

/// Threshold rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Notification {
    /// Spend series watched.
    pub notification_type: NotificationType,
    /// Comparison applied.
    pub comparison_operator: ComparisonOperator,
    /// Threshold value.
    pub threshold: f64,
    /// Threshold unit.
    pub threshold_type: ThresholdType,
}

impl Notification {
    /// Rule that fires when the series exceeds `percent` of the limit.
    #[must_use]
    pub const fn above_percent(notification_type: NotificationType, percent: f64) -> Self {
        Self {
            notification_type,
            comparison_operator: ComparisonOperator::GreaterThan,
            threshold: percent,
            threshold_type: ThresholdType::Percentage,
        }
    }
}

/// Threshold rule with its recipients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NotificationWithSubscribers {
    /// Threshold rule.
    pub notification: Notification,
    /// Recipients.
    pub subscribers: Vec<Subscriber>,
}

impl NotificationWithSubscribers {
    /// Returns true when any subscriber is a topic.
    #[must_use]
    pub fn notifies_topic(&self) -> bool {
        self.subscribers.iter().any(|s| s.subscription_type == SubscriptionType::Sns)
    }
}

// ============================================================================
// SECTION: Budget
// ============================================================================

/// Monthly spend budget.
#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    /// Budget name.
    pub name: String,
    /// Limit amount.
    pub limit_amount: f64,
    /// Limit currency.
    pub limit_unit: String,
    /// Budget measure.
    pub budget_type: BudgetType,
    /// Budget period.
    pub time_unit: TimeUnit,
    /// Threshold rules; order carries no meaning.
    pub notifications: Vec<NotificationWithSubscribers>,
}

impl Budget {
    /// Returns the `AWS::Budgets::Budget` resource properties.
    #[must_use]
    pub fn properties(&self) -> Value {
        json!({
            "Budget": {
                "BudgetName": self.name,
                "BudgetLimit": {
                    "Amount": self.limit_amount,
                    "Unit": self.limit_unit,
                },
                "BudgetType": self.budget_type,
                "TimeUnit": self.time_unit,
            },
            "NotificationsWithSubscribers": self.notifications,
        })
    }
}

/// Builds the monthly cost budget with its four threshold rules.
#[must_use]
pub fn monthly_budget(config: &StackConfig, topic_logical_id: &str) -> Budget {
    let email = config.notification_email.as_str();
    let email_only = |notification| NotificationWithSubscribers {
        notification,
        subscribers: vec![Subscriber::email(email)],
    };
    Budget {
        name: config.budget_name(),
        limit_amount: config.budget_limit_usd,
        limit_unit: LIMIT_UNIT.to_string(),
        budget_type: BudgetType::Cost,
        time_unit: TimeUnit::Monthly,
        notifications: vec![
            email_only(Notification::above_percent(NotificationType::Actual, 50.0)),
            email_only(Notification::above_percent(NotificationType::Actual, 80.0)),
            NotificationWithSubscribers {
                notification: Notification::above_percent(
                    NotificationType::Actual,
                    ENFORCEMENT_THRESHOLD,
                ),
                subscribers: vec![Subscriber::email(email), Subscriber::topic(topic_logical_id)],
            },
            email_only(Notification::above_percent(NotificationType::Forecasted, 80.0)),
        ],
    }
}
