//! AWS Config custom rule events.
//!
//! AWS Config invokes a rule's function with a payload whose `invokingEvent`
//! field is itself a JSON document, stored as a string. Depending on what
//! triggered the evaluation that document carries a full configuration item,
//! a summary of an oversized one, or neither for scheduled evaluations.

use std::collections::HashMap;

use aws_lambda_events::config::ConfigEvent;
use serde_json::{Map, Value};

use super::common::DictWrapper;
use crate::AppError;

const CONFIGURATION_ITEM: &str = "configurationItem";
const CONFIGURATION_ITEM_SUMMARY: &str = "configurationItemSummary";

/// Triggered by a configuration change of a resource within the rule's scope.
#[derive(Debug, Clone, PartialEq)]
pub struct AwsConfigConfigurationChangeEvent(DictWrapper);

impl AwsConfigConfigurationChangeEvent {
    pub fn event(&self) -> Result<&Map<String, Value>, AppError> {
        self.0.object_field(CONFIGURATION_ITEM)
    }

    pub fn raw_event(&self) -> &Map<String, Value> {
        self.0.raw_event()
    }
}

/// Triggered by a change whose configuration item was too large to inline.
#[derive(Debug, Clone, PartialEq)]
pub struct AwsConfigOversizedConfigurationChangeEvent(DictWrapper);

impl AwsConfigOversizedConfigurationChangeEvent {
    pub fn event(&self) -> Result<&Map<String, Value>, AppError> {
        self.0.object_field(CONFIGURATION_ITEM_SUMMARY)
    }

    pub fn raw_event(&self) -> &Map<String, Value> {
        self.0.raw_event()
    }
}

/// Triggered on the rule's schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct AwsConfigPeriodicInvokingEvent(DictWrapper);

impl AwsConfigPeriodicInvokingEvent {
    pub fn event(&self) -> &Map<String, Value> {
        self.0.raw_event()
    }

    pub fn raw_event(&self) -> &Map<String, Value> {
        self.0.raw_event()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InvokingEvent {
    ConfigurationChange(AwsConfigConfigurationChangeEvent),
    OversizedConfigurationChange(AwsConfigOversizedConfigurationChangeEvent),
    Periodic(AwsConfigPeriodicInvokingEvent),
}

impl InvokingEvent {
    /// Picks the variant by key presence: `configurationItem` first, then
    /// `configurationItemSummary`, otherwise periodic.
    pub fn from_dict(dict: DictWrapper) -> Self {
        if dict.contains_key(CONFIGURATION_ITEM) {
            Self::ConfigurationChange(AwsConfigConfigurationChangeEvent(dict))
        } else if dict.contains_key(CONFIGURATION_ITEM_SUMMARY) {
            Self::OversizedConfigurationChange(AwsConfigOversizedConfigurationChangeEvent(dict))
        } else {
            Self::Periodic(AwsConfigPeriodicInvokingEvent(dict))
        }
    }

    pub fn event(&self) -> Result<&Map<String, Value>, AppError> {
        match self {
            Self::ConfigurationChange(e) => e.event(),
            Self::OversizedConfigurationChange(e) => e.event(),
            Self::Periodic(e) => Ok(e.event()),
        }
    }

    /// `messageType` of the decoded document, e.g. `ScheduledNotification`.
    pub fn message_type(&self) -> Option<&str> {
        self.raw_event().get("messageType").and_then(Value::as_str)
    }

    pub fn raw_event(&self) -> &Map<String, Value> {
        match self {
            Self::ConfigurationChange(e) => e.raw_event(),
            Self::OversizedConfigurationChange(e) => e.raw_event(),
            Self::Periodic(e) => e.raw_event(),
        }
    }
}

/// Payload AWS Config sends to a custom rule's function.
#[derive(Debug, Clone, PartialEq)]
pub struct AwsConfigEvent(DictWrapper);

impl AwsConfigEvent {
    pub fn new(data: Map<String, Value>) -> Self {
        Self(DictWrapper::new(data))
    }

    /// The event that triggered the evaluation. Decoded on every call.
    pub fn invoking_event(&self) -> Result<InvokingEvent, AppError> {
        let key = "invokingEvent";
        match self.0.json_field(key)? {
            Value::Object(data) => Ok(InvokingEvent::from_dict(DictWrapper::new(data))),
            _ => Err(AppError::WrongType {
                key: key.to_string(),
                expected: "a JSON object",
            }),
        }
    }

    /// Key/value pairs defined on the rule (`InputParameters`).
    pub fn rule_parameters(&self) -> Result<HashMap<String, String>, AppError> {
        let key = "ruleParameters";
        serde_json::from_str(self.0.str_field(key)?).map_err(|source| AppError::MalformedPayload {
            key: key.to_string(),
            source,
        })
    }

    /// ARN of the IAM role assigned to AWS Config.
    pub fn execution_role_arn(&self) -> Result<&str, AppError> {
        self.0.str_field("executionRoleArn")
    }

    pub fn config_rule_name(&self) -> Result<&str, AppError> {
        self.0.str_field("configRuleName")
    }

    pub fn config_rule_id(&self) -> Result<&str, AppError> {
        self.0.str_field("configRuleId")
    }

    pub fn config_rule_arn(&self) -> Result<&str, AppError> {
        self.0.str_field("configRuleArn")
    }

    pub fn account_id(&self) -> Result<&str, AppError> {
        self.0.str_field("accountId")
    }

    /// Event schema version, currently `1.0`.
    pub fn version(&self) -> Result<&str, AppError> {
        self.0.str_field("version")
    }

    /// True when the evaluated resource was removed from the rule's scope;
    /// the evaluation should then be reported as `NOT_APPLICABLE`.
    pub fn event_left_scope(&self) -> Result<bool, AppError> {
        self.0.bool_field("eventLeftScope")
    }

    /// Token to hand back to AWS Config with `PutEvaluations`.
    pub fn result_token(&self) -> Result<&str, AppError> {
        self.0.str_field("resultToken")
    }

    pub fn raw_event(&self) -> &Map<String, Value> {
        self.0.raw_event()
    }
}

impl From<Map<String, Value>> for AwsConfigEvent {
    fn from(data: Map<String, Value>) -> Self {
        Self::new(data)
    }
}

impl TryFrom<Value> for AwsConfigEvent {
    type Error = AppError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        DictWrapper::try_from(value).map(Self)
    }
}

impl TryFrom<ConfigEvent> for AwsConfigEvent {
    type Error = AppError;

    fn try_from(event: ConfigEvent) -> Result<Self, Self::Error> {
        let value = serde_json::to_value(&event).map_err(|source| AppError::MalformedPayload {
            key: "$".to_string(),
            source,
        })?;
        // absent optional fields serialize as null
        let data = DictWrapper::try_from(value)?
            .into_inner()
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .collect();
        Ok(Self::new(data))
    }
}
