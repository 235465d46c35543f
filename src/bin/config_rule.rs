use std::collections::HashMap;

use lambda_runtime::{service_fn, Error, LambdaEvent};
use powertools_lambda::logging::{copy_config_to_registered_loggers, global, CopyConfig, LoggerRegistry, RegistryLayer};
use powertools_lambda::{AwsConfigEvent, InvokingEvent, Logger};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum ComplianceType {
    Compliant,
    NonCompliant,
    NotApplicable,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Evaluation {
    compliance_resource_type: String,
    compliance_resource_id: String,
    compliance_type: ComplianceType,
    annotation: Option<String>,
    ordering_timestamp: Option<String>,
    result_token: String,
}

fn str_of(map: &Map<String, Value>, key: &str) -> String {
    map.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Every rule parameter names a tag the resource must carry; a non-empty
/// value must also match.
fn check_tags(item: &Map<String, Value>, required: &HashMap<String, String>) -> (ComplianceType, Option<String>) {
    let tags = item.get("tags").and_then(Value::as_object);
    let mut missing: Vec<&str> = required
        .iter()
        .filter(|(key, expected)| {
            match tags.and_then(|t| t.get(key.as_str())).and_then(Value::as_str) {
                Some(actual) => !expected.is_empty() && actual != expected.as_str(),
                None => true,
            }
        })
        .map(|(key, _)| key.as_str())
        .collect();
    if missing.is_empty() {
        (ComplianceType::Compliant, None)
    } else {
        missing.sort_unstable();
        (ComplianceType::NonCompliant, Some(format!("missing or mismatched tags: {}", missing.join(", "))))
    }
}

async fn evaluate(logger: &Logger, event: LambdaEvent<Value>) -> Result<Evaluation, Error> {
    logger.inject_lambda_context(&event.context);
    logger.log_incoming_event(&event.payload);

    let config_event = AwsConfigEvent::try_from(event.payload)?;
    let result_token = config_event.result_token()?.to_string();
    logger.append_keys([("config_rule_name", Value::from(config_event.config_rule_name()?))]);

    let invoking = config_event.invoking_event()?;
    let event = invoking.event()?;
    let (compliance_type, annotation, resource_type, resource_id, ordering_timestamp) = match &invoking {
        InvokingEvent::ConfigurationChange(_) => {
            let status = str_of(event, "configurationItemStatus");
            let (compliance, annotation) = if config_event.event_left_scope()? || status.starts_with("ResourceDeleted") {
                (ComplianceType::NotApplicable, Some("resource is out of scope".to_string()))
            } else {
                check_tags(event, &config_event.rule_parameters()?)
            };
            (
                compliance,
                annotation,
                str_of(event, "resourceType"),
                str_of(event, "resourceId"),
                Some(str_of(event, "configurationItemCaptureTime")),
            )
        }
        InvokingEvent::OversizedConfigurationChange(_) => (
            ComplianceType::NotApplicable,
            Some("configuration item too large to evaluate inline".to_string()),
            str_of(event, "resourceType"),
            str_of(event, "resourceId"),
            Some(str_of(event, "configurationItemCaptureTime")),
        ),
        InvokingEvent::Periodic(_) => (
            ComplianceType::Compliant,
            None,
            "AWS::::Account".to_string(),
            config_event.account_id()?.to_string(),
            Some(str_of(event, "notificationCreationTime")),
        ),
    };

    logger.info(format!("{resource_type} {resource_id} evaluated as {compliance_type:?}"));

    Ok(Evaluation {
        compliance_resource_type: resource_type,
        compliance_resource_id: resource_id,
        compliance_type,
        annotation,
        ordering_timestamp: ordering_timestamp.filter(|t| !t.is_empty()),
        result_token,
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(RegistryLayer::new(global()))
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_filter(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new("powertools_lambda=info")),
                ),
        )
        .init();

    let logger = Logger::builder().build();
    global().get_or_create("lambda_runtime");
    copy_config_to_registered_loggers(global(), &logger, &CopyConfig::default().include(["lambda_runtime"]));

    lambda_runtime::run(service_fn(|event: LambdaEvent<Value>| evaluate(&logger, event))).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use lambda_runtime::Context;
    use powertools_lambda::logging::{LoggerBuilder, LoggerConfig, Registry};
    use serde_json::json;

    fn payload(invoking_event: Value, event_left_scope: bool) -> Value {
        json!({
            "invokingEvent": invoking_event.to_string(),
            "ruleParameters": "{\"owner\": \"\"}",
            "resultToken": "token-1",
            "eventLeftScope": event_left_scope,
            "configRuleName": "required-tags",
            "accountId": "123456789012",
            "version": "1.0"
        })
    }

    fn change(status: &str, tags: Value) -> Value {
        json!({
            "configurationItem": {
                "configurationItemCaptureTime": "2024-01-02T03:04:05.000Z",
                "configurationItemStatus": status,
                "resourceType": "AWS::EC2::Instance",
                "resourceId": "i-1",
                "tags": tags
            },
            "messageType": "ConfigurationItemChangeNotification"
        })
    }

    async fn run(payload: Value) -> Evaluation {
        let registry = Registry::new();
        let logger = LoggerBuilder::from_config(LoggerConfig::default())
            .service("config_rule")
            .registry(&registry)
            .writer(std::io::sink())
            .build();
        evaluate(&logger, LambdaEvent::new(payload, Context::default()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn tagged_resource_is_compliant() {
        let evaluation = run(payload(change("OK", json!({"owner": "team-a"})), false)).await;
        assert_eq!(evaluation.compliance_type, ComplianceType::Compliant);
        assert_eq!(evaluation.compliance_resource_id, "i-1");
        assert_eq!(evaluation.compliance_resource_type, "AWS::EC2::Instance");
        assert_eq!(evaluation.ordering_timestamp.as_deref(), Some("2024-01-02T03:04:05.000Z"));
        assert_eq!(evaluation.result_token, "token-1");
    }

    #[tokio::test]
    async fn untagged_resource_is_non_compliant() {
        let evaluation = run(payload(change("OK", json!({})), false)).await;
        assert_eq!(evaluation.compliance_type, ComplianceType::NonCompliant);
        assert_eq!(evaluation.annotation.as_deref(), Some("missing or mismatched tags: owner"));
    }

    #[tokio::test]
    async fn out_of_scope_or_deleted_is_not_applicable() {
        let left = run(payload(change("OK", json!({})), true)).await;
        assert_eq!(left.compliance_type, ComplianceType::NotApplicable);

        let deleted = run(payload(change("ResourceDeleted", json!({})), false)).await;
        assert_eq!(deleted.compliance_type, ComplianceType::NotApplicable);
    }

    #[tokio::test]
    async fn oversized_item_is_not_applicable() {
        let invoking = json!({
            "configurationItemSummary": {
                "resourceType": "AWS::EC2::Instance",
                "resourceId": "i-2",
                "configurationItemCaptureTime": "2024-01-02T03:04:05.000Z"
            },
            "messageType": "OversizedConfigurationItemChangeNotification"
        });
        let evaluation = run(payload(invoking, false)).await;
        assert_eq!(evaluation.compliance_type, ComplianceType::NotApplicable);
        assert_eq!(evaluation.compliance_resource_id, "i-2");
    }

    #[tokio::test]
    async fn periodic_evaluation_targets_the_account() {
        let invoking = json!({
            "messageType": "ScheduledNotification",
            "notificationCreationTime": "2024-01-02T00:00:00.000Z"
        });
        let evaluation = run(payload(invoking, false)).await;
        assert_eq!(evaluation.compliance_type, ComplianceType::Compliant);
        assert_eq!(evaluation.compliance_resource_type, "AWS::::Account");
        assert_eq!(evaluation.compliance_resource_id, "123456789012");
        assert_eq!(evaluation.ordering_timestamp.as_deref(), Some("2024-01-02T00:00:00.000Z"));
    }

    #[tokio::test]
    async fn missing_result_token_fails() {
        let mut payload = payload(change("OK", json!({})), false);
        payload.as_object_mut().unwrap().remove("resultToken");
        let registry = Registry::new();
        let logger = LoggerBuilder::from_config(LoggerConfig::default())
            .service("config_rule")
            .registry(&registry)
            .writer(std::io::sink())
            .build();
        let err = evaluate(&logger, LambdaEvent::new(payload, Context::default()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "missing key 'resultToken'");
    }

    fn item(tags: Value) -> Map<String, Value> {
        json!({"resourceType": "AWS::EC2::Instance", "resourceId": "i-1", "tags": tags})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn required(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn tags_present_with_matching_values() {
        let (compliance, annotation) = check_tags(
            &item(json!({"owner": "team-a", "env": "prod"})),
            &required(&[("owner", ""), ("env", "prod")]),
        );
        assert_eq!(compliance, ComplianceType::Compliant);
        assert!(annotation.is_none());
    }

    #[test]
    fn missing_and_mismatched_tags_are_listed() {
        let (compliance, annotation) = check_tags(
            &item(json!({"env": "dev"})),
            &required(&[("owner", ""), ("env", "prod")]),
        );
        assert_eq!(compliance, ComplianceType::NonCompliant);
        assert_eq!(annotation.as_deref(), Some("missing or mismatched tags: env, owner"));
    }

    #[test]
    fn compliance_serializes_in_config_casing() {
        assert_eq!(serde_json::to_value(ComplianceType::NotApplicable).unwrap(), json!("NOT_APPLICABLE"));
    }
}
