use serde_json::{Map, Value};

use crate::AppError;

/// Immutable view over a JSON object received as an invocation payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DictWrapper {
    data: Map<String, Value>,
}

impl DictWrapper {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// The untouched payload.
    pub fn raw_event(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.data
    }

    pub(crate) fn value(&self, key: &str) -> Result<&Value, AppError> {
        self.data
            .get(key)
            .ok_or_else(|| AppError::MissingKey(key.to_string()))
    }

    pub(crate) fn str_field(&self, key: &str) -> Result<&str, AppError> {
        self.value(key)?
            .as_str()
            .ok_or_else(|| wrong_type(key, "a string"))
    }

    pub(crate) fn bool_field(&self, key: &str) -> Result<bool, AppError> {
        self.value(key)?
            .as_bool()
            .ok_or_else(|| wrong_type(key, "a boolean"))
    }

    pub(crate) fn object_field(&self, key: &str) -> Result<&Map<String, Value>, AppError> {
        self.value(key)?
            .as_object()
            .ok_or_else(|| wrong_type(key, "an object"))
    }

    /// Decodes the JSON document embedded as a string at `key`.
    pub(crate) fn json_field(&self, key: &str) -> Result<Value, AppError> {
        serde_json::from_str(self.str_field(key)?).map_err(|source| AppError::MalformedPayload {
            key: key.to_string(),
            source,
        })
    }
}

impl From<Map<String, Value>> for DictWrapper {
    fn from(data: Map<String, Value>) -> Self {
        Self::new(data)
    }
}

impl TryFrom<Value> for DictWrapper {
    type Error = AppError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(data) => Ok(Self::new(data)),
            _ => Err(wrong_type("$", "an object")),
        }
    }
}

fn wrong_type(key: &str, expected: &'static str) -> AppError {
    AppError::WrongType {
        key: key.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wrapper(value: Value) -> DictWrapper {
        DictWrapper::try_from(value).unwrap()
    }

    #[test]
    fn missing_key_is_reported_by_name() {
        let dict = wrapper(json!({"present": "yes"}));
        match dict.str_field("absent") {
            Err(AppError::MissingKey(key)) => assert_eq!(key, "absent"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn typed_lookups_reject_other_json_types() {
        let dict = wrapper(json!({"flag": "true", "name": 1}));
        assert!(matches!(dict.bool_field("flag"), Err(AppError::WrongType { .. })));
        assert!(matches!(dict.str_field("name"), Err(AppError::WrongType { .. })));
    }

    #[test]
    fn embedded_json_is_decoded() {
        let dict = wrapper(json!({"doc": "{\"a\": [1, 2]}"}));
        assert_eq!(dict.json_field("doc").unwrap(), json!({"a": [1, 2]}));
    }

    #[test]
    fn embedded_json_errors_are_malformed_payload() {
        let dict = wrapper(json!({"doc": "{not json"}));
        assert!(matches!(
            dict.json_field("doc"),
            Err(AppError::MalformedPayload { key, .. }) if key == "doc"
        ));
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert!(DictWrapper::try_from(json!([1, 2, 3])).is_err());
    }
}
