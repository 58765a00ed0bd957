//! Data transformation hook handler

use crate::hooks::{HookBroker, HookError, HookHandler, HookResult};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One step applied to a JSON object value. Non-object values pass through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transform {
    RenameField { from: String, to: String },
    RemoveField { field: String },
    AddField { field: String, value: Value },
    Lowercase { field: String },
    Uppercase { field: String },
    Truncate { field: String, length: usize },
    Redact {
        field: String,
        #[serde(default = "default_replacement")]
        replacement: String,
    },
    Merge { data: Map<String, Value> },
    Base64Encode { field: String },
    Base64Decode { field: String },
}

fn default_replacement() -> String {
    "***REDACTED***".to_string()
}

impl Transform {
    pub fn apply(&self, value: Value) -> Value {
        let Value::Object(mut map) = value else {
            return value;
        };

        match self {
            Self::RenameField { from, to } => {
                if let Some(v) = map.remove(from) {
                    map.insert(to.clone(), v);
                }
            }
            Self::RemoveField { field } => {
                map.remove(field);
            }
            Self::AddField { field, value } => {
                map.insert(field.clone(), value.clone());
            }
            Self::Lowercase { field } => {
                if let Some(Value::String(s)) = map.get_mut(field) {
                    *s = s.to_lowercase();
                }
            }
            Self::Uppercase { field } => {
                if let Some(Value::String(s)) = map.get_mut(field) {
                    *s = s.to_uppercase();
                }
            }
            Self::Truncate { field, length } => {
                if let Some(Value::String(s)) = map.get_mut(field) {
                    if s.chars().count() > *length {
                        *s = s.chars().take(*length).collect();
                    }
                }
            }
            Self::Redact { field, replacement } => {
                if let Some(v) = map.get_mut(field) {
                    *v = Value::String(replacement.clone());
                }
            }
            Self::Merge { data } => {
                for (key, v) in data {
                    map.insert(key.clone(), v.clone());
                }
            }
            Self::Base64Encode { field } => {
                if let Some(Value::String(s)) = map.get_mut(field) {
                    *s = general_purpose::STANDARD.encode(s.as_bytes());
                }
            }
            Self::Base64Decode { field } => {
                // Undecodable input is left as it was
                if let Some(Value::String(s)) = map.get_mut(field) {
                    if let Some(decoded) = general_purpose::STANDARD
                        .decode(s.as_bytes())
                        .ok()
                        .and_then(|bytes| String::from_utf8(bytes).ok())
                    {
                        *s = decoded;
                    }
                }
            }
        }

        Value::Object(map)
    }
}

/// Applies a pipeline of [`Transform`]s to the filtered value
pub struct TransformHandler {
    name: String,
    transforms: Vec<Transform>,
}

impl TransformHandler {
    pub fn new(name: impl Into<String>, transforms: Vec<Transform>) -> Self {
        Self {
            name: name.into(),
            transforms,
        }
    }

    /// Build from the `transforms` option, a list of tagged transform tables
    pub fn from_options(name: impl Into<String>, options: &HashMap<String, Value>) -> HookResult<Self> {
        let name = name.into();
        let transforms = match options.get("transforms") {
            Some(list) => serde_json::from_value(list.clone())?,
            None => {
                return Err(HookError::invalid_config(format!(
                    "Transform handler '{}' has no transforms",
                    name
                )))
            }
        };
        Ok(Self::new(name, transforms))
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }
}

impl HookHandler for TransformHandler {
    fn call(&self, _broker: &HookBroker, args: &[Value]) -> HookResult<Value> {
        let value = args.first().cloned().unwrap_or(Value::Null);
        Ok(self
            .transforms
            .iter()
            .fold(value, |value, transform| transform.apply(value)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(transform: Transform, value: Value) -> Value {
        transform.apply(value)
    }

    #[test]
    fn test_field_transforms() {
        assert_eq!(
            run(
                Transform::RenameField { from: "p".into(), to: "page_id".into() },
                json!({"p": 4})
            ),
            json!({"page_id": 4})
        );
        assert_eq!(
            run(Transform::RemoveField { field: "debug".into() }, json!({"debug": true, "a": 1})),
            json!({"a": 1})
        );
        assert_eq!(
            run(Transform::Uppercase { field: "m".into() }, json!({"m": "get"})),
            json!({"m": "GET"})
        );
        assert_eq!(
            run(Transform::Lowercase { field: "m".into() }, json!({"m": "POST"})),
            json!({"m": "post"})
        );
        assert_eq!(
            run(Transform::Truncate { field: "s".into(), length: 3 }, json!({"s": "héllo"})),
            json!({"s": "hél"})
        );
    }

    #[test]
    fn test_redact_and_merge() {
        let redact: Transform =
            serde_json::from_value(json!({"type": "redact", "field": "password"})).unwrap();
        assert_eq!(
            redact.apply(json!({"password": "hunter2"})),
            json!({"password": "***REDACTED***"})
        );
        assert_eq!(redact.apply(json!({"user": "a"})), json!({"user": "a"}));

        let merge: Transform =
            serde_json::from_value(json!({"type": "merge", "data": {"x": 1, "y": 2}})).unwrap();
        assert_eq!(merge.apply(json!({"x": 0, "z": 3})), json!({"x": 1, "y": 2, "z": 3}));
    }

    #[test]
    fn test_base64() {
        let encoded = run(Transform::Base64Encode { field: "b".into() }, json!({"b": "hello"}));
        assert_eq!(encoded, json!({"b": "aGVsbG8="}));
        let decoded = run(Transform::Base64Decode { field: "b".into() }, encoded);
        assert_eq!(decoded, json!({"b": "hello"}));

        let invalid = run(Transform::Base64Decode { field: "b".into() }, json!({"b": "%%%"}));
        assert_eq!(invalid, json!({"b": "%%%"}));
    }

    #[test]
    fn test_non_object_passes_through() {
        assert_eq!(
            run(Transform::AddField { field: "a".into(), value: json!(1) }, json!("text")),
            json!("text")
        );
    }

    #[test]
    fn test_handler_pipeline() {
        let options: HashMap<String, Value> = HashMap::from([(
            "transforms".to_string(),
            json!([
                {"type": "add_field", "field": "source", "value": "hook"},
                {"type": "rename_field", "from": "source", "to": "origin"}
            ]),
        )]);
        let handler = TransformHandler::from_options("pipeline", &options).unwrap();
        assert_eq!(handler.transforms().len(), 2);

        let broker = HookBroker::new();
        let out = handler.call(&broker, &[json!({"id": 1})]).unwrap();
        assert_eq!(out, json!({"id": 1, "origin": "hook"}));
    }

    #[test]
    fn test_handler_option_errors() {
        let missing = TransformHandler::from_options("empty", &HashMap::new());
        assert!(matches!(missing, Err(HookError::InvalidConfiguration(_))));

        let options = HashMap::from([("transforms".to_string(), json!([{"type": "explode"}]))]);
        let unknown = TransformHandler::from_options("bad", &options);
        assert!(matches!(unknown, Err(HookError::SerializationError(_))));
    }
}
