use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::json_kind;
use crate::errors::EditError;

/// One code change, as defined by the edit-application service.
///
/// The content is opaque here: it is carried and forwarded as-is, in the order
/// it was received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Edit(Value);

impl Edit {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// The edit container used by every service that proposes changes.
///
/// ```json
/// { "file": "snippet.py", "explanation": "guard division", "edits": [ ... ] }
/// ```
///
/// Fields other than `edits` are optional; unknown fields survive a round
/// trip through this type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default)]
    pub edits: Vec<Edit>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EditSet {
    /// Validate operator-supplied text.
    ///
    /// The text must be a JSON object with an `edits` array. Nothing is sent
    /// anywhere when this fails.
    pub fn parse(text: &str) -> Result<Self, EditError> {
        let value: Value = serde_json::from_str(text).map_err(EditError::InvalidJson)?;
        let object = value.as_object().ok_or(EditError::NotAnObject {
            found: json_kind(&value),
        })?;
        let edits = object.get("edits").ok_or(EditError::MissingEdits)?;
        if !edits.is_array() {
            return Err(EditError::EditsNotArray {
                found: json_kind(edits),
            });
        }
        serde_json::from_value(value).map_err(EditError::InvalidJson)
    }

    /// Lenient read of a service response field.
    ///
    /// Services may return `null`, a bare array, or a container whose `edits`
    /// is missing or malformed; all of these collapse to what can be salvaged
    /// (an empty set in the worst case).
    pub fn from_response(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self {
                edits: items.iter().cloned().map(Edit::new).collect(),
                ..Self::default()
            },
            Value::Object(object) => {
                let string_field = |key: &str| {
                    object
                        .get(key)
                        .and_then(Value::as_str)
                        .map(str::to_string)
                };
                let edits = object
                    .get("edits")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().cloned().map(Edit::new).collect())
                    .unwrap_or_default();
                let extra = object
                    .iter()
                    .filter(|(key, _)| !matches!(key.as_str(), "file" | "explanation" | "edits"))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                Self {
                    file: string_field("file"),
                    explanation: string_field("explanation"),
                    edits,
                    extra,
                }
            }
            _ => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }
}
