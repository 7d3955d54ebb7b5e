//! Classification results and the records collected for output.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured classification of one document.
///
/// Every field is optional: models do not reliably fill them in, and a
/// failed classification is represented by the all-empty value rather than
/// an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_request_type: Option<String>,
    /// Kept as the raw JSON value; models return numbers, strings or percentages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Field name to extracted value; keys are chosen by the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_information: Option<Map<String, Value>>,
}

impl ClassificationResult {
    /// The result recorded when extraction or classification fails.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Parse a complete model reply, which must be a single JSON object.
    pub fn from_reply(reply: &str) -> serde_json::Result<Self> {
        match serde_json::from_str::<Value>(reply)? {
            Value::Object(object) => Ok(Self::from_object(&object)),
            other => Err(serde::de::Error::custom(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Build a result from a parsed model reply object.
    ///
    /// Text fields accept any scalar; non-string values are kept as their
    /// JSON rendering. A non-object `extracted_information` is dropped.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            request_type: text_field(object, "request_type"),
            sub_request_type: text_field(object, "sub_request_type"),
            confidence_score: object
                .get("confidence_score")
                .filter(|v| !v.is_null())
                .cloned(),
            reasoning: text_field(object, "reasoning"),
            extracted_information: object
                .get("extracted_information")
                .and_then(Value::as_object)
                .cloned(),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// One processed input document and its classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedFileRecord {
    pub filename: String,
    pub result: ClassificationResult,
}

impl ProcessedFileRecord {
    pub fn new(filename: impl Into<String>, result: ClassificationResult) -> Self {
        Self {
            filename: filename.into(),
            result,
        }
    }

    /// Record for a document that could not be extracted or classified.
    pub fn empty(filename: impl Into<String>) -> Self {
        Self::new(filename, ClassificationResult::empty())
    }
}

/// Flattened record written to the output artifact.
///
/// Absent values become `""` (or `{}` for extracted information) so every
/// record has the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub filename: String,
    pub request_type: String,
    pub sub_request_type: String,
    pub confidence_score: Value,
    pub reasoning: String,
    pub extracted_information: Map<String, Value>,
}

impl From<&ProcessedFileRecord> for OutputRecord {
    fn from(record: &ProcessedFileRecord) -> Self {
        let result = &record.result;
        Self {
            filename: record.filename.clone(),
            request_type: result.request_type.clone().unwrap_or_default(),
            sub_request_type: result.sub_request_type.clone().unwrap_or_default(),
            confidence_score: result
                .confidence_score
                .clone()
                .unwrap_or_else(|| Value::String(String::new())),
            reasoning: result.reasoning.clone().unwrap_or_default(),
            extracted_information: result.extracted_information.clone().unwrap_or_default(),
        }
    }
}
