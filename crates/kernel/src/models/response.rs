//! Form responses and the answer codec.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::record::{ResponseRecord, ValueRecord};

/// Answers keyed by field id.
pub type Answers = Map<String, Value>;

/// Encode an answer for storage.
///
/// Strings are stored literally, everything else (null included) as JSON
/// text.
pub fn encode_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Decode a stored answer: JSON when it parses, the literal string otherwise.
///
/// A string answer that happens to be valid JSON (`"42"`, `"true"`) decodes
/// to the JSON value.
pub fn decode_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Whether an answer counts as given for a required field.
///
/// `false` and `0` are answers; null and the empty string are not.
pub fn is_answered(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// A submitted response with decoded values.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormResponse {
    pub id: Uuid,
    pub form_id: Uuid,
    pub user_id: Option<Uuid>,
    pub submitted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub values: Answers,
}

impl FormResponse {
    /// Assemble a response from its record and stored values.
    pub fn from_record(record: ResponseRecord, values: Vec<ValueRecord>) -> Self {
        let values = values
            .into_iter()
            .filter_map(|v| {
                let raw = v.value?;
                Some((v.field_id.to_string(), decode_value(&raw)))
            })
            .collect();
        Self {
            id: record.id,
            form_id: record.form_id,
            user_id: record.user_id,
            submitted_at: record.submitted_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
            values,
        }
    }
}

/// Body returned by a successful submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub response_id: Uuid,
}
