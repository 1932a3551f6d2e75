//! Forms and their settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::field::{Field, FieldInput};
use super::record::FormRecord;

/// Title given to forms created without one.
pub const DEFAULT_TITLE: &str = "Untitled Form";

fn default_submit_button_text() -> String {
    "Submit".to_string()
}

fn default_confirmation_message() -> String {
    "Thank you for your submission!".to_string()
}

/// Presentation settings of a form.
///
/// Unknown keys are kept in `extra` and round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSettings {
    #[serde(default = "default_submit_button_text")]
    pub submit_button_text: String,

    #[serde(default)]
    pub show_progress_bar: bool,

    #[serde(default = "default_confirmation_message")]
    pub confirmation_message: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            submit_button_text: default_submit_button_text(),
            show_progress_bar: false,
            confirmation_message: default_confirmation_message(),
            extra: Map::new(),
        }
    }
}

impl FormSettings {
    /// Decode stored settings, falling back to defaults for a null or
    /// malformed column.
    pub fn from_stored(value: Value) -> Self {
        match value {
            Value::Null => Self::default(),
            other => serde_json::from_value(other).unwrap_or_default(),
        }
    }

    /// Encode for storage.
    pub fn to_stored(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A fully hydrated form as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub fields: Vec<Field>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_public: bool,
    pub user_id: Uuid,
    /// Live count of stored responses.
    pub response_count: i64,
    pub settings: FormSettings,
}

impl Form {
    /// Assemble a form from its record, ordered fields and response count.
    pub fn from_record(record: FormRecord, fields: Vec<Field>, response_count: i64) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description.unwrap_or_default(),
            fields,
            created_at: record.created_at,
            updated_at: record.updated_at,
            is_public: record.is_public,
            user_id: record.user_id,
            response_count,
            settings: FormSettings::from_stored(record.settings),
        }
    }
}

/// Input for creating a form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDraft {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub is_public: Option<bool>,

    #[serde(default)]
    pub settings: Option<FormSettings>,

    #[serde(default)]
    pub fields: Option<Vec<FieldInput>>,
}

/// Input for updating a form. Absent attributes are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormPatch {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub is_public: Option<bool>,

    #[serde(default)]
    pub settings: Option<FormSettings>,

    /// When present, the complete new field list.
    #[serde(default)]
    pub fields: Option<Vec<FieldInput>>,
}

/// Resolve a client-supplied title, substituting the default for blanks.
pub fn resolve_title(title: Option<&str>) -> String {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => DEFAULT_TITLE.to_string(),
    }
}
