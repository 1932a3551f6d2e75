//! Form fields and their selectable options.

use chrono::Utc;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::record::{FieldRecord, OptionRecord};
use super::response::decode_value;

/// Closed set of field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    ShortText,
    LongText,
    Email,
    Number,
    Phone,
    Url,
    MultipleChoice,
    Checkbox,
    Dropdown,
    Date,
    Time,
    File,
    Rating,
}

impl FieldType {
    /// Whether fields of this type carry selectable options.
    pub fn takes_options(self) -> bool {
        matches!(
            self,
            FieldType::MultipleChoice | FieldType::Checkbox | FieldType::Dropdown
        )
    }

    /// Wire name of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::ShortText => "short-text",
            FieldType::LongText => "long-text",
            FieldType::Email => "email",
            FieldType::Number => "number",
            FieldType::Phone => "phone",
            FieldType::Url => "url",
            FieldType::MultipleChoice => "multiple-choice",
            FieldType::Checkbox => "checkbox",
            FieldType::Dropdown => "dropdown",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::File => "file",
            FieldType::Rating => "rating",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific field properties.
///
/// Flattened into the field object on the wire. Keys outside the known set
/// are kept in `extra` and round-trip unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,

    /// Multiple selection for option fields, multiple uploads for files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_multiple: Option<bool>,

    /// Accepted MIME types or extensions for file fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept: Option<String>,

    /// Upload size limit in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rating: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldProperties {
    /// Decode stored properties, tolerating a null or malformed column.
    pub fn from_stored(value: Value) -> Self {
        match value {
            Value::Null => Self::default(),
            other => serde_json::from_value(other).unwrap_or_default(),
        }
    }
}

/// One selectable choice of an options-bearing field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOption {
    pub id: Uuid,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub order: i32,
}

impl From<OptionRecord> for FieldOption {
    fn from(record: OptionRecord) -> Self {
        Self {
            id: record.id,
            value: record.value,
            description: record.description,
            order: record.f_order,
        }
    }
}

/// A field as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: Uuid,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    pub label: String,

    pub required: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    pub order: i32,

    /// Present only for options-bearing types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,

    #[serde(flatten)]
    pub properties: FieldProperties,
}

impl Field {
    /// Assemble a field from its record and its (already ordered) options.
    pub fn from_record(record: FieldRecord, options: Vec<OptionRecord>) -> Self {
        let options = record
            .field_type
            .takes_options()
            .then(|| options.into_iter().map(FieldOption::from).collect());
        Self {
            id: record.id,
            field_type: record.field_type,
            label: record.label,
            required: record.required,
            description: record.description,
            placeholder: record.placeholder,
            default_value: record.default_value.as_deref().map(decode_value),
            order: record.f_order,
            options,
            properties: FieldProperties::from_stored(record.properties),
        }
    }
}

/// Read an identifier from a payload, accepting only well-formed UUID strings.
fn lenient_id(id: Option<&Value>) -> Option<Uuid> {
    match id {
        Some(Value::String(s)) => Uuid::parse_str(s).ok(),
        _ => None,
    }
}

/// A field as sent by clients when creating or updating a form.
///
/// Position in the payload decides the order index; a client-sent `order`
/// is accepted and ignored so a field read back from the API can be sent
/// again unchanged.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInput {
    #[serde(default)]
    pub id: Option<Value>,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    pub label: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub placeholder: Option<String>,

    #[serde(default)]
    pub default_value: Option<Value>,

    #[serde(default, rename = "order")]
    _order: Option<IgnoredAny>,

    #[serde(default)]
    pub options: Option<Vec<OptionInput>>,

    #[serde(flatten)]
    pub properties: FieldProperties,
}

impl FieldInput {
    /// The referenced field id, when it is a well-formed UUID.
    pub fn parsed_id(&self) -> Option<Uuid> {
        lenient_id(self.id.as_ref())
    }

    /// Build the storage record for this field at `order` within `form_id`.
    pub fn to_record(&self, id: Uuid, form_id: Uuid, order: i32) -> FieldRecord {
        let now = Utc::now();
        FieldRecord {
            id,
            form_id,
            field_type: self.field_type,
            label: self.label.clone(),
            description: non_blank(self.description.as_deref()),
            required: self.required,
            placeholder: non_blank(self.placeholder.as_deref()),
            default_value: self
                .default_value
                .as_ref()
                .map(super::response::encode_value),
            f_order: order,
            properties: serde_json::to_value(&self.properties).unwrap_or(Value::Null),
            created_at: now,
            updated_at: now,
        }
    }
}

/// An option as sent by clients.
#[derive(Debug, Clone, Deserialize)]
pub struct OptionInput {
    #[serde(default)]
    pub id: Option<Value>,

    pub value: String,

    #[serde(default)]
    pub description: Option<String>,
}

impl OptionInput {
    /// The referenced option id, when it is a well-formed UUID.
    pub fn parsed_id(&self) -> Option<Uuid> {
        lenient_id(self.id.as_ref())
    }

    /// Build the storage record for this option at `order` within `field_id`.
    pub fn to_record(&self, id: Uuid, field_id: Uuid, order: i32) -> OptionRecord {
        let now = Utc::now();
        OptionRecord {
            id,
            field_id,
            value: self.value.clone(),
            description: non_blank(self.description.as_deref()),
            f_order: order,
            created_at: now,
            updated_at: now,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(str::to_string)
}
