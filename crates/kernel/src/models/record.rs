//! Storage records, one per table row.
//!
//! Column names match the migration; repositories convert these to and from
//! store rows with `store::to_row` / `store::from_row`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::field::FieldType;

/// Row of `forms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormRecord {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub user_id: Uuid,
    pub is_public: bool,
    /// Serialized `FormSettings` (JSONB).
    pub settings: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of `form_fields`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRecord {
    pub id: Uuid,
    pub form_id: Uuid,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    pub description: Option<String>,
    pub required: bool,
    pub placeholder: Option<String>,
    /// Encoded with the answer codec.
    pub default_value: Option<String>,
    /// Zero-based position within the form.
    pub f_order: i32,
    /// Serialized `FieldProperties` (JSONB).
    pub properties: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of `field_options`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionRecord {
    pub id: Uuid,
    pub field_id: Uuid,
    pub value: String,
    pub description: Option<String>,
    pub f_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of `form_responses`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub id: Uuid,
    pub form_id: Uuid,
    /// Submitter, absent for anonymous submissions.
    pub user_id: Option<Uuid>,
    pub submitted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of `response_values`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueRecord {
    pub id: Uuid,
    pub response_id: Uuid,
    pub field_id: Uuid,
    pub value: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
