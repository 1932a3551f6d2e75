//! Formcraft test utilities.
//!
//! Builders for the JSON payloads clients send to the form API, plus
//! assertion helpers for envelope responses.

use serde_json::{Map, Value as JsonValue, json};
use uuid::Uuid;

/// Start building a form payload with the given title.
pub fn test_form(title: &str) -> TestForm {
    TestForm {
        title: Some(title.to_string()),
        description: None,
        is_public: false,
        settings: None,
        fields: Vec::new(),
    }
}

/// A form payload builder for `POST /forms` and `PUT /forms/{id}`.
#[derive(Debug, Clone)]
pub struct TestForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_public: bool,
    pub settings: Option<JsonValue>,
    pub fields: Vec<TestField>,
}

impl TestForm {
    /// Drop the title so the server default applies.
    pub fn untitled(mut self) -> Self {
        self.title = None;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Mark the form as public.
    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }

    /// Set raw settings.
    pub fn with_settings(mut self, settings: JsonValue) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Append a field.
    pub fn with_field(mut self, field: TestField) -> Self {
        self.fields.push(field);
        self
    }

    /// Render the payload as JSON.
    pub fn to_json(&self) -> JsonValue {
        let mut body = Map::new();
        if let Some(title) = &self.title {
            body.insert("title".into(), json!(title));
        }
        if let Some(description) = &self.description {
            body.insert("description".into(), json!(description));
        }
        body.insert("isPublic".into(), json!(self.is_public));
        if let Some(settings) = &self.settings {
            body.insert("settings".into(), settings.clone());
        }
        body.insert(
            "fields".into(),
            JsonValue::Array(self.fields.iter().map(TestField::to_json).collect()),
        );
        JsonValue::Object(body)
    }
}

/// A field payload builder.
#[derive(Debug, Clone)]
pub struct TestField {
    pub id: Option<String>,
    pub field_type: String,
    pub label: String,
    pub required: bool,
    pub options: Option<Vec<TestOption>>,
    pub extra: Map<String, JsonValue>,
}

impl TestField {
    /// Create a field of any type.
    pub fn new(field_type: &str, label: &str) -> Self {
        Self {
            id: None,
            field_type: field_type.to_string(),
            label: label.to_string(),
            required: false,
            options: None,
            extra: Map::new(),
        }
    }

    /// A `short-text` field.
    pub fn short_text(label: &str) -> Self {
        Self::new("short-text", label)
    }

    /// A `number` field.
    pub fn number(label: &str) -> Self {
        Self::new("number", label)
    }

    /// A `checkbox` field with the given option values.
    pub fn checkbox(label: &str, values: &[&str]) -> Self {
        Self::new("checkbox", label).with_options(values)
    }

    /// A `dropdown` field with the given option values.
    pub fn dropdown(label: &str, values: &[&str]) -> Self {
        Self::new("dropdown", label).with_options(values)
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Reference an existing field by ID.
    pub fn with_id(mut self, id: impl ToString) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Replace the options with fresh (ID-less) values.
    pub fn with_options(mut self, values: &[&str]) -> Self {
        self.options = Some(values.iter().map(|v| TestOption::new(v)).collect());
        self
    }

    /// Replace the options with explicit option builders.
    pub fn with_option_list(mut self, options: Vec<TestOption>) -> Self {
        self.options = Some(options);
        self
    }

    /// Add a type-specific property (flattened into the field object).
    pub fn with_property(mut self, key: &str, value: JsonValue) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Render the field as JSON.
    pub fn to_json(&self) -> JsonValue {
        let mut body = self.extra.clone();
        if let Some(id) = &self.id {
            body.insert("id".into(), json!(id));
        }
        body.insert("type".into(), json!(self.field_type));
        body.insert("label".into(), json!(self.label));
        body.insert("required".into(), json!(self.required));
        if let Some(options) = &self.options {
            body.insert(
                "options".into(),
                JsonValue::Array(options.iter().map(TestOption::to_json).collect()),
            );
        }
        JsonValue::Object(body)
    }
}

/// An option payload builder.
#[derive(Debug, Clone)]
pub struct TestOption {
    pub id: Option<String>,
    pub value: String,
    pub description: Option<String>,
}

impl TestOption {
    /// Create a new option without an ID.
    pub fn new(value: &str) -> Self {
        Self {
            id: None,
            value: value.to_string(),
            description: None,
        }
    }

    /// Reference an existing option by ID.
    pub fn existing(id: impl ToString, value: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Self::new(value)
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Render the option as JSON.
    pub fn to_json(&self) -> JsonValue {
        let mut body = Map::new();
        if let Some(id) = &self.id {
            body.insert("id".into(), json!(id));
        }
        body.insert("value".into(), json!(self.value));
        if let Some(description) = &self.description {
            body.insert("description".into(), json!(description));
        }
        JsonValue::Object(body)
    }
}

/// A test account known to the scripted identity provider.
#[derive(Debug, Clone)]
pub struct TestAccount {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

/// Create a test account with a unique ID and bearer token.
pub fn test_account(email: &str) -> TestAccount {
    let id = Uuid::now_v7();
    TestAccount {
        id,
        email: email.to_string(),
        token: format!("token-{}", id.simple()),
    }
}

/// Assertion helpers for envelope responses.
pub mod assert {
    use serde_json::Value;

    /// Assert a successful envelope.
    pub fn success(body: &Value) {
        assert_eq!(
            body["success"],
            Value::Bool(true),
            "Expected a successful envelope, got: {body}"
        );
    }

    /// Assert a failed envelope whose error mentions `needle`.
    pub fn failure_contains(body: &Value, needle: &str) {
        assert_eq!(
            body["success"],
            Value::Bool(false),
            "Expected a failed envelope, got: {body}"
        );
        let error = body["error"].as_str().unwrap_or_default();
        assert!(
            error.contains(needle),
            "Expected error to contain '{needle}'\nActual: {error}"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn form_builder_renders_camel_case_payload() {
        let form = test_form("Survey")
            .public()
            .with_description("About you")
            .with_field(TestField::short_text("Name").required())
            .to_json();

        assert_eq!(form["title"], "Survey");
        assert_eq!(form["isPublic"], true);
        assert_eq!(form["fields"][0]["type"], "short-text");
        assert_eq!(form["fields"][0]["required"], true);
        assert!(form["fields"][0].get("id").is_none());
    }

    #[test]
    fn untitled_form_omits_title() {
        let form = test_form("ignored").untitled().to_json();
        assert!(form.get("title").is_none());
    }

    #[test]
    fn field_properties_are_flattened() {
        let field = TestField::number("Age")
            .with_property("min", json!(0))
            .to_json();
        assert_eq!(field["min"], 0);
    }

    #[test]
    fn dropdown_options_keep_order() {
        let field = TestField::dropdown("Pick", &["a", "b", "c"]).to_json();
        let values: Vec<_> = field["options"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["value"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(values, vec!["a", "b", "c"]);
    }

    #[test]
    fn accounts_get_distinct_tokens() {
        let a = test_account("a@example.com");
        let b = test_account("b@example.com");
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn envelope_assertions() {
        let ok = json!({"success": true, "data": {}});
        assert::success(&ok);

        let err = json!({"success": false, "error": "Missing required field: x"});
        assert::failure_contains(&err, "Missing required field");
    }
}
