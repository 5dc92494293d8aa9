//! Form definitions sent by the assistant and the results sent back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Input kind of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Email,
    Number,
    Select,
    Textarea,
    Checkbox,
    Radio,
}

impl FieldKind {
    /// Whether the field offers a fixed list of options.
    pub const fn is_enumerable(self) -> bool {
        matches!(self, Self::Select | Self::Radio)
    }

    /// Value a freshly built field starts with.
    pub fn default_value(self) -> Value {
        match self {
            Self::Checkbox => Value::Bool(false),
            Self::Number => Value::Null,
            _ => Value::String(String::new()),
        }
    }
}

/// One choice of a select/radio field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: Value,
    pub label: String,
}

/// Extra validation attached to a field, on top of `required` and the kind's
/// own check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationRule {
    /// Numeric lower bound.
    Min(f64),
    /// Numeric upper bound.
    Max(f64),
    /// Minimum text length in characters.
    MinLength(usize),
    /// Maximum text length in characters.
    MaxLength(usize),
    /// Regular expression the whole value must match.
    Pattern(String),
}

/// A field of a dynamic form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    /// Key under which the value is submitted. Unique within a form.
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<ValidationRule>,
}

impl FormField {
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
            required: false,
            placeholder: None,
            options: Vec::new(),
            validation: Vec::new(),
        }
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.validation.push(rule);
        self
    }

    #[must_use]
    pub fn with_option(mut self, value: impl Into<Value>, label: impl Into<String>) -> Self {
        self.options.push(FieldOption {
            value: value.into(),
            label: label.into(),
        });
        self
    }
}

/// A form the assistant asks the user to fill in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatForm {
    #[serde(rename = "formId")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FormField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_label: Option<String>,
}

/// Result of pressing submit on a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmission {
    pub form_id: String,
    /// Current field values keyed by field key (partial when invalid).
    pub data: Map<String, Value>,
    pub is_valid: bool,
}

/// Result of pressing cancel on a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormCancellation {
    pub form_id: String,
}
