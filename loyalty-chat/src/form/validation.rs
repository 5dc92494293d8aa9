//! Field validation.
//!
//! Every field gets the same rule list evaluated in order: `required`, the
//! email check for email fields, then the field's own rules. Like browser
//! form validators, all checks except `required` pass on an empty value.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::models::{FieldKind, FormField, ValidationRule};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern is valid")
});

/// A failed check on one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldError {
    Required,
    Email,
    Min(f64),
    Max(f64),
    MinLength(usize),
    MaxLength(usize),
    Pattern,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required => write!(f, "This field is required"),
            Self::Email => write!(f, "Please enter a valid email address"),
            Self::Min(min) => write!(f, "Minimum value is {min}"),
            Self::Max(max) => write!(f, "Maximum value is {max}"),
            Self::MinLength(len) => write!(f, "Minimum length is {len} characters"),
            Self::MaxLength(len) => write!(f, "Maximum length is {len} characters"),
            Self::Pattern => write!(f, "Invalid format"),
        }
    }
}

/// Whether a value counts as "not filled in".
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Run every check for `field` against `value`.
pub fn validate_field(field: &FormField, value: &Value) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let empty = is_empty_value(value);

    if field.required && empty {
        errors.push(FieldError::Required);
    }
    if empty {
        return errors;
    }

    if field.kind == FieldKind::Email && !value.as_str().is_some_and(|s| EMAIL_RE.is_match(s)) {
        errors.push(FieldError::Email);
    }

    for rule in &field.validation {
        if let Some(error) = check_rule(rule, value) {
            errors.push(error);
        }
    }

    errors
}

fn check_rule(rule: &ValidationRule, value: &Value) -> Option<FieldError> {
    match rule {
        ValidationRule::Min(min) => {
            as_number(value).filter(|n| n < min).map(|_| FieldError::Min(*min))
        }
        ValidationRule::Max(max) => {
            as_number(value).filter(|n| n > max).map(|_| FieldError::Max(*max))
        }
        ValidationRule::MinLength(len) => length(value)
            .filter(|l| l < len)
            .map(|_| FieldError::MinLength(*len)),
        ValidationRule::MaxLength(len) => length(value)
            .filter(|l| l > len)
            .map(|_| FieldError::MaxLength(*len)),
        ValidationRule::Pattern(pattern) => {
            let re = match Regex::new(&format!("^(?:{pattern})$")) {
                Ok(re) => re,
                Err(e) => {
                    warn!(%pattern, error = %e, "ignoring invalid validation pattern");
                    return None;
                }
            };
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (!re.is_match(&text)).then_some(FieldError::Pattern)
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}
