//! Form state: field values, touched/dirty tracking and submission.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use super::validation::{validate_field, FieldError};
use crate::models::{ChatForm, FormCancellation, FormField, FormSubmission};

/// Live state of a form the user is filling in.
#[derive(Debug, Clone)]
pub struct FormState {
    form: ChatForm,
    values: Map<String, Value>,
    touched: HashSet<String>,
    dirty: HashSet<String>,
}

impl FormState {
    /// Build the state with each field at its kind's default value.
    pub fn new(form: ChatForm) -> Self {
        let values = form
            .fields
            .iter()
            .map(|f| (f.key.clone(), f.kind.default_value()))
            .collect();
        Self {
            form,
            values,
            touched: HashSet::new(),
            dirty: HashSet::new(),
        }
    }

    pub const fn form(&self) -> &ChatForm {
        &self.form
    }

    pub fn form_id(&self) -> &str {
        &self.form.id
    }

    fn field(&self, key: &str) -> Option<&FormField> {
        self.form.fields.iter().find(|f| f.key == key)
    }

    /// Current value of a field.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// All current values keyed by field key.
    pub const fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Set a field's value. Returns false for an unknown key.
    pub fn set_value(&mut self, key: &str, value: impl Into<Value>) -> bool {
        if self.field(key).is_none() {
            return false;
        }
        self.values.insert(key.to_string(), value.into());
        self.dirty.insert(key.to_string());
        true
    }

    /// Mark a field as visited.
    pub fn touch(&mut self, key: &str) {
        if self.field(key).is_some() {
            self.touched.insert(key.to_string());
        }
    }

    pub fn is_touched(&self, key: &str) -> bool {
        self.touched.contains(key)
    }

    /// Every failed check for a field, in rule order.
    pub fn errors(&self, key: &str) -> Vec<FieldError> {
        let Some(field) = self.field(key) else {
            return Vec::new();
        };
        let value = self.values.get(key).unwrap_or(&Value::Null);
        validate_field(field, value)
    }

    pub fn is_valid(&self) -> bool {
        self.form
            .fields
            .iter()
            .all(|f| self.errors(&f.key).is_empty())
    }

    /// Whether a validation message should be shown for the field.
    pub fn is_field_invalid(&self, key: &str) -> bool {
        (self.touched.contains(key) || self.dirty.contains(key)) && !self.errors(key).is_empty()
    }

    /// Message for the first failed check, if any.
    pub fn field_error(&self, key: &str) -> Option<String> {
        self.errors(key).first().map(ToString::to_string)
    }

    /// Submit the form.
    ///
    /// An invalid form marks every field touched and still yields a result,
    /// with `is_valid: false` and whatever data was entered.
    pub fn submit(&mut self) -> FormSubmission {
        let is_valid = self.is_valid();
        if !is_valid {
            self.touched
                .extend(self.form.fields.iter().map(|f| f.key.clone()));
        }
        debug!(form_id = %self.form.id, is_valid, "form submitted");

        FormSubmission {
            form_id: self.form.id.clone(),
            data: self.values.clone(),
            is_valid,
        }
    }

    pub fn cancel(&self) -> FormCancellation {
        FormCancellation {
            form_id: self.form.id.clone(),
        }
    }
}
