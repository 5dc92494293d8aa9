//! Dynamic form validation and submission.

mod pipeline;
mod validation;

pub use pipeline::FormState;
pub use validation::{is_empty_value, validate_field, FieldError};
