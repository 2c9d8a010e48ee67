// tools for validation of operation input

use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt::{self, Display},
};
use thiserror::Error;

/// One invalid field with a stable machine readable code, e.g. "required",
/// "out_of_range", "set_invalid". The message is human friendly; params carry
/// the offending values (e.g. { "min": "10" }).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FieldError {
    field: String,
    code: String,
    message: String,
    params: HashMap<String, String>,
}

impl Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}: {}", self.field, self.code)?;
        } else {
            write!(f, "{}: {}", self.field, self.message)?;
        }
        for (key, value) in self.params.iter() {
            write!(f, "\n{key}: {value}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldError {}

impl FieldError {
    pub fn new(field: impl Into<String>, code: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            code: code.into(),
            ..Default::default()
        }
    }

    pub fn required(field: impl Into<String>) -> Self {
        FieldError::new(field, "required")
    }

    /// range violation with the offending bounds as params
    pub fn out_of_range(field: impl Into<String>, min: impl Display, max: impl Display) -> Self {
        FieldError::new(field, "out_of_range")
            .with_param("min", min.to_string())
            .with_param("max", max.to_string())
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn get_field(&self) -> &str {
        &self.field
    }
    pub fn get_code(&self) -> &str {
        &self.code
    }
    pub fn get_message(&self) -> &str {
        &self.message
    }
    pub fn get_params(&self) -> &HashMap<String, String> {
        &self.params
    }
}

/// Collected validation errors holding stringified field names.
/// This works for any operation input (fixture config, report payloads, etc.)
#[derive(Debug, Clone, Error, Default, Serialize, Deserialize, PartialEq, Eq)]
#[error("validation failed with {} error(s)", errors.len())]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl From<FieldError> for ValidationErrors {
    fn from(value: FieldError) -> Self {
        Self {
            errors: vec![value],
        }
    }
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }
    pub fn add(&mut self, err: FieldError) {
        self.errors.push(err);
    }
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
    /// Ok(()) if nothing was collected, else Err(self)
    pub fn into_result(self) -> ValidationResult<()> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

pub type ValidationResult<T> = Result<T, ValidationErrors>;

/// Checks a free form text input against a length window, collecting a
/// FieldError when violated.
pub fn check_text_length(
    errs: &mut ValidationErrors,
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) {
    let len = value.chars().count();
    if len < min || len > max {
        errs.add(
            FieldError::out_of_range(field, min, max)
                .with_message(format!("length must be between {min} and {max} characters"))
                .with_param("length", len.to_string()),
        );
    }
}
