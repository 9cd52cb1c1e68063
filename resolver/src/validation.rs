//! Validation errors with per-field messages.

use async_graphql::{ErrorExtensions, Value};
use snafu::Snafu;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Messages describing invalid fields, indexed by field name.
pub type FieldMessages = BTreeMap<String, Vec<String>>;

/// A source of per-field validation messages.
pub trait Validator: Debug + Send + Sync {
    /// Messages for each invalid field, in the order they were produced.
    fn messages(&self) -> FieldMessages;
}

impl Validator for FieldMessages {
    fn messages(&self) -> FieldMessages {
        self.clone()
    }
}

impl Validator for validator::ValidationErrors {
    fn messages(&self) -> FieldMessages {
        self.field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let messages = errors
                    .iter()
                    .map(|err| match &err.message {
                        Some(message) => message.to_string(),
                        None => err.code.to_string(),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect()
    }
}

/// An error indicating that some input failed validation.
///
/// The messages of the attached [`Validator`] are reported to GraphQL clients in the `fields`
/// extension of the error, so they can be rendered next to the offending inputs.
#[derive(Clone, Debug, Snafu)]
#[snafu(display("{message}"))]
pub struct ValidationError {
    message: String,
    validator: Option<Arc<dyn Validator>>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            validator: None,
        }
    }

    /// Attach the validator whose messages this error reports.
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// The per-field messages of the attached validator, or nothing if there is none.
    pub fn messages(&self) -> FieldMessages {
        self.validator
            .as_ref()
            .map(|validator| validator.messages())
            .unwrap_or_default()
    }
}

impl Default for ValidationError {
    fn default() -> Self {
        Self::new("validation failed")
    }
}

impl ErrorExtensions for ValidationError {
    fn extend(&self) -> async_graphql::Error {
        let messages = self.messages();
        async_graphql::Error::new(&self.message).extend_with(|_, ext| {
            ext.set("code", "VALIDATION");
            match serde_json::to_value(&messages).and_then(Value::from_json) {
                Ok(fields) => ext.set("fields", fields),
                Err(err) => tracing::error!("unable to serialize validation messages: {err}"),
            }
        })
    }
}
