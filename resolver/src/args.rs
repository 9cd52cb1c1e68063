//! Arguments to a connection field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Relay paging arguments, plus any filter or ordering arguments the field accepts.
///
/// Only `first` and `after` are interpreted by the resolver. All other keys are collected in
/// [`filters`](Self::filters) and handed as-is to the [`Reorderer`](crate::backend::Reorderer).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionArgs {
    /// Limit the page to the first N items after [`after`](Self::after).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<usize>,
    /// Start the page after the item indicated by this cursor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    /// Any other arguments.
    #[serde(flatten)]
    pub filters: Map<String, Value>,
}

impl ConnectionArgs {
    /// Parse arguments from a JSON object.
    pub fn from_json(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn with_first(mut self, first: usize) -> Self {
        self.first = Some(first);
        self
    }

    pub fn with_after(mut self, after: impl Into<String>) -> Self {
        self.after = Some(after.into());
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    /// Look up a filter argument by name.
    pub fn filter(&self, key: &str) -> Option<&Value> {
        self.filters.get(key)
    }
}
