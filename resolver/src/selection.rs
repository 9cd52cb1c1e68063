//! Field selections of connection queries.
//!
//! A connection field is queried as `edges { node { ... } }`. The fields selected on `node` tell
//! the data layer which columns it actually needs to load.

use async_graphql::SelectionField;
use convert_case::{Case, Casing};

/// How deep into a query [`SelectionSet::from_field`] looks.
///
/// This is enough to reach the fields of `connection { edges { node { ... } } }`.
pub const SELECTION_DEPTH: usize = 4;

/// A tree of fields selected by a query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionSet {
    fields: Vec<SelectedField>,
}

/// A field in a [`SelectionSet`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedField {
    pub name: String,
    /// The fields selected within this one. Empty for leaf fields.
    pub selection: SelectionSet,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a leaf field to the selection.
    pub fn leaf(self, name: impl Into<String>) -> Self {
        self.nested(name, Self::default())
    }

    /// Add a field with its own selection.
    pub fn nested(mut self, name: impl Into<String>, selection: SelectionSet) -> Self {
        self.fields.push(SelectedField {
            name: name.into(),
            selection,
        });
        self
    }

    /// The selection made within a field being resolved, up to [`SELECTION_DEPTH`] levels deep.
    pub fn from_field(field: SelectionField<'_>) -> Self {
        Self::from_field_with_depth(field, SELECTION_DEPTH)
    }

    fn from_field_with_depth(field: SelectionField<'_>, depth: usize) -> Self {
        if depth == 0 {
            return Self::default();
        }
        Self {
            fields: field
                .selection_set()
                .map(|child| SelectedField {
                    name: child.name().to_string(),
                    selection: Self::from_field_with_depth(child, depth - 1),
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[SelectedField] {
        &self.fields
    }

    /// The selection within the field `name`, if it was selected.
    ///
    /// If a field is selected more than once, the selections are merged.
    pub fn get(&self, name: &str) -> Option<SelectionSet> {
        let mut matches = self.fields.iter().filter(|field| field.name == name).peekable();
        matches.peek()?;
        Some(Self {
            fields: matches
                .flat_map(|field| field.selection.fields.iter().cloned())
                .collect(),
        })
    }
}

impl SelectedField {
    pub fn is_leaf(&self) -> bool {
        self.selection.is_empty()
    }
}

/// The leaf fields selected on the nodes of a connection.
///
/// Fields which have selections of their own (relations) and introspection fields like
/// `__typename` are skipped, since they do not correspond to columns. If `camel_case` is set,
/// field names are converted from camelCase to snake_case.
pub fn select_fields(selection: &SelectionSet, camel_case: bool) -> Vec<String> {
    let Some(node) = selection
        .get("edges")
        .and_then(|edges| edges.get("node"))
    else {
        return vec![];
    };

    let mut columns: Vec<String> = vec![];
    for field in node.fields() {
        if !field.is_leaf() || field.name.starts_with("__") {
            continue;
        }
        let column = if camel_case {
            field.name.to_case(Case::Snake)
        } else {
            field.name.clone()
        };
        if !columns.contains(&column) {
            columns.push(column);
        }
    }
    columns
}
