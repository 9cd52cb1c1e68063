//! Interfaces to the backend services consumed by the connection resolver.
//!
//! The resolver depends on two services. A [`DataLayer`] loads relations and attributes of
//! [`Record`]s. A [`Reorderer`] takes the ids of the records loaded for a connection and decides
//! which of them the client gets to see, and in what order, based on the connection's filter
//! and ordering arguments. Two interchangeable reorder strategies are provided: one backed by a
//! [`SearchIndex`] and one backed by a generic [`OrderBy`] helper. Which one to use is decided when
//! the resolver is constructed.

use crate::{
    args::ConnectionArgs,
    parent::{EntityType, FieldKind, FieldValue, Id, Node, Record, StorageTarget},
};
use async_trait::async_trait;
use std::error::Error;

/// A field to load from a [`Record`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldRef<'a> {
    /// The name of the relation or attribute.
    pub name: &'a str,
    /// Whether the field is a relation or an attribute.
    pub kind: FieldKind,
    /// The store to load from.
    pub target: StorageTarget,
}

/// The object-relational data layer.
#[async_trait]
pub trait DataLayer<T: Node>: Send + Sync {
    /// Errors reported while loading data.
    type Error: Error + Send + Sync + 'static;

    /// Load a relation or attribute of `parent`.
    ///
    /// Relations are loaded in full, and in the data layer's natural order for that relation.
    /// Absent attributes and relations are reported as [`FieldValue::Null`].
    async fn load(
        &self,
        parent: &dyn Record<T>,
        field: FieldRef<'_>,
    ) -> Result<FieldValue<T>, Self::Error>;
}

/// A request to filter and reorder a set of records.
#[derive(Clone, Copy, Debug)]
pub struct ReorderRequest<'a> {
    /// The type of the records.
    pub entity: &'a EntityType,
    /// The store holding the records.
    pub target: StorageTarget,
    /// The ids of the candidate records, in their current order.
    pub ids: &'a [Id],
    /// The arguments of the connection being resolved.
    pub args: &'a ConnectionArgs,
}

/// A strategy for filtering and reordering the items in a connection.
#[async_trait]
pub trait Reorderer: Send + Sync {
    /// Errors reported while reordering.
    type Error: Error + Send + Sync + 'static;

    /// Filter and reorder the candidate records in `request`.
    ///
    /// The result lists the ids of the records to keep, in the order they should appear.
    async fn reorder(&self, request: ReorderRequest<'_>) -> Result<Vec<Id>, Self::Error>;
}

/// A query against a search index.
#[derive(Clone, Copy, Debug)]
pub struct SearchQuery<'a> {
    /// The index to search.
    pub index: &'a str,
    /// The document type within the index.
    pub doc_type: &'a str,
    /// Only documents with these ids are candidates.
    pub ids: &'a [Id],
    /// Arguments to filter and sort by.
    pub args: &'a ConnectionArgs,
}

/// A full-text search index.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    type Error: Error + Send + Sync + 'static;

    /// Find the ids of the documents matching `query`, in order of relevance.
    async fn filter(&self, query: SearchQuery<'_>) -> Result<Vec<Id>, Self::Error>;
}

/// A generic helper which filters and sorts records by connection arguments.
#[async_trait]
pub trait OrderBy: Send + Sync {
    /// The records returned by the helper.
    type Row: Node;
    type Error: Error + Send + Sync + 'static;

    /// Load the records in `request` which match its arguments, in order.
    async fn order_by(&self, request: ReorderRequest<'_>) -> Result<Vec<Self::Row>, Self::Error>;
}

/// Reorder records using a [`SearchIndex`].
///
/// Records are looked up in a fixed index, under a document type named after the plural of their
/// entity type.
#[derive(Clone, Debug)]
pub struct SearchIndexReorderer<S> {
    search: S,
    index: String,
}

impl<S: SearchIndex> SearchIndexReorderer<S> {
    pub fn new(search: S, index: impl Into<String>) -> Self {
        Self {
            search,
            index: index.into(),
        }
    }

    /// The underlying search index.
    pub fn search(&self) -> &S {
        &self.search
    }
}

#[async_trait]
impl<S: SearchIndex> Reorderer for SearchIndexReorderer<S> {
    type Error = S::Error;

    async fn reorder(&self, request: ReorderRequest<'_>) -> Result<Vec<Id>, Self::Error> {
        let doc_type = request.entity.plural();
        tracing::debug!(index = %self.index, %doc_type, "searching");
        self.search
            .filter(SearchQuery {
                index: &self.index,
                doc_type: &doc_type,
                ids: request.ids,
                args: request.args,
            })
            .await
    }
}

/// Reorder records using a generic [`OrderBy`] helper.
#[derive(Clone, Debug)]
pub struct OrderByReorderer<O>(O);

impl<O: OrderBy> OrderByReorderer<O> {
    pub fn new(helper: O) -> Self {
        Self(helper)
    }
}

#[async_trait]
impl<O: OrderBy> Reorderer for OrderByReorderer<O> {
    type Error = O::Error;

    async fn reorder(&self, request: ReorderRequest<'_>) -> Result<Vec<Id>, Self::Error> {
        let rows = self.0.order_by(request).await?;
        Ok(rows
            .iter()
            .filter_map(Node::key)
            .map(|key| key.id)
            .collect())
    }
}
