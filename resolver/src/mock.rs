//! Mock instantiations of the [`backend`](crate::backend) interfaces.
//!
//! These are built on simple in-memory state, and are useful for testing the resolver in
//! isolation from an actual database or search index. Each mock records the requests it receives,
//! so tests can check which backend calls a resolution made. Clones of a mock share the same
//! state.
#![cfg(any(test, feature = "mocks"))]

use crate::{
    args::ConnectionArgs,
    backend::{DataLayer, FieldRef, OrderBy, ReorderRequest, SearchIndex, SearchQuery},
    parent::{
        Accessor, EntityType, FieldKind, FieldValue, Id, Node, NodeKey, Record, StorageTarget,
    },
};
use async_std::sync::{Arc, RwLock};
use async_trait::async_trait;
use derivative::Derivative;
use derive_more::From;
use snafu::Snafu;
use std::collections::{HashMap, HashSet};

/// Errors returned by the in-memory data layer.
#[derive(Clone, Debug, Snafu, From)]
#[snafu(display("mock DB error: {}", message))]
pub struct Error {
    message: String,
}

/// Errors returned by the in-memory search index.
#[derive(Clone, Debug, Snafu, From)]
#[snafu(display("mock search error: {}", message))]
pub struct SearchError {
    message: String,
}

/// A simple structured record, for use as the items of a connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    pub entity: EntityType,
    pub id: Id,
    pub label: String,
}

impl Item {
    pub fn new(entity: impl Into<EntityType>, id: u64) -> Self {
        let entity = entity.into();
        Self {
            label: format!("{entity} {id}"),
            entity,
            id: Id(id),
        }
    }

    /// `n` items of the same type, with ids `0..n`.
    pub fn many(entity: impl Into<EntityType>, n: usize) -> Vec<Self> {
        let entity = entity.into();
        (0..n as u64)
            .map(|id| Self::new(entity.clone(), id))
            .collect()
    }
}

impl Node for Item {
    fn key(&self) -> Option<NodeKey> {
        Some(NodeKey::new(self.entity.clone(), self.id))
    }
}

/// A record with a fixed set of relations, some of which may be preloaded.
#[derive(Derivative)]
#[derivative(Clone(bound = "T: Clone"), Debug(bound = "T: std::fmt::Debug"))]
pub struct MockRecord<T> {
    key: NodeKey,
    relations: HashSet<String>,
    loaded: HashMap<String, FieldValue<T>>,
}

impl<T> MockRecord<T> {
    pub fn new(entity: impl Into<EntityType>, id: u64) -> Self {
        Self {
            key: NodeKey::new(entity, Id(id)),
            relations: Default::default(),
            loaded: Default::default(),
        }
    }

    /// Declare `name` as a relation of this record.
    pub fn with_relation(mut self, name: impl Into<String>) -> Self {
        self.relations.insert(name.into());
        self
    }

    /// Declare `name` as a relation of this record, which has already been loaded.
    pub fn with_loaded(mut self, name: impl Into<String>, value: impl Into<FieldValue<T>>) -> Self {
        let name = name.into();
        self.relations.insert(name.clone());
        self.loaded.insert(name, value.into());
        self
    }
}

impl<T: Node> Record<T> for MockRecord<T> {
    fn key(&self) -> NodeKey {
        self.key.clone()
    }

    fn loaded(&self, name: &str) -> Option<&FieldValue<T>> {
        self.loaded.get(name)
    }

    fn has_relation(&self, name: &str) -> bool {
        self.relations.contains(name)
    }
}

/// An object which looks up its fields in a map.
#[derive(Derivative)]
#[derivative(
    Clone(bound = "T: Clone"),
    Debug(bound = "T: std::fmt::Debug"),
    Default(bound = "")
)]
pub struct MockAccessor<T> {
    fields: HashMap<String, FieldValue<T>>,
}

impl<T> MockAccessor<T> {
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue<T>>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

impl<T: Node> Accessor<T> for MockAccessor<T> {
    fn get(&self, name: &str) -> FieldValue<T> {
        self.fields.get(name).cloned().unwrap_or_default()
    }
}

/// A load request received by a [`MockDataLayer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Load {
    pub parent: NodeKey,
    pub name: String,
    pub kind: FieldKind,
    pub target: StorageTarget,
}

#[derive(Derivative)]
#[derivative(Debug(bound = "T: std::fmt::Debug"), Default(bound = ""))]
struct Store<T> {
    fields: HashMap<(NodeKey, String, StorageTarget), FieldValue<T>>,
    loads: Vec<Load>,
    failure: Option<String>,
}

/// An in-memory data layer.
#[derive(Derivative)]
#[derivative(Clone(bound = ""), Debug(bound = "T: std::fmt::Debug"), Default(bound = ""))]
pub struct MockDataLayer<T>(Arc<RwLock<Store<T>>>);

impl<T> MockDataLayer<T> {
    /// Store the value of the field `name` of `parent` in the primary store.
    pub async fn insert(
        &self,
        parent: &MockRecord<T>,
        name: impl Into<String>,
        value: impl Into<FieldValue<T>>,
    ) {
        self.insert_at(parent, name, StorageTarget::Primary, value)
            .await
    }

    /// Store the value of the field `name` of `parent` in the store `target`.
    pub async fn insert_at(
        &self,
        parent: &MockRecord<T>,
        name: impl Into<String>,
        target: StorageTarget,
        value: impl Into<FieldValue<T>>,
    ) {
        self.0
            .write()
            .await
            .fields
            .insert((parent.key.clone(), name.into(), target), value.into());
    }

    /// The load requests received so far, in order.
    pub async fn loads(&self) -> Vec<Load> {
        self.0.read().await.loads.clone()
    }

    /// Fail all subsequent loads with the given message.
    pub async fn fail(&self, message: impl Into<String>) {
        self.0.write().await.failure = Some(message.into());
    }
}

#[async_trait]
impl<T: Node> DataLayer<T> for MockDataLayer<T> {
    type Error = Error;

    async fn load(
        &self,
        parent: &dyn Record<T>,
        field: FieldRef<'_>,
    ) -> Result<FieldValue<T>, Self::Error> {
        let key = parent.key();
        let mut store = self.0.write().await;
        store.loads.push(Load {
            parent: key.clone(),
            name: field.name.to_string(),
            kind: field.kind,
            target: field.target,
        });
        if let Some(message) = &store.failure {
            return Err(message.clone().into());
        }
        Ok(store
            .fields
            .get(&(key, field.name.to_string(), field.target))
            .cloned()
            .unwrap_or_default())
    }
}

/// A query received by a [`MockSearchIndex`].
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub index: String,
    pub doc_type: String,
    pub ids: Vec<Id>,
    pub args: ConnectionArgs,
}

#[derive(Debug, Default)]
struct SearchState {
    queries: Vec<Query>,
    failure: Option<String>,
}

/// An in-memory search index.
///
/// Every candidate document matches, except those whose ids are listed in an `exclude` filter
/// argument. Matches are returned in candidate order, or in the reverse order if the `order`
/// argument is `"desc"`.
#[derive(Clone, Debug, Default)]
pub struct MockSearchIndex(Arc<RwLock<SearchState>>);

impl MockSearchIndex {
    /// The queries received so far, in order.
    pub async fn queries(&self) -> Vec<Query> {
        self.0.read().await.queries.clone()
    }

    /// Fail all subsequent queries with the given message.
    pub async fn fail(&self, message: impl Into<String>) {
        self.0.write().await.failure = Some(message.into());
    }
}

#[async_trait]
impl SearchIndex for MockSearchIndex {
    type Error = SearchError;

    async fn filter(&self, query: SearchQuery<'_>) -> Result<Vec<Id>, Self::Error> {
        let mut state = self.0.write().await;
        state.queries.push(Query {
            index: query.index.to_string(),
            doc_type: query.doc_type.to_string(),
            ids: query.ids.to_vec(),
            args: query.args.clone(),
        });
        if let Some(message) = &state.failure {
            return Err(message.clone().into());
        }
        Ok(apply_args(query.ids.to_vec(), query.args))
    }
}

/// An in-memory order-by helper over a fixed table of rows.
///
/// Candidate rows are returned in order of id, filtered and ordered the same way as by
/// [`MockSearchIndex`].
#[derive(Clone, Debug)]
pub struct MockOrderBy {
    rows: Vec<Item>,
}

impl MockOrderBy {
    pub fn new(rows: Vec<Item>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl OrderBy for MockOrderBy {
    type Row = Item;
    type Error = Error;

    async fn order_by(&self, request: ReorderRequest<'_>) -> Result<Vec<Item>, Self::Error> {
        let mut ids = request.ids.to_vec();
        ids.sort();
        Ok(apply_args(ids, request.args)
            .into_iter()
            .filter_map(|id| {
                self.rows
                    .iter()
                    .find(|row| row.entity == *request.entity && row.id == id)
                    .cloned()
            })
            .collect())
    }
}

fn apply_args(mut ids: Vec<Id>, args: &ConnectionArgs) -> Vec<Id> {
    if let Some(excluded) = args.filter("exclude").and_then(|value| value.as_array()) {
        let excluded = excluded
            .iter()
            .filter_map(|id| id.as_u64())
            .map(Id)
            .collect::<HashSet<_>>();
        ids.retain(|id| !excluded.contains(id));
    }
    if args.filter("order").and_then(|value| value.as_str()) == Some("desc") {
        ids.reverse();
    }
    ids
}
