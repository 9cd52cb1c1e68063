//! The objects a connection hangs off of, and the items it contains.
//!
//! A connection is always resolved relative to a _parent_: the object which owns the plural field
//! being paged through. Parents come in three flavors, represented by the variants of [`Parent`]:
//! * A [`Record`] is a structured entity backed by the data layer. Its relations may already be
//!   loaded, or may have to be fetched through a [`DataLayer`](crate::backend::DataLayer).
//! * An [`Accessor`] is any object which can look up its fields by name.
//! * A [`Mapping`] is a plain key-value map.
//!
//! The items in a connection are [`Node`]s. Nodes which are structured records themselves have a
//! [`NodeKey`], which lets the resolver hand them to a [`Reorderer`](crate::backend::Reorderer)
//! for filtering and sorting.

use crate::page::Collection;
use derivative::Derivative;
use derive_more::{Display, From, Into};
use inflector::Inflector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{EnumString, IntoStaticStr};

/// The unique identifier of a record within its entity type.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    From,
    Into,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct Id(pub u64);

/// The name of a type of record, like `Comment`.
#[derive(Clone, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(String);

impl EntityType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// The plural form of this type's name, in lower case.
    ///
    /// This is the name under which records of this type are stored in collections, such as a
    /// search index document type: `Comment` becomes `comments`, `Category` becomes
    /// `categories`.
    pub fn plural(&self) -> String {
        self.0.to_lowercase().to_plural()
    }
}

impl From<&str> for EntityType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Identifies a record: its type and its id within that type.
#[derive(Clone, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display(fmt = "{}:{}", entity, id)]
pub struct NodeKey {
    pub entity: EntityType,
    pub id: Id,
}

impl NodeKey {
    pub fn new(entity: impl Into<EntityType>, id: impl Into<Id>) -> Self {
        Self {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// An item in a connection.
pub trait Node: Clone + Send + Sync + 'static {
    /// The key of this item, if it is a structured record.
    ///
    /// Items without a key, such as scalars, are never reordered.
    fn key(&self) -> Option<NodeKey>;
}

macro_rules! scalar_node {
    ($($t:ty),+) => {
        $(
            impl Node for $t {
                fn key(&self) -> Option<NodeKey> {
                    None
                }
            }
        )+
    }
}

scalar_node!(bool, i32, i64, u32, u64, f64, String, serde_json::Value);

/// The value of a field of a parent object.
#[derive(Derivative)]
#[derivative(
    Clone(bound = "T: Clone"),
    Debug(bound = "T: std::fmt::Debug"),
    Default(bound = ""),
    PartialEq(bound = "T: PartialEq")
)]
pub enum FieldValue<T> {
    /// The field is absent or null.
    #[derivative(Default)]
    Null,
    /// A singular value.
    One(T),
    /// A collection of values.
    Many(Collection<T>),
}

impl<T> FieldValue<T> {
    /// View this value as a collection, or [`None`] if it is null.
    pub fn into_collection(self) -> Option<Collection<T>> {
        match self {
            Self::Null => None,
            Self::One(item) => Some(Collection::new(vec![item])),
            Self::Many(items) => Some(items),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl<T> From<Vec<T>> for FieldValue<T> {
    fn from(items: Vec<T>) -> Self {
        Self::Many(items.into())
    }
}

impl<T> From<Collection<T>> for FieldValue<T> {
    fn from(items: Collection<T>) -> Self {
        Self::Many(items)
    }
}

impl<T> From<Option<T>> for FieldValue<T> {
    fn from(item: Option<T>) -> Self {
        match item {
            Some(item) => Self::One(item),
            None => Self::Null,
        }
    }
}

/// The data store a field is read from.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StorageTarget {
    /// The primary data store.
    #[default]
    Primary,
    /// The store holding audit history.
    History,
}

/// The kind of field being loaded from a [`Record`].
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// A relation to other records, which must be queried.
    Relation,
    /// A plain attribute of the record.
    Attribute,
}

/// A structured record backed by the data layer.
pub trait Record<T>: Send + Sync {
    /// The key of this record.
    fn key(&self) -> NodeKey;

    /// The value of the relation `name`, if it has already been loaded.
    fn loaded(&self, name: &str) -> Option<&FieldValue<T>>;

    /// Whether `name` is a relation which can be queried, as opposed to a plain attribute.
    fn has_relation(&self, name: &str) -> bool;
}

/// An object which can look up its fields by name.
pub trait Accessor<T>: Send + Sync {
    fn get(&self, name: &str) -> FieldValue<T>;
}

/// A plain key-value map.
pub type Mapping<T> = HashMap<String, FieldValue<T>>;

/// The object owning a connection.
pub enum Parent<'a, T> {
    Record(&'a dyn Record<T>),
    Accessor(&'a dyn Accessor<T>),
    Mapping(&'a Mapping<T>),
}

impl<'a, T> Clone for Parent<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for Parent<'a, T> {}

impl<'a, T> From<&'a Mapping<T>> for Parent<'a, T> {
    fn from(map: &'a Mapping<T>) -> Self {
        Self::Mapping(map)
    }
}
