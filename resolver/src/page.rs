//! Collections of items and pages sliced out of them.

use crate::cursor::Cursor;
use derivative::Derivative;

/// An ordered collection of items loaded for a connection.
///
/// A collection may come from a source which is itself paginated, in which case it holds only
/// some of the items in the underlying set and reports the size of the whole set separately.
#[derive(Derivative)]
#[derivative(
    Clone(bound = "T: Clone"),
    Debug(bound = "T: std::fmt::Debug"),
    Default(bound = ""),
    PartialEq(bound = "T: PartialEq")
)]
pub struct Collection<T> {
    items: Vec<T>,
    total: Option<usize>,
}

impl<T> Collection<T> {
    /// A collection holding all of `items`.
    pub fn new(items: Vec<T>) -> Self {
        Self { items, total: None }
    }

    /// A collection holding some of the items of a set of `total` items.
    pub fn with_total(items: Vec<T>, total: usize) -> Self {
        Self {
            items,
            total: Some(total),
        }
    }

    /// The size of the underlying set.
    pub fn total(&self) -> usize {
        self.total.unwrap_or(self.items.len())
    }

    /// The number of items held in this collection.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> From<Vec<T>> for Collection<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T> IntoIterator for Collection<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// A page of items from a connection, with the metadata needed to page through the rest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    /// The items on this page, in order.
    pub items: Vec<T>,
    /// The number of items in the whole connection.
    pub total: usize,
    /// The requested page size. Always at least 1.
    pub per_page: usize,
    /// The 1-based index of this page.
    pub current_page: usize,
    /// The position of the first item on this page within the whole connection.
    pub offset: usize,
}

impl<T> Page<T> {
    /// A single page holding an entire collection.
    pub fn whole(collection: Collection<T>) -> Self {
        let items = collection.into_items();
        Self {
            total: items.len(),
            per_page: items.len().max(1),
            current_page: 1,
            offset: 0,
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The index of the last page, given the page size.
    pub fn last_page(&self) -> usize {
        self.total.div_ceil(self.per_page).max(1)
    }

    /// Are there pages after this one?
    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page()
    }

    /// Are there items after the last item on this page?
    pub fn has_next_page(&self) -> bool {
        self.offset + self.items.len() < self.total
    }

    /// Are there items before the first item on this page?
    pub fn has_previous_page(&self) -> bool {
        self.offset > 0
    }

    /// The items on this page, each with a cursor that resumes paging right after it.
    pub fn edges(&self) -> impl Iterator<Item = (Cursor, &T)> + '_ {
        let offset = self.offset;
        self.items
            .iter()
            .enumerate()
            .map(move |(i, item)| (Cursor(offset + i + 1), item))
    }

    /// Consume the page, pairing each item with its cursor.
    pub fn into_edges(self) -> impl Iterator<Item = (Cursor, T)> {
        let offset = self.offset;
        self.items
            .into_iter()
            .enumerate()
            .map(move |(i, item)| (Cursor(offset + i + 1), item))
    }

    /// Transform the items on this page, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            per_page: self.per_page,
            current_page: self.current_page,
            offset: self.offset,
        }
    }
}
