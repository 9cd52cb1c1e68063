//! Resolution of paginated connections.

use crate::{
    args::ConnectionArgs,
    backend::{DataLayer, FieldRef, ReorderRequest, Reorderer},
    cursor::decode_cursor,
    error::{Error, Result},
    options::ResolverOptions,
    page::{Collection, Page},
    parent::{FieldKind, Id, Node, Parent, Record},
    selection::{select_fields, SelectionSet},
};
use std::collections::HashMap;
use tracing::instrument;

/// Resolves connections relative to a parent object.
///
/// The resolver holds only its collaborators and configuration. The arguments of each
/// resolution are passed explicitly, so a single resolver can serve any number of concurrent
/// resolutions.
#[derive(Clone, Debug)]
pub struct ConnectionResolver<D, R> {
    data: D,
    reorderer: R,
    options: ResolverOptions,
}

impl<D, R: Reorderer> ConnectionResolver<D, R> {
    pub fn new(data: D, reorderer: R, options: ResolverOptions) -> Self {
        Self {
            data,
            reorderer,
            options,
        }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolve one page of the connection `field` of `parent`.
    ///
    /// If `args` has a `first` argument, the page holds at most `first` items, starting after
    /// the item indicated by the `after` cursor. Otherwise, the page holds the whole connection.
    ///
    /// If `parent` has no data for `field` at all, the result is [`None`].
    #[instrument(skip(self, parent, args))]
    pub async fn resolve<T: Node>(
        &self,
        parent: Parent<'_, T>,
        field: &str,
        args: &ConnectionArgs,
    ) -> Result<Option<Page<T>>>
    where
        D: DataLayer<T>,
    {
        let Some(items) = self.items(parent, field, args).await? else {
            tracing::debug!("no data");
            return Ok(None);
        };

        let Some(first) = args.first else {
            tracing::debug!(len = items.len(), "resolving whole connection");
            return Ok(Some(Page::whole(items)));
        };
        if first == 0 {
            return Err(Error::InvalidFirst);
        }

        let total = items.total();
        let after = decode_cursor(args)?;
        // Note that this is not the exact index of the page containing `after` unless `after` is a
        // multiple of `first`. Clients depend on the existing behavior. The cursor is chosen by the
        // client, so the sum saturates rather than overflowing.
        let current_page = if after > 0 {
            after.saturating_add(first) / first
        } else {
            1
        };
        tracing::debug!(total, first, after, current_page, "slicing page");

        Ok(Some(Page {
            items: items.into_iter().skip(after).take(first).collect(),
            total,
            per_page: first,
            current_page,
            offset: after,
        }))
    }

    /// Load the items in the connection `field` of `parent`, filtered and in order.
    pub async fn items<T: Node>(
        &self,
        parent: Parent<'_, T>,
        field: &str,
        args: &ConnectionArgs,
    ) -> Result<Option<Collection<T>>>
    where
        D: DataLayer<T>,
    {
        match parent {
            Parent::Record(record) => self.record_items(record, field, args).await,
            Parent::Accessor(obj) => Ok(obj.get(field).into_collection()),
            Parent::Mapping(map) => Ok(Some(
                map.get(field)
                    .cloned()
                    .and_then(|value| value.into_collection())
                    .unwrap_or_default(),
            )),
        }
    }

    async fn record_items<T: Node>(
        &self,
        record: &dyn Record<T>,
        field: &str,
        args: &ConnectionArgs,
    ) -> Result<Option<Collection<T>>>
    where
        D: DataLayer<T>,
    {
        if let Some(loaded) = record.loaded(field) {
            tracing::debug!(parent = %record.key(), "relation already loaded");
            return Ok(loaded.clone().into_collection());
        }

        let target = self.options.storage_target(field);
        let kind = if record.has_relation(field) {
            FieldKind::Relation
        } else {
            FieldKind::Attribute
        };
        tracing::debug!(parent = %record.key(), %kind, %target, "loading field");
        let value = self
            .data
            .load(
                record,
                FieldRef {
                    name: field,
                    kind,
                    target,
                },
            )
            .await
            .map_err(Error::data_layer)?;
        let Some(items) = value.into_collection() else {
            return Ok(None);
        };

        // Only structured records can be reordered. The first item decides for the whole
        // collection: if it has no key nothing is reordered, otherwise keyless items are dropped
        // along with anything else the reorderer does not return.
        let Some(entity) = items.first().and_then(Node::key).map(|key| key.entity) else {
            return Ok(Some(items));
        };
        let ids = items
            .iter()
            .filter_map(|item| item.key().map(|key| key.id))
            .collect::<Vec<_>>();
        let order = self
            .reorderer
            .reorder(ReorderRequest {
                entity: &entity,
                target,
                ids: &ids,
                args,
            })
            .await
            .map_err(Error::reorder)?;
        tracing::debug!(%entity, candidates = ids.len(), kept = order.len(), "reordered");

        Ok(Some(retain_in_order(items, &order)))
    }

    /// The columns to load for a connection, based on the GraphQL selection of the field.
    pub fn select_fields(&self, selection: &SelectionSet) -> Vec<String> {
        select_fields(selection, self.options.camel_case)
    }
}

/// Keep only the items whose ids appear in `order`, in that order.
///
/// Items without a key never appear in `order`, so they are dropped.
fn retain_in_order<T: Node>(items: Collection<T>, order: &[Id]) -> Collection<T> {
    let mut by_id = HashMap::new();
    for item in items {
        if let Some(key) = item.key() {
            by_id.entry(key.id).or_insert(item);
        }
    }
    let kept = order
        .iter()
        .filter_map(|id| by_id.remove(id))
        .collect::<Collection<_>>();
    if !by_id.is_empty() {
        tracing::debug!(dropped = by_id.len(), "items filtered out of connection");
    }
    kept
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        backend::{OrderByReorderer, SearchIndexReorderer},
        cursor::{Cursor, CursorError},
        init_logging,
        mock::{Item, MockAccessor, MockDataLayer, MockOrderBy, MockRecord, MockSearchIndex},
        parent::{FieldValue, Mapping, NodeKey, StorageTarget},
    };
    use futures::future::try_join_all;
    use serde_json::json;

    type TestResolver =
        ConnectionResolver<MockDataLayer<Item>, SearchIndexReorderer<MockSearchIndex>>;

    fn post() -> MockRecord<Item> {
        MockRecord::new("Post", 1)
            .with_relation("comments")
            .with_relation("histories")
    }

    async fn resolver_with_comments(n: usize) -> (TestResolver, MockRecord<Item>) {
        init_logging();
        let parent = post();
        let data = MockDataLayer::default();
        data.insert(&parent, "comments", Item::many("Comment", n)).await;
        let resolver = ConnectionResolver::new(
            data,
            SearchIndexReorderer::new(MockSearchIndex::default(), "test"),
            ResolverOptions::default(),
        );
        (resolver, parent)
    }

    fn ids(page: &Page<Item>) -> Vec<u64> {
        page.items.iter().map(|item| item.id.0).collect()
    }

    #[async_std::test]
    async fn test_first_page() {
        let (resolver, parent) = resolver_with_comments(25).await;
        for n in [1, 10, 25] {
            let page = resolver
                .resolve(
                    Parent::Record(&parent),
                    "comments",
                    &ConnectionArgs::default().with_first(n),
                )
                .await
                .unwrap()
                .unwrap();
            assert_eq!(ids(&page), (0..n as u64).collect::<Vec<_>>());
            assert_eq!(page.total, 25);
            assert_eq!(page.per_page, n);
            assert_eq!(page.current_page, 1);
            assert_eq!(page.offset, 0);
        }
    }

    #[async_std::test]
    async fn test_page_after_cursor() {
        let (resolver, parent) = resolver_with_comments(25).await;
        let args = ConnectionArgs::default()
            .with_first(10)
            .with_after(Cursor(10).encode());
        let page = resolver
            .resolve(Parent::Record(&parent), "comments", &args)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&page), (10..20).collect::<Vec<_>>());
        assert_eq!(page.total, 25);
        assert_eq!(page.per_page, 10);
        assert_eq!(page.current_page, 2);
        assert!(page.has_next_page());
        assert!(page.has_previous_page());
    }

    #[async_std::test]
    async fn test_page_clamped_at_end() {
        let (resolver, parent) = resolver_with_comments(25).await;
        for (after, first, expected) in [(20, 10, 20..25), (24, 3, 24..25), (25, 10, 25..25)] {
            let args = ConnectionArgs::default()
                .with_first(first)
                .with_after(Cursor(after).encode());
            let page = resolver
                .resolve(Parent::Record(&parent), "comments", &args)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(ids(&page), expected.collect::<Vec<_>>());
            assert_eq!(page.total, 25);
            assert!(!page.has_next_page());
        }
    }

    #[async_std::test]
    async fn test_current_page_formula() {
        let (resolver, parent) = resolver_with_comments(25).await;
        let cases = [
            (10, 0, 1),
            (10, 10, 2),
            (10, 20, 3),
            (10, 5, 1),
            (10, 15, 2),
            (3, 4, 2),
        ];
        for (first, after, current_page) in cases {
            let args = ConnectionArgs::default()
                .with_first(first)
                .with_after(Cursor(after).encode());
            let page = resolver
                .resolve(Parent::Record(&parent), "comments", &args)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(page.current_page, current_page, "first={first} after={after}");
        }
    }

    #[async_std::test]
    async fn test_whole_connection() {
        let (resolver, parent) = resolver_with_comments(7).await;
        let page = resolver
            .resolve(Parent::Record(&parent), "comments", &ConnectionArgs::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&page), (0..7).collect::<Vec<_>>());
        assert_eq!(page.total, 7);
        assert_eq!(page.per_page, 7);
        assert_eq!(page.current_page, 1);

        // `after` alone does not paginate.
        let args = ConnectionArgs::default().with_after(Cursor(3).encode());
        let page = resolver
            .resolve(Parent::Record(&parent), "comments", &args)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.len(), 7);
    }

    #[async_std::test]
    async fn test_empty_connection() {
        let (resolver, parent) = resolver_with_comments(0).await;
        let page = resolver
            .resolve(Parent::Record(&parent), "comments", &ConnectionArgs::default())
            .await
            .unwrap()
            .unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.per_page, 1);
        assert_eq!(page.current_page, 1);
    }

    #[async_std::test]
    async fn test_null_attribute() {
        let (resolver, parent) = resolver_with_comments(3).await;
        resolver
            .data
            .insert(&parent, "tags", FieldValue::<Item>::Null)
            .await;
        let page = resolver
            .resolve(Parent::Record(&parent), "tags", &ConnectionArgs::default().with_first(5))
            .await
            .unwrap();
        assert_eq!(page, None);

        // Fields the data layer knows nothing about are null too.
        let page = resolver
            .resolve(Parent::Record(&parent), "labels", &ConnectionArgs::default())
            .await
            .unwrap();
        assert_eq!(page, None);

        let loads = resolver.data.loads().await;
        assert_eq!(loads[0].name, "tags");
        assert_eq!(loads[0].kind, FieldKind::Attribute);
    }

    #[async_std::test]
    async fn test_malformed_cursor() {
        let (resolver, parent) = resolver_with_comments(3).await;
        let args = ConnectionArgs::default()
            .with_first(2)
            .with_after("not-base64");
        let err = resolver
            .resolve(Parent::Record(&parent), "comments", &args)
            .await
            .unwrap_err();
        assert!(
            matches!(
                &err,
                Error::Decode {
                    cursor,
                    source: CursorError::Base64 { .. },
                } if cursor == "not-base64"
            ),
            "{err}"
        );
    }

    #[async_std::test]
    async fn test_zero_first() {
        let (resolver, parent) = resolver_with_comments(3).await;
        let err = resolver
            .resolve(
                Parent::Record(&parent),
                "comments",
                &ConnectionArgs::default().with_first(0),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFirst));
        assert!(err.is_bad_request());
    }

    #[async_std::test]
    async fn test_loaded_relation_is_not_refetched() {
        let (resolver, _) = resolver_with_comments(0).await;
        let parent = post().with_loaded("comments", Item::many("Comment", 4));
        let page = resolver
            .resolve(
                Parent::Record(&parent),
                "comments",
                &ConnectionArgs::default()
                    .with_first(2)
                    .with_filter("order", "desc"),
            )
            .await
            .unwrap()
            .unwrap();
        // Loaded relations are used as-is, without consulting the data layer or the search index.
        assert_eq!(ids(&page), [0, 1]);
        assert_eq!(page.total, 4);
        assert!(resolver.data.loads().await.is_empty());
        assert!(resolver.reorderer.search().queries().await.is_empty());

        // A relation which was loaded but turned out empty is still a cache hit.
        let parent = post().with_loaded("comments", FieldValue::<Item>::Null);
        let page = resolver
            .resolve(Parent::Record(&parent), "comments", &ConnectionArgs::default())
            .await
            .unwrap();
        assert_eq!(page, None);
        assert!(resolver.data.loads().await.is_empty());
    }

    #[async_std::test]
    async fn test_reordered_relation() {
        let (resolver, parent) = resolver_with_comments(10).await;
        let args = ConnectionArgs::default()
            .with_first(3)
            .with_filter("order", "desc")
            .with_filter("exclude", json!([9, 7]));
        let page = resolver
            .resolve(Parent::Record(&parent), "comments", &args)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&page), [8, 6, 5]);
        // The total reflects the filtered collection.
        assert_eq!(page.total, 8);

        let loads = resolver.data.loads().await;
        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0].kind, FieldKind::Relation);
        assert_eq!(loads[0].target, StorageTarget::Primary);

        let queries = resolver.reorderer.search().queries().await;
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].doc_type, "comments");
        assert_eq!(queries[0].ids, (0..10).map(Id).collect::<Vec<_>>());
        // All arguments are passed to the search index, including the paging arguments.
        assert_eq!(queries[0].args, args);
    }

    #[async_std::test]
    async fn test_reorder_result_with_unknown_and_duplicate_ids() {
        #[derive(Clone, Debug)]
        struct Fixed(Vec<Id>);

        #[async_trait::async_trait]
        impl Reorderer for Fixed {
            type Error = std::io::Error;

            async fn reorder(&self, _: ReorderRequest<'_>) -> Result<Vec<Id>, Self::Error> {
                Ok(self.0.clone())
            }
        }

        let parent = post();
        let data = MockDataLayer::default();
        data.insert(&parent, "comments", Item::many("Comment", 4)).await;
        let resolver = ConnectionResolver::new(
            data,
            Fixed(vec![Id(2), Id(42), Id(0), Id(2)]),
            ResolverOptions::default(),
        );
        let page = resolver
            .resolve(Parent::Record(&parent), "comments", &ConnectionArgs::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&page), [2, 0]);
    }

    #[async_std::test]
    async fn test_mixed_keyed_and_keyless_items() {
        #[derive(Clone, Debug, PartialEq, Eq)]
        struct Row(Option<u64>);

        impl Node for Row {
            fn key(&self) -> Option<NodeKey> {
                self.0.map(|id| NodeKey::new("Row", id))
            }
        }

        let parent = MockRecord::<Row>::new("Post", 1);
        let data = MockDataLayer::default();
        data.insert(
            &parent,
            "keyed_first",
            vec![Row(Some(1)), Row(None), Row(Some(2))],
        )
        .await;
        data.insert(
            &parent,
            "keyless_first",
            vec![Row(None), Row(Some(1)), Row(Some(2))],
        )
        .await;
        let search = MockSearchIndex::default();
        let resolver = ConnectionResolver::new(
            data,
            SearchIndexReorderer::new(search.clone(), "test"),
            ResolverOptions::default(),
        );
        let args = ConnectionArgs::default().with_filter("order", "desc");

        // The collection is reordered, and the keyless item is dropped.
        let page = resolver
            .resolve(Parent::Record(&parent), "keyed_first", &args)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.items, [Row(Some(2)), Row(Some(1))]);
        assert_eq!(page.total, 2);
        let queries = search.queries().await;
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].ids, [Id(1), Id(2)]);

        // The collection is used as-is.
        let page = resolver
            .resolve(Parent::Record(&parent), "keyless_first", &args)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.items, [Row(None), Row(Some(1)), Row(Some(2))]);
        assert_eq!(search.queries().await.len(), 1);
    }

    #[async_std::test]
    async fn test_huge_cursor() {
        let (resolver, parent) = resolver_with_comments(25).await;
        let args = ConnectionArgs::default()
            .with_first(10)
            .with_after(Cursor(usize::MAX).encode());
        let page = resolver
            .resolve(Parent::Record(&parent), "comments", &args)
            .await
            .unwrap()
            .unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total, 25);
        assert_eq!(page.current_page, usize::MAX / 10);
        assert!(!page.has_next_page());
        assert!(page.has_previous_page());
    }

    #[async_std::test]
    async fn test_scalar_items_are_not_reordered() {
        let parent = MockRecord::<String>::new("Post", 1);
        let data = MockDataLayer::default();
        data.insert(
            &parent,
            "tags",
            vec!["b".to_string(), "a".to_string(), "c".to_string()],
        )
        .await;
        let search = MockSearchIndex::default();
        let resolver = ConnectionResolver::new(
            data,
            SearchIndexReorderer::new(search.clone(), "test"),
            ResolverOptions::default(),
        );
        let page = resolver
            .resolve(
                Parent::Record(&parent),
                "tags",
                &ConnectionArgs::default().with_filter("order", "desc"),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.items, ["b", "a", "c"]);
        assert!(search.queries().await.is_empty());
    }

    #[async_std::test]
    async fn test_singular_value() {
        let (resolver, parent) = resolver_with_comments(0).await;
        let author = Item::new("User", 3);
        resolver
            .data
            .insert(&parent, "author", FieldValue::One(author.clone()))
            .await;
        let page = resolver
            .resolve(Parent::Record(&parent), "author", &ConnectionArgs::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.items, [author]);
        assert_eq!(page.total, 1);
    }

    #[async_std::test]
    async fn test_history_relation() {
        let (resolver, parent) = resolver_with_comments(0).await;
        resolver
            .data
            .insert_at(
                &parent,
                "histories",
                StorageTarget::History,
                Item::many("History", 3),
            )
            .await;
        let page = resolver
            .resolve(Parent::Record(&parent), "histories", &ConnectionArgs::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&page), [0, 1, 2]);

        let loads = resolver.data.loads().await;
        assert_eq!(loads[0].target, StorageTarget::History);
        assert_eq!(loads[0].kind, FieldKind::Relation);
        let queries = resolver.reorderer.search().queries().await;
        assert_eq!(queries[0].doc_type, "histories");
    }

    #[async_std::test]
    async fn test_configured_history_relations() {
        init_logging();
        let parent = post();
        let data = MockDataLayer::default();
        data.insert_at(&parent, "revisions", StorageTarget::History, Item::many("Revision", 2))
            .await;
        let resolver = ConnectionResolver::new(
            data,
            OrderByReorderer::new(MockOrderBy::new(Item::many("Revision", 2))),
            ResolverOptions {
                history_relations: vec!["revisions".into()],
                ..Default::default()
            },
        );
        let page = resolver
            .resolve(Parent::Record(&parent), "revisions", &ConnectionArgs::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&page), [0, 1]);
        assert_eq!(resolver.data.loads().await[0].target, StorageTarget::History);
    }

    #[async_std::test]
    async fn test_pre_paginated_total() {
        let (resolver, _) = resolver_with_comments(0).await;
        let accessor = MockAccessor::default().with(
            "comments",
            Collection::with_total(Item::many("Comment", 5), 50),
        );
        let page = resolver
            .resolve(
                Parent::Accessor(&accessor),
                "comments",
                &ConnectionArgs::default().with_first(2),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&page), [0, 1]);
        assert_eq!(page.total, 50);

        // The accessor's field is used directly, and the data layer is never consulted.
        assert!(resolver.data.loads().await.is_empty());
        // Without a record, there is no reordering.
        assert!(resolver.reorderer.search().queries().await.is_empty());

        let page = resolver
            .resolve(Parent::Accessor(&accessor), "missing", &ConnectionArgs::default())
            .await
            .unwrap();
        assert_eq!(page, None);
    }

    #[async_std::test]
    async fn test_mapping_parent() {
        let (resolver, _) = resolver_with_comments(0).await;
        let mut map = Mapping::new();
        map.insert("comments".into(), Item::many("Comment", 3).into());
        map.insert("pinned".into(), FieldValue::One(Item::new("Comment", 9)));
        map.insert("tags".into(), FieldValue::Null);

        let page = resolver
            .resolve(Parent::from(&map), "comments", &ConnectionArgs::default().with_first(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&page), [0, 1]);
        assert_eq!(page.total, 3);

        let page = resolver
            .resolve(Parent::from(&map), "pinned", &ConnectionArgs::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&page), [9]);

        // Missing and null keys in a mapping resolve to an empty page, not to null.
        for field in ["tags", "missing"] {
            let page = resolver
                .resolve(Parent::from(&map), field, &ConnectionArgs::default())
                .await
                .unwrap()
                .unwrap();
            assert!(page.is_empty());
            assert_eq!(page.per_page, 1);
        }
    }

    #[async_std::test]
    async fn test_data_layer_failure() {
        let (resolver, parent) = resolver_with_comments(3).await;
        resolver.data.fail("connection reset").await;
        let err = resolver
            .resolve(Parent::Record(&parent), "comments", &ConnectionArgs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DataLayer { .. }));
        assert_eq!(err.to_string(), "mock DB error: connection reset");
        assert!(!err.is_bad_request());
    }

    #[async_std::test]
    async fn test_reorder_failure() {
        let (resolver, parent) = resolver_with_comments(3).await;
        resolver.reorderer.search().fail("index missing").await;
        let err = resolver
            .resolve(Parent::Record(&parent), "comments", &ConnectionArgs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Reorder { .. }));
        assert_eq!(err.to_string(), "mock search error: index missing");
    }

    #[async_std::test]
    async fn test_concurrent_resolutions() {
        let (resolver, parent) = resolver_with_comments(30).await;
        let args = (0..6)
            .map(|i| {
                ConnectionArgs::default()
                    .with_first(5)
                    .with_after(Cursor(5 * i).encode())
            })
            .collect::<Vec<_>>();
        let pages = try_join_all(
            args.iter()
                .map(|args| resolver.resolve(Parent::Record(&parent), "comments", args)),
        )
        .await
        .unwrap();
        for (i, page) in pages.into_iter().enumerate() {
            let page = page.unwrap();
            let start = 5 * i as u64;
            assert_eq!(ids(&page), (start..start + 5).collect::<Vec<_>>());
            assert_eq!(page.current_page, i + 1);
        }
    }
}
