//! Presentation of resolved pages as GraphQL connections.

use crate::{
    args::ConnectionArgs,
    backend::{DataLayer, Reorderer},
    cursor::Cursor,
    error::{Error, Result},
    page::Page,
    parent::{Node, Parent},
    resolver::ConnectionResolver,
};
use async_graphql::{
    connection::{Connection, Edge},
    ErrorExtensions, OutputType, SimpleObject,
};

/// Paging metadata exposed on every connection, alongside `edges` and `pageInfo`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, SimpleObject)]
pub struct PageFields {
    /// The number of items in the whole connection.
    pub total: usize,
    pub per_page: usize,
    /// The 1-based index of the current page.
    pub current_page: usize,
    pub last_page: usize,
}

impl<T> From<&Page<T>> for PageFields {
    fn from(page: &Page<T>) -> Self {
        Self {
            total: page.total,
            per_page: page.per_page,
            current_page: page.current_page,
            last_page: page.last_page(),
        }
    }
}

/// A page of a connection, in the shape expected by Relay clients.
pub type PageConnection<T> = Connection<Cursor, T, PageFields>;

impl<T: OutputType> Page<T> {
    pub fn into_connection(self) -> PageConnection<T> {
        let mut connection = Connection::with_additional_fields(
            self.has_previous_page(),
            self.has_next_page(),
            PageFields::from(&self),
        );
        connection
            .edges
            .extend(self.into_edges().map(|(cursor, node)| Edge::new(cursor, node)));
        connection
    }
}

impl<D, R: Reorderer> ConnectionResolver<D, R> {
    /// Resolve one page of a connection and convert it to a GraphQL [`Connection`].
    ///
    /// See [`resolve`](Self::resolve).
    pub async fn resolve_connection<T: Node + OutputType>(
        &self,
        parent: Parent<'_, T>,
        field: &str,
        args: &ConnectionArgs,
    ) -> Result<Option<PageConnection<T>>>
    where
        D: DataLayer<T>,
    {
        Ok(self
            .resolve(parent, field, args)
            .await?
            .map(Page::into_connection))
    }
}

impl ErrorExtensions for Error {
    fn extend(&self) -> async_graphql::Error {
        let code = if self.is_bad_request() {
            "BAD_USER_INPUT"
        } else {
            "INTERNAL"
        };
        async_graphql::Error::new(self.to_string()).extend_with(|_, ext| ext.set("code", code))
    }
}
