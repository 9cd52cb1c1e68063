//! Resolution of Relay-style paginated connections.
//!
//! Given a parent object, the name of one of its plural fields, and Relay paging arguments
//! (`first`, `after`), a [`ConnectionResolver`] loads the related items, lets a pluggable
//! [`Reorderer`](backend::Reorderer) filter and sort them, and slices out the requested
//! [`Page`]. Everything the resolver needs from the outside world (the data layer which loads
//! relations, the search index or order-by helper which reorders them) is consumed through the
//! traits in [`backend`], so the same resolver can be instantiated against a production database
//! or the in-memory [`mock`] backend.
//!
//! The pieces fit together as follows:
//! * [`parent`] describes the objects a connection can hang off of and the items it contains.
//! * [`cursor`] encodes and decodes the opaque cursors clients page with.
//! * [`resolver`] implements the paging algorithm itself.
//! * [`graphql`] exposes resolved pages as [`async_graphql`] connections.
//! * [`selection`] and [`validation`] are small helpers for the surrounding GraphQL layer.

pub mod args;
pub mod backend;
pub mod cursor;
pub mod error;
pub mod graphql;
pub mod options;
pub mod page;
pub mod parent;
pub mod resolver;
pub mod selection;
pub mod validation;

#[cfg(any(test, feature = "mocks"))]
pub mod mock;

pub use args::ConnectionArgs;
pub use cursor::{Cursor, GlobalId};
pub use error::{Error, Result};
pub use options::ResolverOptions;
pub use page::{Collection, Page};
pub use parent::{EntityType, FieldValue, Id, Node, NodeKey, Parent, StorageTarget};
pub use resolver::ConnectionResolver;

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber configured from `RUST_LOG`.
///
/// It is safe to call this more than once; only the first call has any effect.
pub fn init_logging() {
    // Fails if a subscriber is already installed, which is expected on every call but the first.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
