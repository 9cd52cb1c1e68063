//! Errors reported while resolving a connection.

use crate::cursor::CursorError;
use snafu::Snafu;

/// A type-erased error reported by one of the resolver's collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors encountered when resolving a connection.
///
/// Failures of the data layer and the reorder strategy are passed through untouched: the
/// original error is kept as the [`source`](std::error::Error::source) and its message is used
/// verbatim.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("invalid cursor {cursor:?}: {source}"))]
    Decode { cursor: String, source: CursorError },

    #[snafu(display("argument `first` must be a positive integer"))]
    InvalidFirst,

    #[snafu(display("{source}"))]
    DataLayer { source: BoxError },

    #[snafu(display("{source}"))]
    Reorder { source: BoxError },
}

impl Error {
    /// An error from the data layer.
    pub fn data_layer(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::DataLayer {
            source: Box::new(err),
        }
    }

    /// An error from the reorder strategy.
    pub fn reorder(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Reorder {
            source: Box::new(err),
        }
    }

    /// Whether this error was caused by bad arguments from the client.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::InvalidFirst)
    }
}

/// Result type for connection resolution.
pub type Result<T, E = Error> = std::result::Result<T, E>;
