//! Opaque cursors for paging through a connection.
//!
//! Cursors follow the Relay global-id scheme: a cursor is the base64 encoding of a string
//! `<type>:<id>`. Cursors produced by this crate use the type `arrayconnection` and an id which
//! is an offset into the connection. When decoding, the type prefix is not checked, so global
//! ids minted elsewhere can be used as cursors as long as their id part is an integer.

use crate::{
    args::ConnectionArgs,
    error::{DecodeSnafu, Error},
};
use async_graphql::connection::CursorType;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use derive_more::{Display, From, Into};
use snafu::{OptionExt, ResultExt, Snafu};
use std::num::ParseIntError;
use std::string::FromUtf8Error;

/// Errors encountered while decoding a cursor.
#[derive(Clone, Debug, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CursorError {
    #[snafu(display("not valid base64: {source}"))]
    Base64 { source: base64::DecodeError },

    #[snafu(display("not valid UTF-8: {source}"))]
    Utf8 { source: FromUtf8Error },

    #[snafu(display("missing type prefix"))]
    MissingType,

    #[snafu(display("id {id:?} is not a non-negative integer: {source}"))]
    ParseId { id: String, source: ParseIntError },

    #[snafu(display("id {id} is out of range"))]
    OutOfRange { id: u64 },
}

/// A Relay global identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GlobalId {
    /// The type of object identified.
    pub kind: String,
    /// The identifier of the object within its type.
    pub id: u64,
}

impl GlobalId {
    /// A global id for the object `id` of type `kind`.
    pub fn new(kind: impl Into<String>, id: u64) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }

    /// Encode this id into an opaque string.
    pub fn encode(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.kind, self.id))
    }

    /// Decode an opaque string produced by [`encode`](Self::encode).
    pub fn decode(s: &str) -> Result<Self, CursorError> {
        let bytes = STANDARD.decode(s).context(Base64Snafu)?;
        let text = String::from_utf8(bytes).context(Utf8Snafu)?;
        let (kind, id) = text.split_once(':').context(MissingTypeSnafu)?;
        let id = id.parse().context(ParseIdSnafu { id })?;
        Ok(Self::new(kind, id))
    }
}

/// An offset into a connection.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
pub struct Cursor(pub usize);

impl Cursor {
    /// The global-id type used for connection cursors.
    pub const KIND: &'static str = "arrayconnection";

    /// Encode this offset as an opaque cursor string.
    pub fn encode(&self) -> String {
        GlobalId::new(Self::KIND, self.0 as u64).encode()
    }

    /// Decode an opaque cursor string into an offset.
    pub fn decode(s: &str) -> Result<Self, CursorError> {
        let GlobalId { id, .. } = GlobalId::decode(s)?;
        usize::try_from(id)
            .map(Self)
            .map_err(|_| CursorError::OutOfRange { id })
    }
}

impl CursorType for Cursor {
    type Error = CursorError;

    fn decode_cursor(s: &str) -> Result<Self, Self::Error> {
        Self::decode(s)
    }

    fn encode_cursor(&self) -> String {
        self.encode()
    }
}

/// The offset at which to start a page, based on the `after` argument.
///
/// Without an `after` cursor, the page starts at the beginning of the connection.
pub fn decode_cursor(args: &ConnectionArgs) -> Result<usize, Error> {
    match &args.after {
        Some(after) => cursor_id(after),
        None => Ok(0),
    }
}

/// Decode the offset from an opaque cursor.
pub fn cursor_id(cursor: &str) -> Result<usize, Error> {
    Cursor::decode(cursor)
        .map(usize::from)
        .context(DecodeSnafu { cursor })
}
