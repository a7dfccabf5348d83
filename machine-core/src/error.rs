// ABOUTME: Typed error taxonomy for entity decoding, paginated fetches, and event handling
// ABOUTME: Cache misses are not errors; lookups return Option instead

use thiserror::Error;

/// A wire payload could not be turned into a typed entity.
///
/// `field` is the dotted path from the entity root (e.g. `profile.email`),
/// or `$` when the root value itself is the problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeserializationError {
    #[error("{entity} payload: expected an object at `{field}`")]
    NotAnObject { entity: &'static str, field: String },

    #[error("{entity} payload: missing required field `{field}`")]
    MissingField { entity: &'static str, field: String },

    #[error("{entity} payload: field `{field}` is invalid: {reason}")]
    InvalidType {
        entity: &'static str,
        field: String,
        reason: String,
    },
}

impl DeserializationError {
    /// Dotted path of the offending field
    pub fn field(&self) -> &str {
        match self {
            Self::NotAnObject { field, .. }
            | Self::MissingField { field, .. }
            | Self::InvalidType { field, .. } => field,
        }
    }
}

/// Draining a cursor-paginated listing failed. Items gathered from earlier
/// pages are discarded.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("page {page} request failed: {source}")]
    Request {
        page: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("page {page} has no `{field}` array")]
    MalformedPage { page: usize, field: String },

    #[error("cursor `{cursor}` was returned twice in one listing")]
    CursorLoop { cursor: String },
}

/// A raw push event could not be mapped onto a lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("event payload has no `type` field")]
    MissingType,

    #[error("{event_type} event has no usable `{field}`")]
    MissingField {
        event_type: &'static str,
        field: &'static str,
    },
}

/// Handling a single lifecycle event failed.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Bulk population at connect time failed. Fatal to startup.
    #[error("full sync of {listing} failed: {source}")]
    FullSync {
        listing: &'static str,
        #[source]
        source: FetchError,
    },

    #[error("fetching channel {channel_id} failed: {source}")]
    ChannelFetch {
        channel_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Decode(#[from] DeserializationError),
}

impl SyncError {
    /// Whether the synchronizer must stop instead of dropping the event
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FullSync { .. })
    }
}
