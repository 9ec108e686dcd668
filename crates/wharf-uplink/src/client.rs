//! The uplink client boundary.

use std::{io::Read, time::Duration};

use crate::error::UplinkError;

/// Result of one conditional metadata fetch.
pub enum FetchOutcome {
    /// The uplink confirmed the cached document is still current.
    NotModified,
    /// Fresh metadata, not yet validated against the registry schema.
    Fetched {
        etag: Option<String>,
        body: serde_json::Value,
    },
}

/// A byte stream obtained from an uplink or the local store.
///
/// `length` is the side-channel content-length notification: when the
/// serving source knows the payload size it is available here before any
/// data is read. Dropping the stream releases the underlying connection.
pub struct RemoteStream {
    pub length: Option<u64>,
    pub reader: Box<dyn Read + Send>,
}

/// One configured remote registry.
///
/// Implementations must isolate their failures: every method reports errors
/// through [`UplinkError`] and must never panic on bad remote data.
pub trait UplinkClient: Send + Sync {
    /// Stable identifier, used as the key of sync records.
    fn id(&self) -> &str;

    /// Staleness threshold for cached metadata from this uplink.
    fn max_age(&self) -> Duration;

    /// Fetches package metadata, conditionally when `etag` is known.
    fn fetch_package(&self, name: &str, etag: Option<&str>) -> Result<FetchOutcome, UplinkError>;

    /// Opens a raw byte stream for `url`.
    fn fetch_url(&self, url: &str) -> Result<RemoteStream, UplinkError>;

    /// Whether this uplink is the right source for a distfile URL.
    fn can_fetch_url(&self, url: &str) -> bool;

    /// Passthrough search request; returns the remote result document.
    fn search(&self, startkey: &str) -> Result<serde_json::Value, UplinkError>;
}
