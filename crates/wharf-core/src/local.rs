//! The local store boundary.
//!
//! The local store is the authoritative backing store for packages published
//! directly to this instance. It is an external collaborator: this crate
//! only consumes the interface. Implementations must serialize conflicting
//! writes to the same package name; writes to different names are
//! independent.

use std::io::{Read, Write};

use crate::{error::Result, metadata::PackageMetadata};

/// A byte stream served to a tarball consumer.
///
/// `length` is known before any data flows when the serving source provides
/// it. Dropping the stream aborts whatever reads and cache writes are still
/// in flight.
pub struct TarballStream {
    pub length: Option<u64>,
    pub reader: Box<dyn Read + Send>,
}

impl std::fmt::Debug for TarballStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TarballStream")
            .field("length", &self.length)
            .field("reader", &"<stream>")
            .finish()
    }
}

/// Write stream caching a tarball into the local store.
///
/// Data is not visible to readers until [`TarballSink::commit`] succeeds;
/// an aborted or dropped-uncommitted sink must leave no trace.
pub trait TarballSink: Write + Send {
    fn commit(&mut self) -> Result<()>;
    fn abort(&mut self);
}

/// A locally known package and its last modification time (epoch millis).
#[derive(Clone, Debug)]
pub struct RecentPackage {
    pub name: String,
    pub time: u64,
}

/// CRUD and listing operations over the authoritative local package store.
pub trait LocalStore: Send + Sync {
    fn get_package(&self, name: &str) -> Result<PackageMetadata>;

    fn add_package(&self, name: &str, meta: PackageMetadata) -> Result<()>;

    /// Upserts the merged document produced by a sync pass and returns the
    /// persisted state. Creates the package record if it does not exist.
    fn update_versions(&self, name: &str, doc: PackageMetadata) -> Result<PackageMetadata>;

    fn add_version(
        &self,
        name: &str,
        version: &str,
        body: serde_json::Value,
        tag: Option<&str>,
    ) -> Result<()>;

    fn add_tags(&self, name: &str, tags: Vec<(String, String)>) -> Result<()>;

    fn change_package(&self, name: &str, doc: PackageMetadata) -> Result<()>;

    fn remove_package(&self, name: &str) -> Result<()>;

    fn remove_tarball(&self, name: &str, filename: &str) -> Result<()>;

    fn read_tarball(&self, name: &str, filename: &str) -> Result<TarballStream>;

    fn write_tarball(&self, name: &str, filename: &str) -> Result<Box<dyn TarballSink>>;

    /// All locally known package names.
    fn list_packages(&self) -> Result<Vec<String>>;

    /// Locally known packages modified at or after `startkey` (epoch millis).
    fn get_recent_packages(&self, startkey: u64) -> Result<Vec<RecentPackage>>;
}
