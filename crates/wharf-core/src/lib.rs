//! Orchestration core for the wharf registry proxy.
//!
//! Presents one logical package store backed by an authoritative local store
//! and N remote uplink registries: metadata from all sources is merged under
//! clear precedence rules (local wins, tags tie-break by semver), remote
//! responses are cached with etag revalidation, and tarballs stream from
//! local storage with a caching fallback to the owning uplink.

pub mod error;
pub mod local;
pub mod merge;
pub mod metadata;
pub mod storage;
pub mod sync;
pub mod tarball;

pub use error::{CoreError, ErrorContext, Result};
pub use local::{LocalStore, RecentPackage, TarballSink, TarballStream};
pub use metadata::{DistFile, PackageMetadata, TagValue, UplinkSyncRecord, TAG_LATEST};
pub use storage::{FetchedPackage, SearchOptions, Storage};
pub use sync::{SyncReport, UplinkFailure, UplinkSynchronizer};
