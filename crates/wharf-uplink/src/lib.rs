//! Uplink registry clients for the wharf registry proxy.
//!
//! An *uplink* is a remote registry this instance proxies and mirrors. This
//! crate defines the [`UplinkClient`] boundary consumed by the orchestration
//! core, the per-uplink [`UplinkError`] outcome type, and [`HttpUplink`],
//! the HTTP implementation with conditional (etag) metadata fetches and raw
//! URL streaming.

pub mod client;
pub mod error;
pub mod http;
pub mod http_client;

pub use client::{FetchOutcome, RemoteStream, UplinkClient};
pub use error::{Result, UplinkError};
pub use http::HttpUplink;
pub use http_client::ClientConfig;
