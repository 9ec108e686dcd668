//! Configuration management for the wharf registry proxy.

pub mod access;
pub mod config;
pub mod error;
pub mod time;
pub mod uplink;

pub use access::{AccessPolicy, PackageAccess};
pub use config::Config;
pub use error::{ConfigError, Result};
pub use uplink::UplinkConfig;
