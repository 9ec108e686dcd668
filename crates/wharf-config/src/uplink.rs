use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::time::parse_duration;

/// Default freshness window for cached uplink metadata.
pub const DEFAULT_MAX_AGE_MS: u64 = 2 * 60 * 1_000;

/// Default per-request timeout for uplink calls.
pub const DEFAULT_TIMEOUT_MS: u64 = 30 * 1_000;

/// Declares one remote registry this instance proxies.
///
/// The order of `[[uplinks]]` entries in the configuration file is
/// significant: metadata from uplinks is always merged in declaration order
/// so that dist-tag tie-breaks are reproducible across runs.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UplinkConfig {
    /// Unique name of the uplink, used as its stable identifier.
    pub name: String,

    /// Base URL of the remote registry.
    pub url: String,

    /// Freshness window for cached metadata (e.g., "30s", "2m", "1h").
    /// Default: "2m"
    pub max_age: Option<String>,

    /// Timeout for requests to this uplink (e.g., "30s").
    /// Default: "30s"
    pub timeout: Option<String>,
}

impl UplinkConfig {
    pub fn max_age(&self) -> Duration {
        let millis = self
            .max_age
            .as_deref()
            .and_then(parse_duration)
            .unwrap_or(DEFAULT_MAX_AGE_MS);
        Duration::from_millis(millis)
    }

    pub fn timeout(&self) -> Duration {
        let millis = self
            .timeout
            .as_deref()
            .and_then(parse_duration)
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        Duration::from_millis(millis)
    }
}
