use serde::{Deserialize, Serialize};
use tracing::trace;

/// Access rule binding a package name pattern to a set of uplinks.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PackageAccess {
    /// Glob pattern matched against package names (e.g., "@corp/*").
    pub pattern: String,

    /// Names of the uplinks packages matching this rule may be proxied to.
    /// An empty list makes matching packages local-only.
    #[serde(default)]
    pub proxy: Vec<String>,
}

/// Decides which uplinks a package name may be proxied through.
///
/// Rules are evaluated in declaration order; the first pattern matching the
/// package name wins. A name that matches no rule may use every uplink.
#[derive(Clone, Debug, Default)]
pub struct AccessPolicy {
    rules: Vec<PackageAccess>,
}

impl AccessPolicy {
    pub fn new(rules: Vec<PackageAccess>) -> Self {
        Self { rules }
    }

    /// Returns true if `package` may be fetched through the uplink `uplink_id`.
    pub fn proxy_access(&self, package: &str, uplink_id: &str) -> bool {
        for rule in &self.rules {
            if fast_glob::glob_match(&rule.pattern, package) {
                let allowed = rule.proxy.iter().any(|u| u == uplink_id);
                trace!(
                    package = package,
                    uplink = uplink_id,
                    pattern = rule.pattern,
                    allowed = allowed,
                    "access rule matched"
                );
                return allowed;
            }
        }
        true
    }
}
