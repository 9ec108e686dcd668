//! Concurrent uplink synchronization.
//!
//! The synchronizer fans out to every permitted uplink, honors the per-uplink
//! freshness cache, and merges whatever comes back into one working document.
//! Calls are issued concurrently, but results are always merged in configured
//! uplink order so dist-tag tie-breaks are reproducible across runs.

use std::sync::Arc;

use tracing::{debug, trace, warn};
use wharf_config::AccessPolicy;
use wharf_uplink::{FetchOutcome, UplinkClient, UplinkError};

use crate::{
    error::{CoreError, Result},
    local::LocalStore,
    merge::{merge_versions, resolve_tags},
    metadata::{now_millis, PackageMetadata},
};

/// Outcome of one uplink's part in a sync pass.
#[derive(Debug)]
pub struct UplinkFailure {
    pub uplink: String,
    pub error: UplinkError,
}

impl UplinkFailure {
    /// True when this uplink positively said the package does not exist.
    pub fn is_not_found(&self) -> bool {
        self.error.is_not_found()
    }

    /// True when this uplink answered but its metadata failed validation.
    pub fn is_malformed(&self) -> bool {
        self.error.is_malformed()
    }
}

impl std::fmt::Display for UplinkFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.uplink, self.error)
    }
}

/// Result of a sync pass.
///
/// `document` is `None` when no source confirmed the package exists; the
/// caller distinguishes "everyone said 404" from "somebody was unreachable"
/// through `failures`.
pub struct SyncReport {
    pub document: Option<PackageMetadata>,
    pub failures: Vec<UplinkFailure>,
}

/// Queries all permitted uplinks for a package and merges their answers.
pub struct UplinkSynchronizer {
    uplinks: Vec<Arc<dyn UplinkClient>>,
    store: Arc<dyn LocalStore>,
    policy: AccessPolicy,
}

impl UplinkSynchronizer {
    pub fn new(
        uplinks: Vec<Arc<dyn UplinkClient>>,
        store: Arc<dyn LocalStore>,
        policy: AccessPolicy,
    ) -> Self {
        Self {
            uplinks,
            store,
            policy,
        }
    }

    /// Runs one sync pass for `name`, seeded with the local document when
    /// one exists.
    ///
    /// Uplinks whose cached record is still within their `max_age` are
    /// skipped entirely. A sync record is refreshed only on a successful or
    /// not-modified response, never on error. Individual uplink failures are
    /// isolated; only a local persistence failure aborts the pass.
    pub async fn sync(
        &self,
        name: &str,
        local: Option<PackageMetadata>,
    ) -> Result<SyncReport> {
        let mut exists = local.is_some();
        let mut doc = local.unwrap_or_else(|| PackageMetadata::empty(name));

        let now = now_millis();
        let mut tasks = Vec::new();

        for uplink in &self.uplinks {
            if !self.policy.proxy_access(name, uplink.id()) {
                trace!(package = name, uplink = uplink.id(), "access denied by policy");
                continue;
            }

            let record = doc.uplinks.get(uplink.id());
            if let Some(record) = record {
                let max_age = uplink.max_age().as_millis() as u64;
                if now.saturating_sub(record.fetched) < max_age {
                    trace!(
                        package = name,
                        uplink = uplink.id(),
                        "cached metadata still fresh, skipping"
                    );
                    continue;
                }
            }

            let etag = record.and_then(|r| r.etag.clone());
            let client = Arc::clone(uplink);
            let package = name.to_string();
            let task = tokio::task::spawn_blocking(move || {
                client.fetch_package(&package, etag.as_deref())
            });
            tasks.push((Arc::clone(uplink), task));
        }

        debug!(package = name, count = tasks.len(), "querying uplinks");

        let mut failures = Vec::new();

        // Results are awaited in configuration order regardless of which
        // call finished first, keeping the merge deterministic.
        for (uplink, task) in tasks {
            let outcome = task
                .await
                .map_err(|err| CoreError::Custom(format!("join handle error: {err}")))?;

            match outcome {
                Ok(FetchOutcome::NotModified) => {
                    trace!(package = name, uplink = uplink.id(), "not modified");
                    doc.uplinks
                        .entry(uplink.id().to_string())
                        .or_default()
                        .touch(now_millis());
                }
                Ok(FetchOutcome::Fetched { etag, body }) => {
                    match PackageMetadata::from_remote(name, body) {
                        Ok(remote) => {
                            let record = doc.uplinks.entry(uplink.id().to_string()).or_default();
                            record.etag = etag;
                            record.touch(now_millis());

                            merge_versions(&mut doc, &remote);
                            exists = true;
                        }
                        Err(error) => {
                            warn!(
                                package = name,
                                uplink = uplink.id(),
                                error = %error,
                                "rejected uplink metadata"
                            );
                            failures.push(UplinkFailure {
                                uplink: uplink.id().to_string(),
                                error,
                            });
                        }
                    }
                }
                Err(error) => {
                    if error.is_not_found() {
                        trace!(package = name, uplink = uplink.id(), "package not on uplink");
                    } else {
                        warn!(
                            package = name,
                            uplink = uplink.id(),
                            error = %error,
                            "uplink fetch failed"
                        );
                    }
                    failures.push(UplinkFailure {
                        uplink: uplink.id().to_string(),
                        error,
                    });
                }
            }
        }

        resolve_tags(&mut doc);

        if !exists {
            return Ok(SyncReport {
                document: None,
                failures,
            });
        }

        let doc = self.store.update_versions(name, doc)?;

        Ok(SyncReport {
            document: Some(doc),
            failures,
        })
    }
}
