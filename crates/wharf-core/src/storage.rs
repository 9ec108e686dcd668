//! The storage facade.
//!
//! `Storage` composes the local store, the configured uplinks and the
//! synchronizer into the public package, tarball and search operations. Read
//! paths degrade gracefully to the best available data plus per-uplink
//! diagnostics; write paths are conservative and fail closed when existence
//! cannot be verified.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};
use wharf_config::Config;
use wharf_uplink::{ClientConfig, HttpUplink, UplinkClient};

use crate::{
    error::{CoreError, Result},
    local::{LocalStore, TarballStream},
    merge::latest_from_versions,
    metadata::{PackageMetadata, TagValue, TAG_LATEST},
    sync::{UplinkFailure, UplinkSynchronizer},
    tarball::CachingReader,
};

/// A merged package document plus the per-uplink problems encountered while
/// producing it, for partial-failure diagnostics at the HTTP layer.
#[derive(Debug)]
pub struct FetchedPackage {
    pub document: PackageMetadata,
    pub uplink_failures: Vec<UplinkFailure>,
}

/// Options for [`Storage::search`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SearchOptions {
    /// Skip remote sources entirely.
    pub local_only: bool,
}

/// The single logical package store backed by the local store and N uplinks.
pub struct Storage {
    store: Arc<dyn LocalStore>,
    uplinks: Vec<Arc<dyn UplinkClient>>,
    synchronizer: UplinkSynchronizer,
    client_config: ClientConfig,
    ignore_latest_tag: bool,
}

impl Storage {
    /// Builds a storage from configuration, constructing one HTTP uplink
    /// per configured entry, in declaration order.
    pub fn new(config: &Config, store: Arc<dyn LocalStore>) -> Result<Self> {
        let client_config = ClientConfig {
            user_agent: config.user_agent().to_string(),
            ..ClientConfig::default()
        };

        let mut uplinks: Vec<Arc<dyn UplinkClient>> = Vec::with_capacity(config.uplinks.len());
        for entry in &config.uplinks {
            uplinks.push(Arc::new(HttpUplink::new(entry, &client_config)?));
        }

        Ok(Self::with_uplinks(config, store, uplinks))
    }

    /// Builds a storage over caller-supplied uplink clients.
    pub fn with_uplinks(
        config: &Config,
        store: Arc<dyn LocalStore>,
        uplinks: Vec<Arc<dyn UplinkClient>>,
    ) -> Self {
        let synchronizer = UplinkSynchronizer::new(
            uplinks.clone(),
            Arc::clone(&store),
            config.access_policy(),
        );

        Self {
            store,
            uplinks,
            synchronizer,
            client_config: ClientConfig {
                user_agent: config.user_agent().to_string(),
                ..ClientConfig::default()
            },
            ignore_latest_tag: config.ignore_latest_tag(),
        }
    }

    /// Creates a package, refusing names that exist anywhere.
    ///
    /// Two-stage existence check: the local store first, then every
    /// permitted uplink. A name found in either place is a conflict. If no
    /// uplink confirms existence but at least one failed with something
    /// other than a 404, publishing is refused outright rather than risking
    /// a collision with a source that could not be verified. A malformed
    /// answer is the exception: the uplink was reachable and simply said
    /// nothing usable, so it neither asserts existence nor blocks the
    /// publish.
    pub async fn add_package(&self, name: &str, meta: PackageMetadata) -> Result<()> {
        match self.store.get_package(name) {
            Ok(_) => return Err(CoreError::PackageExists(name.to_string())),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        let report = self.synchronizer.sync(name, None).await?;

        if report.document.is_some() {
            return Err(CoreError::PackageExists(name.to_string()));
        }

        if let Some(failure) = report
            .failures
            .iter()
            .find(|f| !f.is_not_found() && !f.is_malformed())
        {
            warn!(package = name, uplink = failure.uplink, "existence check incomplete");
            return Err(CoreError::UplinkOffline(failure.uplink.clone()));
        }

        debug!(package = name, "creating package");
        self.store.add_package(name, meta)
    }

    /// Publishing a version is always local-authoritative.
    pub fn add_version(
        &self,
        name: &str,
        version: &str,
        body: Value,
        tag: Option<&str>,
    ) -> Result<()> {
        self.store.add_version(name, version, body, tag)
    }

    pub fn add_tags(&self, name: &str, tags: Vec<(String, String)>) -> Result<()> {
        self.store.add_tags(name, tags)
    }

    pub fn change_package(&self, name: &str, doc: PackageMetadata) -> Result<()> {
        self.store.change_package(name, doc)
    }

    pub fn remove_package(&self, name: &str) -> Result<()> {
        self.store.remove_package(name)
    }

    pub fn remove_tarball(&self, name: &str, filename: &str) -> Result<()> {
        self.store.remove_tarball(name, filename)
    }

    /// Returns the merged view of a package across all sources.
    ///
    /// A local not-found is tolerated (the package may live upstream); any
    /// other local error aborts immediately and is never masked by remote
    /// data.
    pub async fn get_package(&self, name: &str) -> Result<FetchedPackage> {
        let local = match self.store.get_package(name) {
            Ok(doc) => Some(doc),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err),
        };

        let report = self.synchronizer.sync(name, local).await?;

        match report.document {
            Some(mut document) => {
                self.prepare_for_caller(&mut document);
                Ok(FetchedPackage {
                    document,
                    uplink_failures: report.failures,
                })
            }
            None => Err(CoreError::PackageNotFound {
                name: name.to_string(),
                uplink_failures: report.failures.iter().map(|f| f.to_string()).collect(),
            }),
        }
    }

    /// Lists every locally published package projected to its latest
    /// version object. Intentionally local-only and strictly sequential.
    pub fn get_local(&self) -> Result<Vec<Value>> {
        let names = self.store.list_packages()?;
        let mut packages = Vec::with_capacity(names.len());

        for name in names {
            let doc = self.store.get_package(&name)?;
            match doc.latest().and_then(|v| doc.versions.get(v)) {
                Some(body) => packages.push(body.clone()),
                None => {
                    warn!(
                        package = name,
                        "latest tag does not resolve to a version, skipping"
                    );
                }
            }
        }

        Ok(packages)
    }

    /// Searches one reachable uplink and merges in local packages modified
    /// since `startkey` (epoch millis).
    ///
    /// Uplinks are tried in order; the first that answers (even with an
    /// empty result) wins, the rest are not consulted.
    pub async fn search(&self, startkey: u64, options: SearchOptions) -> Result<Value> {
        let mut results = serde_json::Map::new();

        if !options.local_only {
            let key = startkey.to_string();
            for uplink in &self.uplinks {
                let client = Arc::clone(uplink);
                let key = key.clone();
                let outcome = tokio::task::spawn_blocking(move || client.search(&key))
                    .await
                    .map_err(|err| CoreError::Custom(format!("join handle error: {err}")))?;

                match outcome {
                    Ok(Value::Object(map)) => {
                        results = map;
                        break;
                    }
                    Ok(_) => {
                        warn!(uplink = uplink.id(), "search returned a non-object result");
                    }
                    Err(error) => {
                        warn!(uplink = uplink.id(), error = %error, "search failed, trying next uplink");
                    }
                }
            }
        }

        for recent in self.store.get_recent_packages(startkey)? {
            let doc = match self.store.get_package(&recent.name) {
                Ok(doc) => doc,
                Err(err) => {
                    warn!(package = recent.name, error = %err, "skipping package in search");
                    continue;
                }
            };

            match local_search_entry(&doc, recent.time) {
                Some(entry) => {
                    results.insert(doc.name.clone(), entry);
                }
                None => {
                    warn!(package = recent.name, "no resolvable latest version, skipping");
                }
            }
        }

        Ok(Value::Object(results))
    }

    /// Serves a tarball, preferring local storage and falling back to the
    /// uplink that owns its distfile URL while caching a local copy.
    pub async fn get_tarball(&self, name: &str, filename: &str) -> Result<TarballStream> {
        match self.store.read_tarball(name, filename) {
            Ok(stream) => return Ok(stream),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        let not_found = || CoreError::TarballNotFound {
            name: name.to_string(),
            filename: filename.to_string(),
        };

        let local = match self.store.get_package(name) {
            Ok(doc) => Some(doc),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err),
        };

        let url = match &local {
            Some(doc) => doc.distfiles.get(filename).map(|f| f.url.clone()),
            None => None,
        };

        let url = match url {
            Some(url) => url,
            None => {
                // The distfile URL may only be known upstream. Refresh the
                // metadata once, then repeat the lookup.
                if local.is_some() {
                    return Err(not_found());
                }
                let report = self.synchronizer.sync(name, None).await?;
                report
                    .document
                    .as_ref()
                    .and_then(|doc| doc.distfiles.get(filename))
                    .map(|f| f.url.clone())
                    .ok_or_else(not_found)?
            }
        };

        let uplink = match self.uplinks.iter().find(|u| u.can_fetch_url(&url)) {
            Some(uplink) => Arc::clone(uplink),
            None => Arc::new(HttpUplink::for_url(&url, &self.client_config)?),
        };

        debug!(
            package = name,
            filename = filename,
            uplink = uplink.id(),
            "serving tarball from uplink"
        );

        // Best-effort cache: failure to open the write stream downgrades to
        // a passthrough, it never fails the request.
        let sink = match self.store.write_tarball(name, filename) {
            Ok(sink) => Some(sink),
            Err(err) => {
                warn!(package = name, filename = filename, error = %err, "cannot cache tarball locally");
                None
            }
        };

        let remote = {
            let url = url.clone();
            tokio::task::spawn_blocking(move || uplink.fetch_url(&url))
                .await
                .map_err(|err| CoreError::Custom(format!("join handle error: {err}")))??
        };

        Ok(TarballStream {
            length: remote.length,
            reader: Box::new(CachingReader::new(remote.reader, sink)),
        })
    }

    /// Shapes a merged document for external consumption: recomputes
    /// `latest` when configured to ignore upstream's claim (or when
    /// absent), collapses any unresolved tag list to its last entry, strips
    /// internal bookkeeping, and leaves `_attachments` present but empty.
    fn prepare_for_caller(&self, doc: &mut PackageMetadata) {
        if self.ignore_latest_tag || doc.latest().is_none() {
            if let Some(latest) = latest_from_versions(doc) {
                doc.dist_tags
                    .insert(TAG_LATEST.to_string(), TagValue::One(latest));
            }
        }

        let mut dropped = Vec::new();
        for (tag, value) in doc.dist_tags.iter_mut() {
            if let TagValue::Many(list) = value {
                match list.last() {
                    Some(last) => *value = TagValue::One(last.clone()),
                    None => dropped.push(tag.clone()),
                }
            }
        }
        for tag in dropped {
            doc.dist_tags.remove(&tag);
        }

        doc.uplinks.clear();
        doc.distfiles.clear();
        doc.attachments = serde_json::Map::new();
    }
}

/// Summary record for one local package in search results.
fn local_search_entry(doc: &PackageMetadata, time: u64) -> Option<Value> {
    let latest = doc.latest()?;
    let version = doc.versions.get(latest)?;

    let maintainers = version
        .get("maintainers")
        .cloned()
        .or_else(|| version.get("author").map(|author| json!([author])))
        .unwrap_or_else(|| json!([]));

    let modified = chrono::DateTime::from_timestamp_millis(time as i64)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default();

    Some(json!({
        "name": doc.name,
        "description": version.get("description").cloned().unwrap_or(Value::Null),
        "dist-tags": { TAG_LATEST: latest },
        "maintainers": maintainers,
        "readmeFilename": version.get("readmeFilename").cloned().unwrap_or_else(|| json!("")),
        "time": { "modified": modified },
        "repository": version.get("repository").cloned().unwrap_or(Value::Null),
        "keywords": version.get("keywords").cloned().unwrap_or(Value::Null),
    }))
}
