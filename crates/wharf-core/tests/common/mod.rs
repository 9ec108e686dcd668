//! In-memory fakes for the local store and uplink boundaries.

use std::{
    collections::{BTreeMap, HashMap},
    io::{self, Cursor, Write},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use serde_json::{json, Value};
use wharf_core::{
    CoreError, LocalStore, PackageMetadata, RecentPackage, Result, TarballSink, TarballStream,
};
use wharf_uplink::{FetchOutcome, RemoteStream, UplinkClient, UplinkError};

#[derive(Default)]
pub struct MemoryStore {
    packages: Mutex<BTreeMap<String, PackageMetadata>>,
    modified: Mutex<HashMap<String, u64>>,
    tarballs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_package(&self, doc: PackageMetadata) {
        self.packages.lock().unwrap().insert(doc.name.clone(), doc);
    }

    pub fn set_modified(&self, name: &str, time: u64) {
        self.modified.lock().unwrap().insert(name.to_string(), time);
    }

    pub fn has_package(&self, name: &str) -> bool {
        self.packages.lock().unwrap().contains_key(name)
    }

    pub fn tarball_bytes(&self, name: &str, filename: &str) -> Option<Vec<u8>> {
        self.tarballs
            .lock()
            .unwrap()
            .get(&format!("{name}/{filename}"))
            .cloned()
    }

    pub fn stored_package(&self, name: &str) -> Option<PackageMetadata> {
        self.packages.lock().unwrap().get(name).cloned()
    }
}

impl LocalStore for MemoryStore {
    fn get_package(&self, name: &str) -> Result<PackageMetadata> {
        self.packages
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::not_found(name))
    }

    fn add_package(&self, name: &str, meta: PackageMetadata) -> Result<()> {
        let mut packages = self.packages.lock().unwrap();
        if packages.contains_key(name) {
            return Err(CoreError::PackageExists(name.to_string()));
        }
        packages.insert(name.to_string(), meta);
        Ok(())
    }

    fn update_versions(&self, name: &str, doc: PackageMetadata) -> Result<PackageMetadata> {
        self.packages
            .lock()
            .unwrap()
            .insert(name.to_string(), doc.clone());
        Ok(doc)
    }

    fn add_version(
        &self,
        name: &str,
        version: &str,
        body: Value,
        tag: Option<&str>,
    ) -> Result<()> {
        let mut packages = self.packages.lock().unwrap();
        let doc = packages
            .get_mut(name)
            .ok_or_else(|| CoreError::not_found(name))?;
        doc.versions.insert(version.to_string(), body);
        if let Some(tag) = tag {
            doc.dist_tags.insert(
                tag.to_string(),
                wharf_core::TagValue::One(version.to_string()),
            );
        }
        Ok(())
    }

    fn add_tags(&self, name: &str, tags: Vec<(String, String)>) -> Result<()> {
        let mut packages = self.packages.lock().unwrap();
        let doc = packages
            .get_mut(name)
            .ok_or_else(|| CoreError::not_found(name))?;
        for (tag, version) in tags {
            doc.dist_tags
                .insert(tag, wharf_core::TagValue::One(version));
        }
        Ok(())
    }

    fn change_package(&self, name: &str, doc: PackageMetadata) -> Result<()> {
        self.packages.lock().unwrap().insert(name.to_string(), doc);
        Ok(())
    }

    fn remove_package(&self, name: &str) -> Result<()> {
        self.packages
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| CoreError::not_found(name))
    }

    fn remove_tarball(&self, name: &str, filename: &str) -> Result<()> {
        self.tarballs
            .lock()
            .unwrap()
            .remove(&format!("{name}/{filename}"));
        Ok(())
    }

    fn read_tarball(&self, name: &str, filename: &str) -> Result<TarballStream> {
        let bytes = self
            .tarballs
            .lock()
            .unwrap()
            .get(&format!("{name}/{filename}"))
            .cloned()
            .ok_or_else(|| CoreError::TarballNotFound {
                name: name.to_string(),
                filename: filename.to_string(),
            })?;

        Ok(TarballStream {
            length: Some(bytes.len() as u64),
            reader: Box::new(Cursor::new(bytes)),
        })
    }

    fn write_tarball(&self, name: &str, filename: &str) -> Result<Box<dyn TarballSink>> {
        Ok(Box::new(MemorySink {
            key: format!("{name}/{filename}"),
            buf: Vec::new(),
            map: Arc::clone(&self.tarballs),
        }))
    }

    fn list_packages(&self) -> Result<Vec<String>> {
        Ok(self.packages.lock().unwrap().keys().cloned().collect())
    }

    fn get_recent_packages(&self, startkey: u64) -> Result<Vec<RecentPackage>> {
        Ok(self
            .modified
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, time)| **time >= startkey)
            .map(|(name, time)| RecentPackage {
                name: name.clone(),
                time: *time,
            })
            .collect())
    }
}

struct MemorySink {
    key: String,
    buf: Vec<u8>,
    map: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl TarballSink for MemorySink {
    fn commit(&mut self) -> Result<()> {
        self.map
            .lock()
            .unwrap()
            .insert(self.key.clone(), std::mem::take(&mut self.buf));
        Ok(())
    }

    fn abort(&mut self) {
        self.buf.clear();
    }
}

pub enum FakeResponse {
    NotFound,
    Offline,
    NotModified,
    Doc(Value),
}

pub struct FakeUplink {
    id: String,
    max_age: Duration,
    url_prefix: String,
    response: Mutex<FakeResponse>,
    tarballs: Mutex<HashMap<String, Vec<u8>>>,
    search_result: Mutex<Value>,
    fetch_calls: AtomicUsize,
    url_calls: AtomicUsize,
}

impl FakeUplink {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            max_age: Duration::from_secs(120),
            url_prefix: format!("https://{id}.example/"),
            response: Mutex::new(FakeResponse::NotFound),
            tarballs: Mutex::new(HashMap::new()),
            search_result: Mutex::new(json!({})),
            fetch_calls: AtomicUsize::new(0),
            url_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_doc(self, doc: Value) -> Self {
        *self.response.lock().unwrap() = FakeResponse::Doc(doc);
        self
    }

    pub fn offline(self) -> Self {
        *self.response.lock().unwrap() = FakeResponse::Offline;
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_tarball(self, url: &str, bytes: &[u8]) -> Self {
        self.tarballs
            .lock()
            .unwrap()
            .insert(url.to_string(), bytes.to_vec());
        self
    }

    pub fn with_search_result(self, result: Value) -> Self {
        *self.search_result.lock().unwrap() = result;
        self
    }

    pub fn set_response(&self, response: FakeResponse) {
        *self.response.lock().unwrap() = response;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn url_count(&self) -> usize {
        self.url_calls.load(Ordering::SeqCst)
    }
}

impl UplinkClient for FakeUplink {
    fn id(&self) -> &str {
        &self.id
    }

    fn max_age(&self) -> Duration {
        self.max_age
    }

    fn fetch_package(
        &self,
        name: &str,
        _etag: Option<&str>,
    ) -> std::result::Result<FetchOutcome, UplinkError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        match &*self.response.lock().unwrap() {
            FakeResponse::NotFound => Err(UplinkError::HttpStatus {
                status: 404,
                url: format!("{}{}", self.url_prefix, name),
            }),
            FakeResponse::Offline => Err(UplinkError::HttpStatus {
                status: 503,
                url: format!("{}{}", self.url_prefix, name),
            }),
            FakeResponse::NotModified => Ok(FetchOutcome::NotModified),
            FakeResponse::Doc(doc) => Ok(FetchOutcome::Fetched {
                etag: Some(format!("\"{}-etag\"", self.id)),
                body: doc.clone(),
            }),
        }
    }

    fn fetch_url(&self, url: &str) -> std::result::Result<RemoteStream, UplinkError> {
        self.url_calls.fetch_add(1, Ordering::SeqCst);
        let bytes = self
            .tarballs
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(UplinkError::HttpStatus {
                status: 404,
                url: url.to_string(),
            })?;

        Ok(RemoteStream {
            length: Some(bytes.len() as u64),
            reader: Box::new(Cursor::new(bytes)),
        })
    }

    fn can_fetch_url(&self, url: &str) -> bool {
        url.starts_with(&self.url_prefix)
    }

    fn search(&self, _startkey: &str) -> std::result::Result<Value, UplinkError> {
        Ok(self.search_result.lock().unwrap().clone())
    }
}

/// Builds an npm-style remote document with tarball dist URLs under the
/// given uplink prefix.
pub fn remote_doc(prefix: &str, name: &str, versions: &[&str], tags: &[(&str, &str)]) -> Value {
    let mut version_map = serde_json::Map::new();
    for version in versions {
        version_map.insert(
            version.to_string(),
            json!({
                "name": name,
                "version": version,
                "description": format!("{name} {version}"),
                "dist": {
                    "tarball": format!("{prefix}{name}/-/{name}-{version}.tgz"),
                    "shasum": format!("shasum-{version}")
                }
            }),
        );
    }

    let mut tag_map = serde_json::Map::new();
    for (tag, version) in tags {
        tag_map.insert(tag.to_string(), json!(version));
    }

    json!({
        "name": name,
        "versions": version_map,
        "dist-tags": tag_map,
        "readme": format!("{name} readme")
    })
}
