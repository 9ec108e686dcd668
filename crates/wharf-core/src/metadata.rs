//! In-memory package metadata documents.
//!
//! [`PackageMetadata`] is the registry document this core shapes and merges.
//! It is owned on disk by the local store; the orchestration layer holds it
//! transiently during a sync pass. Dist-tags use a two-phase representation:
//! during a merge a tag may hold a candidate list ([`TagValue::Many`]), and
//! reconciliation resolves every tag back to a single version string before
//! the document is persisted or returned.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wharf_uplink::UplinkError;

/// The dist-tag `latest`.
pub const TAG_LATEST: &str = "latest";

/// Value of one dist-tag.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TagValue {
    /// Resolved: points at exactly one version.
    One(String),
    /// Candidate list accumulated while merging multiple sources.
    Many(Vec<String>),
}

impl TagValue {
    /// Appends a candidate, widening to a list if needed. Returns false if
    /// the version was already present.
    pub fn push_candidate(&mut self, version: &str) -> bool {
        match self {
            Self::One(existing) => {
                if existing == version {
                    return false;
                }
                *self = Self::Many(vec![existing.clone(), version.to_string()]);
                true
            }
            Self::Many(list) => {
                if list.iter().any(|v| v == version) {
                    return false;
                }
                list.push(version.to_string());
                true
            }
        }
    }

    /// The resolved version, if this tag is past reconciliation.
    pub fn as_resolved(&self) -> Option<&str> {
        match self {
            Self::One(v) => Some(v),
            Self::Many(_) => None,
        }
    }

    /// Last entry: the value itself, or the final candidate of a list.
    pub fn last(&self) -> Option<&str> {
        match self {
            Self::One(v) => Some(v),
            Self::Many(list) => list.last().map(String::as_str),
        }
    }

    pub fn candidates(&self) -> Vec<&str> {
        match self {
            Self::One(v) => vec![v.as_str()],
            Self::Many(list) => list.iter().map(String::as_str).collect(),
        }
    }
}

/// Cache bookkeeping for one uplink.
///
/// Refreshed only after a successful or not-modified response; untouched on
/// error or timeout. `fetched` is monotonically non-decreasing.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct UplinkSyncRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Epoch milliseconds of the last confirmed contact.
    pub fetched: u64,
}

impl UplinkSyncRecord {
    /// Advances `fetched` without regressing it.
    pub fn touch(&mut self, now: u64) {
        self.fetched = self.fetched.max(now);
    }
}

/// Location of one distribution file (tarball) known from an uplink.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DistFile {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
}

/// A registry package document.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PackageMetadata {
    pub name: String,

    #[serde(default)]
    pub versions: BTreeMap<String, serde_json::Value>,

    #[serde(rename = "dist-tags", default)]
    pub dist_tags: BTreeMap<String, TagValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,

    /// Per-uplink sync records, keyed by uplink identifier.
    #[serde(rename = "_uplinks", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub uplinks: BTreeMap<String, UplinkSyncRecord>,

    /// Known distribution files, keyed by filename.
    #[serde(rename = "_distfiles", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub distfiles: BTreeMap<String, DistFile>,

    /// Transient upload payloads; always emptied before returning to callers.
    #[serde(rename = "_attachments", default)]
    pub attachments: serde_json::Map<String, serde_json::Value>,
}

impl PackageMetadata {
    /// Empty skeleton for a package not yet seen anywhere.
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Validates and types a raw uplink response.
    ///
    /// A response is rejected when its name disagrees with the requested
    /// package or any version body is not an object. Rejection is a
    /// per-uplink error; it never aborts the sync pass.
    pub fn from_remote(name: &str, body: serde_json::Value) -> Result<Self, UplinkError> {
        let doc: Self = serde_json::from_value(body)
            .map_err(|err| UplinkError::MalformedResponse(err.to_string()))?;

        if doc.name != name {
            return Err(UplinkError::MalformedResponse(format!(
                "package name mismatch: requested '{}', got '{}'",
                name, doc.name
            )));
        }

        for (version, value) in &doc.versions {
            if version.is_empty() || !value.is_object() {
                return Err(UplinkError::MalformedResponse(format!(
                    "malformed version entry '{version}'"
                )));
            }
        }

        Ok(doc)
    }

    /// The resolved `latest` version string, if any.
    pub fn latest(&self) -> Option<&str> {
        self.dist_tags.get(TAG_LATEST).and_then(TagValue::last)
    }
}

/// Current time as epoch milliseconds.
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
