//! Merging remote metadata into the working document.
//!
//! Pure functions, no I/O. Local data is authoritative: a version already
//! known locally is never overwritten by remote data for the same version
//! string, since a remote cannot be trusted to re-serve it identically.

use semver::Version;

use crate::metadata::{DistFile, PackageMetadata, TagValue, TAG_LATEST};

/// Merges one remote document into the working document, in place.
///
/// New versions are copied over (and their tarball locations registered in
/// `_distfiles`); dist-tags accumulate candidates for later reconciliation;
/// the readme follows whichever source last updated `latest`, when that
/// source carries one.
pub fn merge_versions(local: &mut PackageMetadata, remote: &PackageMetadata) {
    for (version, body) in &remote.versions {
        if local.versions.contains_key(version) {
            continue;
        }
        register_distfile(local, body);
        local.versions.insert(version.clone(), body.clone());
    }

    let mut latest_changed = false;
    for (tag, value) in &remote.dist_tags {
        for candidate in value.candidates() {
            let changed = match local.dist_tags.get_mut(tag) {
                Some(existing) => existing.push_candidate(candidate),
                None => {
                    local
                        .dist_tags
                        .insert(tag.clone(), TagValue::One(candidate.to_string()));
                    true
                }
            };
            if changed && tag == TAG_LATEST {
                latest_changed = true;
            }
        }
    }

    if latest_changed && remote.readme.is_some() {
        local.readme = remote.readme.clone();
    }
}

/// Resolves every candidate-list tag to a single version string.
///
/// Among a tag's candidates, only versions that exist in the document and
/// parse as semver qualify; the semantically greatest one wins. A tag with
/// no qualifying candidate is dropped.
pub fn resolve_tags(doc: &mut PackageMetadata) {
    let mut dropped = Vec::new();

    for (tag, value) in doc.dist_tags.iter_mut() {
        let TagValue::Many(candidates) = value else {
            continue;
        };

        let best = candidates
            .iter()
            .filter(|v| doc.versions.contains_key(*v))
            .filter_map(|v| Version::parse(v).ok().map(|parsed| (parsed, v)))
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, v)| v.clone());

        match best {
            Some(winner) => *value = TagValue::One(winner),
            None => dropped.push(tag.clone()),
        }
    }

    for tag in dropped {
        doc.dist_tags.remove(&tag);
    }
}

/// The semantically greatest version key, ignoring unparseable ones.
pub fn latest_from_versions(doc: &PackageMetadata) -> Option<String> {
    doc.versions
        .keys()
        .filter_map(|v| Version::parse(v).ok().map(|parsed| (parsed, v)))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, v)| v.clone())
}

fn register_distfile(local: &mut PackageMetadata, version_body: &serde_json::Value) {
    let Some(dist) = version_body.get("dist") else {
        return;
    };
    let Some(url) = dist.get("tarball").and_then(|t| t.as_str()) else {
        return;
    };
    let Some(filename) = url.rsplit('/').next().filter(|f| !f.is_empty()) else {
        return;
    };

    let integrity = dist
        .get("shasum")
        .or_else(|| dist.get("integrity"))
        .and_then(|s| s.as_str())
        .map(String::from);

    local.distfiles.insert(
        filename.to_string(),
        DistFile {
            url: url.to_string(),
            integrity,
        },
    );
}
