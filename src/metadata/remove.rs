use std::path::Path;

use crate::maven::coordinates::ArtifactVersion;
use crate::maven::metadata_xml::Metadata;
use crate::maven::paths::parse_resolved_snapshot;
use crate::maven::RepositoryPolicy;
use crate::metadata::error::MetadataError;

/// Retracts one version from an artifact-root descriptor and recomputes the
/// `latest`/`release` pointers from what remains, under the same rules the
/// builder applies. Returns a new descriptor value; `Ok(None)` means the
/// version set became empty and the descriptor should be deleted rather than
/// written empty.
///
/// This never rescans the filesystem - the descriptor plus the caller's
/// instruction are the source of truth. The caller is responsible for having
/// already deleted the stored files.
pub fn remove_version_from_root(
    metadata: &Metadata,
    dir: &Path,
    version: &str,
    policy: RepositoryPolicy,
    last_updated: &str,
) -> Result<Option<Metadata>, MetadataError> {
    let incompatible = || MetadataError::IncompatibleRemoval {
        path: dir.to_path_buf(),
        version: version.to_string(),
    };

    let mut updated = metadata.clone();
    let versions = updated.versioning.versions.as_mut().ok_or_else(incompatible)?;

    let before = versions.version.len();
    versions.version.retain(|v| v != version);
    if versions.version.len() == before {
        return Err(incompatible());
    }
    if versions.version.is_empty() {
        return Ok(None);
    }

    let remaining: Vec<ArtifactVersion> = versions
        .version
        .iter()
        .filter_map(|v| ArtifactVersion::parse(v))
        .collect();

    updated.versioning.latest = remaining.iter().max().map(|v| v.as_str().to_string());
    updated.versioning.release = if policy.allows_release_pointer() {
        remaining
            .iter()
            .filter(|v| !v.is_snapshot())
            .max()
            .map(|v| v.as_str().to_string())
    } else {
        None
    };
    updated.versioning.last_updated = last_updated.to_string();

    Ok(Some(updated))
}

/// Retracts one timestamped instance from a version-level descriptor. With a
/// classifier given, only that classifier's entries are touched; without
/// one, every entry resolving to the instance goes. The `snapshot` block
/// rolls back to the next-most-recent remaining instance by
/// (buildNumber, timestamp) ordering - never by arrival order.
pub fn remove_snapshot_instance(
    metadata: &Metadata,
    dir: &Path,
    resolved_version: &str,
    classifier: Option<&str>,
    last_updated: &str,
) -> Result<Option<Metadata>, MetadataError> {
    let incompatible = || MetadataError::IncompatibleRemoval {
        path: dir.to_path_buf(),
        version: resolved_version.to_string(),
    };

    let mut updated = metadata.clone();
    let snapshot_versions = updated
        .versioning
        .snapshot_versions
        .as_mut()
        .ok_or_else(incompatible)?;

    let before = snapshot_versions.snapshot_version.len();
    snapshot_versions.snapshot_version.retain(|sv| {
        let matches = sv.value == resolved_version
            && classifier.map_or(true, |c| sv.classifier.as_deref() == Some(c));
        !matches
    });
    if snapshot_versions.snapshot_version.len() == before {
        return Err(incompatible());
    }
    if snapshot_versions.snapshot_version.is_empty() {
        return Ok(None);
    }

    let most_recent = snapshot_versions
        .snapshot_version
        .iter()
        .filter_map(|sv| parse_resolved_snapshot(&sv.value))
        .max_by(|(_, ts_a, bn_a), (_, ts_b, bn_b)| (bn_a, ts_a).cmp(&(bn_b, ts_b)));

    updated.versioning.snapshot = most_recent.map(|(_, timestamp, build_number)| {
        crate::maven::metadata_xml::Snapshot {
            timestamp,
            build_number,
        }
    });
    updated.versioning.last_updated = last_updated.to_string();

    Ok(Some(updated))
}
