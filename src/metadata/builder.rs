use tracing::debug;

use crate::maven::coordinates::{ArtifactVersion, MavenArtifactId, MavenGroupId};
use crate::maven::metadata_xml::{
    Metadata, Plugin, Plugins, Snapshot, SnapshotVersion, SnapshotVersions, Versioning, Versions,
};
use crate::maven::paths::SnapshotInstance;
use crate::maven::RepositoryPolicy;
use crate::metadata::scanner::VersionDirScan;

/// Which level of metadata a descriptor describes. Always passed explicitly
/// at API boundaries, never inferred from ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKind {
    ArtifactRoot,
    SnapshotVersion,
    PluginRoot,
}

/// Builds the artifact-root descriptor: the version listing with its
/// `latest` and `release` pointers.
///
/// Directory names that do not parse as versions are skipped - they do not
/// fail the build. Output is sorted before emission, so the result is
/// independent of traversal order.
pub fn build_artifact_root(
    kind: MetadataKind,
    group_id: &MavenGroupId,
    artifact_id: &MavenArtifactId,
    version_dirs: &[String],
    policy: RepositoryPolicy,
    last_updated: &str,
) -> Metadata {
    let mut versions: Vec<ArtifactVersion> = version_dirs
        .iter()
        .filter_map(|name| {
            let parsed = ArtifactVersion::parse(name);
            if parsed.is_none() {
                debug!("{}: directory {} is not a version, skipping", artifact_id.0, name);
            }
            parsed
        })
        .collect();
    versions.sort();
    versions.dedup();

    let latest = versions.last().map(|v| v.as_str().to_string());
    let release = if policy.allows_release_pointer() {
        versions
            .iter()
            .filter(|v| !v.is_snapshot())
            .max()
            .map(|v| v.as_str().to_string())
    } else {
        None
    };

    let plugins = match kind {
        MetadataKind::PluginRoot => Some(Plugins {
            plugin: vec![Plugin {
                name: None,
                prefix: plugin_prefix(&artifact_id.0),
                artifact_id: artifact_id.0.clone(),
            }],
        }),
        _ => None,
    };

    Metadata {
        group_id: group_id.0.clone(),
        artifact_id: artifact_id.0.clone(),
        version: None,
        versioning: Versioning {
            latest,
            release,
            versions: Some(Versions {
                version: versions.iter().map(|v| v.as_str().to_string()).collect(),
            }),
            last_updated: last_updated.to_string(),
            snapshot: None,
            snapshot_versions: None,
        },
        plugins,
    }
}

/// Builds the version-level descriptor of a snapshot base version from the
/// grouped filename evidence: the `snapshot` block names the most recent
/// instance overall, and `snapshotVersions` lists every instance, grouped by
/// (extension, classifier) and ascending within each group so the tail entry
/// of a group is that combination's resolved version.
///
/// Returns `None` when no timestamped instances exist - there is nothing to
/// describe at this level.
pub fn build_snapshot_version(
    group_id: &MavenGroupId,
    artifact_id: &MavenArtifactId,
    base: &ArtifactVersion,
    scan: &VersionDirScan,
    last_updated: &str,
) -> Option<Metadata> {
    if !scan.has_snapshot_instances() {
        return None;
    }

    let mut snapshot_versions = Vec::new();
    let mut most_recent: Option<&SnapshotInstance> = None;

    let ordered_groups: Vec<Vec<&SnapshotInstance>> =
        scan.groups.values().map(|group| order_group(group)).collect();

    for group in &ordered_groups {
        for &instance in group {
            if most_recent.map(|m| m.ordinal() < instance.ordinal()).unwrap_or(true) {
                most_recent = Some(instance);
            }
            snapshot_versions.push(SnapshotVersion {
                classifier: instance.classifier.as_option().map(str::to_string),
                extension: instance.extension.clone(),
                value: instance.resolved_version(base),
                updated: instance.timestamp.replace('.', ""),
            });
        }
    }

    let most_recent = most_recent?;

    Some(Metadata {
        group_id: group_id.0.clone(),
        artifact_id: artifact_id.0.clone(),
        version: Some(base.as_str().to_string()),
        versioning: Versioning {
            latest: None,
            release: None,
            versions: None,
            last_updated: last_updated.to_string(),
            snapshot: Some(Snapshot {
                timestamp: most_recent.timestamp.clone(),
                build_number: most_recent.build_number,
            }),
            snapshot_versions: Some(SnapshotVersions {
                snapshot_version: snapshot_versions,
            }),
        },
        plugins: None,
    })
}

/// Ascending (buildNumber, timestamp) order within one (extension,
/// classifier) group. An exact duplicate of the pair is the same upload seen
/// twice; the one encountered last wins.
fn order_group(group: &[SnapshotInstance]) -> Vec<&SnapshotInstance> {
    let mut ordered: Vec<&SnapshotInstance> = Vec::new();
    for instance in group {
        ordered.retain(|existing| existing.ordinal() != instance.ordinal());
        ordered.push(instance);
    }
    ordered.sort_by(|a, b| a.ordinal().cmp(&b.ordinal()));
    ordered
}

/// The goal prefix a plugin-aggregation descriptor advertises, derived from
/// the artifact id the way Maven derives it: `maven-dependency-plugin` and
/// `dependency-maven-plugin` both map to `dependency`.
pub fn plugin_prefix(artifact_id: &str) -> String {
    let stripped = artifact_id
        .strip_suffix("-maven-plugin")
        .or_else(|| artifact_id.strip_suffix("-plugin"))
        .unwrap_or(artifact_id);
    let stripped = stripped.strip_prefix("maven-").unwrap_or(stripped);
    stripped.to_string()
}

#[cfg(test)]
mod test {
    use rstest::*;

    use crate::maven::coordinates::MavenClassifier;

    use super::*;

    const STAMP: &str = "20231005115330";

    fn group_id() -> MavenGroupId {
        MavenGroupId("org.example".to_string())
    }

    fn artifact_id() -> MavenArtifactId {
        MavenArtifactId("foo".to_string())
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn instance(timestamp: &str, build_number: u32, classifier: Option<&str>, extension: &str) -> SnapshotInstance {
        SnapshotInstance {
            timestamp: timestamp.to_string(),
            build_number,
            classifier: MavenClassifier::from_option(classifier),
            extension: extension.to_string(),
        }
    }

    #[test]
    fn test_release_latest_and_release_pointers() {
        let metadata = build_artifact_root(
            MetadataKind::ArtifactRoot,
            &group_id(),
            &artifact_id(),
            &strings(&["3.2", "3.1"]),
            RepositoryPolicy::Release,
            STAMP,
        );

        assert_eq!(metadata.versioning.latest.as_deref(), Some("3.2"));
        assert_eq!(metadata.versioning.release.as_deref(), Some("3.2"));
        assert_eq!(
            metadata.versioning.versions.unwrap().version,
            vec!["3.1", "3.2"]
        );
    }

    #[test]
    fn test_snapshot_versions_count_for_latest_but_not_release() {
        let metadata = build_artifact_root(
            MetadataKind::ArtifactRoot,
            &group_id(),
            &artifact_id(),
            &strings(&["1.0", "1.1-SNAPSHOT"]),
            RepositoryPolicy::Mixed,
            STAMP,
        );

        assert_eq!(metadata.versioning.latest.as_deref(), Some("1.1-SNAPSHOT"));
        assert_eq!(metadata.versioning.release.as_deref(), Some("1.0"));
    }

    #[test]
    fn test_snapshot_policy_never_emits_release() {
        let metadata = build_artifact_root(
            MetadataKind::ArtifactRoot,
            &group_id(),
            &artifact_id(),
            &strings(&["3.0.1-SNAPSHOT", "3.0.2-SNAPSHOT", "3.1-SNAPSHOT"]),
            RepositoryPolicy::Snapshot,
            STAMP,
        );

        assert_eq!(metadata.versioning.latest.as_deref(), Some("3.1-SNAPSHOT"));
        assert_eq!(metadata.versioning.release, None);
    }

    #[test]
    fn test_unparseable_version_dirs_are_skipped() {
        let metadata = build_artifact_root(
            MetadataKind::ArtifactRoot,
            &group_id(),
            &artifact_id(),
            &strings(&["3.1", ".cache", "not-a-version"]),
            RepositoryPolicy::Release,
            STAMP,
        );

        assert_eq!(metadata.versioning.versions.unwrap().version, vec!["3.1"]);
    }

    #[test]
    fn test_build_is_independent_of_traversal_order() {
        let a = build_artifact_root(
            MetadataKind::ArtifactRoot,
            &group_id(),
            &artifact_id(),
            &strings(&["3.10", "3.2", "3.9"]),
            RepositoryPolicy::Release,
            STAMP,
        );
        let b = build_artifact_root(
            MetadataKind::ArtifactRoot,
            &group_id(),
            &artifact_id(),
            &strings(&["3.9", "3.10", "3.2"]),
            RepositoryPolicy::Release,
            STAMP,
        );

        assert_eq!(a, b);
        assert_eq!(a.versioning.latest.as_deref(), Some("3.10"));
    }

    #[test]
    fn test_plugin_root_carries_plugins_block() {
        let metadata = build_artifact_root(
            MetadataKind::PluginRoot,
            &group_id(),
            &MavenArtifactId("maven-dependency-plugin".to_string()),
            &strings(&["1.0"]),
            RepositoryPolicy::Release,
            STAMP,
        );

        let plugins = metadata.plugins.unwrap();
        assert_eq!(plugins.plugin.len(), 1);
        assert_eq!(plugins.plugin[0].prefix, "dependency");
        assert_eq!(plugins.plugin[0].artifact_id, "maven-dependency-plugin");
    }

    #[rstest]
    #[case("maven-dependency-plugin", "dependency")]
    #[case("dependency-maven-plugin", "dependency")]
    #[case("sonar-plugin", "sonar")]
    #[case("plain", "plain")]
    fn test_plugin_prefix(#[case] artifact_id: &str, #[case] expected: &str) {
        assert_eq!(plugin_prefix(artifact_id), expected);
    }

    #[test]
    fn test_snapshot_version_descriptor() {
        let base = ArtifactVersion::parse("2.1-SNAPSHOT").unwrap();
        let mut scan = VersionDirScan::default();
        scan.groups.insert(
            ("jar".to_string(), MavenClassifier::Unclassified),
            vec![
                instance("20231006.100000", 2, None, "jar"),
                instance("20231005.115330", 1, None, "jar"),
            ],
        );
        scan.groups.insert(
            ("pom".to_string(), MavenClassifier::Unclassified),
            vec![instance("20231006.100000", 2, None, "pom")],
        );

        let metadata =
            build_snapshot_version(&group_id(), &artifact_id(), &base, &scan, STAMP).unwrap();

        assert_eq!(metadata.version.as_deref(), Some("2.1-SNAPSHOT"));
        let snapshot = metadata.versioning.snapshot.as_ref().unwrap();
        assert_eq!(snapshot.timestamp, "20231006.100000");
        assert_eq!(snapshot.build_number, 2);

        let entries = &metadata.versioning.snapshot_versions.as_ref().unwrap().snapshot_version;
        assert_eq!(entries.len(), 3);
        // jar group comes first, ascending - its tail is the most recent jar
        assert_eq!(entries[0].value, "2.1-20231005.115330-1");
        assert_eq!(entries[1].value, "2.1-20231006.100000-2");
        assert_eq!(entries[1].updated, "20231006100000");
        assert_eq!(entries[2].extension, "pom");
    }

    #[test]
    fn test_snapshot_recency_is_build_number_then_timestamp() {
        let base = ArtifactVersion::parse("2.1-SNAPSHOT").unwrap();
        let mut scan = VersionDirScan::default();
        // arrival order deliberately puts the most recent build first
        scan.groups.insert(
            ("jar".to_string(), MavenClassifier::Unclassified),
            vec![
                instance("20231001.000000", 7, None, "jar"),
                instance("20231009.000000", 3, None, "jar"),
            ],
        );

        let metadata =
            build_snapshot_version(&group_id(), &artifact_id(), &base, &scan, STAMP).unwrap();

        let snapshot = metadata.versioning.snapshot.unwrap();
        assert_eq!(snapshot.build_number, 7);
        assert_eq!(snapshot.timestamp, "20231001.000000");
    }

    #[test]
    fn test_duplicate_instance_is_benign() {
        let base = ArtifactVersion::parse("2.1-SNAPSHOT").unwrap();
        let mut scan = VersionDirScan::default();
        scan.groups.insert(
            ("jar".to_string(), MavenClassifier::Unclassified),
            vec![
                instance("20231005.115330", 1, None, "jar"),
                instance("20231005.115330", 1, None, "jar"),
            ],
        );

        let metadata =
            build_snapshot_version(&group_id(), &artifact_id(), &base, &scan, STAMP).unwrap();

        let entries = metadata.versioning.snapshot_versions.unwrap().snapshot_version;
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_no_instances_means_no_descriptor() {
        let base = ArtifactVersion::parse("2.1-SNAPSHOT").unwrap();
        let scan = VersionDirScan::default();

        assert!(build_snapshot_version(&group_id(), &artifact_id(), &base, &scan, STAMP).is_none());
    }
}
