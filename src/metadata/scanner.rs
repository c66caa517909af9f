use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_recursion::async_recursion;
use tokio::fs::read_dir;
use tracing::warn;

use crate::maven::coordinates::{ArtifactVersion, MavenClassifier};
use crate::maven::paths::{parse_version_dir_entry, SnapshotInstance, VersionDirEntry};
use crate::metadata::error::{MetadataError, NodeFailure};

/// What a coordinate node looks like, judged purely by the names of its
/// direct children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Direct children include version directories.
    ArtifactRoot,
    /// A leaf holding artifact files, no further directory levels.
    VersionDir,
    /// A group-id prefix on the way down.
    Intermediate,
}

pub fn classify(child_dirs: &[String], child_files: &[String]) -> NodeKind {
    if child_dirs.iter().any(|d| ArtifactVersion::parse(d).is_some()) {
        NodeKind::ArtifactRoot
    } else if child_dirs.is_empty() && !child_files.is_empty() {
        NodeKind::VersionDir
    } else {
        NodeKind::Intermediate
    }
}

#[derive(Debug, Default)]
pub struct DirListing {
    pub dirs: Vec<String>,
    pub files: Vec<String>,
}

/// Lists the direct children of a directory, split into subdirectories and
/// files, sorted by name. A nonexistent path is an empty answer, not an
/// error - rebuilding over a subtree that is not there is a no-op.
pub async fn list_dir(path: &Path) -> Result<Option<DirListing>, MetadataError> {
    let mut entries = match read_dir(path).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(MetadataError::storage(path, e)),
    };

    let mut listing = DirListing::default();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let name = match entry.file_name().into_string() {
                    Ok(name) => name,
                    Err(name) => {
                        warn!("skipping non-UTF8 entry {:?} in {}", name, path.display());
                        continue;
                    }
                };
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| MetadataError::storage(path, e))?;
                if file_type.is_dir() {
                    listing.dirs.push(name);
                } else {
                    listing.files.push(name);
                }
            }
            Ok(None) => break,
            Err(e) => return Err(MetadataError::storage(path, e)),
        }
    }

    listing.dirs.sort();
    listing.files.sort();
    Ok(Some(listing))
}

/// The filename evidence found in one version directory.
#[derive(Debug, Default)]
pub struct VersionDirScan {
    /// At least one plain (non-timestamped) artifact file is present.
    pub has_release_artifact: bool,
    /// Timestamped snapshot instances, grouped by (extension, classifier).
    /// Each group is ordered as encountered; recency is decided later by
    /// (buildNumber, timestamp), never by arrival order.
    pub groups: BTreeMap<(String, MavenClassifier), Vec<SnapshotInstance>>,
    /// File names that failed to parse - skipped, never fatal.
    pub malformed: Vec<String>,
}

impl VersionDirScan {
    pub fn has_snapshot_instances(&self) -> bool {
        !self.groups.is_empty()
    }
}

/// Parses every stored file name in a version directory. Checksum companions
/// and metadata documents are not artifact evidence; anything else that fails
/// to parse is recorded as malformed and skipped.
pub fn scan_version_dir(
    artifact_id: &str,
    version: &ArtifactVersion,
    file_names: &[String],
) -> VersionDirScan {
    let mut scan = VersionDirScan::default();

    for file_name in file_names {
        if is_companion_file(file_name) {
            continue;
        }
        match parse_version_dir_entry(file_name, artifact_id, version) {
            Ok(VersionDirEntry::Release { .. }) => {
                scan.has_release_artifact = true;
            }
            Ok(VersionDirEntry::Snapshot(instance)) => {
                scan.groups
                    .entry((instance.extension.clone(), instance.classifier.clone()))
                    .or_default()
                    .push(instance);
            }
            Err(e) => {
                warn!("skipping malformed entry in {} {}: {}", artifact_id, version, e);
                scan.malformed.push(file_name.clone());
            }
        }
    }

    scan
}

fn is_companion_file(file_name: &str) -> bool {
    file_name.starts_with("maven-metadata.xml")
        || file_name.ends_with(".md5")
        || file_name.ends_with(".sha1")
        || file_name.ends_with(".tmp")
}

/// An artifact root found by recursive discovery, with its version directory
/// listing already in hand.
#[derive(Debug)]
pub struct DiscoveredRoot {
    pub abs_path: PathBuf,
    /// Relative to the repository root; derives the coordinates and keys the
    /// per-path lock.
    pub rel_path: PathBuf,
    /// Direct child directory names - version directory candidates.
    pub version_dirs: Vec<String>,
}

/// Depth-first discovery of every artifact root at or below a base path.
/// A base that is itself an artifact root yields exactly that node; its
/// version directories are never mistaken for further artifact roots.
/// Listing failures below the base are collected per node so one unreadable
/// subtree does not hide its siblings.
pub async fn discover_artifact_roots(
    base_abs: &Path,
    base_rel: &Path,
) -> (Vec<DiscoveredRoot>, Vec<NodeFailure>) {
    let mut roots = Vec::new();
    let mut failures = Vec::new();
    descend(base_abs, base_rel, &mut roots, &mut failures).await;
    (roots, failures)
}

#[async_recursion]
async fn descend(
    abs: &Path,
    rel: &Path,
    roots: &mut Vec<DiscoveredRoot>,
    failures: &mut Vec<NodeFailure>,
) {
    let listing = match list_dir(abs).await {
        Ok(Some(listing)) => listing,
        Ok(None) => return,
        Err(error) => {
            failures.push(NodeFailure {
                path: rel.to_path_buf(),
                error,
            });
            return;
        }
    };

    match classify(&listing.dirs, &listing.files) {
        NodeKind::ArtifactRoot => {
            roots.push(DiscoveredRoot {
                abs_path: abs.to_path_buf(),
                rel_path: rel.to_path_buf(),
                version_dirs: listing.dirs,
            });
        }
        NodeKind::VersionDir => {}
        NodeKind::Intermediate => {
            for dir in &listing.dirs {
                descend(&abs.join(dir), &rel.join(dir), roots, failures).await;
            }
        }
    }
}
