use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::maven::coordinates::ArtifactVersion;
use crate::maven::paths::{coordinates_of, parse_resolved_snapshot};
use crate::maven::Repository;
use crate::metadata::builder::{build_artifact_root, build_snapshot_version, MetadataKind};
use crate::metadata::error::{MetadataError, NodeFailure, RebuildReport};
use crate::metadata::locks::PathLocks;
use crate::metadata::now_stamp;
use crate::metadata::remove::{remove_snapshot_instance, remove_version_from_root};
use crate::metadata::scanner::{discover_artifact_roots, list_dir, scan_version_dir, DiscoveredRoot};
use crate::metadata::store::MetadataStore;

/// How many artifact roots a recursive rebuild works on at once.
const CONCURRENT_NODE_BUILDS: usize = 8;

/// The metadata consistency engine: rebuilds descriptors from what is
/// physically stored, and incrementally retracts versions from them.
///
/// The engine is stateless between calls; the descriptor files are the only
/// shared mutable resource, and every read-modify-write of one happens under
/// that path's lock.
pub struct MetadataEngine {
    store: Arc<dyn MetadataStore>,
    locks: PathLocks,
}

impl MetadataEngine {
    pub fn new(store: Arc<dyn MetadataStore>) -> MetadataEngine {
        MetadataEngine {
            store,
            locks: PathLocks::default(),
        }
    }

    pub fn with_lock_wait(store: Arc<dyn MetadataStore>, max_wait: Duration) -> MetadataEngine {
        MetadataEngine {
            store,
            locks: PathLocks::new(max_wait),
        }
    }

    /// Rebuilds the descriptors of every artifact root at or below
    /// `base_path` (the whole repository when absent). A pure recomputation:
    /// stale descriptor content at a touched node is replaced, never merged.
    /// Sibling nodes are built concurrently and fail independently; a
    /// cancellation stops launching new node builds but never leaves a
    /// half-written descriptor behind.
    pub async fn rebuild(
        &self,
        repository: &Repository,
        base_path: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<RebuildReport, MetadataError> {
        let rel_base = sanitize_rel_path(base_path.unwrap_or(""))?;
        let abs_base = repository.basedir.join(&rel_base);

        let (roots, discovery_failures) = discover_artifact_roots(&abs_base, &rel_base).await;

        let mut report = RebuildReport {
            failures: discovery_failures,
            ..Default::default()
        };

        let outcomes = futures::stream::iter(roots.into_iter().map(|root| async move {
            if cancel.is_cancelled() {
                return (root.rel_path, None);
            }
            let outcome = self.build_root(repository, &root).await;
            (root.rel_path, Some(outcome))
        }))
        .buffer_unordered(CONCURRENT_NODE_BUILDS)
        .collect::<Vec<_>>()
        .await;

        for (path, outcome) in outcomes {
            match outcome {
                None => report.cancelled += 1,
                Some(Ok(())) => report.built.push(path),
                Some(Err(error)) => {
                    warn!("failed to rebuild metadata at {}: {}", path.display(), error);
                    report.failures.push(NodeFailure { path, error });
                }
            }
        }

        report.built.sort();
        info!("rebuild of {}: {}", rel_base.display(), report);
        Ok(report)
    }

    /// Rebuilds one artifact root: its own version listing, plus one
    /// descriptor per snapshot version directory beneath it.
    async fn build_root(
        &self,
        repository: &Repository,
        root: &DiscoveredRoot,
    ) -> Result<(), MetadataError> {
        let _guard = self.locks.acquire(&root.rel_path).await?;

        let (group_id, artifact_id) =
            coordinates_of(&root.rel_path).ok_or_else(|| MetadataError::MalformedEntry {
                name: root.rel_path.to_string_lossy().into_owned(),
                reason: "an artifact root needs a group and an artifact segment".to_string(),
            })?;

        let kind = if repository.plugin_aggregation {
            MetadataKind::PluginRoot
        } else {
            MetadataKind::ArtifactRoot
        };

        let metadata = build_artifact_root(
            kind,
            &group_id,
            &artifact_id,
            &root.version_dirs,
            repository.policy,
            &now_stamp(),
        );
        self.store.write(&root.abs_path, &metadata).await?;

        for dir_name in &root.version_dirs {
            let version = match ArtifactVersion::parse(dir_name) {
                Some(v) if v.is_snapshot() => v,
                _ => continue,
            };

            let version_dir = root.abs_path.join(dir_name);
            let listing = match list_dir(&version_dir).await? {
                Some(listing) => listing,
                None => continue,
            };

            let scan = scan_version_dir(&artifact_id.0, &version, &listing.files);
            if let Some(metadata) =
                build_snapshot_version(&group_id, &artifact_id, &version, &scan, &now_stamp())
            {
                self.store.write(&version_dir, &metadata).await?;
            }
        }

        Ok(())
    }

    /// Retracts a version (artifact-root level) or one timestamped instance
    /// (snapshot-version level) from the descriptor at `artifact_path`,
    /// trusting the descriptor as the source of truth - the stored files are
    /// expected to be gone already.
    pub async fn remove_version(
        &self,
        repository: &Repository,
        artifact_path: &str,
        version: &str,
        classifier: Option<&str>,
        level: MetadataKind,
    ) -> Result<(), MetadataError> {
        let rel_root = sanitize_rel_path(artifact_path)?;

        let (rel_node, base_version) = match level {
            MetadataKind::ArtifactRoot | MetadataKind::PluginRoot => (rel_root.clone(), None),
            MetadataKind::SnapshotVersion => {
                let (base, _, _) = parse_resolved_snapshot(version).ok_or_else(|| {
                    MetadataError::IncompatibleRemoval {
                        path: rel_root.clone(),
                        version: version.to_string(),
                    }
                })?;
                let dir_name = format!("{}-SNAPSHOT", base);
                (rel_root.join(&dir_name), Some(dir_name))
            }
        };
        let abs_node = repository.basedir.join(&rel_node);

        // a rebuild holds the artifact root's lock while it writes the
        // version-level descriptors beneath it, so removals at either level
        // take the same key
        let _guard = self.locks.acquire(&rel_root).await?;

        let metadata = self
            .store
            .read(&abs_node)
            .await?
            .ok_or_else(|| MetadataError::NotFound(rel_node.clone()))?;

        let updated = match base_version {
            None => remove_version_from_root(
                &metadata,
                &rel_node,
                version,
                repository.policy,
                &now_stamp(),
            )?,
            Some(_) => {
                remove_snapshot_instance(&metadata, &rel_node, version, classifier, &now_stamp())?
            }
        };

        match updated {
            Some(updated) => self.store.write(&abs_node, &updated).await,
            None => {
                self.store.delete(&abs_node).await?;
                Ok(())
            }
        }
    }
}

/// Turns a caller-supplied coordinate path into a relative path that cannot
/// escape the repository root. Empty input means the root itself.
pub fn sanitize_rel_path(path: &str) -> Result<PathBuf, MetadataError> {
    let malformed = |reason: &str| MetadataError::MalformedEntry {
        name: path.to_string(),
        reason: reason.to_string(),
    };

    let mut result = PathBuf::new();
    for segment in path.split('/') {
        match segment {
            "" => continue,
            "." | ".." => return Err(malformed("path traversal is not allowed")),
            s if s.contains('\\') => return Err(malformed("invalid path segment")),
            s => result.push(s),
        }
    }
    Ok(result)
}
