pub mod coordinates;
pub mod metadata_xml;
pub mod paths;

use std::path::PathBuf;

use serde::Deserialize;

/// Which kinds of versions a repository accepts. A snapshot repository never
/// exposes a `release` pointer in its metadata, even if a release-looking
/// version directory sneaks in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryPolicy {
    Release,
    Snapshot,
    Mixed,
}

impl RepositoryPolicy {
    pub fn allows_release_pointer(&self) -> bool {
        !matches!(self, RepositoryPolicy::Snapshot)
    }
}

/// One hosted repository: a directory tree of group/artifact/version
/// coordinates. Provisioning and the upload path are outside this crate;
/// the metadata engine only reads the layout and owns the
/// `maven-metadata.xml` files within it.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub basedir: PathBuf,
    pub policy: RepositoryPolicy,
    /// Artifact roots in this repository participate in a plugin-aggregation
    /// namespace, so their metadata carries a `<plugins>` block.
    #[serde(default)]
    pub plugin_aggregation: bool,
}
