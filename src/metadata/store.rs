use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha1::{Digest, Sha1};
use tokio::fs::{create_dir_all, remove_file, rename, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::trace;
use uuid::Uuid;

use crate::maven::metadata_xml::Metadata;
use crate::metadata::error::MetadataError;

pub const METADATA_FILE_NAME: &str = "maven-metadata.xml";

/// Persistence seam for metadata documents. `dir` is always the directory of
/// the coordinate node the document describes; the store owns the file name
/// and the checksum companions within it.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// `Ok(None)` when no document exists at the node - absence is an
    /// answer, not an error.
    async fn read(&self, dir: &Path) -> Result<Option<Metadata>, MetadataError>;

    /// Atomic with respect to readers: a concurrent reader sees either the
    /// previous document or the new one, never a partial write. Also
    /// refreshes the `.md5`/`.sha1` companions of the serialized bytes.
    async fn write(&self, dir: &Path, metadata: &Metadata) -> Result<(), MetadataError>;

    async fn exists(&self, dir: &Path) -> Result<bool, MetadataError>;

    /// Removes the document and its companions. `Ok(false)` if there was
    /// none.
    async fn delete(&self, dir: &Path) -> Result<bool, MetadataError>;
}

pub struct FsMetadataStore;

impl FsMetadataStore {
    async fn publish(&self, target: &Path, bytes: &[u8]) -> Result<(), MetadataError> {
        // write-to-temp-then-rename so readers never observe a torn file
        let temp = target.with_file_name(format!(
            "{}.{}.tmp",
            target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Uuid::new_v4().as_hyphenated(),
        ));

        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp)
            .await
            .map_err(|e| MetadataError::storage(&temp, e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| MetadataError::storage(&temp, e))?;
        file.flush()
            .await
            .map_err(|e| MetadataError::storage(&temp, e))?;
        drop(file);

        rename(&temp, target)
            .await
            .map_err(|e| MetadataError::storage(target, e))
    }

    async fn remove_if_present(&self, path: &Path) -> Result<bool, MetadataError> {
        match remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(MetadataError::storage(path, e)),
        }
    }

    fn document_path(dir: &Path) -> PathBuf {
        dir.join(METADATA_FILE_NAME)
    }
}

#[async_trait]
impl MetadataStore for FsMetadataStore {
    async fn read(&self, dir: &Path) -> Result<Option<Metadata>, MetadataError> {
        let path = Self::document_path(dir);

        let document = match tokio::fs::read_to_string(&path).await {
            Ok(document) => document,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(MetadataError::storage(&path, e)),
        };

        Metadata::parse(&document)
            .map(Some)
            .map_err(|e| MetadataError::MalformedDocument {
                path,
                reason: e.to_string(),
            })
    }

    async fn write(&self, dir: &Path, metadata: &Metadata) -> Result<(), MetadataError> {
        let path = Self::document_path(dir);
        trace!("writing metadata document {}", path.display());

        let document = metadata.to_xml();
        let bytes = document.as_bytes();

        create_dir_all(dir)
            .await
            .map_err(|e| MetadataError::storage(dir, e))?;

        self.publish(&path, bytes).await?;

        let mut sha1_hasher: Sha1 = Default::default();
        sha1_hasher.update(bytes);
        let sha1_hex = hex::encode(sha1_hasher.finalize());
        let md5_hex = hex::encode(*md5::compute(bytes));

        self.publish(&path.with_extension("xml.sha1"), sha1_hex.as_bytes())
            .await?;
        self.publish(&path.with_extension("xml.md5"), md5_hex.as_bytes())
            .await?;

        Ok(())
    }

    async fn exists(&self, dir: &Path) -> Result<bool, MetadataError> {
        let path = Self::document_path(dir);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| MetadataError::storage(&path, e))
    }

    async fn delete(&self, dir: &Path) -> Result<bool, MetadataError> {
        let path = Self::document_path(dir);
        trace!("deleting metadata document {}", path.display());

        let existed = self.remove_if_present(&path).await?;
        self.remove_if_present(&path.with_extension("xml.sha1")).await?;
        self.remove_if_present(&path.with_extension("xml.md5")).await?;

        Ok(existed)
    }
}
