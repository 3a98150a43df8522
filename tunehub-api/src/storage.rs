//! Content store for uploaded blobs
//!
//! Blobs live under `<root>/<kind>/<uuid>.<ext>`. Callers only ever see the
//! relative path, which is what the catalog stores.

use std::io::SeekFrom;
use std::path::{Component, Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    Audio,
    Artwork,
}

impl BlobKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            BlobKind::Audio => "audio",
            BlobKind::Artwork => "artwork",
        }
    }
}

/// A blob written by [`ContentStore::write`]
#[derive(Debug, Clone)]
pub struct StoredBlob {
    /// Path relative to the content root, with forward slashes
    pub relative_path: String,
    pub absolute_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` under a fresh random name
    pub async fn write(
        &self,
        kind: BlobKind,
        extension: &str,
        bytes: &[u8],
    ) -> std::io::Result<StoredBlob> {
        let relative_path = format!("{}/{}.{}", kind.dir_name(), Uuid::new_v4(), extension);
        let absolute_path = self.root.join(&relative_path);

        if let Some(parent) = absolute_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&absolute_path, bytes).await?;

        tracing::debug!(path = %relative_path, bytes = bytes.len(), "Stored blob");

        Ok(StoredBlob {
            relative_path,
            absolute_path,
        })
    }

    pub async fn delete(&self, relative_path: &str) -> std::io::Result<()> {
        let path = self.resolve(relative_path)?;
        tokio::fs::remove_file(&path).await?;
        tracing::debug!(path = %relative_path, "Deleted blob");
        Ok(())
    }

    /// Size of a stored blob in bytes
    pub async fn len(&self, relative_path: &str) -> std::io::Result<u64> {
        let path = self.resolve(relative_path)?;
        Ok(tokio::fs::metadata(&path).await?.len())
    }

    /// Read the inclusive byte range `start..=end`
    pub async fn read_range(
        &self,
        relative_path: &str,
        start: u64,
        end: u64,
    ) -> std::io::Result<Vec<u8>> {
        if end < start {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid byte range {}-{}", start, end),
            ));
        }

        let path = self.resolve(relative_path)?;
        let mut file = tokio::fs::File::open(&path).await?;
        file.seek(SeekFrom::Start(start)).await?;

        let mut buffer = Vec::with_capacity((end - start + 1) as usize);
        file.take(end - start + 1).read_to_end(&mut buffer).await?;
        Ok(buffer)
    }

    /// Map a stored relative path to an absolute one
    ///
    /// Only plain relative paths are accepted; absolute paths and `..`
    /// components are rejected so a catalog value can never escape the root.
    pub fn resolve(&self, relative_path: &str) -> std::io::Result<PathBuf> {
        let candidate = Path::new(relative_path);
        let is_plain = !relative_path.is_empty()
            && candidate
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

        if !is_plain {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("content path must be relative to the store: {}", relative_path),
            ));
        }

        Ok(self.root.join(candidate))
    }
}
