//! Filesystem blob storage.

use crate::error::{StorageError, StorageResult};
use bytes::Bytes;
use ember_core::FileName;
use futures::Stream;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// A boxed stream of bytes for streaming reads.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Default chunk size for streaming reads (64 KiB).
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Filesystem blob store, one file per record name directly under the root.
///
/// Keys are [`FileName`]s, whose grammar admits no path separators, so the
/// joined path can never leave the root.
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create a new blob store, creating the root directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn blob_path(&self, name: &FileName) -> PathBuf {
        self.root.join(name.as_str())
    }

    /// Write a blob atomically and return the byte count written.
    ///
    /// Data lands in a uuid-suffixed temp file, is fsynced, then renamed
    /// into place, so a crash mid-write never leaves a partial blob under
    /// the final name.
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn write(&self, name: &FileName, data: Bytes) -> StorageResult<u64> {
        let path = self.blob_path(name);
        let temp_path = path.with_file_name(format!("{}.tmp.{}", name.as_str(), Uuid::new_v4()));
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
        }
        fs::rename(&temp_path, &path).await?;
        Ok(data.len() as u64)
    }

    /// Open a blob as a chunked byte stream.
    ///
    /// The file handle is opened before this returns; on Unix the stream
    /// keeps serving even if the blob is unlinked while the caller drains
    /// it, which the download-exhaustion path relies on.
    #[instrument(skip(self))]
    pub async fn read_stream(&self, name: &FileName) -> StorageResult<ByteStream> {
        use tokio::io::AsyncReadExt;

        let path = self.blob_path(name);
        let file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(name.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;

        let stream = async_stream::try_stream! {
            let mut file = file;
            let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
            loop {
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                yield Bytes::copy_from_slice(&buf[..n]);
            }
        };

        Ok(Box::pin(stream))
    }

    /// Read a whole blob into memory.
    #[instrument(skip(self))]
    pub async fn read(&self, name: &FileName) -> StorageResult<Bytes> {
        let path = self.blob_path(name);
        let data = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(name.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self))]
    pub async fn exists(&self, name: &FileName) -> StorageResult<bool> {
        let path = self.blob_path(name);
        fs::try_exists(&path).await.map_err(StorageError::Io)
    }

    /// Delete a blob. A missing blob surfaces as [`StorageError::NotFound`].
    #[instrument(skip(self))]
    pub async fn delete(&self, name: &FileName) -> StorageResult<()> {
        let path = self.blob_path(name);
        fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(name.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;
        Ok(())
    }

    /// Verify the root directory exists and is accessible.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("blob root not accessible: {e}"),
            ))
        })?;

        if !metadata.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("blob root is not a directory: {:?}", self.root),
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn name(s: &str) -> FileName {
        FileName::new(s).unwrap()
    }

    #[tokio::test]
    async fn write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path()).await.unwrap();

        let key = name("hello.txt");
        let written = store.write(&key, Bytes::from("hello world")).await.unwrap();
        assert_eq!(written, 11);
        assert!(store.exists(&key).await.unwrap());

        let data = store.read(&key).await.unwrap();
        assert_eq!(data, Bytes::from("hello world"));
    }

    #[tokio::test]
    async fn write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path()).await.unwrap();

        store.write(&name("a"), Bytes::from("x")).await.unwrap();

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["a"]);
    }

    #[tokio::test]
    async fn read_stream_yields_full_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path()).await.unwrap();

        // Larger than one stream chunk to exercise the loop.
        let payload = vec![7u8; STREAM_CHUNK_SIZE + 123];
        let key = name("big.bin");
        store
            .write(&key, Bytes::from(payload.clone()))
            .await
            .unwrap();

        let mut stream = store.read_stream(&key).await.unwrap();
        let mut collected = Vec::new();
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(collected, payload);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn open_stream_survives_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path()).await.unwrap();

        let key = name("last-download");
        store.write(&key, Bytes::from("contents")).await.unwrap();

        let mut stream = store.read_stream(&key).await.unwrap();
        store.delete(&key).await.unwrap();

        let mut collected = Vec::new();
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(collected, b"contents");
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path()).await.unwrap();

        match store.delete(&name("ghost")).await {
            Err(StorageError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn health_check_ok_on_fresh_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().join("blobs")).await.unwrap();
        store.health_check().await.unwrap();
    }
}
