//! Filesystem storage for uploaded model content
//!
//! Content is written flat under a single uploads directory, one file per
//! record, named by the record's generated storage name. Names that could
//! escape the directory are rejected.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::core::config::StorageConfig;
use crate::core::error::{AppError, Result};

/// Local directory storage client
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create the storage client, making sure the uploads directory exists
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        fs::create_dir_all(&config.uploads_dir).await?;

        info!(
            "Local storage initialized at {}",
            config.uploads_dir.display()
        );

        Ok(Self {
            root: config.uploads_dir.clone(),
        })
    }

    #[cfg(test)]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a storage name to a path inside the uploads directory
    fn path_for(&self, storage_name: &str) -> Result<PathBuf> {
        let mut components = Path::new(storage_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(storage_name)),
            _ => Err(AppError::Internal(format!(
                "Invalid storage name: {:?}",
                storage_name
            ))),
        }
    }

    /// Write new content. Never overwrites: an existing name is a conflict.
    pub async fn write(&self, storage_name: &str, data: &[u8]) -> Result<()> {
        let path = self.path_for(storage_name)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => {
                    AppError::Conflict(format!("Stored content already exists: {}", storage_name))
                }
                _ => AppError::Storage(e),
            })?;

        fill_or_discard(file, &path, data).await?;

        debug!(
            storage_name = %storage_name,
            size = data.len(),
            "Stored file content"
        );
        Ok(())
    }

    pub async fn exists(&self, storage_name: &str) -> Result<bool> {
        let path = self.path_for(storage_name)?;
        Ok(fs::try_exists(&path).await?)
    }

    /// Open stored content for streaming, with its length in bytes.
    /// Missing content is `None`.
    pub async fn open(&self, storage_name: &str) -> Result<Option<(File, u64)>> {
        let path = self.path_for(storage_name)?;

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata().await?.len();

        Ok(Some((file, len)))
    }

    /// Remove stored content. Returns whether anything was removed.
    pub async fn delete(&self, storage_name: &str) -> Result<bool> {
        let path = self.path_for(storage_name)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(storage_name = %storage_name, "Removed file content");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write all of `data` to a freshly created file. On failure the file at
/// `path` is removed so no partial content is left behind.
async fn fill_or_discard<W>(mut writer: W, path: &Path, data: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written: std::io::Result<()> = async {
        writer.write_all(data).await?;
        writer.flush().await
    }
    .await;
    drop(writer);

    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(path).await {
            warn!(
                path = %path.display(),
                error = %cleanup,
                "Failed to remove partially written content"
            );
        }
        return Err(AppError::Storage(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    async fn storage() -> (tempfile::TempDir, LocalStorage) {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            uploads_dir: dir.path().join("uploads"),
        };
        let storage = LocalStorage::new(&config).await.unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn test_new_creates_directory() {
        let (_dir, storage) = storage().await;
        assert!(storage.root().is_dir());
    }

    #[tokio::test]
    async fn test_write_open_delete() {
        let (_dir, storage) = storage().await;

        storage.write("abc.stl", b"solid cube").await.unwrap();
        assert!(storage.exists("abc.stl").await.unwrap());

        let (mut file, len) = storage.open("abc.stl").await.unwrap().unwrap();
        assert_eq!(len, 10);
        let mut content = String::new();
        file.read_to_string(&mut content).await.unwrap();
        assert_eq!(content, "solid cube");

        assert!(storage.delete("abc.stl").await.unwrap());
        assert!(!storage.exists("abc.stl").await.unwrap());
        assert!(!storage.delete("abc.stl").await.unwrap());
        assert!(storage.open("abc.stl").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_never_overwrites() {
        let (_dir, storage) = storage().await;

        storage.write("same.3mf", b"first").await.unwrap();
        let result = storage.write("same.3mf", b"second").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_failed_write_removes_partial_file() {
        let (_dir, storage) = storage().await;
        let path = storage.root().join("partial.stl");
        fs::write(&path, b"sol").await.unwrap();

        // Writes into a duplex half fail once the other half is gone
        let (writer, reader) = tokio::io::duplex(8);
        drop(reader);

        let result = fill_or_discard(writer, &path, b"solid cube").await;
        assert!(matches!(result, Err(AppError::Storage(_))));
        assert!(!fs::try_exists(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_names_outside_root() {
        let (_dir, storage) = storage().await;

        for name in ["../escape.stl", "nested/file.stl", "/etc/passwd", "", ".."] {
            assert!(
                storage.write(name, b"x").await.is_err(),
                "accepted {:?}",
                name
            );
        }
    }
}
