//! Blob filesystem backend.
//!
//! Blobs live at `{root}/{year}/{b1}/{b2}/{docId}/blob.{ext}` with a
//! transient `blob.tmp` sibling during upload. Writes are atomic: bytes go
//! to the temp file first and are renamed into place only after the last
//! byte and the digest are down.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use silo_core::{docid, Error, ObjectRecord, Result};

/// Filesystem backend rooted at a single directory.
#[derive(Debug, Clone)]
pub struct BlobFilesystem {
    root: PathBuf,
}

impl BlobFilesystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a DocId's blob and temp files.
    pub fn blob_dir(&self, doc_id: &str) -> Result<PathBuf> {
        docid::blob_dir(&self.root, doc_id).map_err(Error::Storage)
    }

    /// Final blob path for a catalog row.
    pub fn blob_path_for(&self, record: &ObjectRecord) -> Result<PathBuf> {
        let dir = self.blob_dir(&record.doc_id)?;
        Ok(docid::blob_path(&dir, record.storage_extension()))
    }

    /// Create the blob directory. Uses create-if-missing semantics so two
    /// writers racing on the same shard path both succeed.
    pub async fn ensure_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).await.map_err(|e| {
            warn!(
                subsystem = "store",
                component = "blobfs",
                blob_path = %dir.display(),
                error = %e,
                "create_dir_all failed"
            );
            Error::Io(e)
        })
    }

    /// Open the temp file for a fresh upload, with a guard that removes it
    /// (and prunes the then-empty directory) on any abandoned path.
    pub async fn create_temp(&self, dir: &Path) -> Result<(fs::File, TempGuard)> {
        let temp = docid::temp_path(dir);
        let file = fs::File::create(&temp).await?;
        let guard = TempGuard::new(temp, dir.to_path_buf());
        Ok((file, guard))
    }

    /// Atomically move a finished temp file to its final blob path and drop
    /// the execute bits.
    pub async fn promote(&self, temp: &Path, blob: &Path) -> Result<()> {
        fs::rename(temp, blob).await.map_err(|e| {
            warn!(
                subsystem = "store",
                component = "blobfs",
                op = "promote",
                from = %temp.display(),
                to = %blob.display(),
                error = %e,
                "rename failed"
            );
            Error::Io(e)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(blob, std::fs::Permissions::from_mode(0o644)).await?;
        }

        Ok(())
    }

    /// Open a committed blob for reading, with its size.
    ///
    /// A missing file while the catalog row exists is reported as a storage
    /// error, distinct from a missing row.
    pub async fn open_blob(&self, record: &ObjectRecord) -> Result<(fs::File, u64)> {
        let path = self.blob_path_for(record)?;
        let file = fs::File::open(&path).await.map_err(|e| {
            warn!(
                subsystem = "store",
                component = "blobfs",
                doc_id = %record.doc_id,
                blob_path = %path.display(),
                error = %e,
                "blob file missing or unreadable"
            );
            Error::Storage(format!("blob for {} unavailable: {}", record.doc_id, e))
        })?;
        let len = file.metadata().await?.len();
        Ok((file, len))
    }

    /// Best-effort removal of a blob file and its enclosing directory.
    ///
    /// Returns whether the file was removed; the directory is only pruned
    /// when empty (`remove_dir` refuses otherwise).
    pub async fn remove_blob(&self, record: &ObjectRecord) -> Result<bool> {
        let path = self.blob_path_for(record)?;
        let removed = match fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(Error::Io(e)),
        };
        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir(dir).await;
        }
        debug!(
            subsystem = "store",
            component = "blobfs",
            doc_id = %record.doc_id,
            blob_path = %path.display(),
            removed,
            "blob removal attempted"
        );
        Ok(removed)
    }

    /// Remove a blob at an explicit path (upload-race loser cleanup).
    pub async fn remove_path(&self, blob: &Path) {
        if let Err(e) = fs::remove_file(blob).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    subsystem = "store",
                    component = "blobfs",
                    blob_path = %blob.display(),
                    error = %e,
                    "blob cleanup failed"
                );
            }
        }
        if let Some(dir) = blob.parent() {
            let _ = fs::remove_dir(dir).await;
        }
    }

    /// Validate that the backend can write, read, and delete files.
    ///
    /// Performs a full round-trip at startup to catch filesystem issues
    /// (overlayfs quirks, permission errors, missing mounts) early.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.root.join(".health-check");
        let test_file = test_dir.join("test.bin");

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_back = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_back != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;
        let _ = fs::remove_dir(&test_dir).await;

        Ok(())
    }
}

/// RAII cleanup handle for a temp file.
///
/// Dropping an armed guard deletes the temp file and prunes the directory
/// if it ended up empty, covering error returns and dropped futures alike.
/// `disarm` is called right after the rename, after which failure paths no
/// longer touch the (already promoted) file.
#[derive(Debug)]
pub struct TempGuard {
    armed: Option<(PathBuf, PathBuf)>,
}

impl TempGuard {
    fn new(temp: PathBuf, dir: PathBuf) -> Self {
        Self {
            armed: Some((temp, dir)),
        }
    }

    /// The temp path this guard watches.
    pub fn temp_path(&self) -> Option<&Path> {
        self.armed.as_ref().map(|(temp, _)| temp.as_path())
    }

    /// Stop watching; the temp file has been renamed into place.
    pub fn disarm(&mut self) {
        self.armed = None;
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if let Some((temp, dir)) = self.armed.take() {
            let _ = std::fs::remove_file(&temp);
            let _ = std::fs::remove_dir(&dir);
        }
    }
}
