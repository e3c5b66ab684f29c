//! The filesystem interface every backend and view implements.
//!
//! Path-based, no inodes, explicit offset/size. Open files are tracked on
//! the caller side by [`FileHandle`](crate::FileHandle).

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::types::{DirEntry, FileAttr, SetAttr, StatFs};
use super::VfsResult;

/// A path-addressed filesystem.
///
/// Implementations must be safe to share between any number of confined
/// views and tasks; nothing above this trait serialises access to it.
#[async_trait]
pub trait VfsOps: Send + Sync {
    /// Human-readable name of this filesystem.
    fn name(&self) -> String;

    // ========================================================================
    // Reading
    // ========================================================================

    /// Get file attributes, following a trailing symlink.
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr>;

    /// Get attributes without following a trailing symlink, where the
    /// backend can tell the difference.
    ///
    /// The returned flag is true when the lookup really was an lstat. The
    /// default falls back to [`getattr`](Self::getattr) and reports false.
    async fn lstat_if_possible(&self, path: &Path) -> VfsResult<(FileAttr, bool)> {
        Ok((self.getattr(path).await?, false))
    }

    /// Read directory entries, sorted by name.
    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>>;

    /// Read up to `size` bytes starting at `offset`; short at end of file.
    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>>;

    /// The stored target of the link at `path`.
    async fn readlink(&self, path: &Path) -> VfsResult<PathBuf>;

    // ========================================================================
    // Writing
    // ========================================================================

    /// Write `data` at `offset`, returning the number of bytes written.
    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> VfsResult<u32>;

    /// Create a new, empty file. Fails if something already exists there.
    async fn create(&self, path: &Path, mode: u32) -> VfsResult<FileAttr>;

    /// Create a directory and any missing parents.
    async fn mkdir(&self, path: &Path, mode: u32) -> VfsResult<FileAttr>;

    /// Remove a file or symlink.
    async fn unlink(&self, path: &Path) -> VfsResult<()>;

    /// Remove a directory, which must be empty.
    async fn rmdir(&self, path: &Path) -> VfsResult<()>;

    /// Move `from` to `to`, replacing a file at `to`.
    async fn rename(&self, from: &Path, to: &Path) -> VfsResult<()>;

    /// Shrink or zero-extend a file to `size` bytes.
    async fn truncate(&self, path: &Path, size: u64) -> VfsResult<()>;

    async fn setattr(&self, path: &Path, attr: SetAttr) -> VfsResult<FileAttr>;

    /// Create a symlink at `path` pointing to `target`.
    async fn symlink(&self, path: &Path, target: &Path) -> VfsResult<FileAttr>;

    // ========================================================================
    // Metadata
    // ========================================================================

    /// True when every mutation fails with [`VfsError::ReadOnly`](super::VfsError::ReadOnly).
    fn read_only(&self) -> bool;

    async fn statfs(&self) -> VfsResult<StatFs>;

    // ========================================================================
    // Provided
    // ========================================================================

    async fn exists(&self, path: &Path) -> bool {
        self.getattr(path).await.is_ok()
    }

    /// Whole-file read. Files over 4 GiB are refused.
    async fn read_all(&self, path: &Path) -> VfsResult<Vec<u8>> {
        let attr = self.getattr(path).await?;
        let size = u32::try_from(attr.size)
            .map_err(|_| super::VfsError::other(format!("file too large: {}", path.display())))?;
        self.read(path, 0, size).await
    }

    /// Replace the entire contents of a file, creating it if needed.
    async fn write_all(&self, path: &Path, data: &[u8]) -> VfsResult<()> {
        if self.exists(path).await {
            self.truncate(path, 0).await?;
        } else {
            self.create(path, super::types::DEFAULT_FILE_MODE).await?;
        }
        self.write(path, 0, data).await?;
        Ok(())
    }
}
