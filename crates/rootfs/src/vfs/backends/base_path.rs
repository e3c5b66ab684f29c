//! Path-prefixing backend.
//!
//! Wraps another [`VfsOps`] and joins every path onto a fixed base
//! directory before forwarding. `base_path.read("src/main.rs")` with base
//! `/home/amy/project` reads `/home/amy/project/src/main.rs` on the source.
//!
//! The join is lexical. A result that lands outside the base is refused
//! with [`VfsError::PathEscapesRoot`]; symlinks are whatever the source
//! makes of them.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::path;
use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::ops::VfsOps;
use crate::vfs::types::{DirEntry, FileAttr, SetAttr, StatFs};

/// Forwards to `source` with every path rebased under `base`.
#[derive(Clone)]
pub struct BasePathBackend {
    source: Arc<dyn VfsOps>,
    base: PathBuf,
}

impl std::fmt::Debug for BasePathBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasePathBackend")
            .field("source", &self.source.name())
            .field("base", &self.base)
            .finish()
    }
}

impl BasePathBackend {
    pub fn new(source: Arc<dyn VfsOps>, base: impl Into<PathBuf>) -> Self {
        Self {
            source,
            base: path::clean(&base.into()),
        }
    }

    /// The (cleaned) base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The filesystem paths are forwarded to.
    pub fn source(&self) -> &Arc<dyn VfsOps> {
        &self.source
    }

    /// Map `name` to its path on the source filesystem.
    pub fn real_path(&self, name: &Path) -> VfsResult<PathBuf> {
        // Checked on `name` alone so a relative base such as `.` or `..`
        // still contains its joins.
        if !path::never_climbs(name) {
            return Err(VfsError::path_escapes_root(format!(
                "{} is not under {}",
                name.display(),
                self.base.display()
            )));
        }
        Ok(path::join(&self.base, name))
    }
}

#[async_trait]
impl VfsOps for BasePathBackend {
    fn name(&self) -> String {
        format!("BasePathBackend({})", self.base.display())
    }

    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        self.source.getattr(&self.real_path(path)?).await
    }

    async fn lstat_if_possible(&self, path: &Path) -> VfsResult<(FileAttr, bool)> {
        self.source.lstat_if_possible(&self.real_path(path)?).await
    }

    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        self.source.readdir(&self.real_path(path)?).await
    }

    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        self.source.read(&self.real_path(path)?, offset, size).await
    }

    async fn readlink(&self, path: &Path) -> VfsResult<PathBuf> {
        self.source.readlink(&self.real_path(path)?).await
    }

    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> VfsResult<u32> {
        self.source.write(&self.real_path(path)?, offset, data).await
    }

    async fn create(&self, path: &Path, mode: u32) -> VfsResult<FileAttr> {
        self.source.create(&self.real_path(path)?, mode).await
    }

    async fn mkdir(&self, path: &Path, mode: u32) -> VfsResult<FileAttr> {
        self.source.mkdir(&self.real_path(path)?, mode).await
    }

    async fn unlink(&self, path: &Path) -> VfsResult<()> {
        self.source.unlink(&self.real_path(path)?).await
    }

    async fn rmdir(&self, path: &Path) -> VfsResult<()> {
        self.source.rmdir(&self.real_path(path)?).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> VfsResult<()> {
        let from = self.real_path(from)?;
        let to = self.real_path(to)?;
        self.source.rename(&from, &to).await
    }

    async fn truncate(&self, path: &Path, size: u64) -> VfsResult<()> {
        self.source.truncate(&self.real_path(path)?, size).await
    }

    async fn setattr(&self, path: &Path, attr: SetAttr) -> VfsResult<FileAttr> {
        self.source.setattr(&self.real_path(path)?, attr).await
    }

    async fn symlink(&self, path: &Path, target: &Path) -> VfsResult<FileAttr> {
        // The target is link content, not a path on this filesystem.
        self.source.symlink(&self.real_path(path)?, target).await
    }

    fn read_only(&self) -> bool {
        self.source.read_only()
    }

    async fn statfs(&self) -> VfsResult<StatFs> {
        self.source.statfs().await
    }
}
