//! Host filesystem backend.
//!
//! Paths are handed to the operating system as given: absolute paths are
//! host paths, relative paths resolve against the process working
//! directory. Confinement is the job of the layers above.
//!
//! Unix only: metadata comes from `std::os::unix` and `statfs` from rustix.

use async_trait::async_trait;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::ops::VfsOps;
use crate::vfs::types::{DirEntry, FileAttr, FileType, SetAttr, StatFs};

/// Host filesystem backend.
#[derive(Debug, Clone, Default)]
pub struct OsBackend {
    read_only: bool,
}

impl OsBackend {
    /// Read-write access to the host filesystem.
    pub fn new() -> Self {
        Self { read_only: false }
    }

    /// Read-only access; every mutation fails with [`VfsError::ReadOnly`].
    pub fn read_only() -> Self {
        Self { read_only: true }
    }

    /// Set whether this filesystem is read-only.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Check if write operations are allowed.
    fn check_writable(&self) -> VfsResult<()> {
        if self.read_only {
            Err(VfsError::ReadOnly)
        } else {
            Ok(())
        }
    }

    fn file_type(ft: std::fs::FileType) -> FileType {
        if ft.is_dir() {
            FileType::Directory
        } else if ft.is_symlink() {
            FileType::Symlink
        } else {
            FileType::File
        }
    }

    /// Convert std::fs::Metadata to FileAttr.
    fn metadata_to_attr(meta: &std::fs::Metadata) -> FileAttr {
        FileAttr {
            size: meta.len(),
            kind: Self::file_type(meta.file_type()),
            perm: meta.permissions().mode() & 0o7777,
            mtime: meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH),
            atime: meta.accessed().ok(),
            nlink: meta.nlink() as u32,
            uid: Some(meta.uid()),
            gid: Some(meta.gid()),
        }
    }

    async fn ensure_parent(path: &Path) -> VfsResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl VfsOps for OsBackend {
    fn name(&self) -> String {
        "OsBackend".to_string()
    }

    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        let meta = fs::metadata(path).await?;
        Ok(Self::metadata_to_attr(&meta))
    }

    async fn lstat_if_possible(&self, path: &Path) -> VfsResult<(FileAttr, bool)> {
        let meta = fs::symlink_metadata(path).await?;
        Ok((Self::metadata_to_attr(&meta), true))
    }

    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(path).await?;

        while let Some(entry) = dir.next_entry().await? {
            let file_type = entry.file_type().await?;
            entries.push(DirEntry::new(
                entry.file_name().to_string_lossy(),
                Self::file_type(file_type),
            ));
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        use tokio::io::{AsyncReadExt, AsyncSeekExt};

        let mut file = fs::File::open(path).await?;
        if file.metadata().await?.is_dir() {
            return Err(VfsError::is_a_directory(path.display().to_string()));
        }
        file.seek(std::io::SeekFrom::Start(offset)).await?;

        let mut buffer = Vec::with_capacity(size as usize);
        file.take(u64::from(size)).read_to_end(&mut buffer).await?;
        Ok(buffer)
    }

    async fn readlink(&self, path: &Path) -> VfsResult<PathBuf> {
        Ok(fs::read_link(path).await?)
    }

    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> VfsResult<u32> {
        use tokio::io::{AsyncSeekExt, AsyncWriteExt};

        self.check_writable()?;
        let written = u32::try_from(data.len())
            .map_err(|_| VfsError::other("write larger than 4 GiB"))?;
        let mut file = fs::OpenOptions::new().write(true).open(path).await?;
        file.seek(std::io::SeekFrom::Start(offset)).await?;
        file.write_all(data).await?;
        file.flush().await?;

        Ok(written)
    }

    async fn create(&self, path: &Path, mode: u32) -> VfsResult<FileAttr> {
        use std::os::unix::fs::OpenOptionsExt;

        self.check_writable()?;
        Self::ensure_parent(path).await?;

        let file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(mode)
            .open(path)?;

        let meta = file.metadata()?;
        Ok(Self::metadata_to_attr(&meta))
    }

    async fn mkdir(&self, path: &Path, mode: u32) -> VfsResult<FileAttr> {
        use std::os::unix::fs::DirBuilderExt;

        self.check_writable()?;
        std::fs::DirBuilder::new()
            .mode(mode)
            .recursive(true)
            .create(path)?;

        let meta = fs::metadata(path).await?;
        Ok(Self::metadata_to_attr(&meta))
    }

    async fn unlink(&self, path: &Path) -> VfsResult<()> {
        self.check_writable()?;
        Ok(fs::remove_file(path).await?)
    }

    async fn rmdir(&self, path: &Path) -> VfsResult<()> {
        self.check_writable()?;
        Ok(fs::remove_dir(path).await?)
    }

    async fn rename(&self, from: &Path, to: &Path) -> VfsResult<()> {
        self.check_writable()?;
        Self::ensure_parent(to).await?;
        Ok(fs::rename(from, to).await?)
    }

    async fn truncate(&self, path: &Path, size: u64) -> VfsResult<()> {
        self.check_writable()?;
        let file = fs::OpenOptions::new().write(true).open(path).await?;
        Ok(file.set_len(size).await?)
    }

    async fn setattr(&self, path: &Path, attr: SetAttr) -> VfsResult<FileAttr> {
        self.check_writable()?;

        if let Some(size) = attr.size {
            self.truncate(path, size).await?;
        }

        if let Some(perm) = attr.perm {
            fs::set_permissions(path, std::fs::Permissions::from_mode(perm)).await?;
        }

        if attr.mtime.is_some() || attr.atime.is_some() {
            let file = std::fs::OpenOptions::new().write(true).open(path)?;
            let mut times = std::fs::FileTimes::new();
            if let Some(mtime) = attr.mtime {
                times = times.set_modified(mtime);
            }
            if let Some(atime) = attr.atime {
                times = times.set_accessed(atime);
            }
            file.set_times(times)?;
        }

        self.getattr(path).await
    }

    async fn symlink(&self, path: &Path, target: &Path) -> VfsResult<FileAttr> {
        self.check_writable()?;
        Self::ensure_parent(path).await?;
        fs::symlink(target, path).await?;

        let (attr, _) = self.lstat_if_possible(path).await?;
        Ok(attr)
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    async fn statfs(&self) -> VfsResult<StatFs> {
        let stat = rustix::fs::statvfs("/").map_err(|e| VfsError::Io(e.into()))?;
        Ok(StatFs {
            blocks: stat.f_blocks,
            bfree: stat.f_bfree,
            bavail: stat.f_bavail,
            files: stat.f_files,
            ffree: stat.f_ffree,
            bsize: stat.f_bsize as u32,
            namelen: stat.f_namemax as u32,
        })
    }
}
