//! Open file handles over a path-based [`VfsOps`].
//!
//! The filesystem itself keeps no per-open state; a handle remembers which
//! filesystem and path it was opened on, its flags, and the cursor.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::{VfsError, VfsResult};
use super::ops::VfsOps;
use super::types::{DEFAULT_FILE_MODE, DirEntry, FileAttr, OpenFlags};

/// Bytes requested per backend read in [`FileHandle::read_to_end`].
const READ_CHUNK: u32 = 64 * 1024;

/// An open file or directory.
pub struct FileHandle {
    fs: Arc<dyn VfsOps>,
    path: PathBuf,
    name: String,
    flags: OpenFlags,
    pos: u64,
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("fs", &self.fs.name())
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("pos", &self.pos)
            .finish()
    }
}

impl FileHandle {
    /// Open `path` on `fs`.
    ///
    /// - missing and `create` set: an empty file is created
    /// - present and `exclusive` set: [`VfsError::AlreadyExists`]
    /// - `truncate` with write access: the file is emptied
    ///
    /// Directories can be opened for reading (to list them) but not for
    /// writing.
    pub async fn open(
        fs: Arc<dyn VfsOps>,
        path: impl Into<PathBuf>,
        flags: OpenFlags,
    ) -> VfsResult<Self> {
        let path = path.into();

        let attr = match fs.getattr(&path).await {
            Ok(attr) => {
                if flags.create && flags.exclusive {
                    return Err(VfsError::already_exists(path.display().to_string()));
                }
                attr
            }
            Err(e) if e.is_not_found() && flags.create => {
                fs.create(&path, DEFAULT_FILE_MODE).await?
            }
            Err(e) => return Err(e),
        };

        if attr.is_dir() && flags.write {
            return Err(VfsError::is_a_directory(path.display().to_string()));
        }
        if flags.truncate && flags.write && attr.size > 0 {
            fs.truncate(&path, 0).await?;
        }

        let name = path.display().to_string();
        Ok(Self {
            fs,
            path,
            name,
            flags,
            pos: 0,
        })
    }

    /// Name the file was opened under.
    ///
    /// For a handle from a [`ConfinedView`](crate::ConfinedView) this is
    /// the path relative to the view's root, never the host path.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path passed to the underlying filesystem.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// Current cursor position.
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub async fn stat(&self) -> VfsResult<FileAttr> {
        self.fs.getattr(&self.path).await
    }

    fn check_readable(&self) -> VfsResult<()> {
        if self.flags.read {
            Ok(())
        } else {
            Err(VfsError::permission_denied(format!("{} not opened for reading", self.name)))
        }
    }

    fn check_writable(&self) -> VfsResult<()> {
        if self.flags.write {
            Ok(())
        } else {
            Err(VfsError::permission_denied(format!("{} not opened for writing", self.name)))
        }
    }

    /// Read up to `size` bytes at the cursor and advance it.
    pub async fn read(&mut self, size: u32) -> VfsResult<Vec<u8>> {
        let data = self.read_at(self.pos, size).await?;
        self.pos += data.len() as u64;
        Ok(data)
    }

    /// Read without moving the cursor.
    pub async fn read_at(&self, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        self.check_readable()?;
        self.fs.read(&self.path, offset, size).await
    }

    /// Read from the cursor to end of file.
    pub async fn read_to_end(&mut self) -> VfsResult<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let chunk = self.read(READ_CHUNK).await?;
            if chunk.is_empty() {
                return Ok(out);
            }
            out.extend_from_slice(&chunk);
        }
    }

    /// Write at the cursor (or at end of file in append mode) and advance it.
    pub async fn write(&mut self, data: &[u8]) -> VfsResult<u32> {
        self.check_writable()?;
        if self.flags.append {
            self.pos = self.stat().await?.size;
        }
        let written = self.fs.write(&self.path, self.pos, data).await?;
        self.pos += u64::from(written);
        Ok(written)
    }

    /// Write without moving the cursor.
    pub async fn write_at(&self, offset: u64, data: &[u8]) -> VfsResult<u32> {
        self.check_writable()?;
        self.fs.write(&self.path, offset, data).await
    }

    /// Move the cursor. Seeking before the start of the file is an error.
    pub async fn seek(&mut self, pos: SeekFrom) -> VfsResult<u64> {
        let (base, delta) = match pos {
            SeekFrom::Start(n) => {
                self.pos = n;
                return Ok(n);
            }
            SeekFrom::Current(delta) => (self.pos, delta),
            SeekFrom::End(delta) => (self.stat().await?.size, delta),
        };
        self.pos = base
            .checked_add_signed(delta)
            .ok_or_else(|| VfsError::invalid_path(format!("seek out of range on {}", self.name)))?;
        Ok(self.pos)
    }

    /// List the directory this handle refers to.
    pub async fn readdir(&self) -> VfsResult<Vec<DirEntry>> {
        self.fs.readdir(&self.path).await
    }

    pub async fn truncate(&self, size: u64) -> VfsResult<()> {
        self.check_writable()?;
        self.fs.truncate(&self.path, size).await
    }
}
