//! Backend-neutral metadata and open-mode types.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Default permission bits for files created through [`OpenFlags::create`].
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Default permission bits for directories.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// What kind of object a path names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

impl FileType {
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self, FileType::Symlink)
    }
}

/// Metadata returned by `getattr` and `lstat_if_possible`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAttr {
    /// Length in bytes; for a symlink, the length of its target.
    pub size: u64,
    pub kind: FileType,
    /// Permission bits only, no file-type bits.
    pub perm: u32,
    pub mtime: SystemTime,
    /// Last access time, where the backend tracks it.
    pub atime: Option<SystemTime>,
    pub nlink: u32,
    /// Owner, for host-backed entries.
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

impl FileAttr {
    fn new(kind: FileType, size: u64, perm: u32, nlink: u32) -> Self {
        let now = SystemTime::now();
        Self {
            size,
            kind,
            perm,
            mtime: now,
            atime: Some(now),
            nlink,
            uid: None,
            gid: None,
        }
    }

    /// Attributes for a new file.
    pub fn file(size: u64, perm: u32) -> Self {
        Self::new(FileType::File, size, perm, 1)
    }

    /// Attributes for a new directory.
    pub fn directory(perm: u32) -> Self {
        Self::new(FileType::Directory, 0, perm, 2)
    }

    /// Attributes for a symlink; its size is the length of the target.
    pub fn symlink(target_len: u64) -> Self {
        Self::new(FileType::Symlink, target_len, 0o777, 1)
    }

    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    pub fn is_symlink(&self) -> bool {
        self.kind.is_symlink()
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Final path component only.
    pub name: String,
    pub kind: FileType,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: FileType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Changes applied by `setattr`. Fields left `None` are untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetAttr {
    /// Truncate or zero-extend to this length.
    pub size: Option<u64>,
    pub mtime: Option<SystemTime>,
    pub atime: Option<SystemTime>,
    pub perm: Option<u32>,
}

impl SetAttr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_mtime(mut self, mtime: SystemTime) -> Self {
        self.mtime = Some(mtime);
        self
    }

    pub fn with_perm(mut self, perm: u32) -> Self {
        self.perm = Some(perm);
        self
    }
}

/// Capacity figures in the shape of `statvfs(3)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatFs {
    pub blocks: u64,
    pub bfree: u64,
    /// Blocks usable by unprivileged callers.
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub bsize: u32,
    pub namelen: u32,
}

impl Default for StatFs {
    fn default() -> Self {
        Self {
            blocks: 1024 * 1024,
            bfree: 512 * 1024,
            bavail: 512 * 1024,
            files: 1024 * 1024,
            ffree: 512 * 1024,
            bsize: 4096,
            namelen: 255,
        }
    }
}

/// How a [`FileHandle`](crate::FileHandle) is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    /// Every write lands at the current end of file.
    pub append: bool,
    /// Create the file when it is missing.
    pub create: bool,
    /// Truncate on open (only with write access).
    pub truncate: bool,
    /// With `create`, fail when the file already exists.
    pub exclusive: bool,
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self {
            read: true,
            write: false,
            append: false,
            create: false,
            truncate: false,
            exclusive: false,
        }
    }
}

impl OpenFlags {
    /// Read access only.
    pub fn read() -> Self {
        Self::default()
    }

    /// Read and write an existing file.
    pub fn write() -> Self {
        Self {
            write: true,
            ..Default::default()
        }
    }

    /// Append to a file, creating it if missing.
    pub fn append() -> Self {
        Self {
            write: true,
            append: true,
            create: true,
            ..Default::default()
        }
    }

    /// Create or truncate, with write access.
    pub fn create() -> Self {
        Self {
            write: true,
            create: true,
            truncate: true,
            ..Default::default()
        }
    }

    /// Create a file that must not exist yet.
    pub fn create_new() -> Self {
        Self {
            write: true,
            create: true,
            exclusive: true,
            ..Default::default()
        }
    }
}
