//! Virtual filesystem layer underneath confined views.
//!
//! - [`VfsOps`] - Core trait for filesystem operations
//! - [`FileHandle`] - An open file over any `VfsOps`
//! - [`MemoryBackend`] - In-memory filesystem (for testing)
//! - [`OsBackend`] - Host filesystem
//! - [`BasePathBackend`] - Rebases paths under a fixed directory
//!
//! ## Design Decisions
//!
//! - **Path-based, no inodes**: Operations use paths, not inode numbers.
//! - **Explicit offset/size**: Read/write take offset and size, so an open
//!   file needs no state inside the backend.

pub mod backends;
mod error;
mod file;
mod ops;
mod types;

pub use backends::{BasePathBackend, MemoryBackend, OsBackend};
pub use error::{VfsError, VfsResult};
pub use file::FileHandle;
pub use ops::VfsOps;
pub use types::{
    DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, DirEntry, FileAttr, FileType, OpenFlags, SetAttr, StatFs,
};
