//! # rootfs
//!
//! Filesystem views confined to a single directory subtree.
//!
//! A [`ConfinedView`] is created over any [`VfsOps`] backend and a root
//! directory. Paths given to the view are checked with
//! [`path::is_local`] before anything reaches the backend, so absolute
//! paths and `..` traversal above the root are refused with
//! [`VfsError::InvalidRoot`]. Views nest with
//! [`ConfinedView::open_root`] and are invalidated with
//! [`ConfinedView::close`].
//!
//! ```no_run
//! # async fn demo() -> rootfs::VfsResult<()> {
//! use std::sync::Arc;
//! use rootfs::{ConfinedView, OsBackend};
//!
//! let view = ConfinedView::new(Arc::new(OsBackend::new()), "/data").await?;
//! let mut report = view.open("reports/q1.csv").await?;
//! let bytes = report.read_to_end().await?;
//!
//! assert!(view.open("../etc/passwd").await.is_err());
//! # let _ = bytes;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod path;
pub mod vfs;
mod view;

pub use config::{ConfigError, RootConfig};
pub use view::ConfinedView;
pub use vfs::{
    BasePathBackend, DirEntry, FileAttr, FileHandle, FileType, MemoryBackend, OpenFlags,
    OsBackend, SetAttr, StatFs, VfsError, VfsOps, VfsResult,
};
