//! VFS backends.
//!
//! Backends implement [`VfsOps`](crate::VfsOps) for different storage types.

mod base_path;
mod memory;
mod os;

pub use base_path::BasePathBackend;
pub use memory::MemoryBackend;
pub use os::OsBackend;
