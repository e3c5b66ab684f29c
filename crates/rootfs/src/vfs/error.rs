//! Errors shared by backends, [`FileHandle`](crate::FileHandle) and the view.

use std::io;
use thiserror::Error;

/// Failure of a filesystem operation.
///
/// Backends report the specific variants. A [`ConfinedView`] reports every
/// failure of its own as [`VfsError::InvalidRoot`], optionally carrying the
/// error that caused it.
///
/// [`ConfinedView`]: crate::ConfinedView
#[derive(Debug, Error)]
pub enum VfsError {
    #[error("{0}: no such file or directory")]
    NotFound(String),
    #[error("{0}: already exists")]
    AlreadyExists(String),
    #[error("{0}: permission denied")]
    PermissionDenied(String),
    /// A mutation reached a read-only backend.
    #[error("read-only filesystem")]
    ReadOnly,
    #[error("{0}: not a directory")]
    NotADirectory(String),
    #[error("{0}: is a directory")]
    IsADirectory(String),
    #[error("{0}: directory not empty")]
    DirectoryNotEmpty(String),

    /// A [`BasePathBackend`](super::BasePathBackend) mapped a path outside
    /// its base directory.
    #[error("{0}: outside base directory")]
    PathEscapesRoot(String),

    /// A confined view refused the operation.
    #[error("invalid root: {reason}")]
    InvalidRoot {
        reason: String,
        #[source]
        source: Option<Box<VfsError>>,
    },

    #[error("{0}: invalid path")]
    InvalidPath(String),
    /// `readlink` on something that is not a link.
    #[error("{0}: not a symlink")]
    NotASymlink(String),
    /// Symlink resolution gave up; the links probably form a loop.
    #[error("too many levels of symbolic links")]
    TooManySymlinks,

    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("{0}")]
    Other(String),
}

impl VfsError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    pub fn permission_denied(what: impl Into<String>) -> Self {
        Self::PermissionDenied(what.into())
    }

    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    pub fn directory_not_empty(path: impl Into<String>) -> Self {
        Self::DirectoryNotEmpty(path.into())
    }

    pub fn path_escapes_root(path: impl Into<String>) -> Self {
        Self::PathEscapesRoot(path.into())
    }

    /// An InvalidRoot with no underlying cause.
    pub fn invalid_root(reason: impl Into<String>) -> Self {
        Self::InvalidRoot {
            reason: reason.into(),
            source: None,
        }
    }

    /// An InvalidRoot wrapping the error that caused it.
    pub fn invalid_root_caused_by(reason: impl Into<String>, cause: VfsError) -> Self {
        Self::InvalidRoot {
            reason: reason.into(),
            source: Some(Box::new(cause)),
        }
    }

    pub fn invalid_path(what: impl Into<String>) -> Self {
        Self::InvalidPath(what.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    pub fn is_invalid_root(&self) -> bool {
        matches!(self, VfsError::InvalidRoot { .. })
    }

    /// True if the error means "nothing at this path", whichever backend
    /// produced it.
    pub fn is_not_found(&self) -> bool {
        match self {
            VfsError::NotFound(_) => true,
            VfsError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }

    fn io_kind(&self) -> io::ErrorKind {
        use io::ErrorKind as K;
        match self {
            VfsError::NotFound(_) => K::NotFound,
            VfsError::AlreadyExists(_) => K::AlreadyExists,
            VfsError::ReadOnly => K::ReadOnlyFilesystem,
            VfsError::NotADirectory(_) => K::NotADirectory,
            VfsError::IsADirectory(_) => K::IsADirectory,
            VfsError::DirectoryNotEmpty(_) => K::DirectoryNotEmpty,
            VfsError::PermissionDenied(_)
            | VfsError::PathEscapesRoot(_)
            | VfsError::InvalidRoot { .. } => K::PermissionDenied,
            VfsError::InvalidPath(_) | VfsError::NotASymlink(_) => K::InvalidInput,
            VfsError::TooManySymlinks => K::Other,
            VfsError::Io(e) => e.kind(),
            VfsError::Other(_) => K::Other,
        }
    }
}

/// Lets views and backends sit behind `std::io`-shaped APIs. Confinement
/// failures surface as `PermissionDenied`.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::Io(inner) => inner,
            other => io::Error::new(other.io_kind(), other),
        }
    }
}

pub type VfsResult<T> = Result<T, VfsError>;
