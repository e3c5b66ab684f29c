//! RON configuration for views over the host filesystem.
//!
//! ```ron
//! (
//!     root: "/srv/data",
//!     read_only: true,
//! )
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::vfs::{OsBackend, VfsResult};
use crate::view::ConfinedView;

/// Where a view is rooted and how it may be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootConfig {
    /// Host directory the view is confined to.
    pub root: PathBuf,
    /// Refuse every mutation.
    #[serde(default)]
    pub read_only: bool,
}

/// Error type for config loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

impl RootConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            read_only: false,
        }
    }

    /// Parse a config from RON text.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Read and parse a RON config file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_ron(&text)
    }

    /// Build the host backend and a view of `root` on it.
    pub async fn open(&self) -> VfsResult<ConfinedView> {
        let backend = if self.read_only {
            OsBackend::read_only()
        } else {
            OsBackend::new()
        };
        ConfinedView::new(Arc::new(backend), self.root.clone()).await
    }
}
