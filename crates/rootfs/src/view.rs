//! Confined views: a filesystem restricted to one directory subtree.
//!
//! A [`ConfinedView`] wraps a backing [`VfsOps`] and a root directory. Every
//! path handed to it must be [local](crate::path::is_local); anything
//! absolute or climbing above the root is refused before the backing
//! filesystem sees it. Accepted paths are rebased under the root by a
//! [`BasePathBackend`].
//!
//! # Limits
//!
//! - The root is checked to be a directory once, at construction. If the
//!   backing filesystem changes afterwards the view does not notice.
//! - Confinement is lexical. A symlink inside the root that points outside
//!   it is followed by the backing filesystem like any other link.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::path;
use crate::vfs::{
    BasePathBackend, DirEntry, FileAttr, FileHandle, OpenFlags, SetAttr, StatFs, VfsError,
    VfsOps, VfsResult,
};

/// A filesystem handle that cannot see outside its root directory.
///
/// Views are `Send + Sync`. [`close`](Self::close) may race with any other
/// operation; the delegate is swapped out under a lock and operations that
/// already hold it finish normally.
pub struct ConfinedView {
    /// The filesystem the view was built on; sub-views are built on it too.
    backing: Arc<dyn VfsOps>,
    /// Root path exactly as given at construction.
    root: PathBuf,
    /// `None` once the view has been closed.
    delegate: RwLock<Option<Arc<BasePathBackend>>>,
}

impl std::fmt::Debug for ConfinedView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfinedView")
            .field("backing", &self.backing.name())
            .field("root", &self.root)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl ConfinedView {
    /// Create a view of `root` on `backing`.
    ///
    /// Fails with [`VfsError::InvalidRoot`] if `root` cannot be stat'ed or
    /// is not a directory.
    pub async fn new(backing: Arc<dyn VfsOps>, root: impl Into<PathBuf>) -> VfsResult<Self> {
        Self::construct(backing, root.into()).await
    }

    #[tracing::instrument(skip(backing), fields(backend = %backing.name()), name = "rootfs.new")]
    async fn construct(backing: Arc<dyn VfsOps>, root: PathBuf) -> VfsResult<Self> {
        let attr = backing.getattr(&root).await.map_err(|e| {
            VfsError::invalid_root_caused_by(format!("cannot stat {}", root.display()), e)
        })?;
        if !attr.is_dir() {
            return Err(VfsError::invalid_root(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        tracing::debug!(root = %root.display(), "opened confined view");
        let delegate = Arc::new(BasePathBackend::new(backing.clone(), root.clone()));
        Ok(Self {
            backing,
            root,
            delegate: RwLock::new(Some(delegate)),
        })
    }

    /// The directory this view is rooted at, verbatim.
    pub fn name(&self) -> &Path {
        &self.root
    }

    /// Returns true once [`close`](Self::close) has succeeded.
    pub fn is_closed(&self) -> bool {
        self.delegate.read().is_none()
    }

    /// The view as a generic filesystem.
    pub fn fs(&self) -> &dyn VfsOps {
        self
    }

    /// Refuse anything that is not a local path.
    fn check_local(&self, path: &Path) -> VfsResult<()> {
        if path::is_local_path(path) {
            return Ok(());
        }
        tracing::warn!(
            root = %self.root.display(),
            path = %path.display(),
            "rejected non-local path"
        );
        Err(VfsError::invalid_root(format!("{} is not local", path.display())))
    }

    /// The live delegate, or InvalidRoot once closed.
    fn delegate(&self) -> VfsResult<Arc<BasePathBackend>> {
        self.delegate.read().clone().ok_or_else(|| {
            VfsError::invalid_root(format!("view of {} is closed", self.root.display()))
        })
    }

    /// Open a file for reading.
    pub async fn open(&self, path: impl AsRef<Path>) -> VfsResult<FileHandle> {
        self.open_file(path, OpenFlags::read()).await
    }

    /// Create (or truncate) a file and open it for writing.
    pub async fn create(&self, path: impl AsRef<Path>) -> VfsResult<FileHandle> {
        self.open_file(path, OpenFlags::create()).await
    }

    /// Open a file with explicit flags.
    ///
    /// The handle keeps working after the view is closed; its name is
    /// `path` as given, relative to the root.
    #[tracing::instrument(
        skip(self, path),
        fields(root = %self.root.display(), path = %path.as_ref().display()),
        name = "rootfs.open"
    )]
    pub async fn open_file(
        &self,
        path: impl AsRef<Path>,
        flags: OpenFlags,
    ) -> VfsResult<FileHandle> {
        let path = path.as_ref();
        self.check_local(path)?;
        let delegate = self.delegate()?;
        FileHandle::open(delegate, path, flags).await
    }

    /// Attributes of `path`, following a trailing symlink.
    pub async fn stat(&self, path: impl AsRef<Path>) -> VfsResult<FileAttr> {
        self.getattr(path.as_ref()).await
    }

    /// Attributes of `path` itself; a trailing symlink is not followed when
    /// the backing filesystem can tell the difference.
    #[tracing::instrument(
        skip(self, path),
        fields(root = %self.root.display(), path = %path.as_ref().display()),
        name = "rootfs.lstat"
    )]
    pub async fn lstat(&self, path: impl AsRef<Path>) -> VfsResult<FileAttr> {
        let (attr, _) = self.lstat_if_possible(path.as_ref()).await?;
        Ok(attr)
    }

    /// Invalidate the view.
    ///
    /// Every later operation on this view fails with
    /// [`VfsError::InvalidRoot`], including a second `close`. Sub-views and
    /// handles already opened are unaffected.
    pub fn close(&self) -> VfsResult<()> {
        match self.delegate.write().take() {
            Some(_) => {
                tracing::debug!(root = %self.root.display(), "closed confined view");
                Ok(())
            }
            None => Err(VfsError::invalid_root(format!(
                "could not close view of {}: already closed",
                self.root.display()
            ))),
        }
    }

    /// Open a view rooted at the subdirectory `name` of this view.
    ///
    /// `name` must be local and must name something below the root, not the
    /// root itself. The sub-view is built on the original backing
    /// filesystem and is closed independently of this one. Every failure is
    /// an InvalidRoot wrapping its cause.
    #[tracing::instrument(
        skip(self, name),
        fields(root = %self.root.display(), sub = %name.as_ref().display()),
        name = "rootfs.open_root"
    )]
    pub async fn open_root(&self, name: impl AsRef<Path>) -> VfsResult<ConfinedView> {
        let name = name.as_ref();
        let wrap = |e: VfsError| VfsError::invalid_root_caused_by("could not open root", e);

        self.check_local(name).map_err(wrap)?;
        if path::clean(name) == Path::new(".") {
            return Err(wrap(VfsError::invalid_root(format!(
                "{} does not name a subdirectory",
                name.display()
            ))));
        }
        self.delegate().map_err(wrap)?;

        let sub_root = path::join(&self.root, name);
        let sub = Self::construct(self.backing.clone(), sub_root)
            .await
            .map_err(wrap)?;
        tracing::debug!(parent = %self.root.display(), root = %sub.root.display(), "opened sub-view");
        Ok(sub)
    }
}

/// Every path argument is checked with [`path::is_local`] and the view must
/// be open; the call is then forwarded below the root. Symlink targets are
/// stored as given.
#[async_trait]
impl VfsOps for ConfinedView {
    fn name(&self) -> String {
        self.root.display().to_string()
    }

    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        self.check_local(path)?;
        self.delegate()?.getattr(path).await
    }

    async fn lstat_if_possible(&self, path: &Path) -> VfsResult<(FileAttr, bool)> {
        self.check_local(path)?;
        self.delegate()?.lstat_if_possible(path).await
    }

    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        self.check_local(path)?;
        self.delegate()?.readdir(path).await
    }

    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        self.check_local(path)?;
        self.delegate()?.read(path, offset, size).await
    }

    async fn readlink(&self, path: &Path) -> VfsResult<PathBuf> {
        self.check_local(path)?;
        self.delegate()?.readlink(path).await
    }

    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> VfsResult<u32> {
        self.check_local(path)?;
        self.delegate()?.write(path, offset, data).await
    }

    async fn create(&self, path: &Path, mode: u32) -> VfsResult<FileAttr> {
        self.check_local(path)?;
        self.delegate()?.create(path, mode).await
    }

    async fn mkdir(&self, path: &Path, mode: u32) -> VfsResult<FileAttr> {
        self.check_local(path)?;
        self.delegate()?.mkdir(path, mode).await
    }

    async fn unlink(&self, path: &Path) -> VfsResult<()> {
        self.check_local(path)?;
        self.delegate()?.unlink(path).await
    }

    async fn rmdir(&self, path: &Path) -> VfsResult<()> {
        self.check_local(path)?;
        self.delegate()?.rmdir(path).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> VfsResult<()> {
        self.check_local(from)?;
        self.check_local(to)?;
        self.delegate()?.rename(from, to).await
    }

    async fn truncate(&self, path: &Path, size: u64) -> VfsResult<()> {
        self.check_local(path)?;
        self.delegate()?.truncate(path, size).await
    }

    async fn setattr(&self, path: &Path, attr: SetAttr) -> VfsResult<FileAttr> {
        self.check_local(path)?;
        self.delegate()?.setattr(path, attr).await
    }

    async fn symlink(&self, path: &Path, target: &Path) -> VfsResult<FileAttr> {
        self.check_local(path)?;
        self.delegate()?.symlink(path, target).await
    }

    fn read_only(&self) -> bool {
        self.backing.read_only()
    }

    async fn statfs(&self) -> VfsResult<StatFs> {
        self.delegate()?.statfs().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemoryBackend;

    async fn data_view() -> (Arc<MemoryBackend>, ConfinedView) {
        let backing = Arc::new(MemoryBackend::new());
        backing
            .write_all(Path::new("/data/reports/q1.csv"), b"quarter,total\nq1,10\n")
            .await
            .unwrap();
        backing.write_all(Path::new("/data/readme.txt"), b"hi").await.unwrap();
        backing.write_all(Path::new("/etc/passwd"), b"root:x:0:0").await.unwrap();

        let view = ConfinedView::new(backing.clone(), "/data").await.unwrap();
        (backing, view)
    }

    #[tokio::test]
    async fn test_new_and_name() {
        let (_backing, view) = data_view().await;
        assert_eq!(view.name(), Path::new("/data"));
        assert_eq!(VfsOps::name(&view), "/data");
        assert!(!view.is_closed());
    }

    #[tokio::test]
    async fn test_name_is_verbatim() {
        let (backing, _view) = data_view().await;
        let view = ConfinedView::new(backing, "/data/./reports/").await.unwrap();
        assert_eq!(view.name(), Path::new("/data/./reports/"));
        let mut file = view.open("q1.csv").await.unwrap();
        assert!(file.read_to_end().await.unwrap().starts_with(b"quarter"));
    }

    #[tokio::test]
    async fn test_new_missing_root() {
        let backing = Arc::new(MemoryBackend::new());
        let err = ConfinedView::new(backing, "/nowhere").await.unwrap_err();
        assert!(err.is_invalid_root());
        assert!(matches!(
            &err,
            VfsError::InvalidRoot { source: Some(cause), .. } if cause.is_not_found()
        ));
    }

    #[tokio::test]
    async fn test_new_on_file() {
        let (backing, _view) = data_view().await;
        let err = ConfinedView::new(backing, "/data/readme.txt").await.unwrap_err();
        assert!(err.is_invalid_root());
        assert!(err.to_string().contains("not a directory"));
    }

    #[tokio::test]
    async fn test_open_relative() {
        let (_backing, view) = data_view().await;
        let mut file = view.open("reports/q1.csv").await.unwrap();
        assert_eq!(file.name(), "reports/q1.csv");
        assert_eq!(file.read_to_end().await.unwrap(), b"quarter,total\nq1,10\n");
    }

    #[tokio::test]
    async fn test_open_rejects_escapes_and_absolute() {
        let (_backing, view) = data_view().await;
        for bad in ["../etc/passwd", "/etc/passwd", "reports/../../etc/passwd", ""] {
            let err = view.open(bad).await.unwrap_err();
            assert!(err.is_invalid_root(), "{bad:?} gave {err}");
        }
        // A rejected path does not invalidate the view.
        assert!(view.open("readme.txt").await.is_ok());
    }

    #[tokio::test]
    async fn test_open_missing_propagates_backend_error() {
        let (_backing, view) = data_view().await;
        let err = view.open("missing.txt").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_invalid_root());
    }

    #[tokio::test]
    async fn test_create_inside_root() {
        let (backing, view) = data_view().await;
        let mut file = view.create("out/new.txt").await.unwrap();
        file.write(b"written").await.unwrap();

        assert_eq!(
            backing.read_all(Path::new("/data/out/new.txt")).await.unwrap(),
            b"written"
        );
    }

    #[tokio::test]
    async fn test_lstat_does_not_follow() {
        let (backing, view) = data_view().await;
        backing
            .symlink(Path::new("/data/latest"), Path::new("reports/q1.csv"))
            .await
            .unwrap();

        assert!(view.lstat("latest").await.unwrap().is_symlink());
        assert!(view.stat("latest").await.unwrap().is_file());
    }

    #[tokio::test]
    async fn test_lstat_checks_locality() {
        let (_backing, view) = data_view().await;
        assert!(view.lstat("../etc/passwd").await.unwrap_err().is_invalid_root());
        assert!(view.lstat("/etc/passwd").await.unwrap_err().is_invalid_root());
    }

    #[tokio::test]
    async fn test_close_is_one_way() {
        let (_backing, view) = data_view().await;
        view.close().unwrap();
        assert!(view.is_closed());

        assert!(view.open("readme.txt").await.unwrap_err().is_invalid_root());
        assert!(view.lstat("readme.txt").await.unwrap_err().is_invalid_root());
        assert!(view.open_root("reports").await.unwrap_err().is_invalid_root());

        let again = view.close().unwrap_err();
        assert!(again.is_invalid_root());
        assert!(again.to_string().contains("could not close"));
    }

    #[tokio::test]
    async fn test_open_handle_survives_close() {
        let (_backing, view) = data_view().await;
        let mut file = view.open("readme.txt").await.unwrap();
        view.close().unwrap();
        assert_eq!(file.read_to_end().await.unwrap(), b"hi");
    }

    #[tokio::test]
    async fn test_open_root() {
        let (_backing, view) = data_view().await;
        let reports = view.open_root("reports").await.unwrap();
        assert_eq!(reports.name(), Path::new("/data/reports"));

        assert!(reports.open("q1.csv").await.is_ok());
        assert!(reports.open("../readme.txt").await.unwrap_err().is_invalid_root());
    }

    #[tokio::test]
    async fn test_open_root_rejects_non_local_names() {
        let (backing, view) = data_view().await;
        backing.mkdir(Path::new("/escape"), 0o755).await.unwrap();

        for bad in ["../escape", "/escape", "reports/../../escape", ".", "reports/.."] {
            let err = view.open_root(bad).await.unwrap_err();
            assert!(err.is_invalid_root(), "{bad:?}");
            assert!(err.to_string().contains("could not open root"));
        }
    }

    #[tokio::test]
    async fn test_open_root_missing_or_file() {
        let (_backing, view) = data_view().await;
        assert!(view.open_root("nope").await.unwrap_err().is_invalid_root());
        assert!(view.open_root("readme.txt").await.unwrap_err().is_invalid_root());
    }

    #[tokio::test]
    async fn test_sub_view_lifecycle_is_independent() {
        let (_backing, view) = data_view().await;
        let reports = view.open_root("reports").await.unwrap();

        view.close().unwrap();
        assert!(reports.open("q1.csv").await.is_ok());

        reports.close().unwrap();
        assert!(reports.open("q1.csv").await.unwrap_err().is_invalid_root());
    }

    #[tokio::test]
    async fn test_nested_sub_views() {
        let (backing, view) = data_view().await;
        backing
            .write_all(Path::new("/data/reports/2024/q4.csv"), b"q4")
            .await
            .unwrap();

        let year = view
            .open_root("reports")
            .await
            .unwrap()
            .open_root("2024")
            .await
            .unwrap();
        assert_eq!(year.name(), Path::new("/data/reports/2024"));
        assert_eq!(year.read_all(Path::new("q4.csv")).await.unwrap(), b"q4");
    }

    #[tokio::test]
    async fn test_fs_is_the_view() {
        let (_backing, view) = data_view().await;
        let fs = view.fs();
        assert_eq!(fs.name(), "/data");

        let listing = fs.readdir(Path::new(".")).await.unwrap();
        let names: Vec<_> = listing.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["readme.txt", "reports"]);

        assert!(fs.readdir(Path::new("..")).await.unwrap_err().is_invalid_root());
    }

    #[tokio::test]
    async fn test_rename_checks_both_paths() {
        let (backing, view) = data_view().await;
        assert!(view
            .rename(Path::new("readme.txt"), Path::new("../stolen.txt"))
            .await
            .unwrap_err()
            .is_invalid_root());
        assert!(!backing.exists(Path::new("/stolen.txt")).await);

        view.rename(Path::new("readme.txt"), Path::new("reports/readme.txt"))
            .await
            .unwrap();
        assert!(backing.exists(Path::new("/data/reports/readme.txt")).await);
    }

    #[tokio::test]
    async fn test_rename_cannot_replace_root() {
        let (backing, view) = data_view().await;
        let err = view
            .rename(Path::new("readme.txt"), Path::new("."))
            .await
            .unwrap_err();
        assert!(matches!(err, VfsError::IsADirectory(_)));

        assert!(backing.getattr(Path::new("/data")).await.unwrap().is_dir());
        assert_eq!(view.readdir(Path::new(".")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_oversized_write_and_truncate_fail() {
        let (_backing, view) = data_view().await;
        let huge = usize::MAX as u64 - 1;
        assert!(view.write(Path::new("readme.txt"), huge, b"x").await.is_err());
        assert!(view.truncate(Path::new("readme.txt"), huge).await.is_err());
        assert!(view
            .setattr(Path::new("readme.txt"), SetAttr::new().with_size(huge))
            .await
            .is_err());
        assert_eq!(view.read_all(Path::new("readme.txt")).await.unwrap(), b"hi");
    }

    #[test]
    fn test_concurrent_close_succeeds_once() {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let (_backing, view) = rt.block_on(data_view());

        let successes = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| view.close().is_ok())).collect();
            handles
                .into_iter()
                .filter_map(|h| h.join().ok())
                .filter(|ok| *ok)
                .count()
        });
        assert_eq!(successes, 1);
    }
}
