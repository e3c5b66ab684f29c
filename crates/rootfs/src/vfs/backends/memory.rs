//! In-memory filesystem backend.
//!
//! Used for testing and for embedding views over ephemeral data. Paths are
//! normalised (a leading `/` is optional), and symlinks are resolved one
//! component at a time the way a kernel would.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::ops::VfsOps;
use crate::vfs::types::{DEFAULT_DIR_MODE, DirEntry, FileAttr, FileType, SetAttr, StatFs};

/// Upper bound on symlinks followed while resolving one path.
const MAX_SYMLINK_HOPS: usize = 40;

/// Largest size a file may grow to through `write`, `truncate` or `setattr`.
const MAX_FILE_SIZE: u64 = 1 << 32;

/// Grow or shrink `data` to `len` bytes, zero-filling any new tail.
fn resize_file(data: &mut Vec<u8>, len: u64) -> VfsResult<()> {
    if len > MAX_FILE_SIZE {
        return Err(VfsError::other("file size out of range"));
    }
    let len = usize::try_from(len).map_err(|_| VfsError::other("file size out of range"))?;
    if let Some(extra) = len.checked_sub(data.len()) {
        data.try_reserve(extra)
            .map_err(|e| VfsError::other(format!("cannot grow file: {e}")))?;
    }
    data.resize(len, 0);
    Ok(())
}

/// Entry in the memory filesystem.
#[derive(Debug, Clone)]
enum Entry {
    File { data: Vec<u8>, attr: FileAttr },
    Directory { attr: FileAttr },
    Symlink { target: PathBuf, attr: FileAttr },
}

impl Entry {
    fn attr(&self) -> &FileAttr {
        match self {
            Entry::File { attr, .. } => attr,
            Entry::Directory { attr } => attr,
            Entry::Symlink { attr, .. } => attr,
        }
    }

    fn attr_mut(&mut self) -> &mut FileAttr {
        match self {
            Entry::File { attr, .. } => attr,
            Entry::Directory { attr } => attr,
            Entry::Symlink { attr, .. } => attr,
        }
    }

    fn kind(&self) -> FileType {
        self.attr().kind
    }
}

type Entries = HashMap<PathBuf, Entry>;

/// In-memory filesystem backend.
///
/// Thread-safe via internal `RwLock`. All data is lost when dropped.
#[derive(Debug)]
pub struct MemoryBackend {
    entries: RwLock<Entries>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create a new empty in-memory filesystem.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        // Root directory always exists
        entries.insert(
            PathBuf::new(),
            Entry::Directory {
                attr: FileAttr::directory(DEFAULT_DIR_MODE),
            },
        );
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Normalize a path: drop the root, resolve `.` and `..` lexically.
    fn normalize(path: &Path) -> PathBuf {
        let mut result = PathBuf::new();
        for component in path.components() {
            match component {
                Component::ParentDir => {
                    result.pop();
                }
                Component::Normal(s) => result.push(s),
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            }
        }
        result
    }

    /// Resolve symlinks along `path`.
    ///
    /// Every intermediate component that is a symlink is replaced by its
    /// target. The final component is followed only when `follow_last` is
    /// set. Missing components are left as they are; the caller's lookup
    /// reports them.
    fn resolve(entries: &Entries, path: &Path, follow_last: bool) -> VfsResult<PathBuf> {
        let mut pending: VecDeque<OsString> = Self::normalize(path)
            .iter()
            .map(|s| s.to_os_string())
            .collect();
        let mut resolved = PathBuf::new();
        let mut hops = 0;

        while let Some(part) = pending.pop_front() {
            let candidate = resolved.join(&part);
            let is_last = pending.is_empty();
            match entries.get(&candidate) {
                Some(Entry::Symlink { target, .. }) if follow_last || !is_last => {
                    hops += 1;
                    if hops > MAX_SYMLINK_HOPS {
                        return Err(VfsError::TooManySymlinks);
                    }
                    // An absolute target replaces `resolved` entirely.
                    let expanded = Self::normalize(&resolved.join(target));
                    for s in expanded.iter().rev() {
                        pending.push_front(s.to_os_string());
                    }
                    resolved = PathBuf::new();
                }
                _ => resolved = candidate,
            }
        }
        Ok(resolved)
    }

    fn lock_poisoned() -> VfsError {
        VfsError::other("lock poisoned")
    }

    /// Ensure all parent directories of `path` exist.
    fn ensure_parents(entries: &mut Entries, path: &Path) -> VfsResult<()> {
        let mut current = PathBuf::new();
        for component in path.parent().into_iter().flat_map(|p| p.components()) {
            if let Component::Normal(s) = component {
                current.push(s);
                let entry = entries.entry(current.clone()).or_insert(Entry::Directory {
                    attr: FileAttr::directory(DEFAULT_DIR_MODE),
                });
                if !entry.kind().is_dir() {
                    return Err(VfsError::not_a_directory(Self::path_str(&current)));
                }
            }
        }
        Ok(())
    }

    /// Refuse a rename onto `to` that would replace the root, put a
    /// non-directory over a directory, or drop a non-empty directory.
    fn check_rename_target(entries: &Entries, to: &Path, from_is_dir: bool) -> VfsResult<()> {
        if to.as_os_str().is_empty() {
            return Err(VfsError::permission_denied("cannot replace root"));
        }
        match entries.get(to) {
            None => Ok(()),
            Some(existing) if existing.kind().is_dir() => {
                if !from_is_dir {
                    return Err(VfsError::is_a_directory(Self::path_str(to)));
                }
                if entries.keys().any(|k| k.parent() == Some(to)) {
                    return Err(VfsError::directory_not_empty(Self::path_str(to)));
                }
                Ok(())
            }
            Some(_) if from_is_dir => Err(VfsError::not_a_directory(Self::path_str(to))),
            Some(_) => Ok(()),
        }
    }

    /// Get the path string for error messages.
    fn path_str(path: &Path) -> String {
        format!("/{}", path.display())
    }
}

#[async_trait]
impl VfsOps for MemoryBackend {
    fn name(&self) -> String {
        "MemoryBackend".to_string()
    }

    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        let entries = self.entries.read().map_err(|_| Self::lock_poisoned())?;
        let resolved = Self::resolve(&entries, path, true)?;
        entries
            .get(&resolved)
            .map(|e| e.attr().clone())
            .ok_or_else(|| VfsError::not_found(Self::path_str(&resolved)))
    }

    async fn lstat_if_possible(&self, path: &Path) -> VfsResult<(FileAttr, bool)> {
        let entries = self.entries.read().map_err(|_| Self::lock_poisoned())?;
        let resolved = Self::resolve(&entries, path, false)?;
        entries
            .get(&resolved)
            .map(|e| (e.attr().clone(), true))
            .ok_or_else(|| VfsError::not_found(Self::path_str(&resolved)))
    }

    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        let entries = self.entries.read().map_err(|_| Self::lock_poisoned())?;
        let dir = Self::resolve(&entries, path, true)?;

        match entries.get(&dir) {
            Some(Entry::Directory { .. }) => {}
            Some(_) => return Err(VfsError::not_a_directory(Self::path_str(&dir))),
            None => return Err(VfsError::not_found(Self::path_str(&dir))),
        }

        let mut result: Vec<DirEntry> = entries
            .iter()
            .filter(|(entry_path, _)| **entry_path != dir && entry_path.parent() == Some(dir.as_path()))
            .filter_map(|(entry_path, entry)| {
                entry_path
                    .file_name()
                    .map(|name| DirEntry::new(name.to_string_lossy(), entry.kind()))
            })
            .collect();

        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        let entries = self.entries.read().map_err(|_| Self::lock_poisoned())?;
        let resolved = Self::resolve(&entries, path, true)?;

        match entries.get(&resolved) {
            Some(Entry::File { data, .. }) => {
                let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
                let end = start.saturating_add(size as usize).min(data.len());
                Ok(data[start..end].to_vec())
            }
            Some(Entry::Directory { .. }) => {
                Err(VfsError::is_a_directory(Self::path_str(&resolved)))
            }
            // resolve() with follow_last never stops on a symlink
            Some(Entry::Symlink { .. }) => Err(VfsError::TooManySymlinks),
            None => Err(VfsError::not_found(Self::path_str(&resolved))),
        }
    }

    async fn readlink(&self, path: &Path) -> VfsResult<PathBuf> {
        let entries = self.entries.read().map_err(|_| Self::lock_poisoned())?;
        let resolved = Self::resolve(&entries, path, false)?;

        match entries.get(&resolved) {
            Some(Entry::Symlink { target, .. }) => Ok(target.clone()),
            Some(_) => Err(VfsError::NotASymlink(Self::path_str(&resolved))),
            None => Err(VfsError::not_found(Self::path_str(&resolved))),
        }
    }

    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> VfsResult<u32> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_poisoned())?;
        let resolved = Self::resolve(&entries, path, true)?;

        match entries.get_mut(&resolved) {
            Some(Entry::File {
                data: file_data,
                attr,
            }) => {
                let written = u32::try_from(data.len())
                    .map_err(|_| VfsError::other("write larger than 4 GiB"))?;
                let end = offset
                    .checked_add(u64::from(written))
                    .ok_or_else(|| VfsError::other("write offset out of range"))?;
                // Extend if necessary
                if end > file_data.len() as u64 {
                    resize_file(file_data, end)?;
                }
                // Both fit in usize now that the file is at least `end` long.
                let start = offset as usize;
                file_data[start..start + data.len()].copy_from_slice(data);
                attr.size = file_data.len() as u64;
                attr.mtime = SystemTime::now();
                Ok(written)
            }
            Some(Entry::Directory { .. }) => {
                Err(VfsError::is_a_directory(Self::path_str(&resolved)))
            }
            Some(Entry::Symlink { .. }) => Err(VfsError::TooManySymlinks),
            None => Err(VfsError::not_found(Self::path_str(&resolved))),
        }
    }

    async fn create(&self, path: &Path, mode: u32) -> VfsResult<FileAttr> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_poisoned())?;
        let resolved = Self::resolve(&entries, path, false)?;
        if resolved.as_os_str().is_empty() {
            return Err(VfsError::already_exists("/"));
        }

        Self::ensure_parents(&mut entries, &resolved)?;

        if entries.contains_key(&resolved) {
            return Err(VfsError::already_exists(Self::path_str(&resolved)));
        }

        let attr = FileAttr::file(0, mode);
        entries.insert(
            resolved,
            Entry::File {
                data: Vec::new(),
                attr: attr.clone(),
            },
        );
        Ok(attr)
    }

    async fn mkdir(&self, path: &Path, mode: u32) -> VfsResult<FileAttr> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_poisoned())?;
        let resolved = Self::resolve(&entries, path, true)?;

        Self::ensure_parents(&mut entries, &resolved)?;

        if let Some(existing) = entries.get(&resolved) {
            return match existing {
                Entry::Directory { attr } => Ok(attr.clone()),
                _ => Err(VfsError::already_exists(Self::path_str(&resolved))),
            };
        }

        let attr = FileAttr::directory(mode);
        entries.insert(resolved, Entry::Directory { attr: attr.clone() });
        Ok(attr)
    }

    async fn unlink(&self, path: &Path) -> VfsResult<()> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_poisoned())?;
        let resolved = Self::resolve(&entries, path, false)?;

        match entries.get(&resolved) {
            Some(Entry::Directory { .. }) => {
                Err(VfsError::is_a_directory(Self::path_str(&resolved)))
            }
            Some(_) => {
                entries.remove(&resolved);
                Ok(())
            }
            None => Err(VfsError::not_found(Self::path_str(&resolved))),
        }
    }

    async fn rmdir(&self, path: &Path) -> VfsResult<()> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_poisoned())?;
        let resolved = Self::resolve(&entries, path, false)?;

        if resolved.as_os_str().is_empty() {
            return Err(VfsError::permission_denied("cannot remove root"));
        }

        match entries.get(&resolved) {
            Some(Entry::Directory { .. }) => {}
            Some(_) => return Err(VfsError::not_a_directory(Self::path_str(&resolved))),
            None => return Err(VfsError::not_found(Self::path_str(&resolved))),
        }

        if entries.keys().any(|k| k.parent() == Some(resolved.as_path())) {
            return Err(VfsError::directory_not_empty(Self::path_str(&resolved)));
        }

        entries.remove(&resolved);
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> VfsResult<()> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_poisoned())?;
        let from = Self::resolve(&entries, from, false)?;
        let to = Self::resolve(&entries, to, false)?;

        if from.as_os_str().is_empty() {
            return Err(VfsError::permission_denied("cannot rename root"));
        }
        if to.starts_with(&from) && to != from {
            return Err(VfsError::invalid_path(format!(
                "cannot move {} into itself",
                Self::path_str(&from)
            )));
        }

        let from_is_dir = match entries.get(&from) {
            Some(entry) => entry.kind().is_dir(),
            None => return Err(VfsError::not_found(Self::path_str(&from))),
        };
        if to != from {
            Self::check_rename_target(&entries, &to, from_is_dir)?;
        }
        Self::ensure_parents(&mut entries, &to)?;

        let moved: Vec<PathBuf> = entries
            .keys()
            .filter(|k| k.starts_with(&from))
            .cloned()
            .collect();

        for old in moved {
            if let Some(entry) = entries.remove(&old) {
                let new_path = match old.strip_prefix(&from) {
                    Ok(rel) if !rel.as_os_str().is_empty() => to.join(rel),
                    _ => to.clone(),
                };
                entries.insert(new_path, entry);
            }
        }
        Ok(())
    }

    async fn truncate(&self, path: &Path, size: u64) -> VfsResult<()> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_poisoned())?;
        let resolved = Self::resolve(&entries, path, true)?;

        match entries.get_mut(&resolved) {
            Some(Entry::File { data, attr }) => {
                resize_file(data, size)?;
                attr.size = size;
                attr.mtime = SystemTime::now();
                Ok(())
            }
            Some(Entry::Directory { .. }) => {
                Err(VfsError::is_a_directory(Self::path_str(&resolved)))
            }
            Some(Entry::Symlink { .. }) => Err(VfsError::TooManySymlinks),
            None => Err(VfsError::not_found(Self::path_str(&resolved))),
        }
    }

    async fn setattr(&self, path: &Path, set: SetAttr) -> VfsResult<FileAttr> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_poisoned())?;
        let resolved = Self::resolve(&entries, path, true)?;

        let entry = entries
            .get_mut(&resolved)
            .ok_or_else(|| VfsError::not_found(Self::path_str(&resolved)))?;

        if let Some(size) = set.size {
            match entry {
                Entry::File { data, attr } => {
                    resize_file(data, size)?;
                    attr.size = size;
                }
                _ => return Err(VfsError::is_a_directory(Self::path_str(&resolved))),
            }
        }

        let attr = entry.attr_mut();
        if let Some(mtime) = set.mtime {
            attr.mtime = mtime;
        }
        if let Some(atime) = set.atime {
            attr.atime = Some(atime);
        }
        if let Some(perm) = set.perm {
            attr.perm = perm;
        }

        Ok(attr.clone())
    }

    async fn symlink(&self, path: &Path, target: &Path) -> VfsResult<FileAttr> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_poisoned())?;
        let resolved = Self::resolve(&entries, path, false)?;

        Self::ensure_parents(&mut entries, &resolved)?;

        if entries.contains_key(&resolved) {
            return Err(VfsError::already_exists(Self::path_str(&resolved)));
        }

        let attr = FileAttr::symlink(target.as_os_str().len() as u64);
        entries.insert(
            resolved,
            Entry::Symlink {
                target: target.to_path_buf(),
                attr: attr.clone(),
            },
        );
        Ok(attr)
    }

    fn read_only(&self) -> bool {
        false
    }

    async fn statfs(&self) -> VfsResult<StatFs> {
        Ok(StatFs::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::types::DEFAULT_FILE_MODE;

    #[tokio::test]
    async fn test_create_and_read() {
        let fs = MemoryBackend::new();
        fs.create(Path::new("test.txt"), DEFAULT_FILE_MODE).await.unwrap();
        fs.write(Path::new("test.txt"), 0, b"hello world").await.unwrap();

        let data = fs.read(Path::new("test.txt"), 0, 100).await.unwrap();
        assert_eq!(data, b"hello world");

        let tail = fs.read(Path::new("test.txt"), 6, 5).await.unwrap();
        assert_eq!(tail, b"world");
    }

    #[tokio::test]
    async fn test_read_past_end_is_empty() {
        let fs = MemoryBackend::new();
        fs.write_all(Path::new("short.txt"), b"abc").await.unwrap();
        assert!(fs.read(Path::new("short.txt"), 10, 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mkdir_and_readdir() {
        let fs = MemoryBackend::new();
        fs.mkdir(Path::new("subdir"), 0o755).await.unwrap();
        fs.create(Path::new("subdir/file.txt"), 0o644).await.unwrap();
        fs.create(Path::new("root.txt"), 0o644).await.unwrap();

        let entries = fs.readdir(Path::new("")).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["root.txt", "subdir"]);

        let subentries = fs.readdir(Path::new("/subdir")).await.unwrap();
        assert_eq!(subentries, vec![DirEntry::new("file.txt", FileType::File)]);
    }

    #[tokio::test]
    async fn test_create_under_file_fails() {
        let fs = MemoryBackend::new();
        fs.create(Path::new("plain"), 0o644).await.unwrap();
        let result = fs.create(Path::new("plain/child"), 0o644).await;
        assert!(matches!(result, Err(VfsError::NotADirectory(_))));
    }

    #[tokio::test]
    async fn test_unlink_and_rmdir() {
        let fs = MemoryBackend::new();
        fs.create(Path::new("dir/file.txt"), 0o644).await.unwrap();

        assert!(matches!(
            fs.rmdir(Path::new("dir")).await,
            Err(VfsError::DirectoryNotEmpty(_))
        ));

        fs.unlink(Path::new("dir/file.txt")).await.unwrap();
        fs.rmdir(Path::new("dir")).await.unwrap();
        assert!(fs.getattr(Path::new("dir")).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_rename_directory_moves_children() {
        let fs = MemoryBackend::new();
        fs.write_all(Path::new("old/a.txt"), b"a").await.unwrap();
        fs.write_all(Path::new("old/deep/b.txt"), b"b").await.unwrap();

        fs.rename(Path::new("old"), Path::new("new")).await.unwrap();

        assert!(!fs.exists(Path::new("old")).await);
        assert_eq!(fs.read_all(Path::new("new/a.txt")).await.unwrap(), b"a");
        assert_eq!(fs.read_all(Path::new("new/deep/b.txt")).await.unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_rename_into_itself_fails() {
        let fs = MemoryBackend::new();
        fs.mkdir(Path::new("a"), 0o755).await.unwrap();
        assert!(fs.rename(Path::new("a"), Path::new("a/b")).await.is_err());
    }

    #[tokio::test]
    async fn test_truncate() {
        let fs = MemoryBackend::new();
        fs.write_all(Path::new("test.txt"), b"hello world").await.unwrap();
        fs.truncate(Path::new("test.txt"), 5).await.unwrap();
        assert_eq!(fs.read_all(Path::new("test.txt")).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_symlink_followed_by_getattr_not_by_lstat() {
        let fs = MemoryBackend::new();
        fs.write_all(Path::new("data/target.txt"), b"content").await.unwrap();
        fs.symlink(Path::new("data/link"), Path::new("target.txt")).await.unwrap();

        let followed = fs.getattr(Path::new("data/link")).await.unwrap();
        assert!(followed.is_file());
        assert_eq!(followed.size, 7);

        let (own, supported) = fs.lstat_if_possible(Path::new("data/link")).await.unwrap();
        assert!(supported);
        assert!(own.is_symlink());

        assert_eq!(fs.read_all(Path::new("data/link")).await.unwrap(), b"content");
        assert_eq!(
            fs.readlink(Path::new("data/link")).await.unwrap(),
            PathBuf::from("target.txt")
        );
    }

    #[tokio::test]
    async fn test_symlinked_directory_component() {
        let fs = MemoryBackend::new();
        fs.write_all(Path::new("real/inner.txt"), b"inner").await.unwrap();
        fs.symlink(Path::new("alias"), Path::new("/real")).await.unwrap();

        assert_eq!(fs.read_all(Path::new("alias/inner.txt")).await.unwrap(), b"inner");
        let listing = fs.readdir(Path::new("alias")).await.unwrap();
        assert_eq!(listing.len(), 1);
    }

    #[tokio::test]
    async fn test_symlink_loop() {
        let fs = MemoryBackend::new();
        fs.symlink(Path::new("a"), Path::new("b")).await.unwrap();
        fs.symlink(Path::new("b"), Path::new("a")).await.unwrap();

        assert!(matches!(
            fs.getattr(Path::new("a")).await,
            Err(VfsError::TooManySymlinks)
        ));
        assert!(fs.lstat_if_possible(Path::new("a")).await.is_ok());
    }

    #[tokio::test]
    async fn test_path_normalization() {
        let fs = MemoryBackend::new();
        fs.create(Path::new("/a/b/c.txt"), 0o644).await.unwrap();

        assert!(fs.getattr(Path::new("a/b/c.txt")).await.is_ok());
        assert!(fs.getattr(Path::new("/a/b/c.txt")).await.is_ok());
        assert!(fs.getattr(Path::new("a/./b/c.txt")).await.is_ok());
        assert!(fs.getattr(Path::new("a/b/../b/c.txt")).await.is_ok());
        assert!(fs.getattr(Path::new("/")).await.unwrap().is_dir());
    }

    #[tokio::test]
    async fn test_setattr() {
        let fs = MemoryBackend::new();
        fs.write_all(Path::new("f"), b"12345").await.unwrap();
        let attr = fs
            .setattr(Path::new("f"), SetAttr::new().with_size(2).with_perm(0o600))
            .await
            .unwrap();
        assert_eq!(attr.size, 2);
        assert_eq!(attr.perm, 0o600);
    }

    #[tokio::test]
    async fn test_write_offset_overflow() {
        let fs = MemoryBackend::new();
        fs.write_all(Path::new("f.txt"), b"abc").await.unwrap();
        let err = fs.write(Path::new("f.txt"), u64::MAX, b"x").await.unwrap_err();
        assert!(matches!(err, VfsError::Other(_)));
        assert_eq!(fs.read_all(Path::new("f.txt")).await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_oversized_files_are_refused() {
        let fs = MemoryBackend::new();
        fs.write_all(Path::new("f.txt"), b"abc").await.unwrap();

        let huge = usize::MAX as u64 - 1;
        for err in [
            fs.write(Path::new("f.txt"), huge, b"x").await.unwrap_err(),
            fs.write(Path::new("f.txt"), MAX_FILE_SIZE, b"x").await.unwrap_err(),
            fs.truncate(Path::new("f.txt"), huge).await.unwrap_err(),
            fs.setattr(Path::new("f.txt"), SetAttr::new().with_size(huge))
                .await
                .unwrap_err(),
        ] {
            assert!(matches!(err, VfsError::Other(_)), "{err}");
        }
        assert_eq!(fs.read_all(Path::new("f.txt")).await.unwrap(), b"abc");

        fs.truncate(Path::new("f.txt"), 8).await.unwrap();
        assert_eq!(fs.read_all(Path::new("f.txt")).await.unwrap(), b"abc\0\0\0\0\0");
    }

    #[tokio::test]
    async fn test_rename_onto_directory() {
        let fs = MemoryBackend::new();
        fs.write_all(Path::new("/data/readme.txt"), b"hi").await.unwrap();
        fs.write_all(Path::new("/data/sub/keep.txt"), b"keep").await.unwrap();
        fs.mkdir(Path::new("/data/empty"), 0o755).await.unwrap();
        fs.mkdir(Path::new("/data/moved"), 0o755).await.unwrap();

        let err = fs
            .rename(Path::new("/data/readme.txt"), Path::new("/data"))
            .await
            .unwrap_err();
        assert!(matches!(err, VfsError::IsADirectory(_)));
        let err = fs
            .rename(Path::new("/data/readme.txt"), Path::new("/data/empty"))
            .await
            .unwrap_err();
        assert!(matches!(err, VfsError::IsADirectory(_)));
        let err = fs
            .rename(Path::new("/data/empty"), Path::new("/data/sub"))
            .await
            .unwrap_err();
        assert!(matches!(err, VfsError::DirectoryNotEmpty(_)));
        let err = fs
            .rename(Path::new("/data/empty"), Path::new("/data/readme.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, VfsError::NotADirectory(_)));
        let err = fs
            .rename(Path::new("/data/sub/keep.txt"), Path::new("/"))
            .await
            .unwrap_err();
        assert!(matches!(err, VfsError::PermissionDenied(_)));

        // An empty directory may be replaced by another directory.
        fs.rename(Path::new("/data/sub"), Path::new("/data/moved"))
            .await
            .unwrap();
        assert_eq!(
            fs.read_all(Path::new("/data/moved/keep.txt")).await.unwrap(),
            b"keep"
        );
        assert!(fs.getattr(Path::new("/data")).await.unwrap().is_dir());
    }
}
