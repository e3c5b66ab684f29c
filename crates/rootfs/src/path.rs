//! Lexical path handling.
//!
//! Nothing in here touches a filesystem. Symlinks are invisible at this
//! level: a local path may still name a link that points elsewhere.

use std::path::{Component, Path, PathBuf};

/// Reports whether `candidate` is a local path.
///
/// A local path is non-empty, relative (no root, no drive or UNC prefix),
/// free of NUL bytes, and never climbs above its starting point when its
/// segments are walked left to right. `a/../b` is local; `a/../../b` is not,
/// even though a later segment descends again.
///
/// Malformed input is simply non-local.
pub fn is_local(candidate: &str) -> bool {
    if candidate.is_empty() || candidate.contains('\0') {
        return false;
    }

    let path = Path::new(candidate);
    if path.has_root() || matches!(path.components().next(), Some(Component::Prefix(_))) {
        return false;
    }
    never_climbs(path)
}

/// Reports whether walking `name` left to right never ascends above its
/// starting point. Root and prefix components are skipped, matching how
/// [`join`] appends an absolute `name` below its base.
pub fn never_climbs(name: &Path) -> bool {
    let mut depth: usize = 0;
    for component in name.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            Component::Normal(_) => depth += 1,
        }
    }
    true
}

/// [`is_local`] for a `Path`. Paths that are not valid UTF-8 are non-local.
pub fn is_local_path(candidate: &Path) -> bool {
    candidate.to_str().is_some_and(is_local)
}

/// Lexically normalise a path.
///
/// Drops `.` segments and collapses `name/..` pairs. `..` directly under a
/// root is dropped (`/..` is `/`); leading `..` on a relative path is kept.
/// An empty result becomes `.`.
pub fn clean(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.into_iter().collect()
}

/// Join `name` below `base` and [`clean`] the result.
///
/// Unlike [`Path::join`], an absolute `name` is appended, not substituted:
/// `join("/data", "/etc")` is `/data/etc`. A `name` with enough `..`
/// segments can still climb out of `base`; callers that care check
/// [`is_local`] first or compare the result against `base`.
pub fn join(base: &Path, name: &Path) -> PathBuf {
    let mut joined = base.to_path_buf();
    for component in name.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {}
            other => joined.push(other),
        }
    }
    clean(&joined)
}
