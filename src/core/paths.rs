//! core::paths
//!
//! Centralized path routing for origin stores and working copies.
//!
//! # Storage Layout
//!
//! - `<origin_root>/<repo-id>.git` - bare origin repository (durable)
//! - `<work_root>/<repo-id>.work` - working copy (disposable, re-cloned on demand)
//! - `<work_root>/.staging/` - short-lived clones used by repository init
//!
//! Only the last id component carries a suffix, and no id component may
//! end in one, so `team` and `team/docs` never share a directory.
//!
//! **Hard rule:** no other module joins a repository id onto a root
//! directly. All paths go through [`StorePaths`].
//!
//! # Example
//!
//! ```
//! use revstore::core::paths::StorePaths;
//! use revstore::core::types::RepoId;
//! use std::path::PathBuf;
//!
//! let paths = StorePaths::new(PathBuf::from("/data/origins"), PathBuf::from("/tmp/work"));
//! let id = RepoId::new("test/docs").unwrap();
//!
//! assert_eq!(paths.origin_path(&id), PathBuf::from("/data/origins/test/docs.git"));
//! assert_eq!(paths.work_path(&id), PathBuf::from("/tmp/work/test/docs.work"));
//! ```

use std::path::{Path, PathBuf};

use crate::core::types::RepoId;

/// Suffix on the leaf directory of every origin.
pub const ORIGIN_SUFFIX: &str = ".git";

/// Suffix on the leaf directory of every working copy.
pub const WORK_SUFFIX: &str = ".work";

/// Path-existence check used to tell an absent working copy from a present one.
///
/// Any metadata result, including a permission error on a path that is
/// there, counts as existing.
pub fn path_exists(path: &Path) -> bool {
    match std::fs::symlink_metadata(path) {
        Ok(_) => true,
        Err(e) => e.kind() != std::io::ErrorKind::NotFound,
    }
}

/// Whether `dir` looks like a bare git repository.
///
/// A plain directory at the same path is not a repository.
pub fn is_bare_repository(dir: &Path) -> bool {
    dir.join("HEAD").is_file() && dir.join("objects").is_dir() && dir.join("refs").is_dir()
}

/// Root directories for origins and working copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    origin_root: PathBuf,
    work_root: PathBuf,
}

impl StorePaths {
    pub fn new(origin_root: PathBuf, work_root: PathBuf) -> Self {
        Self {
            origin_root,
            work_root,
        }
    }

    pub fn origin_root(&self) -> &Path {
        &self.origin_root
    }

    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    /// Origin (bare) repository for `id`.
    pub fn origin_path(&self, id: &RepoId) -> PathBuf {
        suffixed(&self.origin_root, id, ORIGIN_SUFFIX)
    }

    /// Working copy for `id`.
    pub fn work_path(&self, id: &RepoId) -> PathBuf {
        suffixed(&self.work_root, id, WORK_SUFFIX)
    }

    /// Directory holding init staging clones.
    ///
    /// Repository ids cannot start with a dot, so this never collides.
    pub fn staging_dir(&self) -> PathBuf {
        self.work_root.join(".staging")
    }

    /// Git's index lock inside a working copy.
    ///
    /// A crashed or killed git process leaves this behind and every later
    /// index-writing command fails until it is removed.
    pub fn index_lock_path(work_path: &Path) -> PathBuf {
        work_path.join(".git").join("index.lock")
    }

    /// Recover the repository id for an origin path under the origin root.
    pub fn repo_id_for_origin(&self, origin: &Path) -> Option<RepoId> {
        let relative = origin.strip_prefix(&self.origin_root).ok()?;
        let mut parts: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        let leaf = parts.pop()?.strip_suffix(ORIGIN_SUFFIX)?;
        parts.push(leaf);
        RepoId::new(parts.join("/")).ok()
    }
}

fn suffixed(root: &Path, id: &RepoId, suffix: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    let mut parts = id.components().peekable();
    while let Some(part) = parts.next() {
        if parts.peek().is_some() {
            path.push(part);
        } else {
            path.push(format!("{part}{suffix}"));
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn paths() -> StorePaths {
        StorePaths::new(PathBuf::from("/o"), PathBuf::from("/w"))
    }

    #[test]
    fn nested_ids_map_under_both_roots() {
        let id = RepoId::new("a/b/c").unwrap();
        assert_eq!(paths().origin_path(&id), PathBuf::from("/o/a/b/c.git"));
        assert_eq!(paths().work_path(&id), PathBuf::from("/w/a/b/c.work"));
    }

    #[test]
    fn parent_and_child_ids_never_contain_each_other() {
        let parent = RepoId::new("team").unwrap();
        let child = RepoId::new("team/docs").unwrap();
        let p = paths();
        assert!(!p.origin_path(&child).starts_with(p.origin_path(&parent)));
        assert!(!p.work_path(&child).starts_with(p.work_path(&parent)));
        assert!(!p.origin_path(&parent).starts_with(p.origin_path(&child)));
        assert!(!p.work_path(&parent).starts_with(p.work_path(&child)));
    }

    #[test]
    fn staging_dir_is_not_a_repo_path() {
        assert_eq!(paths().staging_dir(), PathBuf::from("/w/.staging"));
        assert!(RepoId::new(".staging").is_err());
    }

    #[test]
    fn index_lock_path() {
        assert_eq!(
            StorePaths::index_lock_path(Path::new("/w/docs")),
            PathBuf::from("/w/docs/.git/index.lock")
        );
    }

    #[test]
    fn repo_id_roundtrip() {
        let id = RepoId::new("team/docs").unwrap();
        let origin = paths().origin_path(&id);
        assert_eq!(paths().repo_id_for_origin(&origin), Some(id));
        assert_eq!(paths().repo_id_for_origin(Path::new("/elsewhere/x.git")), None);
        assert_eq!(paths().repo_id_for_origin(Path::new("/o/team/docs")), None);
    }

    #[test]
    fn path_exists_distinguishes_absent() {
        let temp = TempDir::new().unwrap();
        assert!(path_exists(temp.path()));
        assert!(!path_exists(&temp.path().join("missing")));
    }

    #[test]
    fn plain_directory_is_not_a_bare_repository() {
        let temp = TempDir::new().unwrap();
        assert!(!is_bare_repository(temp.path()));
        std::fs::write(temp.path().join("HEAD"), "ref: refs/heads/main\n").unwrap();
        std::fs::create_dir(temp.path().join("objects")).unwrap();
        assert!(!is_bare_repository(temp.path()));
        std::fs::create_dir(temp.path().join("refs")).unwrap();
        assert!(is_bare_repository(temp.path()));
    }
}
