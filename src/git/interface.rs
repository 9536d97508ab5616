//! git::interface
//!
//! Read-only access to an origin store using git2.
//!
//! This module is the **single doorway** to libgit2. Origins are bare
//! repositories; every query here (branch and tag listing, revision lookup,
//! tree and blob reads) is a pure read, so it never needs the repository's
//! exclusive lock. Ref updates land through `git push`, which updates refs
//! atomically, so a reader sees either the old or the new tip.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: No repository at the path
//! - [`GitError::RefNotFound`]: Branch, tag or revision does not resolve
//! - [`GitError::PathNotFound`]: Path absent from a revision's tree
//! - [`GitError::NotAFile`]: Blob read requested on a directory
//! - [`GitError::InvalidUtf8`]: Blob is not text
//!
//! # Example
//!
//! ```ignore
//! use revstore::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("/origins/docs.git"))?;
//! for branch in git.list_branches()? {
//!     println!("{} -> {}", branch, git.branch_tip(&branch)?);
//! }
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{
    timestamp_from_secs, BranchName, FileInfo, Oid, Revision, TagName, TypeError,
};

/// Errors from origin reads.
#[derive(Debug, Error)]
pub enum GitError {
    /// No git repository at the path.
    #[error("not a git repository: {path}")]
    NotARepo { path: PathBuf },

    /// Requested ref or revision does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound { refname: String },

    /// Path does not exist in the revision's tree.
    #[error("path '{path}' not found at revision {revision}")]
    PathNotFound { path: String, revision: String },

    /// A directory was read as a file.
    #[error("path '{path}' is a directory")]
    NotAFile { path: String },

    /// Blob content is not valid UTF-8.
    #[error("blob is not valid UTF-8: {oid}")]
    InvalidUtf8 { oid: String },

    /// Invalid object id or name coming back from libgit2.
    #[error("invalid value from repository: {0}")]
    InvalidValue(#[from] TypeError),

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal { message: String },
}

impl GitError {
    fn internal(context: &str, err: git2::Error) -> Self {
        GitError::Internal {
            message: format!("{}: {}", context, err.message()),
        }
    }

    /// Whether the error means "does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GitError::NotARepo { .. } | GitError::RefNotFound { .. } | GitError::PathNotFound { .. }
        )
    }
}

/// Read-only handle on an origin repository.
pub struct Git {
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Opening
    // =========================================================================

    /// Open the repository at exactly `path` (bare or not, no discovery).
    ///
    /// # Errors
    ///
    /// [`GitError::NotARepo`] if `path` is not a git repository.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let flags = git2::RepositoryOpenFlags::NO_SEARCH;
        let repo = git2::Repository::open_ext(path, flags, std::iter::empty::<&std::ffi::OsStr>())
            .map_err(|_| GitError::NotARepo {
                path: path.to_path_buf(),
            })?;
        Ok(Self { repo })
    }

    // =========================================================================
    // Branches
    // =========================================================================

    pub fn branch_exists(&self, name: &BranchName) -> Result<bool, GitError> {
        match self.repo.find_reference(&name.local_ref()) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(e) => Err(GitError::internal(&name.local_ref(), e)),
        }
    }

    /// All local branches, sorted by name.
    pub fn list_branches(&self) -> Result<Vec<BranchName>, GitError> {
        let branches = self
            .repo
            .branches(Some(git2::BranchType::Local))
            .map_err(|e| GitError::internal("list branches", e))?;

        let mut names = Vec::new();
        for branch in branches {
            let (branch, _) = branch.map_err(|e| GitError::internal("list branches", e))?;
            if let Some(name) = branch
                .name()
                .map_err(|e| GitError::internal("branch name", e))?
            {
                names.push(BranchName::new(name)?);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Tip revision of a branch.
    pub fn branch_tip(&self, name: &BranchName) -> Result<Oid, GitError> {
        let refname = name.local_ref();
        let reference = self.repo.find_reference(&refname).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                GitError::RefNotFound {
                    refname: refname.clone(),
                }
            } else {
                GitError::internal(&refname, e)
            }
        })?;
        let commit = reference
            .peel_to_commit()
            .map_err(|e| GitError::internal(&refname, e))?;
        Ok(Oid::new(commit.id().to_string())?)
    }

    // =========================================================================
    // Tags
    // =========================================================================

    pub fn tag_exists(&self, name: &TagName) -> Result<bool, GitError> {
        match self.repo.find_reference(&name.tag_ref()) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(e) => Err(GitError::internal(&name.tag_ref(), e)),
        }
    }

    /// All tags, sorted by name.
    pub fn list_tags(&self) -> Result<Vec<TagName>, GitError> {
        let names = self
            .repo
            .tag_names(None)
            .map_err(|e| GitError::internal("list tags", e))?;
        let mut tags = names
            .iter()
            .flatten()
            .map(TagName::new)
            .collect::<Result<Vec<_>, _>>()?;
        tags.sort();
        Ok(tags)
    }

    /// Revision a tag points at (annotated tags are peeled).
    pub fn tag_target(&self, name: &TagName) -> Result<Oid, GitError> {
        self.resolve_revision(&name.tag_ref())
    }

    // =========================================================================
    // Revisions
    // =========================================================================

    /// Resolve any revision expression (id, branch, tag, `HEAD~2`) to a commit.
    pub fn resolve_revision(&self, rev: &str) -> Result<Oid, GitError> {
        let object = self
            .repo
            .revparse_single(rev)
            .map_err(|_| GitError::RefNotFound {
                refname: rev.to_string(),
            })?;
        let commit = object.peel_to_commit().map_err(|_| GitError::RefNotFound {
            refname: rev.to_string(),
        })?;
        Ok(Oid::new(commit.id().to_string())?)
    }

    fn find_commit(&self, oid: &Oid) -> Result<git2::Commit<'_>, GitError> {
        let id = git2::Oid::from_str(oid.as_str()).map_err(|_| GitError::RefNotFound {
            refname: oid.to_string(),
        })?;
        self.repo.find_commit(id).map_err(|_| GitError::RefNotFound {
            refname: oid.to_string(),
        })
    }

    /// Full record for one revision.
    pub fn revision(&self, oid: &Oid) -> Result<Revision, GitError> {
        let commit = self.find_commit(oid)?;
        let author = commit.author();
        let parent_ids = commit
            .parent_ids()
            .map(|id| Oid::new(id.to_string()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Revision {
            id: oid.clone(),
            author_name: author.name().unwrap_or_default().to_string(),
            author_email: author.email().unwrap_or_default().to_string(),
            message: String::from_utf8_lossy(commit.message_bytes())
                .trim_end()
                .to_string(),
            parent_ids,
            timestamp: timestamp_from_secs(author.when().seconds()),
        })
    }

    // =========================================================================
    // Trees and blobs
    // =========================================================================

    fn tree_at(&self, oid: &Oid) -> Result<git2::Tree<'_>, GitError> {
        self.find_commit(oid)?
            .tree()
            .map_err(|e| GitError::internal("read tree", e))
    }

    fn entry_at(&self, oid: &Oid, path: &str) -> Result<git2::TreeEntry<'static>, GitError> {
        self.tree_at(oid)?
            .get_path(Path::new(path))
            .map_err(|_| GitError::PathNotFound {
                path: path.to_string(),
                revision: oid.to_string(),
            })
    }

    fn info_for(&self, path: String, entry: &git2::TreeEntry<'_>) -> Result<FileInfo, GitError> {
        let is_dir = entry.kind() == Some(git2::ObjectType::Tree);
        let size = if entry.kind() == Some(git2::ObjectType::Blob) {
            self.repo
                .find_blob(entry.id())
                .map_err(|e| GitError::internal(&path, e))?
                .size() as u64
        } else {
            0
        };
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        Ok(FileInfo {
            name,
            path,
            size,
            is_dir,
            mode: entry.filemode() as u32,
        })
    }

    /// Raw bytes of the file at `path` in revision `oid`.
    pub fn read_blob(&self, oid: &Oid, path: &str) -> Result<Vec<u8>, GitError> {
        let entry = self.entry_at(oid, path)?;
        if entry.kind() == Some(git2::ObjectType::Tree) {
            return Err(GitError::NotAFile {
                path: path.to_string(),
            });
        }
        let blob = self
            .repo
            .find_blob(entry.id())
            .map_err(|e| GitError::internal(path, e))?;
        Ok(blob.content().to_vec())
    }

    /// File at `path` in revision `oid` as UTF-8 text.
    pub fn read_blob_as_string(&self, oid: &Oid, path: &str) -> Result<String, GitError> {
        let bytes = self.read_blob(oid, path)?;
        String::from_utf8(bytes).map_err(|_| GitError::InvalidUtf8 {
            oid: format!("{}:{}", oid, path),
        })
    }

    /// Metadata for one path at revision `oid`.
    pub fn stat(&self, oid: &Oid, path: &str) -> Result<FileInfo, GitError> {
        let entry = self.entry_at(oid, path)?;
        self.info_for(path.to_string(), &entry)
    }

    /// Every tree entry at revision `oid`, directories included, in pre-order.
    pub fn list_tree(&self, oid: &Oid) -> Result<Vec<FileInfo>, GitError> {
        let tree = self.tree_at(oid)?;
        let mut entries = Vec::new();
        let mut failure = None;

        let walked = tree.walk(git2::TreeWalkMode::PreOrder, |root, entry| {
            let path = format!("{}{}", root, entry.name().unwrap_or_default());
            match self.info_for(path, entry) {
                Ok(info) => {
                    entries.push(info);
                    git2::TreeWalkResult::Ok
                }
                Err(e) => {
                    failure = Some(e);
                    git2::TreeWalkResult::Abort
                }
            }
        });

        // An aborted walk reports a libgit2 error; the captured one is the cause.
        match (failure, walked) {
            (Some(e), _) => Err(e),
            (None, Err(e)) => Err(GitError::internal("walk tree", e)),
            (None, Ok(())) => Ok(entries),
        }
    }
}
