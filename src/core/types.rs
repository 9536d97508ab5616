//! core::types
//!
//! Strong types for the document store's domain.
//!
//! # Types
//!
//! - [`RepoId`] - Validated repository identity (`team/docs`)
//! - [`BranchName`] / [`TagName`] - Validated git ref short names
//! - [`Oid`] - Revision identifier (git object id)
//! - [`Signature`] - Committer identity plus timestamp
//! - [`FileChange`] - One file of a save batch
//! - [`Revision`] - An immutable commit record
//! - [`FileInfo`] - Tree entry metadata at a revision
//!
//! # Validation
//!
//! Names and identities are validated at construction time, so an invalid
//! branch or repository name never reaches the git engine.
//!
//! # Examples
//!
//! ```
//! use revstore::core::types::{BranchName, Oid, RepoId};
//!
//! let repo = RepoId::new("team/handbook").unwrap();
//! let branch = BranchName::new("drafts/intro").unwrap();
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//!
//! assert!(RepoId::new("../escape").is_err());
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::paths::{ORIGIN_SUFFIX, WORK_SUFFIX};

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid tag name: {0}")]
    InvalidTagName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid repository id: {0}")]
    InvalidRepoId(String),

    #[error("invalid file path: {0}")]
    InvalidPath(String),
}

/// Check a short ref name (branch or tag) against git's refname rules.
///
/// Returns the reason for rejection; callers wrap it in the right variant.
fn check_ref_short_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name cannot be empty".into());
    }
    if name == "@" {
        return Err("name cannot be '@' (reserved)".into());
    }
    if name.starts_with('-') {
        return Err("name cannot start with '-'".into());
    }
    if name.ends_with('/') {
        return Err("name cannot end with '/'".into());
    }

    for forbidden in ["..", "@{", "//"] {
        if name.contains(forbidden) {
            return Err(format!("name cannot contain '{forbidden}'"));
        }
    }

    const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
    if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
        return Err(format!("name cannot contain '{c}'"));
    }
    if name.chars().any(|c| c.is_ascii_control()) {
        return Err("name cannot contain control characters".into());
    }

    for component in name.split('/') {
        if component.starts_with('.') {
            return Err("path component cannot start with '.'".into());
        }
        if component.ends_with(".lock") {
            return Err("path component cannot end with '.lock'".into());
        }
    }

    Ok(())
}

/// A validated git branch name.
///
/// Branch names follow `git check-ref-format --branch` rules.
///
/// # Example
///
/// ```
/// use revstore::core::types::BranchName;
///
/// let name = BranchName::new("feature/outline").unwrap();
/// assert_eq!(name.as_str(), "feature/outline");
/// assert_eq!(name.remote_ref("origin"), "refs/remotes/origin/feature/outline");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("branch.lock").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        check_ref_short_name(&name).map_err(TypeError::InvalidBranchName)?;
        Ok(Self(name))
    }

    /// Full local ref (`refs/heads/<name>`).
    pub fn local_ref(&self) -> String {
        format!("refs/heads/{}", self.0)
    }

    /// Full remote-tracking ref (`refs/remotes/<remote>/<name>`).
    pub fn remote_ref(&self, remote: &str) -> String {
        format!("refs/remotes/{}/{}", remote, self.0)
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated git tag name.
///
/// Tags share the branch naming rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagName(String);

impl TagName {
    /// Create a new validated tag name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        check_ref_short_name(&name).map_err(TypeError::InvalidTagName)?;
        Ok(Self(name))
    }

    /// Full tag ref (`refs/tags/<name>`).
    pub fn tag_ref(&self) -> String {
        format!("refs/tags/{}", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TagName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<TagName> for String {
    fn from(name: TagName) -> Self {
        name.0
    }
}

impl std::fmt::Display for TagName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A git object identifier (SHA-1 or SHA-256), used as the revision id.
///
/// OIDs are normalized to lowercase for consistency.
///
/// # Example
///
/// ```
/// use revstore::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a 40 or 64
    /// character hex id.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().trim().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the OID.
    ///
    /// Returns the first `len` characters, or the full id if `len` exceeds it.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated repository identity.
///
/// Repository ids are relative, slash-separated paths. The same id maps
/// onto both the origin store and the working copy, so it must never
/// escape either root. Hidden components (leading `.`) are reserved for
/// store-internal directories.
///
/// # Example
///
/// ```
/// use revstore::core::types::RepoId;
///
/// let id = RepoId::new("test/notes").unwrap();
/// assert_eq!(id.components().collect::<Vec<_>>(), vec!["test", "notes"]);
///
/// assert!(RepoId::new("/abs").is_err());
/// assert!(RepoId::new("a/../b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoId(String);

impl RepoId {
    /// Create a new validated repository id.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.is_empty() {
            return Err(TypeError::InvalidRepoId("id cannot be empty".into()));
        }
        if id.starts_with('/') || id.ends_with('/') {
            return Err(TypeError::InvalidRepoId(
                "id cannot start or end with '/'".into(),
            ));
        }
        if id.contains('\\') || id.chars().any(|c| c.is_control()) {
            return Err(TypeError::InvalidRepoId(
                "id cannot contain backslashes or control characters".into(),
            ));
        }
        for component in id.split('/') {
            match component {
                "" => return Err(TypeError::InvalidRepoId("id cannot contain '//'".into())),
                c if c.starts_with('.') => {
                    return Err(TypeError::InvalidRepoId(
                        "id components cannot start with '.'".into(),
                    ))
                }
                c if c.ends_with(ORIGIN_SUFFIX) || c.ends_with(WORK_SUFFIX) => {
                    return Err(TypeError::InvalidRepoId(format!(
                        "id components cannot end with '{ORIGIN_SUFFIX}' or '{WORK_SUFFIX}'"
                    )))
                }
                _ => {}
            }
        }
        Ok(Self(id))
    }

    /// Iterate the slash-separated components.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RepoId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RepoId> for String {
    fn from(id: RepoId) -> Self {
        id.0
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Committer identity attached to a new revision.
///
/// `when` becomes both the author and committer date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub when: DateTime<Utc>,
}

impl Signature {
    /// Signature stamped with the current time.
    pub fn now(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            when: Utc::now(),
        }
    }

    /// Same identity with an explicit timestamp.
    pub fn at(mut self, when: DateTime<Utc>) -> Self {
        self.when = when;
        self
    }

    /// Date in git's internal format (`<unix seconds> +0000`).
    pub fn git_date(&self) -> String {
        format!("{} +0000", self.when.timestamp())
    }

    /// Environment variables that make git record this identity.
    pub fn git_env(&self) -> [(&'static str, String); 6] {
        [
            ("GIT_AUTHOR_NAME", self.name.clone()),
            ("GIT_AUTHOR_EMAIL", self.email.clone()),
            ("GIT_AUTHOR_DATE", self.git_date()),
            ("GIT_COMMITTER_NAME", self.name.clone()),
            ("GIT_COMMITTER_EMAIL", self.email.clone()),
            ("GIT_COMMITTER_DATE", self.git_date()),
        ]
    }
}

/// One file to write as part of a save.
///
/// Paths are relative and slash-separated; parent directories are created
/// implicitly when the change is materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub data: Vec<u8>,
}

impl FileChange {
    pub fn new(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
        }
    }

    /// Return the path once it is known to stay inside a working copy.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidPath` for empty or absolute paths, `.`/`..`
    /// components, or anything under `.git`.
    pub fn validated_path(&self) -> Result<&str, TypeError> {
        let path = self.path.as_str();
        if path.is_empty() {
            return Err(TypeError::InvalidPath("path cannot be empty".into()));
        }
        if path.starts_with('/') || path.contains('\\') {
            return Err(TypeError::InvalidPath(format!(
                "'{path}' must be relative and slash-separated"
            )));
        }
        for component in path.split('/') {
            match component {
                "" | "." | ".." => {
                    return Err(TypeError::InvalidPath(format!(
                        "'{path}' contains an empty, '.' or '..' component"
                    )))
                }
                ".git" => {
                    return Err(TypeError::InvalidPath(format!(
                        "'{path}' points into the git directory"
                    )))
                }
                _ => {}
            }
        }
        Ok(path)
    }
}

/// An immutable revision (commit) record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub id: Oid,
    pub author_name: String,
    pub author_email: String,
    pub message: String,
    /// Parent ids in DAG order; the first parent is the primary ancestor.
    pub parent_ids: Vec<Oid>,
    pub timestamp: DateTime<Utc>,
}

/// Convert a git timestamp (seconds since epoch) to UTC.
pub fn timestamp_from_secs(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

/// Metadata for one tree entry at a revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Path relative to the repository root (`/` for the root itself).
    pub path: String,
    /// Final path component.
    pub name: String,
    /// Blob size in bytes; zero for directories.
    pub size: u64,
    pub is_dir: bool,
    /// Git file mode (`0o100644`, `0o100755`, `0o040000`, ...).
    pub mode: u32,
}

impl FileInfo {
    /// Git mode for trees.
    pub const DIR_MODE: u32 = 0o040000;

    /// The synthetic repository root, which always exists.
    pub fn root() -> Self {
        Self {
            path: "/".into(),
            name: "/".into(),
            size: 0,
            is_dir: true,
            mode: Self::DIR_MODE,
        }
    }
}
