//! core::ops::lock
//!
//! Per-repository exclusive access for mutating operations.
//!
//! # Architecture
//!
//! The [`ExclusiveAccessPool`] is a registry of async mutexes keyed by a
//! repository's origin path. A mutex is created the first time a key is
//! requested and lives as long as the pool; the key space is bounded by the
//! number of managed repositories. Operations never hold two keys at once,
//! so the pool cannot deadlock.
//!
//! Acquisition never fails. It waits until no other operation holds the
//! key; waiters are not ordered.
//!
//! # Invariants
//!
//! - At most one [`PoolGuard`] exists per key at any time
//! - The key is released when the guard drops, on every exit path
//! - A [`WorkingCopyGuard`] clears a stale git `index.lock` in its working
//!   copy when acquired and again before it releases the key
//!
//! # Example
//!
//! ```
//! use revstore::core::ops::lock::ExclusiveAccessPool;
//! use std::path::Path;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let pool = ExclusiveAccessPool::new();
//! let guard = pool.acquire(Path::new("/origins/docs.git")).await;
//! assert!(pool.try_acquire(Path::new("/origins/docs.git")).is_none());
//! drop(guard);
//! assert!(pool.try_acquire(Path::new("/origins/docs.git")).is_some());
//! # });
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::core::paths::{path_exists, StorePaths};

/// Registry of per-key mutual-exclusion locks.
///
/// Cloning shares the same registry.
#[derive(Debug, Clone, Default)]
pub struct ExclusiveAccessPool {
    locks: Arc<Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>>,
}

impl ExclusiveAccessPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or lazily create the mutex for `key`.
    fn entry(&self, key: &Path) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.to_path_buf()).or_default())
    }

    /// Wait until `key` is free, then hold it until the guard drops.
    pub async fn acquire(&self, key: &Path) -> PoolGuard {
        let lock = self.entry(key);
        let guard = lock.lock_owned().await;
        debug!(key = %key.display(), "acquired exclusive access");
        PoolGuard {
            key: key.to_path_buf(),
            _held: guard,
        }
    }

    /// Take `key` only if nobody holds it.
    pub fn try_acquire(&self, key: &Path) -> Option<PoolGuard> {
        let lock = self.entry(key);
        lock.try_lock_owned().ok().map(|guard| PoolGuard {
            key: key.to_path_buf(),
            _held: guard,
        })
    }

    /// Number of keys that have ever been requested.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Held key in an [`ExclusiveAccessPool`]. Dropping it releases the key.
#[derive(Debug)]
pub struct PoolGuard {
    key: PathBuf,
    _held: OwnedMutexGuard<()>,
}

impl Drop for PoolGuard {
    fn drop(&mut self) {
        debug!(key = %self.key.display(), "released exclusive access");
    }
}

/// Exclusive access to one repository plus ownership of its working copy.
///
/// `Drop` runs before the inner [`PoolGuard`] is dropped, so the stale
/// lock artifact is gone before the next waiter gets the key.
#[derive(Debug)]
pub struct WorkingCopyGuard {
    work_path: PathBuf,
    _access: PoolGuard,
}

impl WorkingCopyGuard {
    /// Acquire `origin`'s key and clear leftovers from a crashed operation.
    pub async fn acquire(pool: &ExclusiveAccessPool, origin: &Path, work_path: &Path) -> Self {
        let access = pool.acquire(origin).await;
        clear_stale_index_lock(work_path);
        Self {
            work_path: work_path.to_path_buf(),
            _access: access,
        }
    }
}

impl Drop for WorkingCopyGuard {
    fn drop(&mut self) {
        clear_stale_index_lock(&self.work_path);
    }
}

/// Remove a leftover `.git/index.lock`, logging (never failing) on error.
///
/// Only safe while holding the repository's key: no git process of ours can
/// be writing the index at that point.
pub fn clear_stale_index_lock(work_path: &Path) -> bool {
    let lock_path = StorePaths::index_lock_path(work_path);
    if !path_exists(&lock_path) {
        return false;
    }
    match std::fs::remove_file(&lock_path) {
        Ok(()) => {
            warn!(path = %lock_path.display(), "removed stale git index lock");
            true
        }
        Err(e) => {
            warn!(path = %lock_path.display(), error = %e, "failed to remove stale git index lock");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn acquire_blocks_second_holder() {
        let pool = ExclusiveAccessPool::new();
        let key = Path::new("/origins/a");

        let guard = pool.acquire(key).await;
        assert!(pool.try_acquire(key).is_none());

        drop(guard);
        assert!(pool.try_acquire(key).is_some());
    }

    #[tokio::test]
    async fn different_keys_are_independent() {
        let pool = ExclusiveAccessPool::new();
        let _a = pool.acquire(Path::new("/origins/a")).await;
        let b = pool.try_acquire(Path::new("/origins/b"));
        assert!(b.is_some());
        assert_eq!(pool.len(), 2);
    }

    #[tokio::test]
    async fn clones_share_registry() {
        let pool = ExclusiveAccessPool::new();
        let other = pool.clone();
        let _guard = pool.acquire(Path::new("/k")).await;
        assert!(other.try_acquire(Path::new("/k")).is_none());
    }

    #[tokio::test]
    async fn holders_never_overlap() {
        let pool = ExclusiveAccessPool::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let pool = pool.clone();
            let inside = Arc::clone(&inside);
            let max_seen = Arc::clone(&max_seen);
            tasks.spawn(async move {
                let _guard = pool.acquire(Path::new("/shared")).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test]
    async fn released_on_error_path() {
        async fn failing(pool: &ExclusiveAccessPool) -> Result<(), &'static str> {
            let _guard = pool.acquire(Path::new("/err")).await;
            Err("boom")
        }

        let pool = ExclusiveAccessPool::new();
        assert!(failing(&pool).await.is_err());
        assert!(pool.try_acquire(Path::new("/err")).is_some());
    }

    #[tokio::test]
    async fn working_copy_guard_clears_index_lock() {
        let temp = TempDir::new().unwrap();
        let work = temp.path().join("docs");
        std::fs::create_dir_all(work.join(".git")).unwrap();
        let lock_path = StorePaths::index_lock_path(&work);

        std::fs::write(&lock_path, "").unwrap();
        let pool = ExclusiveAccessPool::new();
        let guard = WorkingCopyGuard::acquire(&pool, Path::new("/origins/docs.git"), &work).await;
        assert!(!lock_path.exists(), "cleared on acquire");

        std::fs::write(&lock_path, "").unwrap();
        drop(guard);
        assert!(!lock_path.exists(), "cleared on release");
        assert!(pool.try_acquire(Path::new("/origins/docs.git")).is_some());
    }

    #[test]
    fn clear_without_artifact_is_noop() {
        let temp = TempDir::new().unwrap();
        assert!(!clear_stale_index_lock(temp.path()));
    }
}
