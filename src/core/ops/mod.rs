//! core::ops
//!
//! Coordination primitives for mutating operations.
//!
//! # Modules
//!
//! - [`lock`] - Per-repository exclusive access pool
//!
//! # Architecture
//!
//! Every mutating operation:
//! 1. Acquires its repository's key from the shared pool
//! 2. Clears any stale git index lock left by a crashed operation
//! 3. Aligns the working copy and performs its git steps
//! 4. Clears the index lock again and releases the key, on every exit path

pub mod lock;

pub use lock::{clear_stale_index_lock, ExclusiveAccessPool, PoolGuard, WorkingCopyGuard};
