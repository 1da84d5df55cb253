use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::warn;
use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use crate::storage::disk::BlockId;

/// How long a lock request waits before it is aborted.
pub const MAX_LOCK_WAIT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum LockError {
    #[error("lock request aborted after waiting too long")]
    Timeout,
}

/// LockTable grants block-granular shared and exclusive locks to all
/// transactions of one database instance.
///
/// The lock state per block is a single integer: positive values count
/// shared holders, −1 marks one exclusive holder, and an absent entry means
/// unlocked. Incompatible requests wait on a condition variable; a request
/// that waits longer than the bound fails with [`LockError::Timeout`],
/// which is the only deadlock defense at this layer, and the caller is
/// expected to roll back.
pub struct LockTable {
    locks: Mutex<HashMap<BlockId, i32>>,
    cond: Condvar,
    max_wait: Duration,
}

impl LockTable {
    pub fn new() -> Self {
        Self::with_timeout(MAX_LOCK_WAIT)
    }

    /// Like [`LockTable::new`] with an explicit bound on lock waits.
    pub fn with_timeout(max_wait: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            cond: Condvar::new(),
            max_wait,
        }
    }

    /// Acquire a shared lock on `block`, waiting out any exclusive holder.
    pub fn s_lock(&self, block: &BlockId) -> Result<(), LockError> {
        let deadline = Instant::now() + self.max_wait;
        let mut locks = self.locks.lock();

        while Self::has_x_lock(&locks, block) {
            if self.cond.wait_until(&mut locks, deadline).timed_out() {
                warn!("shared lock request for {} timed out", block);
                return Err(LockError::Timeout);
            }
        }

        *locks.entry(block.clone()).or_insert(0) += 1;
        Ok(())
    }

    /// Acquire an exclusive lock on `block`.
    ///
    /// The caller must already hold a shared lock on the block (the
    /// concurrency manager guarantees this), so a holder count above one
    /// means some other transaction is still reading.
    pub fn x_lock(&self, block: &BlockId) -> Result<(), LockError> {
        let deadline = Instant::now() + self.max_wait;
        let mut locks = self.locks.lock();

        while Self::has_other_s_locks(&locks, block) {
            if self.cond.wait_until(&mut locks, deadline).timed_out() {
                warn!("exclusive lock request for {} timed out", block);
                return Err(LockError::Timeout);
            }
        }

        locks.insert(block.clone(), -1);
        Ok(())
    }

    /// Release one lock on `block`. Dropping the last holder removes the
    /// entry and wakes every waiter.
    pub fn unlock(&self, block: &BlockId) {
        let mut locks = self.locks.lock();
        match locks.get_mut(block) {
            Some(value) if *value > 1 => *value -= 1,
            Some(_) => {
                locks.remove(block);
                self.cond.notify_all();
            }
            None => {}
        }
    }

    fn has_x_lock(locks: &HashMap<BlockId, i32>, block: &BlockId) -> bool {
        locks.get(block).is_some_and(|&value| value < 0)
    }

    fn has_other_s_locks(locks: &HashMap<BlockId, i32>, block: &BlockId) -> bool {
        locks.get(block).is_some_and(|&value| value > 1)
    }
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new()
    }
}
