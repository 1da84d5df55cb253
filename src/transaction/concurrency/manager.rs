use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::storage::disk::BlockId;
use crate::transaction::concurrency::lock_table::{LockError, LockTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockMode {
    Shared,
    Exclusive,
}

/// ConcurrencyManager tracks the locks one transaction holds and keeps its
/// requests to the shared [`LockTable`] idempotent: once a block is held in
/// the right mode, further requests for it never re-enter the table.
///
/// Exclusive requests first take the shared lock, establishing the
/// promotion precondition the lock table relies on. All locks are held
/// until [`ConcurrencyManager::release`], per strict two-phase locking.
pub struct ConcurrencyManager {
    lock_table: Arc<LockTable>,
    held: Mutex<HashMap<BlockId, LockMode>>,
}

impl ConcurrencyManager {
    pub fn new(lock_table: Arc<LockTable>) -> Self {
        Self {
            lock_table,
            held: Mutex::new(HashMap::new()),
        }
    }

    /// Obtain a shared lock on `block`; a no-op if this transaction
    /// already holds the block in either mode.
    pub fn s_lock(&self, block: &BlockId) -> Result<(), LockError> {
        if self.held.lock().contains_key(block) {
            return Ok(());
        }

        self.lock_table.s_lock(block)?;
        self.held.lock().insert(block.clone(), LockMode::Shared);
        Ok(())
    }

    /// Obtain an exclusive lock on `block`, promoting an existing shared
    /// hold; a no-op if the block is already held exclusively.
    pub fn x_lock(&self, block: &BlockId) -> Result<(), LockError> {
        if self.held.lock().get(block) == Some(&LockMode::Exclusive) {
            return Ok(());
        }

        self.s_lock(block)?;
        self.lock_table.x_lock(block)?;
        self.held.lock().insert(block.clone(), LockMode::Exclusive);
        Ok(())
    }

    /// Release every lock this transaction holds.
    pub fn release(&self) {
        let mut held = self.held.lock();
        for block in held.keys() {
            self.lock_table.unlock(block);
        }
        held.clear();
    }
}
