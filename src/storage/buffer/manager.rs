use std::sync::Arc;
use std::time::{Duration, Instant};

use log::warn;
use parking_lot::{Condvar, Mutex};

use crate::common::types::TxId;
use crate::storage::buffer::error::BufferError;
use crate::storage::buffer::frame::{Frame, FrameHandle};
use crate::storage::disk::{BlockId, DiskManager};
use crate::transaction::wal::LogManager;

/// How long a pin request waits for a free frame before giving up.
pub const MAX_PIN_WAIT: Duration = Duration::from_secs(10);

/// BufferManager owns a fixed pool of frames and assigns them to blocks on
/// demand.
///
/// `pin` prefers a frame already holding the requested block, then the
/// first unpinned frame, and otherwise waits on a condition variable until
/// an unpin frees one, up to a bounded wait. Reassigning a frame flushes
/// its previous contents first, which keeps the write-ahead ordering: the
/// frame's log record is forced before its page bytes reach disk.
pub struct BufferManager {
    pool: Vec<FrameHandle>,
    available: Mutex<usize>,
    cond: Condvar,
    max_wait: Duration,
}

impl BufferManager {
    pub fn new(
        disk_manager: Arc<DiskManager>,
        log_manager: Arc<LogManager>,
        pool_size: usize,
    ) -> Self {
        Self::with_timeout(disk_manager, log_manager, pool_size, MAX_PIN_WAIT)
    }

    /// Like [`BufferManager::new`] with an explicit bound on how long a
    /// pin request may wait.
    pub fn with_timeout(
        disk_manager: Arc<DiskManager>,
        log_manager: Arc<LogManager>,
        pool_size: usize,
        max_wait: Duration,
    ) -> Self {
        let pool = (0..pool_size)
            .map(|_| {
                Arc::new(Mutex::new(Frame::new(
                    Arc::clone(&disk_manager),
                    Arc::clone(&log_manager),
                )))
            })
            .collect();

        Self {
            pool,
            available: Mutex::new(pool_size),
            cond: Condvar::new(),
            max_wait,
        }
    }

    /// The number of currently unpinned frames.
    pub fn available(&self) -> usize {
        *self.available.lock()
    }

    /// Pin a frame to `block`, reading the block in if necessary.
    ///
    /// Blocks while the pool is exhausted; a request that cannot be served
    /// within the wait bound fails with [`BufferError::Timeout`].
    pub fn pin(&self, block: &BlockId) -> Result<FrameHandle, BufferError> {
        let deadline = Instant::now() + self.max_wait;
        let mut available = self.available.lock();

        loop {
            if let Some(frame) = self.try_to_pin(block, &mut available)? {
                return Ok(frame);
            }
            if self.cond.wait_until(&mut available, deadline).timed_out() {
                warn!("pin request for {} timed out", block);
                return Err(BufferError::Timeout);
            }
        }
    }

    /// Release one pin on `frame`. When the pin count reaches zero the
    /// frame becomes eligible for replacement and waiting pinners are
    /// woken.
    pub fn unpin(&self, frame: &FrameHandle) {
        let mut available = self.available.lock();
        let mut frame = frame.lock();

        frame.unpin();
        if !frame.is_pinned() {
            *available += 1;
            self.cond.notify_all();
        }
    }

    /// Flush every frame dirtied by `tx`, leaving other transactions'
    /// dirty frames untouched.
    pub fn flush_all(&self, tx: TxId) -> Result<(), BufferError> {
        let _available = self.available.lock();
        for handle in &self.pool {
            let mut frame = handle.lock();
            if frame.modifying_tx() == tx {
                frame.flush()?;
            }
        }
        Ok(())
    }

    /// One pass of the pin protocol. Must run with the pool mutex held;
    /// returns `None` when every frame is pinned to some other block.
    fn try_to_pin(
        &self,
        block: &BlockId,
        available: &mut usize,
    ) -> Result<Option<FrameHandle>, BufferError> {
        // A frame already holding this block is shared.
        for handle in &self.pool {
            let mut frame = handle.lock();
            if frame.block() == Some(block) {
                if !frame.is_pinned() {
                    *available -= 1;
                }
                frame.pin();
                return Ok(Some(Arc::clone(handle)));
            }
        }

        // Otherwise take the first unpinned frame and repoint it.
        for handle in &self.pool {
            let mut frame = handle.lock();
            if !frame.is_pinned() {
                frame.assign_to_block(block.clone())?;
                *available -= 1;
                frame.pin();
                return Ok(Some(Arc::clone(handle)));
            }
        }

        Ok(None)
    }
}
