use std::sync::Arc;

use thiserror::Error;

use crate::common::types::{TxId, NO_LSN};
use crate::storage::buffer::{BufferError, BufferManager};
use crate::storage::disk::{BlockId, DiskManager, DiskManagerError};
use crate::storage::page::PageError;
use crate::transaction::buffer_list::BufferList;
use crate::transaction::concurrency::{ConcurrencyManager, LockError, LockTable};
use crate::transaction::recovery::RecoveryManager;
use crate::transaction::wal::{LogManager, LogManagerError};

/// Block number used to lock "the end of a file" so that size checks and
/// appends serialize against each other.
const END_OF_FILE: i32 = -1;

/// Errors that can occur while executing a transaction
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("block {0} is not pinned by this transaction")]
    BlockNotPinned(BlockId),

    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    #[error("buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("page error: {0}")]
    Page(#[from] PageError),

    #[error("disk error: {0}")]
    Disk(#[from] DiskManagerError),

    #[error("log error: {0}")]
    Log(#[from] LogManagerError),

    #[error("internal transaction error: {0}")]
    Internal(String),
}

/// Result type for transaction operations
pub type Result<T> = std::result::Result<T, TransactionError>;

/// Transaction is the client-facing façade over the storage kernel: it
/// combines lock acquisition, buffer pinning, undo logging and recovery
/// behind block-addressed read and write calls.
///
/// Every read takes a shared lock and every write an exclusive lock on the
/// touched block, and all locks are held until commit or rollback (strict
/// two-phase locking), so concurrent transactions serialize. Lock and
/// buffer acquisition can fail with a timeout error; the caller is expected
/// to roll back when that happens.
///
/// A transaction is driven by a single thread; its operations are not
/// meant to be called from several threads at once.
pub struct Transaction {
    tx_num: TxId,
    disk_manager: Arc<DiskManager>,
    buffer_manager: Arc<BufferManager>,
    recovery_manager: RecoveryManager,
    concurrency_manager: ConcurrencyManager,
    buffer_list: BufferList,
}

impl Transaction {
    /// Create a transaction over the shared managers. Writes the Start
    /// record as a side effect.
    pub(crate) fn new(
        disk_manager: Arc<DiskManager>,
        log_manager: Arc<LogManager>,
        buffer_manager: Arc<BufferManager>,
        lock_table: Arc<LockTable>,
        tx_num: TxId,
    ) -> Result<Self> {
        let recovery_manager =
            RecoveryManager::new(log_manager, Arc::clone(&buffer_manager), tx_num)?;

        Ok(Self {
            tx_num,
            disk_manager,
            buffer_manager: Arc::clone(&buffer_manager),
            recovery_manager,
            concurrency_manager: ConcurrencyManager::new(lock_table),
            buffer_list: BufferList::new(buffer_manager),
        })
    }

    /// This transaction's id.
    pub fn tx_num(&self) -> TxId {
        self.tx_num
    }

    /// Commit: make every change of this transaction durable, then release
    /// all locks and pins.
    pub fn commit(&self) -> Result<()> {
        self.recovery_manager.commit()?;
        self.concurrency_manager.release();
        self.buffer_list.unpin_all();
        Ok(())
    }

    /// Roll back: undo every change of this transaction, then release all
    /// locks and pins.
    pub fn rollback(&self) -> Result<()> {
        self.recovery_manager.rollback(self)?;
        self.concurrency_manager.release();
        self.buffer_list.unpin_all();
        Ok(())
    }

    /// Run restart recovery through this transaction: flush any stray
    /// dirty frames, then undo all changes of transactions that never
    /// finished. Called once on a fresh transaction at database startup.
    pub fn recover(&self) -> Result<()> {
        self.buffer_manager.flush_all(self.tx_num)?;
        self.recovery_manager.recover(self)
    }

    /// Pin `block` into a buffer frame for the duration of this
    /// transaction (or until a matching [`Transaction::unpin`]).
    pub fn pin(&self, block: &BlockId) -> Result<()> {
        Ok(self.buffer_list.pin(block)?)
    }

    /// Release one pin of `block`.
    pub fn unpin(&self, block: &BlockId) {
        self.buffer_list.unpin(block);
    }

    /// Read the i32 at `offset` of `block` under a shared lock.
    pub fn read_int(&self, block: &BlockId, offset: usize) -> Result<i32> {
        self.concurrency_manager.s_lock(block)?;
        let frame = self.pinned_frame(block)?;
        let frame = frame.lock();
        Ok(frame.contents().read_int(offset)?)
    }

    /// Read the string at `offset` of `block` under a shared lock.
    pub fn read_string(&self, block: &BlockId, offset: usize) -> Result<String> {
        self.concurrency_manager.s_lock(block)?;
        let frame = self.pinned_frame(block)?;
        let frame = frame.lock();
        Ok(frame.contents().read_string(offset)?)
    }

    /// Write `value` at `offset` of `block` under an exclusive lock.
    ///
    /// With `log` set, the before image is logged first and the frame is
    /// tagged with the record's LSN; recovery undo passes `log = false`
    /// and leaves the frame's LSN alone.
    pub fn write_int(&self, block: &BlockId, offset: usize, value: i32, log: bool) -> Result<()> {
        self.concurrency_manager.x_lock(block)?;
        let frame = self.pinned_frame(block)?;
        let mut frame = frame.lock();

        let lsn = if log {
            self.recovery_manager.set_int(&frame, offset, value)?
        } else {
            NO_LSN
        };

        frame.contents_mut().write_int(offset, value)?;
        frame.set_modified(self.tx_num, lsn);
        Ok(())
    }

    /// String flavor of [`Transaction::write_int`].
    pub fn write_string(
        &self,
        block: &BlockId,
        offset: usize,
        value: &str,
        log: bool,
    ) -> Result<()> {
        self.concurrency_manager.x_lock(block)?;
        let frame = self.pinned_frame(block)?;
        let mut frame = frame.lock();

        let lsn = if log {
            self.recovery_manager.set_string(&frame, offset, value)?
        } else {
            NO_LSN
        };

        frame.contents_mut().write_string(offset, value)?;
        frame.set_modified(self.tx_num, lsn);
        Ok(())
    }

    /// The number of blocks in `filename`, read under a shared lock on the
    /// end-of-file sentinel so it cannot race a concurrent append.
    pub fn size(&self, filename: &str) -> Result<i32> {
        let sentinel = BlockId::new(filename, END_OF_FILE);
        self.concurrency_manager.s_lock(&sentinel)?;
        Ok(self.disk_manager.size(filename)?)
    }

    /// Extend `filename` by one zeroed block under an exclusive lock on
    /// the end-of-file sentinel.
    pub fn append(&self, filename: &str) -> Result<BlockId> {
        let sentinel = BlockId::new(filename, END_OF_FILE);
        self.concurrency_manager.x_lock(&sentinel)?;
        Ok(self.disk_manager.append(filename)?)
    }

    /// The database's block size, for layout computations in higher layers.
    pub fn block_size(&self) -> usize {
        self.disk_manager.block_size()
    }

    /// How many buffer frames are currently unpinned.
    pub fn available_buffers(&self) -> usize {
        self.buffer_manager.available()
    }

    fn pinned_frame(&self, block: &BlockId) -> Result<crate::storage::buffer::FrameHandle> {
        self.buffer_list
            .frame(block)
            .ok_or_else(|| TransactionError::BlockNotPinned(block.clone()))
    }
}
