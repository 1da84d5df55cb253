use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use log::info;

use crate::common::config::StorageConfig;
use crate::common::types::Lsn;
use crate::storage::buffer::BufferManager;
use crate::storage::disk::DiskManager;
use crate::transaction::concurrency::LockTable;
use crate::transaction::transaction::{Result, Transaction};
use crate::transaction::wal::{LogManager, LogRecord};

/// TransactionManager assembles the storage kernel (disk, log and buffer
/// managers plus the shared lock table) and hands out transactions with
/// database-scoped, monotonically increasing ids.
pub struct TransactionManager {
    disk_manager: Arc<DiskManager>,
    log_manager: Arc<LogManager>,
    buffer_manager: Arc<BufferManager>,
    lock_table: Arc<LockTable>,
    next_tx_num: AtomicI32,
}

impl TransactionManager {
    /// Bring up a storage engine for the directory named in `config`,
    /// creating it on first use.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let disk_manager = Arc::new(DiskManager::new(&config.directory, config.block_size)?);
        let log_manager = Arc::new(LogManager::new(
            Arc::clone(&disk_manager),
            config.log_file.clone(),
        )?);
        let buffer_manager = Arc::new(BufferManager::with_timeout(
            Arc::clone(&disk_manager),
            Arc::clone(&log_manager),
            config.buffer_pool_size,
            config.pin_timeout,
        ));
        let lock_table = Arc::new(LockTable::with_timeout(config.lock_timeout));

        info!(
            "storage engine ready at {:?} ({}-byte blocks, {} frames)",
            config.directory, config.block_size, config.buffer_pool_size
        );

        Ok(Self {
            disk_manager,
            log_manager,
            buffer_manager,
            lock_table,
            next_tx_num: AtomicI32::new(1),
        })
    }

    /// Begin a new transaction.
    pub fn begin(&self) -> Result<Transaction> {
        let tx_num = self.next_tx_num.fetch_add(1, Ordering::SeqCst);
        Transaction::new(
            Arc::clone(&self.disk_manager),
            Arc::clone(&self.log_manager),
            Arc::clone(&self.buffer_manager),
            Arc::clone(&self.lock_table),
            tx_num,
        )
    }

    /// Run restart recovery: undo every change of transactions that were
    /// in flight when the previous session ended, inside a fresh
    /// transaction that is committed afterwards to release its locks.
    pub fn recover(&self) -> Result<()> {
        let tx = self.begin()?;
        tx.recover()?;
        tx.commit()
    }

    /// Append the placeholder Checkpoint record and force it to disk.
    /// Records older than the checkpoint are invisible to recovery scans.
    pub fn checkpoint(&self) -> Result<Lsn> {
        let lsn = LogRecord::Checkpoint.append_to(&self.log_manager)?;
        self.log_manager.flush(lsn)?;
        Ok(lsn)
    }

    pub fn buffer_manager(&self) -> &Arc<BufferManager> {
        &self.buffer_manager
    }

    /// The database's block size.
    pub fn block_size(&self) -> usize {
        self.disk_manager.block_size()
    }
}
