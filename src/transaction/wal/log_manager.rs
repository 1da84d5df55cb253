use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::common::types::Lsn;
use crate::storage::disk::{BlockId, DiskManager, DiskManagerError};
use crate::storage::page::{Page, PageError};
use crate::transaction::wal::log_iterator::LogIterator;

/// Error type for log manager operations
#[derive(Error, Debug)]
pub enum LogManagerError {
    #[error("disk error: {0}")]
    Disk(#[from] DiskManagerError),

    #[error("page error: {0}")]
    Page(#[from] PageError),

    #[error("log record of {size} bytes cannot fit in a {block_size}-byte log block")]
    RecordTooLarge { size: usize, block_size: usize },
}

/// Result type for log manager operations
pub type Result<T> = std::result::Result<T, LogManagerError>;

struct LogState {
    log_page: Page,
    current_block: BlockId,
    latest_lsn: Lsn,
    last_saved_lsn: Lsn,
}

/// LogManager appends byte records to a single append-only log file and
/// hands out monotonically increasing LSNs.
///
/// The tail block of the log is buffered in memory. Within a block, records
/// grow downward from the end toward byte 4; the first four bytes hold the
/// boundary, the offset of the most recently appended record. Byte layout
/// of one log block:
///
/// ```text
/// [boundary: i32][...unused...][record_N]...[record_1]
/// ```
///
/// This layout is what lets [`LogIterator`] walk the log newest-first.
pub struct LogManager {
    disk_manager: Arc<DiskManager>,
    log_file: String,
    inner: Mutex<LogState>,
}

impl LogManager {
    /// Create a log manager over `log_file`. A missing or empty log file
    /// gets a fresh first block; otherwise the last block is read back in
    /// so appends continue where the previous session stopped.
    pub fn new(disk_manager: Arc<DiskManager>, log_file: impl Into<String>) -> Result<Self> {
        let log_file = log_file.into();
        let mut log_page = Page::new(disk_manager.block_size());

        let log_size = disk_manager.size(&log_file)?;
        let current_block = if log_size == 0 {
            Self::append_new_block(&disk_manager, &log_file, &mut log_page)?
        } else {
            let block = BlockId::new(log_file.clone(), log_size - 1);
            disk_manager.read(&block, &mut log_page)?;
            block
        };

        Ok(Self {
            disk_manager,
            log_file,
            inner: Mutex::new(LogState {
                log_page,
                current_block,
                latest_lsn: 0,
                last_saved_lsn: 0,
            }),
        })
    }

    /// Append a record to the log and return its LSN.
    ///
    /// The record goes into the in-memory tail page; it reaches disk only
    /// when the page fills up or someone calls [`LogManager::flush`].
    pub fn append(&self, record: &[u8]) -> Result<Lsn> {
        let mut state = self.inner.lock();

        let block_size = self.disk_manager.block_size();
        let need = Page::max_length(record.len()) as i32;
        if need > block_size as i32 - 4 {
            return Err(LogManagerError::RecordTooLarge {
                size: record.len(),
                block_size,
            });
        }

        let mut boundary = state.log_page.read_int(0)?;
        if boundary - need < 4 {
            // No room in the tail block; persist it and start a fresh one.
            Self::flush_state(&self.disk_manager, &mut state)?;
            state.current_block =
                Self::append_new_block(&self.disk_manager, &self.log_file, &mut state.log_page)?;
            boundary = state.log_page.read_int(0)?;
        }

        let record_pos = (boundary - need) as usize;
        state.log_page.write_bytes(record_pos, record)?;
        state.log_page.write_int(0, record_pos as i32)?;

        state.latest_lsn += 1;
        Ok(state.latest_lsn)
    }

    /// Ensure every record with an LSN up to `lsn` is on disk.
    ///
    /// The tail page is written as a unit, so when it is written at all,
    /// everything appended so far becomes durable. The guard against
    /// already-saved LSNs only avoids redundant writes.
    pub fn flush(&self, lsn: Lsn) -> Result<()> {
        let mut state = self.inner.lock();
        if lsn >= state.last_saved_lsn {
            Self::flush_state(&self.disk_manager, &mut state)?;
        }
        Ok(())
    }

    /// Return a cursor over the log records, newest first. Flushes the
    /// tail page first so the iterator sees every appended record.
    pub fn iterator(&self) -> Result<LogIterator> {
        let mut state = self.inner.lock();
        Self::flush_state(&self.disk_manager, &mut state)?;
        LogIterator::new(Arc::clone(&self.disk_manager), state.current_block.clone())
    }

    fn flush_state(disk_manager: &DiskManager, state: &mut LogState) -> Result<()> {
        disk_manager.write(&state.current_block, &state.log_page)?;
        state.last_saved_lsn = state.latest_lsn;
        Ok(())
    }

    /// Extend the log file with a zeroed block whose boundary points at the
    /// end of the block (no records yet), and leave `log_page` describing it.
    fn append_new_block(
        disk_manager: &DiskManager,
        log_file: &str,
        log_page: &mut Page,
    ) -> Result<BlockId> {
        let block = disk_manager.append(log_file)?;
        log_page.contents_mut().fill(0);
        log_page.write_int(0, disk_manager.block_size() as i32)?;
        disk_manager.write(&block, log_page)?;
        Ok(block)
    }
}
