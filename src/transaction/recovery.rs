use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::common::types::{Lsn, TxId};
use crate::storage::buffer::{BufferManager, Frame};
use crate::transaction::transaction::{Transaction, TransactionError};
use crate::transaction::wal::{LogManager, LogRecord, RecordType};

/// Result type for recovery operations
pub type Result<T> = std::result::Result<T, TransactionError>;

/// RecoveryManager writes one transaction's log records and replays the
/// log for rollback and restart recovery, following the undo-only
/// write-ahead protocol.
///
/// Undo-only logging stays safe because commit forces the transaction's
/// dirty pages before the commit record: a transaction found in the log
/// without a terminal record cannot have any committed effect, so writing
/// back every before image erases it.
pub struct RecoveryManager {
    log_manager: Arc<LogManager>,
    buffer_manager: Arc<BufferManager>,
    tx_num: TxId,
}

impl RecoveryManager {
    /// Create the manager for transaction `tx_num`, announcing it in the
    /// log with a Start record.
    pub fn new(
        log_manager: Arc<LogManager>,
        buffer_manager: Arc<BufferManager>,
        tx_num: TxId,
    ) -> Result<Self> {
        LogRecord::Start { tx: tx_num }.append_to(&log_manager)?;
        Ok(Self {
            log_manager,
            buffer_manager,
            tx_num,
        })
    }

    /// Commit: force this transaction's dirty pages (each flush honors the
    /// WAL ordering), then append and force the commit record. When this
    /// returns, the commit is durable.
    pub fn commit(&self) -> Result<()> {
        self.buffer_manager.flush_all(self.tx_num)?;
        let lsn = LogRecord::Commit { tx: self.tx_num }.append_to(&self.log_manager)?;
        self.log_manager.flush(lsn)?;
        debug!("transaction {} committed", self.tx_num);
        Ok(())
    }

    /// Roll back this transaction: undo its changes newest-first, then
    /// persist the result and mark the transaction finished in the log.
    pub fn rollback(&self, tx: &Transaction) -> Result<()> {
        self.do_rollback(tx)?;

        self.buffer_manager.flush_all(self.tx_num)?;
        let lsn = LogRecord::Rollback { tx: self.tx_num }.append_to(&self.log_manager)?;
        self.log_manager.flush(lsn)?;
        debug!("transaction {} rolled back", self.tx_num);
        Ok(())
    }

    /// Restart recovery: undo every change of every unfinished transaction,
    /// then persist and append a terminal record for the recovery pass.
    pub fn recover(&self, tx: &Transaction) -> Result<()> {
        info!("recovery started");
        self.do_recover(tx)?;

        self.buffer_manager.flush_all(self.tx_num)?;
        let lsn = LogRecord::Rollback { tx: self.tx_num }.append_to(&self.log_manager)?;
        self.log_manager.flush(lsn)?;
        info!("recovery complete");
        Ok(())
    }

    /// Log an update to the i32 at `offset` of the page in `frame`,
    /// capturing the current value as the before image. The caller applies
    /// the new value after this returns, tagging the frame with the
    /// returned LSN.
    pub fn set_int(&self, frame: &Frame, offset: usize, _new_value: i32) -> Result<Lsn> {
        let old_value = frame.contents().read_int(offset)?;
        let block = Self::frame_block(frame)?;

        let record = LogRecord::SetInt {
            tx: self.tx_num,
            block,
            offset,
            old_value,
        };
        Ok(record.append_to(&self.log_manager)?)
    }

    /// String flavor of [`RecoveryManager::set_int`].
    pub fn set_string(&self, frame: &Frame, offset: usize, _new_value: &str) -> Result<Lsn> {
        let old_value = frame.contents().read_string(offset)?;
        let block = Self::frame_block(frame)?;

        let record = LogRecord::SetString {
            tx: self.tx_num,
            block,
            offset,
            old_value,
        };
        Ok(record.append_to(&self.log_manager)?)
    }

    /// Scan the log backward, undoing this transaction's updates until its
    /// Start record turns up.
    fn do_rollback(&self, tx: &Transaction) -> Result<()> {
        for record in self.log_manager.iterator()? {
            let Some(record) = Self::decode_or_stop(&record?) else {
                return Ok(());
            };

            if record.tx_number() == self.tx_num {
                if record.op() == RecordType::Start {
                    return Ok(());
                }
                record.undo(tx)?;
            }
        }
        Ok(())
    }

    /// Scan the log backward, collecting finished transactions and undoing
    /// every record of the unfinished ones. A Checkpoint record bounds the
    /// scan: nothing before it can need undoing.
    fn do_recover(&self, tx: &Transaction) -> Result<()> {
        let mut finished: HashSet<TxId> = HashSet::new();

        for record in self.log_manager.iterator()? {
            let Some(record) = Self::decode_or_stop(&record?) else {
                return Ok(());
            };

            match record.op() {
                RecordType::Checkpoint => return Ok(()),
                RecordType::Commit | RecordType::Rollback => {
                    finished.insert(record.tx_number());
                }
                _ => {
                    if !finished.contains(&record.tx_number()) {
                        record.undo(tx)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// An undecodable record ends the scan; everything beyond it is
    /// unreachable anyway because records are parsed newest-first.
    fn decode_or_stop(bytes: &[u8]) -> Option<LogRecord> {
        match LogRecord::decode(bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("log scan stopped at undecodable record: {}", e);
                None
            }
        }
    }

    fn frame_block(frame: &Frame) -> Result<crate::storage::disk::BlockId> {
        frame
            .block()
            .cloned()
            .ok_or_else(|| TransactionError::Internal("frame holds no block".to_string()))
    }
}
