use thiserror::Error;

use crate::common::types::{Lsn, TxId};
use crate::storage::disk::BlockId;
use crate::storage::page::{Page, PageError};
use crate::transaction::wal::log_manager::{LogManager, LogManagerError};
use crate::transaction::{Transaction, TransactionError};

/// Error type for log record encoding and decoding
#[derive(Error, Debug)]
pub enum LogRecordError {
    #[error("unknown log record type tag {0}")]
    UnknownRecordType(i32),

    #[error("corrupt log record field: {0}")]
    Corrupt(&'static str),

    #[error("page error: {0}")]
    Page(#[from] PageError),
}

/// Result type for log record operations
pub type Result<T> = std::result::Result<T, LogRecordError>;

/// Discriminant tags for the on-disk record format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Checkpoint = 0,
    Start = 1,
    Commit = 2,
    Rollback = 3,
    SetInt = 4,
    SetString = 5,
}

impl RecordType {
    fn from_i32(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(Self::Checkpoint),
            1 => Some(Self::Start),
            2 => Some(Self::Commit),
            3 => Some(Self::Rollback),
            4 => Some(Self::SetInt),
            5 => Some(Self::SetString),
            _ => None,
        }
    }
}

/// One undo-only log record.
///
/// On disk, every record starts with its 4-byte type tag. Start, Commit and
/// Rollback carry just the transaction id. SetInt and SetString additionally
/// name the block, the offset, and the *before image* of the overwritten
/// value; undoing them writes that image back.
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    Checkpoint,
    Start {
        tx: TxId,
    },
    Commit {
        tx: TxId,
    },
    Rollback {
        tx: TxId,
    },
    SetInt {
        tx: TxId,
        block: BlockId,
        offset: usize,
        old_value: i32,
    },
    SetString {
        tx: TxId,
        block: BlockId,
        offset: usize,
        old_value: String,
    },
}

impl LogRecord {
    /// The record's type tag.
    pub fn op(&self) -> RecordType {
        match self {
            Self::Checkpoint => RecordType::Checkpoint,
            Self::Start { .. } => RecordType::Start,
            Self::Commit { .. } => RecordType::Commit,
            Self::Rollback { .. } => RecordType::Rollback,
            Self::SetInt { .. } => RecordType::SetInt,
            Self::SetString { .. } => RecordType::SetString,
        }
    }

    /// The transaction this record belongs to; −1 for Checkpoint, which
    /// belongs to none.
    pub fn tx_number(&self) -> TxId {
        match self {
            Self::Checkpoint => -1,
            Self::Start { tx }
            | Self::Commit { tx }
            | Self::Rollback { tx }
            | Self::SetInt { tx, .. }
            | Self::SetString { tx, .. } => *tx,
        }
    }

    /// Undo whatever this record describes, writing through `tx`.
    ///
    /// Only SetInt and SetString carry undo information: they pin the
    /// affected block, restore the before image with logging disabled, and
    /// unpin. The transaction markers have nothing to undo.
    pub fn undo(&self, tx: &Transaction) -> std::result::Result<(), TransactionError> {
        match self {
            Self::SetInt {
                block,
                offset,
                old_value,
                ..
            } => {
                tx.pin(block)?;
                tx.write_int(block, *offset, *old_value, false)?;
                tx.unpin(block);
                Ok(())
            }
            Self::SetString {
                block,
                offset,
                old_value,
                ..
            } => {
                tx.pin(block)?;
                tx.write_string(block, *offset, old_value, false)?;
                tx.unpin(block);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Encode this record and append it to the log, returning its LSN.
    pub fn append_to(&self, log_manager: &LogManager) -> std::result::Result<Lsn, LogManagerError> {
        let bytes = self.encode()?;
        log_manager.append(&bytes)
    }

    /// Serialize to the fixed-position big-endian wire format.
    pub fn encode(&self) -> std::result::Result<Vec<u8>, PageError> {
        match self {
            Self::Checkpoint => {
                let mut page = Page::new(4);
                page.write_int(0, RecordType::Checkpoint as i32)?;
                Ok(page.into_bytes())
            }
            Self::Start { tx } | Self::Commit { tx } | Self::Rollback { tx } => {
                let mut page = Page::new(2 * 4);
                page.write_int(0, self.op() as i32)?;
                page.write_int(4, *tx)?;
                Ok(page.into_bytes())
            }
            Self::SetInt {
                tx,
                block,
                offset,
                old_value,
            } => {
                let (fpos, bpos, opos, vpos) = Self::update_layout(block.filename());
                let mut page = Page::new(vpos + 4);
                page.write_int(0, RecordType::SetInt as i32)?;
                page.write_int(4, *tx)?;
                page.write_string(fpos, block.filename())?;
                page.write_int(bpos, block.number())?;
                page.write_int(opos, *offset as i32)?;
                page.write_int(vpos, *old_value)?;
                Ok(page.into_bytes())
            }
            Self::SetString {
                tx,
                block,
                offset,
                old_value,
            } => {
                let (fpos, bpos, opos, vpos) = Self::update_layout(block.filename());
                let mut page = Page::new(vpos + Page::max_length(old_value.len()));
                page.write_int(0, RecordType::SetString as i32)?;
                page.write_int(4, *tx)?;
                page.write_string(fpos, block.filename())?;
                page.write_int(bpos, block.number())?;
                page.write_int(opos, *offset as i32)?;
                page.write_string(vpos, old_value)?;
                Ok(page.into_bytes())
            }
        }
    }

    /// Parse raw record bytes, dispatching on the leading type tag.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let page = Page::from_bytes(bytes.to_vec());
        let tag = page.read_int(0)?;
        let op = RecordType::from_i32(tag).ok_or(LogRecordError::UnknownRecordType(tag))?;

        match op {
            RecordType::Checkpoint => Ok(Self::Checkpoint),
            RecordType::Start => Ok(Self::Start { tx: page.read_int(4)? }),
            RecordType::Commit => Ok(Self::Commit { tx: page.read_int(4)? }),
            RecordType::Rollback => Ok(Self::Rollback { tx: page.read_int(4)? }),
            RecordType::SetInt => {
                let (tx, block, offset, vpos) = Self::decode_update_header(&page)?;
                Ok(Self::SetInt {
                    tx,
                    block,
                    offset,
                    old_value: page.read_int(vpos)?,
                })
            }
            RecordType::SetString => {
                let (tx, block, offset, vpos) = Self::decode_update_header(&page)?;
                Ok(Self::SetString {
                    tx,
                    block,
                    offset,
                    old_value: page.read_string(vpos)?,
                })
            }
        }
    }

    /// Field positions shared by SetInt and SetString:
    /// tag, txNum, filename (length-prefixed), blockNum, offset, old value.
    fn update_layout(filename: &str) -> (usize, usize, usize, usize) {
        let fpos = 2 * 4;
        let bpos = fpos + Page::max_length(filename.len());
        let opos = bpos + 4;
        let vpos = opos + 4;
        (fpos, bpos, opos, vpos)
    }

    fn decode_update_header(page: &Page) -> Result<(TxId, BlockId, usize, usize)> {
        let tx = page.read_int(4)?;
        let filename = page.read_string(2 * 4)?;
        let (_, bpos, opos, vpos) = Self::update_layout(&filename);
        let number = page.read_int(bpos)?;
        let offset = page.read_int(opos)?;
        let offset = usize::try_from(offset).map_err(|_| LogRecordError::Corrupt("offset"))?;
        Ok((tx, BlockId::new(filename, number), offset, vpos))
    }
}
