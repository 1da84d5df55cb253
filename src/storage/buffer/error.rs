use thiserror::Error;

use crate::storage::disk::DiskManagerError;
use crate::transaction::wal::LogManagerError;

#[derive(Error, Debug)]
pub enum BufferError {
    #[error("buffer request timed out waiting for a free frame")]
    Timeout,

    #[error("disk error: {0}")]
    Disk(#[from] DiskManagerError),

    #[error("log error: {0}")]
    Log(#[from] LogManagerError),
}
