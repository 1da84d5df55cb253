/// Transaction id type
pub type TxId = i32;

/// LSN (Log Sequence Number) type
pub type Lsn = i32;

/// Sentinel transaction id for a frame that holds no uncommitted change.
pub const NO_TX: TxId = -1;

/// Sentinel LSN for a change that was never logged (undo writes).
pub const NO_LSN: Lsn = -1;
