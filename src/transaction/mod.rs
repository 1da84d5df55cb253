pub mod concurrency;
pub mod wal;

mod buffer_list;
mod manager;
mod recovery;
mod transaction;

pub use manager::TransactionManager;
pub use recovery::RecoveryManager;
pub use transaction::{Transaction, TransactionError};
