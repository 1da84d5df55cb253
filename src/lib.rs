// Export public modules
pub mod common;
pub mod storage;
pub mod transaction;

// Re-export key items for convenient access
pub use common::config::StorageConfig;
pub use storage::buffer::{BufferError, BufferManager};
pub use storage::disk::{BlockId, DiskManager};
pub use storage::page::{Page, PageError};
pub use transaction::{Transaction, TransactionError, TransactionManager};
