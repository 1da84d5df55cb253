use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the storage engine
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Database directory; created if absent
    pub directory: PathBuf,

    /// Block/page size in bytes; fixed for the life of a database
    pub block_size: usize,

    /// Number of frames in the buffer pool
    pub buffer_pool_size: usize,

    /// Name of the write-ahead log file inside the database directory
    pub log_file: String,

    /// How long a client waits for a free buffer frame before giving up
    pub pin_timeout: Duration,

    /// How long a lock request waits before it is aborted
    pub lock_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("chalkdb_data"),
            block_size: 4096,
            buffer_pool_size: 8,
            log_file: "chalkdb.log".to_string(),
            pin_timeout: Duration::from_secs(10),
            lock_timeout: Duration::from_secs(10),
        }
    }
}
