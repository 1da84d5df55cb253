use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;

use chalkdb::storage::buffer::BufferManager;
use chalkdb::storage::disk::DiskManager;
use chalkdb::transaction::wal::LogManager;
use chalkdb::{StorageConfig, TransactionManager};

pub const TEST_BLOCK_SIZE: usize = 400;
pub const TEST_LOG_FILE: &str = "testlog";

// Route kernel log output through the test harness when RUST_LOG is set
#[allow(dead_code)]
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Configuration pointing at a temporary database directory
#[allow(dead_code)]
pub fn test_config(dir: &TempDir) -> StorageConfig {
    StorageConfig {
        directory: dir.path().to_path_buf(),
        block_size: TEST_BLOCK_SIZE,
        buffer_pool_size: 8,
        log_file: TEST_LOG_FILE.to_string(),
        ..StorageConfig::default()
    }
}

// Create a storage engine backed by a temporary directory
#[allow(dead_code)]
pub fn create_test_engine() -> Result<(TransactionManager, TempDir)> {
    let dir = TempDir::new()?;
    let engine = TransactionManager::new(&test_config(&dir))?;
    Ok((engine, dir))
}

// Create disk and log managers directly, for tests below the engine level
#[allow(dead_code)]
pub fn create_test_managers(
    block_size: usize,
) -> Result<(Arc<DiskManager>, Arc<LogManager>, TempDir)> {
    let dir = TempDir::new()?;
    let disk_manager = Arc::new(DiskManager::new(dir.path(), block_size)?);
    let log_manager = Arc::new(LogManager::new(
        Arc::clone(&disk_manager),
        TEST_LOG_FILE,
    )?);
    Ok((disk_manager, log_manager, dir))
}

// Create a buffer pool over fresh disk and log managers
#[allow(dead_code)]
pub fn create_test_buffer_pool(
    pool_size: usize,
    pin_timeout: Duration,
) -> Result<(Arc<DiskManager>, Arc<BufferManager>, TempDir)> {
    let (disk_manager, log_manager, dir) = create_test_managers(TEST_BLOCK_SIZE)?;
    let buffer_manager = Arc::new(BufferManager::with_timeout(
        Arc::clone(&disk_manager),
        log_manager,
        pool_size,
        pin_timeout,
    ));
    Ok((disk_manager, buffer_manager, dir))
}
