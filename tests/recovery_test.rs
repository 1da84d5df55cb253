use anyhow::Result;
use tempfile::TempDir;

use chalkdb::{BlockId, TransactionManager};

mod common;
use common::test_config;

#[test]
fn test_committed_changes_survive_restart() -> Result<()> {
    common::init_logging();
    let dir = TempDir::new()?;
    let block = BlockId::new("testfile", 1);

    {
        let engine = TransactionManager::new(&test_config(&dir))?;
        let tx = engine.begin()?;
        tx.pin(&block)?;
        tx.write_int(&block, 80, 1, true)?;
        tx.write_string(&block, 40, "one", true)?;
        tx.commit()?;
    }

    // A fresh engine over the same directory stands in for a restart.
    let engine = TransactionManager::new(&test_config(&dir))?;
    engine.recover()?;

    let tx = engine.begin()?;
    tx.pin(&block)?;
    assert_eq!(tx.read_int(&block, 80)?, 1);
    assert_eq!(tx.read_string(&block, 40)?, "one");
    tx.commit()?;
    Ok(())
}

#[test]
fn test_recovery_undoes_unfinished_transactions() -> Result<()> {
    common::init_logging();
    let dir = TempDir::new()?;
    let block = BlockId::new("testfile", 1);

    {
        let engine = TransactionManager::new(&test_config(&dir))?;

        let committed = engine.begin()?;
        committed.pin(&block)?;
        committed.write_int(&block, 80, 1, true)?;
        committed.write_string(&block, 40, "one", true)?;
        committed.commit()?;

        // This transaction never finishes. Its dirty page is forced to
        // disk, standing in for an eviction that happened before the
        // crash; the WAL ordering inside the flush makes its undo records
        // durable too.
        let unfinished = engine.begin()?;
        unfinished.pin(&block)?;
        unfinished.write_int(&block, 80, 2, true)?;
        unfinished.write_string(&block, 40, "two", true)?;
        engine.buffer_manager().flush_all(unfinished.tx_num())?;
    }

    let engine = TransactionManager::new(&test_config(&dir))?;

    // Before recovery the disk still shows the unfinished values.
    let peek = engine.begin()?;
    peek.pin(&block)?;
    assert_eq!(peek.read_int(&block, 80)?, 2);
    peek.commit()?;

    engine.recover()?;

    let tx = engine.begin()?;
    tx.pin(&block)?;
    assert_eq!(tx.read_int(&block, 80)?, 1);
    assert_eq!(tx.read_string(&block, 40)?, "one");
    tx.commit()?;
    Ok(())
}

#[test]
fn test_recovery_scan_stops_at_checkpoint() -> Result<()> {
    let dir = TempDir::new()?;
    let before = BlockId::new("testfile", 1);
    let after = BlockId::new("testfile", 2);

    {
        let engine = TransactionManager::new(&test_config(&dir))?;

        let old = engine.begin()?;
        old.pin(&before)?;
        old.write_int(&before, 0, 11, true)?;
        old.commit()?;

        engine.checkpoint()?;

        let unfinished = engine.begin()?;
        unfinished.pin(&after)?;
        unfinished.write_int(&after, 0, 22, true)?;
        engine.buffer_manager().flush_all(unfinished.tx_num())?;
    }

    let engine = TransactionManager::new(&test_config(&dir))?;
    engine.recover()?;

    let tx = engine.begin()?;
    tx.pin(&before)?;
    tx.pin(&after)?;
    // Work before the checkpoint is untouched; the unfinished write after
    // it is undone back to zero.
    assert_eq!(tx.read_int(&before, 0)?, 11);
    assert_eq!(tx.read_int(&after, 0)?, 0);
    tx.commit()?;
    Ok(())
}

#[test]
fn test_recovery_of_a_clean_log_is_harmless() -> Result<()> {
    let dir = TempDir::new()?;
    let engine = TransactionManager::new(&test_config(&dir))?;
    engine.recover()?;
    engine.recover()?;
    Ok(())
}
