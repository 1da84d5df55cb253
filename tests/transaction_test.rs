use anyhow::Result;

use chalkdb::{BlockId, TransactionError};

mod common;
use common::create_test_engine;

#[test]
fn test_commit_rollback_sequence() -> Result<()> {
    let (engine, _dir) = create_test_engine()?;
    let block = BlockId::new("testfile", 1);

    // tx1 seeds the block. Its writes are not logged: the values it
    // overwrites are garbage, so there is nothing meaningful to undo.
    let tx1 = engine.begin()?;
    tx1.pin(&block)?;
    tx1.write_int(&block, 80, 1, false)?;
    tx1.write_string(&block, 40, "one", false)?;
    tx1.commit()?;

    // tx2 reads tx1's values and overwrites them, logged this time.
    let tx2 = engine.begin()?;
    tx2.pin(&block)?;
    assert_eq!(tx2.read_int(&block, 80)?, 1);
    assert_eq!(tx2.read_string(&block, 40)?, "one");
    tx2.write_int(&block, 80, 2, true)?;
    tx2.write_string(&block, 40, "one!", true)?;
    tx2.commit()?;

    // tx3 sees tx2's values and rolls back without writing anything.
    let tx3 = engine.begin()?;
    tx3.pin(&block)?;
    assert_eq!(tx3.read_int(&block, 80)?, 2);
    assert_eq!(tx3.read_string(&block, 40)?, "one!");
    tx3.rollback()?;

    // tx3 made no changes, so its rollback changed nothing.
    let tx4 = engine.begin()?;
    tx4.pin(&block)?;
    assert_eq!(tx4.read_int(&block, 80)?, 2);
    assert_eq!(tx4.read_string(&block, 40)?, "one!");
    tx4.commit()?;
    Ok(())
}

#[test]
fn test_rollback_restores_before_images() -> Result<()> {
    let (engine, _dir) = create_test_engine()?;
    let block = BlockId::new("testfile", 1);

    let tx1 = engine.begin()?;
    tx1.pin(&block)?;
    tx1.write_int(&block, 80, 1, true)?;
    tx1.write_string(&block, 40, "one", true)?;
    tx1.commit()?;

    let tx2 = engine.begin()?;
    tx2.pin(&block)?;
    tx2.write_int(&block, 80, 2, true)?;
    tx2.write_string(&block, 40, "two", true)?;
    assert_eq!(tx2.read_int(&block, 80)?, 2);
    tx2.rollback()?;

    let tx3 = engine.begin()?;
    tx3.pin(&block)?;
    assert_eq!(tx3.read_int(&block, 80)?, 1);
    assert_eq!(tx3.read_string(&block, 40)?, "one");
    tx3.commit()?;
    Ok(())
}

#[test]
fn test_size_and_append() -> Result<()> {
    let (engine, _dir) = create_test_engine()?;

    let tx1 = engine.begin()?;
    assert_eq!(tx1.size("testfile")?, 0);

    let first = tx1.append("testfile")?;
    let second = tx1.append("testfile")?;
    assert_eq!(first.number(), 0);
    assert_eq!(second.number(), 1);
    assert_eq!(tx1.size("testfile")?, 2);
    tx1.commit()?;

    let tx2 = engine.begin()?;
    assert_eq!(tx2.size("testfile")?, 2);
    tx2.commit()?;
    Ok(())
}

#[test]
fn test_access_without_pin_is_an_error() -> Result<()> {
    let (engine, _dir) = create_test_engine()?;
    let block = BlockId::new("testfile", 1);

    let tx = engine.begin()?;
    assert!(matches!(
        tx.read_int(&block, 0),
        Err(TransactionError::BlockNotPinned(_))
    ));
    assert!(matches!(
        tx.write_int(&block, 0, 1, true),
        Err(TransactionError::BlockNotPinned(_))
    ));
    tx.rollback()?;
    Ok(())
}

#[test]
fn test_out_of_bounds_write_surfaces_page_error() -> Result<()> {
    let (engine, _dir) = create_test_engine()?;
    let block = BlockId::new("testfile", 1);

    let tx = engine.begin()?;
    tx.pin(&block)?;
    let result = tx.write_int(&block, engine.block_size(), 1, false);
    assert!(matches!(result, Err(TransactionError::Page(_))));
    tx.rollback()?;
    Ok(())
}

#[test]
fn test_pins_are_released_at_commit() -> Result<()> {
    let (engine, _dir) = create_test_engine()?;
    let block = BlockId::new("testfile", 1);

    let tx = engine.begin()?;
    let before = tx.available_buffers();
    tx.pin(&block)?;
    tx.pin(&block)?;
    assert_eq!(tx.available_buffers(), before - 1);
    tx.commit()?;

    let tx2 = engine.begin()?;
    assert_eq!(tx2.available_buffers(), before);
    tx2.commit()?;
    Ok(())
}

#[test]
fn test_block_size_matches_configuration() -> Result<()> {
    let (engine, _dir) = create_test_engine()?;
    let tx = engine.begin()?;
    assert_eq!(tx.block_size(), common::TEST_BLOCK_SIZE);
    tx.commit()?;
    Ok(())
}
