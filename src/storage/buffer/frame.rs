use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::types::{Lsn, TxId, NO_LSN, NO_TX};
use crate::storage::buffer::error::BufferError;
use crate::storage::disk::{BlockId, DiskManager};
use crate::storage::page::Page;
use crate::transaction::wal::LogManager;

/// Shared handle to a buffer pool frame.
pub type FrameHandle = Arc<Mutex<Frame>>;

/// Frame is one slot of the buffer pool: a page plus the bookkeeping that
/// says which block it holds, how many clients pinned it, and which
/// transaction last modified it.
///
/// Invariants: the pin count never goes negative; a frame with
/// `modified_by != NO_TX` is dirty and [`Frame::flush`] resets it; a frame
/// is reassigned to another block only while unpinned.
pub struct Frame {
    disk_manager: Arc<DiskManager>,
    log_manager: Arc<LogManager>,
    contents: Page,
    block: Option<BlockId>,
    pins: i32,
    modified_by: TxId,
    lsn: Lsn,
}

impl Frame {
    pub(crate) fn new(disk_manager: Arc<DiskManager>, log_manager: Arc<LogManager>) -> Self {
        let contents = Page::new(disk_manager.block_size());
        Self {
            disk_manager,
            log_manager,
            contents,
            block: None,
            pins: 0,
            modified_by: NO_TX,
            lsn: NO_LSN,
        }
    }

    /// The page held by this frame.
    pub fn contents(&self) -> &Page {
        &self.contents
    }

    /// Mutable access to the page. Callers must follow a mutation with
    /// [`Frame::set_modified`] so the change survives eviction.
    pub fn contents_mut(&mut self) -> &mut Page {
        &mut self.contents
    }

    /// The block currently resident in this frame, if any.
    pub fn block(&self) -> Option<&BlockId> {
        self.block.as_ref()
    }

    /// Record that `tx` changed this page. A non-negative `lsn` names the
    /// log record describing the change; undo writes pass [`NO_LSN`] and
    /// leave the frame's LSN untouched.
    pub fn set_modified(&mut self, tx: TxId, lsn: Lsn) {
        self.modified_by = tx;
        if lsn >= 0 {
            self.lsn = lsn;
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.pins > 0
    }

    /// The transaction that dirtied this frame, or [`NO_TX`] when clean.
    pub fn modifying_tx(&self) -> TxId {
        self.modified_by
    }

    pub(crate) fn pin(&mut self) {
        self.pins += 1;
    }

    pub(crate) fn unpin(&mut self) {
        self.pins -= 1;
    }

    /// Point this frame at `block`, persisting the previous occupant first
    /// and reading the new block's contents from disk.
    pub(crate) fn assign_to_block(&mut self, block: BlockId) -> Result<(), BufferError> {
        self.flush()?;
        self.disk_manager.read(&block, &mut self.contents)?;
        self.block = Some(block);
        self.pins = 0;
        Ok(())
    }

    /// Write a dirty frame back to disk and mark it clean.
    ///
    /// The log is forced up to this frame's LSN before the page is
    /// written: the record describing the change must be durable before
    /// the change itself is.
    pub(crate) fn flush(&mut self) -> Result<(), BufferError> {
        if self.modified_by == NO_TX {
            return Ok(());
        }
        if let Some(block) = &self.block {
            self.log_manager.flush(self.lsn)?;
            self.disk_manager.write(block, &self.contents)?;
        }
        self.modified_by = NO_TX;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn get_test_frame() -> (Frame, Arc<DiskManager>, TempDir) {
        let dir = TempDir::new().unwrap();
        let disk_manager = Arc::new(DiskManager::new(dir.path(), 400).unwrap());
        let log_manager =
            Arc::new(LogManager::new(Arc::clone(&disk_manager), "testlog").unwrap());
        let frame = Frame::new(Arc::clone(&disk_manager), log_manager);
        (frame, disk_manager, dir)
    }

    #[test]
    fn test_new_frame_is_empty_and_clean() {
        let (frame, _disk_manager, _dir) = get_test_frame();

        assert!(frame.block().is_none());
        assert!(!frame.is_pinned());
        assert_eq!(frame.modifying_tx(), NO_TX);
    }

    #[test]
    fn test_set_modified_keeps_lsn_on_unlogged_writes() {
        let (mut frame, _disk_manager, _dir) = get_test_frame();

        frame.set_modified(1, 5);
        assert_eq!(frame.lsn, 5);

        // An unlogged change dirties the frame but must not lose the LSN
        // of the earlier logged change.
        frame.set_modified(1, NO_LSN);
        assert_eq!(frame.lsn, 5);
        assert_eq!(frame.modifying_tx(), 1);
    }

    #[test]
    fn test_flush_persists_and_cleans() {
        let (mut frame, disk_manager, _dir) = get_test_frame();
        let block = disk_manager.append("testfile").unwrap();

        frame.assign_to_block(block.clone()).unwrap();
        frame.contents_mut().write_int(0, 321).unwrap();
        frame.set_modified(1, NO_LSN);

        frame.flush().unwrap();
        assert_eq!(frame.modifying_tx(), NO_TX);

        let mut check = Page::new(400);
        disk_manager.read(&block, &mut check).unwrap();
        assert_eq!(check.read_int(0).unwrap(), 321);
    }

    #[test]
    fn test_reassignment_flushes_previous_block() {
        let (mut frame, disk_manager, _dir) = get_test_frame();
        let first = disk_manager.append("testfile").unwrap();
        let second = disk_manager.append("testfile").unwrap();

        frame.assign_to_block(first.clone()).unwrap();
        frame.contents_mut().write_int(0, 7).unwrap();
        frame.set_modified(1, NO_LSN);

        frame.assign_to_block(second.clone()).unwrap();
        assert_eq!(frame.block(), Some(&second));
        assert_eq!(frame.modifying_tx(), NO_TX);

        let mut check = Page::new(400);
        disk_manager.read(&first, &mut check).unwrap();
        assert_eq!(check.read_int(0).unwrap(), 7);
    }
}
