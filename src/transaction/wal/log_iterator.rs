use std::sync::Arc;

use crate::storage::disk::{BlockId, DiskManager};
use crate::storage::page::Page;
use crate::transaction::wal::log_manager::{LogManagerError, Result};

/// LogIterator walks the log records in reverse insertion order: within a
/// block from the boundary upward, and from the last block back toward
/// block 0.
pub struct LogIterator {
    disk_manager: Arc<DiskManager>,
    block: BlockId,
    page: Page,
    current_pos: usize,
}

impl LogIterator {
    pub(crate) fn new(disk_manager: Arc<DiskManager>, block: BlockId) -> Result<Self> {
        let page = Page::new(disk_manager.block_size());
        let mut iter = Self {
            disk_manager,
            block: block.clone(),
            page,
            current_pos: 0,
        };
        iter.move_to_block(block)?;
        Ok(iter)
    }

    /// True while there are records left in this block or earlier blocks to
    /// step back into.
    pub fn has_next(&self) -> bool {
        self.current_pos < self.disk_manager.block_size() || self.block.number() > 0
    }

    /// Load `block` and position the cursor at its boundary, i.e. at the
    /// newest record in the block.
    fn move_to_block(&mut self, block: BlockId) -> Result<()> {
        self.disk_manager.read(&block, &mut self.page)?;
        self.current_pos = self.page.read_int(0)? as usize;
        self.block = block;
        Ok(())
    }
}

impl Iterator for LogIterator {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_next() {
            return None;
        }

        if self.current_pos == self.disk_manager.block_size() {
            let previous = BlockId::new(self.block.filename(), self.block.number() - 1);
            if let Err(e) = self.move_to_block(previous) {
                return Some(Err(e));
            }
        }

        let record = match self.page.read_bytes(self.current_pos) {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => return Some(Err(LogManagerError::Page(e))),
        };
        self.current_pos += Page::max_length(record.len());
        Some(Ok(record))
    }
}
