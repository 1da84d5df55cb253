use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::storage::buffer::{BufferError, BufferManager, FrameHandle};
use crate::storage::disk::BlockId;

struct Inner {
    frames: HashMap<BlockId, FrameHandle>,
    pins: Vec<BlockId>,
}

/// BufferList manages the frames a single transaction currently has
/// pinned.
///
/// `pins` records one entry per pin call, so pins and unpins stay paired
/// even when a block is pinned several times; the frame mapping is dropped
/// only when the last pin for its block goes away.
pub(crate) struct BufferList {
    buffer_manager: Arc<BufferManager>,
    inner: Mutex<Inner>,
}

impl BufferList {
    pub(crate) fn new(buffer_manager: Arc<BufferManager>) -> Self {
        Self {
            buffer_manager,
            inner: Mutex::new(Inner {
                frames: HashMap::new(),
                pins: Vec::new(),
            }),
        }
    }

    /// The frame pinned for `block`, if this transaction pinned it.
    pub(crate) fn frame(&self, block: &BlockId) -> Option<FrameHandle> {
        self.inner.lock().frames.get(block).cloned()
    }

    pub(crate) fn pin(&self, block: &BlockId) -> Result<(), BufferError> {
        let frame = self.buffer_manager.pin(block)?;
        let mut inner = self.inner.lock();
        inner.frames.insert(block.clone(), frame);
        inner.pins.push(block.clone());
        Ok(())
    }

    pub(crate) fn unpin(&self, block: &BlockId) {
        let mut inner = self.inner.lock();
        let Some(frame) = inner.frames.get(block).cloned() else {
            return;
        };

        self.buffer_manager.unpin(&frame);
        if let Some(index) = inner.pins.iter().position(|pinned| pinned == block) {
            inner.pins.remove(index);
        }
        if !inner.pins.contains(block) {
            inner.frames.remove(block);
        }
    }

    /// Release every pin this transaction holds. Called at commit and
    /// rollback.
    pub(crate) fn unpin_all(&self) {
        let mut inner = self.inner.lock();
        for block in &inner.pins {
            if let Some(frame) = inner.frames.get(block) {
                self.buffer_manager.unpin(frame);
            }
        }
        inner.pins.clear();
        inner.frames.clear();
    }
}
