use parking_lot::Mutex;

/// Per-block output buffers filled from `parallel_for` bodies.
///
/// Each block is written by exactly one iteration, so the locks are never
/// contended; they only make the write visible to whoever joins the loop.
pub(crate) struct BlockSlots<T> {
    blocks: Vec<Mutex<Vec<T>>>,
}

impl<T> BlockSlots<T> {
    pub(crate) fn new(num_blocks: usize) -> Self {
        Self {
            blocks: (0..num_blocks).map(|_| Mutex::new(Vec::new())).collect(),
        }
    }

    pub(crate) fn put(&self, block: usize, values: Vec<T>) {
        if let Some(slot) = self.blocks.get(block) {
            *slot.lock() = values;
        }
    }

    /// Contents of one block, leaving it empty.
    pub(crate) fn take(&self, block: usize) -> Vec<T> {
        self.blocks
            .get(block)
            .map(|slot| std::mem::take(&mut *slot.lock()))
            .unwrap_or_default()
    }

    /// Concatenate all blocks in index order, leaving them empty.
    pub(crate) fn take_flat(&self) -> Vec<T> {
        let total = self.blocks.iter().map(|b| b.lock().len()).sum();
        let mut out = Vec::with_capacity(total);
        for block in &self.blocks {
            out.append(&mut block.lock());
        }
        out
    }
}
