//! Block list layer: ordered owned-block bookkeeping for one byte store.
//!
//! Index `i` of the list maps logical byte range
//! `[i * block_size, (i + 1) * block_size)` of the owning store onto a disk
//! block id. The list has no lock of its own; it is only touched while the
//! owning store holds its lock.

use alloc::vec::Vec;

/// Growable sequence of disk block ids owned by one byte store.
#[derive(Debug, Default)]
pub struct BlockList {
    ids: Vec<usize>,
}

impl BlockList {
    /// Create an empty block list.
    pub fn new() -> Self {
        Self { ids: Vec::new() }
    }

    /// Create an empty block list with room for `capacity` ids.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
        }
    }

    /// Append a block id at the tail.
    pub fn push(&mut self, block_id: usize) {
        self.ids.push(block_id);
    }

    /// Remove and return the tail block id, used when truncating.
    pub fn pop(&mut self) -> Option<usize> {
        self.ids.pop()
    }

    /// Get the block id at `index`.
    pub fn get(&self, index: usize) -> usize {
        self.ids[index]
    }

    /// Number of blocks in the list.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the list holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Empty the list.
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// All owned ids in order.
    pub fn as_slice(&self) -> &[usize] {
        &self.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_get_len() {
        let mut list = BlockList::new();
        assert!(list.is_empty());
        list.push(3);
        list.push(7);
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(0), 3);
        assert_eq!(list.get(1), 7);
    }

    #[test]
    fn test_pop_removes_tail() {
        let mut list = BlockList::new();
        list.push(1);
        list.push(2);
        assert_eq!(list.pop(), Some(2));
        assert_eq!(list.pop(), Some(1));
        assert_eq!(list.pop(), None);
    }

    #[test]
    fn test_clear() {
        let mut list = BlockList::with_capacity(4);
        list.push(0);
        list.push(1);
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.as_slice(), &[]);
    }
}
