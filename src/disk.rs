//! Heap disk layer: the block allocator.
//!
//! A [`HeapDisk`] owns every storage block of one file system instance.
//! Blocks are fixed-capacity byte regions identified by a `usize` id; the
//! disk tracks which ids are free, grows the pool with fresh zeroed blocks
//! on demand, and recycles freed ids for the lifetime of the instance. A
//! live block is owned by exactly one byte store's [`BlockList`] at a time.
//!
//! Lock order is always free pool -> block pool -> individual block.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use log::trace;
use spin::{Mutex, RwLock};

use crate::block_list::BlockList;
use crate::error::{FsError, FsResult};

/// Storage for one block, behind its own lock.
type Block = Arc<Mutex<Box<[u8]>>>;

/// The block allocator: a growable pool of fixed-size in-memory blocks.
#[derive(Debug)]
pub struct HeapDisk {
    /// Fixed capacity in bytes of every block on this disk.
    block_size: usize,
    /// Upper bound on the total number of blocks the pool may grow to.
    max_blocks: usize,
    /// Every block ever created, indexed by block id.
    blocks: RwLock<Vec<Block>>,
    /// Ids of blocks not currently owned by any byte store.
    free: Mutex<Vec<usize>>,
}

impl HeapDisk {
    /// Create a disk with the given block size and no growth limit.
    pub fn new(block_size: usize) -> Self {
        Self::with_limit(block_size, usize::MAX)
    }

    /// Create a disk that refuses to grow past `max_blocks` blocks.
    pub fn with_limit(block_size: usize, max_blocks: usize) -> Self {
        assert!(block_size > 0, "block size must be positive");
        Self {
            block_size,
            max_blocks,
            blocks: RwLock::new(Vec::new()),
            free: Mutex::new(Vec::new()),
        }
    }

    /// Fixed capacity in bytes of every block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Total number of blocks created so far, free or owned.
    pub fn total_blocks(&self) -> usize {
        self.blocks.read().len()
    }

    /// Number of blocks currently free.
    pub fn free_blocks(&self) -> usize {
        self.free.lock().len()
    }

    /// Total storage held by this disk, in bytes.
    pub fn total_space(&self) -> u64 {
        self.total_blocks() as u64 * self.block_size as u64
    }

    /// Storage not owned by any byte store, in bytes.
    pub fn unallocated_space(&self) -> u64 {
        self.free_blocks() as u64 * self.block_size as u64
    }

    /// Allocate one previously-free block.
    pub fn alloc(&self) -> FsResult<usize> {
        let mut free = self.free.lock();
        if free.is_empty() {
            self.grow(1, &mut free)?;
        }
        Ok(free.pop().unwrap())
    }

    /// Allocate `count` blocks, appending their ids to `list`.
    pub fn alloc_into(&self, list: &mut BlockList, count: usize) -> FsResult<()> {
        let mut free = self.free.lock();
        if free.len() < count {
            let needed = count - free.len();
            self.grow(needed, &mut free)?;
        }
        for _ in 0..count {
            list.push(free.pop().unwrap());
        }
        Ok(())
    }

    /// Return every block in `list` to the free pool and clear the list.
    ///
    /// Freed blocks are zeroed here, so a recycled block never carries a
    /// deleted store's bytes.
    pub fn free(&self, list: &mut BlockList) {
        let mut free = self.free.lock();
        for &block_id in list.as_slice() {
            let block = self.block(block_id);
            block.lock().fill(0);
            free.push(block_id);
        }
        list.clear();
    }

    /// Zero-fill `[offset, offset + len)` within the block.
    ///
    /// The range must fit within the block.
    pub fn zero(&self, block_id: usize, offset: usize, len: usize) {
        assert!(offset + len <= self.block_size);
        let block = self.block(block_id);
        block.lock()[offset..offset + len].fill(0);
    }

    /// Read the byte at `offset` within the block.
    pub fn read_byte(&self, block_id: usize, offset: usize) -> u8 {
        let block = self.block(block_id);
        let data = block.lock();
        data[offset]
    }

    /// Write one byte at `offset` within the block.
    pub fn write_byte(&self, block_id: usize, offset: usize, b: u8) {
        let block = self.block(block_id);
        block.lock()[offset] = b;
    }

    /// Read `buf.len()` bytes starting at `offset` within the block.
    ///
    /// The range must fit within the block.
    pub fn read_at(&self, block_id: usize, offset: usize, buf: &mut [u8]) {
        assert!(offset + buf.len() <= self.block_size);
        let block = self.block(block_id);
        let data = block.lock();
        buf.copy_from_slice(&data[offset..offset + buf.len()]);
    }

    /// Write `buf` starting at `offset` within the block.
    ///
    /// The range must fit within the block.
    pub fn write_at(&self, block_id: usize, offset: usize, buf: &[u8]) {
        assert!(offset + buf.len() <= self.block_size);
        let block = self.block(block_id);
        let mut data = block.lock();
        data[offset..offset + buf.len()].copy_from_slice(buf);
    }

    /// Byte-for-byte duplicate of `src`'s full content into `dst`.
    ///
    /// Both blocks must already be allocated and distinct.
    pub fn copy_block(&self, src: usize, dst: usize) {
        assert_ne!(src, dst);
        let (src_block, dst_block) = {
            let blocks = self.blocks.read();
            (Arc::clone(&blocks[src]), Arc::clone(&blocks[dst]))
        };
        let src_data = src_block.lock();
        let mut dst_data = dst_block.lock();
        dst_data.copy_from_slice(&src_data);
    }

    /// A bounded view of `[offset, offset + len)` within the block, for
    /// bulk streaming transfer.
    ///
    /// The range must fit within the block.
    pub fn view(&self, block_id: usize, offset: usize, len: usize) -> BlockView {
        assert!(offset + len <= self.block_size);
        BlockView {
            block: self.block(block_id),
            start: offset,
            end: offset + len,
        }
    }

    fn block(&self, block_id: usize) -> Block {
        Arc::clone(&self.blocks.read()[block_id])
    }

    /// Create `count` fresh zeroed blocks and add their ids to the free
    /// pool. Called with the free pool lock held.
    fn grow(&self, count: usize, free: &mut Vec<usize>) -> FsResult<()> {
        let mut blocks = self.blocks.write();
        if count > self.max_blocks - blocks.len() {
            return Err(FsError::OutOfBlocks);
        }
        trace!("disk: growing pool by {} blocks", count);
        for _ in 0..count {
            free.push(blocks.len());
            blocks.push(Arc::new(Mutex::new(
                vec![0u8; self.block_size].into_boxed_slice(),
            )));
        }
        Ok(())
    }
}

/// A bounded, block-confined read/write region.
///
/// Holds the block's own lock only for the duration of each closure, the
/// same way a block cache exposes its bytes through `read`/`modify`.
pub struct BlockView {
    block: Block,
    start: usize,
    end: usize,
}

impl BlockView {
    /// Length of the viewed region in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the viewed region is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Run `f` over the viewed bytes.
    pub fn with_bytes<V>(&self, f: impl FnOnce(&[u8]) -> V) -> V {
        let data = self.block.lock();
        f(&data[self.start..self.end])
    }

    /// Run `f` over the viewed bytes, mutably.
    pub fn with_bytes_mut<V>(&self, f: impl FnOnce(&mut [u8]) -> V) -> V {
        let mut data = self.block.lock();
        f(&mut data[self.start..self.end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_grows_pool() {
        let disk = HeapDisk::new(16);
        assert_eq!(disk.total_blocks(), 0);
        let a = disk.alloc().unwrap();
        let b = disk.alloc().unwrap();
        assert_ne!(a, b);
        assert_eq!(disk.total_blocks(), 2);
        assert_eq!(disk.free_blocks(), 0);
    }

    #[test]
    fn test_free_recycles_ids() {
        let disk = HeapDisk::new(16);
        let mut list = BlockList::new();
        disk.alloc_into(&mut list, 3).unwrap();
        let owned: Vec<usize> = list.as_slice().to_vec();
        disk.free(&mut list);
        assert!(list.is_empty());
        assert_eq!(disk.free_blocks(), 3);
        // reuse comes out of the free pool, not fresh storage
        let reused = disk.alloc().unwrap();
        assert!(owned.contains(&reused));
        assert_eq!(disk.total_blocks(), 3);
    }

    #[test]
    fn test_free_scrubs_content() {
        let disk = HeapDisk::new(8);
        let mut list = BlockList::new();
        disk.alloc_into(&mut list, 1).unwrap();
        let id = list.get(0);
        disk.write_at(id, 0, &[0xff; 8]);
        disk.free(&mut list);
        let reused = disk.alloc().unwrap();
        assert_eq!(reused, id);
        let mut buf = [1u8; 8];
        disk.read_at(reused, 0, &mut buf);
        assert_eq!(buf, [0u8; 8]);
    }

    #[test]
    fn test_block_limit() {
        let disk = HeapDisk::with_limit(16, 2);
        disk.alloc().unwrap();
        disk.alloc().unwrap();
        assert_eq!(disk.alloc(), Err(FsError::OutOfBlocks));
    }

    #[test]
    fn test_put_get_zero() {
        let disk = HeapDisk::new(8);
        let id = disk.alloc().unwrap();
        disk.write_at(id, 2, &[1, 2, 3]);
        disk.write_byte(id, 5, 9);
        assert_eq!(disk.read_byte(id, 2), 1);
        let mut buf = [0u8; 4];
        disk.read_at(id, 2, &mut buf);
        assert_eq!(buf, [1, 2, 3, 9]);
        disk.zero(id, 3, 2);
        disk.read_at(id, 2, &mut buf);
        assert_eq!(buf, [1, 0, 0, 9]);
    }

    #[test]
    fn test_copy_block() {
        let disk = HeapDisk::new(4);
        let src = disk.alloc().unwrap();
        let dst = disk.alloc().unwrap();
        disk.write_at(src, 0, &[4, 3, 2, 1]);
        disk.copy_block(src, dst);
        let mut buf = [0u8; 4];
        disk.read_at(dst, 0, &mut buf);
        assert_eq!(buf, [4, 3, 2, 1]);
        // blocks stay independent after the copy
        disk.write_byte(src, 0, 0);
        disk.read_at(dst, 0, &mut buf);
        assert_eq!(buf, [4, 3, 2, 1]);
    }

    #[test]
    fn test_view_bounds() {
        let disk = HeapDisk::new(8);
        let id = disk.alloc().unwrap();
        disk.write_at(id, 0, &[0, 1, 2, 3, 4, 5, 6, 7]);
        let view = disk.view(id, 2, 4);
        assert_eq!(view.len(), 4);
        view.with_bytes(|bytes| assert_eq!(bytes, &[2, 3, 4, 5]));
        view.with_bytes_mut(|bytes| bytes[0] = 9);
        assert_eq!(disk.read_byte(id, 2), 9);
    }

    #[test]
    fn test_space_stats() {
        let disk = HeapDisk::new(512);
        let mut list = BlockList::new();
        disk.alloc_into(&mut list, 4).unwrap();
        assert_eq!(disk.total_space(), 4 * 512);
        assert_eq!(disk.unallocated_space(), 0);
        disk.free(&mut list);
        assert_eq!(disk.unallocated_space(), 4 * 512);
    }
}
