//! Byte store layer: the linear-address-space file content abstraction.
//!
//! A byte store presents one file's content as a logical run of bytes
//! starting at position 0. [`DiskByteStore`] realizes it on top of a
//! [`HeapDisk`]: a [`BlockList`] maps logical block index `i` to the disk
//! block holding bytes `[i * block_size, (i + 1) * block_size)`, and every
//! multi-block operation walks that chain the same way -- a first, possibly
//! partial block, then full blocks until the requested span is exhausted.
//!
//! Each store carries its own read/write lock: mutators hold the write
//! guard for their full duration, so size and block-list updates are never
//! observed half-applied; pure reads share the read guard.

use alloc::sync::Arc;
use core::cmp::min;
use log::trace;
use spin::RwLock;

use crate::block_list::BlockList;
use crate::channel::{ReadChannel, WriteChannel};
use crate::disk::{BlockView, HeapDisk};
use crate::error::FsResult;

/// A file content store addressed by logical byte position.
///
/// The block-backed [`DiskByteStore`] is the primary realization; callers
/// hold stores as `Arc<dyn ByteStore>` so alternative backings can be
/// added without touching them.
pub trait ByteStore: Send + Sync + core::fmt::Debug {
    /// Current logical length in bytes.
    fn size(&self) -> u64;

    /// The byte at `pos`, or `None` at or past the current size.
    fn read_byte(&self, pos: u64) -> Option<u8>;

    /// Read up to `buf.len()` bytes starting at `pos`.
    ///
    /// Returns the number of bytes copied, or `None` if `pos` is at or
    /// past the current size.
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> Option<usize>;

    /// Write one byte at `pos`, zero-filling any gap up to `pos` first.
    fn write_byte(&self, pos: u64, b: u8) -> FsResult<usize>;

    /// Write `buf` at `pos`, zero-filling any gap up to `pos` first.
    ///
    /// A zero-length write still performs the gap extension, but transfers
    /// no bytes.
    fn write_at(&self, pos: u64, buf: &[u8]) -> FsResult<usize>;

    /// Read up to `count` bytes from `src` into the store at `pos`.
    ///
    /// Stops early if the source is exhausted; the size is advanced only
    /// by the bytes actually obtained.
    fn transfer_from(&self, src: &mut dyn ReadChannel, pos: u64, count: u64) -> FsResult<u64>;

    /// Write up to `count` bytes from the store at `pos` into `dst`.
    ///
    /// Returns the number of bytes moved; 0 (never an end-of-data marker)
    /// when `pos` is at or past the current size or the sink stops
    /// accepting bytes.
    fn transfer_to(&self, pos: u64, count: u64, dst: &mut dyn WriteChannel) -> FsResult<u64>;

    /// Shrink the store to `new_size`, freeing excess tail blocks.
    ///
    /// Returns `false` (and changes nothing) when `new_size` is at or past
    /// the current size. Never zero-fills; later growth back past the
    /// truncated length goes through gap extension again.
    fn truncate(&self, new_size: u64) -> bool;

    /// Free every owned block and reset the size to 0.
    fn delete(&self);

    /// An independent deep copy: same size, same content, no shared
    /// physical block.
    fn create_copy(&self) -> FsResult<Arc<dyn ByteStore>>;
}

/// Size and block map of a store, guarded together by the store's lock.
#[derive(Debug)]
struct StoreInner {
    blocks: BlockList,
    size: u64,
}

impl StoreInner {
    /// Get the block at `index`, expanding the list from the disk if it
    /// does not exist yet.
    fn block_for_write(&mut self, disk: &HeapDisk, index: usize) -> FsResult<usize> {
        if index >= self.blocks.len() {
            let additional = index - self.blocks.len() + 1;
            disk.alloc_into(&mut self.blocks, additional)?;
        }
        Ok(self.blocks.get(index))
    }

    /// If `pos` is past the current size, zero-fill the on-disk bytes of
    /// the whole gap `[size, pos)` and advance the size to `pos`.
    ///
    /// The size moves only after every gap block is zeroed, so a failed
    /// allocation mid-gap leaves the previous size intact.
    fn zero_for_write(&mut self, disk: &HeapDisk, pos: u64) -> FsResult<()> {
        if pos <= self.size {
            return Ok(());
        }
        let block_size = disk.block_size() as u64;
        let mut remaining = pos - self.size;

        let mut block_index = (self.size / block_size) as usize;
        let block = self.block_for_write(disk, block_index)?;
        let off = (self.size % block_size) as usize;
        let len = min(block_size - off as u64, remaining) as usize;
        disk.zero(block, off, len);
        remaining -= len as u64;

        while remaining > 0 {
            block_index += 1;
            let block = self.block_for_write(disk, block_index)?;
            let len = min(block_size, remaining) as usize;
            disk.zero(block, 0, len);
            remaining -= len as u64;
        }

        self.size = pos;
        Ok(())
    }

    /// Number of bytes readable from `pos` (at most `max`), or `None` if
    /// `pos` is at or past the current size.
    fn bytes_to_read(&self, pos: u64, max: u64) -> Option<u64> {
        if pos >= self.size {
            return None;
        }
        Some(min(self.size - pos, max))
    }
}

/// Byte store backed by a [`HeapDisk`].
#[derive(Debug)]
pub struct DiskByteStore {
    disk: Arc<HeapDisk>,
    inner: RwLock<StoreInner>,
}

impl DiskByteStore {
    /// Create an empty store bound to `disk`.
    pub fn new(disk: Arc<HeapDisk>) -> Self {
        Self::from_parts(disk, BlockList::new(), 0)
    }

    fn from_parts(disk: Arc<HeapDisk>, blocks: BlockList, size: u64) -> Self {
        Self {
            disk,
            inner: RwLock::new(StoreInner { blocks, size }),
        }
    }

    /// Number of blocks currently owned by this store.
    pub fn block_count(&self) -> usize {
        self.inner.read().blocks.len()
    }

    fn block_index(&self, pos: u64) -> usize {
        (pos / self.disk.block_size() as u64) as usize
    }

    fn offset_in_block(&self, pos: u64) -> usize {
        (pos % self.disk.block_size() as u64) as usize
    }
}

impl ByteStore for DiskByteStore {
    fn size(&self) -> u64 {
        self.inner.read().size
    }

    fn read_byte(&self, pos: u64) -> Option<u8> {
        let inner = self.inner.read();
        if pos >= inner.size {
            return None;
        }
        let block = inner.blocks.get(self.block_index(pos));
        Some(self.disk.read_byte(block, self.offset_in_block(pos)))
    }

    fn read_at(&self, pos: u64, buf: &mut [u8]) -> Option<usize> {
        let inner = self.inner.read();
        let bytes_to_read = inner.bytes_to_read(pos, buf.len() as u64)? as usize;
        if bytes_to_read > 0 {
            let block_size = self.disk.block_size();
            let mut block_index = self.block_index(pos);
            let off = self.offset_in_block(pos);

            let mut read_len = min(block_size - off, bytes_to_read);
            self.disk
                .read_at(inner.blocks.get(block_index), off, &mut buf[..read_len]);
            let mut done = read_len;

            while done < bytes_to_read {
                block_index += 1;
                read_len = min(block_size, bytes_to_read - done);
                self.disk.read_at(
                    inner.blocks.get(block_index),
                    0,
                    &mut buf[done..done + read_len],
                );
                done += read_len;
            }
        }
        Some(bytes_to_read)
    }

    fn write_byte(&self, pos: u64, b: u8) -> FsResult<usize> {
        let mut inner = self.inner.write();
        inner.zero_for_write(&self.disk, pos)?;

        let block_index = self.block_index(pos);
        let block = inner.block_for_write(&self.disk, block_index)?;
        self.disk.write_byte(block, self.offset_in_block(pos), b);

        if pos >= inner.size {
            inner.size = pos + 1;
        }
        Ok(1)
    }

    fn write_at(&self, pos: u64, buf: &[u8]) -> FsResult<usize> {
        let mut inner = self.inner.write();
        inner.zero_for_write(&self.disk, pos)?;
        if buf.is_empty() {
            return Ok(0);
        }

        let block_size = self.disk.block_size();
        let mut block_index = self.block_index(pos);
        let off = self.offset_in_block(pos);

        let mut write_len = min(block_size - off, buf.len());
        let block = inner.block_for_write(&self.disk, block_index)?;
        self.disk.write_at(block, off, &buf[..write_len]);
        let mut done = write_len;

        while done < buf.len() {
            block_index += 1;
            write_len = min(block_size, buf.len() - done);
            let block = inner.block_for_write(&self.disk, block_index)?;
            self.disk.write_at(block, 0, &buf[done..done + write_len]);
            done += write_len;
        }

        let end = pos + buf.len() as u64;
        if end > inner.size {
            inner.size = end;
        }
        Ok(buf.len())
    }

    fn transfer_from(&self, src: &mut dyn ReadChannel, pos: u64, count: u64) -> FsResult<u64> {
        let mut inner = self.inner.write();
        inner.zero_for_write(&self.disk, pos)?;
        if count == 0 {
            return Ok(0);
        }

        let block_size = self.disk.block_size() as u64;
        let mut remaining = count;
        let mut block_index = self.block_index(pos);
        let off = self.offset_in_block(pos);

        let len = min(block_size - off as u64, remaining) as usize;
        let block = inner.block_for_write(&self.disk, block_index)?;
        let filled = fill_view(&self.disk.view(block, off, len), src)?;
        remaining -= filled as u64;
        let mut exhausted = filled < len;

        while remaining > 0 && !exhausted {
            block_index += 1;
            let len = min(block_size, remaining) as usize;
            let block = inner.block_for_write(&self.disk, block_index)?;
            let filled = fill_view(&self.disk.view(block, 0, len), src)?;
            remaining -= filled as u64;
            exhausted = filled < len;
        }

        let transferred = count - remaining;
        let end = pos + transferred;
        if end > inner.size {
            inner.size = end;
        }
        Ok(transferred)
    }

    fn transfer_to(&self, pos: u64, count: u64, dst: &mut dyn WriteChannel) -> FsResult<u64> {
        let inner = self.inner.read();
        let mut remaining = match inner.bytes_to_read(pos, count) {
            Some(n) if n > 0 => n,
            _ => return Ok(0),
        };

        let block_size = self.disk.block_size() as u64;
        let mut transferred = 0u64;
        let mut block_index = self.block_index(pos);
        let off = self.offset_in_block(pos);

        let len = min(block_size - off as u64, remaining) as usize;
        let view = self.disk.view(inner.blocks.get(block_index), off, len);
        let drained = drain_view(&view, dst)?;
        transferred += drained as u64;
        remaining -= drained as u64;
        let mut stalled = drained < len;

        while remaining > 0 && !stalled {
            block_index += 1;
            let len = min(block_size, remaining) as usize;
            let view = self.disk.view(inner.blocks.get(block_index), 0, len);
            let drained = drain_view(&view, dst)?;
            transferred += drained as u64;
            remaining -= drained as u64;
            stalled = drained < len;
        }

        Ok(transferred)
    }

    fn truncate(&self, new_size: u64) -> bool {
        let mut inner = self.inner.write();
        if new_size >= inner.size {
            return false;
        }
        inner.size = new_size;

        let new_block_count = if new_size == 0 {
            0
        } else {
            self.block_index(new_size - 1) + 1
        };
        let blocks_to_remove = inner.blocks.len() - new_block_count;
        if blocks_to_remove > 0 {
            trace!("store: truncate frees {} blocks", blocks_to_remove);
            let mut excess = BlockList::with_capacity(blocks_to_remove);
            for _ in 0..blocks_to_remove {
                excess.push(inner.blocks.pop().unwrap());
            }
            self.disk.free(&mut excess);
        }
        true
    }

    fn delete(&self) {
        let mut inner = self.inner.write();
        trace!("store: delete frees {} blocks", inner.blocks.len());
        let StoreInner { blocks, size } = &mut *inner;
        self.disk.free(blocks);
        *size = 0;
    }

    fn create_copy(&self) -> FsResult<Arc<dyn ByteStore>> {
        let inner = self.inner.read();
        let mut copy = BlockList::with_capacity(inner.blocks.len());
        for i in 0..inner.blocks.len() {
            let block = inner.blocks.get(i);
            let fresh = match self.disk.alloc() {
                Ok(id) => id,
                Err(e) => {
                    // return the half-built copy before surfacing the error
                    self.disk.free(&mut copy);
                    return Err(e);
                }
            };
            self.disk.copy_block(block, fresh);
            copy.push(fresh);
        }
        Ok(Arc::new(DiskByteStore::from_parts(
            self.disk.clone(),
            copy,
            inner.size,
        )))
    }
}

/// Fill the view from `src`, returning the bytes obtained. A short fill
/// means the source is exhausted.
fn fill_view(view: &BlockView, src: &mut dyn ReadChannel) -> FsResult<usize> {
    let mut filled = 0;
    while filled < view.len() {
        let n = view.with_bytes_mut(|bytes| src.read(&mut bytes[filled..]))?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Drain the view into `dst`, returning the bytes accepted. A short drain
/// means the sink stopped accepting bytes.
fn drain_view(view: &BlockView, dst: &mut dyn WriteChannel) -> FsResult<usize> {
    let mut drained = 0;
    while drained < view.len() {
        let n = view.with_bytes(|bytes| dst.write(&bytes[drained..]))?;
        if n == 0 {
            break;
        }
        drained += n;
    }
    Ok(drained)
}
