//! heap-fs
//!
//! heap-fs is the in-memory storage core of a virtual file system: a
//! fixed-block-size heap "disk" that allocates and recycles storage blocks,
//! and a byte store that maps a file's linear byte content onto a growing
//! chain of those blocks.
//!
//! A [`HeapDisk`] is created once per file system instance and shared by
//! every file; each file's content lives in one [`DiskByteStore`], which
//! resolves logical positions to (block, offset) coordinates and delegates
//! single-block work to the disk.
//!
//! The crate is divided into different layers, forming a hierarchical and
//! modular design architecture, from bottom to top:
//!
//! - Channel interface layer (streaming sources and sinks)
//! - Heap disk layer (the block allocator)
//! - Block list layer (per-store owned-block map)
//! - Byte store layer (the linear-address-space file content abstraction)

#![no_std]

extern crate alloc;

pub mod block_list;
pub mod byte_store;
pub mod channel;
pub mod disk;
pub mod error;

/// Default block capacity in bytes.
pub const DEFAULT_BLOCK_SZ: usize = 8192;

pub use block_list::BlockList;
pub use byte_store::{ByteStore, DiskByteStore};
pub use channel::{ReadChannel, WriteChannel};
pub use disk::{BlockView, HeapDisk};
pub use error::{FsError, FsResult};
