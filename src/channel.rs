//! Channel interface layer.
//!
//! Define the streaming source/sink interfaces the byte store transfers
//! through. A channel moves bytes between block storage and the outside
//! world (a pipe, a socket, another file); the byte store only needs the
//! two operations below, in the same way the easy-fs core only needs
//! `read_block`/`write_block` from a block device.

use alloc::vec::Vec;

use crate::error::FsResult;

/// A streaming byte source.
pub trait ReadChannel: Send {
    /// Read bytes into `buf`, returning the number of bytes read.
    ///
    /// `Ok(0)` means the source is exhausted; the caller must not retry.
    fn read(&mut self, buf: &mut [u8]) -> FsResult<usize>;
}

/// A streaming byte sink.
pub trait WriteChannel: Send {
    /// Write bytes from `buf`, returning the number of bytes accepted.
    ///
    /// May accept fewer bytes than offered; `Ok(0)` means the sink will
    /// accept no more.
    fn write(&mut self, buf: &[u8]) -> FsResult<usize>;
}

impl ReadChannel for &[u8] {
    fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
        let n = self.len().min(buf.len());
        let (head, tail) = self.split_at(n);
        buf[..n].copy_from_slice(head);
        *self = tail;
        Ok(n)
    }
}

impl WriteChannel for Vec<u8> {
    fn write(&mut self, buf: &[u8]) -> FsResult<usize> {
        self.extend_from_slice(buf);
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_slice_reader_drains() {
        let mut src: &[u8] = &[1, 2, 3, 4, 5];
        let mut buf = [0u8; 3];
        assert_eq!(src.read(&mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(src.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[4, 5]);
        assert_eq!(src.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_vec_writer_collects() {
        let mut dst: Vec<u8> = Vec::new();
        assert_eq!(dst.write(&[7, 8]).unwrap(), 2);
        assert_eq!(dst.write(&[9]).unwrap(), 1);
        assert_eq!(dst, vec![7, 8, 9]);
    }
}
