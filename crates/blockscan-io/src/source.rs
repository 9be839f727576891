//! The byte source contract consumed by the reader's worker.

use std::io::{self, Read};

/// A blocking byte stream.
///
/// `read_bytes` fills up to `buf.len()` bytes and returns how many it wrote.
/// Short reads are valid; `Ok(0)` means the source is exhausted. The worker
/// treats an `Err` the same as exhaustion.
pub trait ByteSource: Send {
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<R: Read + Send> ByteSource for R {
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }
}
