use std::io::{self, Read};

use bytes::{Buf, Bytes};

use crate::error::{Error, Result};

/// Supplies bytes to a [`MessageReader`](crate::MessageReader).
///
/// Sources are small capability sets, not a hierarchy; the concrete
/// adapters below are siblings and callers may supply their own.
pub trait Source {
    /// Fills `buf` from the source's current position and returns the
    /// number of bytes placed. `Ok(0)` signals end-of-stream.
    ///
    /// `min_bytes_hint` is a lower bound the caller would like to see; the
    /// source may return fewer bytes but must not block beyond necessity.
    fn read(&mut self, buf: &mut [u8], min_bytes_hint: usize) -> Result<usize>;

    /// Discards exactly `count` bytes. The reader drains its working
    /// buffer before delegating here, so `count` never includes bytes the
    /// source already handed out.
    fn skip(&mut self, count: usize) -> Result<()>;

    /// Releases the underlying resource.
    fn close(&mut self) -> Result<()>;
}

/// Reads from any [`io::Read`] implementation (a file, a TCP stream, a
/// pipe).
pub struct StreamSource<R> {
    stream: R,
}

impl<R: Read> StreamSource<R> {
    pub fn new(stream: R) -> StreamSource<R> {
        StreamSource { stream }
    }
}

impl<R: Read> Source for StreamSource<R> {
    fn read(&mut self, buf: &mut [u8], _min_bytes_hint: usize) -> Result<usize> {
        self.stream.read(buf).map_err(Error::IoRead)
    }

    fn skip(&mut self, count: usize) -> Result<()> {
        let copied = io::copy(&mut (&mut self.stream).take(count as u64), &mut io::sink())
            .map_err(Error::IoRead)?;
        if copied < count as u64 {
            return Err(Error::PrematureEof {
                expected: count,
                actual: copied as usize,
            });
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Reads from a pre-filled in-memory buffer.
pub struct BytesSource {
    data: Bytes,
}

impl BytesSource {
    pub fn new(data: impl Into<Bytes>) -> BytesSource {
        BytesSource { data: data.into() }
    }
}

impl Source for BytesSource {
    fn read(&mut self, buf: &mut [u8], _min_bytes_hint: usize) -> Result<usize> {
        let count = self.data.len().min(buf.len());
        buf[..count].copy_from_slice(&self.data[..count]);
        self.data.advance(count);
        Ok(count)
    }

    fn skip(&mut self, count: usize) -> Result<()> {
        if count > self.data.len() {
            return Err(Error::PrematureEof {
                expected: count,
                actual: self.data.len(),
            });
        }
        self.data.advance(count);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A source that is always at end-of-stream.
#[derive(Debug)]
pub struct EmptySource;

impl Source for EmptySource {
    fn read(&mut self, _buf: &mut [u8], _min_bytes_hint: usize) -> Result<usize> {
        Ok(0)
    }

    fn skip(&mut self, count: usize) -> Result<()> {
        if count > 0 {
            return Err(Error::PrematureEof {
                expected: count,
                actual: 0,
            });
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
