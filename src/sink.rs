use std::io::{self, Write};

use bytes::{Bytes, BytesMut};

use crate::error::{Error, Result};

/// Receives bytes from a [`MessageWriter`](crate::MessageWriter).
pub trait Sink {
    /// Writes as much of `buf` as the sink accepts and returns the number
    /// of bytes taken. May be partial; the writer loops until drained.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Writes every buffer completely, in order.
    fn write_all(&mut self, bufs: &[&[u8]]) -> Result<()> {
        for buf in bufs {
            let mut written = 0;
            while written < buf.len() {
                let count = self.write(&buf[written..])?;
                if count == 0 {
                    return Err(Error::IoWrite(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "sink accepted no bytes",
                    )));
                }
                written += count;
            }
        }
        Ok(())
    }

    /// Pushes buffered bytes through to the underlying resource.
    fn flush(&mut self) -> Result<()>;

    /// Flushes and releases the underlying resource.
    fn close(&mut self) -> Result<()>;
}

/// Writes to any [`io::Write`] implementation.
pub struct StreamSink<W> {
    out: W,
}

impl<W: Write> StreamSink<W> {
    pub fn new(out: W) -> StreamSink<W> {
        StreamSink { out }
    }
}

impl<W: Write> Sink for StreamSink<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.out.write(buf).map_err(Error::IoWrite)
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush().map_err(Error::IoWrite)
    }

    fn close(&mut self) -> Result<()> {
        self.out.flush().map_err(Error::IoClose)
    }
}

/// Collects written bytes in memory.
#[derive(Default)]
#[derive(Debug)]
pub struct BufferSink {
    data: BytesMut,
}

impl BufferSink {
    pub fn new() -> BufferSink {
        BufferSink::default()
    }

    /// The bytes collected so far.
    pub fn into_bytes(self) -> Bytes {
        self.data.freeze()
    }
}

impl Sink for BufferSink {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Discards everything written to it.
pub struct DiscardSink;

impl Sink for DiscardSink {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
