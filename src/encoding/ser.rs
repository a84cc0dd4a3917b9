use smallvec::SmallVec;

use super::*;
use crate::{
    buffer::{ByteBuffer, DEFAULT_BUFFER_CAPACITY, MIN_BUFFER_CAPACITY},
    error::{Error, Result},
    sink::Sink,
    Timestamp, ValueType,
};

/// Writes MessagePack values to a [`Sink`].
///
/// Every value is encoded with the smallest tag that represents it
/// faithfully. Formatted bytes are staged in a fixed-capacity working
/// buffer and flushed to the sink whenever the next primitive would not
/// fit, on [`flush`](MessageWriter::flush), and on
/// [`close`](MessageWriter::close).
#[derive(Debug)]
pub struct MessageWriter<K> {
    sink: K,
    buffer: ByteBuffer,
}

/// Header scratch: one tag byte plus the largest primitive payload.
type Head = SmallVec<[u8; 9]>;

impl<K: Sink> MessageWriter<K> {
    /// Creates a writer over `sink` with default configuration.
    pub fn new(sink: K) -> MessageWriter<K> {
        MessageWriter {
            sink,
            buffer: ByteBuffer::with_capacity(DEFAULT_BUFFER_CAPACITY),
        }
    }

    /// Creates a new [`WriterBuilder`].
    pub fn builder() -> WriterBuilder<K> {
        WriterBuilder::new()
    }

    /// Writes a nil value.
    pub fn write_nil(&mut self) -> Result<()> {
        self.put_bytes(&[NIL])
    }

    /// Writes a boolean value.
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.put_bytes(&[if value { TRUE } else { FALSE }])
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_i64(value as i64)
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_i64(value as i64)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_i64(value as i64)
    }

    /// Writes an integer using the smallest viable encoding.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        if value >= 0 {
            return self.write_u64(value as u64);
        }
        let mut head = Head::new();
        if value >= NEG_FIXINT_MIN {
            head.push(value as u8);
        } else if value >= i8::MIN as i64 {
            head.push(INT8);
            head.push(value as u8);
        } else if value >= i16::MIN as i64 {
            head.push(INT16);
            head.extend_from_slice(&(value as i16).to_be_bytes());
        } else if value >= i32::MIN as i64 {
            head.push(INT32);
            head.extend_from_slice(&(value as i32).to_be_bytes());
        } else {
            head.push(INT64);
            head.extend_from_slice(&value.to_be_bytes());
        }
        self.put_bytes(&head)
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_u64(value as u64)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_u64(value as u64)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_u64(value as u64)
    }

    /// Writes a non-negative integer using the smallest viable encoding.
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        let mut head = Head::new();
        if value < POS_FIXINT_LIMIT as u64 {
            head.push(value as u8);
        } else if value <= u8::MAX as u64 {
            head.push(UINT8);
            head.push(value as u8);
        } else if value <= u16::MAX as u64 {
            head.push(UINT16);
            head.extend_from_slice(&(value as u16).to_be_bytes());
        } else if value <= u32::MAX as u64 {
            head.push(UINT32);
            head.extend_from_slice(&(value as u32).to_be_bytes());
        } else {
            head.push(UINT64);
            head.extend_from_slice(&value.to_be_bytes());
        }
        self.put_bytes(&head)
    }

    /// Writes a single-precision float.
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        let mut head = Head::new();
        head.push(FLOAT32);
        head.extend_from_slice(&value.to_be_bytes());
        self.put_bytes(&head)
    }

    /// Writes a double-precision float.
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        let mut head = Head::new();
        head.push(FLOAT64);
        head.extend_from_slice(&value.to_be_bytes());
        self.put_bytes(&head)
    }

    /// Writes a string value. The header carries the exact UTF-8 byte
    /// count; payloads larger than the working buffer bypass it and go to
    /// the sink directly.
    pub fn write_str(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        if bytes.len() as u64 > u32::MAX as u64 {
            return Err(Error::LengthTooLarge {
                length: bytes.len() as u64,
                value_type: ValueType::String,
            });
        }
        self.write_raw_string_header(bytes.len() as u32)?;
        self.write_payload(bytes)
    }

    /// Writes a short repeated string such as a map key. Observably
    /// equivalent to [`write_str`](MessageWriter::write_str).
    pub fn write_identifier(&mut self, value: &str) -> Result<()> {
        self.write_str(value)
    }

    /// Starts an array of `count` elements; the caller must write exactly
    /// that many values next.
    pub fn write_array_header(&mut self, count: u32) -> Result<()> {
        let mut head = Head::new();
        if count <= FIXCOL_MAX {
            head.push(FIXARRAY_PREFIX | count as u8);
        } else if count <= u16::MAX as u32 {
            head.push(ARRAY16);
            head.extend_from_slice(&(count as u16).to_be_bytes());
        } else {
            head.push(ARRAY32);
            head.extend_from_slice(&count.to_be_bytes());
        }
        self.put_bytes(&head)
    }

    /// Starts a map of `count` entries; the caller must write exactly
    /// `2 * count` alternating keys and values next.
    pub fn write_map_header(&mut self, count: u32) -> Result<()> {
        let mut head = Head::new();
        if count <= FIXCOL_MAX {
            head.push(FIXMAP_PREFIX | count as u8);
        } else if count <= u16::MAX as u32 {
            head.push(MAP16);
            head.extend_from_slice(&(count as u16).to_be_bytes());
        } else {
            head.push(MAP32);
            head.extend_from_slice(&count.to_be_bytes());
        }
        self.put_bytes(&head)
    }

    /// Starts a binary value of `length` bytes; the caller must supply
    /// them with [`write_payload`](MessageWriter::write_payload).
    pub fn write_binary_header(&mut self, length: u32) -> Result<()> {
        let mut head = Head::new();
        if length <= u8::MAX as u32 {
            head.push(BIN8);
            head.push(length as u8);
        } else if length <= u16::MAX as u32 {
            head.push(BIN16);
            head.extend_from_slice(&(length as u16).to_be_bytes());
        } else {
            head.push(BIN32);
            head.extend_from_slice(&length.to_be_bytes());
        }
        self.put_bytes(&head)
    }

    /// Starts a string value of `length` UTF-8 bytes; the caller must
    /// supply exactly that many payload bytes.
    pub fn write_raw_string_header(&mut self, length: u32) -> Result<()> {
        let mut head = Head::new();
        if length <= FIXSTR_MAX {
            head.push(FIXSTR_PREFIX | length as u8);
        } else if length <= u8::MAX as u32 {
            head.push(STR8);
            head.push(length as u8);
        } else if length <= u16::MAX as u32 {
            head.push(STR16);
            head.extend_from_slice(&(length as u16).to_be_bytes());
        } else {
            head.push(STR32);
            head.extend_from_slice(&length.to_be_bytes());
        }
        self.put_bytes(&head)
    }

    /// Starts an extension value; the caller must supply exactly `length`
    /// payload bytes. Lengths 1, 2, 4, 8 and 16 use the fixext forms.
    pub fn write_extension_header(&mut self, length: u32, ext_type: i8) -> Result<()> {
        let mut head = Head::new();
        match length {
            1 => head.push(FIXEXT1),
            2 => head.push(FIXEXT2),
            4 => head.push(FIXEXT4),
            8 => head.push(FIXEXT8),
            16 => head.push(FIXEXT16),
            _ if length <= u8::MAX as u32 => {
                head.push(EXT8);
                head.push(length as u8);
            }
            _ if length <= u16::MAX as u32 => {
                head.push(EXT16);
                head.extend_from_slice(&(length as u16).to_be_bytes());
            }
            _ => {
                head.push(EXT32);
                head.extend_from_slice(&length.to_be_bytes());
            }
        }
        head.push(ext_type as u8);
        self.put_bytes(&head)
    }

    /// Writes a timestamp with the predefined extension type `-1`,
    /// choosing the shortest of the 32, 64 and 96-bit forms.
    pub fn write_timestamp(&mut self, timestamp: Timestamp) -> Result<()> {
        let secs = timestamp.secs();
        let nanos = timestamp.nanos();
        if secs >= 0 && secs < (1i64 << 34) {
            if nanos == 0 && secs <= u32::MAX as i64 {
                self.write_extension_header(4, TIMESTAMP_EXT_TYPE)?;
                self.put_bytes(&(secs as u32).to_be_bytes())
            } else {
                self.write_extension_header(8, TIMESTAMP_EXT_TYPE)?;
                let packed = ((nanos as u64) << 34) | secs as u64;
                self.put_bytes(&packed.to_be_bytes())
            }
        } else {
            self.write_extension_header(12, TIMESTAMP_EXT_TYPE)?;
            self.put_bytes(&nanos.to_be_bytes())?;
            self.put_bytes(&secs.to_be_bytes())
        }
    }

    /// Writes raw payload bytes for a previously written binary, string
    /// or extension header.
    pub fn write_payload(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() <= self.buffer.spare() {
            self.buffer.put_slice(bytes);
            return Ok(());
        }
        self.flush_buffer()?;
        if bytes.len() < self.buffer.capacity() {
            self.buffer.put_slice(bytes);
            Ok(())
        } else {
            self.sink.write_all(&[bytes])
        }
    }

    /// Flushes the working buffer and the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.flush_buffer()?;
        self.sink.flush()
    }

    /// Flushes outstanding bytes and closes the sink.
    pub fn close(mut self) -> Result<()> {
        self.flush_buffer()?;
        self.sink.close()
    }

    /// Flushes outstanding bytes and hands back the sink.
    pub fn into_inner(mut self) -> Result<K> {
        self.flush_buffer()?;
        Ok(self.sink)
    }

    fn flush_buffer(&mut self) -> Result<()> {
        let MessageWriter { sink, buffer } = self;
        if !buffer.filled().is_empty() {
            sink.write_all(&[buffer.filled()])?;
            buffer.clear_filled();
        }
        Ok(())
    }

    /// Stages a formatted piece, flushing first if it would not fit. The
    /// piece is never larger than the minimum buffer capacity.
    fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        debug_assert!(bytes.len() <= MIN_BUFFER_CAPACITY);
        if self.buffer.spare() < bytes.len() {
            self.flush_buffer()?;
        }
        self.buffer.put_slice(bytes);
        Ok(())
    }
}

/// Configures and builds a [`MessageWriter`].
pub struct WriterBuilder<K> {
    sink: Option<K>,
    buffer: Option<Vec<u8>>,
    buffer_capacity: usize,
}

impl<K: Sink> WriterBuilder<K> {
    fn new() -> WriterBuilder<K> {
        WriterBuilder {
            sink: None,
            buffer: None,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }

    /// Sets the sink to write to. Required.
    pub fn sink(mut self, sink: K) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Supplies the working-buffer storage; its length becomes the
    /// capacity.
    pub fn buffer(mut self, storage: Vec<u8>) -> Self {
        self.buffer = Some(storage);
        self
    }

    /// Sets the working-buffer capacity. Defaults to 8192; the minimum is
    /// 9 bytes.
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Builds the writer, validating that a sink is present and the
    /// working buffer meets the 9-byte minimum.
    pub fn build(self) -> Result<MessageWriter<K>> {
        let sink = self.sink.ok_or(Error::SinkRequired)?;
        let buffer = match self.buffer {
            Some(storage) if storage.len() < MIN_BUFFER_CAPACITY => {
                return Err(Error::BufferTooSmall {
                    capacity: storage.len(),
                    min: MIN_BUFFER_CAPACITY,
                })
            }
            Some(storage) => ByteBuffer::from_storage(storage),
            None if self.buffer_capacity < MIN_BUFFER_CAPACITY => {
                return Err(Error::BufferTooSmall {
                    capacity: self.buffer_capacity,
                    min: MIN_BUFFER_CAPACITY,
                })
            }
            None => ByteBuffer::with_capacity(self.buffer_capacity),
        };
        Ok(MessageWriter { sink, buffer })
    }
}
