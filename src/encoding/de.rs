use super::*;
use crate::{
    buffer::{
        BufferAllocator, ByteBuffer, DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_ALLOCATOR_CAPACITY,
        MIN_BUFFER_CAPACITY,
    },
    error::{Error, Result},
    source::Source,
    string::{self, Identifiers, Utf8Policy, DEFAULT_MAX_STRING_LENGTH, MAX_IDENTIFIER_LENGTH},
    ExtensionHeader, Timestamp, ValueType, NANOS_PER_SEC,
};

/// Classification of a format tag byte.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Tag {
    PosFixInt(u8),
    NegFixInt(i8),
    FixMap(u8),
    FixArray(u8),
    FixStr(u8),
    Nil,
    Reserved,
    False,
    True,
    Bin8,
    Bin16,
    Bin32,
    Ext8,
    Ext16,
    Ext32,
    Float32,
    Float64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    FixExt1,
    FixExt2,
    FixExt4,
    FixExt8,
    FixExt16,
    Str8,
    Str16,
    Str32,
    Array16,
    Array32,
    Map16,
    Map32,
}

impl Tag {
    pub(crate) fn classify(byte: u8) -> Tag {
        match byte {
            0x00..=0x7f => Tag::PosFixInt(byte),
            0x80..=0x8f => Tag::FixMap(byte & FIXCOL_MASK),
            0x90..=0x9f => Tag::FixArray(byte & FIXCOL_MASK),
            0xa0..=0xbf => Tag::FixStr(byte & FIXSTR_MASK),
            NIL => Tag::Nil,
            NEVER_USED => Tag::Reserved,
            FALSE => Tag::False,
            TRUE => Tag::True,
            BIN8 => Tag::Bin8,
            BIN16 => Tag::Bin16,
            BIN32 => Tag::Bin32,
            EXT8 => Tag::Ext8,
            EXT16 => Tag::Ext16,
            EXT32 => Tag::Ext32,
            FLOAT32 => Tag::Float32,
            FLOAT64 => Tag::Float64,
            UINT8 => Tag::Uint8,
            UINT16 => Tag::Uint16,
            UINT32 => Tag::Uint32,
            UINT64 => Tag::Uint64,
            INT8 => Tag::Int8,
            INT16 => Tag::Int16,
            INT32 => Tag::Int32,
            INT64 => Tag::Int64,
            FIXEXT1 => Tag::FixExt1,
            FIXEXT2 => Tag::FixExt2,
            FIXEXT4 => Tag::FixExt4,
            FIXEXT8 => Tag::FixExt8,
            FIXEXT16 => Tag::FixExt16,
            STR8 => Tag::Str8,
            STR16 => Tag::Str16,
            STR32 => Tag::Str32,
            ARRAY16 => Tag::Array16,
            ARRAY32 => Tag::Array32,
            MAP16 => Tag::Map16,
            MAP32 => Tag::Map32,
            0xe0..=0xff => Tag::NegFixInt(byte as i8),
        }
    }
}

macro_rules! narrowing_reads {
    ($($(#[$doc:meta])* $name:ident -> $ty:ty, $label:literal;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self) -> Result<$ty> {
                let (value, tag) = self.read_int_value($label)?;
                <$ty>::try_from(value).map_err(|_| Error::IntegerOverflow {
                    value,
                    tag,
                    target: $label,
                })
            }
        )*
    };
}

/// Reads MessagePack values from a [`Source`].
///
/// Construct one with [`MessageReader::new`] or through
/// [`MessageReader::builder`], then call the typed `read_*` operations.
/// [`next_type`](MessageReader::next_type) peeks at the upcoming value
/// without consuming it. After any error the working buffer is in an
/// indeterminate state and the reader should be dropped.
#[derive(Debug)]
pub struct MessageReader<S> {
    source: S,
    buffer: ByteBuffer,
    allocator: BufferAllocator,
    policy: Utf8Policy,
    max_string_length: usize,
    identifiers: Option<Identifiers>,
}

impl<S: Source> MessageReader<S> {
    /// Creates a reader over `source` with default configuration.
    pub fn new(source: S) -> MessageReader<S> {
        MessageReader {
            source,
            buffer: ByteBuffer::with_capacity(DEFAULT_BUFFER_CAPACITY),
            allocator: BufferAllocator::unpooled(DEFAULT_MAX_ALLOCATOR_CAPACITY),
            policy: Utf8Policy::Strict,
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            identifiers: Some(Identifiers::new()),
        }
    }

    /// Creates a new [`ReaderBuilder`].
    pub fn builder() -> ReaderBuilder<S> {
        ReaderBuilder::new()
    }

    /// Returns the type of the next value without consuming it.
    pub fn next_type(&mut self) -> Result<ValueType> {
        value_type(self.next_format()?)
    }

    /// Returns the next format tag byte without consuming it.
    pub fn next_format(&mut self) -> Result<u8> {
        self.ensure_remaining(1)?;
        Ok(self.buffer.peek_u8())
    }

    /// Reads a nil value.
    pub fn read_nil(&mut self) -> Result<()> {
        let tag = self.get_u8()?;
        match tag {
            NIL => Ok(()),
            _ => Err(Error::WrongType {
                tag,
                requested: "nil",
            }),
        }
    }

    /// Reads a boolean value.
    pub fn read_bool(&mut self) -> Result<bool> {
        let tag = self.get_u8()?;
        match tag {
            TRUE => Ok(true),
            FALSE => Ok(false),
            _ => Err(Error::WrongType {
                tag,
                requested: "boolean",
            }),
        }
    }

    narrowing_reads! {
        /// Reads an integer value that fits into an `i8`.
        read_i8 -> i8, "i8";
        /// Reads an integer value that fits into an `i16`.
        read_i16 -> i16, "i16";
        /// Reads an integer value that fits into an `i32`.
        read_i32 -> i32, "i32";
        /// Reads an integer value that fits into an `i64`.
        read_i64 -> i64, "i64";
        /// Reads an integer value that fits into a `u8`.
        read_u8 -> u8, "u8";
        /// Reads an integer value that fits into a `u16`.
        read_u16 -> u16, "u16";
        /// Reads an integer value that fits into a `u32`.
        read_u32 -> u32, "u32";
        /// Reads an integer value that fits into a `u64`.
        read_u64 -> u64, "u64";
    }

    /// Reads a single-precision float.
    pub fn read_f32(&mut self) -> Result<f32> {
        let tag = self.get_u8()?;
        match tag {
            FLOAT32 => self.get_f32(),
            _ => Err(Error::WrongType {
                tag,
                requested: "f32",
            }),
        }
    }

    /// Reads a double-precision float.
    pub fn read_f64(&mut self) -> Result<f64> {
        let tag = self.get_u8()?;
        match tag {
            FLOAT64 => self.get_f64(),
            _ => Err(Error::WrongType {
                tag,
                requested: "f64",
            }),
        }
    }

    /// Reads a string value.
    ///
    /// The maximum byte length is configurable through the builder and
    /// defaults to 1 MiB. Payloads larger than the working buffer are
    /// staged through a buffer leased from the allocator.
    pub fn read_string(&mut self) -> Result<String> {
        let length = self.read_raw_string_header()?;
        self.read_string_of(length as usize)
    }

    /// Reads a short string, interning it so repeated occurrences skip
    /// UTF-8 validation. Observably equivalent to
    /// [`read_string`](MessageReader::read_string).
    pub fn read_identifier(&mut self) -> Result<String> {
        let length = self.read_raw_string_header()? as usize;
        if length <= MAX_IDENTIFIER_LENGTH
            && length <= self.buffer.capacity()
            && self.identifiers.is_some()
        {
            self.ensure_remaining(length)?;
            let MessageReader {
                buffer,
                policy,
                identifiers,
                ..
            } = self;
            if let Some(cache) = identifiers.as_mut() {
                return cache.resolve(buffer.take_slice(length), *policy);
            }
        }
        self.read_string_of(length)
    }

    /// Starts reading an array value; the caller must read exactly the
    /// returned number of elements next.
    pub fn read_array_header(&mut self) -> Result<u32> {
        let tag = self.get_u8()?;
        match tag {
            ARRAY16 => self.get_length16(),
            ARRAY32 => self.get_length32(ValueType::Array),
            _ if is_fix_array(tag) => Ok(fix_col_len(tag)),
            _ => Err(Error::WrongType {
                tag,
                requested: "array header",
            }),
        }
    }

    /// Starts reading a map value; the caller must read exactly `2 * n`
    /// alternating keys and values next.
    pub fn read_map_header(&mut self) -> Result<u32> {
        let tag = self.get_u8()?;
        match tag {
            MAP16 => self.get_length16(),
            MAP32 => self.get_length32(ValueType::Map),
            _ if is_fix_map(tag) => Ok(fix_col_len(tag)),
            _ => Err(Error::WrongType {
                tag,
                requested: "map header",
            }),
        }
    }

    /// Starts reading a binary value; the caller must consume exactly the
    /// returned number of payload bytes with
    /// [`read_payload`](MessageReader::read_payload).
    pub fn read_binary_header(&mut self) -> Result<u32> {
        let tag = self.get_u8()?;
        match tag {
            BIN8 => self.get_length8(),
            BIN16 => self.get_length16(),
            BIN32 => self.get_length32(ValueType::Binary),
            _ => Err(Error::WrongType {
                tag,
                requested: "binary header",
            }),
        }
    }

    /// Starts reading a string value without decoding it; the caller must
    /// consume exactly the returned number of payload bytes.
    pub fn read_raw_string_header(&mut self) -> Result<u32> {
        let tag = self.get_u8()?;
        match tag {
            STR8 => self.get_length8(),
            STR16 => self.get_length16(),
            STR32 => self.get_length32(ValueType::String),
            _ if is_fix_str(tag) => Ok(fix_str_len(tag)),
            _ => Err(Error::WrongType {
                tag,
                requested: "string",
            }),
        }
    }

    /// Starts reading an extension value; the caller must consume exactly
    /// `length` payload bytes next.
    pub fn read_extension_header(&mut self) -> Result<ExtensionHeader> {
        let tag = self.get_u8()?;
        let length = match tag {
            FIXEXT1 => 1,
            FIXEXT2 => 2,
            FIXEXT4 => 4,
            FIXEXT8 => 8,
            FIXEXT16 => 16,
            EXT8 => self.get_length8()?,
            EXT16 => self.get_length16()?,
            EXT32 => self.get_length32(ValueType::Extension)?,
            _ => {
                return Err(Error::WrongType {
                    tag,
                    requested: "extension header",
                })
            }
        };
        let ext_type = self.get_i8()?;
        Ok(ExtensionHeader { length, ext_type })
    }

    /// Reads a timestamp carried by the predefined extension type `-1`.
    pub fn read_timestamp(&mut self) -> Result<Timestamp> {
        let tag = self.next_format()?;
        let mismatch = || Error::WrongType {
            tag,
            requested: "timestamp",
        };
        let header = self.read_extension_header()?;
        if header.ext_type != TIMESTAMP_EXT_TYPE {
            return Err(mismatch());
        }
        match header.length {
            4 => Ok(Timestamp::new(self.get_u32()? as i64, 0)),
            8 => {
                let raw = self.get_u64()?;
                let nanos = (raw >> 34) as u32;
                let secs = (raw & ((1 << 34) - 1)) as i64;
                if nanos >= NANOS_PER_SEC {
                    return Err(mismatch());
                }
                Ok(Timestamp::new(secs, nanos))
            }
            12 => {
                let nanos = self.get_u32()?;
                let secs = self.get_i64()?;
                if nanos >= NANOS_PER_SEC {
                    return Err(mismatch());
                }
                Ok(Timestamp::new(secs, nanos))
            }
            _ => Err(mismatch()),
        }
    }

    /// Reads at least `min_bytes` into `buf` and returns the number of
    /// bytes placed. Bytes already staged in the working buffer are
    /// transferred first; the rest is pulled straight from the source.
    ///
    /// Used together with [`read_binary_header`](MessageReader::read_binary_header),
    /// [`read_raw_string_header`](MessageReader::read_raw_string_header) or
    /// [`read_extension_header`](MessageReader::read_extension_header).
    pub fn read_payload(&mut self, buf: &mut [u8], min_bytes: usize) -> Result<usize> {
        debug_assert!(min_bytes <= buf.len());
        let buffered = self.buffer.remaining().min(buf.len());
        buf[..buffered].copy_from_slice(self.buffer.take_slice(buffered));
        if buffered >= min_bytes {
            return Ok(buffered);
        }
        match self.read_at_least(&mut buf[buffered..], min_bytes - buffered) {
            Ok(count) => Ok(buffered + count),
            Err(Error::PrematureEof { actual, .. }) => Err(Error::PrematureEof {
                expected: min_bytes,
                actual: buffered + actual,
            }),
            Err(other) => Err(other),
        }
    }

    /// Fills `buf` completely.
    pub fn read_payload_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let len = buf.len();
        self.read_payload(buf, len).map(|_| ())
    }

    /// Skips one complete value, descending into arrays and maps.
    pub fn skip_value(&mut self) -> Result<()> {
        let mut pending: u64 = 1;
        while pending > 0 {
            pending -= 1;
            let tag = self.get_u8()?;
            match Tag::classify(tag) {
                Tag::Nil | Tag::False | Tag::True | Tag::PosFixInt(_) | Tag::NegFixInt(_) => {}
                Tag::Uint8 | Tag::Int8 => self.skip_bytes(1)?,
                Tag::Uint16 | Tag::Int16 => self.skip_bytes(2)?,
                Tag::Uint32 | Tag::Int32 | Tag::Float32 => self.skip_bytes(4)?,
                Tag::Uint64 | Tag::Int64 | Tag::Float64 => self.skip_bytes(8)?,
                Tag::FixStr(count) => self.skip_bytes(count as usize)?,
                Tag::Str8 | Tag::Bin8 => {
                    let count = self.get_length8()?;
                    self.skip_bytes(count as usize)?;
                }
                Tag::Str16 | Tag::Bin16 => {
                    let count = self.get_length16()?;
                    self.skip_bytes(count as usize)?;
                }
                Tag::Str32 => {
                    let count = self.get_length32(ValueType::String)?;
                    self.skip_bytes(count as usize)?;
                }
                Tag::Bin32 => {
                    let count = self.get_length32(ValueType::Binary)?;
                    self.skip_bytes(count as usize)?;
                }
                Tag::FixExt1 => self.skip_bytes(2)?,
                Tag::FixExt2 => self.skip_bytes(3)?,
                Tag::FixExt4 => self.skip_bytes(5)?,
                Tag::FixExt8 => self.skip_bytes(9)?,
                Tag::FixExt16 => self.skip_bytes(17)?,
                Tag::Ext8 => {
                    let count = self.get_length8()?;
                    self.skip_bytes(count as usize + 1)?;
                }
                Tag::Ext16 => {
                    let count = self.get_length16()?;
                    self.skip_bytes(count as usize + 1)?;
                }
                Tag::Ext32 => {
                    let count = self.get_length32(ValueType::Extension)?;
                    self.skip_bytes(count as usize + 1)?;
                }
                Tag::FixArray(count) => pending += count as u64,
                Tag::Array16 => pending += self.get_length16()? as u64,
                Tag::Array32 => pending += self.get_length32(ValueType::Array)? as u64,
                Tag::FixMap(count) => pending += 2 * count as u64,
                Tag::Map16 => pending += 2 * self.get_length16()? as u64,
                Tag::Map32 => pending += 2 * self.get_length32(ValueType::Map)? as u64,
                Tag::Reserved => {
                    return Err(Error::WrongType {
                        tag,
                        requested: "any value",
                    })
                }
            }
        }
        Ok(())
    }

    /// Closes the underlying source.
    pub fn close(mut self) -> Result<()> {
        self.source.close()
    }

    /// Refills the working buffer until `count` bytes are available,
    /// compacting pending bytes to the front first.
    fn ensure_remaining(&mut self, count: usize) -> Result<()> {
        debug_assert!(count <= self.buffer.capacity());
        if self.buffer.remaining() >= count {
            return Ok(());
        }
        self.buffer.compact();
        let MessageReader { source, buffer, .. } = self;
        while buffer.remaining() < count {
            let missing = count - buffer.remaining();
            let read = source.read(buffer.writable_tail(), missing)?;
            if read == 0 {
                return Err(Error::PrematureEof {
                    expected: count,
                    actual: buffer.remaining(),
                });
            }
            buffer.advance_limit(read);
        }
        Ok(())
    }

    fn read_at_least(&mut self, buf: &mut [u8], min_bytes: usize) -> Result<usize> {
        debug_assert!(min_bytes <= buf.len());
        let mut total = 0;
        while total < min_bytes {
            let count = self.source.read(&mut buf[total..], min_bytes - total)?;
            if count == 0 {
                return Err(Error::PrematureEof {
                    expected: min_bytes,
                    actual: total,
                });
            }
            total += count;
        }
        Ok(total)
    }

    /// The single place that decides between decoding a string in place
    /// and staging it through an allocator lease.
    fn read_string_of(&mut self, length: usize) -> Result<String> {
        if length > self.max_string_length {
            return Err(Error::CapacityExceeded {
                requested: length,
                max: self.max_string_length,
            });
        }
        if length <= self.buffer.capacity() {
            self.ensure_remaining(length)?;
            let MessageReader { buffer, policy, .. } = self;
            string::decode_utf8(buffer.take_slice(length), *policy)
        } else {
            let mut lease = self.allocator.byte_buffer(length)?;
            let buffered = self.buffer.remaining().min(length);
            lease[..buffered].copy_from_slice(self.buffer.take_slice(buffered));
            if buffered < length {
                match self.read_at_least(&mut lease[buffered..length], length - buffered) {
                    Ok(_) => {}
                    Err(Error::PrematureEof { actual, .. }) => {
                        return Err(Error::PrematureEof {
                            expected: length,
                            actual: buffered + actual,
                        })
                    }
                    Err(other) => return Err(other),
                }
            }
            string::decode_utf8(&lease[..length], self.policy)
        }
    }

    /// Decodes one integer value at full width, whatever its encoding.
    fn read_int_value(&mut self, requested: &'static str) -> Result<(i128, u8)> {
        let tag = self.get_u8()?;
        let value = match Tag::classify(tag) {
            Tag::PosFixInt(n) => n as i128,
            Tag::NegFixInt(n) => n as i128,
            Tag::Uint8 => self.get_u8()? as i128,
            Tag::Uint16 => self.get_u16()? as i128,
            Tag::Uint32 => self.get_u32()? as i128,
            Tag::Uint64 => self.get_u64()? as i128,
            Tag::Int8 => self.get_i8()? as i128,
            Tag::Int16 => self.get_i16()? as i128,
            Tag::Int32 => self.get_i32()? as i128,
            Tag::Int64 => self.get_i64()? as i128,
            _ => return Err(Error::WrongType { tag, requested }),
        };
        Ok((value, tag))
    }

    fn skip_bytes(&mut self, count: usize) -> Result<()> {
        let buffered = self.buffer.remaining().min(count);
        self.buffer.take_slice(buffered);
        if count > buffered {
            self.source.skip(count - buffered)?;
        }
        Ok(())
    }

    fn get_u8(&mut self) -> Result<u8> {
        self.ensure_remaining(1)?;
        Ok(self.buffer.get_u8())
    }

    fn get_i8(&mut self) -> Result<i8> {
        self.ensure_remaining(1)?;
        Ok(self.buffer.get_i8())
    }

    fn get_u16(&mut self) -> Result<u16> {
        self.ensure_remaining(2)?;
        Ok(self.buffer.get_u16())
    }

    fn get_i16(&mut self) -> Result<i16> {
        self.ensure_remaining(2)?;
        Ok(self.buffer.get_i16())
    }

    fn get_u32(&mut self) -> Result<u32> {
        self.ensure_remaining(4)?;
        Ok(self.buffer.get_u32())
    }

    fn get_i32(&mut self) -> Result<i32> {
        self.ensure_remaining(4)?;
        Ok(self.buffer.get_i32())
    }

    fn get_u64(&mut self) -> Result<u64> {
        self.ensure_remaining(8)?;
        Ok(self.buffer.get_u64())
    }

    fn get_i64(&mut self) -> Result<i64> {
        self.ensure_remaining(8)?;
        Ok(self.buffer.get_i64())
    }

    fn get_f32(&mut self) -> Result<f32> {
        self.ensure_remaining(4)?;
        Ok(self.buffer.get_f32())
    }

    fn get_f64(&mut self) -> Result<f64> {
        self.ensure_remaining(8)?;
        Ok(self.buffer.get_f64())
    }

    fn get_length8(&mut self) -> Result<u32> {
        Ok(self.get_u8()? as u32)
    }

    fn get_length16(&mut self) -> Result<u32> {
        Ok(self.get_u16()? as u32)
    }

    fn get_length32(&mut self, value_type: ValueType) -> Result<u32> {
        let length = self.get_u32()?;
        if length > i32::MAX as u32 {
            return Err(Error::LengthTooLarge {
                length: length as u64,
                value_type,
            });
        }
        Ok(length)
    }
}

/// Configures and builds a [`MessageReader`].
pub struct ReaderBuilder<S> {
    source: Option<S>,
    buffer: Option<Vec<u8>>,
    buffer_capacity: usize,
    allocator: Option<BufferAllocator>,
    max_allocator_capacity: usize,
    utf8_policy: Utf8Policy,
    max_string_length: usize,
    identifiers: bool,
}

impl<S: Source> ReaderBuilder<S> {
    fn new() -> ReaderBuilder<S> {
        ReaderBuilder {
            source: None,
            buffer: None,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            allocator: None,
            max_allocator_capacity: DEFAULT_MAX_ALLOCATOR_CAPACITY,
            utf8_policy: Utf8Policy::Strict,
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            identifiers: true,
        }
    }

    /// Sets the source to read from. Required.
    pub fn source(mut self, source: S) -> Self {
        self.source = Some(source);
        self
    }

    /// Supplies the working-buffer storage; its length becomes the
    /// capacity. Takes precedence over
    /// [`buffer_capacity`](ReaderBuilder::buffer_capacity).
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

    /// Sets the allocator used for auxiliary buffers. Defaults to an
    /// unpooled allocator bounded by
    /// [`max_allocator_capacity`](ReaderBuilder::max_allocator_capacity).
    pub fn allocator(mut self, allocator: BufferAllocator) -> Self {
        self.allocator = Some(allocator);
        self
    }

    /// Bounds the default allocator. Defaults to 1 MiB.
    pub fn max_allocator_capacity(mut self, max: usize) -> Self {
        self.max_allocator_capacity = max;
        self
    }

    /// Sets how malformed UTF-8 is handled. Defaults to strict failure.
    pub fn utf8_policy(mut self, policy: Utf8Policy) -> Self {
        self.utf8_policy = policy;
        self
    }

    /// Bounds the byte length of decoded strings. Defaults to 1 MiB.
    pub fn max_string_length(mut self, max: usize) -> Self {
        self.max_string_length = max;
        self
    }

    /// Enables or disables identifier interning. Enabled by default.
    pub fn identifiers(mut self, enabled: bool) -> Self {
        self.identifiers = enabled;
        self
    }

    /// Builds the reader, validating that a source is present and the
    /// working buffer meets the 9-byte minimum.
    pub fn build(self) -> Result<MessageReader<S>> {
        let source = self.source.ok_or(Error::SourceRequired)?;
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
        let allocator = self
            .allocator
            .unwrap_or_else(|| BufferAllocator::unpooled(self.max_allocator_capacity));
        Ok(MessageReader {
            source,
            buffer,
            allocator,
            policy: self.utf8_policy,
            max_string_length: self.max_string_length,
            identifiers: self.identifiers.then(Identifiers::new),
        })
    }
}
