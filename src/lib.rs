//! Streaming reader and writer for the
//! [MessagePack](https://msgpack.org/) binary serialization format.
//!
//! A [`MessageWriter`] encodes values with the smallest viable format tag
//! and stages them in a fixed-capacity working buffer before flushing to a
//! [`Sink`]. A [`MessageReader`] pulls bytes from a [`Source`] through its
//! own working buffer and decodes them with safe numeric narrowing. Both
//! ends are single-threaded and blocking; all waiting happens inside the
//! source or sink.
//!
//! # Example
//!
//! ```
//! use mxpack::{BufferSink, BytesSource, MessageReader, MessageWriter};
//!
//! # fn main() -> mxpack::Result<()> {
//! let mut writer = MessageWriter::new(BufferSink::new());
//! writer.write_str("Hello, MxPack!")?;
//! writer.write_i32(42)?;
//! let encoded = writer.into_inner()?.into_bytes();
//!
//! let mut reader = MessageReader::new(BytesSource::new(encoded));
//! assert_eq!(reader.read_string()?, "Hello, MxPack!");
//! assert_eq!(reader.read_i32()?, 42);
//! # Ok(())
//! # }
//! ```

/// Working buffers and the buffer allocator.
pub mod buffer;
/// MessagePack encoder and decoder.
pub mod encoding;
/// Error surface.
pub mod error;
/// Sink adapters.
pub mod sink;
/// Source adapters.
pub mod source;
/// UTF-8 string pipeline.
pub mod string;

pub use bytes::Bytes;

pub use crate::{
    buffer::{BufferAllocator, LeasedBuffer},
    encoding::{
        de::{MessageReader, ReaderBuilder},
        ser::{MessageWriter, WriterBuilder},
    },
    error::{Error, Result},
    sink::{BufferSink, DiscardSink, Sink, StreamSink},
    source::{BytesSource, EmptySource, Source, StreamSource},
    string::Utf8Policy,
};

use std::fmt;

/// The externally visible taxonomy of MessagePack values.
///
/// Every format tag maps to exactly one value type; the reserved tag `0xc1`
/// maps to none and is a decode error wherever it appears.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ValueType {
    Nil,
    Boolean,
    Integer,
    Float,
    String,
    Binary,
    Array,
    Map,
    Extension,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ValueType::Nil => "nil",
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Binary => "binary",
            ValueType::Array => "array",
            ValueType::Map => "map",
            ValueType::Extension => "extension",
        };
        f.write_str(name)
    }
}

/// Header of an extension value: a payload length and a signed type code.
///
/// Type codes in `[0, 127]` are application extensions; `[-128, -1]` are
/// reserved for the format itself.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ExtensionHeader {
    /// Payload length in bytes.
    pub length: u32,
    /// Extension type code.
    pub ext_type: i8,
}

impl ExtensionHeader {
    /// Whether the type code is reserved by the format.
    pub fn is_reserved(&self) -> bool {
        self.ext_type < 0
    }
}

pub(crate) const NANOS_PER_SEC: u32 = 1_000_000_000;

/// A point in time carried by the predefined timestamp extension
/// (type code `-1`): seconds since the epoch plus a sub-second
/// nanosecond component in `[0, 999_999_999]`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    secs: i64,
    nanos: u32,
}

impl Timestamp {
    /// Creates a timestamp, carrying whole seconds out of `nanos`.
    pub fn new(secs: i64, nanos: u32) -> Timestamp {
        Timestamp {
            secs: secs.saturating_add((nanos / NANOS_PER_SEC) as i64),
            nanos: nanos % NANOS_PER_SEC,
        }
    }

    /// Seconds since the epoch.
    pub fn secs(&self) -> i64 {
        self.secs
    }

    /// Sub-second nanoseconds, always below one billion.
    pub fn nanos(&self) -> u32 {
        self.nanos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_type_names() {
        assert_eq!(ValueType::Nil.to_string(), "nil");
        assert_eq!(ValueType::Extension.to_string(), "extension");
    }

    #[test]
    fn extension_header_reserved_range() {
        assert!(ExtensionHeader { length: 0, ext_type: -1 }.is_reserved());
        assert!(!ExtensionHeader { length: 0, ext_type: 4 }.is_reserved());
    }

    #[test]
    fn timestamp_carries_excess_nanos() {
        let ts = Timestamp::new(10, 2_500_000_000);
        assert_eq!(ts.secs(), 12);
        assert_eq!(ts.nanos(), 500_000_000);
    }
}
