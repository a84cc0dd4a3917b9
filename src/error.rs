use std::io;

use thiserror::Error;

use crate::ValueType;

/// Alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while reading or writing MessagePack data.
///
/// The set is closed: every failure surfaced by a reader, writer, or
/// allocator is one of these variants. After a decode or encode error the
/// working buffer is in an indeterminate state; drop the reader or writer
/// and build a new one.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying source failed.
    #[error("failed to read from the underlying source")]
    IoRead(#[source] io::Error),

    /// The underlying sink failed.
    #[error("failed to write to the underlying sink")]
    IoWrite(#[source] io::Error),

    /// Closing the underlying source or sink failed.
    #[error("failed to close the underlying source or sink")]
    IoClose(#[source] io::Error),

    /// The source reported end-of-stream before a required number of bytes
    /// was available.
    #[error("source ended after {actual} of {expected} required bytes")]
    PrematureEof { expected: usize, actual: usize },

    /// The observed tag byte cannot begin a value of the requested type.
    #[error("unexpected tag 0x{tag:02x} when reading {requested}")]
    WrongType { tag: u8, requested: &'static str },

    /// A decoded integer does not fit into the requested width.
    #[error("integer {value} (tag 0x{tag:02x}) does not fit into {target}")]
    IntegerOverflow {
        value: i128,
        tag: u8,
        target: &'static str,
    },

    /// A 32-bit length field decoded to a value outside `[0, 2^31 - 1]`,
    /// or a payload handed to the writer cannot be described by a 32-bit
    /// length.
    #[error("{value_type} length {length} is outside the representable range")]
    LengthTooLarge { length: u64, value_type: ValueType },

    /// An allocator request exceeded the configured maximum capacity.
    #[error("requested a buffer of {requested} bytes, allocator maximum is {max}")]
    CapacityExceeded { requested: usize, max: usize },

    /// A string payload is not valid UTF-8.
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8(#[source] std::str::Utf8Error),

    /// A working buffer was configured below the minimum capacity.
    #[error("buffer capacity {capacity} is below the minimum of {min}")]
    BufferTooSmall { capacity: usize, min: usize },

    /// A reader builder was finalized without a source.
    #[error("no source was supplied to the reader builder")]
    SourceRequired,

    /// A writer builder was finalized without a sink.
    #[error("no sink was supplied to the writer builder")]
    SinkRequired,
}
