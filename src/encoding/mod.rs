//! # MessagePack encoder and decoder
//!
//! [`MessageWriter`] turns typed values into MessagePack bytes;
//! [`MessageReader`] turns them back. Values round-trip exactly when the
//! same call sequence is replayed on the reading side.
//!
//! # Example
//!
//! ```
//! use mxpack::{BufferSink, BytesSource, MessageReader, MessageWriter};
//!
//! # fn main() -> mxpack::Result<()> {
//! let mut writer = MessageWriter::new(BufferSink::new());
//! writer.write_array_header(3)?;
//! writer.write_i32(1)?;
//! writer.write_str("a")?;
//! writer.write_bool(true)?;
//! let encoded = writer.into_inner()?.into_bytes();
//! assert_eq!(encoded.as_ref(), [0x93, 0x01, 0xa1, 0x61, 0xc3]);
//!
//! let mut reader = MessageReader::new(BytesSource::new(encoded));
//! assert_eq!(reader.read_array_header()?, 3);
//! assert_eq!(reader.read_i32()?, 1);
//! assert_eq!(reader.read_string()?, "a");
//! assert!(reader.read_bool()?);
//! # Ok(())
//! # }
//! ```

/// Streaming decoder.
pub mod de;
/// Streaming encoder.
pub mod ser;

mod constants;
pub(crate) use constants::*;

pub use de::{MessageReader, ReaderBuilder};
pub use ser::{MessageWriter, WriterBuilder};
