use crate::{error::Error, error::Result, ValueType};

/// Upper bound (exclusive) of the positive fixint range.
pub(crate) const POS_FIXINT_LIMIT: u8 = 0x80;
/// Lower bound (inclusive) of the negative fixint range.
pub(crate) const NEG_FIXINT_START: u8 = 0xe0;
/// Smallest value representable as a negative fixint.
pub(crate) const NEG_FIXINT_MIN: i64 = -32;

/// 0x80..0x8f
pub(crate) const FIXMAP_PREFIX: u8 = 0x80;
/// 0x90..0x9f
pub(crate) const FIXARRAY_PREFIX: u8 = 0x90;
/// 0xa0..0xbf
pub(crate) const FIXSTR_PREFIX: u8 = 0xa0;
/// Length bits of a fixstr tag.
pub(crate) const FIXSTR_MASK: u8 = 0b0001_1111;
/// Length bits of a fixarray or fixmap tag.
pub(crate) const FIXCOL_MASK: u8 = 0b0000_1111;

pub(crate) const NIL: u8 = 0xc0;
/// Reserved by the format; must never appear on the wire.
pub(crate) const NEVER_USED: u8 = 0xc1;
pub(crate) const FALSE: u8 = 0xc2;
pub(crate) const TRUE: u8 = 0xc3;
pub(crate) const BIN8: u8 = 0xc4;
pub(crate) const BIN16: u8 = 0xc5;
pub(crate) const BIN32: u8 = 0xc6;
pub(crate) const EXT8: u8 = 0xc7;
pub(crate) const EXT16: u8 = 0xc8;
pub(crate) const EXT32: u8 = 0xc9;
pub(crate) const FLOAT32: u8 = 0xca;
pub(crate) const FLOAT64: u8 = 0xcb;
pub(crate) const UINT8: u8 = 0xcc;
pub(crate) const UINT16: u8 = 0xcd;
pub(crate) const UINT32: u8 = 0xce;
pub(crate) const UINT64: u8 = 0xcf;
pub(crate) const INT8: u8 = 0xd0;
pub(crate) const INT16: u8 = 0xd1;
pub(crate) const INT32: u8 = 0xd2;
pub(crate) const INT64: u8 = 0xd3;
pub(crate) const FIXEXT1: u8 = 0xd4;
pub(crate) const FIXEXT2: u8 = 0xd5;
pub(crate) const FIXEXT4: u8 = 0xd6;
pub(crate) const FIXEXT8: u8 = 0xd7;
pub(crate) const FIXEXT16: u8 = 0xd8;
pub(crate) const STR8: u8 = 0xd9;
pub(crate) const STR16: u8 = 0xda;
pub(crate) const STR32: u8 = 0xdb;
pub(crate) const ARRAY16: u8 = 0xdc;
pub(crate) const ARRAY32: u8 = 0xdd;
pub(crate) const MAP16: u8 = 0xde;
pub(crate) const MAP32: u8 = 0xdf;

/// Type code of the predefined timestamp extension.
pub(crate) const TIMESTAMP_EXT_TYPE: i8 = -1;

/// Largest collection count encodable in a fixarray or fixmap tag.
pub(crate) const FIXCOL_MAX: u32 = FIXCOL_MASK as u32;
/// Largest byte length encodable in a fixstr tag.
pub(crate) const FIXSTR_MAX: u32 = FIXSTR_MASK as u32;

pub(crate) fn is_fix_int(tag: u8) -> bool {
    tag < POS_FIXINT_LIMIT || tag >= NEG_FIXINT_START
}

pub(crate) fn is_fix_map(tag: u8) -> bool {
    tag & 0b1111_0000 == FIXMAP_PREFIX
}

pub(crate) fn is_fix_array(tag: u8) -> bool {
    tag & 0b1111_0000 == FIXARRAY_PREFIX
}

pub(crate) fn is_fix_str(tag: u8) -> bool {
    tag & 0b1110_0000 == FIXSTR_PREFIX
}

pub(crate) fn fix_str_len(tag: u8) -> u32 {
    (tag & FIXSTR_MASK) as u32
}

pub(crate) fn fix_col_len(tag: u8) -> u32 {
    (tag & FIXCOL_MASK) as u32
}

/// Maps a tag byte to its value type. The reserved tag `0xc1` has no type
/// and is reported as an error.
pub(crate) fn value_type(tag: u8) -> Result<ValueType> {
    if is_fix_int(tag) {
        return Ok(ValueType::Integer);
    }
    if is_fix_map(tag) {
        return Ok(ValueType::Map);
    }
    if is_fix_array(tag) {
        return Ok(ValueType::Array);
    }
    if is_fix_str(tag) {
        return Ok(ValueType::String);
    }
    let ty = match tag {
        NIL => ValueType::Nil,
        FALSE | TRUE => ValueType::Boolean,
        BIN8..=BIN32 => ValueType::Binary,
        EXT8..=EXT32 | FIXEXT1..=FIXEXT16 => ValueType::Extension,
        FLOAT32 | FLOAT64 => ValueType::Float,
        UINT8..=UINT64 | INT8..=INT64 => ValueType::Integer,
        STR8..=STR32 => ValueType::String,
        ARRAY16 | ARRAY32 => ValueType::Array,
        MAP16 | MAP32 => ValueType::Map,
        _ => {
            return Err(Error::WrongType {
                tag,
                requested: "any value",
            })
        }
    };
    Ok(ty)
}
