use bytes::Bytes;
use mxpack::{
    BufferAllocator, BufferSink, BytesSource, Error, MessageReader, MessageWriter, Result, Sink,
    Source, StreamSource, Timestamp, Utf8Policy, ValueType,
};
use proptest::prelude::*;

fn encode<F>(f: F) -> Bytes
where
    F: FnOnce(&mut MessageWriter<BufferSink>) -> Result<()>,
{
    let mut writer = MessageWriter::new(BufferSink::new());
    f(&mut writer).unwrap();
    writer.into_inner().unwrap().into_bytes()
}

fn reader(bytes: impl Into<Bytes>) -> MessageReader<BytesSource> {
    MessageReader::new(BytesSource::new(bytes))
}

/// Hands out one byte per call, forcing compaction and refills on every
/// primitive read.
struct TrickleSource {
    data: Vec<u8>,
    at: usize,
}

impl TrickleSource {
    fn new(data: impl AsRef<[u8]>) -> TrickleSource {
        TrickleSource {
            data: data.as_ref().to_vec(),
            at: 0,
        }
    }
}

impl Source for TrickleSource {
    fn read(&mut self, buf: &mut [u8], _min_bytes_hint: usize) -> Result<usize> {
        if self.at == self.data.len() || buf.is_empty() {
            return Ok(0);
        }
        buf[0] = self.data[self.at];
        self.at += 1;
        Ok(1)
    }

    fn skip(&mut self, count: usize) -> Result<()> {
        let left = self.data.len() - self.at;
        if count > left {
            return Err(Error::PrematureEof {
                expected: count,
                actual: left,
            });
        }
        self.at += count;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[test]
fn hello_then_42() {
    let encoded = encode(|w| {
        w.write_str("Hello, MxPack!")?;
        w.write_i32(42)
    });
    assert_eq!(
        encoded.as_ref(),
        [
            0xae, 0x48, 0x65, 0x6c, 0x6c, 0x6f, 0x2c, 0x20, 0x4d, 0x78, 0x50, 0x61, 0x63, 0x6b,
            0x21, 0x2a
        ]
    );

    let mut r = reader(encoded);
    assert_eq!(r.read_string().unwrap(), "Hello, MxPack!");
    assert_eq!(r.read_i32().unwrap(), 42);
    r.close().unwrap();
}

#[test]
fn int32_narrows_or_overflows() {
    let encoded = encode(|w| w.write_i32(-32769));
    assert_eq!(encoded.as_ref(), [0xd2, 0xff, 0xff, 0x7f, 0xff]);

    let err = reader(encoded.clone()).read_i16().unwrap_err();
    assert!(matches!(
        err,
        Error::IntegerOverflow {
            value: -32769,
            tag: 0xd2,
            target: "i16"
        }
    ));

    assert_eq!(reader(encoded).read_i32().unwrap(), -32769);
}

#[test]
fn array_header_then_children() {
    let encoded = encode(|w| {
        w.write_array_header(3)?;
        w.write_i32(1)?;
        w.write_str("a")?;
        w.write_bool(true)
    });
    assert_eq!(encoded.as_ref(), [0x93, 0x01, 0xa1, 0x61, 0xc3]);

    let mut r = reader(encoded);
    assert_eq!(r.read_array_header().unwrap(), 3);
    assert_eq!(r.read_i32().unwrap(), 1);
    assert_eq!(r.read_string().unwrap(), "a");
    assert!(r.read_bool().unwrap());
}

#[test]
fn large_string_goes_through_the_allocator() {
    let text = "a".repeat(1 << 20);
    let encoded = encode(|w| w.write_str(&text));
    assert_eq!(encoded[0], 0xdb);

    let allocator = BufferAllocator::pooled(1 << 20);
    let mut r = MessageReader::builder()
        .source(BytesSource::new(encoded))
        .buffer_capacity(1024)
        .allocator(allocator.clone())
        .build()
        .unwrap();
    assert_eq!(r.read_string().unwrap(), text);

    // The auxiliary buffer went back to the pool when the read finished;
    // recycled storage keeps its contents while fresh storage is zeroed.
    let lease = allocator.byte_buffer(1 << 20).unwrap();
    assert_eq!(lease[0], b'a');
}

#[test]
fn premature_eof_carries_counts() {
    let mut r = reader(&[0xd2, 0x00, 0x00][..]);
    let err = r.read_i32().unwrap_err();
    assert!(matches!(
        err,
        Error::PrematureEof {
            expected: 4,
            actual: 2
        }
    ));

    let mut r = MessageReader::new(StreamSource::new(&[0xd2, 0x00, 0x00][..]));
    let err = r.read_i32().unwrap_err();
    assert!(matches!(
        err,
        Error::PrematureEof {
            expected: 4,
            actual: 2
        }
    ));
}

#[test]
fn reserved_tag_fails_everywhere() {
    let mut r = reader(&[0xc1][..]);
    let err = r.next_type().unwrap_err();
    assert!(matches!(err, Error::WrongType { tag: 0xc1, .. }));

    let mut r = reader(&[0xc1][..]);
    let err = r.read_string().unwrap_err();
    assert!(matches!(err, Error::WrongType { tag: 0xc1, .. }));
}

#[test]
fn every_typed_read_survives_a_one_byte_source() {
    let encoded = encode(|w| {
        w.write_nil()?;
        w.write_bool(true)?;
        w.write_i64(-4_000_000_000)?;
        w.write_u64(u64::MAX)?;
        w.write_f32(2.5)?;
        w.write_f64(-0.125)?;
        w.write_str("sliced")?;
        w.write_map_header(1)?;
        w.write_str("k")?;
        w.write_array_header(2)?;
        w.write_i32(-7)?;
        w.write_timestamp(Timestamp::new(1_700_000_000, 123))?;
        w.write_binary_header(3)?;
        w.write_payload(&[9, 8, 7])
    });

    let mut r = MessageReader::builder()
        .source(TrickleSource::new(&encoded))
        .buffer_capacity(9)
        .build()
        .unwrap();
    r.read_nil().unwrap();
    assert!(r.read_bool().unwrap());
    assert_eq!(r.read_i64().unwrap(), -4_000_000_000);
    assert_eq!(r.read_u64().unwrap(), u64::MAX);
    assert_eq!(r.read_f32().unwrap(), 2.5);
    assert_eq!(r.read_f64().unwrap(), -0.125);
    assert_eq!(r.read_string().unwrap(), "sliced");
    assert_eq!(r.read_map_header().unwrap(), 1);
    assert_eq!(r.read_string().unwrap(), "k");
    assert_eq!(r.read_array_header().unwrap(), 2);
    assert_eq!(r.read_i32().unwrap(), -7);
    assert_eq!(
        r.read_timestamp().unwrap(),
        Timestamp::new(1_700_000_000, 123)
    );
    assert_eq!(r.read_binary_header().unwrap(), 3);
    let mut payload = [0u8; 3];
    r.read_payload_exact(&mut payload).unwrap();
    assert_eq!(payload, [9, 8, 7]);
}

#[test]
fn strings_larger_than_a_tiny_buffer_still_decode() {
    let text = "z".repeat(100);
    let encoded = encode(|w| w.write_str(&text));
    let mut r = MessageReader::builder()
        .source(TrickleSource::new(&encoded))
        .buffer_capacity(9)
        .build()
        .unwrap();
    assert_eq!(r.read_string().unwrap(), text);
}

#[test]
fn string_boundary_lengths_round_trip() {
    for len in [0usize, 1, 31, 32, 255, 256, 65535, 65536, 1_000_000] {
        let text = "s".repeat(len);
        let encoded = encode(|w| w.write_str(&text));
        let mut r = reader(encoded);
        assert_eq!(r.read_string().unwrap().len(), len, "length {len}");
    }
}

#[test]
fn multibyte_strings_round_trip() {
    for text in ["", "héllo wörld", "日本語テキスト", "🦀🚀", "a\u{10FFFF}b"] {
        let encoded = encode(|w| w.write_str(text));
        assert_eq!(reader(encoded).read_string().unwrap(), text);
    }
}

#[test]
fn collection_count_boundaries_round_trip() {
    for count in [0u32, 15, 16, 65535, 65536] {
        let encoded = encode(|w| w.write_array_header(count));
        assert_eq!(reader(encoded).read_array_header().unwrap(), count);

        let encoded = encode(|w| w.write_map_header(count));
        assert_eq!(reader(encoded).read_map_header().unwrap(), count);
    }

    // Small collections with their children in place.
    let encoded = encode(|w| {
        w.write_array_header(16)?;
        (0..16).try_for_each(|n| w.write_i32(n))
    });
    let mut r = reader(encoded);
    assert_eq!(r.read_array_header().unwrap(), 16);
    for n in 0..16 {
        assert_eq!(r.read_i32().unwrap(), n);
    }
}

#[test]
fn binary_and_extension_payload_boundaries_round_trip() {
    for len in [0usize, 1, 255, 256, 65535, 65536] {
        let payload: Vec<u8> = (0..len).map(|i| i as u8).collect();

        let encoded = encode(|w| {
            w.write_binary_header(len as u32)?;
            w.write_payload(&payload)
        });
        let mut r = reader(encoded);
        assert_eq!(r.read_binary_header().unwrap() as usize, len);
        let mut out = vec![0u8; len];
        if len > 0 {
            r.read_payload_exact(&mut out).unwrap();
        }
        assert_eq!(out, payload, "binary length {len}");

        if len > 0 {
            let encoded = encode(|w| {
                w.write_extension_header(len as u32, 12)?;
                w.write_payload(&payload)
            });
            let mut r = reader(encoded);
            let header = r.read_extension_header().unwrap();
            assert_eq!(header.length as usize, len);
            assert_eq!(header.ext_type, 12);
            let mut out = vec![0u8; len];
            r.read_payload_exact(&mut out).unwrap();
            assert_eq!(out, payload, "extension length {len}");
        }
    }
}

#[test]
fn special_floats_are_bit_identical() {
    for bits in [
        0.0f64.to_bits(),
        (-0.0f64).to_bits(),
        f64::INFINITY.to_bits(),
        f64::NEG_INFINITY.to_bits(),
        f64::NAN.to_bits(),
        0x7ff8_dead_beef_0001,
        5e-324f64.to_bits(),
    ] {
        let value = f64::from_bits(bits);
        let encoded = encode(|w| w.write_f64(value));
        assert_eq!(reader(encoded).read_f64().unwrap().to_bits(), bits);
    }

    for bits in [0x8000_0000u32, f32::NAN.to_bits(), 1u32] {
        let value = f32::from_bits(bits);
        let encoded = encode(|w| w.write_f32(value));
        assert_eq!(reader(encoded).read_f32().unwrap().to_bits(), bits);
    }
}

#[test]
fn narrowing_matrix_over_boundary_values() {
    let values: &[i64] = &[
        i64::MIN,
        i32::MIN as i64 - 1,
        i32::MIN as i64,
        i16::MIN as i64 - 1,
        i16::MIN as i64,
        -129,
        -128,
        -33,
        -32,
        -1,
        0,
        1,
        127,
        128,
        255,
        256,
        32767,
        32768,
        65535,
        65536,
        i32::MAX as i64,
        i32::MAX as i64 + 1,
        u32::MAX as i64,
        u32::MAX as i64 + 1,
        i64::MAX,
    ];

    for &value in values {
        let encoded = encode(|w| w.write_i64(value));

        macro_rules! check {
            ($ty:ty, $read:ident) => {
                let mut r = reader(encoded.clone());
                match <$ty>::try_from(value) {
                    Ok(expected) => assert_eq!(r.$read().unwrap(), expected, "{value}"),
                    Err(_) => assert!(
                        matches!(r.$read().unwrap_err(), Error::IntegerOverflow { .. }),
                        "{value} should overflow {}",
                        stringify!($ty)
                    ),
                }
            };
        }

        check!(i8, read_i8);
        check!(i16, read_i16);
        check!(i32, read_i32);
        check!(i64, read_i64);
        check!(u8, read_u8);
        check!(u16, read_u16);
        check!(u32, read_u32);
        check!(u64, read_u64);
    }

    // The unsigned top half never fits a signed read.
    let encoded = encode(|w| w.write_u64(u64::MAX));
    assert!(matches!(
        reader(encoded.clone()).read_i64().unwrap_err(),
        Error::IntegerOverflow { tag: 0xcf, .. }
    ));
    assert_eq!(reader(encoded).read_u64().unwrap(), u64::MAX);
}

#[test]
fn every_byte_width_value_round_trips() {
    for v in i8::MIN..=i8::MAX {
        let encoded = encode(|w| w.write_i8(v));
        assert_eq!(reader(encoded).read_i8().unwrap(), v);
    }
    for v in u8::MIN..=u8::MAX {
        let encoded = encode(|w| w.write_u8(v));
        assert_eq!(reader(encoded).read_u8().unwrap(), v);
    }
    for v in (i16::MIN..=i16::MAX).step_by(37) {
        let encoded = encode(|w| w.write_i16(v));
        assert_eq!(reader(encoded).read_i16().unwrap(), v);
    }
}

#[test]
fn timestamps_round_trip_across_forms() {
    for ts in [
        Timestamp::new(0, 0),
        Timestamp::new(42, 0),
        Timestamp::new(u32::MAX as i64, 0),
        Timestamp::new(1_700_000_000, 999_999_999),
        Timestamp::new((1 << 34) - 1, 1),
        Timestamp::new(1 << 34, 0),
        Timestamp::new(-1, 500),
        Timestamp::new(i64::MIN, 0),
    ] {
        let encoded = encode(|w| w.write_timestamp(ts));
        assert_eq!(reader(encoded).read_timestamp().unwrap(), ts);
    }
}

#[test]
fn skip_value_positions_reader_on_next_sibling() {
    let encoded = encode(|w| {
        w.write_map_header(2)?;
        w.write_str("first")?;
        w.write_array_header(3)?;
        w.write_i64(1)?;
        w.write_str(&"big".repeat(40))?;
        w.write_timestamp(Timestamp::new(5, 0))?;
        w.write_str("second")?;
        w.write_i32(99)
    });

    let mut r = reader(encoded);
    assert_eq!(r.read_map_header().unwrap(), 2);
    r.skip_value().unwrap();
    r.skip_value().unwrap();
    assert_eq!(r.read_string().unwrap(), "second");
    assert_eq!(r.read_i32().unwrap(), 99);
}

#[test]
fn identifiers_match_plain_strings() {
    let encoded = encode(|w| {
        w.write_map_header(2)?;
        w.write_identifier("name")?;
        w.write_str("one")?;
        w.write_identifier("name")?;
        w.write_str("two")
    });

    let mut r = reader(encoded);
    assert_eq!(r.read_map_header().unwrap(), 2);
    assert_eq!(r.read_identifier().unwrap(), "name");
    assert_eq!(r.read_string().unwrap(), "one");
    assert_eq!(r.read_identifier().unwrap(), "name");
    assert_eq!(r.read_string().unwrap(), "two");
}

#[test]
fn utf8_policy_controls_malformed_payloads() {
    let wire = vec![0xa2, 0xff, 0xff];

    let err = reader(wire.clone()).read_string().unwrap_err();
    assert!(matches!(err, Error::InvalidUtf8(_)));

    let mut r = MessageReader::builder()
        .source(BytesSource::new(wire))
        .utf8_policy(Utf8Policy::Replace)
        .build()
        .unwrap();
    assert_eq!(r.read_string().unwrap(), "\u{fffd}\u{fffd}");
}

#[test]
fn oversized_string_is_rejected_before_allocation() {
    let text = "a".repeat(2048);
    let encoded = encode(|w| w.write_str(&text));
    let mut r = MessageReader::builder()
        .source(BytesSource::new(encoded))
        .max_string_length(1024)
        .build()
        .unwrap();
    let err = r.read_string().unwrap_err();
    assert!(matches!(
        err,
        Error::CapacityExceeded {
            requested: 2048,
            max: 1024
        }
    ));
}

#[test]
fn next_type_reports_every_taxonomy_entry() {
    let cases: Vec<(Bytes, ValueType)> = vec![
        (encode(|w| w.write_nil()), ValueType::Nil),
        (encode(|w| w.write_bool(true)), ValueType::Boolean),
        (encode(|w| w.write_i64(-1000)), ValueType::Integer),
        (encode(|w| w.write_f64(1.5)), ValueType::Float),
        (encode(|w| w.write_str("s")), ValueType::String),
        (encode(|w| w.write_binary_header(0)), ValueType::Binary),
        (encode(|w| w.write_array_header(2)), ValueType::Array),
        (encode(|w| w.write_map_header(2)), ValueType::Map),
        (
            encode(|w| w.write_extension_header(4, 9)),
            ValueType::Extension,
        ),
    ];
    for (bytes, expected) in cases {
        assert_eq!(reader(bytes).next_type().unwrap(), expected);
    }
}

#[test]
fn writer_flushes_on_close_and_flush() {
    struct CountingSink {
        written: usize,
        flushed: bool,
    }
    impl Sink for CountingSink {
        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            self.written += buf.len();
            Ok(buf.len())
        }
        fn flush(&mut self) -> Result<()> {
            self.flushed = true;
            Ok(())
        }
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    let mut writer = MessageWriter::new(CountingSink {
        written: 0,
        flushed: false,
    });
    writer.write_i32(1).unwrap();
    writer.flush().unwrap();
    let sink = writer.into_inner().unwrap();
    assert_eq!(sink.written, 1);
    assert!(sink.flushed);
}

fn expected_int_len(value: i64) -> usize {
    if value >= 0 {
        match value {
            0..=127 => 1,
            128..=255 => 2,
            256..=65535 => 3,
            65536..=4294967295 => 5,
            _ => 9,
        }
    } else {
        match value {
            -32..=-1 => 1,
            -128..=-33 => 2,
            -32768..=-129 => 3,
            -2147483648..=-32769 => 5,
            _ => 9,
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 512, ..ProptestConfig::default() })]

    #[test]
    fn round_trip_i64(value in proptest::num::i64::ANY) {
        let encoded = encode(|w| w.write_i64(value));
        let decoded = reader(encoded).read_i64().unwrap();
        prop_assert_eq!(decoded, value);
    }

    #[test]
    fn round_trip_u64(value in proptest::num::u64::ANY) {
        let encoded = encode(|w| w.write_u64(value));
        let decoded = reader(encoded).read_u64().unwrap();
        prop_assert_eq!(decoded, value);
    }

    #[test]
    fn round_trip_f64_bits(bits in proptest::num::u64::ANY) {
        let encoded = encode(|w| w.write_f64(f64::from_bits(bits)));
        let decoded = reader(encoded).read_f64().unwrap();
        prop_assert_eq!(decoded.to_bits(), bits);
    }

    #[test]
    fn round_trip_strings(text in ".*") {
        let encoded = encode(|w| w.write_str(&text));
        let decoded = reader(encoded).read_string().unwrap();
        prop_assert_eq!(decoded, text);
    }

    #[test]
    fn integer_encoding_is_minimal(value in proptest::num::i64::ANY) {
        let encoded = encode(|w| w.write_i64(value));
        prop_assert_eq!(encoded.len(), expected_int_len(value));
    }

    #[test]
    fn round_trip_binary(payload in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let encoded = encode(|w| {
            w.write_binary_header(payload.len() as u32)?;
            w.write_payload(&payload)
        });
        let mut r = reader(encoded);
        let len = r.read_binary_header().unwrap() as usize;
        prop_assert_eq!(len, payload.len());
        let mut out = vec![0u8; len];
        if len > 0 {
            r.read_payload_exact(&mut out).unwrap();
        }
        prop_assert_eq!(out, payload);
    }
}
