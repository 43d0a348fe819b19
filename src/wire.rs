//! Low-level proto3 wire format primitives shared by the binary codec.
//!
//! Everything here operates on [`Buf`]/[`BufMut`] and reports structural
//! failures through [`DecodeError`]; field-level context is attached by the
//! codec layer.

use std::fmt;

use prost::bytes::{Buf, BufMut};

/// The smallest valid field number.
pub(crate) const MIN_FIELD_NUMBER: u32 = 1;
/// The largest valid field number, `2^29 - 1`.
pub(crate) const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// The wire type component of a field tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Varint-encoded integers: int32, int64, uint32, uint64, sint32, sint64, bool, enum.
    Varint = 0,
    /// Fixed 8-byte little-endian values: fixed64, sfixed64, double.
    SixtyFourBit = 1,
    /// Length-delimited payloads: string, bytes, embedded messages, packed repeated fields.
    LengthDelimited = 2,
    /// Deprecated group start marker. Only ever skipped.
    StartGroup = 3,
    /// Deprecated group end marker.
    EndGroup = 4,
    /// Fixed 4-byte little-endian values: fixed32, sfixed32, float.
    ThirtyTwoBit = 5,
}

impl WireType {
    pub(crate) fn try_from_value(value: u64) -> Result<WireType, DecodeError> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::SixtyFourBit),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::ThirtyTwoBit),
            _ => Err(DecodeError::InvalidTag { value }),
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireType::Varint => write!(f, "varint"),
            WireType::SixtyFourBit => write!(f, "64-bit"),
            WireType::LengthDelimited => write!(f, "length-delimited"),
            WireType::StartGroup => write!(f, "start-group"),
            WireType::EndGroup => write!(f, "end-group"),
            WireType::ThirtyTwoBit => write!(f, "32-bit"),
        }
    }
}

/// An error raised while decoding proto3 wire bytes.
///
/// Every variant aborts the unmarshal operation that raised it; no partially
/// decoded message is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A varint ran past its maximum width of 10 bytes.
    MalformedVarint,
    /// A tag had an invalid wire type or a zero field number.
    InvalidTag {
        /// The raw tag value read from the wire.
        value: u64,
    },
    /// An end-group tag appeared with no matching start-group.
    UnexpectedEndGroup,
    /// The input ended in the middle of a value.
    Truncated,
    /// A string field contained bytes that are not valid UTF-8.
    InvalidUtf8 {
        /// Name of the offending field.
        field: String,
    },
    /// A known field was encoded with the wrong wire type.
    WireTypeMismatch {
        /// Name of the offending field.
        field: String,
        /// The wire type implied by the field's kind.
        expected: WireType,
        /// The wire type found on the wire.
        actual: WireType,
    },
    /// The input exceeded the codec's configured size limit.
    MessageTooLarge {
        /// Observed size in bytes.
        size: usize,
        /// The configured limit in bytes.
        limit: usize,
    },
    /// Nesting exceeded the codec's configured recursion limit.
    RecursionLimitExceeded,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::MalformedVarint => write!(f, "malformed varint"),
            DecodeError::InvalidTag { value } => write!(f, "invalid tag value: {}", value),
            DecodeError::UnexpectedEndGroup => write!(f, "unexpected end-group tag"),
            DecodeError::Truncated => write!(f, "unexpected end of input"),
            DecodeError::InvalidUtf8 { field } => {
                write!(f, "field '{}' contains invalid UTF-8", field)
            }
            DecodeError::WireTypeMismatch {
                field,
                expected,
                actual,
            } => write!(
                f,
                "field '{}' has wire type {}, expected {}",
                field, actual, expected
            ),
            DecodeError::MessageTooLarge { size, limit } => {
                write!(f, "message of {} bytes exceeds limit of {} bytes", size, limit)
            }
            DecodeError::RecursionLimitExceeded => write!(f, "recursion limit reached"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Encodes `value` in LEB128 variable-length format.
pub(crate) fn encode_varint(mut value: u64, buf: &mut impl BufMut) {
    loop {
        if value < 0x80 {
            buf.put_u8(value as u8);
            break;
        }
        buf.put_u8(((value & 0x7f) | 0x80) as u8);
        value >>= 7;
    }
}

/// Returns the encoded width of `value` in LEB128 format, between 1 and 10.
pub(crate) fn encoded_len_varint(value: u64) -> usize {
    // Based on VarintSize64 from the C++ runtime.
    ((((value | 1).leading_zeros() ^ 63) * 9 + 73) / 64) as usize
}

/// Decodes a LEB128 variable-length integer.
///
/// Fails with [`DecodeError::MalformedVarint`] if the continuation bit is
/// still set after 10 bytes, and [`DecodeError::Truncated`] if the input runs
/// out mid-varint.
pub(crate) fn decode_varint(buf: &mut impl Buf) -> Result<u64, DecodeError> {
    let mut value = 0u64;
    for count in 0..10 {
        if !buf.has_remaining() {
            return Err(DecodeError::Truncated);
        }
        let byte = buf.get_u8();
        value |= u64::from(byte & 0x7f) << (count * 7);
        if byte < 0x80 {
            return Ok(value);
        }
    }
    Err(DecodeError::MalformedVarint)
}

/// Maps a signed 32-bit integer to an unsigned one with the ZigZag scheme.
pub(crate) fn encode_zigzag32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Inverse of [`encode_zigzag32`].
pub(crate) fn decode_zigzag32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ (-((value & 1) as i32))
}

/// Maps a signed 64-bit integer to an unsigned one with the ZigZag scheme.
pub(crate) fn encode_zigzag64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`encode_zigzag64`].
pub(crate) fn decode_zigzag64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ (-((value & 1) as i64))
}

/// Encodes a field key: `(number << 3) | wire_type`.
pub(crate) fn encode_key(number: u32, wire_type: WireType, buf: &mut impl BufMut) {
    debug_assert!((MIN_FIELD_NUMBER..=MAX_FIELD_NUMBER).contains(&number));
    let key = (number << 3) | wire_type as u32;
    encode_varint(u64::from(key), buf);
}

/// Returns the encoded width of a field key, between 1 and 5 bytes.
pub(crate) fn key_len(number: u32) -> usize {
    encoded_len_varint(u64::from(number) << 3)
}

/// Decodes a field key into its field number and wire type.
pub(crate) fn decode_key(buf: &mut impl Buf) -> Result<(u32, WireType), DecodeError> {
    let key = decode_varint(buf)?;
    if key > u64::from(u32::MAX) {
        return Err(DecodeError::InvalidTag { value: key });
    }
    let wire_type = WireType::try_from_value(key & 0x07)?;
    let number = (key as u32) >> 3;
    if number < MIN_FIELD_NUMBER {
        return Err(DecodeError::InvalidTag { value: key });
    }
    Ok((number, wire_type))
}

/// Decodes a length prefix and checks it against the remaining input, so a
/// lying prefix fails with [`DecodeError::Truncated`] before any allocation.
pub(crate) fn decode_length(buf: &mut impl Buf) -> Result<usize, DecodeError> {
    let len = decode_varint(buf)?;
    if len > buf.remaining() as u64 {
        return Err(DecodeError::Truncated);
    }
    Ok(len as usize)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn roundtrip_varint(value: u64) -> u64 {
        let mut buf = Vec::new();
        encode_varint(value, &mut buf);
        assert_eq!(buf.len(), encoded_len_varint(value));
        decode_varint(&mut buf.as_slice()).unwrap()
    }

    #[test]
    fn varint_boundaries() {
        for value in [
            0,
            1,
            127,
            128,
            300,
            (1 << 31) - 1,
            1 << 31,
            i64::MAX as u64,
            u64::MAX,
        ] {
            assert_eq!(roundtrip_varint(value), value);
        }
    }

    #[test]
    fn varint_encodings() {
        let mut buf = Vec::new();
        encode_varint(0, &mut buf);
        assert_eq!(buf, [0x00]);

        buf.clear();
        encode_varint(300, &mut buf);
        assert_eq!(buf, [0xac, 0x02]);

        buf.clear();
        encode_varint(u64::MAX, &mut buf);
        assert_eq!(buf.len(), 10);
    }

    #[test]
    fn varint_malformed() {
        let bytes = [0x80u8; 10];
        assert_eq!(
            decode_varint(&mut bytes.as_slice()),
            Err(DecodeError::MalformedVarint)
        );
    }

    #[test]
    fn varint_truncated() {
        let bytes = [0x80u8, 0x80];
        assert_eq!(
            decode_varint(&mut bytes.as_slice()),
            Err(DecodeError::Truncated)
        );
    }

    #[test]
    fn zigzag_extremes() {
        assert_eq!(encode_zigzag32(0), 0);
        assert_eq!(encode_zigzag32(-1), 1);
        assert_eq!(encode_zigzag32(1), 2);
        assert_eq!(encode_zigzag32(i32::MIN), u32::MAX);
        assert_eq!(encode_zigzag32(i32::MAX), u32::MAX - 1);
        assert_eq!(encode_zigzag64(i64::MIN), u64::MAX);
        assert_eq!(encode_zigzag64(i64::MAX), u64::MAX - 1);
    }

    #[test]
    fn key_roundtrip() {
        let mut buf = Vec::new();
        encode_key(1, WireType::Varint, &mut buf);
        assert_eq!(buf, [0x08]);
        assert_eq!(
            decode_key(&mut buf.as_slice()).unwrap(),
            (1, WireType::Varint)
        );

        let bytes = [0x07u8]; // wire type 7 does not exist
        assert!(matches!(
            decode_key(&mut bytes.as_slice()),
            Err(DecodeError::InvalidTag { .. })
        ));

        let bytes = [0x00u8]; // field number 0 is invalid
        assert!(matches!(
            decode_key(&mut bytes.as_slice()),
            Err(DecodeError::InvalidTag { .. })
        ));
    }

    proptest! {
        #[test]
        fn varint_roundtrip(value: u64) {
            prop_assert_eq!(roundtrip_varint(value), value);
        }

        #[test]
        fn zigzag32_roundtrip(value: i32) {
            prop_assert_eq!(decode_zigzag32(encode_zigzag32(value)), value);
        }

        #[test]
        fn zigzag64_roundtrip(value: i64) {
            prop_assert_eq!(decode_zigzag64(encode_zigzag64(value)), value);
        }
    }
}
