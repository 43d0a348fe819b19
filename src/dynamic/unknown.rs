use std::collections::BTreeMap;

use prost::bytes::{Buf, BufMut, Bytes};

use crate::wire::{self, DecodeError, WireType};

/// The unknown fields of a message, preserved byte-for-byte for round trips.
///
/// A field is unknown if the decoding descriptor has no field with its
/// number. This is commonly the result of a new field being added to the
/// message definition, so unknown fields are never an error: they are carried
/// along and re-emitted after the known fields, grouped by number.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UnknownFieldSet {
    fields: BTreeMap<u32, Vec<UnknownField>>,
}

/// A single unknown field value, tagged by its wire type.
#[derive(Debug, Clone, PartialEq)]
pub enum UnknownField {
    /// An unknown field with the varint wire type.
    Varint(u64),
    /// An unknown field with the 64-bit wire type.
    Fixed64([u8; 8]),
    /// An unknown field with the length-delimited wire type.
    LengthDelimited(Bytes),
    /// An unknown field with the deprecated group wire type. The contents are
    /// preserved structurally so the matching end tag can be re-emitted.
    Group(UnknownFieldSet),
    /// An unknown field with the 32-bit wire type.
    Fixed32([u8; 4]),
}

impl UnknownFieldSet {
    /// Returns `true` if no unknown fields were recorded.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Gets an iterator over all unknown fields in ascending number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &UnknownField)> {
        self.fields
            .iter()
            .flat_map(|(&number, fields)| fields.iter().map(move |field| (number, field)))
    }

    pub(crate) fn clear(&mut self) {
        self.fields.clear();
    }

    /// Reads the value for `number` from `buf` and records it.
    ///
    /// `remaining_depth` bounds group nesting, which is the only recursive
    /// structure an unknown field can contain.
    pub(crate) fn decode_field(
        &mut self,
        number: u32,
        wire_type: WireType,
        buf: &mut Bytes,
        remaining_depth: u32,
    ) -> Result<(), DecodeError> {
        let field = match wire_type {
            WireType::Varint => UnknownField::Varint(wire::decode_varint(buf)?),
            WireType::SixtyFourBit => {
                if buf.remaining() < 8 {
                    return Err(DecodeError::Truncated);
                }
                let mut value = [0; 8];
                buf.copy_to_slice(&mut value);
                UnknownField::Fixed64(value)
            }
            WireType::LengthDelimited => {
                let len = wire::decode_length(buf)?;
                UnknownField::LengthDelimited(buf.copy_to_bytes(len))
            }
            WireType::StartGroup => {
                let mut group = UnknownFieldSet::default();
                group.decode_group(number, buf, remaining_depth)?;
                UnknownField::Group(group)
            }
            WireType::EndGroup => return Err(DecodeError::UnexpectedEndGroup),
            WireType::ThirtyTwoBit => {
                if buf.remaining() < 4 {
                    return Err(DecodeError::Truncated);
                }
                let mut value = [0; 4];
                buf.copy_to_slice(&mut value);
                UnknownField::Fixed32(value)
            }
        };

        self.fields.entry(number).or_default().push(field);
        Ok(())
    }

    /// Reads group contents until the end tag matching `number`.
    fn decode_group(
        &mut self,
        number: u32,
        buf: &mut Bytes,
        remaining_depth: u32,
    ) -> Result<(), DecodeError> {
        let remaining_depth = remaining_depth
            .checked_sub(1)
            .ok_or(DecodeError::RecursionLimitExceeded)?;
        loop {
            if !buf.has_remaining() {
                return Err(DecodeError::Truncated);
            }
            let (field_number, wire_type) = wire::decode_key(buf)?;
            if wire_type == WireType::EndGroup {
                return if field_number == number {
                    Ok(())
                } else {
                    Err(DecodeError::UnexpectedEndGroup)
                };
            }
            self.decode_field(field_number, wire_type, buf, remaining_depth)?;
        }
    }

    pub(crate) fn encode(&self, buf: &mut impl BufMut) {
        for (&number, fields) in &self.fields {
            for field in fields {
                match field {
                    UnknownField::Varint(value) => {
                        wire::encode_key(number, WireType::Varint, buf);
                        wire::encode_varint(*value, buf);
                    }
                    UnknownField::Fixed64(value) => {
                        wire::encode_key(number, WireType::SixtyFourBit, buf);
                        buf.put_slice(value);
                    }
                    UnknownField::LengthDelimited(value) => {
                        wire::encode_key(number, WireType::LengthDelimited, buf);
                        wire::encode_varint(value.len() as u64, buf);
                        buf.put_slice(value);
                    }
                    UnknownField::Group(value) => {
                        wire::encode_key(number, WireType::StartGroup, buf);
                        value.encode(buf);
                        wire::encode_key(number, WireType::EndGroup, buf);
                    }
                    UnknownField::Fixed32(value) => {
                        wire::encode_key(number, WireType::ThirtyTwoBit, buf);
                        buf.put_slice(value);
                    }
                }
            }
        }
    }

    pub(crate) fn encoded_len(&self) -> usize {
        let mut len = 0;
        for (&number, fields) in &self.fields {
            for field in fields {
                len += match field {
                    UnknownField::Varint(value) => {
                        wire::key_len(number) + wire::encoded_len_varint(*value)
                    }
                    UnknownField::Fixed64(value) => wire::key_len(number) + value.len(),
                    UnknownField::LengthDelimited(value) => {
                        wire::key_len(number)
                            + wire::encoded_len_varint(value.len() as u64)
                            + value.len()
                    }
                    UnknownField::Group(value) => wire::key_len(number) * 2 + value.encoded_len(),
                    UnknownField::Fixed32(value) => wire::key_len(number) + value.len(),
                };
            }
        }
        len
    }
}
