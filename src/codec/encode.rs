use prost::bytes::BufMut;

use super::EncodeError;
use crate::{
    descriptor::{Kind, MAP_ENTRY_KEY_NUMBER, MAP_ENTRY_VALUE_NUMBER},
    dynamic::map_entry_kinds,
    wire::{self, WireType},
    DynamicMessage, FieldDescriptor, MapKey, Value,
};

/// Walks nested messages up front so the recursive encoding passes below can
/// stay infallible.
pub(super) fn check_depth(message: &DynamicMessage, limit: u32) -> Result<(), EncodeError> {
    fn check_value(value: &Value, remaining: u32) -> Result<(), EncodeError> {
        match value {
            Value::Message(message) => {
                let remaining = remaining
                    .checked_sub(1)
                    .ok_or(EncodeError::RecursionLimitExceeded)?;
                for (_, value) in message.fields() {
                    check_value(value, remaining)?;
                }
                Ok(())
            }
            Value::List(values) => values.iter().try_for_each(|v| check_value(v, remaining)),
            Value::Map(values) => values.values().try_for_each(|v| check_value(v, remaining)),
            _ => Ok(()),
        }
    }

    for (_, value) in message.fields() {
        check_value(value, limit)?;
    }
    Ok(())
}

pub(super) fn encoded_len_message(message: &DynamicMessage) -> usize {
    message
        .fields()
        .map(|(field, value)| encoded_len_field(value, &field))
        .sum::<usize>()
        + message.unknown_fields().encoded_len()
}

pub(super) fn encode_message(message: &DynamicMessage, buf: &mut impl BufMut) {
    for (field, value) in message.fields() {
        encode_field(value, &field, buf);
    }
    message.unknown_fields().encode(buf);
}

fn encode_field(value: &Value, field: &FieldDescriptor, buf: &mut impl BufMut) {
    let number = field.number();
    if field.is_map() {
        let entry = field.kind();
        let entry = entry.as_message().expect("map field should be a message");
        let (key_kind, value_kind) = map_entry_kinds(entry);
        let value_field = entry.map_entry_value_field();
        let values = match value {
            Value::Map(values) => values,
            _ => panic!("mismatch between value {:?} and type {:?}", value, field.kind()),
        };
        for (key, entry_value) in values {
            let len = map_key_encoded_len(key, &key_kind)
                + entry_field_encoded_len(entry_value, &value_kind, &value_field);
            wire::encode_key(number, WireType::LengthDelimited, buf);
            wire::encode_varint(len as u64, buf);
            encode_map_key(key, &key_kind, buf);
            encode_entry_field(entry_value, &value_kind, &value_field, buf);
        }
    } else if field.is_list() {
        let kind = field.kind();
        let values = match value {
            Value::List(values) => values,
            _ => panic!("mismatch between value {:?} and type {:?}", value, kind),
        };
        if values.is_empty() {
            // Empty repeated fields have no wire representation.
        } else if field.is_packed() {
            wire::encode_key(number, WireType::LengthDelimited, buf);
            let len: usize = values.iter().map(|v| scalar_encoded_len(v, &kind)).sum();
            wire::encode_varint(len as u64, buf);
            for value in values {
                encode_scalar(value, &kind, buf);
            }
        } else {
            for value in values {
                encode_single(value, &kind, number, buf);
            }
        }
    } else {
        encode_single(value, &field.kind(), number, buf);
    }
}

fn encoded_len_field(value: &Value, field: &FieldDescriptor) -> usize {
    let number = field.number();
    if field.is_map() {
        let entry = field.kind();
        let entry = entry.as_message().expect("map field should be a message");
        let (key_kind, value_kind) = map_entry_kinds(entry);
        let value_field = entry.map_entry_value_field();
        let values = match value {
            Value::Map(values) => values,
            _ => panic!("mismatch between value {:?} and type {:?}", value, field.kind()),
        };
        values
            .iter()
            .map(|(key, entry_value)| {
                let len = map_key_encoded_len(key, &key_kind)
                    + entry_field_encoded_len(entry_value, &value_kind, &value_field);
                wire::key_len(number) + wire::encoded_len_varint(len as u64) + len
            })
            .sum()
    } else if field.is_list() {
        let kind = field.kind();
        let values = match value {
            Value::List(values) => values,
            _ => panic!("mismatch between value {:?} and type {:?}", value, kind),
        };
        if values.is_empty() {
            0
        } else if field.is_packed() {
            let len: usize = values.iter().map(|v| scalar_encoded_len(v, &kind)).sum();
            wire::key_len(number) + wire::encoded_len_varint(len as u64) + len
        } else {
            values
                .iter()
                .map(|value| encoded_len_single(value, &kind, number))
                .sum()
        }
    } else {
        encoded_len_single(value, &field.kind(), number)
    }
}

/// Encodes one tagged occurrence of a value.
fn encode_single(value: &Value, kind: &Kind, number: u32, buf: &mut impl BufMut) {
    match (value, kind) {
        (Value::String(value), Kind::String) => {
            wire::encode_key(number, WireType::LengthDelimited, buf);
            wire::encode_varint(value.len() as u64, buf);
            buf.put_slice(value.as_bytes());
        }
        (Value::Bytes(value), Kind::Bytes) => {
            wire::encode_key(number, WireType::LengthDelimited, buf);
            wire::encode_varint(value.len() as u64, buf);
            buf.put_slice(value);
        }
        (Value::Message(message), Kind::Message(_)) => {
            wire::encode_key(number, WireType::LengthDelimited, buf);
            wire::encode_varint(encoded_len_message(message) as u64, buf);
            encode_message(message, buf);
        }
        (value, kind) => {
            wire::encode_key(number, kind.wire_type(), buf);
            encode_scalar(value, kind, buf);
        }
    }
}

fn encoded_len_single(value: &Value, kind: &Kind, number: u32) -> usize {
    match (value, kind) {
        (Value::String(value), Kind::String) => {
            wire::key_len(number) + wire::encoded_len_varint(value.len() as u64) + value.len()
        }
        (Value::Bytes(value), Kind::Bytes) => {
            wire::key_len(number) + wire::encoded_len_varint(value.len() as u64) + value.len()
        }
        (Value::Message(message), Kind::Message(_)) => {
            let len = encoded_len_message(message);
            wire::key_len(number) + wire::encoded_len_varint(len as u64) + len
        }
        (value, kind) => wire::key_len(number) + scalar_encoded_len(value, kind),
    }
}

/// Encodes the untagged payload of a non-length-delimited kind. These are the
/// only kinds that can appear in a packed run.
fn encode_scalar(value: &Value, kind: &Kind, buf: &mut impl BufMut) {
    match (value, kind) {
        (Value::Bool(value), Kind::Bool) => wire::encode_varint(u64::from(*value), buf),
        (Value::I32(value), Kind::Int32) => wire::encode_varint(*value as i64 as u64, buf),
        (Value::I64(value), Kind::Int64) => wire::encode_varint(*value as u64, buf),
        (Value::U32(value), Kind::Uint32) => wire::encode_varint(u64::from(*value), buf),
        (Value::U64(value), Kind::Uint64) => wire::encode_varint(*value, buf),
        (Value::I32(value), Kind::Sint32) => {
            wire::encode_varint(u64::from(wire::encode_zigzag32(*value)), buf)
        }
        (Value::I64(value), Kind::Sint64) => wire::encode_varint(wire::encode_zigzag64(*value), buf),
        (Value::EnumNumber(value), Kind::Enum(_)) => wire::encode_varint(*value as i64 as u64, buf),
        (Value::U32(value), Kind::Fixed32) => buf.put_u32_le(*value),
        (Value::I32(value), Kind::Sfixed32) => buf.put_i32_le(*value),
        (Value::F32(value), Kind::Float) => buf.put_f32_le(*value),
        (Value::U64(value), Kind::Fixed64) => buf.put_u64_le(*value),
        (Value::I64(value), Kind::Sfixed64) => buf.put_i64_le(*value),
        (Value::F64(value), Kind::Double) => buf.put_f64_le(*value),
        (value, kind) => panic!("mismatch between value {:?} and type {:?}", value, kind),
    }
}

fn scalar_encoded_len(value: &Value, kind: &Kind) -> usize {
    match (value, kind) {
        (Value::Bool(value), Kind::Bool) => wire::encoded_len_varint(u64::from(*value)),
        (Value::I32(value), Kind::Int32) => wire::encoded_len_varint(*value as i64 as u64),
        (Value::I64(value), Kind::Int64) => wire::encoded_len_varint(*value as u64),
        (Value::U32(value), Kind::Uint32) => wire::encoded_len_varint(u64::from(*value)),
        (Value::U64(value), Kind::Uint64) => wire::encoded_len_varint(*value),
        (Value::I32(value), Kind::Sint32) => {
            wire::encoded_len_varint(u64::from(wire::encode_zigzag32(*value)))
        }
        (Value::I64(value), Kind::Sint64) => {
            wire::encoded_len_varint(wire::encode_zigzag64(*value))
        }
        (Value::EnumNumber(value), Kind::Enum(_)) => wire::encoded_len_varint(*value as i64 as u64),
        (Value::U32(_), Kind::Fixed32)
        | (Value::I32(_), Kind::Sfixed32)
        | (Value::F32(_), Kind::Float) => 4,
        (Value::U64(_), Kind::Fixed64)
        | (Value::I64(_), Kind::Sfixed64)
        | (Value::F64(_), Kind::Double) => 8,
        (value, kind) => panic!("mismatch between value {:?} and type {:?}", value, kind),
    }
}

/// Encodes the key field of a map entry, omitting default keys as conforming
/// encoders do.
fn encode_map_key(key: &MapKey, kind: &Kind, buf: &mut impl BufMut) {
    if key.is_default(kind) {
        return;
    }
    match key {
        MapKey::String(value) => {
            wire::encode_key(MAP_ENTRY_KEY_NUMBER, WireType::LengthDelimited, buf);
            wire::encode_varint(value.len() as u64, buf);
            buf.put_slice(value.as_bytes());
        }
        key => {
            let value = Value::from(key.clone());
            wire::encode_key(MAP_ENTRY_KEY_NUMBER, kind.wire_type(), buf);
            encode_scalar(&value, kind, buf);
        }
    }
}

fn map_key_encoded_len(key: &MapKey, kind: &Kind) -> usize {
    if key.is_default(kind) {
        return 0;
    }
    match key {
        MapKey::String(value) => {
            wire::key_len(MAP_ENTRY_KEY_NUMBER)
                + wire::encoded_len_varint(value.len() as u64)
                + value.len()
        }
        key => {
            let value = Value::from(key.clone());
            wire::key_len(MAP_ENTRY_KEY_NUMBER) + scalar_encoded_len(&value, kind)
        }
    }
}

/// Encodes the value field of a map entry, omitting default values.
fn encode_entry_field(
    value: &Value,
    kind: &Kind,
    value_field: &FieldDescriptor,
    buf: &mut impl BufMut,
) {
    if *value == Value::default_value_for_field(value_field) {
        return;
    }
    encode_single(value, kind, MAP_ENTRY_VALUE_NUMBER, buf);
}

fn entry_field_encoded_len(value: &Value, kind: &Kind, value_field: &FieldDescriptor) -> usize {
    if *value == Value::default_value_for_field(value_field) {
        return 0;
    }
    encoded_len_single(value, kind, MAP_ENTRY_VALUE_NUMBER)
}
