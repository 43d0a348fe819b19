use prost::bytes::{Buf, Bytes};

use crate::{
    descriptor::{Kind, MAP_ENTRY_KEY_NUMBER, MAP_ENTRY_VALUE_NUMBER},
    dynamic::{map_entry_kinds, UnknownFieldSet},
    wire::{self, DecodeError, WireType},
    DynamicMessage, FieldDescriptor, MapKey, Value,
};

#[derive(Debug, Clone, Copy)]
pub(super) struct DecodeContext {
    remaining_depth: u32,
}

impl DecodeContext {
    pub(super) fn new(recursion_limit: u32) -> Self {
        DecodeContext {
            remaining_depth: recursion_limit,
        }
    }

    fn enter(&self) -> Result<DecodeContext, DecodeError> {
        match self.remaining_depth.checked_sub(1) {
            Some(remaining_depth) => Ok(DecodeContext { remaining_depth }),
            None => Err(DecodeError::RecursionLimitExceeded),
        }
    }
}

pub(super) fn merge_message(
    message: &mut DynamicMessage,
    buf: &mut Bytes,
    ctx: &DecodeContext,
) -> Result<(), DecodeError> {
    let desc = message.descriptor();
    while buf.has_remaining() {
        let (number, wire_type) = wire::decode_key(buf)?;
        if wire_type == WireType::EndGroup {
            return Err(DecodeError::UnexpectedEndGroup);
        }
        match desc.get_field(number) {
            // Group-kind fields are skip-only: their payload rides the
            // unknown buffer like any unrecognized number.
            Some(field) if !field.is_group() => {
                merge_field(message, &field, wire_type, buf, ctx)?
            }
            _ => message
                .unknown_mut()
                .decode_field(number, wire_type, buf, ctx.remaining_depth)?,
        }
    }
    Ok(())
}

fn merge_field(
    message: &mut DynamicMessage,
    field: &FieldDescriptor,
    wire_type: WireType,
    buf: &mut Bytes,
    ctx: &DecodeContext,
) -> Result<(), DecodeError> {
    if field.is_map() {
        check_wire_type(field, WireType::LengthDelimited, wire_type)?;
        merge_map_entry(message, field, buf, ctx)
    } else if field.is_list() {
        let kind = field.kind();
        let element_wire_type = kind.wire_type();
        if wire_type == WireType::LengthDelimited
            && element_wire_type != WireType::LengthDelimited
            && field.is_packable()
        {
            // Packed run: concatenated untagged elements. Decoders accept
            // both packed and unpacked forms regardless of the descriptor's
            // own encoding choice.
            let len = wire::decode_length(buf)?;
            let mut body = buf.copy_to_bytes(len);
            while body.has_remaining() {
                let value = decode_scalar(&kind, field.name(), &mut body)?;
                push_list_element(message, field, value);
            }
            Ok(())
        } else if wire_type == element_wire_type {
            let value = decode_single(&kind, field.name(), buf, ctx)?;
            push_list_element(message, field, value);
            Ok(())
        } else {
            Err(DecodeError::WireTypeMismatch {
                field: field.name().to_owned(),
                expected: element_wire_type,
                actual: wire_type,
            })
        }
    } else {
        let kind = field.kind();
        check_wire_type(field, kind.wire_type(), wire_type)?;
        match kind {
            Kind::Message(nested_desc) => {
                let len = wire::decode_length(buf)?;
                let mut body = buf.copy_to_bytes(len);
                let ctx = ctx.enter()?;
                // Repeated occurrences of an embedded message merge.
                let mut nested = match message.take_field_value(field.number()) {
                    Some(Value::Message(nested)) => nested,
                    _ => DynamicMessage::new(nested_desc),
                };
                merge_message(&mut nested, &mut body, &ctx)?;
                message.insert_field_value(field, Value::Message(nested));
                Ok(())
            }
            kind => {
                let value = decode_single(&kind, field.name(), buf, ctx)?;
                message.insert_field_value(field, value);
                Ok(())
            }
        }
    }
}

fn push_list_element(message: &mut DynamicMessage, field: &FieldDescriptor, value: Value) {
    match message.get_field_mut(field) {
        Value::List(values) => values.push(value),
        existing => panic!("list field holds {:?}", existing),
    }
}

fn merge_map_entry(
    message: &mut DynamicMessage,
    field: &FieldDescriptor,
    buf: &mut Bytes,
    ctx: &DecodeContext,
) -> Result<(), DecodeError> {
    let entry_desc = field.kind();
    let entry_desc = entry_desc
        .as_message()
        .expect("map field should be a message");
    let (key_kind, value_kind) = map_entry_kinds(entry_desc);
    let value_field = entry_desc.map_entry_value_field();

    let len = wire::decode_length(buf)?;
    let mut body = buf.copy_to_bytes(len);
    let ctx = ctx.enter()?;

    let mut key = None;
    let mut value = None;
    while body.has_remaining() {
        let (number, wire_type) = wire::decode_key(&mut body)?;
        match number {
            MAP_ENTRY_KEY_NUMBER if wire_type == key_kind.wire_type() => {
                let decoded = decode_single(&key_kind, field.name(), &mut body, &ctx)?;
                key = decoded.into_map_key();
            }
            MAP_ENTRY_VALUE_NUMBER if wire_type == value_kind.wire_type() => {
                value = Some(decode_single(&value_kind, field.name(), &mut body, &ctx)?);
            }
            _ => {
                // Stray fields in a map entry are dropped, like conforming
                // implementations do.
                UnknownFieldSet::default().decode_field(
                    number,
                    wire_type,
                    &mut body,
                    ctx.remaining_depth,
                )?;
            }
        }
    }

    let key = key.unwrap_or_else(|| MapKey::default_value(&key_kind));
    let value = value.unwrap_or_else(|| Value::default_value_for_field(&value_field));
    match message.get_field_mut(field) {
        Value::Map(values) => {
            values.insert(key, value);
        }
        existing => panic!("map field holds {:?}", existing),
    }
    Ok(())
}

/// Decodes one occurrence of a value whose wire type has already been
/// checked.
fn decode_single(
    kind: &Kind,
    field_name: &str,
    buf: &mut Bytes,
    ctx: &DecodeContext,
) -> Result<Value, DecodeError> {
    match kind {
        Kind::String => {
            let len = wire::decode_length(buf)?;
            let bytes = buf.copy_to_bytes(len);
            match String::from_utf8(bytes.to_vec()) {
                Ok(value) => Ok(Value::String(value)),
                Err(_) => Err(DecodeError::InvalidUtf8 {
                    field: field_name.to_owned(),
                }),
            }
        }
        Kind::Bytes => {
            let len = wire::decode_length(buf)?;
            Ok(Value::Bytes(buf.copy_to_bytes(len)))
        }
        Kind::Message(desc) => {
            let len = wire::decode_length(buf)?;
            let mut body = buf.copy_to_bytes(len);
            let ctx = ctx.enter()?;
            let mut nested = DynamicMessage::new(desc.clone());
            merge_message(&mut nested, &mut body, &ctx)?;
            Ok(Value::Message(nested))
        }
        kind => decode_scalar(kind, field_name, buf),
    }
}

/// Decodes the untagged payload of a non-length-delimited kind.
fn decode_scalar(kind: &Kind, field_name: &str, buf: &mut Bytes) -> Result<Value, DecodeError> {
    match kind {
        Kind::Bool => Ok(Value::Bool(wire::decode_varint(buf)? != 0)),
        Kind::Int32 => Ok(Value::I32(wire::decode_varint(buf)? as i32)),
        Kind::Int64 => Ok(Value::I64(wire::decode_varint(buf)? as i64)),
        Kind::Uint32 => Ok(Value::U32(wire::decode_varint(buf)? as u32)),
        Kind::Uint64 => Ok(Value::U64(wire::decode_varint(buf)?)),
        Kind::Sint32 => Ok(Value::I32(
            wire::decode_zigzag64(wire::decode_varint(buf)?) as i32
        )),
        Kind::Sint64 => Ok(Value::I64(wire::decode_zigzag64(wire::decode_varint(buf)?))),
        Kind::Enum(_) => Ok(Value::EnumNumber(wire::decode_varint(buf)? as i32)),
        Kind::Fixed32 => Ok(Value::U32(get_fixed32(buf)?)),
        Kind::Sfixed32 => Ok(Value::I32(get_fixed32(buf)? as i32)),
        Kind::Float => Ok(Value::F32(f32::from_le_bytes(
            get_fixed32(buf)?.to_le_bytes(),
        ))),
        Kind::Fixed64 => Ok(Value::U64(get_fixed64(buf)?)),
        Kind::Sfixed64 => Ok(Value::I64(get_fixed64(buf)? as i64)),
        Kind::Double => Ok(Value::F64(f64::from_le_bytes(
            get_fixed64(buf)?.to_le_bytes(),
        ))),
        Kind::String | Kind::Bytes | Kind::Message(_) => {
            unreachable!("length-delimited kind for field '{}'", field_name)
        }
    }
}

fn get_fixed32(buf: &mut Bytes) -> Result<u32, DecodeError> {
    if buf.remaining() < 4 {
        return Err(DecodeError::Truncated);
    }
    Ok(buf.get_u32_le())
}

fn get_fixed64(buf: &mut Bytes) -> Result<u64, DecodeError> {
    if buf.remaining() < 8 {
        return Err(DecodeError::Truncated);
    }
    Ok(buf.get_u64_le())
}

fn check_wire_type(
    field: &FieldDescriptor,
    expected: WireType,
    actual: WireType,
) -> Result<(), DecodeError> {
    if expected == actual {
        Ok(())
    } else {
        Err(DecodeError::WireTypeMismatch {
            field: field.name().to_owned(),
            expected,
            actual,
        })
    }
}
