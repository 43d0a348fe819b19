use base64::{prelude::BASE64_STANDARD, Engine};
use serde_json::{Map, Value as JsonValue};

use super::{JsonError, SerializeOptions};
use crate::{
    descriptor::Kind, dynamic::map_entry_kinds, wkt, DynamicMessage, FieldDescriptor, MapKey,
    Value,
};

pub(super) fn serialize_message(
    message: &DynamicMessage,
    options: &SerializeOptions,
) -> Result<JsonValue, JsonError> {
    if let Some(value) = wkt::serialize_well_known(message, options)? {
        return Ok(value);
    }
    serialize_message_fields(message, options).map(JsonValue::Object)
}

/// Serializes the fields of `message` into a JSON object, in descriptor
/// order. Shared with the `google.protobuf.Any` handler, which flattens the
/// payload fields next to `@type`.
pub(crate) fn serialize_message_fields(
    message: &DynamicMessage,
    options: &SerializeOptions,
) -> Result<Map<String, JsonValue>, JsonError> {
    let desc = message.descriptor();
    let mut object = Map::new();
    for field in desc.fields() {
        let value = match message.get_field(&field) {
            Some(value) => {
                if !options.emit_unpopulated_fields_enabled()
                    && !field.supports_presence()
                    && value.is_default_for_field(&field)
                {
                    continue;
                }
                std::borrow::Cow::Borrowed(value)
            }
            None => {
                if !options.emit_unpopulated_fields_enabled() || field.supports_presence() {
                    continue;
                }
                std::borrow::Cow::Owned(Value::default_value_for_field(&field))
            }
        };

        let name = if options.use_proto_field_name_enabled() {
            field.name()
        } else {
            field.json_name()
        };
        object.insert(
            name.to_owned(),
            serialize_field_value(&value, &field, options)?,
        );
    }
    Ok(object)
}

fn serialize_field_value(
    value: &Value,
    field: &FieldDescriptor,
    options: &SerializeOptions,
) -> Result<JsonValue, JsonError> {
    if field.is_map() {
        let entry = field.kind();
        let entry = entry.as_message().expect("map field should be a message");
        let (_, value_kind) = map_entry_kinds(entry);
        let values = match value {
            Value::Map(values) => values,
            _ => return Err(mismatch(value, field)),
        };
        let mut object = Map::new();
        for (key, value) in values {
            object.insert(
                map_key_to_string(key),
                serialize_kind_value(value, &value_kind, options)?,
            );
        }
        Ok(JsonValue::Object(object))
    } else if field.is_list() {
        let kind = field.kind();
        let values = match value {
            Value::List(values) => values,
            _ => return Err(mismatch(value, field)),
        };
        values
            .iter()
            .map(|value| serialize_kind_value(value, &kind, options))
            .collect::<Result<Vec<_>, _>>()
            .map(JsonValue::Array)
    } else {
        serialize_kind_value(value, &field.kind(), options)
    }
}

pub(crate) fn serialize_kind_value(
    value: &Value,
    kind: &Kind,
    options: &SerializeOptions,
) -> Result<JsonValue, JsonError> {
    match (value, kind) {
        (Value::Bool(value), Kind::Bool) => Ok(JsonValue::Bool(*value)),
        (Value::I32(value), Kind::Int32 | Kind::Sint32 | Kind::Sfixed32) => {
            Ok(JsonValue::from(*value))
        }
        (Value::U32(value), Kind::Uint32 | Kind::Fixed32) => Ok(JsonValue::from(*value)),
        (Value::I64(value), Kind::Int64 | Kind::Sint64 | Kind::Sfixed64) => {
            if options.stringify_64_bit_integers_enabled() {
                Ok(JsonValue::String(value.to_string()))
            } else {
                Ok(JsonValue::from(*value))
            }
        }
        (Value::U64(value), Kind::Uint64 | Kind::Fixed64) => {
            if options.stringify_64_bit_integers_enabled() {
                Ok(JsonValue::String(value.to_string()))
            } else {
                Ok(JsonValue::from(*value))
            }
        }
        (Value::F32(value), Kind::Float) => serialize_float(f64::from(*value)),
        (Value::F64(value), Kind::Double) => serialize_float(*value),
        (Value::String(value), Kind::String) => Ok(JsonValue::String(value.clone())),
        (Value::Bytes(value), Kind::Bytes) => {
            Ok(JsonValue::String(BASE64_STANDARD.encode(value)))
        }
        (Value::EnumNumber(number), Kind::Enum(enum_desc)) => {
            if enum_desc.full_name() == "google.protobuf.NullValue" {
                Ok(JsonValue::Null)
            } else if options.use_enum_numbers_enabled() {
                Ok(JsonValue::from(*number))
            } else if let Some(value) = enum_desc.get_value(*number) {
                Ok(JsonValue::String(value.name().to_owned()))
            } else {
                // Unknown enum numbers have no symbolic form.
                Ok(JsonValue::from(*number))
            }
        }
        (Value::Message(message), Kind::Message(_)) => serialize_message(message, options),
        (value, kind) => Err(JsonError::mapping(format!(
            "cannot serialize value {:?} as {:?}",
            value, kind
        ))),
    }
}

fn serialize_float(value: f64) -> Result<JsonValue, JsonError> {
    if value == f64::INFINITY {
        Ok(JsonValue::String("Infinity".to_owned()))
    } else if value == f64::NEG_INFINITY {
        Ok(JsonValue::String("-Infinity".to_owned()))
    } else if value.is_nan() {
        Ok(JsonValue::String("NaN".to_owned()))
    } else {
        serde_json::Number::from_f64(value)
            .map(JsonValue::Number)
            .ok_or_else(|| JsonError::mapping("float is not representable in JSON"))
    }
}

fn map_key_to_string(key: &MapKey) -> String {
    match key {
        MapKey::Bool(value) => value.to_string(),
        MapKey::I32(value) => value.to_string(),
        MapKey::I64(value) => value.to_string(),
        MapKey::U32(value) => value.to_string(),
        MapKey::U64(value) => value.to_string(),
        MapKey::String(value) => value.clone(),
    }
}

fn mismatch(value: &Value, field: &FieldDescriptor) -> JsonError {
    JsonError::mapping(format!(
        "cannot serialize value {:?} for field '{}'",
        value,
        field.full_name()
    ))
}
