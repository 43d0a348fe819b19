use std::collections::BTreeMap;

use base64::{
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD},
    Engine,
};
use serde_json::Value as JsonValue;

use super::{DeserializeOptions, JsonError};
use crate::{
    descriptor::Kind, dynamic::map_entry_kinds, wkt, DynamicMessage, FieldDescriptor, MapKey,
    MessageDescriptor, Value,
};

pub(super) fn deserialize_message(
    desc: &MessageDescriptor,
    json: &JsonValue,
    options: &DeserializeOptions,
) -> Result<DynamicMessage, JsonError> {
    if let Some(message) = wkt::deserialize_well_known(desc, json, options)? {
        return Ok(message);
    }

    let object = json.as_object().ok_or_else(|| {
        JsonError::mapping(format!("expected a JSON object for '{}'", desc.full_name()))
    })?;
    let mut message = DynamicMessage::new(desc.clone());
    deserialize_message_fields(&mut message, object.iter(), options)?;
    Ok(message)
}

/// Applies JSON object entries to `message` fields. Shared with the
/// `google.protobuf.Any` handler.
pub(crate) fn deserialize_message_fields<'a>(
    message: &mut DynamicMessage,
    entries: impl Iterator<Item = (&'a String, &'a JsonValue)>,
    options: &DeserializeOptions,
) -> Result<(), JsonError> {
    let desc = message.descriptor();
    for (key, json) in entries {
        // Both the JSON name and the original proto name are accepted.
        let field = desc
            .get_field_by_json_name(key)
            .or_else(|| desc.get_field_by_name(key));
        let field = match field {
            Some(field) => field,
            None => {
                if options.deny_unknown_fields_enabled() {
                    return Err(JsonError::mapping(format!(
                        "unrecognized field name '{}'",
                        key
                    )));
                }
                continue;
            }
        };

        if json.is_null() && !null_is_meaningful(&field) {
            // JSON null reads as "unset" for every other field type.
            continue;
        }

        let value = deserialize_field_value(&field, json, options)?;
        message
            .set_field(&field, value)
            .map_err(JsonError::mapping)?;
    }
    Ok(())
}

/// JSON null is a value of its own only for `google.protobuf.NullValue`
/// enums and `google.protobuf.Value` messages.
fn null_is_meaningful(field: &FieldDescriptor) -> bool {
    match field.kind() {
        Kind::Enum(desc) => desc.full_name() == "google.protobuf.NullValue",
        Kind::Message(desc) => desc.full_name() == "google.protobuf.Value",
        _ => false,
    }
}

fn deserialize_field_value(
    field: &FieldDescriptor,
    json: &JsonValue,
    options: &DeserializeOptions,
) -> Result<Value, JsonError> {
    if field.is_map() {
        let entry = field.kind();
        let entry = entry.as_message().expect("map field should be a message");
        let (key_kind, value_kind) = map_entry_kinds(entry);
        let object = json.as_object().ok_or_else(|| {
            JsonError::mapping(format!(
                "expected a JSON object for map field '{}'",
                field.full_name()
            ))
        })?;
        let mut values = BTreeMap::new();
        for (key, value) in object {
            values.insert(
                parse_map_key(&key_kind, key)?,
                deserialize_kind_value(&value_kind, value, options)?,
            );
        }
        Ok(Value::Map(values))
    } else if field.is_list() {
        let kind = field.kind();
        let array = json.as_array().ok_or_else(|| {
            JsonError::mapping(format!(
                "expected a JSON array for repeated field '{}'",
                field.full_name()
            ))
        })?;
        array
            .iter()
            .map(|value| deserialize_kind_value(&kind, value, options))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List)
    } else {
        deserialize_kind_value(&field.kind(), json, options)
    }
}

pub(crate) fn deserialize_kind_value(
    kind: &Kind,
    json: &JsonValue,
    options: &DeserializeOptions,
) -> Result<Value, JsonError> {
    match kind {
        Kind::Bool => json
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| expected("a boolean", json)),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => {
            let value = parse_i64(json)?;
            i32::try_from(value)
                .map(Value::I32)
                .map_err(|_| JsonError::mapping(format!("value {} is out of range", value)))
        }
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => parse_i64(json).map(Value::I64),
        Kind::Uint32 | Kind::Fixed32 => {
            let value = parse_u64(json)?;
            u32::try_from(value)
                .map(Value::U32)
                .map_err(|_| JsonError::mapping(format!("value {} is out of range", value)))
        }
        Kind::Uint64 | Kind::Fixed64 => parse_u64(json).map(Value::U64),
        Kind::Float => parse_f64(json).map(|value| Value::F32(value as f32)),
        Kind::Double => parse_f64(json).map(Value::F64),
        Kind::String => json
            .as_str()
            .map(|value| Value::String(value.to_owned()))
            .ok_or_else(|| expected("a string", json)),
        Kind::Bytes => {
            let encoded = json.as_str().ok_or_else(|| expected("a string", json))?;
            decode_base64(encoded).map(|bytes| Value::Bytes(bytes.into()))
        }
        Kind::Enum(desc) => match json {
            JsonValue::String(name) => desc
                .get_value_by_name(name)
                .map(|value| Value::EnumNumber(value.number()))
                .ok_or_else(|| {
                    JsonError::mapping(format!(
                        "unrecognized value '{}' for enum '{}'",
                        name,
                        desc.full_name()
                    ))
                }),
            JsonValue::Null if desc.full_name() == "google.protobuf.NullValue" => {
                Ok(Value::EnumNumber(0))
            }
            // Unknown numeric values are preserved, not rejected.
            json => parse_i64(json)
                .and_then(|value| {
                    i32::try_from(value)
                        .map_err(|_| JsonError::mapping(format!("value {} is out of range", value)))
                })
                .map(Value::EnumNumber),
        },
        Kind::Message(desc) => {
            deserialize_message(desc, json, options).map(Value::Message)
        }
    }
}

fn parse_map_key(kind: &Kind, key: &str) -> Result<MapKey, JsonError> {
    let out_of_range = || JsonError::mapping(format!("map key '{}' is out of range", key));
    match kind {
        Kind::Bool => match key {
            "true" => Ok(MapKey::Bool(true)),
            "false" => Ok(MapKey::Bool(false)),
            _ => Err(JsonError::mapping(format!("invalid map key '{}'", key))),
        },
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => {
            key.parse().map(MapKey::I32).map_err(|_| out_of_range())
        }
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => {
            key.parse().map(MapKey::I64).map_err(|_| out_of_range())
        }
        Kind::Uint32 | Kind::Fixed32 => key.parse().map(MapKey::U32).map_err(|_| out_of_range()),
        Kind::Uint64 | Kind::Fixed64 => key.parse().map(MapKey::U64).map_err(|_| out_of_range()),
        Kind::String => Ok(MapKey::String(key.to_owned())),
        kind => Err(JsonError::mapping(format!(
            "type {:?} is not a valid map key type",
            kind
        ))),
    }
}

fn parse_i64(json: &JsonValue) -> Result<i64, JsonError> {
    match json {
        JsonValue::Number(number) => {
            if let Some(value) = number.as_i64() {
                Ok(value)
            } else if let Some(value) = number.as_f64() {
                float_to_int(value)
            } else {
                Err(expected("an integer", json))
            }
        }
        JsonValue::String(value) => {
            if let Ok(parsed) = value.parse::<i64>() {
                Ok(parsed)
            } else if let Ok(parsed) = value.parse::<f64>() {
                float_to_int(parsed)
            } else {
                Err(expected("an integer", json))
            }
        }
        json => Err(expected("an integer", json)),
    }
}

fn parse_u64(json: &JsonValue) -> Result<u64, JsonError> {
    match json {
        JsonValue::Number(number) => {
            if let Some(value) = number.as_u64() {
                Ok(value)
            } else if let Some(value) = number.as_f64() {
                float_to_uint(value)
            } else {
                Err(expected("an unsigned integer", json))
            }
        }
        JsonValue::String(value) => {
            if let Ok(parsed) = value.parse::<u64>() {
                Ok(parsed)
            } else if let Ok(parsed) = value.parse::<f64>() {
                float_to_uint(parsed)
            } else {
                Err(expected("an unsigned integer", json))
            }
        }
        json => Err(expected("an unsigned integer", json)),
    }
}

fn float_to_int(value: f64) -> Result<i64, JsonError> {
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value <= i64::MAX as f64 {
        Ok(value as i64)
    } else {
        Err(JsonError::mapping(format!(
            "value {} is not an integer",
            value
        )))
    }
}

fn float_to_uint(value: f64) -> Result<u64, JsonError> {
    if value.fract() == 0.0 && value >= 0.0 && value <= u64::MAX as f64 {
        Ok(value as u64)
    } else {
        Err(JsonError::mapping(format!(
            "value {} is not an unsigned integer",
            value
        )))
    }
}

fn parse_f64(json: &JsonValue) -> Result<f64, JsonError> {
    match json {
        JsonValue::Number(number) => number
            .as_f64()
            .ok_or_else(|| expected("a number", json)),
        JsonValue::String(value) => match value.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            value => value.parse().map_err(|_| JsonError::mapping("invalid number string")),
        },
        json => Err(expected("a number", json)),
    }
}

/// Accepts the standard and URL-safe alphabets, with or without padding.
pub(crate) fn decode_base64(encoded: &str) -> Result<Vec<u8>, JsonError> {
    STANDARD
        .decode(encoded)
        .or_else(|_| STANDARD_NO_PAD.decode(encoded))
        .or_else(|_| URL_SAFE.decode(encoded))
        .or_else(|_| URL_SAFE_NO_PAD.decode(encoded))
        .map_err(|_| JsonError::mapping("invalid base64 string"))
}

fn expected(what: &str, json: &JsonValue) -> JsonError {
    JsonError::mapping(format!("expected {}, found {}", what, json))
}
