//! Handlers for the `google.protobuf` well-known types.
//!
//! Each handler is a pair of converters between a canonical host
//! representation (the `prost-types` structs, or primitives for the wrapper
//! types) and a [`DynamicMessage`] of the corresponding full name, plus the
//! canonical textual JSON form the JSON codec delegates to.
//!
//! Handlers that need to resolve type names (`google.protobuf.Any`) are
//! parameterised by a [`DescriptorPool`] or [`TypeRegistry`][crate::TypeRegistry]
//! rather than any process-global state.

mod descriptors;

pub use self::descriptors::well_known_types_pool;

use std::str::FromStr;

use prost_types::{Duration, FieldMask, ListValue, Struct, Timestamp};
use serde_json::{Map, Value as JsonValue};

use crate::{
    bridge::{from_dynamic, to_dynamic, TranscodeError},
    json::{
        camel_case_segment, deserialize_kind_value, deserialize_message_fields,
        serialize_kind_value, serialize_message_fields, snake_case_segment, DeserializeOptions,
        JsonError, SerializeOptions,
    },
    BinaryCodec, DescriptorPool, DynamicMessage, EncodeError, MessageDescriptor,
};

const ANY_TYPE_URL_PREFIX: &str = "type.googleapis.com/";

// Timestamps are restricted to [0001-01-01, 9999-12-31].
const TIMESTAMP_SECONDS_MIN: i64 = -62_135_596_800;
const TIMESTAMP_SECONDS_MAX: i64 = 253_402_300_799;
// Durations are restricted to ±10000 years.
const DURATION_SECONDS_MAX: i64 = 315_576_000_000;

pub(crate) fn is_well_known_type(full_name: &str) -> bool {
    matches!(
        full_name,
        "google.protobuf.Any"
            | "google.protobuf.Timestamp"
            | "google.protobuf.Duration"
            | "google.protobuf.Struct"
            | "google.protobuf.FloatValue"
            | "google.protobuf.DoubleValue"
            | "google.protobuf.Int32Value"
            | "google.protobuf.Int64Value"
            | "google.protobuf.UInt32Value"
            | "google.protobuf.UInt64Value"
            | "google.protobuf.BoolValue"
            | "google.protobuf.StringValue"
            | "google.protobuf.BytesValue"
            | "google.protobuf.FieldMask"
            | "google.protobuf.ListValue"
            | "google.protobuf.Value"
            | "google.protobuf.Empty"
    )
}

fn built_in_descriptor(full_name: &str) -> MessageDescriptor {
    well_known_types_pool()
        .get_message_by_name(full_name)
        .expect("well-known type should be in the built-in pool")
}

/// Converts a [`Timestamp`] into a `google.protobuf.Timestamp` dynamic
/// message using the built-in descriptor pool.
pub fn timestamp_to_message(value: &Timestamp) -> Result<DynamicMessage, TranscodeError> {
    to_dynamic(value, &built_in_descriptor("google.protobuf.Timestamp"))
}

/// Converts a `google.protobuf.Timestamp` dynamic message into a
/// [`Timestamp`].
pub fn timestamp_from_message(message: &DynamicMessage) -> Result<Timestamp, TranscodeError> {
    from_dynamic(message)
}

/// Converts a [`Duration`] into a `google.protobuf.Duration` dynamic message
/// using the built-in descriptor pool.
pub fn duration_to_message(value: &Duration) -> Result<DynamicMessage, TranscodeError> {
    to_dynamic(value, &built_in_descriptor("google.protobuf.Duration"))
}

/// Converts a `google.protobuf.Duration` dynamic message into a [`Duration`].
pub fn duration_from_message(message: &DynamicMessage) -> Result<Duration, TranscodeError> {
    from_dynamic(message)
}

/// Creates an empty `google.protobuf.Empty` dynamic message.
pub fn empty_message() -> DynamicMessage {
    DynamicMessage::new(built_in_descriptor("google.protobuf.Empty"))
}

/// Converts a [`FieldMask`] into a `google.protobuf.FieldMask` dynamic
/// message using the built-in descriptor pool.
pub fn field_mask_to_message(value: &FieldMask) -> Result<DynamicMessage, TranscodeError> {
    to_dynamic(value, &built_in_descriptor("google.protobuf.FieldMask"))
}

/// Converts a `google.protobuf.FieldMask` dynamic message into a
/// [`FieldMask`].
pub fn field_mask_from_message(message: &DynamicMessage) -> Result<FieldMask, TranscodeError> {
    from_dynamic(message)
}

/// Converts a [`Struct`] into a `google.protobuf.Struct` dynamic message
/// using the built-in descriptor pool.
pub fn struct_to_message(value: &Struct) -> Result<DynamicMessage, TranscodeError> {
    to_dynamic(value, &built_in_descriptor("google.protobuf.Struct"))
}

/// Converts a `google.protobuf.Struct` dynamic message into a [`Struct`].
pub fn struct_from_message(message: &DynamicMessage) -> Result<Struct, TranscodeError> {
    from_dynamic(message)
}

/// Converts a [`prost_types::Value`] into a `google.protobuf.Value` dynamic
/// message using the built-in descriptor pool.
pub fn value_to_message(value: &prost_types::Value) -> Result<DynamicMessage, TranscodeError> {
    to_dynamic(value, &built_in_descriptor("google.protobuf.Value"))
}

/// Converts a `google.protobuf.Value` dynamic message into a
/// [`prost_types::Value`].
pub fn value_from_message(message: &DynamicMessage) -> Result<prost_types::Value, TranscodeError> {
    from_dynamic(message)
}

/// Converts a [`ListValue`] into a `google.protobuf.ListValue` dynamic
/// message using the built-in descriptor pool.
pub fn list_value_to_message(value: &ListValue) -> Result<DynamicMessage, TranscodeError> {
    to_dynamic(value, &built_in_descriptor("google.protobuf.ListValue"))
}

/// Converts a `google.protobuf.ListValue` dynamic message into a
/// [`ListValue`].
pub fn list_value_from_message(message: &DynamicMessage) -> Result<ListValue, TranscodeError> {
    from_dynamic(message)
}

/// Packs `message` into a `google.protobuf.Any`, with a
/// `type.googleapis.com/` type URL and the message's wire bytes as the
/// payload.
pub fn pack_any(message: &DynamicMessage) -> Result<prost_types::Any, EncodeError> {
    let value = BinaryCodec::new().marshal(message)?;
    Ok(prost_types::Any {
        type_url: format!("{}{}", ANY_TYPE_URL_PREFIX, message.descriptor().full_name()),
        value,
    })
}

/// Unpacks a `google.protobuf.Any` into a dynamic message of the packed
/// type.
///
/// The portion of the type URL after the final `/` is resolved against
/// `pool`; an unresolvable name fails with [`TranscodeError::UnknownType`].
pub fn unpack_any(
    any: &prost_types::Any,
    pool: &DescriptorPool,
) -> Result<DynamicMessage, TranscodeError> {
    let desc = resolve_type_url(&any.type_url, pool)?;
    BinaryCodec::new()
        .unmarshal(&desc, any.value.as_slice())
        .map_err(TranscodeError::Decode)
}

fn resolve_type_url(
    type_url: &str,
    pool: &DescriptorPool,
) -> Result<MessageDescriptor, TranscodeError> {
    let name = type_url.rsplit('/').next().unwrap_or_default();
    if name.is_empty() {
        return Err(TranscodeError::UnknownType {
            name: type_url.to_owned(),
        });
    }
    pool.get_message_by_name(name)
        .ok_or_else(|| TranscodeError::UnknownType {
            name: name.to_owned(),
        })
}

/// Fails unless the timestamp lies in the canonical range with non-negative
/// nanos.
pub(crate) fn check_timestamp(value: &Timestamp) -> Result<(), JsonError> {
    if !(TIMESTAMP_SECONDS_MIN..=TIMESTAMP_SECONDS_MAX).contains(&value.seconds)
        || !(0..1_000_000_000).contains(&value.nanos)
    {
        Err(JsonError::mapping("timestamp is out of range"))
    } else {
        Ok(())
    }
}

/// Fails unless seconds and nanos lie in the canonical range and carry the
/// same sign (or one is zero).
pub(crate) fn check_duration(value: &Duration) -> Result<(), JsonError> {
    if value.seconds.unsigned_abs() > DURATION_SECONDS_MAX as u64
        || value.nanos.unsigned_abs() >= 1_000_000_000
    {
        Err(JsonError::mapping("duration is out of range"))
    } else if (value.seconds < 0 && value.nanos > 0) || (value.seconds > 0 && value.nanos < 0) {
        Err(JsonError::mapping(
            "duration seconds and nanos have different signs",
        ))
    } else {
        Ok(())
    }
}

/// Parses the canonical decimal-seconds form, e.g. `"1.000340012s"`.
pub(crate) fn parse_duration(value: &str) -> Result<Duration, JsonError> {
    let invalid = || JsonError::mapping("invalid duration string");

    let value = value.strip_suffix('s').ok_or_else(invalid)?;
    let (negative, value) = match value.strip_prefix('-') {
        Some(value) => (true, value),
        None => (false, value),
    };

    let (seconds, nanos) = if let Some((seconds_str, nanos_str)) = value.split_once('.') {
        let seconds = u64::from_str(seconds_str).map_err(|_| invalid())?;
        let nanos = match nanos_str.len() {
            0 => 0,
            len @ 1..=9 => {
                let mut nanos = u32::from_str(nanos_str).map_err(|_| invalid())?;
                for _ in 0..9 - len {
                    nanos *= 10;
                }
                nanos
            }
            _ => return Err(JsonError::mapping("too many fractional digits for duration")),
        };
        (seconds, nanos)
    } else {
        (u64::from_str(value).map_err(|_| invalid())?, 0)
    };

    if seconds > DURATION_SECONDS_MAX as u64 {
        return Err(JsonError::mapping("duration is out of range"));
    }

    if negative {
        Ok(Duration {
            seconds: -(seconds as i64),
            nanos: -(nanos as i32),
        })
    } else {
        Ok(Duration {
            seconds: seconds as i64,
            nanos: nanos as i32,
        })
    }
}

fn transcode_err(err: TranscodeError) -> JsonError {
    JsonError::mapping(err)
}

/// JSON serialization hook: returns `Some` when `message` is a well-known
/// type with a canonical textual form.
pub(crate) fn serialize_well_known(
    message: &DynamicMessage,
    options: &SerializeOptions,
) -> Result<Option<JsonValue>, JsonError> {
    let desc = message.descriptor();
    let value = match desc.full_name() {
        "google.protobuf.Timestamp" => {
            let timestamp: Timestamp = from_dynamic(message).map_err(transcode_err)?;
            check_timestamp(&timestamp)?;
            JsonValue::String(timestamp.to_string())
        }
        "google.protobuf.Duration" => {
            let duration: Duration = from_dynamic(message).map_err(transcode_err)?;
            check_duration(&duration)?;
            JsonValue::String(duration.to_string())
        }
        "google.protobuf.Empty" => JsonValue::Object(Map::new()),
        "google.protobuf.FieldMask" => {
            let mask: FieldMask = from_dynamic(message).map_err(transcode_err)?;
            JsonValue::String(format_field_mask(&mask)?)
        }
        "google.protobuf.Struct" => {
            let value: Struct = from_dynamic(message).map_err(transcode_err)?;
            prost_struct_to_json(&value)?
        }
        "google.protobuf.Value" => {
            let value: prost_types::Value = from_dynamic(message).map_err(transcode_err)?;
            prost_value_to_json(&value)?
        }
        "google.protobuf.ListValue" => {
            let value: ListValue = from_dynamic(message).map_err(transcode_err)?;
            prost_list_to_json(&value)?
        }
        "google.protobuf.Any" => serialize_any(message, options)?,
        "google.protobuf.DoubleValue"
        | "google.protobuf.FloatValue"
        | "google.protobuf.Int64Value"
        | "google.protobuf.UInt64Value"
        | "google.protobuf.Int32Value"
        | "google.protobuf.UInt32Value"
        | "google.protobuf.BoolValue"
        | "google.protobuf.StringValue"
        | "google.protobuf.BytesValue" => {
            let field = desc
                .get_field_by_name("value")
                .expect("wrapper type should have a value field");
            let value = message.get_field_or_default(&field);
            serialize_kind_value(&value, &field.kind(), options)?
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn serialize_any(
    message: &DynamicMessage,
    options: &SerializeOptions,
) -> Result<JsonValue, JsonError> {
    let any: prost_types::Any = from_dynamic(message).map_err(transcode_err)?;
    let payload_desc = resolve_type_url(&any.type_url, message.descriptor().parent_pool())
        .map_err(transcode_err)?;
    let payload = BinaryCodec::new()
        .unmarshal(&payload_desc, any.value.as_slice())
        .map_err(|err| JsonError::mapping(format!("error decoding '{}': {}", any.type_url, err)))?;

    let mut object = Map::new();
    object.insert("@type".to_owned(), JsonValue::String(any.type_url.clone()));
    if is_well_known_type(payload_desc.full_name()) {
        // Well-known payloads do not flatten: their textual form goes under
        // a "value" key.
        let value = serialize_well_known(&payload, options)?
            .expect("well-known type should have a serializer");
        object.insert("value".to_owned(), value);
    } else {
        object.extend(serialize_message_fields(&payload, options)?);
    }
    Ok(JsonValue::Object(object))
}

fn format_field_mask(mask: &FieldMask) -> Result<String, JsonError> {
    let paths = mask
        .paths
        .iter()
        .map(|path| convert_field_mask_path(path, camel_case_segment))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|()| JsonError::mapping("field mask path cannot roundtrip through camelCase"))?;
    Ok(paths.join(","))
}

fn parse_field_mask(value: &str) -> Result<FieldMask, JsonError> {
    let paths = value
        .split(',')
        .filter(|path| !path.is_empty())
        .map(|path| convert_field_mask_path(path, snake_case_segment))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|()| JsonError::mapping("invalid field mask path"))?;
    Ok(FieldMask { paths })
}

/// Applies a per-segment case conversion to a dotted field mask path.
fn convert_field_mask_path(
    path: &str,
    convert: impl Fn(&str) -> Option<String>,
) -> Result<String, ()> {
    let segments = path
        .split('.')
        .map(|segment| convert(segment).ok_or(()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(segments.join("."))
}

fn prost_value_to_json(value: &prost_types::Value) -> Result<JsonValue, JsonError> {
    use prost_types::value::Kind;
    match &value.kind {
        None | Some(Kind::NullValue(_)) => Ok(JsonValue::Null),
        Some(Kind::BoolValue(value)) => Ok(JsonValue::Bool(*value)),
        Some(Kind::NumberValue(number)) => serde_json::Number::from_f64(*number)
            .map(JsonValue::Number)
            .ok_or_else(|| {
                JsonError::mapping("cannot serialize non-finite double in google.protobuf.Value")
            }),
        Some(Kind::StringValue(value)) => Ok(JsonValue::String(value.clone())),
        Some(Kind::ListValue(value)) => prost_list_to_json(value),
        Some(Kind::StructValue(value)) => prost_struct_to_json(value),
    }
}

fn prost_struct_to_json(value: &Struct) -> Result<JsonValue, JsonError> {
    let mut object = Map::with_capacity(value.fields.len());
    for (key, value) in &value.fields {
        object.insert(key.clone(), prost_value_to_json(value)?);
    }
    Ok(JsonValue::Object(object))
}

fn prost_list_to_json(value: &ListValue) -> Result<JsonValue, JsonError> {
    value
        .values
        .iter()
        .map(prost_value_to_json)
        .collect::<Result<Vec<_>, _>>()
        .map(JsonValue::Array)
}

fn json_to_prost_value(json: &JsonValue) -> prost_types::Value {
    use prost_types::value::Kind;
    let kind = match json {
        JsonValue::Null => Kind::NullValue(0),
        JsonValue::Bool(value) => Kind::BoolValue(*value),
        JsonValue::Number(number) => Kind::NumberValue(number.as_f64().unwrap_or(f64::MAX)),
        JsonValue::String(value) => Kind::StringValue(value.clone()),
        JsonValue::Array(values) => Kind::ListValue(json_to_prost_list(values)),
        JsonValue::Object(object) => Kind::StructValue(json_to_prost_struct(object)),
    };
    prost_types::Value { kind: Some(kind) }
}

fn json_to_prost_struct(object: &Map<String, JsonValue>) -> Struct {
    Struct {
        fields: object
            .iter()
            .map(|(key, value)| (key.clone(), json_to_prost_value(value)))
            .collect(),
    }
}

fn json_to_prost_list(values: &[JsonValue]) -> ListValue {
    ListValue {
        values: values.iter().map(json_to_prost_value).collect(),
    }
}

/// JSON deserialization hook: returns `Some` when `desc` names a well-known
/// type with a canonical textual form.
pub(crate) fn deserialize_well_known(
    desc: &MessageDescriptor,
    json: &JsonValue,
    options: &DeserializeOptions,
) -> Result<Option<DynamicMessage>, JsonError> {
    let message = match desc.full_name() {
        "google.protobuf.Timestamp" => {
            let value = json
                .as_str()
                .ok_or_else(|| JsonError::mapping("expected an RFC 3339 timestamp string"))?;
            let timestamp = Timestamp::from_str(value)
                .map_err(|_| JsonError::mapping("invalid RFC 3339 timestamp string"))?;
            check_timestamp(&timestamp)?;
            to_dynamic(&timestamp, desc).map_err(transcode_err)?
        }
        "google.protobuf.Duration" => {
            let value = json
                .as_str()
                .ok_or_else(|| JsonError::mapping("expected a duration string"))?;
            let duration = parse_duration(value)?;
            to_dynamic(&duration, desc).map_err(transcode_err)?
        }
        "google.protobuf.Empty" => {
            let object = json
                .as_object()
                .ok_or_else(|| JsonError::mapping("expected an empty JSON object"))?;
            if options.deny_unknown_fields_enabled() {
                if let Some(key) = object.keys().next() {
                    return Err(JsonError::mapping(format!(
                        "unrecognized field name '{}'",
                        key
                    )));
                }
            }
            DynamicMessage::new(desc.clone())
        }
        "google.protobuf.FieldMask" => {
            let value = json
                .as_str()
                .ok_or_else(|| JsonError::mapping("expected a field mask string"))?;
            to_dynamic(&parse_field_mask(value)?, desc).map_err(transcode_err)?
        }
        "google.protobuf.Struct" => {
            let object = json
                .as_object()
                .ok_or_else(|| JsonError::mapping("expected a JSON object"))?;
            to_dynamic(&json_to_prost_struct(object), desc).map_err(transcode_err)?
        }
        "google.protobuf.Value" => {
            to_dynamic(&json_to_prost_value(json), desc).map_err(transcode_err)?
        }
        "google.protobuf.ListValue" => {
            let values = json
                .as_array()
                .ok_or_else(|| JsonError::mapping("expected a JSON array"))?;
            to_dynamic(&json_to_prost_list(values), desc).map_err(transcode_err)?
        }
        "google.protobuf.Any" => deserialize_any(desc, json, options)?,
        "google.protobuf.DoubleValue"
        | "google.protobuf.FloatValue"
        | "google.protobuf.Int64Value"
        | "google.protobuf.UInt64Value"
        | "google.protobuf.Int32Value"
        | "google.protobuf.UInt32Value"
        | "google.protobuf.BoolValue"
        | "google.protobuf.StringValue"
        | "google.protobuf.BytesValue" => {
            let field = desc
                .get_field_by_name("value")
                .expect("wrapper type should have a value field");
            let mut message = DynamicMessage::new(desc.clone());
            let value = deserialize_kind_value(&field.kind(), json, options)?;
            message.set_field(&field, value).map_err(JsonError::mapping)?;
            message
        }
        _ => return Ok(None),
    };
    Ok(Some(message))
}

fn deserialize_any(
    desc: &MessageDescriptor,
    json: &JsonValue,
    options: &DeserializeOptions,
) -> Result<DynamicMessage, JsonError> {
    let object = json
        .as_object()
        .ok_or_else(|| JsonError::mapping("expected a JSON object"))?;
    let type_url = object
        .get("@type")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| JsonError::mapping("expected '@type' field"))?;

    let payload_desc =
        resolve_type_url(type_url, desc.parent_pool()).map_err(transcode_err)?;

    let payload = if is_well_known_type(payload_desc.full_name()) {
        let value = object
            .get("value")
            .ok_or_else(|| JsonError::mapping("expected 'value' field"))?;
        if options.deny_unknown_fields_enabled() {
            if let Some(key) = object
                .keys()
                .find(|key| key.as_str() != "@type" && key.as_str() != "value")
            {
                return Err(JsonError::mapping(format!(
                    "unrecognized field name '{}'",
                    key
                )));
            }
        }
        deserialize_well_known(&payload_desc, value, options)?
            .expect("well-known type should have a deserializer")
    } else {
        let mut payload = DynamicMessage::new(payload_desc.clone());
        let entries = object.iter().filter(|(key, _)| key.as_str() != "@type");
        deserialize_message_fields(&mut payload, entries, options)?;
        payload
    };

    let any = prost_types::Any {
        type_url: type_url.to_owned(),
        value: BinaryCodec::new()
            .marshal(&payload)
            .map_err(|err| JsonError::mapping(err))?,
    };
    to_dynamic(&any, desc).map_err(transcode_err)
}
