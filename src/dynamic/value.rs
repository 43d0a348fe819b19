use std::collections::BTreeMap;

use prost::bytes::Bytes;

use crate::{
    descriptor::{Kind, MAP_ENTRY_KEY_NUMBER, MAP_ENTRY_VALUE_NUMBER},
    DynamicMessage, FieldDescriptor,
};

/// A dynamically-typed protobuf value.
///
/// A value does not carry its own wire flavor: `Value::I32` may encode as
/// `int32`, `sint32` or `sfixed32` depending on the [`Kind`] of the field it
/// is stored under. Lists and maps hold their elements directly; map entries
/// are kept in key order so that serialized output is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A boolean value, for the `bool` protobuf type.
    Bool(bool),
    /// A 32-bit signed integer, for the `int32`, `sint32` and `sfixed32` protobuf types.
    I32(i32),
    /// A 64-bit signed integer, for the `int64`, `sint64` and `sfixed64` protobuf types.
    I64(i64),
    /// A 32-bit unsigned integer, for the `uint32` and `fixed32` protobuf types.
    U32(u32),
    /// A 64-bit unsigned integer, for the `uint64` and `fixed64` protobuf types.
    U64(u64),
    /// A 32-bit floating point number, for the `float` protobuf type.
    F32(f32),
    /// A 64-bit floating point number, for the `double` protobuf type.
    F64(f64),
    /// A string, for the `string` protobuf type.
    String(String),
    /// A byte string, for the `bytes` protobuf type.
    Bytes(Bytes),
    /// An enumeration value. Numbers without a matching enum value are
    /// preserved as-is for forward compatibility.
    EnumNumber(i32),
    /// A nested message.
    Message(DynamicMessage),
    /// A list of values, for repeated fields.
    List(Vec<Value>),
    /// A map of values, for map fields. Kept sorted by key.
    Map(BTreeMap<MapKey, Value>),
}

/// A dynamically-typed key for a protobuf map.
///
/// Only the integer, bool and string kinds may be used as map keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    /// A boolean key.
    Bool(bool),
    /// A 32-bit signed integer key.
    I32(i32),
    /// A 64-bit signed integer key.
    I64(i64),
    /// A 32-bit unsigned integer key.
    U32(u32),
    /// A 64-bit unsigned integer key.
    U64(u64),
    /// A string key.
    String(String),
}

impl Value {
    /// Returns the default value for the given protobuf field.
    ///
    /// Lists and maps default to empty containers; fields with an explicit
    /// default (proto2) use it; everything else falls back to
    /// [`default_value`][Value::default_value] for the field's kind.
    pub fn default_value_for_field(field: &FieldDescriptor) -> Self {
        if field.is_list() {
            Value::List(Vec::new())
        } else if field.is_map() {
            Value::Map(BTreeMap::new())
        } else if let Some(default) = field.default_value() {
            default.clone()
        } else {
            Value::default_value(&field.kind())
        }
    }

    /// Returns the default value for the given protobuf type `kind`.
    pub fn default_value(kind: &Kind) -> Self {
        match kind {
            Kind::Message(desc) => Value::Message(DynamicMessage::new(desc.clone())),
            Kind::Enum(desc) => Value::EnumNumber(desc.default_value().number()),
            Kind::Double => Value::F64(0.0),
            Kind::Float => Value::F32(0.0),
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => Value::I32(0),
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Value::I64(0),
            Kind::Uint32 | Kind::Fixed32 => Value::U32(0),
            Kind::Uint64 | Kind::Fixed64 => Value::U64(0),
            Kind::Bool => Value::Bool(false),
            Kind::String => Value::String(String::new()),
            Kind::Bytes => Value::Bytes(Bytes::new()),
        }
    }

    /// Returns `true` if this is the default value for the given field.
    pub fn is_default_for_field(&self, field: &FieldDescriptor) -> bool {
        *self == Value::default_value_for_field(field)
    }

    /// Returns `true` if this value may be stored in the given field.
    ///
    /// Lists must match element-wise against the field's kind; maps must
    /// match the entry's key and value kinds; nested messages must have the
    /// descriptor named by the field. Enum numbers outside the defined range
    /// are valid (they are preserved, not rejected), but can be detected with
    /// [`is_unknown_enum_number`][Value::is_unknown_enum_number].
    pub fn is_valid_for_field(&self, field: &FieldDescriptor) -> bool {
        if field.is_group() {
            // Group payloads are skip-only; no value may be stored.
            return false;
        }
        if field.is_list() {
            return match self {
                Value::List(values) => {
                    let kind = field.kind();
                    values.iter().all(|value| value.is_valid(&kind))
                }
                _ => false,
            };
        }
        if field.is_map() {
            return match (self, field.kind()) {
                (Value::Map(values), Kind::Message(entry)) => {
                    let key_kind = entry.map_entry_key_field().kind();
                    let value_field = entry.map_entry_value_field();
                    values.iter().all(|(key, value)| {
                        key.is_valid(&key_kind) && value.is_valid_for_field(&value_field)
                    })
                }
                _ => false,
            };
        }
        self.is_valid(&field.kind())
    }

    /// Returns `true` if this value can be encoded as the given [`Kind`].
    ///
    /// Unlike [`is_valid_for_field`][Value::is_valid_for_field] this ignores
    /// cardinality, so it never returns `true` for lists or maps.
    pub fn is_valid(&self, kind: &Kind) -> bool {
        match (self, kind) {
            (Value::Bool(_), Kind::Bool)
            | (Value::I32(_), Kind::Int32 | Kind::Sint32 | Kind::Sfixed32)
            | (Value::I64(_), Kind::Int64 | Kind::Sint64 | Kind::Sfixed64)
            | (Value::U32(_), Kind::Uint32 | Kind::Fixed32)
            | (Value::U64(_), Kind::Uint64 | Kind::Fixed64)
            | (Value::F32(_), Kind::Float)
            | (Value::F64(_), Kind::Double)
            | (Value::String(_), Kind::String)
            | (Value::Bytes(_), Kind::Bytes)
            | (Value::EnumNumber(_), Kind::Enum(_)) => true,
            (Value::Message(message), Kind::Message(desc)) => {
                message.descriptor().full_name() == desc.full_name()
            }
            _ => false,
        }
    }

    /// Returns `true` if this is an enum number with no matching value in the
    /// given kind's enum descriptor.
    pub fn is_unknown_enum_number(&self, kind: &Kind) -> bool {
        match (self, kind) {
            (Value::EnumNumber(number), Kind::Enum(desc)) => desc.get_value(*number).is_none(),
            _ => false,
        }
    }

    /// Converts this value to one storable under the given target kind.
    ///
    /// Conversions are explicit and total in their result type:
    /// integer-to-integer conversions truncate in two's complement,
    /// string-to-number and number-to-string use decimal forms, and
    /// bytes-to-string requires valid UTF-8. Returns `None` when no
    /// conversion exists.
    pub fn convert_to(&self, kind: &Kind) -> Option<Value> {
        match kind {
            Kind::Bool => match self {
                Value::Bool(value) => Some(Value::Bool(*value)),
                Value::String(value) => match value.as_str() {
                    "true" => Some(Value::Bool(true)),
                    "false" => Some(Value::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => {
                self.to_i64().map(|value| Value::I32(value as i32))
            }
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => self.to_i64().map(Value::I64),
            Kind::Uint32 | Kind::Fixed32 => self.to_u64().map(|value| Value::U32(value as u32)),
            Kind::Uint64 | Kind::Fixed64 => self.to_u64().map(Value::U64),
            Kind::Float => self.to_f64().map(|value| Value::F32(value as f32)),
            Kind::Double => self.to_f64().map(Value::F64),
            Kind::String => self.to_text().map(Value::String),
            Kind::Bytes => match self {
                Value::Bytes(value) => Some(Value::Bytes(value.clone())),
                Value::String(value) => Some(Value::Bytes(value.clone().into_bytes().into())),
                _ => None,
            },
            Kind::Enum(desc) => match self {
                Value::EnumNumber(number) => Some(Value::EnumNumber(*number)),
                Value::I32(number) => Some(Value::EnumNumber(*number)),
                Value::String(name) => desc
                    .get_value_by_name(name)
                    .map(|value| Value::EnumNumber(value.number())),
                _ => None,
            },
            Kind::Message(desc) => match self {
                Value::Message(message)
                    if message.descriptor().full_name() == desc.full_name() =>
                {
                    Some(Value::Message(message.clone()))
                }
                _ => None,
            },
        }
    }

    fn to_i64(&self) -> Option<i64> {
        match self {
            Value::I32(value) => Some(i64::from(*value)),
            Value::I64(value) => Some(*value),
            Value::U32(value) => Some(i64::from(*value)),
            Value::U64(value) => Some(*value as i64),
            Value::F32(value) => Some(*value as i64),
            Value::F64(value) => Some(*value as i64),
            Value::EnumNumber(value) => Some(i64::from(*value)),
            Value::String(value) => value.parse().ok(),
            _ => None,
        }
    }

    fn to_u64(&self) -> Option<u64> {
        match self {
            Value::I32(value) => Some(*value as u64),
            Value::I64(value) => Some(*value as u64),
            Value::U32(value) => Some(u64::from(*value)),
            Value::U64(value) => Some(*value),
            Value::F32(value) => Some(*value as u64),
            Value::F64(value) => Some(*value as u64),
            Value::EnumNumber(value) => Some(*value as u64),
            Value::String(value) => value.parse().ok(),
            _ => None,
        }
    }

    fn to_f64(&self) -> Option<f64> {
        match self {
            Value::I32(value) => Some(f64::from(*value)),
            Value::I64(value) => Some(*value as f64),
            Value::U32(value) => Some(f64::from(*value)),
            Value::U64(value) => Some(*value as f64),
            Value::F32(value) => Some(f64::from(*value)),
            Value::F64(value) => Some(*value),
            Value::EnumNumber(value) => Some(f64::from(*value)),
            Value::String(value) => value.parse().ok(),
            _ => None,
        }
    }

    fn to_text(&self) -> Option<String> {
        match self {
            Value::Bool(value) => Some(value.to_string()),
            Value::I32(value) => Some(value.to_string()),
            Value::I64(value) => Some(value.to_string()),
            Value::U32(value) => Some(value.to_string()),
            Value::U64(value) => Some(value.to_string()),
            Value::F32(value) => Some(value.to_string()),
            Value::F64(value) => Some(value.to_string()),
            Value::EnumNumber(value) => Some(value.to_string()),
            Value::String(value) => Some(value.clone()),
            Value::Bytes(value) => std::str::from_utf8(value).ok().map(str::to_owned),
            _ => None,
        }
    }

    /// Returns the value if it is a `Value::Bool`, or `None` otherwise.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value if it is a `Value::I32`, or `None` otherwise.
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::I32(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value if it is a `Value::I64`, or `None` otherwise.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I64(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value if it is a `Value::U32`, or `None` otherwise.
    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            Value::U32(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value if it is a `Value::U64`, or `None` otherwise.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::U64(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value if it is a `Value::F32`, or `None` otherwise.
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Value::F32(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value if it is a `Value::F64`, or `None` otherwise.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F64(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value if it is a `Value::EnumNumber`, or `None` otherwise.
    pub fn as_enum_number(&self) -> Option<i32> {
        match *self {
            Value::EnumNumber(value) => Some(value),
            _ => None,
        }
    }

    /// Returns a reference to the value if it is a `Value::String`, or `None` otherwise.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns a reference to the value if it is a `Value::Bytes`, or `None` otherwise.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(value) => Some(value),
            _ => None,
        }
    }

    /// Returns a reference to the value if it is a `Value::Message`, or `None` otherwise.
    pub fn as_message(&self) -> Option<&DynamicMessage> {
        match self {
            Value::Message(value) => Some(value),
            _ => None,
        }
    }

    /// Returns a mutable reference to the value if it is a `Value::Message`, or `None` otherwise.
    pub fn as_message_mut(&mut self) -> Option<&mut DynamicMessage> {
        match self {
            Value::Message(value) => Some(value),
            _ => None,
        }
    }

    /// Returns a reference to the value if it is a `Value::List`, or `None` otherwise.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(value) => Some(value),
            _ => None,
        }
    }

    /// Returns a mutable reference to the value if it is a `Value::List`, or `None` otherwise.
    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(value) => Some(value),
            _ => None,
        }
    }

    /// Returns a reference to the value if it is a `Value::Map`, or `None` otherwise.
    pub fn as_map(&self) -> Option<&BTreeMap<MapKey, Value>> {
        match self {
            Value::Map(value) => Some(value),
            _ => None,
        }
    }

    /// Returns a mutable reference to the value if it is a `Value::Map`, or `None` otherwise.
    pub fn as_map_mut(&mut self) -> Option<&mut BTreeMap<MapKey, Value>> {
        match self {
            Value::Map(value) => Some(value),
            _ => None,
        }
    }

    /// Converts this value into a [`MapKey`], or `None` if it is not a valid
    /// map key type.
    pub fn into_map_key(self) -> Option<MapKey> {
        match self {
            Value::Bool(value) => Some(MapKey::Bool(value)),
            Value::I32(value) => Some(MapKey::I32(value)),
            Value::I64(value) => Some(MapKey::I64(value)),
            Value::U32(value) => Some(MapKey::U32(value)),
            Value::U64(value) => Some(MapKey::U64(value)),
            Value::String(value) => Some(MapKey::String(value)),
            _ => None,
        }
    }
}

impl MapKey {
    /// Returns the default key for the given protobuf type `kind`.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is not a valid map key type.
    pub fn default_value(kind: &Kind) -> Self {
        match kind {
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => MapKey::I32(0),
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => MapKey::I64(0),
            Kind::Uint32 | Kind::Fixed32 => MapKey::U32(0),
            Kind::Uint64 | Kind::Fixed64 => MapKey::U64(0),
            Kind::Bool => MapKey::Bool(false),
            Kind::String => MapKey::String(String::new()),
            _ => panic!("invalid type for map key"),
        }
    }

    /// Returns `true` if this key can be encoded as the given [`Kind`].
    pub fn is_valid(&self, kind: &Kind) -> bool {
        matches!(
            (self, kind),
            (MapKey::Bool(_), Kind::Bool)
                | (MapKey::I32(_), Kind::Int32 | Kind::Sint32 | Kind::Sfixed32)
                | (MapKey::I64(_), Kind::Int64 | Kind::Sint64 | Kind::Sfixed64)
                | (MapKey::U32(_), Kind::Uint32 | Kind::Fixed32)
                | (MapKey::U64(_), Kind::Uint64 | Kind::Fixed64)
                | (MapKey::String(_), Kind::String)
        )
    }

    /// Returns `true` if this is the default key for the given kind.
    pub fn is_default(&self, kind: &Kind) -> bool {
        *self == MapKey::default_value(kind)
    }

    /// Returns the key if it is a `MapKey::Bool`, or `None` otherwise.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            MapKey::Bool(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the key if it is a `MapKey::I32`, or `None` otherwise.
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            MapKey::I32(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the key if it is a `MapKey::I64`, or `None` otherwise.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            MapKey::I64(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the key if it is a `MapKey::U32`, or `None` otherwise.
    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            MapKey::U32(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the key if it is a `MapKey::U64`, or `None` otherwise.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            MapKey::U64(value) => Some(value),
            _ => None,
        }
    }

    /// Returns a reference to the key if it is a `MapKey::String`, or `None` otherwise.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MapKey::String(value) => Some(value),
            _ => None,
        }
    }
}

impl From<MapKey> for Value {
    fn from(value: MapKey) -> Self {
        match value {
            MapKey::Bool(value) => Value::Bool(value),
            MapKey::I32(value) => Value::I32(value),
            MapKey::I64(value) => Value::I64(value),
            MapKey::U32(value) => Value::U32(value),
            MapKey::U64(value) => Value::U64(value),
            MapKey::String(value) => Value::String(value),
        }
    }
}

pub(crate) fn map_entry_kinds(entry: &crate::MessageDescriptor) -> (Kind, Kind) {
    debug_assert!(entry.is_map_entry());
    let key = entry
        .get_field(MAP_ENTRY_KEY_NUMBER)
        .expect("map entry should have key field")
        .kind();
    let value = entry
        .get_field(MAP_ENTRY_VALUE_NUMBER)
        .expect("map entry should have value field")
        .kind();
    (key, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Kind;

    #[test]
    fn integer_conversion_truncates() {
        assert_eq!(
            Value::I64(0x1_0000_0005).convert_to(&Kind::Int32),
            Some(Value::I32(5))
        );
        assert_eq!(
            Value::I32(-1).convert_to(&Kind::Uint64),
            Some(Value::U64(u64::MAX))
        );
        assert_eq!(
            Value::U64(u64::MAX).convert_to(&Kind::Int64),
            Some(Value::I64(-1))
        );
    }

    #[test]
    fn string_number_conversion() {
        assert_eq!(
            Value::String("42".to_owned()).convert_to(&Kind::Int32),
            Some(Value::I32(42))
        );
        assert_eq!(
            Value::I32(42).convert_to(&Kind::String),
            Some(Value::String("42".to_owned()))
        );
        assert_eq!(Value::String("forty-two".to_owned()).convert_to(&Kind::Int32), None);
    }

    #[test]
    fn bytes_string_conversion_requires_utf8() {
        assert_eq!(
            Value::Bytes(Bytes::from_static(b"ok")).convert_to(&Kind::String),
            Some(Value::String("ok".to_owned()))
        );
        assert_eq!(
            Value::Bytes(Bytes::from_static(&[0xff])).convert_to(&Kind::String),
            None
        );
    }
}
