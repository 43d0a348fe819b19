mod case;
mod de;
mod ser;

pub(crate) use self::case::{camel_case_segment, snake_case_segment, to_json_name};
pub(crate) use self::de::{deserialize_kind_value, deserialize_message_fields};
pub(crate) use self::ser::{serialize_kind_value, serialize_message_fields};

use std::fmt;

use crate::{DynamicMessage, MessageDescriptor};

/// The canonical proto3 JSON codec.
///
/// Implements the [standard JSON mapping](https://protobuf.dev/programming-guides/json/):
/// lowerCamelCase field names, 64-bit integers as strings, base64 bytes,
/// symbolic enum names, and the special textual forms of the well-known
/// `google.protobuf` types. Output field order follows the descriptor.
#[derive(Debug, Clone, Default)]
pub struct JsonCodec {
    serialize: SerializeOptions,
    deserialize: DeserializeOptions,
}

/// Options to control serialization of messages to JSON.
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    stringify_64_bit_integers: bool,
    use_enum_numbers: bool,
    use_proto_field_name: bool,
    emit_unpopulated_fields: bool,
}

/// Options to control deserialization of messages from JSON.
#[derive(Debug, Clone)]
pub struct DeserializeOptions {
    deny_unknown_fields: bool,
}

/// An error raised while mapping between JSON and a [`DynamicMessage`].
#[derive(Debug)]
pub struct JsonError {
    kind: JsonErrorKind,
}

#[derive(Debug)]
enum JsonErrorKind {
    Syntax(serde_json::Error),
    Mapping(String),
}

impl JsonCodec {
    /// Creates a codec with options conforming to the standard JSON mapping.
    pub fn new() -> Self {
        JsonCodec::default()
    }

    /// Replaces the serialization options.
    pub fn serialize_options(mut self, options: SerializeOptions) -> Self {
        self.serialize = options;
        self
    }

    /// Replaces the deserialization options.
    pub fn deserialize_options(mut self, options: DeserializeOptions) -> Self {
        self.deserialize = options;
        self
    }

    /// Serializes `message` to a JSON string.
    pub fn marshal(&self, message: &DynamicMessage) -> Result<String, JsonError> {
        let value = self.to_json_value(message)?;
        serde_json::to_string(&value).map_err(JsonError::syntax)
    }

    /// Serializes `message` to a [`serde_json::Value`] tree.
    pub fn to_json_value(&self, message: &DynamicMessage) -> Result<serde_json::Value, JsonError> {
        ser::serialize_message(message, &self.serialize)
    }

    /// Deserializes a message of the type described by `desc` from a JSON
    /// string.
    pub fn unmarshal(
        &self,
        desc: &MessageDescriptor,
        json: &str,
    ) -> Result<DynamicMessage, JsonError> {
        let value: serde_json::Value = serde_json::from_str(json).map_err(JsonError::syntax)?;
        self.from_json_value(desc, &value)
    }

    /// Deserializes a message of the type described by `desc` from a
    /// [`serde_json::Value`] tree.
    pub fn from_json_value(
        &self,
        desc: &MessageDescriptor,
        value: &serde_json::Value,
    ) -> Result<DynamicMessage, JsonError> {
        de::deserialize_message(desc, value, &self.deserialize)
    }
}

impl SerializeOptions {
    /// Creates a new instance of [`SerializeOptions`], with the default
    /// options chosen to conform to the standard JSON mapping.
    pub const fn new() -> Self {
        SerializeOptions {
            stringify_64_bit_integers: true,
            use_enum_numbers: false,
            use_proto_field_name: false,
            emit_unpopulated_fields: false,
        }
    }

    /// Whether to encode 64-bit integral types as strings.
    ///
    /// The mapping requires this to prevent loss of precision in consumers
    /// that read all numbers as doubles. Parsers accept both forms either
    /// way.
    ///
    /// The default value is `true`.
    pub const fn stringify_64_bit_integers(mut self, yes: bool) -> Self {
        self.stringify_64_bit_integers = yes;
        self
    }

    /// Whether to encode enum values by number instead of by name. Values
    /// with no matching name are always encoded by number.
    ///
    /// The default value is `false`.
    pub const fn use_enum_numbers(mut self, yes: bool) -> Self {
        self.use_enum_numbers = yes;
        self
    }

    /// Whether to use the proto field name instead of the lowerCamelCase
    /// JSON name.
    ///
    /// The default value is `false`.
    pub const fn use_proto_field_name(mut self, yes: bool) -> Self {
        self.use_proto_field_name = yes;
        self
    }

    /// Whether to emit unset fields with their default values. Without this,
    /// fields at their default are omitted unless they track explicit
    /// presence.
    ///
    /// The default value is `false`.
    pub const fn emit_unpopulated_fields(mut self, yes: bool) -> Self {
        self.emit_unpopulated_fields = yes;
        self
    }

    pub(crate) fn stringify_64_bit_integers_enabled(&self) -> bool {
        self.stringify_64_bit_integers
    }

    pub(crate) fn use_enum_numbers_enabled(&self) -> bool {
        self.use_enum_numbers
    }

    pub(crate) fn use_proto_field_name_enabled(&self) -> bool {
        self.use_proto_field_name
    }

    pub(crate) fn emit_unpopulated_fields_enabled(&self) -> bool {
        self.emit_unpopulated_fields
    }
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DeserializeOptions {
    /// Creates a new instance of [`DeserializeOptions`], with the default
    /// options chosen to conform to the standard JSON mapping.
    pub const fn new() -> Self {
        DeserializeOptions {
            deny_unknown_fields: true,
        }
    }

    /// Whether to error when encountering unknown message field names.
    ///
    /// The default value is `true`.
    pub const fn deny_unknown_fields(mut self, yes: bool) -> Self {
        self.deny_unknown_fields = yes;
        self
    }

    pub(crate) fn deny_unknown_fields_enabled(&self) -> bool {
        self.deny_unknown_fields
    }
}

impl Default for DeserializeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonError {
    pub(crate) fn syntax(err: serde_json::Error) -> Self {
        JsonError {
            kind: JsonErrorKind::Syntax(err),
        }
    }

    pub(crate) fn mapping(message: impl fmt::Display) -> Self {
        JsonError {
            kind: JsonErrorKind::Mapping(message.to_string()),
        }
    }
}

impl fmt::Display for JsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            JsonErrorKind::Syntax(err) => err.fmt(f),
            JsonErrorKind::Mapping(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for JsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            JsonErrorKind::Syntax(err) => Some(err),
            JsonErrorKind::Mapping(_) => None,
        }
    }
}
