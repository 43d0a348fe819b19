//! Conversion between statically generated prost messages and dynamic
//! messages.
//!
//! Runtime synthesis of a generated type from a descriptor is impossible
//! without code generation, so the bridge works purely over wire bytes: the
//! caller supplies both the statically-typed message and a compatible dynamic
//! descriptor, and each side's codec parses the other's output. Unknown
//! fields survive the trip because both codecs preserve them.

use std::fmt;

use prost::Message;

use crate::{BinaryCodec, DecodeError, DynamicMessage, EncodeError, MessageDescriptor};

/// A statically generated message with a known protobuf full name.
///
/// The bridge uses the name to verify the two sides of a conversion agree on
/// the message type before any bytes move. Implementations are provided for
/// the `prost-types` well-known types and the primitive wrapper types.
pub trait NamedMessage: Message {
    /// The fully qualified protobuf name of this message type.
    fn full_name() -> &'static str;
}

/// An error raised while converting between static and dynamic messages.
#[derive(Debug)]
pub enum TranscodeError {
    /// The static type and the dynamic descriptor name different message
    /// types.
    TypeMismatch {
        /// Full name of the statically generated type.
        expected: String,
        /// Full name from the dynamic descriptor.
        actual: String,
    },
    /// A type name could not be resolved against the registry.
    UnknownType {
        /// The unresolved full name or type URL.
        name: String,
    },
    /// Re-parsing the static side's bytes as a dynamic message failed.
    Decode(DecodeError),
    /// Serializing the dynamic message failed.
    Encode(EncodeError),
    /// Decoding into the static type failed.
    Static(prost::DecodeError),
}

/// Converts a statically-typed message into a dynamic message described by
/// `desc`, by round-tripping its wire bytes.
///
/// Fails with [`TranscodeError::TypeMismatch`] if `desc` names a different
/// message type than `T`.
pub fn to_dynamic<T>(value: &T, desc: &MessageDescriptor) -> Result<DynamicMessage, TranscodeError>
where
    T: NamedMessage,
{
    check_names(T::full_name(), desc)?;
    let bytes = value.encode_to_vec();
    BinaryCodec::new()
        .unmarshal(desc, bytes.as_slice())
        .map_err(TranscodeError::Decode)
}

/// Converts a dynamic message into the statically-typed message `T`, by
/// round-tripping its wire bytes.
///
/// Fails with [`TranscodeError::TypeMismatch`] if the message's descriptor
/// names a different message type than `T`.
pub fn from_dynamic<T>(message: &DynamicMessage) -> Result<T, TranscodeError>
where
    T: NamedMessage + Default,
{
    check_names(T::full_name(), &message.descriptor())?;
    let bytes = BinaryCodec::new()
        .marshal(message)
        .map_err(TranscodeError::Encode)?;
    T::decode(bytes.as_slice()).map_err(TranscodeError::Static)
}

fn check_names(expected: &str, desc: &MessageDescriptor) -> Result<(), TranscodeError> {
    if expected == desc.full_name() {
        Ok(())
    } else {
        Err(TranscodeError::TypeMismatch {
            expected: expected.to_owned(),
            actual: desc.full_name().to_owned(),
        })
    }
}

macro_rules! named_message {
    ($($ty:ty => $name:literal,)*) => {
        $(
            impl NamedMessage for $ty {
                fn full_name() -> &'static str {
                    $name
                }
            }
        )*
    };
}

named_message! {
    prost_types::Any => "google.protobuf.Any",
    prost_types::Timestamp => "google.protobuf.Timestamp",
    prost_types::Duration => "google.protobuf.Duration",
    prost_types::FieldMask => "google.protobuf.FieldMask",
    prost_types::Struct => "google.protobuf.Struct",
    prost_types::Value => "google.protobuf.Value",
    prost_types::ListValue => "google.protobuf.ListValue",
    prost_types::FileDescriptorSet => "google.protobuf.FileDescriptorSet",
    prost_types::FileDescriptorProto => "google.protobuf.FileDescriptorProto",
    () => "google.protobuf.Empty",
    f64 => "google.protobuf.DoubleValue",
    f32 => "google.protobuf.FloatValue",
    i64 => "google.protobuf.Int64Value",
    u64 => "google.protobuf.UInt64Value",
    i32 => "google.protobuf.Int32Value",
    u32 => "google.protobuf.UInt32Value",
    bool => "google.protobuf.BoolValue",
    String => "google.protobuf.StringValue",
    Vec<u8> => "google.protobuf.BytesValue",
}

impl fmt::Display for TranscodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscodeError::TypeMismatch { expected, actual } => {
                write!(
                    f,
                    "type mismatch: expected '{}', found '{}'",
                    expected, actual
                )
            }
            TranscodeError::UnknownType { name } => {
                write!(f, "the type '{}' was not found in the registry", name)
            }
            TranscodeError::Decode(err) => err.fmt(f),
            TranscodeError::Encode(err) => err.fmt(f),
            TranscodeError::Static(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for TranscodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TranscodeError::Decode(err) => Some(err),
            TranscodeError::Encode(err) => Some(err),
            TranscodeError::Static(err) => Some(err),
            _ => None,
        }
    }
}
