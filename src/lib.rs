//! Runtime Protocol Buffers reflection and dynamic messages.
//!
//! `protodyn` is the runtime complement to a statically generated protobuf
//! library: given descriptors for schemas that are only discovered at
//! runtime (a `FileDescriptorSet` produced by `protoc --descriptor_set_out`,
//! remote reflection metadata, or descriptor protos built in code), it can
//! construct, mutate, introspect, validate and (de)serialize messages of
//! those types.
//!
//! The main entry points are:
//!
//! - [`TypeRegistry`] / [`DescriptorPool`]: register descriptor files and
//!   look up types by fully qualified name. The registry is safe for
//!   concurrent use; the pool is an immutable snapshot.
//! - [`DynamicMessage`]: a message container shaped by a
//!   [`MessageDescriptor`], with typed accessors over [`Value`].
//! - [`BinaryCodec`]: the proto3 wire format, byte-compatible with the
//!   Protocol Buffers specification, with unknown-field preservation and
//!   configurable size and recursion limits.
//! - [`JsonCodec`]: the canonical proto3 JSON mapping.
//! - [`wkt`]: converters and canonical JSON forms for the
//!   `google.protobuf.*` well-known types, and `Any` pack/unpack against a
//!   registry.
//! - [`to_dynamic`] / [`from_dynamic`]: bridge between statically generated
//!   [`prost::Message`] values and dynamic messages via their wire bytes.
//!
//! # Example
//!
//! ```
//! use protodyn::{BinaryCodec, TypeRegistry, Value};
//! use prost_types::{
//!     field_descriptor_proto::{Label, Type},
//!     DescriptorProto, FieldDescriptorProto, FileDescriptorProto,
//! };
//!
//! let registry = TypeRegistry::new();
//! registry.register_file(FileDescriptorProto {
//!     name: Some("example/person.proto".to_owned()),
//!     package: Some("example".to_owned()),
//!     syntax: Some("proto3".to_owned()),
//!     message_type: vec![DescriptorProto {
//!         name: Some("Person".to_owned()),
//!         field: vec![FieldDescriptorProto {
//!             name: Some("id".to_owned()),
//!             number: Some(1),
//!             label: Some(Label::Optional as i32),
//!             r#type: Some(Type::Int32 as i32),
//!             ..Default::default()
//!         }],
//!         ..Default::default()
//!     }],
//!     ..Default::default()
//! })?;
//!
//! let mut person = registry.create_message("example.Person").unwrap();
//! person.set_field_by_name("id", Value::I32(123))?;
//!
//! let bytes = BinaryCodec::new().marshal(&person)?;
//! assert_eq!(bytes, [0x08, 0x7b]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
#![warn(missing_debug_implementations, missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod bridge;
mod codec;
mod descriptor;
mod dynamic;
mod json;
mod registry;
mod wire;
pub mod wkt;

pub use {prost, prost::bytes, prost_types};

pub use self::bridge::{from_dynamic, to_dynamic, NamedMessage, TranscodeError};
pub use self::codec::{BinaryCodec, DecodeError, EncodeError};
pub use self::descriptor::{
    Cardinality, DescriptorError, DescriptorPool, EnumDescriptor, EnumValueDescriptor,
    FieldDescriptor, FileDescriptor, Kind, MessageDescriptor, MethodDescriptor, OneofDescriptor,
    OptionMap, OptionValue, ServiceDescriptor, Syntax, TypeDescriptor,
};
pub use self::dynamic::{
    DynamicMessage, MapKey, SetFieldError, UnknownField, UnknownFieldSet, ValidationError, Value,
};
pub use self::json::{DeserializeOptions, JsonCodec, JsonError, SerializeOptions};
pub use self::registry::TypeRegistry;
pub use self::wire::WireType;
