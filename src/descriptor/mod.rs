mod api;
mod build;
mod error;
mod options;

pub use self::api::TypeDescriptor;
pub use self::error::DescriptorError;
pub use self::options::{OptionMap, OptionValue};

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    ops::Range,
    sync::Arc,
};

use crate::{wire::WireType, Value};

pub(crate) const MAP_ENTRY_KEY_NUMBER: u32 = 1;
pub(crate) const MAP_ENTRY_VALUE_NUMBER: u32 = 2;

pub(crate) const RESERVED_MESSAGE_FIELD_NUMBERS: Range<i32> = 19_000..20_000;
pub(crate) const VALID_MESSAGE_FIELD_NUMBERS: Range<i32> = 1..536_870_912;

/// Cardinality determines whether a field is singular, optional, or repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cardinality {
    /// The field appears at most once and does not track presence explicitly.
    Singular,
    /// The field appears at most once and tracks explicit presence
    /// (proto3 `optional`, or any message-typed field).
    Optional,
    /// The field appears zero or more times.
    Repeated,
}

/// The syntax of a proto file.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub enum Syntax {
    /// The `proto2` syntax.
    Proto2,
    /// The `proto3` syntax.
    Proto3,
}

/// The type of a protobuf message field.
#[derive(Clone, PartialEq)]
pub enum Kind {
    /// The protobuf `double` type.
    Double,
    /// The protobuf `float` type.
    Float,
    /// The protobuf `int32` type.
    Int32,
    /// The protobuf `int64` type.
    Int64,
    /// The protobuf `uint32` type.
    Uint32,
    /// The protobuf `uint64` type.
    Uint64,
    /// The protobuf `sint32` type.
    Sint32,
    /// The protobuf `sint64` type.
    Sint64,
    /// The protobuf `fixed32` type.
    Fixed32,
    /// The protobuf `fixed64` type.
    Fixed64,
    /// The protobuf `sfixed32` type.
    Sfixed32,
    /// The protobuf `sfixed64` type.
    Sfixed64,
    /// The protobuf `bool` type.
    Bool,
    /// The protobuf `string` type.
    String,
    /// The protobuf `bytes` type.
    Bytes,
    /// A protobuf message type.
    Message(MessageDescriptor),
    /// A protobuf enum type.
    Enum(EnumDescriptor),
}

#[derive(Clone, Copy)]
pub(crate) enum KindIndex {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Message(MessageIndex),
    Enum(EnumIndex),
    Group(MessageIndex),
}

pub(crate) type DescriptorIndex = u32;
pub(crate) type FileIndex = DescriptorIndex;
pub(crate) type MessageIndex = DescriptorIndex;
pub(crate) type FieldIndex = DescriptorIndex;
pub(crate) type OneofIndex = DescriptorIndex;
pub(crate) type EnumIndex = DescriptorIndex;
pub(crate) type EnumValueIndex = DescriptorIndex;
pub(crate) type ServiceIndex = DescriptorIndex;
pub(crate) type MethodIndex = DescriptorIndex;

/// An immutable collection of related descriptors, indexed by fully qualified
/// name.
///
/// A pool is typically created from `FileDescriptorSet` bytes output by the
/// protobuf compiler (see [`DescriptorPool::decode`]) but may also be built up
/// by adding files individually. Every file added must have its declared
/// dependencies already present.
///
/// This type uses reference counting internally so it is cheap to clone.
/// Modifying an instance of a pool never updates existing clones: descriptor
/// handles pin the snapshot they were created from. This is what makes
/// descriptors share-safe forever once handed out.
#[derive(Clone, Default)]
pub struct DescriptorPool {
    inner: Arc<PoolInner>,
}

#[derive(Clone, Default)]
pub(crate) struct PoolInner {
    names: HashMap<Box<str>, Definition>,
    file_names: HashMap<Box<str>, FileIndex>,
    files: Vec<FileDescriptorInner>,
    messages: Vec<MessageDescriptorInner>,
    enums: Vec<EnumDescriptorInner>,
    services: Vec<ServiceDescriptorInner>,
}

/// The full name of a declaration together with the offset of its short name,
/// so both can be served from one allocation.
#[derive(Clone)]
pub(crate) struct Identity {
    full_name: Box<str>,
    name_index: usize,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum Definition {
    Package,
    Message(MessageIndex),
    Enum(EnumIndex),
    Service(ServiceIndex),
}

/// A single source file containing protobuf messages, enums and services.
#[derive(Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pool: DescriptorPool,
    index: FileIndex,
}

#[derive(Clone)]
pub(crate) struct FileDescriptorInner {
    name: Box<str>,
    package: Box<str>,
    syntax: Syntax,
    raw: prost_types::FileDescriptorProto,
    dependencies: Vec<FileIndex>,
    messages: Vec<MessageIndex>,
    enums: Vec<EnumIndex>,
    services: Vec<ServiceIndex>,
    options: OptionMap,
}

/// A protobuf message definition.
#[derive(Clone, Eq)]
pub struct MessageDescriptor {
    pool: DescriptorPool,
    index: MessageIndex,
}

#[derive(Clone)]
pub(crate) struct MessageDescriptorInner {
    id: Identity,
    file: FileIndex,
    parent: Option<MessageIndex>,
    fields: Vec<FieldDescriptorInner>,
    field_numbers: BTreeMap<u32, FieldIndex>,
    field_names: HashMap<Box<str>, FieldIndex>,
    field_json_names: HashMap<Box<str>, FieldIndex>,
    oneofs: Vec<OneofDescriptorInner>,
    nested_messages: Vec<MessageIndex>,
    nested_enums: Vec<EnumIndex>,
    is_map_entry: bool,
    options: OptionMap,
}

/// A single field of a protobuf message.
#[derive(Clone, Eq)]
pub struct FieldDescriptor {
    message: MessageDescriptor,
    index: FieldIndex,
}

#[derive(Clone)]
pub(crate) struct FieldDescriptorInner {
    id: Identity,
    number: u32,
    json_name: Box<str>,
    kind: KindIndex,
    oneof: Option<OneofIndex>,
    is_packed: bool,
    supports_presence: bool,
    cardinality: Cardinality,
    default: Option<Value>,
    options: OptionMap,
}

/// A oneof group in a protobuf message.
#[derive(Clone, Eq)]
pub struct OneofDescriptor {
    message: MessageDescriptor,
    index: OneofIndex,
}

#[derive(Clone)]
pub(crate) struct OneofDescriptorInner {
    id: Identity,
    fields: Vec<FieldIndex>,
}

/// A protobuf enum definition.
#[derive(Clone, Eq)]
pub struct EnumDescriptor {
    pool: DescriptorPool,
    index: EnumIndex,
}

#[derive(Clone)]
pub(crate) struct EnumDescriptorInner {
    id: Identity,
    file: FileIndex,
    parent: Option<MessageIndex>,
    values: Vec<EnumValueDescriptorInner>,
    value_numbers: Vec<(i32, EnumValueIndex)>,
    value_names: HashMap<Box<str>, EnumValueIndex>,
    options: OptionMap,
}

/// A single value of a protobuf enum.
#[derive(Clone, Eq)]
pub struct EnumValueDescriptor {
    parent: EnumDescriptor,
    index: EnumValueIndex,
}

#[derive(Clone)]
pub(crate) struct EnumValueDescriptorInner {
    id: Identity,
    number: i32,
    options: OptionMap,
}

/// A protobuf service definition.
///
/// Services are descriptive only: the codecs never consult them, and actual
/// call invocation is the caller's concern.
#[derive(Clone, Eq)]
pub struct ServiceDescriptor {
    pool: DescriptorPool,
    index: ServiceIndex,
}

#[derive(Clone)]
pub(crate) struct ServiceDescriptorInner {
    id: Identity,
    file: FileIndex,
    methods: Vec<MethodDescriptorInner>,
    options: OptionMap,
}

/// A method of a [`ServiceDescriptor`].
#[derive(Clone, Eq)]
pub struct MethodDescriptor {
    service: ServiceDescriptor,
    index: MethodIndex,
}

#[derive(Clone)]
pub(crate) struct MethodDescriptorInner {
    id: Identity,
    input: MessageIndex,
    output: MessageIndex,
    client_streaming: bool,
    server_streaming: bool,
    options: OptionMap,
}

impl Identity {
    pub(crate) fn new(full_name: impl Into<Box<str>>, name: &str) -> Identity {
        let full_name = full_name.into();
        debug_assert!(full_name.ends_with(name));
        let name_index = full_name.len() - name.len();
        debug_assert!(name_index == 0 || full_name.as_bytes()[name_index - 1] == b'.');
        Identity {
            full_name,
            name_index,
        }
    }

    pub(crate) fn full_name(&self) -> &str {
        &self.full_name
    }

    pub(crate) fn name(&self) -> &str {
        &self.full_name[self.name_index..]
    }
}

impl KindIndex {
    pub(crate) fn is_packable(&self) -> bool {
        match self {
            KindIndex::Double
            | KindIndex::Float
            | KindIndex::Int32
            | KindIndex::Int64
            | KindIndex::Uint32
            | KindIndex::Uint64
            | KindIndex::Sint32
            | KindIndex::Sint64
            | KindIndex::Fixed32
            | KindIndex::Fixed64
            | KindIndex::Sfixed32
            | KindIndex::Sfixed64
            | KindIndex::Bool
            | KindIndex::Enum(_) => true,
            KindIndex::String | KindIndex::Bytes | KindIndex::Message(_) | KindIndex::Group(_) => {
                false
            }
        }
    }

    pub(crate) fn is_message(&self) -> bool {
        matches!(self, KindIndex::Message(_) | KindIndex::Group(_))
    }
}

impl Kind {
    /// Returns `true` for every kind except message and enum types.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Kind::Message(_) | Kind::Enum(_))
    }

    /// Returns `true` for the integer and floating point kinds.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Kind::Double
                | Kind::Float
                | Kind::Int32
                | Kind::Int64
                | Kind::Uint32
                | Kind::Uint64
                | Kind::Sint32
                | Kind::Sint64
                | Kind::Fixed32
                | Kind::Fixed64
                | Kind::Sfixed32
                | Kind::Sfixed64
        )
    }

    /// Returns the [`WireType`] used to encode this kind.
    pub fn wire_type(&self) -> WireType {
        match self {
            Kind::Double | Kind::Fixed64 | Kind::Sfixed64 => WireType::SixtyFourBit,
            Kind::Float | Kind::Fixed32 | Kind::Sfixed32 => WireType::ThirtyTwoBit,
            Kind::Int32
            | Kind::Int64
            | Kind::Uint32
            | Kind::Uint64
            | Kind::Sint32
            | Kind::Sint64
            | Kind::Bool
            | Kind::Enum(_) => WireType::Varint,
            Kind::String | Kind::Bytes | Kind::Message(_) => WireType::LengthDelimited,
        }
    }

    /// Gets a reference to the [`MessageDescriptor`] if this is a message
    /// kind, or `None` otherwise.
    pub fn as_message(&self) -> Option<&MessageDescriptor> {
        match self {
            Kind::Message(desc) => Some(desc),
            _ => None,
        }
    }

    /// Gets a reference to the [`EnumDescriptor`] if this is an enum kind, or
    /// `None` otherwise.
    pub fn as_enum(&self) -> Option<&EnumDescriptor> {
        match self {
            Kind::Enum(desc) => Some(desc),
            _ => None,
        }
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Double => write!(f, "double"),
            Kind::Float => write!(f, "float"),
            Kind::Int32 => write!(f, "int32"),
            Kind::Int64 => write!(f, "int64"),
            Kind::Uint32 => write!(f, "uint32"),
            Kind::Uint64 => write!(f, "uint64"),
            Kind::Sint32 => write!(f, "sint32"),
            Kind::Sint64 => write!(f, "sint64"),
            Kind::Fixed32 => write!(f, "fixed32"),
            Kind::Fixed64 => write!(f, "fixed64"),
            Kind::Sfixed32 => write!(f, "sfixed32"),
            Kind::Sfixed64 => write!(f, "sfixed64"),
            Kind::Bool => write!(f, "bool"),
            Kind::String => write!(f, "string"),
            Kind::Bytes => write!(f, "bytes"),
            Kind::Message(desc) => write!(f, "{}", desc.full_name()),
            Kind::Enum(desc) => write!(f, "{}", desc.full_name()),
        }
    }
}

impl fmt::Debug for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Syntax::Proto2 => write!(f, "proto2"),
            Syntax::Proto3 => write!(f, "proto3"),
        }
    }
}

impl PoolInner {
    pub(crate) fn get_by_name(&self, name: &str) -> Option<&Definition> {
        let name = name.strip_prefix('.').unwrap_or(name);
        self.names.get(name)
    }
}

pub(crate) fn to_index(i: usize) -> DescriptorIndex {
    i.try_into().expect("descriptor index too large")
}

#[test]
fn assert_descriptor_send_sync() {
    fn test_send_sync<T: Send + Sync>() {}

    test_send_sync::<DescriptorPool>();
    test_send_sync::<MessageDescriptor>();
    test_send_sync::<Kind>();
    test_send_sync::<DescriptorError>();
}
