use std::{collections::HashSet, fmt, sync::Arc};

use super::{
    Cardinality, Definition, DescriptorPool, EnumDescriptor, EnumValueDescriptor, FieldDescriptor,
    FileDescriptor, Identity, Kind, KindIndex, MessageDescriptor, MethodDescriptor,
    OneofDescriptor, OptionMap, ServiceDescriptor, Syntax, MAP_ENTRY_KEY_NUMBER,
    MAP_ENTRY_VALUE_NUMBER,
};
use crate::Value;

impl DescriptorPool {
    /// Creates a new, empty pool.
    pub fn new() -> Self {
        DescriptorPool::default()
    }

    /// Gets an iterator over the files registered in this pool, in
    /// registration order.
    pub fn files(&self) -> impl ExactSizeIterator<Item = FileDescriptor> + '_ {
        (0..self.inner.files.len()).map(move |index| FileDescriptor {
            pool: self.clone(),
            index: super::to_index(index),
        })
    }

    /// Gets the file with the given name, if it is registered.
    pub fn get_file_by_name(&self, name: &str) -> Option<FileDescriptor> {
        self.inner.file_names.get(name).map(|&index| FileDescriptor {
            pool: self.clone(),
            index,
        })
    }

    /// Gets the message with the given fully qualified name, if it exists.
    pub fn get_message_by_name(&self, name: &str) -> Option<MessageDescriptor> {
        match self.inner.get_by_name(name) {
            Some(&Definition::Message(index)) => Some(MessageDescriptor {
                pool: self.clone(),
                index,
            }),
            _ => None,
        }
    }

    /// Gets the enum with the given fully qualified name, if it exists.
    pub fn get_enum_by_name(&self, name: &str) -> Option<EnumDescriptor> {
        match self.inner.get_by_name(name) {
            Some(&Definition::Enum(index)) => Some(EnumDescriptor {
                pool: self.clone(),
                index,
            }),
            _ => None,
        }
    }

    /// Gets the service with the given fully qualified name, if it exists.
    pub fn get_service_by_name(&self, name: &str) -> Option<ServiceDescriptor> {
        match self.inner.get_by_name(name) {
            Some(&Definition::Service(index)) => Some(ServiceDescriptor {
                pool: self.clone(),
                index,
            }),
            _ => None,
        }
    }

    /// Returns `true` if a type (message, enum or service) with the given
    /// fully qualified name is registered.
    pub fn contains_type(&self, name: &str) -> bool {
        matches!(
            self.inner.get_by_name(name),
            Some(Definition::Message(_) | Definition::Enum(_) | Definition::Service(_))
        )
    }

    pub(crate) fn message_by_index(&self, index: super::MessageIndex) -> MessageDescriptor {
        debug_assert!((index as usize) < self.inner.messages.len());
        MessageDescriptor {
            pool: self.clone(),
            index,
        }
    }

    pub(crate) fn enum_by_index(&self, index: super::EnumIndex) -> EnumDescriptor {
        debug_assert!((index as usize) < self.inner.enums.len());
        EnumDescriptor {
            pool: self.clone(),
            index,
        }
    }
}

impl PartialEq for DescriptorPool {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for DescriptorPool {}

impl fmt::Debug for DescriptorPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorPool")
            .field("files", &self.inner.files.iter().map(|f| &f.name).collect::<Vec<_>>())
            .finish()
    }
}

impl Kind {
    pub(crate) fn new(pool: &DescriptorPool, kind: KindIndex) -> Self {
        match kind {
            KindIndex::Double => Kind::Double,
            KindIndex::Float => Kind::Float,
            KindIndex::Int32 => Kind::Int32,
            KindIndex::Int64 => Kind::Int64,
            KindIndex::Uint32 => Kind::Uint32,
            KindIndex::Uint64 => Kind::Uint64,
            KindIndex::Sint32 => Kind::Sint32,
            KindIndex::Sint64 => Kind::Sint64,
            KindIndex::Fixed32 => Kind::Fixed32,
            KindIndex::Fixed64 => Kind::Fixed64,
            KindIndex::Sfixed32 => Kind::Sfixed32,
            KindIndex::Sfixed64 => Kind::Sfixed64,
            KindIndex::Bool => Kind::Bool,
            KindIndex::String => Kind::String,
            KindIndex::Bytes => Kind::Bytes,
            KindIndex::Message(index) | KindIndex::Group(index) => {
                Kind::Message(pool.message_by_index(index))
            }
            KindIndex::Enum(index) => Kind::Enum(pool.enum_by_index(index)),
        }
    }
}

impl FileDescriptor {
    fn inner(&self) -> &super::FileDescriptorInner {
        &self.pool.inner.files[self.index as usize]
    }

    /// Gets the path-like name of this file, e.g. `"example/person.proto"`.
    pub fn name(&self) -> &str {
        &self.inner().name
    }

    /// Gets the package name, or the empty string if no package is declared.
    pub fn package_name(&self) -> &str {
        &self.inner().package
    }

    /// Gets the syntax of this file.
    pub fn syntax(&self) -> Syntax {
        self.inner().syntax
    }

    /// Gets the pool this file belongs to.
    pub fn parent_pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Gets the files this file declares a dependency on, in declaration
    /// order.
    pub fn dependencies(&self) -> impl ExactSizeIterator<Item = FileDescriptor> + '_ {
        self.inner().dependencies.iter().map(move |&index| FileDescriptor {
            pool: self.pool.clone(),
            index,
        })
    }

    /// Gets the top-level messages declared in this file.
    pub fn messages(&self) -> impl ExactSizeIterator<Item = MessageDescriptor> + '_ {
        self.inner()
            .messages
            .iter()
            .map(move |&index| self.pool.message_by_index(index))
    }

    /// Gets the top-level enums declared in this file.
    pub fn enums(&self) -> impl ExactSizeIterator<Item = EnumDescriptor> + '_ {
        self.inner()
            .enums
            .iter()
            .map(move |&index| self.pool.enum_by_index(index))
    }

    /// Gets the services declared in this file.
    pub fn services(&self) -> impl ExactSizeIterator<Item = ServiceDescriptor> + '_ {
        self.inner().services.iter().map(move |&index| ServiceDescriptor {
            pool: self.pool.clone(),
            index,
        })
    }

    /// Gets the file-level options.
    pub fn options(&self) -> &OptionMap {
        &self.inner().options
    }

    /// Gets a reference to the raw [`FileDescriptorProto`][prost_types::FileDescriptorProto]
    /// this file was built from.
    pub fn file_descriptor_proto(&self) -> &prost_types::FileDescriptorProto {
        &self.inner().raw
    }
}

impl fmt::Debug for FileDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileDescriptor")
            .field("name", &self.name())
            .field("package", &self.package_name())
            .finish()
    }
}

impl MessageDescriptor {
    pub(crate) fn inner(&self) -> &super::MessageDescriptorInner {
        &self.pool.inner.messages[self.index as usize]
    }

    /// Gets the short name of this message, e.g. `Person`.
    pub fn name(&self) -> &str {
        self.inner().id.name()
    }

    /// Gets the fully qualified name, e.g. `example.Person`.
    pub fn full_name(&self) -> &str {
        self.inner().id.full_name()
    }

    /// Gets the pool this message belongs to.
    pub fn parent_pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Gets the file this message is declared in.
    pub fn parent_file(&self) -> FileDescriptor {
        FileDescriptor {
            pool: self.pool.clone(),
            index: self.inner().file,
        }
    }

    /// Gets the message containing this one, or `None` if it is declared at
    /// file scope.
    pub fn parent_message(&self) -> Option<MessageDescriptor> {
        self.inner().parent.map(|index| self.pool.message_by_index(index))
    }

    /// Gets an iterator over the fields of this message, in ascending field
    /// number order. This is the order the binary codec emits fields in.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = FieldDescriptor> + '_ {
        self.inner().field_numbers.values().map(move |&index| FieldDescriptor {
            message: self.clone(),
            index,
        })
    }

    /// Gets the field with the given number, if it exists.
    pub fn get_field(&self, number: u32) -> Option<FieldDescriptor> {
        self.inner()
            .field_numbers
            .get(&number)
            .map(|&index| FieldDescriptor {
                message: self.clone(),
                index,
            })
    }

    /// Gets the field with the given name, if it exists.
    pub fn get_field_by_name(&self, name: &str) -> Option<FieldDescriptor> {
        self.inner()
            .field_names
            .get(name)
            .map(|&index| FieldDescriptor {
                message: self.clone(),
                index,
            })
    }

    /// Gets the field with the given JSON name, if it exists.
    pub fn get_field_by_json_name(&self, json_name: &str) -> Option<FieldDescriptor> {
        self.inner()
            .field_json_names
            .get(json_name)
            .map(|&index| FieldDescriptor {
                message: self.clone(),
                index,
            })
    }

    /// Gets the oneof groups declared in this message, in declaration order.
    pub fn oneofs(&self) -> impl ExactSizeIterator<Item = OneofDescriptor> + '_ {
        (0..self.inner().oneofs.len()).map(move |index| OneofDescriptor {
            message: self.clone(),
            index: super::to_index(index),
        })
    }

    /// Gets the messages nested directly within this one.
    pub fn nested_messages(&self) -> impl ExactSizeIterator<Item = MessageDescriptor> + '_ {
        self.inner()
            .nested_messages
            .iter()
            .map(move |&index| self.pool.message_by_index(index))
    }

    /// Gets the enums nested directly within this message.
    pub fn nested_enums(&self) -> impl ExactSizeIterator<Item = EnumDescriptor> + '_ {
        self.inner()
            .nested_enums
            .iter()
            .map(move |&index| self.pool.enum_by_index(index))
    }

    /// Gets the nested message with the given short name, if it exists.
    pub fn get_nested_message(&self, name: &str) -> Option<MessageDescriptor> {
        self.nested_messages().find(|m| m.name() == name)
    }

    /// Gets the nested enum with the given short name, if it exists.
    pub fn get_nested_enum(&self, name: &str) -> Option<EnumDescriptor> {
        self.nested_enums().find(|e| e.name() == name)
    }

    /// Returns `true` if this message is an auto-generated map entry type.
    pub fn is_map_entry(&self) -> bool {
        self.inner().is_map_entry
    }

    /// Gets the key field of a map entry message.
    ///
    /// # Panics
    ///
    /// Panics if [`is_map_entry`][Self::is_map_entry] is `false`.
    pub fn map_entry_key_field(&self) -> FieldDescriptor {
        debug_assert!(self.is_map_entry());
        self.get_field(MAP_ENTRY_KEY_NUMBER)
            .expect("map entry should have key field")
    }

    /// Gets the value field of a map entry message.
    ///
    /// # Panics
    ///
    /// Panics if [`is_map_entry`][Self::is_map_entry] is `false`.
    pub fn map_entry_value_field(&self) -> FieldDescriptor {
        debug_assert!(self.is_map_entry());
        self.get_field(MAP_ENTRY_VALUE_NUMBER)
            .expect("map entry should have value field")
    }

    /// Gets the message-level options.
    pub fn options(&self) -> &OptionMap {
        &self.inner().options
    }
}

impl PartialEq for MessageDescriptor {
    /// Structural equality: two message descriptors are equal if they are the
    /// same declaration in the same pool, or if their names, fields (by
    /// number, recursively), nested types, enum values and options all match.
    fn eq(&self, other: &Self) -> bool {
        if self.pool == other.pool && self.index == other.index {
            return true;
        }
        message_eq(self, other, &mut HashSet::new())
    }
}

impl fmt::Debug for MessageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageDescriptor")
            .field("full_name", &self.full_name())
            .finish()
    }
}

impl FieldDescriptor {
    fn inner(&self) -> &super::FieldDescriptorInner {
        &self.message.inner().fields[self.index as usize]
    }

    /// Gets the name of this field as declared in the proto file.
    pub fn name(&self) -> &str {
        self.inner().id.name()
    }

    /// Gets the fully qualified name, e.g. `example.Person.name`.
    pub fn full_name(&self) -> &str {
        self.inner().id.full_name()
    }

    /// Gets the JSON name of this field: the `json_name` from the descriptor
    /// if set, otherwise the lowerCamelCase form of the proto name.
    pub fn json_name(&self) -> &str {
        &self.inner().json_name
    }

    /// Gets the field number.
    pub fn number(&self) -> u32 {
        self.inner().number
    }

    /// Gets the message this field belongs to.
    pub fn containing_message(&self) -> &MessageDescriptor {
        &self.message
    }

    /// Gets the [`Kind`] of this field.
    pub fn kind(&self) -> Kind {
        Kind::new(&self.message.pool, self.inner().kind)
    }

    /// Gets the cardinality of this field.
    pub fn cardinality(&self) -> Cardinality {
        self.inner().cardinality
    }

    /// Returns `true` if this field carries a list of values.
    pub fn is_list(&self) -> bool {
        self.inner().cardinality == Cardinality::Repeated && !self.is_map()
    }

    /// Returns `true` if this field is a map field.
    pub fn is_map(&self) -> bool {
        self.inner().cardinality == Cardinality::Repeated
            && match self.inner().kind {
                KindIndex::Message(index) => {
                    self.message.pool.inner.messages[index as usize].is_map_entry
                }
                _ => false,
            }
    }

    /// Returns `true` if this is a repeated field of a packable kind.
    pub fn is_packable(&self) -> bool {
        self.is_list() && self.inner().kind.is_packable()
    }

    /// Returns `true` if this field uses the packed encoding.
    pub fn is_packed(&self) -> bool {
        self.inner().is_packed
    }

    /// Returns `true` if this is a deprecated proto2 group field. Group
    /// payloads are only ever skipped byte-for-byte into the unknown field
    /// buffer.
    pub fn is_group(&self) -> bool {
        matches!(self.inner().kind, KindIndex::Group(_))
    }

    /// Returns `true` if this field tracks explicit presence.
    pub fn supports_presence(&self) -> bool {
        self.inner().supports_presence
    }

    /// Gets the oneof group containing this field, if any.
    pub fn containing_oneof(&self) -> Option<OneofDescriptor> {
        self.inner().oneof.map(|index| OneofDescriptor {
            message: self.message.clone(),
            index,
        })
    }

    /// Gets the explicit default value of this field, if one is declared.
    pub fn default_value(&self) -> Option<&Value> {
        self.inner().default.as_ref()
    }

    /// Gets the field-level options.
    pub fn options(&self) -> &OptionMap {
        &self.inner().options
    }
}

impl PartialEq for FieldDescriptor {
    fn eq(&self, other: &Self) -> bool {
        if self.message.pool == other.message.pool
            && self.message.index == other.message.index
            && self.index == other.index
        {
            return true;
        }
        field_eq(self, other, &mut HashSet::new())
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("full_name", &self.full_name())
            .field("number", &self.number())
            .field("kind", &self.kind())
            .finish()
    }
}

impl OneofDescriptor {
    fn inner(&self) -> &super::OneofDescriptorInner {
        &self.message.inner().oneofs[self.index as usize]
    }

    /// Gets the name of this oneof group.
    pub fn name(&self) -> &str {
        self.inner().id.name()
    }

    /// Gets the fully qualified name of this oneof group.
    pub fn full_name(&self) -> &str {
        self.inner().id.full_name()
    }

    /// Gets the message containing this oneof.
    pub fn containing_message(&self) -> &MessageDescriptor {
        &self.message
    }

    /// Gets the fields belonging to this oneof, in declaration order.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = FieldDescriptor> + '_ {
        self.inner().fields.iter().map(move |&index| FieldDescriptor {
            message: self.message.clone(),
            index,
        })
    }
}

impl PartialEq for OneofDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message && self.index == other.index
    }
}

impl fmt::Debug for OneofDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneofDescriptor")
            .field("full_name", &self.full_name())
            .finish()
    }
}

impl EnumDescriptor {
    pub(crate) fn inner(&self) -> &super::EnumDescriptorInner {
        &self.pool.inner.enums[self.index as usize]
    }

    /// Gets the short name of this enum.
    pub fn name(&self) -> &str {
        self.inner().id.name()
    }

    /// Gets the fully qualified name of this enum.
    pub fn full_name(&self) -> &str {
        self.inner().id.full_name()
    }

    /// Gets the pool this enum belongs to.
    pub fn parent_pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Gets the file this enum is declared in.
    pub fn parent_file(&self) -> FileDescriptor {
        FileDescriptor {
            pool: self.pool.clone(),
            index: self.inner().file,
        }
    }

    /// Gets the message containing this enum, or `None` if it is declared at
    /// file scope.
    pub fn parent_message(&self) -> Option<MessageDescriptor> {
        self.inner().parent.map(|index| self.pool.message_by_index(index))
    }

    /// Gets the default value: the value with number 0 if it exists (proto3
    /// guarantees it does), otherwise the first declared value.
    pub fn default_value(&self) -> EnumValueDescriptor {
        self.get_value(0).unwrap_or_else(|| EnumValueDescriptor {
            parent: self.clone(),
            index: 0,
        })
    }

    /// Gets the value with the given number, if it exists. When multiple
    /// values share a number (`allow_alias`), the first declared wins.
    pub fn get_value(&self, number: i32) -> Option<EnumValueDescriptor> {
        let inner = self.inner();
        inner
            .value_numbers
            .binary_search_by(|(n, _)| n.cmp(&number))
            .ok()
            .map(|found| EnumValueDescriptor {
                parent: self.clone(),
                index: inner.value_numbers[found].1,
            })
    }

    /// Gets the value with the given name, if it exists.
    pub fn get_value_by_name(&self, name: &str) -> Option<EnumValueDescriptor> {
        self.inner()
            .value_names
            .get(name)
            .map(|&index| EnumValueDescriptor {
                parent: self.clone(),
                index,
            })
    }

    /// Gets the values of this enum, in declaration order.
    pub fn values(&self) -> impl ExactSizeIterator<Item = EnumValueDescriptor> + '_ {
        (0..self.inner().values.len()).map(move |index| EnumValueDescriptor {
            parent: self.clone(),
            index: super::to_index(index),
        })
    }

    /// Gets the enum-level options.
    pub fn options(&self) -> &OptionMap {
        &self.inner().options
    }
}

impl PartialEq for EnumDescriptor {
    fn eq(&self, other: &Self) -> bool {
        if self.pool == other.pool && self.index == other.index {
            return true;
        }
        enum_eq(self, other)
    }
}

impl fmt::Debug for EnumDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumDescriptor")
            .field("full_name", &self.full_name())
            .finish()
    }
}

impl EnumValueDescriptor {
    fn inner(&self) -> &super::EnumValueDescriptorInner {
        &self.parent.inner().values[self.index as usize]
    }

    /// Gets the name of this value.
    pub fn name(&self) -> &str {
        self.inner().id.name()
    }

    /// Gets the fully qualified name of this value. Note enum values are
    /// scoped to their enum's parent, matching protobuf name resolution.
    pub fn full_name(&self) -> &str {
        self.inner().id.full_name()
    }

    /// Gets the numeric value.
    pub fn number(&self) -> i32 {
        self.inner().number
    }

    /// Gets the enum this value belongs to.
    pub fn parent_enum(&self) -> &EnumDescriptor {
        &self.parent
    }

    /// Gets the value-level options.
    pub fn options(&self) -> &OptionMap {
        &self.inner().options
    }
}

impl PartialEq for EnumValueDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.parent == other.parent && self.index == other.index
    }
}

impl fmt::Debug for EnumValueDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumValueDescriptor")
            .field("name", &self.name())
            .field("number", &self.number())
            .finish()
    }
}

impl ServiceDescriptor {
    fn inner(&self) -> &super::ServiceDescriptorInner {
        &self.pool.inner.services[self.index as usize]
    }

    /// Gets the short name of this service.
    pub fn name(&self) -> &str {
        self.inner().id.name()
    }

    /// Gets the fully qualified name of this service.
    pub fn full_name(&self) -> &str {
        self.inner().id.full_name()
    }

    /// Gets the pool this service belongs to.
    pub fn parent_pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Gets the file this service is declared in.
    pub fn parent_file(&self) -> FileDescriptor {
        FileDescriptor {
            pool: self.pool.clone(),
            index: self.inner().file,
        }
    }

    /// Gets the methods of this service, in declaration order.
    pub fn methods(&self) -> impl ExactSizeIterator<Item = MethodDescriptor> + '_ {
        (0..self.inner().methods.len()).map(move |index| MethodDescriptor {
            service: self.clone(),
            index: super::to_index(index),
        })
    }

    /// Gets the method with the given short name, if it exists.
    pub fn get_method_by_name(&self, name: &str) -> Option<MethodDescriptor> {
        self.methods().find(|m| m.name() == name)
    }

    /// Gets the service-level options.
    pub fn options(&self) -> &OptionMap {
        &self.inner().options
    }
}

impl PartialEq for ServiceDescriptor {
    fn eq(&self, other: &Self) -> bool {
        if self.pool == other.pool && self.index == other.index {
            return true;
        }
        self.full_name() == other.full_name()
            && self.methods().len() == other.methods().len()
            && self.methods().zip(other.methods()).all(|(lhs, rhs)| {
                lhs.name() == rhs.name()
                    && lhs.input() == rhs.input()
                    && lhs.output() == rhs.output()
                    && lhs.is_client_streaming() == rhs.is_client_streaming()
                    && lhs.is_server_streaming() == rhs.is_server_streaming()
                    && lhs.options() == rhs.options()
            })
            && self.options() == other.options()
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("full_name", &self.full_name())
            .finish()
    }
}

impl MethodDescriptor {
    fn inner(&self) -> &super::MethodDescriptorInner {
        &self.service.inner().methods[self.index as usize]
    }

    /// Gets the short name of this method.
    pub fn name(&self) -> &str {
        self.inner().id.name()
    }

    /// Gets the fully qualified name of this method.
    pub fn full_name(&self) -> &str {
        self.inner().id.full_name()
    }

    /// Gets the service this method belongs to.
    pub fn parent_service(&self) -> &ServiceDescriptor {
        &self.service
    }

    /// Gets the request message type.
    pub fn input(&self) -> MessageDescriptor {
        self.service.pool.message_by_index(self.inner().input)
    }

    /// Gets the response message type.
    pub fn output(&self) -> MessageDescriptor {
        self.service.pool.message_by_index(self.inner().output)
    }

    /// Returns `true` if the client streams multiple request messages.
    pub fn is_client_streaming(&self) -> bool {
        self.inner().client_streaming
    }

    /// Returns `true` if the server streams multiple response messages.
    pub fn is_server_streaming(&self) -> bool {
        self.inner().server_streaming
    }

    /// Gets the method-level options.
    pub fn options(&self) -> &OptionMap {
        &self.inner().options
    }
}

impl PartialEq for MethodDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.service == other.service && self.index == other.index
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("full_name", &self.full_name())
            .finish()
    }
}

/// A message, enum or service definition found by a name lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// A message definition.
    Message(MessageDescriptor),
    /// An enum definition.
    Enum(EnumDescriptor),
    /// A service definition.
    Service(ServiceDescriptor),
}

impl TypeDescriptor {
    /// Gets the fully qualified name of the definition.
    pub fn full_name(&self) -> &str {
        match self {
            TypeDescriptor::Message(desc) => desc.full_name(),
            TypeDescriptor::Enum(desc) => desc.full_name(),
            TypeDescriptor::Service(desc) => desc.full_name(),
        }
    }

    /// Gets the message descriptor, or `None` if this is another kind of
    /// definition.
    pub fn as_message(&self) -> Option<&MessageDescriptor> {
        match self {
            TypeDescriptor::Message(desc) => Some(desc),
            _ => None,
        }
    }

    /// Gets the enum descriptor, or `None` if this is another kind of
    /// definition.
    pub fn as_enum(&self) -> Option<&EnumDescriptor> {
        match self {
            TypeDescriptor::Enum(desc) => Some(desc),
            _ => None,
        }
    }

    /// Gets the service descriptor, or `None` if this is another kind of
    /// definition.
    pub fn as_service(&self) -> Option<&ServiceDescriptor> {
        match self {
            TypeDescriptor::Service(desc) => Some(desc),
            _ => None,
        }
    }
}

impl DescriptorPool {
    /// Gets the type (message, enum or service) with the given fully
    /// qualified name, whatever its kind.
    pub fn get_type_by_name(&self, name: &str) -> Option<TypeDescriptor> {
        match self.inner.get_by_name(name)? {
            Definition::Message(index) => {
                Some(TypeDescriptor::Message(self.message_by_index(*index)))
            }
            Definition::Enum(index) => Some(TypeDescriptor::Enum(self.enum_by_index(*index))),
            Definition::Service(index) => Some(TypeDescriptor::Service(ServiceDescriptor {
                pool: self.clone(),
                index: *index,
            })),
            Definition::Package => None,
        }
    }
}

/// Pairs of message full names currently being compared, so recursive schemas
/// terminate.
type Comparing = HashSet<(Box<str>, Box<str>)>;

fn message_eq(lhs: &MessageDescriptor, rhs: &MessageDescriptor, seen: &mut Comparing) -> bool {
    if lhs.full_name() != rhs.full_name() {
        return false;
    }
    let pair = (lhs.full_name().into(), rhs.full_name().into());
    if !seen.insert(pair) {
        // Already being compared further up the stack.
        return true;
    }

    let lhs_inner = lhs.inner();
    let rhs_inner = rhs.inner();
    if lhs_inner.field_numbers.len() != rhs_inner.field_numbers.len()
        || lhs_inner.oneofs.len() != rhs_inner.oneofs.len()
        || lhs_inner.nested_messages.len() != rhs_inner.nested_messages.len()
        || lhs_inner.nested_enums.len() != rhs_inner.nested_enums.len()
        || lhs_inner.is_map_entry != rhs_inner.is_map_entry
        || lhs_inner.options != rhs_inner.options
    {
        return false;
    }

    let fields_match = lhs.fields().zip(rhs.fields()).all(|(lf, rf)| {
        lf.number() == rf.number() && field_eq(&lf, &rf, seen)
    });
    if !fields_match {
        return false;
    }

    let oneofs_match = lhs
        .oneofs()
        .zip(rhs.oneofs())
        .all(|(lo, ro)| lo.name() == ro.name());
    if !oneofs_match {
        return false;
    }

    let nested_match = lhs
        .nested_messages()
        .zip(rhs.nested_messages())
        .all(|(lm, rm)| message_eq(&lm, &rm, seen));
    if !nested_match {
        return false;
    }

    lhs.nested_enums()
        .zip(rhs.nested_enums())
        .all(|(le, re)| enum_eq(&le, &re))
}

fn field_eq(lhs: &FieldDescriptor, rhs: &FieldDescriptor, seen: &mut Comparing) -> bool {
    lhs.name() == rhs.name()
        && lhs.number() == rhs.number()
        && lhs.json_name() == rhs.json_name()
        && lhs.cardinality() == rhs.cardinality()
        && lhs.is_packed() == rhs.is_packed()
        && lhs.inner().oneof == rhs.inner().oneof
        && lhs.options() == rhs.options()
        && kind_eq(&lhs.kind(), &rhs.kind(), seen)
}

fn kind_eq(lhs: &Kind, rhs: &Kind, seen: &mut Comparing) -> bool {
    match (lhs, rhs) {
        (Kind::Message(lm), Kind::Message(rm)) => message_eq(lm, rm, seen),
        (Kind::Enum(le), Kind::Enum(re)) => enum_eq(le, re),
        (lhs, rhs) => std::mem::discriminant(lhs) == std::mem::discriminant(rhs),
    }
}

fn enum_eq(lhs: &EnumDescriptor, rhs: &EnumDescriptor) -> bool {
    if lhs.pool == rhs.pool && lhs.index == rhs.index {
        return true;
    }
    lhs.full_name() == rhs.full_name()
        && lhs.values().len() == rhs.values().len()
        && lhs.values().zip(rhs.values()).all(|(lv, rv)| {
            lv.name() == rv.name() && lv.number() == rv.number() && lv.options() == rv.options()
        })
        && lhs.options() == rhs.options()
}

pub(crate) fn make_identity(parent: &str, name: &str) -> Identity {
    if parent.is_empty() {
        Identity::new(name.to_owned(), name)
    } else {
        Identity::new(format!("{}.{}", parent, name), name)
    }
}
