use std::{fmt, sync::RwLock};

use prost::bytes::Buf;
use prost_types::{FileDescriptorProto, FileDescriptorSet};

use crate::{
    wkt, BinaryCodec, DecodeError, DescriptorError, DescriptorPool, DynamicMessage, EncodeError,
    EnumDescriptor, FileDescriptor, JsonCodec, JsonError, MessageDescriptor, ServiceDescriptor,
    TranscodeError, TypeDescriptor,
};

/// A shared, concurrency-safe index of descriptors by fully qualified name.
///
/// The registry wraps an immutable [`DescriptorPool`] snapshot behind a
/// reader-writer lock: lookups run concurrently without blocking each other,
/// while registration serializes through the write side and replaces the
/// snapshot atomically. A reader therefore always observes a consistent
/// pool (mid-registration state is never visible), and any descriptor handle
/// it obtained remains valid forever, pinned to the snapshot it came from.
///
/// Registration is transactional per call: either every file registers or
/// the registry is unchanged. Re-registering a file identical to an existing
/// one is a no-op; a conflicting file or type name is rejected.
///
/// There is no process-global registry; construct one and pass it where it
/// is needed.
#[derive(Default)]
pub struct TypeRegistry {
    pool: RwLock<DescriptorPool>,
}

impl TypeRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    /// Creates a registry seeded with the `google.protobuf` well-known type
    /// descriptors.
    pub fn with_well_known_types() -> Self {
        TypeRegistry {
            pool: RwLock::new(wkt::well_known_types_pool().clone()),
        }
    }

    /// Registers every file of an encoded
    /// [`FileDescriptorSet`][prost_types::FileDescriptorSet], such as the
    /// output of `protoc --descriptor_set_out`.
    pub fn register_file_descriptor_set_bytes(&self, bytes: impl Buf) -> Result<(), DescriptorError> {
        let set = prost::Message::decode(bytes)
            .map_err(DescriptorError::decode_file_descriptor_set)?;
        self.register_file_descriptor_set(set)
    }

    /// Registers every file of a decoded [`FileDescriptorSet`], atomically.
    pub fn register_file_descriptor_set(
        &self,
        set: FileDescriptorSet,
    ) -> Result<(), DescriptorError> {
        let mut guard = self.pool.write().unwrap();
        let mut staged = guard.clone();
        staged.add_file_descriptor_set(set)?;
        *guard = staged;
        Ok(())
    }

    /// Registers a single file. Every dependency it declares must already be
    /// registered.
    pub fn register_file(&self, file: FileDescriptorProto) -> Result<(), DescriptorError> {
        let mut guard = self.pool.write().unwrap();
        let mut staged = guard.clone();
        staged.add_file_descriptor_proto(file)?;
        *guard = staged;
        Ok(())
    }

    /// Gets the current pool snapshot.
    ///
    /// The snapshot is immutable: registrations after this call are not
    /// reflected in it.
    pub fn snapshot(&self) -> DescriptorPool {
        self.pool.read().unwrap().clone()
    }

    /// Gets the message with the given fully qualified name, if registered.
    pub fn find_message(&self, full_name: &str) -> Option<MessageDescriptor> {
        self.snapshot().get_message_by_name(full_name)
    }

    /// Gets the enum with the given fully qualified name, if registered.
    pub fn find_enum(&self, full_name: &str) -> Option<EnumDescriptor> {
        self.snapshot().get_enum_by_name(full_name)
    }

    /// Gets the service with the given fully qualified name, if registered.
    pub fn find_service(&self, full_name: &str) -> Option<ServiceDescriptor> {
        self.snapshot().get_service_by_name(full_name)
    }

    /// Gets the type with the given fully qualified name, whatever its kind.
    pub fn find_type(&self, full_name: &str) -> Option<TypeDescriptor> {
        self.snapshot().get_type_by_name(full_name)
    }

    /// Gets the file with the given name, if registered.
    pub fn get_file(&self, name: &str) -> Option<FileDescriptor> {
        self.snapshot().get_file_by_name(name)
    }

    /// Creates an empty dynamic message of the given registered type.
    pub fn create_message(&self, full_name: &str) -> Option<DynamicMessage> {
        self.find_message(full_name).map(DynamicMessage::new)
    }

    /// Serializes `message` with a default-configured [`BinaryCodec`].
    pub fn marshal(&self, message: &DynamicMessage) -> Result<Vec<u8>, EncodeError> {
        BinaryCodec::new().marshal(message)
    }

    /// Deserializes a message of the given registered type from wire bytes
    /// with a default-configured [`BinaryCodec`].
    ///
    /// Returns `None` if the type is not registered.
    pub fn unmarshal(
        &self,
        full_name: &str,
        bytes: impl Buf,
    ) -> Option<Result<DynamicMessage, DecodeError>> {
        let desc = self.find_message(full_name)?;
        Some(BinaryCodec::new().unmarshal(&desc, bytes))
    }

    /// Serializes `message` to canonical JSON with a default-configured
    /// [`JsonCodec`].
    pub fn marshal_json(&self, message: &DynamicMessage) -> Result<String, JsonError> {
        JsonCodec::new().marshal(message)
    }

    /// Deserializes a message of the given registered type from canonical
    /// JSON with a default-configured [`JsonCodec`].
    ///
    /// Returns `None` if the type is not registered.
    pub fn unmarshal_json(
        &self,
        full_name: &str,
        json: &str,
    ) -> Option<Result<DynamicMessage, JsonError>> {
        let desc = self.find_message(full_name)?;
        Some(JsonCodec::new().unmarshal(&desc, json))
    }

    /// Unpacks a `google.protobuf.Any` against this registry's current
    /// snapshot. See [`wkt::unpack_any`].
    pub fn unpack_any(&self, any: &prost_types::Any) -> Result<DynamicMessage, TranscodeError> {
        wkt::unpack_any(any, &self.snapshot())
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("pool", &*self.pool.read().unwrap())
            .finish()
    }
}
