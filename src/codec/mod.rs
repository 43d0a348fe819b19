mod decode;
mod encode;

use std::fmt;

use prost::bytes::Buf;

pub use crate::wire::{DecodeError, WireType};

use crate::{DynamicMessage, MessageDescriptor, ValidationError};

const DEFAULT_MAX_MESSAGE_SIZE: usize = 50 * 1024 * 1024;
const DEFAULT_RECURSION_LIMIT: u32 = 100;

/// The proto3 binary codec.
///
/// Walks a [`MessageDescriptor`] to serialize and deserialize
/// [`DynamicMessage`] values in the Protocol Buffers wire format. Output is
/// canonical for a given message: fields are emitted in ascending field
/// number order, map entries in key order, packed encoding is used for
/// packable repeated fields, and preserved unknown fields come last.
///
/// Both directions are bounded by a configurable maximum message size
/// (default 50 MiB) and recursion limit (default 100), counted across nested
/// messages and group skipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryCodec {
    max_message_size: usize,
    recursion_limit: u32,
}

/// An error raised while serializing a [`DynamicMessage`] to wire bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// The encoded message would exceed the configured size limit.
    MessageTooLarge {
        /// The encoded size in bytes.
        size: usize,
        /// The configured limit in bytes.
        limit: usize,
    },
    /// Message nesting exceeded the configured recursion limit.
    RecursionLimitExceeded,
    /// A field holds a value its descriptor cannot encode.
    InvalidValue(ValidationError),
}

impl BinaryCodec {
    /// Creates a codec with the default limits.
    pub const fn new() -> Self {
        BinaryCodec {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// Sets the maximum size, in bytes, of a message this codec will encode
    /// or accept.
    pub const fn max_message_size(mut self, limit: usize) -> Self {
        self.max_message_size = limit;
        self
    }

    /// Sets the maximum nesting depth of messages and groups.
    pub const fn recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Serializes `message` to wire bytes.
    ///
    /// The message is validated first, so a value smuggled past the typed
    /// setters surfaces as [`EncodeError::InvalidValue`] rather than
    /// corrupting the output.
    pub fn marshal(&self, message: &DynamicMessage) -> Result<Vec<u8>, EncodeError> {
        message.validate().map_err(EncodeError::InvalidValue)?;
        encode::check_depth(message, self.recursion_limit)?;

        let len = encode::encoded_len_message(message);
        if len > self.max_message_size {
            return Err(EncodeError::MessageTooLarge {
                size: len,
                limit: self.max_message_size,
            });
        }

        let mut buf = Vec::with_capacity(len);
        encode::encode_message(message, &mut buf);
        debug_assert_eq!(buf.len(), len);
        Ok(buf)
    }

    /// Deserializes a message of the type described by `desc` from `bytes`.
    ///
    /// Unknown fields are preserved; structurally invalid input fails with a
    /// [`DecodeError`] and no message is returned.
    pub fn unmarshal(
        &self,
        desc: &MessageDescriptor,
        bytes: impl Buf,
    ) -> Result<DynamicMessage, DecodeError> {
        let mut message = DynamicMessage::new(desc.clone());
        self.unmarshal_into(&mut message, bytes)?;
        Ok(message)
    }

    /// Deserializes from `bytes`, merging into `message`.
    ///
    /// Singular fields already present are overwritten (nested messages are
    /// merged field-wise); repeated fields are appended to.
    pub fn unmarshal_into(
        &self,
        message: &mut DynamicMessage,
        mut bytes: impl Buf,
    ) -> Result<(), DecodeError> {
        let size = bytes.remaining();
        if size > self.max_message_size {
            return Err(DecodeError::MessageTooLarge {
                size,
                limit: self.max_message_size,
            });
        }
        let mut bytes = bytes.copy_to_bytes(size);
        decode::merge_message(
            message,
            &mut bytes,
            &decode::DecodeContext::new(self.recursion_limit),
        )
    }
}

impl Default for BinaryCodec {
    fn default() -> Self {
        BinaryCodec::new()
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::MessageTooLarge { size, limit } => {
                write!(f, "message of {} bytes exceeds limit of {} bytes", size, limit)
            }
            EncodeError::RecursionLimitExceeded => write!(f, "recursion limit reached"),
            EncodeError::InvalidValue(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EncodeError::InvalidValue(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for EncodeError {
    fn from(err: ValidationError) -> Self {
        EncodeError::InvalidValue(err)
    }
}
