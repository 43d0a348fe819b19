use std::fmt;

/// An error that may occur while building a [`DescriptorPool`][crate::DescriptorPool]
/// from descriptor protos.
#[derive(Debug)]
pub struct DescriptorError {
    kind: DescriptorErrorKind,
}

#[derive(Debug)]
enum DescriptorErrorKind {
    DecodeFileDescriptorSet {
        err: prost::DecodeError,
    },
    MissingFileName,
    MissingDependency {
        file: String,
        dependency: String,
    },
    FileConflict {
        name: String,
    },
    NameConflict {
        name: String,
    },
    TypeNotFound {
        name: String,
    },
    MissingTypeName {
        field: String,
    },
    InvalidTypeReference {
        field: String,
        type_name: String,
        expected: &'static str,
    },
    UnknownSyntax {
        syntax: String,
    },
    InvalidFieldNumber {
        field: String,
        number: i32,
    },
    DuplicateFieldNumber {
        message: String,
        number: i32,
    },
    DuplicateFieldName {
        name: String,
    },
    InvalidMapEntry {
        name: String,
    },
    EmptyEnum {
        name: String,
    },
    MissingEnumZeroValue {
        name: String,
    },
    InvalidOneofIndex {
        field: String,
    },
    InvalidDefaultValue {
        field: String,
        value: String,
    },
}

impl DescriptorError {
    pub(crate) fn decode_file_descriptor_set(err: prost::DecodeError) -> Self {
        DescriptorErrorKind::DecodeFileDescriptorSet { err }.into()
    }

    pub(crate) fn missing_file_name() -> Self {
        DescriptorErrorKind::MissingFileName.into()
    }

    pub(crate) fn missing_dependency(file: impl ToString, dependency: impl ToString) -> Self {
        DescriptorErrorKind::MissingDependency {
            file: file.to_string(),
            dependency: dependency.to_string(),
        }
        .into()
    }

    pub(crate) fn file_conflict(name: impl ToString) -> Self {
        DescriptorErrorKind::FileConflict {
            name: name.to_string(),
        }
        .into()
    }

    pub(crate) fn name_conflict(name: impl ToString) -> Self {
        DescriptorErrorKind::NameConflict {
            name: name.to_string(),
        }
        .into()
    }

    pub(crate) fn type_not_found(name: impl ToString) -> Self {
        DescriptorErrorKind::TypeNotFound {
            name: name.to_string(),
        }
        .into()
    }

    pub(crate) fn missing_type_name(field: impl ToString) -> Self {
        DescriptorErrorKind::MissingTypeName {
            field: field.to_string(),
        }
        .into()
    }

    pub(crate) fn invalid_type_reference(
        field: impl ToString,
        type_name: impl ToString,
        expected: &'static str,
    ) -> Self {
        DescriptorErrorKind::InvalidTypeReference {
            field: field.to_string(),
            type_name: type_name.to_string(),
            expected,
        }
        .into()
    }

    pub(crate) fn unknown_syntax(syntax: impl ToString) -> Self {
        DescriptorErrorKind::UnknownSyntax {
            syntax: syntax.to_string(),
        }
        .into()
    }

    pub(crate) fn invalid_field_number(field: impl ToString, number: i32) -> Self {
        DescriptorErrorKind::InvalidFieldNumber {
            field: field.to_string(),
            number,
        }
        .into()
    }

    pub(crate) fn duplicate_field_number(message: impl ToString, number: i32) -> Self {
        DescriptorErrorKind::DuplicateFieldNumber {
            message: message.to_string(),
            number,
        }
        .into()
    }

    pub(crate) fn duplicate_field_name(name: impl ToString) -> Self {
        DescriptorErrorKind::DuplicateFieldName {
            name: name.to_string(),
        }
        .into()
    }

    pub(crate) fn invalid_map_entry(name: impl ToString) -> Self {
        DescriptorErrorKind::InvalidMapEntry {
            name: name.to_string(),
        }
        .into()
    }

    pub(crate) fn empty_enum(name: impl ToString) -> Self {
        DescriptorErrorKind::EmptyEnum {
            name: name.to_string(),
        }
        .into()
    }

    pub(crate) fn missing_enum_zero_value(name: impl ToString) -> Self {
        DescriptorErrorKind::MissingEnumZeroValue {
            name: name.to_string(),
        }
        .into()
    }

    pub(crate) fn invalid_oneof_index(field: impl ToString) -> Self {
        DescriptorErrorKind::InvalidOneofIndex {
            field: field.to_string(),
        }
        .into()
    }

    pub(crate) fn invalid_default_value(field: impl ToString, value: impl ToString) -> Self {
        DescriptorErrorKind::InvalidDefaultValue {
            field: field.to_string(),
            value: value.to_string(),
        }
        .into()
    }

    /// Returns `true` if this error was caused by a name colliding with an
    /// already registered, non-identical descriptor.
    pub fn is_name_conflict(&self) -> bool {
        matches!(
            self.kind,
            DescriptorErrorKind::NameConflict { .. } | DescriptorErrorKind::FileConflict { .. }
        )
    }
}

impl From<DescriptorErrorKind> for DescriptorError {
    fn from(kind: DescriptorErrorKind) -> Self {
        DescriptorError { kind }
    }
}

impl std::error::Error for DescriptorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            DescriptorErrorKind::DecodeFileDescriptorSet { err } => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DescriptorErrorKind::DecodeFileDescriptorSet { .. } => {
                write!(f, "failed to decode file descriptor set")
            }
            DescriptorErrorKind::MissingFileName => {
                write!(f, "file descriptor has no name")
            }
            DescriptorErrorKind::MissingDependency { file, dependency } => {
                write!(
                    f,
                    "the file '{}' depends on '{}', which is not registered",
                    file, dependency
                )
            }
            DescriptorErrorKind::FileConflict { name } => {
                write!(
                    f,
                    "a different file named '{}' is already registered",
                    name
                )
            }
            DescriptorErrorKind::NameConflict { name } => {
                write!(f, "the name '{}' is defined twice", name)
            }
            DescriptorErrorKind::TypeNotFound { name } => {
                write!(f, "the type '{}' was not found", name)
            }
            DescriptorErrorKind::MissingTypeName { field } => {
                write!(
                    f,
                    "the field '{}' has a message or enum type but no type name",
                    field
                )
            }
            DescriptorErrorKind::InvalidTypeReference {
                field,
                type_name,
                expected,
            } => {
                write!(
                    f,
                    "the field '{}' references '{}', which is not {}",
                    field, type_name, expected
                )
            }
            DescriptorErrorKind::UnknownSyntax { syntax } => {
                write!(f, "the syntax '{}' is not recognized", syntax)
            }
            DescriptorErrorKind::InvalidFieldNumber { field, number } => {
                write!(f, "the field '{}' has invalid number {}", field, number)
            }
            DescriptorErrorKind::DuplicateFieldNumber { message, number } => {
                write!(
                    f,
                    "the message '{}' uses field number {} twice",
                    message, number
                )
            }
            DescriptorErrorKind::DuplicateFieldName { name } => {
                write!(f, "the field name '{}' is used twice", name)
            }
            DescriptorErrorKind::InvalidMapEntry { name } => {
                write!(f, "the map entry message '{}' is invalid", name)
            }
            DescriptorErrorKind::EmptyEnum { name } => {
                write!(f, "the enum '{}' has no values", name)
            }
            DescriptorErrorKind::MissingEnumZeroValue { name } => {
                write!(f, "the proto3 enum '{}' has no value with number 0", name)
            }
            DescriptorErrorKind::InvalidOneofIndex { field } => {
                write!(f, "the field '{}' has an invalid oneof index", field)
            }
            DescriptorErrorKind::InvalidDefaultValue { field, value } => {
                write!(
                    f,
                    "the field '{}' has an invalid default value '{}'",
                    field, value
                )
            }
        }
    }
}
