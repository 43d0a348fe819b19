//! Programmatic construction of the `google.protobuf` descriptor files.
//!
//! The well-known type handlers need descriptors for the types they build,
//! without requiring callers to ship `protoc` output for them. The files
//! declared here follow the canonical `.proto` sources shape-for-shape.

use once_cell::sync::Lazy;
use prost_types::{
    field_descriptor_proto::{Label, Type},
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, MessageOptions, OneofDescriptorProto,
};

use crate::DescriptorPool;

static POOL: Lazy<DescriptorPool> = Lazy::new(|| {
    let mut pool = DescriptorPool::new();
    for file in well_known_files() {
        pool.add_file_descriptor_proto(file)
            .expect("well-known type descriptors should be valid");
    }
    pool
});

/// Gets a pool containing the descriptors of the `google.protobuf` well-known
/// types.
pub fn well_known_types_pool() -> &'static DescriptorPool {
    &POOL
}

/// The well-known type files, in dependency order.
pub(crate) fn well_known_files() -> Vec<FileDescriptorProto> {
    vec![
        file(
            "google/protobuf/timestamp.proto",
            vec![message(
                "Timestamp",
                vec![
                    scalar_field("seconds", 1, Type::Int64),
                    scalar_field("nanos", 2, Type::Int32),
                ],
            )],
            vec![],
        ),
        file(
            "google/protobuf/duration.proto",
            vec![message(
                "Duration",
                vec![
                    scalar_field("seconds", 1, Type::Int64),
                    scalar_field("nanos", 2, Type::Int32),
                ],
            )],
            vec![],
        ),
        file(
            "google/protobuf/empty.proto",
            vec![message("Empty", vec![])],
            vec![],
        ),
        file(
            "google/protobuf/field_mask.proto",
            vec![message(
                "FieldMask",
                vec![repeated_field("paths", 1, Type::String)],
            )],
            vec![],
        ),
        file(
            "google/protobuf/any.proto",
            vec![message(
                "Any",
                vec![
                    scalar_field("type_url", 1, Type::String),
                    scalar_field("value", 2, Type::Bytes),
                ],
            )],
            vec![],
        ),
        struct_file(),
        wrappers_file(),
    ]
}

fn struct_file() -> FileDescriptorProto {
    let mut fields_entry = message(
        "FieldsEntry",
        vec![
            scalar_field("key", 1, Type::String),
            message_field("value", 2, ".google.protobuf.Value"),
        ],
    );
    fields_entry.options = Some(MessageOptions {
        map_entry: Some(true),
        ..Default::default()
    });

    let mut struct_message = message(
        "Struct",
        vec![repeated_message_field(
            "fields",
            1,
            ".google.protobuf.Struct.FieldsEntry",
        )],
    );
    struct_message.nested_type = vec![fields_entry];

    let mut value_message = message(
        "Value",
        vec![
            oneof_field(
                enum_field("null_value", 1, ".google.protobuf.NullValue"),
                0,
            ),
            oneof_field(scalar_field("number_value", 2, Type::Double), 0),
            oneof_field(scalar_field("string_value", 3, Type::String), 0),
            oneof_field(scalar_field("bool_value", 4, Type::Bool), 0),
            oneof_field(message_field("struct_value", 5, ".google.protobuf.Struct"), 0),
            oneof_field(
                message_field("list_value", 6, ".google.protobuf.ListValue"),
                0,
            ),
        ],
    );
    value_message.oneof_decl = vec![OneofDescriptorProto {
        name: Some("kind".to_owned()),
        ..Default::default()
    }];

    let list_value = message(
        "ListValue",
        vec![repeated_message_field("values", 1, ".google.protobuf.Value")],
    );

    let null_value = EnumDescriptorProto {
        name: Some("NullValue".to_owned()),
        value: vec![EnumValueDescriptorProto {
            name: Some("NULL_VALUE".to_owned()),
            number: Some(0),
            ..Default::default()
        }],
        ..Default::default()
    };

    file(
        "google/protobuf/struct.proto",
        vec![struct_message, value_message, list_value],
        vec![null_value],
    )
}

fn wrappers_file() -> FileDescriptorProto {
    let wrapper = |name: &str, ty: Type| message(name, vec![scalar_field("value", 1, ty)]);
    file(
        "google/protobuf/wrappers.proto",
        vec![
            wrapper("DoubleValue", Type::Double),
            wrapper("FloatValue", Type::Float),
            wrapper("Int64Value", Type::Int64),
            wrapper("UInt64Value", Type::Uint64),
            wrapper("Int32Value", Type::Int32),
            wrapper("UInt32Value", Type::Uint32),
            wrapper("BoolValue", Type::Bool),
            wrapper("StringValue", Type::String),
            wrapper("BytesValue", Type::Bytes),
        ],
        vec![],
    )
}

fn file(
    name: &str,
    messages: Vec<DescriptorProto>,
    enums: Vec<EnumDescriptorProto>,
) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_owned()),
        package: Some("google.protobuf".to_owned()),
        syntax: Some("proto3".to_owned()),
        message_type: messages,
        enum_type: enums,
        ..Default::default()
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_owned()),
        field: fields,
        ..Default::default()
    }
}

fn scalar_field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn repeated_field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        label: Some(Label::Repeated as i32),
        ..scalar_field(name, number, ty)
    }
}

fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(Type::Message as i32),
        type_name: Some(type_name.to_owned()),
        ..Default::default()
    }
}

fn repeated_message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        label: Some(Label::Repeated as i32),
        ..message_field(name, number, type_name)
    }
}

fn enum_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(Type::Enum as i32),
        type_name: Some(type_name.to_owned()),
        ..Default::default()
    }
}

fn oneof_field(mut field: FieldDescriptorProto, oneof_index: i32) -> FieldDescriptorProto {
    field.oneof_index = Some(oneof_index);
    field
}
