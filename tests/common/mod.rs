//! Shared descriptor fixtures for the integration tests, built directly from
//! descriptor protos so no protoc invocation is needed.

#![allow(dead_code)]

use prost_types::{
    field_descriptor_proto::{Label, Type},
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, MessageOptions, OneofDescriptorProto,
};
use protodyn::DescriptorPool;

pub fn scalar(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

pub fn repeated(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        label: Some(Label::Repeated as i32),
        ..scalar(name, number, ty)
    }
}

pub fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        r#type: Some(Type::Message as i32),
        type_name: Some(type_name.to_owned()),
        ..scalar(name, number, Type::Message)
    }
}

pub fn optional(mut field: FieldDescriptorProto) -> FieldDescriptorProto {
    field.proto3_optional = Some(true);
    field
}

pub fn in_oneof(mut field: FieldDescriptorProto, index: i32) -> FieldDescriptorProto {
    field.oneof_index = Some(index);
    field
}

pub fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_owned()),
        field: fields,
        ..Default::default()
    }
}

pub fn file(name: &str, package: &str, messages: Vec<DescriptorProto>) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_owned()),
        package: Some(package.to_owned()),
        syntax: Some("proto3".to_owned()),
        message_type: messages,
        ..Default::default()
    }
}

pub fn pool_with(file: FileDescriptorProto) -> DescriptorPool {
    let mut pool = DescriptorPool::new();
    pool.add_file_descriptor_proto(file)
        .expect("test file should be valid");
    pool
}

/// `Person { int32 id = 1; string name = 2; bool active = 3; }`
pub fn person_pool() -> DescriptorPool {
    pool_with(file(
        "example/person.proto",
        "example",
        vec![message(
            "Person",
            vec![
                scalar("id", 1, Type::Int32),
                scalar("name", 2, Type::String),
                scalar("active", 3, Type::Bool),
            ],
        )],
    ))
}

/// `Bag { repeated int32 xs = 1; }`
pub fn bag_pool() -> DescriptorPool {
    pool_with(file(
        "example/bag.proto",
        "example",
        vec![message("Bag", vec![repeated("xs", 1, Type::Int32)])],
    ))
}

/// `Dict { map<string, int32> items = 1; }`
pub fn dict_pool() -> DescriptorPool {
    let mut dict = message(
        "Dict",
        vec![FieldDescriptorProto {
            label: Some(Label::Repeated as i32),
            ..message_field("items", 1, ".example.Dict.ItemsEntry")
        }],
    );
    dict.nested_type = vec![DescriptorProto {
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..message(
            "ItemsEntry",
            vec![scalar("key", 1, Type::String), scalar("value", 2, Type::Int32)],
        )
    }];
    pool_with(file("example/dict.proto", "example", vec![dict]))
}

/// `V1 { int32 a = 1; }`
pub fn v1_pool() -> DescriptorPool {
    pool_with(file(
        "example/v1.proto",
        "example",
        vec![message("V1", vec![scalar("a", 1, Type::Int32)])],
    ))
}

/// `V2 { int32 a = 1; int32 b = 2; }`
pub fn v2_pool() -> DescriptorPool {
    pool_with(file(
        "example/v2.proto",
        "example",
        vec![message(
            "V2",
            vec![scalar("a", 1, Type::Int32), scalar("b", 2, Type::Int32)],
        )],
    ))
}

/// `Node { Node child = 1; }`
pub fn node_pool() -> DescriptorPool {
    pool_with(file(
        "example/node.proto",
        "example",
        vec![message(
            "Node",
            vec![message_field("child", 1, ".example.Node")],
        )],
    ))
}

/// A message with one field of every scalar kind, plus an enum.
pub fn scalars_pool() -> DescriptorPool {
    let mut file = file(
        "example/scalars.proto",
        "example",
        vec![message(
            "Scalars",
            vec![
                scalar("double", 1, Type::Double),
                scalar("float", 2, Type::Float),
                scalar("int32", 3, Type::Int32),
                scalar("int64", 4, Type::Int64),
                scalar("uint32", 5, Type::Uint32),
                scalar("uint64", 6, Type::Uint64),
                scalar("sint32", 7, Type::Sint32),
                scalar("sint64", 8, Type::Sint64),
                scalar("fixed32", 9, Type::Fixed32),
                scalar("fixed64", 10, Type::Fixed64),
                scalar("sfixed32", 11, Type::Sfixed32),
                scalar("sfixed64", 12, Type::Sfixed64),
                scalar("bool", 13, Type::Bool),
                scalar("string", 14, Type::String),
                scalar("bytes", 15, Type::Bytes),
                FieldDescriptorProto {
                    r#type: Some(Type::Enum as i32),
                    type_name: Some(".example.Color".to_owned()),
                    ..scalar("color", 16, Type::Enum)
                },
            ],
        )],
    );
    file.enum_type = vec![EnumDescriptorProto {
        name: Some("Color".to_owned()),
        value: vec![
            EnumValueDescriptorProto {
                name: Some("COLOR_UNSPECIFIED".to_owned()),
                number: Some(0),
                ..Default::default()
            },
            EnumValueDescriptorProto {
                name: Some("COLOR_RED".to_owned()),
                number: Some(1),
                ..Default::default()
            },
        ],
        ..Default::default()
    }];
    pool_with(file)
}

/// `Form { oneof choice { int32 number = 1; string text = 2; } string note = 3; }`
pub fn oneof_pool() -> DescriptorPool {
    let mut form = message(
        "Form",
        vec![
            in_oneof(scalar("number", 1, Type::Int32), 0),
            in_oneof(scalar("text", 2, Type::String), 0),
            scalar("note", 3, Type::String),
        ],
    );
    form.oneof_decl = vec![OneofDescriptorProto {
        name: Some("choice".to_owned()),
        ..Default::default()
    }];
    pool_with(file("example/form.proto", "example", vec![form]))
}
