mod common;

use common::*;
use prost_types::field_descriptor_proto::Type;
use protodyn::{
    DeserializeOptions, DynamicMessage, JsonCodec, MapKey, SerializeOptions, Value,
};

#[test]
fn person_to_json() {
    let desc = person_pool().get_message_by_name("example.Person").unwrap();
    let mut person = DynamicMessage::new(desc.clone());
    person.set_field_by_name("id", Value::I32(123)).unwrap();
    person
        .set_field_by_name("name", Value::String("John Doe".to_owned()))
        .unwrap();
    person.set_field_by_name("active", Value::Bool(true)).unwrap();

    let codec = JsonCodec::new();
    let json = codec.marshal(&person).unwrap();
    assert_eq!(json, r#"{"id":123,"name":"John Doe","active":true}"#);

    let decoded = codec.unmarshal(&desc, &json).unwrap();
    assert_eq!(decoded, person);
}

#[test]
fn default_values_are_omitted() {
    let desc = person_pool().get_message_by_name("example.Person").unwrap();
    let mut person = DynamicMessage::new(desc);
    person.set_field_by_name("id", Value::I32(0)).unwrap();
    person.set_field_by_name("name", Value::String("x".to_owned())).unwrap();

    let json = JsonCodec::new().marshal(&person).unwrap();
    assert_eq!(json, r#"{"name":"x"}"#);
}

#[test]
fn emit_unpopulated_fields() {
    let desc = person_pool().get_message_by_name("example.Person").unwrap();
    let person = DynamicMessage::new(desc);
    let codec =
        JsonCodec::new().serialize_options(SerializeOptions::new().emit_unpopulated_fields(true));
    assert_eq!(
        codec.marshal(&person).unwrap(),
        r#"{"id":0,"name":"","active":false}"#
    );
}

#[test]
fn sixty_four_bit_integers_stringify() {
    let desc = scalars_pool().get_message_by_name("example.Scalars").unwrap();
    let mut message = DynamicMessage::new(desc.clone());
    message
        .set_field_by_name("int64", Value::I64(i64::MAX))
        .unwrap();
    message
        .set_field_by_name("uint64", Value::U64(u64::MAX))
        .unwrap();

    let codec = JsonCodec::new();
    let json = codec.marshal(&message).unwrap();
    assert_eq!(
        json,
        r#"{"int64":"9223372036854775807","uint64":"18446744073709551615"}"#
    );

    // Parsers accept both the string and number forms.
    let decoded = codec
        .unmarshal(&desc, r#"{"int64":9223372036854775807,"uint64":"18446744073709551615"}"#)
        .unwrap();
    assert_eq!(decoded, message);

    let plain = JsonCodec::new()
        .serialize_options(SerializeOptions::new().stringify_64_bit_integers(false));
    assert_eq!(
        plain.marshal(&message).unwrap(),
        r#"{"int64":9223372036854775807,"uint64":18446744073709551615}"#
    );
}

#[test]
fn enums_map_to_names() {
    let desc = scalars_pool().get_message_by_name("example.Scalars").unwrap();
    let mut message = DynamicMessage::new(desc.clone());
    message.set_field_by_name("color", Value::EnumNumber(1)).unwrap();

    let codec = JsonCodec::new();
    assert_eq!(codec.marshal(&message).unwrap(), r#"{"color":"COLOR_RED"}"#);

    // Unknown numbers fall back to the numeric form.
    message.set_field_by_name("color", Value::EnumNumber(7)).unwrap();
    assert_eq!(codec.marshal(&message).unwrap(), r#"{"color":7}"#);

    // Both symbolic and numeric forms parse.
    let by_name = codec.unmarshal(&desc, r#"{"color":"COLOR_RED"}"#).unwrap();
    assert_eq!(by_name.get_field_by_name("color").unwrap(), &Value::EnumNumber(1));
    let by_number = codec.unmarshal(&desc, r#"{"color":7}"#).unwrap();
    assert_eq!(by_number.get_field_by_name("color").unwrap(), &Value::EnumNumber(7));

    let numbers =
        JsonCodec::new().serialize_options(SerializeOptions::new().use_enum_numbers(true));
    message.set_field_by_name("color", Value::EnumNumber(1)).unwrap();
    assert_eq!(numbers.marshal(&message).unwrap(), r#"{"color":1}"#);
}

#[test]
fn bytes_use_base64() {
    let desc = scalars_pool().get_message_by_name("example.Scalars").unwrap();
    let mut message = DynamicMessage::new(desc.clone());
    message
        .set_field_by_name("bytes", Value::Bytes(vec![0xfb, 0xff, 0x00].into()))
        .unwrap();

    let codec = JsonCodec::new();
    let json = codec.marshal(&message).unwrap();
    assert_eq!(json, r#"{"bytes":"+/8A"}"#);
    assert_eq!(codec.unmarshal(&desc, &json).unwrap(), message);

    // URL-safe and unpadded forms are accepted.
    let url_safe = codec.unmarshal(&desc, r#"{"bytes":"-_8A"}"#).unwrap();
    assert_eq!(url_safe, message);
}

#[test]
fn non_finite_floats_use_strings() {
    let desc = scalars_pool().get_message_by_name("example.Scalars").unwrap();
    let mut message = DynamicMessage::new(desc.clone());
    message
        .set_field_by_name("double", Value::F64(f64::INFINITY))
        .unwrap();
    message
        .set_field_by_name("float", Value::F32(f32::NEG_INFINITY))
        .unwrap();

    let codec = JsonCodec::new();
    let json = codec.marshal(&message).unwrap();
    assert_eq!(json, r#"{"double":"Infinity","float":"-Infinity"}"#);
    assert_eq!(codec.unmarshal(&desc, &json).unwrap(), message);

    let nan = codec.unmarshal(&desc, r#"{"double":"NaN"}"#).unwrap();
    assert!(nan
        .get_field_by_name("double")
        .unwrap()
        .as_f64()
        .unwrap()
        .is_nan());
}

#[test]
fn maps_use_json_objects() {
    let desc = dict_pool().get_message_by_name("example.Dict").unwrap();
    let items = desc.get_field_by_name("items").unwrap();
    let mut dict = DynamicMessage::new(desc.clone());
    dict.insert_map_entry(&items, MapKey::String("one".to_owned()), Value::I32(1))
        .unwrap();
    dict.insert_map_entry(&items, MapKey::String("two".to_owned()), Value::I32(2))
        .unwrap();

    let codec = JsonCodec::new();
    let json = codec.marshal(&dict).unwrap();
    assert_eq!(json, r#"{"items":{"one":1,"two":2}}"#);
    assert_eq!(codec.unmarshal(&desc, &json).unwrap(), dict);
}

#[test]
fn integer_map_keys_stringify() {
    let pool = pool_with({
        let mut counts = message(
            "Counts",
            vec![prost_types::FieldDescriptorProto {
                label: Some(prost_types::field_descriptor_proto::Label::Repeated as i32),
                ..message_field("counts", 1, ".example.Counts.CountsEntry")
            }],
        );
        counts.nested_type = vec![prost_types::DescriptorProto {
            options: Some(prost_types::MessageOptions {
                map_entry: Some(true),
                ..Default::default()
            }),
            ..message(
                "CountsEntry",
                vec![scalar("key", 1, Type::Int32), scalar("value", 2, Type::Int64)],
            )
        }];
        file("example/counts.proto", "example", vec![counts])
    });
    let desc = pool.get_message_by_name("example.Counts").unwrap();
    let counts = desc.get_field_by_name("counts").unwrap();

    let mut message = DynamicMessage::new(desc.clone());
    message
        .insert_map_entry(&counts, MapKey::I32(-5), Value::I64(10))
        .unwrap();

    let codec = JsonCodec::new();
    let json = codec.marshal(&message).unwrap();
    assert_eq!(json, r#"{"counts":{"-5":"10"}}"#);
    assert_eq!(codec.unmarshal(&desc, &json).unwrap(), message);
}

#[test]
fn repeated_fields_use_arrays() {
    let desc = bag_pool().get_message_by_name("example.Bag").unwrap();
    let mut bag = DynamicMessage::new(desc.clone());
    bag.set_field_by_name(
        "xs",
        Value::List(vec![Value::I32(1), Value::I32(2), Value::I32(300)]),
    )
    .unwrap();

    let codec = JsonCodec::new();
    let json = codec.marshal(&bag).unwrap();
    assert_eq!(json, r#"{"xs":[1,2,300]}"#);
    assert_eq!(codec.unmarshal(&desc, &json).unwrap(), bag);
}

#[test]
fn unknown_fields_are_denied_by_default() {
    let desc = person_pool().get_message_by_name("example.Person").unwrap();
    let codec = JsonCodec::new();
    assert!(codec.unmarshal(&desc, r#"{"nope":1}"#).is_err());

    let lenient = JsonCodec::new()
        .deserialize_options(DeserializeOptions::new().deny_unknown_fields(false));
    let decoded = lenient.unmarshal(&desc, r#"{"nope":1,"id":3}"#).unwrap();
    assert_eq!(decoded.get_field_by_name("id").unwrap(), &Value::I32(3));
}

#[test]
fn proto_field_names_accepted_and_emitted() {
    let pool = pool_with(file(
        "example/snake.proto",
        "example",
        vec![message("Snake", vec![scalar("snake_case", 1, Type::Int32)])],
    ));
    let desc = pool.get_message_by_name("example.Snake").unwrap();

    let codec = JsonCodec::new();
    // The canonical output uses the JSON name, but parsing accepts both.
    let mut expected = DynamicMessage::new(desc.clone());
    expected.set_field_by_name("snake_case", Value::I32(1)).unwrap();
    assert_eq!(codec.marshal(&expected).unwrap(), r#"{"snakeCase":1}"#);
    assert_eq!(codec.unmarshal(&desc, r#"{"snakeCase":1}"#).unwrap(), expected);
    assert_eq!(codec.unmarshal(&desc, r#"{"snake_case":1}"#).unwrap(), expected);

    let proto_names =
        JsonCodec::new().serialize_options(SerializeOptions::new().use_proto_field_name(true));
    assert_eq!(proto_names.marshal(&expected).unwrap(), r#"{"snake_case":1}"#);
}

#[test]
fn null_reads_as_unset() {
    let desc = person_pool().get_message_by_name("example.Person").unwrap();
    let decoded = JsonCodec::new()
        .unmarshal(&desc, r#"{"id":null,"name":"x"}"#)
        .unwrap();
    assert!(!decoded.has_field_by_name("id"));
    assert!(decoded.has_field_by_name("name"));
}

#[test]
fn oneof_members_serialize_when_default() {
    let desc = oneof_pool().get_message_by_name("example.Form").unwrap();
    let mut form = DynamicMessage::new(desc.clone());
    // A oneof member at its type's default value still has explicit
    // presence, so it must appear in the output.
    form.set_field_by_name("number", Value::I32(0)).unwrap();

    let codec = JsonCodec::new();
    let json = codec.marshal(&form).unwrap();
    assert_eq!(json, r#"{"number":0}"#);

    let decoded = codec.unmarshal(&desc, &json).unwrap();
    assert!(decoded.has_field_by_name("number"));
}

#[test]
fn nested_messages_recurse() {
    let pool = pool_with(file(
        "example/outer.proto",
        "example",
        vec![
            {
                let mut outer = message(
                    "Outer",
                    vec![message_field("inner", 1, ".example.Inner")],
                );
                outer.field.push(scalar("tag", 2, Type::String));
                outer
            },
            message("Inner", vec![scalar("n", 1, Type::Int32)]),
        ],
    ));
    let desc = pool.get_message_by_name("example.Outer").unwrap();
    let inner_desc = pool.get_message_by_name("example.Inner").unwrap();

    let mut inner = DynamicMessage::new(inner_desc);
    inner.set_field_by_name("n", Value::I32(5)).unwrap();
    let mut outer = DynamicMessage::new(desc.clone());
    outer.set_field_by_name("inner", Value::Message(inner)).unwrap();
    outer
        .set_field_by_name("tag", Value::String("t".to_owned()))
        .unwrap();

    let codec = JsonCodec::new();
    let json = codec.marshal(&outer).unwrap();
    assert_eq!(json, r#"{"inner":{"n":5},"tag":"t"}"#);
    assert_eq!(codec.unmarshal(&desc, &json).unwrap(), outer);
}
