mod common;

use common::*;
use protodyn::{BinaryCodec, DecodeError, DynamicMessage, MapKey, Value, WireType};

fn varint_len(mut value: usize) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        if value < 0x80 {
            out.push(value as u8);
            return out;
        }
        out.push(((value & 0x7f) | 0x80) as u8);
        value >>= 7;
    }
}

#[test]
fn person_marshal_bytes() {
    let desc = person_pool().get_message_by_name("example.Person").unwrap();
    let mut person = DynamicMessage::new(desc.clone());
    person.set_field_by_name("id", Value::I32(123)).unwrap();
    person
        .set_field_by_name("name", Value::String("John Doe".to_owned()))
        .unwrap();
    person.set_field_by_name("active", Value::Bool(true)).unwrap();

    let bytes = BinaryCodec::new().marshal(&person).unwrap();
    assert_eq!(
        bytes,
        [0x08, 0x7b, 0x12, 0x08, b'J', b'o', b'h', b'n', b' ', b'D', b'o', b'e', 0x18, 0x01]
    );

    let decoded = BinaryCodec::new().unmarshal(&desc, bytes.as_slice()).unwrap();
    assert_eq!(decoded, person);
}

#[test]
fn packed_repeated_roundtrip() {
    let desc = bag_pool().get_message_by_name("example.Bag").unwrap();
    let mut bag = DynamicMessage::new(desc.clone());
    bag.set_field_by_name(
        "xs",
        Value::List(vec![Value::I32(1), Value::I32(2), Value::I32(300)]),
    )
    .unwrap();

    let bytes = BinaryCodec::new().marshal(&bag).unwrap();
    assert_eq!(bytes, [0x0a, 0x04, 0x01, 0x02, 0xac, 0x02]);

    // The same value in the unpacked encoding must decode identically.
    let unpacked = [0x08, 0x01, 0x08, 0x02, 0x08, 0xac, 0x02];
    let decoded = BinaryCodec::new().unmarshal(&desc, unpacked.as_slice()).unwrap();
    assert_eq!(decoded, bag);
}

#[test]
fn mixed_packed_and_unpacked_concatenate() {
    let desc = bag_pool().get_message_by_name("example.Bag").unwrap();
    // Unpacked 1, then a packed run of [2, 300], then unpacked 4.
    let bytes = [0x08, 0x01, 0x0a, 0x03, 0x02, 0xac, 0x02, 0x08, 0x04];
    let decoded = BinaryCodec::new().unmarshal(&desc, bytes.as_slice()).unwrap();
    assert_eq!(
        decoded.get_field_by_name("xs").unwrap(),
        &Value::List(vec![
            Value::I32(1),
            Value::I32(2),
            Value::I32(300),
            Value::I32(4)
        ])
    );
}

#[test]
fn map_entries_sorted_by_key() {
    let desc = dict_pool().get_message_by_name("example.Dict").unwrap();
    let mut dict = DynamicMessage::new(desc.clone());
    let items = desc.get_field_by_name("items").unwrap();
    // Insert in reverse order; the wire output must sort by key.
    dict.insert_map_entry(&items, MapKey::String("two".to_owned()), Value::I32(2))
        .unwrap();
    dict.insert_map_entry(&items, MapKey::String("one".to_owned()), Value::I32(1))
        .unwrap();

    let bytes = BinaryCodec::new().marshal(&dict).unwrap();
    let expected = [
        0x0a, 0x07, 0x0a, 0x03, b'o', b'n', b'e', 0x10, 0x01, // items["one"] = 1
        0x0a, 0x07, 0x0a, 0x03, b't', b'w', b'o', 0x10, 0x02, // items["two"] = 2
    ];
    assert_eq!(bytes, expected);
}

#[test]
fn map_decoding_is_order_independent() {
    let desc = dict_pool().get_message_by_name("example.Dict").unwrap();
    let sorted = [
        0x0a, 0x07, 0x0a, 0x03, b'o', b'n', b'e', 0x10, 0x01,
        0x0a, 0x07, 0x0a, 0x03, b't', b'w', b'o', 0x10, 0x02,
    ];
    let reversed = [
        0x0a, 0x07, 0x0a, 0x03, b't', b'w', b'o', 0x10, 0x02,
        0x0a, 0x07, 0x0a, 0x03, b'o', b'n', b'e', 0x10, 0x01,
    ];
    let codec = BinaryCodec::new();
    let lhs = codec.unmarshal(&desc, sorted.as_slice()).unwrap();
    let rhs = codec.unmarshal(&desc, reversed.as_slice()).unwrap();
    assert_eq!(lhs, rhs);
    // Re-encoding either decodes back to the sorted form.
    assert_eq!(codec.marshal(&lhs).unwrap(), sorted);
    assert_eq!(codec.marshal(&rhs).unwrap(), sorted);
}

#[test]
fn duplicate_map_keys_upsert() {
    let desc = dict_pool().get_message_by_name("example.Dict").unwrap();
    let bytes = [
        0x0a, 0x07, 0x0a, 0x03, b'o', b'n', b'e', 0x10, 0x01,
        0x0a, 0x07, 0x0a, 0x03, b'o', b'n', b'e', 0x10, 0x63,
    ];
    let decoded = BinaryCodec::new().unmarshal(&desc, bytes.as_slice()).unwrap();
    let items = decoded.get_field_by_name("items").unwrap().as_map().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(
        items.get(&MapKey::String("one".to_owned())),
        Some(&Value::I32(99))
    );
}

#[test]
fn unknown_fields_preserved_across_versions() {
    let v1 = v1_pool().get_message_by_name("example.V1").unwrap();
    let v2 = v2_pool().get_message_by_name("example.V2").unwrap();
    let codec = BinaryCodec::new();

    // Field 1 = 42, field 2 = 99; V1 only declares field 1.
    let bytes = [0x08, 0x2a, 0x10, 0x63];
    let decoded = codec.unmarshal(&v1, bytes.as_slice()).unwrap();
    assert_eq!(decoded.get_field_by_name("a").unwrap(), &Value::I32(42));
    assert!(!decoded.unknown_fields().is_empty());

    let reencoded = codec.marshal(&decoded).unwrap();
    let upgraded = codec.unmarshal(&v2, reencoded.as_slice()).unwrap();
    assert_eq!(upgraded.get_field_by_name("a").unwrap(), &Value::I32(42));
    assert_eq!(upgraded.get_field_by_name("b").unwrap(), &Value::I32(99));
}

#[test]
fn unknown_groups_skip_and_roundtrip() {
    let v1 = v1_pool().get_message_by_name("example.V1").unwrap();
    let codec = BinaryCodec::new();
    // Field 3 is a group containing field 1 = 1; then field 1 = 42.
    let bytes = [0x1b, 0x08, 0x01, 0x1c, 0x08, 0x2a];
    let decoded = codec.unmarshal(&v1, bytes.as_slice()).unwrap();
    assert_eq!(decoded.get_field_by_name("a").unwrap(), &Value::I32(42));

    let reencoded = codec.marshal(&decoded).unwrap();
    // Known field first, then the preserved group.
    assert_eq!(reencoded, [0x08, 0x2a, 0x1b, 0x08, 0x01, 0x1c]);
}

#[test]
fn scalar_kinds_roundtrip() {
    let desc = scalars_pool().get_message_by_name("example.Scalars").unwrap();
    let mut message = DynamicMessage::new(desc.clone());
    message.set_field_by_name("double", Value::F64(1.5)).unwrap();
    message.set_field_by_name("float", Value::F32(-2.25)).unwrap();
    message.set_field_by_name("int32", Value::I32(-3)).unwrap();
    message.set_field_by_name("int64", Value::I64(i64::MIN)).unwrap();
    message.set_field_by_name("uint32", Value::U32(u32::MAX)).unwrap();
    message.set_field_by_name("uint64", Value::U64(u64::MAX)).unwrap();
    message.set_field_by_name("sint32", Value::I32(i32::MIN)).unwrap();
    message.set_field_by_name("sint64", Value::I64(i64::MIN)).unwrap();
    message.set_field_by_name("fixed32", Value::U32(9)).unwrap();
    message.set_field_by_name("fixed64", Value::U64(10)).unwrap();
    message.set_field_by_name("sfixed32", Value::I32(-11)).unwrap();
    message.set_field_by_name("sfixed64", Value::I64(-12)).unwrap();
    message.set_field_by_name("bool", Value::Bool(true)).unwrap();
    message
        .set_field_by_name("string", Value::String("héllo".to_owned()))
        .unwrap();
    message
        .set_field_by_name("bytes", Value::Bytes(vec![0, 1, 0xff].into()))
        .unwrap();
    message.set_field_by_name("color", Value::EnumNumber(7)).unwrap();

    let codec = BinaryCodec::new();
    let bytes = codec.marshal(&message).unwrap();
    let decoded = codec.unmarshal(&desc, bytes.as_slice()).unwrap();
    assert_eq!(decoded, message);

    // Normalized output is stable.
    assert_eq!(codec.marshal(&decoded).unwrap(), bytes);
}

#[test]
fn negative_int32_uses_ten_byte_varint() {
    let desc = person_pool().get_message_by_name("example.Person").unwrap();
    let mut person = DynamicMessage::new(desc.clone());
    person.set_field_by_name("id", Value::I32(-1)).unwrap();

    let bytes = BinaryCodec::new().marshal(&person).unwrap();
    assert_eq!(
        bytes,
        [0x08, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]
    );
    let decoded = BinaryCodec::new().unmarshal(&desc, bytes.as_slice()).unwrap();
    assert_eq!(decoded.get_field_by_name("id").unwrap(), &Value::I32(-1));
}

#[test]
fn empty_string_encodes_with_zero_length() {
    let desc = person_pool().get_message_by_name("example.Person").unwrap();
    let mut person = DynamicMessage::new(desc.clone());
    person
        .set_field_by_name("name", Value::String(String::new()))
        .unwrap();
    let bytes = BinaryCodec::new().marshal(&person).unwrap();
    assert_eq!(bytes, [0x12, 0x00]);
}

#[test]
fn invalid_utf8_fails() {
    let desc = person_pool().get_message_by_name("example.Person").unwrap();
    let bytes = [0x12, 0x01, 0xff];
    assert!(matches!(
        BinaryCodec::new().unmarshal(&desc, bytes.as_slice()),
        Err(DecodeError::InvalidUtf8 { field }) if field == "name"
    ));
}

#[test]
fn truncated_input_fails() {
    let desc = person_pool().get_message_by_name("example.Person").unwrap();
    let codec = BinaryCodec::new();
    // Tag with no value.
    assert_eq!(
        codec.unmarshal(&desc, [0x08].as_slice()).unwrap_err(),
        DecodeError::Truncated
    );
    // Length prefix longer than the remaining input.
    assert_eq!(
        codec.unmarshal(&desc, [0x12, 0x05, b'a'].as_slice()).unwrap_err(),
        DecodeError::Truncated
    );
}

#[test]
fn malformed_varint_fails() {
    let desc = person_pool().get_message_by_name("example.Person").unwrap();
    let mut bytes = vec![0x08];
    bytes.extend([0x80; 10]);
    assert_eq!(
        BinaryCodec::new().unmarshal(&desc, bytes.as_slice()).unwrap_err(),
        DecodeError::MalformedVarint
    );
}

#[test]
fn wire_type_mismatch_fails() {
    let desc = person_pool().get_message_by_name("example.Person").unwrap();
    // Field 1 is int32 but arrives length-delimited.
    let bytes = [0x0a, 0x00];
    assert_eq!(
        BinaryCodec::new().unmarshal(&desc, bytes.as_slice()).unwrap_err(),
        DecodeError::WireTypeMismatch {
            field: "id".to_owned(),
            expected: WireType::Varint,
            actual: WireType::LengthDelimited,
        }
    );
}

#[test]
fn stray_end_group_fails() {
    let desc = person_pool().get_message_by_name("example.Person").unwrap();
    let bytes = [0x0c];
    assert_eq!(
        BinaryCodec::new().unmarshal(&desc, bytes.as_slice()).unwrap_err(),
        DecodeError::UnexpectedEndGroup
    );
}

#[test]
fn invalid_wire_type_fails() {
    let desc = person_pool().get_message_by_name("example.Person").unwrap();
    let bytes = [0x0f];
    assert!(matches!(
        BinaryCodec::new().unmarshal(&desc, bytes.as_slice()).unwrap_err(),
        DecodeError::InvalidTag { .. }
    ));
}

fn nested_node_bytes(depth: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    for _ in 0..depth {
        let mut wrapped = vec![0x0a];
        wrapped.extend(varint_len(bytes.len()));
        wrapped.extend(&bytes);
        bytes = wrapped;
    }
    bytes
}

#[test]
fn recursion_limit_guards_decoding() {
    let desc = node_pool().get_message_by_name("example.Node").unwrap();
    let codec = BinaryCodec::new();

    let ok = nested_node_bytes(100);
    assert!(codec.unmarshal(&desc, ok.as_slice()).is_ok());

    let too_deep = nested_node_bytes(101);
    assert_eq!(
        codec.unmarshal(&desc, too_deep.as_slice()).unwrap_err(),
        DecodeError::RecursionLimitExceeded
    );
}

#[test]
fn recursion_limit_guards_encoding() {
    let desc = node_pool().get_message_by_name("example.Node").unwrap();
    let child = desc.get_field_by_name("child").unwrap();

    let mut message = DynamicMessage::new(desc.clone());
    for _ in 0..101 {
        let mut wrapper = DynamicMessage::new(desc.clone());
        wrapper.set_field(&child, Value::Message(message)).unwrap();
        message = wrapper;
    }
    assert!(BinaryCodec::new().marshal(&message).is_err());
}

#[test]
fn size_limit_guards_both_directions() {
    let desc = person_pool().get_message_by_name("example.Person").unwrap();
    let codec = BinaryCodec::new().max_message_size(8);

    let bytes = [0u8; 9];
    assert_eq!(
        codec.unmarshal(&desc, bytes.as_slice()).unwrap_err(),
        DecodeError::MessageTooLarge { size: 9, limit: 8 }
    );

    let mut person = DynamicMessage::new(desc);
    person
        .set_field_by_name("name", Value::String("long enough".to_owned()))
        .unwrap();
    assert!(codec.marshal(&person).is_err());
}

#[test]
fn repeated_nested_message_occurrences_merge() {
    let desc = node_pool().get_message_by_name("example.Node").unwrap();
    // Two occurrences of the child field: the second is empty and must not
    // clear what the first one set.
    let bytes = [0x0a, 0x02, 0x0a, 0x00, 0x0a, 0x00];
    let decoded = BinaryCodec::new().unmarshal(&desc, bytes.as_slice()).unwrap();
    let child = decoded.get_field_by_name("child").unwrap().as_message().unwrap();
    assert!(child.has_field_by_name("child"));
}

#[test]
fn oneof_fields_displace_each_other() {
    let desc = oneof_pool().get_message_by_name("example.Form").unwrap();
    let mut form = DynamicMessage::new(desc.clone());
    form.set_field_by_name("number", Value::I32(5)).unwrap();
    form.set_field_by_name("text", Value::String("five".to_owned()))
        .unwrap();
    assert!(!form.has_field_by_name("number"));
    assert!(form.has_field_by_name("text"));

    // The same applies on the wire: the last oneof member wins.
    let bytes = [0x08, 0x05, 0x12, 0x04, b'f', b'i', b'v', b'e'];
    let decoded = BinaryCodec::new().unmarshal(&desc, bytes.as_slice()).unwrap();
    assert!(!decoded.has_field_by_name("number"));
    assert_eq!(
        decoded.get_field_by_name("text").unwrap(),
        &Value::String("five".to_owned())
    );
}

#[test]
fn explicitly_set_defaults_are_emitted_and_roundtrip() {
    let desc = person_pool().get_message_by_name("example.Person").unwrap();
    let mut person = DynamicMessage::new(desc.clone());
    person.set_field_by_name("id", Value::I32(0)).unwrap();

    let codec = BinaryCodec::new();
    let bytes = codec.marshal(&person).unwrap();
    assert_eq!(bytes, [0x08, 0x00]);

    let decoded = codec.unmarshal(&desc, bytes.as_slice()).unwrap();
    assert!(decoded.has_field_by_name("id"));
    assert_eq!(decoded, person);
}
