mod common;

use common::*;
use prost_types::{field_descriptor_proto::Type, Duration, FieldMask, Timestamp};
use protodyn::{from_dynamic, to_dynamic, wkt, JsonCodec, TranscodeError, TypeRegistry, Value};

fn wkt_descriptor(full_name: &str) -> protodyn::MessageDescriptor {
    wkt::well_known_types_pool()
        .get_message_by_name(full_name)
        .unwrap()
}

#[test]
fn timestamp_canonical_json() {
    let timestamp = Timestamp {
        seconds: 63_072_020,
        nanos: 21_000_000,
    };
    let message = wkt::timestamp_to_message(&timestamp).unwrap();

    let codec = JsonCodec::new();
    let json = codec.marshal(&message).unwrap();
    assert_eq!(json, r#""1972-01-01T10:00:20.021Z""#);

    let decoded = codec
        .unmarshal(&wkt_descriptor("google.protobuf.Timestamp"), &json)
        .unwrap();
    assert_eq!(wkt::timestamp_from_message(&decoded).unwrap(), timestamp);
}

#[test]
fn timestamp_accepts_offsets() {
    let codec = JsonCodec::new();
    let decoded = codec
        .unmarshal(
            &wkt_descriptor("google.protobuf.Timestamp"),
            r#""1972-01-01T11:00:20.021+01:00""#,
        )
        .unwrap();
    let timestamp = wkt::timestamp_from_message(&decoded).unwrap();
    assert_eq!(timestamp.seconds, 63_072_020);
    assert_eq!(timestamp.nanos, 21_000_000);
}

#[test]
fn timestamp_out_of_range_fails() {
    let timestamp = Timestamp {
        seconds: 0,
        nanos: -1,
    };
    let message = wkt::timestamp_to_message(&timestamp).unwrap();
    assert!(JsonCodec::new().marshal(&message).is_err());
}

#[test]
fn duration_canonical_json() {
    let duration = Duration {
        seconds: 1,
        nanos: 340_012,
    };
    let message = wkt::duration_to_message(&duration).unwrap();

    let codec = JsonCodec::new();
    let json = codec.marshal(&message).unwrap();
    assert_eq!(json, r#""1.000340012s""#);

    let decoded = codec
        .unmarshal(&wkt_descriptor("google.protobuf.Duration"), &json)
        .unwrap();
    assert_eq!(wkt::duration_from_message(&decoded).unwrap(), duration);

    let negative = codec
        .unmarshal(&wkt_descriptor("google.protobuf.Duration"), r#""-1.5s""#)
        .unwrap();
    assert_eq!(
        wkt::duration_from_message(&negative).unwrap(),
        Duration {
            seconds: -1,
            nanos: -500_000_000
        }
    );
}

#[test]
fn duration_sign_mismatch_fails() {
    let duration = Duration {
        seconds: 1,
        nanos: -1,
    };
    let message = wkt::duration_to_message(&duration).unwrap();
    assert!(JsonCodec::new().marshal(&message).is_err());
}

#[test]
fn empty_maps_to_empty_object() {
    let message = wkt::empty_message();
    let codec = JsonCodec::new();
    assert_eq!(codec.marshal(&message).unwrap(), "{}");
    assert_eq!(
        codec
            .unmarshal(&wkt_descriptor("google.protobuf.Empty"), "{}")
            .unwrap(),
        message
    );
    assert!(codec
        .unmarshal(&wkt_descriptor("google.protobuf.Empty"), r#"{"nope":1}"#)
        .is_err());
}

#[test]
fn field_mask_joins_camel_case_paths() {
    let mask = FieldMask {
        paths: vec!["foo_bar.baz".to_owned(), "qux".to_owned()],
    };
    let message = wkt::field_mask_to_message(&mask).unwrap();

    let codec = JsonCodec::new();
    let json = codec.marshal(&message).unwrap();
    assert_eq!(json, r#""fooBar.baz,qux""#);

    let decoded = codec
        .unmarshal(&wkt_descriptor("google.protobuf.FieldMask"), &json)
        .unwrap();
    assert_eq!(wkt::field_mask_from_message(&decoded).unwrap(), mask);
}

#[test]
fn struct_and_value_map_to_untagged_json() {
    let codec = JsonCodec::new();
    let desc = wkt_descriptor("google.protobuf.Struct");

    let json = r#"{"null":null,"bool":true,"number":1.5,"string":"s","list":[2.5,"two"],"nested":{"inner":false}}"#;
    let message = codec.unmarshal(&desc, json).unwrap();
    let reencoded = codec.marshal(&message).unwrap();

    let lhs: serde_json::Value = serde_json::from_str(json).unwrap();
    let rhs: serde_json::Value = serde_json::from_str(&reencoded).unwrap();
    assert_eq!(lhs, rhs);

    let host = wkt::struct_from_message(&message).unwrap();
    assert!(host.fields.contains_key("nested"));
}

#[test]
fn list_value_maps_to_array() {
    let codec = JsonCodec::new();
    let desc = wkt_descriptor("google.protobuf.ListValue");
    let message = codec.unmarshal(&desc, r#"[1,null,"x"]"#).unwrap();
    assert_eq!(codec.marshal(&message).unwrap(), r#"[1.0,null,"x"]"#);
    assert_eq!(wkt::list_value_from_message(&message).unwrap().values.len(), 3);
}

#[test]
fn wrapper_types_map_to_primitives() {
    let codec = JsonCodec::new();

    let int64 = codec
        .unmarshal(&wkt_descriptor("google.protobuf.Int64Value"), r#""123""#)
        .unwrap();
    assert_eq!(codec.marshal(&int64).unwrap(), r#""123""#);
    let value: i64 = from_dynamic(&int64).unwrap();
    assert_eq!(value, 123);

    let boolean = codec
        .unmarshal(&wkt_descriptor("google.protobuf.BoolValue"), "true")
        .unwrap();
    assert_eq!(codec.marshal(&boolean).unwrap(), "true");
}

#[test]
fn any_packs_and_unpacks_through_registry() {
    let registry = TypeRegistry::with_well_known_types();
    registry
        .register_file(file(
            "example/person.proto",
            "example",
            vec![message(
                "Person",
                vec![scalar("id", 1, Type::Int32), scalar("name", 2, Type::String)],
            )],
        ))
        .unwrap();

    let mut person = registry.create_message("example.Person").unwrap();
    person.set_field_by_name("id", Value::I32(123)).unwrap();
    person
        .set_field_by_name("name", Value::String("John".to_owned()))
        .unwrap();

    let any = wkt::pack_any(&person).unwrap();
    assert_eq!(any.type_url, "type.googleapis.com/example.Person");

    let unpacked = registry.unpack_any(&any).unwrap();
    assert_eq!(unpacked, person);

    // Unknown payload types are an error.
    let bogus = prost_types::Any {
        type_url: "type.googleapis.com/example.Missing".to_owned(),
        value: vec![],
    };
    assert!(matches!(
        registry.unpack_any(&bogus),
        Err(TranscodeError::UnknownType { .. })
    ));
}

#[test]
fn any_flattens_payload_in_json() {
    let registry = TypeRegistry::with_well_known_types();
    registry
        .register_file(file(
            "example/person.proto",
            "example",
            vec![message(
                "Person",
                vec![scalar("id", 1, Type::Int32), scalar("name", 2, Type::String)],
            )],
        ))
        .unwrap();

    let mut person = registry.create_message("example.Person").unwrap();
    person.set_field_by_name("id", Value::I32(123)).unwrap();

    let any_desc = registry.find_message("google.protobuf.Any").unwrap();
    let any = to_dynamic(&wkt::pack_any(&person).unwrap(), &any_desc).unwrap();

    let codec = JsonCodec::new();
    let json = codec.marshal(&any).unwrap();
    assert_eq!(
        json,
        r#"{"@type":"type.googleapis.com/example.Person","id":123}"#
    );

    let decoded = codec.unmarshal(&any_desc, &json).unwrap();
    assert_eq!(registry.unpack_any(&from_dynamic(&decoded).unwrap()).unwrap(), person);
}

#[test]
fn any_wraps_well_known_payloads_under_value() {
    let registry = TypeRegistry::with_well_known_types();
    let duration = Duration {
        seconds: 3,
        nanos: 0,
    };
    let packed = wkt::pack_any(&wkt::duration_to_message(&duration).unwrap()).unwrap();

    let any_desc = registry.find_message("google.protobuf.Any").unwrap();
    let any = to_dynamic(&packed, &any_desc).unwrap();

    let codec = JsonCodec::new();
    let json = codec.marshal(&any).unwrap();
    assert_eq!(
        json,
        r#"{"@type":"type.googleapis.com/google.protobuf.Duration","value":"3s"}"#
    );

    let decoded = codec.unmarshal(&any_desc, &json).unwrap();
    let unpacked = registry.unpack_any(&from_dynamic(&decoded).unwrap()).unwrap();
    assert_eq!(wkt::duration_from_message(&unpacked).unwrap(), duration);
}

#[test]
fn bridge_rejects_type_mismatch() {
    let message = wkt::duration_to_message(&Duration::default()).unwrap();
    assert!(matches!(
        from_dynamic::<Timestamp>(&message),
        Err(TranscodeError::TypeMismatch { .. })
    ));
    assert!(matches!(
        to_dynamic(
            &Timestamp::default(),
            &wkt_descriptor("google.protobuf.Duration")
        ),
        Err(TranscodeError::TypeMismatch { .. })
    ));
}

#[test]
fn bridge_roundtrips_static_messages() {
    let timestamp = Timestamp {
        seconds: 120,
        nanos: 55,
    };
    let desc = wkt_descriptor("google.protobuf.Timestamp");
    let dynamic = to_dynamic(&timestamp, &desc).unwrap();
    assert_eq!(
        dynamic.get_field_by_name("seconds").unwrap(),
        &Value::I64(120)
    );
    assert_eq!(dynamic.get_field_by_name("nanos").unwrap(), &Value::I32(55));

    let back: Timestamp = from_dynamic(&dynamic).unwrap();
    assert_eq!(back, timestamp);
}
