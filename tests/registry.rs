mod common;

use std::{sync::Arc, thread};

use common::*;
use prost_types::field_descriptor_proto::Type;
use protodyn::{TypeRegistry, Value};

#[test]
fn register_and_find() {
    let registry = TypeRegistry::new();
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

    assert!(registry.find_message("example.Person").is_some());
    assert!(registry.find_message("example.Missing").is_none());
    assert!(registry.find_enum("example.Person").is_none());
    assert!(registry.get_file("example/person.proto").is_some());
}

#[test]
fn facade_roundtrip() {
    let registry = TypeRegistry::new();
    registry
        .register_file(file(
            "example/person.proto",
            "example",
            vec![message("Person", vec![scalar("id", 1, Type::Int32)])],
        ))
        .unwrap();

    let mut person = registry.create_message("example.Person").unwrap();
    person.set_field_by_name("id", Value::I32(7)).unwrap();

    let bytes = registry.marshal(&person).unwrap();
    let decoded = registry
        .unmarshal("example.Person", bytes.as_slice())
        .unwrap()
        .unwrap();
    assert_eq!(decoded, person);

    let json = registry.marshal_json(&person).unwrap();
    let from_json = registry
        .unmarshal_json("example.Person", &json)
        .unwrap()
        .unwrap();
    assert_eq!(from_json, person);

    assert!(registry.unmarshal("example.Missing", [].as_slice()).is_none());
}

#[test]
fn dependencies_must_be_registered_first() {
    let registry = TypeRegistry::new();
    let mut dependent = file(
        "example/dep.proto",
        "dep",
        vec![message("Dep", vec![message_field("base", 1, ".base.Base")])],
    );
    dependent.dependency = vec!["example/base.proto".to_owned()];

    assert!(registry.register_file(dependent.clone()).is_err());

    registry
        .register_file(file(
            "example/base.proto",
            "base",
            vec![message("Base", vec![])],
        ))
        .unwrap();
    registry.register_file(dependent).unwrap();
    assert!(registry.find_message("dep.Dep").is_some());
}

#[test]
fn conflicting_registration_leaves_registry_unchanged() {
    let registry = TypeRegistry::new();
    let original = file(
        "example/person.proto",
        "example",
        vec![message("Person", vec![scalar("id", 1, Type::Int32)])],
    );
    registry.register_file(original.clone()).unwrap();

    // Identical registration is a no-op.
    registry.register_file(original).unwrap();

    // A different file under the same name is rejected without effect.
    let conflicting = file(
        "example/person.proto",
        "example",
        vec![message("Person", vec![scalar("id", 1, Type::Int64)])],
    );
    assert!(registry.register_file(conflicting).is_err());
    let person = registry.find_message("example.Person").unwrap();
    assert!(matches!(
        person.get_field(1).unwrap().kind(),
        protodyn::Kind::Int32
    ));
}

#[test]
fn snapshots_are_isolated_from_later_registrations() {
    let registry = TypeRegistry::new();
    registry
        .register_file(file(
            "example/a.proto",
            "a",
            vec![message("A", vec![])],
        ))
        .unwrap();

    let snapshot = registry.snapshot();
    registry
        .register_file(file(
            "example/b.proto",
            "b",
            vec![message("B", vec![])],
        ))
        .unwrap();

    assert!(snapshot.get_message_by_name("a.A").is_some());
    assert!(snapshot.get_message_by_name("b.B").is_none());
    assert!(registry.find_message("b.B").is_some());
}

#[test]
fn concurrent_readers_never_observe_partial_state() {
    let registry = Arc::new(TypeRegistry::new());
    let writers: Vec<_> = (0..4)
        .map(|w| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..25 {
                    let name = format!("pkg{}/file{}.proto", w, i);
                    let package = format!("pkg{}v{}", w, i);
                    registry
                        .register_file(file(
                            &name,
                            &package,
                            vec![message(
                                "Widget",
                                vec![
                                    scalar("a", 1, Type::Int32),
                                    scalar("b", 2, Type::String),
                                ],
                            )],
                        ))
                        .unwrap();
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..200 {
                    for w in 0..4 {
                        for i in 0..25 {
                            let name = format!("pkg{}v{}.Widget", w, i);
                            if let Some(widget) = registry.find_message(&name) {
                                // A visible type is always complete.
                                assert_eq!(widget.fields().len(), 2);
                                assert!(widget.get_field_by_name("a").is_some());
                                assert!(widget.get_field_by_name("b").is_some());
                            }
                        }
                    }
                }
            })
        })
        .collect();

    for handle in writers {
        handle.join().unwrap();
    }
    for handle in readers {
        handle.join().unwrap();
    }

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.files().len(), 100);
}
