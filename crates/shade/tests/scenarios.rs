// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Reference scenarios: exact wire bytes, exact rendered text and the
// failure kinds callers rely on.

#![allow(clippy::unreadable_literal)]
#![allow(clippy::missing_panics_doc)]

use shade::config::RECURSIVE_MARKER;
use shade::{
    capture, capture_pointer, codec, new_empty, reflect_struct, serialize, Error, Kind,
    Reflect, StructBuilder, Type,
};
use std::collections::HashMap;

#[derive(Debug, PartialEq)]
struct Node {
    name: String,
    next: Option<Box<Node>>,
}

reflect_struct!(Node { name, next });

#[test]
fn scenario_bool() {
    assert_eq!(codec::encode(&capture(&true)).unwrap(), vec![0x01, 0x01]);
}

#[test]
fn scenario_int() {
    let v = capture(&1isize);
    assert_eq!(v.kind(), Kind::Int);
    assert_eq!(
        codec::encode(&v).unwrap(),
        vec![0x02, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
    );
}

#[test]
fn scenario_string() {
    assert_eq!(
        codec::encode(&capture("1")).unwrap(),
        vec![0x18, 0x08, 0x01, 0x31]
    );
}

#[test]
fn scenario_string_slice() {
    assert_eq!(
        codec::encode(&capture(&vec!["1"])).unwrap(),
        vec![0x17, 0x18, 0x08, 0x01, 0x18, 0x08, 0x01, 0x31]
    );
}

#[test]
fn scenario_string_map() {
    let mut m = HashMap::new();
    m.insert("zero", "1");
    let bytes = codec::encode(&capture(&m)).unwrap();

    let mut expected = vec![0x15, 0x18, 0x18, 0x08, 0x01, 0x18, 0x08, 0x04];
    expected.extend_from_slice(b"zero");
    expected.extend_from_slice(&[0x18, 0x08, 0x01, b'1']);
    assert_eq!(bytes, expected);

    let dst = new_empty(&<HashMap<String, String> as Reflect>::reflect_type());
    assert_eq!(codec::decode(&bytes, &dst), bytes.len());
    assert_eq!(
        dst.map_index(&capture("zero")).unwrap().to_string(),
        "1"
    );
}

#[test]
fn scenario_struct_text() {
    let ty = StructBuilder::new("scenarios::ZeroOne")
        .string_field("Zero")
        .string_field("One")
        .build()
        .unwrap();
    let p = new_empty(&ty);
    p.field("Zero").unwrap().set(&capture("0")).unwrap();
    p.field("One").unwrap().set(&capture("1")).unwrap();
    assert_eq!(serialize(&p), r#"{"Zero":"0","One":"1"}"#);
}

#[test]
fn scenario_shared_pointers() {
    let x = capture_pointer(&String::from("a"));
    let list = new_empty(&Type::slice_of(&Type::string().pointer_to()))
        .elem()
        .unwrap();
    list.append(&[x.clone(), x.clone(), x.clone()]).unwrap();

    let first = list.index(0).unwrap().elem().unwrap();
    assert!(first.same_storage(&list.index(2).unwrap().elem().unwrap()));
    assert_eq!(serialize(&list), r#"["a","a","a"]"#);

    x.elem().unwrap().set(&capture("b")).unwrap();
    assert_eq!(serialize(&list), r#"["b","b","b"]"#);
}

#[test]
fn scenario_self_reference() {
    let a = new_empty(&Node::reflect_type());
    a.field("name").unwrap().set(&capture("a")).unwrap();
    a.field("next").unwrap().set(&a).unwrap();

    let text = serialize(&a);
    assert_eq!(text, r#"{"name":"a","next":"*recursive"}"#);
    assert_eq!(text.matches(RECURSIVE_MARKER).count(), 1);
    assert_eq!(text.matches('{').count(), text.matches('}').count());
    assert!(matches!(codec::encode(&a), Err(Error::CycleDetected(_))));
}

#[test]
fn scenario_uuid_from_text() {
    let text = capture("267b3229-2566-4426-a826-8d80126e719a");
    let id = text.to_uuid();
    assert_eq!(&id.as_bytes()[..4], &[0x26, 0x7b, 0x32, 0x29]);

    let cells = text.convert(&Type::uuid()).unwrap();
    assert_eq!(cells.kind(), Kind::Uuid);
    assert_eq!(cells.index(1).unwrap().to_uint(), 0x7b);
    assert_eq!(cells.to_string(), "267b3229-2566-4426-a826-8d80126e719a");
}

#[test]
fn scenario_negative_to_uint() {
    assert!(matches!(
        capture(&-1isize).try_to_uint(),
        Err(Error::OutOfRange(_))
    ));
}

#[test]
#[should_panic(expected = "to_uint")]
fn scenario_negative_to_uint_panics() {
    let _ = capture(&-1i32).to_uint();
}
