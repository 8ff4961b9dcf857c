// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Randomised property checks over capture, allocation, navigation,
// conversion, the codec and the map walk.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_panics_doc)]

use chrono::{TimeZone, Utc};
use shade::config::RECURSIVE_MARKER;
use shade::{
    capture, capture_pointer, codec, new_deep, new_empty, reflect_struct, serialize,
    BucketMap, Error, Kind, Reflect, SerializeConfig, Serializer, Type, Value,
};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
struct Sample {
    id: u32,
    label: String,
    readings: Vec<f64>,
    tags: HashMap<String, i64>,
}

reflect_struct!(Sample {
    id: r#"json:"id""#,
    label: r#"json:"label""#,
    readings: r#"json:"readings""#,
    tags: r#"json:"tags""#,
});

#[derive(Debug, PartialEq)]
struct Hop {
    name: String,
    next: Option<Box<Hop>>,
}

reflect_struct!(Hop { name, next });

fn sorted(v: &Value) -> String {
    Serializer::with_config(SerializeConfig::default().with_sort_keys(true)).serialize(v)
}

fn random_sample(rng: &mut fastrand::Rng) -> Sample {
    let readings = (0..rng.usize(0..6))
        .map(|_| f64::from(rng.i32(-1000..1000)) / 8.0)
        .collect();
    let tags = (0..rng.usize(0..12))
        .map(|i| (format!("t{i}"), rng.i64(..)))
        .collect();
    Sample {
        id: rng.u32(..),
        label: (0..rng.usize(0..10)).map(|_| rng.alphanumeric()).collect(),
        readings,
        tags,
    }
}

#[test]
fn capture_round_trips_through_text_and_bytes() {
    let mut rng = fastrand::Rng::with_seed(11);
    for _ in 0..50 {
        let sample = random_sample(&mut rng);
        let v = capture(&sample);

        let text = serialize(&v);
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["id"], serde_json::json!(sample.id));
        assert_eq!(parsed["tags"].as_object().unwrap().len(), sample.tags.len());

        let bytes = codec::encode(&v).unwrap();
        let dst = new_empty(&Sample::reflect_type());
        assert_eq!(codec::try_decode(&bytes, &dst), Ok(bytes.len()));
        assert_eq!(sorted(&dst), sorted(&v));
        assert_eq!(dst.extract::<Sample>().unwrap(), sample);
    }
}

#[test]
fn deep_copy_is_identical_and_disjoint() {
    let mut rng = fastrand::Rng::with_seed(12);
    let src = capture_pointer(&random_sample(&mut rng));
    let copy = new_deep(&src).unwrap();
    assert_eq!(copy.ty(), src.ty());
    assert_eq!(sorted(&copy), sorted(&src));
    assert!(!copy.elem().unwrap().same_storage(&src.elem().unwrap()));

    let before = sorted(&src);
    copy.field("label").unwrap().set(&capture("changed")).unwrap();
    copy.field("readings").unwrap().append(&[capture(&1.0f64)]).unwrap();
    copy.field("tags")
        .unwrap()
        .set_index(&capture("fresh"), &capture(&1i64))
        .unwrap();
    assert_eq!(sorted(&src), before);
}

#[test]
fn deep_copy_refuses_cycles() {
    let a = new_empty(&Hop::reflect_type());
    a.field("next").unwrap().set(&a).unwrap();
    assert!(matches!(new_deep(&a), Err(Error::CycleDetected(_))));
}

#[test]
fn navigation_is_idempotent() {
    let nested = capture(&Box::new(Box::new(5i16)));
    let deep = nested.elem_deep();
    assert_eq!(deep.kind(), Kind::Int16);
    assert!(deep.same_storage(&deep.elem_deep()));

    let any = capture(&vec!["x"]).boxed();
    let once = any.unwrap_interface();
    let twice = once.unwrap_interface();
    assert_eq!(once.kind(), Kind::Slice);
    assert!(once.same_storage(&twice));

    let plain = capture(&3u8);
    assert!(plain.unwrap_interface().same_storage(&plain));
}

#[test]
fn for_each_visits_len_items() {
    let mut rng = fastrand::Rng::with_seed(13);
    let sample = random_sample(&mut rng);
    let values = [
        capture(&sample),
        capture(&sample.readings),
        capture(&sample.tags),
        capture(&sample.label),
        capture(&[1u8, 2, 3, 4]),
    ];
    for v in &values {
        let mut visited = 0;
        v.for_each(|_, _, _| visited += 1).unwrap();
        assert_eq!(visited, v.len().unwrap(), "{}", v.ty().name());
    }
}

#[test]
fn total_conversion_cells_never_fail() {
    let mut rng = fastrand::Rng::with_seed(14);
    for _ in 0..200 {
        let i = rng.i32(..);
        let v = capture(&i);
        assert_eq!(v.try_to_bool().unwrap(), i != 0);
        assert_eq!(v.try_to_float().unwrap(), f64::from(i));
        let text = v.try_to_string().unwrap();
        assert_eq!(capture(&text).try_to_int().unwrap(), i64::from(i));
        assert_eq!(v.try_to_bytes().unwrap(), i.to_le_bytes().to_vec());

        let u = rng.u16(..);
        assert_eq!(capture(&u).try_to_int().unwrap(), i64::from(u));

        let b = rng.bool();
        assert_eq!(capture(&b).try_to_uint().unwrap(), u64::from(b));
        assert_eq!(capture(&b).try_to_string().unwrap(), b.to_string());
    }

    let t = Utc.with_ymd_and_hms(2023, 3, 4, 5, 6, 7).unwrap();
    let cell = capture(&t);
    assert_eq!(
        cell.try_to_int().unwrap(),
        t.timestamp_nanos_opt().unwrap()
    );
    assert!(cell.try_to_bool().unwrap());
    assert_eq!(cell.try_to_string().unwrap(), "2023-03-04T05:06:07Z");

    let id = uuid::Uuid::from_bytes([0x5a; 16]);
    let text = capture(&id).try_to_string().unwrap();
    assert_eq!(capture(&text).try_to_uuid().unwrap(), id);
}

#[test]
fn overflow_is_reported_never_wrapped() {
    let u8_ty = Type::of_kind(Kind::Uint8).unwrap();
    assert!(matches!(
        capture(&300i32).convert(&u8_ty),
        Err(Error::OutOfRange(_))
    ));
    assert!(matches!(
        capture(&u64::MAX).convert(&Type::of_kind(Kind::Int64).unwrap()),
        Err(Error::OutOfRange(_))
    ));
    assert!(matches!(
        capture(&1e20f64).try_to_int(),
        Err(Error::OutOfRange(_))
    ));
    assert!(matches!(
        capture(&-1i8).try_to_uint(),
        Err(Error::OutOfRange(_))
    ));

    let slot = capture_pointer(&0u8).elem().unwrap();
    assert!(slot.set(&capture(&256u16)).is_err());
    assert_eq!(slot.to_uint(), 0);
}

#[test]
fn cycles_render_one_marker() {
    let a = new_empty(&Hop::reflect_type());
    let b = new_empty(&Hop::reflect_type());
    a.field("name").unwrap().set(&capture("a")).unwrap();
    b.field("name").unwrap().set(&capture("b")).unwrap();
    a.field("next").unwrap().set(&b).unwrap();
    b.field("next").unwrap().set(&a).unwrap();

    for root in [&a, &b] {
        let text = serialize(root);
        assert_eq!(text.matches(RECURSIVE_MARKER).count(), 1, "{text}");
        assert!(serde_json::from_str::<serde_json::Value>(&text).is_ok());
    }
}

#[test]
fn length_prefix_is_minimal() {
    let cases: [(usize, Kind, usize); 6] = [
        (0, Kind::Uint8, 1),
        (255, Kind::Uint8, 1),
        (256, Kind::Uint16, 2),
        (65_535, Kind::Uint16, 2),
        (65_536, Kind::Uint32, 4),
        (u32::MAX as usize + 1, Kind::Uint, 8),
    ];
    for (len, kind, width) in cases {
        assert_eq!(codec::prefix_kind(len), (kind, width), "{len}");
    }

    let long = "x".repeat(300);
    let bytes = codec::encode(&capture(&long)).unwrap();
    assert_eq!(bytes[1], Kind::Uint16.as_u8());
    assert_eq!(&bytes[2..4], &300u16.to_le_bytes());
    assert_eq!(bytes.len(), 4 + 300);
}

#[test]
fn map_walk_is_complete() {
    let mut rng = fastrand::Rng::with_seed(15);
    let mut table = BucketMap::new();
    let mut reference = HashMap::new();
    for _ in 0..5000 {
        let k = rng.u32(0..700);
        if rng.u8(0..4) == 0 {
            assert_eq!(table.remove(&k), reference.remove(&k));
        } else {
            let v = rng.u64(..);
            assert_eq!(table.insert(k, v), reference.insert(k, v));
        }
    }
    let walked: HashMap<u32, u64> = table.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(walked.len(), table.len());
    assert_eq!(walked, reference);

    let mut host = HashMap::new();
    for i in 0..200 {
        host.insert(format!("k{i}"), i);
    }
    let m = capture(&host);
    for i in (0..200).step_by(3) {
        m.delete_key(&capture(&format!("k{i}"))).unwrap();
    }
    assert_eq!(m.len().unwrap(), 200 - 67);
    assert_eq!(m.entries().unwrap().len(), m.len().unwrap());
    for (key, value) in m.entries().unwrap() {
        assert_eq!(format!("k{}", value.to_int()), key.to_string());
    }
}
