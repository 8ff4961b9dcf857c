// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Container coercions: array/slice views, struct/map/slice reshaping and
//! JSON text held in strings or bytes.

use crate::error::{Error, Result};
use crate::kind::Kind;
use crate::types::{registry, Shape, StructField, Type};
use crate::value::{
    new_slot, zero_data, BucketMap, Data, Flags, MapEntry, MapKey, SliceHeader, Value,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Name a field takes under `tag`, `None` when the tag skips it.
fn name_under(field: &StructField, tag: Option<&str>) -> Option<String> {
    match tag {
        Some(tag) => field.name_for_tag(tag),
        None => Some(field.name.clone()),
    }
}

/// `map[string]any`.
fn any_map_type() -> Type {
    registry().map_of_hashable(&Type::string(), &Type::interface())
}

/// Map handle of type `ty` over `(key, value)` pairs already of the key and
/// value types.
fn build_map(ty: &Type, entries: Vec<(Value, Value)>) -> Result<Value> {
    let mut store = BucketMap::with_capacity(entries.len());
    for (key, value) in entries {
        store.insert(
            MapKey::from_value(&key)?,
            MapEntry {
                key: key.copied(),
                value: value.copied().into_slot(),
            },
        );
    }
    Ok(Value::from_data(
        ty.clone(),
        Data::Map(Some(Arc::new(RwLock::new(store)))),
    ))
}

fn build_slice(ty: &Type, items: Vec<Value>) -> Value {
    let len = items.len();
    let slots = items.into_iter().map(|v| v.copied().into_slot()).collect();
    Value::from_data(ty.clone(), Data::Slice(Some(SliceHeader::new(slots, len))))
}

/// Elements of an array or slice, fields of a struct.
fn items_of(v: &Value) -> Result<Option<Vec<Value>>> {
    match v.ty.raw_kind() {
        Kind::Array | Kind::Slice | Kind::Struct => {
            let items = (0..v.len()?).map(|i| v.index(i)).collect::<Result<_>>()?;
            Ok(Some(items))
        }
        _ => Ok(None),
    }
}

/// Text of a string or bytes value that holds a JSON object or array.
fn json_text(v: &Value) -> Option<String> {
    if !matches!(v.kind(), Kind::String | Kind::Bytes) {
        return None;
    }
    let text = v.try_to_string().ok()?;
    let trimmed = text.trim();
    let object = trimmed.starts_with('{') && trimmed.ends_with('}');
    let array = trimmed.starts_with('[') && trimmed.ends_with(']');
    (object || array).then(|| trimmed.to_string())
}

fn json_to_value(json: &serde_json::Value) -> Value {
    use serde_json::Value as Json;
    match json {
        Json::Null => Value::zero(&Type::interface()),
        Json::Bool(b) => Value::scalar(Kind::Bool, Data::Bool(*b)),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::scalar(Kind::Int, Data::Int(i))
            } else if let Some(u) = n.as_u64() {
                Value::scalar(Kind::Uint64, Data::Uint(u))
            } else {
                Value::scalar(Kind::Float64, Data::Float(n.as_f64().unwrap_or_default()))
            }
        }
        Json::String(s) => Value::from_string(s.as_str()),
        Json::Array(items) => build_slice(
            &Type::slice_of(&Type::interface()),
            items.iter().map(|j| json_to_value(j).boxed()).collect(),
        ),
        Json::Object(fields) => {
            let ty = any_map_type();
            let mut store = BucketMap::with_capacity(fields.len());
            for (name, j) in fields {
                store.insert(
                    MapKey::String(name.clone()),
                    MapEntry {
                        key: Value::from_string(name.as_str()),
                        value: json_to_value(j).boxed().into_slot(),
                    },
                );
            }
            Value::from_data(ty, Data::Map(Some(Arc::new(RwLock::new(store)))))
        }
    }
}

impl Value {
    /// Parse JSON text into `map[string]any`, `[]any` or a basic value.
    /// Integral numbers become `int`, others `float64`.
    pub fn from_json(text: &str) -> Result<Value> {
        let json: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| Error::parse(text, "json", e))?;
        Ok(json_to_value(&json))
    }

    /// Array view of a slice, sharing its element storage.
    pub fn to_array(&self) -> Result<Value> {
        let v = self.elem_deep();
        match (&v.ty.shape, v.load_or_zero()) {
            (Shape::Array { .. }, _) => Ok(v),
            (Shape::Slice { elem }, Data::Slice(header)) => {
                let slots = header.map(|h| h.elements().to_vec()).unwrap_or_default();
                let ty = Type::array_of(elem, slots.len());
                Ok(Value::from_data(ty, Data::Array(slots))
                    .with_flags(Flags::ADDRESSABLE | (v.flags & Flags::READ_ONLY)))
            }
            _ => Err(Error::unconvertible(v.ty.name(), "array")),
        }
    }

    /// Slice view of an array (`len == cap == N`, shared element storage).
    /// Strings give their bytes and structs their fields as `[]any`.
    pub fn to_slice(&self) -> Result<Value> {
        let v = self.elem_deep();
        match (&v.ty.shape, v.load_or_zero()) {
            (Shape::Slice { .. }, _) => Ok(v),
            (Shape::Array { len, .. }, Data::Array(slots)) => {
                let ty = v
                    .ty
                    .slice_type()
                    .ok_or_else(|| Error::unconvertible(v.ty.name(), "slice"))?;
                Ok(Value::from_data(ty, Data::Slice(Some(SliceHeader::new(slots, *len))))
                    .with_flags(v.flags & Flags::READ_ONLY))
            }
            (_, Data::String(s)) => Ok(Value::from_bytes(s.as_bytes())),
            (Shape::Struct { .. }, _) => {
                let fields = items_of(&v)?.unwrap_or_default();
                Ok(build_slice(
                    &Type::slice_of(&Type::interface()),
                    fields.iter().map(Value::boxed).collect(),
                ))
            }
            _ => Err(Error::unconvertible(v.ty.name(), "slice")),
        }
    }

    /// `map[string]any` of a struct's fields, named under `tag` when given.
    /// A map is returned as is; JSON object text is parsed.
    pub fn to_map(&self, tag: Option<&str>) -> Result<Value> {
        let v = self.elem_deep();
        match v.ty.raw_kind() {
            Kind::Map => Ok(v),
            Kind::Struct if v.kind() != Kind::Time => {
                let mut entries = Vec::with_capacity(v.ty.num_field());
                for field in v.ty.fields() {
                    if let Some(name) = name_under(field, tag) {
                        entries.push((Value::from_string(name), v.index(field.index)?.boxed()));
                    }
                }
                build_map(&any_map_type(), entries)
            }
            _ => match json_text(&v) {
                Some(text) if text.starts_with('{') => Value::from_json(&text),
                _ => Err(Error::unconvertible(v.ty.name(), "map")),
            },
        }
    }

    /// Struct of type `ty` from a map (by field name under `tag`), a slice or
    /// array (by position), another struct (by field name) or JSON text.
    /// Missing fields are zero.
    pub fn to_struct(&self, ty: &Type, tag: Option<&str>) -> Result<Value> {
        if ty.raw_kind() != Kind::Struct {
            return Err(Error::kind_mismatch("to_struct", "struct type", ty.kind()));
        }
        let v = self.elem_deep();
        if v.ty == *ty {
            return Ok(v.copied());
        }
        let fields = ty.fields();
        let values: Vec<Option<Value>> = match v.ty.raw_kind() {
            Kind::Map => {
                let mut by_name = HashMap::new();
                for (key, value) in v.entries()? {
                    by_name.insert(key.try_to_string()?, value);
                }
                fields
                    .iter()
                    .map(|f| name_under(f, tag).and_then(|n| by_name.remove(&n)))
                    .collect()
            }
            Kind::Array | Kind::Slice if v.kind() != Kind::Bytes => {
                let items = items_of(&v)?.unwrap_or_default();
                if items.len() > fields.len() {
                    return Err(Error::OutOfRange(format!(
                        "{} elements for {} fields of {}",
                        items.len(),
                        fields.len(),
                        ty.name()
                    )));
                }
                let mut items = items.into_iter();
                fields.iter().map(|_| items.next()).collect()
            }
            Kind::Struct => fields
                .iter()
                .map(|f| v.field(&f.name).ok())
                .collect(),
            Kind::Interface => return Err(Error::NilAccess("interface")),
            _ => {
                return match json_text(&v) {
                    Some(text) => Value::from_json(&text)?.to_struct(ty, tag.or(Some("json"))),
                    None => Err(Error::unconvertible(v.ty.name(), ty.name())),
                }
            }
        };

        let mut slots = Vec::with_capacity(fields.len());
        for (field, value) in fields.iter().zip(values) {
            let slot = match value {
                Some(value) if value.is_valid() => value.convert(&field.ty)?.copied().into_slot(),
                _ => new_slot(zero_data(&field.ty)),
            };
            slots.push(slot);
        }
        Ok(Value::from_data(ty.clone(), Data::Struct(slots)))
    }
}

/// Conversion between composite descriptors. `v` is neither a pointer nor an
/// interface.
pub(crate) fn convert(v: &Value, ty: &Type) -> Result<Value> {
    if let Some(text) = json_text(v) {
        let parsed = Value::from_json(&text)?;
        return match ty.raw_kind() {
            Kind::Struct => parsed.to_struct(ty, Some("json")),
            _ => parsed.convert(ty),
        };
    }
    match &ty.shape {
        Shape::Array { elem, len, .. } => {
            let items = items_of(v)?.ok_or_else(|| Error::unconvertible(v.ty.name(), ty.name()))?;
            if items.len() != *len {
                return Err(Error::OutOfRange(format!(
                    "{} elements for {}",
                    items.len(),
                    ty.name()
                )));
            }
            let slots = items
                .iter()
                .map(|item| Ok(item.convert(elem)?.copied().into_slot()))
                .collect::<Result<_>>()?;
            Ok(Value::from_data(ty.clone(), Data::Array(slots)))
        }
        Shape::Slice { elem } => {
            if v.ty.raw_kind() == Kind::Slice && v.is_nil() {
                return Ok(Value::zero(ty));
            }
            let items = match (v.ty.raw_kind(), v.load_or_zero()) {
                (_, Data::String(s)) => Value::from_bytes(s.as_bytes())
                    .to_array()
                    .and_then(|a| items_of(&a))?,
                _ => items_of(v)?,
            }
            .ok_or_else(|| Error::unconvertible(v.ty.name(), ty.name()))?;
            let converted = items
                .iter()
                .map(|item| item.convert(elem))
                .collect::<Result<_>>()?;
            Ok(build_slice(ty, converted))
        }
        Shape::Map { key, value, .. } => match v.ty.raw_kind() {
            Kind::Map if v.is_nil() => Ok(Value::zero(ty)),
            Kind::Map => {
                let entries = v
                    .entries()?
                    .iter()
                    .map(|(k, val)| Ok((k.convert(key)?, val.convert(value)?)))
                    .collect::<Result<_>>()?;
                build_map(ty, entries)
            }
            Kind::Struct => v.to_map(None)?.convert(ty),
            _ => Err(Error::unconvertible(v.ty.name(), ty.name())),
        },
        Shape::Struct { .. } => v.to_struct(ty, None),
        _ => Err(Error::unconvertible(v.ty.name(), ty.name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StructBuilder;
    use crate::{capture, serialize};
    use std::collections::BTreeMap;

    fn point() -> Type {
        StructBuilder::new("container_test::Point")
            .tagged_field("X", &Type::int(), r#"json:"x""#)
            .tagged_field("Y", &Type::int(), r#"json:"y""#)
            .tagged_field("Hidden", &Type::string(), r#"json:"-""#)
            .build()
            .unwrap()
    }

    #[test]
    fn test_slice_view_shares_storage() {
        let arr = crate::capture_pointer(&[1i32, 2, 3]).elem().unwrap();
        let s = arr.to_slice().unwrap();
        assert_eq!(s.len(), Ok(3));
        assert_eq!(s.cap(), Ok(3));
        s.index(0).unwrap().set(&capture(&9i32)).unwrap();
        assert_eq!(arr.index(0).unwrap().to_int(), 9);

        let back = s.to_array().unwrap();
        assert_eq!(back.ty(), arr.ty());
        assert!(back.index(2).unwrap().same_storage(&arr.index(2).unwrap()));
    }

    #[test]
    fn test_struct_map_round_trip_with_tag() {
        let p = crate::new_empty(&point()).elem().unwrap();
        p.field("X").unwrap().set(&capture(&1isize)).unwrap();
        p.field("Y").unwrap().set(&capture(&2isize)).unwrap();

        let m = p.to_map(Some("json")).unwrap();
        assert_eq!(m.len(), Ok(2));
        assert_eq!(m.map_index(&capture("x")).unwrap().to_int(), 1);

        let back = m.to_struct(&point(), Some("json")).unwrap();
        assert_eq!(back.field("Y").unwrap().to_int(), 2);
        assert_eq!(back.field("Hidden").unwrap().to_string(), "");
    }

    #[test]
    fn test_slice_to_struct_positional() {
        let s = capture(&vec!["3", "4"]);
        let p = s.to_struct(&point(), None).unwrap();
        assert_eq!(p.field("X").unwrap().to_int(), 3);
        assert_eq!(p.field("Y").unwrap().to_int(), 4);
        let long = capture(&vec![1, 2, 3, 4]);
        assert!(matches!(long.to_struct(&point(), None), Err(Error::OutOfRange(_))));
    }

    #[test]
    fn test_json_bytes_into_containers() {
        let raw = Value::from_bytes(br#"{"x": 5, "y": -1}"#);
        let p = raw.convert(&point()).unwrap();
        assert_eq!(p.field("X").unwrap().to_int(), 5);

        let m: BTreeMap<String, i64> = raw
            .convert(&crate::descriptor_of(&BTreeMap::<String, i64>::new()))
            .unwrap()
            .extract()
            .unwrap();
        assert_eq!(m["y"], -1);

        let list = capture("[1, 2.5, true]")
            .convert(&Type::slice_of(&Type::float64()))
            .unwrap();
        assert_eq!(serialize(&list), "[1,2.5,1]");
    }

    #[test]
    fn test_from_json_shapes() {
        let v = Value::from_json(r#"{"a": [1, "b", null]}"#).unwrap();
        assert_eq!(v.kind(), Kind::Map);
        let a = v.map_index(&capture("a")).unwrap().unwrap_interface();
        assert_eq!(a.kind(), Kind::Slice);
        assert_eq!(a.index(0).unwrap().unwrap_interface().kind(), Kind::Int);
        assert!(a.index(2).unwrap().is_nil());
        assert!(matches!(Value::from_json("{"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_elementwise_array_conversion() {
        let u16s = Type::of_kind(Kind::Uint16).unwrap();
        let v = capture(&vec![1u8, 2]).convert(&Type::array_of(&u16s, 2)).unwrap();
        assert_eq!(v.kind(), Kind::Array);
        assert_eq!(v.index(1).unwrap().to_uint(), 2);
        assert!(matches!(
            capture(&vec![1u8]).convert(&Type::array_of(&u16s, 2)),
            Err(Error::OutOfRange(_))
        ));
        assert!(matches!(
            capture(&vec![-1i8]).convert(&Type::slice_of(&u16s)),
            Err(Error::OutOfRange(_))
        ));
    }
}
