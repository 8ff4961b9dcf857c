// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Navigation: length, indexing, field and key lookup, dereference and
//! iteration. Every entry point unwraps interfaces before descending.

use crate::error::{Error, Result};
use crate::kind::Kind;
use crate::types::Shape;
use crate::value::{Data, Flags, MapKey, Slot, Value};

impl Value {
    /// Concrete handle behind an interface; identity otherwise and for a nil
    /// interface.
    pub fn unwrap_interface(&self) -> Value {
        let mut current = self.clone();
        while current.ty.raw_kind() == Kind::Interface {
            match current.load() {
                Some(Data::Interface(Some(inner))) => {
                    let mut inner = *inner;
                    inner.flags |= current.flags & Flags::READ_ONLY;
                    current = inner;
                }
                _ => break,
            }
        }
        current
    }

    /// Unwrapped handle, failing on a nil interface.
    fn concrete(&self, op: &'static str) -> Result<Value> {
        let v = self.unwrap_interface();
        if v.ty.raw_kind() == Kind::Interface {
            return Err(Error::NilAccess(op));
        }
        Ok(v)
    }

    /// Number of elements, entries, bytes or fields.
    pub fn len(&self) -> Result<usize> {
        let v = self.concrete("len")?;
        let len = match (&v.ty.shape, v.load_or_zero()) {
            (Shape::Array { len, .. }, _) => *len,
            (_, Data::Slice(header)) => header.map_or(0, |h| h.len),
            (_, Data::Map(map)) => map.map_or(0, |m| m.read().len()),
            (_, Data::String(s)) => s.len(),
            (Shape::Struct { .. }, _) => v.ty.num_field(),
            _ => {
                return Err(Error::kind_mismatch(
                    "len",
                    "array, slice, map, string or struct",
                    v.kind(),
                ))
            }
        };
        Ok(len)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Capacity of a slice or array.
    pub fn cap(&self) -> Result<usize> {
        let v = self.concrete("cap")?;
        match (&v.ty.shape, v.load_or_zero()) {
            (Shape::Array { len, .. }, _) => Ok(*len),
            (_, Data::Slice(header)) => Ok(header.map_or(0, |h| h.cap())),
            _ => Err(Error::kind_mismatch("cap", "array or slice", v.kind())),
        }
    }

    /// Element `i` of an array, slice or string (as a `uint8`), field `i` of
    /// a struct. A pointer is dereferenced first.
    pub fn index(&self, i: usize) -> Result<Value> {
        let v = self.concrete("index")?;
        let out_of_range = |len: usize| Error::OutOfRange(format!("index {i} with length {len}"));
        match (&v.ty.shape, v.load_or_zero()) {
            (Shape::Array { elem, .. }, Data::Array(slots)) => {
                let slot = slots.get(i).ok_or_else(|| out_of_range(slots.len()))?;
                Ok(v.child(elem.clone(), slot.clone()))
            }
            (Shape::Slice { elem }, Data::Slice(header)) => {
                let elements = header.as_ref().map_or(&[][..], |h| h.elements());
                let slot = elements.get(i).ok_or_else(|| out_of_range(elements.len()))?;
                let flags = Flags::ADDRESSABLE | (v.flags & Flags::READ_ONLY);
                Ok(Value::at(elem.clone(), slot.clone(), flags))
            }
            (_, Data::String(s)) => {
                let b = s.as_bytes().get(i).ok_or_else(|| out_of_range(s.len()))?;
                let byte = Value::scalar(Kind::Uint8, Data::Uint(*b as u64));
                Ok(byte.with_flags(v.flags & Flags::READ_ONLY))
            }
            (Shape::Struct { .. }, Data::Struct(slots)) => {
                let field = v
                    .ty
                    .fields()
                    .get(i)
                    .ok_or_else(|| out_of_range(v.ty.num_field()))?;
                let slot = slots
                    .get(field.index)
                    .ok_or_else(|| out_of_range(slots.len()))?;
                Ok(v.child(field.ty.clone(), slot.clone()))
            }
            (Shape::Pointer { .. }, _) => v.elem()?.index(i),
            _ => Err(Error::kind_mismatch(
                "index",
                "array, slice, string, struct or pointer",
                v.kind(),
            )),
        }
    }

    pub(crate) fn with_flags(mut self, extra: Flags) -> Value {
        self.flags |= extra;
        self
    }

    /// Value stored under `key`, converted to the key type first. An absent
    /// key gives a handle of the value type with no storage.
    pub fn map_index(&self, key: &Value) -> Result<Value> {
        let v = self.concrete("map_index")?;
        let (key_ty, value_ty) = match &v.ty.shape {
            Shape::Map { key, value, .. } => (key.clone(), value.clone()),
            _ => return Err(Error::kind_mismatch("map_index", "map", v.kind())),
        };
        let hashed = MapKey::from_value(&key.convert(&key_ty)?)?;
        let found: Option<Slot> = match v.load_or_zero() {
            Data::Map(Some(map)) => map.read().get(&hashed).map(|e| e.value.clone()),
            _ => None,
        };
        Ok(match found {
            Some(slot) => Value::at(value_ty, slot, v.flags & Flags::READ_ONLY),
            None => Value::nil(&value_ty),
        })
    }

    /// Struct field by name. A pointer to a struct is dereferenced first.
    pub fn field(&self, name: &str) -> Result<Value> {
        let v = self.struct_target("field")?;
        let index = v
            .ty
            .field(name)
            .map(|f| f.index)
            .ok_or_else(|| Error::FieldNotFound(format!("{}.{}", v.ty.name(), name)))?;
        v.index(index)
    }

    /// Struct field whose `tag_name` tag names it `tag_value`.
    pub fn field_by_tag(&self, tag_name: &str, tag_value: &str) -> Result<Value> {
        let v = self.struct_target("field_by_tag")?;
        let index = v
            .ty
            .field_by_tag(tag_name, tag_value)
            .map(|f| f.index)
            .ok_or_else(|| {
                Error::FieldNotFound(format!("{}[{tag_name}={tag_value}]", v.ty.name()))
            })?;
        v.index(index)
    }

    fn struct_target(&self, op: &'static str) -> Result<Value> {
        let v = self.concrete(op)?;
        let v = if v.ty.raw_kind() == Kind::Pointer { v.elem()? } else { v };
        if v.ty.raw_kind() != Kind::Struct {
            return Err(Error::kind_mismatch(op, "struct", v.kind()));
        }
        Ok(v)
    }

    /// One dereference: pointee of a pointer, concrete value of an interface.
    pub fn elem(&self) -> Result<Value> {
        match self.ty.raw_kind() {
            Kind::Pointer => match self.load() {
                Some(Data::Pointer(Some(target))) => Ok(Value::at(
                    self.ty.elem(),
                    target,
                    Flags::ADDRESSABLE | (self.flags & Flags::READ_ONLY),
                )),
                _ => Err(Error::NilAccess("pointer")),
            },
            Kind::Interface => self.concrete("interface"),
            _ => Err(Error::kind_mismatch("elem", "pointer or interface", self.kind())),
        }
    }

    /// Chase pointers and interfaces to the first value that is neither,
    /// stopping early at a nil.
    pub fn elem_deep(&self) -> Value {
        let mut current = self.unwrap_interface();
        while current.ty.raw_kind() == Kind::Pointer {
            match current.elem() {
                Ok(next) => current = next.unwrap_interface(),
                Err(_) => break,
            }
        }
        current
    }

    /// Visit every element as `(position, key, value)`.
    ///
    /// Arrays, slices and strings pass an empty key, structs the field name,
    /// maps the key rendered as text in bucket-walk order. Pointers are
    /// dereferenced first; a nil container visits nothing.
    pub fn for_each<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(usize, &str, &Value),
    {
        let v = self.elem_deep();
        if v.ty.raw_kind() == Kind::Interface || v.ty.raw_kind() == Kind::Pointer {
            return Ok(());
        }
        match v.ty.raw_kind() {
            Kind::Array | Kind::Slice | Kind::String => {
                for i in 0..v.len()? {
                    f(i, "", &v.index(i)?);
                }
            }
            Kind::Struct => {
                for (i, field) in v.ty.fields().iter().enumerate() {
                    f(i, &field.name, &v.index(i)?);
                }
            }
            Kind::Map => {
                for (i, (key, value)) in v.entries()?.iter().enumerate() {
                    f(i, &key.try_to_string()?, value);
                }
            }
            _ => {
                return Err(Error::kind_mismatch(
                    "for_each",
                    "array, slice, string, struct or map",
                    v.kind(),
                ))
            }
        }
        Ok(())
    }

    /// Map entries in bucket-walk order. The walk is a snapshot: later
    /// mutation of the map does not affect it.
    pub fn entries(&self) -> Result<Vec<(Value, Value)>> {
        let v = self.concrete("entries")?;
        let value_ty = match &v.ty.shape {
            Shape::Map { value, .. } => value.clone(),
            _ => return Err(Error::kind_mismatch("entries", "map", v.kind())),
        };
        let read_only = v.flags & Flags::READ_ONLY;
        Ok(match v.load_or_zero() {
            Data::Map(Some(map)) => map
                .read()
                .values()
                .map(|e| {
                    (
                        e.key.clone().with_flags(read_only),
                        Value::at(value_ty.clone(), e.value.clone(), read_only),
                    )
                })
                .collect(),
            _ => Vec::new(),
        })
    }

    /// Map keys in bucket-walk order.
    pub fn keys(&self) -> Result<Vec<Value>> {
        Ok(self.entries()?.into_iter().map(|(k, _)| k).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StructBuilder, Type};
    use crate::{capture, capture_pointer};
    use std::collections::HashMap;

    #[test]
    fn test_len_by_kind() {
        assert_eq!(capture(&[1i32, 2, 3]).len(), Ok(3));
        assert_eq!(capture(&vec!["a", "b"]).len(), Ok(2));
        assert_eq!(capture("héllo").len(), Ok(6));
        assert_eq!(Value::zero(&Type::slice_of(&Type::int())).len(), Ok(0));
        assert!(matches!(
            capture(&true).len(),
            Err(Error::KindMismatch { op: "len", .. })
        ));
    }

    #[test]
    fn test_index_string_and_out_of_range() {
        let s = capture("AB");
        let b = s.index(1).unwrap();
        assert_eq!(b.kind(), Kind::Uint8);
        assert_eq!(b.to_uint(), b'B' as u64);
        assert!(matches!(s.index(2), Err(Error::OutOfRange(_))));
    }

    #[test]
    fn test_index_through_pointer() {
        let p = capture(&Box::new([10i64, 20]));
        assert_eq!(p.index(1).unwrap().to_int(), 20);
        assert!(p.index(1).unwrap().can_set());
    }

    #[test]
    fn test_map_index_absent_is_nil() {
        let mut m = HashMap::new();
        m.insert("a".to_string(), 1i32);
        let v = capture(&m);
        assert_eq!(v.map_index(&capture("a")).unwrap().to_int(), 1);
        let absent = v.map_index(&capture("zz")).unwrap();
        assert!(absent.is_nil());
        assert_eq!(absent.kind(), Kind::Int32);
    }

    #[test]
    fn test_field_and_tag_lookup() {
        let ty = StructBuilder::new("navigate_test::Pair")
            .tagged_field("Left", &Type::string(), r#"json:"l""#)
            .field("Right", &Type::int())
            .build()
            .unwrap();
        let p = crate::new_empty(&ty);
        assert!(p.field("Left").unwrap().can_set());
        assert_eq!(p.field_by_tag("json", "l").unwrap().kind(), Kind::String);
        assert!(matches!(p.field("Nope"), Err(Error::FieldNotFound(_))));
        assert!(matches!(
            capture(&1i32).field("x"),
            Err(Error::KindMismatch { op: "field", .. })
        ));
    }

    #[test]
    fn test_elem_and_unwrap_are_idempotent() {
        let boxed = capture(&Box::new(Box::new(7u8)));
        let deep = boxed.elem_deep();
        assert_eq!(deep.kind(), Kind::Uint8);
        assert!(deep.same_storage(&deep.elem_deep()));

        let any = capture(&7i32).boxed();
        let once = any.unwrap_interface();
        assert_eq!(once.kind(), Kind::Int32);
        assert!(once.same_storage(&once.unwrap_interface()));

        let nil_any = Value::zero(&Type::interface());
        assert!(nil_any.unwrap_interface().is_nil());
        assert!(matches!(nil_any.elem(), Err(Error::NilAccess(_))));
        assert!(matches!(
            Value::zero(&Type::int().pointer_to()).elem(),
            Err(Error::NilAccess(_))
        ));
    }

    #[test]
    fn test_for_each_visits_len_items() {
        let mut m = HashMap::new();
        for i in 0..50 {
            m.insert(format!("k{i}"), i);
        }
        let v = capture(&m);
        let mut seen = Vec::new();
        v.for_each(|i, key, value| {
            assert_eq!(value.to_int(), key[1..].parse::<i64>().unwrap());
            seen.push(i);
        })
        .unwrap();
        assert_eq!(seen.len(), v.len().unwrap());

        let mut keys = Vec::new();
        let s = capture(&vec![1u16, 2]);
        s.for_each(|_, key, _| keys.push(key.to_string())).unwrap();
        assert_eq!(keys, vec!["", ""]);

        let nil = Value::zero(&Type::slice_of(&Type::int()));
        nil.for_each(|_, _, _| panic!("nil slice has no elements")).unwrap();
    }

    #[test]
    fn test_for_each_names_typed_keys() {
        let mut m = HashMap::new();
        m.insert(-7i64, true);
        m.insert(12i64, false);
        let mut keys = Vec::new();
        capture(&m)
            .for_each(|_, key, value| keys.push((key.to_string(), value.to_bool())))
            .unwrap();
        keys.sort();
        assert_eq!(
            keys,
            vec![("-7".to_string(), true), ("12".to_string(), false)]
        );
    }

    #[test]
    fn test_read_only_propagates() {
        let p = capture_pointer(&vec![vec![1u32]]).read_only();
        let inner = p.elem().unwrap().index(0).unwrap().index(0).unwrap();
        assert!(inner.is_read_only());
    }
}
