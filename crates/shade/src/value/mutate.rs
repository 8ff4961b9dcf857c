// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Mutation: set, set-by-index, append, extend and key deletion.
//!
//! Sources of a different type are converted to the destination type first.
//! Arrays and structs are assigned element by element into the existing
//! slots, so handles to their elements keep observing the destination.

use crate::error::{Error, Result};
use crate::kind::Kind;
use crate::types::{Shape, Type};
use crate::value::{
    copy_data, empty_header, new_slot, zero_data, BucketMap, Data, MapEntry, MapKey, SliceHeader, Slot,
    Value,
};
use parking_lot::RwLock;
use std::sync::Arc;

/// Store `src` into `dst` with value semantics.
pub(crate) fn assign(dst: &Slot, src: Data) {
    let targets = match (&*dst.read(), &src) {
        (Data::Struct(d), Data::Struct(s)) | (Data::Array(d), Data::Array(s))
            if d.len() == s.len() =>
        {
            Some(d.clone())
        }
        _ => None,
    };
    match (targets, src) {
        (Some(targets), Data::Struct(sources) | Data::Array(sources)) => {
            for (target, source) in targets.iter().zip(sources) {
                if Arc::ptr_eq(target, &source) {
                    continue;
                }
                let data = source.read().clone();
                assign(target, data);
            }
        }
        (_, src) => *dst.write() = src,
    }
}

/// Index argument of `set_index` on a positional container.
fn position(key: &Value) -> Result<usize> {
    let i = key.try_to_int()?;
    usize::try_from(i).map_err(|_| Error::OutOfRange(format!("negative index {i}")))
}

/// Contents of `src` as type `ty`.
fn coerce(src: &Value, ty: &Type) -> Result<Data> {
    if src.ty == *ty {
        Ok(copy_data(&src.load_or_zero()))
    } else {
        Ok(src.convert(ty)?.load_or_zero())
    }
}

/// Contents for slots revealed by growing a slice of `elem`.
fn revealed(elem: &Type) -> Data {
    if matches!(elem.raw_kind(), Kind::Map | Kind::Slice | Kind::Pointer) {
        empty_header(elem)
    } else {
        zero_data(elem)
    }
}

impl Value {
    fn check_settable(&self) -> Result<()> {
        if self.can_set() {
            Ok(())
        } else {
            Err(self.not_settable())
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.is_read_only() || self.slot.is_none() {
            Err(self.not_settable())
        } else {
            Ok(())
        }
    }

    /// Overwrite this value with `src`, converting when the types differ.
    pub fn set(&self, src: &Value) -> Result<()> {
        self.check_settable()?;
        let data = coerce(src, &self.ty)?;
        if let Some(slot) = &self.slot {
            assign(slot, data);
        }
        Ok(())
    }

    /// Set element, entry or field `key` to `src` and return the resulting
    /// container.
    ///
    /// A slice index past the end grows the slice. An invalid `src` deletes a
    /// map key. A struct takes a position or a field name. A string is
    /// immutable: the result is a new string with one byte replaced.
    pub fn set_index(&self, key: &Value, src: &Value) -> Result<Value> {
        let v = self.unwrap_interface();
        match v.ty.raw_kind() {
            Kind::Pointer => {
                v.elem()?.set_index(key, src)?;
                Ok(v)
            }
            Kind::Array => {
                v.check_settable()?;
                v.index(position(key)?)?.set(src)?;
                Ok(v)
            }
            Kind::Slice => {
                let i = position(key)?;
                let v = if i >= v.len()? {
                    v.extend(i + 1 - v.len()?)?
                } else {
                    v
                };
                v.index(i)?.set(src)?;
                Ok(v)
            }
            Kind::Map => {
                if !src.is_valid() {
                    v.delete_key(key)?;
                } else {
                    v.insert_entry(key, src)?;
                }
                Ok(v)
            }
            Kind::Struct => {
                v.check_settable()?;
                let field = if key.kind() == Kind::String {
                    v.field(&key.try_to_string()?)?
                } else {
                    v.index(position(key)?)?
                };
                field.set(src)?;
                Ok(v)
            }
            Kind::String => {
                let i = position(key)?;
                let mut bytes = v.try_to_string()?.into_bytes();
                let len = bytes.len();
                let byte = bytes
                    .get_mut(i)
                    .ok_or_else(|| Error::OutOfRange(format!("index {i} with length {len}")))?;
                *byte = u8::try_from(src.try_to_uint()?)
                    .map_err(|_| Error::OutOfRange("byte value above 255".into()))?;
                let s = String::from_utf8(bytes)
                    .map_err(|e| Error::parse(format!("{:?}", e.as_bytes()), "string", e))?;
                Ok(Value::from_data(v.ty.clone(), Data::String(s)))
            }
            _ => Err(Error::kind_mismatch(
                "set_index",
                "array, slice, map, struct or string",
                v.kind(),
            )),
        }
    }

    fn insert_entry(&self, key: &Value, src: &Value) -> Result<()> {
        self.check_writable()?;
        let (key_ty, value_ty) = match &self.ty.shape {
            Shape::Map { key, value, .. } => (key.clone(), value.clone()),
            _ => return Err(Error::kind_mismatch("set_index", "map", self.kind())),
        };
        let key = key.convert(&key_ty)?.copied();
        let hashed = MapKey::from_value(&key)?;
        let value = new_slot(coerce(src, &value_ty)?);

        let map = match self.load_or_zero() {
            Data::Map(Some(map)) => map,
            _ => {
                // Assigning into a nil map materialises it in place.
                self.check_settable()?;
                let map = Arc::new(RwLock::new(BucketMap::new()));
                self.store(Data::Map(Some(map.clone())))?;
                map
            }
        };
        map.write().insert(hashed, MapEntry { key, value });
        Ok(())
    }

    /// Remove `key` from a map. Absent keys and nil maps are a no-op.
    pub fn delete_key(&self, key: &Value) -> Result<()> {
        let v = self.unwrap_interface();
        let key_ty = match &v.ty.shape {
            Shape::Map { key, .. } => key.clone(),
            _ => return Err(Error::kind_mismatch("delete_key", "map", v.kind())),
        };
        v.check_writable()?;
        let hashed = MapKey::from_value(&key.convert(&key_ty)?)?;
        if let Data::Map(Some(map)) = v.load_or_zero() {
            map.write().remove(&hashed);
        }
        Ok(())
    }

    /// Append `values` to a slice, converting each to the element type.
    ///
    /// A settable slice is updated in place and returned; otherwise a new
    /// slice handle is returned and `self` is left untouched.
    pub fn append(&self, values: &[Value]) -> Result<Value> {
        let v = self.unwrap_interface();
        let elem = v.slice_elem("append")?;
        let data = values
            .iter()
            .map(|value| coerce(value, &elem))
            .collect::<Result<Vec<_>>>()?;
        v.grow(data.len(), |slots| {
            for (slot, data) in slots.iter().zip(data) {
                assign(slot, data);
            }
        })
    }

    /// Grow a slice by `n` elements. Revealed map, slice and pointer slots
    /// receive empty headers rather than nil.
    pub fn extend(&self, n: usize) -> Result<Value> {
        let v = self.unwrap_interface();
        let elem = v.slice_elem("extend")?;
        v.grow(n, |slots| {
            for slot in slots {
                *slot.write() = revealed(&elem);
            }
        })
    }

    fn slice_elem(&self, op: &'static str) -> Result<Type> {
        match &self.ty.shape {
            Shape::Slice { elem } => Ok(elem.clone()),
            _ => Err(Error::kind_mismatch(op, "slice", self.kind())),
        }
    }

    /// Lengthen by `n`, reallocating with doubled capacity when needed, and
    /// hand the `n` new slots to `fill`.
    fn grow(&self, n: usize, fill: impl FnOnce(&[Slot])) -> Result<Value> {
        if self.is_read_only() {
            return Err(self.not_settable());
        }
        let elem = self.slice_elem("grow")?;
        let old = match self.load_or_zero() {
            Data::Slice(header) => header,
            _ => None,
        };
        let (len, cap) = old.as_ref().map_or((0, 0), |h| (h.len, h.cap()));
        let new_len = len + n;

        let header = match old {
            Some(mut h) if new_len <= cap => {
                h.len = new_len;
                h
            }
            old => {
                let mut new_cap = cap.max(4);
                while new_cap < new_len {
                    new_cap *= 2;
                }
                log::trace!("slice {} grows {} -> {}", self.ty.name(), cap, new_cap);
                let mut backing: Vec<Slot> = old
                    .as_ref()
                    .map(|h| {
                        h.elements()
                            .iter()
                            .map(|s| new_slot(copy_data(&s.read())))
                            .collect()
                    })
                    .unwrap_or_default();
                backing.extend((len..new_cap).map(|_| new_slot(zero_data(&elem))));
                SliceHeader::new(backing, new_len)
            }
        };
        fill(&header.elements()[len..new_len]);

        let data = Data::Slice(Some(header));
        if self.can_set() {
            self.store(data)?;
            Ok(self.clone())
        } else {
            Ok(Value::from_data(self.ty.clone(), data))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StructBuilder;
    use crate::{capture, capture_pointer, new_empty, serialize};
    use std::collections::HashMap;

    #[test]
    fn test_set_converts() {
        let p = new_empty(&Type::of_kind(Kind::Int16).unwrap());
        let dst = p.elem().unwrap();
        dst.set(&capture("123")).unwrap();
        assert_eq!(dst.to_int(), 123);
        assert!(matches!(
            dst.set(&capture(&100_000i64)),
            Err(Error::OutOfRange(_))
        ));
        assert!(matches!(
            capture(&1i16).set(&capture(&2i16)),
            Err(Error::NotSettable(_))
        ));
    }

    #[test]
    fn test_set_struct_keeps_field_handles() {
        let ty = StructBuilder::new("mutate_test::Point")
            .kind_field("x", Kind::Int)
            .kind_field("y", Kind::Int)
            .build()
            .unwrap();
        let a = new_empty(&ty).elem().unwrap();
        let x = a.field("x").unwrap();

        let b = new_empty(&ty).elem().unwrap();
        b.field("x").unwrap().set(&capture(&5isize)).unwrap();
        a.set(&b).unwrap();
        assert_eq!(x.to_int(), 5);

        // Copy, not alias.
        b.field("x").unwrap().set(&capture(&6isize)).unwrap();
        assert_eq!(x.to_int(), 5);
    }

    #[test]
    fn test_set_index_slice_grows() {
        let p = capture_pointer(&vec![1i32]);
        let s = p.elem().unwrap();
        s.set_index(&capture(&3isize), &capture(&9i32)).unwrap();
        assert_eq!(s.len().unwrap(), 4);
        assert_eq!(serialize(&s), "[1,0,0,9]");
    }

    #[test]
    fn test_set_index_map_insert_and_delete() {
        let p = capture_pointer(&HashMap::<String, i64>::new());
        let m = p.elem().unwrap();
        m.set_index(&capture("a"), &capture(&1i64)).unwrap();
        m.set_index(&capture("b"), &capture("2")).unwrap();
        assert_eq!(m.len().unwrap(), 2);
        assert_eq!(m.map_index(&capture("b")).unwrap().to_int(), 2);

        m.set_index(&capture("a"), &Value::invalid()).unwrap();
        assert_eq!(m.len().unwrap(), 1);
        assert!(m.map_index(&capture("a")).unwrap().is_nil());

        // A nil map is materialised when settable.
        let nil_map = new_empty(&Type::map_of(&Type::string(), &Type::int()).unwrap());
        let nm = nil_map.elem().unwrap();
        nm.set_index(&capture("k"), &capture(&1isize)).unwrap();
        assert_eq!(nm.len().unwrap(), 1);
    }

    #[test]
    fn test_set_index_struct_by_name_and_position() {
        let ty = StructBuilder::new("mutate_test::Named")
            .string_field("a")
            .string_field("b")
            .build()
            .unwrap();
        let s = new_empty(&ty).elem().unwrap();
        s.set_index(&capture("b"), &capture("B")).unwrap();
        s.set_index(&capture(&0isize), &capture("A")).unwrap();
        assert_eq!(serialize(&s), r#"{"a":"A","b":"B"}"#);
    }

    #[test]
    fn test_set_index_string_returns_new() {
        let s = capture("cat");
        let t = s.set_index(&capture(&0isize), &capture(&b'b')).unwrap();
        assert_eq!(t.to_string(), "bat");
        assert_eq!(s.to_string(), "cat");
    }

    #[test]
    fn test_append_reallocates_and_detaches() {
        let p = capture_pointer(&vec![1u16, 2]);
        let s = p.elem().unwrap();
        let first = s.index(0).unwrap();
        let grown = s.append(&[capture(&3u16), capture(&4i64)]).unwrap();
        assert_eq!(grown.len().unwrap(), 4);
        assert!(grown.cap().unwrap() >= 4);
        assert_eq!(serialize(&p), "[1,2,3,4]");
        // The old backing array is no longer shared.
        first.set(&capture(&7u16)).unwrap();
        assert_eq!(s.index(0).unwrap().to_uint(), 1);
    }

    #[test]
    fn test_append_on_unaddressable_returns_new() {
        let s = capture(&vec![1u8]);
        let grown = s.append(&[capture(&2u8)]).unwrap();
        assert_eq!(s.len().unwrap(), 1);
        assert_eq!(grown.len().unwrap(), 2);
    }

    #[test]
    fn test_extend_reveals_empty_headers() {
        let inner = Type::map_of(&Type::string(), &Type::int()).unwrap();
        let p = new_empty(&Type::slice_of(&inner));
        let s = p.elem().unwrap();
        s.extend(2).unwrap();
        assert_eq!(s.len().unwrap(), 2);
        let m = s.index(1).unwrap();
        assert!(!m.is_nil());
        m.set_index(&capture("k"), &capture(&1isize)).unwrap();
        assert_eq!(serialize(&p), r#"[{},{"k":1}]"#);
    }
}
