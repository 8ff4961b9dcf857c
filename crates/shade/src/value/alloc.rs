// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Zero values, fresh allocations and deep copies.

use crate::error::{Error, Result};
use crate::kind::Kind;
use crate::types::{Shape, Type};
use crate::value::{new_slot, BucketMap, Data, MapEntry, SliceHeader, Slot, Value};
use parking_lot::RwLock;
use std::sync::Arc;

/// Zero contents of `ty`. Reference kinds are nil.
pub(crate) fn zero_data(ty: &Type) -> Data {
    match &ty.shape {
        Shape::Scalar => match ty.raw_kind() {
            Kind::Bool => Data::Bool(false),
            Kind::String => Data::String(String::new()),
            Kind::Float32 | Kind::Float64 => Data::Float(0.0),
            Kind::Complex64 | Kind::Complex128 => Data::Complex(0.0, 0.0),
            k if k.is_signed() => Data::Int(0),
            k if k.is_unsigned() => Data::Uint(0),
            _ => Data::Invalid,
        },
        Shape::Array { elem, len, .. } => {
            Data::Array((0..*len).map(|_| new_slot(zero_data(elem))).collect())
        }
        Shape::Struct { .. } => Data::Struct(
            ty.fields()
                .iter()
                .map(|f| new_slot(zero_data(&f.ty)))
                .collect(),
        ),
        Shape::Slice { .. } => Data::Slice(None),
        Shape::Map { .. } => Data::Map(None),
        Shape::Pointer { .. } => Data::Pointer(None),
        Shape::Chan { .. } => Data::Opaque(None),
        Shape::Opaque => match ty.raw_kind() {
            Kind::Interface => Data::Interface(None),
            _ => Data::Opaque(None),
        },
    }
}

/// Contents of `ty` with its top-level reference header materialised: an
/// empty map, an empty slice, a fresh zero pointee. Other kinds are zero.
pub(crate) fn empty_header(ty: &Type) -> Data {
    match &ty.shape {
        Shape::Slice { .. } => Data::Slice(Some(SliceHeader::empty())),
        Shape::Map { .. } => Data::Map(Some(Arc::new(RwLock::new(BucketMap::new())))),
        Shape::Pointer { elem } => Data::Pointer(Some(new_slot(zero_data(elem)))),
        _ => zero_data(ty),
    }
}

/// Value copy: arrays and structs get fresh element slots, reference kinds
/// keep sharing their targets.
pub(crate) fn copy_data(data: &Data) -> Data {
    match data {
        Data::Array(slots) => Data::Array(copy_slots(slots)),
        Data::Struct(slots) => Data::Struct(copy_slots(slots)),
        other => other.clone(),
    }
}

fn copy_slots(slots: &[Slot]) -> Vec<Slot> {
    slots
        .iter()
        .map(|s| new_slot(copy_data(&s.read())))
        .collect()
}

impl Value {
    /// Zero value of `ty` in fresh, non-addressable storage.
    pub fn zero(ty: &Type) -> Value {
        Value::from_data(ty.clone(), zero_data(ty))
    }
}

/// Pointer to a fresh zero value of `ty`; inner reference headers stay nil.
pub fn new_empty(ty: &Type) -> Value {
    Value::from_data(
        ty.pointer_to(),
        Data::Pointer(Some(new_slot(zero_data(ty)))),
    )
}

/// Pointer to a fresh value of `ty` whose own reference structure exists:
/// an empty map, an empty non-nil slice or a fresh pointee. For a struct the
/// same applies to each direct field. Never recurses further.
pub fn new_populated(ty: &Type) -> Value {
    let data = match &ty.shape {
        Shape::Struct { .. } => Data::Struct(
            ty.fields()
                .iter()
                .map(|f| new_slot(empty_header(&f.ty)))
                .collect(),
        ),
        _ => empty_header(ty),
    };
    Value::from_data(ty.pointer_to(), Data::Pointer(Some(new_slot(data))))
}

/// Structurally identical value with every pointer, map and slice
/// re-allocated. Fails on a reference cycle; the source is never modified.
pub fn new_deep(src: &Value) -> Result<Value> {
    let mut copier = DeepCopier::default();
    let data = copier.copy(&src.ty, &src.load_or_zero())?;
    Ok(Value::from_data(src.ty.clone(), data))
}

#[derive(Default)]
struct DeepCopier {
    ancestry: Vec<(usize, usize)>,
}

impl DeepCopier {
    fn enter(&mut self, ty: &Type, addr: usize) -> Result<()> {
        let key = (ty.id(), addr);
        if self.ancestry.contains(&key) {
            return Err(Error::CycleDetected(ty.name().to_string()));
        }
        self.ancestry.push(key);
        Ok(())
    }

    fn leave(&mut self) {
        self.ancestry.pop();
    }

    fn copy_slot(&mut self, ty: &Type, slot: &Slot) -> Result<Slot> {
        let data = slot.read().clone();
        Ok(new_slot(self.copy(ty, &data)?))
    }

    fn copy(&mut self, ty: &Type, data: &Data) -> Result<Data> {
        let copied = match (&ty.shape, data) {
            (Shape::Array { elem, .. }, Data::Array(slots)) => Data::Array(
                slots
                    .iter()
                    .map(|s| self.copy_slot(elem, s))
                    .collect::<Result<_>>()?,
            ),
            (Shape::Struct { .. }, Data::Struct(slots)) => Data::Struct(
                ty.fields()
                    .iter()
                    .zip(slots)
                    .map(|(f, s)| self.copy_slot(&f.ty, s))
                    .collect::<Result<_>>()?,
            ),
            (Shape::Slice { elem }, Data::Slice(Some(header))) => {
                self.enter(ty, header.addr())?;
                let slots = header
                    .elements()
                    .iter()
                    .map(|s| self.copy_slot(elem, s))
                    .collect::<Result<Vec<_>>>();
                self.leave();
                Data::Slice(Some(SliceHeader::new(slots?, header.len)))
            }
            (Shape::Map { value, .. }, Data::Map(Some(map))) => {
                self.enter(ty, Arc::as_ptr(map) as usize)?;
                let entries: Vec<_> = map
                    .read()
                    .iter()
                    .map(|(k, e)| (k.clone(), e.clone()))
                    .collect();
                let mut store = BucketMap::with_capacity(entries.len());
                let mut failed = None;
                for (hashed, entry) in entries {
                    match self.copy_slot(value, &entry.value) {
                        Ok(slot) => {
                            store.insert(
                                hashed,
                                MapEntry {
                                    key: entry.key.copied(),
                                    value: slot,
                                },
                            );
                        }
                        Err(e) => {
                            failed = Some(e);
                            break;
                        }
                    }
                }
                self.leave();
                if let Some(e) = failed {
                    return Err(e);
                }
                Data::Map(Some(Arc::new(RwLock::new(store))))
            }
            (Shape::Pointer { elem }, Data::Pointer(Some(target))) => {
                self.enter(elem, Arc::as_ptr(target) as usize)?;
                let slot = self.copy_slot(elem, target);
                self.leave();
                Data::Pointer(Some(slot?))
            }
            (_, Data::Interface(Some(inner))) => {
                let data = self.copy(&inner.ty, &inner.load_or_zero())?;
                Data::Interface(Some(Box::new(Value::from_data(inner.ty.clone(), data))))
            }
            (_, other) => other.clone(),
        };
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StructBuilder;
    use crate::{capture, serialize};
    use std::collections::HashMap;

    #[test]
    fn test_new_empty_keeps_inner_nil() {
        let m = Type::map_of(&Type::string(), &Type::int()).unwrap();
        let p = new_empty(&m);
        assert_eq!(p.kind(), Kind::Pointer);
        assert!(!p.is_nil());
        assert!(p.elem().unwrap().is_nil());
    }

    #[test]
    fn test_new_populated_materialises_one_level() {
        let m = Type::map_of(&Type::string(), &Type::int()).unwrap();
        let map = new_populated(&m).elem().unwrap();
        assert!(!map.is_nil());
        assert_eq!(map.len().unwrap(), 0);

        let pp = Type::int().pointer_to().pointer_to();
        let inner = new_populated(&pp).elem().unwrap().elem().unwrap();
        assert_eq!(inner.kind(), Kind::Pointer);
        assert!(inner.is_nil());

        let holder = StructBuilder::new("alloc_test::Holder")
            .slice_field("items", &Type::int())
            .pointer_field("next", &Type::int())
            .build()
            .unwrap();
        let h = new_populated(&holder).elem().unwrap();
        assert!(!h.field("items").unwrap().is_nil());
        assert!(!h.field("next").unwrap().is_nil());
    }

    #[test]
    fn test_deep_copy_is_disjoint() {
        let mut src = HashMap::new();
        src.insert("k".to_string(), vec![Box::new(1i32), Box::new(2)]);
        let v = capture(&src);
        let copy = new_deep(&v).unwrap();
        assert_eq!(serialize(&copy), serialize(&v));

        let a = v.map_index(&capture("k")).unwrap().index(0).unwrap().elem().unwrap();
        let b = copy.map_index(&capture("k")).unwrap().index(0).unwrap().elem().unwrap();
        assert!(!a.same_storage(&b));
        b.set(&capture(&9i32)).unwrap();
        assert_eq!(a.to_int(), 1);
    }

    #[test]
    fn test_deep_copy_detects_cycle() {
        let node = crate::types::registry().declare_struct("alloc_test::Node");
        crate::types::registry()
            .define_struct(
                &node,
                vec![crate::types::FieldSpec::new("next", node.pointer_to())],
            )
            .unwrap();
        let p = new_empty(&node);
        p.elem().unwrap().field("next").unwrap().set(&p).unwrap();
        assert!(matches!(new_deep(&p), Err(Error::CycleDetected(_))));
    }
}
