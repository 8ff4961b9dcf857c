// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Capture of host values into handles, and extraction back out.

use crate::error::{Error, Result};
use crate::kind::Kind;
use crate::types::{registry, FieldSpec, Type};
use crate::value::{
    new_slot, zero_data, BucketMap, Data, MapEntry, MapKey, SliceHeader, Slot, Value,
};
use chrono::{DateTime, FixedOffset, Utc};
use parking_lot::RwLock;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

/// Host types with a descriptor that can be captured into a [`Value`].
pub trait Reflect {
    /// Interned descriptor of the host type.
    fn reflect_type() -> Type;

    /// Handle over a fresh copy of `self`. Not addressable.
    fn capture(&self) -> Value;
}

/// Host types that can be read back out of a [`Value`].
pub trait FromValue: Sized {
    fn from_value(v: &Value) -> Result<Self>;
}

/// Host types usable as map keys.
pub trait ReflectKey: Reflect {}

/// Handle over a copy of `value`.
pub fn capture<T: Reflect + ?Sized>(value: &T) -> Value {
    value.capture()
}

/// Pointer to an addressable copy of `value`.
pub fn capture_pointer<T: Reflect + ?Sized>(value: &T) -> Value {
    value.capture().pointer()
}

/// Descriptor of a host value's type.
pub fn descriptor_of<T: Reflect + ?Sized>(_: &T) -> Type {
    T::reflect_type()
}

pub fn kind_of<T: Reflect + ?Sized>(_: &T) -> Kind {
    T::reflect_type().kind()
}

impl Value {
    /// Read the handle back into a host value, converting where needed.
    pub fn extract<T: FromValue>(&self) -> Result<T> {
        T::from_value(self)
    }

    /// Pointer whose pointee is this handle's storage.
    pub fn pointer(&self) -> Value {
        let target = self
            .slot
            .clone()
            .unwrap_or_else(|| new_slot(zero_data(&self.ty)));
        Value::from_data(self.ty.pointer_to(), Data::Pointer(Some(target)))
    }

    /// Storage slot, allocating a zero value when absent.
    pub(crate) fn into_slot(self) -> Slot {
        match self.slot {
            Some(slot) => slot,
            None => new_slot(zero_data(&self.ty)),
        }
    }
}

macro_rules! impl_reflect_int {
    ($($t:ty => $kind:ident, $variant:ident, $wide:ty, $read:ident;)*) => {$(
        impl Reflect for $t {
            fn reflect_type() -> Type {
                registry().scalar(Kind::$kind)
            }

            fn capture(&self) -> Value {
                Value::scalar(Kind::$kind, Data::$variant(*self as $wide))
            }
        }

        impl FromValue for $t {
            fn from_value(v: &Value) -> Result<Self> {
                let wide = v.$read()?;
                <$t>::try_from(wide).map_err(|_| {
                    Error::OutOfRange(format!("{} does not fit {}", wide, stringify!($t)))
                })
            }
        }

        impl ReflectKey for $t {}
    )*};
}

impl_reflect_int! {
    i8 => Int8, Int, i64, try_to_int;
    i16 => Int16, Int, i64, try_to_int;
    i32 => Int32, Int, i64, try_to_int;
    i64 => Int64, Int, i64, try_to_int;
    isize => Int, Int, i64, try_to_int;
    u8 => Uint8, Uint, u64, try_to_uint;
    u16 => Uint16, Uint, u64, try_to_uint;
    u32 => Uint32, Uint, u64, try_to_uint;
    u64 => Uint64, Uint, u64, try_to_uint;
    usize => Uint, Uint, u64, try_to_uint;
}

impl Reflect for bool {
    fn reflect_type() -> Type {
        Type::bool()
    }

    fn capture(&self) -> Value {
        Value::scalar(Kind::Bool, Data::Bool(*self))
    }
}

impl FromValue for bool {
    fn from_value(v: &Value) -> Result<Self> {
        v.try_to_bool()
    }
}

impl ReflectKey for bool {}

impl Reflect for f32 {
    fn reflect_type() -> Type {
        registry().scalar(Kind::Float32)
    }

    fn capture(&self) -> Value {
        Value::scalar(Kind::Float32, Data::Float(*self as f64))
    }
}

impl FromValue for f32 {
    fn from_value(v: &Value) -> Result<Self> {
        let wide = v.try_to_float()?;
        if wide.is_finite() && wide.abs() > f32::MAX as f64 {
            return Err(Error::OutOfRange(format!("{wide} does not fit f32")));
        }
        Ok(wide as f32)
    }
}

impl ReflectKey for f32 {}

impl Reflect for f64 {
    fn reflect_type() -> Type {
        Type::float64()
    }

    fn capture(&self) -> Value {
        Value::scalar(Kind::Float64, Data::Float(*self))
    }
}

impl FromValue for f64 {
    fn from_value(v: &Value) -> Result<Self> {
        v.try_to_float()
    }
}

impl ReflectKey for f64 {}

impl Reflect for str {
    fn reflect_type() -> Type {
        Type::string()
    }

    fn capture(&self) -> Value {
        Value::from_string(self)
    }
}

impl ReflectKey for str {}

impl Reflect for String {
    fn reflect_type() -> Type {
        Type::string()
    }

    fn capture(&self) -> Value {
        Value::from_string(self.as_str())
    }
}

impl FromValue for String {
    fn from_value(v: &Value) -> Result<Self> {
        v.try_to_string()
    }
}

impl ReflectKey for String {}

impl<T: Reflect + ?Sized> Reflect for &T {
    fn reflect_type() -> Type {
        T::reflect_type()
    }

    fn capture(&self) -> Value {
        (**self).capture()
    }
}

impl<T: ReflectKey + ?Sized> ReflectKey for &T {}

fn slots_of<'a, T: Reflect + 'a>(items: impl Iterator<Item = &'a T>) -> Vec<Slot> {
    items.map(|item| item.capture().into_slot()).collect()
}

impl<T: Reflect> Reflect for [T] {
    fn reflect_type() -> Type {
        Type::slice_of(&T::reflect_type())
    }

    fn capture(&self) -> Value {
        let slots = slots_of(self.iter());
        Value::from_data(
            Self::reflect_type(),
            Data::Slice(Some(SliceHeader::new(slots, self.len()))),
        )
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn reflect_type() -> Type {
        <[T]>::reflect_type()
    }

    fn capture(&self) -> Value {
        self.as_slice().capture()
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(v: &Value) -> Result<Self> {
        let v = v.elem_deep();
        if v.is_nil() {
            return Ok(Vec::new());
        }
        (0..v.len()?).map(|i| T::from_value(&v.index(i)?)).collect()
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn reflect_type() -> Type {
        Type::array_of(&T::reflect_type(), N)
    }

    fn capture(&self) -> Value {
        Value::from_data(Self::reflect_type(), Data::Array(slots_of(self.iter())))
    }
}

impl<T: FromValue, const N: usize> FromValue for [T; N] {
    fn from_value(v: &Value) -> Result<Self> {
        let items: Vec<T> = Vec::from_value(v)?;
        let len = items.len();
        items
            .try_into()
            .map_err(|_| Error::OutOfRange(format!("expected {N} elements, found {len}")))
    }
}

fn map_value<'a, K, V>(ty: Type, len: usize, entries: impl Iterator<Item = (&'a K, &'a V)>) -> Value
where
    K: ReflectKey + 'a,
    V: Reflect + 'a,
{
    let mut store = BucketMap::with_capacity(len);
    for (k, v) in entries {
        let key = k.capture();
        match MapKey::from_value(&key) {
            Ok(hashed) => {
                store.insert(
                    hashed,
                    MapEntry {
                        key,
                        value: v.capture().into_slot(),
                    },
                );
            }
            Err(e) => log::error!("{} key dropped: {e}", ty.name()),
        }
    }
    Value::from_data(ty, Data::Map(Some(Arc::new(RwLock::new(store)))))
}

impl<K: ReflectKey, V: Reflect, S> Reflect for HashMap<K, V, S> {
    fn reflect_type() -> Type {
        registry().map_of_hashable(&K::reflect_type(), &V::reflect_type())
    }

    fn capture(&self) -> Value {
        map_value(Self::reflect_type(), self.len(), self.iter())
    }
}

impl<K, V, S> FromValue for HashMap<K, V, S>
where
    K: FromValue + Eq + Hash,
    V: FromValue,
    S: BuildHasher + Default,
{
    fn from_value(v: &Value) -> Result<Self> {
        v.elem_deep()
            .entries()?
            .iter()
            .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
            .collect()
    }
}

impl<K: ReflectKey, V: Reflect> Reflect for BTreeMap<K, V> {
    fn reflect_type() -> Type {
        registry().map_of_hashable(&K::reflect_type(), &V::reflect_type())
    }

    fn capture(&self) -> Value {
        map_value(Self::reflect_type(), self.len(), self.iter())
    }
}

impl<K: FromValue + Ord, V: FromValue> FromValue for BTreeMap<K, V> {
    fn from_value(v: &Value) -> Result<Self> {
        v.elem_deep()
            .entries()?
            .iter()
            .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
            .collect()
    }
}

impl<T: Reflect + ?Sized> Reflect for Box<T> {
    fn reflect_type() -> Type {
        T::reflect_type().pointer_to()
    }

    fn capture(&self) -> Value {
        (**self).capture().pointer()
    }
}

impl<T: FromValue> FromValue for Box<T> {
    fn from_value(v: &Value) -> Result<Self> {
        let target = if v.kind() == Kind::Pointer { v.elem()? } else { v.clone() };
        T::from_value(&target).map(Box::new)
    }
}

impl<T: Reflect> Reflect for Option<Box<T>> {
    fn reflect_type() -> Type {
        T::reflect_type().pointer_to()
    }

    fn capture(&self) -> Value {
        match self {
            Some(inner) => inner.capture(),
            None => Value::from_data(Self::reflect_type(), Data::Pointer(None)),
        }
    }
}

impl<T: FromValue> FromValue for Option<Box<T>> {
    fn from_value(v: &Value) -> Result<Self> {
        if v.is_nil() {
            Ok(None)
        } else {
            Box::from_value(v).map(Some)
        }
    }
}

impl Reflect for DateTime<FixedOffset> {
    fn reflect_type() -> Type {
        Type::time()
    }

    fn capture(&self) -> Value {
        Value::from_time_parts(
            self.timestamp(),
            self.timestamp_subsec_nanos(),
            self.offset().local_minus_utc(),
        )
    }
}

impl FromValue for DateTime<FixedOffset> {
    fn from_value(v: &Value) -> Result<Self> {
        v.try_to_time()
    }
}

impl ReflectKey for DateTime<FixedOffset> {}

impl Reflect for DateTime<Utc> {
    fn reflect_type() -> Type {
        Type::time()
    }

    fn capture(&self) -> Value {
        Value::from_time_parts(self.timestamp(), self.timestamp_subsec_nanos(), 0)
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(v: &Value) -> Result<Self> {
        Ok(v.try_to_time()?.with_timezone(&Utc))
    }
}

impl ReflectKey for DateTime<Utc> {}

impl Reflect for uuid::Uuid {
    fn reflect_type() -> Type {
        Type::uuid()
    }

    fn capture(&self) -> Value {
        Value::from_uuid_bytes(*self.as_bytes())
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(v: &Value) -> Result<Self> {
        v.try_to_uuid()
    }
}

impl ReflectKey for uuid::Uuid {}

/// Handles capture as `any`.
impl Reflect for Value {
    fn reflect_type() -> Type {
        Type::interface()
    }

    fn capture(&self) -> Value {
        self.boxed()
    }
}

impl FromValue for Value {
    fn from_value(v: &Value) -> Result<Self> {
        Ok(v.unwrap_interface())
    }
}

// -----------------------------------------------------------------------
// Support for `reflect_struct!`
// -----------------------------------------------------------------------

thread_local! {
    static DEFINING: RefCell<HashSet<String>> = RefCell::new(HashSet::new());
}

/// Descriptor of a named host struct, defining it on first use.
///
/// A field that refers back to the struct being defined (through a pointer)
/// sees the declared descriptor.
///
/// # Panics
///
/// Panics when the definition is rejected: a malformed tag or a repeated
/// field name.
pub fn reflect_struct_type(
    name: &str,
    fields: impl FnOnce() -> Vec<(&'static str, Type, &'static str)>,
) -> Type {
    let ty = registry().declare_struct(name);
    if ty.is_defined() {
        return ty;
    }
    if !DEFINING.with(|d| d.borrow_mut().insert(name.to_string())) {
        return ty;
    }
    let specs: Vec<FieldSpec> = fields()
        .into_iter()
        .map(|(field, ty, tag)| FieldSpec::new(field, ty).with_tag(tag))
        .collect();
    DEFINING.with(|d| d.borrow_mut().remove(name));

    if let Err(e) = registry().define_struct(&ty, specs) {
        log::error!("cannot define {name}: {e}");
        panic!("reflect_struct!({name}): {e}");
    }
    ty
}

/// Descriptor of the field a projection closure selects.
pub fn field_type<S, T, F>(_: F) -> Type
where
    T: Reflect + ?Sized,
    F: for<'a> Fn(&'a S) -> &'a T,
{
    T::reflect_type()
}

/// Struct handle over captured field values, in declaration order.
pub fn capture_struct(ty: &Type, fields: Vec<Value>) -> Value {
    let slots = fields.into_iter().map(Value::into_slot).collect();
    Value::from_data(ty.clone(), Data::Struct(slots))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_scalar_kinds() {
        assert_eq!(kind_of(&true), Kind::Bool);
        assert_eq!(kind_of(&1isize), Kind::Int);
        assert_eq!(kind_of(&1i64), Kind::Int64);
        assert_eq!(kind_of(&1usize), Kind::Uint);
        assert_eq!(kind_of(&1u8), Kind::Uint8);
        assert_eq!(kind_of(&1.5f32), Kind::Float32);
        assert_eq!(kind_of("s"), Kind::String);
        assert_eq!(kind_of(&String::new()), Kind::String);
    }

    #[test]
    fn test_container_kinds() {
        assert_eq!(kind_of(&vec![1u8]), Kind::Bytes);
        assert_eq!(kind_of(&vec![1u16]), Kind::Slice);
        assert_eq!(kind_of(&[0u8; 16]), Kind::Uuid);
        assert_eq!(kind_of(&[0u8; 4]), Kind::Array);
        assert_eq!(kind_of(&HashMap::<String, i32>::new()), Kind::Map);
        assert_eq!(kind_of(&Box::new(1i32)), Kind::Pointer);
        assert_eq!(kind_of(&uuid::Uuid::nil()), Kind::Uuid);
        assert_eq!(kind_of(&Utc::now()), Kind::Time);
        assert_eq!(
            descriptor_of(&vec![vec![1i32]]).name(),
            "[][]int32"
        );
    }

    #[test]
    fn test_extract_round_trip() {
        let v = capture(&vec![3i16, -4]);
        assert_eq!(v.extract::<Vec<i16>>().unwrap(), vec![3, -4]);
        assert_eq!(v.extract::<Vec<i64>>().unwrap(), vec![3, -4]);
        assert!(matches!(
            v.extract::<Vec<u8>>(),
            Err(Error::OutOfRange(_))
        ));

        let mut m = BTreeMap::new();
        m.insert("a".to_string(), 1u32);
        m.insert("b".to_string(), 2u32);
        assert_eq!(capture(&m).extract::<BTreeMap<String, u32>>().unwrap(), m);

        let t = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 6, 7, 8, 9)
            .unwrap();
        assert_eq!(capture(&t).extract::<DateTime<FixedOffset>>().unwrap(), t);
    }

    #[test]
    fn test_boxes_are_pointers() {
        let v = capture(&Box::new(5i32));
        assert_eq!(v.kind(), Kind::Pointer);
        assert!(v.elem().unwrap().can_set());
        assert_eq!(v.extract::<Box<i32>>().unwrap(), Box::new(5));

        let none: Option<Box<i32>> = None;
        let v = capture(&none);
        assert!(v.is_nil());
        assert_eq!(v.extract::<Option<Box<i32>>>().unwrap(), None);
    }

    #[test]
    fn test_typed_keys_keep_every_entry() {
        let mut m = HashMap::new();
        for b in 0..20u8 {
            m.insert(uuid::Uuid::from_bytes([b; 16]), b);
        }
        let v = capture(&m);
        assert_eq!(v.len().unwrap(), 20);
        assert_eq!(
            v.map_index(&capture(&uuid::Uuid::from_bytes([7; 16])))
                .unwrap()
                .to_uint(),
            7
        );
    }

    #[test]
    #[should_panic(expected = "capture_test::BadTag")]
    fn test_rejected_definition_panics() {
        reflect_struct_type("capture_test::BadTag", || {
            vec![("x", Type::int(), "json:a")]
        });
    }

    #[test]
    fn test_capture_pointer_is_addressable() {
        let p = capture_pointer(&42u64);
        assert_eq!(p.ty(), &Type::of_kind(Kind::Uint64).unwrap().pointer_to());
        assert!(p.elem().unwrap().can_set());
        assert!(!capture(&42u64).can_set());
    }
}
