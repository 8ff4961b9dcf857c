// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Uniform value handle.
//!
//! A [`Value`] is a `(descriptor, storage, flags)` triple. Storage is a shared
//! slot (`Arc<RwLock<Data>>`): cloning a handle aliases the same storage, and
//! the slot's address is the identity used by cycle detection.
//!
//! Composite storage holds one slot per element or field, so a handle to
//! `s.field("x")` keeps observing the field after `s` is overwritten.
//! Reference kinds (pointer, slice, map) hold headers whose targets are
//! themselves shared slots.
//!
//! # Example
//!
//! ```rust
//! use shade::{capture, capture_pointer, Kind};
//!
//! let v = capture(&vec![1i32, 2, 3]);
//! assert_eq!(v.kind(), Kind::Slice);
//! assert_eq!(v.len().unwrap(), 3);
//! assert_eq!(v.index(1).unwrap().to_int(), 2);
//!
//! let p = capture_pointer(&String::from("hi"));
//! let s = p.elem().unwrap();
//! assert!(s.can_set());
//! s.set(&capture(&"bye")).unwrap();
//! assert_eq!(p.elem().unwrap().to_string(), "bye");
//! ```

mod alloc;
mod capture;
mod hashmap;
mod key;
mod mutate;
mod navigate;

pub use alloc::{new_deep, new_empty, new_populated};
pub use capture::{
    capture, capture_pointer, descriptor_of, kind_of, FromValue, Reflect, ReflectKey,
};
#[doc(hidden)]
pub use capture::{capture_struct, field_type, reflect_struct_type};
pub use hashmap::{BucketMap, Iter as BucketIter, SharedState, WalkState};
pub use key::MapKey;

pub(crate) use alloc::{copy_data, empty_header, zero_data};
pub(crate) use mutate::assign;

use crate::error::{Error, Result};
use crate::kind::Kind;
use crate::types::{registry, Type, POINTER_SIZE};
use bitflags::bitflags;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Shared storage cell.
pub(crate) type Slot = Arc<RwLock<Data>>;

/// Map storage: bucket table keyed by the hashed form of the key.
pub(crate) type MapStore = BucketMap<MapKey, MapEntry>;

/// Shared map header target.
pub(crate) type MapRef = Arc<RwLock<MapStore>>;

pub(crate) fn new_slot(data: Data) -> Slot {
    Arc::new(RwLock::new(data))
}

/// One map entry: the key as a detached value and the value slot.
#[derive(Clone)]
pub(crate) struct MapEntry {
    pub key: Value,
    pub value: Slot,
}

/// Slice header: a window onto a shared backing array.
#[derive(Clone)]
pub(crate) struct SliceHeader {
    pub backing: Arc<[Slot]>,
    pub offset: usize,
    pub len: usize,
}

impl SliceHeader {
    pub fn new(backing: Vec<Slot>, len: usize) -> Self {
        Self {
            backing: backing.into(),
            offset: 0,
            len,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }

    pub fn cap(&self) -> usize {
        self.backing.len() - self.offset
    }

    /// Live elements.
    pub fn elements(&self) -> &[Slot] {
        &self.backing[self.offset..self.offset + self.len]
    }

    /// Identity of the window, for cycle detection.
    pub fn addr(&self) -> usize {
        self.backing.as_ptr() as usize + self.offset
    }
}

/// Contents of a slot, interpreted through the owning handle's descriptor.
#[derive(Clone)]
pub(crate) enum Data {
    Invalid,
    Bool(bool),
    /// All signed integer kinds.
    Int(i64),
    /// All unsigned integer kinds, `Uintptr` included.
    Uint(u64),
    /// `Float32` values are stored already rounded to single precision.
    Float(f64),
    Complex(f64, f64),
    String(String),
    Array(Vec<Slot>),
    Slice(Option<SliceHeader>),
    Map(Option<MapRef>),
    Struct(Vec<Slot>),
    Pointer(Option<Slot>),
    Interface(Option<Box<Value>>),
    /// Chan, func and unsafe pointer: an opaque address.
    Opaque(Option<usize>),
}

impl Data {
    /// Nil reference header.
    pub fn is_nil(&self) -> bool {
        matches!(
            self,
            Self::Slice(None)
                | Self::Map(None)
                | Self::Pointer(None)
                | Self::Interface(None)
                | Self::Opaque(None)
        )
    }

    fn variant(&self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Float(_) => "float",
            Self::Complex(..) => "complex",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Slice(_) => "slice",
            Self::Map(_) => "map",
            Self::Struct(_) => "struct",
            Self::Pointer(_) => "pointer",
            Self::Interface(_) => "interface",
            Self::Opaque(_) => "opaque",
        }
    }
}

// Storage graphs may be cyclic; never recurse.
impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Data::{}", self.variant())?;
        if self.is_nil() {
            f.write_str("(nil)")?;
        }
        Ok(())
    }
}

bitflags! {
    /// Handle flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u8 {
        /// Storage is out of line: wider than a pointer, or an array/struct.
        const INDIRECT = 1 << 0;
        /// Reached through a pointer or an addressable container.
        const ADDRESSABLE = 1 << 1;
        /// Sticky through navigation; blocks every mutation.
        const READ_ONLY = 1 << 2;
    }
}

impl Flags {
    fn for_type(ty: &Type) -> Self {
        if ty.size() > POINTER_SIZE || matches!(ty.raw_kind(), Kind::Array | Kind::Struct) {
            Self::INDIRECT
        } else {
            Self::empty()
        }
    }

    /// Flags a child handle takes from its parent.
    fn inherited(self) -> Self {
        self & (Self::ADDRESSABLE | Self::READ_ONLY)
    }
}

/// Run-time handle over a value of any descriptor.
#[derive(Clone)]
pub struct Value {
    pub(crate) ty: Type,
    pub(crate) slot: Option<Slot>,
    pub(crate) flags: Flags,
}

impl Value {
    /// Handle over fresh storage.
    pub(crate) fn from_data(ty: Type, data: Data) -> Self {
        let flags = Flags::for_type(&ty);
        Self {
            ty,
            slot: Some(new_slot(data)),
            flags,
        }
    }

    /// Handle over existing storage; `extra` is OR-ed into the type flags.
    pub(crate) fn at(ty: Type, slot: Slot, extra: Flags) -> Self {
        let flags = Flags::for_type(&ty) | extra;
        Self {
            ty,
            slot: Some(slot),
            flags,
        }
    }

    /// Handle of type `ty` with no storage (an absent map value).
    pub fn nil(ty: &Type) -> Self {
        Self {
            ty: ty.clone(),
            slot: None,
            flags: Flags::for_type(ty),
        }
    }

    /// The invalid handle. As a map source it deletes the key.
    pub fn invalid() -> Self {
        Self::nil(&registry().scalar(Kind::Invalid))
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn kind(&self) -> Kind {
        self.ty.kind()
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Storage is present.
    pub fn is_valid(&self) -> bool {
        self.slot.is_some() && self.ty.raw_kind() != Kind::Invalid
    }

    /// No storage, or a nil reference header.
    pub fn is_nil(&self) -> bool {
        match &self.slot {
            None => true,
            Some(slot) => slot.read().is_nil(),
        }
    }

    pub fn can_addr(&self) -> bool {
        self.flags.contains(Flags::ADDRESSABLE)
    }

    /// Addressable, not read-only, and backed by storage.
    pub fn can_set(&self) -> bool {
        self.slot.is_some()
            && self.flags.contains(Flags::ADDRESSABLE)
            && !self.flags.contains(Flags::READ_ONLY)
    }

    pub fn is_read_only(&self) -> bool {
        self.flags.contains(Flags::READ_ONLY)
    }

    /// The same storage, viewed read-only. The flag sticks to every handle
    /// navigated from this one.
    pub fn read_only(mut self) -> Self {
        self.flags |= Flags::READ_ONLY;
        self
    }

    /// Storage identity, `None` without storage.
    pub fn addr(&self) -> Option<usize> {
        self.slot.as_ref().map(|s| Arc::as_ptr(s) as usize)
    }

    /// Two handles over the same storage.
    pub fn same_storage(&self, other: &Value) -> bool {
        match (&self.slot, &other.slot) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Snapshot of the slot contents; composite elements stay shared.
    pub(crate) fn load(&self) -> Option<Data> {
        self.slot.as_ref().map(|s| s.read().clone())
    }

    /// Snapshot, or the zero value when there is no storage.
    pub(crate) fn load_or_zero(&self) -> Data {
        self.load().unwrap_or_else(|| zero_data(&self.ty))
    }

    pub(crate) fn store(&self, data: Data) -> Result<()> {
        let slot = self.slot.as_ref().ok_or(Error::NilAccess("store"))?;
        *slot.write() = data;
        Ok(())
    }

    pub(crate) fn child(&self, ty: Type, slot: Slot) -> Value {
        Value::at(ty, slot, self.flags.inherited())
    }

    pub(crate) fn not_settable(&self) -> Error {
        Error::NotSettable(self.ty.name().to_string())
    }

    /// Handle over a detached copy with the type's own flags.
    pub fn copied(&self) -> Value {
        match self.load() {
            Some(data) => Value::from_data(self.ty.clone(), copy_data(&data)),
            None => Value::nil(&self.ty),
        }
    }

    /// Wrap in the empty interface.
    pub fn boxed(&self) -> Value {
        let inner = if self.kind() == Kind::Interface {
            self.unwrap_interface()
        } else {
            self.clone()
        };
        let data = if inner.kind() == Kind::Interface || inner.slot.is_none() {
            Data::Interface(None)
        } else {
            Data::Interface(Some(Box::new(inner.copied())))
        };
        Value::from_data(Type::interface(), data)
    }

    // ------------------------------------------------------------------
    // Constructors for the basic kinds
    // ------------------------------------------------------------------

    pub(crate) fn scalar(kind: Kind, data: Data) -> Value {
        Value::from_data(registry().scalar(kind), data)
    }

    pub fn from_string(s: impl Into<String>) -> Value {
        Value::scalar(Kind::String, Data::String(s.into()))
    }

    /// `[]uint8` over a copy of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Value {
        let slots = bytes.iter().map(|b| new_slot(Data::Uint(*b as u64))).collect();
        Value::from_data(
            Type::bytes(),
            Data::Slice(Some(SliceHeader::new(slots, bytes.len()))),
        )
    }

    pub fn from_uuid_bytes(bytes: [u8; 16]) -> Value {
        let slots = bytes.iter().map(|b| new_slot(Data::Uint(*b as u64))).collect();
        Value::from_data(Type::uuid(), Data::Array(slots))
    }

    /// Canonical timestamp from its three stored fields.
    pub fn from_time_parts(secs: i64, nsec: u32, offset: i32) -> Value {
        Value::from_data(
            Type::time(),
            Data::Struct(vec![
                new_slot(Data::Int(secs)),
                new_slot(Data::Uint(nsec as u64)),
                new_slot(Data::Int(offset as i64)),
            ]),
        )
    }

    // ------------------------------------------------------------------
    // Raw readers for the derived kinds
    // ------------------------------------------------------------------

    /// `(secs, nsec, offset)` of a time value.
    pub(crate) fn time_parts(&self) -> Option<(i64, u32, i32)> {
        let Some(Data::Struct(fields)) = self.load() else {
            return None;
        };
        let read_int = |i: usize| match fields.get(i).map(|s| s.read().clone()) {
            Some(Data::Int(v)) => Some(v),
            Some(Data::Uint(v)) => Some(v as i64),
            _ => None,
        };
        Some((read_int(0)?, read_int(1)? as u32, read_int(2)? as i32))
    }

    pub(crate) fn uuid_bytes(&self) -> Option<[u8; 16]> {
        let Some(Data::Array(slots)) = self.load() else {
            return None;
        };
        let mut out = [0u8; 16];
        for (b, slot) in out.iter_mut().zip(slots.iter()) {
            *b = byte_of(slot);
        }
        Some(out)
    }

    /// Contents of a `[]uint8`, `None` when nil.
    pub(crate) fn bytes_vec(&self) -> Option<Vec<u8>> {
        match self.load()? {
            Data::Slice(Some(header)) => Some(header.elements().iter().map(byte_of).collect()),
            Data::Array(slots) => Some(slots.iter().map(byte_of).collect()),
            _ => None,
        }
    }
}

fn byte_of(slot: &Slot) -> u8 {
    match &*slot.read() {
        Data::Uint(v) => *v as u8,
        Data::Int(v) => *v as u8,
        _ => 0,
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Value");
        s.field("type", &self.ty.name()).field("kind", &self.kind());
        if self.is_nil() {
            s.field("nil", &true);
        }
        s.field("flags", &self.flags).finish()
    }
}
