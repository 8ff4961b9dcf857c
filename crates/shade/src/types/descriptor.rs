// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptors: interned structural metadata for a concrete type.

use crate::error::{Error, Result};
use crate::kind::Kind;
use crate::types::registry::registry;
use crate::types::tag::StructTag;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

/// Width of a machine pointer in the host model.
pub const POINTER_SIZE: usize = 8;

/// Slots per map bucket.
pub const BUCKET_SLOTS: usize = 8;

/// Field names and layout of the canonical timestamp struct.
pub(crate) const TIME_FIELDS: [(&str, Kind, usize); 3] = [
    ("secs", Kind::Int64, 0),
    ("nsec", Kind::Uint32, 8),
    ("offset", Kind::Int32, 12),
];

/// Interned handle to a [`TypeDescriptor`].
///
/// Two `Type`s are equal iff they are the same interned descriptor.
#[derive(Clone)]
pub struct Type(pub(crate) Arc<TypeDescriptor>);

impl Type {
    /// Identity of the descriptor, stable for the life of the process.
    #[inline]
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Element descriptor for array/slice/pointer/chan, value descriptor for
    /// maps, and `self` for everything else.
    pub fn elem(&self) -> Type {
        match &self.shape {
            Shape::Array { elem, .. }
            | Shape::Slice { elem }
            | Shape::Pointer { elem }
            | Shape::Chan { elem } => elem.clone(),
            Shape::Map { value, .. } => value.clone(),
            _ => self.clone(),
        }
    }

    /// Interned `*T` descriptor.
    pub fn pointer_to(&self) -> Type {
        registry().pointer_to(self)
    }

    /// Synthetic `[]T` descriptor of an array type.
    pub fn slice_type(&self) -> Option<Type> {
        match &self.shape {
            Shape::Array { elem, slice, .. } => {
                Some(slice.get_or_init(|| registry().slice_of(elem)).clone())
            }
            Shape::Slice { .. } => Some(self.clone()),
            _ => None,
        }
    }

    pub fn bool() -> Type {
        registry().scalar(Kind::Bool)
    }

    pub fn int() -> Type {
        registry().scalar(Kind::Int)
    }

    pub fn uint() -> Type {
        registry().scalar(Kind::Uint)
    }

    pub fn float64() -> Type {
        registry().scalar(Kind::Float64)
    }

    pub fn string() -> Type {
        registry().scalar(Kind::String)
    }

    /// The empty interface, `any`.
    pub fn interface() -> Type {
        registry().interface()
    }

    pub fn unsafe_pointer() -> Type {
        registry().unsafe_pointer()
    }

    /// `[]uint8`, reported as [`Kind::Bytes`].
    pub fn bytes() -> Type {
        registry().slice_of(&registry().scalar(Kind::Uint8))
    }

    /// `[16]uint8`, reported as [`Kind::Uuid`].
    pub fn uuid() -> Type {
        registry().array_of(&registry().scalar(Kind::Uint8), 16)
    }

    /// Canonical timestamp struct, reported as [`Kind::Time`].
    pub fn time() -> Type {
        registry().time()
    }

    pub fn array_of(elem: &Type, len: usize) -> Type {
        registry().array_of(elem, len)
    }

    pub fn slice_of(elem: &Type) -> Type {
        registry().slice_of(elem)
    }

    /// `map[K]V`; the key kind must be hashable.
    pub fn map_of(key: &Type, value: &Type) -> Result<Type> {
        registry().map_of(key, value)
    }

    pub fn chan_of(elem: &Type) -> Type {
        registry().chan_of(elem)
    }

    /// Opaque function type identified by its signature text.
    pub fn func(signature: &str) -> Type {
        registry().func(signature)
    }

    /// Canonical descriptor of a basic kind, `Interface` or `UnsafePointer`.
    pub fn of_kind(kind: Kind) -> Result<Type> {
        match kind {
            Kind::Time => Ok(Self::time()),
            Kind::Uuid => Ok(Self::uuid()),
            Kind::Bytes => Ok(Self::bytes()),
            Kind::Interface => Ok(Self::interface()),
            Kind::UnsafePointer => Ok(Self::unsafe_pointer()),
            k if k.is_basic() => Ok(registry().scalar(k)),
            other => Err(Error::kind_mismatch(
                "of_kind",
                "basic, interface or unsafe pointer kind",
                other,
            )),
        }
    }
}

impl Deref for Type {
    type Target = TypeDescriptor;

    fn deref(&self) -> &TypeDescriptor {
        &self.0
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.name)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Structural record behind a [`Type`].
#[derive(Debug)]
pub struct TypeDescriptor {
    pub(crate) name: String,
    pub(crate) kind: Kind,
    pub(crate) shape: Shape,
}

/// Kind-dependent tail of a descriptor.
#[derive(Debug)]
pub(crate) enum Shape {
    Scalar,
    Array {
        elem: Type,
        len: usize,
        slice: OnceLock<Type>,
    },
    Slice {
        elem: Type,
    },
    Map {
        key: Type,
        value: Type,
        layout: BucketLayout,
    },
    Pointer {
        elem: Type,
    },
    Chan {
        elem: Type,
    },
    /// Fields are set once, after declaration, so that a struct can refer to
    /// itself through a pointer.
    Struct {
        layout: OnceLock<StructLayout>,
    },
    Opaque,
}

/// Hash bucket geometry of a map type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketLayout {
    pub bucket_size: usize,
    pub key_slot_size: usize,
    pub value_slot_size: usize,
}

impl BucketLayout {
    /// Keys or values wider than this are stored through a pointer.
    const MAX_INLINE: usize = 128;

    pub(crate) fn for_types(key: &TypeDescriptor, value: &TypeDescriptor) -> Self {
        let slot = |size: usize| {
            if size > Self::MAX_INLINE {
                POINTER_SIZE
            } else {
                size
            }
        };
        let key_slot_size = slot(key.size());
        let value_slot_size = slot(value.size());
        Self {
            bucket_size: BUCKET_SLOTS
                + BUCKET_SLOTS * key_slot_size
                + BUCKET_SLOTS * value_slot_size
                + POINTER_SIZE,
            key_slot_size,
            value_slot_size,
        }
    }
}

/// Resolved field list of a struct.
#[derive(Debug)]
pub struct StructLayout {
    pub(crate) fields: Vec<StructField>,
    pub(crate) size: usize,
    pub(crate) align: usize,
}

/// One struct member.
#[derive(Debug, Clone)]
pub struct StructField {
    pub name: String,
    pub tag: StructTag,
    pub ty: Type,
    /// Byte offset inside the struct.
    pub offset: usize,
    /// Declaration position.
    pub index: usize,
}

impl StructField {
    /// Name this field takes under `tag`: the tag value up to the first comma,
    /// the field name when the tag is absent or empty, `None` for `"-"`.
    pub fn name_for_tag(&self, tag: &str) -> Option<String> {
        match self.tag.get(tag) {
            Some(value) => {
                let head = value.split(',').next().unwrap_or_default();
                match head {
                    "-" => None,
                    "" => Some(self.name.clone()),
                    name => Some(name.to_string()),
                }
            }
            None => Some(self.name.clone()),
        }
    }
}

#[inline]
pub(crate) fn align_up(offset: usize, align: usize) -> usize {
    if align <= 1 {
        offset
    } else {
        (offset + align - 1) & !(align - 1)
    }
}

impl TypeDescriptor {
    pub(crate) fn new(name: impl Into<String>, kind: Kind, shape: Shape) -> Self {
        Self {
            name: name.into(),
            kind,
            shape,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind as declared, without derived-kind recognition.
    pub fn raw_kind(&self) -> Kind {
        self.kind
    }

    /// Kind with `Bytes`, `Uuid` and `Time` recognised from the structure.
    pub fn kind(&self) -> Kind {
        match &self.shape {
            Shape::Slice { elem } if elem.raw_kind() == Kind::Uint8 => Kind::Bytes,
            Shape::Array { elem, len, .. } if *len == 16 && elem.raw_kind() == Kind::Uint8 => {
                Kind::Uuid
            }
            Shape::Struct { .. } if self.is_time_layout() => Kind::Time,
            _ => self.kind,
        }
    }

    fn is_time_layout(&self) -> bool {
        let fields = self.fields();
        fields.len() == TIME_FIELDS.len()
            && fields
                .iter()
                .zip(TIME_FIELDS.iter())
                .all(|(field, (name, kind, offset))| {
                    field.name == *name
                        && field.offset == *offset
                        && field.ty == registry().scalar(*kind)
                })
    }

    /// Byte size in the host layout model.
    pub fn size(&self) -> usize {
        match &self.shape {
            Shape::Scalar => match self.kind {
                Kind::String => 2 * POINTER_SIZE,
                k => k.size().unwrap_or(0),
            },
            Shape::Array { elem, len, .. } => elem.size() * len,
            Shape::Slice { .. } => 3 * POINTER_SIZE,
            Shape::Map { .. } | Shape::Pointer { .. } | Shape::Chan { .. } => POINTER_SIZE,
            Shape::Struct { layout } => layout.get().map_or(0, |l| l.size),
            Shape::Opaque => match self.kind {
                Kind::Interface => 2 * POINTER_SIZE,
                _ => POINTER_SIZE,
            },
        }
    }

    /// Alignment in the host layout model.
    pub fn align(&self) -> usize {
        match &self.shape {
            Shape::Scalar => match self.kind {
                Kind::String => POINTER_SIZE,
                Kind::Complex64 => 4,
                Kind::Complex128 => 8,
                k => k.size().unwrap_or(1).clamp(1, POINTER_SIZE),
            },
            Shape::Array { elem, .. } => elem.align(),
            Shape::Struct { layout } => layout.get().map_or(1, |l| l.align),
            _ => POINTER_SIZE,
        }
    }

    /// Pointer-map summary: whether values of this type hold references.
    pub fn has_pointers(&self) -> bool {
        match &self.shape {
            Shape::Scalar => self.kind == Kind::String,
            Shape::Array { elem, len, .. } => *len > 0 && elem.has_pointers(),
            Shape::Struct { .. } => self.fields().iter().any(|f| f.ty.has_pointers()),
            _ => true,
        }
    }

    /// Pointer-shaped types live directly in an interface word.
    pub fn is_direct_iface(&self) -> bool {
        matches!(
            self.kind,
            Kind::Pointer | Kind::Map | Kind::Chan | Kind::Func | Kind::UnsafePointer
        )
    }

    /// Storage is reached through a pointer rather than held in the pointer slot.
    pub fn is_indirect(&self) -> bool {
        !self.is_direct_iface()
    }

    /// Key descriptor of a map.
    pub fn key(&self) -> Option<&Type> {
        match &self.shape {
            Shape::Map { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Fixed length of an array.
    pub fn len(&self) -> Option<usize> {
        match &self.shape {
            Shape::Array { len, .. } => Some(*len),
            _ => None,
        }
    }

    pub fn bucket_layout(&self) -> Option<BucketLayout> {
        match &self.shape {
            Shape::Map { layout, .. } => Some(*layout),
            _ => None,
        }
    }

    /// Struct fields in declaration order; empty for non-structs and for
    /// structs declared but not yet defined.
    pub fn fields(&self) -> &[StructField] {
        match &self.shape {
            Shape::Struct { layout } => layout.get().map_or(&[][..], |l| l.fields.as_slice()),
            _ => &[],
        }
    }

    pub fn num_field(&self) -> usize {
        self.fields().len()
    }

    pub fn field(&self, name: &str) -> Option<&StructField> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Field whose `tag_name` tag names it `tag_value`.
    pub fn field_by_tag(&self, tag_name: &str, tag_value: &str) -> Option<&StructField> {
        self.fields()
            .iter()
            .find(|f| f.name_for_tag(tag_name).as_deref() == Some(tag_value))
    }

    /// A struct is defined once its field list is set; other kinds always are.
    pub fn is_defined(&self) -> bool {
        match &self.shape {
            Shape::Struct { layout } => layout.get().is_some(),
            _ => true,
        }
    }
}
