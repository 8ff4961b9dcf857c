// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide type intern table.
//!
//! Every descriptor is created here exactly once per structural identity, so
//! descriptor equality is pointer equality. Composite keys refer to their
//! component descriptors by [`Type::id`], which is stable because interned
//! descriptors are never dropped.
//!
//! Descriptor construction never calls back into the registry while a shard
//! lock is held.

use crate::error::{Error, Result};
use crate::kind::Kind;
use crate::types::descriptor::{
    align_up, BucketLayout, Shape, StructField, StructLayout, Type, TypeDescriptor, TIME_FIELDS,
};
use crate::types::tag::StructTag;
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};

static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();

/// Global intern table.
pub fn registry() -> &'static TypeRegistry {
    REGISTRY.get_or_init(TypeRegistry::new)
}

/// Name of the canonical timestamp struct.
pub const TIME_TYPE_NAME: &str = "shade.Time";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TypeKey {
    Scalar(Kind),
    Interface,
    UnsafePointer,
    Func(String),
    Array(usize, usize),
    Slice(usize),
    Map(usize, usize),
    Pointer(usize),
    Chan(usize),
    Named(String),
    Anonymous(Vec<(String, String, usize)>),
}

/// Field specification handed to [`TypeRegistry::define_struct`].
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub ty: Type,
    pub tag: StructTag,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            tag: StructTag::default(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = StructTag::new(tag);
        self
    }
}

/// Intern table keyed by structural identity.
#[derive(Debug)]
pub struct TypeRegistry {
    types: DashMap<TypeKey, Type>,
}

impl TypeRegistry {
    fn new() -> Self {
        Self {
            types: DashMap::new(),
        }
    }

    /// Number of interned descriptors.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn intern(&self, key: TypeKey, build: impl FnOnce() -> TypeDescriptor) -> Type {
        if let Some(existing) = self.types.get(&key) {
            return existing.clone();
        }
        self.types
            .entry(key)
            .or_insert_with(|| {
                let desc = build();
                log::debug!("registered type {}", desc.name);
                Type(Arc::new(desc))
            })
            .clone()
    }

    /// Descriptor of a scalar kind (`Bool` through `Complex128`, `String`).
    pub(crate) fn scalar(&self, kind: Kind) -> Type {
        self.intern(TypeKey::Scalar(kind), || {
            TypeDescriptor::new(kind.to_string(), kind, Shape::Scalar)
        })
    }

    pub(crate) fn interface(&self) -> Type {
        self.intern(TypeKey::Interface, || {
            TypeDescriptor::new("any", Kind::Interface, Shape::Opaque)
        })
    }

    pub(crate) fn unsafe_pointer(&self) -> Type {
        self.intern(TypeKey::UnsafePointer, || {
            TypeDescriptor::new("unsafe.Pointer", Kind::UnsafePointer, Shape::Opaque)
        })
    }

    pub(crate) fn func(&self, signature: &str) -> Type {
        self.intern(TypeKey::Func(signature.to_string()), || {
            TypeDescriptor::new(signature, Kind::Func, Shape::Opaque)
        })
    }

    pub(crate) fn array_of(&self, elem: &Type, len: usize) -> Type {
        self.intern(TypeKey::Array(elem.id(), len), || {
            TypeDescriptor::new(
                format!("[{len}]{}", elem.name),
                Kind::Array,
                Shape::Array {
                    elem: elem.clone(),
                    len,
                    slice: OnceLock::new(),
                },
            )
        })
    }

    pub(crate) fn slice_of(&self, elem: &Type) -> Type {
        self.intern(TypeKey::Slice(elem.id()), || {
            TypeDescriptor::new(
                format!("[]{}", elem.name),
                Kind::Slice,
                Shape::Slice { elem: elem.clone() },
            )
        })
    }

    pub(crate) fn map_of(&self, key: &Type, value: &Type) -> Result<Type> {
        if !key.kind().is_hashable() {
            return Err(Error::kind_mismatch("map_of", "hashable key kind", key.kind()));
        }
        Ok(self.map_of_hashable(key, value))
    }

    /// `map[K]V` for a key already known to be hashable.
    pub(crate) fn map_of_hashable(&self, key: &Type, value: &Type) -> Type {
        let layout = BucketLayout::for_types(key, value);
        self.intern(TypeKey::Map(key.id(), value.id()), || {
            TypeDescriptor::new(
                format!("map[{}]{}", key.name, value.name),
                Kind::Map,
                Shape::Map {
                    key: key.clone(),
                    value: value.clone(),
                    layout,
                },
            )
        })
    }

    pub(crate) fn pointer_to(&self, elem: &Type) -> Type {
        self.intern(TypeKey::Pointer(elem.id()), || {
            TypeDescriptor::new(
                format!("*{}", elem.name),
                Kind::Pointer,
                Shape::Pointer { elem: elem.clone() },
            )
        })
    }

    pub(crate) fn chan_of(&self, elem: &Type) -> Type {
        self.intern(TypeKey::Chan(elem.id()), || {
            TypeDescriptor::new(
                format!("chan {}", elem.name),
                Kind::Chan,
                Shape::Chan { elem: elem.clone() },
            )
        })
    }

    /// Declare a named struct without fields. Idempotent: a second call with
    /// the same name returns the first descriptor.
    pub fn declare_struct(&self, name: &str) -> Type {
        self.intern(TypeKey::Named(name.to_string()), || {
            TypeDescriptor::new(
                name,
                Kind::Struct,
                Shape::Struct {
                    layout: OnceLock::new(),
                },
            )
        })
    }

    /// Existing named struct, if declared.
    pub fn lookup_struct(&self, name: &str) -> Option<Type> {
        self.types
            .get(&TypeKey::Named(name.to_string()))
            .map(|t| t.clone())
    }

    /// Set the fields of a declared struct.
    ///
    /// Redefining with the same fields is a no-op; redefining with different
    /// fields fails. A field whose type is an undefined struct (held by value)
    /// makes the struct infinitely sized.
    pub fn define_struct(&self, ty: &Type, fields: Vec<FieldSpec>) -> Result<()> {
        let Shape::Struct { layout } = &ty.shape else {
            return Err(Error::kind_mismatch("define_struct", "struct", ty.raw_kind()));
        };

        if let Some(existing) = layout.get() {
            return if same_fields(&existing.fields, &fields) {
                Ok(())
            } else {
                Err(Error::Redefined(ty.name.clone()))
            };
        }

        let built = build_layout(&ty.name, fields)?;
        if layout.set(built).is_err() {
            // Lost a definition race; the winner must agree with us.
            log::debug!("struct {} defined concurrently", ty.name);
        }
        Ok(())
    }

    /// Intern an unnamed struct by its field list.
    pub fn anonymous_struct(&self, fields: Vec<FieldSpec>) -> Result<Type> {
        let key = TypeKey::Anonymous(
            fields
                .iter()
                .map(|f| (f.name.clone(), f.tag.as_str().to_string(), f.ty.id()))
                .collect(),
        );
        let name = format!(
            "struct {{ {} }}",
            fields
                .iter()
                .map(|f| format!("{} {}", f.name, f.ty.name))
                .collect::<Vec<_>>()
                .join("; ")
        );
        let layout = build_layout(&name, fields)?;
        let cell = OnceLock::new();
        let _ = cell.set(layout);
        Ok(self.intern(key, || {
            TypeDescriptor::new(name, Kind::Struct, Shape::Struct { layout: cell })
        }))
    }

    /// Canonical timestamp struct.
    pub(crate) fn time(&self) -> Type {
        let ty = self.declare_struct(TIME_TYPE_NAME);
        if !ty.is_defined() {
            let fields = TIME_FIELDS
                .iter()
                .map(|(name, kind, _)| FieldSpec::new(*name, self.scalar(*kind)))
                .collect();
            if let Err(e) = self.define_struct(&ty, fields) {
                log::warn!("canonical time layout rejected: {e}");
            }
        }
        ty
    }
}

fn same_fields(existing: &[StructField], specs: &[FieldSpec]) -> bool {
    existing.len() == specs.len()
        && existing
            .iter()
            .zip(specs)
            .all(|(f, s)| f.name == s.name && f.ty == s.ty && f.tag == s.tag)
}

fn build_layout(owner: &str, specs: Vec<FieldSpec>) -> Result<StructLayout> {
    let mut fields = Vec::with_capacity(specs.len());
    let mut offset = 0usize;
    let mut max_align = 1usize;

    for (index, spec) in specs.into_iter().enumerate() {
        if spec.name.is_empty() {
            return Err(Error::FieldNotFound(format!("{owner}: unnamed field #{index}")));
        }
        if fields.iter().any(|f: &StructField| f.name == spec.name) {
            return Err(Error::Redefined(format!("{owner}.{}", spec.name)));
        }
        spec.tag.parse()?;
        if !holds_defined(&spec.ty) {
            return Err(Error::InfiniteSize(owner.to_string()));
        }

        let align = spec.ty.align();
        offset = align_up(offset, align);
        max_align = max_align.max(align);
        fields.push(StructField {
            name: spec.name,
            tag: spec.tag,
            offset,
            index,
            ty: spec.ty.clone(),
        });
        offset += spec.ty.size();
    }

    Ok(StructLayout {
        fields,
        size: align_up(offset, max_align),
        align: max_align,
    })
}

/// Whether every struct reachable by value (through arrays and struct fields)
/// has a known layout.
fn holds_defined(ty: &Type) -> bool {
    match &ty.shape {
        Shape::Struct { .. } => ty.is_defined(),
        Shape::Array { elem, .. } => holds_defined(elem),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_is_idempotent() {
        let a = registry().declare_struct("registry_test::Idem");
        let b = registry().declare_struct("registry_test::Idem");
        assert_eq!(a, b);
        assert!(!a.is_defined());
        assert_eq!(registry().lookup_struct("registry_test::Idem"), Some(a));
    }

    #[test]
    fn test_recursive_struct_through_pointer() {
        let node = registry().declare_struct("registry_test::Node");
        let fields = vec![
            FieldSpec::new("value", Type::int()),
            FieldSpec::new("next", node.pointer_to()),
        ];
        registry().define_struct(&node, fields.clone()).unwrap();
        assert_eq!(node.num_field(), 2);
        assert_eq!(node.field("next").unwrap().ty.elem(), node);
        assert_eq!(node.field("next").unwrap().offset, 8);
        assert_eq!(node.size(), 16);

        registry().define_struct(&node, fields).unwrap();
        let err = registry()
            .define_struct(&node, vec![FieldSpec::new("value", Type::int())])
            .unwrap_err();
        assert!(matches!(err, Error::Redefined(_)));
    }

    #[test]
    fn test_self_by_value_is_infinite() {
        let node = registry().declare_struct("registry_test::Infinite");
        let err = registry()
            .define_struct(&node, vec![FieldSpec::new("inner", node.clone())])
            .unwrap_err();
        assert!(matches!(err, Error::InfiniteSize(_)));
    }

    #[test]
    fn test_layout_padding() {
        let ty = registry()
            .anonymous_struct(vec![
                FieldSpec::new("a", registry().scalar(Kind::Uint8)),
                FieldSpec::new("b", registry().scalar(Kind::Int64)),
                FieldSpec::new("c", registry().scalar(Kind::Int16)),
            ])
            .unwrap();
        let offsets: Vec<_> = ty.fields().iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 8, 16]);
        assert_eq!(ty.size(), 24);
        assert_eq!(ty.align(), 8);
    }

    #[test]
    fn test_malformed_tag_rejected_at_definition() {
        let err = registry()
            .anonymous_struct(vec![
                FieldSpec::new("a", Type::int()).with_tag(r#"json:a"#)
            ])
            .unwrap_err();
        assert!(matches!(err, Error::MalformedTag { .. }));
    }
}
