// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent builder for struct descriptors.

use crate::error::Result;
use crate::kind::Kind;
use crate::types::descriptor::Type;
use crate::types::registry::{registry, FieldSpec};

/// Builder for named or anonymous struct types.
///
/// Field errors (an unknown kind, a bad map key) are held until
/// [`build`](Self::build).
#[derive(Debug)]
pub struct StructBuilder {
    name: Option<String>,
    fields: Vec<FieldSpec>,
    error: Option<crate::Error>,
}

impl StructBuilder {
    /// Builder for a named struct. The name is declared on `build`, so a
    /// field may point back at the struct through [`registry`]`().declare_struct`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            fields: Vec::new(),
            error: None,
        }
    }

    /// Builder for a struct interned by its field list alone.
    pub fn anonymous() -> Self {
        Self {
            name: None,
            fields: Vec::new(),
            error: None,
        }
    }

    /// Add a field with a descriptor.
    pub fn field(mut self, name: impl Into<String>, ty: &Type) -> Self {
        self.fields.push(FieldSpec::new(name, ty.clone()));
        self
    }

    /// Add a field carrying a struct tag.
    pub fn tagged_field(mut self, name: impl Into<String>, ty: &Type, tag: &str) -> Self {
        self.fields
            .push(FieldSpec::new(name, ty.clone()).with_tag(tag));
        self
    }

    /// Add a field of a basic kind's canonical type.
    pub fn kind_field(self, name: impl Into<String>, kind: Kind) -> Self {
        match Type::of_kind(kind) {
            Ok(ty) => self.field(name, &ty),
            Err(e) => self.fail(e),
        }
    }

    pub fn string_field(self, name: impl Into<String>) -> Self {
        self.field(name, &Type::string())
    }

    /// Add a `[]T` field.
    pub fn slice_field(self, name: impl Into<String>, elem: &Type) -> Self {
        self.field(name, &Type::slice_of(elem))
    }

    /// Add a `map[K]V` field.
    pub fn map_field(self, name: impl Into<String>, key: &Type, value: &Type) -> Self {
        match Type::map_of(key, value) {
            Ok(ty) => self.field(name, &ty),
            Err(e) => self.fail(e),
        }
    }

    /// Add a `*T` field.
    pub fn pointer_field(self, name: impl Into<String>, elem: &Type) -> Self {
        self.field(name, &elem.pointer_to())
    }

    fn fail(mut self, e: crate::Error) -> Self {
        if self.error.is_none() {
            self.error = Some(e);
        }
        self
    }

    /// Intern the struct type.
    pub fn build(self) -> Result<Type> {
        if let Some(e) = self.error {
            return Err(e);
        }
        match self.name {
            Some(name) => {
                let ty = registry().declare_struct(&name);
                registry().define_struct(&ty, self.fields)?;
                Ok(ty)
            }
            None => registry().anonymous_struct(self.fields),
        }
    }
}
