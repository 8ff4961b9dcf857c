// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Coercive conversion between descriptors.
//!
//! [`Value::convert`] resolves a source/destination pair in a fixed order:
//! identical descriptors, interface wrapping and unwrapping, pointer
//! allocation and dereference, the scalar table for two basic kinds, then
//! the container rules. Anything else is `Unconvertible`.
//!
//! # Example
//!
//! ```rust
//! use shade::{capture, Kind, Type};
//!
//! let n = capture("42").convert(&Type::of_kind(Kind::Int8).unwrap()).unwrap();
//! assert_eq!(n.to_int(), 42);
//!
//! let too_big = capture(&300i32).convert(&Type::of_kind(Kind::Uint8).unwrap());
//! assert!(too_big.is_err());
//! ```

mod container;
mod scalar;
pub(crate) mod time;

pub(crate) use scalar::{float_text, Scalar};

use crate::error::{Error, Result};
use crate::kind::Kind;
use crate::types::Type;
use crate::value::{Data, Value};

impl Value {
    /// Handle of type `ty` holding this value, with width and bounds checks.
    ///
    /// An identical descriptor returns an alias of `self`; every other
    /// result is fresh storage.
    pub fn convert(&self, ty: &Type) -> Result<Value> {
        if self.ty == *ty {
            return Ok(self.clone());
        }
        if ty.raw_kind() == Kind::Interface {
            return Ok(self.boxed());
        }
        match self.ty.raw_kind() {
            Kind::Interface => {
                let inner = self.unwrap_interface();
                if inner.ty.raw_kind() == Kind::Interface {
                    return Err(Error::NilAccess("interface"));
                }
                return inner.convert(ty);
            }
            Kind::Pointer if ty.raw_kind() != Kind::Pointer => return self.elem()?.convert(ty),
            _ => {}
        }

        if ty.raw_kind() == Kind::Pointer {
            if self.ty.raw_kind() == Kind::Pointer && self.is_nil() {
                return Ok(Value::zero(ty));
            }
            let target = self.convert(&ty.elem())?.copied();
            return Ok(Value::from_data(
                ty.clone(),
                Data::Pointer(Some(target.into_slot())),
            ));
        }

        if self.kind().is_basic() && ty.kind().is_basic() {
            return Scalar::read(self)?.into_value(ty);
        }
        container::convert(self, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{capture, capture_pointer};

    #[test]
    fn test_identity_aliases() {
        let p = capture_pointer(&5i32);
        let v = p.elem().unwrap();
        let same = v.convert(v.ty()).unwrap();
        assert!(same.same_storage(&v));
    }

    #[test]
    fn test_interface_wrap_and_unwrap() {
        let any = capture(&5u8).convert(&Type::interface()).unwrap();
        assert_eq!(any.kind(), Kind::Interface);
        let back = any.convert(&Type::uint()).unwrap();
        assert_eq!(back.kind(), Kind::Uint);
        assert_eq!(back.to_uint(), 5);
        assert_eq!(
            Value::zero(&Type::interface()).convert(&Type::int()).unwrap_err(),
            Error::NilAccess("interface")
        );
    }

    #[test]
    fn test_pointer_targets_allocate() {
        let p = capture("7").convert(&Type::int().pointer_to()).unwrap();
        assert_eq!(p.kind(), Kind::Pointer);
        assert!(p.elem().unwrap().can_set());
        assert_eq!(p.elem().unwrap().to_int(), 7);

        let pp = capture_pointer(&7i16).convert(&Type::string().pointer_to()).unwrap();
        assert_eq!(pp.elem().unwrap().to_string(), "7");

        let nil = Value::zero(&Type::int().pointer_to());
        assert!(nil.convert(&Type::string().pointer_to()).unwrap().is_nil());
    }

    #[test]
    fn test_unconvertible_pairs() {
        let f = Value::zero(&Type::func("func()"));
        assert!(matches!(f.convert(&Type::int()), Err(Error::Unconvertible { .. })));
        assert!(matches!(
            capture(&1i32).convert(&Type::slice_of(&Type::int())),
            Err(Error::Unconvertible { .. })
        ));
    }
}
