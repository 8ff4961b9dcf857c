// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Kind registry: the closed set of value shapes.
//!
//! The discriminants double as the wire kind bytes of the binary codec and are
//! frozen. `Time`, `Uuid` and `Bytes` are derived kinds: no descriptor is
//! created with them directly, they are recognised from the structure of a
//! struct, array or slice descriptor (see [`crate::Type::kind`]).

use crate::error::{Error, Result};
use crate::types::Type;
use crate::value::Value;
use strum::{Display, EnumIter, FromRepr, IntoStaticStr};

/// Highest kind byte in use. Bytes above this are rejected by the decoder.
pub const MAX_KIND: u8 = Kind::Bytes as u8;

/// Shape of a value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, FromRepr,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum Kind {
    Invalid = 0,
    Bool = 1,
    Int = 2,
    Int8 = 3,
    Int16 = 4,
    Int32 = 5,
    Int64 = 6,
    Uint = 7,
    Uint8 = 8,
    Uint16 = 9,
    Uint32 = 10,
    Uint64 = 11,
    Uintptr = 12,
    Float32 = 13,
    Float64 = 14,
    Complex64 = 15,
    Complex128 = 16,
    Array = 17,
    Chan = 18,
    Func = 19,
    Interface = 20,
    Map = 21,
    Pointer = 22,
    Slice = 23,
    String = 24,
    Struct = 25,
    UnsafePointer = 26,
    Field = 27,
    Time = 28,
    Uuid = 29,
    Bytes = 30,
}

impl Kind {
    /// Wire byte of this kind.
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Kind for a wire byte; `None` above [`MAX_KIND`].
    #[inline]
    pub fn from_u8(byte: u8) -> Option<Self> {
        Self::from_repr(byte)
    }

    /// Scalars, strings, bytes, time and uuid.
    pub fn is_basic(self) -> bool {
        self.is_numeric()
            || matches!(
                self,
                Self::Bool | Self::String | Self::Bytes | Self::Time | Self::Uuid
            )
    }

    /// Integers, floats and complex numbers.
    pub fn is_numeric(self) -> bool {
        self.is_signed() || self.is_unsigned() || self.is_float() || self.is_complex()
    }

    /// Values whose zero value is nil.
    pub fn is_nilable(self) -> bool {
        matches!(
            self,
            Self::Pointer
                | Self::Map
                | Self::Slice
                | Self::Interface
                | Self::Chan
                | Self::Func
                | Self::UnsafePointer
                | Self::Bytes
        )
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Self::Int | Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Self::Uint | Self::Uint8 | Self::Uint16 | Self::Uint32 | Self::Uint64 | Self::Uintptr
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    pub fn is_complex(self) -> bool {
        matches!(self, Self::Complex64 | Self::Complex128)
    }

    /// Kinds that may key a map.
    pub fn is_hashable(self) -> bool {
        self.is_basic() && self != Self::Bytes
    }

    /// Byte size of a fixed-size scalar.
    ///
    /// `Int`, `Uint` and `Uintptr` are 64-bit on every host so that the codec
    /// stays little-endian canonical.
    pub fn size(self) -> Result<usize> {
        let size = match self {
            Self::Bool | Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Int | Self::Int64 | Self::Uint | Self::Uint64 | Self::Uintptr => 8,
            Self::Float64 | Self::Complex64 => 8,
            Self::Complex128 | Self::Uuid | Self::Time => 16,
            other => {
                return Err(Error::kind_mismatch(
                    "size",
                    "fixed-size scalar kind",
                    other,
                ))
            }
        };
        Ok(size)
    }

    /// Signed range of an integer kind, as `(min, max)`.
    pub(crate) fn signed_bounds(self) -> Option<(i64, i64)> {
        match self {
            Self::Int8 => Some((i8::MIN as i64, i8::MAX as i64)),
            Self::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            Self::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
            Self::Int | Self::Int64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    /// Upper bound of an unsigned integer kind.
    pub(crate) fn unsigned_max(self) -> Option<u64> {
        match self {
            Self::Uint8 => Some(u8::MAX as u64),
            Self::Uint16 => Some(u16::MAX as u64),
            Self::Uint32 => Some(u32::MAX as u64),
            Self::Uint | Self::Uint64 | Self::Uintptr => Some(u64::MAX),
            _ => None,
        }
    }

    /// Zero value of this kind's canonical descriptor.
    ///
    /// Defined for basic kinds and `Interface` (a nil interface).
    pub fn prototype(self) -> Result<Value> {
        let ty = Type::of_kind(self)?;
        Ok(Value::zero(&ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_wire_bytes_are_frozen() {
        assert_eq!(Kind::Bool.as_u8(), 0x01);
        assert_eq!(Kind::Int.as_u8(), 0x02);
        assert_eq!(Kind::Uint8.as_u8(), 0x08);
        assert_eq!(Kind::Map.as_u8(), 0x15);
        assert_eq!(Kind::Slice.as_u8(), 0x17);
        assert_eq!(Kind::String.as_u8(), 0x18);
        assert_eq!(MAX_KIND, 30);
        for kind in Kind::iter() {
            assert_eq!(Kind::from_u8(kind.as_u8()), Some(kind));
        }
        assert_eq!(Kind::from_u8(31), None);
    }

    #[test]
    fn test_predicates() {
        assert!(Kind::Bytes.is_basic());
        assert!(Kind::Time.is_basic());
        assert!(!Kind::Struct.is_basic());
        assert!(Kind::Complex64.is_numeric());
        assert!(!Kind::String.is_numeric());
        assert!(Kind::Map.is_nilable());
        assert!(!Kind::Array.is_nilable());
        assert!(!Kind::Bytes.is_hashable());
    }

    #[test]
    fn test_size_rejects_composites() {
        assert_eq!(Kind::Int16.size(), Ok(2));
        assert_eq!(Kind::Int.size(), Ok(8));
        assert_eq!(Kind::Complex128.size(), Ok(16));
        assert!(matches!(
            Kind::Slice.size(),
            Err(Error::KindMismatch { found: Kind::Slice, .. })
        ));
    }

    #[test]
    fn test_display_is_lowercase() {
        assert_eq!(Kind::UnsafePointer.to_string(), "unsafepointer");
        assert_eq!(Kind::Float64.to_string(), "float64");
    }

    #[test]
    fn test_prototype() {
        let zero = Kind::Int32.prototype().expect("int32 prototype");
        assert_eq!(zero.kind(), Kind::Int32);
        assert_eq!(zero.try_to_int(), Ok(0));

        let any = Kind::Interface.prototype().expect("interface prototype");
        assert!(any.is_nil());

        assert!(Kind::Struct.prototype().is_err());
    }
}
