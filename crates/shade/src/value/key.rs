// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Hashable form of a map key.

use crate::error::{Error, Result};
use crate::kind::Kind;
use crate::value::{Data, Value};

/// Map key reduced to its comparable contents.
///
/// Floats compare by bit pattern with `-0.0` folded into `0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(u64),
    Complex(u64, u64),
    String(String),
    Uuid([u8; 16]),
    Time { secs: i64, nsec: u32, offset: i32 },
}

fn float_bits(f: f64) -> u64 {
    if f == 0.0 {
        0.0f64.to_bits()
    } else {
        f.to_bits()
    }
}

impl MapKey {
    /// Key of a value whose kind is hashable.
    pub fn from_value(v: &Value) -> Result<MapKey> {
        let kind = v.kind();
        if !kind.is_hashable() {
            return Err(Error::kind_mismatch("map key", "hashable kind", kind));
        }
        let key = match kind {
            Kind::Time => {
                let (secs, nsec, offset) = v.time_parts().ok_or(Error::NilAccess("map key"))?;
                MapKey::Time { secs, nsec, offset }
            }
            Kind::Uuid => MapKey::Uuid(v.uuid_bytes().ok_or(Error::NilAccess("map key"))?),
            _ => match v.load_or_zero() {
                Data::Bool(b) => MapKey::Bool(b),
                Data::Int(i) => MapKey::Int(i),
                Data::Uint(u) => MapKey::Uint(u),
                Data::Float(f) => MapKey::Float(float_bits(f)),
                Data::Complex(re, im) => MapKey::Complex(float_bits(re), float_bits(im)),
                Data::String(s) => MapKey::String(s),
                _ => return Err(Error::kind_mismatch("map key", "hashable kind", kind)),
            },
        };
        Ok(key)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MapKey::String(s) => Some(s),
            _ => None,
        }
    }
}
