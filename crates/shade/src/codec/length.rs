// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Length prefixes: an unsigned kind byte followed by that many LE bytes,
//! always the narrowest kind that holds the length.

use super::cursor::{Reader, Writer};
use crate::error::{Error, Result};
use crate::kind::Kind;

/// Narrowest prefix kind for `len`, with its payload width.
pub fn prefix_kind(len: usize) -> (Kind, usize) {
    let len = len as u64;
    if len <= u8::MAX as u64 {
        (Kind::Uint8, 1)
    } else if len <= u16::MAX as u64 {
        (Kind::Uint16, 2)
    } else if len <= u32::MAX as u64 {
        (Kind::Uint32, 4)
    } else {
        (Kind::Uint, 8)
    }
}

pub fn write_len(w: &mut Writer, len: usize) {
    let (kind, width) = prefix_kind(len);
    w.write_u8(kind.as_u8());
    w.write_uint_le(len as u64, width);
}

/// Read a prefix, rejecting any length above `max_len`.
pub fn read_len(r: &mut Reader<'_>, max_len: usize) -> Result<usize> {
    let start = r.offset();
    let tag = r.read_u8()?;
    let width = match Kind::from_u8(tag) {
        Some(Kind::Uint8) => 1,
        Some(Kind::Uint16) => 2,
        Some(Kind::Uint32) => 4,
        Some(Kind::Uint) | Some(Kind::Uint64) => 8,
        _ => return Err(Error::corrupt(start, format!("bad length tag {tag:#04x}"))),
    };
    let len = r.read_uint_le(width)?;
    match usize::try_from(len) {
        Ok(len) if len <= max_len => Ok(len),
        _ => Err(Error::corrupt(
            start,
            format!("length {len} exceeds limit {max_len}"),
        )),
    }
}
