// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Self-describing binary codec.
//!
//! Every value is a kind byte followed by its payload:
//!
//! | Kind | Payload |
//! |------|---------|
//! | Bool | 1 byte |
//! | numerics | kind-size LE bytes (`Int`, `Uint` are 8) |
//! | Time | 8 bytes signed unix nanoseconds |
//! | Uuid | 16 bytes |
//! | String, Bytes | length prefix, raw bytes |
//! | Array, Slice | element kind, length prefix, N values |
//! | Map | key kind (String), value kind, length prefix, N key/value pairs |
//! | Struct | field count prefix, field values |
//!
//! A length prefix is an unsigned kind byte (`Uint8`, `Uint16`, `Uint32` or
//! `Uint`) followed by that many bytes. Element kinds that are not basic are
//! announced as `Interface`; each item still carries its own kind byte.
//! Pointers encode their pointee. Nil pointers, interfaces, slices and maps
//! encode as the single byte `0x00`.
//!
//! # Example
//!
//! ```rust
//! use shade::{capture, codec, new_empty, Type};
//!
//! let bytes = codec::encode(&capture("1")).unwrap();
//! assert_eq!(bytes, vec![0x18, 0x08, 0x01, 0x31]);
//!
//! let dst = new_empty(&Type::string());
//! assert_eq!(codec::decode(&bytes, &dst), 4);
//! assert_eq!(dst.elem().unwrap().to_string(), "1");
//! ```

mod cursor;
mod decoder;
mod encoder;
mod length;

pub use length::prefix_kind;

use crate::config::CodecConfig;
use crate::error::{Error, Result};
use crate::kind::Kind;
use crate::types::Type;
use crate::value::Value;
use decoder::Decoder;
use encoder::Encoder;

/// Element kind announced on the wire for items of type `ty`.
fn wire_elem_kind(ty: &Type) -> Kind {
    let kind = ty.kind();
    if kind.is_basic() {
        kind
    } else {
        Kind::Interface
    }
}

/// Encode with the default limits.
pub fn encode(v: &Value) -> Result<Vec<u8>> {
    encode_with(v, &CodecConfig::default())
}

/// Encode `v`, failing on a pointer cycle or on nesting past
/// `config.max_depth`.
pub fn encode_with(v: &Value, config: &CodecConfig) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new(config);
    encoder.value(v)?;
    let out = encoder.finish();
    log::debug!("encoded {} as {} bytes", v.ty().name(), out.len());
    Ok(out)
}

/// Decode one value into the pointee of `dst` and return the bytes consumed.
///
/// # Panics
///
/// Panics where [`try_decode`] fails.
pub fn decode(bytes: &[u8], dst: &Value) -> usize {
    try_decode(bytes, dst).unwrap_or_else(|e| panic!("decode: {e}"))
}

pub fn try_decode(bytes: &[u8], dst: &Value) -> Result<usize> {
    try_decode_with(bytes, dst, &CodecConfig::default())
}

/// Decode one value into the pointee of `dst`, a non-nil pointer whose
/// pointee kind matches the encoded kind or is `Interface`.
pub fn try_decode_with(bytes: &[u8], dst: &Value, config: &CodecConfig) -> Result<usize> {
    if dst.ty().raw_kind() != Kind::Pointer {
        return Err(Error::kind_mismatch("decode", "pointer", dst.kind()));
    }
    let target = dst.elem()?;
    if target.is_read_only() {
        return Err(Error::NotSettable(target.ty().name().to_string()));
    }
    let mut decoder = Decoder::new(bytes, config);
    decoder.value_into(&target, None)?;
    Ok(decoder.consumed())
}
