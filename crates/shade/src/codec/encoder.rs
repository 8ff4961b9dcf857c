// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::cursor::Writer;
use super::length::write_len;
use super::wire_elem_kind;
use crate::config::CodecConfig;
use crate::convert::time;
use crate::error::{Error, Result};
use crate::kind::Kind;
use crate::types::Type;
use crate::value::{Data, Value};
use std::sync::Arc;

/// Single-use encoder: one output buffer, one ancestry path.
pub(crate) struct Encoder<'c> {
    out: Writer,
    config: &'c CodecConfig,
    ancestry: Vec<(usize, usize)>,
    depth: usize,
}

impl<'c> Encoder<'c> {
    pub fn new(config: &'c CodecConfig) -> Self {
        Self {
            out: Writer::new(),
            config,
            ancestry: Vec::new(),
            depth: 0,
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.out.into_inner()
    }

    fn enter(&mut self, ty: &Type, addr: usize) -> Result<()> {
        let key = (ty.id(), addr);
        if self.ancestry.contains(&key) {
            return Err(Error::CycleDetected(ty.name().to_string()));
        }
        self.ancestry.push(key);
        Ok(())
    }

    fn leave(&mut self) {
        self.ancestry.pop();
    }

    /// Kind byte and payload of `v`.
    pub fn value(&mut self, v: &Value) -> Result<()> {
        if self.depth >= self.config.max_depth {
            return Err(Error::OutOfRange(format!(
                "nesting deeper than {}",
                self.config.max_depth
            )));
        }
        self.depth += 1;
        let result = self.dispatch(v);
        self.depth -= 1;
        result
    }

    fn dispatch(&mut self, v: &Value) -> Result<()> {
        let data = match v.load() {
            Some(data) if !data.is_nil() => data,
            _ => {
                self.out.write_u8(Kind::Invalid.as_u8());
                return Ok(());
            }
        };
        let kind = v.kind();
        log::trace!("encode {} at {}", kind, self.out.offset());
        match (kind, data) {
            (Kind::Interface, Data::Interface(Some(inner))) => self.value(&inner),
            (Kind::Pointer, Data::Pointer(Some(target))) => {
                self.enter(&v.ty, Arc::as_ptr(&target) as usize)?;
                let result = self.value(&v.elem()?);
                self.leave();
                result
            }
            (k, _) if k.is_basic() => {
                self.out.write_u8(k.as_u8());
                self.basic(k, v)
            }
            (Kind::Array, _) => {
                self.out.write_u8(Kind::Array.as_u8());
                self.sequence(v)
            }
            (Kind::Slice, Data::Slice(Some(header))) => {
                self.out.write_u8(Kind::Slice.as_u8());
                self.enter(&v.ty, header.addr())?;
                let result = self.sequence(v);
                self.leave();
                result
            }
            (Kind::Map, Data::Map(Some(map))) => {
                self.out.write_u8(Kind::Map.as_u8());
                self.enter(&v.ty, Arc::as_ptr(&map) as usize)?;
                let result = self.map(v);
                self.leave();
                result
            }
            (Kind::Struct, _) => {
                self.out.write_u8(Kind::Struct.as_u8());
                let n = v.ty.num_field();
                write_len(&mut self.out, n);
                for i in 0..n {
                    self.value(&v.index(i)?)?;
                }
                Ok(())
            }
            (k, _) => Err(Error::kind_mismatch("encode", "encodable kind", k)),
        }
    }

    fn basic(&mut self, kind: Kind, v: &Value) -> Result<()> {
        match (kind, v.load_or_zero()) {
            (Kind::Bool, Data::Bool(b)) => self.out.write_u8(b as u8),
            (k, Data::Int(i)) => self.out.write_uint_le(i as u64, k.size()?),
            (k, Data::Uint(u)) => self.out.write_uint_le(u, k.size()?),
            (Kind::Float32, Data::Float(f)) => self.out.write_f32_le(f as f32),
            (_, Data::Float(f)) => self.out.write_f64_le(f),
            (Kind::Complex64, Data::Complex(re, im)) => {
                self.out.write_f32_le(re as f32);
                self.out.write_f32_le(im as f32);
            }
            (_, Data::Complex(re, im)) => {
                self.out.write_f64_le(re);
                self.out.write_f64_le(im);
            }
            (_, Data::String(s)) => {
                write_len(&mut self.out, s.len());
                self.out.write_bytes(s.as_bytes());
            }
            (Kind::Bytes, _) => {
                let bytes = v.bytes_vec().unwrap_or_default();
                write_len(&mut self.out, bytes.len());
                self.out.write_bytes(&bytes);
            }
            (Kind::Uuid, _) => self.out.write_bytes(&v.uuid_bytes().unwrap_or_default()),
            (Kind::Time, _) => {
                let nanos = time::unix_nanos(&v.try_to_time()?)?;
                self.out.write_u64_le(nanos as u64);
            }
            (k, _) => return Err(Error::kind_mismatch("encode", "basic kind", k)),
        }
        Ok(())
    }

    /// Element kind, length prefix and elements of an array or slice.
    fn sequence(&mut self, v: &Value) -> Result<()> {
        self.out.write_u8(wire_elem_kind(&v.ty.elem()).as_u8());
        let n = v.len()?;
        write_len(&mut self.out, n);
        for i in 0..n {
            self.value(&v.index(i)?)?;
        }
        Ok(())
    }

    /// Keys are written as strings whatever the key type.
    fn map(&mut self, v: &Value) -> Result<()> {
        let entries = v.entries()?;
        self.out.write_u8(Kind::String.as_u8());
        self.out.write_u8(wire_elem_kind(&v.ty.elem()).as_u8());
        write_len(&mut self.out, entries.len());
        for (key, value) in &entries {
            self.value(&Value::from_string(key.try_to_string()?))?;
            self.value(value)?;
        }
        Ok(())
    }
}
