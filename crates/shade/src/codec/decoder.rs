// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::cursor::Reader;
use super::length::read_len;
use crate::config::CodecConfig;
use crate::convert::time;
use crate::error::{Error, Result};
use crate::kind::Kind;
use crate::types::{registry, Type};
use crate::value::{
    assign, new_slot, zero_data, BucketMap, Data, Flags, MapEntry, MapKey, SliceHeader, Slot,
    Value,
};
use parking_lot::RwLock;
use std::sync::Arc;

pub(crate) struct Decoder<'a, 'c> {
    input: Reader<'a>,
    config: &'c CodecConfig,
    depth: usize,
}

/// Writable handle over a slot the decoder owns.
fn owned(ty: &Type, slot: Slot) -> Value {
    Value::at(ty.clone(), slot, Flags::ADDRESSABLE)
}

fn slot_of(v: &Value) -> Result<&Slot> {
    v.slot.as_ref().ok_or(Error::NilAccess("decode target"))
}

impl<'a, 'c> Decoder<'a, 'c> {
    pub fn new(bytes: &'a [u8], config: &'c CodecConfig) -> Self {
        Self {
            input: Reader::new(bytes),
            config,
            depth: 0,
        }
    }

    pub fn consumed(&self) -> usize {
        self.input.offset()
    }

    /// Length prefix of a sequence whose items take at least one byte each.
    fn count(&mut self) -> Result<usize> {
        let start = self.input.offset();
        let n = read_len(&mut self.input, self.config.max_len)?;
        if n > self.input.remaining() {
            return Err(Error::corrupt(
                start,
                format!("{n} items but {} bytes left", self.input.remaining()),
            ));
        }
        Ok(n)
    }

    fn kind_byte(&mut self) -> Result<(Kind, usize)> {
        let start = self.input.offset();
        let byte = self.input.read_u8()?;
        let kind = Kind::from_u8(byte)
            .ok_or_else(|| Error::corrupt(start, format!("unknown kind byte {byte:#04x}")))?;
        Ok((kind, start))
    }

    /// Read one value into `target`. `declared` is the element kind a
    /// container announced for its items.
    pub fn value_into(&mut self, target: &Value, declared: Option<Kind>) -> Result<()> {
        if self.depth >= self.config.max_depth {
            return Err(Error::corrupt(self.input.offset(), "nesting too deep"));
        }
        self.depth += 1;
        let result = self.read_value(target, declared);
        self.depth -= 1;
        result
    }

    fn read_value(&mut self, target: &Value, declared: Option<Kind>) -> Result<()> {
        let (kind, start) = self.kind_byte()?;
        if kind == Kind::Invalid {
            *slot_of(target)?.write() = zero_data(&target.ty);
            return Ok(());
        }
        if let Some(declared) = declared {
            if declared != Kind::Interface && declared != kind {
                return Err(Error::corrupt(
                    start,
                    format!("item of kind {kind} in a container of {declared}"),
                ));
            }
        }
        log::trace!("decode {} at {}", kind, start);
        self.payload_into(kind, start, target)
    }

    fn payload_into(&mut self, kind: Kind, start: usize, target: &Value) -> Result<()> {
        match target.ty.raw_kind() {
            Kind::Interface => {
                let value = self.fresh(kind, start)?;
                *slot_of(target)?.write() = Data::Interface(Some(Box::new(value)));
                return Ok(());
            }
            Kind::Pointer => {
                let slot = slot_of(target)?;
                let pointee = match &*slot.read() {
                    Data::Pointer(Some(pointee)) => Some(pointee.clone()),
                    _ => None,
                };
                let pointee = match pointee {
                    Some(pointee) => pointee,
                    None => {
                        let pointee = new_slot(zero_data(&target.ty.elem()));
                        *slot.write() = Data::Pointer(Some(pointee.clone()));
                        pointee
                    }
                };
                return self.payload_into(kind, start, &owned(&target.ty.elem(), pointee));
            }
            _ => {}
        }
        if target.kind() != kind {
            return Err(Error::kind_mismatch("decode", target.kind().to_string(), kind));
        }
        match kind {
            k if k.is_basic() => {
                let data = self.basic(k)?;
                assign(slot_of(target)?, data);
                Ok(())
            }
            Kind::Array => {
                let declared = self.elem_kind()?;
                let n = self.count()?;
                let len = target.len()?;
                if n != len {
                    return Err(Error::corrupt(
                        start,
                        format!("{n} items for an array of {len}"),
                    ));
                }
                for i in 0..n {
                    self.value_into(&target.index(i)?, Some(declared))?;
                }
                Ok(())
            }
            Kind::Slice => {
                let declared = self.elem_kind()?;
                self.slice_body(target, Some(declared))
            }
            Kind::Map => self.map_body(target, start),
            Kind::Struct => {
                let n = self.count()?;
                let fields = target.ty.num_field();
                if n != fields {
                    return Err(Error::corrupt(
                        start,
                        format!("{n} fields for {} with {fields}", target.ty.name()),
                    ));
                }
                for i in 0..n {
                    self.value_into(&target.index(i)?, None)?;
                }
                Ok(())
            }
            k => Err(Error::corrupt(start, format!("kind {k} is not encodable"))),
        }
    }

    fn elem_kind(&mut self) -> Result<Kind> {
        let (kind, start) = self.kind_byte()?;
        if kind.is_basic() || kind == Kind::Interface {
            Ok(kind)
        } else {
            Err(Error::corrupt(start, format!("element kind {kind}")))
        }
    }

    /// Payload of a basic kind as storage contents.
    fn basic(&mut self, kind: Kind) -> Result<Data> {
        let r = &mut self.input;
        let data = match kind {
            Kind::Bool => Data::Bool(r.read_u8()? != 0),
            k if k.is_signed() => Data::Int(r.read_int_le(k.size()?)?),
            k if k.is_unsigned() => Data::Uint(r.read_uint_le(k.size()?)?),
            Kind::Float32 => Data::Float(r.read_f32_le()? as f64),
            Kind::Float64 => Data::Float(r.read_f64_le()?),
            Kind::Complex64 => Data::Complex(r.read_f32_le()? as f64, r.read_f32_le()? as f64),
            Kind::Complex128 => Data::Complex(r.read_f64_le()?, r.read_f64_le()?),
            Kind::String => {
                let start = r.offset();
                let n = read_len(r, self.config.max_len)?;
                let raw = r.read_bytes(n)?;
                let s = std::str::from_utf8(raw)
                    .map_err(|e| Error::corrupt(start, format!("string: {e}")))?;
                Data::String(s.to_string())
            }
            Kind::Bytes => {
                let n = read_len(r, self.config.max_len)?;
                Value::from_bytes(r.read_bytes(n)?).load_or_zero()
            }
            Kind::Uuid => {
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(r.read_bytes(16)?);
                Value::from_uuid_bytes(bytes).load_or_zero()
            }
            Kind::Time => {
                let start = r.offset();
                let nanos = r.read_u64_le()? as i64;
                let t = time::from_unix_nanos(nanos)
                    .map_err(|e| Error::corrupt(start, e.to_string()))?;
                let (secs, nsec, offset) = time::to_parts(&t);
                Value::from_time_parts(secs, nsec, offset).load_or_zero()
            }
            k => return Err(Error::kind_mismatch("decode", "basic kind", k)),
        };
        Ok(data)
    }

    /// Length prefix and items into a fresh backing array of `target`'s
    /// element type.
    fn slice_body(&mut self, target: &Value, declared: Option<Kind>) -> Result<()> {
        let n = self.count()?;
        let elem = target.ty.elem();
        let slots: Vec<Slot> = (0..n).map(|_| new_slot(zero_data(&elem))).collect();
        for slot in &slots {
            self.value_into(&owned(&elem, slot.clone()), declared)?;
        }
        *slot_of(target)?.write() = Data::Slice(Some(SliceHeader::new(slots, n)));
        Ok(())
    }

    fn map_body(&mut self, target: &Value, start: usize) -> Result<()> {
        let (key_kind, key_start) = self.kind_byte()?;
        if key_kind != Kind::String {
            return Err(Error::corrupt(key_start, format!("map key kind {key_kind}")));
        }
        let declared = self.elem_kind()?;
        let n = self.count()?;
        let key_ty = target
            .ty
            .key()
            .cloned()
            .ok_or_else(|| Error::corrupt(start, "map into a non-map"))?;
        let value_ty = target.ty.elem();

        let mut store = BucketMap::with_capacity(n);
        for _ in 0..n {
            let text = owned(&Type::string(), new_slot(Data::String(String::new())));
            self.value_into(&text, Some(Kind::String))?;
            let key = text.convert(&key_ty)?.copied();
            let value = new_slot(zero_data(&value_ty));
            self.value_into(&owned(&value_ty, value.clone()), Some(declared))?;
            store.insert(MapKey::from_value(&key)?, MapEntry { key, value });
        }
        *slot_of(target)?.write() = Data::Map(Some(Arc::new(RwLock::new(store))));
        Ok(())
    }

    /// Value carried by an interface: basic kinds take their canonical type,
    /// arrays and slices become `[]any`, maps `map[string]any`, structs `[]any`.
    fn fresh(&mut self, kind: Kind, start: usize) -> Result<Value> {
        let any = Type::interface();
        match kind {
            k if k.is_basic() => {
                let value = Value::zero(&Type::of_kind(k)?);
                self.payload_into(k, start, &value)?;
                Ok(value)
            }
            Kind::Array | Kind::Slice => {
                let value = Value::zero(&Type::slice_of(&any));
                let declared = self.elem_kind()?;
                self.slice_body(&value, Some(declared))?;
                Ok(value)
            }
            Kind::Map => {
                let value = Value::zero(&registry().map_of_hashable(&Type::string(), &any));
                self.map_body(&value, start)?;
                Ok(value)
            }
            Kind::Struct => {
                let value = Value::zero(&Type::slice_of(&any));
                self.slice_body(&value, None)?;
                Ok(value)
            }
            k => Err(Error::corrupt(start, format!("kind {k} is not encodable"))),
        }
    }
}
