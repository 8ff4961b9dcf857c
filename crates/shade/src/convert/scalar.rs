// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scalar conversion table.
//!
//! Every basic value is first read into a [`Scalar`] that remembers its
//! source width, then projected onto the destination kind. Projections that
//! can lose information check bounds and fail with `OutOfRange` instead of
//! wrapping.

use super::time;
use crate::error::{Error, Result};
use crate::kind::Kind;
use crate::types::Type;
use crate::value::{Data, Value};
use chrono::{DateTime, FixedOffset};

/// A basic value with the width it was read at.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Scalar {
    Bool(bool),
    Int(i64, Kind),
    Uint(u64, Kind),
    Float(f64, Kind),
    Complex(f64, f64, Kind),
    String(String),
    Bytes(Vec<u8>),
    Time(DateTime<FixedOffset>),
    Uuid([u8; 16]),
}

const TRUE_LITERALS: [&str; 6] = ["1", "t", "true", "y", "yes", "on"];
const FALSE_LITERALS: [&str; 6] = ["0", "f", "false", "n", "no", "off"];

impl Scalar {
    /// Read a basic value, chasing pointers and interfaces first.
    pub fn read(v: &Value) -> Result<Scalar> {
        let v = v.elem_deep();
        let kind = v.kind();
        let scalar = match (kind, v.load_or_zero()) {
            (Kind::Interface, _) => return Err(Error::NilAccess("interface")),
            (Kind::Pointer, _) => return Err(Error::NilAccess("pointer")),
            (Kind::Time, _) => {
                let (secs, nsec, offset) = v.time_parts().unwrap_or_default();
                Scalar::Time(time::from_parts(secs, nsec, offset)?)
            }
            (Kind::Uuid, _) => Scalar::Uuid(v.uuid_bytes().unwrap_or_default()),
            (Kind::Bytes, _) => Scalar::Bytes(v.bytes_vec().unwrap_or_default()),
            (_, Data::Bool(b)) => Scalar::Bool(b),
            (k, Data::Int(i)) => Scalar::Int(i, k),
            (k, Data::Uint(u)) => Scalar::Uint(u, k),
            (k, Data::Float(f)) => Scalar::Float(f, k),
            (k, Data::Complex(re, im)) => Scalar::Complex(re, im, k),
            (_, Data::String(s)) => Scalar::String(s),
            (k, _) => return Err(Error::unconvertible(k, "basic kind")),
        };
        Ok(scalar)
    }

    fn kind(&self) -> Kind {
        match self {
            Scalar::Bool(_) => Kind::Bool,
            Scalar::Int(_, k) | Scalar::Uint(_, k) | Scalar::Float(_, k) => *k,
            Scalar::Complex(.., k) => *k,
            Scalar::String(_) => Kind::String,
            Scalar::Bytes(_) => Kind::Bytes,
            Scalar::Time(_) => Kind::Time,
            Scalar::Uuid(_) => Kind::Uuid,
        }
    }

    fn unconvertible(&self, to: Kind) -> Error {
        Error::unconvertible(self.kind(), to)
    }

    pub fn to_bool(&self) -> Result<bool> {
        match self {
            Scalar::Bool(b) => Ok(*b),
            Scalar::Int(i, _) => Ok(*i != 0),
            Scalar::Uint(u, _) => Ok(*u != 0),
            Scalar::Float(f, _) => Ok(*f != 0.0),
            Scalar::Complex(re, im, _) => Ok(*re != 0.0 || *im != 0.0),
            Scalar::String(s) => {
                let lower = s.trim().to_ascii_lowercase();
                if TRUE_LITERALS.contains(&lower.as_str()) {
                    Ok(true)
                } else if FALSE_LITERALS.contains(&lower.as_str()) {
                    Ok(false)
                } else {
                    Err(Error::parse(s.as_str(), "bool", "not a boolean literal"))
                }
            }
            Scalar::Bytes(b) => Ok(b.first().is_some_and(|b| *b != 0)),
            Scalar::Time(t) => {
                let (secs, nsec, _) = time::to_parts(t);
                Ok(secs != 0 || nsec != 0)
            }
            Scalar::Uuid(u) => Ok(u.iter().any(|b| *b != 0)),
        }
    }

    /// Integer value before the destination bounds check.
    fn to_wide(&self, to: Kind) -> Result<i128> {
        match self {
            Scalar::Bool(b) => Ok(*b as i128),
            Scalar::Int(i, _) => Ok(*i as i128),
            Scalar::Uint(u, _) => Ok(*u as i128),
            Scalar::Float(f, _) => round(*f),
            Scalar::String(s) => {
                let text = s.trim();
                if let Ok(i) = text.parse::<i128>() {
                    return Ok(i);
                }
                match text.parse::<f64>() {
                    Ok(f) => round(f),
                    Err(e) => Err(Error::parse(s.as_str(), "integer", e)),
                }
            }
            Scalar::Bytes(b) => read_le(b, to.is_signed()),
            Scalar::Time(t) => Ok(time::unix_nanos(t)? as i128),
            Scalar::Complex(..) | Scalar::Uuid(_) => Err(self.unconvertible(to)),
        }
    }

    /// Signed integer fitting kind `to`.
    pub fn to_int(&self, to: Kind) -> Result<i64> {
        let wide = self.to_wide(to)?;
        let (min, max) = to.signed_bounds().unwrap_or((i64::MIN, i64::MAX));
        if wide < min as i128 || wide > max as i128 {
            return Err(Error::OutOfRange(format!("{wide} does not fit {to}")));
        }
        Ok(wide as i64)
    }

    /// Unsigned integer fitting kind `to`.
    pub fn to_uint(&self, to: Kind) -> Result<u64> {
        let wide = self.to_wide(to)?;
        let max = to.unsigned_max().unwrap_or(u64::MAX);
        if wide < 0 || wide > max as i128 {
            return Err(Error::OutOfRange(format!("{wide} does not fit {to}")));
        }
        Ok(wide as u64)
    }

    /// Float of kind `to`. Integers must be exactly representable.
    pub fn to_float(&self, to: Kind) -> Result<f64> {
        let single = to == Kind::Float32;
        let exact = |wide: i128| {
            let f = if single {
                (wide as f32) as f64
            } else {
                wide as f64
            };
            if f as i128 == wide {
                Ok(f)
            } else {
                Err(Error::OutOfRange(format!("{wide} is not exact as {to}")))
            }
        };
        let f = match self {
            Scalar::Bool(b) => return Ok(*b as u8 as f64),
            Scalar::Int(i, _) => return exact(*i as i128),
            Scalar::Uint(u, _) => return exact(*u as i128),
            Scalar::Float(f, _) => *f,
            Scalar::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| Error::parse(s.as_str(), "float", e))?,
            Scalar::Bytes(b) => match b.len() {
                4 => f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64,
                8 => f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]),
                n => {
                    return Err(Error::parse(
                        format!("{n} bytes"),
                        "float",
                        "IEEE-754 needs 4 or 8 bytes",
                    ))
                }
            },
            Scalar::Time(t) => time::unix_nanos(t)? as f64,
            Scalar::Complex(..) | Scalar::Uuid(_) => return Err(self.unconvertible(to)),
        };
        narrow(f, to)
    }

    pub fn to_complex(&self, to: Kind) -> Result<(f64, f64)> {
        let part = if to == Kind::Complex64 {
            Kind::Float32
        } else {
            Kind::Float64
        };
        match self {
            Scalar::Complex(re, im, _) => Ok((narrow(*re, part)?, narrow(*im, part)?)),
            Scalar::String(s) => {
                let (re, im) = parse_complex(s)?;
                Ok((narrow(re, part)?, narrow(im, part)?))
            }
            Scalar::Bool(_) | Scalar::Int(..) | Scalar::Uint(..) | Scalar::Float(..) => {
                Ok((self.to_float(part)?, 0.0))
            }
            _ => Err(self.unconvertible(to)),
        }
    }

    pub fn to_text(&self) -> Result<String> {
        let text = match self {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i, _) => i.to_string(),
            Scalar::Uint(u, _) => u.to_string(),
            Scalar::Float(f, k) => float_text(*f, *k),
            Scalar::Complex(re, im, k) => {
                let part = if *k == Kind::Complex64 {
                    Kind::Float32
                } else {
                    Kind::Float64
                };
                let im = float_text(*im, part);
                let sign = if im.starts_with('-') { "" } else { "+" };
                format!("({}{sign}{im}i)", float_text(*re, part))
            }
            Scalar::String(s) => s.clone(),
            Scalar::Bytes(b) => std::str::from_utf8(b)?.to_string(),
            Scalar::Time(t) => time::rfc3339(t),
            Scalar::Uuid(u) => uuid::Uuid::from_bytes(*u).hyphenated().to_string(),
        };
        Ok(text)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let bytes = match self {
            Scalar::Bool(b) => vec![*b as u8],
            Scalar::Int(i, k) => i.to_le_bytes()[..k.size()?].to_vec(),
            Scalar::Uint(u, k) => u.to_le_bytes()[..k.size()?].to_vec(),
            Scalar::Float(f, Kind::Float32) => (*f as f32).to_le_bytes().to_vec(),
            Scalar::Float(f, _) => f.to_le_bytes().to_vec(),
            Scalar::Complex(re, im, Kind::Complex64) => {
                let mut out = (*re as f32).to_le_bytes().to_vec();
                out.extend_from_slice(&(*im as f32).to_le_bytes());
                out
            }
            Scalar::Complex(re, im, _) => {
                let mut out = re.to_le_bytes().to_vec();
                out.extend_from_slice(&im.to_le_bytes());
                out
            }
            Scalar::String(s) => s.as_bytes().to_vec(),
            Scalar::Bytes(b) => b.clone(),
            Scalar::Time(t) => time::unix_nanos(t)?.to_le_bytes().to_vec(),
            Scalar::Uuid(u) => u.to_vec(),
        };
        Ok(bytes)
    }

    pub fn to_time(&self) -> Result<DateTime<FixedOffset>> {
        match self {
            Scalar::Time(t) => Ok(*t),
            Scalar::String(s) => time::parse(s),
            Scalar::Int(..) | Scalar::Uint(..) | Scalar::Float(..) | Scalar::Bytes(_) => {
                time::from_unix_nanos(self.to_int(Kind::Int64)?)
            }
            _ => Err(self.unconvertible(Kind::Time)),
        }
    }

    pub fn to_uuid(&self) -> Result<[u8; 16]> {
        match self {
            Scalar::Uuid(u) => Ok(*u),
            Scalar::String(s) => uuid::Uuid::parse_str(s.trim())
                .map(|u| *u.as_bytes())
                .map_err(|e| Error::parse(s.as_str(), "uuid", e)),
            Scalar::Bytes(b) => <[u8; 16]>::try_from(b.as_slice())
                .map_err(|_| Error::OutOfRange(format!("uuid needs 16 bytes, found {}", b.len()))),
            _ => Err(self.unconvertible(Kind::Uuid)),
        }
    }

    /// Handle of the basic type `ty` holding this scalar.
    pub fn into_value(self, ty: &Type) -> Result<Value> {
        let to = ty.kind();
        let data = match to {
            Kind::Bool => Data::Bool(self.to_bool()?),
            k if k.is_signed() => Data::Int(self.to_int(k)?),
            k if k.is_unsigned() => Data::Uint(self.to_uint(k)?),
            k if k.is_float() => Data::Float(self.to_float(k)?),
            k if k.is_complex() => {
                let (re, im) = self.to_complex(k)?;
                Data::Complex(re, im)
            }
            Kind::String => Data::String(self.to_text()?),
            Kind::Bytes => Value::from_bytes(&self.to_bytes()?).load_or_zero(),
            Kind::Uuid => Value::from_uuid_bytes(self.to_uuid()?).load_or_zero(),
            Kind::Time => {
                let (secs, nsec, offset) = time::to_parts(&self.to_time()?);
                Value::from_time_parts(secs, nsec, offset).load_or_zero()
            }
            _ => return Err(self.unconvertible(to)),
        };
        Ok(Value::from_data(ty.clone(), data))
    }
}

/// Round half away from zero; non-finite values have no integer.
fn round(f: f64) -> Result<i128> {
    if !f.is_finite() {
        return Err(Error::OutOfRange(format!("{f} has no integer value")));
    }
    Ok(f.round() as i128)
}

/// Narrow to single precision when `to` is `Float32`.
fn narrow(f: f64, to: Kind) -> Result<f64> {
    if to != Kind::Float32 {
        return Ok(f);
    }
    if f.is_finite() && f.abs() > f32::MAX as f64 {
        return Err(Error::OutOfRange(format!("{f} does not fit float32")));
    }
    Ok((f as f32) as f64)
}

/// Little-endian integer of up to 8 bytes, sign-extended from its width.
fn read_le(bytes: &[u8], signed: bool) -> Result<i128> {
    if bytes.len() > 8 {
        return Err(Error::OutOfRange(format!(
            "{} bytes do not fit a 64-bit integer",
            bytes.len()
        )));
    }
    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    let raw = u64::from_le_bytes(buf);
    let bits = bytes.len() * 8;
    if signed && bits > 0 && bits < 64 && (raw >> (bits - 1)) & 1 == 1 {
        return Ok(raw as i128 - (1i128 << bits));
    }
    if signed && bits == 64 {
        return Ok(raw as i64 as i128);
    }
    Ok(raw as i128)
}

/// Reads the `(re+imi)` text [`Scalar::to_text`] writes. The parentheses
/// are optional, a bare real has no imaginary part and `2i` has no real part.
fn parse_complex(s: &str) -> Result<(f64, f64)> {
    let text = s.trim();
    let inner = text
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(text)
        .trim();
    let part = |p: &str| {
        p.parse::<f64>()
            .map_err(|e| Error::parse(s, "complex", e))
    };
    let Some(body) = inner.strip_suffix('i') else {
        return Ok((part(inner)?, 0.0));
    };
    // The split sign is the last one not opening an exponent.
    let bytes = body.as_bytes();
    let split = (1..bytes.len())
        .rev()
        .find(|&i| matches!(bytes[i], b'+' | b'-') && !matches!(bytes[i - 1], b'e' | b'E'));
    match split {
        Some(i) => Ok((part(&body[..i])?, part(&body[i..])?)),
        None => Ok((0.0, part(body)?)),
    }
}

/// Shortest decimal that reads back to the same value at the kind's width.
pub(crate) fn float_text(f: f64, kind: Kind) -> String {
    if kind == Kind::Float32 {
        (f as f32).to_string()
    } else {
        f.to_string()
    }
}

impl Value {
    fn scalar_op<T>(&self, op: impl FnOnce(&Scalar) -> Result<T>) -> Result<T> {
        op(&Scalar::read(self)?)
    }

    pub fn try_to_bool(&self) -> Result<bool> {
        self.scalar_op(Scalar::to_bool)
    }

    pub fn try_to_int(&self) -> Result<i64> {
        self.scalar_op(|s| s.to_int(Kind::Int64))
    }

    pub fn try_to_uint(&self) -> Result<u64> {
        self.scalar_op(|s| s.to_uint(Kind::Uint64))
    }

    pub fn try_to_float(&self) -> Result<f64> {
        self.scalar_op(|s| s.to_float(Kind::Float64))
    }

    pub fn try_to_string(&self) -> Result<String> {
        self.scalar_op(Scalar::to_text)
    }

    pub fn try_to_bytes(&self) -> Result<Vec<u8>> {
        self.scalar_op(Scalar::to_bytes)
    }

    pub fn try_to_time(&self) -> Result<DateTime<FixedOffset>> {
        self.scalar_op(Scalar::to_time)
    }

    pub fn try_to_uuid(&self) -> Result<uuid::Uuid> {
        self.scalar_op(Scalar::to_uuid).map(uuid::Uuid::from_bytes)
    }

    /// Panics where [`Value::try_to_bool`] fails.
    pub fn to_bool(&self) -> bool {
        self.try_to_bool()
            .unwrap_or_else(|e| panic!("to_bool: {e}"))
    }

    /// Panics where [`Value::try_to_int`] fails.
    pub fn to_int(&self) -> i64 {
        self.try_to_int().unwrap_or_else(|e| panic!("to_int: {e}"))
    }

    /// Panics where [`Value::try_to_uint`] fails.
    pub fn to_uint(&self) -> u64 {
        self.try_to_uint()
            .unwrap_or_else(|e| panic!("to_uint: {e}"))
    }

    pub fn to_float(&self) -> f64 {
        self.try_to_float()
            .unwrap_or_else(|e| panic!("to_float: {e}"))
    }

    pub fn to_string(&self) -> String {
        self.try_to_string()
            .unwrap_or_else(|e| panic!("to_string: {e}"))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.try_to_bytes()
            .unwrap_or_else(|e| panic!("to_bytes: {e}"))
    }

    pub fn to_time(&self) -> DateTime<FixedOffset> {
        self.try_to_time()
            .unwrap_or_else(|e| panic!("to_time: {e}"))
    }

    pub fn to_uuid(&self) -> uuid::Uuid {
        self.try_to_uuid()
            .unwrap_or_else(|e| panic!("to_uuid: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture;

    fn int_ty(kind: Kind) -> Type {
        Type::of_kind(kind).unwrap()
    }

    #[test]
    fn test_int_bounds_never_wrap() {
        assert!(matches!(capture(&-1i32).try_to_uint(), Err(Error::OutOfRange(_))));
        assert!(matches!(
            capture(&300u16).convert(&int_ty(Kind::Uint8)),
            Err(Error::OutOfRange(_))
        ));
        assert!(matches!(
            capture(&u64::MAX).try_to_int(),
            Err(Error::OutOfRange(_))
        ));
        assert_eq!(capture(&-128i64).convert(&int_ty(Kind::Int8)).unwrap().to_int(), -128);
    }

    #[test]
    fn test_float_rounds_then_checks() {
        assert_eq!(capture(&2.5f64).try_to_int(), Ok(3));
        assert_eq!(capture(&-2.5f64).try_to_int(), Ok(-3));
        assert!(matches!(capture(&f64::NAN).try_to_int(), Err(Error::OutOfRange(_))));
        assert!(matches!(capture(&-0.6f64).try_to_uint(), Err(Error::OutOfRange(_))));
        assert!(matches!(
            capture(&1e40f64).convert(&int_ty(Kind::Float32)),
            Err(Error::OutOfRange(_))
        ));
    }

    #[test]
    fn test_int_to_float_is_exact() {
        assert_eq!(capture(&(1i64 << 53)).try_to_float(), Ok(9_007_199_254_740_992.0));
        assert!(matches!(
            capture(&((1i64 << 53) + 1)).try_to_float(),
            Err(Error::OutOfRange(_))
        ));
        assert!(matches!(
            capture(&16_777_217i32).convert(&int_ty(Kind::Float32)),
            Err(Error::OutOfRange(_))
        ));
    }

    #[test]
    fn test_string_literals() {
        for s in ["1", "t", "TRUE", "y", "yes", "on"] {
            assert_eq!(capture(s).try_to_bool(), Ok(true), "{s}");
        }
        for s in ["0", "f", "False", "n", "no", "off"] {
            assert_eq!(capture(s).try_to_bool(), Ok(false), "{s}");
        }
        assert!(matches!(capture("maybe").try_to_bool(), Err(Error::Parse { .. })));
        assert_eq!(capture(" 42 ").try_to_int(), Ok(42));
        assert_eq!(capture("1.5").try_to_float(), Ok(1.5));
        assert!(matches!(capture("x1").try_to_int(), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_text_rendering() {
        assert_eq!(capture(&0.1f32).to_string(), "0.1");
        assert_eq!(capture(&1.0f64).to_string(), "1");
        assert_eq!(capture(&false).to_string(), "false");
        let c = Value::scalar(Kind::Complex128, Data::Complex(1.0, -2.5));
        assert_eq!(c.to_string(), "(1-2.5i)");
        let c = Value::scalar(Kind::Complex128, Data::Complex(1.0, 2.0));
        assert_eq!(c.to_string(), "(1+2i)");
    }

    #[test]
    fn test_complex_text_reads_back() {
        let c128 = int_ty(Kind::Complex128);
        let parse = |s: &str| -> Result<(f64, f64)> {
            match Scalar::read(&capture(s).convert(&c128)?)? {
                Scalar::Complex(re, im, _) => Ok((re, im)),
                other => panic!("not a complex: {other:?}"),
            }
        };
        assert_eq!(parse("(1.5+0i)"), Ok((1.5, 0.0)));
        assert_eq!(parse("(1-2.5i)"), Ok((1.0, -2.5)));
        assert_eq!(parse(" -3 "), Ok((-3.0, 0.0)));
        assert_eq!(parse("2i"), Ok((0.0, 2.0)));
        assert_eq!(parse("(1e-3+2E+2i)"), Ok((0.001, 200.0)));
        assert!(matches!(parse("(1+2j)"), Err(Error::Parse { .. })));
        assert!(matches!(parse("(1+)"), Err(Error::Parse { .. })));

        for (re, im) in [(0.25, -8.0), (-1.0, 1e-7), (f64::MAX, 0.0)] {
            let c = Value::scalar(Kind::Complex128, Data::Complex(re, im));
            assert_eq!(parse(&c.to_string()), Ok((re, im)));
        }
    }

    #[test]
    fn test_bytes_fixed_width() {
        assert_eq!(capture(&-2i16).to_bytes(), vec![0xfe, 0xff]);
        assert_eq!(capture(&1isize).to_bytes().len(), 8);
        let back = Value::from_bytes(&[0xfe, 0xff]).convert(&int_ty(Kind::Int16));
        assert_eq!(back.unwrap().to_int(), -2);
        assert_eq!(Value::from_bytes(&[0xfe, 0xff]).try_to_uint(), Ok(0xfffe));
        assert_eq!(Value::from_bytes(&1.5f64.to_le_bytes()).try_to_float(), Ok(1.5));
        assert!(Value::from_bytes(&[0xff, 0xfe]).try_to_string().is_err());
    }

    #[test]
    fn test_uuid_cells() {
        let text = "267b3229-2566-4426-a826-8d80126e719a";
        let u = capture(text).convert(&Type::uuid()).unwrap();
        assert_eq!(u.kind(), Kind::Uuid);
        assert_eq!(&u.to_bytes()[..4], &[0x26, 0x7b, 0x32, 0x29]);
        assert_eq!(u.to_string(), text);
        assert!(matches!(
            Value::from_bytes(&[1, 2, 3]).try_to_uuid(),
            Err(Error::OutOfRange(_))
        ));
        assert!(matches!(capture(&5i32).try_to_uuid(), Err(Error::Unconvertible { .. })));
    }

    #[test]
    fn test_time_cells() {
        let t = capture("1970-01-01 00:00:01").convert(&Type::time()).unwrap();
        assert_eq!(t.try_to_int(), Ok(1_000_000_000));
        assert!(t.to_bool());
        let back = capture(&1_000_000_000i64).convert(&Type::time()).unwrap();
        assert_eq!(back.to_string(), "1970-01-01T00:00:01Z");
        assert!(!Value::zero(&Type::time()).to_bool());
    }

    #[test]
    fn test_pointers_and_interfaces_are_chased() {
        let p = crate::capture_pointer(&7u8);
        assert_eq!(p.try_to_int(), Ok(7));
        assert_eq!(p.elem().unwrap().boxed().try_to_int(), Ok(7));
        let nil_ptr = Value::zero(&Type::int().pointer_to());
        assert_eq!(nil_ptr.try_to_int(), Err(Error::NilAccess("pointer")));
    }

    #[test]
    #[should_panic(expected = "to_uint")]
    fn test_panicking_flavour() {
        capture(&-1isize).to_uint();
    }
}
