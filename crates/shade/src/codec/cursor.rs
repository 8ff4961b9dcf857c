// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Little-endian byte cursors for the binary codec.

use crate::error::{Error, Result};

/// Generate append methods for primitive types.
macro_rules! impl_write_le {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self, value: $type) {
            self.buffer.extend_from_slice(&value.to_le_bytes());
        }
    };
}

/// Generate bounds-checked read methods for primitive types.
///
/// A short buffer fails with `CorruptEncoding` at the offset of the read.
macro_rules! impl_read_le {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> Result<$type> {
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(self.read_bytes($size)?);
            Ok(<$type>::from_le_bytes(bytes))
        }
    };
}

/// Growable output buffer.
#[derive(Debug, Default)]
pub struct Writer {
    buffer: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    impl_write_le!(write_u8, u8);
    impl_write_le!(write_u64_le, u64);
    impl_write_le!(write_f32_le, f32);
    impl_write_le!(write_f64_le, f64);

    /// Low `width` bytes of `value`, little-endian.
    pub fn write_uint_le(&mut self, value: u64, width: usize) {
        self.buffer.extend_from_slice(&value.to_le_bytes()[..width]);
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

/// Read cursor over a borrowed buffer.
pub struct Reader<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    impl_read_le!(read_u64_le, u64, 8);
    impl_read_le!(read_f32_le, f32, 4);
    impl_read_le!(read_f64_le, f64, 8);

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// `width` little-endian bytes, zero-extended.
    pub fn read_uint_le(&mut self, width: usize) -> Result<u64> {
        let mut bytes = [0u8; 8];
        bytes[..width].copy_from_slice(self.read_bytes(width)?);
        Ok(u64::from_le_bytes(bytes))
    }

    /// `width` little-endian bytes, sign-extended.
    pub fn read_int_le(&mut self, width: usize) -> Result<i64> {
        let raw = self.read_uint_le(width)?;
        let shift = 64 - 8 * width as u32;
        Ok(((raw << shift) as i64) >> shift)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::corrupt(self.offset, "unexpected end of buffer"));
        }
        let slice = &self.buffer[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_is_little_endian() {
        let mut w = Writer::new();
        w.write_uint_le(0xABCD, 2);
        w.write_uint_le(0x0102_0304, 3);
        w.write_f32_le(1.0);
        assert_eq!(
            w.into_inner(),
            vec![0xCD, 0xAB, 0x04, 0x03, 0x02, 0x00, 0x00, 0x80, 0x3F]
        );
    }

    #[test]
    fn test_read_overflow_reports_offset() {
        let buffer = [0u8; 3];
        let mut r = Reader::new(&buffer);
        assert_eq!(r.read_uint_le(2).expect("two bytes available"), 0);
        let err = r.read_uint_le(2).unwrap_err();
        assert_eq!(err, Error::corrupt(2, "unexpected end of buffer"));
        assert_eq!(r.remaining(), 1);
    }

    #[test]
    fn test_sign_extension() {
        let buffer = [0xFE, 0xFF, 0x7F];
        let mut r = Reader::new(&buffer);
        assert_eq!(r.read_int_le(2).unwrap(), -2);
        assert_eq!(r.read_int_le(1).unwrap(), 127);
        assert_eq!(r.remaining(), 0);

        let full = (-5i64).to_le_bytes();
        assert_eq!(Reader::new(&full).read_int_le(8).unwrap(), -5);
    }
}
