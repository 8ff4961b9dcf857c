// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by every shade operation.

use crate::kind::Kind;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Kind-tagged failure raised by navigation, mutation, conversion and the codecs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Operation requires a different kind (e.g. `len` on a scalar).
    #[error("{op}: expected {expected}, found {found}")]
    KindMismatch {
        op: &'static str,
        expected: String,
        found: Kind,
    },

    /// Index past the end, or a numeric value outside the destination range.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// No rule in the conversion table for this pair.
    #[error("cannot convert {from} to {to}")]
    Unconvertible { from: String, to: String },

    /// Text could not be parsed as the requested scalar.
    #[error("cannot parse {input:?} as {target}: {reason}")]
    Parse {
        input: String,
        target: &'static str,
        reason: String,
    },

    /// Struct tag string is not `name:"value" ...`.
    #[error("malformed struct tag {tag:?}: {reason}")]
    MalformedTag { tag: String, reason: String },

    /// Decoder saw an unexpected kind byte, a truncated stream or a bad length.
    #[error("corrupt encoding at offset {offset}: {reason}")]
    CorruptEncoding { offset: usize, reason: String },

    /// Dereference of a nil pointer, map, slice or interface.
    #[error("nil access: {0}")]
    NilAccess(&'static str),

    /// A pointer cycle was reached where the operation cannot represent one.
    #[error("cycle detected at {0}")]
    CycleDetected(String),

    /// Struct has no field with this name or tag.
    #[error("field not found: {0}")]
    FieldNotFound(String),

    /// Destination is not addressable or is read-only.
    #[error("value of type {0} is not settable")]
    NotSettable(String),

    /// Struct contains itself by value.
    #[error("type {0} has infinite size")]
    InfiniteSize(String),

    /// Named struct or field declared twice with different contents.
    #[error("{0} is already defined differently")]
    Redefined(String),
}

impl Error {
    pub(crate) fn kind_mismatch(op: &'static str, expected: impl Into<String>, found: Kind) -> Self {
        Self::KindMismatch {
            op,
            expected: expected.into(),
            found,
        }
    }

    pub(crate) fn unconvertible(from: impl ToString, to: impl ToString) -> Self {
        Self::Unconvertible {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub(crate) fn parse(
        input: impl Into<String>,
        target: &'static str,
        reason: impl ToString,
    ) -> Self {
        Self::Parse {
            input: input.into(),
            target,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn corrupt(offset: usize, reason: impl Into<String>) -> Self {
        Self::CorruptEncoding {
            offset,
            reason: reason.into(),
        }
    }

    /// The kind tag of this error, for callers that branch on category only.
    pub fn category(&self) -> &'static str {
        match self {
            Self::KindMismatch { .. } => "KindMismatch",
            Self::OutOfRange(_) => "OutOfRange",
            Self::Unconvertible { .. } => "Unconvertible",
            Self::Parse { .. } => "ParseError",
            Self::MalformedTag { .. } => "MalformedTag",
            Self::CorruptEncoding { .. } => "CorruptEncoding",
            Self::NilAccess(_) => "NilAccess",
            Self::CycleDetected(_) => "CycleDetected",
            Self::FieldNotFound(_) => "FieldNotFound",
            Self::NotSettable(_) => "NotSettable",
            Self::InfiniteSize(_) => "InfiniteSize",
            Self::Redefined(_) => "Redefined",
        }
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(e: std::str::Utf8Error) -> Self {
        Self::parse("", "utf-8 string", e)
    }
}

impl From<uuid::Error> for Error {
    fn from(e: uuid::Error) -> Self {
        Self::parse("", "uuid", e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::parse("", "json", e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_context() {
        let e = Error::kind_mismatch("len", "array, slice, map, string or struct", Kind::Bool);
        assert_eq!(
            e.to_string(),
            "len: expected array, slice, map, string or struct, found bool"
        );

        let e = Error::corrupt(3, "truncated length");
        assert_eq!(e.to_string(), "corrupt encoding at offset 3: truncated length");
        assert_eq!(e.category(), "CorruptEncoding");
    }
}
