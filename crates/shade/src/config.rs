// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shade configuration: constants and runtime knobs.
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: compile-time constants (wire limits, map geometry,
//!   cycle marker)
//! - **Level 2 (Dynamic)**: [`CodecConfig`] and [`SerializeConfig`], passed to
//!   the codec and serializer entry points that take a config
//!
//! Both runtime structs derive `serde` so an embedding application can load
//! them from its own configuration file.
//!
//! # Example
//!
//! ```rust
//! use shade::config::{CodecConfig, SerializeConfig, NonFiniteFloat};
//!
//! let codec = CodecConfig::default().with_max_depth(32);
//! assert_eq!(codec.max_depth, 32);
//!
//! let ser = SerializeConfig::default()
//!     .with_sort_keys(true)
//!     .with_non_finite(NonFiniteFloat::Quoted);
//! assert!(ser.sort_keys);
//! ```

use serde::{Deserialize, Serialize};

// =======================================================================
// Map geometry
// =======================================================================

/// Load factor numerator: a map grows once `count > 13/2 * buckets`.
pub const LOAD_FACTOR_NUM: usize = 13;

/// Load factor denominator.
pub const LOAD_FACTOR_DEN: usize = 2;

/// Top-hash marker: this slot and every later slot of the bucket are empty.
pub const EMPTY_REST: u8 = 0;

/// Top-hash marker: deleted slot.
pub const EMPTY_ONE: u8 = 1;

/// Smallest top-hash of a live slot.
pub const MIN_TOP_HASH: u8 = 2;

// =======================================================================
// Serializer
// =======================================================================

/// Literal emitted in place of a value already on the current path.
pub const RECURSIVE_MARKER: &str = "*recursive";

/// `chrono` format of serialized timestamps (millisecond precision).
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

// =======================================================================
// Codec limits
// =======================================================================

/// Default nesting limit of encode/decode.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Default ceiling on a single decoded length prefix (elements or bytes).
pub const DEFAULT_MAX_LEN: usize = 64 * 1024 * 1024;

// =======================================================================
// Runtime configuration
// =======================================================================

/// Limits applied by [`crate::codec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Maximum nesting of containers, pointers and interfaces.
    pub max_depth: usize,
    /// Maximum length prefix accepted by the decoder.
    pub max_len: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_len: DEFAULT_MAX_LEN,
        }
    }
}

impl CodecConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }
}

/// Rendering of NaN and infinities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonFiniteFloat {
    /// `null`
    #[default]
    Null,
    /// `"NaN"`, `"+Inf"`, `"-Inf"`
    Quoted,
}

/// Options of [`crate::serialize::Serializer`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializeConfig {
    /// Struct tag consulted for field names; `None` uses field names.
    pub tag: Option<String>,
    /// Emit map entries ordered by rendered key instead of bucket order.
    pub sort_keys: bool,
    pub non_finite: NonFiniteFloat,
}

impl SerializeConfig {
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_sort_keys(mut self, sort_keys: bool) -> Self {
        self.sort_keys = sort_keys;
        self
    }

    pub fn with_non_finite(mut self, non_finite: NonFiniteFloat) -> Self {
        self.non_finite = non_finite;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let codec = CodecConfig::default();
        assert_eq!(codec.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(codec.max_len, DEFAULT_MAX_LEN);

        let ser = SerializeConfig::default();
        assert_eq!(ser.tag, None);
        assert!(!ser.sort_keys);
        assert_eq!(ser.non_finite, NonFiniteFloat::Null);
    }

    #[test]
    fn test_load_from_json() {
        let ser: SerializeConfig =
            serde_json::from_str(r#"{"tag":"json","non_finite":"quoted"}"#).unwrap();
        assert_eq!(ser.tag.as_deref(), Some("json"));
        assert_eq!(ser.non_finite, NonFiniteFloat::Quoted);
        assert!(!ser.sort_keys);

        let codec: CodecConfig = serde_json::from_str(r#"{"max_len":16}"#).unwrap();
        assert_eq!(codec.max_len, 16);
        assert_eq!(codec.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_tophash_markers_are_ordered() {
        assert!(EMPTY_REST < EMPTY_ONE);
        assert!(EMPTY_ONE < MIN_TOP_HASH);
    }
}
