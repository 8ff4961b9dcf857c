// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Shade - dynamic value handles
//!
//! A uniform run-time handle over host values: introspection, navigation,
//! coercive conversion, structural mutation, a self-describing binary codec
//! and a JSON-shaped serializer that survives cycles.
//!
//! ## Quick Start
//!
//! ```rust
//! use shade::{capture, capture_pointer, codec, new_empty, serialize, Kind, Type};
//! use std::collections::HashMap;
//!
//! let mut scores = HashMap::new();
//! scores.insert("ada".to_string(), vec![3i32, 5]);
//!
//! let v = capture(&scores);
//! assert_eq!(v.kind(), Kind::Map);
//! assert_eq!(serialize(&v), r#"{"ada":[3,5]}"#);
//!
//! // Coercion on assignment.
//! let n = capture_pointer(&0u8);
//! n.elem().unwrap().set(&capture("42")).unwrap();
//! assert_eq!(n.elem().unwrap().to_uint(), 42);
//!
//! // Binary round trip into a fresh value of the same type.
//! let bytes = codec::encode(&v).unwrap();
//! let dst = new_empty(v.ty());
//! codec::decode(&bytes, &dst);
//! assert_eq!(serialize(&dst), serialize(&v));
//! # let _ = Type::int();
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |   capture (Reflect)  |  serialize  |  codec (encode/decode)   |
//! +---------------------------------------------------------------+
//! |   convert (scalar table, container coercions)                 |
//! +---------------------------------------------------------------+
//! |   Value: navigate | mutate | alloc | BucketMap                |
//! +---------------------------------------------------------------+
//! |   types: Type descriptors, registry, StructBuilder, tags      |
//! +---------------------------------------------------------------+
//! |   kind: Kind enum, predicates, sizes                          |
//! +---------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Value`] | Handle: descriptor, shared storage, flags |
//! | [`Type`] | Interned descriptor, compared by identity |
//! | [`Kind`] | Closed set of shapes, one wire byte each |
//! | [`BucketMap`] | Map storage with an observable bucket walk |
//! | [`Error`] | Every failure, tagged by kind |

// Lets `reflect_struct!` expand inside this crate's own tests.
extern crate self as shade;

/// Self-describing binary encoding.
pub mod codec;
/// Constants and runtime knobs.
pub mod config;
mod convert;
mod error;
mod kind;
mod macros;
mod serialize;
/// Type descriptors and the intern registry.
pub mod types;
mod value;

pub use config::{CodecConfig, NonFiniteFloat, SerializeConfig};
pub use error::{Error, Result};
pub use kind::{Kind, MAX_KIND};
pub use serialize::{serialize, serialize_with_tag, Serializer};
pub use types::{StructBuilder, Type};
pub use value::{
    capture, capture_pointer, descriptor_of, kind_of, new_deep, new_empty, new_populated,
    BucketIter, BucketMap, Flags, FromValue, MapKey, Reflect, ReflectKey, Value, WalkState,
};

#[doc(hidden)]
pub mod __private {
    pub use crate::value::{capture_struct, field_type, reflect_struct_type};
}
