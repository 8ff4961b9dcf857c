// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptors and their intern registry.
//!
//! # Example
//!
//! ```rust
//! use shade::types::{StructBuilder, Type};
//! use shade::Kind;
//!
//! let reading = StructBuilder::new("doc::SensorReading")
//!     .kind_field("sensor_id", Kind::Uint32)
//!     .kind_field("temperature", Kind::Float64)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(reading.kind(), Kind::Struct);
//! assert_eq!(reading.field("temperature").unwrap().offset, 8);
//! assert_eq!(Type::slice_of(&reading).name(), "[]doc::SensorReading");
//! ```

mod builder;
mod descriptor;
mod registry;
mod tag;

pub use builder::StructBuilder;
pub use descriptor::{
    BucketLayout, StructField, StructLayout, Type, TypeDescriptor, BUCKET_SLOTS, POINTER_SIZE,
};
pub use registry::{registry, FieldSpec, TypeRegistry, TIME_TYPE_NAME};
pub use tag::StructTag;

pub(crate) use descriptor::Shape;
