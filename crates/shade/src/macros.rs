// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `reflect_struct!`: capture support for plain host structs.

/// Implement [`Reflect`](crate::Reflect) and [`FromValue`](crate::FromValue)
/// for a struct whose fields are all capturable.
///
/// The descriptor is named after the module path and the struct name, and
/// each field may carry a struct tag. A field of type `Option<Box<Self>>`
/// yields a recursive descriptor.
///
/// # Panics
///
/// The first use of the descriptor panics when a field tag is malformed.
///
/// # Example
///
/// ```rust
/// use shade::{capture, reflect_struct, serialize_with_tag, Kind, Value};
///
/// #[derive(Debug, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
///     label: String,
/// }
///
/// reflect_struct!(Point {
///     x: r#"json:"px""#,
///     y: r#"json:"py""#,
///     label: r#"json:"-""#,
/// });
///
/// let p = Point { x: 1, y: 2, label: "origin".into() };
/// let v = capture(&p);
/// assert_eq!(v.kind(), Kind::Struct);
/// assert_eq!(serialize_with_tag(&v, "json"), r#"{"px":1,"py":2}"#);
/// assert_eq!(v.extract::<Point>().unwrap(), p);
/// ```
#[macro_export]
macro_rules! reflect_struct {
    ($name:ident { $($field:ident $(: $tag:literal)?),* $(,)? }) => {
        impl $crate::Reflect for $name {
            fn reflect_type() -> $crate::Type {
                $crate::__private::reflect_struct_type(
                    concat!(module_path!(), "::", stringify!($name)),
                    || vec![$((
                        stringify!($field),
                        $crate::__private::field_type(|s: &$name| &s.$field),
                        $crate::reflect_struct!(@tag $($tag)?),
                    )),*],
                )
            }

            fn capture(&self) -> $crate::Value {
                $crate::__private::capture_struct(
                    &<Self as $crate::Reflect>::reflect_type(),
                    vec![$($crate::Reflect::capture(&self.$field)),*],
                )
            }
        }

        impl $crate::FromValue for $name {
            fn from_value(v: &$crate::Value) -> $crate::Result<Self> {
                let v = v.elem_deep();
                Ok(Self {
                    $($field: $crate::FromValue::from_value(&v.field(stringify!($field))?)?,)*
                })
            }
        }
    };
    (@tag) => {
        ""
    };
    (@tag $tag:literal) => {
        $tag
    };
}
