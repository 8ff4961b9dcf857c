// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! JSON-shaped rendering of any value.
//!
//! Containers already on the current path render as the string
//! `"*recursive"`, so a cyclic graph still produces balanced, parseable
//! output. The ancestry list holds `(descriptor, storage)` pairs of the
//! containers being rendered; pointers themselves are transparent.
//!
//! # Example
//!
//! ```rust
//! use shade::{capture, serialize};
//!
//! assert_eq!(serialize(&capture(&vec!["a", "b"])), r#"["a","b"]"#);
//! assert_eq!(serialize(&capture(&1.5f64)), "1.5");
//! ```

use crate::config::{NonFiniteFloat, SerializeConfig, RECURSIVE_MARKER, TIME_FORMAT};
use crate::convert::float_text;
use crate::kind::Kind;
use crate::value::{Data, Value};

/// Render with field names and bucket-order maps.
pub fn serialize(v: &Value) -> String {
    Serializer::new().serialize(v)
}

/// Render with struct fields named by `tag` (`-` skips a field, a missing
/// tag falls back to the field name).
pub fn serialize_with_tag(v: &Value, tag: &str) -> String {
    Serializer::with_config(SerializeConfig::default().with_tag(tag)).serialize(v)
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| String::from("\"\""))
}

/// Reusable renderer.
#[derive(Debug, Default)]
pub struct Serializer {
    config: SerializeConfig,
    ancestry: Vec<(usize, usize)>,
    out: String,
}

impl Serializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SerializeConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &SerializeConfig {
        &self.config
    }

    pub fn serialize(&mut self, v: &Value) -> String {
        self.out.clear();
        self.ancestry.clear();
        self.value(v);
        std::mem::take(&mut self.out)
    }

    /// Push `v` onto the path; `false` when it is already there.
    fn enter(&mut self, v: &Value, addr: usize) -> bool {
        let key = (v.ty().id(), addr);
        if self.ancestry.contains(&key) {
            return false;
        }
        self.ancestry.push(key);
        true
    }

    fn value(&mut self, v: &Value) {
        let data = match v.load() {
            Some(data) if !data.is_nil() => data,
            _ => {
                self.out.push_str("null");
                return;
            }
        };
        match (v.kind(), data) {
            (Kind::Interface, Data::Interface(Some(inner))) => self.value(&inner),
            (Kind::Pointer, Data::Pointer(Some(_))) => match v.elem() {
                Ok(target) => self.value(&target),
                Err(_) => self.out.push_str("null"),
            },
            (Kind::Bool, Data::Bool(b)) => self.out.push_str(if b { "true" } else { "false" }),
            (_, Data::Int(i)) => self.out.push_str(&i.to_string()),
            (_, Data::Uint(u)) => self.out.push_str(&u.to_string()),
            (k, Data::Float(f)) => self.float(f, k),
            (_, Data::Complex(..)) | (Kind::Uuid, _) => {
                let text = v.try_to_string().unwrap_or_default();
                self.out.push_str(&quote(&text));
            }
            (_, Data::String(s)) => self.out.push_str(&quote(&s)),
            (Kind::Time, _) => match v.try_to_time() {
                Ok(t) => self.out.push_str(&quote(&t.format(TIME_FORMAT).to_string())),
                Err(_) => self.out.push_str("null"),
            },
            (Kind::Bytes, _) => {
                let bytes = v.bytes_vec().unwrap_or_default();
                match std::str::from_utf8(&bytes) {
                    Ok(text) => self.out.push_str(&quote(text)),
                    Err(_) => {
                        let items: Vec<String> = bytes.iter().map(u8::to_string).collect();
                        self.out.push('[');
                        self.out.push_str(&items.join(","));
                        self.out.push(']');
                    }
                }
            }
            (Kind::Array | Kind::Slice | Kind::Struct | Kind::Map, _) => self.container(v),
            _ => self.out.push_str("null"),
        }
    }

    fn float(&mut self, f: f64, kind: Kind) {
        if f.is_finite() {
            self.out.push_str(&float_text(f, kind));
            return;
        }
        log::debug!("non-finite {kind} {f} rendered as {:?}", self.config.non_finite);
        match self.config.non_finite {
            NonFiniteFloat::Null => self.out.push_str("null"),
            NonFiniteFloat::Quoted => {
                let text = if f.is_nan() {
                    "NaN"
                } else if f > 0.0 {
                    "+Inf"
                } else {
                    "-Inf"
                };
                self.out.push_str(&quote(text));
            }
        }
    }

    fn container(&mut self, v: &Value) {
        let addr = match v.load() {
            Some(Data::Slice(Some(header))) => header.addr(),
            Some(Data::Map(Some(map))) => std::sync::Arc::as_ptr(&map) as usize,
            _ => v.addr().unwrap_or_default(),
        };
        if !self.enter(v, addr) {
            self.out.push_str(&quote(RECURSIVE_MARKER));
            return;
        }
        match v.ty().raw_kind() {
            Kind::Struct => self.fields(v),
            Kind::Map => self.entries(v),
            _ => self.items(v),
        }
        self.ancestry.pop();
    }

    fn items(&mut self, v: &Value) {
        self.out.push('[');
        let len = v.len().unwrap_or_else(|e| {
            log::warn!("{} rendered empty: {e}", v.ty().name());
            0
        });
        for i in 0..len {
            if i > 0 {
                self.out.push(',');
            }
            match v.index(i) {
                Ok(item) => self.value(&item),
                Err(e) => {
                    log::warn!("element {i} of {} rendered as null: {e}", v.ty().name());
                    self.out.push_str("null");
                }
            }
        }
        self.out.push(']');
    }

    fn fields(&mut self, v: &Value) {
        self.out.push('{');
        let mut first = true;
        for (i, field) in v.ty().fields().iter().enumerate() {
            let name = match &self.config.tag {
                Some(tag) => field.name_for_tag(tag),
                None => Some(field.name.clone()),
            };
            let (Some(name), Ok(item)) = (name, v.index(i)) else {
                continue;
            };
            if !first {
                self.out.push(',');
            }
            first = false;
            self.out.push_str(&quote(&name));
            self.out.push(':');
            self.value(&item);
        }
        self.out.push('}');
    }

    fn entries(&mut self, v: &Value) {
        let entries = match v.entries() {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("map {} rendered as null: {e}", v.ty().name());
                self.out.push_str("null");
                return;
            }
        };
        let mut entries: Vec<(String, Value)> = entries
            .into_iter()
            .filter_map(|(k, val)| match k.try_to_string() {
                Ok(key) => Some((key, val)),
                Err(e) => {
                    log::warn!("map key of {} skipped: {e}", v.ty().name());
                    None
                }
            })
            .collect();
        if self.config.sort_keys {
            entries.sort_by(|a, b| a.0.cmp(&b.0));
        }
        self.out.push('{');
        for (i, (key, item)) in entries.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.out.push_str(&quote(key));
            self.out.push(':');
            self.value(item);
        }
        self.out.push('}');
    }
}
