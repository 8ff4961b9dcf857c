// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Struct tag micro-language.
//!
//! A tag is `name1:"value1" name2:"value2"`. Values are double-quoted and may
//! contain backslash escapes. A value can itself hold sub-tags written with
//! single quotes: `db:"col:'user_id' type:'bigint'"`.

use crate::error::{Error, Result};
use std::fmt;

/// Raw tag string attached to a struct field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StructTag(String);

impl StructTag {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Parse every `name:"value"` pair, failing on the first malformed one.
    pub fn parse(&self) -> Result<Vec<(String, String)>> {
        parse_pairs(&self.0, '"')
    }

    /// Value of tag `name`, or `None` when absent or when the tag is malformed.
    pub fn get(&self, name: &str) -> Option<String> {
        self.lookup(name).ok().flatten()
    }

    /// Like [`get`](Self::get) but reports malformed tags.
    pub fn lookup(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .parse()?
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value))
    }

    /// Sub-tags held inside the value of tag `name`.
    pub fn sub_tags(&self, name: &str) -> Result<Vec<(String, String)>> {
        match self.lookup(name)? {
            Some(value) => parse_pairs(&value, '\''),
            None => Ok(Vec::new()),
        }
    }

    /// Single sub-tag value: `sub("db", "col")` on `db:"col:'id'"` gives `id`.
    pub fn sub(&self, name: &str, sub_name: &str) -> Option<String> {
        self.sub_tags(name)
            .ok()?
            .into_iter()
            .find(|(key, _)| key == sub_name)
            .map(|(_, value)| value)
    }
}

impl fmt::Display for StructTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StructTag {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

fn malformed(raw: &str, reason: impl Into<String>) -> Error {
    Error::MalformedTag {
        tag: raw.to_string(),
        reason: reason.into(),
    }
}

fn parse_pairs(raw: &str, quote: char) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    let mut chars = raw.char_indices().peekable();

    loop {
        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
        let Some(&(start, _)) = chars.peek() else {
            break;
        };

        let mut end = start;
        while let Some(&(i, c)) = chars.peek() {
            if c == ':' {
                break;
            }
            if c.is_whitespace() || c == '"' || c == '\'' || c.is_control() {
                return Err(malformed(raw, format!("invalid character {c:?} in name")));
            }
            end = i + c.len_utf8();
            chars.next();
        }
        if end == start {
            return Err(malformed(raw, format!("empty name at byte {start}")));
        }
        let name = &raw[start..end];

        if chars.next().map(|(_, c)| c) != Some(':') {
            return Err(malformed(raw, format!("missing ':' after {name:?}")));
        }
        if chars.next().map(|(_, c)| c) != Some(quote) {
            return Err(malformed(
                raw,
                format!("value of {name:?} must start with {quote}"),
            ));
        }

        let mut value = String::new();
        let mut closed = false;
        while let Some((_, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                c if c == quote => {
                    closed = true;
                    break;
                }
                c => value.push(c),
            }
        }
        if !closed {
            return Err(malformed(raw, format!("unterminated value of {name:?}")));
        }
        pairs.push((name.to_string(), value));
    }

    Ok(pairs)
}
