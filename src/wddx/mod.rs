//! WDDX exchange format.
//!
//! Structured debugger and admin payloads travel as WDDX packets: XML documents holding a
//! tree of booleans, numbers, strings, arrays and structs. This module owns that tree
//! ([`Value`]), a packet wrapper ([`Packet`]) and the XML projection in [`xml`].
//!
//! # Paths
//!
//! Values are addressed by comma-separated paths. A segment made only of digits (at most
//! ten) is an array index, anything else is a struct field name:
//!
//! ```text
//! 0,COMMAND        -> data[0]["COMMAND"]
//! 0,WATCH,2        -> data[0]["WATCH"][2]
//! ```
//!
//! [`Packet::put`] creates missing containers along the way and grows arrays so the index
//! exists, leaving the new slots absent. Field names match exactly; putting to an existing
//! field replaces its subtree. A put whose path conflicts with the shape of the tree fails
//! without touching it.
use std::fmt;

use log::trace;
use thiserror::Error;

pub mod xml;

/// Longest array a path or a parsed packet may create.
pub const MAX_ARRAY_LEN: usize = 1 << 16;

const MAX_INDEX_DIGITS: usize = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WddxError {
    #[error("path '{0}' has an empty segment")]
    EmptySegment(String),

    #[error("path '{path}': segment '{segment}' needs {expected}")]
    TypeMismatch {
        path: String,
        segment: String,
        expected: &'static str,
    },

    #[error("array index {0} is too large")]
    IndexTooLarge(usize),

    #[error("{0}")]
    Xml(String),
}

/// A node of the exchange tree.
///
/// Array slots and struct fields may be absent (`None`), which is distinct from any value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Number(f64),
    String(String),
    Array(Vec<Option<Value>>),
    Struct(Vec<(String, Option<Value>)>),
}

impl Value {
    /// Looks up a path below this node. An empty path is the node itself.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let segments = parse_path(path).ok()?;
        segments.iter().try_fold(self, |node, segment| match (node, segment) {
            (Value::Array(items), Segment::Index(i)) => items.get(*i)?.as_ref(),
            (Value::Struct(fields), Segment::Field(name)) => fields
                .iter()
                .find(|(n, _)| n == name)
                .and_then(|(_, v)| v.as_ref()),
            _ => None,
        })
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Renders this subtree as WDDX XML, without the packet envelope.
    pub fn to_xml(&self) -> Result<String, WddxError> {
        xml::value_to_xml(self)
    }

    /// Name of the element this value is written as.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

/// A WDDX packet: an optional header tree and an optional data tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Packet {
    header: Option<Value>,
    data: Option<Value>,
}

impl Packet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(&self) -> Option<&Value> {
        self.header.as_ref()
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<Value> {
        self.data
    }

    /// Stores `value` at `path` in the data tree.
    pub fn put(&mut self, path: &str, value: impl Into<Value>) -> Result<(), WddxError> {
        let segments = parse_path(path)?;
        check_path(self.data.as_ref(), path, &segments)?;

        let value = value.into();
        trace!("wddx put {path} = {}", value.kind());
        put_at(&mut self.data, &segments, value);
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.data.as_ref()?.get(path)
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path)?.as_bool()
    }

    pub fn get_number(&self, path: &str) -> Option<f64> {
        self.get(path)?.as_number()
    }

    pub fn get_string(&self, path: &str) -> Option<&str> {
        self.get(path)?.as_str()
    }

    pub fn to_xml(&self) -> Result<String, WddxError> {
        xml::to_xml(self)
    }

    pub fn from_xml(text: &str) -> Result<Self, WddxError> {
        xml::from_xml(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Index(usize),
    Field(&'a str),
}

fn parse_path(path: &str) -> Result<Vec<Segment<'_>>, WddxError> {
    if path.is_empty() {
        return Ok(Vec::new());
    }

    path.split(',')
        .map(|segment| {
            if segment.is_empty() {
                return Err(WddxError::EmptySegment(path.to_string()));
            }
            if segment.len() <= MAX_INDEX_DIGITS && segment.bytes().all(|b| b.is_ascii_digit()) {
                let index = segment
                    .parse::<usize>()
                    .map_err(|_| WddxError::IndexTooLarge(usize::MAX))?;
                if index >= MAX_ARRAY_LEN {
                    return Err(WddxError::IndexTooLarge(index));
                }
                Ok(Segment::Index(index))
            } else {
                Ok(Segment::Field(segment))
            }
        })
        .collect()
}

/// Fails if writing along `segments` would have to go through a node of the wrong kind.
fn check_path(mut node: Option<&Value>, path: &str, segments: &[Segment<'_>]) -> Result<(), WddxError> {
    for segment in segments {
        let Some(current) = node else {
            return Ok(());
        };

        node = match (current, segment) {
            (Value::Array(items), Segment::Index(i)) => items.get(*i).and_then(Option::as_ref),
            (Value::Struct(fields), Segment::Field(name)) => fields
                .iter()
                .find(|(n, _)| n == name)
                .and_then(|(_, v)| v.as_ref()),
            (_, segment) => {
                let (segment, expected) = match segment {
                    Segment::Index(i) => (i.to_string(), "an array"),
                    Segment::Field(name) => (name.to_string(), "a struct"),
                };
                return Err(WddxError::TypeMismatch {
                    path: path.to_string(),
                    segment,
                    expected,
                });
            }
        };
    }
    Ok(())
}

/// Writes `leaf` along an already checked path.
fn put_at(slot: &mut Option<Value>, segments: &[Segment<'_>], leaf: Value) {
    let Some((segment, rest)) = segments.split_first() else {
        *slot = Some(leaf);
        return;
    };

    match segment {
        Segment::Index(index) => {
            if !matches!(slot, Some(Value::Array(_))) {
                *slot = Some(Value::Array(Vec::new()));
            }
            if let Some(Value::Array(items)) = slot {
                if items.len() <= *index {
                    items.resize_with(index + 1, || None);
                }
                put_at(&mut items[*index], rest, leaf);
            }
        }
        Segment::Field(name) => {
            if !matches!(slot, Some(Value::Struct(_))) {
                *slot = Some(Value::Struct(Vec::new()));
            }
            if let Some(Value::Struct(fields)) = slot {
                let position = match fields.iter().position(|(n, _)| n == name) {
                    Some(position) => position,
                    None => {
                        fields.push((name.to_string(), None));
                        fields.len() - 1
                    }
                };
                put_at(&mut fields[position].1, rest, leaf);
            }
        }
    }
}

/// Formats a number the way C's `%.16g` does.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let scientific = format!("{value:.15e}");
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if !(-4..16).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            strip_fraction_zeros(mantissa),
            exponent.abs()
        )
    } else {
        let decimals = (15 - exponent) as usize;
        strip_fraction_zeros(&format!("{value:.decimals$}")).to_string()
    }
}

fn strip_fraction_zeros(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_xml() {
            Ok(xml) => f.write_str(&xml),
            Err(_) => Err(fmt::Error),
        }
    }
}
