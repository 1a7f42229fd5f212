//! Value types for the canopy cache
//!
//! This module defines:
//! - Value: tagged variant for everything a cache entry can hold
//! - Nested path traversal: `get_path`, `set_path`, `delete_path`
//!
//! ## Value Model
//!
//! The Value enum has exactly 7 variants: Null, Bool, Int, Float, String,
//! Array, Object. This is the JSON data model, so the durable snapshot
//! round-trips losslessly through `serde_json` (serde is untagged).
//!
//! ## Traversal Rules
//!
//! Residual path segments are plain strings. A segment addresses:
//! - a field, when the current node is an Object
//! - an element, when the current node is an Array and the segment parses
//!   as an index
//!
//! Traversal fails soft: reads return `None`, deletes no-op, and writes
//! through a non-mapping node overwrite it with a fresh mapping. `set_path`
//! is therefore total and never surfaces a traversal error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Canonical value type for everything stored under a root key
///
/// Different variants are never equal, even when numerically alike:
/// `Int(1) != Float(1.0)`. Float equality follows IEEE-754 (`NaN != NaN`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Ordered sequence of values
    Array(Vec<Value>),
    /// Mapping with string keys
    Object(HashMap<String, Value>),
}

impl Value {
    /// An empty mapping
    pub fn object() -> Self {
        Value::Object(HashMap::new())
    }

    /// An empty sequence
    pub fn array() -> Self {
        Value::Array(Vec::new())
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this is an object value
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Check if this is an array value
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as &[Value] if this is an Array value
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get as &HashMap if this is an Object value
    pub fn as_object(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    // ========================================================================
    // Nested path traversal
    // ========================================================================

    /// Read the value at a residual path, failing soft.
    ///
    /// Returns `None` when the path is absent or traverses a non-container
    /// node.
    pub fn get_path(&self, segments: &[String]) -> Option<&Value> {
        let mut current = self;
        for seg in segments {
            let take_index = matches!(current, Value::Array(_)) && parse_index(seg).is_some();
            current = if take_index {
                match current {
                    Value::Array(arr) => arr.get(parse_index(seg)?),
                    _ => None,
                }?
            } else {
                match current {
                    Value::Object(map) => map.get(seg.as_str()),
                    _ => None,
                }?
            };
        }
        Some(current)
    }

    /// Mutable variant of [`get_path`](Value::get_path)
    pub fn get_path_mut(&mut self, segments: &[String]) -> Option<&mut Value> {
        let mut current = self;
        for seg in segments {
            let take_index = matches!(current, Value::Array(_)) && parse_index(seg).is_some();
            current = if take_index {
                match current {
                    Value::Array(arr) => arr.get_mut(parse_index(seg)?),
                    _ => None,
                }?
            } else {
                match current {
                    Value::Object(map) => map.get_mut(seg.as_str()),
                    _ => None,
                }?
            };
        }
        Some(current)
    }

    /// Write `value` at a residual path, creating intermediate mappings.
    ///
    /// An empty path replaces `self` entirely. Non-mapping nodes on the way
    /// down are overwritten with fresh mappings. Array nodes accept numeric
    /// segments at existing indices (or one past the end, which appends);
    /// an index further out fails soft.
    pub fn set_path(&mut self, segments: &[String], value: Value) {
        if segments.is_empty() {
            *self = value;
            return;
        }

        let mut current = self;
        for seg in &segments[..segments.len() - 1] {
            let take_index = matches!(current, Value::Array(_)) && parse_index(seg).is_some();
            if take_index {
                let idx = match parse_index(seg) {
                    Some(idx) => idx,
                    None => return,
                };
                let arr = match current {
                    Value::Array(arr) => arr,
                    _ => return,
                };
                if idx == arr.len() {
                    arr.push(Value::object());
                } else if idx > arr.len() {
                    return;
                }
                current = &mut arr[idx];
            } else {
                if !current.is_object() {
                    *current = Value::object();
                }
                let map = match current {
                    Value::Object(map) => map,
                    _ => return,
                };
                current = map.entry(seg.clone()).or_insert_with(Value::object);
            }
        }

        let last = &segments[segments.len() - 1];
        let take_index = matches!(current, Value::Array(_)) && parse_index(last).is_some();
        if take_index {
            let idx = match parse_index(last) {
                Some(idx) => idx,
                None => return,
            };
            let arr = match current {
                Value::Array(arr) => arr,
                _ => return,
            };
            if idx < arr.len() {
                arr[idx] = value;
            } else if idx == arr.len() {
                arr.push(value);
            }
        } else {
            if !current.is_object() {
                *current = Value::object();
            }
            if let Value::Object(map) = current {
                map.insert(last.clone(), value);
            }
        }
    }

    /// Remove the value at a residual path, failing soft.
    ///
    /// Removing an array element shifts subsequent elements down. Returns
    /// the removed value, or `None` when the path was absent.
    pub fn delete_path(&mut self, segments: &[String]) -> Option<Value> {
        let last = segments.last()?;
        let parent = self.get_path_mut(&segments[..segments.len() - 1])?;
        match parent {
            Value::Object(map) => map.remove(last.as_str()),
            Value::Array(arr) => {
                let idx = parse_index(last)?;
                if idx < arr.len() {
                    Some(arr.remove(idx))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Serialized-JSON byte length, used for the memory-footprint accessor
    pub fn approximate_size(&self) -> usize {
        serde_json::to_string(self).map(|s| s.len()).unwrap_or(0)
    }
}

/// A segment addresses an array element only when it parses as an index
fn parse_index(segment: &str) -> Option<usize> {
    segment.parse().ok()
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::Array(values)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(map: HashMap<String, Value>) -> Self {
        Value::Object(map)
    }
}
