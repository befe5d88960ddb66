//! Values produced by the static evaluator.
//!
//! The evaluator only ever yields strings, numbers, ordered maps and arrays.
//! Anything else (booleans, `null`, functions, class instances) is treated as
//! not statically known and surfaces as [`EvalError`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The single "cannot evaluate" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalError;

pub type EvalResult = Result<Value, EvalError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Number(f64),
    Array(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// JS `ToString`, restricted to values whose textual form is meaningful.
    /// Plain objects would stringify to `[object Object]`, so they are refused.
    pub fn to_js_string(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => format_number(*n),
            Value::Array(items) => {
                let parts = items
                    .iter()
                    .map(Value::to_js_string)
                    .collect::<Option<Vec<_>>>()?;
                Some(parts.join(","))
            }
            Value::Map(_) => None,
        }
    }

    /// Text spliced into a style template slot. Only primitives qualify.
    pub fn to_style_fragment(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => format_number(*n),
            Value::Array(_) | Value::Map(_) => None,
        }
    }

    /// JS `ToNumber` for the operands of arithmetic operators.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Some(0.0);
                }
                // Rust accepts "inf"/"nan" spellings that JS does not.
                trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
            }
            Value::Array(_) | Value::Map(_) => None,
        }
    }

    /// Property lookup: map keys, array indices and `length`.
    pub fn property(&self, key: &str) -> Option<Value> {
        match self {
            Value::Map(map) => map.get(key).cloned(),
            Value::Array(items) => {
                if key == "length" {
                    return Some(Value::Number(items.len() as f64));
                }
                let index = key.parse::<usize>().ok()?;
                // Only canonical forms index: `arr["01"]` and `arr["+1"]` are undefined.
                if index.to_string() != key {
                    return None;
                }
                items.get(index).cloned()
            }
            Value::String(s) => {
                if key == "length" {
                    Some(Value::Number(s.encode_utf16().count() as f64))
                } else {
                    None
                }
            }
            Value::Number(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

/// Formats a number the way JS `String(n)` does for the ranges we accept.
///
/// Values JS would print in exponent notation are refused instead of
/// guessed.
pub fn format_number(n: f64) -> Option<String> {
    if !n.is_finite() {
        return None;
    }
    if n == 0.0 {
        return Some("0".to_string());
    }
    // JS switches to exponent notation outside [1e-6, 1e21).
    if n.abs() < 1e-6 || n.abs() >= 1e21 {
        return None;
    }
    Some(format!("{}", n))
}

// ═══════════════════════════════════════════════════════════════════════════════
// THEME
// ═══════════════════════════════════════════════════════════════════════════════

/// A frozen, nested configuration mapping handed to style interpolations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Theme(IndexMap<String, Value>);

impl Theme {
    pub fn new(entries: IndexMap<String, Value>) -> Self {
        Theme(entries)
    }

    pub fn to_value(&self) -> Value {
        Value::Map(self.0.clone())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVALUATION CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// Binding name to known value. Extending a context produces a new one.
#[derive(Debug, Clone, Default)]
pub struct Context {
    bindings: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn with(&self, name: impl Into<String>, value: Value) -> Context {
        let mut bindings = self.bindings.clone();
        bindings.insert(name.into(), value);
        Context { bindings }
    }

    /// Entries of `inner` shadow entries of `self`.
    pub fn extend(&self, inner: Context) -> Context {
        let mut bindings = self.bindings.clone();
        bindings.extend(inner.bindings);
        Context { bindings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_matches_js() {
        assert_eq!(format_number(16.0), Some("16".to_string()));
        assert_eq!(format_number(-0.0), Some("0".to_string()));
        assert_eq!(format_number(1.5), Some("1.5".to_string()));
        assert_eq!(format_number(0.1 + 0.2), Some("0.30000000000000004".to_string()));
        assert_eq!(format_number(f64::NAN), None);
        assert_eq!(format_number(1e-7), None);
        assert_eq!(format_number(2f64.powi(60)), Some("1152921504606847000".to_string()));
        assert_eq!(format_number(1e20), Some("100000000000000000000".to_string()));
        assert_eq!(format_number(1e21), None);
        assert_eq!(format_number(-1e21), None);
    }

    #[test]
    fn test_js_string_coercion() {
        let arr = Value::Array(vec![Value::string("a"), Value::Number(2.0)]);
        assert_eq!(arr.to_js_string(), Some("a,2".to_string()));
        assert_eq!(Value::Map(IndexMap::new()).to_js_string(), None);
        assert_eq!(arr.to_style_fragment(), None);
    }

    #[test]
    fn test_to_number() {
        assert_eq!(Value::string(" 4 ").to_number(), Some(4.0));
        assert_eq!(Value::string("").to_number(), Some(0.0));
        assert_eq!(Value::string("inf").to_number(), None);
        assert_eq!(Value::string("4px").to_number(), None);
    }

    #[test]
    fn test_property_lookup() {
        let arr = Value::Array(vec![Value::string("x"), Value::string("y")]);
        assert_eq!(arr.property("1"), Some(Value::string("y")));
        assert_eq!(arr.property("01"), None);
        assert_eq!(arr.property("+1"), None);
        assert_eq!(arr.property("length"), Some(Value::Number(2.0)));
        assert_eq!(Value::string("abc").property("length"), Some(Value::Number(3.0)));
        assert_eq!(Value::string("abc").property("0"), None);
    }

    #[test]
    fn test_context_shadowing() {
        let outer = Context::new().with("a", Value::string("outer"));
        let inner = Context::new().with("a", Value::string("inner"));
        let merged = outer.extend(inner);
        assert_eq!(merged.get("a"), Some(&Value::string("inner")));
        assert_eq!(outer.get("a"), Some(&Value::string("outer")));
    }

    #[test]
    fn test_theme_json_rejects_booleans() {
        let ok: Result<Theme, _> = serde_json::from_str(r#"{"color":{"main":"red"},"space":[4,8]}"#);
        assert!(ok.is_ok());
        let bad: Result<Theme, _> = serde_json::from_str(r#"{"dark":true}"#);
        assert!(bad.is_err());
    }
}
