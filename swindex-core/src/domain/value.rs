//! Field values. A value is either numeric or categorical; whether it is
//! missing is decided by the fill marker in the owning field's metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            Value::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(_) => None,
        }
    }

    pub fn nan() -> Self {
        Value::Number(f64::NAN)
    }
}

/// NaN compares equal to NaN so that a NaN fill marker matches NaN values.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_equals_nan() {
        assert_eq!(Value::nan(), Value::Number(f64::NAN));
        assert_ne!(Value::nan(), Value::Number(0.0));
    }

    #[test]
    fn number_and_text_never_equal() {
        assert_ne!(Value::from(1.0), Value::from("1"));
    }

    #[test]
    fn untagged_serde_roundtrip() {
        let json = serde_json::to_string(&vec![Value::from(2.5), Value::from("Green")]).unwrap();
        assert_eq!(json, r#"[2.5,"Green"]"#);
        let back: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[1].as_str(), Some("Green"));
    }
}
