use serde_json::{Map, Value};

use crate::errors::{CapabilityError, CapabilityResult};

/// Decoded arguments of a function call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    /// Decode the encoded argument blob sent by the backend. A blank blob is
    /// treated as no arguments.
    pub fn decode(blob: &str) -> CapabilityResult<Self> {
        if blob.trim().is_empty() {
            return Ok(Self::default());
        }

        match serde_json::from_str::<Value>(blob) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(other) => Err(CapabilityError::InvalidParameters(format!(
                "expected an object, got {}",
                other
            ))),
            Err(e) => Err(CapabilityError::InvalidParameters(e.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn string(&self, name: &str) -> CapabilityResult<&str> {
        self.get(name)
            .ok_or_else(|| missing(name))?
            .as_str()
            .ok_or_else(|| wrong_type(name, "a string"))
    }

    pub fn integer(&self, name: &str) -> CapabilityResult<i64> {
        let value = self.get(name).ok_or_else(|| missing(name))?;
        if let Some(n) = value.as_i64() {
            return Ok(n);
        }
        match value.as_f64() {
            Some(f) if f.fract() == 0.0 => Ok(f as i64),
            _ => Err(wrong_type(name, "an integer")),
        }
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn missing(name: &str) -> CapabilityError {
    CapabilityError::InvalidParameters(format!("missing '{}' parameter", name))
}

fn wrong_type(name: &str, expected: &str) -> CapabilityError {
    CapabilityError::InvalidParameters(format!("'{}' must be {}", name, expected))
}
