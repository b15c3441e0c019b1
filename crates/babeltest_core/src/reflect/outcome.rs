//! Tagged invocation outcomes.
//!
//! Target code never signals failure by panicking: a member body returns
//! `Result<Returned, Raised>`, and the adapter judges whichever side it gets.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lang::errors::TYPE_ERROR_KIND;

/// An error raised by target code (or synthesized by a mock).
///
/// `kind` is the error's type name as the codebase spells it (`ArgumentException`,
/// `PaymentDeclined`); `throws.type` is compared against it exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Raised {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl Raised {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            stack: None,
        }
    }

    /// Argument-shape mismatch detected inside a member body.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(TYPE_ERROR_KIND, message)
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

impl fmt::Display for Raised {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Raised {}

/// A successful return value, already projected to JSON.
///
/// `type_name` carries the declared type of the value (`User`, `Order`) when the member knows
/// it; `TYPE` expectations prefer it over the structural JSON kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Returned {
    pub value: Value,
    pub type_name: Option<String>,
}

impl Returned {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            type_name: None,
        }
    }

    pub fn null() -> Self {
        Self::new(Value::Null)
    }

    /// Serialize a domain value and remember its declared type name.
    pub fn typed<T: Serialize>(type_name: &str, value: &T) -> Result<Self, Raised> {
        let value = serde_json::to_value(value)
            .map_err(|err| Raised::new("SerializationError", format!("cannot project {type_name}: {err}")))?;
        Ok(Self {
            value,
            type_name: Some(type_name.to_string()),
        })
    }

    /// Serialize a value without a declared type name (lists, maps, tuples).
    pub fn json<T: Serialize>(value: &T) -> Result<Self, Raised> {
        serde_json::to_value(value)
            .map(Self::new)
            .map_err(|err| Raised::new("SerializationError", err.to_string()))
    }

    /// Kind name used by `TYPE` expectations.
    ///
    /// A null value is always `null`, even when the member declared a type name.
    pub fn kind_name(&self) -> String {
        match (&self.value, &self.type_name) {
            (Value::Null, _) => "null".to_string(),
            (_, Some(name)) => name.clone(),
            (value, None) => json_kind_name(value).to_string(),
        }
    }
}

/// Structural kind name of a JSON value.
pub fn json_kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
