//! Coerced argument values and typed accessors for member bodies.

use std::any::Any;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use super::context::Receiver;
use super::outcome::Raised;

/// A single argument after coercion to its declared parameter type.
#[derive(Clone)]
pub enum Arg {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Str(String),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
    Uuid(Uuid),
    List(Vec<Arg>),
    /// Objects (maps and records) and untyped values travel as JSON.
    Json(Value),
    /// A live collaborator (a constructed instance or a mock proxy).
    Instance(Receiver),
}

impl Arg {
    /// JSON snapshot used for call tracking and diagnostics.
    pub fn to_json(&self) -> Value {
        match self {
            Arg::Null => Value::Null,
            Arg::Bool(b) => Value::Bool(*b),
            Arg::Int(i) => Value::from(*i),
            Arg::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Arg::Decimal(d) => d
                .to_f64()
                .and_then(Number::from_f64)
                .map_or_else(|| Value::String(d.to_string()), Value::Number),
            Arg::Str(s) => Value::String(s.clone()),
            Arg::DateTime(dt) => Value::String(dt.to_rfc3339()),
            Arg::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            Arg::Time(t) => Value::String(t.format("%H:%M:%S").to_string()),
            Arg::Uuid(u) => Value::String(u.to_string()),
            Arg::List(items) => Value::Array(items.iter().map(Arg::to_json).collect()),
            Arg::Json(value) => value.clone(),
            Arg::Instance(receiver) => Value::String(format!("<{}>", receiver.type_path)),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Arg::Null)
    }

    fn describe(&self) -> &'static str {
        match self {
            Arg::Null => "null",
            Arg::Bool(_) => "bool",
            Arg::Int(_) => "int",
            Arg::Float(_) => "float",
            Arg::Decimal(_) => "decimal",
            Arg::Str(_) => "string",
            Arg::DateTime(_) => "datetime",
            Arg::Date(_) => "date",
            Arg::Time(_) => "time",
            Arg::Uuid(_) => "uuid",
            Arg::List(_) => "list",
            Arg::Json(_) => "json",
            Arg::Instance(_) => "instance",
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Instance(receiver) => write!(f, "Instance({})", receiver.type_path),
            other => write!(f, "{}({})", other.describe(), other.to_json()),
        }
    }
}

/// Named, ordered arguments for one call.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    entries: Vec<(String, Arg)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy when target code dispatches to collaborators.
    pub fn with(mut self, name: impl Into<String>, arg: Arg) -> Self {
        self.push(name, arg);
        self
    }

    /// Insert or replace an argument.
    pub fn push(&mut self, name: impl Into<String>, arg: Arg) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = arg,
            None => self.entries.push((name, arg)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arg> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arg)> {
        self.entries.iter().map(|(n, a)| (n.as_str(), a))
    }

    /// Snapshot as a JSON object keyed by parameter name.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self.entries.iter().map(|(n, a)| (n.clone(), a.to_json())).collect();
        Value::Object(map)
    }

    fn require(&self, name: &str) -> Result<&Arg, Raised> {
        self.get(name)
            .ok_or_else(|| Raised::type_error(format!("missing required argument '{name}'")))
    }

    fn mismatch(name: &str, expected: &str, got: &Arg) -> Raised {
        Raised::type_error(format!("argument '{name}' must be {expected}, got {}", got.describe()))
    }

    pub fn int(&self, name: &str) -> Result<i64, Raised> {
        match self.require(name)? {
            Arg::Int(i) => Ok(*i),
            Arg::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
            other => Err(Self::mismatch(name, "an int", other)),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64, Raised> {
        match self.require(name)? {
            Arg::Float(f) => Ok(*f),
            Arg::Int(i) => Ok(*i as f64),
            Arg::Decimal(d) => d.to_f64().ok_or_else(|| Self::mismatch(name, "a float", &Arg::Decimal(*d))),
            other => Err(Self::mismatch(name, "a float", other)),
        }
    }

    pub fn decimal(&self, name: &str) -> Result<Decimal, Raised> {
        match self.require(name)? {
            Arg::Decimal(d) => Ok(*d),
            Arg::Int(i) => Ok(Decimal::from(*i)),
            Arg::Float(f) => Decimal::try_from(*f).map_err(|_| Self::mismatch(name, "a decimal", &Arg::Float(*f))),
            other => Err(Self::mismatch(name, "a decimal", other)),
        }
    }

    pub fn str(&self, name: &str) -> Result<&str, Raised> {
        match self.require(name)? {
            Arg::Str(s) => Ok(s),
            other => Err(Self::mismatch(name, "a string", other)),
        }
    }

    pub fn string(&self, name: &str) -> Result<String, Raised> {
        self.str(name).map(str::to_string)
    }

    /// A string argument that may be null or absent.
    pub fn opt_str(&self, name: &str) -> Result<Option<&str>, Raised> {
        match self.get(name) {
            None | Some(Arg::Null) => Ok(None),
            Some(_) => self.str(name).map(Some),
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool, Raised> {
        match self.require(name)? {
            Arg::Bool(b) => Ok(*b),
            other => Err(Self::mismatch(name, "a bool", other)),
        }
    }

    pub fn datetime(&self, name: &str) -> Result<DateTime<Utc>, Raised> {
        match self.require(name)? {
            Arg::DateTime(dt) => Ok(*dt),
            other => Err(Self::mismatch(name, "a datetime", other)),
        }
    }

    pub fn date(&self, name: &str) -> Result<NaiveDate, Raised> {
        match self.require(name)? {
            Arg::Date(d) => Ok(*d),
            Arg::DateTime(dt) => Ok(dt.date_naive()),
            other => Err(Self::mismatch(name, "a date", other)),
        }
    }

    pub fn time(&self, name: &str) -> Result<NaiveTime, Raised> {
        match self.require(name)? {
            Arg::Time(t) => Ok(*t),
            other => Err(Self::mismatch(name, "a time", other)),
        }
    }

    pub fn uuid(&self, name: &str) -> Result<Uuid, Raised> {
        match self.require(name)? {
            Arg::Uuid(u) => Ok(*u),
            other => Err(Self::mismatch(name, "a uuid", other)),
        }
    }

    pub fn list(&self, name: &str) -> Result<&[Arg], Raised> {
        match self.require(name)? {
            Arg::List(items) => Ok(items),
            other => Err(Self::mismatch(name, "a list", other)),
        }
    }

    /// Any argument, projected to JSON.
    pub fn json(&self, name: &str) -> Result<Value, Raised> {
        self.require(name).map(Arg::to_json)
    }

    /// A collaborator argument downcast to `T`; `None` when null or absent.
    ///
    /// Capability instances are registered as the trait object handle (for example
    /// `Arc<dyn PaymentGateway>`), so `T` is that handle type.
    pub fn instance<T: Any + Send + Sync + Clone>(&self, name: &str) -> Result<Option<T>, Raised> {
        match self.get(name) {
            None | Some(Arg::Null) => Ok(None),
            Some(Arg::Instance(receiver)) => receiver.downcast::<T>().cloned().map(Some).ok_or_else(|| {
                Raised::type_error(format!(
                    "argument '{name}' holds a {} that does not provide the expected capability",
                    receiver.type_path
                ))
            }),
            Some(other) => Err(Self::mismatch(name, "an instance", other)),
        }
    }
}
