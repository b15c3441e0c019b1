//! Type-hint vocabulary (`test.types` on the wire).
//!
//! A hint forces the coercer to parse a given value as a particular kind regardless of how it was
//! represented in JSON (e.g. a date sent as a string).

use super::registry::{self, LangItemInfo, item};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeHint {
    Int,
    Float,
    Decimal,
    String,
    Bool,
    DateTime,
    Date,
    Time,
    Uuid,
}

pub type TypeHintInfo = LangItemInfo<TypeHint>;

pub const TYPE_HINTS: &[TypeHintInfo] = &[
    item(TypeHint::Int, "int", &["integer", "long", "i64"], "Signed 64-bit integer."),
    item(TypeHint::Float, "float", &["double", "number", "f64"], "64-bit floating point."),
    item(
        TypeHint::Decimal,
        "decimal",
        &["Decimal", "money"],
        "Exact decimal, parsed from a string or number.",
    ),
    item(TypeHint::String, "string", &["str", "String", "text"], "UTF-8 string."),
    item(TypeHint::Bool, "bool", &["boolean"], "Boolean."),
    item(
        TypeHint::DateTime,
        "datetime",
        &["DateTime", "timestamp"],
        "RFC 3339 date-time, or a naive `YYYY-MM-DDTHH:MM:SS` treated as UTC.",
    ),
    item(TypeHint::Date, "date", &["Date"], "Calendar date `YYYY-MM-DD`."),
    item(TypeHint::Time, "time", &["Time"], "Wall-clock time `HH:MM[:SS]`."),
    item(TypeHint::Uuid, "uuid", &["UUID", "guid", "Guid"], "RFC 4122 UUID."),
];

#[inline]
pub fn as_str(hint: TypeHint) -> &'static str {
    info_for(hint).canonical
}

/// Resolve a spelling (canonical or alias) to a hint.
pub fn from_str(name: &str) -> Option<TypeHint> {
    registry::lookup(TYPE_HINTS, name)
}

pub fn info_for(hint: TypeHint) -> &'static TypeHintInfo {
    registry::entry(TYPE_HINTS, hint)
}
