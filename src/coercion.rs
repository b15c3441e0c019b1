//! Parameter coercion: wire JSON → [`Arg`] values a member body can read.
//!
//! Without a type hint the declared [`ParamType`] drives the conversion. With a hint from the
//! test's `types` map the value is parsed per the hint regardless of how it travelled.

use std::collections::BTreeMap;
use std::str::FromStr;

use babeltest_core::lang::hints::{self, TYPE_HINTS, TypeHint};
use babeltest_core::lang::registry;
use babeltest_core::naming;
use babeltest_core::reflect::json_kind_name;
use babeltest_core::{Arg, CallArgs, Param, ParamType};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use crate::errors::AdapterError;

type Coerced = Result<Arg, String>;

/// Coerce one value for parameter `name`.
pub fn coerce(name: &str, value: &Value, declared: &ParamType, hint: Option<TypeHint>) -> Result<Arg, AdapterError> {
    let coerced = match hint {
        Some(hint) => by_hint(value, hint),
        None => by_declared(value, declared),
    };
    coerced.map_err(|reason| {
        let wanted = hint.map_or_else(|| declared.to_string(), |h| hints::as_str(h).to_string());
        AdapterError::coercion(format!(
            "Cannot coerce parameter '{name}' value {value} to {wanted}: {reason}"
        ))
    })
}

/// Build the argument list for a member from the test's `given` and `types` maps.
///
/// Given names match parameters exactly or through naming variants (`userId` → `user_id`).
/// Parameters the test leaves out take their declared default, else null.
pub fn build_args(
    callable: &str,
    params: &[Param],
    given: &Map<String, Value>,
    types: &BTreeMap<String, String>,
) -> Result<CallArgs, AdapterError> {
    let mut supplied: Vec<Option<&Value>> = vec![None; params.len()];
    for (name, value) in given {
        let idx = param_index(params, name).ok_or_else(|| unknown_param(callable, params, name))?;
        supplied[idx] = Some(value);
    }

    let mut param_hints: Vec<Option<TypeHint>> = vec![None; params.len()];
    for (name, hint_name) in types {
        let idx = param_index(params, name).ok_or_else(|| unknown_param(callable, params, name))?;
        let hint = hints::from_str(hint_name).ok_or_else(|| {
            AdapterError::coercion(format!(
                "Unknown type hint '{hint_name}' for parameter '{name}' (expected {})",
                registry::spellings(TYPE_HINTS)
            ))
        })?;
        param_hints[idx] = Some(hint);
    }

    let mut args = CallArgs::new();
    for (idx, param) in params.iter().enumerate() {
        let arg = match (supplied[idx], &param.default) {
            (Some(value), _) => coerce(&param.name, value, &param.ty, param_hints[idx])?,
            (None, Some(default)) => coerce(&param.name, default, &param.ty, None)?,
            (None, None) => Arg::Null,
        };
        args.push(param.name.clone(), arg);
    }
    Ok(args)
}

fn param_index(params: &[Param], name: &str) -> Option<usize> {
    params
        .iter()
        .position(|p| p.name == name)
        .or_else(|| params.iter().position(|p| naming::names_match(name, &p.name)))
}

fn unknown_param(callable: &str, params: &[Param], name: &str) -> AdapterError {
    let known: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
    let expected = if known.is_empty() {
        "it takes no parameters".to_string()
    } else {
        format!("expected one of: {}", known.join(", "))
    };
    AdapterError::coercion(format!("Unknown parameter '{name}' for {callable}; {expected}"))
}

// ============================================================================
// Declared-type coercion
// ============================================================================

fn by_declared(value: &Value, declared: &ParamType) -> Coerced {
    if value.is_null() {
        return Ok(Arg::Null);
    }
    match declared {
        ParamType::Any => Ok(from_json(value)),
        ParamType::Optional(inner) => by_declared(value, inner),
        ParamType::Int => match value {
            Value::Number(n) => int_from_number(n),
            other => Err(format!("expected an integer, got {}", json_kind_name(other))),
        },
        ParamType::Float => match value {
            Value::Number(n) => n.as_f64().map(Arg::Float).ok_or_else(|| "number out of range".to_string()),
            other => Err(format!("expected a number, got {}", json_kind_name(other))),
        },
        ParamType::Decimal => match value {
            Value::Number(n) => decimal_from_number(n),
            Value::String(s) => parse_decimal(s),
            other => Err(format!("expected a decimal number or string, got {}", json_kind_name(other))),
        },
        ParamType::Str => match value {
            Value::String(s) => Ok(Arg::Str(s.clone())),
            other => Err(format!("expected a string, got {}", json_kind_name(other))),
        },
        ParamType::Bool => match value {
            Value::Bool(b) => Ok(Arg::Bool(*b)),
            other => Err(format!("expected a bool, got {}", json_kind_name(other))),
        },
        ParamType::DateTime => parse_datetime(expect_str(value)?),
        ParamType::Date => parse_date(expect_str(value)?),
        ParamType::Time => parse_time(expect_str(value)?),
        ParamType::Uuid => parse_uuid(expect_str(value)?),
        ParamType::List(inner) => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| by_declared(item, inner))
                .collect::<Result<Vec<_>, _>>()
                .map(Arg::List),
            other => Err(format!("expected a list, got {}", json_kind_name(other))),
        },
        ParamType::Map | ParamType::Record(_) => match value {
            Value::Object(_) => Ok(Arg::Json(value.clone())),
            other => Err(format!("expected an object, got {}", json_kind_name(other))),
        },
        ParamType::Capability(name) => Err(format!("capability {name} cannot be supplied as JSON")),
    }
}

/// Generic conversion used for `Any` parameters.
fn from_json(value: &Value) -> Arg {
    match value {
        Value::Null => Arg::Null,
        Value::Bool(b) => Arg::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Arg::Int(i),
            None => Arg::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Arg::Str(s.clone()),
        Value::Array(items) => Arg::List(items.iter().map(from_json).collect()),
        Value::Object(_) => Arg::Json(value.clone()),
    }
}

// ============================================================================
// Hinted coercion
// ============================================================================

fn by_hint(value: &Value, hint: TypeHint) -> Coerced {
    if value.is_null() {
        return Ok(Arg::Null);
    }
    match hint {
        TypeHint::Int => match value {
            Value::Number(n) => int_from_number(n),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Arg::Int)
                .map_err(|e| format!("'{s}' is not an integer ({e})")),
            other => Err(format!("cannot read {} as int", json_kind_name(other))),
        },
        TypeHint::Float => match value {
            Value::Number(n) => n.as_f64().map(Arg::Float).ok_or_else(|| "number out of range".to_string()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Arg::Float)
                .map_err(|e| format!("'{s}' is not a number ({e})")),
            other => Err(format!("cannot read {} as float", json_kind_name(other))),
        },
        TypeHint::Decimal => match value {
            Value::Number(n) => decimal_from_number(n),
            Value::String(s) => parse_decimal(s),
            other => Err(format!("cannot read {} as decimal", json_kind_name(other))),
        },
        TypeHint::String => match value {
            Value::String(s) => Ok(Arg::Str(s.clone())),
            Value::Number(n) => Ok(Arg::Str(n.to_string())),
            Value::Bool(b) => Ok(Arg::Str(b.to_string())),
            other => Err(format!("cannot read {} as string", json_kind_name(other))),
        },
        TypeHint::Bool => match value {
            Value::Bool(b) => Ok(Arg::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Ok(Arg::Bool(false)),
                Some(1) => Ok(Arg::Bool(true)),
                _ => Err(format!("{n} is not 0 or 1")),
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(Arg::Bool(true)),
                "false" | "no" | "0" => Ok(Arg::Bool(false)),
                _ => Err(format!("'{s}' is not a boolean")),
            },
            other => Err(format!("cannot read {} as bool", json_kind_name(other))),
        },
        TypeHint::DateTime => parse_datetime(expect_str(value)?),
        TypeHint::Date => parse_date(expect_str(value)?),
        TypeHint::Time => parse_time(expect_str(value)?),
        TypeHint::Uuid => parse_uuid(expect_str(value)?),
    }
}

// ============================================================================
// Scalar parsers
// ============================================================================

fn expect_str(value: &Value) -> Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("expected a string, got {}", json_kind_name(value)))
}

fn int_from_number(n: &Number) -> Coerced {
    if let Some(i) = n.as_i64() {
        return Ok(Arg::Int(i));
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Arg::Int(f as i64)),
        _ => Err(format!("{n} is not an integer")),
    }
}

fn decimal_from_number(n: &Number) -> Coerced {
    parse_decimal(&n.to_string())
}

fn parse_decimal(s: &str) -> Coerced {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map(Arg::Decimal)
        .map_err(|e| format!("'{s}' is not a decimal ({e})"))
}

fn parse_datetime(s: &str) -> Coerced {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Arg::DateTime(dt.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Arg::DateTime(naive.and_utc()));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(Arg::DateTime(date.and_time(NaiveTime::MIN).and_utc()));
    }
    Err(format!("'{s}' is not an ISO-8601 datetime"))
}

fn parse_date(s: &str) -> Coerced {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(Arg::Date(date));
    }
    match parse_datetime(s) {
        Ok(Arg::DateTime(dt)) => Ok(Arg::Date(dt.date_naive())),
        _ => Err(format!("'{s}' is not an ISO-8601 date")),
    }
}

fn parse_time(s: &str) -> Coerced {
    ["%H:%M:%S%.f", "%H:%M"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(s, format).ok())
        .map(Arg::Time)
        .ok_or_else(|| format!("'{s}' is not an ISO-8601 time"))
}

fn parse_uuid(s: &str) -> Coerced {
    Uuid::parse_str(s.trim())
        .map(Arg::Uuid)
        .map_err(|e| format!("'{s}' is not a UUID ({e})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn given(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("given must be an object"),
        }
    }

    #[test]
    fn test_numeric_widening() {
        assert_eq!(coerce("a", &json!(3), &ParamType::Float, None).unwrap().to_json(), json!(3.0));
        assert!(matches!(coerce("a", &json!(4.0), &ParamType::Int, None).unwrap(), Arg::Int(4)));
        let err = coerce("a", &json!(4.5), &ParamType::Int, None).unwrap_err();
        assert_eq!(err.type_name(), "CoercionError");
        assert!(err.to_string().contains("parameter 'a'"));
    }

    #[test]
    fn test_declared_strings_parse_rich_types() {
        assert!(matches!(
            coerce("d", &json!("2024-03-01"), &ParamType::Date, None).unwrap(),
            Arg::Date(d) if d == NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        ));
        assert!(matches!(
            coerce("m", &json!("99.99"), &ParamType::Decimal, None).unwrap(),
            Arg::Decimal(d) if d == Decimal::new(9999, 2)
        ));
        assert!(matches!(
            coerce("m", &json!(99.99), &ParamType::Decimal, None).unwrap(),
            Arg::Decimal(d) if d == Decimal::new(9999, 2)
        ));
        assert!(coerce("u", &json!("not-a-uuid"), &ParamType::Uuid, None).is_err());
    }

    #[test]
    fn test_hint_overrides_wire_representation() {
        assert!(matches!(coerce("n", &json!("42"), &ParamType::Any, Some(TypeHint::Int)).unwrap(), Arg::Int(42)));
        assert!(matches!(
            coerce("s", &json!(7), &ParamType::Str, Some(TypeHint::String)).unwrap(),
            Arg::Str(s) if s == "7"
        ));
        assert!(matches!(
            coerce("t", &json!("09:30"), &ParamType::Any, Some(TypeHint::Time)).unwrap(),
            Arg::Time(t) if t == NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        ));
        assert!(matches!(
            coerce("at", &json!("2024-01-03T10:00:00+02:00"), &ParamType::Any, Some(TypeHint::DateTime)).unwrap(),
            Arg::DateTime(dt) if dt.to_rfc3339() == "2024-01-03T08:00:00+00:00"
        ));
    }

    #[test]
    fn test_lists_coerce_elementwise() {
        let arg = coerce("xs", &json!([1, 2.0]), &ParamType::list(ParamType::Int), None).unwrap();
        assert_eq!(arg.to_json(), json!([1, 2]));
        assert!(coerce("xs", &json!([1, "x"]), &ParamType::list(ParamType::Int), None).is_err());
    }

    #[test]
    fn test_build_args_defaults_variants_and_nulls() {
        let params = vec![
            Param::new("user_id", ParamType::Int),
            Param::new("rate", ParamType::Decimal).with_default("0.07"),
            Param::new("note", ParamType::optional(ParamType::Str)),
        ];
        let args = build_args("f", &params, &given(json!({"userId": 3})), &BTreeMap::new()).unwrap();
        assert_eq!(args.int("user_id").unwrap(), 3);
        assert_eq!(args.decimal("rate").unwrap(), Decimal::new(7, 2));
        assert!(args.get("note").unwrap().is_null());
    }

    #[test]
    fn test_build_args_rejects_unknown_names_and_hints() {
        let params = vec![Param::new("a", ParamType::Int)];
        let err = build_args("math.add", &params, &given(json!({"z": 1})), &BTreeMap::new()).unwrap_err();
        assert_eq!(err.to_string(), "Unknown parameter 'z' for math.add; expected one of: a");

        let types = BTreeMap::from([("a".to_string(), "varchar".to_string())]);
        let err = build_args("math.add", &params, &given(json!({"a": 1})), &types).unwrap_err();
        assert_eq!(err.type_name(), "CoercionError");
        assert!(err.to_string().starts_with("Unknown type hint 'varchar' for parameter 'a'"));
    }

    #[test]
    fn test_capability_cannot_come_from_json() {
        let err = coerce("gw", &json!({}), &ParamType::capability("PaymentGateway"), None).unwrap_err();
        assert!(err.to_string().contains("capability PaymentGateway"));
        assert!(coerce("gw", &Value::Null, &ParamType::capability("PaymentGateway"), None).unwrap().is_null());
    }
}
