//! Functions over dates, decimals and UUIDs, exercising type hints: `example.conversions`.

use babeltest_core::{Method, Param, ParamType, Registry, Returned, TypeInfo};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

pub const PATH: &str = "example.conversions";

pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// `amount * (1 + rate)`, rounded to cents.
pub fn add_tax(amount: Decimal, rate: Decimal) -> Decimal {
    (amount * (Decimal::ONE + rate)).round_dp(2)
}

pub fn weekday(at: DateTime<Utc>) -> String {
    at.format("%A").to_string()
}

pub fn is_business_hours(at: NaiveTime) -> bool {
    let open = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN);
    let close = NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN);
    at >= open && at < close
}

pub fn describe_id(id: Uuid) -> serde_json::Value {
    json!({"hyphenated": id.hyphenated().to_string(), "version": id.get_version_num(), "nil": id.is_nil()})
}

pub fn register(registry: &mut Registry) {
    registry.insert(
        TypeInfo::module(PATH)
            .method(
                Method::sync("days_between", |_, args| {
                    Ok(Returned::new(days_between(args.date("start")?, args.date("end")?)))
                })
                .param(Param::new("start", ParamType::Date))
                .param(Param::new("end", ParamType::Date))
                .returns(ParamType::Int)
                .static_member(),
            )
            .method(
                Method::sync("add_tax", |_, args| {
                    Ok(Returned::new(add_tax(args.decimal("amount")?, args.decimal("rate")?).to_string()))
                })
                .param(Param::new("amount", ParamType::Decimal))
                .param(Param::new("rate", ParamType::Decimal).with_default("0.07"))
                .returns(ParamType::Str)
                .static_member(),
            )
            .method(
                Method::sync("weekday", |_, args| Ok(Returned::new(weekday(args.datetime("at")?))))
                    .param(Param::new("at", ParamType::DateTime))
                    .returns(ParamType::Str)
                    .static_member(),
            )
            .method(
                Method::sync("is_business_hours", |_, args| Ok(Returned::new(is_business_hours(args.time("at")?))))
                    .param(Param::new("at", ParamType::Time))
                    .returns(ParamType::Bool)
                    .static_member(),
            )
            .method(
                Method::sync("describe_id", |_, args| Ok(Returned::new(describe_id(args.uuid("id")?))))
                    .param(Param::new("id", ParamType::Uuid))
                    .returns(ParamType::Map)
                    .static_member(),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_tax_rounds_to_cents() {
        assert_eq!(add_tax(Decimal::new(10000, 2), Decimal::new(7, 2)).to_string(), "107.00");
    }

    #[test]
    fn test_days_between_and_weekday() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(days_between(start, end), 60);
        let at = DateTime::parse_from_rfc3339("2024-01-03T10:00:00Z").unwrap().with_timezone(&Utc);
        assert_eq!(weekday(at), "Wednesday");
    }

    #[test]
    fn test_business_hours_bounds() {
        assert!(is_business_hours(NaiveTime::from_hms_opt(9, 0, 0).unwrap()));
        assert!(!is_business_hours(NaiveTime::from_hms_opt(17, 0, 0).unwrap()));
    }
}
