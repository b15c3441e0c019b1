//! Free functions: `example.math`.

use babeltest_core::{Method, Param, ParamType, Raised, Registry, Returned, TypeInfo};

pub const PATH: &str = "example.math";

pub fn add(a: i64, b: i64) -> i64 {
    a + b
}

pub fn subtract(a: i64, b: i64) -> i64 {
    a - b
}

pub fn divide(a: f64, b: f64) -> Result<f64, Raised> {
    if b == 0.0 {
        return Err(Raised::new("ArgumentException", "Cannot divide by zero"));
    }
    Ok(a / b)
}

pub fn is_even(n: i64) -> bool {
    n % 2 == 0
}

fn binary_int(name: &str, op: fn(i64, i64) -> i64) -> Method {
    Method::sync(name, move |_, args| Ok(Returned::new(op(args.int("a")?, args.int("b")?))))
        .param(Param::new("a", ParamType::Int))
        .param(Param::new("b", ParamType::Int))
        .returns(ParamType::Int)
        .static_member()
}

pub fn register(registry: &mut Registry) {
    registry.insert(
        TypeInfo::module(PATH)
            .method(binary_int("add", add))
            .method(binary_int("subtract", subtract))
            .method(
                Method::sync("divide", |_, args| {
                    divide(args.float("a")?, args.float("b")?).map(Returned::new)
                })
                .param(Param::new("a", ParamType::Float))
                .param(Param::new("b", ParamType::Float))
                .returns(ParamType::Float)
                .static_member(),
            )
            .method(
                Method::sync("is_even", |_, args| Ok(Returned::new(is_even(args.int("n")?))))
                    .param(Param::new("n", ParamType::Int))
                    .returns(ParamType::Bool)
                    .static_member(),
            ),
    );
}
