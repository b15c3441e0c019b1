//! Functions that write to the process streams: `example.with_output`.
//!
//! Writes go straight to fd 1 and fd 2 through the locked handles, the way a logging library
//! would, so the adapter has to keep them off its protocol channel.

use std::io::{self, Write};

use babeltest_core::{Method, Param, ParamType, Raised, Registry, Returned, TypeInfo};

pub const PATH: &str = "example.with_output";

fn io_error(e: io::Error) -> Raised {
    Raised::new("IOError", e.to_string())
}

pub fn noisy_add_to(out: &mut impl Write, a: i64, b: i64) -> Result<i64, Raised> {
    writeln!(out, "Adding {a} + {b}").map_err(io_error)?;
    let result = a + b;
    writeln!(out, "Result: {result}").map_err(io_error)?;
    Ok(result)
}

pub fn noisy_add(a: i64, b: i64) -> Result<i64, Raised> {
    noisy_add_to(&mut io::stdout().lock(), a, b)
}

pub fn failing_with_output_to(out: &mut impl Write, err: &mut impl Write, value: &str) -> Raised {
    if let Err(e) = writeln!(out, "Processing value: {value}") {
        return io_error(e);
    }
    if let Err(e) = writeln!(err, "Warning: about to fail with {value}") {
        return io_error(e);
    }
    Raised::new("ValueError", format!("Cannot process {value}"))
}

pub fn failing_with_output(value: &str) -> Raised {
    failing_with_output_to(&mut io::stdout().lock(), &mut io::stderr().lock(), value)
}

pub fn prints_and_returns_to(out: &mut impl Write, message: &str) -> Result<String, Raised> {
    writeln!(out, "Message received: {message}").map_err(io_error)?;
    Ok(message.to_string())
}

pub fn prints_and_returns(message: &str) -> Result<String, Raised> {
    prints_and_returns_to(&mut io::stdout().lock(), message)
}

pub fn register(registry: &mut Registry) {
    registry.insert(
        TypeInfo::module(PATH)
            .method(
                Method::sync("noisy_add", |_, args| noisy_add(args.int("a")?, args.int("b")?).map(Returned::new))
                    .param(Param::new("a", ParamType::Int))
                    .param(Param::new("b", ParamType::Int))
                    .returns(ParamType::Int)
                    .static_member(),
            )
            .method(
                Method::sync("failing_with_output", |_, args| Err(failing_with_output(args.str("value")?)))
                    .param(Param::new("value", ParamType::Str))
                    .static_member(),
            )
            .method(
                Method::sync("prints_and_returns", |_, args| {
                    prints_and_returns(args.str("message")?).map(Returned::new)
                })
                .param(Param::new("message", ParamType::Str))
                .returns(ParamType::Str)
                .static_member(),
            ),
    );
}
