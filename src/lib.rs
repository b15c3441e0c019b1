#![forbid(unsafe_code)]
//! BabelTest adapter runtime for Rust codebases
//!
//! The adapter executes language-neutral test commands against a Rust codebase that has
//! registered itself into a [`babeltest_core::Registry`]. It reads one JSON command per line,
//! resolves the dotted target path to a callable, builds receivers from factories or
//! constructors, installs mocks, invokes under a timeout and writes one JSON result per line.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` and `adapter` modules
//!   enforce `#![deny(clippy::unwrap_used)]`. A failure in one command becomes an `error` result for that
//!   command only; the loop keeps serving.
//!
//! - **Code under test**: Panics raised by registered members are caught at the invocation boundary and
//!   reported as raised errors of kind `Panic`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **True invariants**: If a panic represents an adapter bug (logic error), use `.expect("INVARIANT: reason")`
//!   with a clear explanation.

pub mod adapter;
pub mod assertions;
pub mod capture;
pub mod cli;
pub mod coercion;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod instances;
pub mod invoke;
pub mod logging;
pub mod mocks;
pub mod protocol;
pub mod resolver;
pub mod version;

pub use adapter::{AdapterState, Flow, serve};
pub use config::AdapterConfig;
pub use errors::AdapterError;
pub use protocol::{Command, Status, TestResult, TestSpec};
