//! Adapter error-kind vocabulary.
//!
//! These are the `error.type` values an adapter reports when a command cannot be judged. Kinds
//! raised by the code under test (e.g. `ArgumentException`) are *not* listed here: they are
//! reported verbatim.

use super::registry::{self, LangItemInfo, item};

/// Stable identity of an adapter-level error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Resolution,
    Construction,
    Coercion,
    MockInstall,
    Invocation,
    Timeout,
    Protocol,
}

/// Metadata for an error kind.
pub type ErrorKindInfo = LangItemInfo<ErrorKind>;

/// Registry of adapter error kinds.
pub const ERROR_KINDS: &[ErrorKindInfo] = &[
    item(
        ErrorKind::Resolution,
        "ResolutionError",
        &[],
        "The dotted target path could not be mapped to a type and member.",
    ),
    item(
        ErrorKind::Construction,
        "ConstructionError",
        &[],
        "A receiver instance could not be produced by any construction strategy.",
    ),
    item(
        ErrorKind::Coercion,
        "CoercionError",
        &[],
        "A given value could not be converted to the declared parameter type or type hint.",
    ),
    item(
        ErrorKind::MockInstall,
        "MockInstallError",
        &[],
        "A mock target could not be resolved or the mock declared both `returns` and `throws`.",
    ),
    item(
        ErrorKind::Invocation,
        "InvocationError",
        &[],
        "The target raised an error and the test did not declare `throws`.",
    ),
    item(
        ErrorKind::Timeout,
        "TimeoutError",
        &[],
        "The invocation exceeded its time budget.",
    ),
    item(
        ErrorKind::Protocol,
        "ProtocolError",
        &[],
        "A command line was malformed or named an unknown action or lifecycle event.",
    ),
];

/// Return the canonical spelling for an error kind (e.g. `"ResolutionError"`).
#[inline]
pub fn as_str(kind: ErrorKind) -> &'static str {
    info_for(kind).canonical
}

/// Return the user-facing description for an error kind.
#[inline]
pub fn description(kind: ErrorKind) -> &'static str {
    info_for(kind).description
}

/// Resolve a spelling to an error kind.
///
/// Matching is case-sensitive.
pub fn from_str(name: &str) -> Option<ErrorKind> {
    registry::lookup(ERROR_KINDS, name)
}

/// Return full metadata for an error kind.
pub fn info_for(kind: ErrorKind) -> &'static ErrorKindInfo {
    registry::entry(ERROR_KINDS, kind)
}

/// Kind reported when target code panics instead of returning a `Raised`.
pub const PANIC_KIND: &str = "Panic";

/// Kind reported when an argument accessor receives the wrong shape.
pub const TYPE_ERROR_KIND: &str = "TypeError";
