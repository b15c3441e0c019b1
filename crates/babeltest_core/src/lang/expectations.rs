//! Expectation-kind vocabulary (`expect.type` on the wire).

use super::registry::{self, LangItemInfo, item};

/// Stable identity of an expectation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExpectKind {
    #[default]
    Exact,
    Contains,
    Type,
    Null,
    NotNull,
    True,
    False,
}

impl ExpectKind {
    /// Whether this kind compares against `expect.value`.
    pub fn needs_value(self) -> bool {
        matches!(self, ExpectKind::Exact | ExpectKind::Contains | ExpectKind::Type)
    }
}

pub type ExpectKindInfo = LangItemInfo<ExpectKind>;

/// Registry of expectation kinds.
pub const EXPECT_KINDS: &[ExpectKindInfo] = &[
    item(
        ExpectKind::Exact,
        "exact",
        &["EXACT", "equals"],
        "Structural equality; numbers compare numerically.",
    ),
    item(
        ExpectKind::Contains,
        "contains",
        &["CONTAINS"],
        "Recursive partial match; extra keys are ignored and arrays use multiset containment.",
    ),
    item(
        ExpectKind::Type,
        "type",
        &["TYPE"],
        "The kind name of the actual value equals the expected string.",
    ),
    item(ExpectKind::Null, "null", &["NULL"], "The actual value is null."),
    item(
        ExpectKind::NotNull,
        "not_null",
        &["NOT_NULL", "notNull"],
        "The actual value is not null.",
    ),
    item(ExpectKind::True, "true", &["TRUE"], "The actual value is the boolean true."),
    item(ExpectKind::False, "false", &["FALSE"], "The actual value is the boolean false."),
];

#[inline]
pub fn as_str(kind: ExpectKind) -> &'static str {
    info_for(kind).canonical
}

/// Resolve a spelling to an expectation kind.
pub fn from_str(name: &str) -> Option<ExpectKind> {
    registry::lookup(EXPECT_KINDS, name)
}

pub fn info_for(kind: ExpectKind) -> &'static ExpectKindInfo {
    registry::entry(EXPECT_KINDS, kind)
}
