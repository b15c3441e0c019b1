//! Instance-lifecycle vocabulary: caching modes and the lifecycle events that drive them.

use super::registry::{self, LangItemInfo, item};

/// Receiver caching policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleMode {
    /// Cache until an explicit `clear_cache`.
    #[default]
    Shared,
    /// Never read or write the cache.
    PerTest,
    /// Like `Shared`, cleared on `suite_start`.
    PerSuite,
}

pub type LifecycleModeInfo = LangItemInfo<LifecycleMode>;

pub const LIFECYCLE_MODES: &[LifecycleModeInfo] = &[
    item(
        LifecycleMode::Shared,
        "shared",
        &["SHARED", "singleton"],
        "One receiver per type, reused until the cache is cleared.",
    ),
    item(
        LifecycleMode::PerTest,
        "per_test",
        &["PER_TEST", "per-test", "perTest"],
        "A fresh receiver for every test.",
    ),
    item(
        LifecycleMode::PerSuite,
        "per_suite",
        &["PER_SUITE", "per-suite", "perSuite"],
        "One receiver per type per suite.",
    ),
];

#[inline]
pub fn mode_as_str(mode: LifecycleMode) -> &'static str {
    registry::entry(LIFECYCLE_MODES, mode).canonical
}

pub fn mode_from_str(name: &str) -> Option<LifecycleMode> {
    registry::lookup(LIFECYCLE_MODES, name)
}

/// Lifecycle events carried by `{"action":"lifecycle"}` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    ClearCache,
    SuiteStart,
    SuiteEnd,
    TestStart,
    TestEnd,
}

pub type LifecycleEventInfo = LangItemInfo<LifecycleEvent>;

pub const LIFECYCLE_EVENTS: &[LifecycleEventInfo] = &[
    item(
        LifecycleEvent::ClearCache,
        "clear_cache",
        &[],
        "Drop cached receivers, parsed factory files and any active mocks.",
    ),
    item(
        LifecycleEvent::SuiteStart,
        "suite_start",
        &[],
        "A suite is starting; clears the cache in `per_suite` mode.",
    ),
    item(LifecycleEvent::SuiteEnd, "suite_end", &[], "A suite finished."),
    item(
        LifecycleEvent::TestStart,
        "test_start",
        &[],
        "A test is starting; clears the cache in `per_test` mode.",
    ),
    item(
        LifecycleEvent::TestEnd,
        "test_end",
        &[],
        "A test finished; clears the cache in `per_test` mode.",
    ),
];

#[inline]
pub fn event_as_str(event: LifecycleEvent) -> &'static str {
    registry::entry(LIFECYCLE_EVENTS, event).canonical
}

pub fn event_from_str(name: &str) -> Option<LifecycleEvent> {
    registry::lookup(LIFECYCLE_EVENTS, name)
}
