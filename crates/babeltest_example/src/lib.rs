//! Example codebase exercised by the BabelTest adapter.
//!
//! Each module holds ordinary Rust code plus a `register` function describing it to the adapter.
//! Paths mirror the cross-language example package (`example.math`, `example.services`, ...), so
//! the same test suites replay against every adapter.

#![forbid(unsafe_code)]

use std::sync::{Mutex, MutexGuard};

use babeltest_core::{Raised, Registry};

pub mod async_funcs;
pub mod container;
pub mod conversions;
pub mod lifecycle_demo;
pub mod math;
pub mod nested;
pub mod notifications;
pub mod payment;
pub mod services;
pub mod with_output;

/// Build the registry describing the whole example codebase.
pub fn registry() -> Registry {
    let mut registry = Registry::new();
    math::register(&mut registry);
    services::register(&mut registry);
    payment::register(&mut registry);
    nested::register(&mut registry);
    lifecycle_demo::register(&mut registry);
    async_funcs::register(&mut registry);
    notifications::register(&mut registry);
    container::register(&mut registry);
    conversions::register(&mut registry);
    with_output::register(&mut registry);
    registry
}

/// Lock a mutex, reporting poisoning as a raised error instead of panicking.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, Raised> {
    mutex
        .lock()
        .map_err(|_| Raised::new("PoisonError", "state lock poisoned by an earlier panic"))
}
