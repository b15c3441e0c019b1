//! Stderr tracing with a runtime-switchable filter.
//!
//! stdout carries protocol lines only, so every trace goes to stderr. The filter comes from
//! `RUST_LOG` (default `warn`) and sits behind a reload layer so `config.debug` can raise it.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

const DEFAULT_DIRECTIVE: &str = "warn";
const DEBUG_DIRECTIVE: &str = "debug";

/// Handle that toggles the debug filter. Inert when no subscriber was installed.
#[derive(Clone, Default)]
pub struct DebugSwitch {
    handle: Option<reload::Handle<EnvFilter, Registry>>,
}

impl DebugSwitch {
    /// A switch that does nothing (tests, embedders with their own subscriber).
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn set_debug(&self, on: bool) {
        let Some(handle) = &self.handle else {
            return;
        };
        let filter = if on { EnvFilter::new(DEBUG_DIRECTIVE) } else { base_filter() };
        if let Err(e) = handle.reload(filter) {
            eprintln!("babeltest: cannot switch log filter: {e}");
        }
    }
}

impl std::fmt::Debug for DebugSwitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugSwitch").field("enabled", &self.handle.is_some()).finish()
    }
}

fn base_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber. Returns an inert switch if one is already installed.
pub fn init() -> DebugSwitch {
    let (filter, handle) = reload::Layer::new(base_filter());
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
    match installed {
        Ok(()) => DebugSwitch { handle: Some(handle) },
        Err(_) => DebugSwitch::disabled(),
    }
}
