//! Receiver construction and lifecycle caching.
//!
//! Strategies, in priority order:
//! 1. the type's `test_factory` builder;
//! 2. constructor injection of active mock proxies;
//! 3. a recipe from a declarative factory file;
//! 4. a constructor whose parameters all have defaults.
//!
//! A receiver built around a mock proxy, directly or through a `$type` dependency, is never cached.

pub mod factories;

use std::collections::HashMap;
use std::path::Path;

use babeltest_core::lang::conventions::TEST_FACTORY_NAME;
use babeltest_core::lang::lifecycle::{LifecycleEvent, LifecycleMode, event_as_str};
use babeltest_core::{Arg, Builder, CallArgs, Constructor, Param, Raised, Receiver, Registry, TypeInfo, TypeKind, naming};
use serde_json::{Map, Value};
use tracing::debug;

use crate::coercion;
use crate::diagnostics::{DiagnosticContext, suggest_factory_creation};
use crate::errors::AdapterError;
use crate::invoke;
use crate::mocks::MockEngine;
use factories::{FactoryEntry, FactoryFiles};

/// Everything construction consults besides the manager's own state.
#[derive(Clone, Copy)]
pub struct ConstructionEnv<'a> {
    pub registry: &'a Registry,
    pub mocks: &'a MockEngine,
    pub factories_dir: &'a Path,
}

#[derive(Debug, Default)]
pub struct InstanceManager {
    lifecycle: LifecycleMode,
    cache: HashMap<String, Receiver>,
    factories: FactoryFiles,
    /// Types under construction, for cycle detection through `$type` references.
    building: Vec<String>,
    /// Mock proxies handed out so far. A build during which this moves is never cached.
    injections: usize,
}

impl InstanceManager {
    pub fn new(lifecycle: LifecycleMode) -> Self {
        Self {
            lifecycle,
            ..Self::default()
        }
    }

    pub fn lifecycle(&self) -> LifecycleMode {
        self.lifecycle
    }

    /// Switch lifecycle mode; a change drops every cached receiver.
    pub fn set_lifecycle(&mut self, mode: LifecycleMode) {
        if mode != self.lifecycle {
            self.clear_instances();
        }
        self.lifecycle = mode;
    }

    pub fn cached(&self, type_path: &str) -> Option<&Receiver> {
        self.cache.get(type_path)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_instances(&mut self) {
        self.cache.clear();
    }

    /// Drop cached receivers and parsed factory files.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.factories.clear();
    }

    pub fn on_event(&mut self, event: LifecycleEvent) {
        let clears = match event {
            LifecycleEvent::ClearCache => {
                self.clear_cache();
                return;
            }
            LifecycleEvent::SuiteStart => self.lifecycle == LifecycleMode::PerSuite,
            LifecycleEvent::TestStart | LifecycleEvent::TestEnd => self.lifecycle == LifecycleMode::PerTest,
            LifecycleEvent::SuiteEnd => false,
        };
        if clears && !self.cache.is_empty() {
            debug!(event = event_as_str(event), dropped = self.cache.len(), "instance cache cleared");
            self.clear_instances();
        }
    }

    pub fn get_instance(&mut self, info: &TypeInfo, env: &ConstructionEnv<'_>) -> Result<Receiver, AdapterError> {
        if info.kind == TypeKind::Module {
            return Err(AdapterError::construction_raised(format!(
                "{} is a module and has no instances",
                info.path
            )));
        }
        if self.building.contains(&info.path) {
            let chain = self.building.join(" -> ");
            return Err(AdapterError::construction_raised(format!(
                "Cyclic factory reference: {chain} -> {}",
                info.path
            )));
        }

        let mocked = info.required_capabilities().any(|c| env.mocks.has_mock_for(c, env.registry));
        let cacheable = self.lifecycle != LifecycleMode::PerTest && !mocked;
        if cacheable {
            if let Some(cached) = self.cache.get(&info.path) {
                debug!(type_path = %info.path, "instance cache hit");
                return Ok(cached.clone());
            }
        }

        let injections = self.injections;
        self.building.push(info.path.clone());
        let result = self.build(info, env, mocked);
        self.building.pop();
        let receiver = result?;

        if self.injections != injections {
            debug!(type_path = %info.path, "built around mock proxies; not cached");
        } else if cacheable {
            self.cache.insert(info.path.clone(), receiver.clone());
        }
        Ok(receiver)
    }

    fn build(&mut self, info: &TypeInfo, env: &ConstructionEnv<'_>, mocked: bool) -> Result<Receiver, AdapterError> {
        let name = info.name();
        let mut ctx = DiagnosticContext::new(&info.path);

        match info.test_factory_builder() {
            Some(builder) => {
                let receiver = run_builder(builder).map_err(|raised| {
                    AdapterError::construction_raised(format!("{name}::{TEST_FACTORY_NAME} failed: {raised}"))
                })?;
                debug!(type_path = %info.path, strategy = "test_factory", "constructed");
                return Ok(receiver);
            }
            None => ctx.add_search(format!("{name}::{TEST_FACTORY_NAME}"), false, Some("not registered")),
        }

        if mocked {
            if let Some(receiver) = inject_mocks(info, env)? {
                self.injections += 1;
                debug!(type_path = %info.path, strategy = "mock injection", "constructed");
                return Ok(receiver);
            }
            ctx.add_search(
                format!("{name} constructor injection"),
                false,
                Some("no constructor satisfiable by active mocks and defaults"),
            );
        }

        if let Some(entry) = self.factories.find(info, env.factories_dir, &mut ctx) {
            let receiver = self.from_factory(info, &entry, env)?;
            debug!(type_path = %info.path, strategy = "factory file", file = %entry.file.display(), "constructed");
            return Ok(receiver);
        }

        match info.constructors.iter().find(|c| c.is_defaultable()) {
            Some(ctor) => {
                let args = default_args(&ctor.params)?;
                let receiver = (ctor.build)(&args)
                    .map_err(|raised| AdapterError::construction_raised(format!("{name}() raised {raised}")))?;
                debug!(type_path = %info.path, strategy = "default constructor", "constructed");
                return Ok(receiver);
            }
            None => {
                let reason = if info.constructors.is_empty() {
                    "no constructor registered"
                } else {
                    "every constructor requires arguments"
                };
                ctx.add_search(format!("{name}() (parameterless constructor)"), false, Some(reason));
            }
        }

        ctx.add_suggestion(suggest_factory_creation(info, env.factories_dir));
        ctx.add_suggestion(format!("Register a `{TEST_FACTORY_NAME}` builder on {name}"));
        ctx.add_suggestion(format!("Add a constructor to {name} whose parameters all have defaults"));
        Err(AdapterError::construction(&format!("Cannot construct {name}"), &ctx))
    }

    fn from_factory(
        &mut self,
        info: &TypeInfo,
        entry: &FactoryEntry,
        env: &ConstructionEnv<'_>,
    ) -> Result<Receiver, AdapterError> {
        let name = info.name();
        let origin = format!("factory '{}' in {}", entry.name, entry.file.display());

        if let Some(builder_name) = &entry.builder {
            let builder = info.builder_named(builder_name).ok_or_else(|| {
                AdapterError::construction_raised(format!("{origin} names unknown builder '{builder_name}' on {name}"))
            })?;
            return run_builder(builder)
                .map_err(|raised| AdapterError::construction_raised(format!("{name}::{builder_name} failed: {raised}")));
        }

        let ctor = best_constructor(info, &entry.args).ok_or_else(|| {
            let keys: Vec<&str> = entry.args.keys().map(String::as_str).collect();
            AdapterError::construction_raised(format!(
                "{origin}: no constructor of {name} accepts args [{}]",
                keys.join(", ")
            ))
        })?;

        let mut args = CallArgs::new();
        for param in &ctor.params {
            let arg = match supplied(&entry.args, &param.name) {
                Some(value) => match factories::type_ref(value) {
                    Some(path) => Arg::Instance(self.instance_for_ref(path, env)?),
                    None => coercion::coerce(&param.name, value, &param.ty, None)?,
                },
                None => match &param.default {
                    Some(default) => coercion::coerce(&param.name, default, &param.ty, None)?,
                    None => Arg::Null,
                },
            };
            args.push(param.name.clone(), arg);
        }
        (ctor.build)(&args).map_err(|raised| AdapterError::construction_raised(format!("{origin} raised {raised}")))
    }

    /// Resolve a `{"$type": ...}` reference: a mock proxy when one is active, else a constructed instance.
    fn instance_for_ref(&mut self, path: &str, env: &ConstructionEnv<'_>) -> Result<Receiver, AdapterError> {
        if let Some(proxy) = env.mocks.proxy_for(path, env.registry) {
            self.injections += 1;
            return Ok(proxy);
        }
        let target = env
            .registry
            .find_type(path)
            .or_else(|| env.registry.find_by_name(path))
            .or_else(|| env.registry.find_by_name(naming::strip_capability_marker(path)))
            .cloned()
            .ok_or_else(|| AdapterError::construction_raised(format!("Factory references unknown type '{path}'")))?;
        self.get_instance(&target, env)
    }
}

fn run_builder(builder: &Builder) -> Result<Receiver, Raised> {
    match builder {
        Builder::Sync(build) => build(),
        Builder::Async(build) => invoke::block_on(build()).and_then(|built| built),
    }
}

fn default_args(params: &[Param]) -> Result<CallArgs, AdapterError> {
    let mut args = CallArgs::new();
    for param in params {
        let arg = match &param.default {
            Some(default) => coercion::coerce(&param.name, default, &param.ty, None)?,
            None => Arg::Null,
        };
        args.push(param.name.clone(), arg);
    }
    Ok(args)
}

/// Constructors (most parameters first) whose every parameter is an active mock or has a default.
fn inject_mocks(info: &TypeInfo, env: &ConstructionEnv<'_>) -> Result<Option<Receiver>, AdapterError> {
    let mut ctors: Vec<&Constructor> = info.constructors.iter().collect();
    ctors.sort_by_key(|c| std::cmp::Reverse(c.params.len()));

    'ctors: for ctor in ctors {
        let mut args = CallArgs::new();
        let mut injected = 0usize;
        for param in &ctor.params {
            if let Some(proxy) = param.ty.capability_name().and_then(|c| env.mocks.proxy_for(c, env.registry)) {
                args.push(param.name.clone(), Arg::Instance(proxy));
                injected += 1;
                continue;
            }
            match &param.default {
                Some(default) => args.push(param.name.clone(), coercion::coerce(&param.name, default, &param.ty, None)?),
                None => continue 'ctors,
            }
        }
        if injected == 0 {
            continue;
        }
        let receiver = (ctor.build)(&args).map_err(|raised| {
            AdapterError::construction_raised(format!("{} with injected mocks raised {raised}", info.name()))
        })?;
        return Ok(Some(receiver));
    }
    Ok(None)
}

fn supplied<'a>(args: &'a Map<String, Value>, param: &str) -> Option<&'a Value> {
    args.get(param)
        .or_else(|| args.iter().find(|(k, _)| naming::names_match(k, param)).map(|(_, v)| v))
}

/// The constructor that accepts every supplied arg and can default the rest.
///
/// Prefers the one consuming the most supplied args, then the one with more parameters.
fn best_constructor<'a>(info: &'a TypeInfo, args: &Map<String, Value>) -> Option<&'a Constructor> {
    info.constructors
        .iter()
        .filter(|ctor| args.keys().all(|k| ctor.find_param(k).is_some()))
        .filter(|ctor| {
            ctor.params
                .iter()
                .all(|p| supplied(args, &p.name).is_some() || p.has_default() || p.ty.is_optional())
        })
        .max_by_key(|ctor| {
            let used = ctor.params.iter().filter(|p| supplied(args, &p.name).is_some()).count();
            (used, ctor.params.len())
        })
}
