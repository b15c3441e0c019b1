//! Per-run mocks, spies and call tracking.
//!
//! A mock is installed two ways at once:
//! - **table patch**: the owning type's member slot in the registry is swapped for a body that
//!   records the call and returns/raises, so every dispatch through the member table sees it;
//! - **capability proxy**: when the owning type is a capability with a proxy factory, the
//!   instance manager injects a [`MockProxy`]-backed value into constructors that accept it.
//!
//! Everything installed here lives for one `run`. [`MockEngine::uninstall_all`] restores the
//! original members in reverse order and starts a fresh tracker.

mod proxy;
mod tracker;

use std::sync::Arc;

use babeltest_core::lang::conventions::ANY_MATCHER;
use babeltest_core::{
    AsyncBody, Body, BoxFuture, CallArgs, CallContext, Method, Raised, Receiver, Registry, Returned, TypeInfo, naming,
};
use serde_json::Value;
use tracing::{debug, warn};

pub use proxy::{MockBehavior, MockProxy};
pub use tracker::CallTracker;

use crate::errors::AdapterError;
use crate::protocol::{CalledAssertion, MockSpec, ThrowsExpectation};

/// Kind used when a mock's `throws` names no type.
const DEFAULT_MOCK_ERROR_KIND: &str = "MockError";

#[derive(Debug, Clone)]
struct ActiveMock {
    type_path: String,
    /// Declared member name; the requested spelling when the type has no such method.
    member: String,
    behavior: MockBehavior,
}

#[derive(Debug, Default)]
pub struct MockEngine {
    tracker: CallTracker,
    active: Vec<ActiveMock>,
    /// (type path, declared member) pairs with a pass-through spy.
    spies: Vec<(String, String)>,
    /// Original members, in patch order.
    patches: Vec<(String, Method)>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracker(&self) -> &CallTracker {
        &self.tracker
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_clean(&self) -> bool {
        self.active.is_empty() && self.spies.is_empty() && self.patches.is_empty() && self.tracker.total() == 0
    }

    /// Start a run from a clean slate, dropping anything a previous run left behind.
    pub fn begin(&mut self, registry: &mut Registry) {
        if !self.is_clean() {
            warn!("mock state left over from a previous run; uninstalling");
        }
        self.uninstall_all(registry);
    }

    pub fn install(&mut self, spec: &MockSpec, registry: &mut Registry) -> Result<(), AdapterError> {
        let behavior = behavior_for(spec)?;
        if let Some(given) = &spec.given {
            if !given.is_null() && given.as_str() != Some(ANY_MATCHER) {
                warn!(target_path = %spec.target, "mock `given` matchers are not evaluated; mock applies to every call");
            }
        }

        let (info, member) = lookup_target(&spec.target, registry)?;
        if self.mock_on(&info.path, &member).is_some() {
            debug!(target_path = %spec.target, "duplicate mock ignored; the first one wins");
            return Ok(());
        }

        let method = info.method_named(&member);
        let member_key = method.map_or_else(|| member.clone(), |m| m.name.clone());
        if method.is_none() && info.proxy.is_none() {
            return Err(AdapterError::mock_install(format!(
                "Cannot mock {}: {} has no member '{member}'",
                spec.target, info.path
            )));
        }

        if let Some(method) = method {
            let key = CallTracker::key(&info.path, &method.name);
            let tracker = self.tracker.clone();
            let canned = behavior.clone();
            let body = Body::Sync(Arc::new(move |_: &CallContext, args: &CallArgs| {
                tracker.record(&key, args.to_json());
                canned.returned()
            }));
            self.patch(registry, &info.path, &method.name, body);
        }

        debug!(target_path = %spec.target, type_path = %info.path, member = %member_key, "mock installed");
        self.active.push(ActiveMock {
            type_path: info.path.clone(),
            member: member_key,
            behavior,
        });
        Ok(())
    }

    /// Record-and-delegate patch for a `CALLED` target that has no mock.
    pub fn install_spy(&mut self, called: &CalledAssertion, registry: &mut Registry) -> Result<(), AdapterError> {
        let (info, member) = lookup_target(&called.target, registry)?;
        let covered = self.mock_on(&info.path, &member).is_some()
            || self.spies.iter().any(|(path, m)| path == &info.path && naming::names_match(&member, m));
        if covered {
            return Ok(());
        }

        let Some(original) = info.method_named(&member).cloned() else {
            if info.proxy.is_some() {
                // Calls on a capability only happen through a proxy, which records them.
                return Ok(());
            }
            return Err(AdapterError::mock_install(format!(
                "Cannot spy on {}: {} has no member '{member}'",
                called.target, info.path
            )));
        };

        let key = CallTracker::key(&info.path, &original.name);
        let tracker = self.tracker.clone();
        let body = match original.body.clone() {
            Body::Sync(inner) => Body::Sync(Arc::new(move |ctx: &CallContext, args: &CallArgs| {
                tracker.record(&key, args.to_json());
                inner(ctx, args)
            })),
            Body::Async(inner) => {
                let wrapped: AsyncBody = Arc::new(
                    move |ctx: CallContext, args: CallArgs| -> BoxFuture<'static, Result<Returned, Raised>> {
                        tracker.record(&key, args.to_json());
                        inner(ctx, args)
                    },
                );
                Body::Async(wrapped)
            }
        };
        self.patch(registry, &info.path, &original.name, body);
        debug!(target_path = %called.target, "spy installed");
        self.spies.push((info.path.clone(), original.name.clone()));
        Ok(())
    }

    fn patch(&mut self, registry: &mut Registry, type_path: &str, member: &str, body: Body) {
        if let Some(original) = registry.patch_method(type_path, member, body) {
            self.patches.push((type_path.to_string(), original));
        }
    }

    /// The canned outcome when `target` itself is mocked.
    pub fn check_intercepted(&self, target: &str, registry: &Registry) -> Option<MockBehavior> {
        let (info, member) = lookup_target(target, registry).ok()?;
        self.mock_on(&info.path, &member).map(|m| m.behavior.clone())
    }

    fn mock_on(&self, type_path: &str, member: &str) -> Option<&ActiveMock> {
        self.active
            .iter()
            .find(|m| m.type_path == type_path && naming::names_match(member, &m.member))
    }

    pub fn record_call(&self, key: &str, args: Value) {
        self.tracker.record(key, args);
    }

    /// Whether an active mock covers capability `name`.
    pub fn has_mock_for(&self, name: &str, registry: &Registry) -> bool {
        find_capability(name, registry).is_some_and(|info| self.active.iter().any(|m| m.type_path == info.path))
    }

    /// A proxy value for capability `name` (short name, marker-prefixed name or full path).
    ///
    /// `None` unless the capability has an active mock and a registered proxy factory.
    pub fn proxy_for(&self, name: &str, registry: &Registry) -> Option<Receiver> {
        let info = find_capability(name, registry)?;
        let factory = info.proxy.as_ref()?;
        let mocks: Vec<&ActiveMock> = self.active.iter().filter(|m| m.type_path == info.path).collect();
        if mocks.is_empty() {
            return None;
        }
        let proxy = mocks.into_iter().fold(
            MockProxy::new(info.name(), self.tracker.clone()),
            |proxy, mock| proxy.with_behavior(&mock.member, mock.behavior.clone()),
        );
        debug!(capability = %info.path, "mock proxy injected");
        Some(Receiver::from_instance(info.path.clone(), factory(Arc::new(proxy))))
    }

    /// Restore every patched member (reverse order), clear mocks and spies, and start a fresh tracker.
    pub fn uninstall_all(&mut self, registry: &mut Registry) {
        while let Some((type_path, original)) = self.patches.pop() {
            if !registry.restore_method(&type_path, original) {
                warn!(type_path = %type_path, "patched member vanished before restore");
            }
        }
        if !self.active.is_empty() || !self.spies.is_empty() {
            debug!(mocks = self.active.len(), spies = self.spies.len(), "mocks uninstalled");
        }
        self.active.clear();
        self.spies.clear();
        // Swap rather than clear: a timed-out worker may still hold the old tracker.
        self.tracker = CallTracker::new();
    }
}

fn behavior_for(spec: &MockSpec) -> Result<MockBehavior, AdapterError> {
    let returns = spec.returns.as_ref().filter(|v| !v.is_null());
    match (returns, &spec.throws) {
        (Some(_), Some(_)) => Err(AdapterError::mock_install(format!(
            "Mock for {} declares both returns and throws",
            spec.target
        ))),
        (_, Some(throws)) => Ok(MockBehavior::Raise(raised_for(throws))),
        (Some(value), None) => Ok(MockBehavior::Return(value.clone())),
        (None, None) => Ok(MockBehavior::Return(Value::Null)),
    }
}

fn raised_for(throws: &ThrowsExpectation) -> Raised {
    let kind = throws.kind.as_deref().unwrap_or(DEFAULT_MOCK_ERROR_KIND);
    let message = throws.message.clone().unwrap_or_else(|| format!("{kind} raised by mock"));
    Raised::new(kind, message)
}

/// Split `[module.]Type.member` and find the owning type.
fn lookup_target(target: &str, registry: &Registry) -> Result<(Arc<TypeInfo>, String), AdapterError> {
    let Some((type_part, member)) = target.rsplit_once('.') else {
        return Err(AdapterError::mock_install(format!(
            "Mock target '{target}' must name a member as Type.member"
        )));
    };
    let info = registry
        .find_type(type_part)
        .or_else(|| registry.find_by_name(type_part))
        .or_else(|| registry.find_by_name(naming::strip_capability_marker(type_part)))
        .cloned()
        .ok_or_else(|| AdapterError::mock_install(format!("Cannot resolve mock target type '{type_part}' in {target}")))?;
    Ok((info, member.to_string()))
}

fn find_capability<'r>(name: &str, registry: &'r Registry) -> Option<&'r Arc<TypeInfo>> {
    registry
        .find_type(name)
        .or_else(|| registry.find_by_name(name))
        .or_else(|| registry.find_by_name(naming::strip_capability_marker(name)))
}
