//! The command loop.
//!
//! [`AdapterState`] owns every piece of mutable state (config, registry, instance cache, mocks).
//! [`serve`] reads one command per line, hands it to [`AdapterState::handle_line`], and writes
//! one result line back, flushed immediately. Commands are handled strictly in arrival order.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod host;

use std::sync::Arc;
use std::time::Instant;

use babeltest_core::lang::lifecycle::{self, LIFECYCLE_EVENTS, LifecycleEvent};
use babeltest_core::lang::registry as vocab;
use babeltest_core::{CallContext, Registry, Returned};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, trace};

pub use host::ResolveHost;

use crate::assertions;
use crate::capture::OutputGuard;
use crate::coercion;
use crate::config::{AdapterConfig, ConfigPatch};
use crate::errors::AdapterError;
use crate::instances::InstanceManager;
use crate::invoke::{self, Outcome};
use crate::logging::DebugSwitch;
use crate::mocks::{CallTracker, MockBehavior, MockEngine};
use crate::protocol::{Action, Command, TestResult, TestSpec};
use crate::resolver;

// ============================================================================
// State
// ============================================================================

/// Whether the loop keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

#[derive(Debug)]
pub struct AdapterState {
    config: AdapterConfig,
    registry: Arc<Registry>,
    instances: InstanceManager,
    mocks: MockEngine,
    debug_switch: DebugSwitch,
}

impl AdapterState {
    pub fn new(registry: Registry, config: AdapterConfig) -> Self {
        let instances = InstanceManager::new(config.lifecycle);
        Self {
            config,
            registry: Arc::new(registry),
            instances,
            mocks: MockEngine::new(),
            debug_switch: DebugSwitch::disabled(),
        }
    }

    pub fn with_debug_switch(mut self, switch: DebugSwitch) -> Self {
        self.debug_switch = switch;
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn instances(&self) -> &InstanceManager {
        &self.instances
    }

    pub fn mocks(&self) -> &MockEngine {
        &self.mocks
    }

    /// Handle one raw protocol line. Blank lines produce no response.
    pub async fn handle_line(&mut self, line: &str) -> Option<(TestResult, Flow)> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let started = Instant::now();
        let (result, flow) = match Command::parse(line) {
            Ok(command) => self.dispatch(command).await,
            Err(err) => (TestResult::error(&err), Flow::Continue),
        };
        let result = if result.duration_ms == 0.0 {
            result.with_duration_ms(elapsed_ms(started))
        } else {
            result
        };
        Some((result, flow))
    }

    pub async fn dispatch(&mut self, command: Command) -> (TestResult, Flow) {
        if let Some(patch) = &command.config {
            if let Err(err) = self.apply_config(patch) {
                return (TestResult::error(&err), Flow::Continue);
            }
        }

        match Action::parse(&command.action) {
            Some(Action::Run) => match &command.test {
                Some(test) => (self.run(test).await, Flow::Continue),
                None => protocol_error("run command requires a 'test' object"),
            },
            Some(Action::Lifecycle) => (self.lifecycle(&command), Flow::Continue),
            Some(Action::Exit) => {
                debug!("exit requested");
                (TestResult::ok(), Flow::Stop)
            }
            None => protocol_error(&format!(
                "Unknown action '{}' (expected run|lifecycle|exit)",
                command.action
            )),
        }
    }

    fn apply_config(&mut self, patch: &ConfigPatch) -> Result<(), AdapterError> {
        let changes = self.config.apply(patch)?;
        if changes.lifecycle_changed {
            info!(lifecycle = lifecycle::mode_as_str(self.config.lifecycle), "instance lifecycle changed");
            self.instances.set_lifecycle(self.config.lifecycle);
        }
        if let Some(on) = changes.debug {
            self.debug_switch.set_debug(on);
        }
        if let Some(path) = &patch.project_path {
            debug!(project_path = %path, "project path recorded (codebase is linked in)");
        }
        Ok(())
    }

    fn lifecycle(&mut self, command: &Command) -> TestResult {
        let Some(name) = command.lifecycle.as_deref() else {
            return TestResult::error(&AdapterError::protocol("lifecycle command requires a 'lifecycle' event name"));
        };
        let Some(event) = lifecycle::event_from_str(name) else {
            return TestResult::error(&AdapterError::protocol(format!(
                "Unknown lifecycle event '{name}' (expected {})",
                vocab::spellings(LIFECYCLE_EVENTS)
            )));
        };

        match (event, command.data_name()) {
            (LifecycleEvent::SuiteStart | LifecycleEvent::SuiteEnd, Some(suite)) => {
                info!(event = name, suite, "suite event")
            }
            (LifecycleEvent::TestStart | LifecycleEvent::TestEnd, Some(test)) => debug!(event = name, test, "test event"),
            _ => debug!(event = name, "lifecycle event"),
        }

        if event == LifecycleEvent::ClearCache {
            let registry = Arc::make_mut(&mut self.registry);
            self.mocks.uninstall_all(registry);
        }
        self.instances.on_event(event);
        TestResult::ok()
    }

    // ========================================================================
    // run
    // ========================================================================

    /// Execute one test. Mocks never outlive this call.
    pub async fn run(&mut self, test: &TestSpec) -> TestResult {
        let started = Instant::now();
        debug!(target_path = %test.target, description = test.description.as_deref().unwrap_or(""), "run");

        self.mocks.begin(Arc::make_mut(&mut self.registry));
        let result = match self.execute(test).await {
            Ok(result) => result,
            Err(err) => {
                debug!(target_path = %test.target, error = %err.type_name(), "run errored");
                TestResult::error(&err)
            }
        };
        self.mocks.uninstall_all(Arc::make_mut(&mut self.registry));

        result.with_duration_ms(elapsed_ms(started))
    }

    async fn execute(&mut self, test: &TestSpec) -> Result<TestResult, AdapterError> {
        {
            let registry = Arc::make_mut(&mut self.registry);
            for mock in &test.mocks {
                self.mocks.install(mock, registry)?;
            }
            for called in test.called() {
                self.mocks.install_spy(called, registry)?;
            }
        }

        let outcome = match self.mocks.check_intercepted(&test.target, &self.registry) {
            Some(behavior) => {
                if let Some(key) = CallTracker::key_for_target(&test.target) {
                    self.mocks.record_call(&key, Value::Object(test.given.clone()));
                }
                debug!(target_path = %test.target, "target is mocked; not invoked");
                match behavior {
                    MockBehavior::Return(value) => Outcome::Returned(Returned::new(value)),
                    MockBehavior::Raise(raised) => Outcome::Raised(raised),
                }
            }
            None => {
                let guard = OutputGuard::start(self.config.capture_output);
                let outcome = self.invoke_target(test).await;
                let logs = guard.finish().as_logs();
                return Ok(match outcome {
                    Ok(outcome) => self.judge(test, outcome),
                    Err(err) => {
                        debug!(target_path = %test.target, error = %err.type_name(), "run errored");
                        TestResult::error(&err)
                    }
                }
                .with_logs(logs));
            }
        };

        Ok(self.judge(test, outcome))
    }

    async fn invoke_target(&mut self, test: &TestSpec) -> Result<Outcome, AdapterError> {
        let factories_dir = self.config.factories_dir();
        let resolved = {
            let mut host = ResolveHost {
                registry: &self.registry,
                instances: &mut self.instances,
                mocks: &self.mocks,
                factories_dir: &factories_dir,
            };
            resolver::resolve(&test.target, &mut host)?
        };
        let args = coercion::build_args(&resolved.label, &resolved.method.params, &test.given, &test.types)?;
        trace!(target_path = %test.target, args = ?args, "invoking");

        let timeout_ms = test.timeout_ms.or(self.config.timeout_ms);
        let ctx = CallContext::new(resolved.receiver, Arc::clone(&self.registry));
        Ok(invoke::invoke(&resolved.method, ctx, args, timeout_ms).await)
    }

    fn judge(&self, test: &TestSpec, outcome: Outcome) -> TestResult {
        let verdict = match outcome {
            Outcome::TimedOut { timeout_ms } => return TestResult::error(&AdapterError::Timeout { timeout_ms }),
            Outcome::Raised(raised) => match &test.throws {
                Some(throws) => match assertions::check_throws(&raised, throws) {
                    Ok(()) => TestResult::passed(),
                    Err(message) => {
                        let mut result = TestResult::failed(message);
                        if let Some(code) = &throws.code {
                            result = result.with_expected(serde_json::json!({"code": code}));
                        }
                        return result;
                    }
                },
                None => return TestResult::error(&AdapterError::Invocation { raised }),
            },
            Outcome::Returned(returned) => {
                if let Some(throws) = &test.throws {
                    let kind = throws.kind.as_deref().unwrap_or("an error");
                    return TestResult::failed(format!("Expected exception {kind} but call succeeded"))
                        .with_actual(returned.value);
                }
                if let Some(expect) = &test.expect {
                    if let Err(message) = assertions::check_expectation(&returned, expect) {
                        return TestResult::failed(message)
                            .with_actual(returned.value)
                            .with_expected(expect.value.clone());
                    }
                }
                TestResult::passed().with_actual(returned.value)
            }
        };

        for called in test.called() {
            if let Err(message) = assertions::check_called(self.mocks.tracker(), called) {
                return TestResult::failed(message).with_actual(verdict.actual.unwrap_or(Value::Null));
            }
        }
        verdict
    }
}

fn protocol_error(message: &str) -> (TestResult, Flow) {
    (TestResult::error(&AdapterError::protocol(message)), Flow::Continue)
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

// ============================================================================
// Loop
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Idle,
    Parsing,
    Responding,
    Stopped,
}

impl LoopState {
    fn to(self, next: LoopState) -> LoopState {
        trace!(from = ?self, to = ?next, "loop state");
        next
    }
}

/// Serve commands from `reader` until `exit` or end of input.
pub async fn serve<R, W>(state: &mut AdapterState, mut reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut loop_state = LoopState::Idle;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        loop_state = loop_state.to(LoopState::Parsing);

        let response = match std::str::from_utf8(&buf) {
            Ok(line) => state.handle_line(line).await,
            Err(e) => Some((
                TestResult::error(&AdapterError::protocol(format!("Malformed command: invalid UTF-8 ({e})"))),
                Flow::Continue,
            )),
        };
        let Some((result, flow)) = response else {
            loop_state = loop_state.to(LoopState::Idle);
            continue;
        };

        loop_state = loop_state.to(LoopState::Responding);
        writer.write_all(result.to_line().as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        if flow == Flow::Stop {
            break;
        }
        loop_state = loop_state.to(LoopState::Idle);
    }
    let _ = loop_state.to(LoopState::Stopped);
    debug!("command loop stopped");
    Ok(())
}
