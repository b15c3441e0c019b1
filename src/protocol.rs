//! Wire types for the newline-delimited JSON protocol.
//!
//! Inbound: one [`Command`] per line. Outbound: one [`TestResult`] per command.
//!
//! Field names are camelCase on the wire. The snake_case spellings older orchestrators send
//! (`timeout_ms`, `with_args`, ...) are accepted as aliases.

use std::collections::BTreeMap;

use babeltest_core::lang::expectations::{self, ExpectKind};
use babeltest_core::lang::registry;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ConfigPatch;
use crate::errors::AdapterError;

// ============================================================================
// Commands
// ============================================================================

/// One inbound line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub action: String,
    #[serde(default)]
    pub test: Option<TestSpec>,
    #[serde(default)]
    pub config: Option<ConfigPatch>,
    #[serde(default)]
    pub lifecycle: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Recognised values of [`Command::action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Run,
    Lifecycle,
    Exit,
}

impl Action {
    pub fn parse(action: &str) -> Option<Action> {
        match action {
            "run" => Some(Action::Run),
            "lifecycle" => Some(Action::Lifecycle),
            "exit" => Some(Action::Exit),
            _ => None,
        }
    }
}

impl Command {
    /// Parse one protocol line.
    pub fn parse(line: &str) -> Result<Command, AdapterError> {
        serde_json::from_str(line).map_err(|e| AdapterError::protocol(format!("Malformed command: {e}")))
    }

    /// `data.name`, when the payload carries one (suite and test events).
    pub fn data_name(&self) -> Option<&str> {
        self.data.as_ref()?.get("name")?.as_str()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSpec {
    pub target: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub given: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub types: BTreeMap<String, String>,
    #[serde(default)]
    pub expect: Option<Expectation>,
    #[serde(default)]
    pub throws: Option<ThrowsExpectation>,
    #[serde(default, alias = "timeout_ms")]
    pub timeout_ms: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mocks: Vec<MockSpec>,
    #[serde(default)]
    pub mutates: Option<Mutates>,
}

impl TestSpec {
    pub fn called(&self) -> &[CalledAssertion] {
        self.mutates.as_ref().map_or(&[], |m| m.called.as_slice())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Expectation {
    #[serde(rename = "type", default, deserialize_with = "expect_kind")]
    pub kind: ExpectKind,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThrowsExpectation {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Advisory only; echoed in failure messages.
    #[serde(default)]
    pub code: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MockSpec {
    pub target: String,
    #[serde(default)]
    pub given: Option<Value>,
    #[serde(default)]
    pub returns: Option<Value>,
    #[serde(default)]
    pub throws: Option<ThrowsExpectation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Mutates {
    #[serde(default, deserialize_with = "null_as_default")]
    pub called: Vec<CalledAssertion>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalledAssertion {
    pub target: String,
    #[serde(default, alias = "with_args")]
    pub with_args: Option<Value>,
    #[serde(default)]
    pub times: Option<usize>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn expect_kind<'de, D>(deserializer: D) -> Result<ExpectKind, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(name) = Option::<String>::deserialize(deserializer)? else {
        return Ok(ExpectKind::default());
    };
    expectations::from_str(&name).ok_or_else(|| {
        de::Error::custom(format!(
            "unknown expectation type '{name}' (expected {})",
            registry::spellings(expectations::EXPECT_KINDS)
        ))
    })
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
    Error,
    Ok,
}

/// The `error` object of a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// One outbound line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    #[serde(default, alias = "duration_ms")]
    pub duration_ms: f64,
    /// Captured target output, only when `captureOutput` is on and the target wrote something.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<String>,
}

impl TestResult {
    fn with_status(status: Status) -> Self {
        Self {
            status,
            message: None,
            actual: None,
            expected: None,
            error: None,
            duration_ms: 0.0,
            logs: Vec::new(),
        }
    }

    pub fn passed() -> Self {
        Self::with_status(Status::Passed)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::with_status(Status::Failed)
        }
    }

    pub fn error(err: &AdapterError) -> Self {
        Self {
            message: Some(err.to_string()),
            error: Some(err.to_error_info()),
            ..Self::with_status(Status::Error)
        }
    }

    pub fn ok() -> Self {
        Self::with_status(Status::Ok)
    }

    pub fn with_actual(mut self, actual: Value) -> Self {
        self.actual = Some(actual);
        self
    }

    pub fn with_expected(mut self, expected: Value) -> Self {
        self.expected = Some(expected);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_logs(mut self, logs: Vec<String>) -> Self {
        self.logs = logs;
        self
    }

    /// Serialize as one protocol line (no trailing newline).
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"status":"error","error":{{"type":"ProtocolError","message":"unserializable result: {e}"}},"durationMs":0.0}}"#)
        })
    }
}
