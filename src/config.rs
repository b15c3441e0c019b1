//! Process-wide adapter configuration.
//!
//! The configuration starts from CLI flags and is merged with every `config` object a command
//! carries. Merging is field-wise: absent fields keep their current value.

use std::path::{Path, PathBuf};

use babeltest_core::lang::conventions::DEFAULT_FACTORIES_PATH;
use babeltest_core::lang::lifecycle::{self, LIFECYCLE_MODES, LifecycleMode};
use babeltest_core::lang::registry;
use serde::Deserialize;

use crate::errors::AdapterError;

#[derive(Debug, Clone, PartialEq)]
pub struct AdapterConfig {
    /// Base for relative paths.
    pub project_root: PathBuf,
    /// Entry point reported by the orchestrator. The codebase is linked in, so this is only logged.
    pub project_path: Option<String>,
    pub factories_path: PathBuf,
    pub debug: bool,
    /// Default per-test timeout.
    pub timeout_ms: Option<u64>,
    pub lifecycle: LifecycleMode,
    /// Buffer target stdout/stderr into each result's `logs` instead of diverting it to stderr.
    pub capture_output: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            project_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            project_path: None,
            factories_path: PathBuf::from(DEFAULT_FACTORIES_PATH),
            debug: false,
            timeout_ms: None,
            lifecycle: LifecycleMode::default(),
            capture_output: false,
        }
    }
}

/// What a merge changed that other components must react to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigChanges {
    pub lifecycle_changed: bool,
    pub debug: Option<bool>,
}

impl AdapterConfig {
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    pub fn with_factories_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.factories_path = path.into();
        self
    }

    pub fn with_lifecycle(mut self, mode: LifecycleMode) -> Self {
        self.lifecycle = mode;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    /// Absolute factories directory.
    pub fn factories_dir(&self) -> PathBuf {
        resolve_against(&self.project_root, &self.factories_path)
    }

    /// Merge a command's `config` object into this configuration.
    ///
    /// Nothing is applied when the patch names an unknown lifecycle mode.
    pub fn apply(&mut self, patch: &ConfigPatch) -> Result<ConfigChanges, AdapterError> {
        let lifecycle = match patch.instance_lifecycle.as_deref() {
            Some(name) => Some(parse_lifecycle(name)?),
            None => None,
        };

        let mut changes = ConfigChanges::default();
        if let Some(root) = &patch.project_root {
            self.project_root = resolve_against(&self.project_root, root);
        }
        if let Some(path) = &patch.project_path {
            self.project_path = Some(path.clone());
        }
        if let Some(path) = &patch.factories_path {
            self.factories_path = path.clone();
        }
        if let Some(timeout_ms) = patch.timeout_ms {
            self.timeout_ms = Some(timeout_ms);
        }
        if let Some(debug) = patch.debug {
            if debug != self.debug {
                changes.debug = Some(debug);
            }
            self.debug = debug;
        }
        if let Some(capture) = patch.capture_output {
            self.capture_output = capture;
        }
        if let Some(mode) = lifecycle {
            changes.lifecycle_changed = mode != self.lifecycle;
            self.lifecycle = mode;
        }
        Ok(changes)
    }
}

pub fn parse_lifecycle(name: &str) -> Result<LifecycleMode, AdapterError> {
    lifecycle::mode_from_str(name).ok_or_else(|| {
        AdapterError::protocol(format!(
            "Unknown instance lifecycle '{name}' (expected {})",
            registry::spellings(LIFECYCLE_MODES)
        ))
    })
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() { path.to_path_buf() } else { base.join(path) }
}

/// The `config` object of a command. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    #[serde(default, alias = "project_root")]
    pub project_root: Option<PathBuf>,
    #[serde(default, alias = "project_path", alias = "entry")]
    pub project_path: Option<String>,
    #[serde(default, alias = "factories_path", alias = "factories")]
    pub factories_path: Option<PathBuf>,
    #[serde(default)]
    pub debug: Option<bool>,
    #[serde(default, alias = "timeout_ms")]
    pub timeout_ms: Option<u64>,
    #[serde(default, alias = "instance_lifecycle", alias = "lifecycle")]
    pub instance_lifecycle: Option<String>,
    #[serde(default, alias = "capture_output")]
    pub capture_output: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> AdapterConfig {
        AdapterConfig::default().with_project_root("/work/project")
    }

    #[test]
    fn test_factories_dir_is_relative_to_root() {
        assert_eq!(base().factories_dir(), PathBuf::from("/work/project/babel/factories"));
        let config = base().with_factories_path("/abs/factories");
        assert_eq!(config.factories_dir(), PathBuf::from("/abs/factories"));
    }

    #[test]
    fn test_merge_keeps_absent_fields() {
        let mut config = base().with_timeout_ms(Some(100));
        let patch: ConfigPatch = serde_json::from_value(json!({"factories_path": "fx"})).unwrap();
        let changes = config.apply(&patch).unwrap();
        assert_eq!(changes, ConfigChanges::default());
        assert_eq!(config.timeout_ms, Some(100));
        assert_eq!(config.factories_dir(), PathBuf::from("/work/project/fx"));
    }

    #[test]
    fn test_lifecycle_change_is_reported() {
        let mut config = base();
        let patch: ConfigPatch = serde_json::from_value(json!({"instanceLifecycle": "per_test"})).unwrap();
        assert!(config.apply(&patch).unwrap().lifecycle_changed);
        assert_eq!(config.lifecycle, LifecycleMode::PerTest);
        assert!(!config.apply(&patch).unwrap().lifecycle_changed);
    }

    #[test]
    fn test_unknown_lifecycle_rejects_whole_patch() {
        let mut config = base();
        let patch: ConfigPatch =
            serde_json::from_value(json!({"lifecycle": "forever", "timeoutMs": 5})).unwrap();
        let err = config.apply(&patch).unwrap_err();
        assert_eq!(err.type_name(), "ProtocolError");
        assert_eq!(config.timeout_ms, None);
    }

    #[test]
    fn test_debug_toggle_reported_once() {
        let mut config = base();
        let on: ConfigPatch = serde_json::from_value(json!({"debug": true})).unwrap();
        assert_eq!(config.apply(&on).unwrap().debug, Some(true));
        assert_eq!(config.apply(&on).unwrap().debug, None);
    }

    #[test]
    fn test_capture_output_accepts_both_spellings() {
        let mut config = base();
        let on: ConfigPatch = serde_json::from_value(json!({"captureOutput": true})).unwrap();
        config.apply(&on).unwrap();
        assert!(config.capture_output);
        let off: ConfigPatch = serde_json::from_value(json!({"capture_output": false})).unwrap();
        config.apply(&off).unwrap();
        assert!(!config.capture_output);
    }

    #[test]
    fn test_entry_alias_sets_project_path() {
        let mut config = base();
        let patch: ConfigPatch = serde_json::from_value(json!({"entry": "src/main.rs"})).unwrap();
        config.apply(&patch).unwrap();
        assert_eq!(config.project_path.as_deref(), Some("src/main.rs"));
    }
}
