//! The interceptor behind capability proxies.

use babeltest_core::{Interceptor, ParamType, Raised, Returned, naming};
use serde_json::Value;

use super::tracker::CallTracker;

/// What a mocked member does when called.
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    Return(Value),
    Raise(Raised),
}

impl MockBehavior {
    pub fn value(&self) -> Result<Value, Raised> {
        match self {
            MockBehavior::Return(value) => Ok(value.clone()),
            MockBehavior::Raise(raised) => Err(raised.clone()),
        }
    }

    pub fn returned(&self) -> Result<Returned, Raised> {
        self.value().map(Returned::new)
    }
}

/// Stands in for one capability. Members without a mock return their type's default.
#[derive(Debug)]
pub struct MockProxy {
    type_name: String,
    /// Member name → behavior, first entry per member.
    behaviors: Vec<(String, MockBehavior)>,
    tracker: CallTracker,
}

impl MockProxy {
    pub fn new(type_name: impl Into<String>, tracker: CallTracker) -> Self {
        Self {
            type_name: type_name.into(),
            behaviors: Vec::new(),
            tracker,
        }
    }

    pub fn with_behavior(mut self, member: &str, behavior: MockBehavior) -> Self {
        if self.behavior_for(member).is_none() {
            self.behaviors.push((member.to_string(), behavior));
        }
        self
    }

    fn behavior_for(&self, member: &str) -> Option<&MockBehavior> {
        self.behaviors
            .iter()
            .find(|(name, _)| naming::names_match(member, name))
            .map(|(_, behavior)| behavior)
    }
}

impl Interceptor for MockProxy {
    fn intercept(&self, member: &str, args: Value, fallback: &ParamType) -> Result<Value, Raised> {
        self.tracker.record(&CallTracker::key(&self.type_name, member), args);
        match self.behavior_for(member) {
            Some(behavior) => behavior.value(),
            None => Ok(fallback.default_value()),
        }
    }
}
