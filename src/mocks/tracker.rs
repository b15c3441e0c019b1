//! Call recording shared between the adapter, table patches and proxies.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use babeltest_core::naming;
use serde_json::Value;

/// Recorded calls keyed by `Type.member` (capability marker stripped, member as declared).
///
/// Clones share the same storage. A blocking worker abandoned after a timeout keeps its clone and
/// may record into it later, so each run gets a new tracker instead of a cleared one.
#[derive(Debug, Clone, Default)]
pub struct CallTracker {
    calls: Arc<Mutex<BTreeMap<String, Vec<Value>>>>,
}

impl CallTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key for a call on `type_name.member`.
    ///
    /// `IPaymentGateway.charge`, `example.payment.PaymentGateway.charge` and
    /// `PaymentGateway.charge` all share the key `PaymentGateway.charge`.
    pub fn key(type_name: &str, member: &str) -> String {
        format!("{}.{member}", short_type(type_name))
    }

    /// Key for a dotted `[module.]Type.member` target; `None` without a dot.
    pub fn key_for_target(target: &str) -> Option<String> {
        let (type_part, member) = split_target(target)?;
        Some(Self::key(type_part, member))
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Vec<Value>>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, key: &str, args: Value) {
        self.lock().entry(key.to_string()).or_default().push(args);
    }

    /// Calls recorded for a `[module.]Type.member` target under any spelling of the member.
    ///
    /// `None` when `target` does not name a member.
    pub fn calls_for_target(&self, target: &str) -> Option<Vec<Value>> {
        let (type_part, member) = split_target(target)?;
        let short = short_type(type_part);
        let calls = self
            .lock()
            .iter()
            .filter(|(key, _)| {
                key.split_once('.')
                    .is_some_and(|(owner, recorded)| owner == short && naming::names_match(member, recorded))
            })
            .flat_map(|(_, calls)| calls.iter().cloned())
            .collect();
        Some(calls)
    }

    pub fn total(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }
}

fn short_type(type_name: &str) -> &str {
    naming::strip_capability_marker(naming::short_name(type_name))
}

fn split_target(target: &str) -> Option<(&str, &str)> {
    let (type_part, member) = target.rsplit_once('.')?;
    if type_part.is_empty() || member.is_empty() {
        return None;
    }
    Some((type_part, member))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_strip_marker_and_module_path() {
        assert_eq!(CallTracker::key("IPaymentGateway", "charge"), "PaymentGateway.charge");
        assert_eq!(CallTracker::key("example.payment.PaymentGateway", "charge"), "PaymentGateway.charge");
        assert_eq!(
            CallTracker::key_for_target("EmailService.sendEmail"),
            Some("EmailService.sendEmail".to_string())
        );
        assert_eq!(CallTracker::key_for_target("nodot"), None);
        // An `I` not followed by an uppercase letter is part of the name.
        assert_eq!(CallTracker::key("Inventory", "count"), "Inventory.count");
    }

    #[test]
    fn test_target_lookup_bridges_member_spellings() {
        let tracker = CallTracker::new();
        tracker.record("Svc.get_x_y", json!({"n": 1}));
        tracker.record("Svc.send_email", json!({"n": 2}));
        tracker.record("Other.get_x_y", json!({"n": 3}));

        assert_eq!(tracker.calls_for_target("Svc.getXY"), Some(vec![json!({"n": 1})]));
        assert_eq!(tracker.calls_for_target("app.ISvc.sendEmail"), Some(vec![json!({"n": 2})]));
        assert_eq!(tracker.calls_for_target("Svc.get_x_y"), Some(vec![json!({"n": 1})]));
        assert_eq!(tracker.calls_for_target("Svc.missing"), Some(vec![]));
        assert_eq!(tracker.calls_for_target("Svc."), None);
    }

    #[test]
    fn test_clones_share_storage() {
        let tracker = CallTracker::new();
        let worker = tracker.clone();
        worker.record("A.b", json!({"x": 1}));
        worker.record("A.b", json!({"x": 2}));
        assert_eq!(tracker.calls_for_target("A.b"), Some(vec![json!({"x": 1}), json!({"x": 2})]));
        assert_eq!(tracker.total(), 2);
    }
}
