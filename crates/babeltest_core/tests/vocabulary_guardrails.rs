use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use babeltest_core::lang::registry::LangItemInfo;
use babeltest_core::lang::{errors, expectations, hints, lifecycle};

/// Every canonical spelling and alias in a table is unique and resolves back to its entry.
fn assert_spellings_unique<Id>(label: &str, table: &'static [LangItemInfo<Id>], from_str: impl Fn(&str) -> Option<Id>)
where
    Id: Copy + PartialEq + Eq + Hash + Debug,
{
    let mut seen: HashMap<&'static str, Id> = HashMap::new();
    let mut ids: HashMap<Id, &'static str> = HashMap::new();

    for info in table {
        assert_eq!(
            from_str(info.canonical),
            Some(info.id),
            "{label} canonical spelling not resolvable: {}",
            info.canonical
        );
        if let Some(prev) = ids.insert(info.id, info.canonical) {
            panic!("{label} id {:?} registered twice ({prev} and {})", info.id, info.canonical);
        }
        if let Some(prev) = seen.insert(info.canonical, info.id) {
            panic!("duplicate {label} spelling {:?}: {:?} and {:?}", info.canonical, prev, info.id);
        }
        for &alias in info.aliases {
            assert_eq!(from_str(alias), Some(info.id), "{label} alias not resolvable: {alias}");
            if let Some(prev) = seen.insert(alias, info.id) {
                panic!("duplicate {label} alias spelling {alias:?}: {prev:?} and {:?}", info.id);
            }
        }
        assert!(!info.description.is_empty(), "{label} {:?} has no description", info.id);
    }
}

#[test]
fn error_kinds_spellings_unique_and_resolvable() {
    assert_spellings_unique("error kind", errors::ERROR_KINDS, errors::from_str);
    for info in errors::ERROR_KINDS {
        assert_eq!(errors::as_str(info.id), info.canonical);
        assert!(info.canonical.ends_with("Error"), "error kinds end with `Error`: {}", info.canonical);
    }
}

#[test]
fn expectation_kinds_spellings_unique_and_resolvable() {
    assert_spellings_unique("expectation", expectations::EXPECT_KINDS, expectations::from_str);
    assert_eq!(expectations::from_str("NOT_NULL"), Some(expectations::ExpectKind::NotNull));
    assert_eq!(expectations::ExpectKind::default(), expectations::ExpectKind::Exact);
}

#[test]
fn lifecycle_spellings_unique_and_resolvable() {
    assert_spellings_unique("lifecycle mode", lifecycle::LIFECYCLE_MODES, lifecycle::mode_from_str);
    assert_spellings_unique("lifecycle event", lifecycle::LIFECYCLE_EVENTS, lifecycle::event_from_str);
    assert_eq!(lifecycle::mode_as_str(lifecycle::LifecycleMode::PerTest), "per_test");
    assert_eq!(lifecycle::event_as_str(lifecycle::LifecycleEvent::ClearCache), "clear_cache");
}

#[test]
fn type_hint_spellings_unique_and_resolvable() {
    assert_spellings_unique("type hint", hints::TYPE_HINTS, hints::from_str);
    for alias in ["str", "integer", "boolean", "guid"] {
        assert!(hints::from_str(alias).is_some(), "expected alias {alias} to resolve");
    }
    assert_eq!(hints::from_str("varchar"), None);
}
