//! Target resolution: dotted path → (receiver, member).
//!
//! For `a.b.C.d.e` the resolver tries the longest type prefix first (`a.b.C.d`, then `a.b.C`,
//! ...). Each remaining member path is walked segment by segment: a nested type, a capitalized
//! type name found anywhere in the registry, or a property of the current receiver. The last
//! segment is the member to invoke.

use std::sync::Arc;

use babeltest_core::lang::conventions::PATH_SEPARATOR;
use babeltest_core::{Method, Receiver, TypeInfo, TypeKind, naming};
use tracing::debug;

use crate::diagnostics::DiagnosticContext;
use crate::errors::AdapterError;

/// What the resolver needs from its host: type lookup plus receiver construction.
pub trait Introspect {
    fn find_type(&self, path: &str) -> Option<Arc<TypeInfo>>;
    /// Unique type with this short name anywhere in the registry.
    fn find_by_name(&self, name: &str) -> Option<Arc<TypeInfo>>;
    fn construct(&mut self, info: &TypeInfo) -> Result<Receiver, AdapterError>;
}

/// A resolved target.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Type owning the member.
    pub type_info: Arc<TypeInfo>,
    /// `None` for module functions and static members.
    pub receiver: Option<Receiver>,
    pub method: Method,
    /// `Type.member` label for diagnostics.
    pub label: String,
}

enum Walk {
    Found(Resolved),
    NotFound,
    Construction(AdapterError),
}

pub fn resolve(target: &str, host: &mut impl Introspect) -> Result<Resolved, AdapterError> {
    let segments: Vec<&str> = target.split(PATH_SEPARATOR).collect();
    let mut ctx = DiagnosticContext::new(target);

    if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
        ctx.add_suggestion("Use format: 'module.function' or 'module.Type.method'");
        return Err(AdapterError::resolution(&format!("Invalid target format: {target}"), &ctx));
    }

    let mut construction_failure = None;
    for split in (1..segments.len()).rev() {
        let type_path = segments[..split].join(".");
        let Some(info) = host.find_type(&type_path) else {
            ctx.add_search(format!("type {type_path}"), false, Some("not registered"));
            continue;
        };
        ctx.add_search(format!("type {type_path}"), true, None);
        debug!(target_path = target, type_path = %type_path, "walking member path");

        match walk(host, info, &segments[split..], &mut ctx) {
            Walk::Found(resolved) => {
                debug!(target_path = target, member = %resolved.label, "resolved");
                return Ok(resolved);
            }
            Walk::Construction(err) => {
                construction_failure.get_or_insert(err);
            }
            Walk::NotFound => {}
        }
    }

    if let Some(err) = construction_failure {
        return Err(err);
    }

    let module = segments[..segments.len() - 1].join(".");
    ctx.add_suggestion(format!("Ensure '{module}' (or its owning type) is registered with the adapter"));
    ctx.add_suggestion(format!(
        "Check the member name '{}' (snake_case and camelCase spellings both match)",
        segments[segments.len() - 1]
    ));
    Err(AdapterError::resolution(&format!("Could not resolve target: {target}"), &ctx))
}

fn walk(host: &mut impl Introspect, start: Arc<TypeInfo>, rest: &[&str], ctx: &mut DiagnosticContext) -> Walk {
    let Some((member, intermediate)) = rest.split_last() else {
        return Walk::NotFound;
    };
    let mut current = start;
    let mut receiver: Option<Receiver> = None;

    for seg in intermediate {
        let nested_path = format!("{}.{seg}", current.path);
        if let Some(nested) = host.find_type(&nested_path) {
            current = nested;
            receiver = None;
            continue;
        }

        if naming::is_capitalized(seg) {
            if let Some(found) = host.find_by_name(seg) {
                match host.construct(&found) {
                    Ok(instance) => {
                        receiver = Some(instance);
                        current = found;
                        continue;
                    }
                    Err(err) => {
                        ctx.add_search(format!("{} (by name)", found.path), true, Some("construction failed"));
                        return Walk::Construction(err);
                    }
                }
            }
        }

        let Some(property) = current.property_named(seg).cloned() else {
            ctx.add_search(format!("{}.{seg}", current.path), false, Some("no nested type, named type or property"));
            return Walk::NotFound;
        };
        let owner = match receiver.take() {
            Some(owner) => owner,
            None => match host.construct(&current) {
                Ok(owner) => owner,
                Err(err) => return Walk::Construction(err),
            },
        };
        let next = match (property.get)(&owner) {
            Ok(next) => next,
            Err(raised) => {
                return Walk::Construction(AdapterError::construction_raised(format!(
                    "Property {}.{} failed: {raised}",
                    current.name(),
                    property.name
                )));
            }
        };
        let Some(next_type) = host.find_type(&property.type_path) else {
            ctx.add_search(
                format!("{}.{}", current.path, property.name),
                true,
                Some(&format!("yields unregistered type {}", property.type_path)),
            );
            return Walk::NotFound;
        };
        current = next_type;
        receiver = Some(next);
    }

    let Some(method) = current.method_named(member).cloned() else {
        let available: Vec<&str> = current.methods.iter().map(|m| m.name.as_str()).collect();
        let reason = if available.is_empty() {
            format!("no member '{member}'")
        } else {
            format!("no member '{member}'; available: {}", available.join(", "))
        };
        ctx.add_search(format!("{}.{member}", current.path), false, Some(&reason));
        return Walk::NotFound;
    };

    let needs_receiver = !method.is_static && current.kind != TypeKind::Module;
    if needs_receiver && receiver.is_none() {
        match host.construct(&current) {
            Ok(instance) => receiver = Some(instance),
            Err(err) => return Walk::Construction(err),
        }
    }
    if !needs_receiver {
        receiver = None;
    }

    Walk::Found(Resolved {
        label: format!("{}.{}", current.name(), method.name),
        type_info: current,
        receiver,
        method,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use babeltest_core::{Constructor, Property, Raised, Registry, Returned};

    /// Host over a plain registry; records which types were constructed.
    struct TestHost {
        registry: Registry,
        constructed: Vec<String>,
    }

    impl Introspect for TestHost {
        fn find_type(&self, path: &str) -> Option<Arc<TypeInfo>> {
            self.registry.find_type(path).cloned()
        }

        fn find_by_name(&self, name: &str) -> Option<Arc<TypeInfo>> {
            self.registry.find_by_name(name).cloned()
        }

        fn construct(&mut self, info: &TypeInfo) -> Result<Receiver, AdapterError> {
            self.constructed.push(info.path.clone());
            match info.constructors.first() {
                Some(ctor) => (ctor.build)(&babeltest_core::CallArgs::new())
                    .map_err(|raised| AdapterError::construction_raised(format!("Cannot construct {}: {raised}", info.name()))),
                None => Err(AdapterError::construction_raised(format!("Cannot construct {}", info.name()))),
            }
        }
    }

    struct Unit;

    fn host() -> TestHost {
        let mut registry = Registry::new();
        registry.insert(
            TypeInfo::module("app.math")
                .method(Method::sync("add", |_, _| Ok(Returned::new(1))).static_member()),
        );
        registry.insert(
            TypeInfo::class("app.svc.Users")
                .constructor(Constructor::new(|_| Ok(Receiver::new("app.svc.Users", Unit))))
                .method(Method::sync("get_by_id", |_, _| Ok(Returned::null()))),
        );
        registry.insert(TypeInfo::class("app.svc.Users.Query").method(
            Method::sync("all", |_, _| Ok(Returned::null())).static_member(),
        ));
        registry.insert(
            TypeInfo::class("app.svc.Container")
                .constructor(Constructor::new(|_| Ok(Receiver::new("app.svc.Container", Unit))))
                .property(Property::new("users", "app.svc.Users", |_| Ok(Receiver::new("app.svc.Users", Unit)))),
        );
        registry.insert(
            TypeInfo::class("app.svc.Broken")
                .constructor(Constructor::new(|_| Err(Raised::new("ValueError", "no db"))))
                .method(Method::sync("run", |_, _| Ok(Returned::null()))),
        );
        TestHost {
            registry,
            constructed: Vec::new(),
        }
    }

    #[test]
    fn test_module_function_has_no_receiver() {
        let mut host = host();
        let resolved = resolve("app.math.add", &mut host).unwrap();
        assert!(resolved.receiver.is_none());
        assert_eq!(resolved.label, "math.add");
        assert!(host.constructed.is_empty());
    }

    #[test]
    fn test_instance_member_constructs_receiver_and_matches_variants() {
        let mut host = host();
        let resolved = resolve("app.svc.Users.getById", &mut host).unwrap();
        assert_eq!(resolved.method.name, "get_by_id");
        assert!(resolved.receiver.is_some());
        assert_eq!(host.constructed, vec!["app.svc.Users"]);
    }

    #[test]
    fn test_nested_type_prefers_longest_type_path() {
        let mut host = host();
        let resolved = resolve("app.svc.Users.Query.all", &mut host).unwrap();
        assert_eq!(resolved.type_info.path, "app.svc.Users.Query");
        assert!(host.constructed.is_empty());
    }

    #[test]
    fn test_property_navigation() {
        let mut host = host();
        let resolved = resolve("app.svc.Container.users.get_by_id", &mut host).unwrap();
        assert_eq!(resolved.type_info.path, "app.svc.Users");
        assert_eq!(resolved.receiver.unwrap().type_path, "app.svc.Users");
        assert_eq!(host.constructed, vec!["app.svc.Container"]);
    }

    #[test]
    fn test_capitalized_segment_found_by_name() {
        let mut host = host();
        let resolved = resolve("app.svc.Container.Users.get_by_id", &mut host).unwrap();
        assert_eq!(resolved.type_info.path, "app.svc.Users");
        assert_eq!(host.constructed, vec!["app.svc.Users"]);
    }

    #[test]
    fn test_invalid_format() {
        let err = resolve("justone", &mut host()).unwrap_err();
        assert_eq!(err.type_name(), "ResolutionError");
        assert!(err.to_string().starts_with("Invalid target format: justone"));
        assert!(resolve("a..b", &mut host()).is_err());
    }

    #[test]
    fn test_unknown_target_lists_searches() {
        let err = resolve("app.svc.Users.missing", &mut host()).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Could not resolve target: app.svc.Users.missing"));
        assert!(message.contains("✓ type app.svc.Users"));
        assert!(message.contains("✗ app.svc.Users.missing (no member 'missing'; available: get_by_id)"));
    }

    #[test]
    fn test_construction_failure_is_surfaced() {
        let err = resolve("app.svc.Broken.run", &mut host()).unwrap_err();
        assert_eq!(err.type_name(), "ConstructionError");
        assert!(err.to_string().contains("no db"));
    }
}
