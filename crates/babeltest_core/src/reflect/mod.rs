//! Explicit reflection model.
//!
//! A codebase under test describes itself as a [`Registry`] of [`TypeInfo`] entries. Each entry
//! is either a module (free functions only) or a class (constructors, methods, properties,
//! builders), optionally acting as a capability that mock proxies can stand in for.
//!
//! ## Notes
//! - Type paths are dotted (`example.payment.OrderService`); nested types are simply entries whose
//!   path extends their owner's path.
//! - Member lookups accept naming variants (`get_by_id` ↔ `getById`).
//! - `Registry` clones are cheap; every entry is behind an `Arc` and is copied on write by
//!   [`Registry::patch_method`].
//!
//! ## Examples
//! ```rust
//! use babeltest_core::reflect::{Method, Param, ParamType, Registry, Returned, TypeInfo};
//!
//! let mut registry = Registry::new();
//! registry.insert(
//!     TypeInfo::module("example.math").method(
//!         Method::sync("add", |_, args| Ok(Returned::new(args.int("a")? + args.int("b")?)))
//!             .param(Param::new("a", ParamType::Int))
//!             .param(Param::new("b", ParamType::Int))
//!             .returns(ParamType::Int)
//!             .static_member(),
//!     ),
//! );
//! assert!(registry.find_type("example.math").is_some());
//! assert_eq!(registry.targets(), vec!["example.math.add".to_string()]);
//! ```

mod args;
mod context;
mod member;
mod outcome;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub use args::{Arg, CallArgs};
pub use context::{CallContext, Instance, Interceptor, ProxyFactory, Receiver};
pub use member::{AsyncBody, Body, BoxFuture, BuildFn, Builder, Constructor, GetFn, Method, Param, ParamType, Property, SyncBody};
pub use outcome::{Raised, Returned, json_kind_name};

use crate::lang::conventions::TEST_FACTORY_NAME;
use crate::naming;

/// What a registry entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// A namespace of free functions; never instantiated.
    Module,
    /// An instantiable type.
    Class,
    /// A trait-like collaborator; instances come from a default constructor or a mock proxy.
    Capability,
}

/// Everything the adapter knows about one type.
#[derive(Clone)]
pub struct TypeInfo {
    pub path: String,
    pub kind: TypeKind,
    pub constructors: Vec<Constructor>,
    pub methods: Vec<Method>,
    pub properties: Vec<Property>,
    pub builders: Vec<(String, Builder)>,
    pub proxy: Option<ProxyFactory>,
}

impl TypeInfo {
    fn with_kind(path: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            constructors: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            builders: Vec::new(),
            proxy: None,
        }
    }

    pub fn module(path: impl Into<String>) -> Self {
        Self::with_kind(path, TypeKind::Module)
    }

    pub fn class(path: impl Into<String>) -> Self {
        Self::with_kind(path, TypeKind::Class)
    }

    pub fn capability(path: impl Into<String>) -> Self {
        Self::with_kind(path, TypeKind::Capability)
    }

    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn builder(mut self, name: impl Into<String>, builder: Builder) -> Self {
        self.builders.push((name.into(), builder));
        self
    }

    /// Register the `test_factory` builder.
    pub fn test_factory(self, builder: Builder) -> Self {
        self.builder(TEST_FACTORY_NAME, builder)
    }

    pub fn proxy<F>(mut self, factory: F) -> Self
    where
        F: Fn(Arc<dyn Interceptor>) -> Instance + Send + Sync + 'static,
    {
        self.proxy = Some(Arc::new(factory));
        self
    }

    /// Short name (last path segment).
    pub fn name(&self) -> &str {
        naming::short_name(&self.path)
    }

    /// Module part of the path (everything before the short name).
    pub fn module_path(&self) -> &str {
        self.path.rsplit_once('.').map_or("", |(module, _)| module)
    }

    pub fn find_method(&self, name: &str) -> Option<usize> {
        self.methods
            .iter()
            .position(|m| m.name == name)
            .or_else(|| self.methods.iter().position(|m| naming::names_match(name, &m.name)))
    }

    pub fn method_named(&self, name: &str) -> Option<&Method> {
        self.find_method(name).map(|idx| &self.methods[idx])
    }

    pub fn property_named(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .or_else(|| self.properties.iter().find(|p| naming::names_match(name, &p.name)))
    }

    pub fn builder_named(&self, name: &str) -> Option<&Builder> {
        self.builders
            .iter()
            .find(|(n, _)| n == name)
            .or_else(|| self.builders.iter().find(|(n, _)| naming::names_match(name, n)))
            .map(|(_, b)| b)
    }

    pub fn test_factory_builder(&self) -> Option<&Builder> {
        self.builder_named(TEST_FACTORY_NAME)
    }

    /// Capability names any constructor parameter requires.
    pub fn required_capabilities(&self) -> impl Iterator<Item = &str> {
        self.constructors
            .iter()
            .flat_map(|c| c.params.iter())
            .filter_map(|p| p.ty.capability_name())
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let methods: Vec<&str> = self.methods.iter().map(|m| m.name.as_str()).collect();
        f.debug_struct("TypeInfo")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("constructors", &self.constructors.len())
            .field("methods", &methods)
            .field("proxy", &self.proxy.is_some())
            .finish()
    }
}

/// The reflection registry: type path → type description.
#[derive(Clone, Default)]
pub struct Registry {
    types: BTreeMap<String, Arc<TypeInfo>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a type.
    pub fn insert(&mut self, info: TypeInfo) {
        self.types.insert(info.path.clone(), Arc::new(info));
    }

    pub fn find_type(&self, path: &str) -> Option<&Arc<TypeInfo>> {
        self.types.get(path)
    }

    /// Find a type by short name (or dotted suffix), anywhere in the registry.
    ///
    /// Returns `None` when the name is ambiguous.
    pub fn find_by_name(&self, name: &str) -> Option<&Arc<TypeInfo>> {
        if let Some(info) = self.types.get(name) {
            return Some(info);
        }
        let suffix = format!(".{name}");
        let mut matches = self.types.iter().filter(|(path, _)| path.ends_with(&suffix)).map(|(_, info)| info);
        let first = matches.next()?;
        match matches.next() {
            Some(_) => None,
            None => Some(first),
        }
    }

    pub fn types(&self) -> impl Iterator<Item = &Arc<TypeInfo>> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Replace a member's body, returning the original member for later restoration.
    pub fn patch_method(&mut self, type_path: &str, member: &str, body: Body) -> Option<Method> {
        let slot = self.types.get_mut(type_path)?;
        let idx = slot.find_method(member)?;
        let info = Arc::make_mut(slot);
        let original = info.methods[idx].clone();
        info.methods[idx] = original.with_body(body);
        Some(original)
    }

    /// Put back a member previously returned by [`Registry::patch_method`].
    pub fn restore_method(&mut self, type_path: &str, original: Method) -> bool {
        let Some(slot) = self.types.get_mut(type_path) else {
            return false;
        };
        let Some(idx) = slot.methods.iter().position(|m| m.name == original.name) else {
            return false;
        };
        Arc::make_mut(slot).methods[idx] = original;
        true
    }

    /// Every invocable dotted path, sorted.
    ///
    /// Methods reachable through a property are listed through that property
    /// (`example.container.AppContainer.users.get_by_id`).
    pub fn targets(&self) -> Vec<String> {
        let mut out = Vec::new();
        for info in self.types.values() {
            for method in &info.methods {
                out.push(format!("{}.{}", info.path, method.name));
            }
            for property in &info.properties {
                if let Some(target) = self.types.get(&property.type_path) {
                    for method in &target.methods {
                        out.push(format!("{}.{}.{}", info.path, property.name, method.name));
                    }
                }
            }
        }
        out.sort();
        out
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.types.keys()).finish()
    }
}
