//! The resolver's view of adapter state.

use std::path::Path;
use std::sync::Arc;

use babeltest_core::{Receiver, Registry, TypeInfo};

use crate::errors::AdapterError;
use crate::instances::{ConstructionEnv, InstanceManager};
use crate::mocks::MockEngine;
use crate::resolver::Introspect;

/// Borrows the pieces of `AdapterState` that resolution touches.
pub struct ResolveHost<'a> {
    pub registry: &'a Registry,
    pub instances: &'a mut InstanceManager,
    pub mocks: &'a MockEngine,
    pub factories_dir: &'a Path,
}

impl Introspect for ResolveHost<'_> {
    fn find_type(&self, path: &str) -> Option<Arc<TypeInfo>> {
        self.registry.find_type(path).cloned()
    }

    fn find_by_name(&self, name: &str) -> Option<Arc<TypeInfo>> {
        self.registry.find_by_name(name).cloned()
    }

    fn construct(&mut self, info: &TypeInfo) -> Result<Receiver, AdapterError> {
        let env = ConstructionEnv {
            registry: self.registry,
            mocks: self.mocks,
            factories_dir: self.factories_dir,
        };
        self.instances.get_instance(info, &env)
    }
}
