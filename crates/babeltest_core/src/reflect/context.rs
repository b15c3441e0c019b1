//! Receivers, the per-call context and the interception seam used by mock proxies.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;

use super::Registry;
use super::args::CallArgs;
use super::member::{Body, BoxFuture, ParamType};
use super::outcome::{Raised, Returned};
use crate::naming;

/// A type-erased live value.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// A live instance together with the registry path of its type.
#[derive(Clone)]
pub struct Receiver {
    pub type_path: String,
    pub instance: Instance,
}

impl Receiver {
    pub fn new<T: Any + Send + Sync>(type_path: impl Into<String>, value: T) -> Self {
        Self {
            type_path: type_path.into(),
            instance: Arc::new(value),
        }
    }

    pub fn from_instance(type_path: impl Into<String>, instance: Instance) -> Self {
        Self {
            type_path: type_path.into(),
            instance,
        }
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.instance.downcast_ref::<T>()
    }

    /// Whether two receivers share the same underlying instance.
    pub fn same_instance(&self, other: &Receiver) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

impl fmt::Debug for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver").field("type_path", &self.type_path).finish_non_exhaustive()
    }
}

/// What a member body sees besides its arguments: `self`, plus the member table.
///
/// The registry is a snapshot taken when the invocation starts, including any table patches
/// installed by mocks, so collaborator calls made through [`CallContext::call`] are interceptable.
#[derive(Clone)]
pub struct CallContext {
    receiver: Option<Receiver>,
    registry: Arc<Registry>,
}

impl CallContext {
    pub fn new(receiver: Option<Receiver>, registry: Arc<Registry>) -> Self {
        Self { receiver, registry }
    }

    pub fn receiver(&self) -> Option<&Receiver> {
        self.receiver.as_ref()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Borrow the receiver as `T`.
    pub fn this<T: Any + Send + Sync>(&self) -> Result<&T, Raised> {
        let receiver = self
            .receiver
            .as_ref()
            .ok_or_else(|| Raised::type_error("instance member called without a receiver"))?;
        receiver.downcast::<T>().ok_or_else(|| {
            Raised::type_error(format!(
                "receiver of type {} is not a {}",
                receiver.type_path,
                std::any::type_name::<T>()
            ))
        })
    }

    /// Owned handle to the receiver as `T`, for async bodies that outlive the borrow.
    pub fn this_arc<T: Any + Send + Sync>(&self) -> Result<Arc<T>, Raised> {
        let receiver = self
            .receiver
            .as_ref()
            .ok_or_else(|| Raised::type_error("instance member called without a receiver"))?;
        Arc::clone(&receiver.instance)
            .downcast::<T>()
            .map_err(|_| Raised::type_error(format!("receiver of type {} has an unexpected shape", receiver.type_path)))
    }

    /// Call a synchronous member on `receiver` through the member table.
    pub fn call(&self, receiver: &Receiver, member: &str, args: CallArgs) -> Result<Returned, Raised> {
        let method = self.lookup(receiver, member)?;
        match &method.body {
            Body::Sync(body) => body(&CallContext::new(Some(receiver.clone()), Arc::clone(&self.registry)), &args),
            Body::Async(_) => Err(Raised::type_error(format!(
                "{}.{member} is async; use call_async",
                naming::short_name(&receiver.type_path)
            ))),
        }
    }

    /// Call any member on `receiver` through the member table and await it.
    pub fn call_async(&self, receiver: &Receiver, member: &str, args: CallArgs) -> BoxFuture<'static, Result<Returned, Raised>> {
        let ctx = CallContext::new(Some(receiver.clone()), Arc::clone(&self.registry));
        match self.lookup(receiver, member) {
            Err(err) => futures::future::ready(Err(err)).boxed(),
            Ok(method) => match method.body.clone() {
                Body::Async(body) => body(ctx, args),
                Body::Sync(body) => async move { body(&ctx, &args) }.boxed(),
            },
        }
    }

    fn lookup(&self, receiver: &Receiver, member: &str) -> Result<super::member::Method, Raised> {
        let info = self
            .registry
            .find_type(&receiver.type_path)
            .ok_or_else(|| Raised::type_error(format!("type {} is not registered", receiver.type_path)))?;
        info.method_named(member).cloned().ok_or_else(|| {
            Raised::type_error(format!("{} has no member '{member}'", receiver.type_path))
        })
    }
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext").field("receiver", &self.receiver).finish_non_exhaustive()
    }
}

/// Receives every call made on a capability proxy.
///
/// The proxy's trait impl forwards each trait method here with its arguments as a JSON object;
/// the interceptor records the call and returns the canned value (or `fallback`'s default).
pub trait Interceptor: Send + Sync {
    fn intercept(&self, member: &str, args: Value, fallback: &ParamType) -> Result<Value, Raised>;
}

/// Builds a value implementing a capability's real trait around an interceptor.
pub type ProxyFactory = Arc<dyn Fn(Arc<dyn Interceptor>) -> Instance + Send + Sync>;
