//! Member descriptors: parameters, methods, constructors, properties and builders.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::{Value, json};

use super::args::CallArgs;
use super::context::{CallContext, Receiver};
use super::outcome::{Raised, Returned};
use crate::naming;

/// Boxed, sendable future returned by async member bodies.
pub use futures::future::BoxFuture;

/// Declared type of a parameter or return value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    Any,
    Int,
    Float,
    Decimal,
    Str,
    Bool,
    DateTime,
    Date,
    Time,
    Uuid,
    List(Box<ParamType>),
    Map,
    /// A named data type that travels as a JSON object (`User`, `Order`).
    Record(String),
    Optional(Box<ParamType>),
    /// A trait-like collaborator, satisfied by a registered instance or a mock proxy.
    Capability(String),
}

impl ParamType {
    pub fn list(inner: ParamType) -> Self {
        ParamType::List(Box::new(inner))
    }

    pub fn optional(inner: ParamType) -> Self {
        ParamType::Optional(Box::new(inner))
    }

    pub fn record(name: impl Into<String>) -> Self {
        ParamType::Record(name.into())
    }

    pub fn capability(name: impl Into<String>) -> Self {
        ParamType::Capability(name.into())
    }

    /// Type-appropriate default a proxy returns for members no mock covers.
    pub fn default_value(&self) -> Value {
        match self {
            ParamType::Int => json!(0),
            ParamType::Float => json!(0.0),
            ParamType::Decimal => json!(0),
            ParamType::Str => json!(""),
            ParamType::Bool => json!(false),
            ParamType::List(_) => json!([]),
            ParamType::Map | ParamType::Record(_) => json!({}),
            ParamType::Any
            | ParamType::DateTime
            | ParamType::Date
            | ParamType::Time
            | ParamType::Uuid
            | ParamType::Optional(_)
            | ParamType::Capability(_) => Value::Null,
        }
    }

    /// The capability name this type requires, looking through `Optional`.
    pub fn capability_name(&self) -> Option<&str> {
        match self {
            ParamType::Capability(name) => Some(name),
            ParamType::Optional(inner) => inner.capability_name(),
            _ => None,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, ParamType::Optional(_) | ParamType::Any)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Any => f.write_str("any"),
            ParamType::Int => f.write_str("int"),
            ParamType::Float => f.write_str("float"),
            ParamType::Decimal => f.write_str("decimal"),
            ParamType::Str => f.write_str("string"),
            ParamType::Bool => f.write_str("bool"),
            ParamType::DateTime => f.write_str("datetime"),
            ParamType::Date => f.write_str("date"),
            ParamType::Time => f.write_str("time"),
            ParamType::Uuid => f.write_str("uuid"),
            ParamType::List(inner) => write!(f, "list[{inner}]"),
            ParamType::Map => f.write_str("map"),
            ParamType::Record(name) | ParamType::Capability(name) => f.write_str(name),
            ParamType::Optional(inner) => write!(f, "{inner}?"),
        }
    }
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: ParamType,
    /// Value used when the test does not supply the parameter.
    pub default: Option<Value>,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

pub type SyncBody = Arc<dyn Fn(&CallContext, &CallArgs) -> Result<Returned, Raised> + Send + Sync>;
pub type AsyncBody = Arc<dyn Fn(CallContext, CallArgs) -> BoxFuture<'static, Result<Returned, Raised>> + Send + Sync>;

/// Executable body of a method.
#[derive(Clone)]
pub enum Body {
    Sync(SyncBody),
    Async(AsyncBody),
}

impl Body {
    pub fn is_async(&self) -> bool {
        matches!(self, Body::Async(_))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Sync(_) => f.write_str("Body::Sync"),
            Body::Async(_) => f.write_str("Body::Async"),
        }
    }
}

/// A callable member of a type (or a free function of a module).
#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub params: Vec<Param>,
    pub returns: ParamType,
    /// Static members (and module functions) need no receiver.
    pub is_static: bool,
    pub body: Body,
}

impl Method {
    /// An instance method with a synchronous body.
    pub fn sync<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&CallContext, &CallArgs) -> Result<Returned, Raised> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: ParamType::Any,
            is_static: false,
            body: Body::Sync(Arc::new(body)),
        }
    }

    /// An instance method with an asynchronous body.
    pub fn asynchronous<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(CallContext, CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Returned, Raised>> + Send + 'static,
    {
        let wrapped: AsyncBody =
            Arc::new(move |ctx: CallContext, args: CallArgs| -> BoxFuture<'static, Result<Returned, Raised>> {
                body(ctx, args).boxed()
            });
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: ParamType::Any,
            is_static: false,
            body: Body::Async(wrapped),
        }
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn returns(mut self, ty: ParamType) -> Self {
        self.returns = ty;
        self
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Same signature, different body (used by table patches).
    pub fn with_body(&self, body: Body) -> Self {
        Self {
            body,
            ..self.clone()
        }
    }

    pub fn find_param(&self, name: &str) -> Option<&Param> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .or_else(|| self.params.iter().find(|p| naming::names_match(name, &p.name)))
    }
}

pub type BuildFn = Arc<dyn Fn(&CallArgs) -> Result<Receiver, Raised> + Send + Sync>;

/// A way to build an instance from coerced arguments.
#[derive(Clone)]
pub struct Constructor {
    pub params: Vec<Param>,
    pub build: BuildFn,
}

impl Constructor {
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(&CallArgs) -> Result<Receiver, Raised> + Send + Sync + 'static,
    {
        Self {
            params: Vec::new(),
            build: Arc::new(build),
        }
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Every parameter has a declared default (callable with no arguments).
    pub fn is_defaultable(&self) -> bool {
        self.params.iter().all(Param::has_default)
    }

    pub fn find_param(&self, name: &str) -> Option<&Param> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .or_else(|| self.params.iter().find(|p| naming::names_match(name, &p.name)))
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.params.iter().map(|p| p.name.as_str()).collect();
        f.debug_struct("Constructor").field("params", &names).finish()
    }
}

pub type GetFn = Arc<dyn Fn(&Receiver) -> Result<Receiver, Raised> + Send + Sync>;

/// A navigable property yielding another instance (`AppContainer.users`).
#[derive(Clone)]
pub struct Property {
    pub name: String,
    /// Registry path of the type the property yields.
    pub type_path: String,
    pub get: GetFn,
}

impl Property {
    pub fn new<F>(name: impl Into<String>, type_path: impl Into<String>, get: F) -> Self
    where
        F: Fn(&Receiver) -> Result<Receiver, Raised> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            type_path: type_path.into(),
            get: Arc::new(get),
        }
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("type_path", &self.type_path)
            .finish()
    }
}

/// A named zero-argument factory (`test_factory`), sync or async.
#[derive(Clone)]
pub enum Builder {
    Sync(Arc<dyn Fn() -> Result<Receiver, Raised> + Send + Sync>),
    Async(Arc<dyn Fn() -> BoxFuture<'static, Result<Receiver, Raised>> + Send + Sync>),
}

impl Builder {
    pub fn sync<F>(build: F) -> Self
    where
        F: Fn() -> Result<Receiver, Raised> + Send + Sync + 'static,
    {
        Builder::Sync(Arc::new(build))
    }

    pub fn asynchronous<F, Fut>(build: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Receiver, Raised>> + Send + 'static,
    {
        Builder::Async(Arc::new(move || -> BoxFuture<'static, Result<Receiver, Raised>> {
            build().boxed()
        }))
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Builder::Sync(_) => f.write_str("Builder::Sync"),
            Builder::Async(_) => f.write_str("Builder::Async"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values_by_type() {
        assert_eq!(ParamType::Int.default_value(), json!(0));
        assert_eq!(ParamType::Str.default_value(), json!(""));
        assert_eq!(ParamType::list(ParamType::Int).default_value(), json!([]));
        assert_eq!(ParamType::record("User").default_value(), json!({}));
        assert_eq!(ParamType::optional(ParamType::Int).default_value(), Value::Null);
    }

    #[test]
    fn test_capability_name_through_optional() {
        let ty = ParamType::optional(ParamType::capability("PaymentGateway"));
        assert_eq!(ty.capability_name(), Some("PaymentGateway"));
        assert_eq!(ParamType::Int.capability_name(), None);
    }

    #[test]
    fn test_find_param_uses_naming_bridge() {
        let method = Method::sync("get_by_id", |_, _| Ok(Returned::null())).param(Param::new("user_id", ParamType::Int));
        assert!(method.find_param("userId").is_some());
        assert!(method.find_param("id").is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(ParamType::list(ParamType::record("User")).to_string(), "list[User]");
        assert_eq!(ParamType::optional(ParamType::Int).to_string(), "int?");
    }
}
