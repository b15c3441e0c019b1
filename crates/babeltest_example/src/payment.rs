//! Order placement against a payment capability: `example.payment`.
//!
//! `OrderService` depends on the [`PaymentGateway`] trait. The live gateway always fails (it would
//! talk to an external processor), so tests either mock `PaymentGateway.charge` or observe the
//! `"error"` order status.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use babeltest_core::{
    Constructor, Instance, Interceptor, Method, Param, ParamType, Raised, Receiver, Registry, Returned, TypeInfo,
};
use serde::Serialize;
use serde_json::{Value, json};

pub const GATEWAY: &str = "example.payment.PaymentGateway";
pub const ORDER_SERVICE: &str = "example.payment.OrderService";

/// Raised kind that maps to [`PaymentError::Declined`].
pub const DECLINED_KIND: &str = "PaymentDeclined";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    Declined(String),
    Unavailable(String),
}

impl fmt::Display for PaymentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentError::Declined(msg) => write!(f, "payment declined: {msg}"),
            PaymentError::Unavailable(msg) => write!(f, "payment gateway unavailable: {msg}"),
        }
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for Raised {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Declined(msg) => Raised::new(DECLINED_KIND, msg),
            PaymentError::Unavailable(msg) => Raised::new("GatewayUnavailable", msg),
        }
    }
}

pub trait PaymentGateway: Send + Sync {
    fn charge(&self, amount: f64, card_token: &str) -> Result<Value, PaymentError>;
}

/// Handle type registered for the capability.
pub type SharedGateway = Arc<dyn PaymentGateway>;

/// The production gateway. Never reachable from tests.
#[derive(Debug, Default)]
pub struct LiveGateway;

impl PaymentGateway for LiveGateway {
    fn charge(&self, _amount: f64, _card_token: &str) -> Result<Value, PaymentError> {
        Err(PaymentError::Unavailable(
            "Real PaymentGateway should be mocked in tests".to_string(),
        ))
    }
}

/// Forwards every charge to an interceptor (a mock).
struct ProxyGateway {
    interceptor: Arc<dyn Interceptor>,
}

impl PaymentGateway for ProxyGateway {
    fn charge(&self, amount: f64, card_token: &str) -> Result<Value, PaymentError> {
        self.interceptor
            .intercept("charge", json!({"amount": amount, "card_token": card_token}), &ParamType::Map)
            .map_err(|raised| match raised.kind.as_str() {
                DECLINED_KIND => PaymentError::Declined(raised.message),
                _ => PaymentError::Unavailable(raised.to_string()),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: i64,
    pub status: String,
    pub total: f64,
}

pub struct OrderService {
    gateway: SharedGateway,
    next_id: AtomicI64,
}

impl OrderService {
    pub fn new(gateway: Option<SharedGateway>) -> Self {
        Self {
            gateway: gateway.unwrap_or_else(|| Arc::new(LiveGateway)),
            next_id: AtomicI64::new(1000),
        }
    }

    /// Charge the card and report the order outcome as a status rather than an error.
    pub fn place_order(&self, _user_id: i64, amount: f64, card_token: &str) -> Order {
        match self.gateway.charge(amount, card_token) {
            Ok(_) => Order {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                status: "placed".into(),
                total: amount,
            },
            Err(PaymentError::Declined(_)) => Order {
                id: 0,
                status: "declined".into(),
                total: amount,
            },
            Err(PaymentError::Unavailable(_)) => Order {
                id: 0,
                status: "error".into(),
                total: amount,
            },
        }
    }
}

pub fn register(registry: &mut Registry) {
    registry.insert(
        TypeInfo::capability(GATEWAY)
            .constructor(Constructor::new(|_| {
                let gateway: SharedGateway = Arc::new(LiveGateway);
                Ok(Receiver::new(GATEWAY, gateway))
            }))
            .method(
                Method::sync("charge", |ctx, args| {
                    let gateway = ctx.this::<SharedGateway>()?;
                    Ok(Returned::new(gateway.charge(args.float("amount")?, args.str("card_token")?)?))
                })
                .param(Param::new("amount", ParamType::Float))
                .param(Param::new("card_token", ParamType::Str))
                .returns(ParamType::Map),
            )
            .proxy(|interceptor| {
                let gateway: SharedGateway = Arc::new(ProxyGateway { interceptor });
                Arc::new(gateway) as Instance
            }),
    );

    registry.insert(
        TypeInfo::class(ORDER_SERVICE)
            .constructor(
                Constructor::new(|args| {
                    let gateway = args.instance::<SharedGateway>("payment_gateway")?;
                    Ok(Receiver::new(ORDER_SERVICE, OrderService::new(gateway)))
                })
                .param(Param::new("payment_gateway", ParamType::optional(ParamType::capability("PaymentGateway"))).with_default(Value::Null)),
            )
            .method(
                Method::sync("place_order", |ctx, args| {
                    let order = ctx.this::<OrderService>()?.place_order(
                        args.int("user_id")?,
                        args.float("amount")?,
                        args.str("card_token")?,
                    );
                    Returned::typed("Order", &order)
                })
                .param(Param::new("user_id", ParamType::Int))
                .param(Param::new("amount", ParamType::Float))
                .param(Param::new("card_token", ParamType::Str))
                .returns(ParamType::record("Order")),
            ),
    );
}
