//! Async members and slow calls for timeout tests: `example.async_funcs`.

use std::time::Duration;

use babeltest_core::{Builder, Method, Param, ParamType, Raised, Receiver, Registry, Returned, TypeInfo};
use serde_json::{Value, json};

pub const PATH: &str = "example.async_funcs";
pub const ASYNC_CLIENT: &str = "example.async_funcs.AsyncClient";

pub async fn async_add(a: i64, b: i64) -> i64 {
    tokio::time::sleep(Duration::from_millis(10)).await;
    a + b
}

pub async fn async_fetch_data(key: &str) -> Value {
    tokio::time::sleep(Duration::from_millis(50)).await;
    let data = json!({
        "user": {"id": 1, "name": "Kohl"},
        "config": {"theme": "dark", "lang": "en"},
    });
    data.get(key).cloned().unwrap_or_else(|| json!({}))
}

pub async fn async_slow_operation(delay_ms: u64) -> String {
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    format!("completed after {delay_ms}ms")
}

pub async fn async_failing() -> Result<(), Raised> {
    tokio::time::sleep(Duration::from_millis(10)).await;
    Err(Raised::new("ValueError", "Async operation failed"))
}

/// Blocks the calling thread; used to exercise timeouts on sync members.
pub fn slow_sync_function(delay_ms: u64) -> String {
    std::thread::sleep(Duration::from_millis(delay_ms));
    format!("completed after {delay_ms}ms")
}

/// A client whose only construction path is an async `test_factory`.
#[derive(Debug)]
pub struct AsyncClient {
    endpoint: String,
}

impl AsyncClient {
    pub async fn connect(endpoint: &str) -> Self {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Self {
            endpoint: endpoint.to_string(),
        }
    }

    pub async fn fetch(&self, key: &str) -> Value {
        json!({"endpoint": self.endpoint, "key": key, "value": async_fetch_data(key).await})
    }
}

fn delay(args: &babeltest_core::CallArgs) -> Result<u64, Raised> {
    let ms = args.int("delay_ms")?;
    u64::try_from(ms).map_err(|_| Raised::new("ValueError", format!("delay_ms must be non-negative, got {ms}")))
}

pub fn register(registry: &mut Registry) {
    registry.insert(
        TypeInfo::module(PATH)
            .method(
                Method::asynchronous("async_add", |_, args| async move {
                    Ok::<_, Raised>(Returned::new(async_add(args.int("a")?, args.int("b")?).await))
                })
                .param(Param::new("a", ParamType::Int))
                .param(Param::new("b", ParamType::Int))
                .returns(ParamType::Int)
                .static_member(),
            )
            .method(
                Method::asynchronous("async_fetch_data", |_, args| async move {
                    Ok::<_, Raised>(Returned::new(async_fetch_data(args.str("key")?).await))
                })
                .param(Param::new("key", ParamType::Str))
                .returns(ParamType::Map)
                .static_member(),
            )
            .method(
                Method::asynchronous("async_slow_operation", |_, args| async move {
                    Ok::<_, Raised>(Returned::new(async_slow_operation(delay(&args)?).await))
                })
                .param(Param::new("delay_ms", ParamType::Int))
                .returns(ParamType::Str)
                .static_member(),
            )
            .method(
                Method::asynchronous("async_failing", |_, _| async move {
                    async_failing().await.map(|()| Returned::null())
                })
                .static_member(),
            )
            .method(
                Method::sync("slow_sync_function", |_, args| Ok(Returned::new(slow_sync_function(delay(args)?))))
                    .param(Param::new("delay_ms", ParamType::Int))
                    .returns(ParamType::Str)
                    .static_member(),
            ),
    );

    registry.insert(
        TypeInfo::class(ASYNC_CLIENT)
            .test_factory(Builder::asynchronous(|| async {
                Ok(Receiver::new(ASYNC_CLIENT, AsyncClient::connect("memory://cache").await))
            }))
            .method(
                Method::asynchronous("fetch", |ctx, args| async move {
                    let client = ctx.this_arc::<AsyncClient>()?;
                    Ok::<_, Raised>(Returned::new(client.fetch(args.str("key")?).await))
                })
                .param(Param::new("key", ParamType::Str))
                .returns(ParamType::Map),
            ),
    );
}
