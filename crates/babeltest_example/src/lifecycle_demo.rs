//! Instance-lifecycle demo: `example.lifecycle_demo`.
//!
//! Every `StatefulService` takes the next instance id from a process-wide counter, so tests can
//! tell whether two invocations shared a receiver.

use std::sync::atomic::{AtomicI64, Ordering};

use babeltest_core::{Constructor, Method, ParamType, Receiver, Registry, Returned, TypeInfo};
use serde_json::{Value, json};

pub const PATH: &str = "example.lifecycle_demo";
pub const STATEFUL_SERVICE: &str = "example.lifecycle_demo.StatefulService";

static INSTANCE_COUNTER: AtomicI64 = AtomicI64::new(0);

pub fn reset_counter() {
    INSTANCE_COUNTER.store(0, Ordering::SeqCst);
}

pub fn get_counter() -> i64 {
    INSTANCE_COUNTER.load(Ordering::SeqCst)
}

#[derive(Debug)]
pub struct StatefulService {
    instance_id: i64,
    call_count: AtomicI64,
}

impl Default for StatefulService {
    fn default() -> Self {
        Self {
            instance_id: INSTANCE_COUNTER.fetch_add(1, Ordering::SeqCst) + 1,
            call_count: AtomicI64::new(0),
        }
    }
}

impl StatefulService {
    pub fn do_work(&self) -> Value {
        let call_count = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        json!({"instance_id": self.instance_id, "call_count": call_count})
    }

    pub fn get_state(&self) -> Value {
        json!({"instance_id": self.instance_id, "call_count": self.call_count.load(Ordering::SeqCst)})
    }
}

pub fn register(registry: &mut Registry) {
    registry.insert(
        TypeInfo::module(PATH)
            .method(
                Method::sync("reset_counter", |_, _| {
                    reset_counter();
                    Ok(Returned::null())
                })
                .static_member(),
            )
            .method(
                Method::sync("get_counter", |_, _| Ok(Returned::new(get_counter())))
                    .returns(ParamType::Int)
                    .static_member(),
            ),
    );

    registry.insert(
        TypeInfo::class(STATEFUL_SERVICE)
            .constructor(Constructor::new(|_| {
                Ok(Receiver::new(STATEFUL_SERVICE, StatefulService::default()))
            }))
            .method(
                Method::sync("do_work", |ctx, _| Ok(Returned::new(ctx.this::<StatefulService>()?.do_work())))
                    .returns(ParamType::Map),
            )
            .method(
                Method::sync("get_state", |ctx, _| Ok(Returned::new(ctx.this::<StatefulService>()?.get_state())))
                    .returns(ParamType::Map),
            ),
    );
}
