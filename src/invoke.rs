//! Member invocation under an optional timeout.
//!
//! - Sync bodies without a timeout run inline inside `catch_unwind`.
//! - Sync bodies with a timeout run on the blocking pool. On expiry the worker is abandoned; it
//!   may keep running in the background.
//! - Async bodies are spawned on the runtime and aborted on expiry.
//!
//! Panics in target code become a [`Raised`] of kind `Panic`.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use babeltest_core::lang::errors::PANIC_KIND;
use babeltest_core::{Body, CallArgs, CallContext, Method, Raised, Returned};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::JoinError;
use tracing::{debug, warn};

/// Tagged result of one invocation.
#[derive(Debug, Clone)]
pub enum Outcome {
    Returned(Returned),
    Raised(Raised),
    TimedOut { timeout_ms: u64 },
}

impl From<Result<Returned, Raised>> for Outcome {
    fn from(result: Result<Returned, Raised>) -> Self {
        match result {
            Ok(returned) => Outcome::Returned(returned),
            Err(raised) => Outcome::Raised(raised),
        }
    }
}

pub async fn invoke(method: &Method, ctx: CallContext, args: CallArgs, timeout_ms: Option<u64>) -> Outcome {
    match (&method.body, timeout_ms) {
        (Body::Sync(body), None) => {
            let result = panic::catch_unwind(AssertUnwindSafe(|| body(&ctx, &args)));
            result.unwrap_or_else(|payload| Err(panic_raised(payload.as_ref()))).into()
        }
        (Body::Sync(body), Some(ms)) => {
            let body = body.clone();
            let handle = tokio::task::spawn_blocking(move || body(&ctx, &args));
            match tokio::time::timeout(Duration::from_millis(ms), handle).await {
                Ok(joined) => flatten(joined),
                Err(_) => {
                    warn!(member = %method.name, timeout_ms = ms, "blocking call timed out; worker left running");
                    Outcome::TimedOut { timeout_ms: ms }
                }
            }
        }
        (Body::Async(body), timeout_ms) => {
            let mut handle = tokio::spawn(body(ctx, args));
            let Some(ms) = timeout_ms else {
                return flatten(handle.await);
            };
            match tokio::time::timeout(Duration::from_millis(ms), &mut handle).await {
                Ok(joined) => flatten(joined),
                Err(_) => {
                    handle.abort();
                    debug!(member = %method.name, timeout_ms = ms, "async call timed out; task aborted");
                    Outcome::TimedOut { timeout_ms: ms }
                }
            }
        }
    }
}

fn flatten(joined: Result<Result<Returned, Raised>, JoinError>) -> Outcome {
    match joined {
        Ok(result) => result.into(),
        Err(err) if err.is_panic() => Outcome::Raised(panic_raised(err.into_panic().as_ref())),
        Err(err) => Outcome::Raised(Raised::new(PANIC_KIND, format!("task failed: {err}"))),
    }
}

fn panic_raised(payload: &(dyn Any + Send)) -> Raised {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic with a non-string payload".to_string());
    Raised::new(PANIC_KIND, message)
}

/// Drive `fut` to completion from synchronous code running on (or off) a tokio runtime.
///
/// On a multi-threaded runtime the current worker is handed off with `block_in_place`. On a
/// current-thread runtime, or with no runtime at all, the future runs on a scoped helper
/// thread with its own runtime.
pub fn block_on<F, T>(fut: F) -> Result<T, Raised>
where
    F: Future<Output = T> + Send,
    T: Send,
{
    if let Ok(handle) = Handle::try_current() {
        if handle.runtime_flavor() == RuntimeFlavor::MultiThread {
            return Ok(tokio::task::block_in_place(|| handle.block_on(fut)));
        }
    }
    std::thread::scope(|scope| {
        scope
            .spawn(|| {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| Raised::new("RuntimeError", format!("cannot start runtime: {e}")))?;
                Ok(runtime.block_on(fut))
            })
            .join()
            .unwrap_or_else(|payload| Err(panic_raised(payload.as_ref())))
    })
}
