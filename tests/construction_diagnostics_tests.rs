//! Receiver construction: factory-file discovery, builders, and the diagnostics produced when
//! nothing can build a type.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use babeltest::{AdapterConfig, AdapterState};
use babeltest_core::{
    Builder, Constructor, Instance, Interceptor, Method, Param, ParamType, Raised, Receiver, Registry, Returned, TypeInfo,
};
use serde_json::{Value, json};
use tempfile::TempDir;

struct Project {
    root: TempDir,
}

impl Project {
    fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    fn factories_dir(&self) -> PathBuf {
        self.root.path().join("babel").join("factories")
    }

    fn write(&self, relative: &str, contents: &str) {
        let path = self.factories_dir().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn state_with(&self, registry: Registry) -> AdapterState {
        AdapterState::new(registry, AdapterConfig::default().with_project_root(self.root.path()))
    }

    fn state(&self) -> AdapterState {
        self.state_with(babeltest_example::registry())
    }
}

async fn run(state: &mut AdapterState, test: Value) -> Value {
    let command = json!({"action": "run", "test": test});
    let (result, _) = state.handle_line(&command.to_string()).await.unwrap();
    serde_json::from_str(&result.to_line()).unwrap()
}

fn record(entry: &str) -> Value {
    json!({"target": "example.services.AuditLog.record", "given": {"entry": entry}})
}

fn message(out: &Value) -> &str {
    out["error"]["message"].as_str().unwrap()
}

fn redact(text: &str, dir: &Path) -> String {
    text.replace(&dir.display().to_string(), "<factories>")
}

#[tokio::test(flavor = "multi_thread")]
async fn flat_factory_file_supplies_constructor_args() {
    let project = Project::new();
    project.write("services.json", r#"{"auditLog": {"args": {"prefix": "[flat]"}}}"#);
    let mut state = project.state();

    let out = run(&mut state, record("login")).await;
    assert_eq!(out["status"], "passed", "{out}");
    assert_eq!(out["actual"], "[flat] login");
}

#[tokio::test(flavor = "multi_thread")]
async fn nested_file_is_searched_before_flat() {
    let project = Project::new();
    project.write("example/services.json", r#"{"auditLog": {"args": {"prefix": "[nested]"}}}"#);
    project.write("services.json", r#"{"auditLog": {"args": {"prefix": "[flat]"}}}"#);
    let mut state = project.state();

    let out = run(&mut state, record("x")).await;
    assert_eq!(out["actual"], "[nested] x", "{out}");
}

#[tokio::test(flavor = "multi_thread")]
async fn factory_named_file_and_snake_case_names() {
    let project = Project::new();
    project.write("auditLog.json", r#"{"args": {"prefix": "[bare]"}}"#);
    let mut state = project.state();
    assert_eq!(run(&mut state, record("x")).await["actual"], "[bare] x");

    let project = Project::new();
    project.write("services.json", r#"{"audit_log": {"args": {"prefix": "[snake]"}}}"#);
    let mut state = project.state();
    assert_eq!(run(&mut state, record("x")).await["actual"], "[snake] x");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_factory_takes_priority() {
    let project = Project::new();
    project.write("services.json", r#"{"greeter": {"args": {"greeting": "Howdy"}}}"#);
    let mut state = project.state();

    let out = run(
        &mut state,
        json!({"target": "example.services.Greeter.greet", "given": {"name": "Ada"}, "expect": {"value": "Hello, Ada!"}}),
    )
    .await;
    assert_eq!(out["status"], "passed", "{out}");
}

#[tokio::test(flavor = "multi_thread")]
async fn construction_failure_lists_every_search() {
    let project = Project::new();
    let mut state = project.state();

    let out = run(&mut state, record("x")).await;
    assert_eq!(out["status"], "error");
    assert_eq!(out["error"]["type"], "ConstructionError");
    insta::assert_snapshot!(redact(message(&out), &project.factories_dir()), @r#"
    Cannot construct AuditLog

    Searched:
      ✗ AuditLog::test_factory (not registered)
      ✗ <factories>/example/services.json (nested structure) (file not found)
      ✗ <factories>/services.json (flat structure) (file not found)
      ✗ <factories>/auditLog.json (factory-named file) (file not found)
      ✗ AuditLog() (parameterless constructor) (every constructor requires arguments)

    Suggestions:
      1. Create a factory file:

      // <factories>/services.json
      {
        "auditLog": { "args": { "prefix": <string> } }
      }
      2. Register a `test_factory` builder on AuditLog
      3. Add a constructor to AuditLog whose parameters all have defaults
    "#);
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_factory_file_is_reported_and_skipped() {
    let project = Project::new();
    project.write("services.json", "{ not json");
    project.write("auditLog.json", r#"{"auditLog": {"args": {"prefix": "[ok]"}}}"#);
    let mut state = project.state();
    assert_eq!(run(&mut state, record("x")).await["actual"], "[ok] x");

    let project = Project::new();
    project.write("services.json", "{ not json");
    let mut state = project.state();
    let out = run(&mut state, record("x")).await;
    assert_eq!(out["error"]["type"], "ConstructionError");
    assert!(message(&out).contains("services.json (flat structure) (invalid JSON"), "{out}");
}

#[tokio::test(flavor = "multi_thread")]
async fn clear_cache_rereads_factory_files() {
    let project = Project::new();
    project.write("services.json", r#"{"auditLog": {"args": {"prefix": "[v1]"}}}"#);
    let mut state = project.state();
    assert_eq!(run(&mut state, record("x")).await["actual"], "[v1] x");

    project.write("services.json", r#"{"auditLog": {"args": {"prefix": "[v2]"}}}"#);
    assert_eq!(run(&mut state, record("x")).await["actual"], "[v1] x");

    state
        .handle_line(r#"{"action":"lifecycle","lifecycle":"clear_cache"}"#)
        .await
        .unwrap();
    assert_eq!(run(&mut state, record("x")).await["actual"], "[v2] x");
}

// ============================================================================
// Custom registries
// ============================================================================

#[derive(Debug)]
struct Cart {
    owner: String,
}

fn shop_registry() -> Registry {
    let mut registry = Registry::new();
    registry.insert(
        TypeInfo::class("shop.Cart")
            .constructor(
                Constructor::new(|args| Ok(Receiver::new("shop.Cart", Cart { owner: args.string("owner")? })))
                    .param(Param::new("owner", ParamType::Str)),
            )
            .builder("demo", Builder::sync(|| Ok(Receiver::new("shop.Cart", Cart { owner: "demo".into() }))))
            .method(Method::sync("owner", |ctx, _| Ok(Returned::new(ctx.this::<Cart>()?.owner.clone())))),
    );
    for (path, dep) in [("loop.A", "b"), ("loop.B", "a")] {
        registry.insert(
            TypeInfo::class(path)
                .constructor(Constructor::new(move |_| Ok(Receiver::new(path, ()))).param(Param::new(dep, ParamType::Any)))
                .method(Method::sync("ping", |_, _| Ok(Returned::new("pong")))),
        );
    }
    registry
}

#[tokio::test(flavor = "multi_thread")]
async fn factory_entry_can_name_a_builder() {
    let project = Project::new();
    project.write("shop.json", r#"{"cart": {"builder": "demo"}}"#);
    let mut state = project.state_with(shop_registry());

    let out = run(&mut state, json!({"target": "shop.Cart.owner", "expect": {"value": "demo"}})).await;
    assert_eq!(out["status"], "passed", "{out}");

    let project = Project::new();
    project.write("shop.json", r#"{"cart": {"builder": "nope"}}"#);
    let mut state = project.state_with(shop_registry());
    let out = run(&mut state, json!({"target": "shop.Cart.owner"})).await;
    assert_eq!(out["error"]["type"], "ConstructionError");
    assert!(message(&out).contains("unknown builder 'nope'"), "{out}");
}

#[tokio::test(flavor = "multi_thread")]
async fn cyclic_type_references_are_detected() {
    let project = Project::new();
    project.write(
        "loop.json",
        r#"{"a": {"args": {"b": {"$type": "loop.B"}}}, "b": {"args": {"a": {"$type": "loop.A"}}}}"#,
    );
    let mut state = project.state_with(shop_registry());

    let out = run(&mut state, json!({"target": "loop.A.ping"})).await;
    assert_eq!(out["error"]["type"], "ConstructionError", "{out}");
    assert_eq!(message(&out), "Cyclic factory reference: loop.A -> loop.B -> loop.A");
}

trait Ping: Send + Sync {
    fn ping(&self) -> Result<Value, Raised>;
}

type SharedPing = Arc<dyn Ping>;

struct RealPing;

impl Ping for RealPing {
    fn ping(&self) -> Result<Value, Raised> {
        Ok(json!("real"))
    }
}

struct ProxyPing {
    interceptor: Arc<dyn Interceptor>,
}

impl Ping for ProxyPing {
    fn ping(&self) -> Result<Value, Raised> {
        self.interceptor.intercept("ping", json!({}), &ParamType::Str)
    }
}

#[derive(Clone)]
struct Inner {
    gw: SharedPing,
}

struct Outer {
    inner: Inner,
}

/// `app.Outer` needs an `app.Inner` from a factory file; `app.Inner` accepts the `app.Gw` capability.
fn layered_registry() -> Registry {
    let mut registry = Registry::new();
    registry.insert(
        TypeInfo::capability("app.Gw")
            .constructor(Constructor::new(|_| {
                let gw: SharedPing = Arc::new(RealPing);
                Ok(Receiver::new("app.Gw", gw))
            }))
            .method(Method::sync("ping", |ctx, _| Ok(Returned::new(ctx.this::<SharedPing>()?.ping()?))))
            .proxy(|interceptor| {
                let gw: SharedPing = Arc::new(ProxyPing { interceptor });
                Arc::new(gw) as Instance
            }),
    );
    registry.insert(
        TypeInfo::class("app.Inner").constructor(
            Constructor::new(|args| {
                let gw = args.instance::<SharedPing>("gw")?.unwrap_or_else(|| Arc::new(RealPing));
                Ok(Receiver::new("app.Inner", Inner { gw }))
            })
            .param(Param::new("gw", ParamType::optional(ParamType::capability("Gw"))).with_default(Value::Null)),
        ),
    );
    registry.insert(
        TypeInfo::class("app.Outer")
            .constructor(
                Constructor::new(|args| {
                    let inner = args
                        .instance::<Inner>("inner")?
                        .ok_or_else(|| Raised::type_error("Outer needs an inner"))?;
                    Ok(Receiver::new("app.Outer", Outer { inner }))
                })
                .param(Param::new("inner", ParamType::record("Inner"))),
            )
            .method(Method::sync("ping", |ctx, _| Ok(Returned::new(ctx.this::<Outer>()?.inner.gw.ping()?)))),
    );
    registry
}

#[tokio::test(flavor = "multi_thread")]
async fn receivers_holding_mocked_dependencies_are_not_cached() {
    let project = Project::new();
    project.write("app.json", r#"{"outer": {"args": {"inner": {"$type": "app.Inner"}}}}"#);
    let mut state = project.state_with(layered_registry());

    let out = run(
        &mut state,
        json!({
            "target": "app.Outer.ping",
            "mocks": [{"target": "Gw.ping", "returns": "mocked"}],
            "expect": {"value": "mocked"}
        }),
    )
    .await;
    assert_eq!(out["status"], "passed", "{out}");
    assert_eq!(state.instances().cache_len(), 0);

    let out = run(&mut state, json!({"target": "app.Outer.ping", "expect": {"value": "real"}})).await;
    assert_eq!(out["status"], "passed", "{out}");
    assert!(state.instances().cached("app.Outer").is_some());
}
