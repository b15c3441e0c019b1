//! Receiver caching across runs under each instance lifecycle.

use babeltest::{AdapterConfig, AdapterState};
use babeltest_core::lang::lifecycle::LifecycleMode;
use serde_json::{Value, json};

fn state(mode: LifecycleMode) -> AdapterState {
    let config = AdapterConfig::default()
        .with_project_root(env!("CARGO_MANIFEST_DIR"))
        .with_lifecycle(mode);
    AdapterState::new(babeltest_example::registry(), config)
}

async fn send(state: &mut AdapterState, command: Value) -> Value {
    let (result, _) = state.handle_line(&command.to_string()).await.unwrap();
    serde_json::from_str(&result.to_line()).unwrap()
}

async fn do_work(state: &mut AdapterState) -> Value {
    let out = send(
        state,
        json!({"action": "run", "test": {"target": "example.lifecycle_demo.StatefulService.do_work"}}),
    )
    .await;
    assert_eq!(out["status"], "passed", "{out}");
    out["actual"].clone()
}

async fn event(state: &mut AdapterState, name: &str) {
    let out = send(state, json!({"action": "lifecycle", "lifecycle": name, "data": {"name": "lifecycle"}})).await;
    assert_eq!(out["status"], "ok", "{out}");
}

#[tokio::test(flavor = "multi_thread")]
async fn shared_reuses_the_receiver() {
    let mut state = state(LifecycleMode::Shared);
    let first = do_work(&mut state).await;
    let second = do_work(&mut state).await;
    assert_eq!(first["call_count"], 1);
    assert_eq!(second["call_count"], 2);
    assert_eq!(first["instance_id"], second["instance_id"]);

    event(&mut state, "test_start").await;
    assert_eq!(do_work(&mut state).await["call_count"], 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn per_test_builds_a_fresh_receiver_every_run() {
    let mut state = state(LifecycleMode::PerTest);
    assert_eq!(do_work(&mut state).await["call_count"], 1);
    assert_eq!(do_work(&mut state).await["call_count"], 1);
    assert_eq!(state.instances().cache_len(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn per_suite_clears_on_suite_start() {
    let mut state = state(LifecycleMode::PerSuite);
    event(&mut state, "suite_start").await;
    do_work(&mut state).await;
    assert_eq!(do_work(&mut state).await["call_count"], 2);

    event(&mut state, "suite_end").await;
    event(&mut state, "suite_start").await;
    assert_eq!(do_work(&mut state).await["call_count"], 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn clear_cache_forces_reconstruction() {
    let mut state = state(LifecycleMode::Shared);
    do_work(&mut state).await;
    event(&mut state, "clear_cache").await;
    assert_eq!(do_work(&mut state).await["call_count"], 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn switching_lifecycle_through_config_clears_the_cache() {
    let mut state = state(LifecycleMode::Shared);
    do_work(&mut state).await;
    assert_eq!(state.instances().cache_len(), 1);

    let out = send(
        &mut state,
        json!({"action": "lifecycle", "lifecycle": "test_start", "config": {"instanceLifecycle": "per_test"}}),
    )
    .await;
    assert_eq!(out["status"], "ok");
    assert_eq!(state.instances().lifecycle(), LifecycleMode::PerTest);
    assert_eq!(state.instances().cache_len(), 0);
}
