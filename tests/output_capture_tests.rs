//! Target stdout/stderr returned in `logs` when `captureOutput` is on.
//!
//! Stream redirection is process-wide, so this binary holds a single test.

use babeltest::{AdapterConfig, AdapterState};
use serde_json::{Value, json};

async fn send(state: &mut AdapterState, command: Value) -> Value {
    let (result, _) = state.handle_line(&command.to_string()).await.unwrap();
    serde_json::from_str(&result.to_line()).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn target_output_is_returned_in_logs_only_when_captured() {
    let config = AdapterConfig::default()
        .with_project_root(env!("CARGO_MANIFEST_DIR"))
        .with_capture_output(true);
    let mut state = AdapterState::new(babeltest_example::registry(), config);

    let out = send(
        &mut state,
        json!({"action": "run", "test": {
            "target": "example.with_output.noisy_add",
            "given": {"a": 2, "b": 3},
            "expect": {"type": "exact", "value": 5}
        }}),
    )
    .await;
    assert_eq!(out["status"], "passed", "{out}");
    assert_eq!(out["logs"], json!(["[stdout]\nAdding 2 + 3\nResult: 5\n"]));

    let out = send(
        &mut state,
        json!({"action": "run", "test": {
            "target": "example.with_output.failing_with_output",
            "given": {"value": "bad"},
            "throws": {"type": "ValueError"}
        }}),
    )
    .await;
    assert_eq!(out["status"], "passed", "{out}");
    assert_eq!(
        out["logs"],
        json!(["[stdout]\nProcessing value: bad\n", "[stderr]\nWarning: about to fail with bad\n"])
    );

    // Switched off through command config: output is diverted, never returned.
    let out = send(
        &mut state,
        json!({"action": "run", "config": {"captureOutput": false}, "test": {
            "target": "example.with_output.prints_and_returns",
            "given": {"message": "hi"},
            "expect": {"type": "exact", "value": "hi"}
        }}),
    )
    .await;
    assert_eq!(out["status"], "passed", "{out}");
    assert!(out.get("logs").is_none(), "{out}");
}
