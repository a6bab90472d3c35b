//! End-to-end invocation tests against the scripted service.

use impression_athena::*;

use impression_athena::test_support::ScriptedService;

use crate::support::{executor, row, status, HEADER};

fn sample_grid() -> ResultGrid {
    vec![
        row(&HEADER),
        row(&["dmartin", "new_checkout", "on", "2024-03-02 18:04:11"]),
        row(&["dmartin", "new_checkout", "off", "2024-03-01 09:00:00"]),
        row(&["dmartin", "dark_mode", "on", "2024-02-28 23:59:59"]),
    ]
}

#[tokio::test]
async fn test_success_body_is_record_array() {
    let exec = executor(ScriptedService::succeeding(sample_grid()));

    let resp = run_invocation(&exec, None, None, &CancellationToken::new()).await;

    assert_eq!(resp.status_code, 200);
    let records: Vec<serde_json::Value> = serde_json::from_str(&resp.body).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["splitname"], "new_checkout");
    assert_eq!(records[0]["utc"], "2024-03-02 18:04:11");
    assert_eq!(records[2]["treatment"], "on");
    // Field order follows the header.
    assert!(resp.body.starts_with(r#"[{"key":"dmartin","splitname":"#));
}

#[tokio::test]
async fn test_empty_result_is_empty_array() {
    let exec = executor(ScriptedService::succeeding(vec![row(&HEADER)]));
    let resp = run_invocation(&exec, Some("nobody"), Some("5"), &CancellationToken::new()).await;
    assert_eq!(resp, ApiResponse::ok("[]".into()));
}

#[tokio::test]
async fn test_failed_query_envelope() {
    let mut failed = status(ExecutionState::Failed);
    failed.reason = Some("X".into());
    let exec = executor(ScriptedService::new(vec![status(ExecutionState::Queued), failed]));

    let resp = run_invocation(&exec, None, None, &CancellationToken::new()).await;

    assert_eq!(resp.status_code, 500);
    assert_eq!(resp.body, r#"{"error":"X"}"#);
}

#[tokio::test]
async fn test_cancelled_query_envelope() {
    let exec = executor(ScriptedService::new(vec![
        status(ExecutionState::Running),
        status(ExecutionState::Cancelled),
    ]));

    let resp = run_invocation(&exec, None, None, &CancellationToken::new()).await;

    assert_eq!(resp.status_code, 500);
    assert_eq!(resp.body, r#"{"error":"Query was cancelled"}"#);
    assert_eq!(exec.service().stop_calls(), 0);
}

#[tokio::test]
async fn test_never_finishing_query_is_stopped() {
    let exec = executor(ScriptedService::new(vec![status(ExecutionState::Running)]));

    let resp = run_invocation(&exec, None, None, &CancellationToken::new()).await;

    assert_eq!(resp.status_code, 500);
    assert!(resp.body.contains("still running after 20 status checks"));
    assert_eq!(exec.service().stop_calls(), 1);
}

#[tokio::test]
async fn test_ragged_rows() {
    let grid = vec![
        row(&HEADER),
        row(&["k1", "s1"]),
        vec![Some("k2".into()), Some("s2".into()), None, Some("2024-01-01 00:00:00".into())],
    ];
    let exec = executor(ScriptedService::succeeding(grid));

    let resp = run_invocation(&exec, None, None, &CancellationToken::new()).await;

    assert_eq!(
        resp.body,
        r#"[{"key":"k1","splitname":"s1"},{"key":"k2","splitname":"s2","treatment":null,"utc":"2024-01-01 00:00:00"}]"#
    );
}

#[tokio::test]
async fn test_repeat_invocations_are_identical() {
    let exec = executor(ScriptedService::succeeding(sample_grid()));
    let cancel = CancellationToken::new();

    let first = run_invocation(&exec, Some("dmartin"), Some("14"), &cancel).await;
    let second = run_invocation(&exec, Some("dmartin"), Some("14"), &cancel).await;

    assert_eq!(first, second);
    let submitted = exec.service().submitted();
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[0].parameters, submitted[1].parameters);
}

#[tokio::test]
async fn test_status_failure_envelope() {
    let exec = executor(
        ScriptedService::new(vec![status(ExecutionState::Running)]).failing_status("Rate exceeded"),
    );

    let resp = run_invocation(&exec, None, None, &CancellationToken::new()).await;

    assert_eq!(resp, ApiResponse::error("Rate exceeded"));
    assert_eq!(resp.body, r#"{"error":"Rate exceeded"}"#);
}

#[tokio::test]
async fn test_fetch_failure_envelope() {
    let exec = executor(
        ScriptedService::succeeding(sample_grid()).failing_results("Query has not yet finished"),
    );

    let resp = run_invocation(&exec, None, None, &CancellationToken::new()).await;

    assert_eq!(resp.status_code, 500);
    assert_eq!(resp.body, r#"{"error":"Query has not yet finished"}"#);
}
