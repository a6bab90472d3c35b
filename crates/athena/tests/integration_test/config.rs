//! Tests for AthenaConfig: environment loading and profiles.

use std::env;
use std::sync::Mutex;
use std::time::Duration;

use impression_athena::*;

// Env-based tests must run serially to avoid interfering with each other.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_athena_env() {
    let keys = [
        "IMPRESSION_PROFILE",
        "ATHENA_REGION",
        "ATHENA_CATALOG",
        "ATHENA_DATABASE",
        "ATHENA_WORKGROUP",
        "ATHENA_OUTPUT_LOCATION",
        "ATHENA_POLL_INITIAL_MS",
        "ATHENA_POLL_MAX_MS",
        "ATHENA_POLL_BACKOFF",
        "ATHENA_POLL_MAX_ATTEMPTS",
        "ATHENA_TIMEOUT_SECONDS",
        "AWS_REGION",
        "TEST_ATHENA_DATABASE",
        "TEST_ATHENA_REGION",
        "TEST_ATHENA_OUTPUT_LOCATION",
        "TEST_ATHENA_TIMEOUT_SECONDS",
    ];
    for k in keys {
        env::remove_var(k);
    }
}

#[test]
fn test_config_from_env() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_athena_env();

    env::set_var("ATHENA_REGION", "us-east-1");
    env::set_var("ATHENA_CATALOG", "AwsDataCatalog");
    env::set_var("ATHENA_DATABASE", "analytics");
    env::set_var("ATHENA_WORKGROUP", "custom");
    env::set_var("ATHENA_OUTPUT_LOCATION", "s3://my-bucket/results/");
    env::set_var("ATHENA_POLL_MAX_MS", "3000");
    env::set_var("ATHENA_POLL_BACKOFF", "2");

    let cfg = AthenaConfig::from_env();

    assert_eq!(cfg.region, "us-east-1");
    assert_eq!(cfg.catalog, "AwsDataCatalog");
    assert_eq!(cfg.database, "analytics");
    assert_eq!(cfg.workgroup, "custom");
    assert_eq!(cfg.output_location, "s3://my-bucket/results/");
    assert_eq!(cfg.poll.max_delay_ms, 3000);
    assert_eq!(cfg.poll.delay_for(1), Duration::from_millis(2000));
    assert_eq!(cfg.poll.delay_for(2), Duration::from_millis(3000));

    clear_athena_env();
}

#[test]
fn test_config_profile() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_athena_env();

    env::set_var("ATHENA_DATABASE", "base_db");
    env::set_var("IMPRESSION_PROFILE", "test");
    env::set_var("TEST_ATHENA_DATABASE", "test_db");
    env::set_var("TEST_ATHENA_REGION", "eu-west-1");
    env::set_var("TEST_ATHENA_OUTPUT_LOCATION", "s3://test-bucket/");
    env::set_var("TEST_ATHENA_TIMEOUT_SECONDS", "10");

    let cfg = AthenaConfig::from_env();

    assert_eq!(cfg.database, "test_db");
    assert_eq!(cfg.region, "eu-west-1");
    assert_eq!(cfg.output_location, "s3://test-bucket/");
    assert_eq!(cfg.poll.timeout(), Duration::from_secs(10));

    clear_athena_env();
}

/// This test requires valid AWS credentials, network access and the
/// `impressions4` table in the configured database.
///
/// Run with: `cargo test test_real_athena_lookup -- --ignored`
#[test]
#[ignore]
fn test_real_athena_lookup() {
    let rt = tokio::runtime::Runtime::new().unwrap();

    rt.block_on(async {
        let config = AthenaConfig::from_env();
        let service = AwsQueryService::new(&config).await;
        let executor = QueryExecutor::new(service, config);

        let resp = run_invocation(&executor, None, Some("1"), &CancellationToken::new()).await;

        assert_eq!(resp.status_code, 200, "body: {}", resp.body);
        let records: Vec<serde_json::Value> = serde_json::from_str(&resp.body).unwrap();
        assert!(records.len() <= 100);
        println!("{} records", records.len());
    });
}
