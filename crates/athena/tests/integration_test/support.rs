//! Fixtures shared by the integration tests.

use impression_athena::test_support::ScriptedService;
use impression_athena::*;

pub const HEADER: [&str; 4] = ["key", "splitname", "treatment", "utc"];

pub fn row(values: &[&str]) -> Vec<Option<String>> {
    values.iter().map(|v| Some(v.to_string())).collect()
}

pub fn status(state: ExecutionState) -> ExecutionStatus {
    ExecutionStatus::new(state)
}

/// Executor with millisecond polling so tests finish quickly.
pub fn executor(service: ScriptedService) -> QueryExecutor<ScriptedService> {
    let config = AthenaConfig {
        poll: PollPolicy {
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_factor: 1.5,
            max_attempts: 20,
            timeout_seconds: 30,
        },
        ..AthenaConfig::default()
    };
    QueryExecutor::new(service, config)
}
