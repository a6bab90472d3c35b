//! impression-lambda — HTTP Lambda returning a key's latest Split impressions.
//!
//! Query parameters:
//! - `key`  — traffic key (default `dmartin`)
//! - `days` — trailing window, clamped to 1..=90 (default 30)

use std::sync::Arc;

use lambda_http::{run, service_fn, Error, Request};
use tracing::info;

use impression_athena::{AthenaConfig, AwsQueryService, QueryExecutor};
use impression_lambda::handler::function_handler;
use impression_lambda::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing(false);

    // Built once per execution environment and reused across invocations.
    let config = AthenaConfig::from_env();
    let service = AwsQueryService::new(&config).await;
    let executor = Arc::new(QueryExecutor::new(service, config));

    info!("impression-lambda ready");

    run(service_fn(move |event: Request| {
        let executor = executor.clone();
        async move { function_handler(executor.as_ref(), event).await }
    }))
    .await
}
