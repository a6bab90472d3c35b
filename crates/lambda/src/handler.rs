//! Lambda HTTP glue around [`run_invocation`].

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use impression_athena::{run_invocation, ApiResponse, CancellationToken, QueryExecutor, QueryService};
use lambda_http::{Body, Error, Request, RequestExt, Response};
use tracing::warn;

/// Time reserved before the Lambda deadline to stop the query and respond.
const DEADLINE_MARGIN: Duration = Duration::from_millis(1500);

/// Handle one API Gateway / function URL request.
pub async fn function_handler<S: QueryService>(
    executor: &QueryExecutor<S>,
    event: Request,
) -> Result<Response<Body>, Error> {
    let query = event.query_string_parameters();
    let cancel = CancellationToken::new();

    // Abandon polling shortly before the runtime would kill the invocation.
    let watchdog = event
        .lambda_context_ref()
        .and_then(|ctx| remaining_until(ctx.deadline))
        .map(|remaining| {
            let token = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(remaining.saturating_sub(DEADLINE_MARGIN)).await;
                warn!("Invocation deadline approaching, abandoning query");
                token.cancel();
            })
        });

    let resp = run_invocation(executor, query.first("key"), query.first("days"), &cancel).await;

    if let Some(handle) = watchdog {
        handle.abort();
    }

    into_http_response(resp)
}

/// Time left until `deadline_ms` (epoch milliseconds), if any.
fn remaining_until(deadline_ms: u64) -> Option<Duration> {
    let now_ms = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_millis() as u64;
    Some(Duration::from_millis(deadline_ms.saturating_sub(now_ms)))
}

pub fn into_http_response(resp: ApiResponse) -> Result<Response<Body>, Error> {
    let http = Response::builder()
        .status(resp.status_code)
        .header("content-type", "application/json")
        .body(Body::from(resp.body))
        .map_err(Box::new)?;
    Ok(http)
}
